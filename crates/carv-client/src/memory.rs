//! In-process RPC backend for tests and offline tooling.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use carv_codec::decode_compact_u16;

use crate::error::RpcError;
use crate::rpc::{AccountFilter, ProgramAccount, SolanaRpc};

#[derive(Debug, Clone)]
struct StoredAccount {
    owner: [u8; 32],
    data: Vec<u8>,
}

#[derive(Debug, Default)]
struct State {
    accounts: BTreeMap<[u8; 32], StoredAccount>,
    balances: HashMap<[u8; 32], u64>,
    blockhash: [u8; 32],
    sent: Vec<Vec<u8>>,
    /// Remaining unconfirmed polls per received signature.
    pending: HashMap<String, u32>,
    confirm_delay: u32,
    failed: HashMap<String, String>,
    offline: bool,
    ignore_filters: bool,
}

/// Accounts and balances held in memory.
///
/// Sent transactions are recorded. A received signature confirms after
/// [`set_confirmation_delay`](Self::set_confirmation_delay) pending polls;
/// signatures never received stay unconfirmed.
#[derive(Debug, Default)]
pub struct MemoryRpc {
    state: Mutex<State>,
}

impl MemoryRpc {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store an account owned by `owner_program`.
    pub fn set_account(&self, address: [u8; 32], owner_program: [u8; 32], data: Vec<u8>) {
        self.state().accounts.insert(
            address,
            StoredAccount {
                owner: owner_program,
                data,
            },
        );
    }

    pub fn remove_account(&self, address: &[u8; 32]) {
        self.state().accounts.remove(address);
    }

    pub fn set_balance(&self, address: [u8; 32], lamports: u64) {
        self.state().balances.insert(address, lamports);
    }

    pub fn set_blockhash(&self, blockhash: [u8; 32]) {
        self.state().blockhash = blockhash;
    }

    /// Make every call fail with [`RpcError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.state().offline = offline;
    }

    /// Return every account of the program regardless of filters, like a
    /// node that does not support them.
    pub fn set_ignore_filters(&self, ignore: bool) {
        self.state().ignore_filters = ignore;
    }

    /// Number of polls a newly sent transaction reports as pending.
    pub fn set_confirmation_delay(&self, polls: u32) {
        self.state().confirm_delay = polls;
    }

    /// Report `signature` as failed with `reason`.
    pub fn fail_signature(&self, signature: &str, reason: &str) {
        self.state()
            .failed
            .insert(signature.to_string(), reason.to_string());
    }

    /// Wire transactions received so far, oldest first.
    pub fn sent_transactions(&self) -> Vec<Vec<u8>> {
        self.state().sent.clone()
    }

    fn online(&self) -> Result<MutexGuard<'_, State>, RpcError> {
        let state = self.state();
        if state.offline {
            return Err(RpcError::Unavailable("memory backend is offline".into()));
        }
        Ok(state)
    }
}

impl SolanaRpc for MemoryRpc {
    async fn get_account(&self, address: &[u8; 32]) -> Result<Option<Vec<u8>>, RpcError> {
        Ok(self
            .online()?
            .accounts
            .get(address)
            .map(|account| account.data.clone()))
    }

    async fn get_program_accounts(
        &self,
        program_id: &[u8; 32],
        filters: &[AccountFilter],
    ) -> Result<Vec<ProgramAccount>, RpcError> {
        let state = self.online()?;
        Ok(state
            .accounts
            .iter()
            .filter(|(_, account)| &account.owner == program_id)
            .filter(|(_, account)| {
                state.ignore_filters || filters.iter().all(|f| f.matches(&account.data))
            })
            .map(|(pubkey, account)| ProgramAccount {
                pubkey: *pubkey,
                data: account.data.clone(),
            })
            .collect())
    }

    async fn get_latest_blockhash(&self) -> Result<[u8; 32], RpcError> {
        Ok(self.online()?.blockhash)
    }

    async fn send_transaction(&self, wire: &[u8]) -> Result<String, RpcError> {
        let mut state = self.online()?;
        let (count, header) = decode_compact_u16(wire)
            .map_err(|e| RpcError::InvalidResponse(format!("transaction: {e}")))?;
        let signature = wire
            .get(header..header + 64)
            .filter(|_| count > 0)
            .ok_or_else(|| RpcError::InvalidResponse("transaction carries no signature".into()))?;

        let encoded = bs58::encode(signature).into_string();
        let delay = state.confirm_delay;
        state.pending.insert(encoded.clone(), delay);
        state.sent.push(wire.to_vec());
        Ok(encoded)
    }

    async fn confirm_transaction(&self, signature: &str) -> Result<bool, RpcError> {
        let mut state = self.online()?;
        if let Some(reason) = state.failed.get(signature) {
            return Err(RpcError::TransactionFailed(reason.clone()));
        }
        match state.pending.get_mut(signature) {
            None => Ok(false),
            Some(0) => Ok(true),
            Some(remaining) => {
                *remaining -= 1;
                Ok(false)
            }
        }
    }

    async fn get_balance(&self, address: &[u8; 32]) -> Result<u64, RpcError> {
        Ok(self
            .online()?
            .balances
            .get(address)
            .copied()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROGRAM: [u8; 32] = [0x70; 32];

    #[tokio::test]
    async fn program_accounts_apply_filters() {
        let rpc = MemoryRpc::new();
        rpc.set_account([1; 32], PROGRAM, vec![0, 0, 9]);
        rpc.set_account([2; 32], PROGRAM, vec![0, 0, 8]);
        rpc.set_account([3; 32], [0x71; 32], vec![0, 0, 9]);

        let filter = AccountFilter::Memcmp {
            offset: 2,
            bytes: vec![9],
        };
        let found = rpc.get_program_accounts(&PROGRAM, &[filter]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].pubkey, [1; 32]);
    }

    #[tokio::test]
    async fn ignore_filters_returns_every_program_account() {
        let rpc = MemoryRpc::new();
        rpc.set_account([1; 32], PROGRAM, vec![1]);
        rpc.set_account([2; 32], PROGRAM, vec![2]);
        rpc.set_ignore_filters(true);

        let found = rpc
            .get_program_accounts(&PROGRAM, &[AccountFilter::DataSize(100)])
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn offline_backend_is_unavailable() {
        let rpc = MemoryRpc::new();
        rpc.set_offline(true);
        assert!(matches!(
            rpc.get_balance(&[0; 32]).await,
            Err(RpcError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn send_records_wire_and_returns_first_signature() {
        let rpc = MemoryRpc::new();
        let mut wire = vec![1u8];
        wire.extend_from_slice(&[0xAB; 64]);
        wire.extend_from_slice(&[0xFF; 10]);

        let sig = rpc.send_transaction(&wire).await.unwrap();
        assert_eq!(sig, bs58::encode([0xAB; 64]).into_string());
        assert_eq!(rpc.sent_transactions(), vec![wire]);
        assert!(rpc.confirm_transaction(&sig).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_signature_is_not_confirmed() {
        let rpc = MemoryRpc::new();
        assert!(!rpc.confirm_transaction("never-sent").await.unwrap());
    }

    #[tokio::test]
    async fn confirmation_delay_counts_polls() {
        let rpc = MemoryRpc::new();
        rpc.set_confirmation_delay(2);
        let mut wire = vec![1u8];
        wire.extend_from_slice(&[0xCD; 64]);

        let sig = rpc.send_transaction(&wire).await.unwrap();
        assert!(!rpc.confirm_transaction(&sig).await.unwrap());
        assert!(!rpc.confirm_transaction(&sig).await.unwrap());
        assert!(rpc.confirm_transaction(&sig).await.unwrap());
    }

    #[tokio::test]
    async fn unsigned_wire_is_rejected() {
        let rpc = MemoryRpc::new();
        assert!(rpc.send_transaction(&[0u8, 1, 2]).await.is_err());
    }

    #[tokio::test]
    async fn failed_signature_is_reported() {
        let rpc = MemoryRpc::new();
        rpc.fail_signature("abc", "custom program error: 0x1");
        assert!(matches!(
            rpc.confirm_transaction("abc").await,
            Err(RpcError::TransactionFailed(_))
        ));
    }
}
