//! The RPC capability the directory consumes.
//!
//! Implementations decide transport, timeouts and retries; the directory only
//! sees these six calls and their typed errors.

use std::sync::Arc;

use crate::error::RpcError;

/// Server-side filter for program account queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountFilter {
    /// Account data at `offset` must equal `bytes`.
    Memcmp { offset: usize, bytes: Vec<u8> },
    /// Account data length must equal the given size.
    DataSize(u64),
}

impl AccountFilter {
    /// Evaluate the filter locally.
    pub fn matches(&self, data: &[u8]) -> bool {
        match self {
            AccountFilter::Memcmp { offset, bytes } => data
                .get(*offset..offset.saturating_add(bytes.len()))
                .is_some_and(|window| window == bytes.as_slice()),
            AccountFilter::DataSize(size) => data.len() as u64 == *size,
        }
    }
}

/// An account returned by a program account query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramAccount {
    pub pubkey: [u8; 32],
    pub data: Vec<u8>,
}

#[allow(async_fn_in_trait)]
pub trait SolanaRpc {
    /// Raw account data, or `None` if the account does not exist.
    async fn get_account(&self, address: &[u8; 32]) -> Result<Option<Vec<u8>>, RpcError>;

    /// Accounts owned by `program_id` that pass every filter.
    async fn get_program_accounts(
        &self,
        program_id: &[u8; 32],
        filters: &[AccountFilter],
    ) -> Result<Vec<ProgramAccount>, RpcError>;

    async fn get_latest_blockhash(&self) -> Result<[u8; 32], RpcError>;

    /// Submit a signed wire transaction, returning its Base58 signature.
    async fn send_transaction(&self, wire: &[u8]) -> Result<String, RpcError>;

    /// `Ok(true)` once the signature reached the configured commitment,
    /// `Ok(false)` while pending, `Err(TransactionFailed)` if it failed.
    async fn confirm_transaction(&self, signature: &str) -> Result<bool, RpcError>;

    /// Balance in lamports.
    async fn get_balance(&self, address: &[u8; 32]) -> Result<u64, RpcError>;
}

impl<T: SolanaRpc> SolanaRpc for Arc<T> {
    async fn get_account(&self, address: &[u8; 32]) -> Result<Option<Vec<u8>>, RpcError> {
        self.as_ref().get_account(address).await
    }

    async fn get_program_accounts(
        &self,
        program_id: &[u8; 32],
        filters: &[AccountFilter],
    ) -> Result<Vec<ProgramAccount>, RpcError> {
        self.as_ref().get_program_accounts(program_id, filters).await
    }

    async fn get_latest_blockhash(&self) -> Result<[u8; 32], RpcError> {
        self.as_ref().get_latest_blockhash().await
    }

    async fn send_transaction(&self, wire: &[u8]) -> Result<String, RpcError> {
        self.as_ref().send_transaction(wire).await
    }

    async fn confirm_transaction(&self, signature: &str) -> Result<bool, RpcError> {
        self.as_ref().confirm_transaction(signature).await
    }

    async fn get_balance(&self, address: &[u8; 32]) -> Result<u64, RpcError> {
        self.as_ref().get_balance(address).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memcmp_matches_window() {
        let filter = AccountFilter::Memcmp {
            offset: 2,
            bytes: vec![3, 4],
        };
        assert!(filter.matches(&[1, 2, 3, 4, 5]));
        assert!(!filter.matches(&[1, 2, 3, 5, 5]));
    }

    #[test]
    fn memcmp_past_end_does_not_match() {
        let filter = AccountFilter::Memcmp {
            offset: 4,
            bytes: vec![5, 6],
        };
        assert!(!filter.matches(&[1, 2, 3, 4, 5]));
    }

    #[test]
    fn data_size_is_exact() {
        assert!(AccountFilter::DataSize(3).matches(&[0, 0, 0]));
        assert!(!AccountFilter::DataSize(3).matches(&[0, 0, 0, 0]));
    }
}
