//! Name lookups and submissions against one deployment of the name program.

use std::time::{SystemTime, UNIX_EPOCH};

use carv_codec::{
    bytes_to_address, derive_domain_address, public_key_from_secret, sign_transaction,
    DecodeError, DomainOperation, DomainRecord, SolTransaction, TransactionBuilder, OWNER_OFFSET,
};
use serde::Serialize;

use crate::config::DirectoryConfig;
use crate::error::ClientError;
use crate::rpc::{AccountFilter, SolanaRpc};

/// A name record together with where it lives and what went wrong decoding it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainInfo {
    pub address: [u8; 32],
    pub record: DomainRecord,
    /// Non-fatal decode problems. Empty for a well-formed account.
    #[serde(skip)]
    pub issues: Vec<DecodeError>,
}

impl DomainInfo {
    pub fn is_degraded(&self) -> bool {
        !self.issues.is_empty()
    }
}

pub struct DomainDirectory<R> {
    config: DirectoryConfig,
    builder: TransactionBuilder,
    rpc: R,
}

impl<R: SolanaRpc> DomainDirectory<R> {
    pub fn new(config: DirectoryConfig, rpc: R) -> Self {
        let builder = TransactionBuilder::new(config.program_id, config.treasury);
        Self {
            config,
            builder,
            rpc,
        }
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    /// Address of the record for `name` under the configured program.
    pub fn domain_address(&self, name: &str) -> Result<[u8; 32], ClientError> {
        let (address, _bump) = derive_domain_address(&self.config.program_id, name)?;
        Ok(address)
    }

    /// `true` iff no account exists for `name`.
    ///
    /// Any failure, including an unreachable RPC, reports the name as taken.
    pub async fn check_availability(&self, name: &str) -> bool {
        match self.fetch(name).await {
            Ok((_, None)) => true,
            Ok((_, Some(_))) => false,
            Err(e) => {
                tracing::warn!(name, error = %e, "availability check failed");
                false
            }
        }
    }

    /// Fetch and decode the record for `name`.
    ///
    /// Returns `Ok(None)` if the account does not exist. A truncated account
    /// is an error; a record with damaged strings comes back with `issues`.
    pub async fn get_info(&self, name: &str) -> Result<Option<DomainInfo>, ClientError> {
        let (address, data) = self.fetch(name).await?;
        let Some(data) = data else {
            return Ok(None);
        };

        let decoded = DomainRecord::decode(&data)?;
        if !decoded.is_clean() {
            tracing::warn!(
                name,
                address = %bytes_to_address(&address),
                issues = decoded.issues.len(),
                "domain record decoded with issues"
            );
        }

        Ok(Some(DomainInfo {
            address,
            record: decoded.value,
            issues: decoded.issues,
        }))
    }

    /// Every record owned by `owner`.
    ///
    /// The owner filter is re-checked locally, so a node that ignores
    /// filters cannot leak foreign records into the result.
    pub async fn list_by_owner(&self, owner: &[u8; 32]) -> Result<Vec<DomainRecord>, ClientError> {
        let filters = [AccountFilter::Memcmp {
            offset: OWNER_OFFSET,
            bytes: owner.to_vec(),
        }];
        let accounts = self
            .rpc
            .get_program_accounts(&self.config.program_id, &filters)
            .await?;
        tracing::debug!(owner = %bytes_to_address(owner), count = accounts.len(), "program accounts fetched");

        let mut records = Vec::with_capacity(accounts.len());
        for account in accounts {
            let address = bytes_to_address(&account.pubkey);
            match DomainRecord::decode(&account.data) {
                Ok(decoded) if &decoded.value.owner == owner => records.push(decoded.value),
                Ok(_) => {
                    tracing::warn!(%address, "dropping record with foreign owner");
                }
                Err(e) => {
                    tracing::warn!(%address, error = %e, "dropping undecodable record");
                }
            }
        }
        Ok(records)
    }

    /// Owner of `name` if it is registered, active and unexpired right now.
    pub async fn resolve(&self, name: &str) -> Result<Option<[u8; 32]>, ClientError> {
        self.resolve_at(name, unix_now()).await
    }

    /// [`resolve`](Self::resolve) evaluated at `now` (Unix seconds).
    pub async fn resolve_at(&self, name: &str, now: i64) -> Result<Option<[u8; 32]>, ClientError> {
        Ok(self
            .get_info(name)
            .await?
            .filter(|info| info.record.is_resolvable_at(now))
            .map(|info| info.record.owner))
    }

    /// Build an unsigned transaction for `op` with a fresh blockhash.
    /// `fee_payer` also acts as the record owner.
    pub async fn prepare(
        &self,
        op: &DomainOperation,
        fee_payer: &[u8; 32],
    ) -> Result<SolTransaction, ClientError> {
        op.validate()?;
        let blockhash = self.rpc.get_latest_blockhash().await?;
        Ok(self.builder.build(op, fee_payer, &blockhash)?)
    }

    /// Sign `op` with the owner's secret, send it and wait for confirmation.
    ///
    /// Registration re-checks that the name is still free right before
    /// sending. Returns the Base58 transaction signature.
    pub async fn submit(
        &self,
        op: &DomainOperation,
        owner_secret: &[u8; 32],
    ) -> Result<String, ClientError> {
        op.validate()?;
        let owner = public_key_from_secret(owner_secret);

        if let DomainOperation::Register { name } = op {
            if self.fetch(name).await?.1.is_some() {
                return Err(ClientError::NameUnavailable(name.clone()));
            }
        }

        if self.rpc.get_balance(&owner).await? == 0 {
            return Err(ClientError::InsufficientFunds(bytes_to_address(&owner)));
        }

        let tx = self.prepare(op, &owner).await?;
        let wire = sign_transaction(&tx, std::slice::from_ref(owner_secret))?;
        let signature = self.rpc.send_transaction(&wire).await?;
        tracing::debug!(name = op.name(), %signature, "transaction sent");

        let attempts = self.config.confirm_attempts;
        for attempt in 1..=attempts {
            if self.rpc.confirm_transaction(&signature).await? {
                tracing::debug!(%signature, attempt, "transaction confirmed");
                return Ok(signature);
            }
            if attempt < attempts {
                tokio::time::sleep(self.config.confirm_interval).await;
            }
        }

        Err(ClientError::ConfirmationTimeout {
            signature,
            attempts,
        })
    }

    async fn fetch(&self, name: &str) -> Result<([u8; 32], Option<Vec<u8>>), ClientError> {
        let address = self.domain_address(name)?;
        let data = self.rpc.get_account(&address).await?;
        Ok((address, data))
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRpc;
    use std::time::Duration;

    const PROGRAM: &str = "BXeZJSUurVptUakSQizWGfBAR7Zet3GwScSdJJvwZpXF";
    const TREASURY: &str = "Dt4JtfXxotJokxWMH2p8u3FNxKEzF8DDtdFTeRGD48Xs";
    const NOW: i64 = 1_700_000_000;
    const SECRET: [u8; 32] = [0x42; 32];

    fn directory() -> DomainDirectory<MemoryRpc> {
        let config = DirectoryConfig::new(PROGRAM, TREASURY)
            .unwrap()
            .with_confirmation(2, Duration::from_millis(1))
            .unwrap();
        DomainDirectory::new(config, MemoryRpc::new())
    }

    fn record(name: &str, owner: [u8; 32], expires_at: i64, active: bool) -> DomainRecord {
        DomainRecord {
            owner,
            name: name.into(),
            registered_at: NOW - 100,
            expires_at,
            active,
            metadata: String::new(),
        }
    }

    fn store(dir: &DomainDirectory<MemoryRpc>, rec: &DomainRecord) -> [u8; 32] {
        let address = dir.domain_address(&rec.name).unwrap();
        dir.rpc()
            .set_account(address, dir.config().program_id, rec.to_account_data([0xD0; 8]));
        address
    }

    #[tokio::test]
    async fn availability_follows_account_presence() {
        let dir = directory();
        assert!(dir.check_availability("alice").await);

        store(&dir, &record("alice", [1; 32], NOW + 10, true));
        assert!(!dir.check_availability("alice").await);
    }

    #[tokio::test]
    async fn availability_is_false_when_rpc_fails() {
        let dir = directory();
        dir.rpc().set_offline(true);
        assert!(!dir.check_availability("alice").await);
    }

    #[tokio::test]
    async fn get_info_absent_is_none() {
        assert_eq!(directory().get_info("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn get_info_returns_address_and_record() {
        let dir = directory();
        let rec = record("alice", [1; 32], NOW + 10, true);
        let address = store(&dir, &rec);

        let info = dir.get_info("alice").await.unwrap().unwrap();
        assert_eq!(info.address, address);
        assert_eq!(info.record, rec);
        assert!(!info.is_degraded());
    }

    #[tokio::test]
    async fn truncated_account_is_a_decode_error() {
        let dir = directory();
        let address = dir.domain_address("alice").unwrap();
        let mut data = record("alice", [1; 32], NOW, true).to_account_data([0; 8]);
        data.truncate(50);
        dir.rpc().set_account(address, dir.config().program_id, data);

        assert!(matches!(
            dir.get_info("alice").await,
            Err(ClientError::Decode(DecodeError::TruncatedAccount { field: "registered_at", .. }))
        ));
    }

    #[tokio::test]
    async fn damaged_name_yields_degraded_info() {
        let dir = directory();
        let address = dir.domain_address("alice").unwrap();
        let mut data = record("alice", [1; 32], NOW + 10, true).to_account_data([0; 8]);
        // First byte of the name.
        data[44] = 0xFF;
        dir.rpc().set_account(address, dir.config().program_id, data);

        let info = dir.get_info("alice").await.unwrap().unwrap();
        assert!(info.is_degraded());
        assert_eq!(
            info.issues,
            vec![DecodeError::InvalidEncoding { field: "name", offset: 44 }]
        );
        assert_eq!(info.record.expires_at, NOW + 10);
    }

    #[tokio::test]
    async fn resolve_requires_active_and_unexpired() {
        let dir = directory();
        store(&dir, &record("live", [1; 32], NOW + 1, true));
        store(&dir, &record("expired", [2; 32], NOW - 1, true));
        store(&dir, &record("edge", [3; 32], NOW, true));
        store(&dir, &record("inactive", [4; 32], NOW + 1000, false));

        assert_eq!(dir.resolve_at("live", NOW).await.unwrap(), Some([1; 32]));
        assert_eq!(dir.resolve_at("expired", NOW).await.unwrap(), None);
        assert_eq!(dir.resolve_at("edge", NOW).await.unwrap(), None);
        assert_eq!(dir.resolve_at("inactive", NOW).await.unwrap(), None);
        assert_eq!(dir.resolve_at("missing", NOW).await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_by_owner_rechecks_owner_and_skips_garbage() {
        let dir = directory();
        let mine = [7u8; 32];
        store(&dir, &record("a", mine, NOW, true));
        store(&dir, &record("b", mine, NOW, true));
        store(&dir, &record("c", [8; 32], NOW, true));
        dir.rpc()
            .set_account([0xEE; 32], dir.config().program_id, vec![0; 20]);
        dir.rpc().set_ignore_filters(true);

        let mut names: Vec<String> = dir
            .list_by_owner(&mine)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn list_by_owner_surfaces_rpc_errors() {
        let dir = directory();
        dir.rpc().set_offline(true);
        assert!(matches!(
            dir.list_by_owner(&[7; 32]).await,
            Err(ClientError::Rpc(_))
        ));
    }

    #[tokio::test]
    async fn prepare_uses_fresh_blockhash() {
        let dir = directory();
        dir.rpc().set_blockhash([0xAA; 32]);
        let owner = public_key_from_secret(&SECRET);

        let tx = dir
            .prepare(&DomainOperation::Renew { name: "alice".into() }, &owner)
            .await
            .unwrap();
        assert_eq!(tx.recent_blockhash, [0xAA; 32]);
        assert_eq!(tx.fee_payer(), owner);
    }

    #[tokio::test]
    async fn submit_register_signs_and_sends() {
        let dir = directory();
        let owner = public_key_from_secret(&SECRET);
        dir.rpc().set_balance(owner, 1_000_000);

        let op = DomainOperation::Register { name: "alice".into() };
        let signature = dir.submit(&op, &SECRET).await.unwrap();

        let sent = dir.rpc().sent_transactions();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0][0], 1);
        assert_eq!(signature, bs58::encode(&sent[0][1..65]).into_string());
    }

    #[tokio::test]
    async fn submit_polls_until_confirmed() {
        let dir = directory();
        let owner = public_key_from_secret(&SECRET);
        dir.rpc().set_balance(owner, 1_000_000);
        dir.rpc().set_confirmation_delay(1);

        let op = DomainOperation::Renew { name: "alice".into() };
        assert!(dir.submit(&op, &SECRET).await.is_ok());
    }

    #[tokio::test]
    async fn submit_times_out_after_configured_attempts() {
        let dir = directory();
        let owner = public_key_from_secret(&SECRET);
        dir.rpc().set_balance(owner, 1_000_000);
        dir.rpc().set_confirmation_delay(5);

        let op = DomainOperation::Renew { name: "alice".into() };
        assert!(matches!(
            dir.submit(&op, &SECRET).await,
            Err(ClientError::ConfirmationTimeout { attempts: 2, .. })
        ));
        assert_eq!(dir.rpc().sent_transactions().len(), 1);
    }

    #[tokio::test]
    async fn submit_register_rejects_taken_name() {
        let dir = directory();
        let owner = public_key_from_secret(&SECRET);
        dir.rpc().set_balance(owner, 1_000_000);
        store(&dir, &record("alice", [1; 32], NOW, true));

        let op = DomainOperation::Register { name: "alice".into() };
        assert!(matches!(
            dir.submit(&op, &SECRET).await,
            Err(ClientError::NameUnavailable(name)) if name == "alice"
        ));
        assert!(dir.rpc().sent_transactions().is_empty());
    }

    #[tokio::test]
    async fn submit_requires_balance() {
        let dir = directory();
        let op = DomainOperation::Renew { name: "alice".into() };
        assert!(matches!(
            dir.submit(&op, &SECRET).await,
            Err(ClientError::InsufficientFunds(_))
        ));
    }

    #[tokio::test]
    async fn submit_validates_before_touching_rpc() {
        let dir = directory();
        dir.rpc().set_offline(true);
        let op = DomainOperation::SetData {
            name: "alice".into(),
            metadata: "m".repeat(130),
        };
        assert!(matches!(
            dir.submit(&op, &SECRET).await,
            Err(ClientError::Codec(_))
        ));
    }
}
