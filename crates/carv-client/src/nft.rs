//! NFT ownership detection.
//!
//! Holdings come from the token program: accounts of the owner with amount 1
//! and zero decimals. Display metadata is resolved by trying an ordered list
//! of strategies; the first one that yields a record wins.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use carv_codec::{
    bytes_to_address, derive_associated_token_address, derive_metadata_address, NftMetadata,
    TokenAccountRecord, TOKEN_ACCOUNT_LEN, TOKEN_OWNER_OFFSET, TOKEN_PROGRAM_ID,
};

use crate::config::DirectoryConfig;
use crate::error::ClientError;
use crate::rpc::{AccountFilter, SolanaRpc};

/// One way of obtaining metadata for a mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataStrategy {
    /// Read the metadata PDA `["metadata", program_id, mint]` under `program_id`.
    MetadataPda { program_id: [u8; 32] },
    /// Synthesize a name from the mint address. Always succeeds.
    Placeholder,
}

impl MetadataStrategy {
    pub fn label(&self) -> String {
        match self {
            MetadataStrategy::MetadataPda { program_id } => {
                format!("metadata-pda:{}", bytes_to_address(program_id))
            }
            MetadataStrategy::Placeholder => "placeholder".to_string(),
        }
    }
}

/// Metadata plus the strategy that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMetadata {
    pub metadata: NftMetadata,
    pub strategy: MetadataStrategy,
}

/// An NFT held by a wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedNft {
    pub token_account: [u8; 32],
    pub holding: TokenAccountRecord,
    pub metadata: ResolvedMetadata,
}

/// Resolved metadata keyed by mint.
///
/// Unbounded and lives as long as its owner. Placeholders are never stored,
/// so a mint whose metadata appears later is picked up on the next lookup.
#[derive(Debug, Default)]
pub struct MetadataCache {
    entries: Mutex<HashMap<[u8; 32], ResolvedMetadata>>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<[u8; 32], ResolvedMetadata>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, mint: &[u8; 32]) -> Option<ResolvedMetadata> {
        self.entries().get(mint).cloned()
    }

    pub fn insert(&self, mint: [u8; 32], resolved: ResolvedMetadata) {
        self.entries().insert(mint, resolved);
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

pub struct NftScanner<R> {
    rpc: R,
    strategies: Vec<MetadataStrategy>,
    cache: MetadataCache,
}

impl<R: SolanaRpc> NftScanner<R> {
    /// One `MetadataPda` strategy per configured metadata program, in
    /// order, followed by `Placeholder`.
    pub fn new(config: &DirectoryConfig, rpc: R) -> Self {
        let strategies = config
            .metadata_programs
            .iter()
            .map(|program_id| MetadataStrategy::MetadataPda {
                program_id: *program_id,
            })
            .chain(std::iter::once(MetadataStrategy::Placeholder))
            .collect();
        Self {
            rpc,
            strategies,
            cache: MetadataCache::new(),
        }
    }

    pub fn strategies(&self) -> &[MetadataStrategy] {
        &self.strategies
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// NFTs currently held by `owner`.
    pub async fn list_nfts(&self, owner: &[u8; 32]) -> Result<Vec<OwnedNft>, ClientError> {
        let filters = [
            AccountFilter::DataSize(TOKEN_ACCOUNT_LEN as u64),
            AccountFilter::Memcmp {
                offset: TOKEN_OWNER_OFFSET,
                bytes: owner.to_vec(),
            },
        ];
        let accounts = self
            .rpc
            .get_program_accounts(&TOKEN_PROGRAM_ID, &filters)
            .await?;

        let mut nfts = Vec::new();
        for account in accounts {
            let holding = match TokenAccountRecord::decode(&account.data) {
                Ok(holding) => holding,
                Err(e) => {
                    tracing::warn!(
                        address = %bytes_to_address(&account.pubkey),
                        error = %e,
                        "skipping undecodable token account"
                    );
                    continue;
                }
            };
            if &holding.owner != owner || !holding.is_nft_holding() {
                continue;
            }

            let metadata = self.metadata(&holding.mint).await?;
            nfts.push(OwnedNft {
                token_account: account.pubkey,
                holding,
                metadata,
            });
        }

        tracing::debug!(owner = %bytes_to_address(owner), count = nfts.len(), "nfts listed");
        Ok(nfts)
    }

    /// Metadata for `mint`, from the cache or the first strategy that succeeds.
    pub async fn metadata(&self, mint: &[u8; 32]) -> Result<ResolvedMetadata, ClientError> {
        if let Some(hit) = self.cache.get(mint) {
            return Ok(hit);
        }

        for strategy in &self.strategies {
            let Some(metadata) = self.try_strategy(strategy, mint).await? else {
                continue;
            };

            tracing::debug!(
                mint = %bytes_to_address(mint),
                strategy = %strategy.label(),
                "metadata resolved"
            );
            let resolved = ResolvedMetadata {
                metadata,
                strategy: *strategy,
            };
            if *strategy != MetadataStrategy::Placeholder {
                self.cache.insert(*mint, resolved.clone());
            }
            return Ok(resolved);
        }

        // Only reachable with an empty strategy list.
        Ok(ResolvedMetadata {
            metadata: placeholder(mint),
            strategy: MetadataStrategy::Placeholder,
        })
    }

    /// Whether `owner` holds at least one unit of `mint` in its associated
    /// token account.
    pub async fn owns_mint(&self, owner: &[u8; 32], mint: &[u8; 32]) -> Result<bool, ClientError> {
        let ata = derive_associated_token_address(owner, mint)?;
        let Some(data) = self.rpc.get_account(&ata).await? else {
            return Ok(false);
        };
        let holding = TokenAccountRecord::decode(&data)?;
        Ok(&holding.owner == owner && &holding.mint == mint && holding.amount > 0)
    }

    async fn try_strategy(
        &self,
        strategy: &MetadataStrategy,
        mint: &[u8; 32],
    ) -> Result<Option<NftMetadata>, ClientError> {
        match strategy {
            MetadataStrategy::MetadataPda { program_id } => {
                let address = derive_metadata_address(program_id, mint)?;
                let Some(data) = self.rpc.get_account(&address).await? else {
                    return Ok(None);
                };
                match NftMetadata::decode(&data) {
                    Ok(decoded) if &decoded.value.mint == mint => {
                        for issue in &decoded.issues {
                            tracing::warn!(
                                address = %bytes_to_address(&address),
                                %issue,
                                "metadata decoded with issues"
                            );
                        }
                        Ok(Some(decoded.value))
                    }
                    Ok(_) => {
                        tracing::warn!(
                            address = %bytes_to_address(&address),
                            "metadata account names a different mint"
                        );
                        Ok(None)
                    }
                    Err(e) => {
                        tracing::warn!(
                            address = %bytes_to_address(&address),
                            error = %e,
                            "undecodable metadata account"
                        );
                        Ok(None)
                    }
                }
            }
            MetadataStrategy::Placeholder => Ok(Some(placeholder(mint))),
        }
    }
}

fn placeholder(mint: &[u8; 32]) -> NftMetadata {
    let address = bytes_to_address(mint);
    let short: String = address.chars().take(8).collect();
    NftMetadata {
        mint: *mint,
        name: format!("NFT {short}"),
        symbol: String::new(),
        uri: String::new(),
    }
}
