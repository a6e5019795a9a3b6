//! Async client for the carv name program.
//!
//! [`DomainDirectory`] answers availability, lookup, listing and resolution
//! queries and submits signed operations. It is generic over [`SolanaRpc`],
//! with [`HttpRpc`] for real clusters and [`MemoryRpc`] for tests. Wire
//! encoding lives in `carv-codec`.

pub mod config;
pub mod directory;
pub mod error;
pub mod http;
pub mod memory;
pub mod nft;
pub mod rpc;

pub use config::{Commitment, DirectoryConfig, DEFAULT_RPC_URL};
pub use directory::{DomainDirectory, DomainInfo};
pub use error::{ClientError, RpcError};
pub use http::HttpRpc;
pub use memory::MemoryRpc;
pub use nft::{MetadataCache, MetadataStrategy, NftScanner, OwnedNft, ResolvedMetadata};
pub use rpc::{AccountFilter, ProgramAccount, SolanaRpc};
