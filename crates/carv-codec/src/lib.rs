//! Wire codec for the carv name program.
//!
//! This crate speaks the on-chain program's binary protocol without pulling in
//! `solana-sdk` or `anchor-client`: program-derived address (PDA) derivation,
//! instruction payload encoding, account layout decoding, and the legacy
//! transaction message format. Everything here is pure and synchronous; the
//! RPC side lives in `carv-client`.

pub mod account;
pub mod address;
pub mod builder;
pub mod error;
pub mod instruction;
pub mod pda;
pub mod token;
pub mod transaction;

// Re-export key public types for ergonomic imports.
pub use account::{Decoded, DomainRecord, DOMAIN_ACCOUNT_SPACE, OWNER_OFFSET};
pub use address::{
    address_to_bytes, bytes_to_address, parse_program_id, public_key_from_secret, validate_address,
};
pub use builder::{DomainOperation, TransactionBuilder};
pub use error::{CodecError, DecodeError};
pub use instruction::{validate_metadata, validate_name, DomainInstruction};
pub use pda::{
    create_program_address, derive_associated_token_address, derive_domain_address,
    derive_metadata_address, find_program_address,
};
pub use token::{
    NftMetadata, TokenAccountRecord, ASSOCIATED_TOKEN_PROGRAM_ID, METADATA_PROGRAM_ID, TOKEN_ACCOUNT_LEN,
    TOKEN_OWNER_OFFSET, TOKEN_PROGRAM_ID,
};
pub use transaction::{
    compile_transaction, decode_compact_u16, encode_compact_u16, serialize_message, sign_transaction,
    CompiledInstruction, SolAccountMeta, SolInstruction, SolTransaction, SYSTEM_PROGRAM_ID,
};
