use carv_codec::{CodecError, DecodeError};
use thiserror::Error;

/// Failures reported by an RPC backend.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP request failed with status {0}")]
    Status(u16),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    #[error("rpc unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by the directory client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("rpc error: {0}")]
    Rpc(#[from] RpcError),

    #[error("name `{0}` is not available")]
    NameUnavailable(String),

    #[error("fee payer {0} has no balance")]
    InsufficientFunds(String),

    #[error("transaction {signature} not confirmed after {attempts} attempts")]
    ConfirmationTimeout { signature: String, attempts: u32 },
}
