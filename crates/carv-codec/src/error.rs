use thiserror::Error;

/// Encoding, derivation and transaction errors.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid seeds: {0}")]
    InvalidSeeds(String),

    #[error("no valid bump seed found for program address")]
    NoValidBumpFound,

    #[error("invalid argument encoding for `{field}`: {reason}")]
    InvalidArgumentEncoding { field: &'static str, reason: String },

    #[error("`{field}` is {len} bytes, exceeds the {max}-byte budget")]
    OversizedField {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("signing error: {0}")]
    SigningError(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Account layout decoding errors.
///
/// Every variant names the field being read so callers can render a
/// meaningful message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("account truncated reading `{field}` at offset {offset}: need {needed} bytes, {available} available")]
    TruncatedAccount {
        field: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("invalid UTF-8 in `{field}` at offset {offset}")]
    InvalidEncoding { field: &'static str, offset: usize },

    #[error("not a token account: {len} bytes, need at least 80")]
    NotATokenAccount { len: usize },

    #[error("uninitialized account: `{field}` is all zeros")]
    UninitializedAccount { field: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_address() {
        let err = CodecError::InvalidAddress("bad decode".into());
        assert_eq!(err.to_string(), "invalid address: bad decode");
    }

    #[test]
    fn display_oversized_field() {
        let err = CodecError::OversizedField {
            field: "metadata",
            len: 130,
            max: 128,
        };
        assert_eq!(
            err.to_string(),
            "`metadata` is 130 bytes, exceeds the 128-byte budget"
        );
    }

    #[test]
    fn display_truncated_account() {
        let err = DecodeError::TruncatedAccount {
            field: "owner",
            offset: 8,
            needed: 32,
            available: 10,
        };
        assert_eq!(
            err.to_string(),
            "account truncated reading `owner` at offset 8: need 32 bytes, 10 available"
        );
    }

    #[test]
    fn display_not_a_token_account() {
        let err = DecodeError::NotATokenAccount { len: 77 };
        assert_eq!(err.to_string(), "not a token account: 77 bytes, need at least 80");
    }

    #[test]
    fn decode_error_converts_transparently() {
        let err: CodecError = DecodeError::UninitializedAccount { field: "mint" }.into();
        assert_eq!(err.to_string(), "uninitialized account: `mint` is all zeros");
    }

    #[test]
    fn error_trait_is_implemented() {
        let err: Box<dyn std::error::Error> = Box::new(CodecError::NoValidBumpFound);
        assert!(err.to_string().contains("bump"));
    }
}
