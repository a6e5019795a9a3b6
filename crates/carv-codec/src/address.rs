//! Base58 address handling.
//!
//! Solana addresses are Base58-encoded 32-byte values: either Ed25519 public
//! keys or program-derived addresses. Program ids and treasury accounts enter
//! the client as strings and are validated here once, at construction time.

use zeroize::Zeroize;

use crate::error::CodecError;

/// Decode a Base58 address string to its 32-byte representation.
///
/// Returns an error if the address is not valid Base58 or does not decode
/// to exactly 32 bytes.
pub fn address_to_bytes(address: &str) -> Result<[u8; 32], CodecError> {
    let bytes = bs58::decode(address.trim())
        .into_vec()
        .map_err(|e| CodecError::InvalidAddress(format!("base58 decode failed: {e}")))?;

    let arr: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
        CodecError::InvalidAddress(format!("expected 32 bytes, got {}", v.len()))
    })?;

    Ok(arr)
}

/// Encode 32 bytes as a Base58 address string.
pub fn bytes_to_address(bytes: &[u8; 32]) -> String {
    bs58::encode(bytes).into_string()
}

/// Derive the Ed25519 public key (and therefore the address bytes) of a
/// 32-byte secret seed.
pub fn public_key_from_secret(secret: &[u8; 32]) -> [u8; 32] {
    let mut seed = *secret;
    let key = ed25519_dalek::SigningKey::from_bytes(&seed);
    seed.zeroize();
    key.verifying_key().to_bytes()
}

/// Validate an address string, returning `Ok(true)` when it decodes to 32 bytes.
pub fn validate_address(address: &str) -> Result<bool, CodecError> {
    address_to_bytes(address).map(|_| true)
}

/// Parse a program id.
///
/// Same rules as [`address_to_bytes`], and additionally rejects the all-zero
/// key, which belongs to the System Program and can never own name records.
pub fn parse_program_id(program_id: &str) -> Result<[u8; 32], CodecError> {
    let bytes = address_to_bytes(program_id)?;
    if bytes == [0u8; 32] {
        return Err(CodecError::InvalidAddress(
            "program id must not be the system program".into(),
        ));
    }
    Ok(bytes)
}
