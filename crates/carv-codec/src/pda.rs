//! Program Derived Address (PDA) derivation.
//!
//! A PDA is `SHA-256(seed_0 || ... || seed_n || bump || program_id ||
//! "ProgramDerivedAddress")` for the first bump, searched from 255 down to 0,
//! whose hash is NOT a valid Ed25519 point. The on-chain program runs the same
//! search, so the client and the program always agree on the address.

use sha2::{Digest, Sha256};

use crate::error::CodecError;
use crate::token::{ASSOCIATED_TOKEN_PROGRAM_ID, TOKEN_PROGRAM_ID};

/// The string appended to PDA derivation: "ProgramDerivedAddress".
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Seed prefix for name records.
pub const DOMAIN_SEED: &[u8] = b"domain";

/// Seed prefix for token metadata accounts.
pub const METADATA_SEED: &[u8] = b"metadata";

/// Maximum length of a single seed.
pub const MAX_SEED_LEN: usize = 32;

/// Maximum number of seeds, bump included.
pub const MAX_SEEDS: usize = 16;

/// Derive the address of the name record for `name`.
///
/// Seeds are `["domain", name]` with the raw UTF-8 bytes of `name`. No case
/// folding or trimming happens here; callers normalize before deriving.
pub fn derive_domain_address(
    program_id: &[u8; 32],
    name: &str,
) -> Result<([u8; 32], u8), CodecError> {
    find_program_address(&[DOMAIN_SEED, name.as_bytes()], program_id)
}

/// Derive the associated token account address for a wallet + mint pair.
///
/// Seeds: `[wallet, token_program_id, mint]` under the Associated Token
/// Account program.
pub fn derive_associated_token_address(
    wallet: &[u8; 32],
    mint: &[u8; 32],
) -> Result<[u8; 32], CodecError> {
    find_program_address(
        &[wallet.as_ref(), &TOKEN_PROGRAM_ID, mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .map(|(address, _bump)| address)
}

/// Derive the metadata account for `mint` under a metadata program.
///
/// Seeds: `["metadata", metadata_program_id, mint]`.
pub fn derive_metadata_address(
    metadata_program_id: &[u8; 32],
    mint: &[u8; 32],
) -> Result<[u8; 32], CodecError> {
    find_program_address(
        &[METADATA_SEED, metadata_program_id.as_ref(), mint.as_ref()],
        metadata_program_id,
    )
    .map(|(address, _bump)| address)
}

/// Find a valid Program Derived Address for the given seeds and program.
///
/// Iterates bump seeds from 255 down to 0 and returns the first candidate
/// that is off the Ed25519 curve together with its bump.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &[u8; 32],
) -> Result<([u8; 32], u8), CodecError> {
    check_seeds(seeds, 1)?;

    for bump in (0u8..=255).rev() {
        if let Some(address) = try_create_program_address(seeds, &[bump], program_id) {
            return Ok((address, bump));
        }
    }

    Err(CodecError::NoValidBumpFound)
}

/// Create a PDA from seeds + an explicit bump.
///
/// Fails with `NoValidBumpFound` if this particular bump lands on the curve.
pub fn create_program_address(
    seeds: &[&[u8]],
    bump: u8,
    program_id: &[u8; 32],
) -> Result<[u8; 32], CodecError> {
    check_seeds(seeds, 1)?;
    try_create_program_address(seeds, &[bump], program_id).ok_or(CodecError::NoValidBumpFound)
}

fn check_seeds(seeds: &[&[u8]], reserved: usize) -> Result<(), CodecError> {
    if seeds.len() + reserved > MAX_SEEDS {
        return Err(CodecError::InvalidSeeds(format!(
            "{} seeds given, at most {} allowed",
            seeds.len(),
            MAX_SEEDS - reserved
        )));
    }
    if let Some((index, seed)) = seeds
        .iter()
        .enumerate()
        .find(|(_, seed)| seed.len() > MAX_SEED_LEN)
    {
        return Err(CodecError::InvalidSeeds(format!(
            "seed {index} is {} bytes, at most {MAX_SEED_LEN} allowed",
            seed.len()
        )));
    }
    Ok(())
}

/// Returns `Some(address)` if the derived point is OFF the Ed25519 curve,
/// `None` if it falls on the curve.
fn try_create_program_address(
    seeds: &[&[u8]],
    bump_seed: &[u8],
    program_id: &[u8; 32],
) -> Option<[u8; 32]> {
    let mut hasher = Sha256::new();

    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(bump_seed);
    hasher.update(program_id);
    hasher.update(PDA_MARKER);

    let hash: [u8; 32] = hasher.finalize().into();

    if is_on_curve(&hash) {
        return None;
    }

    Some(hash)
}

/// Check if 32 bytes decompress to an Ed25519 curve point.
pub(crate) fn is_on_curve(bytes: &[u8; 32]) -> bool {
    curve25519_dalek::edwards::CompressedEdwardsY(*bytes)
        .decompress()
        .is_some()
}
