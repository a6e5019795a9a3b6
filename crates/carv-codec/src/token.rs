//! Token account and token metadata views used for NFT ownership detection.

use serde::Serialize;

use crate::account::{AccountReader, Decoded};
use crate::error::DecodeError;

// ---------------------------------------------------------------------------
// Well-known program IDs
// ---------------------------------------------------------------------------

/// SPL Token Program ID: `TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA`
pub const TOKEN_PROGRAM_ID: [u8; 32] = [
    0x06, 0xdd, 0xf6, 0xe1, 0xd7, 0x65, 0xa1, 0x93, 0xd9, 0xcb, 0xe1, 0x46, 0xce, 0xeb, 0x79, 0xac,
    0x1c, 0xb4, 0x85, 0xed, 0x5f, 0x5b, 0x37, 0x91, 0x3a, 0x8c, 0xf5, 0x85, 0x7e, 0xff, 0x00, 0xa9,
];

/// Associated Token Account Program ID: `ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL`
pub const ASSOCIATED_TOKEN_PROGRAM_ID: [u8; 32] = [
    0x8c, 0x97, 0x25, 0x8f, 0x4e, 0x24, 0x89, 0xf1, 0xbb, 0x3d, 0x10, 0x29, 0x14, 0x8e, 0x0d, 0x83,
    0x0b, 0x5a, 0x13, 0x99, 0xda, 0xff, 0x10, 0x84, 0x04, 0x8e, 0x7b, 0xd8, 0xdb, 0xe9, 0xf8, 0x59,
];

/// Token Metadata Program ID: `metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s`
pub const METADATA_PROGRAM_ID: [u8; 32] = [
    0x0b, 0x70, 0x65, 0xb1, 0xe3, 0xd1, 0x7c, 0x45, 0x38, 0x9d, 0x52, 0x7f, 0x6b, 0x04, 0xc3, 0xcd,
    0x58, 0xb8, 0x6c, 0x73, 0x1a, 0xa0, 0xfd, 0xb5, 0x49, 0xb6, 0xd1, 0xbc, 0x03, 0xf8, 0x29, 0x46,
];

/// Size of a full SPL token account.
pub const TOKEN_ACCOUNT_LEN: usize = 165;

/// Shortest buffer accepted as a token account.
pub const MIN_TOKEN_ACCOUNT_LEN: usize = 80;

/// Offset of the owner key inside a token account.
pub const TOKEN_OWNER_OFFSET: usize = 32;

// ---------------------------------------------------------------------------
// Token account
// ---------------------------------------------------------------------------

/// Read-only view of a token account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenAccountRecord {
    pub mint: [u8; 32],
    pub owner: [u8; 32],
    /// Stored as a signed 64-bit LE integer, exposed as an unsigned count.
    pub amount: u64,
    pub decimals: u8,
}

impl TokenAccountRecord {
    /// Decode a token account.
    ///
    /// Layout: mint `[0..32]`, owner `[32..64]`, amount `[64..72]`,
    /// decimals `[72]`. Buffers under 80 bytes are rejected outright.
    pub fn decode(raw: &[u8]) -> Result<TokenAccountRecord, DecodeError> {
        if raw.len() < MIN_TOKEN_ACCOUNT_LEN {
            return Err(DecodeError::NotATokenAccount { len: raw.len() });
        }

        let mut reader = AccountReader::new(raw);
        let mint = reader.read_key("mint")?;
        let owner = reader.read_key("owner")?;
        let amount = reader.read_i64("amount")? as u64;
        let decimals = reader.read_u8("decimals")?;

        if mint == [0u8; 32] {
            return Err(DecodeError::UninitializedAccount { field: "mint" });
        }
        if owner == [0u8; 32] {
            return Err(DecodeError::UninitializedAccount { field: "owner" });
        }

        Ok(TokenAccountRecord {
            mint,
            owner,
            amount,
            decimals,
        })
    }

    /// `amount / 10^decimals`.
    pub fn ui_amount(&self) -> f64 {
        self.amount as f64 / 10f64.powi(i32::from(self.decimals))
    }

    /// One indivisible unit: the shape of an NFT holding.
    pub fn is_nft_holding(&self) -> bool {
        self.amount == 1 && self.decimals == 0
    }
}

// ---------------------------------------------------------------------------
// Token metadata
// ---------------------------------------------------------------------------

/// Display metadata attached to a mint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NftMetadata {
    pub mint: [u8; 32],
    pub name: String,
    pub symbol: String,
    pub uri: String,
}

impl NftMetadata {
    /// Decode a metadata account.
    ///
    /// ```text
    /// key               u8
    /// update_authority  32 bytes
    /// mint              32 bytes
    /// name              u32 LE length + bytes (NUL padded)
    /// symbol            u32 LE length + bytes (NUL padded)
    /// uri               u32 LE length + bytes (NUL padded)
    /// ```
    ///
    /// Everything after `uri` (royalties, creators, ...) is ignored. Invalid
    /// UTF-8 is decoded lossily and reported in `issues`.
    pub fn decode(raw: &[u8]) -> Result<Decoded<NftMetadata>, DecodeError> {
        let mut reader = AccountReader::new(raw);
        let mut issues = Vec::new();

        reader.skip("key", 1)?;
        reader.skip("update_authority", 32)?;
        let mint = reader.read_key("mint")?;
        let name = reader.read_string("name", &mut issues)?;
        let symbol = reader.read_string("symbol", &mut issues)?;
        let uri = reader.read_string("uri", &mut issues)?;

        Ok(Decoded {
            value: NftMetadata {
                mint,
                name: trim_padding(&name),
                symbol: trim_padding(&symbol),
                uri: trim_padding(&uri),
            },
            issues,
        })
    }
}

fn trim_padding(value: &str) -> String {
    value.trim_end_matches('\0').trim().to_owned()
}
