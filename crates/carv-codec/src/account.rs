//! Name record account layout.
//!
//! ```text
//! offset      len  field
//! 0           8    discriminant (opaque, skipped)
//! 8           32   owner
//! 40          4    name length N (u32 LE)
//! 44          N    name (UTF-8)
//! 44+N        8    registered_at (i64 LE)
//! 52+N        8    expires_at (i64 LE)
//! 60+N        1    active (nonzero = true)
//! 61+N        4    metadata length M (u32 LE)
//! 65+N        M    metadata (UTF-8)
//! ```
//!
//! The program allocates 225 bytes per record: 8 + 32 + (4+32) + 8 + 8 + 1 +
//! (4+128). Accounts are decoded with an explicit running offset so every
//! failure can name the field and position it happened at.

use serde::Serialize;

use crate::error::DecodeError;

/// Bytes reserved for a name record at creation.
pub const DOMAIN_ACCOUNT_SPACE: usize = 8 + 32 + (4 + 32) + 8 + 8 + 1 + (4 + 128);

/// Size of the account-type discriminant that prefixes every record.
pub const ACCOUNT_DISCRIMINANT_LEN: usize = 8;

/// Offset of the owner key, used for memcmp filtering by owner.
pub const OWNER_OFFSET: usize = ACCOUNT_DISCRIMINANT_LEN;

/// A registered name as stored on-chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainRecord {
    pub owner: [u8; 32],
    pub name: String,
    /// Unix seconds.
    pub registered_at: i64,
    /// Unix seconds.
    pub expires_at: i64,
    pub active: bool,
    pub metadata: String,
}

/// A decoded value plus the non-fatal problems found while decoding it.
///
/// Only [`DecodeError::InvalidEncoding`] ends up in `issues`; anything else
/// aborts the decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded<T> {
    pub value: T,
    pub issues: Vec<DecodeError>,
}

impl<T> Decoded<T> {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

impl DomainRecord {
    /// Decode a raw name record account.
    pub fn decode(raw: &[u8]) -> Result<Decoded<DomainRecord>, DecodeError> {
        let mut reader = AccountReader::new(raw);
        let mut issues = Vec::new();

        reader.skip("discriminant", ACCOUNT_DISCRIMINANT_LEN)?;
        let owner = reader.read_key("owner")?;
        let name = reader.read_string("name", &mut issues)?;
        let registered_at = reader.read_i64("registered_at")?;
        let expires_at = reader.read_i64("expires_at")?;
        let active = reader.read_u8("active")? != 0;
        let metadata = reader.read_string("metadata", &mut issues)?;

        Ok(Decoded {
            value: DomainRecord {
                owner,
                name,
                registered_at,
                expires_at,
                active,
                metadata,
            },
            issues,
        })
    }

    /// Number of bytes this record occupies when serialized.
    pub fn serialized_len(&self) -> usize {
        ACCOUNT_DISCRIMINANT_LEN + 32 + 4 + self.name.len() + 8 + 8 + 1 + 4 + self.metadata.len()
    }

    /// Whether the serialized record fits the account allocation.
    pub fn fits_allocation(&self) -> bool {
        self.serialized_len() <= DOMAIN_ACCOUNT_SPACE
    }

    /// Serialize in the on-chain layout, prefixed by `discriminant`.
    ///
    /// The output is exactly [`serialized_len`](Self::serialized_len) bytes;
    /// the program zero-pads the rest of the allocation.
    pub fn to_account_data(&self, discriminant: [u8; 8]) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.serialized_len());
        data.extend_from_slice(&discriminant);
        data.extend_from_slice(&self.owner);
        data.extend_from_slice(&(self.name.len() as u32).to_le_bytes());
        data.extend_from_slice(self.name.as_bytes());
        data.extend_from_slice(&self.registered_at.to_le_bytes());
        data.extend_from_slice(&self.expires_at.to_le_bytes());
        data.push(u8::from(self.active));
        data.extend_from_slice(&(self.metadata.len() as u32).to_le_bytes());
        data.extend_from_slice(self.metadata.as_bytes());
        data
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at <= now
    }

    /// A record resolves to its owner only while active and unexpired.
    pub fn is_resolvable_at(&self, now: i64) -> bool {
        self.active && !self.is_expired_at(now)
    }
}

/// Bounds-checked cursor over account bytes.
pub(crate) struct AccountReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> AccountReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub(crate) fn take(&mut self, field: &'static str, len: usize) -> Result<&'a [u8], DecodeError> {
        let available = self.data.len().saturating_sub(self.offset);
        if len > available {
            return Err(DecodeError::TruncatedAccount {
                field,
                offset: self.offset,
                needed: len,
                available,
            });
        }
        let bytes = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    pub(crate) fn skip(&mut self, field: &'static str, len: usize) -> Result<(), DecodeError> {
        self.take(field, len).map(|_| ())
    }

    pub(crate) fn read_u8(&mut self, field: &'static str) -> Result<u8, DecodeError> {
        Ok(self.take(field, 1)?[0])
    }

    pub(crate) fn read_u32(&mut self, field: &'static str) -> Result<u32, DecodeError> {
        let bytes = self.take(field, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub(crate) fn read_i64(&mut self, field: &'static str) -> Result<i64, DecodeError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(field, 8)?);
        Ok(i64::from_le_bytes(buf))
    }

    pub(crate) fn read_key(&mut self, field: &'static str) -> Result<[u8; 32], DecodeError> {
        let mut key = [0u8; 32];
        key.copy_from_slice(self.take(field, 32)?);
        Ok(key)
    }

    /// Read a u32-prefixed string. Malformed UTF-8 is replaced with U+FFFD
    /// and recorded in `issues` instead of failing the whole read.
    pub(crate) fn read_string(
        &mut self,
        field: &'static str,
        issues: &mut Vec<DecodeError>,
    ) -> Result<String, DecodeError> {
        let len = self.read_u32(field)? as usize;
        let start = self.offset;
        let bytes = self.take(field, len)?;

        match std::str::from_utf8(bytes) {
            Ok(s) => Ok(s.to_owned()),
            Err(_) => {
                issues.push(DecodeError::InvalidEncoding {
                    field,
                    offset: start,
                });
                Ok(String::from_utf8_lossy(bytes).into_owned())
            }
        }
    }
}
