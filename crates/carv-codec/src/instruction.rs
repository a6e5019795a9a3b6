//! Instruction payload encoding for the name program.
//!
//! ```text
//! Instruction data:
//!   discriminator   8 bytes (per operation, see below)
//!   arguments       operation specific, little-endian
//! ```
//!
//! Strings are a u32 LE byte length followed by the UTF-8 bytes. The program
//! is the only decoder of these payloads, so there is no decode path here.

use crate::error::CodecError;

/// `register(name: String)`
pub const REGISTER_DISCRIMINATOR: [u8; 8] = [0xd3, 0x7c, 0x43, 0x0f, 0xd3, 0xc2, 0xb2, 0xf0];
/// `renew()`
pub const RENEW_DISCRIMINATOR: [u8; 8] = [0x2b, 0xef, 0x0f, 0x2e, 0x1b, 0x07, 0xa3, 0x49];
/// `transfer(new_owner: Pubkey)`
pub const TRANSFER_DISCRIMINATOR: [u8; 8] = [0xa3, 0x34, 0xc8, 0xe7, 0x8c, 0x03, 0x45, 0xba];
/// `set_data(metadata: String)`
pub const SET_DATA_DISCRIMINATOR: [u8; 8] = [0xdf, 0x72, 0x5b, 0x88, 0xc5, 0x9e, 0x99, 0x99];

/// Byte budget for a name, as reserved by the program at creation.
pub const MAX_NAME_LEN: usize = 32;

/// Byte budget for the metadata ("bio") string.
pub const MAX_METADATA_LEN: usize = 128;

/// One instruction understood by the name program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainInstruction {
    Register { name: String },
    Renew,
    Transfer { new_owner: [u8; 32] },
    SetData { metadata: String },
}

impl DomainInstruction {
    /// The 8-byte prefix identifying this operation on-chain.
    pub fn discriminator(&self) -> [u8; 8] {
        match self {
            DomainInstruction::Register { .. } => REGISTER_DISCRIMINATOR,
            DomainInstruction::Renew => RENEW_DISCRIMINATOR,
            DomainInstruction::Transfer { .. } => TRANSFER_DISCRIMINATOR,
            DomainInstruction::SetData { .. } => SET_DATA_DISCRIMINATOR,
        }
    }

    pub fn operation_name(&self) -> &'static str {
        match self {
            DomainInstruction::Register { .. } => "register",
            DomainInstruction::Renew => "renew",
            DomainInstruction::Transfer { .. } => "transfer",
            DomainInstruction::SetData { .. } => "set_data",
        }
    }

    /// Serialize to `discriminator || args`.
    ///
    /// Storage budgets are NOT enforced here; see [`validate_name`] and
    /// [`validate_metadata`].
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut data = Vec::with_capacity(8 + self.args_len());
        data.extend_from_slice(&self.discriminator());

        match self {
            DomainInstruction::Register { name } => {
                write_string(&mut data, "name", name)?;
            }
            DomainInstruction::Renew => {}
            DomainInstruction::Transfer { new_owner } => {
                data.extend_from_slice(new_owner);
            }
            DomainInstruction::SetData { metadata } => {
                write_string(&mut data, "metadata", metadata)?;
            }
        }

        Ok(data)
    }

    fn args_len(&self) -> usize {
        match self {
            DomainInstruction::Register { name } => 4 + name.len(),
            DomainInstruction::Renew => 0,
            DomainInstruction::Transfer { .. } => 32,
            DomainInstruction::SetData { metadata } => 4 + metadata.len(),
        }
    }
}

/// Write a u32 LE length prefix followed by the UTF-8 bytes of `value`.
fn write_string(buf: &mut Vec<u8>, field: &'static str, value: &str) -> Result<(), CodecError> {
    let bytes = value.as_bytes();
    let len = u32::try_from(bytes.len()).map_err(|_| CodecError::InvalidArgumentEncoding {
        field,
        reason: format!("{} bytes do not fit a u32 length prefix", bytes.len()),
    })?;

    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(bytes);
    Ok(())
}

/// Check a name against the program's storage budget.
pub fn validate_name(name: &str) -> Result<(), CodecError> {
    if name.is_empty() {
        return Err(CodecError::InvalidArgumentEncoding {
            field: "name",
            reason: "name must not be empty".into(),
        });
    }
    check_budget("name", name, MAX_NAME_LEN)
}

/// Check a metadata string against the program's storage budget.
pub fn validate_metadata(metadata: &str) -> Result<(), CodecError> {
    check_budget("metadata", metadata, MAX_METADATA_LEN)
}

fn check_budget(field: &'static str, value: &str, max: usize) -> Result<(), CodecError> {
    if value.len() > max {
        return Err(CodecError::OversizedField {
            field,
            len: value.len(),
            max,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefix(data: &[u8]) -> u32 {
        u32::from_le_bytes(data[8..12].try_into().unwrap())
    }

    // -- Discriminators -----------------------------------------------------

    #[test]
    fn discriminators_match_program() {
        assert_eq!(hex::encode(REGISTER_DISCRIMINATOR), "d37c430fd3c2b2f0");
        assert_eq!(hex::encode(RENEW_DISCRIMINATOR), "2bef0f2e1b07a349");
        assert_eq!(hex::encode(TRANSFER_DISCRIMINATOR), "a334c8e78c0345ba");
        assert_eq!(hex::encode(SET_DATA_DISCRIMINATOR), "df725b88c59e9999");
    }

    // -- Payloads -----------------------------------------------------------

    #[test]
    fn register_layout() {
        let data = DomainInstruction::Register {
            name: "alice".into(),
        }
        .encode()
        .unwrap();

        assert_eq!(&data[..8], &REGISTER_DISCRIMINATOR);
        assert_eq!(&data[8..12], &[5, 0, 0, 0]);
        assert_eq!(&data[12..], b"alice");
        assert_eq!(data.len(), 17);
    }

    #[test]
    fn renew_is_discriminator_only() {
        let data = DomainInstruction::Renew.encode().unwrap();
        assert_eq!(data, RENEW_DISCRIMINATOR.to_vec());
    }

    #[test]
    fn transfer_appends_new_owner() {
        let new_owner = [0x5Au8; 32];
        let data = DomainInstruction::Transfer { new_owner }.encode().unwrap();
        assert_eq!(data.len(), 40);
        assert_eq!(&data[..8], &TRANSFER_DISCRIMINATOR);
        assert_eq!(&data[8..], &new_owner);
    }

    #[test]
    fn multibyte_prefix_counts_bytes_not_chars() {
        let data = DomainInstruction::SetData {
            metadata: "héllo ✓".into(),
        }
        .encode()
        .unwrap();
        assert_eq!(prefix(&data) as usize, "héllo ✓".len());
        assert_eq!(prefix(&data), 10);
    }

    #[test]
    fn oversized_metadata_still_encodes_with_matching_prefix() {
        let metadata = "m".repeat(130);
        let data = DomainInstruction::SetData {
            metadata: metadata.clone(),
        }
        .encode()
        .unwrap();

        assert_eq!(prefix(&data), 130);
        assert_eq!(data.len(), 8 + 4 + 130);
        assert_eq!(&data[12..], metadata.as_bytes());

        // The budget check is what flags it before submission.
        let err = validate_metadata(&metadata).unwrap_err();
        assert!(matches!(
            err,
            CodecError::OversizedField {
                field: "metadata",
                len: 130,
                max: 128
            }
        ));
    }

    // -- Validation ---------------------------------------------------------

    #[test]
    fn name_budget_boundaries() {
        assert!(validate_name(&"n".repeat(32)).is_ok());
        assert!(validate_name(&"n".repeat(33)).is_err());
        assert!(validate_name("").is_err());
    }

    #[test]
    fn metadata_budget_allows_empty_and_full() {
        assert!(validate_metadata("").is_ok());
        assert!(validate_metadata(&"m".repeat(128)).is_ok());
    }
}
