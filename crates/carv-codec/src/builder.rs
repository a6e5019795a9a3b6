//! Transaction assembly for name program operations.
//!
//! The account list of each instruction is part of the program's wire
//! contract; the order below must not change.
//!
//! ```text
//! register   domain_pda(w)  owner(s,w)  treasury(w)  system_program
//! renew      domain_pda(w)  owner(s,w)  treasury(w)  system_program
//! transfer   domain_pda(w)  owner(s)
//! set_data   domain_pda(w)  owner(s)
//! ```

use crate::error::CodecError;
use crate::instruction::{validate_metadata, validate_name, DomainInstruction};
use crate::pda::derive_domain_address;
use crate::transaction::{
    compile_transaction, SolAccountMeta, SolInstruction, SolTransaction, SYSTEM_PROGRAM_ID,
};

/// A name program operation together with the name it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainOperation {
    Register { name: String },
    Renew { name: String },
    Transfer { name: String, new_owner: [u8; 32] },
    SetData { name: String, metadata: String },
}

impl DomainOperation {
    pub fn name(&self) -> &str {
        match self {
            DomainOperation::Register { name }
            | DomainOperation::Renew { name }
            | DomainOperation::Transfer { name, .. }
            | DomainOperation::SetData { name, .. } => name,
        }
    }

    /// Check names and metadata against the program's storage budgets.
    pub fn validate(&self) -> Result<(), CodecError> {
        validate_name(self.name())?;
        if let DomainOperation::SetData { metadata, .. } = self {
            validate_metadata(metadata)?;
        }
        Ok(())
    }

    fn instruction(&self) -> DomainInstruction {
        match self {
            DomainOperation::Register { name } => DomainInstruction::Register { name: name.clone() },
            DomainOperation::Renew { .. } => DomainInstruction::Renew,
            DomainOperation::Transfer { new_owner, .. } => DomainInstruction::Transfer {
                new_owner: *new_owner,
            },
            DomainOperation::SetData { metadata, .. } => DomainInstruction::SetData {
                metadata: metadata.clone(),
            },
        }
    }
}

/// Builds unsigned transactions against one deployment of the name program.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    program_id: [u8; 32],
    treasury: [u8; 32],
}

impl TransactionBuilder {
    pub fn new(program_id: [u8; 32], treasury: [u8; 32]) -> Self {
        Self {
            program_id,
            treasury,
        }
    }

    pub fn program_id(&self) -> &[u8; 32] {
        &self.program_id
    }

    /// Build the instruction for `op`, signed by `owner`.
    pub fn instruction(
        &self,
        op: &DomainOperation,
        owner: &[u8; 32],
    ) -> Result<SolInstruction, CodecError> {
        op.validate()?;

        let (domain_pda, _bump) = derive_domain_address(&self.program_id, op.name())?;
        let accounts = match op {
            DomainOperation::Register { .. } | DomainOperation::Renew { .. } => vec![
                SolAccountMeta::writable(domain_pda, false),
                SolAccountMeta::writable(*owner, true),
                SolAccountMeta::writable(self.treasury, false),
                SolAccountMeta::readonly(SYSTEM_PROGRAM_ID, false),
            ],
            DomainOperation::Transfer { .. } | DomainOperation::SetData { .. } => vec![
                SolAccountMeta::writable(domain_pda, false),
                SolAccountMeta::readonly(*owner, true),
            ],
        };

        Ok(SolInstruction {
            program_id: self.program_id,
            accounts,
            data: op.instruction().encode()?,
        })
    }

    /// Build an unsigned transaction where the owner also pays the fee.
    pub fn build(
        &self,
        op: &DomainOperation,
        fee_payer: &[u8; 32],
        recent_blockhash: &[u8; 32],
    ) -> Result<SolTransaction, CodecError> {
        self.build_with_owner(op, fee_payer, fee_payer, recent_blockhash)
    }

    /// Build an unsigned transaction with a separate fee payer.
    pub fn build_with_owner(
        &self,
        op: &DomainOperation,
        owner: &[u8; 32],
        fee_payer: &[u8; 32],
        recent_blockhash: &[u8; 32],
    ) -> Result<SolTransaction, CodecError> {
        let ix = self.instruction(op, owner)?;
        compile_transaction(&[ix], fee_payer, recent_blockhash)
    }
}
