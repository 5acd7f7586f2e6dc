//! PSBT signing pipeline: parse, validate, describe, sign a P2SH/P2WSH
//! multisig PSBT, with optional coordinator-signature verification.

pub mod coordinator;
pub mod describe;
pub mod sign;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PsbtError {
    #[error("invalid PSBT: {0}")]
    InvalidPsbt(String),
    #[error("invalid signature request: {0}")]
    InvalidSignatureRequest(String),
    #[error("invalid coordinator signature: {0}")]
    InvalidCoordinatorSignature(String),
}

pub use coordinator::{validate_coordinator_signature, CoordinatorAlgorithm, CoordinatorConfig};
pub use describe::{describe_psbt, Bip32Deriv, InputDescription, OutputDescription, TransactionSummary};
pub use sign::sign_psbt;
