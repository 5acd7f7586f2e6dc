//! The optical channel: framing arbitrary byte payloads into an animated QR
//! sequence for emission, and reassembling a stream of recognized QR
//! payloads (of several dialects) back into a single string.

pub mod emit;
pub mod reassemble;

pub use emit::create_qr_sequence;
pub use reassemble::{Dialect, Reassembler};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpticalError {
    #[error("invalid QR sequence: {0}")]
    InvalidQrSequence(String),
    #[error("unrecognized QR code format")]
    UnrecognizedFormat,
}
