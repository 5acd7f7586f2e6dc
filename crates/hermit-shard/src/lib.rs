//! SLIP-39 shard engine.
//!
//! Splits a BIP-39 seed (or any byte secret) into a hierarchy of group and
//! member mnemonic shards, and reconstructs it from a quorum of them. Built
//! on GF(256) polynomial arithmetic and the RS1024 checksum used by the
//! SLIP-39 mnemonic format.

pub mod bits;
pub mod encrypt;
pub mod gf256;
pub mod mnemonic;
pub mod raw;
pub mod rs1024;
pub mod shamir;
pub mod shard;
pub mod split;
pub mod store;
pub mod wordlist;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShardError {
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),
    #[error("shards belong to different families")]
    MismatchedFamily,
    #[error("not enough shards to reconstruct")]
    InsufficientShards,
    #[error("invalid threshold: need at least 2")]
    InvalidThreshold,
    #[error("threshold exceeds share count")]
    ThresholdExceedsShares,
    #[error("share verification failed")]
    VerificationFailed,
    #[error("invalid share: {0}")]
    InvalidShare(String),
}
