//! Hermit core: BIP-39/BIP-32 wallet, lock lifecycle, memory hygiene, and
//! the interactive entropy collector.

pub mod entropy;
pub mod keys;
pub mod memory;
pub mod seed;
pub mod wallet;

pub use keys::KeyError;
pub use seed::SeedError;
pub use wallet::{Wallet, WalletError};
