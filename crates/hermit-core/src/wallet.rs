//! HD wallet state and lock lifecycle.
//!
//! Mirrors `HDWallet` from `wallet.py`: the root xprv is absent until
//! `unlock()` is called with a checksum-valid mnemonic, and every signing
//! or export operation is gated on `unlocked()`.

use crate::keys::{derive_private_key, derive_xpub, master_xprv, KeyError};
use crate::seed::{derive_seed, parse_mnemonic, SeedError};
use bitcoin::bip32::Xpriv;
use bitcoin::Network;
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Error, Debug)]
pub enum WalletError {
    #[error(transparent)]
    Seed(#[from] SeedError),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error("wallet is locked")]
    Locked,
}

/// The operator-facing HD wallet. Holds the root seed only while unlocked;
/// `lock()` drops and zeroizes it immediately. The root xprv itself is
/// re-derived from the seed on each use rather than held directly, since
/// `bitcoin::bip32::Xpriv` carries no `Zeroize` impl of its own.
pub struct Wallet {
    seed: Option<Zeroizing<[u8; 64]>>,
    network: Network,
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

impl Wallet {
    pub fn new() -> Self {
        Self { seed: None, network: Network::Bitcoin }
    }

    pub fn unlocked(&self) -> bool {
        self.seed.is_some()
    }

    /// Reconstruct the root seed from a BIP-39 mnemonic phrase. Idempotent:
    /// unlocking an already-unlocked wallet simply re-derives and replaces
    /// the seed.
    pub fn unlock(&mut self, words: &str, passphrase: &str, testnet: bool) -> Result<(), WalletError> {
        let mnemonic = parse_mnemonic(words)?;
        self.seed = Some(Zeroizing::new(derive_seed(&mnemonic, passphrase)));
        self.network = if testnet { Network::Testnet } else { Network::Bitcoin };
        Ok(())
    }

    /// Drop and zeroize the root seed.
    pub fn lock(&mut self) {
        self.seed = None;
    }

    fn root(&self) -> Result<Xpriv, WalletError> {
        let seed = self.seed.as_deref().ok_or(WalletError::Locked)?;
        Ok(master_xprv(seed, self.network)?)
    }

    /// The private key at `path`, only while unlocked.
    pub fn private_key(&self, path: &str) -> Result<Xpriv, WalletError> {
        let root = self.root()?;
        Ok(derive_private_key(&root, path)?)
    }

    /// The extended public key at `path`, only while unlocked.
    pub fn xpub(&self, path: &str, use_slip132: bool) -> Result<String, WalletError> {
        let root = self.root()?;
        Ok(derive_xpub(&root, path, use_slip132)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORDS: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn starts_locked() {
        let wallet = Wallet::new();
        assert!(!wallet.unlocked());
        assert!(matches!(wallet.private_key("m/0"), Err(WalletError::Locked)));
    }

    #[test]
    fn unlock_then_lock() {
        let mut wallet = Wallet::new();
        wallet.unlock(WORDS, "", false).unwrap();
        assert!(wallet.unlocked());
        assert!(wallet.private_key("m/84'/0'/0'").is_ok());

        wallet.lock();
        assert!(!wallet.unlocked());
        assert!(matches!(wallet.private_key("m/84'/0'/0'"), Err(WalletError::Locked)));
    }

    #[test]
    fn bad_checksum_rejected_on_unlock() {
        let mut wallet = Wallet::new();
        let bad = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon";
        assert!(wallet.unlock(bad, "", false).is_err());
        assert!(!wallet.unlocked());
    }

    #[test]
    fn unlock_is_idempotent() {
        let mut wallet = Wallet::new();
        wallet.unlock(WORDS, "", false).unwrap();
        let first = wallet.xpub("m/84'/0'/0'", false).unwrap();
        wallet.unlock(WORDS, "", false).unwrap();
        let second = wallet.xpub("m/84'/0'/0'", false).unwrap();
        assert_eq!(first, second);
    }
}
