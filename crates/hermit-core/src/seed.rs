//! BIP-39 mnemonic and seed handling.

use bip39::{Language, Mnemonic};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),
}

/// Generate a new 24-word BIP-39 mnemonic (256 bits of entropy), matching
/// the 32-byte secret size the shard engine expects for its strongest
/// configuration.
pub fn generate_mnemonic() -> Result<Mnemonic, SeedError> {
    Mnemonic::generate_in(Language::English, 24).map_err(|e| SeedError::InvalidMnemonic(e.to_string()))
}

/// Parse and checksum-validate a mnemonic phrase.
pub fn parse_mnemonic(words: &str) -> Result<Mnemonic, SeedError> {
    Mnemonic::parse_in(Language::English, words).map_err(|e| SeedError::InvalidMnemonic(e.to_string()))
}

/// Rebuild a mnemonic phrase from raw entropy bytes (16 or 32 bytes), the
/// inverse of `Mnemonic::to_entropy`. Used after shard reconstruction hands
/// back the original BIP-39 entropy rather than the phrase itself.
pub fn mnemonic_from_entropy(entropy: &[u8]) -> Result<Mnemonic, SeedError> {
    Mnemonic::from_entropy(entropy).map_err(|e| SeedError::InvalidMnemonic(e.to_string()))
}

/// Derive the 64-byte BIP-39 seed from a mnemonic and optional passphrase.
pub fn derive_seed(mnemonic: &Mnemonic, passphrase: &str) -> [u8; 64] {
    mnemonic.to_seed(passphrase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_mnemonic_is_valid() {
        let mnemonic = generate_mnemonic().unwrap();
        assert_eq!(mnemonic.word_count(), 24);
        assert!(parse_mnemonic(&mnemonic.to_string()).is_ok());
    }

    #[test]
    fn bad_checksum_is_rejected() {
        let words = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon";
        assert!(parse_mnemonic(words).is_err());
    }

    #[test]
    fn entropy_round_trips_through_mnemonic() {
        let mnemonic = generate_mnemonic().unwrap();
        let entropy = mnemonic.to_entropy();
        let rebuilt = mnemonic_from_entropy(&entropy).unwrap();
        assert_eq!(mnemonic.to_string(), rebuilt.to_string());
    }

    #[test]
    fn passphrase_changes_seed() {
        let mnemonic = parse_mnemonic(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about",
        )
        .unwrap();
        let a = derive_seed(&mnemonic, "");
        let b = derive_seed(&mnemonic, "tr3zor");
        assert_ne!(a, b);
    }
}
