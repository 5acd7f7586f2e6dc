//! Raw mnemonic<->byte-array conversion, independent of the group/member
//! split path.
//!
//! Grounded in `shamir_share.py`'s `mnemonic_from_bytes` / `mnemonic_to_bytes`
//! / `reencrypt_mnemonic`: Hermit's original exposes these as standalone
//! operations (e.g. for wrapping a single secret in one mnemonic, or
//! changing a shard's passphrase without re-deriving it from the quorum).
//! Each produced mnemonic is a single-share, 1-of-1 group/member record.

use crate::encrypt::{decrypt_value, encrypt_value};
use crate::mnemonic::{decode_mnemonic, encode_mnemonic, ShareFields};
use crate::ShardError;
use rand::RngCore;

/// Wrap `data` in a single 1-of-1 SLIP-39 mnemonic, encrypted under
/// `passphrase` (skip encryption with `None` or `Some("")`).
pub fn mnemonic_from_bytes(
    data: &[u8],
    extendable: bool,
    iteration_exponent: u8,
    passphrase: Option<&str>,
    rng: &mut impl RngCore,
) -> Result<String, ShardError> {
    let mut id_bytes = [0u8; 2];
    rng.fill_bytes(&mut id_bytes);
    let identifier = u16::from_be_bytes(id_bytes) & 0x7fff;

    let value = encrypt_value(identifier, extendable, iteration_exponent, passphrase, data);
    let fields = ShareFields {
        identifier,
        extendable,
        iteration_exponent,
        group_index: 0,
        group_threshold: 1,
        group_count: 1,
        member_index: 0,
        member_threshold: 1,
        value,
    };
    encode_mnemonic(&fields)
}

/// Unwrap a single-share mnemonic back to its plaintext bytes.
pub fn mnemonic_to_bytes(phrase: &str, passphrase: Option<&str>) -> Result<Vec<u8>, ShardError> {
    let fields = decode_mnemonic(phrase)?;
    Ok(decrypt_value(fields.identifier, fields.extendable, fields.iteration_exponent, passphrase, &fields.value))
}

/// Decrypt a mnemonic under its old passphrase and re-encrypt it under a
/// new one, preserving identifier and share-layout fields.
pub fn reencrypt_mnemonic(phrase: &str, old_passphrase: Option<&str>, new_passphrase: Option<&str>) -> Result<String, ShardError> {
    let fields = decode_mnemonic(phrase)?;
    let plaintext = decrypt_value(
        fields.identifier,
        fields.extendable,
        fields.iteration_exponent,
        old_passphrase,
        &fields.value,
    );
    let new_value = encrypt_value(fields.identifier, fields.extendable, fields.iteration_exponent, new_passphrase, &plaintext);
    let new_fields = ShareFields { value: new_value, ..fields };
    encode_mnemonic(&new_fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn round_trips_raw_bytes() {
        let data: Vec<u8> = (0u8..16).collect();
        let mut rng = OsRng;
        let phrase = mnemonic_from_bytes(&data, false, 0, Some("pw"), &mut rng).unwrap();
        let back = mnemonic_to_bytes(&phrase, Some("pw")).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn reencrypt_changes_passphrase() {
        let data: Vec<u8> = (0u8..16).collect();
        let mut rng = OsRng;
        let phrase = mnemonic_from_bytes(&data, false, 0, Some("old"), &mut rng).unwrap();
        let reenc = reencrypt_mnemonic(&phrase, Some("old"), Some("new")).unwrap();

        assert!(mnemonic_to_bytes(&reenc, Some("new")).is_ok());
        let back = mnemonic_to_bytes(&reenc, Some("new")).unwrap();
        assert_eq!(back, data);

        // Old passphrase no longer recovers the original bytes.
        let wrong = mnemonic_to_bytes(&reenc, Some("old")).unwrap();
        assert_ne!(wrong, data);
    }
}
