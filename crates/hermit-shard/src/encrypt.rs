//! SLIP-39 share value encryption.
//!
//! The master secret (or, recursively, a group share) is encrypted with an
//! operator passphrase using the SLIP-39 4-round Feistel network, each round
//! stretched with PBKDF2-HMAC-SHA256. An empty/absent passphrase bypasses
//! stretching entirely rather than being treated as the literal passphrase
//! `""` — this matches `shamir_share.py`, where `encrypt_shard`/
//! `decrypt_shard` skip the KDF work when no passphrase was supplied.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

const ROUNDS: u32 = 4;

/// SLIP-39's base iteration count at `iteration_exponent = 0`. The actual
/// round count is `(BASE_ITERATION_COUNT << iteration_exponent) / ROUNDS`.
const BASE_ITERATION_COUNT: u32 = 10_000;

fn round_salt(identifier: u16, extendable: bool) -> Vec<u8> {
    if extendable {
        Vec::new()
    } else {
        let mut salt = b"shamir".to_vec();
        salt.extend_from_slice(&identifier.to_be_bytes());
        salt
    }
}

fn iterations(iteration_exponent: u8) -> u32 {
    (BASE_ITERATION_COUNT << iteration_exponent) / ROUNDS
}

/// Stretch `(round, passphrase, salt, block)` into a pseudorandom string the
/// same length as `block`, per SLIP-39's round function: PBKDF2-HMAC-SHA256
/// with password `round_byte || passphrase` and salt `salt || block`.
fn round_function(round: u8, passphrase: &[u8], salt: &[u8], iteration_exponent: u8, block: &[u8]) -> Vec<u8> {
    let mut password = Vec::with_capacity(1 + passphrase.len());
    password.push(round);
    password.extend_from_slice(passphrase);

    let mut pbkdf2_salt = salt.to_vec();
    pbkdf2_salt.extend_from_slice(block);

    let mut out = vec![0u8; block.len()];
    pbkdf2_hmac::<Sha256>(&password, &pbkdf2_salt, iterations(iteration_exponent), &mut out);
    out
}

fn feistel(identifier: u16, extendable: bool, iteration_exponent: u8, passphrase: &[u8], value: &[u8], decrypt: bool) -> Vec<u8> {
    if value.is_empty() {
        return Vec::new();
    }
    let half = value.len() / 2;
    let mut left = value[..half].to_vec();
    let mut right = value[half..].to_vec();
    let salt = round_salt(identifier, extendable);

    let rounds: Vec<u8> = if decrypt {
        (0..ROUNDS as u8).rev().collect()
    } else {
        (0..ROUNDS as u8).collect()
    };

    for round in rounds {
        let f = round_function(round, passphrase, &salt, iteration_exponent, &right);
        let new_right: Vec<u8> = left.iter().zip(f.iter()).map(|(a, b)| a ^ b).collect();
        left = right;
        right = new_right;
    }

    let mut out = right;
    out.extend_from_slice(&left);
    out
}

/// Encrypt a share/secret value under `passphrase`. Pass `None` or `Some("")`
/// to skip stretching entirely (plaintext value is returned unchanged).
pub fn encrypt_value(identifier: u16, extendable: bool, iteration_exponent: u8, passphrase: Option<&str>, value: &[u8]) -> Vec<u8> {
    match passphrase {
        None => value.to_vec(),
        Some(p) if p.is_empty() => value.to_vec(),
        Some(p) => feistel(identifier, extendable, iteration_exponent, p.as_bytes(), value, false),
    }
}

/// Decrypt a share/secret value under `passphrase`. Must use the same
/// presence/emptiness of `passphrase` as encryption did.
pub fn decrypt_value(identifier: u16, extendable: bool, iteration_exponent: u8, passphrase: Option<&str>, value: &[u8]) -> Vec<u8> {
    match passphrase {
        None => value.to_vec(),
        Some(p) if p.is_empty() => value.to_vec(),
        Some(p) => feistel(identifier, extendable, iteration_exponent, p.as_bytes(), value, true),
    }
}
