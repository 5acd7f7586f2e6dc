//! Core Shamir's Secret Sharing implementation, SLIP-39 style.
//!
//! Split a secret into N shares where any M can reconstruct it. Beyond plain
//! Shamir splitting, SLIP-39 adds a digest share: one of the `threshold`
//! points that define each byte's polynomial is not a random value but
//! `HMAC-SHA256(random_part, secret)[..4] || random_part`. Reconstruction
//! recovers both the secret and the digest share from the interpolating
//! polynomial, recomputes the digest, and rejects the result if they disagree
//! — any set of shares from the wrong split, or any tampered share, fails
//! this check rather than silently producing garbage.

use crate::gf256::interpolate;
use crate::ShardError;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use serde::{Deserialize, Serialize};

type HmacSha256 = Hmac<Sha256>;

/// x-coordinate of the digest share among a split's defining points.
const DIGEST_INDEX: u8 = 254;
/// x-coordinate of the secret itself among a split's defining points.
const SECRET_INDEX: u8 = 255;
/// Length, in bytes, of the truncated HMAC digest carried in the digest share.
const DIGEST_LENGTH_BYTES: usize = 4;

/// A single share of a secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    /// Share index (1..=N, never 0)
    pub index: u8,
    /// Share data (same length as original secret)
    pub data: Vec<u8>,
}

/// `HMAC-SHA256(key = random_part, msg = secret)`, truncated to
/// `DIGEST_LENGTH_BYTES`. This is the value stored (alongside `random_part`
/// itself) in the digest share.
fn create_digest(random_part: &[u8], secret: &[u8]) -> [u8; DIGEST_LENGTH_BYTES] {
    let mut mac = HmacSha256::new_from_slice(random_part).expect("HMAC accepts any key length");
    mac.update(secret);
    let full = mac.finalize().into_bytes();
    let mut out = [0u8; DIGEST_LENGTH_BYTES];
    out.copy_from_slice(&full[..DIGEST_LENGTH_BYTES]);
    out
}

/// Split a secret into shares using Shamir's Secret Sharing with a SLIP-39
/// digest share.
///
/// # Arguments
/// * `secret` - The secret bytes to split
/// * `threshold` - Minimum shares needed to reconstruct (M)
/// * `total` - Total shares to generate (N)
///
/// # Returns
/// Vector of N shares, any M of which can reconstruct the secret
pub fn split_secret(secret: &[u8], threshold: u8, total: u8) -> Result<Vec<Share>, ShardError> {
    if threshold < 2 {
        return Err(ShardError::InvalidThreshold);
    }
    if threshold > total {
        return Err(ShardError::ThresholdExceedsShares);
    }
    if secret.len() <= DIGEST_LENGTH_BYTES {
        return Err(ShardError::InvalidShare(format!(
            "secret must be longer than {DIGEST_LENGTH_BYTES} bytes"
        )));
    }

    let mut rng = rand::thread_rng();

    // `threshold - 2` of the output shares are themselves fully random; the
    // remaining two defining points are the digest share and the secret.
    // Together that's `threshold` points, which uniquely determine each
    // byte's degree-(threshold-1) polynomial.
    let random_share_count = threshold - 2;
    let mut shares: Vec<Share> = (1..=random_share_count)
        .map(|index| {
            let mut data = vec![0u8; secret.len()];
            rng.fill_bytes(&mut data);
            Share { index, data }
        })
        .collect();

    let mut random_part = vec![0u8; secret.len() - DIGEST_LENGTH_BYTES];
    rng.fill_bytes(&mut random_part);
    let digest = create_digest(&random_part, secret);
    let mut digest_share_data = digest.to_vec();
    digest_share_data.extend_from_slice(&random_part);

    let mut base_points = shares.clone();
    base_points.push(Share { index: DIGEST_INDEX, data: digest_share_data });
    base_points.push(Share { index: SECRET_INDEX, data: secret.to_vec() });

    // Any remaining output shares are extrapolated from the `threshold`
    // defining points.
    for index in (random_share_count + 1)..=total {
        let mut data = Vec::with_capacity(secret.len());
        for byte_idx in 0..secret.len() {
            let points: Vec<(u8, u8)> = base_points.iter().map(|s| (s.index, s.data[byte_idx])).collect();
            data.push(interpolate(&points, index));
        }
        shares.push(Share { index, data });
    }

    Ok(shares)
}

/// Reconstruct a secret from shares, verifying the SLIP-39 digest share.
///
/// # Arguments
/// * `shares` - At least threshold shares
///
/// # Returns
/// The original secret bytes, or `ShardError::VerificationFailed` if the
/// recovered digest doesn't match the recovered secret (wrong quorum,
/// mismatched split, or a tampered share).
pub fn reconstruct_secret(shares: &[Share]) -> Result<Vec<u8>, ShardError> {
    if shares.is_empty() {
        return Err(ShardError::InsufficientShards);
    }

    // All shares must have the same length
    let secret_len = shares[0].data.len();
    if shares.iter().any(|s| s.data.len() != secret_len) {
        return Err(ShardError::InvalidShare(
            "Shares have different lengths".into(),
        ));
    }
    if secret_len <= DIGEST_LENGTH_BYTES {
        return Err(ShardError::InvalidShare(format!(
            "secret must be longer than {DIGEST_LENGTH_BYTES} bytes"
        )));
    }

    // Check for duplicate indices
    let mut indices: Vec<u8> = shares.iter().map(|s| s.index).collect();
    indices.sort();
    indices.dedup();
    if indices.len() != shares.len() {
        return Err(ShardError::InvalidShare("Duplicate share indices".into()));
    }

    // Recover both the secret (x = SECRET_INDEX) and the digest share
    // (x = DIGEST_INDEX) from the same interpolating polynomial.
    let mut secret = Vec::with_capacity(secret_len);
    let mut digest_share = Vec::with_capacity(secret_len);
    for byte_idx in 0..secret_len {
        let points: Vec<(u8, u8)> = shares.iter().map(|s| (s.index, s.data[byte_idx])).collect();
        secret.push(interpolate(&points, SECRET_INDEX));
        digest_share.push(interpolate(&points, DIGEST_INDEX));
    }

    let (digest, random_part) = digest_share.split_at(DIGEST_LENGTH_BYTES);
    let expected = create_digest(random_part, &secret);
    if digest != expected {
        return Err(ShardError::VerificationFailed);
    }

    Ok(secret)
}
