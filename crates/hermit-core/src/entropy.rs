//! Interactive entropy collector.
//!
//! Grounded in `rng.py`: operator keystrokes/timings are accumulated as raw
//! bytes, and the collector reports a conservative entropy estimate — the
//! minimum of a Shannon self-entropy bound and a Kolmogorov (compressed-size)
//! bound — rather than trusting the raw byte count. Once enough estimated
//! entropy has accumulated, the pool is folded into a 32-byte output via
//! repeated SHA-256 hashing.

use flate2::write::ZlibEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};
use std::io::Write;

/// Shannon self-entropy of `data`, in bits, scaled by length (i.e. the
/// total information content under an i.i.d. byte-frequency model).
fn self_entropy_bits(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut counts = [0u32; 256];
    for &b in data {
        counts[b as usize] += 1;
    }
    let len = data.len() as f64;
    let mut entropy_per_byte = 0.0;
    for &count in counts.iter() {
        if count == 0 {
            continue;
        }
        let p = count as f64 / len;
        entropy_per_byte -= p * p.log2();
    }
    entropy_per_byte * len
}

/// A compressibility-based entropy estimate: 8 bits per byte of the zlib
/// (level 9) compressed representation. Incompressible data carries close
/// to 8 bits/byte of real entropy; compressible data carries less.
fn kolmogorov_entropy_bits(data: &[u8]) -> f64 {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    let _ = encoder.write_all(data);
    let compressed = encoder.finish().unwrap_or_default();
    8.0 * compressed.len() as f64
}

/// Conservative entropy estimate: the minimum of the two bounds above.
pub fn max_entropy_estimate(data: &[u8]) -> f64 {
    self_entropy_bits(data).min(kolmogorov_entropy_bits(data))
}

const CHUNK_BITS: f64 = 256.0;

/// Accumulates operator-supplied randomness (keystrokes, timing jitter,
/// dice rolls — any raw bytes the caller collects) until enough estimated
/// entropy has been gathered, then folds it into a fixed-size output pool.
pub struct EntropyCollector {
    buffer: Vec<u8>,
    pool: [u8; 32],
    bits_folded: f64,
}

impl Default for EntropyCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropyCollector {
    pub fn new() -> Self {
        Self { buffer: Vec::new(), pool: [0u8; 32], bits_folded: 0.0 }
    }

    /// Offer more raw bytes. Whenever the buffer's estimated entropy
    /// reaches a 256-bit chunk, that chunk is folded into the pool via
    /// `pool = sha256(pool || chunk)` and drained from the buffer.
    pub fn add(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
        while max_entropy_estimate(&self.buffer) >= CHUNK_BITS {
            let chunk = std::mem::take(&mut self.buffer);
            let mut hasher = Sha256::new();
            hasher.update(self.pool);
            hasher.update(&chunk);
            self.pool = hasher.finalize().into();
            self.bits_folded += CHUNK_BITS;
        }
    }

    /// Total estimated entropy folded into the pool so far, in bits.
    pub fn bits_collected(&self) -> f64 {
        self.bits_folded
    }

    /// True once at least `target_bits` of estimated entropy has been
    /// folded in (e.g. 256 for a 32-byte secret).
    pub fn is_ready(&self, target_bits: f64) -> bool {
        self.bits_folded >= target_bits
    }

    /// The current 32-byte output pool.
    pub fn pool(&self) -> [u8; 32] {
        self.pool
    }
}
