//! QR sequence emission.
//!
//! Grounded in `qr/create.py`'s `create_qr_sequence`: base64-encode the
//! payload, split into chunks sized to fit comfortably in one QR frame, and
//! frame each chunk as a BCUR-multi fragment. Unlike the original (which
//! delegates chunking and envelope framing to `buidl.bcur.BCURMulti`), the
//! chunking and framing happen directly here since no BCUR crate exists in
//! the Rust ecosystem; `bech32` supplies the payload-chunk encoding.

use crate::OpticalError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bech32::{Bech32, Hrp};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Bytes of base64 text carried per QR fragment. Chosen to keep each
/// fragment's payload comfortably within a version-12, error-correction-L
/// QR code's capacity (the parameters `qr/create.py` uses).
const CHUNK_SIZE: usize = 100;
const SEQ_ID_LEN: usize = 8;
const CHECKSUM_HEX_LEN: usize = 8;
const CHUNK_HRP: Hrp = Hrp::parse_unchecked("b");

/// Fragment `payload` into an ordered BCUR-multi QR sequence.
///
/// Framing per fragment `i` of `N`: `ur:bytes/{i+1}of{N}/{seq-id}/{checksum}/{chunk}`.
/// `seq-id` and `checksum` are identical across every fragment of the
/// sequence, letting a reassembler detect a mixed or foreign fragment.
pub fn create_qr_sequence(payload: &[u8]) -> Result<Vec<String>, OpticalError> {
    let base64_text = BASE64.encode(payload);
    let chunks: Vec<&[u8]> = base64_text.as_bytes().chunks(CHUNK_SIZE).collect();
    let chunks: Vec<&[u8]> = if chunks.is_empty() { vec![&[][..]] } else { chunks };
    let total = chunks.len();

    let seq_id: String =
        rand::thread_rng().sample_iter(&Alphanumeric).take(SEQ_ID_LEN).map(char::from).collect();
    let checksum = hex::encode(Sha256::digest(base64_text.as_bytes()));
    let checksum = &checksum[..CHECKSUM_HEX_LEN];

    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            let encoded = bech32::encode::<Bech32>(CHUNK_HRP, chunk)
                .map_err(|e| OpticalError::InvalidQrSequence(format!("cannot bech32-encode chunk: {e}")))?;
            Ok(format!("ur:bytes/{}of{total}/{seq_id}/{checksum}/{encoded}", i + 1))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragments_a_short_payload_into_one_piece() {
        let sequence = create_qr_sequence(b"hello").unwrap();
        assert_eq!(sequence.len(), 1);
        assert!(sequence[0].starts_with("ur:bytes/1of1/"));
    }

    #[test]
    fn fragments_a_long_payload_into_multiple_pieces() {
        let payload = vec![0x42u8; 1000];
        let sequence = create_qr_sequence(&payload).unwrap();
        assert!(sequence.len() > 1);
        for (i, fragment) in sequence.iter().enumerate() {
            assert!(fragment.starts_with(&format!("ur:bytes/{}of{}/", i + 1, sequence.len())));
        }
    }

    #[test]
    fn all_fragments_share_sequence_id_and_checksum() {
        let payload = vec![0x7u8; 500];
        let sequence = create_qr_sequence(&payload).unwrap();
        let fields: Vec<Vec<&str>> = sequence.iter().map(|f| f.split('/').collect()).collect();
        let seq_ids: std::collections::HashSet<&str> = fields.iter().map(|f| f[2]).collect();
        let checksums: std::collections::HashSet<&str> = fields.iter().map(|f| f[3]).collect();
        assert_eq!(seq_ids.len(), 1);
        assert_eq!(checksums.len(), 1);
    }
}
