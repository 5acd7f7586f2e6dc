//! SLIP-39 mnemonic encode/decode.
//!
//! A share mnemonic packs a 40-bit header (identifier, extendable flag,
//! iteration exponent, group index, group threshold, group count, member
//! index, member threshold) followed by the left-padded share value, and
//! ends with a 3-word RS1024 checksum.

use crate::bits::{bits_to_bytes, bytes_to_bits, left_pad_to_multiple_of, pack_into_words, take_field, words_to_bits};
use crate::rs1024::{rs1024_create_checksum, rs1024_verify_checksum, CS_SHAMIR, CS_SHAMIR_EXTENDABLE};
use crate::wordlist::{index_word, word_index};
use crate::ShardError;

const ID_BITS: u32 = 15;
const EXT_BITS: u32 = 1;
const EXP_BITS: u32 = 4;
const GROUP_INDEX_BITS: u32 = 4;
const GROUP_THRESHOLD_BITS: u32 = 4;
const GROUP_COUNT_BITS: u32 = 4;
const MEMBER_INDEX_BITS: u32 = 4;
const MEMBER_THRESHOLD_BITS: u32 = 4;
const HEADER_BITS: u32 =
    ID_BITS + EXT_BITS + EXP_BITS + GROUP_INDEX_BITS + GROUP_THRESHOLD_BITS + GROUP_COUNT_BITS + MEMBER_INDEX_BITS + MEMBER_THRESHOLD_BITS;
const CHECKSUM_WORDS: usize = 3;

/// The decoded fields of one SLIP-39 share mnemonic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareFields {
    pub identifier: u16,
    pub extendable: bool,
    pub iteration_exponent: u8,
    pub group_index: u8,
    pub group_threshold: u8,
    pub group_count: u8,
    pub member_index: u8,
    pub member_threshold: u8,
    pub value: Vec<u8>,
}

impl ShareFields {
    fn customization_string(&self) -> &'static str {
        if self.extendable {
            CS_SHAMIR_EXTENDABLE
        } else {
            CS_SHAMIR
        }
    }
}

/// Encode share fields into a SLIP-39 mnemonic phrase.
pub fn encode_mnemonic(fields: &ShareFields) -> Result<String, ShardError> {
    let header = [
        (fields.identifier as u32, ID_BITS),
        (fields.extendable as u32, EXT_BITS),
        (fields.iteration_exponent as u32, EXP_BITS),
        (fields.group_index as u32, GROUP_INDEX_BITS),
        (fields.group_threshold.saturating_sub(1) as u32, GROUP_THRESHOLD_BITS),
        (fields.group_count.saturating_sub(1) as u32, GROUP_COUNT_BITS),
        (fields.member_index as u32, MEMBER_INDEX_BITS),
        (fields.member_threshold.saturating_sub(1) as u32, MEMBER_THRESHOLD_BITS),
    ];
    debug_assert_eq!(HEADER_BITS % 10, 0);

    let value_bits = bytes_to_bits(&fields.value);
    let padded_value_bits = left_pad_to_multiple_of(&value_bits, 10);

    let mut words = pack_into_words(&header, &padded_value_bits);

    let checksum = rs1024_create_checksum(fields.customization_string(), &words);
    words.extend_from_slice(&checksum);

    let phrase = words
        .iter()
        .map(|&w| index_word(w).ok_or(ShardError::InvalidMnemonic("word index out of range".into())))
        .collect::<Result<Vec<_>, _>>()?
        .join(" ");
    Ok(phrase)
}

/// Decode a SLIP-39 mnemonic phrase into share fields.
pub fn decode_mnemonic(phrase: &str) -> Result<ShareFields, ShardError> {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    if words.len() < CHECKSUM_WORDS + (HEADER_BITS as usize / 10) {
        return Err(ShardError::InvalidMnemonic("too few words".into()));
    }

    let indices: Vec<u16> = words
        .iter()
        .map(|w| word_index(&w.to_lowercase()).ok_or_else(|| ShardError::InvalidMnemonic(format!("unknown word {w}"))))
        .collect::<Result<_, _>>()?;

    // Try both customization strings; the extendable flag lives inside the
    // header, so we decode speculatively and verify the checksum against
    // the flag we find.
    let bits = words_to_bits(&indices);
    let (identifier, rest) = take_field(&bits, ID_BITS as usize);
    let (extendable, rest) = take_field(rest, EXT_BITS as usize);
    let cs = if extendable == 1 { CS_SHAMIR_EXTENDABLE } else { CS_SHAMIR };

    if !rs1024_verify_checksum(cs, &indices) {
        return Err(ShardError::InvalidMnemonic("checksum mismatch".into()));
    }

    let (iteration_exponent, rest) = take_field(rest, EXP_BITS as usize);
    let (group_index, rest) = take_field(rest, GROUP_INDEX_BITS as usize);
    let (group_threshold, rest) = take_field(rest, GROUP_THRESHOLD_BITS as usize);
    let (group_count, rest) = take_field(rest, GROUP_COUNT_BITS as usize);
    let (member_index, rest) = take_field(rest, MEMBER_INDEX_BITS as usize);
    let (member_threshold, rest) = take_field(rest, MEMBER_THRESHOLD_BITS as usize);

    let checksum_bits = CHECKSUM_WORDS * 10;
    if rest.len() < checksum_bits {
        return Err(ShardError::InvalidMnemonic("malformed value field".into()));
    }
    let padded_value_bits = &rest[..rest.len() - checksum_bits];

    let value_byte_len = infer_value_byte_len(padded_value_bits.len())
        .ok_or_else(|| ShardError::InvalidMnemonic("cannot determine value length".into()))?;
    let value_bits = &padded_value_bits[padded_value_bits.len() - value_byte_len * 8..];
    let value = bits_to_bytes(value_bits);

    Ok(ShareFields {
        identifier: identifier as u16,
        extendable: extendable == 1,
        iteration_exponent: iteration_exponent as u8,
        group_index: group_index as u8,
        group_threshold: group_threshold as u8 + 1,
        group_count: group_count as u8 + 1,
        member_index: member_index as u8,
        member_threshold: member_threshold as u8 + 1,
        value,
    })
}

/// Given the bit length of the left-padded value field, recover the
/// original (byte-aligned) value length. Padding is 0..9 bits, chosen at
/// encode time as the minimum needed to reach a multiple of 10.
fn infer_value_byte_len(padded_bits: usize) -> Option<usize> {
    let max_byte_len = padded_bits / 8;
    for byte_len in (0..=max_byte_len).rev() {
        let value_bits = byte_len * 8;
        let pad = padded_bits.saturating_sub(value_bits);
        if pad < 10 && (10 - (value_bits % 10)) % 10 == pad {
            return Some(byte_len);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fields(value: Vec<u8>) -> ShareFields {
        ShareFields {
            identifier: 12345,
            extendable: false,
            iteration_exponent: 1,
            group_index: 2,
            group_threshold: 2,
            group_count: 3,
            member_index: 1,
            member_threshold: 3,
            value,
        }
    }

    #[test]
    fn round_trip_16_byte_value() {
        let fields = sample_fields((0u8..16).collect());
        let phrase = encode_mnemonic(&fields).unwrap();
        // 4 header words + 13 value words + 3 checksum words = 20
        assert_eq!(phrase.split_whitespace().count(), 20);
        let decoded = decode_mnemonic(&phrase).unwrap();
        assert_eq!(decoded, fields);
    }

    #[test]
    fn round_trip_32_byte_value() {
        let fields = sample_fields((0u8..32).collect());
        let phrase = encode_mnemonic(&fields).unwrap();
        // 4 header words + 26 value words + 3 checksum words = 33
        assert_eq!(phrase.split_whitespace().count(), 33);
        let decoded = decode_mnemonic(&phrase).unwrap();
        assert_eq!(decoded, fields);
    }

    #[test]
    fn corrupted_checksum_is_rejected() {
        let fields = sample_fields((0u8..16).collect());
        let phrase = encode_mnemonic(&fields).unwrap();
        let mut words: Vec<&str> = phrase.split_whitespace().collect();
        // Swap the last two words to corrupt the checksum without changing the wordset.
        let len = words.len();
        words.swap(len - 1, len - 2);
        let corrupted = words.join(" ");
        assert!(decode_mnemonic(&corrupted).is_err());
    }

    #[test]
    fn unknown_word_is_rejected() {
        let fields = sample_fields((0u8..16).collect());
        let mut phrase = encode_mnemonic(&fields).unwrap();
        phrase.push_str(" zzzznotaword");
        assert!(decode_mnemonic(&phrase).is_err());
    }
}
