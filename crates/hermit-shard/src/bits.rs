//! Bit-packing helpers shared by mnemonic encode/decode.
//!
//! SLIP-39 mnemonics pack a header of small bitfields followed by a padded
//! value into a sequence of 10-bit word indices. These helpers convert
//! between a big-endian bitstream and `u16` 10-bit "digits".

/// Zero-pad a bitstream on the left (most-significant side) to the next
/// multiple of `unit` bits. This is how SLIP-39 aligns a value whose bit
/// length isn't already a multiple of 10 to a whole number of words.
pub fn left_pad_to_multiple_of(bits: &[bool], unit: usize) -> Vec<bool> {
    let pad = (unit - (bits.len() % unit)) % unit;
    let mut out = Vec::with_capacity(pad + bits.len());
    out.extend(std::iter::repeat(false).take(pad));
    out.extend_from_slice(bits);
    out
}

/// Pack a sequence of (value, bit_width) fields followed by a value
/// bitstring into a sequence of 10-bit words. The combined bit length must
/// already be a multiple of 10 (callers left-pad the value beforehand).
pub fn pack_into_words(fields: &[(u32, u32)], value_bits: &[bool]) -> Vec<u16> {
    let mut bits: Vec<bool> = Vec::new();
    for &(value, width) in fields {
        for i in (0..width).rev() {
            bits.push((value >> i) & 1 == 1);
        }
    }
    bits.extend_from_slice(value_bits);
    debug_assert_eq!(bits.len() % 10, 0, "packed bit length must be a multiple of 10");

    bits.chunks(10)
        .map(|chunk| {
            chunk
                .iter()
                .fold(0u16, |acc, &b| (acc << 1) | (b as u16))
        })
        .collect()
}

/// Expand a sequence of 10-bit words back into a big-endian bitstream.
pub fn words_to_bits(words: &[u16]) -> Vec<bool> {
    let mut bits = Vec::with_capacity(words.len() * 10);
    for &w in words {
        for i in (0..10).rev() {
            bits.push((w >> i) & 1 == 1);
        }
    }
    bits
}

/// Read a fixed-width field off the front of a bitstream, returning the
/// field value and the remaining bits.
pub fn take_field(bits: &[bool], width: usize) -> (u32, &[bool]) {
    let (field, rest) = bits.split_at(width);
    let value = field.iter().fold(0u32, |acc, &b| (acc << 1) | (b as u32));
    (value, rest)
}

/// Pack a byte slice into a bitstream (big-endian, MSB first).
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<bool> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for &byte in bytes {
        for i in (0..8).rev() {
            bits.push((byte >> i) & 1 == 1);
        }
    }
    bits
}

/// Unpack a bitstream (whose length is a multiple of 8) into bytes.
pub fn bits_to_bytes(bits: &[bool]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &b| (acc << 1) | (b as u8)))
        .collect()
}
