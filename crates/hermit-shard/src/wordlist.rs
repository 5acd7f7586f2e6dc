//! The SLIP-39 wordlist.
//!
//! 1024 entries, radix 1024 (10 bits/word), sorted lexicographically, each
//! with a unique 4-character prefix so a word can be recognized from its
//! first four letters alone. This is reference data, not generated: it is
//! loaded verbatim from `wordlist.txt` at build time, the same way the
//! reference SLIP-39 implementations ship their wordlist as a standalone
//! data file rather than inline constants.

use std::sync::OnceLock;

/// Number of words in the list. SLIP-39 uses a radix-1024 (10 bits/word) encoding.
pub const RADIX: usize = 1024;

const WORDLIST_TXT: &str = include_str!("wordlist.txt");

fn wordlist() -> &'static [&'static str] {
    static LIST: OnceLock<Vec<&'static str>> = OnceLock::new();
    LIST.get_or_init(|| WORDLIST_TXT.lines().filter(|line| !line.is_empty()).collect())
}

use std::collections::HashMap;

fn index_map() -> &'static HashMap<&'static str, u16> {
    static MAP: OnceLock<HashMap<&'static str, u16>> = OnceLock::new();
    MAP.get_or_init(|| {
        wordlist()
            .iter()
            .enumerate()
            .map(|(i, w)| (*w, i as u16))
            .collect()
    })
}

/// Look up a word's 10-bit index, if it is in the wordlist.
pub fn word_index(word: &str) -> Option<u16> {
    index_map().get(word).copied()
}

/// Look up the word at a given 10-bit index.
pub fn index_word(index: u16) -> Option<&'static str> {
    wordlist().get(index as usize).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wordlist_has_1024_unique_entries() {
        let mut set = std::collections::HashSet::new();
        for w in wordlist().iter() {
            assert!(set.insert(*w), "duplicate word {}", w);
        }
        assert_eq!(set.len(), RADIX);
    }

    #[test]
    fn wordlist_prefixes_are_unique() {
        let mut prefixes = std::collections::HashSet::new();
        for w in wordlist().iter() {
            let prefix = &w[..4.min(w.len())];
            assert!(prefixes.insert(prefix), "duplicate 4-letter prefix {}", prefix);
        }
    }

    #[test]
    fn wordlist_is_sorted() {
        let words = wordlist();
        for pair in words.windows(2) {
            assert!(pair[0] < pair[1], "out of order: {} >= {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn round_trip_lookup() {
        for (i, w) in wordlist().iter().enumerate() {
            assert_eq!(word_index(w), Some(i as u16));
            assert_eq!(index_word(i as u16), Some(*w));
        }
    }
}
