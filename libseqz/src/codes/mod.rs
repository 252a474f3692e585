//! Prefix code sets: construction, truncation and the fixed DNA tables.

pub mod builder;
pub mod fixed;

use crate::stats::SequenceInfo;

/// Symbols are 7-bit ASCII.
pub const ASCII_SIZE: usize = 128;
/// Prefix codes fit into one byte; the decoding map direct-indexes 8 bits.
pub const MAX_CODEWORD_LENGTH: u32 = 8;
/// Escape symbol (ASCII SUB) introducing a run-length triple in the stream.
pub const RLE_SYMBOL: u8 = 0x1A;
/// Runs shorter than this are emitted as literal codes.
pub const MIN_RUN_LENGTH: u32 = 8;
/// Upper bound (exclusive) on the length a single run triple can carry:
/// the 8-bit field stores `run - MIN_RUN_LENGTH`.
pub const MAX_RUN_LENGTH: u32 = 264;
/// Width of the run-length field in a run triple.
pub const RUN_LENGTH_BITS: u32 = 8;
/// Width of the back-patched swap window counter.
pub const SWAP_RUN_LENGTH_BITS: u32 = 16;
/// A swap window covers at most this many master occurrences.
pub const MAX_SWAP_RUN_LENGTH: u32 = 65535;
/// Code truncation is only attempted on sequences at least this long.
pub const MIN_LENGTH_FOR_SWAPPING: u32 = 32768;

/// One symbol of a code set. `code` is stored left-justified: the
/// `code_length` most significant bits of the byte are the prefix code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codeword {
    pub code: u8,
    pub code_length: u8,
    pub symbol: u8,
}

/// A complete prefix code.
///
/// `words` holds the master partition first (`n_symbols - n_swapped_symbols`
/// entries), then the swap partition. When `n_swapped_symbols > 0` the first
/// swap word repeats the master symbol: rare symbols sharing the master's
/// truncated prefix are encoded as the master code followed, once per swap
/// window, by a disambiguating code from the swap partition.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeSet {
    pub words: Vec<Codeword>,
    pub n_swapped_symbols: u8,
    pub max_codeword_length: u8,
    pub max_swapped_codeword_length: u8,
    pub has_equal_length: bool,
    pub is_fixed: bool,
    pub uses_rle: bool,
    pub ignore_case: bool,
    pub fixed_id: u8,
    /// Bits saved by truncation, as estimated when the swap was accepted.
    pub swap_savings: u64,
    pub ascii_bitmap_low: u64,
    pub ascii_bitmap_high: u64,
}

impl CodeSet {
    pub fn n_symbols(&self) -> usize {
        self.words.len()
    }

    /// Number of words in the master partition.
    pub fn n_master_symbols(&self) -> usize {
        self.words.len() - self.n_swapped_symbols as usize
    }

    /// The symbol whose code prefixes the swapped symbols. Only meaningful
    /// when `n_swapped_symbols > 0`.
    pub fn master_symbol(&self) -> u8 {
        self.words[self.n_master_symbols()].symbol
    }

    pub fn master_words(&self) -> &[Codeword] {
        &self.words[..self.n_master_symbols()]
    }

    pub fn swap_words(&self) -> &[Codeword] {
        &self.words[self.n_master_symbols()..]
    }

    /// Whether every symbol of `info` can be expressed by this code set,
    /// judged by symbol count and the ASCII presence bitmaps.
    pub fn covers(&self, info: &SequenceInfo) -> bool {
        if info.n_symbols() > self.n_symbols() {
            return false;
        }
        ((info.ascii_bitmap_low ^ self.ascii_bitmap_low) & info.ascii_bitmap_low) == 0
            && ((info.ascii_bitmap_high ^ self.ascii_bitmap_high) & info.ascii_bitmap_high) == 0
    }
}

/// ASCII presence bitmaps for a symbol list.
pub(crate) fn bitmaps_for(symbols: &[u8]) -> (u64, u64) {
    let mut low = 0u64;
    let mut high = 0u64;
    for &c in symbols {
        if c < 64 {
            low |= 1 << c;
        } else {
            high |= 1 << (c - 64);
        }
    }
    (low, high)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::collect_info;

    #[test]
    fn covers_checks_bitmaps_and_size() {
        let info = collect_info(b"ACGT", false, false).unwrap();
        let code = fixed::fixed_dna_codes()[1].clone();
        assert!(code.covers(&info));

        let info = collect_info(b"ACGTN", false, false).unwrap();
        assert!(!code.covers(&info));
        assert!(fixed::fixed_dna_codes()[3].covers(&info));
    }

    #[test]
    fn bitmaps_match_hand_computed_values() {
        let (low, high) = bitmaps_for(b"ACGT");
        assert_eq!(low, 0);
        assert_eq!(high, 1_048_714);
    }
}
