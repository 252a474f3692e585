//! Single-pass sequence analysis.
//!
//! Everything the code builders need is collected in one scan: per-symbol
//! frequencies, the alphabet ordered by descending frequency, ASCII presence
//! bitmaps, and (optionally) run-length statistics where runs of at least
//! [`MIN_RUN_LENGTH`](crate::codes::MIN_RUN_LENGTH) repeated characters are
//! folded into occurrences of the run-length escape symbol.

use log::trace;

use crate::codes::{ASCII_SIZE, MAX_RUN_LENGTH, MIN_RUN_LENGTH, RLE_SYMBOL};
use crate::codec::container::MAX_SEQUENCE_LENGTH;
use crate::error::SeqError;

/// Run-length statistics: frequencies as seen by a run-length-aware encoder,
/// where each full run block counts once for the escape symbol and once for
/// the repeated character.
#[derive(Debug, Clone)]
pub struct RleInfo {
    pub frequencies: [u32; 256],
    /// Symbols with non-zero run-length frequency, descending by frequency.
    pub symbols: Vec<u8>,
}

/// Result of analysing an input sequence.
#[derive(Debug, Clone)]
pub struct SequenceInfo {
    pub sequence_length: u32,
    pub frequencies: [u32; 256],
    /// Symbols present in the input, descending by frequency.
    pub symbols: Vec<u8>,
    /// Presence bitmap for ASCII 0..=63 (bit `c`).
    pub ascii_bitmap_low: u64,
    /// Presence bitmap for ASCII 64..=127 (bit `c - 64`).
    pub ascii_bitmap_high: u64,
    pub ignore_case: bool,
    pub rle: Option<RleInfo>,
}

impl SequenceInfo {
    pub fn n_symbols(&self) -> usize {
        self.symbols.len()
    }
}

#[inline]
fn fold_case(c: u8) -> u8 {
    if c.is_ascii_lowercase() {
        c - 32
    } else {
        c
    }
}

/// Rejects bytes the format cannot carry: NUL (used nowhere and reserved),
/// UTF-8 multibyte lead bytes, and anything outside 7-bit ASCII.
fn check_ascii(frequencies: &[u32; 256]) -> Result<(), SeqError> {
    if frequencies[0] > 0 {
        return Err(SeqError::AlphabetViolation("NUL byte".to_string()));
    }
    if frequencies[194..=244].iter().any(|&f| f > 0) {
        return Err(SeqError::AlphabetViolation(
            "multibyte character".to_string(),
        ));
    }
    if let Some(c) = (ASCII_SIZE..256).find(|&c| frequencies[c] > 0) {
        return Err(SeqError::AlphabetViolation(format!("byte 0x{c:02X}")));
    }
    Ok(())
}

/// Extracts the symbols with non-zero frequency in descending frequency
/// order, via an array max-heap, and computes the ASCII presence bitmaps.
fn collect_alphabet(frequencies: &[u32; 256]) -> (Vec<u8>, u64, u64) {
    let mut heap: Vec<u8> = Vec::with_capacity(ASCII_SIZE);
    let mut low = 0u64;
    let mut high = 0u64;

    for c in 0..ASCII_SIZE as u8 {
        if frequencies[c as usize] == 0 {
            continue;
        }
        if c < 64 {
            low |= 1 << c;
        } else {
            high |= 1 << (c - 64);
        }
        heap.push(c);
        let mut i = heap.len() - 1;
        while i > 0 {
            let parent = (i - 1) / 2;
            if frequencies[heap[i] as usize] > frequencies[heap[parent] as usize] {
                heap.swap(i, parent);
                i = parent;
            } else {
                break;
            }
        }
    }

    let n = heap.len();
    let mut symbols = Vec::with_capacity(n);
    for _ in 0..n {
        symbols.push(heap[0]);
        let last = heap.pop().unwrap();
        if heap.is_empty() {
            break;
        }
        heap[0] = last;
        let mut i = 0;
        loop {
            let left = 2 * i + 1;
            let right = 2 * i + 2;
            let mut largest = i;
            if left < heap.len()
                && frequencies[heap[left] as usize] > frequencies[heap[largest] as usize]
            {
                largest = left;
            }
            if right < heap.len()
                && frequencies[heap[right] as usize] > frequencies[heap[largest] as usize]
            {
                largest = right;
            }
            if largest == i {
                break;
            }
            heap.swap(i, largest);
            i = largest;
        }
    }

    (symbols, low, high)
}

/// Attributes a finished run of `repeated` copies of `recent` to the
/// run-length frequency table. Full blocks of `MAX_RUN_LENGTH - 1` count the
/// escape symbol and the repeated character once each; a remainder shorter
/// than `MIN_RUN_LENGTH` stays literal.
fn attribute_run(rle_frequencies: &mut [u32; 256], recent: u8, repeated: u32) {
    let block = MAX_RUN_LENGTH - 1;
    if repeated < MIN_RUN_LENGTH {
        rle_frequencies[recent as usize] += repeated;
        return;
    }
    let blocks = repeated / block;
    let remainder = repeated % block;
    rle_frequencies[RLE_SYMBOL as usize] += blocks;
    rle_frequencies[recent as usize] += blocks;
    if remainder >= MIN_RUN_LENGTH {
        rle_frequencies[RLE_SYMBOL as usize] += 1;
        rle_frequencies[recent as usize] += 1;
    } else {
        rle_frequencies[recent as usize] += remainder;
    }
}

/// Analyses `input` in a single pass.
///
/// With `ignore_case`, lowercase letters are folded onto their uppercase
/// counterparts before counting. With `with_rle`, run-length statistics are
/// collected alongside and attached as [`RleInfo`].
pub fn collect_info(
    input: &[u8],
    ignore_case: bool,
    with_rle: bool,
) -> Result<SequenceInfo, SeqError> {
    if input.len() as u64 >= MAX_SEQUENCE_LENGTH {
        return Err(SeqError::LengthLimitExceeded(input.len() as u64));
    }

    let mut frequencies = [0u32; 256];
    let mut rle = None;

    if with_rle {
        let mut rle_frequencies = [0u32; 256];
        let mut chars = input.iter();
        if let Some(&first) = chars.next() {
            let mut recent = if ignore_case { fold_case(first) } else { first };
            frequencies[recent as usize] += 1;
            let mut repeated: u32 = 0;
            for &c in chars {
                let current = if ignore_case { fold_case(c) } else { c };
                frequencies[current as usize] += 1;
                repeated += 1;
                if current != recent {
                    attribute_run(&mut rle_frequencies, recent, repeated);
                    recent = current;
                    repeated = 0;
                }
            }
            repeated += 1;
            attribute_run(&mut rle_frequencies, recent, repeated);
        }
        check_ascii(&frequencies)?;
        let (symbols, _, _) = collect_alphabet(&rle_frequencies);
        rle = Some(RleInfo {
            frequencies: rle_frequencies,
            symbols,
        });
    } else {
        for &c in input {
            frequencies[c as usize] += 1;
        }
        check_ascii(&frequencies)?;
        if ignore_case {
            for c in b'a'..=b'z' {
                frequencies[(c - 32) as usize] += frequencies[c as usize];
                frequencies[c as usize] = 0;
            }
        }
    }

    let (symbols, ascii_bitmap_low, ascii_bitmap_high) = collect_alphabet(&frequencies);
    trace!(
        "collected {} symbols over {} chars (rle: {})",
        symbols.len(),
        input.len(),
        rle.is_some()
    );

    Ok(SequenceInfo {
        sequence_length: input.len() as u32,
        frequencies,
        symbols,
        ascii_bitmap_low,
        ascii_bitmap_high,
        ignore_case,
        rle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_ordered_by_descending_frequency() {
        let info = collect_info(b"AAAAACCCGT", false, false).unwrap();
        assert_eq!(info.symbols, vec![b'A', b'C', b'G', b'T']);
        assert_eq!(info.frequencies[b'A' as usize], 5);
        assert_eq!(info.frequencies[b'T' as usize], 1);
        assert_eq!(info.sequence_length, 10);
    }

    #[test]
    fn bitmaps_mark_present_symbols() {
        let info = collect_info(b"AC!", false, false).unwrap();
        assert_eq!(info.ascii_bitmap_low, 1 << b'!');
        assert_eq!(
            info.ascii_bitmap_high,
            (1 << (b'A' - 64)) | (1 << (b'C' - 64))
        );
    }

    #[test]
    fn nul_and_non_ascii_rejected() {
        assert!(matches!(
            collect_info(b"AC\x00GT", false, false),
            Err(SeqError::AlphabetViolation(_))
        ));
        assert!(matches!(
            collect_info("ACGTé".as_bytes(), false, false),
            Err(SeqError::AlphabetViolation(_))
        ));
        assert!(matches!(
            collect_info(&[b'A', 0x80], false, false),
            Err(SeqError::AlphabetViolation(_))
        ));
    }

    #[test]
    fn case_folding() {
        let info = collect_info(b"acgtACGT", true, false).unwrap();
        assert_eq!(info.frequencies[b'A' as usize], 2);
        assert_eq!(info.frequencies[b'a' as usize], 0);
        assert_eq!(info.n_symbols(), 4);
        assert!(info.ignore_case);
    }

    #[test]
    fn short_runs_stay_literal() {
        let info = collect_info(b"AAAACCCC", false, true).unwrap();
        let rle = info.rle.as_ref().unwrap();
        assert_eq!(rle.frequencies[RLE_SYMBOL as usize], 0);
        assert_eq!(rle.frequencies[b'A' as usize], 4);
        assert_eq!(rle.frequencies[b'C' as usize], 4);
    }

    #[test]
    fn long_run_counts_escape() {
        let input = vec![b'A'; 10];
        let info = collect_info(&input, false, true).unwrap();
        let rle = info.rle.as_ref().unwrap();
        assert_eq!(rle.frequencies[RLE_SYMBOL as usize], 1);
        assert_eq!(rle.frequencies[b'A' as usize], 1);
    }

    #[test]
    fn run_blocks_split_at_cap() {
        // 300 = one full block of 263 plus a remainder of 37, itself a run.
        let input = vec![b'G'; 300];
        let info = collect_info(&input, false, true).unwrap();
        let rle = info.rle.as_ref().unwrap();
        assert_eq!(rle.frequencies[RLE_SYMBOL as usize], 2);
        assert_eq!(rle.frequencies[b'G' as usize], 2);
    }

    #[test]
    fn run_remainder_below_minimum_stays_literal() {
        // 270 = block of 263 plus 7 literal characters.
        let input = vec![b'G'; 270];
        let info = collect_info(&input, false, true).unwrap();
        let rle = info.rle.as_ref().unwrap();
        assert_eq!(rle.frequencies[RLE_SYMBOL as usize], 1);
        assert_eq!(rle.frequencies[b'G' as usize], 8);
    }

    #[test]
    fn empty_input_is_accepted() {
        let info = collect_info(b"", false, true).unwrap();
        assert_eq!(info.n_symbols(), 0);
        assert_eq!(info.sequence_length, 0);
        assert!(info.rle.unwrap().symbols.is_empty());
    }
}
