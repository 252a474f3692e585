//! Prefix code construction.
//!
//! Codes are built from frequency statistics: a Huffman tree over an arena of
//! nodes chained into a frequency-sorted list, codes assigned by an explicit
//! depth-first stack. Codes deeper than 8 bits cannot be represented; the
//! builder then falls back to an equal-length code. Long sequences with one
//! dominant symbol additionally get a truncation pass that shortens the most
//! frequent codeword by one bit and moves the colliding rare symbols into a
//! swap partition.

use itertools::Itertools;
use log::debug;

use crate::codec::compressed_size;
use crate::codes::{bitmaps_for, CodeSet, Codeword, MIN_LENGTH_FOR_SWAPPING};
use crate::error::SeqError;
use crate::stats::SequenceInfo;

struct Node {
    zero: u8,
    one: u8,
    symbol: u8,
    /// Arena index of the next node in the frequency-ascending list, -1 at
    /// the tail.
    next: i16,
    frequency: u32,
}

/// Codes for `symbols` (descending frequency), or `None` when the optimal
/// tree is deeper than 8 bits. Returned words parallel `symbols`.
fn huffman_words(symbols: &[u8], frequencies: &[u32; 256]) -> Option<(Vec<Codeword>, bool, u8)> {
    let n = symbols.len();
    let mut words = vec![
        Codeword {
            code: 0,
            code_length: 0,
            symbol: 0
        };
        n
    ];
    if n == 0 {
        return Some((words, false, 0));
    }

    let mut nodes: Vec<Node> = Vec::with_capacity(2 * n);
    for (i, &s) in symbols.iter().enumerate() {
        nodes.push(Node {
            zero: 0,
            one: 0,
            symbol: s,
            next: i as i16 - 1,
            frequency: frequencies[s as usize],
        });
    }

    // The list head is the least frequent leaf; merge the two head nodes and
    // reinsert the parent by linear scan until one node remains.
    let mut min = n as i32 - 1;
    loop {
        let second = nodes[min as usize].next as i32;
        if second < 0 {
            break;
        }
        let frequency = nodes[min as usize].frequency + nodes[second as usize].frequency;
        nodes.push(Node {
            zero: min as u8,
            one: second as u8,
            symbol: 0,
            next: -1,
            frequency,
        });
        let parent = nodes.len() as i32 - 1;
        min = nodes[second as usize].next as i32;
        if min >= 0 && frequency < nodes[min as usize].frequency {
            nodes[parent as usize].next = min as i16;
            min = parent;
        } else {
            let mut i = min;
            let mut pred = second;
            while i >= 0 && frequency >= nodes[i as usize].frequency {
                pred = i;
                i = nodes[i as usize].next as i32;
            }
            nodes[parent as usize].next = i as i16;
            nodes[pred as usize].next = parent as i16;
            if min < 0 {
                min = parent;
            }
        }
    }

    // Depth-first code assignment. Left-justify each code into a byte.
    let mut equal_length: i32 = -1;
    let mut max_length = 0u8;
    let mut stack: Vec<(u8, u8, u8)> = Vec::with_capacity(n + 2);
    stack.push(((nodes.len() - 1) as u8, 0, 0));
    while let Some((node, code, depth)) = stack.pop() {
        let ni = node as usize;
        if ni < n {
            words[ni] = Codeword {
                code: ((code as u16) << (8 - depth as u16)) as u8,
                code_length: depth,
                symbol: nodes[ni].symbol,
            };
            max_length = max_length.max(depth);
            if equal_length == -1 || equal_length == depth as i32 {
                equal_length = depth as i32;
            } else {
                equal_length = 0;
            }
        } else {
            if depth >= 8 {
                return None;
            }
            stack.push((nodes[ni].zero, code << 1, depth + 1));
            stack.push((nodes[ni].one, (code << 1) | 1, depth + 1));
        }
    }

    Some((words, equal_length != 0, max_length))
}

/// Optimal prefix code for the main alphabet of `info`, or `None` when it
/// would exceed 8 bits per symbol.
pub fn get_huffman_code(info: &SequenceInfo) -> Option<CodeSet> {
    let (words, has_equal_length, max_codeword_length) =
        huffman_words(&info.symbols, &info.frequencies)?;
    Some(CodeSet {
        words,
        n_swapped_symbols: 0,
        max_codeword_length,
        max_swapped_codeword_length: 0,
        has_equal_length,
        is_fixed: false,
        uses_rle: false,
        ignore_case: info.ignore_case,
        fixed_id: 0,
        swap_savings: 0,
        ascii_bitmap_low: info.ascii_bitmap_low,
        ascii_bitmap_high: info.ascii_bitmap_high,
    })
}

/// Prefix code over the run-length alphabet of `info`; requires run-length
/// statistics to be present.
pub fn get_huffman_code_rle(info: &SequenceInfo) -> Option<CodeSet> {
    let rle = info.rle.as_ref()?;
    if info.n_symbols() == 0 {
        return None;
    }
    let (words, _, max_codeword_length) = huffman_words(&rle.symbols, &rle.frequencies)?;
    Some(CodeSet {
        words,
        n_swapped_symbols: 0,
        max_codeword_length,
        max_swapped_codeword_length: 0,
        has_equal_length: false,
        is_fixed: false,
        uses_rle: true,
        ignore_case: info.ignore_case,
        fixed_id: 0,
        swap_savings: 0,
        ascii_bitmap_low: info.ascii_bitmap_low,
        ascii_bitmap_high: info.ascii_bitmap_high,
    })
}

/// Equal-length fallback: ceil(log2 n) bits for every symbol.
pub fn get_equal_lengths_code(info: &SequenceInfo) -> CodeSet {
    let n = info.n_symbols();
    let length = if n <= 1 {
        0
    } else {
        32 - (n as u32 - 1).leading_zeros()
    };
    let words = info
        .symbols
        .iter()
        .enumerate()
        .map(|(i, &symbol)| Codeword {
            code: ((i as u16) << (8 - length)) as u8,
            code_length: length as u8,
            symbol,
        })
        .collect();
    CodeSet {
        words,
        n_swapped_symbols: 0,
        max_codeword_length: length as u8,
        max_swapped_codeword_length: 0,
        has_equal_length: true,
        is_fixed: false,
        uses_rle: false,
        ignore_case: info.ignore_case,
        fixed_id: 0,
        swap_savings: 0,
        ascii_bitmap_low: info.ascii_bitmap_low,
        ascii_bitmap_high: info.ascii_bitmap_high,
    }
}

/// Tries to shorten one codeword by a bit, swapping out the rare symbols
/// whose codes share its shortened prefix. Accepts the first candidate with
/// positive estimated savings; returns `None` when no candidate saves bits.
pub fn truncate_huffman_code(code: &CodeSet, info: &SequenceInfo) -> Option<CodeSet> {
    let frequencies: &[u32; 256] = if code.uses_rle {
        &info.rle.as_ref()?.frequencies
    } else {
        &info.frequencies
    };
    let n = code.words.len();

    for i in 0..n.saturating_sub(1) {
        let master = code.words[i];
        let master_shift = (8 - master.code_length + 1) as u32;
        let prefix = (master.code as u16) >> master_shift;
        // An earlier (more frequent) word sharing the shortened prefix would
        // be torn out of both partitions; such a candidate is unusable.
        if code.words[..i]
            .iter()
            .any(|w| (w.code as u16) >> master_shift == prefix)
        {
            continue;
        }
        let subtree = (i + 1..n)
            .filter(|&j| (code.words[j].code as u16) >> master_shift == prefix)
            .collect_vec();
        if subtree.is_empty() {
            continue;
        }
        let master_frequency = frequencies[master.symbol as usize] as i64;
        let mut bits_saved = master_frequency - (master_frequency / 65535) * 17 - 16;
        for &j in &subtree {
            bits_saved -= frequencies[code.words[j].symbol as usize] as i64 * 16;
        }
        if bits_saved <= 0 {
            continue;
        }

        let truncated_length = master.code_length - 1;
        let mut words = Vec::with_capacity(n + 1);
        let mut max_codeword_length = 0u8;
        for (j, w) in code.words.iter().enumerate() {
            let word = if j == i {
                Codeword {
                    code: ((0xFFu16 << (8 - truncated_length)) & master.code as u16) as u8,
                    code_length: truncated_length,
                    symbol: master.symbol,
                }
            } else if (w.code as u16) >> master_shift != prefix {
                *w
            } else {
                continue;
            };
            max_codeword_length = max_codeword_length.max(word.code_length);
            words.push(word);
        }

        words.push(Codeword {
            code: ((master.code as u16) << truncated_length) as u8,
            code_length: 1,
            symbol: master.symbol,
        });
        let mut max_swapped_codeword_length = 0u8;
        for &j in &subtree {
            let w = code.words[j];
            let word = Codeword {
                code: ((w.code as u16) << truncated_length) as u8,
                code_length: w.code_length - master.code_length + 1,
                symbol: w.symbol,
            };
            max_swapped_codeword_length = max_swapped_codeword_length.max(word.code_length);
            words.push(word);
        }

        debug!(
            "truncating code of symbol {:?}: {} swapped symbols, ~{} bits saved",
            master.symbol as char,
            subtree.len() + 1,
            bits_saved
        );
        return Some(CodeSet {
            words,
            n_swapped_symbols: subtree.len() as u8 + 1,
            max_codeword_length,
            max_swapped_codeword_length,
            has_equal_length: false,
            is_fixed: false,
            uses_rle: code.uses_rle,
            ignore_case: code.ignore_case,
            fixed_id: 0,
            swap_savings: bits_saved as u64,
            ascii_bitmap_low: code.ascii_bitmap_low,
            ascii_bitmap_high: code.ascii_bitmap_high,
        });
    }
    None
}

/// Best code for `info`: the Huffman code (truncated when profitable on long
/// sequences) or the equal-length fallback, compared against the run-length
/// variant by exact compressed size when run statistics are available.
pub fn get_optimal_code(info: &SequenceInfo) -> Result<CodeSet, SeqError> {
    let mut code = match get_huffman_code(info) {
        Some(mut huffman) => {
            if info.sequence_length >= MIN_LENGTH_FOR_SWAPPING {
                if let Some(truncated) = truncate_huffman_code(&huffman, info) {
                    huffman = truncated;
                }
            }
            huffman
        }
        None => get_equal_lengths_code(info),
    };

    if info.rle.is_some() {
        if let Some(mut rle_code) = get_huffman_code_rle(info) {
            if info.sequence_length >= MIN_LENGTH_FOR_SWAPPING {
                if let Some(truncated) = truncate_huffman_code(&rle_code, info) {
                    rle_code = truncated;
                }
            }
            let plain_size = compressed_size(info, &code)?;
            let rle_size = compressed_size(info, &rle_code)?;
            debug!("plain code: {plain_size} bytes, rle code: {rle_size} bytes");
            if plain_size >= rle_size {
                code = rle_code;
            }
        }
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::collect_info;

    fn info_from(freq_pairs: &[(u8, u32)]) -> SequenceInfo {
        let mut input = Vec::new();
        for &(c, f) in freq_pairs {
            input.extend(std::iter::repeat(c).take(f as usize));
        }
        collect_info(&input, false, false).unwrap()
    }

    fn word_for(code: &CodeSet, symbol: u8) -> Codeword {
        *code.words.iter().find(|w| w.symbol == symbol).unwrap()
    }

    #[test]
    fn huffman_lengths_follow_frequencies() {
        let info = info_from(&[(b'A', 5), (b'C', 2), (b'G', 1), (b'T', 1)]);
        let code = get_huffman_code(&info).unwrap();
        assert_eq!(word_for(&code, b'A').code_length, 1);
        assert_eq!(word_for(&code, b'C').code_length, 2);
        assert_eq!(word_for(&code, b'G').code_length, 3);
        assert_eq!(word_for(&code, b'T').code_length, 3);
        assert_eq!(code.max_codeword_length, 3);
        assert!(!code.has_equal_length);
    }

    #[test]
    fn codes_are_prefix_free() {
        let info = info_from(&[(b'A', 40), (b'C', 20), (b'G', 10), (b'T', 5), (b'N', 1)]);
        let code = get_huffman_code(&info).unwrap();
        for (a, b) in code.words.iter().tuple_combinations() {
            let shorter = a.code_length.min(b.code_length) as u32;
            assert_ne!(
                (a.code as u16) >> (8 - shorter),
                (b.code as u16) >> (8 - shorter),
                "{a:?} prefixes {b:?}"
            );
        }
    }

    #[test]
    fn single_symbol_gets_empty_code() {
        let info = info_from(&[(b'A', 100)]);
        let code = get_huffman_code(&info).unwrap();
        assert_eq!(code.words.len(), 1);
        assert_eq!(code.words[0].code_length, 0);
        assert!(!code.has_equal_length);
    }

    #[test]
    fn uniform_frequencies_give_equal_lengths() {
        let info = info_from(&[(b'A', 4), (b'C', 4), (b'G', 4), (b'T', 4)]);
        let code = get_huffman_code(&info).unwrap();
        assert!(code.has_equal_length);
        assert!(code.words.iter().all(|w| w.code_length == 2));
    }

    #[test]
    fn deep_tree_falls_back_to_equal_lengths() {
        // Fibonacci-like frequencies force a degenerate tree deeper than 8.
        let mut pairs = Vec::new();
        let (mut a, mut b) = (1u32, 1u32);
        for c in 0..12u8 {
            pairs.push((b'A' + c, a));
            let next = a + b;
            a = b;
            b = next;
        }
        let info = info_from(&pairs);
        assert!(get_huffman_code(&info).is_none());
        let code = get_equal_lengths_code(&info);
        assert!(code.has_equal_length);
        assert!(code.words.iter().all(|w| w.code_length == 4));
        assert_eq!(code.words.len(), 12);
    }

    #[test]
    fn truncation_swaps_rare_symbols() {
        let info = info_from(&[(b'A', 150_000), (b'C', 10), (b'G', 9), (b'T', 8)]);
        let code = get_huffman_code(&info).unwrap();
        let truncated = truncate_huffman_code(&code, &info).unwrap();
        // 'A' has a one-bit code; its empty truncated prefix swallows the
        // whole alphabet into the swap partition.
        assert_eq!(truncated.n_swapped_symbols as usize + 1, truncated.n_symbols());
        assert_eq!(truncated.master_symbol(), b'A');
        assert!(truncated.swap_savings > 100_000);
        assert_eq!(truncated.words[truncated.n_master_symbols()].code_length, 1);
    }

    #[test]
    fn huffman_never_loses_to_the_equal_length_fallback() {
        let info = info_from(&[(b'A', 120), (b'C', 40), (b'G', 9), (b'T', 3), (b'N', 1)]);
        let huffman = get_huffman_code(&info).unwrap();
        let equal = get_equal_lengths_code(&info);
        let weighted = |code: &CodeSet| -> u64 {
            code.words
                .iter()
                .map(|w| info.frequencies[w.symbol as usize] as u64 * w.code_length as u64)
                .sum()
        };
        assert!(weighted(&huffman) <= weighted(&equal));
    }

    #[test]
    fn accepted_truncation_shrinks_the_container() {
        let info = info_from(&[(b'A', 150_000), (b'C', 10), (b'G', 9), (b'T', 8)]);
        let code = get_huffman_code(&info).unwrap();
        let truncated = truncate_huffman_code(&code, &info).unwrap();
        assert!(
            compressed_size(&info, &truncated).unwrap() < compressed_size(&info, &code).unwrap()
        );
    }

    #[test]
    fn truncation_rejected_without_savings() {
        let info = info_from(&[(b'A', 40), (b'C', 20), (b'G', 10)]);
        let code = get_huffman_code(&info).unwrap();
        assert!(truncate_huffman_code(&code, &info).is_none());
    }

    #[test]
    fn optimal_code_prefers_rle_for_runs() {
        let mut input = Vec::new();
        for _ in 0..200 {
            input.extend_from_slice(&[b'A'; 100]);
            input.extend_from_slice(b"CGT");
        }
        let info = collect_info(&input, false, true).unwrap();
        let code = get_optimal_code(&info).unwrap();
        assert!(code.uses_rle);
    }

    #[test]
    fn optimal_code_skips_rle_when_runs_are_too_rare() {
        // One minimal run in an otherwise run-free input: the escape symbol
        // costs more than the single run triple saves.
        let mut input: Vec<u8> = (0..4000).map(|i| b"ACGT"[i % 4]).collect();
        input.extend_from_slice(&[b'A'; 8]);
        let info = collect_info(&input, false, true).unwrap();
        let code = get_optimal_code(&info).unwrap();
        assert!(!code.uses_rle);
    }

    #[test]
    fn optimal_code_ties_go_to_rle() {
        // No runs at all: the run-length statistics equal the plain ones and
        // the sizes tie.
        let input: Vec<u8> = (0..4000).map(|i| b"ACGT"[i % 4]).collect();
        let info = collect_info(&input, false, true).unwrap();
        let code = get_optimal_code(&info).unwrap();
        assert!(code.uses_rle);
    }
}
