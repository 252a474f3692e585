//! Substring search over compressed sequences.
//!
//! A bit-parallel shift-and automaton over the first up-to-64 pattern
//! characters filters the decoded stream; longer patterns extend filter hits
//! character by character. The symbol bitmaps of the code set prescreen
//! patterns that cannot occur without decoding anything.

use std::borrow::Cow;

use crate::codec::container::{Header, SliceSource, INDEX_PART_SIZE};
use crate::codec::{container_code_set, decompress_range};
use crate::codes::bitmaps_for;
use crate::error::SeqError;

/// 1-based position of the first occurrence of `pattern` in the decoded
/// text, or 0 when it does not occur. The empty pattern matches at 1.
pub fn strpos<S: SliceSource + ?Sized>(src: &S, pattern: &[u8]) -> Result<u32, SeqError> {
    if pattern.is_empty() {
        return Ok(1);
    }
    let header = Header::read(src)?;
    let length = header.sequence_length;
    if pattern.len() as u64 > length as u64 {
        return Ok(0);
    }
    let code = container_code_set(src, &header)?;
    let pattern: Cow<[u8]> = if code.ignore_case {
        Cow::Owned(pattern.to_ascii_uppercase())
    } else {
        Cow::Borrowed(pattern)
    };
    // Decoded symbols are 7-bit; a pattern outside that or outside the
    // code's alphabet cannot occur.
    if pattern.iter().any(|&c| c >= 128) {
        return Ok(0);
    }
    let symbols: Vec<u8> = code.words.iter().map(|w| w.symbol).collect();
    let (seq_low, seq_high) = bitmaps_for(&symbols);
    let (pat_low, pat_high) = bitmaps_for(&pattern);
    if pat_low & !seq_low != 0 || pat_high & !seq_high != 0 {
        return Ok(0);
    }

    let window = pattern.len().min(64);
    let mut masks = [0u64; 128];
    for (i, &c) in pattern[..window].iter().enumerate() {
        masks[c as usize] |= 1 << i;
    }
    let hit = 1u64 << (window - 1);

    let mut state = 0u64;
    // Filter hits still awaiting their tail, as (0-based start, matched).
    let mut partials: Vec<(u32, usize)> = Vec::new();
    let mut pos = 0u64;
    let mut start = 0u32;
    while start < length {
        let chunk_len = (length - start).min(INDEX_PART_SIZE);
        let chunk = decompress_range(src, start, chunk_len)?;
        for &c in &chunk {
            let mut k = 0;
            while k < partials.len() {
                let (at, matched) = partials[k];
                if pattern[matched] == c {
                    if matched + 1 == pattern.len() {
                        return Ok(at + 1);
                    }
                    partials[k].1 += 1;
                    k += 1;
                } else {
                    partials.remove(k);
                }
            }
            state = ((state << 1) | 1) & masks[c as usize];
            pos += 1;
            if state & hit != 0 {
                let found = (pos - window as u64) as u32;
                if pattern.len() > window {
                    partials.push((found, window));
                } else {
                    return Ok(found + 1);
                }
            }
        }
        start += chunk_len;
    }
    Ok(0)
}
