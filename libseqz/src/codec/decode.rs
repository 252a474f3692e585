//! Stream decoders.
//!
//! Each routine decodes `out.len()` characters starting at character `start`,
//! optionally resuming from a sparse index checkpoint. Without a checkpoint
//! the skip loop walks the stream from the beginning; equal-length codes seek
//! in closed form instead. Fetch sizes are conservative upper bounds; the
//! underlying [`SliceSource`] clamps them and the bit reader zero-pads.

use crate::codec::bits::{BitTap, DecodeMap};
use crate::codec::container::{IndexEntry, SliceSource, INDEX_PART_SIZE};
use crate::codes::{CodeSet, MIN_RUN_LENGTH, RLE_SYMBOL, RUN_LENGTH_BITS, SWAP_RUN_LENGTH_BITS};
use crate::error::SeqError;

/// Characters to skip after positioning: from an index entry, the offset
/// within its part; otherwise the whole prefix of the sequence.
fn skip_count(start: u32, entry: Option<&IndexEntry>) -> i64 {
    match entry {
        None => start as i64 - 1,
        Some(_) => ((start as i64 + 1) % INDEX_PART_SIZE as i64) - 1,
    }
}

fn open_tap<'a, S: SliceSource + ?Sized>(
    src: &'a S,
    stream_offset: usize,
    entry: Option<&IndexEntry>,
    n_words: usize,
) -> BitTap<'a> {
    match entry {
        None => BitTap::new(src.fetch(stream_offset, n_words * 8)),
        Some(e) => {
            let mut tap = BitTap::new(src.fetch(stream_offset + e.block as usize * 8, n_words * 8));
            tap.seek_bits(e.bit as u32);
            tap
        }
    }
}

/// Characters the fetch must cover: the requested window plus the skip
/// distance to it.
fn span(start: u32, out_len: usize, entry: Option<&IndexEntry>) -> u64 {
    match entry {
        None => start as u64 + out_len as u64,
        Some(e) => (start % INDEX_PART_SIZE) as u64 + e.rle_shift as u64 + out_len as u64,
    }
}

pub(crate) fn decode_plain<S: SliceSource + ?Sized>(
    src: &S,
    stream_offset: usize,
    code: &CodeSet,
    start: u32,
    entry: Option<IndexEntry>,
    out: &mut [u8],
) -> Result<(), SeqError> {
    let map = DecodeMap::masters(code);

    if code.has_equal_length {
        let code_length = code.words.first().map_or(0, |w| w.code_length) as u64;
        let bits_to_skip = start as u64 * code_length;
        let first_word = (bits_to_skip / 64) as usize;
        let n_words = ((bits_to_skip + out.len() as u64 * code_length) / 64 + 1) as usize
            - first_word;
        let mut tap = BitTap::new(src.fetch(stream_offset + first_word * 8, n_words * 8));
        tap.seek_bits((bits_to_skip % 64) as u32);
        for slot in out.iter_mut() {
            *slot = tap.decode(&map)?;
        }
        return Ok(());
    }

    let n_words = (span(start, out.len(), entry.as_ref()) * code.max_codeword_length as u64 / 64
        + 1) as usize;
    let mut tap = open_tap(src, stream_offset, entry.as_ref(), n_words);
    let mut i = skip_count(start, entry.as_ref());
    while i >= 0 {
        tap.decode(&map)?;
        i -= 1;
    }
    for slot in out.iter_mut() {
        *slot = tap.decode(&map)?;
    }
    Ok(())
}

pub(crate) fn decode_rle<S: SliceSource + ?Sized>(
    src: &S,
    stream_offset: usize,
    code: &CodeSet,
    start: u32,
    entry: Option<IndexEntry>,
    out: &mut [u8],
) -> Result<(), SeqError> {
    let map = DecodeMap::masters(code);
    let n_words = (((span(start, out.len(), entry.as_ref()) + 1)
        * code.max_codeword_length as u64
        + RUN_LENGTH_BITS as u64)
        / 64
        + 1) as usize;
    let mut tap = open_tap(src, stream_offset, entry.as_ref(), n_words);
    let mut i = skip_count(start, entry.as_ref())
        + entry.as_ref().map_or(0, |e| e.rle_shift as i64);

    while i >= 0 {
        let symbol = tap.decode(&map)?;
        i -= 1;
        if symbol == RLE_SYMBOL {
            let repeated = tap.read_bits(RUN_LENGTH_BITS) as i64;
            i -= repeated + MIN_RUN_LENGTH as i64 - 2;
        }
    }

    let mut at = 0usize;
    if i < -1 {
        // The skip overshot into a run triple; its remainder opens the
        // output window.
        let mut repeated = (-i) as usize;
        if repeated > out.len() {
            repeated = out.len();
        }
        let symbol = tap.decode(&map)?;
        i -= 1;
        out[..repeated].fill(symbol);
        at = repeated;
    }

    i += out.len() as i64;
    while i >= 0 {
        let symbol = tap.decode(&map)?;
        if symbol != RLE_SYMBOL {
            out[at] = symbol;
            at += 1;
            i -= 1;
        } else {
            let mut repeated = tap.read_bits(RUN_LENGTH_BITS) as i64;
            let symbol = tap.decode(&map)?;
            repeated += MIN_RUN_LENGTH as i64;
            i -= repeated;
            if i < -1 {
                repeated -= -i - 1;
            }
            out[at..at + repeated as usize].fill(symbol);
            at += repeated as usize;
        }
    }
    Ok(())
}

pub(crate) fn decode_swap<S: SliceSource + ?Sized>(
    src: &S,
    stream_offset: usize,
    code: &CodeSet,
    start: u32,
    entry: Option<IndexEntry>,
    out: &mut [u8],
) -> Result<(), SeqError> {
    let map = DecodeMap::masters(code);
    let swap_map = DecodeMap::swapped(code);
    let master = code.master_symbol();
    let bits_per_char = code.max_codeword_length as u64
        + code.max_swapped_codeword_length as u64
        + SWAP_RUN_LENGTH_BITS as u64;
    let n_words = (span(start, out.len(), entry.as_ref()) * bits_per_char / 64 + 1) as usize;

    let mut tap;
    let mut counter: i64;
    match entry.as_ref() {
        None => {
            tap = BitTap::new(src.fetch(stream_offset, n_words * 8));
            counter = tap.take_swap_counter();
        }
        Some(e) => {
            tap = open_tap(src, stream_offset, entry.as_ref(), n_words);
            counter = e.swap_shift as i64;
        }
    }

    let mut i = skip_count(start, entry.as_ref());
    while i >= 0 {
        let symbol = tap.decode(&map)?;
        i -= 1;
        if symbol == master {
            counter -= 1;
            if counter < 0 {
                tap.decode(&swap_map)?;
                counter = tap.read_bits(SWAP_RUN_LENGTH_BITS) as i64;
            }
        }
    }

    for slot in out.iter_mut() {
        let symbol = tap.decode(&map)?;
        if symbol != master {
            *slot = symbol;
        } else if counter > 0 {
            *slot = master;
            counter -= 1;
        } else {
            *slot = tap.decode(&swap_map)?;
            counter = tap.read_bits(SWAP_RUN_LENGTH_BITS) as i64;
        }
    }
    Ok(())
}

pub(crate) fn decode_swap_rle<S: SliceSource + ?Sized>(
    src: &S,
    stream_offset: usize,
    code: &CodeSet,
    start: u32,
    entry: Option<IndexEntry>,
    out: &mut [u8],
) -> Result<(), SeqError> {
    let map = DecodeMap::masters(code);
    let swap_map = DecodeMap::swapped(code);
    let master = code.master_symbol();
    let bits_per_char = code.max_codeword_length as u64
        + code.max_swapped_codeword_length as u64
        + SWAP_RUN_LENGTH_BITS as u64;
    let n_words = (((span(start, out.len(), entry.as_ref()) + 1) * bits_per_char
        + RUN_LENGTH_BITS as u64)
        / 64
        + 1) as usize;

    let mut tap;
    let mut counter: i64;
    match entry.as_ref() {
        None => {
            tap = BitTap::new(src.fetch(stream_offset, n_words * 8));
            counter = tap.take_swap_counter();
        }
        Some(e) => {
            tap = open_tap(src, stream_offset, entry.as_ref(), n_words);
            counter = e.swap_shift as i64;
        }
    }

    // Resolves one master-partition symbol, consulting the swap partition
    // when the window is exhausted.
    macro_rules! resolve {
        ($symbol:ident) => {
            if $symbol == master {
                counter -= 1;
                if counter < 0 {
                    $symbol = tap.decode(&swap_map)?;
                    counter = tap.read_bits(SWAP_RUN_LENGTH_BITS) as i64;
                }
            }
        };
    }

    let mut i = skip_count(start, entry.as_ref())
        + entry.as_ref().map_or(0, |e| e.rle_shift as i64);
    while i >= 0 {
        let mut symbol = tap.decode(&map)?;
        i -= 1;
        resolve!(symbol);
        if symbol == RLE_SYMBOL {
            let repeated = tap.read_bits(RUN_LENGTH_BITS) as i64;
            i -= repeated + MIN_RUN_LENGTH as i64 - 2;
        }
    }

    let mut at = 0usize;
    if i < -1 {
        let mut repeated = (-i) as usize;
        if repeated > out.len() {
            repeated = out.len();
        }
        let mut symbol = tap.decode(&map)?;
        i -= 1;
        resolve!(symbol);
        out[..repeated].fill(symbol);
        at = repeated;
    }

    i += out.len() as i64;
    while i >= 0 {
        let mut symbol = tap.decode(&map)?;
        resolve!(symbol);
        if symbol != RLE_SYMBOL {
            out[at] = symbol;
            at += 1;
            i -= 1;
        } else {
            let mut repeated = tap.read_bits(RUN_LENGTH_BITS) as i64;
            let mut character = tap.decode(&map)?;
            resolve!(character);
            repeated += MIN_RUN_LENGTH as i64;
            i -= repeated;
            if i < -1 {
                repeated -= -i - 1;
            }
            out[at..at + repeated as usize].fill(character);
            at += repeated as usize;
        }
    }
    Ok(())
}
