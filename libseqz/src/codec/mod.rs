//! Compression and random-access decompression of sequences.

pub mod container;

pub(crate) mod bits;
pub(crate) mod decode;
pub(crate) mod encode;

use std::borrow::Cow;

use log::trace;

use crate::codec::container::{
    align8, CompressedSequence, Header, IndexEntry, SliceSource, CODEWORD_SIZE, HEADER_SIZE,
    INDEX_ENTRY_SIZE, INDEX_PART_SIZE, MAX_COMPRESSED_SIZE,
};
use crate::codec::encode::IndexWriter;
use crate::codes::builder::get_optimal_code;
use crate::codes::fixed::{fixed_dna_codes, N_FIXED_DNA_CODES};
use crate::codes::{CodeSet, Codeword, MAX_CODEWORD_LENGTH, RLE_SYMBOL};
use crate::error::SeqError;
use crate::stats::{collect_info, SequenceInfo};

/// Exact container size for compressing a sequence with `info` using `code`.
pub fn compressed_size(info: &SequenceInfo, code: &CodeSet) -> Result<usize, SeqError> {
    if info.n_symbols() > code.n_symbols() {
        return Err(SeqError::CodeSetMismatch);
    }
    let frequencies: &[u32; 256] = if code.uses_rle {
        &info.rle.as_ref().ok_or(SeqError::CodeSetMismatch)?.frequencies
    } else {
        &info.frequencies
    };

    let mut bits: u64 = 0;
    if code.uses_rle {
        bits += frequencies[RLE_SYMBOL as usize] as u64 * 8;
    }
    if code.n_swapped_symbols > 0 && !code.is_fixed {
        let master = code.master_symbol();
        let mut master_bits: u64 = 0;
        for w in code.master_words() {
            bits += frequencies[w.symbol as usize] as u64 * w.code_length as u64;
            if w.symbol == master {
                master_bits = w.code_length as u64 + 16;
            }
        }
        for w in &code.swap_words()[1..] {
            bits += frequencies[w.symbol as usize] as u64 * (w.code_length as u64 + master_bits);
        }
        bits += 16;
        bits += (frequencies[master as usize] as u64 / 65535) * 17;
    } else {
        for w in &code.words {
            bits += frequencies[w.symbol as usize] as u64 * w.code_length as u64;
        }
    }
    bits = (bits + 63) & !63;

    let mut total = HEADER_SIZE
        + if code.is_fixed {
            0
        } else {
            code.n_symbols() * CODEWORD_SIZE
        }
        + if code.has_equal_length {
            0
        } else {
            (info.sequence_length / INDEX_PART_SIZE) as usize * INDEX_ENTRY_SIZE
        };
    total = align8(total);
    total += (bits / 8) as usize;

    if total > MAX_COMPRESSED_SIZE {
        return Err(SeqError::LengthLimitExceeded(total as u64));
    }
    Ok(total)
}

/// Encodes `input` with `code` into a container of exactly `total` bytes.
pub(crate) fn encode_with(
    input: &[u8],
    code: &CodeSet,
    sequence_length: u32,
    total: usize,
) -> Result<CompressedSequence, SeqError> {
    let has_index = !code.has_equal_length && sequence_length >= INDEX_PART_SIZE;
    let header = Header {
        total_size: total as u32,
        sequence_length,
        n_symbols: if code.is_fixed {
            0
        } else {
            code.n_symbols() as u8
        },
        n_swapped_symbols: if code.is_fixed {
            code.fixed_id
        } else {
            code.n_swapped_symbols
        },
        has_equal_length: code.has_equal_length,
        has_index,
        is_fixed: code.is_fixed,
        uses_rle: code.uses_rle,
    };

    let mut bytes = vec![0u8; total];
    header.write(&mut bytes[..HEADER_SIZE]);
    if !code.is_fixed {
        for (k, w) in code.words.iter().enumerate() {
            let at = HEADER_SIZE + k * CODEWORD_SIZE;
            bytes[at] = w.code;
            bytes[at + 1] = w.code_length;
            bytes[at + 2] = w.symbol;
        }
    }

    let stream_offset = header.stream_offset();
    let mut sink = bits::BitSink::new((total - stream_offset) / 8);
    let mut index = has_index.then(|| IndexWriter::new(header.n_index_entries()));

    match (code.n_swapped_symbols > 0, code.uses_rle) {
        (false, false) => encode::encode_plain(input, code, &mut sink, index.as_mut())?,
        (false, true) => encode::encode_rle(input, code, &mut sink, index.as_mut())?,
        (true, false) => encode::encode_swap(input, code, &mut sink, index.as_mut())?,
        (true, true) => encode::encode_swap_rle(input, code, &mut sink, index.as_mut())?,
    }

    if let Some(index) = index {
        let base = HEADER_SIZE + header.table_size();
        for (k, entry) in index.into_entries().iter().enumerate() {
            entry.write(&mut bytes[base + k * INDEX_ENTRY_SIZE..]);
        }
    }
    for (k, word) in sink.into_words().iter().enumerate() {
        let at = stream_offset + k * 8;
        bytes[at..at + 8].copy_from_slice(&word.to_le_bytes());
    }
    trace!(
        "encoded {} chars into {} bytes (index: {})",
        sequence_length,
        total,
        has_index
    );
    Ok(CompressedSequence::from_raw(bytes))
}

/// Compresses `input` with a caller-chosen code set. `info` must come from
/// analysing the same input.
pub fn compress(
    input: &[u8],
    code: &CodeSet,
    info: &SequenceInfo,
) -> Result<CompressedSequence, SeqError> {
    let total = compressed_size(info, code)?;
    encode_with(input, code, info.sequence_length, total)
}

/// Analyses `input` and compresses it with the best available code.
pub fn compress_auto(
    input: &[u8],
    ignore_case: bool,
    with_rle: bool,
) -> Result<CompressedSequence, SeqError> {
    let info = collect_info(input, ignore_case, with_rle)?;
    let code = get_optimal_code(&info)?;
    compress(input, &code, &info)
}

/// Alphabet restriction for DNA compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DnaAlphabet {
    /// No restriction; fixed codes still apply when cheaper.
    #[default]
    Unrestricted,
    /// Exactly A, C, G, T (either case).
    Exact,
    /// The IUPAC ambiguity alphabet.
    Iupac,
    /// Arbitrary ASCII; never uses a fixed code.
    Ascii,
}

/// Speed/size trade-off for DNA compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DnaStrategy {
    #[default]
    Default,
    /// Prefer fixed codes regardless of length.
    Short,
    /// Collect run-length statistics, for reference-style sequences.
    Reference,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DnaOptions {
    pub case_sensitive: bool,
    pub alphabet: DnaAlphabet,
    pub strategy: DnaStrategy,
}

/// DNA-aware compression: validates the alphabet restriction, short-cuts to
/// the cheapest covering fixed code for short or speed-sensitive inputs, and
/// otherwise builds an optimal code.
pub fn compress_dna(input: &[u8], options: DnaOptions) -> Result<CompressedSequence, SeqError> {
    let with_rle = options.strategy == DnaStrategy::Reference;
    let info = collect_info(input, !options.case_sensitive, with_rle)?;
    let fixed = fixed_dna_codes();

    match options.alphabet {
        DnaAlphabet::Exact => {
            if !fixed[1].covers(&info) {
                return Err(SeqError::AlphabetViolation(
                    "not a four-letter DNA sequence".to_string(),
                ));
            }
        }
        DnaAlphabet::Iupac => {
            if !fixed[3].covers(&info) {
                return Err(SeqError::AlphabetViolation(
                    "not an IUPAC DNA sequence".to_string(),
                ));
            }
        }
        _ => {}
    }

    let prefer_fixed = options.alphabet == DnaAlphabet::Exact
        || ((input.len() < 128 || options.strategy == DnaStrategy::Short)
            && options.alphabet != DnaAlphabet::Ascii);
    if prefer_fixed {
        let mut id = match (options.alphabet != DnaAlphabet::Exact, options.case_sensitive) {
            (true, true) => 3,
            (true, false) => 2,
            (false, true) => 1,
            (false, false) => 0,
        };
        if id > 0 && fixed[0].covers(&info) {
            id = 0;
        } else if id > 1 && fixed[1].covers(&info) {
            id = 1;
        } else if id > 2 && fixed[2].covers(&info) {
            id = 2;
        }
        if fixed[id].covers(&info) {
            trace!("using fixed DNA code {id}");
            return compress(input, &fixed[id], &info);
        }
    }

    let code = get_optimal_code(&info)?;
    compress(input, &code, &info)
}

/// Reads the code set a container was encoded with: a fixed table reference
/// or the embedded codeword table.
pub fn code_set<S: SliceSource + ?Sized>(src: &S) -> Result<Cow<'static, CodeSet>, SeqError> {
    let header = Header::read(src)?;
    container_code_set(src, &header)
}

pub(crate) fn container_code_set<S: SliceSource + ?Sized>(
    src: &S,
    header: &Header,
) -> Result<Cow<'static, CodeSet>, SeqError> {
    if header.is_fixed {
        let id = header.n_swapped_symbols as usize;
        if id >= N_FIXED_DNA_CODES {
            return Err(SeqError::CorruptContainer("unknown fixed code id"));
        }
        return Ok(Cow::Borrowed(&fixed_dna_codes()[id]));
    }

    let n = header.n_symbols as usize;
    let table = src.fetch(HEADER_SIZE, n * CODEWORD_SIZE);
    if table.len() < n * CODEWORD_SIZE {
        return Err(SeqError::CorruptContainer("truncated codeword table"));
    }
    let words: Vec<Codeword> = table
        .chunks_exact(CODEWORD_SIZE)
        .map(|c| Codeword {
            code: c[0],
            code_length: c[1],
            symbol: c[2],
        })
        .collect();
    if words
        .iter()
        .any(|w| w.code_length as u32 > MAX_CODEWORD_LENGTH)
    {
        return Err(SeqError::CorruptContainer("codeword longer than 8 bits"));
    }
    if header.n_swapped_symbols as usize > n || (header.n_swapped_symbols as usize == n && n > 0) {
        return Err(SeqError::CorruptContainer("swap partition out of bounds"));
    }

    let masters = n - header.n_swapped_symbols as usize;
    let max_codeword_length = words[..masters]
        .iter()
        .map(|w| w.code_length)
        .max()
        .unwrap_or(0);
    let max_swapped_codeword_length = words[masters..]
        .iter()
        .map(|w| w.code_length)
        .max()
        .unwrap_or(0);
    Ok(Cow::Owned(CodeSet {
        words,
        n_swapped_symbols: header.n_swapped_symbols,
        max_codeword_length,
        max_swapped_codeword_length,
        has_equal_length: header.has_equal_length,
        is_fixed: false,
        uses_rle: header.uses_rle,
        ignore_case: false,
        fixed_id: 0,
        swap_savings: 0,
        ascii_bitmap_low: 0,
        ascii_bitmap_high: 0,
    }))
}

/// Decodes `len` characters starting at character `start`, consulting the
/// sparse index when present.
pub fn decompress_range<S: SliceSource + ?Sized>(
    src: &S,
    start: u32,
    len: u32,
) -> Result<Vec<u8>, SeqError> {
    let header = Header::read(src)?;
    if start as u64 + len as u64 > header.sequence_length as u64 {
        return Err(SeqError::InvalidRange {
            start,
            len,
            sequence_length: header.sequence_length,
        });
    }
    let mut out = vec![0u8; len as usize];
    if len == 0 {
        return Ok(out);
    }
    let code = container_code_set(src, &header)?;

    let entry = if header.has_index {
        let entry_no = (start as i64 + 1) / INDEX_PART_SIZE as i64 - 1;
        if entry_no >= 0 {
            let at = HEADER_SIZE + header.table_size() + entry_no as usize * INDEX_ENTRY_SIZE;
            Some(IndexEntry::read(src.fetch(at, INDEX_ENTRY_SIZE))?)
        } else {
            None
        }
    } else {
        None
    };

    let stream_offset = header.stream_offset();
    match (code.n_swapped_symbols > 0, code.uses_rle) {
        (false, false) => decode::decode_plain(src, stream_offset, &code, start, entry, &mut out)?,
        (false, true) => decode::decode_rle(src, stream_offset, &code, start, entry, &mut out)?,
        (true, false) => decode::decode_swap(src, stream_offset, &code, start, entry, &mut out)?,
        (true, true) => decode::decode_swap_rle(src, stream_offset, &code, start, entry, &mut out)?,
    }
    Ok(out)
}

/// Decodes a whole container.
pub fn decompress<S: SliceSource + ?Sized>(src: &S) -> Result<Vec<u8>, SeqError> {
    let header = Header::read(src)?;
    decompress_range(src, 0, header.sequence_length)
}
