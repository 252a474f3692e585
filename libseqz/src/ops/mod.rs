//! Operations on compressed sequences.
//!
//! Everything here works without fully inflating both operands: comparisons
//! stream one index part at a time, and complementing rewrites the embedded
//! symbol table (or flips to the paired fixed palette) without touching the
//! bit stream.

pub mod crc32;
pub mod search;

use std::cmp::Ordering;

use crate::codec::container::{
    CompressedSequence, Header, SliceSource, CODEWORD_SIZE, HEADER_SIZE, INDEX_PART_SIZE,
};
use crate::codec::{container_code_set, decompress, decompress_range, encode_with};
use crate::codes::fixed::{complement_symbol, N_FIXED_DNA_CODES};
use crate::error::SeqError;

/// Reverses a compressed sequence, producing a container of the same size
/// with the same code set.
pub fn reverse(seq: &CompressedSequence) -> Result<CompressedSequence, SeqError> {
    let header = seq.header()?;
    let mut buf = decompress(seq)?;
    buf.reverse();
    let code = container_code_set(seq, &header)?;
    // Stream bits may land differently, but the size formula is invariant
    // under reversal, so the original total still fits the reversed stream.
    encode_with(&buf, &code, header.sequence_length, header.total_size as usize)
}

/// Complements a DNA sequence in place of its symbol table: the bit stream
/// is reused untouched.
pub fn complement(seq: &CompressedSequence) -> Result<CompressedSequence, SeqError> {
    let header = seq.header()?;
    let mut out = seq.clone();
    if header.is_fixed {
        if header.n_swapped_symbols as usize >= N_FIXED_DNA_CODES {
            return Err(SeqError::CorruptContainer("unknown fixed code id"));
        }
        // Fixed codes pair with their complement palette four ids up.
        out.bytes_mut()[9] ^= 4;
    } else {
        let bytes = out.bytes_mut();
        for k in 0..header.n_symbols as usize {
            let at = HEADER_SIZE + k * CODEWORD_SIZE + 2;
            bytes[at] = complement_symbol(bytes[at]);
        }
    }
    Ok(out)
}

/// Reverse complement, the strand-flip operation.
pub fn reverse_complement(seq: &CompressedSequence) -> Result<CompressedSequence, SeqError> {
    complement(&reverse(seq)?)
}

/// Whether two compressed sequences decode to the same text. Streams both
/// operands one index part at a time; sequences of different lengths are
/// unequal without decoding.
pub fn equal<A, B>(a: &A, b: &B) -> Result<bool, SeqError>
where
    A: SliceSource + ?Sized,
    B: SliceSource + ?Sized,
{
    let la = Header::read(a)?.sequence_length;
    let lb = Header::read(b)?.sequence_length;
    if la != lb {
        return Ok(false);
    }
    let mut start = 0u32;
    while start < la {
        let n = (la - start).min(INDEX_PART_SIZE);
        if decompress_range(a, start, n)? != decompress_range(b, start, n)? {
            return Ok(false);
        }
        start += n;
    }
    Ok(true)
}

/// Lexicographic comparison of the decoded texts, streamed one index part at
/// a time; a proper prefix orders before its extensions.
pub fn compare<A, B>(a: &A, b: &B) -> Result<Ordering, SeqError>
where
    A: SliceSource + ?Sized,
    B: SliceSource + ?Sized,
{
    let la = Header::read(a)?.sequence_length;
    let lb = Header::read(b)?.sequence_length;
    let common = la.min(lb);
    let mut start = 0u32;
    while start < common {
        let n = (common - start).min(INDEX_PART_SIZE);
        let ca = decompress_range(a, start, n)?;
        let cb = decompress_range(b, start, n)?;
        match ca.cmp(&cb) {
            Ordering::Equal => {}
            unequal => return Ok(unequal),
        }
        start += n;
    }
    Ok(la.cmp(&lb))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use crate::codec::{compress_auto, compress_dna, DnaOptions, DnaStrategy};
    use crate::generate::generate_sequence;

    fn pack(input: &[u8]) -> CompressedSequence {
        compress_auto(input, false, false).unwrap()
    }

    #[test]
    fn reverse_round_trips() {
        let mut rng = ChaCha8Rng::seed_from_u64(51);
        let input = generate_sequence(&mut rng, b"ACGTN", Some(&[0.4, 0.3, 0.2, 0.08, 0.02]), 100_000);
        let seq = pack(&input);
        let reversed = reverse(&seq).unwrap();
        assert_eq!(reversed.total_size(), seq.total_size());
        let mut expected = input.clone();
        expected.reverse();
        assert_eq!(decompress(&reversed).unwrap(), expected);
        // Reversing twice restores the original text.
        assert_eq!(decompress(&reverse(&reversed).unwrap()).unwrap(), input);
    }

    #[test]
    fn complement_rewrites_the_table_only() {
        let seq = pack(b"ACGTNACGT");
        let comp = complement(&seq).unwrap();
        assert_eq!(decompress(&comp).unwrap(), b"TGCANTGCA");
        assert_eq!(comp.total_size(), seq.total_size());
    }

    #[test]
    fn complement_flips_fixed_palettes() {
        let input = b"ACGTTGCA".repeat(4);
        let seq = compress_dna(&input, DnaOptions::default()).unwrap();
        assert!(seq.header().unwrap().is_fixed);
        let comp = complement(&seq).unwrap();
        assert_eq!(decompress(&comp).unwrap(), b"TGCAACGT".repeat(4));
        // An involution: complementing back restores the palette id.
        assert_eq!(complement(&comp).unwrap(), seq);
    }

    #[test]
    fn reverse_complement_flips_the_strand() {
        let input = b"AACGTT";
        let seq = compress_dna(
            input,
            DnaOptions {
                strategy: DnaStrategy::Short,
                ..DnaOptions::default()
            },
        )
        .unwrap();
        assert_eq!(decompress(&reverse_complement(&seq).unwrap()).unwrap(), b"AACGTT");
        let seq = pack(b"AAACGT");
        assert_eq!(decompress(&reverse_complement(&seq).unwrap()).unwrap(), b"ACGTTT");
    }

    #[test]
    fn equality_ignores_the_chosen_code() {
        let mut rng = ChaCha8Rng::seed_from_u64(53);
        let input = generate_sequence(&mut rng, b"ACGT", None, 80_000);
        // Same text under different code sets still compares equal.
        let a = compress_auto(&input, false, false).unwrap();
        let b = compress_auto(&input, false, true).unwrap();
        assert!(equal(&a, &b).unwrap());

        let mut other = input.clone();
        other[79_000] = if other[79_000] == b'A' { b'C' } else { b'A' };
        let c = compress_auto(&other, false, false).unwrap();
        assert!(!equal(&a, &c).unwrap());
        assert!(!equal(&a, &pack(&input[..70_000])).unwrap());
    }

    #[test]
    fn comparison_is_lexicographic_with_prefix_tiebreak() {
        let a = pack(b"ACGTA");
        let b = pack(b"ACGTC");
        let prefix = pack(b"ACGT");
        assert_eq!(compare(&a, &b).unwrap(), Ordering::Less);
        assert_eq!(compare(&b, &a).unwrap(), Ordering::Greater);
        assert_eq!(compare(&a, &a).unwrap(), Ordering::Equal);
        assert_eq!(compare(&prefix, &a).unwrap(), Ordering::Less);
        assert_eq!(compare(&a, &prefix).unwrap(), Ordering::Greater);
    }
}
