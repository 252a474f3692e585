//! CRC-32 (AUTODIN-II, reflected) over the decoded text of a container.

use crate::codec::container::{Header, SliceSource, INDEX_PART_SIZE};
use crate::codec::decompress_range;
use crate::error::SeqError;

const POLYNOMIAL: u32 = 0xEDB8_8320;

const fn make_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ POLYNOMIAL
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

static TABLE: [u32; 256] = make_table();

fn update(mut crc: u32, bytes: &[u8]) -> u32 {
    for &b in bytes {
        crc = (crc >> 8) ^ TABLE[((crc ^ b as u32) & 0xFF) as usize];
    }
    crc
}

/// Checksum of the decoded text, streamed one index part at a time.
pub fn crc32<S: SliceSource + ?Sized>(src: &S) -> Result<u32, SeqError> {
    let length = Header::read(src)?.sequence_length;
    let mut crc = !0u32;
    let mut start = 0u32;
    while start < length {
        let n = (length - start).min(INDEX_PART_SIZE);
        crc = update(crc, &decompress_range(src, start, n)?);
        start += n;
    }
    Ok(!crc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::compress_auto;

    #[test]
    fn matches_the_reference_check_value() {
        let seq = compress_auto(b"123456789", false, false).unwrap();
        assert_eq!(crc32(&seq).unwrap(), 0xCBF4_3926);
    }

    #[test]
    fn empty_sequence_checksums_to_zero() {
        let seq = compress_auto(b"", false, false).unwrap();
        assert_eq!(crc32(&seq).unwrap(), 0);
    }

    #[test]
    fn streams_across_index_parts() {
        let input: Vec<u8> = (0..100_000).map(|i| b"ACGT"[i % 4]).collect();
        let seq = compress_auto(&input, false, false).unwrap();
        assert_eq!(crc32(&seq).unwrap(), !update(!0, &input));
    }

    #[test]
    fn invariant_under_double_reversal() {
        let input: Vec<u8> = (0..70_000).map(|i| b"ACGTN"[i % 5]).collect();
        let seq = compress_auto(&input, false, false).unwrap();
        let back = crate::ops::reverse(&crate::ops::reverse(&seq).unwrap()).unwrap();
        assert_eq!(crc32(&seq).unwrap(), crc32(&back).unwrap());
    }

    #[test]
    fn sensitive_to_single_character_changes() {
        let a = compress_auto(b"ACGTACGT", false, false).unwrap();
        let b = compress_auto(b"ACGTACGA", false, false).unwrap();
        assert_ne!(crc32(&a).unwrap(), crc32(&b).unwrap());
    }
}
