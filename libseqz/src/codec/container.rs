//! Container wire format.
//!
//! A compressed sequence is a single little-endian byte buffer:
//!
//! ```text
//! offset 0   u32  total_size          (includes these four bytes)
//! offset 4   u32  sequence_length     (characters, not bytes)
//! offset 8   u8   n_symbols           (0 for fixed codes)
//! offset 9   u8   n_swapped_symbols   (the fixed code id for fixed codes)
//! offset 10  u8   flags
//! offset 11  u8   reserved
//! offset 12  3-byte codewords × n_symbols
//! then       12-byte index entries × (sequence_length / INDEX_PART_SIZE),
//!            present unless the code has equal lengths
//! then       bit stream as u64 words, at the next 8-aligned offset
//! ```

use static_assertions::const_assert;

use crate::error::SeqError;

pub const HEADER_SIZE: usize = 12;
pub const CODEWORD_SIZE: usize = 3;
pub const INDEX_ENTRY_SIZE: usize = 12;
/// One index entry is emitted per this many characters.
pub const INDEX_PART_SIZE: u32 = 65536;
/// Containers are capped below 1 GiB.
pub const MAX_COMPRESSED_SIZE: usize = (1 << 30) - 1;
/// Input sequences must be strictly shorter than this.
pub const MAX_SEQUENCE_LENGTH: u64 = u32::MAX as u64;

const FLAG_EQUAL_LENGTH: u8 = 1;
const FLAG_HAS_INDEX: u8 = 2;
const FLAG_FIXED: u8 = 4;
const FLAG_RLE: u8 = 8;

const_assert!(HEADER_SIZE % 4 == 0);
const_assert!(INDEX_ENTRY_SIZE % 4 == 0);
const_assert!(INDEX_PART_SIZE.is_power_of_two());

pub(crate) fn align8(n: usize) -> usize {
    (n + 7) & !7
}

fn read_u16_le(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32_le(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Partial access to a stored container. Implementations may hold the whole
/// buffer in memory or fetch slices of it on demand; `fetch` clamps to the
/// stored size and never fails.
pub trait SliceSource {
    /// Total stored size in bytes.
    fn raw_size(&self) -> usize;
    /// Bytes `[offset, offset + len)`, clamped to the stored size.
    fn fetch(&self, offset: usize, len: usize) -> &[u8];
}

impl SliceSource for [u8] {
    fn raw_size(&self) -> usize {
        self.len()
    }

    fn fetch(&self, offset: usize, len: usize) -> &[u8] {
        let start = offset.min(self.len());
        let end = offset.saturating_add(len).min(self.len());
        &self[start..end]
    }
}

/// Decoded container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub total_size: u32,
    pub sequence_length: u32,
    pub n_symbols: u8,
    /// Swap partition size, or the fixed code id when `is_fixed`.
    pub n_swapped_symbols: u8,
    pub has_equal_length: bool,
    pub has_index: bool,
    pub is_fixed: bool,
    pub uses_rle: bool,
}

impl Header {
    pub(crate) fn read<S: SliceSource + ?Sized>(src: &S) -> Result<Header, SeqError> {
        let bytes = src.fetch(0, HEADER_SIZE);
        if bytes.len() < HEADER_SIZE {
            return Err(SeqError::CorruptContainer("truncated header"));
        }
        let flags = bytes[10];
        Ok(Header {
            total_size: read_u32_le(bytes, 0),
            sequence_length: read_u32_le(bytes, 4),
            n_symbols: bytes[8],
            n_swapped_symbols: bytes[9],
            has_equal_length: flags & FLAG_EQUAL_LENGTH != 0,
            has_index: flags & FLAG_HAS_INDEX != 0,
            is_fixed: flags & FLAG_FIXED != 0,
            uses_rle: flags & FLAG_RLE != 0,
        })
    }

    pub(crate) fn write(&self, out: &mut [u8]) {
        out[0..4].copy_from_slice(&self.total_size.to_le_bytes());
        out[4..8].copy_from_slice(&self.sequence_length.to_le_bytes());
        out[8] = self.n_symbols;
        out[9] = self.n_swapped_symbols;
        let mut flags = 0u8;
        if self.has_equal_length {
            flags |= FLAG_EQUAL_LENGTH;
        }
        if self.has_index {
            flags |= FLAG_HAS_INDEX;
        }
        if self.is_fixed {
            flags |= FLAG_FIXED;
        }
        if self.uses_rle {
            flags |= FLAG_RLE;
        }
        out[10] = flags;
        out[11] = 0;
    }

    pub(crate) fn table_size(&self) -> usize {
        self.n_symbols as usize * CODEWORD_SIZE
    }

    pub(crate) fn n_index_entries(&self) -> usize {
        if self.has_equal_length {
            0
        } else {
            (self.sequence_length / INDEX_PART_SIZE) as usize
        }
    }

    /// Byte offset of the first stream word.
    pub(crate) fn stream_offset(&self) -> usize {
        align8(HEADER_SIZE + self.table_size() + self.n_index_entries() * INDEX_ENTRY_SIZE)
    }
}

/// One sparse index checkpoint: decoder state just before the character at
/// the next `INDEX_PART_SIZE` boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct IndexEntry {
    /// Stream word the checkpointed character starts in.
    pub block: u32,
    /// Bit position inside that word.
    pub bit: u8,
    /// Characters of a run triple straddling the checkpoint that precede it.
    pub rle_shift: u16,
    /// Swap window counter at the checkpoint, adjusted at window close.
    pub swap_shift: u16,
}

impl IndexEntry {
    pub fn read(bytes: &[u8]) -> Result<IndexEntry, SeqError> {
        if bytes.len() < INDEX_ENTRY_SIZE {
            return Err(SeqError::CorruptContainer("truncated index entry"));
        }
        Ok(IndexEntry {
            block: read_u32_le(bytes, 0),
            bit: bytes[4],
            rle_shift: read_u16_le(bytes, 6),
            swap_shift: read_u16_le(bytes, 8),
        })
    }

    pub fn write(&self, out: &mut [u8]) {
        out[0..4].copy_from_slice(&self.block.to_le_bytes());
        out[4] = self.bit;
        out[5] = 0;
        out[6..8].copy_from_slice(&self.rle_shift.to_le_bytes());
        out[8..10].copy_from_slice(&self.swap_shift.to_le_bytes());
        out[10] = 0;
        out[11] = 0;
    }
}

/// An owned, validated compressed sequence container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedSequence {
    bytes: Vec<u8>,
}

impl CompressedSequence {
    /// Validates the framing of `bytes` and takes ownership.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<CompressedSequence, SeqError> {
        let header = Header::read(bytes.as_slice())?;
        if header.total_size as usize != bytes.len() {
            return Err(SeqError::CorruptContainer("total size mismatch"));
        }
        if header.stream_offset() > bytes.len() {
            return Err(SeqError::CorruptContainer("stream offset out of bounds"));
        }
        Ok(CompressedSequence { bytes })
    }

    /// Wraps bytes the codec itself produced.
    pub(crate) fn from_raw(bytes: Vec<u8>) -> CompressedSequence {
        CompressedSequence { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn header(&self) -> Result<Header, SeqError> {
        Header::read(self.bytes.as_slice())
    }

    /// Characters stored, without decoding.
    pub fn sequence_length(&self) -> u32 {
        read_u32_le(&self.bytes, 4)
    }

    /// Stored size in bytes.
    pub fn total_size(&self) -> usize {
        self.bytes.len()
    }
}

impl SliceSource for CompressedSequence {
    fn raw_size(&self) -> usize {
        self.bytes.len()
    }

    fn fetch(&self, offset: usize, len: usize) -> &[u8] {
        self.bytes.as_slice().fetch(offset, len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        let header = Header {
            total_size: 4096,
            sequence_length: 200_000,
            n_symbols: 5,
            n_swapped_symbols: 2,
            has_equal_length: false,
            has_index: true,
            is_fixed: false,
            uses_rle: true,
        };
        let mut bytes = [0u8; HEADER_SIZE];
        header.write(&mut bytes);
        assert_eq!(Header::read(&bytes[..]).unwrap(), header);
        assert_eq!(header.n_index_entries(), 3);
        assert_eq!(header.stream_offset(), align8(12 + 15 + 36));
    }

    #[test]
    fn index_entry_round_trip() {
        let entry = IndexEntry {
            block: 77,
            bit: 63,
            rle_shift: 130,
            swap_shift: 65535,
        };
        let mut bytes = [0u8; INDEX_ENTRY_SIZE];
        entry.write(&mut bytes);
        assert_eq!(IndexEntry::read(&bytes).unwrap(), entry);
    }

    #[test]
    fn fetch_clamps() {
        let bytes = [1u8, 2, 3, 4];
        let s: &[u8] = &bytes;
        assert_eq!(s.fetch(2, 10), &[3, 4]);
        assert_eq!(s.fetch(10, 4), &[] as &[u8]);
        assert_eq!(s.raw_size(), 4);
    }

    #[test]
    fn from_bytes_rejects_bad_framing() {
        assert!(CompressedSequence::from_bytes(vec![0; 4]).is_err());
        let mut bytes = vec![0u8; 16];
        Header {
            total_size: 99,
            sequence_length: 0,
            n_symbols: 0,
            n_swapped_symbols: 0,
            has_equal_length: true,
            has_index: false,
            is_fixed: false,
            uses_rle: false,
        }
        .write(&mut bytes);
        assert!(matches!(
            CompressedSequence::from_bytes(bytes),
            Err(SeqError::CorruptContainer(_))
        ));
    }
}
