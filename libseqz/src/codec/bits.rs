//! 64-bit bit-packing primitives and the per-partition code maps.
//!
//! The stream is a sequence of little-endian u64 words filled from the most
//! significant bit down. `BitSink` accumulates pushes into a spill buffer;
//! `BitTap` mirrors it for reading, decoding one symbol per lookup of the top
//! eight buffer bits. Words written by the sink are OR-combined into
//! pre-zeroed storage so that reserved swap-counter slots can be back-patched
//! by word index after the surrounding bits have been flushed.

use crate::codes::{CodeSet, Codeword, ASCII_SIZE};
use crate::error::SeqError;

/// Marker code length for absent map entries.
pub(crate) const ABSENT: u8 = 0xFF;

#[derive(Debug, Clone, Copy)]
pub(crate) struct EncodeEntry {
    /// Right-aligned code bits.
    pub code: u8,
    pub code_length: u8,
}

const ABSENT_ENTRY: EncodeEntry = EncodeEntry {
    code: 0,
    code_length: ABSENT,
};

/// Symbol-indexed code lookup for one partition of a code set.
pub(crate) struct EncodeMap {
    entries: [EncodeEntry; ASCII_SIZE],
}

impl EncodeMap {
    pub fn masters(code: &CodeSet) -> EncodeMap {
        EncodeMap::build(code.master_words(), code.ignore_case)
    }

    pub fn swapped(code: &CodeSet) -> EncodeMap {
        EncodeMap::build(code.swap_words(), code.ignore_case)
    }

    fn build(words: &[Codeword], ignore_case: bool) -> EncodeMap {
        let mut entries = [ABSENT_ENTRY; ASCII_SIZE];
        for w in words {
            let entry = EncodeEntry {
                code: ((w.code as u16) >> (8 - w.code_length as u16)) as u8,
                code_length: w.code_length,
            };
            entries[w.symbol as usize] = entry;
            if ignore_case {
                if w.symbol.is_ascii_uppercase() {
                    entries[(w.symbol + 32) as usize] = entry;
                } else if w.symbol.is_ascii_lowercase() {
                    entries[(w.symbol - 32) as usize] = entry;
                }
            }
        }
        EncodeMap { entries }
    }

    pub fn get(&self, c: u8) -> Option<EncodeEntry> {
        self.entries
            .get(c as usize)
            .filter(|e| e.code_length != ABSENT)
            .copied()
    }

    pub fn lookup(&self, c: u8) -> Result<EncodeEntry, SeqError> {
        self.get(c).ok_or(SeqError::CodeSetMismatch)
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct DecodeEntry {
    pub symbol: u8,
    pub code_length: u8,
}

/// Direct-indexed decoding map: entry for every value of the top 8 buffer
/// bits. A codeword of length `l` fills the `2^(8-l)` slots it prefixes.
pub(crate) struct DecodeMap {
    entries: [DecodeEntry; 256],
}

impl DecodeMap {
    pub fn masters(code: &CodeSet) -> DecodeMap {
        DecodeMap::build(code.master_words())
    }

    pub fn swapped(code: &CodeSet) -> DecodeMap {
        DecodeMap::build(code.swap_words())
    }

    fn build(words: &[Codeword]) -> DecodeMap {
        let mut entries = [DecodeEntry {
            symbol: 0,
            code_length: ABSENT,
        }; 256];
        for w in words {
            let start = w.code as usize;
            let count = 1usize << (8 - w.code_length as u32);
            for entry in entries.iter_mut().skip(start).take(count) {
                *entry = DecodeEntry {
                    symbol: w.symbol,
                    code_length: w.code_length,
                };
            }
        }
        DecodeMap { entries }
    }
}

/// Accumulating bit writer over a fixed number of pre-zeroed stream words.
pub(crate) struct BitSink {
    words: Vec<u64>,
    pos: usize,
    buffer: u64,
    bits_free: i32,
}

/// A reserved 16-bit field, patched once its value is known.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SwapSlot {
    word: usize,
    /// Free bits below the slot in its word; negative when the slot
    /// straddles into the next word.
    bits: i32,
}

impl BitSink {
    pub fn new(n_words: usize) -> BitSink {
        BitSink {
            words: vec![0; n_words],
            pos: 0,
            buffer: 0,
            bits_free: 64,
        }
    }

    /// Appends the `len` low bits of `code`.
    #[inline]
    pub fn push(&mut self, code: u64, len: u32) {
        let len = len as i32;
        if len <= self.bits_free {
            self.buffer = (self.buffer << len) | code;
            self.bits_free -= len;
        } else {
            self.buffer = (self.buffer << self.bits_free) | (code >> (len - self.bits_free));
            self.words[self.pos] |= self.buffer;
            self.pos += 1;
            self.bits_free += 64 - len;
            self.buffer = code;
        }
    }

    /// Writes out a partially filled buffer. Pushing after a flush is not
    /// supported.
    pub fn flush(&mut self) {
        if self.bits_free < 64 {
            self.words[self.pos] |= self.buffer << self.bits_free;
        }
    }

    /// Reserves a 16-bit field at the current position.
    pub fn reserve_swap_slot(&mut self) -> SwapSlot {
        let slot = SwapSlot {
            word: self.pos,
            bits: self.bits_free - 16,
        };
        self.push(0, 16);
        slot
    }

    /// Back-patches a reserved field, handling word-straddling slots.
    pub fn patch_swap_slot(&mut self, slot: SwapSlot, value: u16) {
        let v = value as u64;
        if slot.bits < 0 {
            self.words[slot.word] |= v >> -slot.bits;
            self.words[slot.word + 1] |= v << (slot.bits + 64);
        } else {
            self.words[slot.word] |= v << slot.bits;
        }
    }

    /// Position of the next unwritten bit, as (word, bit-within-word).
    pub fn checkpoint(&self) -> (u32, u8) {
        if self.bits_free > 0 {
            (self.pos as u32, (64 - self.bits_free) as u8)
        } else {
            (self.pos as u32 + 1, 0)
        }
    }

    pub fn into_words(self) -> Vec<u64> {
        self.words
    }
}

/// Bit reader over a fetched byte slice, zero-padding past its end.
pub(crate) struct BitTap<'a> {
    bytes: &'a [u8],
    next: usize,
    buffer: u64,
    bits: i32,
}

impl<'a> BitTap<'a> {
    pub fn new(bytes: &'a [u8]) -> BitTap<'a> {
        BitTap {
            bytes,
            next: 0,
            buffer: 0,
            bits: 0,
        }
    }

    fn next_word(&mut self) -> u64 {
        let offset = self.next * 8;
        self.next += 1;
        let mut raw = [0u8; 8];
        if offset < self.bytes.len() {
            let end = (offset + 8).min(self.bytes.len());
            raw[..end - offset].copy_from_slice(&self.bytes[offset..end]);
        }
        u64::from_le_bytes(raw)
    }

    /// Starts reading `bit` bits into the first word.
    pub fn seek_bits(&mut self, bit: u32) {
        let word = self.next_word();
        self.buffer = word << bit;
        self.bits = 64 - bit as i32;
    }

    /// Reads the leading 16-bit swap window counter of a stream.
    pub fn take_swap_counter(&mut self) -> i64 {
        let word = self.next_word();
        self.buffer = word << 16;
        self.bits = 48;
        (word >> 48) as i64
    }

    /// Decodes one symbol via the top 8 buffer bits.
    #[inline]
    pub fn decode(&mut self, map: &DecodeMap) -> Result<u8, SeqError> {
        let entry = map.entries[(self.buffer >> 56) as usize];
        let len = entry.code_length as i32;
        if len <= self.bits {
            self.bits -= len;
            self.buffer <<= len;
            return Ok(entry.symbol);
        }
        // The code straddles into the next word (or the buffer is fresh):
        // complete the top bits and look up again.
        let old = self.bits;
        let next = self.next_word();
        let entry = map.entries[((self.buffer | (next >> old)) >> 56) as usize];
        let len = entry.code_length as i32;
        if entry.code_length == ABSENT || len <= old {
            return Err(SeqError::CorruptContainer("undecodable prefix code"));
        }
        self.buffer = next << (len - old);
        self.bits = old - len + 64;
        Ok(entry.symbol)
    }

    /// Reads `n` raw bits, most significant first. `n` must be 1..=16.
    #[inline]
    pub fn read_bits(&mut self, n: u32) -> u64 {
        let n = n as i32;
        if n > self.bits {
            let next = self.next_word();
            let value = (self.buffer | (next >> self.bits)) >> (64 - n);
            self.buffer = next << (n - self.bits);
            self.bits += 64 - n;
            value
        } else {
            let value = self.buffer >> (64 - n);
            self.bits -= n;
            self.buffer <<= n;
            value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::{CodeSet, Codeword};

    fn toy_code() -> CodeSet {
        // A=0, C=10, G=110, T=111 (left-justified in bytes).
        CodeSet {
            words: vec![
                Codeword {
                    code: 0,
                    code_length: 1,
                    symbol: b'A',
                },
                Codeword {
                    code: 0b1000_0000,
                    code_length: 2,
                    symbol: b'C',
                },
                Codeword {
                    code: 0b1100_0000,
                    code_length: 3,
                    symbol: b'G',
                },
                Codeword {
                    code: 0b1110_0000,
                    code_length: 3,
                    symbol: b'T',
                },
            ],
            n_swapped_symbols: 0,
            max_codeword_length: 3,
            max_swapped_codeword_length: 0,
            has_equal_length: false,
            is_fixed: false,
            uses_rle: false,
            ignore_case: false,
            fixed_id: 0,
            swap_savings: 0,
            ascii_bitmap_low: 0,
            ascii_bitmap_high: 0,
        }
    }

    fn words_to_bytes(words: Vec<u64>) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    #[test]
    fn push_and_decode_round_trip() {
        let code = toy_code();
        let emap = EncodeMap::masters(&code);
        let dmap = DecodeMap::masters(&code);
        let input = b"ACGTTGCAACGTACGTGGTTAACC";

        // 50 bits: fits one word with room to spare.
        let mut sink = BitSink::new(1);
        for &c in input.iter() {
            let e = emap.lookup(c).unwrap();
            sink.push(e.code as u64, e.code_length as u32);
        }
        sink.flush();
        let bytes = words_to_bytes(sink.into_words());
        let mut tap = BitTap::new(&bytes);
        for &c in input.iter() {
            assert_eq!(tap.decode(&dmap).unwrap(), c);
        }
    }

    #[test]
    fn spill_across_many_words() {
        let code = toy_code();
        let emap = EncodeMap::masters(&code);
        let dmap = DecodeMap::masters(&code);
        let input: Vec<u8> = (0..1000).map(|i| b"GTGA"[i % 4]).collect();

        let bits: u32 = input
            .iter()
            .map(|&c| emap.lookup(c).unwrap().code_length as u32)
            .sum();
        let mut sink = BitSink::new((bits as usize + 63) / 64);
        for &c in &input {
            let e = emap.lookup(c).unwrap();
            sink.push(e.code as u64, e.code_length as u32);
        }
        sink.flush();
        let bytes = words_to_bytes(sink.into_words());
        let mut tap = BitTap::new(&bytes);
        for &c in &input {
            assert_eq!(tap.decode(&dmap).unwrap(), c);
        }
    }

    #[test]
    fn read_bits_interleaved() {
        let mut sink = BitSink::new(2);
        sink.push(0b101, 3);
        sink.push(0xBEEF, 16);
        sink.push(0x3FFF, 14);
        sink.push(0xCAFE, 16);
        sink.push(0x1F, 5);
        sink.push(0xABCD, 16);
        sink.flush();
        let bytes = words_to_bytes(sink.into_words());
        let mut tap = BitTap::new(&bytes);
        assert_eq!(tap.read_bits(3), 0b101);
        assert_eq!(tap.read_bits(16), 0xBEEF);
        assert_eq!(tap.read_bits(14), 0x3FFF);
        assert_eq!(tap.read_bits(16), 0xCAFE);
        assert_eq!(tap.read_bits(5), 0x1F);
        assert_eq!(tap.read_bits(16), 0xABCD);
    }

    #[test]
    fn swap_slot_patch_in_word() {
        let mut sink = BitSink::new(1);
        let slot = sink.reserve_swap_slot();
        sink.push(0b11, 2);
        sink.flush();
        sink.patch_swap_slot(slot, 0x1234);
        let bytes = words_to_bytes(sink.into_words());
        let mut tap = BitTap::new(&bytes);
        assert_eq!(tap.read_bits(16), 0x1234);
        assert_eq!(tap.read_bits(2), 0b11);
    }

    #[test]
    fn swap_slot_patch_straddles_words() {
        let mut sink = BitSink::new(2);
        sink.push(0x1FFFFFFFFFFFFF, 53);
        let slot = sink.reserve_swap_slot();
        sink.push(0b1, 1);
        sink.flush();
        sink.patch_swap_slot(slot, 0xABCD);
        let bytes = words_to_bytes(sink.into_words());
        let mut tap = BitTap::new(&bytes);
        assert_eq!(tap.read_bits(16), 0xFFFF);
        assert_eq!(tap.read_bits(16), 0xFFFF);
        assert_eq!(tap.read_bits(16), 0xFFFF);
        assert_eq!(tap.read_bits(5), 0b11111);
        assert_eq!(tap.read_bits(16), 0xABCD);
        assert_eq!(tap.read_bits(1), 0b1);
    }

    #[test]
    fn checkpoint_positions() {
        let mut sink = BitSink::new(2);
        assert_eq!(sink.checkpoint(), (0, 0));
        sink.push(0b111, 3);
        assert_eq!(sink.checkpoint(), (0, 3));
        sink.push(u64::MAX >> 3, 61);
        // Buffer exactly full, nothing spilled yet: the next bit lands in
        // word 1 once the buffer spills.
        assert_eq!(sink.checkpoint(), (1, 0));
    }

    #[test]
    fn tap_zero_pads_past_end() {
        let bytes = [0xFFu8; 4];
        let mut tap = BitTap::new(&bytes);
        assert_eq!(tap.read_bits(16), 0xFFFF);
        assert_eq!(tap.read_bits(16), 0xFFFF);
        assert_eq!(tap.read_bits(16), 0);
    }

    #[test]
    fn ignore_case_aliases_both_cases() {
        let mut code = toy_code();
        code.ignore_case = true;
        let emap = EncodeMap::masters(&code);
        assert_eq!(emap.lookup(b'a').unwrap().code, 0);
        assert_eq!(
            emap.lookup(b'g').unwrap().code,
            emap.lookup(b'G').unwrap().code
        );
        assert!(emap.get(b'x').is_none());
    }

    #[test]
    fn corrupt_stream_is_an_error_not_a_panic() {
        let code = toy_code();
        let dmap = DecodeMap::swapped(&code); // empty partition: all absent
        let bytes = [0xFFu8; 8];
        let mut tap = BitTap::new(&bytes);
        assert!(matches!(
            tap.decode(&dmap),
            Err(SeqError::CorruptContainer(_))
        ));
    }
}
