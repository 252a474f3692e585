//! Compression for biological sequence data with random-access substrings.
//!
//! Sequences are encoded with per-sequence prefix codes (or one of the
//! built-in fixed DNA codes), optionally interleaved with run-length triples
//! and a swap partition for rare symbols, and packed into 64-bit stream
//! words. A sparse index lets substrings be decoded without inflating the
//! whole sequence, and the operations in [`ops`] (comparison, checksums,
//! search, strand flips) work on the compressed form directly.
//!
//! ```
//! use libseqz::prelude::*;
//!
//! let seq = compress_auto(b"ACGTACGTTGCA", false, false).unwrap();
//! assert_eq!(decompress(&seq).unwrap(), b"ACGTACGTTGCA");
//! assert_eq!(decompress_range(&seq, 4, 4).unwrap(), b"ACGT");
//! ```

pub mod codec;
pub mod codes;
pub mod error;
pub mod generate;
pub mod ops;
pub mod prelude;
pub mod stats;

pub use crate::codec::container::{CompressedSequence, Header, SliceSource};
pub use crate::codec::{
    code_set, compress, compress_auto, compress_dna, compressed_size, decompress,
    decompress_range, DnaAlphabet, DnaOptions, DnaStrategy,
};
pub use crate::error::SeqError;
