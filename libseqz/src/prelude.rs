pub use crate::codec::container::{CompressedSequence, Header, SliceSource};
pub use crate::codec::{
    code_set, compress, compress_auto, compress_dna, compressed_size, decompress,
    decompress_range, DnaAlphabet, DnaOptions, DnaStrategy,
};
pub use crate::codes::builder::get_optimal_code;
pub use crate::codes::{CodeSet, Codeword};
pub use crate::error::SeqError;
pub use crate::generate::generate_sequence;
pub use crate::ops::{
    compare, complement, crc32::crc32, equal, reverse, reverse_complement, search::strpos,
};
pub use crate::stats::{collect_info, SequenceInfo};
