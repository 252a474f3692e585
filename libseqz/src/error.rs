use std::error::Error;
use std::fmt;

/// Errors surfaced by sequence analysis, compression and container access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeqError {
    /// Input contains a byte the requested alphabet cannot express.
    AlphabetViolation(String),
    /// Input sequence or resulting container exceeds a format limit.
    LengthLimitExceeded(u64),
    /// A code set was asked to encode symbols it does not contain.
    CodeSetMismatch,
    /// A container failed structural validation during decode.
    CorruptContainer(&'static str),
    /// A substring request lies outside the stored sequence.
    InvalidRange {
        start: u32,
        len: u32,
        sequence_length: u32,
    },
}

impl fmt::Display for SeqError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeqError::AlphabetViolation(what) => {
                write!(f, "input sequence violates alphabet restrictions: {what}")
            }
            SeqError::LengthLimitExceeded(n) => {
                write!(f, "sequence of length {n} exceeds format limits")
            }
            SeqError::CodeSetMismatch => {
                write!(f, "code set can not express given sequence")
            }
            SeqError::CorruptContainer(what) => {
                write!(f, "corrupt compressed sequence: {what}")
            }
            SeqError::InvalidRange {
                start,
                len,
                sequence_length,
            } => {
                write!(
                    f,
                    "substring [{start}, {start}+{len}) outside sequence of length {sequence_length}"
                )
            }
        }
    }
}

impl Error for SeqError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_informative() {
        let e = SeqError::AlphabetViolation("byte 0x00".to_string());
        assert!(e.to_string().contains("alphabet"));
        let e = SeqError::InvalidRange {
            start: 10,
            len: 5,
            sequence_length: 12,
        };
        assert!(e.to_string().contains("12"));
    }
}
