use thiserror::Error;

#[derive(Debug, Error)]
pub enum SuperblockError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(
        "magic number mismatch: expected {expected:#010x}, got {actual:#010x} \
         (is this a version 1.1 or 1.2 superblock?)"
    )]
    FormatMismatch { expected: u32, actual: u32 },
    #[error("unexpected end of stream: need {needed} bytes at offset {offset:#x}, got {actual}")]
    UnexpectedEndOfStream { needed: u64, offset: u64, actual: u64 },
    #[error("invalid field {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },
}
