//! Error types for dat decoding

use std::fmt;

/// Why a byte position was rejected as a scan header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderMismatch {
    /// Words 3..=5 are not the magic triplet
    BadMagic([u32; 3]),
    /// The embedded scan number is not the expected one
    WrongNumber {
        /// The scan number the traversal expected next.
        expected: u32,
        /// The scan number found in the header.
        found: u32,
    },
}

impl fmt::Display for HeaderMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderMismatch::BadMagic(words) => write!(f, "bad magic {:x?}", words),
            HeaderMismatch::WrongNumber { expected, found } => {
                write!(f, "scan number {} (expected {})", found, expected)
            }
        }
    }
}

/// Errors that can occur while decoding a dat file
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DatError {
    /// Operation needs an open read handle
    #[error("Dat file is not open")]
    NotOpen,

    /// Record word with a key the format does not define
    #[error("Unknown key 0x{0:x}")]
    UnknownKey(u8),

    /// Data word with a detector type the format does not define
    #[error("Unknown data type 0x{0:x}")]
    UnknownDataType(u8),

    /// Byte position is not a valid scan header (recovery mode only)
    #[error("Invalid scan header at offset {offset}: {reason}")]
    InvalidScanHeader {
        /// Byte offset of the rejected candidate.
        offset: u64,
        /// What did not match.
        reason: HeaderMismatch,
    },

    /// A set-once mass field appeared twice
    #[error("{0} is already set")]
    DuplicateField(&'static str),

    /// Scan index past the end of the index table
    #[error("Scan index out of range: {index} >= {len}")]
    ScanIndexOutOfRange {
        /// The requested index.
        index: usize,
        /// The number of index entries.
        len: usize,
    },

    /// Indexed access on a file whose index could not be read
    #[error("Scan index is not available")]
    MissingIndex,

    /// Index table does not fit inside the file
    #[error("Index of {len} entries at offset {offset} exceeds file size {file_len}")]
    IndexOutOfBounds {
        /// Byte offset of the index table.
        offset: u64,
        /// Number of entries the header claims.
        len: u32,
        /// Size of the file in bytes.
        file_len: u64,
    },

    /// End of file inside a fixed-size read
    #[error("Truncated record: expected {expected} bytes, got {actual}")]
    Truncated {
        /// The number of bytes expected.
        expected: usize,
        /// The number of bytes actually available.
        actual: usize,
    },

    /// IO error during read/seek
    #[error("IO error: {0}")]
    Io(String),
}

impl DatError {
    /// Whether the error only invalidates the scan being decoded
    ///
    /// Traversal carries on with the next scan after these.
    pub fn is_scan_local(&self) -> bool {
        matches!(
            self,
            DatError::UnknownKey(_) | DatError::UnknownDataType(_) | DatError::DuplicateField(_)
        )
    }

    /// Whether the error means the stream ran out of bytes
    pub fn is_truncation(&self) -> bool {
        matches!(self, DatError::Truncated { .. })
    }
}

impl From<std::io::Error> for DatError {
    fn from(err: std::io::Error) -> Self {
        DatError::Io(err.to_string())
    }
}
