//! # Eledat Core
//!
//! Decoder for the binary `.dat` acquisition files written by Thermo Element
//! ICP-MS instruments.
//!
//! A file holds a fixed header, a run of scans and a trailing index of scan
//! offsets. Each scan is a 47-word header followed by mass records built from
//! tagged 32-bit words. Scans can be reached two ways:
//! - through the index ([`IndexedScans`]), the fast path for intact files
//! - by resynchronising on the scan header magic ([`RecoveredScans`]), for
//!   files whose index is missing or damaged
//!
//! ## Modules
//!
//! - `constants`: Format constants, record keys, detectors, header layouts
//! - `word`: Record and data word bit fields
//! - `types`: Scan headers, masses and measurements
//! - `decoder`: Mass record and scan header decoding
//! - `encoder`: Synthetic file encoding
//! - `header`: File header and index
//! - `scan`: Lazy per-scan mass sequence
//! - `index`: Indexed traversal
//! - `scanner`: Index-free recovery
//! - `file`: Files on disk
//! - `diagnostics`: Decode event reporting

#![warn(missing_docs)]

pub mod constants;
pub mod decoder;
pub mod diagnostics;
pub mod encoder;
pub mod error;
pub mod file;
pub mod header;
pub mod index;
pub mod scan;
pub mod scanner;
pub mod types;
pub mod word;

// Re-export commonly used types
pub use constants::{Detector, Key, ScanLayout};
pub use diagnostics::{DecodeEvent, Diagnostics, NullDiagnostics, TracingDiagnostics};
pub use error::DatError;
pub use file::DatFile;
pub use header::FileHeader;
pub use index::IndexedScans;
pub use scan::Scan;
pub use scanner::{RecoveredScans, RecoveryStats};
pub use types::{Mass, Measurements, ScanHeader};

/// Result type alias for dat decoding
pub type Result<T> = core::result::Result<T, DatError>;
