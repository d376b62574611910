//! Decode diagnostics sink
//!
//! Decoders report what they see through a [`Diagnostics`] value handed to
//! them at construction. The default sink forwards to `tracing` when the
//! `logging` feature is enabled.

use crate::error::{DatError, HeaderMismatch};

#[cfg(feature = "logging")]
use tracing::{debug, trace, warn};

/// Something worth reporting during a decode
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeEvent {
    /// File header parsed
    FileHeader {
        /// Acquisition timestamp.
        timestamp: u32,
        /// Byte offset of the index table.
        index_offset: u32,
        /// Number of index entries claimed.
        index_len: u32,
    },
    /// Index table could not be read; the file has no trusted index
    IndexUnavailable(DatError),
    /// Scan header accepted
    ScanHeader {
        /// Byte offset of the header.
        offset: u64,
        /// Scan number found in the header.
        number: u32,
    },
    /// Recovery candidate rejected
    CandidateRejected {
        /// Byte offset of the candidate.
        offset: u64,
        /// Why it was rejected.
        reason: HeaderMismatch,
    },
    /// Recovery skipped bytes that cannot start a scan header
    Resync {
        /// Where the search started.
        from: u64,
        /// Next candidate position.
        to: u64,
    },
    /// Mass record decoded
    Mass {
        /// Byte offset of the record.
        offset: u64,
        /// Size of the record in bytes.
        size: u64,
    },
    /// Scan ended on end-of-file before its end-of-scan word
    ScanTruncated {
        /// Scan number.
        number: u32,
    },
    /// Scan abandoned after a scan-local error
    ScanAbandoned {
        /// Scan number.
        number: u32,
        /// The error that stopped it.
        error: DatError,
    },
    /// Traversal finished
    Finished {
        /// Scans produced.
        scans: usize,
        /// Error that stopped the traversal, if any.
        reason: Option<DatError>,
    },
}

/// Receiver of decode events
pub trait Diagnostics {
    /// Handle one event
    fn record(&mut self, event: DecodeEvent);
}

/// Forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    #[cfg_attr(not(feature = "logging"), allow(unused_variables))]
    fn record(&mut self, event: DecodeEvent) {
        #[cfg(feature = "logging")]
        match event {
            DecodeEvent::FileHeader {
                timestamp,
                index_offset,
                index_len,
            } => debug!(
                "File header: timestamp {}, index offset {}, index length {}",
                timestamp, index_offset, index_len
            ),
            DecodeEvent::IndexUnavailable(err) => warn!("Scan index unavailable: {}", err),
            DecodeEvent::ScanHeader { offset, number } => {
                debug!("Scan {} header at offset {}", number, offset)
            }
            DecodeEvent::CandidateRejected { offset, reason } => {
                trace!("Rejected scan header candidate at offset {}: {}", offset, reason)
            }
            DecodeEvent::Resync { from, to } => {
                debug!("Resynchronized from offset {} to {}", from, to)
            }
            DecodeEvent::Mass { offset, size } => {
                trace!("Mass at offset {} ({} bytes)", offset, size)
            }
            DecodeEvent::ScanTruncated { number } => {
                warn!("Scan {} ends at end of file", number)
            }
            DecodeEvent::ScanAbandoned { number, error } => {
                debug!("Scan {} abandoned: {}", number, error)
            }
            DecodeEvent::Finished { scans, reason } => match reason {
                Some(err) => debug!("Traversal finished after {} scans: {}", scans, err),
                None => debug!("Traversal finished after {} scans", scans),
            },
        };
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    fn record(&mut self, _event: DecodeEvent) {}
}

impl Diagnostics for Vec<DecodeEvent> {
    fn record(&mut self, event: DecodeEvent) {
        self.push(event);
    }
}
