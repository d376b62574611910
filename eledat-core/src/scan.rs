//! A scan and its forward-only sequence of masses

use crate::decoder::{decode_mass, MassRecord};
use crate::diagnostics::{DecodeEvent, Diagnostics};
use crate::error::DatError;
use crate::types::{Mass, ScanHeader};
use std::io::{Read, Seek, SeekFrom};

/// Where the next mass record starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MassCursor {
    /// Offset arithmetic: previous offset plus previous mass size
    Tracked(u64),
    /// Wherever the shared reader currently is
    Live,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Active,
    Finished,
    Truncated,
    Failed,
}

/// One scan: its header plus a lazily decoded sequence of masses
///
/// The sequence is single-pass. Masses are decoded from the reader the scan
/// borrows, so a scan cannot outlive the traversal that produced it, and
/// decoding leaves the reader wherever the last record ended.
///
/// As an iterator it yields `Result<Mass, DatError>`: it ends cleanly at the
/// end-of-scan word or at end of file, and stops after the first error.
pub struct Scan<'a, R> {
    header: ScanHeader,
    reader: &'a mut R,
    diagnostics: &'a mut dyn Diagnostics,
    cursor: MassCursor,
    state: ScanState,
    masses: usize,
}

impl<'a, R: Read + Seek> Scan<'a, R> {
    pub(crate) fn new(
        header: ScanHeader,
        reader: &'a mut R,
        diagnostics: &'a mut dyn Diagnostics,
        cursor: MassCursor,
    ) -> Self {
        Self {
            header,
            reader,
            diagnostics,
            cursor,
            state: ScanState::Active,
            masses: 0,
        }
    }

    /// The scan header
    pub fn header(&self) -> &ScanHeader {
        &self.header
    }

    /// Scan number from the header
    pub fn number(&self) -> u32 {
        self.header.number
    }

    /// Masses decoded so far
    pub fn masses_read(&self) -> usize {
        self.masses
    }

    /// Whether the end-of-scan word has been reached
    pub fn is_finished(&self) -> bool {
        self.state == ScanState::Finished
    }

    /// Whether the input ended before the end-of-scan word
    pub fn is_truncated(&self) -> bool {
        self.state == ScanState::Truncated
    }

    /// Decode the next mass
    ///
    /// Returns `Ok(None)` once the scan is exhausted. A decode error is
    /// returned once; the sequence is over afterwards.
    pub fn next_mass(&mut self) -> Result<Option<Mass>, DatError> {
        if self.state != ScanState::Active {
            return Ok(None);
        }

        let result = self.decode_next();
        match result {
            Ok(MassRecord::Mass(mass)) => {
                if let MassCursor::Tracked(offset) = self.cursor {
                    self.cursor = MassCursor::Tracked(offset + mass.size);
                }
                self.masses += 1;
                self.diagnostics.record(DecodeEvent::Mass {
                    offset: mass.offset,
                    size: mass.size,
                });
                Ok(Some(mass))
            }
            Ok(MassRecord::EndOfScan) => {
                self.state = ScanState::Finished;
                Ok(None)
            }
            Err(e) if e.is_truncation() => {
                self.state = ScanState::Truncated;
                self.diagnostics.record(DecodeEvent::ScanTruncated {
                    number: self.header.number,
                });
                Ok(None)
            }
            Err(e) => {
                self.state = ScanState::Failed;
                if e.is_scan_local() {
                    self.diagnostics.record(DecodeEvent::ScanAbandoned {
                        number: self.header.number,
                        error: e.clone(),
                    });
                }
                Err(e)
            }
        }
    }

    fn decode_next(&mut self) -> Result<MassRecord, DatError> {
        let offset = match self.cursor {
            MassCursor::Tracked(offset) => self.reader.seek(SeekFrom::Start(offset))?,
            MassCursor::Live => self.reader.stream_position()?,
        };
        decode_mass(&mut *self.reader, offset, self.header.edac)
    }
}

impl<R: Read + Seek> Iterator for Scan<'_, R> {
    type Item = Result<Mass, DatError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_mass().transpose()
    }
}
