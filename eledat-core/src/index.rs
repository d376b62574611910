//! Indexed traversal: scans located through the file's offset table

use crate::constants::ScanLayout;
use crate::decoder::read_scan_header;
use crate::diagnostics::{DecodeEvent, Diagnostics};
use crate::error::DatError;
use crate::scan::{MassCursor, Scan};
use crate::types::ScanHeader;
use std::io::{Read, Seek};

/// Scans in index order, read by seeking to each trusted offset
///
/// Offsets are used verbatim; they need not be sorted and headers are not
/// checked for the magic triplet.
pub struct IndexedScans<'a, R> {
    reader: &'a mut R,
    offsets: &'a [u32],
    layout: ScanLayout,
    diagnostics: &'a mut dyn Diagnostics,
    next: usize,
    done: bool,
}

impl<'a, R: Read + Seek> IndexedScans<'a, R> {
    /// Traverse `offsets` in order
    pub fn new(
        reader: &'a mut R,
        offsets: &'a [u32],
        layout: ScanLayout,
        diagnostics: &'a mut dyn Diagnostics,
    ) -> Self {
        Self {
            reader,
            offsets,
            layout,
            diagnostics,
            next: 0,
            done: false,
        }
    }

    /// Number of index entries
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// True when the index has no entries
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Index of the scan the next call to [`Self::next_scan`] produces
    pub fn position(&self) -> usize {
        self.next
    }

    /// Scan `index` of the table, regardless of traversal position
    pub fn scan(&mut self, index: usize) -> Result<Scan<'_, R>, DatError> {
        let header = self.read_header(index)?;
        Ok(self.open(header))
    }

    /// Scan `index` of the table, keeping the borrows of the traversal
    pub fn into_scan(mut self, index: usize) -> Result<Scan<'a, R>, DatError> {
        let header = self.read_header(index)?;
        let start = header.data_offset();
        Ok(Scan::new(
            header,
            self.reader,
            self.diagnostics,
            MassCursor::Tracked(start),
        ))
    }

    /// Next scan in index order
    ///
    /// `Ok(None)` after the last entry, or once a header runs past the end of
    /// the file.
    pub fn next_scan(&mut self) -> Result<Option<Scan<'_, R>>, DatError> {
        if self.done || self.next >= self.offsets.len() {
            self.finish(None);
            return Ok(None);
        }

        let index = self.next;
        self.next += 1;

        match self.read_header(index) {
            Ok(header) => Ok(Some(self.open(header))),
            Err(e) if e.is_truncation() => {
                self.finish(Some(e));
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn read_header(&mut self, index: usize) -> Result<ScanHeader, DatError> {
        let offset = *self
            .offsets
            .get(index)
            .ok_or(DatError::ScanIndexOutOfRange {
                index,
                len: self.offsets.len(),
            })?;

        let header = read_scan_header(&mut *self.reader, u64::from(offset), &self.layout)?;
        self.diagnostics.record(DecodeEvent::ScanHeader {
            offset: header.offset,
            number: header.number,
        });
        Ok(header)
    }

    fn open(&mut self, header: ScanHeader) -> Scan<'_, R> {
        let start = header.data_offset();
        Scan::new(
            header,
            &mut *self.reader,
            &mut *self.diagnostics,
            MassCursor::Tracked(start),
        )
    }

    fn finish(&mut self, reason: Option<DatError>) {
        if !self.done {
            self.done = true;
            self.diagnostics.record(DecodeEvent::Finished {
                scans: self.next,
                reason,
            });
        }
    }
}
