//! Index-free recovery: find scan headers by resynchronising on the stream
//!
//! Used when the file's own index is missing or corrupt. Starting just past
//! the file header, each byte position is tried as a scan header:
//! 1. Words 3..=5 must be the magic triplet `0xD, 0xE, 0xF`
//! 2. The scan number must be the next expected one (1, 2, 3, ...)
//! 3. On a mismatch the search moves one byte forward and tries again
//! 4. After a scan is accepted, the next search starts wherever decoding that
//!    scan's masses left the reader
//!
//! The position under the reader is checked first, since on an intact
//! stream the next header follows the last mass directly. Only when that
//! fails is the stream searched for the magic bytes, one buffered chunk at
//! a time; rejected candidates inside the chunk are checked without
//! touching the reader again.
//!
//! End of file, or any other failure, ends the sequence. Nothing here proves
//! a position is a real scan boundary; a header that merely looks right and
//! carries the right number is accepted.

use crate::constants::{
    ScanLayout, SCAN_HEADER_SIZE, SCAN_HEADER_WORDS, SCAN_MAGIC_BYTES, SCAN_MAGIC_OFFSET,
};
use crate::decoder::{check_scan_header, read_full, read_scan_header_checked, read_words};
use crate::diagnostics::{DecodeEvent, Diagnostics};
use crate::error::{DatError, HeaderMismatch};
use crate::scan::{MassCursor, Scan};
use crate::types::ScanHeader;
use std::io::{Read, Seek, SeekFrom};

/// Bytes examined per read while looking for the magic triplet
const SEARCH_CHUNK: usize = 64 * 1024;

/// Bytes from a candidate's start to the end of its magic triplet
const MAGIC_END: usize = SCAN_MAGIC_OFFSET + SCAN_MAGIC_BYTES.len();

/// Recovery statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryStats {
    /// Bytes stepped over without finding a scan
    pub bytes_skipped: u64,

    /// Positions with the magic triplet but the wrong scan number
    pub candidates_rejected: usize,

    /// Scans accepted
    pub scans_found: usize,

    /// Where the search stopped, once finished
    pub end_offset: Option<u64>,
}

/// Scans found by resynchronisation, numbered 1, 2, 3, ...
pub struct RecoveredScans<'a, R> {
    reader: &'a mut R,
    layout: ScanLayout,
    diagnostics: &'a mut dyn Diagnostics,
    start: Option<u64>,
    expected: u32,
    stats: RecoveryStats,
    chunk: Vec<u8>,
    /// File offset of `chunk[0]`
    chunk_start: u64,
    /// Valid bytes in `chunk`
    chunk_filled: usize,
}

impl<'a, R: Read + Seek> RecoveredScans<'a, R> {
    /// Search from byte `start`, usually the end of the file header
    pub fn new(
        reader: &'a mut R,
        start: u64,
        layout: ScanLayout,
        diagnostics: &'a mut dyn Diagnostics,
    ) -> Self {
        Self {
            reader,
            layout,
            diagnostics,
            start: Some(start),
            expected: 1,
            stats: RecoveryStats::default(),
            chunk: Vec::new(),
            chunk_start: 0,
            chunk_filled: 0,
        }
    }

    /// Scan number the next accepted header must carry
    pub fn expected_number(&self) -> u32 {
        self.expected
    }

    /// Statistics so far
    pub fn stats(&self) -> &RecoveryStats {
        &self.stats
    }

    /// Whether the search has ended
    pub fn is_finished(&self) -> bool {
        self.stats.end_offset.is_some()
    }

    /// Find the next scan
    ///
    /// Returns `None` at end of file or on any error other than a rejected
    /// candidate; the reason goes to the diagnostics sink.
    pub fn next_scan(&mut self) -> Option<Scan<'_, R>> {
        if self.is_finished() {
            return None;
        }

        match self.locate() {
            Ok(Some(header)) => {
                self.expected += 1;
                self.stats.scans_found += 1;
                self.diagnostics.record(DecodeEvent::ScanHeader {
                    offset: header.offset,
                    number: header.number,
                });
                Some(Scan::new(
                    header,
                    &mut *self.reader,
                    &mut *self.diagnostics,
                    MassCursor::Live,
                ))
            }
            Ok(None) => {
                self.finish(None);
                None
            }
            Err(e) => {
                self.finish(Some(e));
                None
            }
        }
    }

    /// Search forward from the current position for the expected header
    ///
    /// On success the reader sits just past the accepted header.
    fn locate(&mut self) -> Result<Option<ScanHeader>, DatError> {
        let here = match self.start.take() {
            Some(start) => {
                self.reader.seek(SeekFrom::Start(start))?;
                start
            }
            None => self.reader.stream_position()?,
        };

        let words = match read_words(&mut *self.reader, SCAN_HEADER_WORDS) {
            Ok(words) => words,
            Err(e) if e.is_truncation() => return Ok(None),
            Err(e) => return Err(e),
        };
        let mut pos = match check_scan_header(here, words, &self.layout, self.expected) {
            Ok(header) => return Ok(Some(header)),
            Err(DatError::InvalidScanHeader {
                reason: HeaderMismatch::BadMagic(_),
                ..
            }) => here,
            Err(DatError::InvalidScanHeader { offset, reason }) => {
                self.reject(offset, reason);
                here + 1
            }
            Err(e) => return Err(e),
        };

        loop {
            let candidate = match self.find_magic(pos)? {
                Some(candidate) => candidate,
                None => return Ok(None),
            };

            if candidate > pos {
                self.stats.bytes_skipped += candidate - pos;
                self.diagnostics.record(DecodeEvent::Resync {
                    from: pos,
                    to: candidate,
                });
            }

            match self.read_candidate(candidate) {
                Ok(header) => return Ok(Some(header)),
                Err(DatError::InvalidScanHeader { offset, reason }) => {
                    self.reject(offset, reason);
                    pos = candidate + 1;
                }
                Err(e) if e.is_truncation() => return Ok(None),
                Err(e) => return Err(e),
            }
        }
    }

    fn reject(&mut self, offset: u64, reason: HeaderMismatch) {
        self.stats.candidates_rejected += 1;
        self.stats.bytes_skipped += 1;
        self.diagnostics
            .record(DecodeEvent::CandidateRejected { offset, reason });
    }

    /// Check the header at `offset`, from the search chunk when it holds
    /// the whole header
    fn read_candidate(&mut self, offset: u64) -> Result<ScanHeader, DatError> {
        if !self.buffered(offset, SCAN_HEADER_SIZE) {
            return read_scan_header_checked(&mut *self.reader, offset, &self.layout, self.expected);
        }

        let at = (offset - self.chunk_start) as usize;
        let words = read_words(&mut &self.chunk[at..at + SCAN_HEADER_SIZE], SCAN_HEADER_WORDS)?;
        let header = check_scan_header(offset, words, &self.layout, self.expected)?;
        self.reader
            .seek(SeekFrom::Start(offset + SCAN_HEADER_SIZE as u64))?;
        Ok(header)
    }

    /// First position `>= from` whose magic words match
    ///
    /// Positions skipped here would all fail the magic check, so this gives
    /// the same result as trying every byte in turn.
    fn find_magic(&mut self, from: u64) -> Result<Option<u64>, DatError> {
        let mut pos = from;
        loop {
            if !self.buffered(pos, MAGIC_END) {
                self.fill(pos)?;
            }

            let start = (pos - self.chunk_start) as usize;
            let filled = self.chunk_filled;
            if filled < start + MAGIC_END {
                return Ok(None);
            }

            let window = &self.chunk[start + SCAN_MAGIC_OFFSET..filled];
            if let Some(at) = memchr::memmem::find(window, SCAN_MAGIC_BYTES) {
                return Ok(Some(pos + at as u64));
            }

            if filled < self.chunk.len() {
                return Ok(None);
            }
            // Every candidate whose magic would lie fully inside this chunk failed
            pos = self.chunk_start + (filled - MAGIC_END + 1) as u64;
        }
    }

    /// Whether `len` bytes from `offset` are in the search chunk
    fn buffered(&self, offset: u64, len: usize) -> bool {
        offset >= self.chunk_start
            && offset + len as u64 <= self.chunk_start + self.chunk_filled as u64
    }

    fn fill(&mut self, from: u64) -> Result<(), DatError> {
        if self.chunk.len() != SEARCH_CHUNK {
            self.chunk.resize(SEARCH_CHUNK, 0);
        }
        self.reader.seek(SeekFrom::Start(from))?;
        self.chunk_filled = read_full(&mut *self.reader, &mut self.chunk)?;
        self.chunk_start = from;
        Ok(())
    }

    fn finish(&mut self, reason: Option<DatError>) {
        let end = self.reader.stream_position().ok();
        self.stats.end_offset = Some(end.unwrap_or_default());
        self.diagnostics.record(DecodeEvent::Finished {
            scans: self.stats.scans_found,
            reason,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{Detector, END_OF_FILE_HEADER};
    use crate::diagnostics::NullDiagnostics;
    use crate::encoder::{DatBuilder, MassBuilder, ScanBuilder};
    use std::io::Cursor;

    fn numbers(data: Vec<u8>) -> (Vec<u32>, RecoveryStats) {
        let mut cursor = Cursor::new(data);
        let mut sink = NullDiagnostics;
        let mut scans =
            RecoveredScans::new(&mut cursor, END_OF_FILE_HEADER, ScanLayout::LEGACY, &mut sink);

        let mut found = Vec::new();
        while let Some(scan) = scans.next_scan() {
            found.push(scan.number());
            for mass in scan {
                mass.unwrap();
            }
        }
        (found, scans.stats().clone())
    }

    #[test]
    fn test_recover_clean_stream() {
        let data = DatBuilder::new(0)
            .scan(ScanBuilder::new(1).mass(MassBuilder::new().value(Detector::Pulse, 1)))
            .scan(ScanBuilder::new(2))
            .scan(ScanBuilder::new(3))
            .build();

        let (found, stats) = numbers(data);

        assert_eq!(found, vec![1, 2, 3]);
        assert_eq!(stats.scans_found, 3);
        assert_eq!(stats.bytes_skipped, 0);
    }

    #[test]
    fn test_recover_through_garbage() {
        let data = DatBuilder::new(0)
            .garbage(b"leading junk")
            .scan(ScanBuilder::new(1))
            .garbage(&[0xFF; 37])
            .scan(ScanBuilder::new(2))
            .build();

        let (found, stats) = numbers(data);

        assert_eq!(found, vec![1, 2]);
        assert_eq!(stats.bytes_skipped, 12 + 37);
    }

    #[test]
    fn test_out_of_sequence_header_is_skipped() {
        let data = DatBuilder::new(0)
            .scan(ScanBuilder::new(1))
            .scan(ScanBuilder::new(5))
            .scan(ScanBuilder::new(2))
            .build();

        let (found, stats) = numbers(data);

        assert_eq!(found, vec![1, 2]);
        assert_eq!(stats.candidates_rejected, 1);
    }

    #[test]
    fn test_bad_magic_is_never_accepted() {
        let data = DatBuilder::new(0)
            .scan(ScanBuilder::new(1).magic([0xD, 0xE, 0x10]))
            .build();

        let (found, _) = numbers(data);

        assert!(found.is_empty());
    }

    #[test]
    fn test_search_crosses_chunk_boundary() {
        let padding = vec![0u8; SEARCH_CHUNK - 5];
        let data = DatBuilder::new(0)
            .garbage(&padding)
            .scan(ScanBuilder::new(1))
            .build();

        let (found, stats) = numbers(data);

        assert_eq!(found, vec![1]);
        assert_eq!(stats.bytes_skipped, padding.len() as u64);
    }

    #[test]
    fn test_unread_masses_resync_to_next_scan() {
        let data = DatBuilder::new(0)
            .scan(
                ScanBuilder::new(1)
                    .mass(MassBuilder::new().value(Detector::Analog, 3))
                    .mass(MassBuilder::new().value(Detector::Analog, 4)),
            )
            .scan(ScanBuilder::new(2))
            .build();
        let mut cursor = Cursor::new(data);
        let mut sink = NullDiagnostics;
        let mut scans =
            RecoveredScans::new(&mut cursor, END_OF_FILE_HEADER, ScanLayout::LEGACY, &mut sink);

        assert_eq!(scans.next_scan().map(|s| s.number()), Some(1));
        assert_eq!(scans.next_scan().map(|s| s.number()), Some(2));
        assert!(scans.next_scan().is_none());
        assert!(scans.is_finished());
    }

    /// Counts the bytes handed out by `read`
    struct CountingReader {
        inner: Cursor<Vec<u8>>,
        bytes_read: u64,
    }

    impl Read for CountingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.inner.read(buf)?;
            self.bytes_read += n as u64;
            Ok(n)
        }
    }

    impl Seek for CountingReader {
        fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    fn count_reads(data: Vec<u8>) -> (usize, RecoveryStats, u64) {
        let mut reader = CountingReader {
            inner: Cursor::new(data),
            bytes_read: 0,
        };
        let mut sink = NullDiagnostics;
        let mut scans =
            RecoveredScans::new(&mut reader, END_OF_FILE_HEADER, ScanLayout::LEGACY, &mut sink);

        let mut found = 0;
        while let Some(scan) = scans.next_scan() {
            found += 1;
            for mass in scan {
                mass.unwrap();
            }
        }
        let stats = scans.stats().clone();
        (found, stats, reader.bytes_read)
    }

    #[test]
    fn test_recovery_reads_each_byte_about_once() {
        let mut builder = DatBuilder::new(0);
        for n in 1..=2000 {
            if n % 250 == 0 {
                builder = builder.garbage(b"stray bytes");
            }
            builder = builder
                .scan(ScanBuilder::new(n).mass(MassBuilder::new().value(Detector::Pulse, 7)));
        }
        let data = builder.build();
        let file_len = data.len() as u64;

        let (found, stats, bytes_read) = count_reads(data);

        assert_eq!(found, 2000);
        assert_eq!(stats.bytes_skipped, 8 * 11);
        assert!(
            bytes_read <= 3 * file_len,
            "read {} bytes of a {} byte file",
            bytes_read,
            file_len
        );
    }

    #[test]
    fn test_rejected_candidates_are_checked_from_the_chunk() {
        let mut builder = DatBuilder::new(0);
        for _ in 0..500 {
            builder = builder.scan(ScanBuilder::new(9));
        }
        let data = builder.scan(ScanBuilder::new(1)).build();
        let file_len = data.len() as u64;

        let (found, stats, bytes_read) = count_reads(data);

        assert_eq!(found, 1);
        assert_eq!(stats.candidates_rejected, 500);
        assert!(
            bytes_read <= 3 * file_len,
            "read {} bytes of a {} byte file",
            bytes_read,
            file_len
        );
    }
}
