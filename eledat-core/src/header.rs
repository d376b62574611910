//! File header and scan index reader

use crate::constants::{
    END_OF_FILE_HEADER, FILE_HEADER_OFFSET, FILE_HEADER_WORDS, HDR_INDEX_LEN, HDR_INDEX_OFFSET,
    HDR_TIMESTAMP, INDEX_ENTRIES_SKIP, WORD_SIZE,
};
use crate::decoder::read_words;
use crate::error::DatError;
use serde::{Deserialize, Serialize};
use std::io::{Read, Seek, SeekFrom};

/// Fixed-layout file header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHeader {
    /// Acquisition start, seconds since the epoch
    pub timestamp: u32,

    /// Byte offset of the scan index table
    pub index_offset: u32,

    /// Number of entries in the scan index table
    pub index_len: u32,

    /// All header words, starting at byte 0x10
    pub words: Vec<u32>,
}

impl FileHeader {
    /// Build a header from its raw words
    pub fn from_words(words: Vec<u32>) -> Result<Self, DatError> {
        if words.len() != FILE_HEADER_WORDS {
            return Err(DatError::Truncated {
                expected: FILE_HEADER_WORDS * WORD_SIZE,
                actual: words.len() * WORD_SIZE,
            });
        }

        Ok(Self {
            timestamp: words[HDR_TIMESTAMP],
            index_offset: words[HDR_INDEX_OFFSET],
            index_len: words[HDR_INDEX_LEN],
            words,
        })
    }

    /// Read the header region from a seekable source
    pub fn read_from<R: Read + Seek>(reader: &mut R) -> Result<Self, DatError> {
        reader.seek(SeekFrom::Start(FILE_HEADER_OFFSET))?;
        let words = read_words(reader, FILE_HEADER_WORDS)?;
        Self::from_words(words)
    }

    /// Byte offset just past the header, where scan data may begin
    pub fn end_of_header(&self) -> u64 {
        END_OF_FILE_HEADER
    }

    /// Byte offset of the first index entry
    pub fn index_entries_offset(&self) -> u64 {
        u64::from(self.index_offset) + INDEX_ENTRIES_SKIP
    }

    /// Read the scan offset table this header points at
    ///
    /// The table must lie entirely inside the source; this is checked before
    /// anything is allocated so a corrupt length cannot trigger a huge read.
    pub fn read_index<R: Read + Seek>(&self, reader: &mut R) -> Result<Vec<u32>, DatError> {
        let file_len = reader.seek(SeekFrom::End(0))?;
        let start = self.index_entries_offset();
        let end = start + u64::from(self.index_len) * WORD_SIZE as u64;

        if end > file_len {
            return Err(DatError::IndexOutOfBounds {
                offset: u64::from(self.index_offset),
                len: self.index_len,
                file_len,
            });
        }

        reader.seek(SeekFrom::Start(start))?;
        read_words(reader, self.index_len as usize)
    }

    /// Acquisition time of a scan whose time word is `time_ms`
    pub fn scan_timestamp(&self, time_ms: u32) -> f64 {
        f64::from(self.timestamp) + f64::from(time_ms) / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::DatBuilder;
    use std::io::Cursor;

    #[test]
    fn test_read_header_fields() {
        let data = DatBuilder::new(1_400_000_000).build();
        let mut cursor = Cursor::new(data);

        let header = FileHeader::read_from(&mut cursor).unwrap();

        assert_eq!(header.timestamp, 1_400_000_000);
        assert_eq!(header.index_len, 0);
        assert_eq!(header.words.len(), FILE_HEADER_WORDS);
        assert_eq!(header.end_of_header(), 356);
    }

    #[test]
    fn test_truncated_header() {
        let mut cursor = Cursor::new(vec![0u8; 100]);
        let result = FileHeader::read_from(&mut cursor);
        assert!(matches!(result, Err(DatError::Truncated { .. })));
    }

    #[test]
    fn test_index_out_of_bounds() {
        let mut words = vec![0u32; FILE_HEADER_WORDS];
        words[HDR_INDEX_OFFSET] = 400;
        words[HDR_INDEX_LEN] = 1_000_000;
        let header = FileHeader::from_words(words).unwrap();

        let mut cursor = Cursor::new(vec![0u8; 512]);
        let result = header.read_index(&mut cursor);

        assert_eq!(
            result,
            Err(DatError::IndexOutOfBounds {
                offset: 400,
                len: 1_000_000,
                file_len: 512
            })
        );
    }

    #[test]
    fn test_scan_timestamp() {
        let mut words = vec![0u32; FILE_HEADER_WORDS];
        words[HDR_TIMESTAMP] = 100;
        let header = FileHeader::from_words(words).unwrap();
        assert_eq!(header.scan_timestamp(2500), 102.5);
    }
}
