//! Dat files on disk

use crate::constants::ScanLayout;
use crate::diagnostics::{DecodeEvent, Diagnostics, TracingDiagnostics};
use crate::error::DatError;
use crate::header::FileHeader;
use crate::index::IndexedScans;
use crate::scan::Scan;
use crate::scanner::RecoveredScans;
use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Read handle type used for files on disk
pub type FileReader = BufReader<File>;

/// One acquisition file
///
/// The header and index are read when the value is constructed, through a
/// handle that is closed again straight away. Scan data needs [`Self::open`];
/// the single read handle is shared by every scan decoded from it and is
/// released on [`Self::close`] or drop.
pub struct DatFile {
    path: PathBuf,
    header: FileHeader,
    index: Option<Vec<u32>>,
    layout: ScanLayout,
    diagnostics: Box<dyn Diagnostics>,
    handle: Option<FileReader>,
}

impl DatFile {
    /// Read the header of `path`, logging through `tracing`
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DatError> {
        Self::with_diagnostics(path, Box::new(TracingDiagnostics))
    }

    /// Read the header of `path`, reporting to `diagnostics`
    ///
    /// A header that cannot be read is an error. An index that cannot be
    /// read only leaves the file without one; recovery still works.
    pub fn with_diagnostics(
        path: impl AsRef<Path>,
        mut diagnostics: Box<dyn Diagnostics>,
    ) -> Result<Self, DatError> {
        let path = path.as_ref().to_path_buf();
        let mut reader = BufReader::new(File::open(&path)?);

        let header = FileHeader::read_from(&mut reader)?;
        diagnostics.record(DecodeEvent::FileHeader {
            timestamp: header.timestamp,
            index_offset: header.index_offset,
            index_len: header.index_len,
        });

        let index = match header.read_index(&mut reader) {
            Ok(index) => Some(index),
            Err(e) => {
                diagnostics.record(DecodeEvent::IndexUnavailable(e));
                None
            }
        };

        Ok(Self {
            path,
            header,
            index,
            layout: ScanLayout::default(),
            diagnostics,
            handle: None,
        })
    }

    /// Use another scan header layout
    pub fn with_layout(mut self, layout: ScanLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Path the file was read from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file header
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Acquisition timestamp, seconds since the epoch
    pub fn timestamp(&self) -> u32 {
        self.header.timestamp
    }

    /// Scan offsets from the index, if it could be read
    pub fn index(&self) -> Option<&[u32]> {
        self.index.as_deref()
    }

    /// Scan header layout in use
    pub fn layout(&self) -> ScanLayout {
        self.layout
    }

    /// Number of scans listed in the index (0 without an index)
    pub fn num_scans(&self) -> usize {
        self.index.as_ref().map_or(0, Vec::len)
    }

    /// Open the read handle, positioned just past the file header
    pub fn open(&mut self) -> Result<(), DatError> {
        let mut reader = BufReader::new(File::open(&self.path)?);
        reader.seek(SeekFrom::Start(self.header.end_of_header()))?;
        self.handle = Some(reader);
        Ok(())
    }

    /// Release the read handle
    pub fn close(&mut self) {
        self.handle = None;
    }

    /// Whether a read handle is open
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Scan `index` of the index table
    pub fn scan(&mut self, index: usize) -> Result<Scan<'_, FileReader>, DatError> {
        let reader = self.handle.as_mut().ok_or(DatError::NotOpen)?;
        let offsets = self.index.as_deref().ok_or(DatError::MissingIndex)?;
        let scans = IndexedScans::new(reader, offsets, self.layout, self.diagnostics.as_mut());
        scans.into_scan(index)
    }

    /// All scans, in index order
    pub fn scans(&mut self) -> Result<IndexedScans<'_, FileReader>, DatError> {
        let reader = self.handle.as_mut().ok_or(DatError::NotOpen)?;
        let offsets = self.index.as_deref().ok_or(DatError::MissingIndex)?;
        Ok(IndexedScans::new(
            reader,
            offsets,
            self.layout,
            self.diagnostics.as_mut(),
        ))
    }

    /// All scans that can be found without the index
    pub fn recover(&mut self) -> Result<RecoveredScans<'_, FileReader>, DatError> {
        let reader = self.handle.as_mut().ok_or(DatError::NotOpen)?;
        Ok(RecoveredScans::new(
            reader,
            self.header.end_of_header(),
            self.layout,
            self.diagnostics.as_mut(),
        ))
    }
}

impl std::fmt::Debug for DatFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatFile")
            .field("path", &self.path)
            .field("timestamp", &self.header.timestamp)
            .field("num_scans", &self.num_scans())
            .field("layout", &self.layout)
            .field("open", &self.is_open())
            .finish()
    }
}
