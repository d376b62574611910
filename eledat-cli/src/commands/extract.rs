//! `extract` and `recover`: dat files to CSV

use crate::commands::inputs::{self, Inputs};
use crate::commands::render::{read_elements, scan_row};
use crate::Traversal;
use anyhow::{bail, Context, Result};
use chrono::{Local, TimeZone};
use eledat_core::{DatError, DatFile, Mass, Scan, ScanLayout};
use std::fs::File;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Options shared by both subcommands
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Files or directories
    pub inputs: Vec<PathBuf>,
    /// Write a leading comment line per file
    pub comments: bool,
    /// Scan header layout; the traversal's default when `None`
    pub layout: Option<ScanLayout>,
    /// Directory for the combined file
    pub output_dir: Option<PathBuf>,
    /// How scans are located
    pub traversal: Traversal,
}

/// What a run produced
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Per-file CSV outputs, in processing order
    pub outputs: Vec<PathBuf>,
    /// Aggregate output, when more than one input was given
    pub combined: Option<PathBuf>,
    /// Data rows written per file
    pub rows: usize,
    /// Scans skipped after a decode error
    pub skipped: usize,
}

type CsvWriter = csv::Writer<File>;

fn csv_writer(path: &Path) -> Result<CsvWriter> {
    csv::WriterBuilder::new()
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_path(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))
}

/// Shared output state across all input files
struct Sink {
    combined: Option<CsvWriter>,
    combined_headers: bool,
    summary: ExtractSummary,
}

/// Output state of one input file
struct FileSink<'a> {
    output: CsvWriter,
    headers: bool,
    elements: Option<Vec<String>>,
    timestamp: u32,
    ordinal: usize,
    shared: &'a mut Sink,
}

impl FileSink<'_> {
    fn write(&mut self, record: &[String]) -> Result<()> {
        self.output
            .write_record(record)
            .with_context(|| "Failed to write CSV record")?;
        if let Some(combined) = self.shared.combined.as_mut() {
            combined
                .write_record(record)
                .with_context(|| "Failed to write combined CSV record")?;
        }
        Ok(())
    }

    fn comment(&mut self, path: &Path) -> Result<()> {
        let datetime = Local
            .timestamp_opt(i64::from(self.timestamp), 0)
            .single()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        let line = format!("{} {} {}", path.display(), self.timestamp, datetime);
        self.write(&[line])
    }

    /// Decode one scan and write its row
    ///
    /// A scan-local decode error skips the scan with a warning; anything
    /// else is returned.
    fn scan<R: Read + Seek>(&mut self, scan: Scan<'_, R>) -> Result<()> {
        self.ordinal += 1;
        let header = scan.header().clone();

        let masses: Result<Vec<Mass>, DatError> = scan.collect();
        let masses = match masses {
            Ok(masses) => masses,
            Err(e) if e.is_scan_local() => {
                match &e {
                    DatError::UnknownKey(code) => eprintln!("Warning: unknown key 0x{:x}", code),
                    DatError::UnknownDataType(code) => {
                        eprintln!("Warning: unknown data type 0x{:x}", code)
                    }
                    other => eprintln!("Warning: {}", other),
                }
                debug!("Skipping scan {}: {}", header.number, e);
                self.shared.summary.skipped += 1;
                return Ok(());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to decode scan {}", header.number))
            }
        };

        let row = scan_row(
            self.ordinal,
            header.timestamp(self.timestamp),
            &header,
            &masses,
            self.elements.as_deref(),
        );

        if self.headers {
            self.output
                .write_record(&row.headers)
                .with_context(|| "Failed to write CSV header")?;
            self.headers = false;
        }
        if self.shared.combined_headers {
            if let Some(combined) = self.shared.combined.as_mut() {
                combined
                    .write_record(&row.headers)
                    .with_context(|| "Failed to write combined CSV header")?;
            }
            self.shared.combined_headers = false;
        }

        self.write(&row.values)?;
        self.shared.summary.rows += 1;
        Ok(())
    }
}

/// Open every input and sort by acquisition timestamp
fn open_all(files: &[PathBuf], layout: ScanLayout) -> Result<Vec<DatFile>> {
    let mut dats = Vec::with_capacity(files.len());
    for path in files {
        let dat = DatFile::from_path(path)
            .with_context(|| format!("Failed to read dat file: {}", path.display()))?;
        dats.push(dat.with_layout(layout));
    }
    dats.sort_by_key(DatFile::timestamp);
    Ok(dats)
}

fn extract_file(
    dat: &mut DatFile,
    traversal: Traversal,
    comments: bool,
    shared: &mut Sink,
) -> Result<PathBuf> {
    let output_path = inputs::csv_path(dat.path());
    println!("Writing to {}", output_path.display());

    let mut sink = FileSink {
        output: csv_writer(&output_path)?,
        headers: true,
        elements: read_elements(&inputs::fin2_path(dat.path())),
        timestamp: dat.timestamp(),
        ordinal: 0,
        shared,
    };

    if comments {
        sink.comment(dat.path())?;
    }

    let path = dat.path().to_path_buf();
    dat.open()
        .with_context(|| format!("Failed to open dat file: {}", path.display()))?;

    match traversal {
        Traversal::Indexed => {
            let mut scans = match dat.scans() {
                Ok(scans) => scans,
                Err(DatError::MissingIndex) => bail!(
                    "{} has no usable scan index; try `eledat recover`",
                    path.display()
                ),
                Err(e) => return Err(e.into()),
            };
            while let Some(scan) = scans.next_scan()? {
                sink.scan(scan)?;
            }
        }
        Traversal::Recover => {
            let mut scans = dat.recover()?;
            while let Some(scan) = scans.next_scan() {
                sink.scan(scan)?;
            }
            let stats = scans.stats();
            info!(
                "Recovered {} scans, skipped {} bytes, rejected {} candidates",
                stats.scans_found, stats.bytes_skipped, stats.candidates_rejected
            );
        }
    }

    sink.output
        .flush()
        .with_context(|| format!("Failed to write output file: {}", output_path.display()))?;
    dat.close();
    Ok(output_path)
}

/// Run `extract` or `recover`
pub fn execute(options: &ExtractOptions) -> Result<ExtractSummary> {
    let layout = options
        .layout
        .unwrap_or_else(|| options.traversal.default_layout());
    let Inputs { files, dirs } = inputs::expand(&options.inputs)?;
    if files.is_empty() {
        bail!("No dat files to process");
    }
    debug!("{} input files, layout {:?}", files.len(), layout);

    let mut dats = open_all(&files, layout)?;

    let mut shared = Sink {
        combined: None,
        combined_headers: true,
        summary: ExtractSummary::default(),
    };

    if dats.len() > 1 {
        let dir = inputs::output_dir(options.output_dir.as_deref(), &Inputs { files, dirs });
        let path = inputs::combined_path(&dir, dats[0].path());
        match csv_writer(&path) {
            Ok(writer) => {
                println!("Writing to {}", path.display());
                shared.combined = Some(writer);
                shared.summary.combined = Some(path);
            }
            Err(e) => warn!("No combined output: {:#}", e),
        }
    }

    for dat in &mut dats {
        let output = extract_file(dat, options.traversal, options.comments, &mut shared)?;
        shared.summary.outputs.push(output);
    }

    if let Some(combined) = shared.combined.as_mut() {
        combined
            .flush()
            .with_context(|| "Failed to write combined output file")?;
    }

    info!(
        "Wrote {} rows from {} files ({} scans skipped)",
        shared.summary.rows,
        shared.summary.outputs.len(),
        shared.summary.skipped
    );
    Ok(shared.summary)
}
