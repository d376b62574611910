use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use eledat_core::{DatFile, FileHeader, ScanLayout};
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::info;

/// Index entries listed in the report
const OFFSETS_SHOWN: usize = 16;

/// Summary of one dat file
#[derive(Debug, Serialize, Deserialize)]
pub struct InspectReport {
    /// Input path
    pub path: String,
    /// Acquisition time, RFC 3339 in UTC
    pub acquired: Option<String>,
    /// Whether the scan index could be read
    pub index_available: bool,
    /// Scans listed in the index
    pub num_scans: usize,
    /// Leading index entries
    pub first_offsets: Vec<u32>,
    /// Layout the file was inspected with
    pub layout: ScanLayout,
    /// Header fields and raw words
    pub header: FileHeader,
}

/// Build the report for `input`
pub fn report(input: &str, layout: ScanLayout) -> Result<InspectReport> {
    let dat = DatFile::from_path(input)
        .with_context(|| format!("Failed to read dat file: {}", input))?
        .with_layout(layout);

    let acquired = Utc
        .timestamp_opt(i64::from(dat.timestamp()), 0)
        .single()
        .map(|dt| dt.to_rfc3339());

    Ok(InspectReport {
        path: input.to_string(),
        acquired,
        index_available: dat.index().is_some(),
        num_scans: dat.num_scans(),
        first_offsets: dat
            .index()
            .map(|index| index.iter().take(OFFSETS_SHOWN).copied().collect())
            .unwrap_or_default(),
        layout: dat.layout(),
        header: dat.header().clone(),
    })
}

pub fn execute(input: &str, output: Option<&str>, layout: ScanLayout) -> Result<()> {
    info!("Inspecting file: {}", input);

    let report = report(input, layout)?;
    let json = serde_json::to_string_pretty(&report)
        .with_context(|| "Failed to serialize inspection report")?;

    if let Some(output_path) = output {
        fs::write(output_path, json)
            .with_context(|| format!("Failed to write output file: {}", output_path))?;
        info!("Report written to: {}", output_path);
    } else {
        println!("{}", json);
    }

    Ok(())
}
