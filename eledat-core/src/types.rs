//! Decoded record types

use crate::constants::{Detector, ScanLayout, SCAN_HEADER_SIZE, SCAN_MAGIC_WORD};
use crate::error::DatError;
use serde::{Deserialize, Serialize};

/// Signed measurements of one mass, per detector, in stream order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurements {
    /// Pulse counting values
    pub pulse: Vec<i64>,
    /// Analog values
    pub analog: Vec<i64>,
    /// Faraday values
    pub faraday: Vec<i64>,
}

impl Measurements {
    /// Append a value to the sequence of `detector`
    pub fn push(&mut self, detector: Detector, value: i64) {
        match detector {
            Detector::Pulse => self.pulse.push(value),
            Detector::Analog => self.analog.push(value),
            Detector::Faraday => self.faraday.push(value),
        }
    }

    /// Values measured on `detector`
    pub fn get(&self, detector: Detector) -> &[i64] {
        match detector {
            Detector::Pulse => &self.pulse,
            Detector::Analog => &self.analog,
            Detector::Faraday => &self.faraday,
        }
    }

    /// Total number of values across detectors
    pub fn len(&self) -> usize {
        self.pulse.len() + self.analog.len() + self.faraday.len()
    }

    /// True when no detector has values
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One analyte channel within a scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mass {
    /// Byte offset of the first record word
    pub offset: u64,

    /// Bytes consumed, including the end-of-mass word
    pub size: u64,

    /// Magnet field reading, `raw / 2^18`
    pub magnet_mass: Option<f64>,

    /// Derived from the scan's `edac`; see [`crate::word::accelerating_voltage`]
    pub accelerating_voltage: Option<f64>,

    /// Channel time
    pub channel_time: Option<u32>,

    /// Value of the end-of-mass word
    pub duration: u32,

    /// Detector values
    pub measurements: Measurements,
}

impl Mass {
    /// Values measured on `detector`
    pub fn measurements(&self, detector: Detector) -> &[i64] {
        self.measurements.get(detector)
    }

    /// Whether any faraday value was recorded
    pub fn has_faraday(&self) -> bool {
        !self.measurements.faraday.is_empty()
    }
}

/// The fixed 47-word header in front of each scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanHeader {
    /// Byte offset of the header
    pub offset: u64,

    /// Scan number, 1-based
    pub number: u32,

    /// Delta
    pub delta: u32,

    /// Analog conversion factor
    pub acf: u32,

    /// Time of the previous scan (ms)
    pub previous_time: u32,

    /// Time of this scan, ms from the file timestamp
    pub time: u32,

    /// Used to derive accelerating voltages
    pub edac: u32,

    /// Faraday conversion factor
    pub fcf: u32,

    /// Raw header words
    pub words: Vec<u32>,
}

impl ScanHeader {
    /// Pick the fields out of raw header words according to `layout`
    pub fn from_words(offset: u64, words: Vec<u32>, layout: &ScanLayout) -> Result<Self, DatError> {
        let field = |index: usize| {
            words.get(index).copied().ok_or(DatError::Truncated {
                expected: SCAN_HEADER_SIZE,
                actual: words.len() * 4,
            })
        };

        Ok(Self {
            offset,
            number: field(layout.number)?,
            delta: field(layout.delta)?,
            acf: field(layout.acf)?,
            previous_time: field(layout.previous_time)?,
            time: field(layout.time)?,
            edac: field(layout.edac)?,
            fcf: field(layout.fcf)?,
            words,
        })
    }

    /// Words 3, 4 and 5
    pub fn magic(&self) -> [u32; 3] {
        let mut magic = [0u32; 3];
        for (slot, word) in magic.iter_mut().zip(self.words.iter().skip(SCAN_MAGIC_WORD)) {
            *slot = *word;
        }
        magic
    }

    /// Byte offset of the first mass record
    pub fn data_offset(&self) -> u64 {
        self.offset + SCAN_HEADER_SIZE as u64
    }

    /// Absolute acquisition time: file timestamp plus `time / 1000`
    pub fn timestamp(&self, file_timestamp: u32) -> f64 {
        f64::from(file_timestamp) + f64::from(self.time) / 1000.0
    }
}
