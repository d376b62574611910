//! Constants and layouts for the Element `.dat` acquisition format

use serde::{Deserialize, Serialize};

/// Size of one record word in bytes (little-endian `u32`)
pub const WORD_SIZE: usize = 4;

/// Byte offset of the file header field array
pub const FILE_HEADER_OFFSET: u64 = 0x10;

/// Number of words in the file header field array
pub const FILE_HEADER_WORDS: usize = 85;

/// Byte offset just past the file header (first possible scan position)
pub const END_OF_FILE_HEADER: u64 = FILE_HEADER_OFFSET + (FILE_HEADER_WORDS * WORD_SIZE) as u64;

/// File header word holding the byte offset of the scan index
pub const HDR_INDEX_OFFSET: usize = 33;

/// File header word holding the number of scan index entries
pub const HDR_INDEX_LEN: usize = 39;

/// File header word holding the acquisition timestamp (seconds since epoch)
pub const HDR_TIMESTAMP: usize = 40;

/// Distance from the index offset to the first index entry
pub const INDEX_ENTRIES_SKIP: u64 = 4;

/// Number of words in a scan header
pub const SCAN_HEADER_WORDS: usize = 47;

/// Size of a scan header in bytes (47 words = 188 bytes)
pub const SCAN_HEADER_SIZE: usize = SCAN_HEADER_WORDS * WORD_SIZE;

/// First scan header word of the recovery magic triplet
pub const SCAN_MAGIC_WORD: usize = 3;

/// Expected values of scan header words 3, 4 and 5
pub const SCAN_MAGIC: [u32; 3] = [0xD, 0xE, 0xF];

/// The magic triplet as it appears on disk
pub const SCAN_MAGIC_BYTES: &[u8; 12] = b"\x0D\x00\x00\x00\x0E\x00\x00\x00\x0F\x00\x00\x00";

/// Byte offset of the magic triplet inside a scan header
pub const SCAN_MAGIC_OFFSET: usize = SCAN_MAGIC_WORD * WORD_SIZE;

/// Divisor of the 14.18 fixed-point values (magnet mass, voltage)
pub const FIXED_POINT_SCALE: f64 = (1u32 << 18) as f64;

/// Record key: the top nibble of a record word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Measurement data (0x1)
    Data,
    /// Magnet mass reading (0x2)
    MagnetMass,
    /// Channel time (0x3)
    ChannelTime,
    /// Accelerating voltage (0x4)
    AcceleratingVoltage,
    /// End of mass; value is the mass duration (0x8)
    EndOfMass,
    /// Unresolved tag (0xB)
    B,
    /// "B-scan" tag, semantics unresolved (0xC)
    BScan,
    /// End of scan (0xF)
    EndOfScan,
}

impl Key {
    /// Map a raw nibble to a key, if it is one the format defines
    pub const fn from_nibble(code: u8) -> Option<Self> {
        match code {
            0x1 => Some(Key::Data),
            0x2 => Some(Key::MagnetMass),
            0x3 => Some(Key::ChannelTime),
            0x4 => Some(Key::AcceleratingVoltage),
            0x8 => Some(Key::EndOfMass),
            0xB => Some(Key::B),
            0xC => Some(Key::BScan),
            0xF => Some(Key::EndOfScan),
            _ => None,
        }
    }

    /// The raw nibble for this key
    pub const fn code(&self) -> u8 {
        match self {
            Key::Data => 0x1,
            Key::MagnetMass => 0x2,
            Key::ChannelTime => 0x3,
            Key::AcceleratingVoltage => 0x4,
            Key::EndOfMass => 0x8,
            Key::B => 0xB,
            Key::BScan => 0xC,
            Key::EndOfScan => 0xF,
        }
    }
}

/// Detector a data word was measured on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Detector {
    /// Analog counting (data type 0x0)
    Analog,
    /// Pulse counting (data type 0x1)
    Pulse,
    /// Faraday cup (data type 0x8)
    Faraday,
}

impl Detector {
    /// Map a data-type nibble to a detector
    pub const fn from_nibble(code: u8) -> Option<Self> {
        match code {
            0x0 => Some(Detector::Analog),
            0x1 => Some(Detector::Pulse),
            0x8 => Some(Detector::Faraday),
            _ => None,
        }
    }

    /// The raw data-type nibble
    pub const fn code(&self) -> u8 {
        match self {
            Detector::Analog => 0x0,
            Detector::Pulse => 0x1,
            Detector::Faraday => 0x8,
        }
    }

    /// Lowercase name, also used for CSV column suffixes
    pub const fn name(&self) -> &'static str {
        match self {
            Detector::Analog => "analog",
            Detector::Pulse => "pulse",
            Detector::Faraday => "faraday",
        }
    }
}

/// Word positions inside a scan header
///
/// The position of the faraday conversion factor moved between format
/// revisions, so it is carried here instead of being a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanLayout {
    /// Word holding `delta`
    pub delta: usize,
    /// Word holding the scan number
    pub number: usize,
    /// Word holding the analog conversion factor
    pub acf: usize,
    /// Word holding the previous scan's time
    pub previous_time: usize,
    /// Word holding the scan time (ms from file timestamp)
    pub time: usize,
    /// Word holding `edac`
    pub edac: usize,
    /// Word holding the faraday conversion factor
    pub fcf: usize,
}

impl ScanLayout {
    /// Layout of older files: fcf at word 35
    pub const LEGACY: ScanLayout = ScanLayout {
        delta: 7,
        number: 9,
        acf: 12,
        previous_time: 18,
        time: 19,
        edac: 31,
        fcf: 35,
    };

    /// Layout of newer files: fcf at word 34
    pub const REVISED: ScanLayout = ScanLayout {
        fcf: 34,
        ..ScanLayout::LEGACY
    };

    /// Same layout with the fcf read from another word
    ///
    /// `None` when `fcf` lies past the scan header.
    pub const fn with_fcf_word(self, fcf: usize) -> Option<Self> {
        if fcf >= SCAN_HEADER_WORDS {
            return None;
        }
        Some(ScanLayout { fcf, ..self })
    }
}

impl Default for ScanLayout {
    fn default() -> Self {
        ScanLayout::LEGACY
    }
}
