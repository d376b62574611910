//! Synthetic dat file encoding
//!
//! Produces well-formed files for tests, benches and fuzz seeds. The layout
//! written is:
//! 1. 16 zero bytes
//! 2. File header: 85 words (timestamp, index offset, index length)
//! 3. Scans: 47-word header, mass records, end-of-scan word
//! 4. Index: one filler word, then one offset per scan

use crate::constants::{
    Detector, Key, ScanLayout, END_OF_FILE_HEADER, FILE_HEADER_OFFSET, FILE_HEADER_WORDS,
    HDR_INDEX_LEN, HDR_INDEX_OFFSET, HDR_TIMESTAMP, SCAN_HEADER_WORDS, SCAN_MAGIC,
    SCAN_MAGIC_WORD,
};
use crate::word::VALUE_MASK;
use bytes::{BufMut, BytesMut};

/// Build a record word from a key and a 28-bit value
pub fn encode_record_word(key: Key, value: u32) -> u32 {
    (u32::from(key.code()) << 28) | (value & VALUE_MASK)
}

/// Build a data word from raw sub-fields
///
/// `data_type` is taken as-is so undefined types can be encoded.
pub fn encode_data_word(flag: u8, data_type: u8, exponent: u8, magnitude: u16) -> u32 {
    let value = (u32::from(flag & 0xF) << 24)
        | (u32::from(data_type & 0xF) << 20)
        | (u32::from(exponent & 0xF) << 16)
        | u32::from(magnitude);
    encode_record_word(Key::Data, value)
}

/// Pick flag, exponent and magnitude for a signed value
///
/// Uses the smallest exponent whose magnitude fits in 16 bits; low bits that
/// do not fit are dropped.
pub fn split_signed(value: i64) -> (u8, u8, u16) {
    let flag = u8::from(value < 0);
    let abs = value.unsigned_abs();
    let mut exponent = 0u8;
    while exponent < 15 && (abs >> exponent) > u64::from(u16::MAX) {
        exponent += 1;
    }
    let magnitude = (abs >> exponent).min(u64::from(u16::MAX)) as u16;
    (flag, exponent, magnitude)
}

/// Builder for one mass record
#[derive(Debug, Clone, Default)]
pub struct MassBuilder {
    words: Vec<u32>,
    duration: u32,
}

impl MassBuilder {
    /// Start an empty mass
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a magnet mass word with a raw fixed-point value
    pub fn magnet_mass(mut self, raw: u32) -> Self {
        self.words.push(encode_record_word(Key::MagnetMass, raw));
        self
    }

    /// Add a channel time word
    pub fn channel_time(mut self, time: u32) -> Self {
        self.words.push(encode_record_word(Key::ChannelTime, time));
        self
    }

    /// Add an accelerating voltage word with a raw value
    pub fn accelerating_voltage(mut self, raw: u32) -> Self {
        self.words.push(encode_record_word(Key::AcceleratingVoltage, raw));
        self
    }

    /// Add a measurement
    pub fn value(mut self, detector: Detector, value: i64) -> Self {
        let (flag, exponent, magnitude) = split_signed(value);
        self.words
            .push(encode_data_word(flag, detector.code(), exponent, magnitude));
        self
    }

    /// Add an arbitrary word
    pub fn raw(mut self, word: u32) -> Self {
        self.words.push(word);
        self
    }

    /// Value of the closing end-of-mass word
    pub fn duration(mut self, duration: u32) -> Self {
        self.duration = duration;
        self
    }

    /// Encoded words, end-of-mass included
    pub fn words(&self) -> Vec<u32> {
        let mut words = self.words.clone();
        words.push(encode_record_word(Key::EndOfMass, self.duration));
        words
    }
}

/// Builder for one scan: header, masses and end-of-scan word
#[derive(Debug, Clone)]
pub struct ScanBuilder {
    header: Vec<u32>,
    layout: ScanLayout,
    masses: Vec<MassBuilder>,
    end_of_scan: bool,
}

impl ScanBuilder {
    /// Scan with the given number, legacy layout and zeroed factors
    pub fn new(number: u32) -> Self {
        let mut header = vec![0u32; SCAN_HEADER_WORDS];
        header[SCAN_MAGIC_WORD..SCAN_MAGIC_WORD + 3].copy_from_slice(&SCAN_MAGIC);
        let layout = ScanLayout::LEGACY;
        header[layout.number] = number;
        Self {
            header,
            layout,
            masses: Vec::new(),
            end_of_scan: true,
        }
    }

    /// Write header fields at the positions of `layout`
    pub fn layout(mut self, layout: ScanLayout) -> Self {
        let fields = [
            (self.layout.number, layout.number),
            (self.layout.delta, layout.delta),
            (self.layout.acf, layout.acf),
            (self.layout.previous_time, layout.previous_time),
            (self.layout.time, layout.time),
            (self.layout.edac, layout.edac),
            (self.layout.fcf, layout.fcf),
        ];
        let mut header = vec![0u32; SCAN_HEADER_WORDS];
        header[SCAN_MAGIC_WORD..SCAN_MAGIC_WORD + 3].copy_from_slice(&SCAN_MAGIC);
        for (from, to) in fields {
            header[to] = self.header[from];
        }
        self.header = header;
        self.layout = layout;
        self
    }

    /// Set `delta`
    pub fn delta(mut self, delta: u32) -> Self {
        self.header[self.layout.delta] = delta;
        self
    }

    /// Set the analog conversion factor
    pub fn acf(mut self, acf: u32) -> Self {
        self.header[self.layout.acf] = acf;
        self
    }

    /// Set the scan time (ms)
    pub fn time(mut self, time: u32) -> Self {
        self.header[self.layout.time] = time;
        self
    }

    /// Set the previous scan time (ms)
    pub fn previous_time(mut self, time: u32) -> Self {
        self.header[self.layout.previous_time] = time;
        self
    }

    /// Set `edac`
    pub fn edac(mut self, edac: u32) -> Self {
        self.header[self.layout.edac] = edac;
        self
    }

    /// Set the faraday conversion factor
    pub fn fcf(mut self, fcf: u32) -> Self {
        self.header[self.layout.fcf] = fcf;
        self
    }

    /// Overwrite the magic triplet
    pub fn magic(mut self, magic: [u32; 3]) -> Self {
        self.header[SCAN_MAGIC_WORD..SCAN_MAGIC_WORD + 3].copy_from_slice(&magic);
        self
    }

    /// Append a mass
    pub fn mass(mut self, mass: MassBuilder) -> Self {
        self.masses.push(mass);
        self
    }

    /// Leave out the end-of-scan word
    pub fn without_end_of_scan(mut self) -> Self {
        self.end_of_scan = false;
        self
    }

    /// Encoded words
    pub fn words(&self) -> Vec<u32> {
        let mut words = self.header.clone();
        for mass in &self.masses {
            words.extend(mass.words());
        }
        if self.end_of_scan {
            words.push(encode_record_word(Key::EndOfScan, 0));
        }
        words
    }
}

enum Segment {
    Scan(ScanBuilder),
    Garbage(Vec<u8>),
}

/// Builder for a complete file
pub struct DatBuilder {
    timestamp: u32,
    segments: Vec<Segment>,
    corrupt_index: bool,
}

impl DatBuilder {
    /// Empty file with the given acquisition timestamp
    pub fn new(timestamp: u32) -> Self {
        Self {
            timestamp,
            segments: Vec::new(),
            corrupt_index: false,
        }
    }

    /// Append a scan
    pub fn scan(mut self, scan: ScanBuilder) -> Self {
        self.segments.push(Segment::Scan(scan));
        self
    }

    /// Append bytes that belong to no scan
    pub fn garbage(mut self, bytes: &[u8]) -> Self {
        self.segments.push(Segment::Garbage(bytes.to_vec()));
        self
    }

    /// Point the index past the end of the file
    pub fn corrupt_index(mut self) -> Self {
        self.corrupt_index = true;
        self
    }

    /// Encode the file, returning its bytes
    pub fn build(&self) -> Vec<u8> {
        self.build_with_offsets().0
    }

    /// Encode the file, returning its bytes and each scan's offset
    pub fn build_with_offsets(&self) -> (Vec<u8>, Vec<u32>) {
        let mut body = BytesMut::new();
        let mut offsets = Vec::new();

        for segment in &self.segments {
            match segment {
                Segment::Scan(scan) => {
                    offsets.push(END_OF_FILE_HEADER as u32 + body.len() as u32);
                    for word in scan.words() {
                        body.put_u32_le(word);
                    }
                }
                Segment::Garbage(bytes) => body.put_slice(bytes),
            }
        }

        let index_offset = END_OF_FILE_HEADER as u32 + body.len() as u32;
        let mut header = vec![0u32; FILE_HEADER_WORDS];
        header[HDR_TIMESTAMP] = self.timestamp;
        if self.corrupt_index {
            header[HDR_INDEX_OFFSET] = 0x7FFF_FF00;
            header[HDR_INDEX_LEN] = 0x00FF_FFFF;
        } else {
            header[HDR_INDEX_OFFSET] = index_offset;
            header[HDR_INDEX_LEN] = offsets.len() as u32;
        }

        let mut buf = BytesMut::with_capacity(index_offset as usize + 4 * (offsets.len() + 1));
        buf.put_bytes(0, FILE_HEADER_OFFSET as usize);
        for word in &header {
            buf.put_u32_le(*word);
        }
        buf.put_slice(&body);
        buf.put_u32_le(offsets.len() as u32);
        for offset in &offsets {
            buf.put_u32_le(*offset);
        }

        (buf.to_vec(), offsets)
    }
}
