//! Strict record decoding: words, mass records and scan headers

use crate::constants::{Key, ScanLayout, SCAN_HEADER_WORDS, SCAN_MAGIC, SCAN_MAGIC_WORD, WORD_SIZE};
use crate::error::{DatError, HeaderMismatch};
use crate::types::{Mass, Measurements, ScanHeader};
use crate::word::{accelerating_voltage, fixed_point, DataWord, RecordWord};
use bytes::Buf;
use std::io::{ErrorKind, Read, Seek, SeekFrom};

/// Result of decoding at a mass position
#[derive(Debug, Clone, PartialEq)]
pub enum MassRecord {
    /// A complete mass, terminated by its end-of-mass word
    Mass(Mass),
    /// The end-of-scan word: the scan has no more masses
    EndOfScan,
}

/// Fill `buf` from `reader`, stopping early only at end of input
///
/// Returns the number of bytes read.
pub fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize, DatError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

/// Fill `buf` completely or fail with `Truncated`
pub fn read_exact_or_truncated<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), DatError> {
    let filled = read_full(reader, buf)?;
    if filled < buf.len() {
        return Err(DatError::Truncated {
            expected: buf.len(),
            actual: filled,
        });
    }
    Ok(())
}

/// Read one little-endian word
pub fn read_word<R: Read>(reader: &mut R) -> Result<u32, DatError> {
    let mut raw = [0u8; WORD_SIZE];
    read_exact_or_truncated(reader, &mut raw)?;
    Ok(u32::from_le_bytes(raw))
}

/// Read `count` consecutive little-endian words
pub fn read_words<R: Read>(reader: &mut R, count: usize) -> Result<Vec<u32>, DatError> {
    let mut raw = vec![0u8; count * WORD_SIZE];
    read_exact_or_truncated(reader, &mut raw)?;

    let mut buf = &raw[..];
    let mut words = Vec::with_capacity(count);
    while buf.has_remaining() {
        words.push(buf.get_u32_le());
    }
    Ok(words)
}

fn set_once<T>(slot: &mut Option<T>, value: T, name: &'static str) -> Result<(), DatError> {
    if slot.is_some() {
        return Err(DatError::DuplicateField(name));
    }
    *slot = Some(value);
    Ok(())
}

/// What a record word did to the mass being accumulated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Keep reading words
    Continue,
    /// End-of-mass word seen; the mass is complete
    EndOfMass,
    /// End-of-scan word seen
    EndOfScan,
}

/// Field-by-field state of one mass record
#[derive(Debug, Clone, Default)]
pub struct MassAccumulator {
    edac: u32,
    magnet_mass: Option<f64>,
    accelerating_voltage: Option<f64>,
    channel_time: Option<u32>,
    duration: Option<u32>,
    measurements: Measurements,
}

impl MassAccumulator {
    /// Start a mass inside a scan with the given `edac`
    pub fn new(edac: u32) -> Self {
        Self {
            edac,
            ..Default::default()
        }
    }

    /// Fold one record word into the mass
    pub fn apply(&mut self, word: RecordWord) -> Result<Step, DatError> {
        match word.key()? {
            Key::EndOfScan => return Ok(Step::EndOfScan),
            Key::EndOfMass => {
                set_once(&mut self.duration, word.value, "duration")?;
                return Ok(Step::EndOfMass);
            }
            // Semantics unknown; recognised and ignored
            Key::BScan | Key::B => {}
            Key::AcceleratingVoltage => {
                self.accelerating_voltage = Some(accelerating_voltage(self.edac, word.value))
            }
            Key::ChannelTime => set_once(&mut self.channel_time, word.value, "channel_time")?,
            Key::MagnetMass => self.magnet_mass = Some(fixed_point(word.value)),
            Key::Data => {
                let data = DataWord::from_value(word.value);
                self.measurements.push(data.detector()?, data.signed_value());
            }
        }
        Ok(Step::Continue)
    }

    /// Turn the accumulated fields into a mass
    pub fn finish(self, offset: u64, size: u64) -> Mass {
        Mass {
            offset,
            size,
            magnet_mass: self.magnet_mass,
            accelerating_voltage: self.accelerating_voltage,
            channel_time: self.channel_time,
            duration: self.duration.unwrap_or_default(),
            measurements: self.measurements,
        }
    }
}

/// Decode one mass record from the reader's current position
///
/// Consumes words until an end-of-mass or end-of-scan word. `offset` is the
/// position the record starts at and `edac` comes from the enclosing scan.
///
/// Fails with:
/// - `UnknownKey` / `UnknownDataType` on undefined codes
/// - `DuplicateField` when `channel_time` or `duration` appears twice
/// - `Truncated` when input ends before a terminating word
pub fn decode_mass<R: Read>(reader: &mut R, offset: u64, edac: u32) -> Result<MassRecord, DatError> {
    let mut mass = MassAccumulator::new(edac);
    let mut size = 0u64;

    loop {
        let word = RecordWord::split(read_word(reader)?);
        size += WORD_SIZE as u64;

        match mass.apply(word)? {
            Step::Continue => {}
            Step::EndOfMass => return Ok(MassRecord::Mass(mass.finish(offset, size))),
            Step::EndOfScan => return Ok(MassRecord::EndOfScan),
        }
    }
}

/// Read a scan header at `offset` without validating it
pub fn read_scan_header<R: Read + Seek>(
    reader: &mut R,
    offset: u64,
    layout: &ScanLayout,
) -> Result<ScanHeader, DatError> {
    reader.seek(SeekFrom::Start(offset))?;
    let words = read_words(reader, SCAN_HEADER_WORDS)?;
    ScanHeader::from_words(offset, words, layout)
}

/// Check the magic triplet and scan number of raw header words
pub fn validate_scan_header(
    words: &[u32],
    expected_number: u32,
    layout: &ScanLayout,
) -> Result<(), HeaderMismatch> {
    let mut magic = [0u32; 3];
    for (slot, word) in magic.iter_mut().zip(words.iter().skip(SCAN_MAGIC_WORD)) {
        *slot = *word;
    }
    if magic != SCAN_MAGIC {
        return Err(HeaderMismatch::BadMagic(magic));
    }

    let found = words.get(layout.number).copied().unwrap_or_default();
    if found != expected_number {
        return Err(HeaderMismatch::WrongNumber {
            expected: expected_number,
            found,
        });
    }

    Ok(())
}

/// Read a scan header at `offset` and require it to look like scan
/// `expected_number`
///
/// Only the header-sized read is consumed; a mismatch yields
/// `InvalidScanHeader` so the caller can resynchronise.
pub fn read_scan_header_checked<R: Read + Seek>(
    reader: &mut R,
    offset: u64,
    layout: &ScanLayout,
    expected_number: u32,
) -> Result<ScanHeader, DatError> {
    reader.seek(SeekFrom::Start(offset))?;
    let words = read_words(reader, SCAN_HEADER_WORDS)?;
    check_scan_header(offset, words, layout, expected_number)
}

/// Build a header from words already read at `offset`, requiring the magic
/// triplet and scan number `expected_number`
pub fn check_scan_header(
    offset: u64,
    words: Vec<u32>,
    layout: &ScanLayout,
    expected_number: u32,
) -> Result<ScanHeader, DatError> {
    validate_scan_header(&words, expected_number, layout)
        .map_err(|reason| DatError::InvalidScanHeader { offset, reason })?;

    ScanHeader::from_words(offset, words, layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::Detector;
    use crate::encoder::{encode_data_word, encode_record_word, MassBuilder, ScanBuilder};
    use std::io::Cursor;

    fn words_to_bytes(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    fn decode(words: &[u32], edac: u32) -> Result<MassRecord, DatError> {
        let mut cursor = Cursor::new(words_to_bytes(words));
        decode_mass(&mut cursor, 0, edac)
    }

    #[test]
    fn test_decode_simple_mass() {
        let words = [
            encode_record_word(Key::MagnetMass, 262_144),
            encode_record_word(Key::ChannelTime, 12),
            encode_data_word(0, Detector::Pulse.code(), 0, 7),
            encode_data_word(1, Detector::Analog.code(), 2, 5),
            encode_data_word(0, Detector::Pulse.code(), 1, 3),
            encode_record_word(Key::EndOfMass, 40),
        ];

        let MassRecord::Mass(mass) = decode(&words, 0).unwrap() else {
            panic!("expected a mass");
        };

        assert_eq!(mass.magnet_mass, Some(1.0));
        assert_eq!(mass.channel_time, Some(12));
        assert_eq!(mass.duration, 40);
        assert_eq!(mass.measurements.pulse, vec![7, 6]);
        assert_eq!(mass.measurements.analog, vec![-20]);
        assert!(!mass.has_faraday());
        assert_eq!(mass.size, 24);
    }

    #[test]
    fn test_end_of_scan() {
        let words = [encode_record_word(Key::EndOfScan, 0)];
        assert_eq!(decode(&words, 0), Ok(MassRecord::EndOfScan));
    }

    #[test]
    fn test_inert_tags_are_skipped() {
        let words = [
            encode_record_word(Key::BScan, 99),
            encode_record_word(Key::B, 1),
            encode_record_word(Key::EndOfMass, 2),
        ];
        let MassRecord::Mass(mass) = decode(&words, 0).unwrap() else {
            panic!("expected a mass");
        };
        assert!(mass.measurements.is_empty());
        assert_eq!(mass.size, 12);
    }

    #[test]
    fn test_accelerating_voltage_uses_edac() {
        let words = [
            encode_record_word(Key::AcceleratingVoltage, 1000),
            encode_record_word(Key::EndOfMass, 1),
        ];
        let MassRecord::Mass(mass) = decode(&words, 262_144).unwrap() else {
            panic!("expected a mass");
        };
        assert_eq!(mass.accelerating_voltage, Some(1.0));
    }

    #[test]
    fn test_magnet_mass_is_overwritten() {
        let words = [
            encode_record_word(Key::MagnetMass, 262_144),
            encode_record_word(Key::MagnetMass, 524_288),
            encode_record_word(Key::EndOfMass, 1),
        ];
        let MassRecord::Mass(mass) = decode(&words, 0).unwrap() else {
            panic!("expected a mass");
        };
        assert_eq!(mass.magnet_mass, Some(2.0));
    }

    #[test]
    fn test_duplicate_channel_time() {
        let words = [
            encode_record_word(Key::ChannelTime, 1),
            encode_record_word(Key::ChannelTime, 2),
            encode_record_word(Key::EndOfMass, 1),
        ];
        assert_eq!(decode(&words, 0), Err(DatError::DuplicateField("channel_time")));
    }

    #[test]
    fn test_duplicate_duration() {
        let mut mass = MassAccumulator::new(0);
        let eom = RecordWord::split(encode_record_word(Key::EndOfMass, 5));

        assert_eq!(mass.apply(eom), Ok(Step::EndOfMass));
        assert_eq!(mass.apply(eom), Err(DatError::DuplicateField("duration")));
    }

    #[test]
    fn test_unknown_key() {
        let words = [0x5000_0000u32, encode_record_word(Key::EndOfMass, 1)];
        assert_eq!(decode(&words, 0), Err(DatError::UnknownKey(5)));
    }

    #[test]
    fn test_unknown_data_type() {
        let words = [encode_data_word(0, 0x5, 0, 1)];
        assert_eq!(decode(&words, 0), Err(DatError::UnknownDataType(5)));
    }

    #[test]
    fn test_missing_sentinel_is_truncated() {
        let words = [encode_data_word(0, 0x1, 0, 1)];
        let result = decode(&words, 0);
        assert_eq!(
            result,
            Err(DatError::Truncated {
                expected: 4,
                actual: 0
            })
        );
    }

    #[test]
    fn test_checked_header_rejects_bad_magic() {
        let scan = ScanBuilder::new(1).magic([0xD, 0xE, 0xE]);
        let mut cursor = Cursor::new(words_to_bytes(&scan.words()));

        let result = read_scan_header_checked(&mut cursor, 0, &ScanLayout::LEGACY, 1);

        assert_eq!(
            result,
            Err(DatError::InvalidScanHeader {
                offset: 0,
                reason: HeaderMismatch::BadMagic([0xD, 0xE, 0xE]),
            })
        );
    }

    #[test]
    fn test_checked_header_rejects_wrong_number() {
        let scan = ScanBuilder::new(3).mass(MassBuilder::new().duration(1));
        let mut cursor = Cursor::new(words_to_bytes(&scan.words()));

        let result = read_scan_header_checked(&mut cursor, 0, &ScanLayout::LEGACY, 2);

        assert_eq!(
            result,
            Err(DatError::InvalidScanHeader {
                offset: 0,
                reason: HeaderMismatch::WrongNumber { expected: 2, found: 3 },
            })
        );
    }

    #[test]
    fn test_checked_header_accepts_expected_scan() {
        let scan = ScanBuilder::new(2).acf(77).time(1500);
        let mut cursor = Cursor::new(words_to_bytes(&scan.words()));

        let header = read_scan_header_checked(&mut cursor, 0, &ScanLayout::LEGACY, 2).unwrap();

        assert_eq!(header.number, 2);
        assert_eq!(header.acf, 77);
        assert_eq!(header.time, 1500);
        assert_eq!(cursor.position(), 188);
    }
}
