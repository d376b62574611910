//! Record word decomposition
//!
//! A record word is one little-endian `u32`: the top nibble is the key and
//! the low 28 bits are the value. Data words split the value further into
//! `flag(4) | type(4) | exponent(4) | magnitude(16)`.

use crate::constants::{Detector, Key, FIXED_POINT_SCALE};
use crate::error::DatError;
use serde::{Deserialize, Serialize};

/// Mask of the 28-bit value part of a record word
pub const VALUE_MASK: u32 = 0x0FFF_FFFF;

/// A record word split into key nibble and value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordWord {
    /// Top 4 bits
    pub key: u8,
    /// Low 28 bits
    pub value: u32,
}

impl RecordWord {
    /// Split a raw word
    pub const fn split(word: u32) -> Self {
        Self {
            key: (word >> 28) as u8,
            value: word & VALUE_MASK,
        }
    }

    /// The key, or `UnknownKey` carrying the raw nibble
    pub fn key(&self) -> Result<Key, DatError> {
        Key::from_nibble(self.key).ok_or(DatError::UnknownKey(self.key))
    }
}

/// The sub-fields of a data word's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataWord {
    /// Sign flag: any non-zero value negates
    pub flag: u8,
    /// Raw detector type nibble
    pub data_type: u8,
    /// Left shift applied to the magnitude
    pub exponent: u8,
    /// Unsigned 16-bit magnitude
    pub magnitude: u16,
}

impl DataWord {
    /// Decompose the 28-bit value of a data record
    pub const fn from_value(value: u32) -> Self {
        Self {
            flag: ((value >> 24) & 0xF) as u8,
            data_type: ((value >> 20) & 0xF) as u8,
            exponent: ((value >> 16) & 0xF) as u8,
            magnitude: (value & 0xFFFF) as u16,
        }
    }

    /// Detector for this word, or `UnknownDataType` carrying the nibble
    pub fn detector(&self) -> Result<Detector, DatError> {
        Detector::from_nibble(self.data_type).ok_or(DatError::UnknownDataType(self.data_type))
    }

    /// Signed measurement value
    pub fn signed_value(&self) -> i64 {
        signed_magnitude(self.flag, self.exponent, self.magnitude)
    }
}

/// `magnitude << exponent`, negated when `flag != 0`
///
/// Domain: 16-bit magnitude, 4-bit exponent, so the result always fits in 31
/// bits plus sign.
pub fn signed_magnitude(flag: u8, exponent: u8, magnitude: u16) -> i64 {
    let value = i64::from(magnitude) << (exponent & 0xF);
    if flag != 0 {
        -value
    } else {
        value
    }
}

/// Convert a raw 28-bit value to its 2^18 fixed-point reading
pub fn fixed_point(raw: u32) -> f64 {
    f64::from(raw) / FIXED_POINT_SCALE
}

/// Accelerating voltage from the scan's `edac` and the raw tag value
///
/// Carried over unverified: `edac * 1000 / raw / 2^18`. A zero `raw` yields a
/// non-finite value rather than an error.
pub fn accelerating_voltage(edac: u32, raw: u32) -> f64 {
    f64::from(edac) * 1000.0 / f64::from(raw) / FIXED_POINT_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_word() {
        let word = RecordWord::split(0x1234_5678);
        assert_eq!(word.key, 0x1);
        assert_eq!(word.value, 0x0234_5678);
        assert_eq!(word.key(), Ok(Key::Data));
    }

    #[test]
    fn test_unknown_key_carries_code() {
        let word = RecordWord::split(0xD000_0000);
        assert_eq!(word.key(), Err(DatError::UnknownKey(0xD)));
    }

    #[test]
    fn test_data_word_fields() {
        let data = DataWord::from_value(0x0182_0005);
        assert_eq!(data.flag, 0x1);
        assert_eq!(data.data_type, 0x8);
        assert_eq!(data.exponent, 0x2);
        assert_eq!(data.magnitude, 5);
        assert_eq!(data.detector(), Ok(Detector::Faraday));
        assert_eq!(data.signed_value(), -20);
    }

    #[test]
    fn test_unknown_data_type() {
        let data = DataWord::from_value(0x0050_0001);
        assert_eq!(data.detector(), Err(DatError::UnknownDataType(5)));
    }

    #[test]
    fn test_signed_magnitude_fixtures() {
        assert_eq!(signed_magnitude(1, 2, 5), -20);
        assert_eq!(signed_magnitude(0, 0, 7), 7);
        assert_eq!(signed_magnitude(0xF, 0, 1), -1);
        assert_eq!(signed_magnitude(0, 15, 0xFFFF), 0xFFFF << 15);
    }

    #[test]
    fn test_fixed_point() {
        assert_eq!(fixed_point(262_144), 1.0);
        assert_eq!(fixed_point(131_072), 0.5);
    }

    #[test]
    fn test_accelerating_voltage_pinned() {
        // 2^18 * 1000 / 2^18 / 2^18 * edac
        assert_eq!(accelerating_voltage(262_144, 1000), 1.0);
        assert!(!accelerating_voltage(1, 0).is_finite());
    }
}
