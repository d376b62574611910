//! CSV row rendering for decoded scans

use eledat_core::{Detector, Mass, ScanHeader};
use std::fs;
use std::path::Path;

/// Line of the sidecar file holding the element list (0-based)
const ELEMENT_LINE: usize = 7;

/// Header labels and values for one scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRow {
    /// Column labels
    pub headers: Vec<String>,
    /// Column values
    pub values: Vec<String>,
}

/// Read element names from a `.FIN2` sidecar
///
/// Names come from the eighth line, comma separated, without its first
/// field. Returns `None` when the file cannot be read.
pub fn read_elements(path: &Path) -> Option<Vec<String>> {
    let content = fs::read(path).ok()?;
    let content = String::from_utf8_lossy(&content);
    let line = content.lines().nth(ELEMENT_LINE).unwrap_or_default().trim();
    Some(line.split(',').skip(1).map(str::to_string).collect())
}

/// Label for the `index`th mass (0-based)
pub fn element_name(elements: Option<&[String]>, index: usize) -> String {
    match elements.and_then(|e| e.get(index)) {
        Some(name) => name.clone(),
        None => format!("Mass{:02}", index + 1),
    }
}

/// Measurement text: negative values as their magnitude with a `*`
pub fn format_measurement(value: i64) -> String {
    if value < 0 {
        format!("{}*", value.unsigned_abs())
    } else {
        value.to_string()
    }
}

/// Six-decimal fixed notation
pub fn format_float(value: f64) -> String {
    format!("{:.6}", value)
}

/// Detectors printed for a mass, in column order
fn detectors(mass: &Mass) -> &'static [Detector] {
    if mass.has_faraday() {
        &[Detector::Pulse, Detector::Analog, Detector::Faraday]
    } else {
        &[Detector::Pulse, Detector::Analog]
    }
}

/// Render one scan
///
/// `ordinal` is the 1-based position of the scan in the traversal and
/// `timestamp` its absolute time.
pub fn scan_row(
    ordinal: usize,
    timestamp: f64,
    header: &ScanHeader,
    masses: &[Mass],
    elements: Option<&[String]>,
) -> ScanRow {
    let mut headers: Vec<String> = vec!["Scan".into(), "Time".into(), "ACF".into()];
    let mut values = vec![
        ordinal.to_string(),
        format_float(timestamp),
        format_float(f64::from(header.acf)),
    ];

    if masses.iter().any(Mass::has_faraday) {
        headers.push("FCF".into());
        values.push(format_float(f64::from(header.fcf)));
    }

    for (j, mass) in masses.iter().enumerate() {
        let element = element_name(elements, j);
        for &detector in detectors(mass) {
            let suffix = &detector.name()[..1];
            for &value in mass.measurements(detector) {
                headers.push(format!("{}{}", element, suffix));
                values.push(format_measurement(value));
            }
        }
        headers.push(String::new());
        values.push(String::new());
    }

    ScanRow { headers, values }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eledat_core::{Measurements, ScanLayout};
    use tempfile::tempdir;

    fn mass(pulse: Vec<i64>, analog: Vec<i64>, faraday: Vec<i64>) -> Mass {
        Mass {
            offset: 0,
            size: 0,
            magnet_mass: None,
            accelerating_voltage: None,
            channel_time: None,
            duration: 0,
            measurements: Measurements {
                pulse,
                analog,
                faraday,
            },
        }
    }

    fn header(acf: u32, fcf: u32) -> ScanHeader {
        let mut words = vec![0u32; 47];
        words[ScanLayout::LEGACY.acf] = acf;
        words[ScanLayout::LEGACY.fcf] = fcf;
        ScanHeader::from_words(0, words, &ScanLayout::LEGACY).unwrap()
    }

    #[test]
    fn test_negative_values_are_starred() {
        assert_eq!(format_measurement(12), "12");
        assert_eq!(format_measurement(-20), "20*");
        assert_eq!(format_measurement(0), "0");
    }

    #[test]
    fn test_row_without_faraday() {
        let masses = vec![mass(vec![5], vec![-3], vec![]), mass(vec![1, 2], vec![], vec![])];
        let row = scan_row(1, 1000.5, &header(7, 9), &masses, None);

        assert_eq!(
            row.headers,
            vec!["Scan", "Time", "ACF", "Mass01p", "Mass01a", "", "Mass02p", "Mass02p", ""]
        );
        assert_eq!(
            row.values,
            vec!["1", "1000.500000", "7.000000", "5", "3*", "", "1", "2", ""]
        );
    }

    #[test]
    fn test_row_with_faraday_adds_fcf() {
        let masses = vec![mass(vec![], vec![4], vec![-100])];
        let elements = vec!["U238".to_string()];
        let row = scan_row(3, 2.0, &header(1, 9), &masses, Some(&elements));

        assert_eq!(
            row.headers,
            vec!["Scan", "Time", "ACF", "FCF", "U238a", "U238f", ""]
        );
        assert_eq!(
            row.values,
            vec!["3", "2.000000", "1.000000", "9.000000", "4", "100*", ""]
        );
    }

    #[test]
    fn test_elements_from_eighth_line() {
        let td = tempdir().unwrap();
        let path = td.path().join("run.FIN2");
        let mut text = String::new();
        for i in 0..7 {
            text.push_str(&format!("line {}\r\n", i));
        }
        text.push_str("Elements,Li7,Pb208,U238\r\n");
        text.push_str("trailing\r\n");
        fs::write(&path, text).unwrap();

        let elements = read_elements(&path).unwrap();

        assert_eq!(elements, vec!["Li7", "Pb208", "U238"]);
        assert_eq!(element_name(Some(&elements), 1), "Pb208");
        assert_eq!(element_name(Some(&elements), 3), "Mass04");
    }

    #[test]
    fn test_missing_sidecar() {
        let td = tempdir().unwrap();
        assert!(read_elements(&td.path().join("absent.FIN2")).is_none());
        assert_eq!(element_name(None, 0), "Mass01");
    }
}
