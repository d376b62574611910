//! Fuzzing entry points for eledat-core decoders
//!
//! To use with cargo-fuzz:
//! 1. Install cargo-fuzz: cargo install cargo-fuzz
//! 2. Call these from `fuzz_target!` bodies and run `cargo fuzz run <target>`

use eledat_core::{
    constants::END_OF_FILE_HEADER, decoder::decode_mass, FileHeader, IndexedScans,
    NullDiagnostics, RecoveredScans, ScanLayout,
};
use std::io::Cursor;

pub fn fuzz_decode_mass(data: &[u8]) {
    let mut cursor = Cursor::new(data);

    // Decode records until the input runs out - should never panic
    while decode_mass(&mut cursor, 0, 1).is_ok() {}
}

pub fn fuzz_header(data: &[u8]) {
    let mut cursor = Cursor::new(data);
    let Ok(header) = FileHeader::read_from(&mut cursor) else {
        return;
    };
    let Ok(offsets) = header.read_index(&mut cursor) else {
        return;
    };

    // Follow whatever the index claims - should never panic
    let mut sink = NullDiagnostics;
    let mut scans = IndexedScans::new(&mut cursor, &offsets, ScanLayout::LEGACY, &mut sink);
    while let Ok(Some(scan)) = scans.next_scan() {
        scan.for_each(drop);
    }
}

pub fn fuzz_recover(data: &[u8]) {
    let mut cursor = Cursor::new(data);
    let mut sink = NullDiagnostics;
    let mut scans =
        RecoveredScans::new(&mut cursor, END_OF_FILE_HEADER, ScanLayout::REVISED, &mut sink);

    // Resynchronise through arbitrary bytes - should never panic
    while let Some(scan) = scans.next_scan() {
        scan.for_each(drop);
    }
}
