#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

use afmreader::nanoscope::NanoscopeHeader;

fuzz_target!(|data: &[u8]| {
    // Scanning arbitrary bytes must never panic
    if let Ok(header) = NanoscopeHeader::parse(Cursor::new(data)) {
        // Derived layout checks run on whatever the scan produced
        let _ = header.curve_sample_width();
        let _ = header.image_pixel_width();
    }

    // The UFF header reader sees the same input as text
    let _ = afmreader::uff::parse_header(&String::from_utf8_lossy(data));
});
