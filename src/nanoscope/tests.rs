use std::io::Cursor;
use std::path::{Path, PathBuf};

use tempfile::tempdir;

use super::curve::{noise_onset, resync_peakforce};
use super::image::read_piezo_image;
use super::scan::{first_number, length_unit, numbers, string_value};
use super::*;
use crate::config::ReaderConfig;
use crate::error::AfmError;
use crate::model::{FormatDetail, SegmentType, VDEFLECTION};

const DATA_OFFSET: usize = 4096;
const CURVE_BYTES: usize = 64;
const IMAGE_OFFSET: usize = DATA_OFFSET + CURVE_BYTES;

fn header_text() -> String {
    [
        "\\*File list",
        "\\Version: 0x09200201",
        "\\Microscope: Dimension Icon",
        "\\Scanner file: icon.scn",
        "\\*Ciao scan list",
        "\\Operating mode: Force Volume",
        "\\X Offset: -1250.5 nm",
        "\\Y Offset: 30 nm",
        "\\@Sens. DeflSens: V 52.5 nm/V",
        "\\XY Closed Loop: Off",
        "\\Z Closed Loop: On",
        "\\PeakForce Capture: Disallow",
        "\\Samps/line: 2",
        "\\@Sens. Zsens: V 20.0 nm/V",
        "\\*Ciao force list",
        "\\Trigger mode: Relative",
        "\\force/line: 2",
        "\\Scan rate: 1.5 Hz",
        "\\Forward vel.: 5.0 V/s",
        "\\Reverse vel.: 10.0 V/s",
        "\\@4:Trig threshold Deflection: V (0.5 V/LSB) 0.3 V",
        "\\Samps/line: 4 4",
        "\\*Ciao force image list",
        &format!("\\Data offset: {}", DATA_OFFSET),
        &format!("\\Data length: {}", CURVE_BYTES),
        "\\Spring Constant: 0.12",
        "\\Bytes/pixel: 2",
        "\\@4:Ramp size: V [Sens. Zsens] 8.0 V",
        "\\Data offset: 99999",
        "\\*Ciao image list",
        &format!("\\Data offset: {}", IMAGE_OFFSET),
        "\\Data length: 8",
        "\\Samps/line: 2",
        "\\Number of lines: 2",
        "\\Scan Size: 5 5 ~m",
        "\\@2:Z scale: V [Sens. Zsens] (0.006 V/LSB) 2.0 V",
        "\\Bytes/pixel: 2",
        "\\*File list end",
    ]
    .join("\r\n")
        + "\r\n"
}

fn i16_le(values: &[i16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub(crate) fn write_force_volume(dir: &Path, with_data: bool) -> PathBuf {
    let mut bytes = header_text().into_bytes();
    bytes.resize(DATA_OFFSET, 0);
    if with_data {
        for curve in 0..4i16 {
            bytes.extend(i16_le(&[100, 8, 6, 4]));
            bytes.extend(i16_le(&[4, 6, 8, 2 + curve]));
        }
        bytes.extend(i16_le(&[10, 20, 30, 40]));
    }
    let path = dir.join("egel.001");
    std::fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn test_numbers_in_prose() {
    assert_eq!(
        numbers("V [Sens. Zsens] (0.0068 V/LSB) 300.0 V"),
        vec![0.0068, 300.0]
    );
    assert_eq!(first_number("-1250.5 nm"), Some(-1250.5));
    assert_eq!(first_number("1.5e-3 V"), Some(0.0015));
    assert_eq!(numbers("Tip-1 5"), vec![1.0, 5.0]);
    assert_eq!(first_number("fast"), None);
}

#[test]
fn test_string_values_and_units() {
    assert_eq!(string_value("\\Date: 03:04:05 PM\r\n"), Some("03:04:05 PM"));
    assert_eq!(
        string_value("\\Operating mode: Force Volume\r\n"),
        Some("Force Volume")
    );
    assert_eq!(string_value("\\*Ciao scan list"), None);
    assert_eq!(length_unit("5 5 ~m"), Some(1e-6));
    assert_eq!(length_unit("512.0 512.0 nm"), Some(1e-9));
    assert_eq!(length_unit("5 5"), None);
}

#[test]
fn test_header_sections() -> Result<(), Box<dyn std::error::Error>> {
    let header = NanoscopeHeader::parse(Cursor::new(header_text()))?;

    assert_eq!(header.version.as_deref(), Some("0x09200201"));
    assert_eq!(header.microscope.as_deref(), Some("Dimension Icon"));
    assert!(header.force_volume);
    assert!(!header.peakforce);
    assert_eq!(header.x_offset, -1250.5);
    assert_eq!(header.deflection_sensitivity, Some(52.5));
    assert_eq!(header.z_closed_loop.as_deref(), Some("On"));
    assert_eq!(header.piezo_samps_per_line, 2);
    assert_eq!(header.zscan_sensitivity, 20.0);
    assert_eq!(header.trigger_mode.as_deref(), Some("Relative"));
    assert_eq!(header.curves_per_line, 2);
    assert_eq!(header.deflection_v_per_lsb, 0.5);
    assert_eq!((header.retract_points, header.approach_points), (4, 4));
    // only the first data offset of the force image list counts
    assert_eq!(header.data_offset, DATA_OFFSET);
    assert_eq!(header.spring_constant, Some(0.12));
    assert_eq!(header.ramp_size_volts, 8.0);
    assert_eq!(header.image_offset, IMAGE_OFFSET);
    assert!((header.image_scan_x - 5e-6).abs() < 1e-18);
    assert_eq!(header.image_z_sensitivity, 0.006);

    assert_eq!(header.total_curves, 4);
    assert_eq!(header.ramp_size, 160.0);
    assert_eq!(header.speed_forward, 100.0);
    assert_eq!(header.speed_reverse, 200.0);
    assert_eq!(header.zstep_approach, 40.0);
    assert_eq!(header.curve_sample_width()?, 2);
    assert_eq!(header.image_pixel_width()?, 2);
    Ok(())
}

#[test]
fn test_section_scoped_fields_ignored_elsewhere() -> Result<(), Box<dyn std::error::Error>> {
    let text = "\\Trigger mode: Relative\r\n\\Scan rate: 2.0\r\n\\*File list end\r\n\\Version: late\r\n";
    let header = NanoscopeHeader::parse(Cursor::new(text))?;
    assert_eq!(header.trigger_mode, None);
    assert_eq!(header.scan_rate, 0.0);
    assert_eq!(header.version, None);
    Ok(())
}

#[test]
fn test_malformed_numbers_default() -> Result<(), Box<dyn std::error::Error>> {
    let text = "\\*Ciao force list\r\n\\Scan rate: fast\r\n\\Samps/line: many\r\n\\*File list end\r\n";
    let header = NanoscopeHeader::parse(Cursor::new(text))?;
    assert_eq!(header.scan_rate, 0.0);
    assert_eq!(header.approach_points, 0);
    assert_eq!(header.total_curves, 1);
    assert_eq!(header.zstep_approach, 0.0);
    assert!(matches!(
        header.curve_sample_width(),
        Err(AfmError::InvalidStructure(_))
    ));
    Ok(())
}

#[test]
fn test_open_metadata() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = write_force_volume(dir.path(), true);
    let (file, metadata) = NanoscopeFile::open(&path, &ReaderConfig::default())?;

    assert_eq!(metadata.file_id, "egel.001");
    assert_eq!(metadata.file_type, "001");
    assert_eq!(metadata.total_curves, 4);
    assert_eq!(file.curve_count(), 4);
    assert!(metadata.force_volume);
    assert_eq!(metadata.height_channel_key.as_deref(), Some(HEIGHT_CHANNEL));
    assert_eq!(metadata.spring_constant, Some(0.12));
    assert!((metadata.scan_size_x - 5000.0).abs() < 1e-6);
    assert!(matches!(metadata.detail, FormatDetail::Nanoscope(_)));
    Ok(())
}

#[test]
fn test_decode_force_volume_curve() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = write_force_volume(dir.path(), true);
    let (file, _) = NanoscopeFile::open(&path, &ReaderConfig::default())?;

    let curve = file.read_curve(0)?;
    assert_eq!(curve.segment_count(), 2);

    let segments = curve.ordered_segments();
    let (approach, retract) = (segments[0], segments[1]);
    assert_eq!(approach.segment_type, SegmentType::Approach);
    assert_eq!(approach.segment_id, 0);
    assert_eq!(retract.segment_id, 1);

    // 50 / 4 is above the noise ratio, so the first sample is dropped
    assert_eq!(approach.height(), Some(&[40.0, 80.0, 120.0][..]));
    assert_eq!(
        approach.formatted_data.get(VDEFLECTION),
        Some(&[1.0, 2.0, 3.0][..])
    );
    assert_eq!(
        retract.formatted_data.get(VDEFLECTION),
        Some(&[0.0, 3.0, 2.0, 1.0][..])
    );
    assert_eq!(approach.nb_point, 3);
    assert_eq!(retract.nb_point, 4);
    assert_eq!(approach.nb_col, 2);
    assert_eq!(approach.velocity, 100.0);
    assert_eq!(retract.velocity, 200.0);
    assert_eq!(approach.sampling_rate, 1.5);
    assert_eq!(approach.z_displacement, 160.0);
    assert_eq!(approach.force_setpoint_mode.as_deref(), Some("Relative"));
    assert_eq!(approach.raw_data[VDEFLECTION], vec![100, 8, 6, 4]);
    Ok(())
}

#[test]
fn test_curve_offsets_follow_index() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = write_force_volume(dir.path(), true);
    let (file, _) = NanoscopeFile::open(&path, &ReaderConfig::default())?;

    let curve = file.read_curve(3)?;
    let retract = curve.retract_segments().next().unwrap();
    assert_eq!(retract.raw_data[VDEFLECTION], vec![4, 6, 8, 5]);
    assert!(matches!(
        file.read_curve(4),
        Err(AfmError::CurveIndexOutOfRange { index: 4, count: 4 })
    ));
    Ok(())
}

#[test]
fn test_truncated_curve_data() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = write_force_volume(dir.path(), false);
    let (file, _) = NanoscopeFile::open(&path, &ReaderConfig::default())?;
    assert!(matches!(
        file.read_curve(0),
        Err(AfmError::TruncatedBinaryData {
            expected: 16,
            actual: 0,
            ..
        })
    ));
    Ok(())
}

#[test]
fn test_piezo_image() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = write_force_volume(dir.path(), true);
    let (file, _) = NanoscopeFile::open(&path, &ReaderConfig::default())?;

    let image = file.piezo_image()?.unwrap();
    assert_eq!((image.rows(), image.cols()), (2, 2));
    // the first number of the Z scale line is the V/LSB factor
    let scale = 0.006 * 20.0 / 65536.0;
    for (value, expected) in image.data().iter().zip([0.0, 10.0, 20.0, 30.0]) {
        assert!((value - expected * scale).abs() < 1e-12);
    }
    Ok(())
}

#[test]
fn test_image_scale_uses_declared_bytes_per_pixel() -> Result<(), Box<dyn std::error::Error>> {
    let text = header_text().replacen("\\Bytes/pixel: 2", "\\Bytes/pixel: 4", 1);
    let header = NanoscopeHeader::parse(Cursor::new(text.as_bytes()))?;
    assert_eq!(header.bytes_per_pixel, 4);
    assert_eq!(header.image_bytes_per_pixel, 2);

    let mut bytes = text.into_bytes();
    bytes.resize(IMAGE_OFFSET, 0);
    bytes.extend(i16_le(&[10, 20, 30, 40]));

    let image = read_piezo_image(&mut Cursor::new(bytes), &header)?.unwrap();
    // samples stay 2 bytes wide, the Z scale refers to 4-byte pixels
    let scale = 0.006 * 20.0 / 2f64.powi(32);
    for (value, expected) in image.data().iter().zip([0.0, 10.0, 20.0, 30.0]) {
        assert!((value - expected * scale).abs() < 1e-15);
    }
    Ok(())
}

#[test]
fn test_oversized_image_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let mut header = NanoscopeHeader::parse(Cursor::new(header_text().as_bytes()))?;
    // 2-byte pixels with a 2-byte gap after each overflow the region length
    header.image_lines = usize::MAX / 4;
    header.image_samps_per_line = 2;
    header.curves_per_line = 1;
    header.image_data_length = usize::MAX;
    let result = read_piezo_image(&mut Cursor::new(Vec::new()), &header);
    assert!(matches!(result, Err(AfmError::InvalidStructure(_))));
    Ok(())
}

#[test]
fn test_noise_onset() {
    assert_eq!(noise_onset(&[50.0, 4.0, 3.0]), 1);
    assert_eq!(noise_onset(&[1.0, 2.0]), 0);
    // 0/0 is not a jump
    assert_eq!(noise_onset(&[0.0, 0.0, 1.0]), 0);
    assert_eq!(noise_onset(&[100.0, 1.0]), 0);
}

#[test]
fn test_peakforce_resync_splits_at_maximum() -> Result<(), Box<dyn std::error::Error>> {
    let header = NanoscopeHeader {
        peakforce: true,
        pfc_frequency: 1.0,
        pfc_amplitude: 10.0,
        ..Default::default()
    };
    let raw = resync_peakforce(&header, &[1.0, 2.0, 3.0], &[4.0, 9.0, 5.0])?;

    assert_eq!(raw.approach, vec![3.0, 2.0, 1.0, 4.0]);
    assert_eq!(raw.retract, vec![9.0, 5.0]);
    assert_eq!(raw.approach_x.len(), 4);
    assert_eq!(raw.retract_x.len(), 2);
    // drive starts at the top of the sine when the sync distance is zero
    assert!((raw.approach_x[0] - 10.0).abs() < 1e-9);
    Ok(())
}

#[test]
fn test_peakforce_requires_frequency() {
    let header = NanoscopeHeader {
        peakforce: true,
        ..Default::default()
    };
    assert!(matches!(
        resync_peakforce(&header, &[1.0], &[2.0]),
        Err(AfmError::InvalidStructure(_))
    ));
}
