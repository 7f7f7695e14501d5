use tempfile::tempdir;

use super::*;
use crate::config::ReaderConfig;
use crate::error::AfmError;
use crate::format::{FileFormat, JpkKind};
use crate::jpk::tests::write_map_archive;
use crate::model::VDEFLECTION;
use crate::nanoscope::tests::write_force_volume;

#[test]
fn test_open_dispatches_on_suffix() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let jpk = AfmFile::open(write_map_archive(dir.path(), JpkKind::ForceMap, 4))?;
    assert_eq!(jpk.metadata().format, FileFormat::Jpk(JpkKind::ForceMap));
    assert_eq!(jpk.curve_count(), 4);

    let nanoscope = AfmFile::open(write_force_volume(dir.path(), true))?;
    assert_eq!(nanoscope.metadata().format, FileFormat::Nanoscope);
    assert_eq!(nanoscope.curve_count(), 4);
    Ok(())
}

#[test]
fn test_unsupported_suffix() {
    let result = AfmFile::open("/nonexistent/notes.txt");
    assert!(matches!(result, Err(AfmError::UnsupportedFormat(_))));
}

#[test]
fn test_get_curve_out_of_range() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let file = AfmFile::open(write_map_archive(dir.path(), JpkKind::QuantitativeImaging, 4))?;
    assert!(matches!(
        file.get_curve(4),
        Err(AfmError::CurveIndexOutOfRange { index: 4, count: 4 })
    ));
    assert_eq!(file.curves().count(), 4);
    Ok(())
}

#[test]
fn test_images_are_cached() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let file = AfmFile::open(write_map_archive(dir.path(), JpkKind::ForceMap, 4))?;

    let first = file.piezo_image()?.unwrap();
    assert_eq!((first.rows(), first.cols()), (2, 2));
    let second = file.piezo_image()?.unwrap();
    assert!(std::ptr::eq(first, second));

    let channels = file.channel_images()?;
    assert!(channels.contains_key("Adhesion"));
    assert!(std::ptr::eq(channels, file.channel_images()?));
    Ok(())
}

#[test]
fn test_nanoscope_has_no_channel_images() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let file = AfmFile::open(write_force_volume(dir.path(), true))?;
    assert!(file.channel_images()?.is_empty());
    assert!(file.piezo_image()?.is_some());
    Ok(())
}

#[test]
fn test_write_uff_force_volume() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let file = AfmFile::open(write_force_volume(dir.path(), true))?;
    let out = dir.path().join("uff");

    let written = file.write_uff(&out)?;
    assert_eq!(written.len(), 4);
    assert_eq!(written[2], out.join("egel.001_2.uff"));

    let exported = AfmFile::open(&written[2])?;
    assert_eq!(exported.metadata().file_id, "egel.001");
    assert_eq!(exported.curve_count(), 1);

    let original = file.get_curve(2)?;
    let decoded = exported.get_curve(0)?;
    assert_eq!(decoded.curve_index, 2);
    for (a, b) in original.ordered_segments().into_iter().zip(decoded.ordered_segments()) {
        assert_eq!(a.segment_type, b.segment_type);
        assert_eq!(a.formatted_data, b.formatted_data);
        assert_eq!(a.velocity, b.velocity);
    }
    Ok(())
}

#[test]
fn test_reexport_keeps_uff_header() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let file = AfmFile::open(write_map_archive(dir.path(), JpkKind::ForceMap, 4))?;
    let first = file.write_uff(dir.path().join("a"))?;

    let exported = AfmFile::open(&first[1])?;
    assert!(exported.metadata().found_vdeflection);
    let again = exported.write_uff(dir.path().join("b"))?;
    assert_eq!(again, vec![dir.path().join("b").join("17.37.44.432.uff")]);

    let text_a = std::fs::read_to_string(&first[1])?;
    let text_b = std::fs::read_to_string(&again[0])?;
    assert_eq!(text_a, text_b);

    let curve = exported.get_curve(0)?;
    assert!(curve
        .ordered_segments()
        .iter()
        .all(|s| s.formatted_data.contains(VDEFLECTION)));
    Ok(())
}

#[test]
fn test_load_file_thermal() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("thermal.tnd");
    let mut text = String::from("# sensitivity: 50.0 nm/V\n");
    while text.lines().count() < 23 {
        text.push_str("#\n");
    }
    text.push_str("1000.0 0.1 2.0\n");
    std::fs::write(&path, text)?;

    match load_file(&path, ReaderConfig::default())? {
        LoadedFile::Thermal(thermal) => {
            assert_eq!(thermal.frequency, vec![1000.0]);
            assert!(thermal.fit.is_none());
        }
        LoadedFile::Curves(_) => panic!("expected a thermal-noise table"),
    }

    assert!(matches!(
        AfmFile::open(&path),
        Err(AfmError::UnsupportedFormat(_))
    ));
    Ok(())
}
