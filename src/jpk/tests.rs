use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::tempdir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use super::*;
use crate::config::ReaderConfig;
use crate::error::AfmError;
use crate::format::JpkKind;
use crate::model::{SegmentType, VDEFLECTION};
use crate::tiff::tests::{build_tiff, TestPage, TestTag};

const MAP_SHARED_HEADER: &str = "\
lcd-infos.count=2
lcd-info.0.channel.name=vDeflection
lcd-info.0.encoder.type=signedinteger
lcd-info.0.encoder.scaling.multiplier=0.5
lcd-info.0.encoder.scaling.offset=2.0
lcd-info.0.conversion-set.conversions.base=volts
lcd-info.0.conversion-set.conversion.distance.defined=true
lcd-info.0.conversion-set.conversion.distance.scaling.multiplier=5.0E-8
lcd-info.0.conversion-set.conversion.distance.scaling.offset=0.0
lcd-info.0.conversion-set.conversion.force.defined=true
lcd-info.0.conversion-set.conversion.force.scaling.multiplier=0.25
lcd-info.0.conversion-set.conversion.force.scaling.offset=0.0
lcd-info.1.channel.name=measuredHeight
lcd-info.1.encoder.type=signedshort
lcd-info.1.encoder.scaling.multiplier=2.0
lcd-info.1.encoder.scaling.offset=1.0
lcd-info.1.conversion-set.conversions.base=nominal
lcd-info.1.conversion-set.conversion.absolute.defined=true
lcd-info.1.conversion-set.conversion.absolute.scaling.multiplier=3.0
lcd-info.1.conversion-set.conversion.absolute.scaling.offset=0.0
lcd-info.1.conversion-set.conversion.nominal.defined=true
lcd-info.1.conversion-set.conversion.nominal.scaling.multiplier=1.0
lcd-info.1.conversion-set.conversion.nominal.scaling.offset=5.0
force-segment-header-infos.count=2
force-segment-header-info.0.settings.style=extend
force-segment-header-info.0.settings.segment-settings.setpoint=1.0E-9
force-segment-header-info.0.settings.segment-settings.z-start=0.0
force-segment-header-info.0.settings.segment-settings.z-end=2.0E-6
force-segment-header-info.1.settings.style=retract
force-segment-header-info.1.settings.segment-settings.z-start=2.0E-6
force-segment-header-info.1.settings.segment-settings.z-end=0.0
";

fn map_header(kind: JpkKind) -> String {
    let prefix = kind.prefix();
    format!(
        "#Fri Nov 05 17:37:44 CET 2021\n\
{p}.description.instrument=nanowizard\n\
{p}.description.source-software=6.1.191\n\
{p}.position-pattern.grid.ilength=2\n\
{p}.position-pattern.grid.jlength=2\n\
{p}.position-pattern.grid.ulength=2.0E-5\n\
{p}.position-pattern.grid.theta=0.0\n\
{p}.settings.force-settings.closed-loop=true\n\
{p}.settings.force-settings.relative-setpoint=2.5\n\
{p}.indexes.max=3\n",
        p = prefix
    )
}

fn segment_header(points: usize) -> String {
    format!(
        "force-segment-header.num-points={}\n\
force-segment-header.duration=0.5\n\
force-segment-header.baseline.measured=false\n\
channels.list=vDeflection measuredHeight\n",
        points
    )
}

fn i32_be(values: &[i32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

fn i16_be(values: &[i16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

/// Write a 2x2 map whose approach ends at raw height `curve` for each curve
pub(crate) fn write_map_archive(dir: &Path, kind: JpkKind, curves: usize) -> PathBuf {
    let path = dir.join(format!("map-data-2021.11.05-17.37.44.432.{}", kind.suffix()));
    let file = File::create(&path).unwrap();
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    zip.start_file("header.properties", options).unwrap();
    zip.write_all(map_header(kind).as_bytes()).unwrap();
    zip.start_file("shared-data/header.properties", options).unwrap();
    zip.write_all(MAP_SHARED_HEADER.as_bytes()).unwrap();

    for curve in 0..curves {
        let c = curve as i16;
        for segment in 0..2 {
            let base = format!("index/{}/segments/{}", curve, segment);
            zip.add_directory(format!("{}/", base), options).unwrap();
            zip.start_file(format!("{}/segment-header.properties", base), options)
                .unwrap();
            zip.write_all(segment_header(3).as_bytes()).unwrap();

            let heights: [i16; 3] = if segment == 0 { [20, 10, c] } else { [c, 10, 20] };
            zip.start_file(format!("{}/channels/measuredHeight.dat", base), options)
                .unwrap();
            zip.write_all(&i16_be(&heights)).unwrap();
            zip.start_file(format!("{}/channels/vDeflection.dat", base), options)
                .unwrap();
            zip.write_all(&i32_be(&[0, 2, 4])).unwrap();
        }
    }

    if let Some(image_entry) = kind.image_entry() {
        zip.start_file(image_entry, options).unwrap();
        zip.write_all(&channel_image()).unwrap();
    }

    zip.finish().unwrap();
    path
}

fn scaling_tags(label: &str, multiplier: f64, offset: f64) -> Vec<(u16, TestTag)> {
    vec![
        (32880, TestTag::Ascii(label.to_string())),
        (32881, TestTag::Ascii("SignedInteger".to_string())),
        (32882, TestTag::Ascii("m".to_string())),
        (32883, TestTag::Ascii("LinearScaling".to_string())),
        (32884, TestTag::Double(multiplier)),
        (32885, TestTag::Double(offset)),
        (32886, TestTag::Long(0)),
    ]
}

fn channel_page(channel: &str, label: &str, pixels: Vec<i32>) -> TestPage {
    let mut tags = vec![(
        32850,
        TestTag::Ascii(format!(
            "channel: {}\nalgorithm.object-name.base-object-name.fancy-name",
            channel
        )),
    )];
    tags.extend(scaling_tags(label, 2.0, 1.0));
    TestPage {
        width: 2,
        height: 2,
        pixels,
        tags,
    }
}

fn channel_image() -> Vec<u8> {
    build_tiff(&[
        TestPage {
            width: 1,
            height: 1,
            pixels: vec![0],
            tags: vec![],
        },
        channel_page("Height (measured)", "Calibrated height", vec![0, 1, 2, 3]),
        // wrong scaling label for a height channel
        channel_page("Height", "volts", vec![0, 1, 2, 3]),
        channel_page("Adhesion", "Force", vec![-1, 0, 1, 2]),
        // not whitelisted
        channel_page("Stiffness", "Force", vec![0, 0, 0, 0]),
    ])
}

fn write_single_curve(dir: &Path, channels: &str, with_height: bool) -> PathBuf {
    let path = dir.join("force-save-2022.01.01-10.00.00.000.jpk-force");
    let file = File::create(&path).unwrap();
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    zip.start_file("header.properties", options).unwrap();
    zip.write_all(
        b"force-scan-series.header.force-settings.relative-setpoint=1.5\n\
force-scan-series.force-segments.count=3\n\
relative-z-start=0.0\n\
relative-z-end=1.0E-6\n",
    )
    .unwrap();
    zip.start_file("shared-data/header.properties", options).unwrap();
    zip.write_all(MAP_SHARED_HEADER.as_bytes()).unwrap();

    for (segment, style) in ["extend", "pause", "retract"].iter().enumerate() {
        let base = format!("segments/{}", segment);
        zip.start_file(format!("{}/segment-header.properties", base), options)
            .unwrap();
        zip.write_all(
            format!(
                "force-segment-header.num-points=2\n\
force-segment-header.duration=0.1\n\
force-segment-header.baseline.measured=true\n\
force-segment-header.baseline.baseline=0.5\n\
force-segment-header.settings.style={}\n\
force-segment-header.settings.segment-settings.z-start=0.0\n\
force-segment-header.settings.segment-settings.z-end=1.0E-7\n\
channels.list={}\n",
                style, channels
            )
            .as_bytes(),
        )
        .unwrap();
        if with_height {
            zip.start_file(format!("{}/channels/measuredHeight.dat", base), options)
                .unwrap();
            zip.write_all(&i16_be(&[100, 50])).unwrap();
        }
        zip.start_file(format!("{}/channels/vDeflection.dat", base), options)
            .unwrap();
        zip.write_all(&i32_be(&[50, 60])).unwrap();
    }

    zip.finish().unwrap();
    path
}

#[test]
fn test_layout_classifies_entries() {
    let map = PathLayout::for_kind(JpkKind::ForceMap);
    assert_eq!(
        map.classify("index/12/segments/1/channels/vDeflection.dat"),
        Some(EntryAddress {
            curve: 12,
            segment: 1,
            kind: EntryKind::Channel("vDeflection".to_string()),
        })
    );
    assert_eq!(
        map.classify("index/0/segments/0/segment-header.properties")
            .map(|a| a.kind),
        Some(EntryKind::SegmentHeader)
    );
    assert_eq!(map.classify("index/0/segments/"), None);
    assert_eq!(map.classify("index/0/header.properties"), None);
    assert_eq!(map.classify("segments/0/channels/height.dat"), None);

    let single = PathLayout::for_kind(JpkKind::ForceCurve);
    assert_eq!(
        single.classify("segments/2/channels/height.dat"),
        Some(EntryAddress {
            curve: 0,
            segment: 2,
            kind: EntryKind::Channel("height".to_string()),
        })
    );
    assert_eq!(single.classify("segments/x/channels/height.dat"), None);
}

#[test]
fn test_catalog_groups_by_curve_and_segment() {
    let names = [
        "header.properties",
        "index/1/segments/0/channels/vDeflection.dat",
        "index/0/segments/1/segment-header.properties",
        "index/0/segments/0/segment-header.properties",
        "index/0/segments/0/channels/height.dat",
        "index/0/segments/0/channels/vDeflection.dat",
    ];
    let curves = catalog(PathLayout::for_kind(JpkKind::QuantitativeImaging), names);
    assert_eq!(curves.len(), 2);

    let first = &curves[&0];
    assert_eq!(first.segments.len(), 2);
    let segment = &first.segments[&0];
    assert!(segment.header.is_some());
    let channels: Vec<&str> = segment.channels.iter().map(|(c, _)| c.as_str()).collect();
    assert_eq!(channels, vec!["height", "vDeflection"]);
}

#[test]
fn test_open_map_header() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = write_map_archive(dir.path(), JpkKind::ForceMap, 4);
    let (archive, metadata) = JpkArchive::open(&path, JpkKind::ForceMap, &ReaderConfig::default())?;

    assert_eq!(metadata.file_id, "17.37.44.432");
    assert_eq!(metadata.file_type, "jpk-force-map");
    assert_eq!(metadata.total_curves, 4);
    assert!(metadata.force_volume);
    assert_eq!(metadata.num_x_pixels, 2);
    assert_eq!(metadata.num_y_pixels, 2);
    assert!((metadata.scan_size_x - 20_000.0).abs() < 1e-6);
    assert_eq!(metadata.z_closed_loop.as_deref(), Some("On"));
    assert_eq!(metadata.instrument.as_deref(), Some("nanowizard"));
    assert_eq!(metadata.height_channel_key.as_deref(), Some("measuredHeight"));
    assert!(metadata.found_vdeflection);
    assert_eq!(metadata.spring_constant, Some(0.25));
    assert!((metadata.deflection_sensitivity.unwrap() - 50.0).abs() < 1e-9);

    let header = archive.header();
    assert_eq!(header.num_segments, 2);
    assert_eq!(header.real_num_pixels, 3);
    assert_eq!(header.force_setpoint, 2.5);
    assert_eq!(header.channel("measuredHeight").unwrap().sample_width(), 2);
    Ok(())
}

#[test]
fn test_decode_map_curve() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = write_map_archive(dir.path(), JpkKind::ForceMap, 4);
    let (archive, _) = JpkArchive::open(&path, JpkKind::ForceMap, &ReaderConfig::default())?;

    let curve = archive.read_curve(2)?;
    assert_eq!(curve.curve_index, 2);
    assert_eq!(curve.segment_count(), 2);

    let segments = curve.ordered_segments();
    assert_eq!(segments[0].segment_type, SegmentType::Approach);
    assert_eq!(segments[1].segment_type, SegmentType::Retract);

    let approach = segments[0];
    // 6 * raw + 8
    assert_eq!(approach.height(), Some(&[128.0, 68.0, 20.0][..]));
    // 0.5 * raw + 2 + distance offset 0
    assert_eq!(
        approach.formatted_data.get(VDEFLECTION),
        Some(&[2.0, 3.0, 4.0][..])
    );
    assert_eq!(
        approach.formatted_data.get("time"),
        Some(&[0.0, 0.5 / 3.0, 1.0 / 3.0][..])
    );
    assert_eq!(approach.nb_point, 3);
    assert_eq!(approach.nb_col, 3);
    assert_eq!(approach.sampling_rate, 6.0);
    assert_eq!(approach.force_setpoint_mode.as_deref(), Some("Relative"));
    assert!((approach.z_displacement - 2000.0).abs() < 1e-6);
    assert!((approach.velocity - 4000.0).abs() < 1e-6);
    assert_eq!(approach.raw_data["measuredHeight"], vec![20, 10, 2]);
    Ok(())
}

#[test]
fn test_curve_index_out_of_range() {
    let dir = tempdir().unwrap();
    let path = write_map_archive(dir.path(), JpkKind::ForceMap, 4);
    let (archive, _) = JpkArchive::open(&path, JpkKind::ForceMap, &ReaderConfig::default()).unwrap();
    assert!(matches!(
        archive.read_curve(4),
        Err(AfmError::CurveIndexOutOfRange { index: 4, count: 4 })
    ));
}

#[test]
fn test_piezo_image_force_map_flips_odd_rows() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = write_map_archive(dir.path(), JpkKind::ForceMap, 4);
    let (archive, _) = JpkArchive::open(&path, JpkKind::ForceMap, &ReaderConfig::default())?;

    let image = archive.piezo_image(2, 2)?.unwrap();
    // heights 8, 14, 20, 26 baselined to 0, 6, 12, 18
    assert_eq!(image.row(0).unwrap(), &[0.0, 6.0]);
    assert_eq!(image.row(1).unwrap(), &[18.0, 12.0]);
    Ok(())
}

#[test]
fn test_piezo_image_qi_is_not_flipped() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = write_map_archive(dir.path(), JpkKind::QuantitativeImaging, 4);
    let (archive, _) =
        JpkArchive::open(&path, JpkKind::QuantitativeImaging, &ReaderConfig::default())?;

    let image = archive.piezo_image(2, 2)?.unwrap();
    assert_eq!(image.data(), &[0.0, 6.0, 12.0, 18.0]);
    Ok(())
}

#[test]
fn test_piezo_image_pads_incomplete_map() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = write_map_archive(dir.path(), JpkKind::QuantitativeImaging, 3);
    let (archive, _) =
        JpkArchive::open(&path, JpkKind::QuantitativeImaging, &ReaderConfig::default())?;

    let image = archive.piezo_image(2, 2)?.unwrap();
    assert_eq!(&image.data()[..3], &[0.0, 6.0, 12.0]);
    assert!(image.data()[3].is_nan());
    Ok(())
}

#[test]
fn test_raster_flip_three_by_three() {
    let values: Vec<f64> = (0..9).map(|v| v as f64).collect();

    let map = assemble_piezo_image(JpkKind::ForceMap, 3, 3, values.clone()).unwrap();
    assert_eq!(map.data(), &[0.0, 1.0, 2.0, 5.0, 4.0, 3.0, 6.0, 7.0, 8.0]);

    let qi = assemble_piezo_image(JpkKind::QuantitativeImaging, 3, 3, values.clone()).unwrap();
    assert_eq!(qi.data(), values.as_slice());
}

#[test]
fn test_oversized_grid_is_rejected() {
    assert!(matches!(
        assemble_piezo_image(JpkKind::ForceMap, usize::MAX / 2, 3, vec![1.0]),
        Err(AfmError::InvalidStructure(_))
    ));
    assert!(matches!(
        assemble_piezo_image(JpkKind::ForceMap, 100_000, 100_000, vec![1.0; 4]),
        Err(AfmError::InvalidStructure(_))
    ));
    // a partially recorded map is still padded
    let image = assemble_piezo_image(JpkKind::QuantitativeImaging, 4, 4, vec![1.0; 2]).unwrap();
    assert_eq!(image.data().iter().filter(|v| v.is_nan()).count(), 14);
}

#[test]
fn test_channel_images() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = write_map_archive(dir.path(), JpkKind::ForceMap, 4);
    let (archive, _) = JpkArchive::open(&path, JpkKind::ForceMap, &ReaderConfig::default())?;

    let images = archive.channel_images()?;
    let names: Vec<&str> = images.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["Adhesion", "Height(measured)"]);
    assert_eq!(images["Height(measured)"].data(), &[1.0, 3.0, 5.0, 7.0]);
    assert_eq!(images["Adhesion"].data(), &[-1.0, 1.0, 3.0, 5.0]);
    Ok(())
}

#[test]
fn test_channel_names_carry_across_pages() -> Result<(), Box<dyn std::error::Error>> {
    let fancy = |channel: &str| {
        TestTag::Ascii(format!(
            "channel: {}\nalgorithm.object-name.base-object-name.fancy-name",
            channel
        ))
    };
    let mut renamed = vec![(32850, fancy("Baseline")), (32851, fancy("Slope Fit"))];
    renamed.extend(scaling_tags("Force", 1.0, 0.0));

    let bytes = build_tiff(&[
        TestPage {
            width: 1,
            height: 1,
            pixels: vec![0],
            tags: vec![],
        },
        channel_page("Adhesion", "Force", vec![0, 0, 0, 0]),
        // no fancy name: still Adhesion, and replaces the page above
        TestPage {
            width: 2,
            height: 2,
            pixels: vec![1, 1, 1, 1],
            tags: scaling_tags("Force", 2.0, 1.0),
        },
        TestPage {
            width: 2,
            height: 2,
            pixels: vec![5, 6, 7, 8],
            tags: renamed,
        },
    ]);

    let images = read_channel_images(bytes)?;
    let names: Vec<&str> = images.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["Adhesion", "SlopeFit"]);
    assert_eq!(images["Adhesion"].data(), &[3.0; 4]);
    assert_eq!(images["SlopeFit"].data(), &[5.0, 6.0, 7.0, 8.0]);
    Ok(())
}

#[test]
fn test_single_curve_segments_in_order() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = write_single_curve(dir.path(), "vDeflection measuredHeight", true);
    let (archive, metadata) =
        JpkArchive::open(&path, JpkKind::ForceCurve, &ReaderConfig::default())?;

    assert_eq!(metadata.total_curves, 1);
    assert!(!metadata.force_volume);
    assert_eq!(archive.header().num_segments, 3);
    assert!((archive.header().relative_ramp_size - 1000.0).abs() < 1e-6);
    assert!(archive.piezo_image(1, 1)?.is_none());
    assert!(archive.channel_images()?.is_empty());

    let mut curve = archive.read_curve(0)?;
    let types: Vec<SegmentType> = curve
        .ordered_segments()
        .iter()
        .map(|s| s.segment_type)
        .collect();
    assert_eq!(
        types,
        vec![SegmentType::Approach, SegmentType::Pause, SegmentType::Retract]
    );

    // the measured baseline (0.5) wins over y0
    curve.preprocess(1.0, "measuredHeight", Some(10.0));
    let approach = curve.approach_segments().next().unwrap();
    assert_eq!(approach.vdeflection, Some(vec![26.5, 31.5]));
    Ok(())
}

#[test]
fn test_missing_height_channel_still_decodes() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = write_single_curve(dir.path(), "vDeflection", false);
    let (archive, metadata) =
        JpkArchive::open(&path, JpkKind::ForceCurve, &ReaderConfig::default())?;

    assert_eq!(metadata.height_channel_key, None);
    let curve = archive.read_curve(0)?;
    let approach = curve.approach_segments().next().unwrap();
    assert!(approach.height().is_none());
    assert!(approach.formatted_data.contains(VDEFLECTION));
    Ok(())
}

#[test]
fn test_truncated_channel_aborts_curve() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("short.jpk-force");
    let mut zip = ZipWriter::new(File::create(&path)?);
    let options = SimpleFileOptions::default();
    zip.start_file("header.properties", options)?;
    zip.write_all(b"force-scan-series.force-segments.count=1\n")?;
    zip.start_file("shared-data/header.properties", options)?;
    zip.write_all(MAP_SHARED_HEADER.as_bytes())?;
    zip.start_file("segments/0/segment-header.properties", options)?;
    zip.write_all(
        b"force-segment-header.num-points=10\n\
force-segment-header.duration=1.0\n\
force-segment-header.settings.style=extend\n\
channels.list=vDeflection\n",
    )?;
    zip.start_file("segments/0/channels/vDeflection.dat", options)?;
    zip.write_all(&i32_be(&[1, 2, 3]))?;
    zip.finish()?;

    let (archive, _) = JpkArchive::open(&path, JpkKind::ForceCurve, &ReaderConfig::default())?;
    assert!(matches!(
        archive.read_curve(0),
        Err(AfmError::TruncatedBinaryData {
            expected: 40,
            actual: 12,
            ..
        })
    ));
    Ok(())
}

#[test]
fn test_oversized_point_count_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("huge.jpk-force");
    let mut zip = ZipWriter::new(File::create(&path)?);
    let options = SimpleFileOptions::default();
    zip.start_file("header.properties", options)?;
    zip.write_all(b"force-scan-series.force-segments.count=1\n")?;
    zip.start_file("shared-data/header.properties", options)?;
    zip.write_all(MAP_SHARED_HEADER.as_bytes())?;
    zip.start_file("segments/0/segment-header.properties", options)?;
    zip.write_all(
        b"force-segment-header.num-points=4611686018427387904\n\
force-segment-header.duration=1.0\n\
force-segment-header.settings.style=extend\n\
channels.list=vDeflection\n",
    )?;
    zip.start_file("segments/0/channels/vDeflection.dat", options)?;
    zip.write_all(&i32_be(&[1, 2, 3]))?;
    zip.finish()?;

    let (archive, _) = JpkArchive::open(&path, JpkKind::ForceCurve, &ReaderConfig::default())?;
    assert!(matches!(
        archive.read_curve(0),
        Err(AfmError::TruncatedBinaryData {
            expected: usize::MAX,
            actual: 12,
            ..
        })
    ));
    Ok(())
}

#[test]
fn test_missing_shared_header_is_fatal() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("broken.jpk-force");
    let mut zip = ZipWriter::new(File::create(&path)?);
    zip.start_file("header.properties", SimpleFileOptions::default())?;
    zip.write_all(b"a=b\n")?;
    zip.finish()?;

    assert!(matches!(
        JpkArchive::open(&path, JpkKind::ForceCurve, &ReaderConfig::default()),
        Err(AfmError::MissingEntry(_))
    ));
    Ok(())
}

#[test]
fn test_thermal_noise_parsing() -> Result<(), Box<dyn std::error::Error>> {
    let mut text = String::from("# thermal noise data\n");
    text.push_str("# sensitivity: 50.0 nm/V\n");
    text.push_str("# spring constant: 0.1 N/m\n");
    text.push_str("# temperature: 300.0 K\n");
    text.push_str("# resonance: 70.5 kHz\n");
    text.push_str("# mode: automatic\n");
    while text.lines().count() < 23 {
        text.push_str("#\n");
    }
    text.push_str("1000.0 0.1 2.0 4.0\n");
    text.push_str("2000.0 0.2 1.0 2.0\n");

    let thermal = ThermalNoise::parse(&text)?;
    let sensitivity = thermal.parameter("sensitivity").unwrap();
    assert!((sensitivity - 50.0e-9).abs() < 1e-18);
    assert_eq!(thermal.parameter("spring constant"), Some(0.1));
    assert_eq!(thermal.parameter("resonance"), Some(70_500.0));
    assert_eq!(
        thermal.parameters["mode"],
        crate::model::HeaderValue::Text("automatic".to_string())
    );
    assert_eq!(thermal.frequency, vec![1000.0, 2000.0]);
    assert_eq!(thermal.amplitude_raw, vec![2.0, 1.0]);
    let scale = sensitivity * sensitivity;
    assert_eq!(thermal.amplitude, vec![2.0 * scale, 1.0 * scale]);
    assert_eq!(thermal.fit, Some(vec![4.0 * scale, 2.0 * scale]));
    Ok(())
}
