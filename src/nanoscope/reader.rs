use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::config::ReaderConfig;
use crate::error::{AfmError, Result};
use crate::format::FileFormat;
use crate::model::{FileMetadata, ForceCurve, FormatDetail, Image};

use super::curve::{decode_curve, HEIGHT_CHANNEL};
use super::header::NanoscopeHeader;
use super::image::read_piezo_image;

/// An opened Nanoscope file.
///
/// The header is scanned once; curves and the image are read on demand with
/// a fresh file handle.
#[derive(Debug, Clone)]
pub struct NanoscopeFile {
    path: PathBuf,
    header: NanoscopeHeader,
    file_id: String,
}

impl NanoscopeFile {
    /// Scan the header and fill the common metadata fields
    pub fn open(path: &Path, config: &ReaderConfig) -> Result<(Self, FileMetadata)> {
        let header = NanoscopeHeader::parse(BufReader::new(File::open(path)?))?;
        let defaults = &config.defaults;

        let mut metadata = FileMetadata::new(
            path,
            FileFormat::Nanoscope,
            FormatDetail::Nanoscope(header.clone()),
        )?;
        metadata.instrument = header.microscope.clone();
        metadata.software_version = header.version.clone();
        metadata.scanner = header.scanner.clone();
        metadata.total_curves = header.total_curves;
        metadata.force_volume = header.force_volume;
        metadata.scan_angle = defaults.scan_angle;
        metadata.num_x_pixels = header.image_samps_per_line;
        metadata.num_y_pixels = header.image_lines;
        metadata.scan_size_x = header.image_scan_x * defaults.scaling_factor;
        metadata.scan_size_y = header.image_scan_y * defaults.scaling_factor;
        metadata.z_closed_loop = header.z_closed_loop.clone();
        metadata.xy_closed_loop = header.xy_closed_loop.clone();
        metadata.deflection_sensitivity = header.deflection_sensitivity;
        metadata.spring_constant = header.spring_constant;
        metadata.height_channel_key = Some(HEIGHT_CHANNEL.to_string());
        metadata.found_vdeflection = true;

        if header.force_volume && header.peakforce {
            log::warn!(
                "{} declares both force volume and PeakForce capture",
                metadata.file_name
            );
        }

        log::info!(
            "Opened {} with {} curves ({} approach / {} retract points)",
            metadata.file_name,
            header.total_curves,
            header.approach_points,
            header.retract_points
        );

        let file = Self {
            path: path.to_path_buf(),
            header,
            file_id: metadata.file_id.clone(),
        };
        Ok((file, metadata))
    }

    /// Parsed header
    pub fn header(&self) -> &NanoscopeHeader {
        &self.header
    }

    /// Number of curves in the file
    pub fn curve_count(&self) -> usize {
        self.header.total_curves
    }

    /// Decode curve `index`
    pub fn read_curve(&self, index: usize) -> Result<ForceCurve> {
        if index >= self.curve_count() {
            return Err(AfmError::CurveIndexOutOfRange {
                index,
                count: self.curve_count(),
            });
        }
        let mut reader = BufReader::new(File::open(&self.path)?);
        decode_curve(&mut reader, &self.header, &self.file_id, index)
    }

    /// Topography image, if the file has one
    pub fn piezo_image(&self) -> Result<Option<Image>> {
        let mut reader = BufReader::new(File::open(&self.path)?);
        read_piezo_image(&mut reader, &self.header)
    }
}
