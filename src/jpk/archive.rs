use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::config::{HeaderDefaults, ReaderConfig};
use crate::error::{AfmError, Result};
use crate::format::{FileFormat, JpkKind};
use crate::model::{
    file_id_from_name, FileMetadata, ForceCurve, FormatDetail, Image, HEIGHT_CHANNELS, VDEFLECTION,
};
use crate::properties::Properties;

use super::header::{parse_header, parse_segment_header, JpkHeader};
use super::image::{assemble_piezo_image, read_channel_images};
use super::layout::{catalog, CurveEntries, PathLayout};
use super::segment::{decode_curve, read_entry, DecodeContext};

const HEADER_ENTRY: &str = "header.properties";
const SHARED_HEADER_ENTRY: &str = "shared-data/header.properties";

/// An opened JPK archive.
///
/// Only the header blocks and the entry catalog are kept in memory; every
/// curve decode reopens the archive (or reuses one supplied by the caller).
#[derive(Debug, Clone)]
pub struct JpkArchive {
    path: PathBuf,
    kind: JpkKind,
    defaults: HeaderDefaults,
    header: JpkHeader,
    shared: Properties,
    curves: Vec<CurveEntries>,
    file_id: String,
    height_channel_key: Option<String>,
    found_vdeflection: bool,
}

impl JpkArchive {
    /// Parse the headers and catalog the curve entries of an archive
    pub fn open(path: &Path, kind: JpkKind, config: &ReaderConfig) -> Result<(Self, FileMetadata)> {
        let mut archive = ZipArchive::new(BufReader::new(File::open(path)?))?;

        let header = Properties::from_bytes(&read_entry(&mut archive, HEADER_ENTRY)?);
        let shared = Properties::from_bytes(&read_entry(&mut archive, SHARED_HEADER_ENTRY)?);

        let mut metadata = FileMetadata::new(
            path,
            FileFormat::Jpk(kind),
            FormatDetail::Jpk(JpkHeader::new(kind)),
        )?;
        metadata.file_id = file_id_from_name(&metadata.file_name);

        let jpk_header = parse_header(kind, &header, &shared, &config.defaults, &mut metadata);

        let curves: Vec<CurveEntries> = catalog(PathLayout::for_kind(kind), archive.file_names())
            .into_values()
            .collect();
        if curves.is_empty() {
            return Err(AfmError::InvalidStructure(format!(
                "no segment entries in {}",
                path.display()
            )));
        }

        // The channel list of the first segment decides which channels are used.
        let first_header = curves
            .first()
            .and_then(|c| c.segments.values().next())
            .and_then(|s| s.header.clone().map(|h| (s.segment_id, h)));
        let channels = match first_header {
            Some((segment_id, name)) => {
                let props = Properties::from_bytes(&read_entry(&mut archive, &name)?);
                parse_segment_header(kind, &props, &shared, segment_id, &config.defaults).channels
            }
            None => Vec::new(),
        };

        let found_vdeflection = channels.iter().any(|c| c == VDEFLECTION);
        let height_channel_key = HEIGHT_CHANNELS
            .iter()
            .copied()
            .find(|key| channels.iter().any(|c| c == key))
            .map(str::to_string);

        if height_channel_key.is_none() {
            AfmError::MissingRequiredChannel("no valid height channel found".to_string()).warn();
        }
        if !found_vdeflection {
            AfmError::MissingRequiredChannel(VDEFLECTION.to_string()).warn();
        }

        metadata.total_curves = curves.len();
        metadata.height_channel_key = height_channel_key.clone();
        metadata.found_vdeflection = found_vdeflection;
        metadata.detail = FormatDetail::Jpk(jpk_header.clone());

        log::info!(
            "Opened {} with {} curves ({} channels)",
            metadata.file_name,
            metadata.total_curves,
            jpk_header.channels.len()
        );

        let archive = Self {
            path: path.to_path_buf(),
            kind,
            defaults: config.defaults.clone(),
            header: jpk_header,
            shared,
            curves,
            file_id: metadata.file_id.clone(),
            height_channel_key,
            found_vdeflection,
        };
        Ok((archive, metadata))
    }

    /// Sub-type of the archive
    pub fn kind(&self) -> JpkKind {
        self.kind
    }

    /// Parsed JPK header
    pub fn header(&self) -> &JpkHeader {
        &self.header
    }

    /// Number of curves found in the archive
    pub fn curve_count(&self) -> usize {
        self.curves.len()
    }

    /// Reopen the backing archive
    pub fn open_archive(&self) -> Result<ZipArchive<BufReader<File>>> {
        Ok(ZipArchive::new(BufReader::new(File::open(&self.path)?))?)
    }

    fn context(&self) -> DecodeContext<'_> {
        DecodeContext {
            header: &self.header,
            shared: &self.shared,
            defaults: &self.defaults,
            file_id: &self.file_id,
            height_channel_key: self.height_channel_key.as_deref(),
            found_vdeflection: self.found_vdeflection,
        }
    }

    /// Decode one curve, opening the archive for the duration of the call
    pub fn read_curve(&self, index: usize) -> Result<ForceCurve> {
        let mut archive = self.open_archive()?;
        self.read_curve_from(&mut archive, index)
    }

    /// Decode one curve from an archive handle supplied by the caller
    pub fn read_curve_from<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        index: usize,
    ) -> Result<ForceCurve> {
        let entries = self.curves.get(index).ok_or(AfmError::CurveIndexOutOfRange {
            index,
            count: self.curves.len(),
        })?;
        decode_curve(archive, &self.context(), entries)
    }

    /// Last height sample of the first approach segment, NaN when absent
    pub(crate) fn approach_end_height<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        index: usize,
    ) -> Result<f64> {
        let curve = self.read_curve_from(archive, index)?;
        let height = curve
            .approach_segments()
            .next()
            .and_then(|s| s.height())
            .and_then(|h| h.last().copied());

        Ok(height.unwrap_or_else(|| {
            log::warn!("Curve {} has no approach height", index);
            f64::NAN
        }))
    }

    #[cfg(not(feature = "parallel"))]
    fn approach_end_heights(&self) -> Result<Vec<f64>> {
        let mut archive = self.open_archive()?;
        (0..self.curves.len())
            .map(|i| self.approach_end_height(&mut archive, i))
            .collect()
    }

    /// Piezo height image of a map; `None` for single curves or when the
    /// archive has no height channel
    pub fn piezo_image(&self, num_x_pixels: usize, num_y_pixels: usize) -> Result<Option<Image>> {
        if !self.kind.is_map() {
            return Ok(None);
        }
        if self.height_channel_key.is_none() {
            AfmError::MissingRequiredChannel("piezo image needs a height channel".to_string())
                .warn();
            return Ok(None);
        }

        let heights = self.approach_end_heights()?;
        assemble_piezo_image(self.kind, num_x_pixels, num_y_pixels, heights).map(Some)
    }

    /// Channel images embedded in the archive, keyed by channel name
    pub fn channel_images(&self) -> Result<BTreeMap<String, Image>> {
        let Some(entry) = self.kind.image_entry() else {
            return Ok(BTreeMap::new());
        };

        let mut archive = self.open_archive()?;
        let bytes = match read_entry(&mut archive, entry) {
            Ok(bytes) => bytes,
            Err(AfmError::MissingEntry(name)) => {
                log::warn!("Archive has no embedded image {}", name);
                return Ok(BTreeMap::new());
            }
            Err(e) => return Err(e),
        };
        read_channel_images(bytes)
    }
}
