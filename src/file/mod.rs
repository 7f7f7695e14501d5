//! # Loaded AFM Files
//!
//! [`AfmFile`] is the one container every format loads into. The header is
//! parsed when the file is opened; curves are decoded on demand and the
//! images are computed once and cached.
//!
//! ```rust,no_run
//! use afmreader::file::AfmFile;
//!
//! let file = AfmFile::open("map-data-2021.11.05-17.37.44.432.jpk-force-map")?;
//! println!("{} curves", file.curve_count());
//!
//! let mut curve = file.get_curve(0)?;
//! let metadata = file.metadata();
//! if let (Some(sens), Some(key)) = (metadata.deflection_sensitivity, &metadata.height_channel_key) {
//!     curve.preprocess(sens, key, None);
//! }
//! # Ok::<(), afmreader::AfmError>(())
//! ```

mod export;
mod open;
mod source;

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::config::ReaderConfig;
use crate::error::Result;
use crate::jpk::ThermalNoise;
use crate::model::{FileMetadata, ForceCurve, Image};

pub use open::load_file;

use source::CurveSource;

/// A loaded force-curve file of any supported format
#[derive(Debug)]
pub struct AfmFile {
    source: CurveSource,
    config: ReaderConfig,
    metadata: FileMetadata,
    piezo_image: OnceLock<Option<Image>>,
    channel_images: OnceLock<BTreeMap<String, Image>>,
}

/// Result of [`load_file`]
#[derive(Debug)]
pub enum LoadedFile {
    /// A file holding force curves
    Curves(AfmFile),
    /// A JPK thermal-noise table
    Thermal(ThermalNoise),
}

impl AfmFile {
    fn from_source(source: CurveSource, metadata: FileMetadata, config: ReaderConfig) -> Self {
        Self {
            source,
            config,
            metadata,
            piezo_image: OnceLock::new(),
            channel_images: OnceLock::new(),
        }
    }

    /// Header metadata
    pub fn metadata(&self) -> &FileMetadata {
        &self.metadata
    }

    /// Configuration the file was opened with
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Number of curves
    pub fn curve_count(&self) -> usize {
        self.source.curve_count()
    }

    /// Decode curve `index`
    pub fn get_curve(&self, index: usize) -> Result<ForceCurve> {
        self.source.read_curve(index)
    }

    /// Decode every curve in file order
    pub fn curves(&self) -> impl Iterator<Item = Result<ForceCurve>> + '_ {
        (0..self.curve_count()).map(move |i| self.get_curve(i))
    }

    /// Piezo height image, computed on first use.
    ///
    /// `None` when the file has no image (single curves, UFF files, Nanoscope
    /// files without a topography buffer).
    pub fn piezo_image(&self) -> Result<Option<&Image>> {
        if let Some(image) = self.piezo_image.get() {
            return Ok(image.as_ref());
        }
        let image = self.source.piezo_image(&self.metadata)?;
        Ok(self.piezo_image.get_or_init(|| image).as_ref())
    }

    /// Channel images embedded in a JPK map, read on first use
    pub fn channel_images(&self) -> Result<&BTreeMap<String, Image>> {
        if let Some(images) = self.channel_images.get() {
            return Ok(images);
        }
        let images = self.source.channel_images()?;
        Ok(self.channel_images.get_or_init(|| images))
    }
}
