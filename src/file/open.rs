use std::path::Path;

use crate::config::ReaderConfig;
use crate::error::{AfmError, Result};
use crate::format::FileFormat;
use crate::jpk::{JpkArchive, ThermalNoise};
use crate::nanoscope::NanoscopeFile;
use crate::uff::UffFile;

use super::source::CurveSource;
use super::{AfmFile, LoadedFile};

impl AfmFile {
    /// Open a force-curve file with the default configuration
    ///
    /// The format is chosen from the path suffix:
    /// - `.jpk-force`, `.jpk-force-map`, `.jpk-qi-data` (optionally `.zip`)
    /// - `.spm`, `.pfc` and numeric suffixes for Nanoscope files
    /// - `.uff` for exported curves
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, ReaderConfig::default())
    }

    /// Open a force-curve file with custom header defaults
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: ReaderConfig) -> Result<Self> {
        let path = path.as_ref();
        let format = FileFormat::detect(path)?;
        log::debug!("Opening {} as {}", path.display(), format);

        let (source, metadata) = match format {
            FileFormat::Jpk(kind) => {
                let (archive, metadata) = JpkArchive::open(path, kind, &config)?;
                (CurveSource::Jpk(archive), metadata)
            }
            FileFormat::Nanoscope => {
                let (file, metadata) = NanoscopeFile::open(path, &config)?;
                (CurveSource::Nanoscope(file), metadata)
            }
            FileFormat::Uff => {
                let (file, metadata) = UffFile::open(path, &config)?;
                (CurveSource::Uff(file), metadata)
            }
            FileFormat::JpkThermal => {
                return Err(AfmError::UnsupportedFormat(format!(
                    "{} holds a thermal-noise table, use load_file",
                    path.display()
                )))
            }
        };

        Ok(Self::from_source(source, metadata, config))
    }
}

/// Load any supported file: curve containers and thermal-noise tables
pub fn load_file<P: AsRef<Path>>(path: P, config: ReaderConfig) -> Result<LoadedFile> {
    let path = path.as_ref();
    match FileFormat::detect(path)? {
        FileFormat::JpkThermal => Ok(LoadedFile::Thermal(ThermalNoise::from_path(path)?)),
        _ => Ok(LoadedFile::Curves(AfmFile::open_with_config(path, config)?)),
    }
}
