//! Format detection from the file path suffix.
//!
//! The suffix is the last dot-separated component of the file name, except
//! that a trailing `.zip` is skipped (some systems save JPK archives as
//! `name.jpk-force.zip`). Nanoscope files use either a named suffix or a purely
//! numeric one (`.000`, `.001`, ...).

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::error::{AfmError, Result};

/// Sub-type of a JPK archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum JpkKind {
    /// Single force curve (`.jpk-force`)
    ForceCurve,
    /// Force map, bidirectional raster (`.jpk-force-map`)
    ForceMap,
    /// Quantitative imaging, unidirectional raster (`.jpk-qi-data`)
    QuantitativeImaging,
}

impl JpkKind {
    /// Property-key prefix used in `header.properties`
    pub fn prefix(&self) -> &'static str {
        match self {
            JpkKind::ForceCurve => "force-scan-series",
            JpkKind::ForceMap => "force-scan-map",
            JpkKind::QuantitativeImaging => "quantitative-imaging-map",
        }
    }

    /// Section under the prefix that holds the force settings (setpoint)
    pub fn settings_section(&self) -> &'static str {
        match self {
            JpkKind::ForceCurve => ".header",
            JpkKind::ForceMap | JpkKind::QuantitativeImaging => ".settings",
        }
    }

    /// Name of the embedded multi-page channel image, if the sub-type has one
    pub fn image_entry(&self) -> Option<&'static str> {
        match self {
            JpkKind::ForceCurve => None,
            JpkKind::ForceMap => Some("data-image.force"),
            JpkKind::QuantitativeImaging => Some("data-image.jpk-qi-image"),
        }
    }

    /// Whether the archive holds a grid of curves
    pub fn is_map(&self) -> bool {
        !matches!(self, JpkKind::ForceCurve)
    }

    /// File suffix of the sub-type
    pub fn suffix(&self) -> &'static str {
        match self {
            JpkKind::ForceCurve => "jpk-force",
            JpkKind::ForceMap => "jpk-force-map",
            JpkKind::QuantitativeImaging => "jpk-qi-data",
        }
    }
}

/// Supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FileFormat {
    /// JPK zip container
    Jpk(JpkKind),
    /// JPK thermal-noise table (`.tnd`)
    JpkThermal,
    /// Bruker Nanoscope text header + binary data
    Nanoscope,
    /// Canonical UFF text interchange format
    Uff,
}

impl FileFormat {
    /// Classify a path by its suffix
    pub fn detect<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let suffix = file_suffix(path)
            .ok_or_else(|| AfmError::UnsupportedFormat(path.display().to_string()))?;

        let format = match suffix.as_str() {
            "jpk-force" => FileFormat::Jpk(JpkKind::ForceCurve),
            "jpk-force-map" => FileFormat::Jpk(JpkKind::ForceMap),
            "jpk-qi-data" => FileFormat::Jpk(JpkKind::QuantitativeImaging),
            "tnd" => FileFormat::JpkThermal,
            "spm" | "pfc" => FileFormat::Nanoscope,
            "uff" => FileFormat::Uff,
            s if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => FileFormat::Nanoscope,
            _ => return Err(AfmError::UnsupportedFormat(path.display().to_string())),
        };

        Ok(format)
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Jpk(kind) => write!(f, "JPK ({})", kind.suffix()),
            FileFormat::JpkThermal => write!(f, "JPK thermal noise"),
            FileFormat::Nanoscope => write!(f, "Nanoscope"),
            FileFormat::Uff => write!(f, "UFF"),
        }
    }
}

/// Extract the dispatch suffix of a path (without the dot, `.zip` skipped)
pub fn file_suffix(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let mut parts = name.rsplit('.');
    let last = parts.next()?;
    // A name without any dot has no suffix.
    if last.len() == name.len() {
        return None;
    }
    if last == "zip" {
        parts.next().map(str::to_string)
    } else {
        Some(last.to_string())
    }
}
