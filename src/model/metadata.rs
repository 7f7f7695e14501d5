use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Result;
use crate::format::FileFormat;
use crate::jpk::JpkHeader;
use crate::nanoscope::NanoscopeHeader;
use crate::uff::UffHeader;

/// Header value that is numeric when it parses as a float, text otherwise
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HeaderValue {
    /// Parsed number
    Number(f64),
    /// Anything else, verbatim
    Text(String),
}

impl HeaderValue {
    /// Parse a trimmed raw value
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        raw.parse::<f64>()
            .map(HeaderValue::Number)
            .unwrap_or_else(|_| HeaderValue::Text(raw.to_string()))
    }

    /// Numeric value, if any
    pub fn as_number(&self) -> Option<f64> {
        match self {
            HeaderValue::Number(v) => Some(*v),
            HeaderValue::Text(_) => None,
        }
    }

    /// Text value, if any
    pub fn as_text(&self) -> Option<&str> {
        match self {
            HeaderValue::Text(t) => Some(t),
            HeaderValue::Number(_) => None,
        }
    }
}

/// Header fields that only exist in one format
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FormatDetail {
    /// JPK archive header
    Jpk(JpkHeader),
    /// Nanoscope text header
    Nanoscope(NanoscopeHeader),
    /// Parsed UFF header
    Uff(UffHeader),
}

/// Typed metadata of a loaded file
///
/// Fields common to every format live here; the rest is in [`FormatDetail`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileMetadata {
    /// Path the file was opened from
    pub file_path: PathBuf,
    /// File name without directories
    pub file_name: String,
    /// Size on disk
    pub file_size_bytes: u64,
    /// Dispatch suffix (`jpk-force-map`, `spm`, `uff`, ...)
    pub file_type: String,
    /// Identifier derived from the file name
    pub file_id: String,
    /// Detected format
    pub format: FileFormat,
    /// Instrument / microscope name
    pub instrument: Option<String>,
    /// Acquisition software version
    pub software_version: Option<String>,
    /// Acquisition date
    pub file_date: Option<String>,
    /// Scanner description
    pub scanner: Option<String>,
    /// Number of curves
    pub total_curves: usize,
    /// Whether the curves are laid out on a grid
    pub force_volume: bool,
    /// Scan angle in degrees
    pub scan_angle: f64,
    /// Grid columns
    pub num_x_pixels: usize,
    /// Grid rows
    pub num_y_pixels: usize,
    /// Scan size along x
    pub scan_size_x: f64,
    /// Scan size along y
    pub scan_size_y: f64,
    /// Z closed-loop state
    pub z_closed_loop: Option<String>,
    /// XY closed-loop state
    pub xy_closed_loop: Option<String>,
    /// Pause after retraction (s)
    pub retracted_delay: f64,
    /// Pause after extension (s)
    pub extended_delay: f64,
    /// Deflection sensitivity (nm/V), if the header carries one
    pub deflection_sensitivity: Option<f64>,
    /// Spring constant (N/m), if the header carries one
    pub spring_constant: Option<f64>,
    /// Name of the height channel to use
    pub height_channel_key: Option<String>,
    /// Whether a vertical deflection channel exists
    pub found_vdeflection: bool,
    /// Format-specific header
    pub detail: FormatDetail,
}

impl FileMetadata {
    /// Metadata with file identity filled in and every header field defaulted
    pub fn new(path: &Path, format: FileFormat, detail: FormatDetail) -> Result<Self> {
        let file_size_bytes = std::fs::metadata(path)?.len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_type = crate::format::file_suffix(path).unwrap_or_default();

        Ok(Self {
            file_path: path.to_path_buf(),
            file_id: file_name.clone(),
            file_name,
            file_size_bytes,
            file_type,
            format,
            instrument: None,
            software_version: None,
            file_date: None,
            scanner: None,
            total_curves: 0,
            force_volume: false,
            scan_angle: 0.0,
            num_x_pixels: 0,
            num_y_pixels: 0,
            scan_size_x: 0.0,
            scan_size_y: 0.0,
            z_closed_loop: None,
            xy_closed_loop: None,
            retracted_delay: 0.0,
            extended_delay: 0.0,
            deflection_sensitivity: None,
            spring_constant: None,
            height_channel_key: None,
            found_vdeflection: false,
            detail,
        })
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Identifier embedded in vendor file names (`17.37.44.432`), or the file name.
///
/// Looks for two digits, any char, two digits, any char, two digits, any char
/// and three digits.
pub fn file_id_from_name(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let pattern = [2usize, 2, 2, 3];
    let width = 2 + 1 + 2 + 1 + 2 + 1 + 3;
    if chars.len() >= width {
        'outer: for start in 0..=chars.len() - width {
            let mut pos = start;
            for (i, digits) in pattern.iter().enumerate() {
                if i > 0 {
                    // separator: any char except newline
                    if chars[pos] == '\n' {
                        continue 'outer;
                    }
                    pos += 1;
                }
                if !chars[pos..pos + digits].iter().all(|c| c.is_ascii_digit()) {
                    continue 'outer;
                }
                pos += digits;
            }
            return chars[start..start + width].iter().collect();
        }
    }
    name.to_string()
}
