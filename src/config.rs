//! Immutable configuration passed into every header parser.
//!
//! Vendor headers routinely omit fields. Instead of module-level constants,
//! the fallback values live in [`HeaderDefaults`], which callers can override
//! (the CLI loads them from a TOML file).

use serde::{Deserialize, Serialize};

/// Setpoint mode reported for every JPK segment; JPK setpoints are always relative.
pub const JPK_SETPOINT_MODE: &str = "Relative";

/// Fallback values applied when a header key is absent or malformed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderDefaults {
    /// Scan angle in degrees
    pub scan_angle: f64,
    /// Pause durations in seconds
    pub delay: f64,
    /// Generic multiplier
    pub multiplier: f64,
    /// Generic offset
    pub offset: f64,
    /// Boolean flags (closed loop, "defined" markers, baseline measured)
    pub boolean: bool,
    /// Number of segments per curve (approach + retract)
    pub num_segments: usize,
    /// Factor applied to header lengths stored in metres (metres to nanometres)
    pub scaling_factor: f64,
}

impl Default for HeaderDefaults {
    fn default() -> Self {
        Self {
            scan_angle: 0.0,
            delay: 0.0,
            multiplier: 1.0,
            offset: 0.0,
            boolean: false,
            num_segments: 2,
            scaling_factor: 1e9,
        }
    }
}

/// Configuration for loading AFM files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Header fallbacks
    pub defaults: HeaderDefaults,
    /// Code written to the `UFF_code` header field
    pub uff_code: String,
    /// Version written to the `Entry_UFF_version` header field
    pub uff_version: String,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            defaults: HeaderDefaults::default(),
            uff_code: "_1_2_3_4_5".to_string(),
            uff_version: "0".to_string(),
        }
    }
}
