//! # afmreader - Atomic Force Microscopy File Reader
//!
//! `afmreader` loads force-spectroscopy recordings from vendor files into one
//! canonical data model and exports them to the UFF text interchange format.
//!
//! ## Supported Formats
//!
//! | Suffix | Format |
//! |--------|--------|
//! | `.jpk-force`, `.jpk-force-map`, `.jpk-qi-data` (optionally `.zip`) | JPK zip archive |
//! | `.tnd` | JPK thermal-noise table |
//! | `.spm`, `.pfc`, `.000`, `.001`, ... | Bruker Nanoscope |
//! | `.uff` | UFF text interchange format |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use afmreader::prelude::*;
//!
//! let file = AfmFile::open("force-save-2022.01.01-10.00.00.000.jpk-force")?;
//! let metadata = file.metadata();
//! println!("{}: {} curves", metadata.file_id, file.curve_count());
//!
//! let mut curve = file.get_curve(0)?;
//! if let (Some(sens), Some(key)) = (metadata.deflection_sensitivity, &metadata.height_channel_key) {
//!     curve.preprocess(sens, key, None);
//!     curve.shift_height();
//!     curve.compute_force_indentation((0.0, 0.0), metadata.spring_constant.unwrap_or(1.0));
//! }
//!
//! // One UFF file per curve
//! file.write_uff("export")?;
//! # Ok::<(), afmreader::AfmError>(())
//! ```
//!
//! ## Architecture
//!
//! - [`format`]: suffix-based format detection
//! - [`model`]: segments, curves, images and typed file metadata
//! - [`jpk`], [`nanoscope`], [`uff`]: per-format header parsers and decoders
//! - [`tiff`]: the page reader used for images embedded in JPK maps
//! - [`file`]: the [`AfmFile`](file::AfmFile) container and [`load_file`](file::load_file)
//!
//! Header values a vendor file omits fall back to the values in
//! [`config::HeaderDefaults`]. Recoverable problems (a malformed header
//! number, a missing optional channel) are logged through the `log` facade
//! and decoding continues; structural problems are returned as [`AfmError`].

#![warn(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![allow(clippy::too_many_arguments)]

pub mod config;
pub mod error;
pub mod file;
pub mod format;
pub mod jpk;
pub mod model;
pub mod nanoscope;
pub mod properties;
pub mod tiff;
pub mod uff;

pub use error::{AfmError, Result};

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::config::{HeaderDefaults, ReaderConfig};
    pub use crate::error::{AfmError, Result};
    pub use crate::file::{load_file, AfmFile, LoadedFile};
    pub use crate::format::{FileFormat, JpkKind};
    pub use crate::jpk::ThermalNoise;
    pub use crate::model::{
        FileMetadata, ForceCurve, FormatDetail, Image, Segment, SegmentType, VDEFLECTION,
    };
    pub use crate::uff::{UffHeader, UffWriter};
}
