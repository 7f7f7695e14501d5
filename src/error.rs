//! Error taxonomy shared by every decoder.
//!
//! Only structural failures are returned to the caller. The "soft" variants
//! ([`AfmError::MissingRequiredChannel`], [`AfmError::MalformedHeaderValue`],
//! [`AfmError::MissingConversionFactors`]) are normally built and logged with
//! [`AfmError::warn`] while the decoder continues with a documented fallback.

use crate::tiff::TiffError;

/// Errors that can occur while loading or decoding AFM files
#[derive(Debug, thiserror::Error)]
pub enum AfmError {
    /// The path suffix does not map to any supported format
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// No usable height or deflection channel was found
    #[error("Missing required channel: {0}")]
    MissingRequiredChannel(String),

    /// A header value could not be parsed
    #[error("Malformed header value for '{key}': {value:?}")]
    MalformedHeaderValue {
        /// Header key
        key: String,
        /// Raw value found in the header
        value: String,
    },

    /// Declared sample counts exceed the bytes actually stored
    #[error("Truncated binary data in {entry}: expected {expected} bytes, found {actual}")]
    TruncatedBinaryData {
        /// Archive entry or file region being decoded
        entry: String,
        /// Number of bytes required by the header
        expected: usize,
        /// Number of bytes available
        actual: usize,
    },

    /// A conversion stage has no factors in the header
    #[error("Missing conversion factors for channel {channel}: {stage}")]
    MissingConversionFactors {
        /// Channel name
        channel: String,
        /// Conversion stage (distance, force, absolute, nominal, ...)
        stage: String,
    },

    /// A required archive entry is absent
    #[error("Missing archive entry: {0}")]
    MissingEntry(String),

    /// The file layout cannot be interpreted
    #[error("Invalid file structure: {0}")]
    InvalidStructure(String),

    /// A curve index outside `0..count` was requested
    #[error("Curve index {index} out of range (file holds {count} curves)")]
    CurveIndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of curves in the file
        count: usize,
    },

    /// Embedded image error
    #[error("TIFF error: {0}")]
    TiffError(#[from] TiffError),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// ZIP archive error
    #[error("ZIP error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    /// CSV parsing error
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

impl AfmError {
    /// Log a non-fatal condition and keep going.
    pub fn warn(self) {
        log::warn!("{}", self);
    }

    pub(crate) fn truncated(entry: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::TruncatedBinaryData {
            entry: entry.into(),
            expected,
            actual,
        }
    }

    pub(crate) fn malformed(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::MalformedHeaderValue {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T, E = AfmError> = std::result::Result<T, E>;
