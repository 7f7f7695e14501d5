//! TOML configuration file support.
//!
//! Header fallbacks and the UFF identification fields can be set in a file
//! passed with `--config`:
//!
//! ```toml
//! # afmreader.toml
//! uff_code = "_1_2_3_4_5"
//!
//! [defaults]
//! scan_angle = 0.0
//! num_segments = 2
//! scaling_factor = 1e9
//! ```

use anyhow::{Context, Result};
use std::path::Path;

use afmreader::config::ReaderConfig;

/// Load a configuration file, or the defaults when no path is given.
pub fn load(path: Option<&Path>) -> Result<ReaderConfig> {
    match path {
        Some(path) => from_file(path),
        None => Ok(ReaderConfig::default()),
    }
}

/// Load configuration from a TOML file.
pub fn from_file(path: &Path) -> Result<ReaderConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    from_str(&content)
}

/// Parse configuration from a TOML string.
pub fn from_str(content: &str) -> Result<ReaderConfig> {
    toml::from_str(content).context("Failed to parse TOML configuration")
}
