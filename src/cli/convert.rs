use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use afmreader::config::ReaderConfig;
use afmreader::file::AfmFile;

/// Export the curves of a file to UFF
pub fn run(input: PathBuf, output: Option<PathBuf>, config: ReaderConfig) -> Result<()> {
    let output = output.unwrap_or_else(|| PathBuf::from("."));

    info!("Converting {} to UFF", input.display());
    let file = AfmFile::open_with_config(&input, config)
        .with_context(|| format!("Failed to open {}", input.display()))?;

    let written = file
        .write_uff(&output)
        .with_context(|| format!("Failed to export curves to {}", output.display()))?;

    println!(
        "Wrote {} UFF file(s) to {}",
        written.len(),
        output.display()
    );
    Ok(())
}
