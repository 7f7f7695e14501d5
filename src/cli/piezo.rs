use anyhow::{Context, Result};
use std::path::PathBuf;

use afmreader::config::ReaderConfig;
use afmreader::file::AfmFile;

/// Write the piezo image of a file as CSV, one image row per line
pub fn run(input: PathBuf, output: Option<PathBuf>, config: ReaderConfig) -> Result<()> {
    let file = AfmFile::open_with_config(&input, config)
        .with_context(|| format!("Failed to open {}", input.display()))?;

    let image = file
        .piezo_image()
        .context("Failed to compute the piezo image")?
        .with_context(|| format!("{} has no piezo image", input.display()))?;

    let mut writer = super::csv_writer(output.as_deref())?;
    for row in image.iter_rows() {
        writer
            .write_record(row.iter().map(|v| v.to_string()))
            .context("Failed to write CSV row")?;
    }
    writer.flush().context("Failed to flush CSV output")?;

    log::info!("Wrote {} x {} piezo image", image.rows(), image.cols());
    Ok(())
}
