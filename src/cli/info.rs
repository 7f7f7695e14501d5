use anyhow::{Context, Result};
use std::path::PathBuf;

use afmreader::config::ReaderConfig;
use afmreader::file::{load_file, LoadedFile};
use afmreader::model::{FileMetadata, HeaderValue};

#[cfg(feature = "colorized_output")]
fn heading(text: &str) -> String {
    console::style(text).bold().cyan().to_string()
}

#[cfg(not(feature = "colorized_output"))]
fn heading(text: &str) -> String {
    text.to_string()
}

fn optional<T: std::fmt::Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn print_summary(metadata: &FileMetadata, curve_count: usize) {
    println!("{}", heading("AFM File Information"));
    println!("{}", heading("===================="));
    println!("File: {}", metadata.file_path.display());
    println!("Format: {}", metadata.format);
    println!("File id: {}", metadata.file_id);
    println!("Size: {} bytes", metadata.file_size_bytes);
    println!();

    println!("{}", heading("Acquisition:"));
    println!("  Instrument: {}", optional(&metadata.instrument));
    println!("  Software: {}", optional(&metadata.software_version));
    println!("  Date: {}", optional(&metadata.file_date));
    println!("  Scanner: {}", optional(&metadata.scanner));
    println!();

    println!("{}", heading("Curves:"));
    println!("  Count: {}", curve_count);
    println!("  Force volume: {}", metadata.force_volume);
    if metadata.force_volume {
        println!(
            "  Grid: {} x {} pixels, {:.1} x {:.1} nm",
            metadata.num_x_pixels, metadata.num_y_pixels, metadata.scan_size_x, metadata.scan_size_y
        );
        println!("  Scan angle: {}°", metadata.scan_angle);
    }
    println!("  Height channel: {}", optional(&metadata.height_channel_key));
    println!("  Deflection channel: {}", metadata.found_vdeflection);
    println!(
        "  Deflection sensitivity: {} nm/V",
        optional(&metadata.deflection_sensitivity)
    );
    println!("  Spring constant: {} N/m", optional(&metadata.spring_constant));
}

/// Display information about an AFM file
pub fn run(file: PathBuf, config: ReaderConfig, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {}", file.display());
    }

    let loaded = load_file(&file, config)
        .with_context(|| format!("Failed to load {}", file.display()))?;

    match loaded {
        LoadedFile::Curves(afm) => {
            if json {
                let text = afm.metadata().to_json().context("Failed to serialize metadata")?;
                println!("{}", text);
            } else {
                print_summary(afm.metadata(), afm.curve_count());
            }
        }
        LoadedFile::Thermal(thermal) => {
            if json {
                let text = serde_json::to_string_pretty(&thermal.parameters)
                    .context("Failed to serialize thermal parameters")?;
                println!("{}", text);
            } else {
                println!("{}", heading("Thermal Noise Spectrum"));
                println!("File: {}", file.display());
                println!("Points: {}", thermal.frequency.len());
                println!("Fit data: {}", thermal.fit.is_some());
                for (key, value) in &thermal.parameters {
                    match value {
                        HeaderValue::Number(n) => println!("  {}: {}", key, n),
                        HeaderValue::Text(t) => println!("  {}: {}", key, t),
                    }
                }
            }
        }
    }

    Ok(())
}
