use anyhow::{Context, Result};
use std::path::PathBuf;

use afmreader::config::ReaderConfig;
use afmreader::file::AfmFile;

/// Write the channels of one curve as CSV.
///
/// Each row holds the segment id, phase, sample index and one value per
/// channel of that segment.
pub fn run(input: PathBuf, index: usize, output: Option<PathBuf>, config: ReaderConfig) -> Result<()> {
    let file = AfmFile::open_with_config(&input, config)
        .with_context(|| format!("Failed to open {}", input.display()))?;
    let curve = file
        .get_curve(index)
        .with_context(|| format!("Failed to decode curve {}", index))?;

    let mut writer = super::csv_writer(output.as_deref())?;
    for segment in curve.ordered_segments() {
        let mut header = vec![
            "segment_id".to_string(),
            "segment_type".to_string(),
            "sample".to_string(),
        ];
        header.extend(segment.formatted_data.names().map(str::to_string));
        writer.write_record(&header).context("Failed to write CSV header")?;

        let columns: Vec<&[f64]> = segment.formatted_data.iter().map(|(_, v)| v).collect();
        let rows = columns.iter().map(|c| c.len()).min().unwrap_or(0);
        for row in 0..rows {
            let mut record = vec![
                segment.segment_id.to_string(),
                segment.segment_type.to_string(),
                row.to_string(),
            ];
            record.extend(columns.iter().map(|c| c[row].to_string()));
            writer.write_record(&record).context("Failed to write CSV row")?;
        }
    }
    writer.flush().context("Failed to flush CSV output")?;
    Ok(())
}
