use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{AfmError, Result};
use crate::model::{ForceCurve, Segment};

use super::header::{Field, UffHeader, UffSegmentHeader};

/// Width of the `HE <key>:` column
const KEY_WIDTH: usize = 35;

fn format_field(field: Field<'_>) -> String {
    match field {
        Field::Text(value) => value.unwrap_or_default().to_string(),
        // `{:E}` prints the shortest representation that parses back exactly
        Field::Float(value) => format!("{:E}", value),
        Field::Count(value) => value.to_string(),
    }
}

/// Streams UFF text to any writer
pub struct UffWriter<W: Write> {
    out: W,
}

impl UffWriter<BufWriter<File>> {
    /// Create a UFF file at `path`
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> UffWriter<W> {
    /// Wrap a writer
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn write_field(&mut self, key: &str, field: Field<'_>) -> Result<()> {
        let key = format!("{}:", key);
        writeln!(self.out, "HE {:<width$} {}", key, format_field(field), width = KEY_WIDTH)?;
        Ok(())
    }

    /// Write the header and the data rows of one curve.
    ///
    /// Every segment block of `header` must match a segment of `curve` by
    /// phase and id.
    pub fn write_curve(&mut self, header: &UffHeader, curve: &ForceCurve) -> Result<()> {
        for (key, field) in header.file_fields() {
            self.write_field(key, field)?;
        }
        for (key, value) in &header.extra {
            self.write_field(key, Field::Text(Some(value)))?;
        }

        for (index, block) in header.segments.iter().enumerate() {
            let segment = find_segment(curve, block)?;
            for (key, field) in block.fields(index) {
                self.write_field(&key, field)?;
            }
            self.write_rows(block, segment)?;
        }
        Ok(())
    }

    fn write_rows(&mut self, block: &UffSegmentHeader, segment: &Segment) -> Result<()> {
        let columns: Vec<&[f64]> = block
            .columns
            .iter()
            .map(|c| {
                segment.formatted_data.get(&c.title).ok_or_else(|| {
                    AfmError::InvalidStructure(format!(
                        "segment {} has no channel {}",
                        block.segment_id, c.title
                    ))
                })
            })
            .collect::<Result<_>>()?;

        let rows = columns.iter().map(|c| c.len()).min().unwrap_or(0);
        if rows != block.nb_point {
            log::warn!(
                "Segment {} declares {} points but holds {}",
                block.segment_id,
                block.nb_point,
                rows
            );
        }

        let code = block.segment_type.code();
        for row in 0..rows {
            let mut line = format!("{} {:>5}", code, block.segment_id);
            for column in &columns {
                line.push_str(&format!(" {:>15E}", column[row]));
            }
            writeln!(self.out, "{}", line)?;
        }
        Ok(())
    }

    /// Flush and return the inner writer
    pub fn finish(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

fn find_segment<'a>(curve: &'a ForceCurve, block: &UffSegmentHeader) -> Result<&'a Segment> {
    curve
        .segments_of(block.segment_type)
        .find(|s| s.segment_id == block.segment_id)
        .ok_or_else(|| {
            AfmError::InvalidStructure(format!(
                "curve {} has no {} segment {}",
                curve.curve_index,
                block.segment_type.name(),
                block.segment_id
            ))
        })
}

/// Write one curve to a `.uff` file
pub fn write_uff_file<P: AsRef<Path>>(path: P, header: &UffHeader, curve: &ForceCurve) -> Result<()> {
    let mut writer = UffWriter::create(path.as_ref())?;
    writer.write_curve(header, curve)?;
    writer.finish()?;
    log::debug!("Wrote {}", path.as_ref().display());
    Ok(())
}
