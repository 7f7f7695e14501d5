//! Embedded channel images and the piezo height image of JPK maps.

use std::collections::BTreeMap;

use crate::error::{AfmError, Result};
use crate::format::JpkKind;
use crate::model::Image;
use crate::tiff::{TagValue, TiffFile};

/// Channels extracted from the embedded image
pub const IMAGE_CHANNELS: [&str; 5] = ["Baseline", "Height(measured)", "SlopeFit", "Adhesion", "Height"];

const FANCY_NAME_MARKER: &str = "algorithm.object-name.base-object-name.fancy-name";
const SCALING_LABELS: [&str; 4] = ["Force", "volts", "Calibrated height", "Nominal height"];
const HEIGHT_SCALINGS: [&str; 2] = ["Calibrated height", "Nominal height"];
const FORCE_SCALINGS: [&str; 2] = ["Force", "volts"];

// The scaling record is stored in the last tags of each page:
// [label, value type, unit, scaling mode, multiplier, offset]
const SCALING_WINDOW: usize = 7;
const MULTIPLIER_OFFSET: usize = 4;
const OFFSET_OFFSET: usize = 5;

/// Largest ratio of grid cells to decoded curves accepted for a piezo image
pub const MAX_GRID_PADDING: usize = 16;

fn channel_name(tag_text: &str) -> Option<String> {
    let first_line = tag_text.lines().next()?;
    let name = first_line.split(':').nth(1)?;
    Some(name.replace(' ', ""))
}

/// `(multiplier, offset)` found in the scaling window of a page, if valid
/// for the channel
pub(crate) fn conversion_factors(values: &[&TagValue], channel: &str) -> Option<(f64, f64)> {
    let window = &values[values.len().saturating_sub(SCALING_WINDOW)..];

    let (position, label) = window
        .iter()
        .enumerate()
        .find_map(|(i, v)| v.as_text().filter(|t| SCALING_LABELS.contains(t)).map(|t| (i, t)))?;

    let valid = match channel {
        "Height(measured)" | "Height" => HEIGHT_SCALINGS.contains(&label),
        "Baseline" | "SlopeFit" | "Adhesion" => FORCE_SCALINGS.contains(&label),
        _ => true,
    };
    if !valid {
        log::debug!("Scaling {} does not apply to channel {}", label, channel);
        return None;
    }

    let multiplier = window.get(position + MULTIPLIER_OFFSET)?.as_float()?;
    let offset = window.get(position + OFFSET_OFFSET)?.as_float()?;
    Some((multiplier, offset))
}

/// Decode every whitelisted channel page of the embedded image.
///
/// A page is named by the last fancy-name tag it carries. Pages without one
/// keep the name of the page before them, and a later page of the same
/// channel replaces the earlier image.
pub fn read_channel_images(bytes: Vec<u8>) -> Result<BTreeMap<String, Image>> {
    let tiff = TiffFile::parse(bytes)?;
    let mut images = BTreeMap::new();

    let mut current: Option<String> = None;

    // the first page is a thumbnail
    for (index, page) in tiff.pages().iter().enumerate().skip(1) {
        let values: Vec<&TagValue> = page.entries().iter().map(|e| &e.value).collect();

        if let Some(name) = values
            .iter()
            .filter_map(|v| v.as_text())
            .filter(|t| t.contains(FANCY_NAME_MARKER))
            .filter_map(channel_name)
            .last()
        {
            current = Some(name);
        }
        let Some(channel) = current.clone() else {
            continue;
        };

        if !IMAGE_CHANNELS.contains(&channel.as_str()) {
            continue;
        }

        let Some((multiplier, offset)) = conversion_factors(&values, &channel) else {
            AfmError::MissingConversionFactors {
                channel: channel.clone(),
                stage: "image scaling".to_string(),
            }
            .warn();
            continue;
        };

        let pixels = tiff.read_samples(index)?;
        let data = pixels
            .into_iter()
            .map(|p| (p as i64) as f64 * multiplier + offset)
            .collect();
        let image = Image::from_vec(page.height()?, page.width()?, data)?;
        images.insert(channel, image);
    }

    log::debug!("Read {} embedded channel images", images.len());
    Ok(images)
}

/// Reshape per-curve heights into the scan grid, baseline to zero and undo
/// the bidirectional raster of force maps.
///
/// Missing curves are filled with NaN. A grid more than
/// [`MAX_GRID_PADDING`] times larger than the number of curves is rejected.
pub fn assemble_piezo_image(
    kind: JpkKind,
    rows: usize,
    cols: usize,
    mut heights: Vec<f64>,
) -> Result<Image> {
    let cells = rows
        .checked_mul(cols)
        .filter(|&cells| cells <= heights.len().max(1).saturating_mul(MAX_GRID_PADDING))
        .ok_or_else(|| {
            AfmError::InvalidStructure(format!(
                "scan grid of {}x{} does not fit {} curves",
                rows,
                cols,
                heights.len()
            ))
        })?;
    if heights.len() < cells {
        log::warn!(
            "Piezo image holds {} of {} curves; padding with NaN",
            heights.len(),
            cells
        );
        heights.resize(cells, f64::NAN);
    } else if heights.len() > cells {
        log::warn!(
            "Map holds {} curves but the grid is {}x{}; extra curves dropped",
            heights.len(),
            rows,
            cols
        );
        heights.truncate(cells);
    }

    let mut image = Image::from_vec(rows, cols, heights)?;
    image.subtract_min();
    if kind == JpkKind::ForceMap {
        image.flip_odd_rows();
    }
    Ok(image)
}
