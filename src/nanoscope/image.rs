//! Nanoscope topography image.

use std::io::{Cursor, Read, Seek};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{AfmError, Result};
use crate::model::Image;

use super::curve::read_exact_region;
use super::header::NanoscopeHeader;

/// Bytes skipped after every pixel when the image is sampled more densely
/// than the force curves
fn skip_stride(header: &NanoscopeHeader) -> usize {
    if header.curves_per_line == 0 {
        return 0;
    }
    let ratio = header.image_samps_per_line as f64 / header.curves_per_line as f64;
    (((ratio - 1.0) * 2.0).round()).max(0.0) as usize
}

/// Bytes per pixel the Z scale refers to.
///
/// The force-image list declares it; the width inferred from the image length
/// only decides how samples are unpacked.
fn scale_width(header: &NanoscopeHeader, width: usize) -> usize {
    if header.image_bytes_per_pixel != 0 && header.image_bytes_per_pixel != width {
        log::warn!(
            "Image list declares {} bytes/pixel but the image data holds {}",
            header.image_bytes_per_pixel,
            width
        );
    }
    match header.bytes_per_pixel {
        0 => width,
        declared => declared.min(8),
    }
}

/// Read the topography buffer, scale it to nm and baseline it to zero.
///
/// Returns `None` when the header declares no image region.
pub(crate) fn read_piezo_image<R: Read + Seek>(
    reader: &mut R,
    header: &NanoscopeHeader,
) -> Result<Option<Image>> {
    if header.image_offset == 0 {
        log::debug!("Nanoscope file has no image region");
        return Ok(None);
    }

    let (rows, cols) = (header.image_lines, header.image_samps_per_line);
    let width = header.image_pixel_width()?;
    let skip = skip_stride(header);
    let (pixels, len) = rows
        .checked_mul(cols)
        .and_then(|pixels| {
            let data = pixels.checked_mul(width)?;
            let gaps = pixels.saturating_sub(1).checked_mul(skip)?;
            Some((pixels, data.checked_add(gaps)?))
        })
        .ok_or_else(|| {
            AfmError::InvalidStructure(format!("image of {}x{} pixels is too large", rows, cols))
        })?;

    let bytes = read_exact_region(reader, header.image_offset as u64, len, "image")?;

    let scale = header.image_z_sensitivity * header.zscan_sensitivity
        / 2f64.powi((scale_width(header, width) * 8) as i32);

    let mut cursor = Cursor::new(bytes.as_slice());
    let mut data = Vec::with_capacity(pixels);
    for i in 0..pixels {
        if i > 0 {
            cursor.set_position(cursor.position() + skip as u64);
        }
        let value = match width {
            2 => cursor.read_i16::<LittleEndian>()? as f64,
            _ => cursor.read_i32::<LittleEndian>()? as f64,
        };
        data.push(value * scale);
    }

    let mut image = Image::from_vec(rows, cols, data)?;
    image.subtract_min();
    Ok(Some(image))
}
