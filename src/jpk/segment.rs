//! Decoding of one curve's segments into [`ForceCurve`] values.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek};

use byteorder::{BigEndian, ReadBytesExt};
use zip::ZipArchive;

use crate::config::{HeaderDefaults, JPK_SETPOINT_MODE};
use crate::error::{AfmError, Result};
use crate::model::{linspace, ChannelConversion, ForceCurve, Segment, SegmentType, VDEFLECTION};
use crate::properties::Properties;

use super::header::{parse_segment_header, JpkHeader};
use super::layout::{CurveEntries, SegmentEntries};

/// Read-only state shared by every curve decode
pub(crate) struct DecodeContext<'a> {
    pub header: &'a JpkHeader,
    pub shared: &'a Properties,
    pub defaults: &'a HeaderDefaults,
    pub file_id: &'a str,
    pub height_channel_key: Option<&'a str>,
    pub found_vdeflection: bool,
}

pub(crate) fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Vec<u8>> {
    let mut file = archive
        .by_name(name)
        .map_err(|_| AfmError::MissingEntry(name.to_string()))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Unpack big-endian signed integers of the channel's encoder width
pub(crate) fn unpack_channel(
    bytes: &[u8],
    conversion: &ChannelConversion,
    declared_points: usize,
    entry: &str,
) -> Result<Vec<i32>> {
    let width = conversion.sample_width();
    let expected = declared_points
        .checked_mul(width)
        .ok_or_else(|| AfmError::truncated(entry, usize::MAX, bytes.len()))?;
    if bytes.len() < expected {
        return Err(AfmError::truncated(entry, expected, bytes.len()));
    }

    let count = bytes.len() / width;
    let mut cursor = Cursor::new(bytes);
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        let value = match width {
            2 => cursor.read_i16::<BigEndian>()? as i32,
            _ => cursor.read_i32::<BigEndian>()?,
        };
        values.push(value);
    }
    Ok(values)
}

/// Decode every segment of a curve
pub(crate) fn decode_curve<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    ctx: &DecodeContext<'_>,
    entries: &CurveEntries,
) -> Result<ForceCurve> {
    let mut curve = ForceCurve::new(entries.index, ctx.file_id);

    for segment_entries in entries.segments.values() {
        if let Some(segment) = decode_segment(archive, ctx, segment_entries)? {
            curve.insert(segment);
        }
    }

    log::debug!(
        "Decoded curve {} with {} segments",
        entries.index,
        curve.segment_count()
    );
    Ok(curve)
}

fn decode_segment<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    ctx: &DecodeContext<'_>,
    entries: &SegmentEntries,
) -> Result<Option<Segment>> {
    let header_name = entries.header.as_deref().ok_or_else(|| {
        AfmError::MissingEntry(format!("segment-header.properties of segment {}", entries.segment_id))
    })?;
    let properties = Properties::from_bytes(&read_entry(archive, header_name)?);
    let meta = parse_segment_header(
        ctx.header.kind,
        &properties,
        ctx.shared,
        entries.segment_id,
        ctx.defaults,
    );

    let mut raw_data = BTreeMap::new();
    for (channel, entry) in &entries.channels {
        let conversion = ctx
            .header
            .channel(channel)
            .cloned()
            .unwrap_or_else(|| ChannelConversion::identity(0, channel));
        let bytes = read_entry(archive, entry)?;
        let values = unpack_channel(&bytes, &conversion, meta.num_points, entry)?;
        raw_data.insert(channel.clone(), values);
    }

    if raw_data.is_empty() {
        log::debug!("Segment {} holds no channel data", entries.segment_id);
        return Ok(None);
    }

    let Some(segment_type) = meta.style.as_deref().and_then(SegmentType::from_style) else {
        log::warn!(
            "Skipping segment {} with unknown style {:?}",
            entries.segment_id,
            meta.style
        );
        return Ok(None);
    };

    let mut segment = Segment::new(ctx.file_id, entries.segment_id, segment_type);

    match ctx.height_channel_key {
        Some(key) => match (raw_data.get(key), ctx.header.channel(key)) {
            (Some(raw), Some(conversion)) => {
                segment.formatted_data.insert(key, conversion.convert_all(raw));
                segment.height_channel_key = Some(key.to_string());
            }
            (Some(raw), None) => {
                AfmError::MissingConversionFactors {
                    channel: key.to_string(),
                    stage: "encoder".to_string(),
                }
                .warn();
                segment
                    .formatted_data
                    .insert(key, raw.iter().map(|&v| v as f64).collect());
                segment.height_channel_key = Some(key.to_string());
            }
            (None, _) => AfmError::MissingRequiredChannel(format!(
                "{} in segment {}",
                key, entries.segment_id
            ))
            .warn(),
        },
        None => AfmError::MissingRequiredChannel("no valid height channel".to_string()).warn(),
    }

    if ctx.found_vdeflection {
        match raw_data.get(VDEFLECTION) {
            Some(raw) => {
                let conversion = ctx
                    .header
                    .channel(VDEFLECTION)
                    .cloned()
                    .unwrap_or_else(|| ChannelConversion::identity(0, VDEFLECTION));
                segment
                    .formatted_data
                    .insert(VDEFLECTION, conversion.convert_all(raw));
            }
            None => AfmError::MissingRequiredChannel(format!(
                "{} in segment {}",
                VDEFLECTION, entries.segment_id
            ))
            .warn(),
        }
    } else {
        AfmError::MissingRequiredChannel(VDEFLECTION.to_string()).warn();
    }

    segment
        .formatted_data
        .insert("time", linspace(0.0, meta.duration, meta.num_points));

    segment.force_setpoint_mode = Some(JPK_SETPOINT_MODE.to_string());
    segment.nb_point = meta.num_points;
    segment.nb_col = segment.formatted_data.len();
    segment.force_setpoint = ctx.header.force_setpoint;
    segment.velocity = meta.ramp_speed;
    segment.sampling_rate = if meta.duration > 0.0 {
        meta.num_points as f64 / meta.duration
    } else {
        0.0
    };
    segment.z_displacement = meta.ramp_size;
    segment.raw_data = raw_data;
    segment.metadata = Some(meta);

    Ok(Some(segment))
}
