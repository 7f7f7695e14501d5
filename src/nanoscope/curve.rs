//! Approach/retract decoding of Nanoscope force curves.

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::io::{Cursor, Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{AfmError, Result};
use crate::model::{ForceCurve, Segment, SegmentType, VDEFLECTION};

use super::header::NanoscopeHeader;

/// Height channel name of decoded Nanoscope segments
pub const HEIGHT_CHANNEL: &str = "height";

/// Channels per decoded segment (`height`, `vDeflection`)
const NB_COLS: usize = 2;

/// Consecutive deflection ratio above which leading approach samples are
/// treated as noise
const NOISE_RATIO: f64 = 10.0;

pub(crate) fn read_exact_region<R: Read + Seek>(
    reader: &mut R,
    offset: u64,
    len: usize,
    what: &str,
) -> Result<Vec<u8>> {
    reader.seek(SeekFrom::Start(offset))?;
    let mut bytes = Vec::new();
    reader.by_ref().take(len as u64).read_to_end(&mut bytes)?;
    if bytes.len() < len {
        return Err(AfmError::truncated(what, len, bytes.len()));
    }
    Ok(bytes)
}

fn unpack_le(bytes: &[u8], width: usize) -> Result<Vec<i32>> {
    let mut cursor = Cursor::new(bytes);
    let mut values = Vec::with_capacity(bytes.len() / width);
    for _ in 0..bytes.len() / width {
        let value = match width {
            2 => cursor.read_i16::<LittleEndian>()? as i32,
            _ => cursor.read_i32::<LittleEndian>()?,
        };
        values.push(value);
    }
    Ok(values)
}

fn ramp(points: usize, step: f64) -> Vec<f64> {
    (0..points).map(|i| i as f64 * step).collect()
}

/// Approach and retract arrays of one curve before segment assembly
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawCurve {
    pub approach_x: Vec<f64>,
    pub approach: Vec<f64>,
    pub retract_x: Vec<f64>,
    pub retract: Vec<f64>,
}

/// Rebuild the sinusoidal drive axis of a PeakForce capture and split the
/// concatenated buffer around its maximum.
pub(crate) fn resync_peakforce(
    header: &NanoscopeHeader,
    approach: &[f64],
    retract: &[f64],
) -> Result<RawCurve> {
    let samples = approach.len();
    let frequency = header.pfc_frequency * 1000.0;
    if frequency <= 0.0 || samples == 0 {
        return Err(AfmError::InvalidStructure(
            "PeakForce capture without frequency or samples".to_string(),
        ));
    }

    let mut sync_distance = header.sync_distance_qnm;
    if header.pfc_sample_points > 0 && samples != header.pfc_sample_points {
        let pft_factor = header.pfc_sample_points as f64 / (2 * samples) as f64;
        sync_distance /= pft_factor;
    }

    let buffer: Vec<f64> = approach.iter().rev().chain(retract).copied().collect();
    let max_index = buffer
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(best, max), (i, &v)| {
            if v > max {
                (i, v)
            } else {
                (best, max)
            }
        })
        .0;

    let sd = sync_distance / (frequency * 2.0 * samples as f64);
    let delta_t = sd - 1.0 / (frequency * 4.0);
    let dt = (0.5 / frequency) / samples as f64;
    let drive: Vec<f64> = (0..2 * samples)
        .map(|i| {
            let t = i as f64 * dt;
            header.pfc_amplitude * (2.0 * PI * frequency * (t - delta_t)).sin()
        })
        .collect();

    let split = |values: &[f64], start: usize, end: usize| {
        let end = end.min(values.len());
        values[start.min(end)..end].to_vec()
    };

    Ok(RawCurve {
        approach_x: split(&drive, 0, max_index),
        approach: split(&buffer, 0, max_index),
        retract_x: split(&drive, max_index, max_index + samples),
        retract: split(&buffer, max_index, max_index + samples),
    })
}

/// First approach index where the deflection stops jumping by more than
/// [`NOISE_RATIO`] between consecutive samples
pub(crate) fn noise_onset(deflection: &[f64]) -> usize {
    deflection
        .windows(2)
        .position(|pair| (pair[0] / pair[1]).abs() <= NOISE_RATIO || (pair[0] / pair[1]).is_nan())
        .unwrap_or(0)
}

/// Decode curve `index` into an approach (id 0) and a retract (id 1) segment
pub(crate) fn decode_curve<R: Read + Seek>(
    reader: &mut R,
    header: &NanoscopeHeader,
    file_id: &str,
    index: usize,
) -> Result<ForceCurve> {
    let (n_approach, n_retract) = (header.approach_points, header.retract_points);
    let width = header.curve_sample_width()?;
    let curve_bytes = n_approach
        .checked_add(n_retract)
        .and_then(|n| n.checked_mul(width))
        .ok_or_else(|| AfmError::InvalidStructure("curve point counts overflow".to_string()))?;
    let offset = index
        .checked_mul(curve_bytes)
        .and_then(|o| o.checked_add(header.data_offset))
        .ok_or_else(|| AfmError::InvalidStructure(format!("curve {} offset overflows", index)))?;

    let what = format!("curve {}", index);
    let bytes = read_exact_region(reader, offset as u64, curve_bytes, &what)?;
    let (approach_bytes, retract_bytes) = bytes.split_at(n_approach * width);
    let raw_approach = unpack_le(approach_bytes, width)?;
    let raw_retract = unpack_le(retract_bytes, width)?;

    let counts = |raw: &[i32]| raw.iter().map(|&v| v as f64).collect::<Vec<f64>>();
    let mut raw = if header.peakforce {
        resync_peakforce(header, &counts(&raw_approach), &counts(&raw_retract))?
    } else {
        RawCurve {
            approach_x: ramp(n_approach, header.zstep_approach),
            approach: counts(&raw_approach),
            retract_x: ramp(n_retract, header.zstep_retract),
            retract: counts(&raw_retract),
        }
    };

    let volts = |values: &mut Vec<f64>| {
        for v in values.iter_mut() {
            *v *= header.deflection_v_per_lsb;
        }
    };
    volts(&mut raw.approach);
    volts(&mut raw.retract);

    let start = noise_onset(&raw.approach);
    let baseline = match raw.retract.last() {
        Some(&last) => last,
        None => {
            log::warn!("Curve {} has an empty retract segment", index);
            0.0
        }
    };

    let approach_x = raw.approach_x.split_off(start.min(raw.approach_x.len()));
    let mut approach: Vec<f64> = raw
        .approach
        .iter()
        .skip(start)
        .map(|v| v - baseline)
        .collect();
    let mut retract: Vec<f64> = raw.retract.iter().map(|v| v - baseline).collect();

    // plain captures store deflection from the far end
    if !header.peakforce {
        approach.reverse();
        retract.reverse();
    }

    let mut curve = ForceCurve::new(index, file_id);
    curve.insert(assemble(
        header,
        file_id,
        SegmentType::Approach,
        approach_x,
        approach,
        raw_approach,
    ));
    curve.insert(assemble(
        header,
        file_id,
        SegmentType::Retract,
        raw.retract_x,
        retract,
        raw_retract,
    ));

    log::debug!(
        "Decoded Nanoscope curve {} ({} noisy approach samples trimmed)",
        index,
        start
    );
    Ok(curve)
}

fn assemble(
    header: &NanoscopeHeader,
    file_id: &str,
    segment_type: SegmentType,
    height: Vec<f64>,
    deflection: Vec<f64>,
    raw_deflection: Vec<i32>,
) -> Segment {
    let (segment_id, velocity) = match segment_type {
        SegmentType::Retract => (1, header.speed_reverse),
        _ => (0, header.speed_forward),
    };

    let mut segment = Segment::new(file_id, segment_id, segment_type);
    segment.nb_point = height.len();
    segment.nb_col = NB_COLS;
    segment.force_setpoint_mode = header.trigger_mode.clone();
    segment.force_setpoint = 0.0;
    segment.velocity = velocity;
    segment.sampling_rate = header.scan_rate;
    segment.z_displacement = header.ramp_size;
    segment.formatted_data.insert(HEIGHT_CHANNEL, height);
    segment.formatted_data.insert(VDEFLECTION, deflection);
    segment.height_channel_key = Some(HEIGHT_CHANNEL.to_string());
    segment.raw_data = BTreeMap::from([(VDEFLECTION.to_string(), raw_deflection)]);
    segment
}
