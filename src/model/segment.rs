use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::AfmError;

use super::conversion::VDEFLECTION;

/// Phase of a force-distance ramp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SegmentType {
    /// Tip moves towards the sample
    Approach,
    /// Tip held at a fixed position
    Pause,
    /// Oscillating segment
    Modulation,
    /// Tip moves away from the sample
    Retract,
}

impl SegmentType {
    /// Two-letter code used in UFF data rows
    pub fn code(&self) -> &'static str {
        match self {
            SegmentType::Approach => "AP",
            SegmentType::Retract => "RE",
            SegmentType::Pause => "PA",
            SegmentType::Modulation => "MO",
        }
    }

    /// Canonical name
    pub fn name(&self) -> &'static str {
        match self {
            SegmentType::Approach => "Approach",
            SegmentType::Retract => "Retract",
            SegmentType::Pause => "Pause",
            SegmentType::Modulation => "Modulation",
        }
    }

    /// Normalize a JPK segment style (`extend`, `retract`, `pause`, `modulation`)
    pub fn from_style(style: &str) -> Option<Self> {
        match style {
            "extend" => Some(SegmentType::Approach),
            "retract" => Some(SegmentType::Retract),
            "pause" => Some(SegmentType::Pause),
            "modulation" => Some(SegmentType::Modulation),
            _ => None,
        }
    }

    /// Parse a canonical name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Approach" => Some(SegmentType::Approach),
            "Retract" => Some(SegmentType::Retract),
            "Pause" => Some(SegmentType::Pause),
            "Modulation" => Some(SegmentType::Modulation),
            _ => None,
        }
    }

    /// Tie-break rank when two phases share a segment id
    pub fn phase_rank(&self) -> u8 {
        match self {
            SegmentType::Approach => 0,
            SegmentType::Pause => 1,
            SegmentType::Modulation => 2,
            SegmentType::Retract => 3,
        }
    }
}

impl fmt::Display for SegmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-channel arrays in insertion order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Channels {
    columns: Vec<(String, Vec<f64>)>,
}

impl Channels {
    /// Create an empty channel map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a channel, replacing an existing one in place
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        let name = name.into();
        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = values,
            None => self.columns.push((name, values)),
        }
    }

    /// Values of a channel
    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    /// Whether a channel is present
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Channel names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    /// `(name, values)` pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.columns.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    /// Number of channels
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether no channel is stored
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// JPK per-segment header values
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SegmentMetadata {
    /// Acquisition time stamp
    pub time_stamp: Option<String>,
    /// Number of points
    pub num_points: usize,
    /// Duration in seconds
    pub duration: f64,
    /// Channels stored for the segment
    pub channels: Vec<String>,
    /// Whether a deflection baseline was measured
    pub baseline_measured: bool,
    /// Measured baseline in volts
    pub baseline: f64,
    /// Approach id
    pub approach_id: Option<String>,
    /// Raw style (`extend`, `retract`, `pause`, `modulation`)
    pub style: Option<String>,
    /// Setpoint of extend segments
    pub setpoint: Option<f64>,
    /// Amplitude of modulation segments
    pub amplitude: Option<f64>,
    /// Frequency of modulation segments
    pub frequency: Option<f64>,
    /// Start phase of modulation segments
    pub start_phase: Option<f64>,
    /// Ramp start position (scaled units)
    pub z_start: f64,
    /// Ramp end position (scaled units)
    pub z_end: f64,
    /// `z_end - z_start`
    pub ramp_size: f64,
    /// `ramp_size / duration`
    pub ramp_speed: f64,
}

/// One phase of a force curve
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    /// File identifier
    pub file_id: String,
    /// Position of the segment in the curve
    pub segment_id: u32,
    /// Phase
    pub segment_type: SegmentType,
    /// Free-text description
    pub description: Option<String>,
    /// Number of points
    pub nb_point: usize,
    /// Setpoint mode (Relative / Absolute / trigger mode)
    pub force_setpoint_mode: Option<String>,
    /// Number of formatted channels
    pub nb_col: usize,
    /// Force setpoint
    pub force_setpoint: f64,
    /// Ramp velocity
    pub velocity: f64,
    /// Sampling rate in Hz
    pub sampling_rate: f64,
    /// Z displacement of the ramp
    pub z_displacement: f64,
    /// JPK segment header values
    pub metadata: Option<SegmentMetadata>,
    /// Raw encoder counts per channel
    pub raw_data: BTreeMap<String, Vec<i32>>,
    /// Unit-converted channels
    pub formatted_data: Channels,
    /// Key of the height channel in `formatted_data`
    pub height_channel_key: Option<String>,
    /// Piezo height, set by [`Segment::preprocess`]
    pub zheight: Option<Vec<f64>>,
    /// Deflection in metres, set by [`Segment::preprocess`]
    pub vdeflection: Option<Vec<f64>>,
    /// Time axis, set by [`Segment::preprocess`]
    pub time: Option<Vec<f64>>,
    /// Indentation, set by [`Segment::compute_force_indentation`]
    pub indentation: Option<Vec<f64>>,
    /// Force, set by [`Segment::compute_force_indentation`]
    pub force: Option<Vec<f64>>,
}

impl Segment {
    /// Create an empty segment
    pub fn new(file_id: impl Into<String>, segment_id: u32, segment_type: SegmentType) -> Self {
        Self {
            file_id: file_id.into(),
            segment_id,
            segment_type,
            description: None,
            nb_point: 0,
            force_setpoint_mode: None,
            nb_col: 0,
            force_setpoint: 0.0,
            velocity: 0.0,
            sampling_rate: 0.0,
            z_displacement: 0.0,
            metadata: None,
            raw_data: BTreeMap::new(),
            formatted_data: Channels::new(),
            height_channel_key: None,
            zheight: None,
            vdeflection: None,
            time: None,
            indentation: None,
            force: None,
        }
    }

    /// Two-letter segment code
    pub fn segment_code(&self) -> &'static str {
        self.segment_type.code()
    }

    /// Height channel values, if the segment carries one
    pub fn height(&self) -> Option<&[f64]> {
        self.height_channel_key
            .as_deref()
            .and_then(|key| self.formatted_data.get(key))
    }

    /// Deflection (m) = (vDeflection − baseline or y0) × sensitivity; also
    /// fills `zheight` and `time`.
    ///
    /// A measured baseline takes precedence over `y0`. Missing channels are
    /// logged and leave the corresponding array absent.
    pub fn preprocess(&mut self, deflection_sens: f64, height_channel_key: &str, y0: Option<f64>) {
        match self.formatted_data.get(VDEFLECTION) {
            Some(deflection) => {
                let shift = match &self.metadata {
                    Some(meta) if meta.baseline_measured => meta.baseline,
                    _ => y0.unwrap_or(0.0),
                };
                self.vdeflection = Some(
                    deflection
                        .iter()
                        .map(|v| (v - shift) * deflection_sens)
                        .collect(),
                );
            }
            None => AfmError::MissingRequiredChannel(format!(
                "{} in segment {}",
                VDEFLECTION, self.segment_id
            ))
            .warn(),
        }

        match self.formatted_data.get(height_channel_key) {
            Some(height) => self.zheight = Some(height.to_vec()),
            None => AfmError::MissingRequiredChannel(format!(
                "{} in segment {}",
                height_channel_key, self.segment_id
            ))
            .warn(),
        }

        if let Some(time) = self.formatted_data.get("time") {
            self.time = Some(time.to_vec());
        } else if self.sampling_rate > 0.0 {
            let duration = self.nb_point as f64 / self.sampling_rate;
            self.time = Some(linspace(0.0, duration, self.nb_point));
        }
    }

    /// Indentation = zheight − deflection − (poc_x − poc_y);
    /// force = deflection × k − poc_y × k.
    pub fn compute_force_indentation(&mut self, poc: (f64, f64), spring_constant: f64) {
        let (Some(zheight), Some(deflection)) = (&self.zheight, &self.vdeflection) else {
            AfmError::MissingRequiredChannel(format!(
                "segment {} must be preprocessed before computing force",
                self.segment_id
            ))
            .warn();
            return;
        };

        let center_x = poc.0 - poc.1;
        let center_y = poc.1 * spring_constant;

        self.indentation = Some(
            zheight
                .iter()
                .zip(deflection)
                .map(|(z, d)| z - d - center_x)
                .collect(),
        );
        self.force = Some(
            deflection
                .iter()
                .map(|d| d * spring_constant - center_y)
                .collect(),
        );
    }
}

/// `n` evenly spaced samples over `[start, stop)`
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    let step = (stop - start) / n as f64;
    (0..n).map(|i| start + step * i as f64).collect()
}
