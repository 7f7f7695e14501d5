use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::AfmError;

use super::segment::{Segment, SegmentType};

/// One ramp cycle: the approach, pause, modulation and retract segments
/// recorded at a single position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForceCurve {
    /// File identifier
    pub file_id: String,
    /// Index of the curve in the file
    pub curve_index: usize,
    approach: BTreeMap<u32, Segment>,
    pause: BTreeMap<u32, Segment>,
    modulation: BTreeMap<u32, Segment>,
    retract: BTreeMap<u32, Segment>,
}

impl ForceCurve {
    /// Create an empty curve
    pub fn new(curve_index: usize, file_id: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            curve_index,
            approach: BTreeMap::new(),
            pause: BTreeMap::new(),
            modulation: BTreeMap::new(),
            retract: BTreeMap::new(),
        }
    }

    /// Route a segment into its phase, keyed by segment id.
    ///
    /// Returns the segment previously stored under the same phase and id.
    pub fn insert(&mut self, segment: Segment) -> Option<Segment> {
        let id = segment.segment_id;
        self.phase_mut(segment.segment_type).insert(id, segment)
    }

    fn phase_mut(&mut self, segment_type: SegmentType) -> &mut BTreeMap<u32, Segment> {
        match segment_type {
            SegmentType::Approach => &mut self.approach,
            SegmentType::Pause => &mut self.pause,
            SegmentType::Modulation => &mut self.modulation,
            SegmentType::Retract => &mut self.retract,
        }
    }

    /// Segments of one phase, ordered by id
    pub fn segments_of(&self, segment_type: SegmentType) -> impl Iterator<Item = &Segment> {
        match segment_type {
            SegmentType::Approach => self.approach.values(),
            SegmentType::Pause => self.pause.values(),
            SegmentType::Modulation => self.modulation.values(),
            SegmentType::Retract => self.retract.values(),
        }
    }

    /// Approach segments, ordered by id
    pub fn approach_segments(&self) -> impl Iterator<Item = &Segment> {
        self.approach.values()
    }

    /// Retract segments, ordered by id
    pub fn retract_segments(&self) -> impl Iterator<Item = &Segment> {
        self.retract.values()
    }

    /// Number of segments over all phases
    pub fn segment_count(&self) -> usize {
        self.approach.len() + self.pause.len() + self.modulation.len() + self.retract.len()
    }

    /// All segments sorted by segment id.
    ///
    /// Ties between phases resolve as Approach, Pause, Modulation, Retract.
    pub fn ordered_segments(&self) -> Vec<&Segment> {
        let mut segments: Vec<&Segment> = self
            .approach
            .values()
            .chain(self.pause.values())
            .chain(self.modulation.values())
            .chain(self.retract.values())
            .collect();
        segments.sort_by_key(|s| (s.segment_id, s.segment_type.phase_rank()));
        segments
    }

    /// Mutable variant of [`ForceCurve::ordered_segments`]
    pub fn ordered_segments_mut(&mut self) -> Vec<&mut Segment> {
        let mut segments: Vec<&mut Segment> = self
            .approach
            .values_mut()
            .chain(self.pause.values_mut())
            .chain(self.modulation.values_mut())
            .chain(self.retract.values_mut())
            .collect();
        segments.sort_by_key(|s| (s.segment_id, s.segment_type.phase_rank()));
        segments
    }

    /// Run [`Segment::preprocess`] on every segment
    pub fn preprocess(&mut self, deflection_sens: f64, height_channel_key: &str, y0: Option<f64>) {
        for segment in self.ordered_segments_mut() {
            segment.preprocess(deflection_sens, height_channel_key, y0);
        }
    }

    /// `zheight = x0 − zheight` for every segment, with `x0` the last height
    /// sample of the last retract segment. Needed for JPK files.
    pub fn shift_height(&mut self) {
        let x0 = self
            .retract
            .values()
            .next_back()
            .and_then(|s| s.zheight.as_ref())
            .and_then(|z| z.last().copied());

        let Some(x0) = x0 else {
            AfmError::MissingRequiredChannel(
                "retract height required to shift the curve".to_string(),
            )
            .warn();
            return;
        };

        for segment in self.ordered_segments_mut() {
            if let Some(zheight) = segment.zheight.as_mut() {
                zheight.iter_mut().for_each(|z| *z = x0 - *z);
            }
        }
    }

    /// Run [`Segment::compute_force_indentation`] on every segment
    pub fn compute_force_indentation(&mut self, poc: (f64, f64), spring_constant: f64) {
        for segment in self.ordered_segments_mut() {
            segment.compute_force_indentation(poc, spring_constant);
        }
    }
}
