//! Addressing of curve and segment entries inside a JPK archive.
//!
//! Single curves store `segments/<seg>/...`; maps prefix every path with
//! `index/<curve>/`. The position of the curve and segment components is
//! fixed per sub-type.

use std::collections::BTreeMap;

use crate::format::JpkKind;

const SEGMENTS_DIR: &str = "segments";
const SEGMENT_HEADER: &str = "segment-header.properties";
const CHANNELS_DIR: &str = "channels";

/// Path component positions of one archive sub-type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathLayout {
    /// Component holding the curve index (`None` for single curves)
    pub curve_position: Option<usize>,
    /// Component holding the segment index
    pub segment_position: usize,
}

/// What an archive entry holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// `segment-header.properties`
    SegmentHeader,
    /// `channels/<name>.dat`
    Channel(String),
}

/// Decoded address of an archive entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryAddress {
    /// Curve index
    pub curve: usize,
    /// Segment index
    pub segment: u32,
    /// Entry content
    pub kind: EntryKind,
}

impl PathLayout {
    /// Layout of a sub-type
    pub fn for_kind(kind: JpkKind) -> Self {
        if kind.is_map() {
            Self {
                curve_position: Some(1),
                segment_position: 3,
            }
        } else {
            Self {
                curve_position: None,
                segment_position: 1,
            }
        }
    }

    /// Decode an entry name.
    ///
    /// Returns `None` for entries outside the segment hierarchy, directory
    /// entries and files that are neither a segment header nor channel data.
    pub fn classify(&self, path: &str) -> Option<EntryAddress> {
        let parts: Vec<&str> = path.split('/').collect();
        let seg_pos = self.segment_position;

        if parts.get(seg_pos - 1) != Some(&SEGMENTS_DIR) {
            return None;
        }
        if let Some(curve_pos) = self.curve_position {
            if parts.first() != Some(&"index") || curve_pos + 2 != seg_pos {
                return None;
            }
        }

        let curve = match self.curve_position {
            Some(pos) => parts.get(pos)?.parse::<usize>().ok()?,
            None => 0,
        };
        let segment = parts.get(seg_pos)?.parse::<u32>().ok()?;

        let rest = &parts[seg_pos + 1..];
        let kind = match rest {
            [SEGMENT_HEADER] => EntryKind::SegmentHeader,
            [CHANNELS_DIR, file] => {
                let name = file.strip_suffix(".dat")?;
                if name.is_empty() {
                    return None;
                }
                EntryKind::Channel(name.to_string())
            }
            _ => return None,
        };

        Some(EntryAddress {
            curve,
            segment,
            kind,
        })
    }
}

/// Archive entries of one segment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentEntries {
    /// Segment index
    pub segment_id: u32,
    /// `segment-header.properties` entry name
    pub header: Option<String>,
    /// `(channel, entry name)` pairs
    pub channels: Vec<(String, String)>,
}

/// Archive entries of one curve, by segment index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurveEntries {
    /// Curve index
    pub index: usize,
    /// Segments ordered by index
    pub segments: BTreeMap<u32, SegmentEntries>,
}

/// Group archive entry names by curve and segment
pub fn catalog<'a>(
    layout: PathLayout,
    names: impl IntoIterator<Item = &'a str>,
) -> BTreeMap<usize, CurveEntries> {
    let mut curves: BTreeMap<usize, CurveEntries> = BTreeMap::new();

    for name in names {
        let Some(address) = layout.classify(name) else {
            if name.contains(SEGMENTS_DIR) && !name.ends_with('/') {
                log::debug!("Ignoring archive entry {}", name);
            }
            continue;
        };

        let curve = curves.entry(address.curve).or_insert_with(|| CurveEntries {
            index: address.curve,
            ..Default::default()
        });
        let segment = curve
            .segments
            .entry(address.segment)
            .or_insert_with(|| SegmentEntries {
                segment_id: address.segment,
                ..Default::default()
            });

        match address.kind {
            EntryKind::SegmentHeader => segment.header = Some(name.to_string()),
            EntryKind::Channel(channel) => segment.channels.push((channel, name.to_string())),
        }
    }

    for curve in curves.values_mut() {
        for segment in curve.segments.values_mut() {
            segment.channels.sort();
        }
    }

    curves
}
