//! Typed UFF header records.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::ReaderConfig;
use crate::model::{FileMetadata, ForceCurve, FormatDetail, HeaderValue, Segment, SegmentType};

pub(crate) mod keys {
    pub const UFF_CODE: &str = "UFF_code";
    pub const UFF_VERSION: &str = "Entry_UFF_version";
    pub const ENTRY_DATE: &str = "Entry_date";
    pub const ENTRY_FILENAME: &str = "Entry_filename";
    pub const TOTAL_CURVES: &str = "Entry_tot_nb_curve";
    pub const AUTHOR_NAME: &str = "Author_name";
    pub const AUTHOR_DOI: &str = "Author_doi";
    pub const SAMPLE_NAME: &str = "Entity_sample_name";
    pub const SAMPLE_SPECIES: &str = "Entity_sample_species";
    pub const SOFTWARE_VERSION: &str = "Experimental_software_version";
    pub const INSTRUMENT: &str = "Experimental_instrument";
    pub const INSTRUMENT_MODEL: &str = "Experimental_instrument_model";
    pub const INSTRUMENT_SCANNER: &str = "Experimental_instrument_scanner";
    pub const CANTILEVER_MODEL: &str = "Cantilever_model";
    pub const CANTILEVER_SHAPE: &str = "Cantilever_shape";
    pub const SPRINGK_CALIB_METHOD: &str = "Cantilever_springK_calib_meth";
    pub const SPRINGK_USED: &str = "Cantilever_springK_used(N/m)";
    pub const SPRINGK_READ: &str = "Cantilever_springK_read(N/m)";
    pub const SPRINGK_NOMINAL: &str = "Cantilever_springK_nominal(N/m)";
    pub const CANTILEVER_LENGTH: &str = "Cantilever_length(m)";
    pub const CANTILEVER_WIDTH: &str = "Cantilever_width(m)";
    pub const RESONANCE_FREQUENCY: &str = "Cantilever_resonFq(Hz)";
    pub const Q_FACTOR: &str = "Cantilever_Qfactor";
    pub const A_COEFFICIENT_GCI: &str = "Cantilever_Acoefficient_GCI(nN.s^1.3/m)";
    pub const MOUNT_ANGLE: &str = "Cantilever_mount_angle(deg)";
    pub const TIP_GEOMETRY: &str = "Tip_geometry";
    pub const TIP_HALF_ANGLE: &str = "Tip_half_angle(deg)";
    pub const TIP_RADIUS: &str = "Tip_radius(m)";
    pub const TIP_HEIGHT: &str = "Tip_height(m)";
    pub const CURVE_ID: &str = "Recording_curve_id";
    pub const INVOLS_CALIB_METHOD: &str = "Recording_invols_calib_method";
    pub const X_POSITION: &str = "Recording_xposition(m)";
    pub const Y_POSITION: &str = "Recording_yposition(m)";
    pub const ZPIEZO_SENS: &str = "Recording_zpiezo_sens(m/V)";
    pub const INVOLS_READ: &str = "Recording_inv_optical_lever_sens_read(m/V)";
    pub const INVOLS_USED: &str = "Recording_inv_optical_lever_sens_used(m/V)";
    pub const NUMBER_SEGMENT: &str = "Recording_number_segment";
    pub const Z_CLOSED_LOOP: &str = "Recording_Z_close_loop_on";
    pub const XY_CLOSED_LOOP: &str = "Recording_XY_close_loop_on";

    pub const SEGMENT_PREFIX: &str = "Recording_segment_";
}

/// A header value as written to disk
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Field<'a> {
    Text(Option<&'a str>),
    Float(f64),
    Count(usize),
}

/// One column of a UFF segment
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UffColumn {
    /// Channel name
    pub title: String,
    /// Unit label
    pub unit: String,
}

/// Per-segment UFF header block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UffSegmentHeader {
    /// Segment id (`_nb`)
    pub segment_id: u32,
    /// Phase
    pub segment_type: SegmentType,
    /// Free-text description
    pub description: Option<String>,
    /// Setpoint mode
    pub force_setpoint_mode: Option<String>,
    /// Samples per column
    pub nb_point: usize,
    /// Columns in channel order
    pub columns: Vec<UffColumn>,
    /// Sampling rate (Hz)
    pub sampling_rate: f64,
    /// Ramp velocity
    pub velocity: f64,
    /// Force setpoint
    pub force_setpoint: f64,
    /// Z displacement
    pub z_displacement: f64,
}

impl UffSegmentHeader {
    /// Describe a decoded segment.
    ///
    /// Units are not tracked by the decoders, so each unit label repeats
    /// the channel name.
    pub fn from_segment(segment: &Segment) -> Self {
        Self {
            segment_id: segment.segment_id,
            segment_type: segment.segment_type,
            description: segment.description.clone(),
            force_setpoint_mode: segment.force_setpoint_mode.clone(),
            nb_point: segment.nb_point,
            columns: segment
                .formatted_data
                .names()
                .map(|name| UffColumn {
                    title: name.to_string(),
                    unit: name.to_string(),
                })
                .collect(),
            sampling_rate: segment.sampling_rate,
            velocity: segment.velocity,
            force_setpoint: segment.force_setpoint,
            z_displacement: segment.z_displacement,
        }
    }

    /// Number of data columns
    pub fn nb_col(&self) -> usize {
        self.columns.len()
    }

    pub(crate) fn fields(&self, index: usize) -> Vec<(String, Field<'_>)> {
        let key = |name: &str| format!("{}{}_{}", keys::SEGMENT_PREFIX, index, name);
        let mut fields = vec![
            (key("type"), Field::Text(Some(self.segment_type.name()))),
            (key("code"), Field::Text(Some(self.segment_type.code()))),
            (key("description"), Field::Text(self.description.as_deref())),
            (
                key("force_setpoint_mode"),
                Field::Text(self.force_setpoint_mode.as_deref()),
            ),
            (key("nb"), Field::Count(self.segment_id as usize)),
            (key("nb_point"), Field::Count(self.nb_point)),
            (key("nb_col"), Field::Count(self.nb_col())),
        ];
        for (c, column) in self.columns.iter().enumerate() {
            fields.push((key(&format!("col_{}_title", c)), Field::Text(Some(&column.title))));
            fields.push((key(&format!("col_{}_unit", c)), Field::Text(Some(&column.unit))));
        }
        fields.extend([
            (key("sampling_rate(Hz)"), Field::Float(self.sampling_rate)),
            (key("velocity(m/s)"), Field::Float(self.velocity)),
            (key("force_setpoint(N)"), Field::Float(self.force_setpoint)),
            (key("z_displacement(m)"), Field::Float(self.z_displacement)),
        ]);
        fields
    }
}

/// File-level UFF header.
///
/// Text fields that are absent are written empty and read back as `None`;
/// numeric fields default to 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UffHeader {
    /// `UFF_code`
    pub uff_code: String,
    /// `Entry_UFF_version`
    pub uff_version: String,
    /// Acquisition date
    pub entry_date: Option<String>,
    /// Identifier of the source file
    pub entry_filename: String,
    /// Curves in the source file
    pub total_curves: usize,
    /// Author
    pub author_name: Option<String>,
    /// Author DOI
    pub author_doi: Option<String>,
    /// Sample name
    pub sample_name: Option<String>,
    /// Sample species
    pub sample_species: Option<String>,
    /// Acquisition software version
    pub software_version: Option<String>,
    /// Instrument
    pub instrument: Option<String>,
    /// Instrument model
    pub instrument_model: Option<String>,
    /// Scanner
    pub instrument_scanner: Option<String>,
    /// Cantilever model
    pub cantilever_model: Option<String>,
    /// Cantilever shape
    pub cantilever_shape: Option<String>,
    /// Spring constant calibration method
    pub springk_calib_method: Option<String>,
    /// Spring constant used for processing (N/m)
    pub springk_used: f64,
    /// Spring constant found in the source file (N/m)
    pub springk_read: f64,
    /// Nominal spring constant (N/m)
    pub springk_nominal: f64,
    /// Cantilever length (m)
    pub cantilever_length: f64,
    /// Cantilever width (m)
    pub cantilever_width: f64,
    /// Resonance frequency (Hz)
    pub resonance_frequency: f64,
    /// Quality factor
    pub q_factor: f64,
    /// GCI A coefficient (nN.s^1.3/m)
    pub a_coefficient_gci: f64,
    /// Mount angle (deg)
    pub mount_angle: f64,
    /// Tip geometry
    pub tip_geometry: Option<String>,
    /// Tip half angle (deg)
    pub tip_half_angle: f64,
    /// Tip radius (m)
    pub tip_radius: f64,
    /// Tip height (m)
    pub tip_height: f64,
    /// Index of the curve in the source file
    pub curve_id: usize,
    /// InvOLS calibration method
    pub invols_calib_method: Option<String>,
    /// X position (m)
    pub x_position: f64,
    /// Y position (m)
    pub y_position: f64,
    /// Z piezo sensitivity (m/V)
    pub zpiezo_sens: f64,
    /// Inverse optical lever sensitivity found in the source file (m/V)
    pub invols_read: f64,
    /// Inverse optical lever sensitivity used for processing (m/V)
    pub invols_used: f64,
    /// Z closed-loop state
    pub z_closed_loop: Option<String>,
    /// XY closed-loop state
    pub xy_closed_loop: Option<String>,
    /// Segment blocks, in file order
    pub segments: Vec<UffSegmentHeader>,
    /// `HE` fields this reader does not know, kept verbatim
    pub extra: BTreeMap<String, String>,
}

impl UffHeader {
    /// Header describing one curve of a loaded file
    pub fn from_metadata(metadata: &FileMetadata, config: &ReaderConfig, curve: &ForceCurve) -> Self {
        // lengths in the source metadata are scaled to nm
        let to_metres = 1.0 / config.defaults.scaling_factor;
        let invols = metadata
            .deflection_sensitivity
            .map(|s| s * to_metres)
            .unwrap_or_default();
        let spring_constant = metadata.spring_constant.unwrap_or_default();

        let mut header = Self {
            uff_code: config.uff_code.clone(),
            uff_version: config.uff_version.clone(),
            entry_date: metadata.file_date.clone(),
            entry_filename: metadata.file_id.clone(),
            total_curves: metadata.total_curves,
            software_version: metadata.software_version.clone(),
            instrument: metadata.instrument.clone(),
            instrument_scanner: metadata.scanner.clone(),
            springk_used: spring_constant,
            springk_read: spring_constant,
            curve_id: curve.curve_index,
            invols_read: invols,
            invols_used: invols,
            z_closed_loop: metadata.z_closed_loop.clone(),
            xy_closed_loop: metadata.xy_closed_loop.clone(),
            ..Default::default()
        };

        match &metadata.detail {
            FormatDetail::Nanoscope(nanoscope) => {
                header.zpiezo_sens = nanoscope.zscan_sensitivity * to_metres;
                header.x_position = nanoscope.x_offset * to_metres;
                header.y_position = nanoscope.y_offset * to_metres;
            }
            FormatDetail::Uff(source) => {
                // re-exporting a UFF file keeps its descriptive fields
                header = Self {
                    curve_id: curve.curve_index,
                    ..source.clone()
                };
            }
            FormatDetail::Jpk(_) => {}
        }

        header.segments = curve
            .ordered_segments()
            .into_iter()
            .map(UffSegmentHeader::from_segment)
            .collect();
        header
    }

    /// An unrecognised field, as a number when it parses as one
    pub fn extra_value(&self, key: &str) -> Option<HeaderValue> {
        self.extra.get(key).map(|raw| HeaderValue::parse(raw))
    }

    /// Number of segment blocks
    pub fn number_segment(&self) -> usize {
        self.segments.len()
    }

    pub(crate) fn file_fields(&self) -> Vec<(&'static str, Field<'_>)> {
        use keys::*;
        fn text(v: &Option<String>) -> Field<'_> {
            Field::Text(v.as_deref())
        }
        vec![
            (UFF_CODE, Field::Text(Some(&self.uff_code))),
            (UFF_VERSION, Field::Text(Some(&self.uff_version))),
            (ENTRY_DATE, text(&self.entry_date)),
            (ENTRY_FILENAME, Field::Text(Some(&self.entry_filename))),
            (TOTAL_CURVES, Field::Count(self.total_curves)),
            (AUTHOR_NAME, text(&self.author_name)),
            (AUTHOR_DOI, text(&self.author_doi)),
            (SAMPLE_NAME, text(&self.sample_name)),
            (SAMPLE_SPECIES, text(&self.sample_species)),
            (SOFTWARE_VERSION, text(&self.software_version)),
            (INSTRUMENT, text(&self.instrument)),
            (INSTRUMENT_MODEL, text(&self.instrument_model)),
            (INSTRUMENT_SCANNER, text(&self.instrument_scanner)),
            (CANTILEVER_MODEL, text(&self.cantilever_model)),
            (CANTILEVER_SHAPE, text(&self.cantilever_shape)),
            (SPRINGK_CALIB_METHOD, text(&self.springk_calib_method)),
            (SPRINGK_USED, Field::Float(self.springk_used)),
            (SPRINGK_READ, Field::Float(self.springk_read)),
            (SPRINGK_NOMINAL, Field::Float(self.springk_nominal)),
            (CANTILEVER_LENGTH, Field::Float(self.cantilever_length)),
            (CANTILEVER_WIDTH, Field::Float(self.cantilever_width)),
            (RESONANCE_FREQUENCY, Field::Float(self.resonance_frequency)),
            (Q_FACTOR, Field::Float(self.q_factor)),
            (A_COEFFICIENT_GCI, Field::Float(self.a_coefficient_gci)),
            (MOUNT_ANGLE, Field::Float(self.mount_angle)),
            (TIP_GEOMETRY, text(&self.tip_geometry)),
            (TIP_HALF_ANGLE, Field::Float(self.tip_half_angle)),
            (TIP_RADIUS, Field::Float(self.tip_radius)),
            (TIP_HEIGHT, Field::Float(self.tip_height)),
            (CURVE_ID, Field::Count(self.curve_id)),
            (INVOLS_CALIB_METHOD, text(&self.invols_calib_method)),
            (X_POSITION, Field::Float(self.x_position)),
            (Y_POSITION, Field::Float(self.y_position)),
            (ZPIEZO_SENS, Field::Float(self.zpiezo_sens)),
            (INVOLS_READ, Field::Float(self.invols_read)),
            (INVOLS_USED, Field::Float(self.invols_used)),
            (NUMBER_SEGMENT, Field::Count(self.number_segment())),
            (Z_CLOSED_LOOP, text(&self.z_closed_loop)),
            (XY_CLOSED_LOOP, text(&self.xy_closed_loop)),
        ]
    }
}
