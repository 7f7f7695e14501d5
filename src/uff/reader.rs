use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::config::ReaderConfig;
use crate::error::{AfmError, Result};
use crate::format::FileFormat;
use crate::model::{
    FileMetadata, ForceCurve, FormatDetail, Segment, SegmentType, HEIGHT_CHANNELS,
    VDEFLECTION,
};

use super::header::{keys, UffColumn, UffHeader, UffSegmentHeader};

const HEADER_PREFIX: &str = "HE ";

/// `HE` fields, consumed as they are converted
struct Fields {
    values: BTreeMap<String, String>,
}

impl Fields {
    fn scan(text: &str) -> Self {
        let values = text
            .lines()
            .filter_map(|line| line.strip_prefix(HEADER_PREFIX))
            .filter_map(|rest| rest.split_once(':'))
            .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
            .collect();
        Self { values }
    }

    fn text(&mut self, key: &str) -> Option<String> {
        self.values.remove(key).filter(|v| !v.is_empty())
    }

    fn required_text(&mut self, key: &str) -> String {
        self.text(key).unwrap_or_default()
    }

    fn float(&mut self, key: &str) -> f64 {
        match self.values.remove(key) {
            Some(raw) if !raw.is_empty() => raw.parse().unwrap_or_else(|_| {
                AfmError::malformed(key, raw).warn();
                0.0
            }),
            _ => 0.0,
        }
    }

    fn count(&mut self, key: &str) -> usize {
        match self.values.remove(key) {
            Some(raw) if !raw.is_empty() => raw.parse().unwrap_or_else(|_| {
                AfmError::malformed(key, raw).warn();
                0
            }),
            _ => 0,
        }
    }

    fn segment(&mut self, index: usize) -> Result<UffSegmentHeader> {
        let key = |name: &str| format!("{}{}_{}", keys::SEGMENT_PREFIX, index, name);

        let type_name = self.text(&key("type"));
        let code = self.text(&key("code"));
        let segment_type = type_name
            .as_deref()
            .and_then(SegmentType::from_name)
            .or_else(|| code.as_deref().and_then(segment_type_from_code))
            .ok_or_else(|| {
                AfmError::InvalidStructure(format!(
                    "segment block {} has no recognised type ({:?} / {:?})",
                    index, type_name, code
                ))
            })?;

        let segment_id = self.count(&key("nb")) as u32;
        let nb_point = self.count(&key("nb_point"));
        let nb_col = self.count(&key("nb_col"));

        let mut columns = Vec::new();
        for c in 0..nb_col {
            let title = self.text(&key(&format!("col_{}_title", c))).ok_or_else(|| {
                AfmError::InvalidStructure(format!("segment block {} lacks column {}", index, c))
            })?;
            let unit = self
                .text(&key(&format!("col_{}_unit", c)))
                .unwrap_or_else(|| title.clone());
            columns.push(UffColumn { title, unit });
        }

        Ok(UffSegmentHeader {
            segment_id,
            segment_type,
            description: self.text(&key("description")),
            force_setpoint_mode: self.text(&key("force_setpoint_mode")),
            nb_point,
            columns,
            sampling_rate: self.float(&key("sampling_rate(Hz)")),
            velocity: self.float(&key("velocity(m/s)")),
            force_setpoint: self.float(&key("force_setpoint(N)")),
            z_displacement: self.float(&key("z_displacement(m)")),
        })
    }
}

fn segment_type_from_code(code: &str) -> Option<SegmentType> {
    [
        SegmentType::Approach,
        SegmentType::Pause,
        SegmentType::Modulation,
        SegmentType::Retract,
    ]
    .into_iter()
    .find(|t| t.code() == code)
}

/// Parse the `HE` lines of a UFF file.
///
/// Fields this reader does not know are kept in [`UffHeader::extra`].
pub fn parse_header(text: &str) -> Result<UffHeader> {
    let mut fields = Fields::scan(text);

    let mut header = UffHeader {
        uff_code: fields.required_text(keys::UFF_CODE),
        uff_version: fields.required_text(keys::UFF_VERSION),
        entry_date: fields.text(keys::ENTRY_DATE),
        entry_filename: fields.required_text(keys::ENTRY_FILENAME),
        total_curves: fields.count(keys::TOTAL_CURVES),
        author_name: fields.text(keys::AUTHOR_NAME),
        author_doi: fields.text(keys::AUTHOR_DOI),
        sample_name: fields.text(keys::SAMPLE_NAME),
        sample_species: fields.text(keys::SAMPLE_SPECIES),
        software_version: fields.text(keys::SOFTWARE_VERSION),
        instrument: fields.text(keys::INSTRUMENT),
        instrument_model: fields.text(keys::INSTRUMENT_MODEL),
        instrument_scanner: fields.text(keys::INSTRUMENT_SCANNER),
        cantilever_model: fields.text(keys::CANTILEVER_MODEL),
        cantilever_shape: fields.text(keys::CANTILEVER_SHAPE),
        springk_calib_method: fields.text(keys::SPRINGK_CALIB_METHOD),
        springk_used: fields.float(keys::SPRINGK_USED),
        springk_read: fields.float(keys::SPRINGK_READ),
        springk_nominal: fields.float(keys::SPRINGK_NOMINAL),
        cantilever_length: fields.float(keys::CANTILEVER_LENGTH),
        cantilever_width: fields.float(keys::CANTILEVER_WIDTH),
        resonance_frequency: fields.float(keys::RESONANCE_FREQUENCY),
        q_factor: fields.float(keys::Q_FACTOR),
        a_coefficient_gci: fields.float(keys::A_COEFFICIENT_GCI),
        mount_angle: fields.float(keys::MOUNT_ANGLE),
        tip_geometry: fields.text(keys::TIP_GEOMETRY),
        tip_half_angle: fields.float(keys::TIP_HALF_ANGLE),
        tip_radius: fields.float(keys::TIP_RADIUS),
        tip_height: fields.float(keys::TIP_HEIGHT),
        curve_id: fields.count(keys::CURVE_ID),
        invols_calib_method: fields.text(keys::INVOLS_CALIB_METHOD),
        x_position: fields.float(keys::X_POSITION),
        y_position: fields.float(keys::Y_POSITION),
        zpiezo_sens: fields.float(keys::ZPIEZO_SENS),
        invols_read: fields.float(keys::INVOLS_READ),
        invols_used: fields.float(keys::INVOLS_USED),
        z_closed_loop: fields.text(keys::Z_CLOSED_LOOP),
        xy_closed_loop: fields.text(keys::XY_CLOSED_LOOP),
        segments: Vec::new(),
        extra: BTreeMap::new(),
    };

    let number_segment = fields.count(keys::NUMBER_SEGMENT);
    header.segments = (0..number_segment)
        .map(|k| fields.segment(k))
        .collect::<Result<_>>()?;

    header.extra = fields.values;
    if !header.extra.is_empty() {
        log::debug!("Keeping {} unrecognised header fields", header.extra.len());
    }

    Ok(header)
}

type Rows = HashMap<(String, u32), Vec<Vec<f64>>>;

fn collect_rows(text: &str) -> Result<Rows> {
    let mut rows: Rows = HashMap::new();
    for (number, line) in text.lines().enumerate() {
        if line.starts_with(HEADER_PREFIX) || line.trim().is_empty() {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let (Some(code), Some(id)) = (tokens.next(), tokens.next()) else {
            return Err(AfmError::InvalidStructure(format!(
                "data row {} has no segment code and id",
                number + 1
            )));
        };
        let id: u32 = id.parse().map_err(|_| {
            AfmError::InvalidStructure(format!("data row {}: bad segment id {:?}", number + 1, id))
        })?;
        let values = tokens
            .map(|t| {
                t.parse::<f64>().map_err(|_| {
                    AfmError::InvalidStructure(format!("data row {}: bad value {:?}", number + 1, t))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        rows.entry((code.to_string(), id)).or_default().push(values);
    }
    Ok(rows)
}

/// Rebuild the curve described by `header` from the data rows of `text`.
///
/// Rows are matched to segment blocks by code and segment id.
pub fn parse_curve(text: &str, header: &UffHeader) -> Result<ForceCurve> {
    let mut rows = collect_rows(text)?;
    let mut curve = ForceCurve::new(header.curve_id, header.entry_filename.clone());

    for block in &header.segments {
        let code = block.segment_type.code();
        let block_rows = rows
            .remove(&(code.to_string(), block.segment_id))
            .unwrap_or_default();

        let mut columns = vec![Vec::with_capacity(block_rows.len()); block.nb_col()];
        for row in &block_rows {
            if row.len() != block.nb_col() {
                return Err(AfmError::InvalidStructure(format!(
                    "{} segment {} row holds {} values, expected {}",
                    code,
                    block.segment_id,
                    row.len(),
                    block.nb_col()
                )));
            }
            for (column, value) in columns.iter_mut().zip(row) {
                column.push(*value);
            }
        }
        if block_rows.len() != block.nb_point {
            log::warn!(
                "{} segment {} declares {} points, found {} rows",
                code,
                block.segment_id,
                block.nb_point,
                block_rows.len()
            );
        }

        let mut segment = Segment::new(
            header.entry_filename.clone(),
            block.segment_id,
            block.segment_type,
        );
        segment.description = block.description.clone();
        segment.force_setpoint_mode = block.force_setpoint_mode.clone();
        segment.nb_point = block_rows.len();
        segment.nb_col = block.nb_col();
        segment.sampling_rate = block.sampling_rate;
        segment.velocity = block.velocity;
        segment.force_setpoint = block.force_setpoint;
        segment.z_displacement = block.z_displacement;
        for (column, values) in block.columns.iter().zip(columns) {
            segment.formatted_data.insert(column.title.clone(), values);
        }
        segment.height_channel_key = height_key(block);

        if curve.insert(segment).is_some() {
            log::warn!("Duplicate {} segment {} replaced", code, block.segment_id);
        }
    }

    if !rows.is_empty() {
        log::warn!("{} data row groups match no segment block", rows.len());
    }
    Ok(curve)
}

fn height_key(block: &UffSegmentHeader) -> Option<String> {
    HEIGHT_CHANNELS
        .iter()
        .find(|name| block.columns.iter().any(|c| c.title == **name))
        .map(|name| name.to_string())
}

/// An opened UFF file, holding a single curve
#[derive(Debug, Clone)]
pub struct UffFile {
    path: PathBuf,
    header: UffHeader,
}

impl UffFile {
    /// Parse the header and fill the common metadata fields
    pub fn open(path: &Path, config: &ReaderConfig) -> Result<(Self, FileMetadata)> {
        let text = read_text(path)?;
        let header = parse_header(&text)?;

        let mut metadata =
            FileMetadata::new(path, FileFormat::Uff, FormatDetail::Uff(header.clone()))?;
        if !header.entry_filename.is_empty() {
            metadata.file_id = header.entry_filename.clone();
        }
        metadata.instrument = header.instrument.clone();
        metadata.software_version = header.software_version.clone();
        metadata.file_date = header.entry_date.clone();
        metadata.scanner = header.instrument_scanner.clone();
        metadata.total_curves = 1;
        metadata.scan_angle = config.defaults.scan_angle;
        metadata.z_closed_loop = header.z_closed_loop.clone();
        metadata.xy_closed_loop = header.xy_closed_loop.clone();
        metadata.deflection_sensitivity =
            Some(header.invols_used * config.defaults.scaling_factor);
        metadata.spring_constant = Some(header.springk_used);
        metadata.height_channel_key = header.segments.iter().find_map(height_key);
        metadata.found_vdeflection = header
            .segments
            .iter()
            .any(|s| s.columns.iter().any(|c| c.title == VDEFLECTION));

        log::info!(
            "Opened {} with {} segments",
            metadata.file_name,
            header.number_segment()
        );

        Ok((
            Self {
                path: path.to_path_buf(),
                header,
            },
            metadata,
        ))
    }

    /// Parsed header
    pub fn header(&self) -> &UffHeader {
        &self.header
    }

    /// A UFF file stores exactly one curve
    pub fn curve_count(&self) -> usize {
        1
    }

    /// Decode the stored curve; only index 0 exists
    pub fn read_curve(&self, index: usize) -> Result<ForceCurve> {
        if index >= self.curve_count() {
            return Err(AfmError::CurveIndexOutOfRange {
                index,
                count: self.curve_count(),
            });
        }
        parse_curve(&read_text(&self.path)?, &self.header)
    }
}

fn read_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
