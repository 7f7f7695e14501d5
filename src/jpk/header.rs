//! `header.properties` and `shared-data/header.properties` parsing.

use serde::Serialize;

use crate::config::HeaderDefaults;
use crate::error::AfmError;
use crate::format::JpkKind;
use crate::model::{
    ChannelClass, ChannelConversion, FileMetadata, Scaling, SegmentMetadata, SubConversion,
    VDEFLECTION,
};
use crate::properties::Properties;

/// JPK-specific header values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JpkHeader {
    /// Archive sub-type
    pub kind: JpkKind,
    /// `file-format-version`
    pub file_format_version: Option<String>,
    /// `<prefix>.indexes.max`
    pub real_num_pixels: usize,
    /// Extended pause duration (s)
    pub extend_pause_duration: f64,
    /// Relative ramp start (scaled units); single curves and QI only
    pub relative_z_start: f64,
    /// Relative ramp end (scaled units); single curves and QI only
    pub relative_z_end: f64,
    /// `relative_z_end - relative_z_start`, may be zero
    pub relative_ramp_size: f64,
    /// Relative force setpoint
    pub force_setpoint: f64,
    /// Number of segments per curve
    pub num_segments: usize,
    /// Per-channel conversion tables, in channel order
    pub channels: Vec<ChannelConversion>,
}

impl JpkHeader {
    /// Empty header of a sub-type
    pub fn new(kind: JpkKind) -> Self {
        Self {
            kind,
            file_format_version: None,
            real_num_pixels: 0,
            extend_pause_duration: 0.0,
            relative_z_start: 0.0,
            relative_z_end: 0.0,
            relative_ramp_size: 0.0,
            force_setpoint: 0.0,
            num_segments: 0,
            channels: Vec::new(),
        }
    }

    /// Conversion table of a channel
    pub fn channel(&self, name: &str) -> Option<&ChannelConversion> {
        self.channels.iter().find(|c| c.name == name)
    }
}

/// Fill `metadata` from the two header blocks and return the JPK header
pub(crate) fn parse_header(
    kind: JpkKind,
    header: &Properties,
    shared: &Properties,
    defaults: &HeaderDefaults,
    metadata: &mut FileMetadata,
) -> JpkHeader {
    let prefix = kind.prefix();
    let key = |suffix: &str| format!("{}{}", prefix, suffix);

    metadata.instrument = header.string(&key(".description.instrument"));
    metadata.software_version = header.string(&key(".description.source-software"));
    metadata.file_date = header.string(&key(".start-time"));
    metadata.retracted_delay = header.parse_or(
        &key(".settings.force-settings.retracted-pause-time"),
        defaults.delay,
    );
    metadata.extended_delay = header.parse_or(
        &key(".settings.force-settings.extended-pause-time"),
        defaults.delay,
    );
    metadata.scan_angle = header.parse_or(&key(".position-pattern.grid.theta"), defaults.scan_angle);
    metadata.num_x_pixels = header.parse_or(
        &key(".position-pattern.grid.ilength"),
        defaults.multiplier as usize,
    );
    metadata.num_y_pixels = header.parse_or(
        &key(".position-pattern.grid.jlength"),
        defaults.multiplier as usize,
    );
    metadata.scan_size_x = header.parse_or(&key(".position-pattern.grid.ulength"), defaults.offset)
        * defaults.scaling_factor;
    metadata.scan_size_y = header.parse_or(&key(".position-pattern.grid.vlength"), defaults.offset)
        * defaults.scaling_factor;

    let closed_loop = header.flag_or(
        &key(".settings.force-settings.closed-loop"),
        defaults.boolean,
    );
    let closed_loop = if closed_loop { "On" } else { "Off" };
    metadata.z_closed_loop = Some(closed_loop.to_string());
    metadata.force_volume = kind.is_map();

    let (z_start_key, z_end_key) = match kind {
        JpkKind::ForceCurve => (Some("relative-z-start"), Some("relative-z-end")),
        JpkKind::QuantitativeImaging => (
            Some("settings.force-settings.extend.z-start"),
            Some("settings.force-settings.extend.z-end"),
        ),
        JpkKind::ForceMap => (None, None),
    };
    let scaled = |k: Option<&str>| {
        k.map(|k| header.parse_or(k, defaults.offset) * defaults.scaling_factor)
            .unwrap_or(0.0)
    };
    let relative_z_start = scaled(z_start_key);
    let relative_z_end = scaled(z_end_key);

    let num_segments = match kind {
        JpkKind::ForceCurve => {
            header.parse_or("force-scan-series.force-segments.count", defaults.num_segments)
        }
        _ => shared.parse_or("force-segment-header-infos.count", defaults.num_segments),
    };

    let channels = parse_channels(shared, defaults);

    if let Some(deflection) = channels.iter().find(|c| c.name == VDEFLECTION) {
        let distance = deflection.distance.filter(|d| d.defined);
        let force = deflection.force.filter(|f| f.defined);
        if distance.is_none() && force.is_none() {
            log::warn!(
                "No deflection sensitivity or spring constant in the header of {}",
                metadata.file_id
            );
        }
        metadata.deflection_sensitivity = distance.map(|d| d.scaling.multiplier);
        metadata.spring_constant = force.map(|f| f.scaling.multiplier);
    }

    JpkHeader {
        kind,
        file_format_version: header.string("file-format-version"),
        real_num_pixels: header.parse_or(&key(".indexes.max"), 0),
        extend_pause_duration: metadata.extended_delay,
        relative_z_start,
        relative_z_end,
        relative_ramp_size: relative_z_end - relative_z_start,
        force_setpoint: header.parse_or(
            &format!(
                "{}{}.force-settings.relative-setpoint",
                prefix,
                kind.settings_section()
            ),
            defaults.offset,
        ),
        num_segments,
        channels,
    }
}

fn parse_channels(shared: &Properties, defaults: &HeaderDefaults) -> Vec<ChannelConversion> {
    let count: usize = shared.parse_or("lcd-infos.count", 0);
    if count == 0 {
        log::warn!("Shared header declares no channels");
    }

    (0..count)
        .filter_map(|id| {
            let name = shared.get(&format!("lcd-info.{}.channel.name", id))?;
            Some(parse_channel(shared, id, name, defaults))
        })
        .collect()
}

fn parse_channel(
    shared: &Properties,
    id: usize,
    name: &str,
    defaults: &HeaderDefaults,
) -> ChannelConversion {
    let pre = format!("lcd-info.{}", id);
    let conv = format!("{}.conversion-set", pre);

    let mut channel = ChannelConversion::identity(id, name);
    channel.identity_fallback = false;
    channel.encoder_type = shared.string(&format!("{}.encoder.type", pre));

    let encoder = scaling(shared, &format!("{}.encoder", pre));
    channel.encoder = match encoder {
        Some(s) => s,
        None => {
            if channel.class != ChannelClass::Other {
                AfmError::MissingConversionFactors {
                    channel: name.to_string(),
                    stage: "encoder".to_string(),
                }
                .warn();
                channel.identity_fallback = true;
            }
            Scaling::IDENTITY
        }
    };

    if channel.class == ChannelClass::Other {
        return channel;
    }

    channel.base = shared.string(&format!("{}.conversions.base", conv));
    if let Some(base) = &channel.base {
        channel.base_defined =
            shared.flag_or(&format!("{}.conversion.{}.defined", conv, base), defaults.boolean);
        if channel.base_defined {
            log::warn!(
                "Conversion base {} of channel {} is already defined",
                base,
                name
            );
        }
    }

    let mut fallback = false;
    let mut stage = |stage: &str, factor: f64| {
        sub_conversion(shared, &conv, name, stage, factor, defaults, &mut fallback)
    };

    match channel.class {
        ChannelClass::Deflection => {
            // distance factors are stored in m/V; keep them in nm/V
            channel.distance = Some(stage("distance", defaults.scaling_factor));
            channel.force = Some(stage("force", 1.0));
        }
        ChannelClass::Height => {
            channel.absolute = Some(stage("absolute", 1.0));
            channel.nominal = Some(stage("nominal", 1.0));
        }
        ChannelClass::Other => {}
    }

    channel.identity_fallback |= fallback;
    channel
}

fn scaling(props: &Properties, prefix: &str) -> Option<Scaling> {
    let multiplier = props.parse_opt::<f64>(&format!("{}.scaling.multiplier", prefix));
    let offset = props.parse_opt::<f64>(&format!("{}.scaling.offset", prefix));
    match (multiplier, offset) {
        (None, None) => None,
        (m, o) => Some(Scaling::new(m.unwrap_or(1.0), o.unwrap_or(0.0))),
    }
}

fn sub_conversion(
    shared: &Properties,
    conv: &str,
    channel: &str,
    stage: &str,
    factor: f64,
    defaults: &HeaderDefaults,
    fallback: &mut bool,
) -> SubConversion {
    let prefix = format!("{}.conversion.{}", conv, stage);
    let defined = shared.flag_or(&format!("{}.defined", prefix), defaults.boolean);

    match scaling(shared, &prefix) {
        Some(s) => SubConversion::new(
            Scaling::new(s.multiplier * factor, s.offset * factor),
            defined,
        ),
        None => {
            if defined {
                AfmError::MissingConversionFactors {
                    channel: channel.to_string(),
                    stage: stage.to_string(),
                }
                .warn();
                *fallback = true;
            }
            SubConversion::new(Scaling::IDENTITY, defined)
        }
    }
}

/// Parse one `segment-header.properties` block.
///
/// Single curves keep the segment settings in the segment header itself;
/// maps keep them in the shared header under `force-segment-header-info.<id>`.
pub(crate) fn parse_segment_header(
    kind: JpkKind,
    segment: &Properties,
    shared: &Properties,
    segment_id: u32,
    defaults: &HeaderDefaults,
) -> SegmentMetadata {
    let channels = segment
        .get("channels.list")
        .map(|list| list.split(' ').filter(|c| !c.is_empty()).map(str::to_string).collect())
        .unwrap_or_default();

    let mut meta = SegmentMetadata {
        time_stamp: segment.string("force-segment-header.time-stamp"),
        num_points: segment.parse_or("force-segment-header.num-points", 0),
        duration: segment.parse_or("force-segment-header.duration", 0.0),
        channels,
        baseline_measured: segment
            .flag_or("force-segment-header.baseline.measured", defaults.boolean),
        baseline: segment.parse_or("force-segment-header.baseline.baseline", defaults.offset),
        ..Default::default()
    };

    let (settings, prefix) = if kind.is_map() {
        (shared, format!("force-segment-header-info.{}", segment_id))
    } else {
        (segment, "force-segment-header".to_string())
    };
    let key = |suffix: &str| format!("{}.{}", prefix, suffix);

    meta.approach_id = settings.string(&key("approach-id"));
    meta.style = settings.string(&key("settings.style"));

    match meta.style.as_deref() {
        Some("extend") => {
            meta.setpoint = Some(settings.parse_or(
                &key("settings.segment-settings.setpoint"),
                defaults.multiplier,
            ));
        }
        Some("modulation") => {
            meta.amplitude = Some(settings.parse_or(
                &key("settings.segment-settings.amplitude"),
                defaults.offset,
            ));
            meta.frequency = Some(settings.parse_or(
                &key("settings.segment-settings.frequency"),
                defaults.offset,
            ));
            meta.start_phase = Some(settings.parse_or(
                &key("settings.segment-settings.start-phase"),
                defaults.offset,
            ));
        }
        _ => {}
    }

    meta.z_start = settings.parse_or(&key("settings.segment-settings.z-start"), defaults.offset)
        * defaults.scaling_factor;
    meta.z_end = settings.parse_or(&key("settings.segment-settings.z-end"), defaults.offset)
        * defaults.scaling_factor;
    meta.ramp_size = meta.z_end - meta.z_start;
    meta.ramp_speed = if meta.duration > 0.0 {
        meta.ramp_size / meta.duration
    } else {
        0.0
    };

    meta
}
