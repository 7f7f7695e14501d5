use serde::Serialize;

/// Name of the vertical deflection channel in every format
pub const VDEFLECTION: &str = "vDeflection";

/// Height channels in order of preference (sensor data first)
pub const HEIGHT_CHANNELS: [&str; 4] = [
    "measuredHeight",
    "capacitiveSensorHeight",
    "height",
    "cellhesion-height",
];

/// One affine stage: `value * multiplier + offset`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Scaling {
    /// Multiplier
    pub multiplier: f64,
    /// Offset
    pub offset: f64,
}

impl Scaling {
    /// `multiplier = 1, offset = 0`
    pub const IDENTITY: Scaling = Scaling {
        multiplier: 1.0,
        offset: 0.0,
    };

    /// Create a scaling stage
    pub fn new(multiplier: f64, offset: f64) -> Self {
        Self { multiplier, offset }
    }

    /// Apply the stage to a value
    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        value * self.multiplier + self.offset
    }
}

impl Default for Scaling {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A named sub-conversion (distance, force, absolute, nominal)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubConversion {
    /// Factors of the stage
    pub scaling: Scaling,
    /// Whether the header marks the stage as defined
    pub defined: bool,
}

impl SubConversion {
    /// Create a sub-conversion
    pub fn new(scaling: Scaling, defined: bool) -> Self {
        Self { scaling, defined }
    }

    /// Identity stage that is not defined
    pub fn undefined() -> Self {
        Self {
            scaling: Scaling::IDENTITY,
            defined: false,
        }
    }
}

/// Physical class of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChannelClass {
    /// `vDeflection` / `hDeflection`
    Deflection,
    /// Piezo height channels
    Height,
    /// Anything else (error signal, time, ...)
    Other,
}

impl ChannelClass {
    /// Classify a channel by name
    pub fn of(name: &str) -> Self {
        match name {
            "vDeflection" | "hDeflection" => ChannelClass::Deflection,
            "capacitiveSensorHeight" | "measuredHeight" | "height" | "cellhesion-height" => {
                ChannelClass::Height
            }
            _ => ChannelClass::Other,
        }
    }
}

/// Conversion table of one channel, built once from header text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelConversion {
    /// Channel index in the shared header
    pub channel_id: usize,
    /// Channel name
    pub name: String,
    /// Channel class
    pub class: ChannelClass,
    /// Encoder type label (`signedinteger`, `signedshort`, ...)
    pub encoder_type: Option<String>,
    /// Encoder counts to volts (or base unit)
    pub encoder: Scaling,
    /// Conversion base name
    pub base: Option<String>,
    /// Whether the base conversion is itself marked as defined
    pub base_defined: bool,
    /// Deflection: volts to metres
    pub distance: Option<SubConversion>,
    /// Deflection: metres to newtons
    pub force: Option<SubConversion>,
    /// Height: calibrated height stage
    pub absolute: Option<SubConversion>,
    /// Height: nominal height stage
    pub nominal: Option<SubConversion>,
    /// Set when required factors were missing and identity stages were substituted
    pub identity_fallback: bool,
}

impl ChannelConversion {
    /// Identity table for a channel without any factors
    pub fn identity(channel_id: usize, name: &str) -> Self {
        Self {
            channel_id,
            name: name.to_string(),
            class: ChannelClass::of(name),
            encoder_type: None,
            encoder: Scaling::IDENTITY,
            base: None,
            base_defined: false,
            distance: None,
            force: None,
            absolute: None,
            nominal: None,
            identity_fallback: true,
        }
    }

    /// Width in bytes of one stored sample
    pub fn sample_width(&self) -> usize {
        match &self.encoder_type {
            Some(kind) if kind.contains("short") => 2,
            _ => 4,
        }
    }

    /// Encoder stage, then the absolute and nominal stages when defined.
    ///
    /// The two optional stages are not exclusive; both apply in sequence.
    pub fn convert_height(&self, raw: f64) -> f64 {
        let mut value = self.encoder.apply(raw);
        if let Some(absolute) = self.absolute.filter(|s| s.defined) {
            value = absolute.scaling.apply(value);
        }
        if let Some(nominal) = self.nominal.filter(|s| s.defined) {
            value = nominal.scaling.apply(value);
        }
        value
    }

    /// Encoder stage plus the distance offset.
    ///
    /// The distance multiplier is deliberately not applied here.
    pub fn convert_deflection(&self, raw: f64) -> f64 {
        let distance_offset = self.distance.map(|d| d.scaling.offset).unwrap_or(0.0);
        self.encoder.apply(raw) + distance_offset
    }

    /// Convert a whole raw array according to the channel class
    pub fn convert_all(&self, raw: &[i32]) -> Vec<f64> {
        match self.class {
            ChannelClass::Height => raw.iter().map(|&v| self.convert_height(v as f64)).collect(),
            ChannelClass::Deflection => raw
                .iter()
                .map(|&v| self.convert_deflection(v as f64))
                .collect(),
            ChannelClass::Other => raw.iter().map(|&v| self.encoder.apply(v as f64)).collect(),
        }
    }
}
