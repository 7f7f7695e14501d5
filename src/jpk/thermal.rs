//! JPK thermal-noise tables (`.tnd`).

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::error::{AfmError, Result};
use crate::model::HeaderValue;

/// Number of header rows in a thermal-noise file
const HEADER_ROWS: usize = 23;

/// Thermal-noise spectrum with its acquisition parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThermalNoise {
    /// Header parameters, numbers scaled by their unit prefix
    pub parameters: BTreeMap<String, HeaderValue>,
    /// Frequency axis (Hz)
    pub frequency: Vec<f64>,
    /// Averaged spectrum as stored (V²/Hz)
    pub amplitude_raw: Vec<f64>,
    /// Averaged spectrum scaled by sensitivity² (m²/Hz)
    pub amplitude: Vec<f64>,
    /// Fitted spectrum scaled by sensitivity², if the file holds one
    pub fit: Option<Vec<f64>>,
}

fn unit_multiplier(unit: &str) -> f64 {
    // a bare unit ("m", "N/m") has no prefix
    if unit.chars().count() < 2 {
        return 1.0;
    }
    match unit.chars().next() {
        Some('k') => 1e3,
        Some('m') => 1e-3,
        Some('µ') | Some('u') => 1e-6,
        Some('n') => 1e-9,
        _ => 1.0,
    }
}

fn parse_parameter(line: &str) -> Option<(String, HeaderValue)> {
    let body = line.trim_start_matches('#').trim();
    let (key, value) = body.split_once(": ")?;

    let parsed = match value.split(' ').collect::<Vec<_>>().as_slice() {
        [number, unit] => number
            .parse::<f64>()
            .map(|n| HeaderValue::Number(n * unit_multiplier(unit)))
            .unwrap_or_else(|_| HeaderValue::Text(value.to_string())),
        _ => HeaderValue::Text(value.to_string()),
    };
    Some((key.trim().to_string(), parsed))
}

impl ThermalNoise {
    /// Read a `.tnd` file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read(path.as_ref())?;
        Self::parse(&String::from_utf8_lossy(&text))
    }

    /// Parse the contents of a `.tnd` file
    pub fn parse(text: &str) -> Result<Self> {
        let parameters: BTreeMap<String, HeaderValue> = text
            .lines()
            .take(HEADER_ROWS)
            .filter(|line| line.starts_with('#'))
            .filter_map(parse_parameter)
            .collect();

        let sensitivity = match parameters.get("sensitivity") {
            Some(HeaderValue::Number(s)) => *s,
            Some(HeaderValue::Text(raw)) => {
                return Err(AfmError::malformed("sensitivity", raw.clone()));
            }
            None => return Err(AfmError::MissingEntry("sensitivity".to_string())),
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b' ')
            .comment(Some(b'#'))
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut frequency = Vec::new();
        let mut amplitude_raw = Vec::new();
        let mut fit = Vec::new();
        let mut has_fit = true;

        for record in reader.records() {
            let record = record?;
            let fields: Vec<&str> = record.iter().filter(|f| !f.is_empty()).collect();
            if fields.is_empty() {
                continue;
            }
            let number = |i: usize| -> Result<f64> {
                let raw = fields.get(i).copied().unwrap_or("");
                raw.parse::<f64>()
                    .map_err(|_| AfmError::malformed(format!("thermal column {}", i), raw))
            };
            frequency.push(number(0)?);
            amplitude_raw.push(number(2)?);
            match fields.get(3).map(|f| f.parse::<f64>()) {
                Some(Ok(v)) => fit.push(v),
                _ => has_fit = false,
            }
        }

        let scale = sensitivity * sensitivity;
        let amplitude = amplitude_raw.iter().map(|a| a * scale).collect();
        let fit = (has_fit && !fit.is_empty()).then(|| fit.iter().map(|f| f * scale).collect());

        log::info!("Read thermal-noise spectrum with {} points", frequency.len());

        Ok(Self {
            parameters,
            frequency,
            amplitude_raw,
            amplitude,
            fit,
        })
    }

    /// Numeric parameter
    pub fn parameter(&self, key: &str) -> Option<f64> {
        match self.parameters.get(key) {
            Some(HeaderValue::Number(v)) => Some(*v),
            _ => None,
        }
    }
}
