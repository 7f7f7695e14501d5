//! Section-scoped scanner over the Nanoscope text header.

use std::io::BufRead;

use serde::Serialize;

use crate::error::{AfmError, Result};

use super::scan::{first_number, length_unit, numbers, raw_value, string_value};

const END_OF_HEADER: &str = "\\*File list end";

/// Header section currently being scanned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    ScanList,
    ForceList,
    ForceImageList,
    ImageList,
}

impl Section {
    fn from_marker(line: &str) -> Option<Self> {
        if line.contains("*Ciao scan list") {
            Some(Section::ScanList)
        } else if line.contains("*Ciao force list") {
            Some(Section::ForceList)
        } else if line.contains("*Ciao force image list") {
            Some(Section::ForceImageList)
        } else if line.contains("*Ciao image list") {
            Some(Section::ImageList)
        } else {
            None
        }
    }
}

/// Nanoscope header values.
///
/// Lengths are in nm and voltages in V unless the field name says otherwise.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NanoscopeHeader {
    /// `\Version`
    pub version: Option<String>,
    /// `\Microscope`
    pub microscope: Option<String>,
    /// `\Scanner file`
    pub scanner: Option<String>,
    /// Global Z piezo sensitivity (nm/V)
    pub zscan_sensitivity: f64,

    /// Operating mode is force volume (or image)
    pub force_volume: bool,
    /// PeakForce capture allowed
    pub peakforce: bool,
    /// X offset (nm)
    pub x_offset: f64,
    /// Y offset (nm)
    pub y_offset: f64,
    /// Deflection sensitivity (nm/V)
    pub deflection_sensitivity: Option<f64>,
    /// XY closed-loop label
    pub xy_closed_loop: Option<String>,
    /// Z closed-loop label
    pub z_closed_loop: Option<String>,
    /// PeakForce amplitude (nm)
    pub pfc_amplitude: f64,
    /// PeakForce frequency (kHz)
    pub pfc_frequency: f64,
    /// PeakForce samples per period
    pub pfc_sample_points: usize,
    /// `\Sync Distance New`
    pub sync_distance_new: f64,
    /// `\Sync Distance QNM`
    pub sync_distance_qnm: f64,
    /// Scan-list samples per line
    pub piezo_samps_per_line: usize,
    /// Z sensor sensitivity
    pub z_sensor_sensitivity: f64,

    /// `\Trigger mode`
    pub trigger_mode: Option<String>,
    /// Force curves per line
    pub curves_per_line: usize,
    /// Scan rate (Hz)
    pub scan_rate: f64,
    /// Forward ramp velocity (V/s)
    pub forward_velocity: f64,
    /// Reverse ramp velocity (V/s)
    pub reverse_velocity: f64,
    /// Deflection per LSB (V)
    pub deflection_v_per_lsb: f64,
    /// `\Deflection Sensitivity Correction`
    pub deflection_correction: Option<f64>,
    /// Approach points per curve
    pub approach_points: usize,
    /// Retract points per curve
    pub retract_points: usize,

    /// Spring constant (N/m)
    pub spring_constant: Option<f64>,
    /// Curve data length (bytes)
    pub curve_data_length: usize,
    /// Curve data offset (bytes)
    pub data_offset: usize,
    /// `\Bytes/pixel` of the force image list
    pub bytes_per_pixel: usize,
    /// Z scale (V/LSB)
    pub z_scale: f64,
    /// Ramp size (V)
    pub ramp_size_volts: f64,

    /// Image data length (bytes)
    pub image_data_length: usize,
    /// Image samples per line
    pub image_samps_per_line: usize,
    /// Image lines
    pub image_lines: usize,
    /// Image data offset (bytes), 0 when the file has no image
    pub image_offset: usize,
    /// Image scan size along x (m)
    pub image_scan_x: f64,
    /// Image scan size along y (m)
    pub image_scan_y: f64,
    /// Image Z scale (V)
    pub image_z_sensitivity: f64,
    /// `\Bytes/pixel` of the image list
    pub image_bytes_per_pixel: usize,

    /// Number of curves in the file
    pub total_curves: usize,
    /// Ramp size (nm)
    pub ramp_size: f64,
    /// Forward speed (nm/s)
    pub speed_forward: f64,
    /// Reverse speed (nm/s)
    pub speed_reverse: f64,
    /// Height step between approach points (nm)
    pub zstep_approach: f64,
    /// Height step between retract points (nm)
    pub zstep_retract: f64,
}

fn number(line: &str, key: &str) -> Option<f64> {
    let value = raw_value(line)?;
    let parsed = first_number(value);
    if parsed.is_none() {
        AfmError::malformed(key, value).warn();
    }
    parsed
}

fn count(line: &str, key: &str) -> Option<usize> {
    number(line, key).map(|v| v.max(0.0) as usize)
}

fn text(line: &str) -> Option<String> {
    string_value(line).map(str::to_string)
}

impl NanoscopeHeader {
    /// Scan header lines until the end-of-header marker and derive the
    /// computed fields.
    ///
    /// Lines are decoded as Latin-1. Missing fields keep their zero default.
    pub fn parse<R: BufRead>(mut reader: R) -> Result<Self> {
        let mut header = Self::default();
        let mut section = Section::None;
        let mut data_offset_found = false;
        let mut end_found = false;
        let mut raw = Vec::new();

        loop {
            raw.clear();
            if reader.read_until(b'\n', &mut raw)? == 0 {
                break;
            }
            let line: String = raw.iter().map(|&b| b as char).collect();

            if line.contains(END_OF_HEADER) {
                end_found = true;
                break;
            }
            if let Some(next) = Section::from_marker(&line) {
                section = next;
                continue;
            }
            header.global_field(&line);

            match section {
                Section::ScanList => header.scan_list_field(&line),
                Section::ForceList => header.force_list_field(&line),
                Section::ForceImageList => {
                    header.force_image_list_field(&line, &mut data_offset_found)
                }
                Section::ImageList => header.image_list_field(&line),
                Section::None => {}
            }
        }

        if !end_found {
            log::warn!("Nanoscope header has no end marker");
        }

        header.derive();
        Ok(header)
    }

    fn global_field(&mut self, line: &str) {
        if line.contains("\\Version:") {
            self.version = text(line);
        } else if line.contains("\\@Sens. Zsens:") || line.contains("\\@Sens. Zscan:") {
            self.zscan_sensitivity = number(line, "Sens. Zsens").unwrap_or(self.zscan_sensitivity);
        } else if line.contains("\\Microscope:") {
            self.microscope = text(line);
        } else if line.contains("\\Scanner file:") {
            self.scanner = text(line);
        }
    }

    fn scan_list_field(&mut self, line: &str) {
        if line.contains("\\Operating mode:") {
            self.force_volume = matches!(
                string_value(line),
                Some("Force Volume") | Some("Image")
            );
        } else if line.contains("\\X Offset:") {
            self.x_offset = number(line, "X Offset").unwrap_or(self.x_offset);
        } else if line.contains("\\Y Offset:") {
            self.y_offset = number(line, "Y Offset").unwrap_or(self.y_offset);
        } else if line.contains("\\@Sens. DeflSens:") || line.contains("\\@Sens. Deflection:") {
            self.deflection_sensitivity = number(line, "Sens. DeflSens");
        } else if line.contains("\\XY Closed Loop:") {
            self.xy_closed_loop = text(line);
        } else if line.contains("\\Z Closed Loop:") {
            self.z_closed_loop = text(line);
        } else if line.contains("\\PeakForce Capture:") {
            self.peakforce = string_value(line) == Some("Allow");
        } else if line.contains("\\Peak Force Amplitude:") {
            self.pfc_amplitude = number(line, "Peak Force Amplitude").unwrap_or_default();
        } else if line.contains("\\PFT Freq:") {
            self.pfc_frequency = number(line, "PFT Freq").unwrap_or_default();
        } else if line.contains("\\Sample Points:") {
            self.pfc_sample_points = count(line, "Sample Points").unwrap_or_default();
        } else if line.contains("\\Sync Distance New:") {
            self.sync_distance_new = number(line, "Sync Distance New").unwrap_or_default();
        } else if line.contains("\\Sync Distance QNM:") {
            self.sync_distance_qnm = number(line, "Sync Distance QNM").unwrap_or_default();
        } else if line.contains("\\Samps/line:") {
            self.piezo_samps_per_line = count(line, "Samps/line").unwrap_or_default();
        } else if line.contains("\\@Sens. ZsensSens:") {
            self.z_sensor_sensitivity = number(line, "Sens. ZsensSens").unwrap_or_default();
        }
    }

    fn force_list_field(&mut self, line: &str) {
        if line.contains("\\Trigger mode:") {
            self.trigger_mode = text(line);
        } else if line.contains("\\force/line") {
            self.curves_per_line = count(line, "force/line").unwrap_or_default();
        } else if line.contains("\\Scan rate:") {
            self.scan_rate = number(line, "Scan rate").unwrap_or_default();
        } else if line.contains("\\Forward vel.:") {
            self.forward_velocity = number(line, "Forward vel.").unwrap_or_default();
        } else if line.contains("\\Reverse vel.:") {
            self.reverse_velocity = number(line, "Reverse vel.").unwrap_or_default();
        } else if line.contains("\\@4:Trig threshold Deflection:")
            || line.contains("\\@4:Trig Threshold Deflection:")
        {
            self.deflection_v_per_lsb = number(line, "Trig threshold Deflection").unwrap_or_default();
        } else if line.contains("\\Deflection Sensitivity Correction:") {
            self.deflection_correction = number(line, "Deflection Sensitivity Correction");
        } else if line.contains("\\Samps/line:") {
            // retract count first, then approach
            match raw_value(line).map(numbers).as_deref() {
                Some([retract, approach, ..]) => {
                    self.retract_points = retract.max(0.0) as usize;
                    self.approach_points = approach.max(0.0) as usize;
                }
                _ => AfmError::malformed("Samps/line", line.trim_end()).warn(),
            }
        }
    }

    fn force_image_list_field(&mut self, line: &str, data_offset_found: &mut bool) {
        if line.contains("\\Spring Constant:") || line.contains("\\Spring constant:") {
            self.spring_constant = number(line, "Spring Constant");
        } else if line.contains("\\Data length:") {
            self.curve_data_length = count(line, "Data length").unwrap_or_default();
        } else if line.contains("\\Data offset:") && !*data_offset_found {
            self.data_offset = count(line, "Data offset").unwrap_or_default();
            *data_offset_found = true;
        } else if line.contains("\\Bytes/pixel:") {
            self.bytes_per_pixel = count(line, "Bytes/pixel").unwrap_or_default();
        } else if line.contains("\\@4:Z scale: V [Sens. DeflSens]")
            || line.contains("\\@4:FV scale: V [Sens. ZsensSens]")
        {
            self.z_scale = number(line, "Z scale").unwrap_or_default();
        } else if line.contains("\\@4:Ramp size:") || line.contains("\\@4:Ramp Size:") {
            self.ramp_size_volts = number(line, "Ramp size").unwrap_or_default();
        }
    }

    fn image_list_field(&mut self, line: &str) {
        if line.contains("\\Data length") {
            self.image_data_length = count(line, "Data length").unwrap_or_default();
        } else if line.contains("\\Samps/line:") {
            self.image_samps_per_line = count(line, "Samps/line").unwrap_or_default();
        } else if line.contains("\\Number of lines:") {
            self.image_lines = count(line, "Number of lines").unwrap_or_default();
        } else if line.contains("\\Data offset:") {
            self.image_offset = count(line, "Data offset").unwrap_or_default();
        } else if line.contains("\\Scan Size:") {
            let Some(value) = raw_value(line) else {
                return;
            };
            match (numbers(value).as_slice(), length_unit(value)) {
                ([x, y, ..], Some(unit)) => {
                    self.image_scan_x = x * unit;
                    self.image_scan_y = y * unit;
                }
                _ => AfmError::malformed("Scan Size", value).warn(),
            }
        } else if line.contains("\\@2:Z scale:") {
            self.image_z_sensitivity = number(line, "Z scale").unwrap_or_default();
        } else if line.contains("\\Bytes/pixel") {
            self.image_bytes_per_pixel = count(line, "Bytes/pixel").unwrap_or_default();
        }
    }

    fn derive(&mut self) {
        self.total_curves = if self.force_volume {
            self.image_samps_per_line.saturating_mul(self.image_lines)
        } else {
            1
        };
        self.ramp_size = self.ramp_size_volts * self.zscan_sensitivity;
        self.speed_forward = self.forward_velocity * self.zscan_sensitivity;
        self.speed_reverse = self.reverse_velocity * self.zscan_sensitivity;
        self.zstep_approach = step(self.ramp_size, self.approach_points);
        self.zstep_retract = step(self.ramp_size, self.retract_points);
    }

    /// Bytes per curve sample, inferred from the declared data length
    pub fn curve_sample_width(&self) -> Result<usize> {
        let lines = if self.force_volume {
            self.curves_per_line.saturating_mul(self.curves_per_line)
        } else {
            1
        };
        let samples = self.approach_points.saturating_mul(lines).saturating_mul(2);
        if samples == 0 {
            return Err(AfmError::InvalidStructure(
                "Nanoscope header declares no curve samples".to_string(),
            ));
        }
        match self.curve_data_length / samples {
            width @ (2 | 4) => Ok(width),
            width => Err(AfmError::InvalidStructure(format!(
                "unsupported curve sample width {} bytes",
                width
            ))),
        }
    }

    /// Bytes per image pixel, inferred from the declared image length
    pub fn image_pixel_width(&self) -> Result<usize> {
        let pixels = self.image_samps_per_line.saturating_mul(self.image_lines);
        if pixels == 0 {
            return Err(AfmError::InvalidStructure(
                "Nanoscope header declares an empty image".to_string(),
            ));
        }
        match self.image_data_length / pixels {
            width @ (2 | 4) => Ok(width),
            width => Err(AfmError::InvalidStructure(format!(
                "unsupported image pixel width {} bytes",
                width
            ))),
        }
    }
}

fn step(size: f64, points: usize) -> f64 {
    if points == 0 {
        0.0
    } else {
        size / points as f64
    }
}
