use std::collections::BTreeMap;

use crate::error::Result;
use crate::jpk::JpkArchive;
use crate::model::{FileMetadata, ForceCurve, Image};
use crate::nanoscope::NanoscopeFile;
use crate::uff::UffFile;

/// Format-specific backend of an [`AfmFile`](super::AfmFile)
#[derive(Debug)]
pub(super) enum CurveSource {
    Jpk(JpkArchive),
    Nanoscope(NanoscopeFile),
    Uff(UffFile),
}

impl CurveSource {
    pub(super) fn curve_count(&self) -> usize {
        match self {
            CurveSource::Jpk(archive) => archive.curve_count(),
            CurveSource::Nanoscope(file) => file.curve_count(),
            CurveSource::Uff(file) => file.curve_count(),
        }
    }

    pub(super) fn read_curve(&self, index: usize) -> Result<ForceCurve> {
        match self {
            CurveSource::Jpk(archive) => archive.read_curve(index),
            CurveSource::Nanoscope(file) => file.read_curve(index),
            CurveSource::Uff(file) => file.read_curve(index),
        }
    }

    pub(super) fn piezo_image(&self, metadata: &FileMetadata) -> Result<Option<Image>> {
        match self {
            CurveSource::Jpk(archive) => {
                archive.piezo_image(metadata.num_x_pixels, metadata.num_y_pixels)
            }
            CurveSource::Nanoscope(file) => file.piezo_image(),
            CurveSource::Uff(_) => Ok(None),
        }
    }

    pub(super) fn channel_images(&self) -> Result<BTreeMap<String, Image>> {
        match self {
            CurveSource::Jpk(archive) => archive.channel_images(),
            CurveSource::Nanoscope(_) | CurveSource::Uff(_) => Ok(BTreeMap::new()),
        }
    }
}
