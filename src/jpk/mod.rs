//! # JPK Archive Reader
//!
//! JPK instruments save force spectroscopy data as zip archives:
//!
//! ```text
//! header.properties                     global header
//! shared-data/header.properties         channel conversion tables
//! segments/<seg>/segment-header.properties            (single curve)
//! segments/<seg>/channels/<channel>.dat
//! index/<curve>/segments/<seg>/segment-header.properties  (maps)
//! index/<curve>/segments/<seg>/channels/<channel>.dat
//! data-image.force | data-image.jpk-qi-image            (maps, optional)
//! ```
//!
//! Channel data is stored as big-endian encoder counts and converted through
//! the per-channel conversion chain of the shared header. Thermal-noise
//! spectra (`.tnd`) are plain text and handled by [`ThermalNoise`].

mod archive;
mod header;
mod image;
mod layout;
#[cfg(feature = "parallel")]
mod parallel;
mod segment;
mod thermal;

#[cfg(test)]
pub(crate) mod tests;

pub use archive::JpkArchive;
pub use header::JpkHeader;
pub use image::{assemble_piezo_image, read_channel_images, IMAGE_CHANNELS};
pub use layout::{catalog, CurveEntries, EntryAddress, EntryKind, PathLayout, SegmentEntries};
pub use thermal::ThermalNoise;
