//! # Canonical AFM Data Model
//!
//! Every reader produces the same structures:
//!
//! - [`FileMetadata`]: typed header fields, common ones at the top level and
//!   format-specific ones in [`FormatDetail`]
//! - [`ForceCurve`]: the segments of one ramp cycle, grouped by phase
//! - [`Segment`]: raw and converted per-channel arrays of one phase
//! - [`Image`]: piezo height maps and embedded channel images
//!
//! Post-processing ([`ForceCurve::preprocess`], [`ForceCurve::shift_height`],
//! [`ForceCurve::compute_force_indentation`]) turns the converted channels
//! into deflection, indentation and force arrays.

mod conversion;
mod curve;
mod image;
mod metadata;
mod segment;


pub use conversion::{
    ChannelClass, ChannelConversion, Scaling, SubConversion, HEIGHT_CHANNELS, VDEFLECTION,
};
pub use curve::ForceCurve;
pub use image::Image;
pub use metadata::{file_id_from_name, FileMetadata, FormatDetail, HeaderValue};
pub use segment::{linspace, Channels, Segment, SegmentMetadata, SegmentType};
