//! Minimal TIFF reader for the multi-page channel images embedded in JPK
//! force maps.
//!
//! # Key Concepts
//!
//! - **Byte order**: the header declares it (`II` little-endian, `MM`
//!   big-endian) and every multi-byte value follows it.
//!
//! - **IFD (Image File Directory)**: one per page. JPK stores each channel as
//!   a page and keeps its scaling factors in private tags of that page.
//!
//! - **Inline vs offset values**: values of up to four bytes are stored in
//!   the entry itself, larger ones at the offset the entry points to.

mod error;
mod parser;
mod tags;

#[cfg(test)]
pub(crate) mod tests;

pub use error::TiffError;
pub use parser::{Endian, Ifd, TiffFile};
pub use tags::{FieldType, IfdEntry, TagValue};
