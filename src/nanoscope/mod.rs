//! # Nanoscope Reader
//!
//! Nanoscope files start with a Latin-1 text header of `\Key: value` lines
//! grouped in `\*Ciao ... list` sections and terminated by `\*File list end`.
//! Curve data and the optional topography image follow at the byte offsets
//! the header declares, as little-endian 16 or 32-bit integers.
//!
//! Each curve is decoded into an approach (id 0) and a retract (id 1)
//! segment holding a `height` and a `vDeflection` channel. PeakForce
//! captures are re-synchronised onto a sinusoidal drive axis.

mod curve;
mod header;
mod image;
mod reader;
pub mod scan;

#[cfg(test)]
pub(crate) mod tests;

pub use curve::HEIGHT_CHANNEL;
pub use header::NanoscopeHeader;
pub use reader::NanoscopeFile;
