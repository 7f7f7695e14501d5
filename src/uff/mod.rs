//! # UFF Text Codec
//!
//! UFF is the line-oriented interchange format every reader can export to.
//! A file holds one curve:
//!
//! ```text
//! HE UFF_code:                            _1_2_3_4_5
//! HE Recording_number_segment:            2
//! HE Recording_segment_0_type:            Approach
//! ...
//! AP     0  1.2E-7  3.4E-9
//! RE     1  1.2E-7  3.1E-9
//! ```
//!
//! `HE` lines carry `key: value` header fields; every other line is a data
//! row of segment code, segment id and one value per column. Floats are
//! written in shortest round-trip scientific notation, so reading a written
//! file reproduces every value exactly.

mod header;
mod reader;
mod writer;


pub use header::{UffColumn, UffHeader, UffSegmentHeader};
pub use reader::{parse_curve, parse_header, UffFile};
pub use writer::{write_uff_file, UffWriter};
