/// Errors raised while walking a TIFF buffer
#[derive(Debug, thiserror::Error)]
pub enum TiffError {
    /// Byte-order mark or magic number is wrong
    #[error("Invalid TIFF header")]
    InvalidHeader,

    /// An offset points past the end of the buffer
    #[error("Unexpected end of TIFF data: {len} bytes at offset {offset}")]
    UnexpectedEof {
        /// Requested offset
        offset: usize,
        /// Requested length
        len: usize,
    },

    /// Valid TIFF feature this reader does not handle
    #[error("Unsupported TIFF feature: {0}")]
    Unsupported(String),

    /// A tag needed to decode pixels is absent
    #[error("Missing TIFF tag {0}")]
    MissingTag(u16),

    /// Page index outside the file
    #[error("TIFF page {index} out of range ({count} pages)")]
    PageOutOfRange {
        /// Requested page
        index: usize,
        /// Number of pages
        count: usize,
    },
}
