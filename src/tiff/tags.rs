/// Image width in pixels
pub const IMAGE_WIDTH: u16 = 256;
/// Image height in pixels
pub const IMAGE_LENGTH: u16 = 257;
/// Bits per sample
pub const BITS_PER_SAMPLE: u16 = 258;
/// Compression scheme
pub const COMPRESSION: u16 = 259;
/// Byte offsets of the strips
pub const STRIP_OFFSETS: u16 = 273;
/// Samples per pixel
pub const SAMPLES_PER_PIXEL: u16 = 277;
/// Byte counts of the strips
pub const STRIP_BYTE_COUNTS: u16 = 279;
/// Sample format (1 unsigned, 2 signed, 3 float)
pub const SAMPLE_FORMAT: u16 = 339;

/// TIFF field types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// 8-bit unsigned
    Byte,
    /// NUL-terminated text
    Ascii,
    /// 16-bit unsigned
    Short,
    /// 32-bit unsigned
    Long,
    /// Two LONGs: numerator / denominator
    Rational,
    /// 8-bit signed
    SByte,
    /// Opaque bytes
    Undefined,
    /// 16-bit signed
    SShort,
    /// 32-bit signed
    SLong,
    /// Two SLONGs
    SRational,
    /// IEEE single
    Float,
    /// IEEE double
    Double,
}

impl FieldType {
    /// Decode the type code of an IFD entry
    pub fn from_code(code: u16) -> Option<Self> {
        Some(match code {
            1 => FieldType::Byte,
            2 => FieldType::Ascii,
            3 => FieldType::Short,
            4 => FieldType::Long,
            5 => FieldType::Rational,
            6 => FieldType::SByte,
            7 => FieldType::Undefined,
            8 => FieldType::SShort,
            9 => FieldType::SLong,
            10 => FieldType::SRational,
            11 => FieldType::Float,
            12 => FieldType::Double,
            _ => return None,
        })
    }

    /// Size in bytes of one value
    pub fn size(&self) -> usize {
        match self {
            FieldType::Byte | FieldType::Ascii | FieldType::SByte | FieldType::Undefined => 1,
            FieldType::Short | FieldType::SShort => 2,
            FieldType::Long | FieldType::SLong | FieldType::Float => 4,
            FieldType::Rational | FieldType::SRational | FieldType::Double => 8,
        }
    }
}

/// Decoded value of an IFD entry
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    /// BYTE / UNDEFINED
    Bytes(Vec<u8>),
    /// ASCII, trailing NULs removed
    Ascii(String),
    /// SHORT / LONG
    Unsigned(Vec<u64>),
    /// SBYTE / SSHORT / SLONG
    Signed(Vec<i64>),
    /// FLOAT / DOUBLE / RATIONAL / SRATIONAL
    Float(Vec<f64>),
}

impl TagValue {
    /// Text content of an ASCII tag
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TagValue::Ascii(text) => Some(text),
            _ => None,
        }
    }

    /// The value of a single-valued floating point tag
    pub fn as_float(&self) -> Option<f64> {
        match self {
            TagValue::Float(values) if values.len() == 1 => Some(values[0]),
            _ => None,
        }
    }

    /// All values of an integer tag
    pub fn as_unsigned(&self) -> Option<Vec<u64>> {
        match self {
            TagValue::Unsigned(values) => Some(values.clone()),
            TagValue::Signed(values) => values.iter().map(|&v| u64::try_from(v).ok()).collect(),
            TagValue::Bytes(values) => Some(values.iter().map(|&v| v as u64).collect()),
            _ => None,
        }
    }

    /// First value of an integer tag
    pub fn first_unsigned(&self) -> Option<u64> {
        self.as_unsigned().and_then(|v| v.first().copied())
    }
}

/// One entry of an image file directory
#[derive(Debug, Clone, PartialEq)]
pub struct IfdEntry {
    /// Tag number
    pub tag: u16,
    /// Decoded value
    pub value: TagValue,
}
