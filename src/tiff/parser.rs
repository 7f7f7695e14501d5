use std::collections::HashSet;

use byteorder::{BigEndian, ByteOrder as _, LittleEndian};

use super::error::TiffError;
use super::tags::{
    FieldType, IfdEntry, TagValue, BITS_PER_SAMPLE, COMPRESSION, IMAGE_LENGTH, IMAGE_WIDTH,
    SAMPLES_PER_PIXEL, SAMPLE_FORMAT, STRIP_BYTE_COUNTS, STRIP_OFFSETS,
};

/// Byte order declared in the TIFF header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    /// `II`
    Little,
    /// `MM`
    Big,
}

/// Image file directory: the tags of one page, in file order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ifd {
    entries: Vec<IfdEntry>,
}

impl Ifd {
    /// Entries in file order
    pub fn entries(&self) -> &[IfdEntry] {
        &self.entries
    }

    /// Value of a tag
    pub fn get(&self, tag: u16) -> Option<&TagValue> {
        self.entries.iter().find(|e| e.tag == tag).map(|e| &e.value)
    }

    fn required(&self, tag: u16) -> Result<u64, TiffError> {
        self.get(tag)
            .and_then(TagValue::first_unsigned)
            .ok_or(TiffError::MissingTag(tag))
    }

    fn optional(&self, tag: u16, default: u64) -> u64 {
        self.get(tag).and_then(TagValue::first_unsigned).unwrap_or(default)
    }

    /// Image width
    pub fn width(&self) -> Result<usize, TiffError> {
        Ok(self.required(IMAGE_WIDTH)? as usize)
    }

    /// Image height
    pub fn height(&self) -> Result<usize, TiffError> {
        Ok(self.required(IMAGE_LENGTH)? as usize)
    }
}

/// In-memory TIFF file (classic TIFF only)
#[derive(Debug, Clone)]
pub struct TiffFile {
    data: Vec<u8>,
    endian: Endian,
    pages: Vec<Ifd>,
}

impl TiffFile {
    /// Parse the header and every IFD of a buffer
    pub fn parse(data: Vec<u8>) -> Result<Self, TiffError> {
        let endian = match data.get(0..2) {
            Some(b"II") => Endian::Little,
            Some(b"MM") => Endian::Big,
            _ => return Err(TiffError::InvalidHeader),
        };

        let mut file = Self {
            data,
            endian,
            pages: Vec::new(),
        };

        match file.read_u16(2)? {
            42 => {}
            43 => return Err(TiffError::Unsupported("BigTIFF".to_string())),
            _ => return Err(TiffError::InvalidHeader),
        }

        let mut visited = HashSet::new();
        let mut offset = file.read_u32(4)? as usize;
        while offset != 0 {
            if !visited.insert(offset) {
                log::warn!("TIFF IFD chain loops back to offset {}", offset);
                break;
            }
            let (ifd, next) = file.read_ifd(offset)?;
            file.pages.push(ifd);
            offset = next;
        }

        Ok(file)
    }

    /// Byte order of the file
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// All pages
    pub fn pages(&self) -> &[Ifd] {
        &self.pages
    }

    fn slice(&self, offset: usize, len: usize) -> Result<&[u8], TiffError> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or(TiffError::UnexpectedEof { offset, len })
    }

    fn read_u16(&self, offset: usize) -> Result<u16, TiffError> {
        let bytes = self.slice(offset, 2)?;
        Ok(match self.endian {
            Endian::Little => LittleEndian::read_u16(bytes),
            Endian::Big => BigEndian::read_u16(bytes),
        })
    }

    fn read_u32(&self, offset: usize) -> Result<u32, TiffError> {
        let bytes = self.slice(offset, 4)?;
        Ok(match self.endian {
            Endian::Little => LittleEndian::read_u32(bytes),
            Endian::Big => BigEndian::read_u32(bytes),
        })
    }

    fn read_u64(&self, offset: usize) -> Result<u64, TiffError> {
        let bytes = self.slice(offset, 8)?;
        Ok(match self.endian {
            Endian::Little => LittleEndian::read_u64(bytes),
            Endian::Big => BigEndian::read_u64(bytes),
        })
    }

    fn read_ifd(&self, offset: usize) -> Result<(Ifd, usize), TiffError> {
        let count = self.read_u16(offset)? as usize;
        let mut entries = Vec::with_capacity(count);

        for i in 0..count {
            let entry_offset = offset + 2 + i * 12;
            let tag = self.read_u16(entry_offset)?;
            let type_code = self.read_u16(entry_offset + 2)?;
            let value_count = self.read_u32(entry_offset + 4)? as usize;

            let Some(field_type) = FieldType::from_code(type_code) else {
                log::debug!("Skipping TIFF tag {} with unknown type {}", tag, type_code);
                continue;
            };

            let total = field_type.size().saturating_mul(value_count);
            let value_offset = if total <= 4 {
                entry_offset + 8
            } else {
                self.read_u32(entry_offset + 8)? as usize
            };

            let value = self.read_value(field_type, value_offset, value_count)?;
            entries.push(IfdEntry { tag, value });
        }

        let next = self.read_u32(offset + 2 + count * 12)? as usize;
        Ok((Ifd { entries }, next))
    }

    fn read_value(
        &self,
        field_type: FieldType,
        offset: usize,
        count: usize,
    ) -> Result<TagValue, TiffError> {
        let size = field_type.size();
        let bytes = self.slice(offset, size.saturating_mul(count))?;
        let at = |i: usize| offset + i * size;

        let value = match field_type {
            FieldType::Byte | FieldType::Undefined => TagValue::Bytes(bytes.to_vec()),
            FieldType::Ascii => {
                let text = String::from_utf8_lossy(bytes);
                TagValue::Ascii(text.trim_end_matches('\0').to_string())
            }
            FieldType::Short => TagValue::Unsigned(
                (0..count)
                    .map(|i| self.read_u16(at(i)).map(u64::from))
                    .collect::<Result<_, _>>()?,
            ),
            FieldType::Long => TagValue::Unsigned(
                (0..count)
                    .map(|i| self.read_u32(at(i)).map(u64::from))
                    .collect::<Result<_, _>>()?,
            ),
            FieldType::SByte => TagValue::Signed(bytes.iter().map(|&b| b as i8 as i64).collect()),
            FieldType::SShort => TagValue::Signed(
                (0..count)
                    .map(|i| self.read_u16(at(i)).map(|v| v as i16 as i64))
                    .collect::<Result<_, _>>()?,
            ),
            FieldType::SLong => TagValue::Signed(
                (0..count)
                    .map(|i| self.read_u32(at(i)).map(|v| v as i32 as i64))
                    .collect::<Result<_, _>>()?,
            ),
            FieldType::Rational => TagValue::Float(
                (0..count)
                    .map(|i| -> Result<f64, TiffError> {
                        let num = self.read_u32(at(i))? as f64;
                        let den = self.read_u32(at(i) + 4)? as f64;
                        Ok(num / den)
                    })
                    .collect::<Result<_, _>>()?,
            ),
            FieldType::SRational => TagValue::Float(
                (0..count)
                    .map(|i| -> Result<f64, TiffError> {
                        let num = self.read_u32(at(i))? as i32 as f64;
                        let den = self.read_u32(at(i) + 4)? as i32 as f64;
                        Ok(num / den)
                    })
                    .collect::<Result<_, _>>()?,
            ),
            FieldType::Float => TagValue::Float(
                (0..count)
                    .map(|i| self.read_u32(at(i)).map(|v| f32::from_bits(v) as f64))
                    .collect::<Result<_, _>>()?,
            ),
            FieldType::Double => TagValue::Float(
                (0..count)
                    .map(|i| self.read_u64(at(i)).map(f64::from_bits))
                    .collect::<Result<_, _>>()?,
            ),
        };

        Ok(value)
    }

    /// Decode the pixels of a page as a flat row-major array.
    ///
    /// Only uncompressed, single-sample strips of 8/16/32/64-bit integers or
    /// 32/64-bit floats are supported.
    pub fn read_samples(&self, page: usize) -> Result<Vec<f64>, TiffError> {
        let ifd = self.pages.get(page).ok_or(TiffError::PageOutOfRange {
            index: page,
            count: self.pages.len(),
        })?;

        let compression = ifd.optional(COMPRESSION, 1);
        if compression != 1 {
            return Err(TiffError::Unsupported(format!("compression {}", compression)));
        }
        let samples_per_pixel = ifd.optional(SAMPLES_PER_PIXEL, 1);
        if samples_per_pixel != 1 {
            return Err(TiffError::Unsupported(format!(
                "{} samples per pixel",
                samples_per_pixel
            )));
        }

        let width = ifd.width()?;
        let height = ifd.height()?;
        let bits = ifd.optional(BITS_PER_SAMPLE, 1);
        let format = ifd.optional(SAMPLE_FORMAT, 1);
        let sample_size = match bits {
            8 | 16 | 32 | 64 => (bits / 8) as usize,
            _ => return Err(TiffError::Unsupported(format!("{} bits per sample", bits))),
        };

        let offsets = ifd
            .get(STRIP_OFFSETS)
            .and_then(TagValue::as_unsigned)
            .ok_or(TiffError::MissingTag(STRIP_OFFSETS))?;
        let counts = ifd
            .get(STRIP_BYTE_COUNTS)
            .and_then(TagValue::as_unsigned)
            .ok_or(TiffError::MissingTag(STRIP_BYTE_COUNTS))?;

        let mut raw = Vec::with_capacity(width * height * sample_size);
        for (&offset, &count) in offsets.iter().zip(&counts) {
            raw.extend_from_slice(self.slice(offset as usize, count as usize)?);
        }

        let needed = width * height * sample_size;
        if raw.len() < needed {
            return Err(TiffError::UnexpectedEof {
                offset: offsets.first().copied().unwrap_or(0) as usize,
                len: needed,
            });
        }

        raw[..needed]
            .chunks_exact(sample_size)
            .map(|chunk| self.decode_sample(chunk, format))
            .collect()
    }

    fn decode_sample(&self, chunk: &[u8], format: u64) -> Result<f64, TiffError> {
        let little = self.endian == Endian::Little;
        let value = match (format, chunk.len()) {
            (1, 1) => chunk[0] as f64,
            (2, 1) => chunk[0] as i8 as f64,
            (1, 2) => endian_u16(chunk, little) as f64,
            (2, 2) => endian_u16(chunk, little) as i16 as f64,
            (1, 4) => endian_u32(chunk, little) as f64,
            (2, 4) => endian_u32(chunk, little) as i32 as f64,
            (3, 4) => f32::from_bits(endian_u32(chunk, little)) as f64,
            (1, 8) => endian_u64(chunk, little) as f64,
            (2, 8) => endian_u64(chunk, little) as i64 as f64,
            (3, 8) => f64::from_bits(endian_u64(chunk, little)),
            (format, size) => {
                return Err(TiffError::Unsupported(format!(
                    "sample format {} with {} bytes",
                    format, size
                )))
            }
        };
        Ok(value)
    }
}

fn endian_u16(bytes: &[u8], little: bool) -> u16 {
    if little {
        LittleEndian::read_u16(bytes)
    } else {
        BigEndian::read_u16(bytes)
    }
}

fn endian_u32(bytes: &[u8], little: bool) -> u32 {
    if little {
        LittleEndian::read_u32(bytes)
    } else {
        BigEndian::read_u32(bytes)
    }
}

fn endian_u64(bytes: &[u8], little: bool) -> u64 {
    if little {
        LittleEndian::read_u64(bytes)
    } else {
        BigEndian::read_u64(bytes)
    }
}
