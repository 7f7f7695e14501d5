use super::*;

/// Value of an extra tag written by [`build_tiff`]
#[derive(Debug, Clone)]
pub(crate) enum TestTag {
    Ascii(String),
    Double(f64),
    Long(u32),
    Short(u16),
}

/// One page of signed 32-bit pixels plus extra tags appended after the
/// baseline ones
#[derive(Debug, Clone)]
pub(crate) struct TestPage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<i32>,
    pub tags: Vec<(u16, TestTag)>,
}

/// Build a little-endian classic TIFF in memory
pub(crate) fn build_tiff(pages: &[TestPage]) -> Vec<u8> {
    let mut out = b"II".to_vec();
    out.extend(42u16.to_le_bytes());
    out.extend(0u32.to_le_bytes());
    let mut next_pointer = 4usize;

    for page in pages {
        let strip_offset = out.len() as u32;
        for pixel in &page.pixels {
            out.extend(pixel.to_le_bytes());
        }
        let strip_len = (page.pixels.len() * 4) as u32;

        let mut tags = vec![
            (256, TestTag::Long(page.width)),
            (257, TestTag::Long(page.height)),
            (258, TestTag::Short(32)),
            (259, TestTag::Short(1)),
            (273, TestTag::Long(strip_offset)),
            (277, TestTag::Short(1)),
            (279, TestTag::Long(strip_len)),
            (339, TestTag::Short(2)),
        ];
        tags.extend(page.tags.iter().cloned());

        let mut encoded = Vec::new();
        for (tag, value) in &tags {
            let (field_type, count, bytes): (u16, usize, Vec<u8>) = match value {
                TestTag::Ascii(text) => {
                    let mut bytes = text.as_bytes().to_vec();
                    bytes.push(0);
                    (2, bytes.len(), bytes)
                }
                TestTag::Double(v) => (12, 1, v.to_le_bytes().to_vec()),
                TestTag::Long(v) => (4, 1, v.to_le_bytes().to_vec()),
                TestTag::Short(v) => (3, 1, v.to_le_bytes().to_vec()),
            };
            let field = if bytes.len() <= 4 {
                let mut inline = bytes;
                inline.resize(4, 0);
                inline
            } else {
                let offset = out.len() as u32;
                out.extend(&bytes);
                if out.len() % 2 == 1 {
                    out.push(0);
                }
                offset.to_le_bytes().to_vec()
            };
            encoded.push((*tag, field_type, count as u32, field));
        }

        let ifd_offset = out.len() as u32;
        out[next_pointer..next_pointer + 4].copy_from_slice(&ifd_offset.to_le_bytes());
        out.extend((encoded.len() as u16).to_le_bytes());
        for (tag, field_type, count, field) in encoded {
            out.extend(tag.to_le_bytes());
            out.extend(field_type.to_le_bytes());
            out.extend(count.to_le_bytes());
            out.extend(field);
        }
        next_pointer = out.len();
        out.extend(0u32.to_le_bytes());
    }

    out
}

fn sample_pages() -> Vec<TestPage> {
    vec![
        TestPage {
            width: 1,
            height: 1,
            pixels: vec![0],
            tags: vec![],
        },
        TestPage {
            width: 2,
            height: 2,
            pixels: vec![-1, 2, 3, 400_000],
            tags: vec![
                (32000, TestTag::Ascii("channel: Height\nmore".to_string())),
                (32001, TestTag::Double(1.5)),
            ],
        },
    ]
}

#[test]
fn test_parse_pages_and_tags() -> Result<(), Box<dyn std::error::Error>> {
    let tiff = TiffFile::parse(build_tiff(&sample_pages()))?;
    assert_eq!(tiff.endian(), Endian::Little);
    assert_eq!(tiff.pages().len(), 2);

    let page = &tiff.pages()[1];
    assert_eq!(page.width()?, 2);
    assert_eq!(page.height()?, 2);
    assert_eq!(
        page.get(32000).and_then(TagValue::as_text),
        Some("channel: Height\nmore")
    );
    assert_eq!(page.get(32001).and_then(TagValue::as_float), Some(1.5));
    Ok(())
}

#[test]
fn test_read_signed_samples() -> Result<(), Box<dyn std::error::Error>> {
    let tiff = TiffFile::parse(build_tiff(&sample_pages()))?;
    assert_eq!(tiff.read_samples(1)?, vec![-1.0, 2.0, 3.0, 400_000.0]);
    Ok(())
}

#[test]
fn test_page_out_of_range() {
    let tiff = TiffFile::parse(build_tiff(&sample_pages())).unwrap();
    assert!(matches!(
        tiff.read_samples(5),
        Err(TiffError::PageOutOfRange { index: 5, count: 2 })
    ));
}

#[test]
fn test_invalid_header() {
    assert!(matches!(
        TiffFile::parse(b"XX\x2a\x00".to_vec()),
        Err(TiffError::InvalidHeader)
    ));
    assert!(matches!(
        TiffFile::parse(b"II\x2b\x00\x08\x00\x00\x00".to_vec()),
        Err(TiffError::Unsupported(_))
    ));
}

#[test]
fn test_truncated_ifd() {
    let mut bytes = build_tiff(&sample_pages());
    bytes.truncate(bytes.len() - 20);
    assert!(TiffFile::parse(bytes).is_err());
}
