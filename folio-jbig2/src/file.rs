//! Standalone JBIG2 files (Annex D).

use crate::Organization;
use crate::error::{DecodeError, HeaderError, Result, bail};
use crate::log::ldebug;
use crate::reader::Reader;
use crate::segment::{Segment, parse_segments_from};

/// The ID string at the start of every file (D.4.1).
pub const FILE_SIGNATURE: [u8; 8] = [0x97, 0x4A, 0x42, 0x32, 0x0D, 0x0A, 0x1A, 0x0A];

/// The file header (D.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    /// How segment headers and data parts are arranged.
    pub organization: Organization,
    /// The number of pages, if it was known when the file was written.
    pub page_count: Option<u32>,
    /// Generic regions may use templates with 12 adaptive pixels.
    pub uses_extended_templates: bool,
    /// Regions may be coloured.
    pub contains_coloured_regions: bool,
}

/// A parsed standalone file.
#[derive(Debug, Clone)]
pub struct File<'a> {
    /// The file header.
    pub header: FileHeader,
    /// The segments in file order.
    pub segments: Vec<Segment<'a>>,
}

/// Parse the header and all segments of a standalone file.
pub fn parse_file(data: &[u8]) -> Result<File<'_>> {
    let mut reader = Reader::new(data);

    let header = parse_file_header(&mut reader)?;
    let segments = parse_segments_from(&mut reader, header.organization)?;

    ldebug!(
        "{:?} file with {} segments, page count {:?}",
        header.organization,
        segments.len(),
        header.page_count
    );

    Ok(File { header, segments })
}

fn parse_file_header(reader: &mut Reader<'_>) -> Result<FileHeader> {
    let signature = reader.read_bytes(8).ok_or(DecodeError::TruncatedStream)?;
    if signature != FILE_SIGNATURE {
        bail!(HeaderError::InvalidSignature);
    }

    let flags = reader.read_byte().ok_or(DecodeError::TruncatedStream)?;
    if flags & 0xF0 != 0 {
        bail!(HeaderError::ReservedBits);
    }

    let organization = if flags & 0x01 != 0 {
        Organization::Sequential
    } else {
        Organization::RandomAccess
    };

    let page_count = if flags & 0x02 != 0 {
        None
    } else {
        Some(reader.read_u32().ok_or(DecodeError::TruncatedStream)?)
    };

    Ok(FileHeader {
        organization,
        page_count,
        uses_extended_templates: flags & 0x04 != 0,
        contains_coloured_regions: flags & 0x08 != 0,
    })
}
