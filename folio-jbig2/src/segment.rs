//! Segment headers and dispatch (7.2, 7.3).
//!
//! A JBIG2 bitstream is a sequence of segments, each made of a header and a
//! data part. The header names the segment type, the segments it refers to,
//! the page it belongs to and the length of its data.

pub mod generic_region;
pub mod page_info;
pub mod region;

use crate::DecodeSettings;
use crate::Organization;
use crate::error::{DecodeError, HeaderError, Result, Unsupported, bail};
use crate::huffman_table::HuffmanTable;
use crate::log::{ldebug, ltrace};
use crate::reader::Reader;
use generic_region::{GenericRegion, GenericRegionParams};
use page_info::PageInformation;
use region::RegionSegmentInfo;

/// The type of a segment (7.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentType {
    /// 0
    SymbolDictionary,
    /// 4
    IntermediateTextRegion,
    /// 6
    ImmediateTextRegion,
    /// 7
    ImmediateLosslessTextRegion,
    /// 16
    PatternDictionary,
    /// 20
    IntermediateHalftoneRegion,
    /// 22
    ImmediateHalftoneRegion,
    /// 23
    ImmediateLosslessHalftoneRegion,
    /// 36
    IntermediateGenericRegion,
    /// 38
    ImmediateGenericRegion,
    /// 39
    ImmediateLosslessGenericRegion,
    /// 40
    IntermediateGenericRefinementRegion,
    /// 42
    ImmediateGenericRefinementRegion,
    /// 43
    ImmediateLosslessGenericRefinementRegion,
    /// 48
    PageInformation,
    /// 49
    EndOfPage,
    /// 50
    EndOfStripe,
    /// 51
    EndOfFile,
    /// 52
    Profiles,
    /// 53
    Tables,
    /// 54
    ColourPalette,
    /// 62
    Extension,
    /// Any other value. These must not be used.
    Reserved(u8),
}

impl SegmentType {
    /// The type for the 6-bit type field.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::SymbolDictionary,
            4 => Self::IntermediateTextRegion,
            6 => Self::ImmediateTextRegion,
            7 => Self::ImmediateLosslessTextRegion,
            16 => Self::PatternDictionary,
            20 => Self::IntermediateHalftoneRegion,
            22 => Self::ImmediateHalftoneRegion,
            23 => Self::ImmediateLosslessHalftoneRegion,
            36 => Self::IntermediateGenericRegion,
            38 => Self::ImmediateGenericRegion,
            39 => Self::ImmediateLosslessGenericRegion,
            40 => Self::IntermediateGenericRefinementRegion,
            42 => Self::ImmediateGenericRefinementRegion,
            43 => Self::ImmediateLosslessGenericRefinementRegion,
            48 => Self::PageInformation,
            49 => Self::EndOfPage,
            50 => Self::EndOfStripe,
            51 => Self::EndOfFile,
            52 => Self::Profiles,
            53 => Self::Tables,
            54 => Self::ColourPalette,
            62 => Self::Extension,
            other => Self::Reserved(other),
        }
    }

    /// The value of the type field.
    pub fn code(self) -> u8 {
        match self {
            Self::SymbolDictionary => 0,
            Self::IntermediateTextRegion => 4,
            Self::ImmediateTextRegion => 6,
            Self::ImmediateLosslessTextRegion => 7,
            Self::PatternDictionary => 16,
            Self::IntermediateHalftoneRegion => 20,
            Self::ImmediateHalftoneRegion => 22,
            Self::ImmediateLosslessHalftoneRegion => 23,
            Self::IntermediateGenericRegion => 36,
            Self::ImmediateGenericRegion => 38,
            Self::ImmediateLosslessGenericRegion => 39,
            Self::IntermediateGenericRefinementRegion => 40,
            Self::ImmediateGenericRefinementRegion => 42,
            Self::ImmediateLosslessGenericRefinementRegion => 43,
            Self::PageInformation => 48,
            Self::EndOfPage => 49,
            Self::EndOfStripe => 50,
            Self::EndOfFile => 51,
            Self::Profiles => 52,
            Self::Tables => 53,
            Self::ColourPalette => 54,
            Self::Extension => 62,
            Self::Reserved(code) => code,
        }
    }

    /// Whether this is one of the three generic region types.
    pub fn is_generic_region(self) -> bool {
        matches!(
            self,
            Self::IntermediateGenericRegion
                | Self::ImmediateGenericRegion
                | Self::ImmediateLosslessGenericRegion
        )
    }
}

/// A segment header (7.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentHeader {
    /// The segment number.
    pub segment_number: u32,
    /// The segment type.
    pub segment_type: SegmentType,
    /// Whether the segment is retained only by itself and its extensions.
    pub deferred_non_retain: bool,
    /// The page the segment belongs to, 0 for none.
    pub page_association: u32,
    /// The numbers of the segments this one refers to. All of them are lower
    /// than `segment_number`.
    pub referred_to_segments: Vec<u32>,
    /// The length of the data part. `None` if it was unknown when the header
    /// was written, which only immediate generic regions may do.
    pub data_length: Option<u32>,
}

/// A segment header with its data part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    /// The header.
    pub header: SegmentHeader,
    /// The data part. For segments with an unknown length this ends with the
    /// row count.
    pub data: &'a [u8],
}

/// The decoded content of a segment.
#[derive(Debug, Clone)]
pub enum SegmentData {
    /// One of the generic region types.
    GenericRegion(GenericRegion),
    /// A page information segment.
    PageInformation(PageInformation),
    /// The end of a page.
    EndOfPage,
    /// The end of a stripe, with the last row of the stripe.
    EndOfStripe(u32),
    /// The end of the file.
    EndOfFile,
    /// A custom code table.
    Tables(HuffmanTable),
}

impl Segment<'_> {
    /// Decode the data part.
    ///
    /// Segment types without a decoder here yield
    /// [`Unsupported::SegmentType`].
    pub fn decode(&self, settings: &DecodeSettings) -> Result<SegmentData> {
        let segment_type = self.header.segment_type;
        let mut reader = Reader::new(self.data);

        ldebug!(
            "decoding segment {} of type {}",
            self.header.segment_number,
            segment_type.code()
        );

        Ok(match segment_type {
            _ if segment_type.is_generic_region() => SegmentData::GenericRegion(
                generic_region::decode(self.data, self.header.data_length.is_none(), settings)?,
            ),
            SegmentType::PageInformation => {
                SegmentData::PageInformation(PageInformation::parse(&mut reader)?)
            }
            SegmentType::EndOfPage => SegmentData::EndOfPage,
            SegmentType::EndOfStripe => SegmentData::EndOfStripe(
                reader.read_u32().ok_or(DecodeError::TruncatedStream)?,
            ),
            SegmentType::EndOfFile => SegmentData::EndOfFile,
            SegmentType::Tables => SegmentData::Tables(HuffmanTable::read_custom(&mut reader)?),
            other => bail!(Unsupported::SegmentType(other.code())),
        })
    }

    /// Parse the header of a generic region segment without decoding its
    /// bitmap.
    pub fn generic_region_params(&self) -> Result<GenericRegionParams> {
        if !self.header.segment_type.is_generic_region() {
            bail!(Unsupported::SegmentType(self.header.segment_type.code()));
        }

        GenericRegionParams::parse(&mut Reader::new(self.data))
    }
}

/// Parse a segment header (7.2.2 to 7.2.7).
pub fn parse_segment_header(reader: &mut Reader<'_>) -> Result<SegmentHeader> {
    let segment_number = reader.read_u32().ok_or(DecodeError::TruncatedStream)?;
    let flags = reader.read_byte().ok_or(DecodeError::TruncatedStream)?;

    let segment_type = SegmentType::from_code(flags & 0x3F);
    let long_page_association = flags & 0x40 != 0;
    let deferred_non_retain = flags & 0x80 != 0;

    let count_byte = reader.read_byte().ok_or(DecodeError::TruncatedStream)?;
    let referred_to_count = match count_byte >> 5 {
        count @ 0..=4 => u32::from(count),
        7 => {
            let rest = reader.read_bytes(3).ok_or(DecodeError::TruncatedStream)?;
            let count = u32::from_be_bytes([count_byte & 0x1F, rest[0], rest[1], rest[2]]);

            // The retain bits of this segment and every referred segment.
            reader
                .skip_bytes((count as usize + 1).div_ceil(8))
                .ok_or(DecodeError::TruncatedStream)?;

            count
        }
        _ => bail!(HeaderError::InvalidReferredCount),
    };

    // Cap the allocation by what the data can possibly hold.
    let mut referred_to_segments =
        Vec::with_capacity((referred_to_count as usize).min(reader.remaining()));

    for _ in 0..referred_to_count {
        let referred = if segment_number <= 256 {
            reader.read_byte().map(u32::from)
        } else if segment_number <= 65536 {
            reader.read_u16().map(u32::from)
        } else {
            reader.read_u32()
        }
        .ok_or(DecodeError::TruncatedStream)?;

        if referred >= segment_number {
            bail!(HeaderError::ForwardReference);
        }

        referred_to_segments.push(referred);
    }

    let page_association = if long_page_association {
        reader.read_u32()
    } else {
        reader.read_byte().map(u32::from)
    }
    .ok_or(DecodeError::TruncatedStream)?;

    let data_length = match reader.read_u32().ok_or(DecodeError::TruncatedStream)? {
        u32::MAX => None,
        length => Some(length),
    };

    if data_length.is_none() && segment_type != SegmentType::ImmediateGenericRegion {
        bail!(HeaderError::UnexpectedUnknownLength);
    }

    ltrace!(
        "segment {segment_number}: type {}, page {page_association}, refers to {:?}, length {:?}",
        segment_type.code(),
        referred_to_segments,
        data_length
    );

    Ok(SegmentHeader {
        segment_number,
        segment_type,
        deferred_non_retain,
        page_association,
        referred_to_segments,
        data_length,
    })
}

/// Parse a sequence of segments without a file header, as embedded in PDF
/// files.
///
/// Parsing stops after an end of file segment or at the end of the data.
pub fn parse_segments(data: &[u8], organization: Organization) -> Result<Vec<Segment<'_>>> {
    parse_segments_from(&mut Reader::new(data), organization)
}

pub(crate) fn parse_segments_from<'a>(
    reader: &mut Reader<'a>,
    organization: Organization,
) -> Result<Vec<Segment<'a>>> {
    let mut segments = Vec::new();

    match organization {
        Organization::Sequential => {
            while !reader.at_end() {
                let header = parse_segment_header(reader)?;
                let segment = read_segment_data(reader, header)?;
                let is_eof = segment.header.segment_type == SegmentType::EndOfFile;

                segments.push(segment);

                if is_eof {
                    break;
                }
            }
        }
        Organization::RandomAccess => {
            let mut headers = Vec::new();

            while !reader.at_end() {
                let header = parse_segment_header(reader)?;

                // The end of the data can't be found before the data of the
                // earlier segments has been located.
                if header.data_length.is_none() {
                    bail!(HeaderError::UnexpectedUnknownLength);
                }

                let is_eof = header.segment_type == SegmentType::EndOfFile;
                headers.push(header);

                if is_eof {
                    break;
                }
            }

            for header in headers {
                segments.push(read_segment_data(reader, header)?);
            }
        }
    }

    Ok(segments)
}

fn read_segment_data<'a>(reader: &mut Reader<'a>, header: SegmentHeader) -> Result<Segment<'a>> {
    let length = match header.data_length {
        Some(length) => length as usize,
        None => unknown_data_length(reader.tail().ok_or(DecodeError::TruncatedStream)?)?,
    };

    let data = reader
        .read_bytes(length)
        .ok_or(DecodeError::TruncatedStream)?;

    Ok(Segment { header, data })
}

/// Find the length of an immediate generic region whose header gave no length
/// (7.2.7).
///
/// The data ends with `0xFF 0xAC` for arithmetic coding or `0x00 0x00` for
/// MMR coding, followed by the 4-byte row count. The end sequence can only
/// appear after the region segment information field and the region flags.
fn unknown_data_length(data: &[u8]) -> Result<usize> {
    let header_len = RegionSegmentInfo::SIZE + 1;
    let flags = *data
        .get(RegionSegmentInfo::SIZE)
        .ok_or(DecodeError::TruncatedStream)?;

    let marker: [u8; 2] = if flags & 0x01 != 0 {
        [0x00, 0x00]
    } else {
        [0xFF, 0xAC]
    };

    data.windows(6)
        .enumerate()
        .skip(header_len)
        .find(|(_, window)| window[..2] == marker)
        .map(|(start, _)| start + 6)
        .ok_or(HeaderError::MissingEndMarker.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::tests::from_ascii;
    use crate::segment::generic_region::{AdaptivePixel, GbTemplate};
    use crate::segment::region::CombinationOperator;
    use crate::testing::encode_generic;

    #[test]
    fn header_example_1() {
        // T.88 7.2.8, example 1, with a data length appended.
        let data = [
            0x00, 0x00, 0x00, 0x20, 0x86, 0x6B, 0x02, 0x1E, 0x05, 0x04, 0x00, 0x00, 0x00, 0x10,
        ];
        let mut reader = Reader::new(&data);
        let header = parse_segment_header(&mut reader).unwrap();

        assert_eq!(header.segment_number, 32);
        assert_eq!(header.segment_type, SegmentType::ImmediateTextRegion);
        assert!(header.deferred_non_retain);
        assert_eq!(header.referred_to_segments, [2, 30, 5]);
        assert_eq!(header.page_association, 4);
        assert_eq!(header.data_length, Some(16));
        assert!(reader.at_end());
    }

    #[test]
    fn header_example_2() {
        // T.88 7.2.8, example 2, with a data length appended.
        #[rustfmt::skip]
        let data = [
            0x00, 0x00, 0x02, 0x34, 0x40, 0xE0, 0x00, 0x00, 0x09, 0x02, 0xFD, 0x01, 0x00,
            0x00, 0x02, 0x00, 0x1E, 0x00, 0x05, 0x02, 0x00, 0x02, 0x01, 0x02, 0x02, 0x02,
            0x03, 0x02, 0x04, 0x00, 0x00, 0x04, 0x01, 0x00, 0x00, 0x00, 0x20,
        ];
        let mut reader = Reader::new(&data);
        let header = parse_segment_header(&mut reader).unwrap();

        assert_eq!(header.segment_number, 564);
        assert_eq!(header.segment_type, SegmentType::SymbolDictionary);
        assert!(!header.deferred_non_retain);
        assert_eq!(
            header.referred_to_segments,
            [256, 2, 30, 5, 512, 513, 514, 515, 516]
        );
        assert_eq!(header.page_association, 1025);
        assert_eq!(header.data_length, Some(32));
        assert!(reader.at_end());
    }

    #[test]
    fn invalid_headers() {
        let parse = |data: &[u8]| parse_segment_header(&mut Reader::new(data)).err();

        // Referred-to counts of 5 and 6.
        assert_eq!(
            parse(&[0x00, 0x00, 0x00, 0x09, 0x30, 0xA0]),
            Some(DecodeError::MalformedHeader(HeaderError::InvalidReferredCount))
        );
        assert_eq!(
            parse(&[0x00, 0x00, 0x00, 0x09, 0x30, 0xC0]),
            Some(DecodeError::MalformedHeader(HeaderError::InvalidReferredCount))
        );
        // Segment 9 refers to segment 9.
        assert_eq!(
            parse(&[0x00, 0x00, 0x00, 0x09, 0x30, 0x20, 0x09, 0x01, 0x00, 0x00, 0x00, 0x00]),
            Some(DecodeError::MalformedHeader(HeaderError::ForwardReference))
        );
        // Unknown length on a page information segment.
        assert_eq!(
            parse(&[0x00, 0x00, 0x00, 0x00, 0x30, 0x00, 0x01, 0xFF, 0xFF, 0xFF, 0xFF]),
            Some(DecodeError::MalformedHeader(HeaderError::UnexpectedUnknownLength))
        );
        assert_eq!(
            parse(&[0x00, 0x00, 0x00, 0x00, 0x30, 0x00, 0x01, 0x00]),
            Some(DecodeError::TruncatedStream)
        );
    }

    #[test]
    fn segment_type_codes() {
        for code in 0..64 {
            assert_eq!(SegmentType::from_code(code).code(), code);
        }

        assert_eq!(SegmentType::from_code(1), SegmentType::Reserved(1));
        assert_eq!(SegmentType::from_code(63), SegmentType::Reserved(63));
    }

    #[test]
    fn unsupported_types_are_reported() {
        let data = [
            0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x02, 0x31, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00,
        ];
        let segments = parse_segments(&data, Organization::Sequential).unwrap();

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].header.segment_type, SegmentType::SymbolDictionary);
        assert_eq!(
            segments[0].decode(&DecodeSettings::default()).err(),
            Some(DecodeError::UnsupportedFeature(Unsupported::SegmentType(0)))
        );
        assert!(matches!(
            segments[1].decode(&DecodeSettings::default()),
            Ok(SegmentData::EndOfPage)
        ));
    }

    #[test]
    fn random_access_organization() {
        // Two headers (end of stripe with 4 bytes, end of file), then the data.
        let data = [
            0x00, 0x00, 0x00, 0x00, 0x32, 0x00, 0x01, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00,
            0x01, 0x33, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0F,
        ];
        let segments = parse_segments(&data, Organization::RandomAccess).unwrap();

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].data, [0x00, 0x00, 0x00, 0x0F]);
        assert!(segments[1].data.is_empty());
        assert!(matches!(
            segments[0].decode(&DecodeSettings::default()),
            Ok(SegmentData::EndOfStripe(15))
        ));
    }

    fn unknown_length_region(bitmap: &crate::bitmap::Bitmap) -> Vec<u8> {
        let params = GenericRegionParams {
            region: RegionSegmentInfo {
                width: bitmap.width(),
                height: bitmap.height(),
                x: 0,
                y: 0,
                combination_operator: CombinationOperator::Or,
                colour_extension: false,
            },
            mmr: false,
            template: GbTemplate::Template1,
            tpgdon: true,
            adaptive_pixels: vec![AdaptivePixel { x: 2, y: -2 }],
        };

        // Header of segment 1 on page 1, type 38, unknown length.
        let mut data = vec![0x00, 0x00, 0x00, 0x01, 0x26, 0x00, 0x01, 0xFF, 0xFF, 0xFF, 0xFF];
        data.extend_from_slice(&bitmap.width().to_be_bytes());
        // The declared height is larger than the final one.
        data.extend_from_slice(&(bitmap.height() + 10).to_be_bytes());
        data.extend_from_slice(&[0; 8]);
        // No 0xFF in the adaptive pixels, so the scan can't stop early.
        data.extend_from_slice(&[0x00, 0x0A, 0x02, 0xFE]);
        data.extend_from_slice(&encode_generic(bitmap, &params));
        data.extend_from_slice(&bitmap.height().to_be_bytes());

        data
    }

    #[test]
    fn unknown_length_generic_region() {
        let bitmap = from_ascii(&[
            "..##....##..",
            ".#..#..#..#.",
            ".#..#..#..#.",
            "..##....##..",
            "............",
            "############",
        ]);

        let mut data = unknown_length_region(&bitmap);
        // An end of file segment follows.
        data.extend_from_slice(&[0x00, 0x00, 0x00, 0x02, 0x33, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);

        let segments = parse_segments(&data, Organization::Sequential).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].header.data_length, None);
        assert_eq!(segments[1].header.segment_type, SegmentType::EndOfFile);

        let Ok(SegmentData::GenericRegion(region)) =
            segments[0].decode(&DecodeSettings::default())
        else {
            panic!("expected a generic region");
        };

        assert_eq!(region.params.region.height, 6);
        assert_eq!(region.bitmap, bitmap);
    }

    #[test]
    fn unknown_length_needs_sequential_organization() {
        let bitmap = from_ascii(&["#.#.", ".#.#"]);
        let data = unknown_length_region(&bitmap);

        assert_eq!(
            parse_segments(&data, Organization::RandomAccess).err(),
            Some(DecodeError::MalformedHeader(HeaderError::UnexpectedUnknownLength))
        );
    }

    #[test]
    fn unknown_length_without_end_marker() {
        let mut data = vec![0x00, 0x00, 0x00, 0x01, 0x26, 0x00, 0x01, 0xFF, 0xFF, 0xFF, 0xFF];
        data.extend_from_slice(&[0; 18]);
        data.extend_from_slice(&[0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE]);

        assert_eq!(
            parse_segments(&data, Organization::Sequential).err(),
            Some(DecodeError::MalformedHeader(HeaderError::MissingEndMarker))
        );
    }

    #[test]
    fn generic_region_params_without_decoding() {
        let bitmap = from_ascii(&["#.#.", ".#.#"]);
        let data = unknown_length_region(&bitmap);
        let segments = parse_segments(&data, Organization::Sequential).unwrap();

        let params = segments[0].generic_region_params().unwrap();
        assert_eq!(params.template, GbTemplate::Template1);
        assert_eq!(params.region.height, 12);
        assert!(params.tpgdon);
    }
}
