//! Generic region segments (7.4.6).

use crate::DecodeSettings;
use crate::bitmap::Bitmap;
use crate::decode::{generic, mmr};
use crate::error::{DecodeError, HeaderError, Result, Unsupported, bail};
use crate::log::ltrace;
use crate::reader::Reader;
use crate::segment::region::{CombinationOperator, RegionSegmentInfo};

/// The context template of the generic region decoding procedure (GBTEMPLATE).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GbTemplate {
    /// 16 context pixels, 4 of them adaptive.
    Template0,
    /// 13 context pixels, 1 of them adaptive.
    Template1,
    /// 10 context pixels, 1 of them adaptive.
    Template2,
    /// 10 context pixels on two rows, 1 of them adaptive.
    Template3,
}

impl GbTemplate {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::Template0,
            1 => Self::Template1,
            2 => Self::Template2,
            _ => Self::Template3,
        }
    }

    /// The number of bits in a context value.
    pub fn context_bits(self) -> u8 {
        match self {
            Self::Template0 => 16,
            Self::Template1 => 13,
            Self::Template2 | Self::Template3 => 10,
        }
    }

    /// The number of adaptive template pixels.
    pub fn adaptive_pixel_count(self) -> usize {
        match self {
            Self::Template0 => 4,
            _ => 1,
        }
    }
}

/// An adaptive template pixel, relative to the pixel being decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdaptivePixel {
    /// Horizontal offset.
    pub x: i8,
    /// Vertical offset, never positive.
    pub y: i8,
}

/// The header of a generic region segment (7.4.6.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericRegionParams {
    /// Size, placement and combination operator.
    pub region: RegionSegmentInfo,
    /// Whether the bitmap is MMR coded.
    pub mmr: bool,
    /// The context template for arithmetic coding.
    pub template: GbTemplate,
    /// Whether typical prediction is used (TPGDON).
    pub tpgdon: bool,
    /// The adaptive template pixels. Empty for MMR coded regions.
    pub adaptive_pixels: Vec<AdaptivePixel>,
}

impl GenericRegionParams {
    /// Parse the region information, the flags and the adaptive template
    /// pixels, leaving the reader at the start of the coded data.
    pub(crate) fn parse(reader: &mut Reader<'_>) -> Result<Self> {
        let region = RegionSegmentInfo::parse(reader)?;
        let flags = reader.read_byte().ok_or(DecodeError::TruncatedStream)?;

        let mmr = flags & 0x01 != 0;
        let template = GbTemplate::from_bits(flags >> 1);
        let tpgdon = flags & 0x08 != 0;

        if flags & 0xE0 != 0 {
            bail!(HeaderError::ReservedBits);
        }

        if flags & 0x10 != 0 {
            bail!(Unsupported::ExtendedTemplate);
        }

        if mmr && template != GbTemplate::Template0 {
            bail!(HeaderError::MmrWithTemplate);
        }

        let adaptive_pixels = if mmr {
            Vec::new()
        } else {
            (0..template.adaptive_pixel_count())
                .map(|_| parse_adaptive_pixel(reader))
                .collect::<Result<Vec<_>>>()?
        };

        Ok(Self {
            region,
            mmr,
            template,
            tpgdon,
            adaptive_pixels,
        })
    }
}

/// Read one adaptive template pixel (7.4.6.3). It has to refer to a pixel that
/// is decoded before the current one (6.2.5.4).
fn parse_adaptive_pixel(reader: &mut Reader<'_>) -> Result<AdaptivePixel> {
    let x = reader.read_byte().ok_or(DecodeError::TruncatedStream)? as i8;
    let y = reader.read_byte().ok_or(DecodeError::TruncatedStream)? as i8;

    if y > 0 || (y == 0 && x >= 0) {
        bail!(HeaderError::InvalidAtPixel);
    }

    Ok(AdaptivePixel { x, y })
}

/// A decoded generic region.
#[derive(Debug, Clone)]
pub struct GenericRegion {
    /// The parsed header. For unknown-length segments the height is the row
    /// count found at the end of the data.
    pub params: GenericRegionParams,
    /// The decoded bitmap.
    pub bitmap: Bitmap,
}

impl GenericRegion {
    /// The horizontal offset on the page.
    pub fn x(&self) -> u32 {
        self.params.region.x
    }

    /// The vertical offset on the page.
    pub fn y(&self) -> u32 {
        self.params.region.y
    }

    /// How the bitmap is combined with the page.
    pub fn combination_operator(&self) -> CombinationOperator {
        self.params.region.combination_operator
    }
}

/// Decode the data part of a generic region segment (6.2).
///
/// `unknown_length` is set for immediate regions whose header had a data
/// length of `0xFFFFFFFF`. Their data ends with a 4-byte row count that
/// replaces the height given in the region information (7.4.6.4).
pub(crate) fn decode(
    data: &[u8],
    unknown_length: bool,
    settings: &DecodeSettings,
) -> Result<GenericRegion> {
    let mut reader = Reader::new(data);
    let mut params = GenericRegionParams::parse(&mut reader)?;
    let mut coded = reader.tail().ok_or(DecodeError::TruncatedStream)?;

    if unknown_length {
        let split = coded
            .len()
            .checked_sub(4)
            .ok_or(DecodeError::TruncatedStream)?;
        let (head, tail) = coded.split_at(split);
        let row_count = Reader::new(tail)
            .read_u32()
            .ok_or(DecodeError::TruncatedStream)?;

        if row_count > params.region.height {
            bail!(HeaderError::RowCountTooLarge);
        }

        params.region.height = row_count;
        coded = head;
    }

    ltrace!(
        "generic region {}x{} at ({}, {}), mmr: {}, template: {:?}, tpgdon: {}",
        params.region.width,
        params.region.height,
        params.region.x,
        params.region.y,
        params.mmr,
        params.template,
        params.tpgdon
    );

    let bitmap = if params.mmr {
        mmr::decode(
            coded,
            params.region.width,
            params.region.height,
            settings.max_bitmap_pixels,
        )?
    } else {
        generic::decode(coded, &params, settings.max_bitmap_pixels)?
    };

    Ok(GenericRegion { params, bitmap })
}
