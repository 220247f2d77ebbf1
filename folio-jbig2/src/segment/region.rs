//! The region segment information field (7.4.1).

use crate::error::{DecodeError, HeaderError, Result, bail, err};
use crate::reader::Reader;

/// How a region bitmap is combined with the page bitmap (7.4.1.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinationOperator {
    /// 0
    Or,
    /// 1
    And,
    /// 2
    Xor,
    /// 3
    Xnor,
    /// 4
    Replace,
}

impl CombinationOperator {
    /// Map the 3-bit operator field. Values 5 to 7 are invalid.
    pub(crate) fn from_value(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Or),
            1 => Ok(Self::And),
            2 => Ok(Self::Xor),
            3 => Ok(Self::Xnor),
            4 => Ok(Self::Replace),
            _ => err!(HeaderError::InvalidCombinationOperator),
        }
    }

    /// The new page pixel for the page pixel `page` and region pixel `region`.
    #[inline]
    pub fn apply(self, page: bool, region: bool) -> bool {
        match self {
            Self::Or => page | region,
            Self::And => page & region,
            Self::Xor => page ^ region,
            Self::Xnor => !(page ^ region),
            Self::Replace => region,
        }
    }
}

/// Size, placement and combination operator of a region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionSegmentInfo {
    /// The bitmap width in pixels.
    pub width: u32,
    /// The bitmap height in pixels.
    pub height: u32,
    /// The horizontal offset of the bitmap on the page.
    pub x: u32,
    /// The vertical offset of the bitmap on the page.
    pub y: u32,
    /// How the bitmap is combined with the page.
    pub combination_operator: CombinationOperator,
    /// Whether the region carries a colour extension (COLEXTFLAG).
    pub colour_extension: bool,
}

impl RegionSegmentInfo {
    /// The size of the field in bytes.
    pub(crate) const SIZE: usize = 17;

    /// Parse the 17-byte field.
    pub(crate) fn parse(reader: &mut Reader<'_>) -> Result<Self> {
        let width = reader.read_u32().ok_or(DecodeError::TruncatedStream)?;
        let height = reader.read_u32().ok_or(DecodeError::TruncatedStream)?;
        let x = reader.read_u32().ok_or(DecodeError::TruncatedStream)?;
        let y = reader.read_u32().ok_or(DecodeError::TruncatedStream)?;
        let flags = reader.read_byte().ok_or(DecodeError::TruncatedStream)?;

        // Bits 4-7 are reserved.
        if flags & 0xF0 != 0 {
            bail!(HeaderError::ReservedBits);
        }

        Ok(Self {
            width,
            height,
            x,
            y,
            combination_operator: CombinationOperator::from_value(flags & 0x07)?,
            colour_extension: flags & 0x08 != 0,
        })
    }
}
