//! Page information segments (7.4.8).

use crate::error::{DecodeError, Result};
use crate::reader::Reader;
use crate::segment::region::CombinationOperator;

/// The data of a page information segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInformation {
    /// The page width in pixels.
    pub width: u32,
    /// The page height in pixels. `None` if the height was unknown when the
    /// page was coded, in which case the page is striped and its height
    /// follows from its end of stripe segments.
    pub height: Option<u32>,
    /// Horizontal resolution in pixels per metre, if known.
    pub x_resolution: Option<u32>,
    /// Vertical resolution in pixels per metre, if known.
    pub y_resolution: Option<u32>,
    /// The page flags.
    pub flags: PageFlags,
    /// The striping information.
    pub striping: PageStriping,
}

/// Page segment flags (7.4.8.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageFlags {
    /// The file contains enough information to reconstruct the page losslessly.
    pub is_lossless: bool,
    /// Refinement regions may be associated with the page.
    pub might_contain_refinements: bool,
    /// The initial value of every page pixel, `true` for black.
    pub default_pixel: bool,
    /// The default combination operator of the page. Only OR, AND, XOR and
    /// XNOR can be expressed.
    pub default_combination_operator: CombinationOperator,
    /// Regions of the page may need auxiliary buffers.
    pub requires_auxiliary_buffers: bool,
    /// Regions may use operators other than the default one.
    pub combination_operator_overridden: bool,
    /// Coloured regions may be associated with the page.
    pub might_contain_coloured: bool,
}

/// Page striping information (7.4.8.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageStriping {
    /// Whether the page may have end of stripe segments.
    pub is_striped: bool,
    /// The largest height of a stripe.
    pub max_stripe_size: u16,
}

impl PageInformation {
    /// The size of the segment data in bytes.
    pub(crate) const SIZE: usize = 19;

    pub(crate) fn parse(reader: &mut Reader<'_>) -> Result<Self> {
        let width = reader.read_u32().ok_or(DecodeError::TruncatedStream)?;
        let height = reader.read_u32().ok_or(DecodeError::TruncatedStream)?;
        let x_resolution = reader.read_u32().ok_or(DecodeError::TruncatedStream)?;
        let y_resolution = reader.read_u32().ok_or(DecodeError::TruncatedStream)?;
        let flags = reader.read_byte().ok_or(DecodeError::TruncatedStream)?;
        let striping = reader.read_u16().ok_or(DecodeError::TruncatedStream)?;

        Ok(Self {
            width,
            height: (height != u32::MAX).then_some(height),
            x_resolution: (x_resolution != 0).then_some(x_resolution),
            y_resolution: (y_resolution != 0).then_some(y_resolution),
            flags: PageFlags::from_byte(flags),
            striping: PageStriping {
                is_striped: striping & 0x8000 != 0,
                max_stripe_size: striping & 0x7FFF,
            },
        })
    }
}

impl PageFlags {
    fn from_byte(flags: u8) -> Self {
        let default_combination_operator = match (flags >> 3) & 0x03 {
            0 => CombinationOperator::Or,
            1 => CombinationOperator::And,
            2 => CombinationOperator::Xor,
            _ => CombinationOperator::Xnor,
        };

        Self {
            is_lossless: flags & 0x01 != 0,
            might_contain_refinements: flags & 0x02 != 0,
            default_pixel: flags & 0x04 != 0,
            default_combination_operator,
            requires_auxiliary_buffers: flags & 0x20 != 0,
            combination_operator_overridden: flags & 0x40 != 0,
            might_contain_coloured: flags & 0x80 != 0,
        }
    }
}
