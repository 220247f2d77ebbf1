//! Page composition.
//!
//! Regions are drawn onto a page bitmap that starts out filled with the
//! page's default pixel value.

use crate::DecodeSettings;
use crate::bitmap::Bitmap;
use crate::error::{HeaderError, Result, Unsupported, bail};
use crate::log::{ldebug, lwarn};
use crate::reader::Reader;
use crate::segment::page_info::PageInformation;
use crate::segment::{Segment, SegmentType, generic_region};

/// A decoded page.
#[derive(Debug, Clone)]
pub struct Page {
    /// The page number from the segment headers.
    pub number: u32,
    /// The page information segment of the page.
    pub info: PageInformation,
    /// The page bitmap. For pages with an unknown height this is as high as
    /// the last end of stripe row.
    pub bitmap: Bitmap,
}

impl Page {
    /// The width in pixels.
    pub fn width(&self) -> u32 {
        self.bitmap.width()
    }

    /// The height in pixels.
    pub fn height(&self) -> u32 {
        self.bitmap.height()
    }
}

/// Draw the pages described by `segments`.
pub(crate) fn render_pages(
    segments: &[Segment<'_>],
    settings: &DecodeSettings,
) -> Result<Vec<Page>> {
    let mut pages: Vec<Page> = Vec::new();

    for segment in segments {
        let result = render_segment(segment, &mut pages, segments, settings);

        match result {
            Ok(Flow::Continue) => {}
            Ok(Flow::Stop) => break,
            Err(e) if settings.strict => return Err(e),
            Err(e) => {
                lwarn!(
                    "skipping segment {} after error: {e}",
                    segment.header.segment_number
                );
            }
        }
    }

    if pages.is_empty() {
        bail!(HeaderError::MissingPageInformation);
    }

    Ok(pages)
}

enum Flow {
    Continue,
    Stop,
}

fn render_segment(
    segment: &Segment<'_>,
    pages: &mut Vec<Page>,
    segments: &[Segment<'_>],
    settings: &DecodeSettings,
) -> Result<Flow> {
    let page_number = segment.header.page_association;
    let unknown_length = segment.header.data_length.is_none();

    match segment.header.segment_type {
        SegmentType::PageInformation => {
            let info = PageInformation::parse(&mut Reader::new(segment.data))?;
            pages.push(new_page(page_number, info, segments, settings)?);
        }
        SegmentType::ImmediateGenericRegion | SegmentType::ImmediateLosslessGenericRegion => {
            let region = generic_region::decode(segment.data, unknown_length, settings)?;
            let page = find_page(pages, page_number)?;
            let operator = region.combination_operator();
            let flags = page.info.flags;

            if !flags.combination_operator_overridden
                && operator != flags.default_combination_operator
            {
                ldebug!(
                    "region uses {operator:?} although the page default is {:?}",
                    flags.default_combination_operator
                );
            }

            page.bitmap.combine(
                &region.bitmap,
                i64::from(region.x()),
                i64::from(region.y()),
                operator,
            );
        }
        SegmentType::IntermediateGenericRegion => {
            // Only refinement regions consume intermediate results.
            generic_region::decode(segment.data, unknown_length, settings)?;
            ldebug!(
                "intermediate region {} is not drawn",
                segment.header.segment_number
            );
        }
        SegmentType::IntermediateTextRegion
        | SegmentType::ImmediateTextRegion
        | SegmentType::ImmediateLosslessTextRegion
        | SegmentType::IntermediateHalftoneRegion
        | SegmentType::ImmediateHalftoneRegion
        | SegmentType::ImmediateLosslessHalftoneRegion
        | SegmentType::IntermediateGenericRefinementRegion
        | SegmentType::ImmediateGenericRefinementRegion
        | SegmentType::ImmediateLosslessGenericRefinementRegion => {
            let code = segment.header.segment_type.code();

            if settings.strict {
                bail!(Unsupported::SegmentType(code));
            }

            lwarn!(
                "page {page_number} is incomplete, segment {} of type {code} is not supported",
                segment.header.segment_number
            );
        }
        SegmentType::EndOfFile => return Ok(Flow::Stop),
        SegmentType::Reserved(code) => {
            lwarn!("ignoring segment with reserved type {code}");
        }
        // The height of striped pages is known once the page is created, and
        // the remaining types never paint the page.
        SegmentType::EndOfPage
        | SegmentType::EndOfStripe
        | SegmentType::SymbolDictionary
        | SegmentType::PatternDictionary
        | SegmentType::Profiles
        | SegmentType::Tables
        | SegmentType::ColourPalette
        | SegmentType::Extension => {}
    }

    Ok(Flow::Continue)
}

fn new_page(
    number: u32,
    info: PageInformation,
    segments: &[Segment<'_>],
    settings: &DecodeSettings,
) -> Result<Page> {
    let height = match info.height {
        Some(height) => height,
        None => stripe_height(segments, number).ok_or(HeaderError::UnknownPageHeight)?,
    };

    let mut bitmap = Bitmap::with_limit(info.width, height, settings.max_bitmap_pixels)?;
    if info.flags.default_pixel {
        bitmap.fill(true);
    }

    ldebug!("page {number}: {}x{height}", info.width);

    Ok(Page {
        number,
        info,
        bitmap,
    })
}

/// The page height implied by the end of stripe segments of page `number`,
/// which is one more than the largest end row.
fn stripe_height(segments: &[Segment<'_>], number: u32) -> Option<u32> {
    segments
        .iter()
        .filter(|s| {
            s.header.segment_type == SegmentType::EndOfStripe && s.header.page_association == number
        })
        .filter_map(|s| Reader::new(s.data).read_u32())
        .max()?
        .checked_add(1)
}

/// The page a segment is associated with. Segments of PDF streams don't always
/// name the page correctly, so the most recent page is used if none matches.
fn find_page(pages: &mut [Page], number: u32) -> Result<&mut Page> {
    let index = pages
        .iter()
        .rposition(|p| p.number == number)
        .or(pages.len().checked_sub(1))
        .ok_or(HeaderError::MissingPageInformation)?;

    Ok(&mut pages[index])
}
