/*!
A memory-safe, pure-Rust JBIG2 decoder.

`folio-jbig2` decodes the bi-level images of ITU-T T.88 (ISO/IEC 14492) that
PDF documents embed with the `JBIG2Decode` filter. It covers the parts needed
to draw generic regions: the segment syntax, the MQ arithmetic decoder with its
integer procedures, the standard and custom Huffman tables, MMR coded regions
and page composition. Text, halftone and refinement regions are recognized but
not decoded.

# Example
```rust,no_run
use folio_jbig2::{DecodeSettings, decode_embedded};

let data = std::fs::read("image.jb2e").unwrap();
let globals = std::fs::read("image.jb2g").unwrap();
let page = decode_embedded(&data, Some(&globals), &DecodeSettings::default()).unwrap();

println!("{}x{} page", page.width(), page.height());
```

For callers that drive decoding themselves, [`parse_segments`] and
[`Segment::decode`] give access to single segments.

# Cargo features
- `logging` (default): report skipped segments and tolerated anomalies through
  the `log` crate.
- `image` (default): convert bitmaps into [`image::GrayImage`]s.

# Safety
This crate forbids unsafe code via a crate-level attribute.
*/

#![forbid(unsafe_code)]

mod arithmetic_decoder;
mod bitmap;
mod decode;
mod error;
mod file;
mod huffman_table;
mod integer_decoder;
mod log;
mod page;
mod reader;
mod segment;
mod stats;

#[cfg(test)]
mod testing;

pub use arithmetic_decoder::ArithmeticDecoder;
pub use bitmap::{Bitmap, MAX_BITMAP_PIXELS};
pub use error::{DataError, DecodeError, HeaderError, Result, Unsupported};
pub use file::{FILE_SIGNATURE, File, FileHeader, parse_file};
pub use huffman_table::{HuffmanTable, TableLine, standard_table};
pub use integer_decoder::IntegerValue;
pub use page::Page;
pub use reader::Reader;
pub use segment::generic_region::{AdaptivePixel, GbTemplate, GenericRegion, GenericRegionParams};
pub use segment::page_info::{PageFlags, PageInformation, PageStriping};
pub use segment::region::{CombinationOperator, RegionSegmentInfo};
pub use segment::{
    Segment, SegmentData, SegmentHeader, SegmentType, parse_segment_header, parse_segments,
};
pub use stats::{Context, DecoderStats};

use crate::log::ldebug;

/// How the segments of a stream are arranged (7.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Organization {
    /// Every segment header is directly followed by its data.
    #[default]
    Sequential,
    /// All segment headers come first, followed by the data of all segments.
    RandomAccess,
}

/// Settings that control decoding.
#[derive(Debug, Clone, Copy)]
pub struct DecodeSettings {
    /// The organization of embedded streams. Standalone files carry their own
    /// organization in the file header, which takes precedence.
    pub organization: Organization,
    /// Stop at the first segment that fails to decode instead of skipping it.
    pub strict: bool,
    /// The largest number of pixels a single bitmap may have.
    pub max_bitmap_pixels: u64,
}

impl Default for DecodeSettings {
    fn default() -> Self {
        Self {
            organization: Organization::Sequential,
            strict: false,
            max_bitmap_pixels: MAX_BITMAP_PIXELS,
        }
    }
}

/// Decode a JBIG2 stream embedded in a PDF.
///
/// `globals` holds the segments of the `JBIG2Globals` stream, if any. They are
/// always sequential and are processed before the segments of `data`. The
/// first page of the stream is returned.
pub fn decode_embedded(
    data: &[u8],
    globals: Option<&[u8]>,
    settings: &DecodeSettings,
) -> Result<Page> {
    let mut segments = match globals {
        Some(globals) => parse_segments(globals, Organization::Sequential)?,
        None => Vec::new(),
    };
    let global_count = segments.len();

    segments.extend(parse_segments(data, settings.organization)?);

    ldebug!(
        "embedded stream with {} global and {} page segments",
        global_count,
        segments.len() - global_count
    );

    page::render_pages(&segments, settings)?
        .into_iter()
        .next()
        .ok_or(DecodeError::MalformedHeader(HeaderError::MissingPageInformation))
}

/// Decode all pages of a standalone JBIG2 file.
pub fn decode_file(data: &[u8], settings: &DecodeSettings) -> Result<Vec<Page>> {
    let file = parse_file(data)?;
    let settings = DecodeSettings {
        organization: file.header.organization,
        ..*settings
    };

    page::render_pages(&file.segments, &settings)
}
