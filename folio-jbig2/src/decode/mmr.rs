//! Generic regions with MMR coding (6.2.6).
//!
//! The data is coded like a CCITT Group 4 fax image with `BlackIs1` set and no
//! byte alignment of rows, which is what the `fax` decoder expects.

use crate::bitmap::Bitmap;
use crate::error::{DataError, Result, Unsupported, bail, err};
use crate::log::ltrace;

const LOOKAHEAD_PADDING: [u8; 4] = [0; 4];

pub(crate) fn decode(data: &[u8], width: u32, height: u32, max_pixels: u64) -> Result<Bitmap> {
    let mut bitmap = Bitmap::with_limit(width, height, max_pixels)?;

    if width == 0 || height == 0 {
        return Ok(bitmap);
    }

    let (Ok(fax_width), Ok(fax_height)) = (u16::try_from(width), u16::try_from(height)) else {
        bail!(Unsupported::MmrDimensions);
    };

    // The G4 decoder looks ahead past the last code of the last row, and
    // coded regions may end right after it.
    let input = data.iter().copied().chain(LOOKAHEAD_PADDING);

    let mut y = 0;
    let finished = fax::decoder::decode_g4(
        input,
        fax_width,
        Some(fax_height),
        |transitions: &[u16]| {
            if y < height {
                fill_row(&mut bitmap, y, transitions);
                y += 1;
            }
        },
    );

    if y < height {
        return err!(DataError::InvalidMmrData);
    }

    if finished.is_none() {
        ltrace!("MMR data of {height} rows has no end of block");
    }

    Ok(bitmap)
}

/// Set the black runs of row `y`. `transitions` holds the positions where the
/// colour changes, starting with white.
fn fill_row(bitmap: &mut Bitmap, y: u32, transitions: &[u16]) {
    let width = bitmap.width();

    for run in transitions.chunks(2) {
        let start = u32::from(run[0]);
        let end = run.get(1).map_or(width, |&end| u32::from(end)).min(width);

        for x in start..end {
            bitmap.set(x, y, true);
        }
    }
}
