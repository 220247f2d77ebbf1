//! Packed bi-level bitmaps.

use crate::error::{HeaderError, Result, bail};
use crate::segment::region::CombinationOperator;

/// The largest number of pixels a bitmap may have unless a lower limit is
/// configured in [`DecodeSettings`](crate::DecodeSettings).
pub const MAX_BITMAP_PIXELS: u64 = 1 << 32;

/// A bi-level image.
///
/// Rows are stored top to bottom, one bit per pixel with the leftmost pixel in
/// the most significant bit. Every row starts on a byte boundary, so the
/// trailing bits of a row are padding and always 0. A set bit is black.
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    stride: usize,
    data: Vec<u8>,
}

impl Bitmap {
    /// Create a white bitmap.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Self::with_limit(width, height, MAX_BITMAP_PIXELS)
    }

    /// Create a white bitmap, failing if it has more than `max_pixels` pixels.
    pub(crate) fn with_limit(width: u32, height: u32, max_pixels: u64) -> Result<Self> {
        let pixels = u64::from(width) * u64::from(height);

        if pixels > max_pixels.min(MAX_BITMAP_PIXELS) {
            bail!(HeaderError::BitmapTooLarge);
        }

        let stride = (width as usize).div_ceil(8);

        Ok(Self {
            width,
            height,
            stride,
            data: vec![0; stride * height as usize],
        })
    }

    /// The width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// The height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The number of bytes per row.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The packed rows.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Whether the pixel at `(x, y)` is black. Pixels outside of the bitmap are
    /// white.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }

        let byte = self.data[y as usize * self.stride + (x as usize >> 3)];
        (byte >> (7 - (x & 7))) & 1 != 0
    }

    /// Set the pixel at `(x, y)`. Writes outside of the bitmap are ignored.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, black: bool) {
        if x >= self.width || y >= self.height {
            return;
        }

        let byte = &mut self.data[y as usize * self.stride + (x as usize >> 3)];
        let mask = 0x80 >> (x & 7);

        if black {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
    }

    /// The pixel at a signed position as 0 or 1, with 0 for every position
    /// outside of the bitmap (6.2.5.2).
    #[inline(always)]
    pub(crate) fn pixel(&self, x: i64, y: i64) -> u32 {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            0
        } else {
            u32::from(self.get(x as u32, y as u32))
        }
    }

    /// Set every pixel to the same value.
    pub(crate) fn fill(&mut self, black: bool) {
        self.data.fill(if black { 0xFF } else { 0 });
        self.clear_padding();
    }

    /// Copy row `src` over row `dst`.
    pub(crate) fn copy_row(&mut self, src: u32, dst: u32) {
        let stride = self.stride;
        let src = src as usize * stride;

        self.data
            .copy_within(src..src + stride, dst as usize * stride);
    }

    fn clear_padding(&mut self) {
        let padding = (self.stride * 8) as u32 - self.width;

        if padding == 0 {
            return;
        }

        let mask = 0xFF_u8 << padding;
        for row in self.data.chunks_exact_mut(self.stride) {
            if let Some(last) = row.last_mut() {
                *last &= mask;
            }
        }
    }

    /// Combine `other` into this bitmap with its top-left corner at `(x, y)`.
    ///
    /// Parts of `other` that fall outside of this bitmap are ignored.
    pub fn combine(&mut self, other: &Self, x: i64, y: i64, operator: CombinationOperator) {
        for sy in 0..other.height {
            let dy = y + i64::from(sy);
            if dy < 0 {
                continue;
            }
            if dy >= i64::from(self.height) {
                break;
            }

            for sx in 0..other.width {
                let dx = x + i64::from(sx);
                if dx < 0 {
                    continue;
                }
                if dx >= i64::from(self.width) {
                    break;
                }

                let (dx, dy) = (dx as u32, dy as u32);
                let src = other.get(sx, sy);
                let dst = self.get(dx, dy);

                self.set(dx, dy, operator.apply(dst, src));
            }
        }
    }

    /// Convert into an 8-bit grayscale image with black as 0 and white as 255.
    #[cfg(feature = "image")]
    pub fn to_luma_image(&self) -> image::GrayImage {
        image::GrayImage::from_fn(self.width, self.height, |x, y| {
            image::Luma([if self.get(x, y) { 0 } else { 255 }])
        })
    }
}

impl core::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "Bitmap {}x{}", self.width, self.height)?;

        for y in 0..self.height.min(64) {
            for x in 0..self.width.min(128) {
                f.write_str(if self.get(x, y) { "#" } else { "." })?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}
