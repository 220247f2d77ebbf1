//! The generic region decoding procedure with arithmetic coding (6.2.5).

use smallvec::SmallVec;

use crate::arithmetic_decoder::ArithmeticDecoder;
use crate::bitmap::Bitmap;
use crate::error::{HeaderError, Result};
use crate::segment::generic_region::{AdaptivePixel, GbTemplate, GenericRegionParams};
use crate::stats::DecoderStats;

/// One pixel of a context template.
#[derive(Debug, Clone, Copy)]
enum TemplatePixel {
    /// A fixed offset from the current pixel.
    Fixed(i8, i8),
    /// The adaptive pixel with the given index (A1 is 0).
    Adaptive(u8),
}

use TemplatePixel::{Adaptive as At, Fixed as Px};

// Figures 3 to 6. The first entry ends up in the most significant bit of the
// context value.
#[rustfmt::skip]
const TEMPLATE_0: [TemplatePixel; 16] = [
    At(3), Px(-1, -2), Px(0, -2), Px(1, -2), At(2),
    At(1), Px(-2, -1), Px(-1, -1), Px(0, -1), Px(1, -1), Px(2, -1), At(0),
    Px(-4, 0), Px(-3, 0), Px(-2, 0), Px(-1, 0),
];

#[rustfmt::skip]
const TEMPLATE_1: [TemplatePixel; 13] = [
    Px(-1, -2), Px(0, -2), Px(1, -2), Px(2, -2),
    Px(-2, -1), Px(-1, -1), Px(0, -1), Px(1, -1), Px(2, -1), At(0),
    Px(-3, 0), Px(-2, 0), Px(-1, 0),
];

#[rustfmt::skip]
const TEMPLATE_2: [TemplatePixel; 10] = [
    Px(-1, -2), Px(0, -2), Px(1, -2),
    Px(-2, -1), Px(-1, -1), Px(0, -1), Px(1, -1), At(0),
    Px(-2, 0), Px(-1, 0),
];

#[rustfmt::skip]
const TEMPLATE_3: [TemplatePixel; 10] = [
    Px(-3, -1), Px(-2, -1), Px(-1, -1), Px(0, -1), Px(1, -1), At(0),
    Px(-4, 0), Px(-3, 0), Px(-2, 0), Px(-1, 0),
];

fn layout(template: GbTemplate) -> &'static [TemplatePixel] {
    match template {
        GbTemplate::Template0 => &TEMPLATE_0,
        GbTemplate::Template1 => &TEMPLATE_1,
        GbTemplate::Template2 => &TEMPLATE_2,
        GbTemplate::Template3 => &TEMPLATE_3,
    }
}

/// The context used to decode SLTP (Figures 8 to 11).
pub(crate) fn sltp_context(template: GbTemplate) -> usize {
    match template {
        GbTemplate::Template0 => 0x9B25,
        GbTemplate::Template1 => 0x0795,
        GbTemplate::Template2 => 0x00E5,
        GbTemplate::Template3 => 0x0195,
    }
}

/// A context template with its adaptive pixels resolved to offsets.
#[derive(Debug, Clone)]
pub(crate) struct ContextTemplate {
    offsets: SmallVec<[(i64, i64); 16]>,
}

impl ContextTemplate {
    pub(crate) fn new(template: GbTemplate, adaptive_pixels: &[AdaptivePixel]) -> Result<Self> {
        let offsets = layout(template)
            .iter()
            .map(|pixel| match *pixel {
                TemplatePixel::Fixed(x, y) => Ok((i64::from(x), i64::from(y))),
                TemplatePixel::Adaptive(i) => adaptive_pixels
                    .get(usize::from(i))
                    .map(|at| (i64::from(at.x), i64::from(at.y)))
                    .ok_or(HeaderError::InvalidAtPixel.into()),
            })
            .collect::<Result<_>>()?;

        Ok(Self { offsets })
    }

    /// The context value of the pixel at `(x, y)` (6.2.5.3).
    #[inline(always)]
    pub(crate) fn context(&self, bitmap: &Bitmap, x: u32, y: u32) -> usize {
        let (x, y) = (i64::from(x), i64::from(y));

        self.offsets.iter().fold(0, |cx, &(dx, dy)| {
            (cx << 1) | bitmap.pixel(x + dx, y + dy) as usize
        })
    }
}

/// Decode a generic region bitmap from `data` with fresh statistics.
pub(crate) fn decode(
    data: &[u8],
    params: &GenericRegionParams,
    max_pixels: u64,
) -> Result<Bitmap> {
    let width = params.region.width;
    let height = params.region.height;
    let bitmap = Bitmap::with_limit(width, height, max_pixels)?;

    if width == 0 || height == 0 {
        return Ok(bitmap);
    }

    let mut decoder = ArithmeticDecoder::new(data)?;
    let mut stats = DecoderStats::for_template(params.template);

    decode_into(bitmap, &mut decoder, &mut stats, params)
}

/// Decode the rows of `bitmap` (6.2.5.7).
///
/// The statistics are not reset, so callers can carry them from one region to
/// the next.
pub(crate) fn decode_into(
    mut bitmap: Bitmap,
    decoder: &mut ArithmeticDecoder<'_>,
    stats: &mut DecoderStats,
    params: &GenericRegionParams,
) -> Result<Bitmap> {
    let template = ContextTemplate::new(params.template, &params.adaptive_pixels)?;
    let sltp = sltp_context(params.template);

    let mut ltp = false;

    for y in 0..bitmap.height() {
        if params.tpgdon {
            ltp ^= decoder.decode_bit(stats, sltp)? == 1;
        }

        // A typical row repeats the row above, and the row above the first one
        // is white.
        if ltp {
            if y > 0 {
                bitmap.copy_row(y - 1, y);
            }

            continue;
        }

        for x in 0..bitmap.width() {
            let cx = template.context(&bitmap, x, y);

            if decoder.decode_bit(stats, cx)? == 1 {
                bitmap.set(x, y, true);
            }
        }
    }

    Ok(bitmap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::tests::from_ascii;
    use crate::segment::region::{CombinationOperator, RegionSegmentInfo};
    use crate::testing::encode_generic;

    const NOMINAL_AT: [AdaptivePixel; 4] = [
        AdaptivePixel { x: 3, y: -1 },
        AdaptivePixel { x: -3, y: -1 },
        AdaptivePixel { x: 2, y: -2 },
        AdaptivePixel { x: -2, y: -2 },
    ];

    fn params(bitmap: &Bitmap, template: GbTemplate, tpgdon: bool) -> GenericRegionParams {
        let at = match template {
            GbTemplate::Template0 => NOMINAL_AT.to_vec(),
            GbTemplate::Template1 => vec![AdaptivePixel { x: 3, y: -1 }],
            _ => vec![AdaptivePixel { x: 2, y: -1 }],
        };

        GenericRegionParams {
            region: RegionSegmentInfo {
                width: bitmap.width(),
                height: bitmap.height(),
                x: 0,
                y: 0,
                combination_operator: CombinationOperator::Or,
                colour_extension: false,
            },
            mmr: false,
            template,
            tpgdon,
            adaptive_pixels: at,
        }
    }

    fn sample() -> Bitmap {
        from_ascii(&[
            "......................................",
            "......................................",
            "..####......#####.....##......##......",
            "..#...#.....#.........###....###......",
            "..#...#.....#.........#.##..##.#......",
            "..####......####......#..####..#......",
            "..#...#.....#.........#...##...#......",
            "..#...#.....#.........#........#......",
            "..####......#####.....#........#......",
            "......................................",
            "......................................",
            "#.#.#.#.#.#.#.#.#.#.#.#.#.#.#.#.#.#.#.",
            "#.#.#.#.#.#.#.#.#.#.#.#.#.#.#.#.#.#.#.",
            ".#.#.#.#.#.#.#.#.#.#.#.#.#.#.#.#.#.#.#",
            "######################################",
        ])
    }

    #[test]
    fn template_0_context_bit_order() {
        // Only the pixel two to the left of (4, 2) is black, which is bit 1.
        let mut bitmap = Bitmap::new(8, 4).unwrap();
        bitmap.set(2, 2, true);
        let template = ContextTemplate::new(GbTemplate::Template0, &NOMINAL_AT).unwrap();
        assert_eq!(template.context(&bitmap, 4, 2), 0b10);

        // A4 at (-2, -2) is the most significant bit.
        let mut bitmap = Bitmap::new(8, 4).unwrap();
        bitmap.set(2, 0, true);
        assert_eq!(template.context(&bitmap, 4, 2), 0x8000);
    }

    #[test]
    fn sltp_contexts() {
        assert_eq!(sltp_context(GbTemplate::Template0), 0b1001_1011_0010_0101);
        assert_eq!(sltp_context(GbTemplate::Template1), 0b0_0111_1001_0101);
        assert_eq!(sltp_context(GbTemplate::Template2), 0b00_1110_0101);
        assert_eq!(sltp_context(GbTemplate::Template3), 0b01_1001_0101);
    }

    #[test]
    fn missing_adaptive_pixels() {
        assert!(ContextTemplate::new(GbTemplate::Template0, &NOMINAL_AT[..3]).is_err());
        assert!(ContextTemplate::new(GbTemplate::Template3, &[]).is_err());
    }

    #[test]
    fn decodes_every_template() {
        let bitmap = sample();

        for template in [
            GbTemplate::Template0,
            GbTemplate::Template1,
            GbTemplate::Template2,
            GbTemplate::Template3,
        ] {
            for tpgdon in [false, true] {
                let params = params(&bitmap, template, tpgdon);
                let data = encode_generic(&bitmap, &params);
                let decoded = decode(&data, &params, u64::MAX).unwrap();

                assert_eq!(decoded, bitmap, "{template:?}, tpgdon: {tpgdon}");
            }
        }
    }

    #[test]
    fn typical_prediction_without_pixels() {
        // Every row equals the row above, so only SLTP bits are coded.
        let bitmap = Bitmap::new(100, 50).unwrap();
        let params = params(&bitmap, GbTemplate::Template2, true);
        let data = encode_generic(&bitmap, &params);

        assert!(data.len() < 16);
        assert_eq!(decode(&data, &params, u64::MAX).unwrap(), bitmap);
    }

    #[test]
    fn unusual_adaptive_pixels() {
        let bitmap = sample();
        let mut params = params(&bitmap, GbTemplate::Template0, false);
        params.adaptive_pixels = vec![
            AdaptivePixel { x: -128, y: -1 },
            AdaptivePixel { x: 127, y: -128 },
            AdaptivePixel { x: -1, y: 0 },
            AdaptivePixel { x: -5, y: 0 },
        ];

        let data = encode_generic(&bitmap, &params);
        assert_eq!(decode(&data, &params, u64::MAX).unwrap(), bitmap);
    }

    #[test]
    fn deterministic() {
        let bitmap = sample();
        let params = params(&bitmap, GbTemplate::Template1, true);
        let data = encode_generic(&bitmap, &params);

        let first = decode(&data, &params, u64::MAX).unwrap();
        let second = decode(&data, &params, u64::MAX).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn independent_regions_on_threads() {
        let bitmap = sample();
        let params = params(&bitmap, GbTemplate::Template0, true);
        let data = encode_generic(&bitmap, &params);

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| decode(&data, &params, u64::MAX).unwrap()))
                .collect();

            for handle in handles {
                assert_eq!(handle.join().unwrap(), bitmap);
            }
        });
    }

    #[test]
    fn truncated_data() {
        let bitmap = sample();
        let params = params(&bitmap, GbTemplate::Template0, false);
        let data = encode_generic(&bitmap, &params);

        assert!(decode(&data[..data.len() / 2], &params, u64::MAX).is_err());
    }
}
