//! An MQ encoder (Annex E.2) for producing test data.

use crate::arithmetic_decoder::QE_TABLE;
use crate::bitmap::Bitmap;
use crate::decode::generic::{ContextTemplate, sltp_context};
use crate::integer_decoder::IntegerValue;
use crate::segment::generic_region::GenericRegionParams;
use crate::stats::Context;

pub(crate) struct ArithmeticEncoder {
    contexts: Vec<Context>,
    a: u32,
    c: u32,
    ct: u32,
    b: u32,
    started: bool,
    out: Vec<u8>,
    previous: u32,
}

impl ArithmeticEncoder {
    /// INITENC.
    pub(crate) fn new(len: usize) -> Self {
        Self {
            contexts: vec![Context::default(); len],
            a: 0x8000,
            c: 0,
            ct: 12,
            b: 0,
            started: false,
            out: Vec::new(),
            previous: 1,
        }
    }

    pub(crate) fn set_state(&mut self, cx: usize, index: u8, mps: u8) {
        self.contexts[cx] = Context { index, mps };
    }

    pub(crate) fn encode(&mut self, cx: usize, bit: u8) {
        if bit == self.contexts[cx].mps {
            self.code_mps(cx);
        } else {
            self.code_lps(cx);
        }
    }

    fn code_mps(&mut self, cx: usize) {
        let entry = QE_TABLE[usize::from(self.contexts[cx].index)];
        self.a -= entry.qe;

        if self.a & 0x8000 == 0 {
            if self.a < entry.qe {
                self.a = entry.qe;
            } else {
                self.c += entry.qe;
            }

            self.contexts[cx].index = entry.nmps;
            self.renormalize();
        } else {
            self.c += entry.qe;
        }
    }

    fn code_lps(&mut self, cx: usize) {
        let entry = QE_TABLE[usize::from(self.contexts[cx].index)];
        self.a -= entry.qe;

        if self.a < entry.qe {
            self.c += entry.qe;
        } else {
            self.a = entry.qe;
        }

        if entry.switch {
            self.contexts[cx].mps ^= 1;
        }

        self.contexts[cx].index = entry.nlps;
        self.renormalize();
    }

    fn renormalize(&mut self) {
        loop {
            self.a <<= 1;
            self.c <<= 1;
            self.ct -= 1;

            if self.ct == 0 {
                self.byte_out();
            }

            if self.a & 0x8000 != 0 {
                break;
            }
        }
    }

    fn byte_out(&mut self) {
        if self.b == 0xFF {
            self.emit();
            self.b = self.c >> 20;
            self.c &= 0xF_FFFF;
            self.ct = 7;
        } else if self.c < 0x800_0000 {
            self.emit();
            self.b = self.c >> 19;
            self.c &= 0x7_FFFF;
            self.ct = 8;
        } else {
            self.b += 1;

            if self.b == 0xFF {
                self.c &= 0x7FF_FFFF;
                self.emit();
                self.b = self.c >> 20;
                self.c &= 0xF_FFFF;
                self.ct = 7;
            } else {
                self.emit();
                self.b = self.c >> 19;
                self.c &= 0x7_FFFF;
                self.ct = 8;
            }
        }
    }

    /// Write B, except for the placeholder byte before the first real one.
    fn emit(&mut self) {
        if self.started {
            self.out.push(self.b as u8);
        }

        self.started = true;
    }

    /// FLUSH, followed by the `0xFFAC` marker.
    pub(crate) fn finish(mut self) -> Vec<u8> {
        let temp = self.c + self.a;
        self.c |= 0xFFFF;

        if self.c >= temp {
            self.c -= 0x8000;
        }

        self.c <<= self.ct;
        self.byte_out();
        self.c <<= self.ct;
        self.byte_out();

        self.emit();
        if self.b != 0xFF {
            self.out.push(0xFF);
        }
        self.out.push(0xAC);

        self.out
    }

    /// The IAx encoding procedure (A.2), using contexts `0..512`.
    pub(crate) fn encode_int(&mut self, value: IntegerValue) {
        const RANGES: [(u32, i64); 6] =
            [(2, 0), (4, 4), (6, 20), (8, 84), (12, 340), (32, 4436)];

        let (sign, magnitude) = match value {
            IntegerValue::Value(v) => (u8::from(v < 0), v.abs()),
            IntegerValue::OutOfBand => (1, 0),
        };

        self.previous = 1;
        self.encode_int_bit(sign);

        let range = RANGES
            .iter()
            .position(|&(bits, offset)| magnitude < offset + (1_i64 << bits))
            .unwrap();

        for _ in 0..range {
            self.encode_int_bit(1);
        }
        if range < RANGES.len() - 1 {
            self.encode_int_bit(0);
        }

        let (bits, offset) = RANGES[range];
        let value = magnitude - offset;
        for i in (0..bits).rev() {
            self.encode_int_bit(((value >> i) & 1) as u8);
        }
    }

    fn encode_int_bit(&mut self, bit: u8) {
        self.encode((self.previous & 0x1FF) as usize, bit);
        let shifted = (self.previous << 1) | u32::from(bit);

        self.previous = if self.previous < 256 {
            shifted & 0x1FF
        } else {
            (shifted & 0x1FF) | 0x100
        };
    }

    /// The IAID encoding procedure (A.3).
    pub(crate) fn encode_iaid(&mut self, code_len: u8, id: u32) {
        self.previous = 1;

        for i in (0..code_len).rev() {
            let bit = ((id >> i) & 1) as u8;
            self.encode(self.previous as usize, bit);
            self.previous = (self.previous << 1) | u32::from(bit);
        }
    }
}

/// Encode `bitmap` as the coded data of a generic region with `params`.
pub(crate) fn encode_generic(bitmap: &Bitmap, params: &GenericRegionParams) -> Vec<u8> {
    let template = ContextTemplate::new(params.template, &params.adaptive_pixels).unwrap();
    let sltp = sltp_context(params.template);
    let mut encoder = ArithmeticEncoder::new(1 << params.template.context_bits());

    let stride = bitmap.stride();
    let white = vec![0; stride];
    let row = |y: u32| &bitmap.data()[y as usize * stride..][..stride];

    let mut ltp = false;

    for y in 0..bitmap.height() {
        if params.tpgdon {
            let above = if y == 0 { &white[..] } else { row(y - 1) };
            let typical = row(y) == above;

            encoder.encode(sltp, u8::from(typical != ltp));
            ltp = typical;
        }

        if ltp {
            continue;
        }

        for x in 0..bitmap.width() {
            let cx = template.context(bitmap, x, y);
            encoder.encode(cx, u8::from(bitmap.get(x, y)));
        }
    }

    encoder.finish()
}
