//! The MQ arithmetic decoder (Annex E).
//!
//! The decoder keeps the interval register A, the code register C and the bit
//! counter CT, and turns a context label plus the adaptive state of that
//! context into one decoded bit per call. C is kept in the non-inverted form:
//! its top 16 bits are compared against the LPS sub-interval, which is the
//! lower part of the current interval.

use crate::error::{DecodeError, Result};
use crate::reader::Reader;
use crate::stats::{Context, DecoderStats};

/// Working width of the code register during byte-in.
const C_MASK_BYTE_IN: u64 = 0xFF_FFFF_FFFF;
/// Width of the code register after renormalization.
const C_MASK: u64 = 0xFFFF_FFFF;

/// The arithmetic decoder state.
///
/// One decoder is owned by exactly one decoding session. It reads from its own
/// [`Reader`] and mutates the [`DecoderStats`] it is given.
#[derive(Debug, Clone)]
pub struct ArithmeticDecoder<'a> {
    reader: Reader<'a>,
    /// B, the byte under the reader.
    b: u8,
    c: u64,
    a: u32,
    ct: u32,
    /// Context history of the integer decoding procedures.
    pub(crate) previous: u32,
}

impl<'a> ArithmeticDecoder<'a> {
    /// Start decoding `data` (INITDEC, E.3.5).
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let reader = Reader::new(data);
        let b = reader.peek_byte().ok_or(DecodeError::TruncatedStream)?;

        let mut decoder = Self {
            reader,
            b,
            c: u64::from(b) << 16,
            a: 0,
            ct: 0,
            previous: 0,
        };

        decoder.byte_in()?;
        decoder.c <<= 7;
        decoder.ct -= 7;
        decoder.a = 0x8000;

        Ok(decoder)
    }

    /// The byte offset of B, the byte most recently fed to the code register.
    ///
    /// A marker that ended the coded data is never consumed, so after decoding
    /// reached it this points at the `0xFF` that starts it.
    pub fn stream_position(&self) -> u64 {
        self.reader.stream_position()
    }

    /// Decode one bit with the context `cx` (DECODE, E.3.2).
    #[inline(always)]
    pub fn decode_bit(&mut self, stats: &mut DecoderStats, cx: usize) -> Result<u8> {
        let context = stats.get_mut(cx)?;
        let entry = &QE_TABLE[usize::from(context.index)];

        self.a -= entry.qe;

        if (self.c >> 16) < u64::from(entry.qe) {
            let bit = self.exchange_lps(context, entry);
            self.renormalize()?;

            Ok(bit)
        } else {
            self.c -= u64::from(entry.qe) << 16;

            if self.a & 0x8000 == 0 {
                let bit = self.exchange_mps(context, entry);
                self.renormalize()?;

                Ok(bit)
            } else {
                Ok(context.mps)
            }
        }
    }

    /// LPS_EXCHANGE (Figure E.17).
    #[inline(always)]
    fn exchange_lps(&mut self, context: &mut Context, entry: &QeEntry) -> u8 {
        let mps = context.mps;

        if self.a < entry.qe {
            self.a = entry.qe;
            context.index = entry.nmps;

            mps
        } else {
            self.a = entry.qe;

            if entry.switch {
                context.mps = 1 - mps;
            }

            context.index = entry.nlps;

            1 - mps
        }
    }

    /// MPS_EXCHANGE (Figure E.16).
    #[inline(always)]
    fn exchange_mps(&mut self, context: &mut Context, entry: &QeEntry) -> u8 {
        let mps = context.mps;

        if self.a < entry.qe {
            if entry.switch {
                context.mps = 1 - mps;
            }

            context.index = entry.nlps;

            1 - mps
        } else {
            context.index = entry.nmps;

            mps
        }
    }

    /// RENORMD (Figure E.18).
    #[inline(always)]
    fn renormalize(&mut self) -> Result<()> {
        loop {
            if self.ct == 0 {
                self.byte_in()?;
            }

            self.a <<= 1;
            self.c <<= 1;
            self.ct -= 1;

            if self.a & 0x8000 != 0 {
                break;
            }
        }

        self.c &= C_MASK;

        Ok(())
    }

    /// BYTEIN (Figure E.19).
    ///
    /// The reader stays on B. A `0xFF` followed by a byte above `0x8F` is a
    /// marker: it is fed to C as a run of 1-bits and the reader does not move,
    /// so every later byte-in sees the marker again. Otherwise the bit stuffed
    /// after `0xFF` is skipped by shifting the next byte in by 9 instead of 8.
    #[inline(always)]
    fn byte_in(&mut self) -> Result<()> {
        if self.b == 0xFF {
            let b1 = self
                .reader
                .peek_bytes(2)
                .map(|bytes| bytes[1])
                .ok_or(DecodeError::TruncatedStream)?;

            if b1 > 0x8F {
                self.c += 0xFF00;
                self.ct = 8;
            } else {
                self.advance()?;
                self.c += u64::from(self.b) << 9;
                self.ct = 7;
            }
        } else {
            self.advance()?;
            self.c += u64::from(self.b) << 8;
            self.ct = 8;
        }

        self.c &= C_MASK_BYTE_IN;

        Ok(())
    }

    /// Move the reader to the next byte and load it into B.
    #[inline(always)]
    fn advance(&mut self) -> Result<()> {
        self.reader
            .skip_bytes(1)
            .ok_or(DecodeError::TruncatedStream)?;
        self.b = self.reader.peek_byte().ok_or(DecodeError::TruncatedStream)?;

        Ok(())
    }
}

/// A row of the probability estimation table (Table E.1).
#[derive(Debug, Clone, Copy)]
pub(crate) struct QeEntry {
    pub(crate) qe: u32,
    pub(crate) nmps: u8,
    pub(crate) nlps: u8,
    pub(crate) switch: bool,
}

macro_rules! qe {
    ($($qe:expr, $nmps:expr, $nlps:expr, $switch:expr),+ $(,)?) => {
        [
            $(
                QeEntry {
                    qe: $qe,
                    nmps: $nmps,
                    nlps: $nlps,
                    switch: $switch != 0,
                }
            ),+
        ]
    };
}

/// Table E.1, Qe values and probability estimation.
#[rustfmt::skip]
pub(crate) static QE_TABLE: [QeEntry; 47] = qe!(
    //         Qe   NMPS NLPS SWITCH
    /*  0 */ 0x5601,  1,   1,  1,
    /*  1 */ 0x3401,  2,   6,  0,
    /*  2 */ 0x1801,  3,   9,  0,
    /*  3 */ 0x0AC1,  4,  12,  0,
    /*  4 */ 0x0521,  5,  29,  0,
    /*  5 */ 0x0221, 38,  33,  0,
    /*  6 */ 0x5601,  7,   6,  1,
    /*  7 */ 0x5401,  8,  14,  0,
    /*  8 */ 0x4801,  9,  14,  0,
    /*  9 */ 0x3801, 10,  14,  0,
    /* 10 */ 0x3001, 11,  17,  0,
    /* 11 */ 0x2401, 12,  18,  0,
    /* 12 */ 0x1C01, 13,  20,  0,
    /* 13 */ 0x1601, 29,  21,  0,
    /* 14 */ 0x5601, 15,  14,  1,
    /* 15 */ 0x5401, 16,  14,  0,
    /* 16 */ 0x5101, 17,  15,  0,
    /* 17 */ 0x4801, 18,  16,  0,
    /* 18 */ 0x3801, 19,  17,  0,
    /* 19 */ 0x3401, 20,  18,  0,
    /* 20 */ 0x3001, 21,  19,  0,
    /* 21 */ 0x2801, 22,  19,  0,
    /* 22 */ 0x2401, 23,  20,  0,
    /* 23 */ 0x2201, 24,  21,  0,
    /* 24 */ 0x1C01, 25,  22,  0,
    /* 25 */ 0x1801, 26,  23,  0,
    /* 26 */ 0x1601, 27,  24,  0,
    /* 27 */ 0x1401, 28,  25,  0,
    /* 28 */ 0x1201, 29,  26,  0,
    /* 29 */ 0x1101, 30,  27,  0,
    /* 30 */ 0x0AC1, 31,  28,  0,
    /* 31 */ 0x09C1, 32,  29,  0,
    /* 32 */ 0x08A1, 33,  30,  0,
    /* 33 */ 0x0521, 34,  31,  0,
    /* 34 */ 0x0441, 35,  32,  0,
    /* 35 */ 0x02A1, 36,  33,  0,
    /* 36 */ 0x0221, 37,  34,  0,
    /* 37 */ 0x0141, 38,  35,  0,
    /* 38 */ 0x0111, 39,  36,  0,
    /* 39 */ 0x0085, 40,  37,  0,
    /* 40 */ 0x0049, 41,  38,  0,
    /* 41 */ 0x0025, 42,  39,  0,
    /* 42 */ 0x0015, 43,  40,  0,
    /* 43 */ 0x0009, 44,  41,  0,
    /* 44 */ 0x0005, 45,  42,  0,
    /* 45 */ 0x0001, 45,  43,  0,
    /* 46 */ 0x5601, 46,  46,  0,
);
