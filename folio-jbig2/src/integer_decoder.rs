//! The arithmetic integer decoding procedures (Annex A).
//!
//! Both procedures decode a sequence of bits where the context of each bit is
//! formed by the bits decoded before it in the same invocation. The history is
//! kept in [`ArithmeticDecoder::previous`].

use crate::arithmetic_decoder::ArithmeticDecoder;
use crate::error::{DecodeError, Result, Unsupported, bail};
use crate::stats::DecoderStats;

/// A decoded integer, or the out-of-band value.
///
/// Out-of-band is a separate variant so that no number in the value range is
/// reserved for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerValue {
    /// A regular value.
    Value(i64),
    /// The out-of-band value.
    OutOfBand,
}

impl IntegerValue {
    /// The number, or [`DecodeError::IntegerOutOfRange`] for out-of-band.
    pub fn value(self) -> Result<i64> {
        match self {
            Self::Value(v) => Ok(v),
            Self::OutOfBand => Err(DecodeError::IntegerOutOfRange),
        }
    }

    /// Whether this is the out-of-band value.
    pub fn is_oob(self) -> bool {
        matches!(self, Self::OutOfBand)
    }
}

/// Number of value bits and the offset added to them, selected by the prefix
/// of up to five bits (Figure A.1).
const RANGES: [(u8, i64); 6] = [(2, 0), (4, 4), (6, 20), (8, 84), (12, 340), (32, 4436)];

impl ArithmeticDecoder<'_> {
    /// Decode a signed integer with one of the IAx procedures (A.2).
    ///
    /// `stats` holds the 512 contexts of the procedure, see
    /// [`DecoderStats::for_integers`].
    pub fn decode_int(&mut self, stats: &mut DecoderStats) -> Result<IntegerValue> {
        self.previous = 1;

        let sign = self.decode_int_bit(stats)?;

        let mut range = 0;
        while range < RANGES.len() - 1 && self.decode_int_bit(stats)? == 1 {
            range += 1;
        }

        let (bits, offset) = RANGES[range];
        let mut value = 0_i64;
        for _ in 0..bits {
            value = (value << 1) | i64::from(self.decode_int_bit(stats)?);
        }

        let magnitude = value + offset;

        Ok(match (sign, magnitude) {
            (0, v) => IntegerValue::Value(v),
            (_, 0) => IntegerValue::OutOfBand,
            (_, v) => IntegerValue::Value(-v),
        })
    }

    /// Decode a symbol ID of `code_len` bits with the IAID procedure (A.3).
    ///
    /// `stats` needs at least `1 << code_len` contexts.
    pub fn decode_iaid(&mut self, code_len: u8, stats: &mut DecoderStats) -> Result<u32> {
        if code_len > 31 {
            bail!(Unsupported::IaidCodeLength);
        }

        self.previous = 1;

        for _ in 0..code_len {
            let bit = self.decode_bit(stats, self.previous as usize)?;
            self.previous = (self.previous << 1) | u32::from(bit);
        }

        Ok(self.previous - (1 << code_len))
    }

    /// Decode one bit of an IAx procedure and update the history.
    ///
    /// Once 8 bits have been decoded the leading 1 stays at bit 8 and the
    /// lower bits hold the eight most recent bits.
    #[inline]
    fn decode_int_bit(&mut self, stats: &mut DecoderStats) -> Result<u8> {
        let bit = self.decode_bit(stats, (self.previous & 0x1FF) as usize)?;
        let shifted = (self.previous << 1) | u32::from(bit);

        self.previous = if self.previous < 256 {
            shifted & 0x1FF
        } else {
            (shifted & 0x1FF) | 0x100
        };

        Ok(bit)
    }
}
