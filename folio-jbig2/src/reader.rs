//! A bit- and byte-granular reader over an in-memory buffer.

use std::io::SeekFrom;

/// A reader for reading bits and bytes from a byte stream.
///
/// All methods return `None` when the data ends before the requested value is
/// complete. Byte-level methods assume that the reader is byte-aligned.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    /// The position in bits.
    cur_pos: usize,
}

impl<'a> Reader<'a> {
    /// Create a new reader positioned at the start of `data`.
    #[inline(always)]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, cur_pos: 0 }
    }

    /// Skip to the next byte boundary.
    #[inline(always)]
    pub fn align(&mut self) {
        let bit_pos = self.bit_pos();

        if bit_pos != 0 {
            self.cur_pos += 8 - bit_pos;
        }
    }

    /// Whether all bytes have been consumed.
    #[inline(always)]
    pub fn at_end(&self) -> bool {
        self.byte_pos() >= self.data.len()
    }

    /// The bytes that have not been consumed yet.
    #[inline(always)]
    pub fn tail(&self) -> Option<&'a [u8]> {
        self.data.get(self.byte_pos()..)
    }

    /// The number of bytes that have not been consumed yet.
    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.byte_pos())
    }

    /// Read the given number of bytes.
    #[inline(always)]
    pub fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        debug_assert_eq!(self.bit_pos(), 0);

        let bytes = self.peek_bytes(len)?;
        self.cur_pos += len * 8;

        Some(bytes)
    }

    /// Read a single byte.
    #[inline(always)]
    pub fn read_byte(&mut self) -> Option<u8> {
        debug_assert_eq!(self.bit_pos(), 0);

        let byte = self.peek_byte()?;
        self.cur_pos += 8;

        Some(byte)
    }

    /// Skip the given number of bytes.
    #[inline(always)]
    pub fn skip_bytes(&mut self, len: usize) -> Option<()> {
        self.read_bytes(len).map(|_| ())
    }

    /// Peek exactly `len` bytes without consuming them.
    #[inline(always)]
    pub fn peek_bytes(&self, len: usize) -> Option<&'a [u8]> {
        debug_assert_eq!(self.bit_pos(), 0);

        let start = self.byte_pos();
        let end = start.checked_add(len)?;
        self.data.get(start..end)
    }

    /// Peek up to `len` bytes without consuming them. The result is shorter
    /// than `len` near the end of the data.
    #[inline(always)]
    pub fn peek_up_to(&self, len: usize) -> &'a [u8] {
        let start = self.byte_pos().min(self.data.len());
        let end = start.saturating_add(len).min(self.data.len());

        &self.data[start..end]
    }

    /// Peek the next byte.
    #[inline(always)]
    pub fn peek_byte(&self) -> Option<u8> {
        debug_assert_eq!(self.bit_pos(), 0);

        self.data.get(self.byte_pos()).copied()
    }

    /// Read a big-endian `u16`.
    #[inline(always)]
    pub fn read_u16(&mut self) -> Option<u16> {
        Some(u16::from_be_bytes(self.read_bytes(2)?.try_into().ok()?))
    }

    /// Read a big-endian `u32`.
    #[inline(always)]
    pub fn read_u32(&mut self) -> Option<u32> {
        Some(u32::from_be_bytes(self.read_bytes(4)?.try_into().ok()?))
    }

    /// Read a big-endian `i32`.
    #[inline(always)]
    pub fn read_i32(&mut self) -> Option<i32> {
        Some(i32::from_be_bytes(self.read_bytes(4)?.try_into().ok()?))
    }

    /// Move the cursor to a byte offset.
    ///
    /// Positions before the start or past the end of the data are rejected and
    /// leave the cursor where it was. `SeekFrom::Current` is relative to the
    /// current byte, so a partially read byte counts as unread.
    pub fn seek(&mut self, pos: SeekFrom) -> Option<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => i128::from(offset),
            SeekFrom::Current(delta) => self.byte_pos() as i128 + i128::from(delta),
            SeekFrom::End(delta) => self.data.len() as i128 + i128::from(delta),
        };

        if target < 0 || target > self.data.len() as i128 {
            return None;
        }

        let target = target as usize;
        self.cur_pos = target * 8;

        Some(target as u64)
    }

    /// The current byte offset from the start of the data.
    #[inline(always)]
    pub fn stream_position(&self) -> u64 {
        self.byte_pos() as u64
    }

    /// Read a single bit, most significant bit first.
    #[inline(always)]
    pub fn read_bit(&mut self) -> Option<u8> {
        let byte = self.cur_byte()?;
        let shift = 7 - self.bit_pos();
        self.cur_pos += 1;

        Some((byte >> shift) & 1)
    }

    /// Read up to 32 bits as a big-endian number.
    #[inline(always)]
    pub fn read_bits(&mut self, count: u8) -> Option<u32> {
        debug_assert!(count <= 32);

        let mut value = 0_u64;
        let mut remaining = count;

        while remaining > 0 {
            let bit_offset = self.bit_pos();
            let byte = u64::from(self.cur_byte()?);

            let available = (8 - bit_offset) as u8;
            let take = remaining.min(available);

            let shift = available - take;
            let mask = (1 << take) - 1;

            value = (value << take) | ((byte >> shift) & mask);
            self.cur_pos += usize::from(take);
            remaining -= take;
        }

        Some(value as u32)
    }

    #[inline(always)]
    pub(crate) fn byte_pos(&self) -> usize {
        self.cur_pos >> 3
    }

    #[inline(always)]
    fn cur_byte(&self) -> Option<u8> {
        self.data.get(self.byte_pos()).copied()
    }

    #[inline(always)]
    fn bit_pos(&self) -> usize {
        self.cur_pos & 7
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn big_endian_numbers() {
        let mut reader = Reader::new(&[0x00, 0x2C, 0xFF, 0xFF, 0xFF, 0xFE, 0x12, 0x34]);

        assert_eq!(reader.read_u16(), Some(0x2C));
        assert_eq!(reader.read_i32(), Some(-2));
        assert_eq!(reader.read_u16(), Some(0x1234));
        assert!(reader.at_end());
        assert_eq!(reader.read_byte(), None);
    }

    #[test]
    fn bits_across_byte_boundaries() {
        let mut reader = Reader::new(&[0b1011_0011, 0b1100_0000]);

        assert_eq!(reader.read_bit(), Some(1));
        assert_eq!(reader.read_bits(3), Some(0b011));
        assert_eq!(reader.read_bits(6), Some(0b0011_11));
        reader.align();
        assert!(reader.at_end());
        assert_eq!(reader.read_bit(), None);
    }

    #[test]
    fn read_full_word_of_bits() {
        let mut reader = Reader::new(&[0x80, 0x00, 0x00, 0x01, 0xFF]);

        assert_eq!(reader.read_bits(4), Some(0x8));
        assert_eq!(reader.read_bits(32), Some(0x0000_001F));
    }

    #[test]
    fn peek_does_not_consume() {
        let mut reader = Reader::new(&[1, 2, 3]);

        assert_eq!(reader.peek_byte(), Some(1));
        assert_eq!(reader.peek_bytes(4), None);
        assert_eq!(reader.peek_up_to(4), &[1, 2, 3]);
        assert_eq!(reader.read_byte(), Some(1));
        assert_eq!(reader.peek_up_to(1), &[2]);
    }

    #[test]
    fn seek_absolute_and_relative() {
        let mut reader = Reader::new(&[10, 20, 30, 40]);

        assert_eq!(reader.seek(SeekFrom::Start(3)), Some(3));
        assert_eq!(reader.read_byte(), Some(40));
        assert_eq!(reader.seek(SeekFrom::Current(-2)), Some(2));
        assert_eq!(reader.stream_position(), 2);
        assert_eq!(reader.read_byte(), Some(30));
        assert_eq!(reader.seek(SeekFrom::End(-4)), Some(0));

        assert_eq!(reader.seek(SeekFrom::Current(-1)), None);
        assert_eq!(reader.seek(SeekFrom::Start(5)), None);
        assert_eq!(reader.stream_position(), 0);
    }
}
