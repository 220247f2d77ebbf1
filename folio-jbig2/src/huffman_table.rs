//! Prefix code tables (Annex B).
//!
//! A table is a set of lines, each assigning a prefix code to a range of
//! values. The prefix codes are assigned from the prefix lengths alone (B.3),
//! so a table is fully described by its lines. This module provides the 15
//! standard tables of B.5 and reads custom tables from code table segments.

use std::sync::LazyLock;

use crate::error::{DataError, DecodeError, Result, bail};
use crate::integer_decoder::IntegerValue;
use crate::reader::Reader;

/// One line of a code table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLine {
    /// The first value of the range. For lower range lines this is the last
    /// value instead, and the range extends downwards.
    pub range_low: i64,
    /// The length of the prefix code (PREFLEN). 0 means the line is unused.
    pub prefix_len: u8,
    /// The number of offset bits following the prefix code (RANGELEN).
    pub range_len: u8,
    /// Whether this is the lower range line.
    pub is_lower: bool,
    /// Whether this is the out-of-band line.
    pub is_oob: bool,
}

impl TableLine {
    /// A line for the values `range_low..range_low + 2^range_len`.
    pub const fn new(range_low: i64, prefix_len: u8, range_len: u8) -> Self {
        Self {
            range_low,
            prefix_len,
            range_len,
            is_lower: false,
            is_oob: false,
        }
    }

    /// The lower range line for all values up to and including `range_high`.
    pub const fn lower(range_high: i64, prefix_len: u8) -> Self {
        Self {
            range_low: range_high,
            prefix_len,
            range_len: 32,
            is_lower: true,
            is_oob: false,
        }
    }

    /// The upper range line for all values from `range_low` on.
    pub const fn upper(range_low: i64, prefix_len: u8) -> Self {
        Self::new(range_low, prefix_len, 32)
    }

    /// The out-of-band line.
    pub const fn oob(prefix_len: u8) -> Self {
        Self {
            range_low: 0,
            prefix_len,
            range_len: 0,
            is_lower: false,
            is_oob: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Node {
    /// Indices of the children for a 0 and a 1 bit.
    Branch([Option<u32>; 2]),
    Leaf(TableLine),
}

/// A prefix code table, stored as a binary tree in a flat arena.
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    // The root is always at index 0.
    nodes: Vec<Node>,
    leaves: usize,
}

impl HuffmanTable {
    /// Build a table from its lines, assigning prefix codes as in B.3.
    pub fn from_lines(lines: &[TableLine]) -> Result<Self> {
        let max_len = lines.iter().map(|l| l.prefix_len).max().unwrap_or(0);

        if max_len > 32 || lines.iter().any(|l| l.range_len > 32) {
            bail!(DataError::InvalidHuffmanTable);
        }

        let mut len_count = [0_u64; 33];
        for line in lines {
            len_count[usize::from(line.prefix_len)] += 1;
        }
        len_count[0] = 0;

        let mut table = Self {
            nodes: vec![Node::Branch([None; 2])],
            leaves: 0,
        };

        let mut first_code = 0_u64;
        for len in 1..=max_len {
            first_code = (first_code + len_count[usize::from(len) - 1]) << 1;
            let mut code = first_code;

            for line in lines.iter().filter(|l| l.prefix_len == len) {
                if code >> len != 0 {
                    bail!(DataError::InvalidHuffmanTable);
                }

                table.insert(code as u32, len, *line)?;
                code += 1;
            }
        }

        Ok(table)
    }

    fn insert(&mut self, code: u32, len: u8, line: TableLine) -> Result<()> {
        let mut node = 0;

        for i in (0..len).rev() {
            let bit = ((code >> i) & 1) as usize;

            // A shorter code must not be a prefix of this one.
            let Node::Branch(mut children) = self.nodes[node] else {
                bail!(DataError::InvalidHuffmanTable);
            };

            node = match children[bit] {
                Some(_) if i == 0 => bail!(DataError::InvalidHuffmanTable),
                Some(child) => child as usize,
                None => {
                    let child = self.nodes.len();
                    children[bit] = Some(child as u32);
                    self.nodes[node] = Node::Branch(children);
                    self.nodes.push(if i == 0 {
                        Node::Leaf(line)
                    } else {
                        Node::Branch([None; 2])
                    });

                    child
                }
            };
        }

        self.leaves += 1;

        Ok(())
    }

    /// The number of codes in the table.
    pub fn len(&self) -> usize {
        self.leaves
    }

    /// Whether the table has no codes.
    pub fn is_empty(&self) -> bool {
        self.leaves == 0
    }

    /// Decode one value (B.4).
    pub fn decode(&self, reader: &mut Reader<'_>) -> Result<IntegerValue> {
        let mut node = 0;

        loop {
            match self.nodes[node] {
                Node::Branch(children) => {
                    let bit = reader.read_bit().ok_or(DecodeError::TruncatedStream)?;

                    node = children[usize::from(bit)]
                        .ok_or(DataError::InvalidHuffmanCode)? as usize;
                }
                Node::Leaf(line) => {
                    if line.is_oob {
                        return Ok(IntegerValue::OutOfBand);
                    }

                    let offset = i64::from(
                        reader
                            .read_bits(line.range_len)
                            .ok_or(DecodeError::TruncatedStream)?,
                    );

                    return Ok(IntegerValue::Value(if line.is_lower {
                        line.range_low - offset
                    } else {
                        line.range_low + offset
                    }));
                }
            }
        }
    }

    /// Read the table from the data of a code table segment (B.2).
    pub fn read_custom(reader: &mut Reader<'_>) -> Result<Self> {
        let flags = reader.read_byte().ok_or(DecodeError::TruncatedStream)?;

        let has_oob = flags & 0x01 != 0;
        let prefix_bits = ((flags >> 1) & 0x07) + 1;
        let range_bits = ((flags >> 4) & 0x07) + 1;

        let low = i64::from(reader.read_i32().ok_or(DecodeError::TruncatedStream)?);
        let high = i64::from(reader.read_i32().ok_or(DecodeError::TruncatedStream)?);

        let mut read_field = |bits: u8| {
            reader
                .read_bits(bits)
                .map(|v| v as u8)
                .ok_or(DecodeError::TruncatedStream)
        };

        let mut lines = Vec::new();
        let mut range_low = low;

        loop {
            let prefix_len = read_field(prefix_bits)?;
            let range_len = read_field(range_bits)?;

            if range_len > 32 {
                bail!(DataError::InvalidHuffmanTable);
            }

            lines.push(TableLine::new(range_low, prefix_len, range_len));
            range_low += 1_i64 << range_len;

            if range_low >= high {
                break;
            }
        }

        lines.push(TableLine::lower(low - 1, read_field(prefix_bits)?));
        lines.push(TableLine::upper(high, read_field(prefix_bits)?));

        if has_oob {
            lines.push(TableLine::oob(read_field(prefix_bits)?));
        }

        Self::from_lines(&lines)
    }
}

/// One of the standard tables B.1 to B.15.
pub fn standard_table(number: i32) -> Result<&'static HuffmanTable> {
    let index = usize::try_from(number)
        .ok()
        .and_then(|n| n.checked_sub(1))
        .filter(|&i| i < STANDARD_LINES.len())
        .ok_or(DecodeError::InvalidTableIndex(number))?;

    STANDARD_TABLES[index].as_ref().map_err(|e| *e)
}

static STANDARD_TABLES: LazyLock<Vec<Result<HuffmanTable>>> = LazyLock::new(|| {
    STANDARD_LINES
        .iter()
        .map(|lines| HuffmanTable::from_lines(lines))
        .collect()
});

use TableLine as L;

#[rustfmt::skip]
static STANDARD_LINES: [&[TableLine]; 15] = [
    // B.1
    &[
        L::new(0, 1, 4), L::new(16, 2, 8), L::new(272, 3, 16), L::upper(65808, 3),
    ],
    // B.2
    &[
        L::new(0, 1, 0), L::new(1, 2, 0), L::new(2, 3, 0), L::new(3, 4, 3),
        L::new(11, 5, 6), L::upper(75, 6), L::oob(6),
    ],
    // B.3
    &[
        L::new(-256, 8, 8), L::new(0, 1, 0), L::new(1, 2, 0), L::new(2, 3, 0),
        L::new(3, 4, 3), L::new(11, 5, 6), L::lower(-257, 8), L::upper(75, 7),
        L::oob(6),
    ],
    // B.4
    &[
        L::new(1, 1, 0), L::new(2, 2, 0), L::new(3, 3, 0), L::new(4, 4, 3),
        L::new(12, 5, 6), L::upper(76, 5),
    ],
    // B.5
    &[
        L::new(-255, 7, 8), L::new(1, 1, 0), L::new(2, 2, 0), L::new(3, 3, 0),
        L::new(4, 4, 3), L::new(12, 5, 6), L::lower(-256, 7), L::upper(76, 6),
    ],
    // B.6
    &[
        L::new(-2048, 5, 10), L::new(-1024, 4, 9), L::new(-512, 4, 8),
        L::new(-256, 4, 7), L::new(-128, 5, 6), L::new(-64, 5, 5),
        L::new(-32, 4, 5), L::new(0, 2, 7), L::new(128, 3, 7), L::new(256, 3, 8),
        L::new(512, 4, 9), L::new(1024, 4, 10), L::lower(-2049, 6),
        L::upper(2048, 6),
    ],
    // B.7
    &[
        L::new(-1024, 4, 9), L::new(-512, 3, 8), L::new(-256, 4, 7),
        L::new(-128, 5, 6), L::new(-64, 5, 5), L::new(-32, 4, 5), L::new(0, 4, 5),
        L::new(32, 5, 5), L::new(64, 5, 6), L::new(128, 4, 7), L::new(256, 3, 8),
        L::new(512, 3, 9), L::new(1024, 3, 10), L::lower(-1025, 5),
        L::upper(2048, 5),
    ],
    // B.8
    &[
        L::new(-15, 8, 3), L::new(-7, 9, 1), L::new(-5, 8, 1), L::new(-3, 9, 0),
        L::new(-2, 7, 0), L::new(-1, 4, 0), L::new(0, 2, 1), L::new(2, 5, 0),
        L::new(3, 6, 0), L::new(4, 3, 4), L::new(20, 6, 1), L::new(22, 4, 4),
        L::new(38, 4, 5), L::new(70, 5, 6), L::new(134, 5, 7), L::new(262, 6, 7),
        L::new(390, 7, 8), L::new(646, 6, 10), L::lower(-16, 9), L::upper(1670, 9),
        L::oob(2),
    ],
    // B.9
    &[
        L::new(-31, 8, 4), L::new(-15, 9, 2), L::new(-11, 8, 2), L::new(-7, 9, 1),
        L::new(-5, 7, 1), L::new(-3, 4, 1), L::new(-1, 3, 1), L::new(1, 3, 1),
        L::new(3, 5, 1), L::new(5, 6, 1), L::new(7, 3, 5), L::new(39, 6, 2),
        L::new(43, 4, 5), L::new(75, 4, 6), L::new(139, 5, 7), L::new(267, 5, 8),
        L::new(523, 6, 8), L::new(779, 7, 9), L::new(1291, 6, 11),
        L::lower(-32, 9), L::upper(3339, 9), L::oob(2),
    ],
    // B.10
    &[
        L::new(-21, 7, 4), L::new(-5, 8, 0), L::new(-4, 7, 0), L::new(-3, 5, 0),
        L::new(-2, 2, 2), L::new(2, 5, 0), L::new(3, 6, 0), L::new(4, 7, 0),
        L::new(5, 8, 0), L::new(6, 2, 6), L::new(70, 5, 5), L::new(102, 6, 5),
        L::new(134, 6, 6), L::new(198, 6, 7), L::new(326, 6, 8), L::new(582, 6, 9),
        L::new(1094, 6, 10), L::new(2118, 7, 11), L::lower(-22, 8),
        L::upper(4166, 8), L::oob(2),
    ],
    // B.11
    &[
        L::new(1, 1, 0), L::new(2, 2, 1), L::new(4, 4, 0), L::new(5, 4, 1),
        L::new(7, 5, 1), L::new(9, 5, 2), L::new(13, 6, 2), L::new(17, 7, 2),
        L::new(21, 7, 3), L::new(29, 7, 4), L::new(45, 7, 5), L::new(77, 7, 6),
        L::upper(141, 7),
    ],
    // B.12
    &[
        L::new(1, 1, 0), L::new(2, 2, 0), L::new(3, 3, 1), L::new(5, 5, 0),
        L::new(6, 5, 1), L::new(8, 6, 1), L::new(10, 7, 0), L::new(11, 7, 1),
        L::new(13, 7, 2), L::new(17, 7, 3), L::new(25, 7, 4), L::new(41, 8, 5),
        L::upper(73, 8),
    ],
    // B.13
    &[
        L::new(1, 1, 0), L::new(2, 3, 0), L::new(3, 4, 0), L::new(4, 5, 0),
        L::new(5, 4, 1), L::new(7, 3, 3), L::new(15, 6, 1), L::new(17, 6, 2),
        L::new(21, 6, 3), L::new(29, 6, 4), L::new(45, 6, 5), L::new(77, 7, 6),
        L::upper(141, 7),
    ],
    // B.14
    &[
        L::new(-2, 3, 0), L::new(-1, 3, 0), L::new(0, 1, 0), L::new(1, 3, 0),
        L::new(2, 3, 0),
    ],
    // B.15
    &[
        L::new(-24, 7, 4), L::new(-8, 6, 2), L::new(-4, 5, 1), L::new(-2, 4, 0),
        L::new(-1, 3, 0), L::new(0, 1, 0), L::new(1, 3, 0), L::new(2, 4, 0),
        L::new(3, 5, 1), L::new(5, 6, 2), L::new(9, 7, 4), L::lower(-25, 7),
        L::upper(25, 7),
    ],
];
