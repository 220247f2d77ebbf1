//! Error types for JBIG2 decoding.

use core::fmt;

/// The main error type for JBIG2 decoding operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// A header field holds a value that is not allowed.
    MalformedHeader(HeaderError),
    /// The data ended before a field or a coded bit was complete.
    TruncatedStream,
    /// A standard Huffman table was requested with a number outside of `1..=15`.
    InvalidTableIndex(i32),
    /// The data uses a feature that is not implemented.
    UnsupportedFeature(Unsupported),
    /// An out-of-band value was decoded where a number is required.
    IntegerOutOfRange,
    /// The coded payload of a segment is inconsistent.
    InvalidData(DataError),
}

/// Problems with header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderError {
    /// The file does not start with the JBIG2 signature.
    InvalidSignature,
    /// Reserved bits are not zero.
    ReservedBits,
    /// The referred-to segment count uses one of the reserved values 5 or 6.
    InvalidReferredCount,
    /// A segment refers to a segment with an equal or larger number.
    ForwardReference,
    /// An unknown data length was used by a segment that may not have one.
    UnexpectedUnknownLength,
    /// An unknown-length region has no end marker.
    MissingEndMarker,
    /// The combination operator is not one of OR, AND, XOR, XNOR or REPLACE.
    InvalidCombinationOperator,
    /// MMR coding was combined with a template other than 0.
    MmrWithTemplate,
    /// An adaptive template pixel refers to a pixel that is not decoded yet.
    InvalidAtPixel,
    /// The bitmap dimensions exceed the allowed number of pixels.
    BitmapTooLarge,
    /// The row count of an unknown-length region exceeds the declared height.
    RowCountTooLarge,
    /// A region appeared before the page information segment.
    MissingPageInformation,
    /// The page height is unknown and no end of stripe segment gives it.
    UnknownPageHeight,
}

/// Features that are recognized but not implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unsupported {
    /// A segment type without a decoder, holding the type code.
    SegmentType(u8),
    /// The extended template of generic regions (EXTTEMPLATE = 1).
    ExtendedTemplate,
    /// An MMR region wider or taller than 65535 pixels.
    MmrDimensions,
    /// A symbol ID code length above 31 bits.
    IaidCodeLength,
}

/// Problems with coded data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataError {
    /// A context index does not fit the statistics table.
    ContextOutOfRange,
    /// A bit sequence does not match any code of a Huffman table.
    InvalidHuffmanCode,
    /// The lines of a Huffman table produce colliding codes.
    InvalidHuffmanTable,
    /// The MMR codec rejected the data.
    InvalidMmrData,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedHeader(e) => write!(f, "malformed header: {e}"),
            Self::TruncatedStream => write!(f, "unexpected end of data"),
            Self::InvalidTableIndex(n) => write!(f, "invalid standard Huffman table {n}"),
            Self::UnsupportedFeature(e) => write!(f, "unsupported feature: {e}"),
            Self::IntegerOutOfRange => write!(f, "unexpected out-of-band value"),
            Self::InvalidData(e) => write!(f, "invalid data: {e}"),
        }
    }
}

impl fmt::Display for HeaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSignature => write!(f, "invalid JBIG2 file signature"),
            Self::ReservedBits => write!(f, "reserved bits must be zero"),
            Self::InvalidReferredCount => write!(f, "invalid referred-to segment count"),
            Self::ForwardReference => write!(f, "segment refers to a later segment"),
            Self::UnexpectedUnknownLength => {
                write!(f, "unknown data length on a segment that requires one")
            }
            Self::MissingEndMarker => write!(f, "missing end marker for unknown-length region"),
            Self::InvalidCombinationOperator => write!(f, "invalid combination operator"),
            Self::MmrWithTemplate => write!(f, "MMR coding requires template 0"),
            Self::InvalidAtPixel => write!(f, "invalid adaptive template pixel location"),
            Self::BitmapTooLarge => write!(f, "bitmap dimensions are too large"),
            Self::RowCountTooLarge => write!(f, "row count exceeds region height"),
            Self::MissingPageInformation => write!(f, "missing page information segment"),
            Self::UnknownPageHeight => write!(f, "page height unknown with no stripe segments"),
        }
    }
}

impl fmt::Display for Unsupported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SegmentType(code) => write!(f, "segment type {code}"),
            Self::ExtendedTemplate => write!(f, "extended generic region template"),
            Self::MmrDimensions => write!(f, "MMR region larger than 65535 pixels"),
            Self::IaidCodeLength => write!(f, "symbol ID code length above 31 bits"),
        }
    }
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContextOutOfRange => write!(f, "context index out of range"),
            Self::InvalidHuffmanCode => write!(f, "invalid Huffman code"),
            Self::InvalidHuffmanTable => write!(f, "Huffman table has colliding codes"),
            Self::InvalidMmrData => write!(f, "invalid MMR data"),
        }
    }
}

impl core::error::Error for DecodeError {}
impl core::error::Error for HeaderError {}
impl core::error::Error for Unsupported {}
impl core::error::Error for DataError {}

impl From<HeaderError> for DecodeError {
    fn from(e: HeaderError) -> Self {
        Self::MalformedHeader(e)
    }
}

impl From<Unsupported> for DecodeError {
    fn from(e: Unsupported) -> Self {
        Self::UnsupportedFeature(e)
    }
}

impl From<DataError> for DecodeError {
    fn from(e: DataError) -> Self {
        Self::InvalidData(e)
    }
}

/// Result type for JBIG2 decoding operations.
pub type Result<T> = core::result::Result<T, DecodeError>;

macro_rules! bail {
    ($err:expr) => {
        return Err($err.into())
    };
}

macro_rules! err {
    ($err:expr) => {
        Err($err.into())
    };
}

pub(crate) use bail;
pub(crate) use err;
