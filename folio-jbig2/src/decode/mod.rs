//! Bitmap decoding procedures shared by the region segments.

pub(crate) mod generic;
pub(crate) mod mmr;
