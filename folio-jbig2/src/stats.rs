//! Adaptive context statistics for the arithmetic decoder (E.2.4).
//!
//! Every context value addresses one slot that tracks a probability estimate,
//! given as an index into the Qe table, and the value of the more probable
//! symbol. Slots start at index 0 with MPS 0 and are updated in place while
//! decoding.

use crate::error::{DataError, Result};
use crate::segment::generic_region::GbTemplate;

/// The state of a single context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Context {
    pub(crate) index: u8,
    pub(crate) mps: u8,
}

impl Context {
    /// The index into the probability estimation table, `0..=46`.
    pub fn state_index(self) -> u8 {
        self.index
    }

    /// The more probable symbol, 0 or 1.
    pub fn mps(self) -> u8 {
        self.mps
    }
}

/// A table of contexts, sized to the number of distinct context values of the
/// procedure that uses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderStats {
    contexts: Vec<Context>,
}

impl DecoderStats {
    /// Statistics for contexts made of `context_bits` bits.
    pub fn new(context_bits: u8) -> Self {
        Self::with_len(1 << context_bits)
    }

    /// Statistics with exactly `len` contexts.
    pub fn with_len(len: usize) -> Self {
        Self {
            contexts: vec![Context::default(); len],
        }
    }

    /// Statistics for the generic region decoding procedure with the given
    /// template: 16, 13, 10 and 10 context bits for templates 0 to 3.
    pub fn for_template(template: GbTemplate) -> Self {
        Self::new(template.context_bits())
    }

    /// Statistics for the integer decoding procedures (512 contexts).
    pub fn for_integers() -> Self {
        Self::new(9)
    }

    /// The number of contexts.
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Whether the table has no contexts.
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Put every context back into its initial state.
    pub fn reset(&mut self) {
        self.contexts.fill(Context::default());
    }

    /// The state of the context `cx`, if it exists.
    pub fn context(&self, cx: usize) -> Option<Context> {
        self.contexts.get(cx).copied()
    }

    #[inline(always)]
    pub(crate) fn get_mut(&mut self, cx: usize) -> Result<&mut Context> {
        self.contexts
            .get_mut(cx)
            .ok_or(DataError::ContextOutOfRange.into())
    }

    #[cfg(test)]
    pub(crate) fn set(&mut self, cx: usize, index: u8, mps: u8) {
        self.contexts[cx] = Context { index, mps };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;

    #[test]
    fn sizes_per_template() {
        assert_eq!(DecoderStats::for_template(GbTemplate::Template0).len(), 65536);
        assert_eq!(DecoderStats::for_template(GbTemplate::Template1).len(), 8192);
        assert_eq!(DecoderStats::for_template(GbTemplate::Template2).len(), 1024);
        assert_eq!(DecoderStats::for_template(GbTemplate::Template3).len(), 1024);
        assert_eq!(DecoderStats::for_integers().len(), 512);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut stats = DecoderStats::new(2);
        stats.set(3, 17, 1);
        assert_eq!(stats.context(3).map(|c| (c.state_index(), c.mps())), Some((17, 1)));

        stats.reset();
        assert_eq!(stats.context(3), Some(Context::default()));
    }

    #[test]
    fn out_of_range_context() {
        let mut stats = DecoderStats::new(1);

        assert!(stats.get_mut(1).is_ok());
        assert_eq!(
            stats.get_mut(2).err(),
            Some(DecodeError::InvalidData(DataError::ContextOutOfRange))
        );
        assert_eq!(stats.context(2), None);
    }
}
