//! # Reference Backend

use std::sync::Arc;

use crate::{segmentation::SegmentationBackend, types::TokenType, vocab::PrefixIndex};

/// Reference segmentation; walks the arena [`PrefixIndex`] directly.
#[derive(Debug, Clone)]
pub struct ReferenceBackend<T: TokenType> {
    index: Arc<PrefixIndex<T>>,
}

impl<T: TokenType> ReferenceBackend<T> {
    /// Create a new reference backend.
    pub fn new(index: Arc<PrefixIndex<T>>) -> Self {
        Self { index }
    }

    /// The wrapped index.
    pub fn index(&self) -> &Arc<PrefixIndex<T>> {
        &self.index
    }
}

impl<T: TokenType> SegmentationBackend<T> for ReferenceBackend<T> {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn lookup_longest_match(
        &self,
        text: &[u8],
        start: usize,
        max_lookahead: usize,
    ) -> Option<(T, usize)> {
        self.index.lookup_longest_match(text, start, max_lookahead)
    }
}
