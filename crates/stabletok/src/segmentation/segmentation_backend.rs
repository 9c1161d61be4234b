//! # Segmentation Backend Trait

use core::ops::Range;

use crate::types::TokenType;

/// Bytes-per-token used to size output buffers.
pub const EXPECTED_BYTES_PER_TOKEN: f64 = 4.0;

/// An execution tier for longest-match segmentation.
///
/// Every backend built from the same [`crate::vocab::PrefixIndex`] must
/// produce identical results for every input; only speed may differ.
pub trait SegmentationBackend<T: TokenType>: Send + Sync {
    /// A short name for logging.
    fn name(&self) -> &'static str;

    /// Longest token which is a prefix of ``text[start..]``.
    ///
    /// ## Arguments
    /// * `text` - the source bytes.
    /// * `start` - the byte offset to match at.
    /// * `max_lookahead` - the maximum number of bytes to walk.
    ///
    /// ## Returns
    /// ``Some((token, match_len))``, or `None` when no walked prefix is a token.
    fn lookup_longest_match(
        &self,
        text: &[u8],
        start: usize,
        max_lookahead: usize,
    ) -> Option<(T, usize)>;

    /// Greedy longest-match segmentation, appending to a target buffer.
    ///
    /// Unmatched bytes emit `unk` and advance exactly one byte.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, text, tokens)))]
    fn segment_append(
        &self,
        text: &[u8],
        unk: T,
        max_lookahead: usize,
        tokens: &mut Vec<T>,
    ) {
        let mut pos = 0;
        while pos < text.len() {
            match self.lookup_longest_match(text, pos, max_lookahead) {
                Some((token, len)) => {
                    tokens.push(token);
                    pos += len;
                }
                None => {
                    tokens.push(unk);
                    pos += 1;
                }
            }
        }
    }

    /// Greedy segmentation which also records each token's source byte range.
    fn segment_spans_append(
        &self,
        text: &[u8],
        unk: T,
        max_lookahead: usize,
        spans: &mut Vec<(T, Range<usize>)>,
    ) {
        let mut pos = 0;
        while pos < text.len() {
            let (token, len) = self
                .lookup_longest_match(text, pos, max_lookahead)
                .unwrap_or((unk, 1));
            spans.push((token, pos..pos + len));
            pos += len;
        }
    }

    /// Segment text into tokens.
    fn segment(
        &self,
        text: &[u8],
        unk: T,
        max_lookahead: usize,
    ) -> Vec<T> {
        let capacity = text.len() as f64 / EXPECTED_BYTES_PER_TOKEN;
        let mut tokens = Vec::with_capacity(capacity as usize);
        self.segment_append(text, unk, max_lookahead, &mut tokens);
        tokens
    }
}
