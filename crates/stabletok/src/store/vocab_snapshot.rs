//! # Vocabulary Snapshot
//!
//! An immutable ``(mapping, index, backend)`` triple; all reads go
//! through a snapshot, and all mutation builds a new one.

use core::{fmt, ops::Range};
use std::sync::Arc;

use crate::{
    errors::STResult,
    segmentation::{EXPECTED_BYTES_PER_TOKEN, SegmentationBackend},
    store::StoreOptions,
    types::TokenType,
    vocab::{PrefixIndex, TokenRecord, VocabMapping, prefix_index::TrieNode},
};

/// Per-record bookkeeping overhead, in bytes; used for memory estimates.
const RECORD_OVERHEAD_BYTES: usize = 96;

/// An immutable vocabulary snapshot.
#[derive(Clone)]
pub struct VocabSnapshot<T: TokenType> {
    mapping: Arc<VocabMapping<T>>,
    index: Arc<PrefixIndex<T>>,
    backend: Arc<dyn SegmentationBackend<T>>,
    unk_text: Vec<u8>,
    unk_id: T,
    max_lookahead: usize,
    generation: u64,
}

impl<T: TokenType> fmt::Debug for VocabSnapshot<T> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("VocabSnapshot")
            .field("size", &self.mapping.len())
            .field("nodes", &self.index.node_count())
            .field("backend", &self.backend.name())
            .field("unk_id", &self.unk_id)
            .field("max_lookahead", &self.max_lookahead)
            .field("generation", &self.generation)
            .finish()
    }
}

impl<T: TokenType> VocabSnapshot<T> {
    /// Build a snapshot over a mapping.
    ///
    /// ## Arguments
    /// * `mapping` - the vocabulary.
    /// * `options` - backend selection, lookahead, and unknown placeholder.
    /// * `generation` - the publish sequence number.
    pub fn build(
        mapping: VocabMapping<T>,
        options: &StoreOptions,
        generation: u64,
    ) -> STResult<Self> {
        options.validate()?;
        let index = PrefixIndex::from_mapping(&mapping)?;
        Ok(Self::assemble(
            Arc::new(mapping),
            Arc::new(index),
            options,
            generation,
        ))
    }

    fn assemble(
        mapping: Arc<VocabMapping<T>>,
        index: Arc<PrefixIndex<T>>,
        options: &StoreOptions,
        generation: u64,
    ) -> Self {
        let unk_text = options.unk_token().as_bytes().to_vec();
        let unk_id = match mapping.token_id(&unk_text) {
            Some(id) => id,
            None => {
                log::warn!(
                    "unknown token {:?} is not in the vocabulary; using id 0",
                    options.unk_token()
                );
                T::zero()
            }
        };

        let backend = options.backend().build(index.clone());
        log::debug!(
            "built vocab snapshot: generation={generation}, size={}, nodes={}, backend={}",
            mapping.len(),
            index.node_count(),
            backend.name()
        );

        Self {
            mapping,
            index,
            backend,
            unk_text,
            unk_id,
            max_lookahead: options.max_lookahead(),
            generation,
        }
    }

    /// Build the successor snapshot with `records` merged in.
    ///
    /// Records already present are skipped.
    ///
    /// ## Returns
    /// The new snapshot and the number of records added; conflicting
    /// records fail the whole merge.
    pub fn extend<I>(
        &self,
        records: I,
        options: &StoreOptions,
    ) -> STResult<(Self, usize)>
    where
        I: IntoIterator<Item = TokenRecord<T>>,
    {
        let mut mapping = (*self.mapping).clone();
        let mut index = (*self.index).clone();

        let mut added = 0;
        for record in records {
            let (text, id) = (record.text().to_vec(), record.id());
            if mapping.insert(record)? {
                index.insert(&text, id)?;
                added += 1;
            }
        }

        let next = Self::assemble(
            Arc::new(mapping),
            Arc::new(index),
            options,
            self.generation + 1,
        );
        Ok((next, added))
    }

    /// The mapping.
    pub fn mapping(&self) -> &Arc<VocabMapping<T>> {
        &self.mapping
    }

    /// The prefix index.
    pub fn index(&self) -> &Arc<PrefixIndex<T>> {
        &self.index
    }

    /// The segmentation backend.
    pub fn backend(&self) -> &Arc<dyn SegmentationBackend<T>> {
        &self.backend
    }

    /// The publish sequence number.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The id emitted for unmatched bytes.
    pub fn unk_id(&self) -> T {
        self.unk_id
    }

    /// The placeholder text for unknown ids.
    pub fn unk_text(&self) -> &[u8] {
        &self.unk_text
    }

    /// The lookahead bound.
    pub fn max_lookahead(&self) -> usize {
        self.max_lookahead
    }

    /// The number of tokens.
    pub fn size(&self) -> usize {
        self.mapping.len()
    }

    /// Is the token present?
    pub fn contains(
        &self,
        text: &[u8],
    ) -> bool {
        self.mapping.contains(text)
    }

    /// The id of a token, or the unknown id.
    pub fn token_id(
        &self,
        text: &[u8],
    ) -> T {
        self.mapping.token_id(text).unwrap_or(self.unk_id)
    }

    /// The text of an id, or the unknown placeholder.
    pub fn token_text(
        &self,
        id: T,
    ) -> &[u8] {
        self.mapping.token_text(id).unwrap_or(&self.unk_text)
    }

    /// Longest token which is a prefix of ``text[start..]``.
    pub fn lookup_longest_match(
        &self,
        text: &[u8],
        start: usize,
        max_lookahead: usize,
    ) -> Option<(T, usize)> {
        self.backend.lookup_longest_match(text, start, max_lookahead)
    }

    /// Greedy longest-match segmentation.
    pub fn segment(
        &self,
        text: &[u8],
    ) -> Vec<T> {
        self.backend.segment(text, self.unk_id, self.max_lookahead)
    }

    /// Greedy segmentation with the source byte range of each token.
    pub fn segment_spans(
        &self,
        text: &[u8],
    ) -> Vec<(T, Range<usize>)> {
        let capacity = text.len() as f64 / EXPECTED_BYTES_PER_TOKEN;
        let mut spans = Vec::with_capacity(capacity as usize);
        self.backend
            .segment_spans_append(text, self.unk_id, self.max_lookahead, &mut spans);
        spans
    }

    /// Decode tokens to bytes.
    ///
    /// Ids outside the mapping decode to the unknown placeholder.
    pub fn decode_to_bytes(
        &self,
        tokens: &[T],
    ) -> Vec<u8> {
        let mut buf = Vec::with_capacity(tokens.len() * EXPECTED_BYTES_PER_TOKEN as usize);
        for &t in tokens {
            buf.extend_from_slice(self.token_text(t));
        }
        buf
    }

    /// Decode tokens to a string, replacing invalid UTF-8.
    pub fn decode(
        &self,
        tokens: &[T],
    ) -> String {
        String::from_utf8_lossy(&self.decode_to_bytes(tokens)).into_owned()
    }

    /// Rough resident size of the mapping and index, in bytes.
    pub fn estimated_memory_bytes(&self) -> usize {
        let token_bytes: usize = self.mapping.records().iter().map(|r| r.byte_length()).sum();
        let records = self.mapping.len() * RECORD_OVERHEAD_BYTES;
        let nodes = self.index.node_count() * size_of::<TrieNode<T>>();
        let edges = self.index.node_count().saturating_sub(1) * (size_of::<u8>() + size_of::<u32>());
        token_bytes * 2 + records + nodes + edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::CategoryPolicy;

    fn snapshot(tokens: &[&str]) -> VocabSnapshot<u32> {
        let mapping = VocabMapping::from_ordered_tokens(
            tokens.iter().map(|t| t.as_bytes().to_vec()),
            &CategoryPolicy::default(),
        )
        .unwrap();
        VocabSnapshot::build(mapping, &StoreOptions::default(), 0).unwrap()
    }

    #[test]
    fn test_unk_and_decode() {
        let snap = snapshot(&["<PAD>", "<UNK>", "a", "b", "ab"]);
        assert_eq!(snap.unk_id(), 1);

        let tokens = snap.segment(b"abxa");
        assert_eq!(tokens, vec![4, 1, 2]);
        assert_eq!(snap.decode(&tokens), "ab<UNK>a");

        // Out-of-mapping ids decode to the placeholder.
        assert_eq!(snap.decode(&[2, 999]), "a<UNK>");
        assert_eq!(snap.token_id(b"zz"), 1);
        assert_eq!(snap.token_text(999), b"<UNK>");
    }

    #[test]
    fn test_missing_unk_uses_zero() {
        let snap = snapshot(&["a", "b"]);
        assert_eq!(snap.unk_id(), 0);
        assert_eq!(snap.segment(b"ac"), vec![0, 0]);
    }

    #[test]
    fn test_extend() {
        let snap = snapshot(&["<UNK>", "a"]);
        let options = StoreOptions::default();

        let (next, added) = snap
            .extend(
                vec![
                    TokenRecord::new(b"a".to_vec(), 1, crate::vocab::TokenCategory::AtomicUnit, 1),
                    TokenRecord::new(b"aa".to_vec(), 7, crate::vocab::TokenCategory::Common, 1),
                ],
                &options,
            )
            .unwrap();

        assert_eq!(added, 1);
        assert_eq!(next.generation(), 1);
        assert_eq!(next.segment(b"aaa"), vec![7, 1]);

        // The base snapshot is untouched.
        assert_eq!(snap.size(), 2);
        assert_eq!(snap.segment(b"aaa"), vec![1, 1, 1]);
    }

    #[test]
    fn test_segment_spans() {
        let snap = snapshot(&["<UNK>", "ab"]);
        assert_eq!(
            snap.segment_spans("abé".as_bytes()),
            vec![(1, 0..2), (0, 2..3), (0, 3..4)]
        );
    }
}
