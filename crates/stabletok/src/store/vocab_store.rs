//! # Vocabulary Store
//!
//! Readers load the current [`VocabSnapshot`] lock-free; writers build a
//! complete successor snapshot and publish it with one atomic swap.
//! Publishes are serialized by a writer lock.

use core::ops::Range;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::{
    errors::STResult,
    store::{StoreOptions, VocabSnapshot},
    types::TokenType,
    vocab::{TokenRecord, VocabMapping},
};

/// The live vocabulary.
///
/// ## Style Hints
/// Instance names should prefer `store`, or `vocab_store`.
pub struct VocabStore<T: TokenType> {
    current: ArcSwap<VocabSnapshot<T>>,
    writer: Mutex<()>,
    options: StoreOptions,
}

impl<T: TokenType> core::fmt::Debug for VocabStore<T> {
    fn fmt(
        &self,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        f.debug_struct("VocabStore")
            .field("snapshot", &*self.current.load())
            .field("options", &self.options)
            .finish()
    }
}

impl<T: TokenType> VocabStore<T> {
    /// Create a store over an initial mapping.
    pub fn new(
        mapping: VocabMapping<T>,
        options: StoreOptions,
    ) -> STResult<Self> {
        let snapshot = VocabSnapshot::build(mapping, &options, 0)?;
        Ok(Self {
            current: ArcSwap::from_pointee(snapshot),
            writer: Mutex::new(()),
            options,
        })
    }

    /// The store options.
    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Pin the current snapshot.
    ///
    /// The returned snapshot is unaffected by later publishes.
    pub fn snapshot(&self) -> Arc<VocabSnapshot<T>> {
        self.current.load_full()
    }

    /// Merge records into the vocabulary, and publish.
    ///
    /// ## Returns
    /// The number of records added; nothing is published if none were.
    pub fn merge_mapping<I>(
        &self,
        records: I,
    ) -> STResult<usize>
    where
        I: IntoIterator<Item = TokenRecord<T>>,
    {
        self.merge_with(|_| Ok(records.into_iter().collect()))
    }

    /// Compute records from the current snapshot, merge them, and publish.
    ///
    /// `plan` runs under the writer lock, so the snapshot it sees is the one
    /// that will be extended.
    pub fn merge_with<F>(
        &self,
        plan: F,
    ) -> STResult<usize>
    where
        F: FnOnce(&VocabSnapshot<T>) -> STResult<Vec<TokenRecord<T>>>,
    {
        let _guard = self.writer.lock();
        let current = self.current.load_full();

        let records = plan(&current)?;
        if records.is_empty() {
            return Ok(0);
        }

        let (next, added) = current.extend(records, &self.options)?;
        if added > 0 {
            self.current.store(Arc::new(next));
        }
        Ok(added)
    }

    /// Replace the whole mapping, and publish.
    pub fn replace_mapping(
        &self,
        mapping: VocabMapping<T>,
    ) -> STResult<()> {
        let _guard = self.writer.lock();
        let generation = self.current.load().generation() + 1;
        let next = VocabSnapshot::build(mapping, &self.options, generation)?;
        self.current.store(Arc::new(next));
        Ok(())
    }

    /// Segment text into tokens.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, text)))]
    pub fn tokenize<S: AsRef<str>>(
        &self,
        text: S,
    ) -> Vec<T> {
        self.segment(text.as_ref().as_bytes())
    }

    /// Alias of [`Self::tokenize`].
    pub fn encode<S: AsRef<str>>(
        &self,
        text: S,
    ) -> Vec<T> {
        self.tokenize(text)
    }

    /// Segment bytes into tokens.
    pub fn segment(
        &self,
        text: &[u8],
    ) -> Vec<T> {
        self.current.load().segment(text)
    }

    /// Segment bytes, with the source range of each token.
    pub fn segment_spans(
        &self,
        text: &[u8],
    ) -> Vec<(T, Range<usize>)> {
        self.current.load().segment_spans(text)
    }

    /// Segment a batch of texts.
    ///
    /// The whole batch is segmented against one snapshot.
    pub fn segment_batch<S>(
        &self,
        batch: &[S],
    ) -> Vec<Vec<T>>
    where
        S: AsRef<str> + Sync,
    {
        let snapshot = self.snapshot();

        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            batch
                .par_iter()
                .map(|text| snapshot.segment(text.as_ref().as_bytes()))
                .collect()
        }

        #[cfg(not(feature = "rayon"))]
        {
            batch
                .iter()
                .map(|text| snapshot.segment(text.as_ref().as_bytes()))
                .collect()
        }
    }

    /// Longest token which is a prefix of ``text[start..]``.
    pub fn lookup_longest_match(
        &self,
        text: &[u8],
        start: usize,
        max_lookahead: usize,
    ) -> Option<(T, usize)> {
        self.current
            .load()
            .lookup_longest_match(text, start, max_lookahead)
    }

    /// Decode tokens to a string; see [`VocabSnapshot::decode`].
    pub fn decode(
        &self,
        tokens: &[T],
    ) -> String {
        self.current.load().decode(tokens)
    }

    /// Decode tokens to bytes; see [`VocabSnapshot::decode_to_bytes`].
    pub fn decode_to_bytes(
        &self,
        tokens: &[T],
    ) -> Vec<u8> {
        self.current.load().decode_to_bytes(tokens)
    }

    /// The number of tokens.
    pub fn size(&self) -> usize {
        self.current.load().size()
    }

    /// Is the token present?
    pub fn contains(
        &self,
        text: &[u8],
    ) -> bool {
        self.current.load().contains(text)
    }

    /// The id of a token, or the unknown id.
    pub fn token_id(
        &self,
        text: &[u8],
    ) -> T {
        self.current.load().token_id(text)
    }

    /// The text of an id, or the unknown placeholder.
    pub fn token_text(
        &self,
        id: T,
    ) -> Vec<u8> {
        self.current.load().token_text(id).to_vec()
    }

    /// The id emitted for unmatched bytes.
    pub fn unk_id(&self) -> T {
        self.current.load().unk_id()
    }
}
