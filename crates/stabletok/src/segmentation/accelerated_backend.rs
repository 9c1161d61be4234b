//! # Accelerated Backend
//!
//! The arena trie flattened into a compressed sparse row layout:
//! all edge keys live in one contiguous array, sliced per node by
//! an offsets table, and the root is a dense 256-entry jump table.

use crate::{
    errors::{STResult, StableTokError},
    segmentation::SegmentationBackend,
    types::TokenType,
    vocab::{PrefixIndex, prefix_index::ROOT},
};

/// Sentinel for "no child".
const NO_NODE: u32 = u32::MAX;

/// CSR-layout segmentation backend.
#[derive(Debug, Clone)]
pub struct AcceleratedBackend<T: TokenType> {
    root_table: Box<[u32; 256]>,
    offsets: Vec<u32>,
    keys: Vec<u8>,
    targets: Vec<u32>,
    tokens: Vec<Option<T>>,
}

impl<T: TokenType> AcceleratedBackend<T> {
    /// Flatten a [`PrefixIndex`].
    ///
    /// ## Returns
    /// An error if the index is too large for the 32-bit layout.
    pub fn try_build(index: &PrefixIndex<T>) -> STResult<Self> {
        let nodes = index.nodes();
        let edge_count: usize = nodes.iter().map(|n| n.keys().len()).sum();
        if nodes.len() >= NO_NODE as usize || edge_count >= NO_NODE as usize {
            return Err(StableTokError::InvalidConfig(format!(
                "prefix index too large for accelerated layout: {} nodes, {edge_count} edges",
                nodes.len()
            )));
        }

        let mut offsets = Vec::with_capacity(nodes.len() + 1);
        let mut keys = Vec::with_capacity(edge_count);
        let mut targets = Vec::with_capacity(edge_count);
        let mut tokens = Vec::with_capacity(nodes.len());

        for node in nodes {
            offsets.push(keys.len() as u32);
            keys.extend_from_slice(node.keys());
            targets.extend_from_slice(node.children());
            tokens.push(node.token());
        }
        offsets.push(keys.len() as u32);

        let mut root_table = Box::new([NO_NODE; 256]);
        let root = index.node(ROOT);
        for (&k, &child) in root.keys().iter().zip(root.children()) {
            root_table[k as usize] = child;
        }

        Ok(Self {
            root_table,
            offsets,
            keys,
            targets,
            tokens,
        })
    }

    /// The number of flattened nodes.
    pub fn node_count(&self) -> usize {
        self.tokens.len()
    }

    #[inline(always)]
    fn child(
        &self,
        node: usize,
        byte: u8,
    ) -> Option<usize> {
        let lo = self.offsets[node] as usize;
        let hi = self.offsets[node + 1] as usize;
        self.keys[lo..hi]
            .binary_search(&byte)
            .ok()
            .map(|pos| self.targets[lo + pos] as usize)
    }
}

impl<T: TokenType> SegmentationBackend<T> for AcceleratedBackend<T> {
    fn name(&self) -> &'static str {
        "accelerated"
    }

    #[inline]
    fn lookup_longest_match(
        &self,
        text: &[u8],
        start: usize,
        max_lookahead: usize,
    ) -> Option<(T, usize)> {
        if start >= text.len() || max_lookahead == 0 {
            return None;
        }
        let end = text.len().min(start.saturating_add(max_lookahead));

        let first = self.root_table[text[start] as usize];
        if first == NO_NODE {
            return None;
        }
        let mut node = first as usize;
        let mut best = self.tokens[node].map(|t| (t, 1));

        for pos in start + 1..end {
            match self.child(node, text[pos]) {
                Some(next) => node = next,
                None => break,
            }
            if let Some(token) = self.tokens[node] {
                best = Some((token, pos - start + 1));
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::ReferenceBackend;
    use std::sync::Arc;

    #[test]
    fn test_flattened_layout() {
        type T = u32;
        let mut index = PrefixIndex::<T>::new();
        for (t, id) in [("un", 1), ("unfortunate", 2), ("ly", 3)] {
            index.insert(t.as_bytes(), id).unwrap();
        }

        let backend = AcceleratedBackend::try_build(&index).unwrap();
        assert_eq!(backend.node_count(), index.node_count());

        assert_eq!(
            backend.lookup_longest_match(b"unfortunately", 0, 256),
            Some((2, 11))
        );
        assert_eq!(backend.segment(b"unfortunately", 0, 256), vec![2, 3]);
        assert_eq!(backend.lookup_longest_match(b"unfortunately", 0, 1), None);
        assert_eq!(backend.lookup_longest_match(b"zz", 0, 256), None);
    }

    #[test]
    fn test_matches_reference() {
        type T = u32;
        let mut index = PrefixIndex::<T>::new();
        for (id, t) in ["a", "ab", "abc", "b", "bca", "<UNK>", "é", "\u{1F600}"]
            .iter()
            .enumerate()
        {
            index.insert(t.as_bytes(), id as T + 1).unwrap();
        }
        let index = Arc::new(index);

        let reference = ReferenceBackend::new(index.clone());
        let accelerated = AcceleratedBackend::try_build(&index).unwrap();

        for sample in ["", "abcabca", "ab<UNK>bc", "éa\u{1F600}b", "xyzab", "abcd"] {
            for lookahead in [1, 2, 3, 256] {
                assert_eq!(
                    accelerated.segment(sample.as_bytes(), 0, lookahead),
                    reference.segment(sample.as_bytes(), 0, lookahead),
                    "sample {sample:?}, lookahead {lookahead}"
                );
            }
        }
    }
}
