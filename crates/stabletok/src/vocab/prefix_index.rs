//! # Prefix Index (Byte Trie)
//!
//! An arena of nodes addressed by index. Each node holds a sorted edge
//! table of ``(byte -> child)`` pairs, stored as parallel arrays, and an
//! optional terminal token.

use crate::{
    errors::{STResult, StableTokError},
    types::TokenType,
    vocab::VocabMapping,
};

/// The index of the root node.
pub const ROOT: usize = 0;

/// Edge tables at or above this size are binary searched.
const LINEAR_SCAN_LIMIT: usize = 16;

/// A trie node.
#[derive(Debug, Clone, PartialEq)]
pub struct TrieNode<T: TokenType> {
    token: Option<T>,
    keys: Vec<u8>,
    children: Vec<u32>,
}

impl<T: TokenType> Default for TrieNode<T> {
    fn default() -> Self {
        Self {
            token: None,
            keys: Vec::new(),
            children: Vec::new(),
        }
    }
}

impl<T: TokenType> TrieNode<T> {
    /// The token terminating at this node, if any.
    pub fn token(&self) -> Option<T> {
        self.token
    }

    /// The sorted edge keys.
    pub fn keys(&self) -> &[u8] {
        &self.keys
    }

    /// The child indices, parallel to [`Self::keys`].
    pub fn children(&self) -> &[u32] {
        &self.children
    }

    #[inline(always)]
    fn find(
        &self,
        byte: u8,
    ) -> Result<usize, usize> {
        if self.keys.len() < LINEAR_SCAN_LIMIT {
            for (pos, &k) in self.keys.iter().enumerate() {
                if k == byte {
                    return Ok(pos);
                }
                if k > byte {
                    return Err(pos);
                }
            }
            Err(self.keys.len())
        } else {
            self.keys.binary_search(&byte)
        }
    }
}

/// Byte trie over the tokens of a [`VocabMapping`].
///
/// For every token `t` in the mapping, walking the bytes of `t` from
/// [`ROOT`] ends at a node whose token is the mapping's id for `t`.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefixIndex<T: TokenType> {
    nodes: Vec<TrieNode<T>>,
    token_count: usize,
}

impl<T: TokenType> Default for PrefixIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TokenType> PrefixIndex<T> {
    /// Create an index with only a root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![TrieNode::default()],
            token_count: 0,
        }
    }

    /// Build an index over every token in `mapping`.
    pub fn from_mapping(mapping: &VocabMapping<T>) -> STResult<Self> {
        let mut index = Self::new();
        for (text, id) in mapping.iter() {
            index.insert(text, id)?;
        }
        Ok(index)
    }

    /// The number of nodes, including the root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The number of token-bearing nodes.
    pub fn token_count(&self) -> usize {
        self.token_count
    }

    /// Get a node by index.
    pub fn node(
        &self,
        idx: usize,
    ) -> &TrieNode<T> {
        &self.nodes[idx]
    }

    /// All nodes, in arena order.
    pub fn nodes(&self) -> &[TrieNode<T>] {
        &self.nodes
    }

    /// Insert a token.
    ///
    /// Re-inserting the same ``(text, id)`` is a no-op;
    /// binding a terminal node to a different id is a conflict.
    pub fn insert(
        &mut self,
        text: &[u8],
        id: T,
    ) -> STResult<()> {
        if text.is_empty() {
            return Err(StableTokError::VocabConflict(
                "empty tokens are not permitted".to_string(),
            ));
        }

        let mut node = ROOT;
        for &byte in text {
            node = match self.nodes[node].find(byte) {
                Ok(pos) => self.nodes[node].children[pos] as usize,
                Err(pos) => {
                    let child = self.nodes.len();
                    let child_idx = u32::try_from(child).map_err(|_| {
                        StableTokError::VocabConflict("prefix index node overflow".to_string())
                    })?;
                    self.nodes.push(TrieNode::default());
                    let parent = &mut self.nodes[node];
                    parent.keys.insert(pos, byte);
                    parent.children.insert(pos, child_idx);
                    child
                }
            };
        }

        match self.nodes[node].token {
            Some(existing) if existing == id => Ok(()),
            Some(existing) => Err(StableTokError::VocabConflict(format!(
                "token {:?} is already indexed as {existing}, not {id}",
                String::from_utf8_lossy(text)
            ))),
            None => {
                self.nodes[node].token = Some(id);
                self.token_count += 1;
                Ok(())
            }
        }
    }

    /// Follow the edge for `byte` out of `node`.
    #[inline(always)]
    pub fn child(
        &self,
        node: usize,
        byte: u8,
    ) -> Option<usize> {
        let n = &self.nodes[node];
        n.find(byte).ok().map(|pos| n.children[pos] as usize)
    }

    /// Exact lookup of a token.
    pub fn get(
        &self,
        text: &[u8],
    ) -> Option<T> {
        let mut node = ROOT;
        for &byte in text {
            node = self.child(node, byte)?;
        }
        self.nodes[node].token
    }

    /// Longest token which is a prefix of ``text[start..]``.
    ///
    /// Walks at most `max_lookahead` bytes, stopping at the first byte with
    /// no edge.
    ///
    /// ## Returns
    /// ``Some((token, match_len))`` for the longest token-bearing prefix walked,
    /// or `None` if no walked prefix is a token.
    #[inline]
    pub fn lookup_longest_match(
        &self,
        text: &[u8],
        start: usize,
        max_lookahead: usize,
    ) -> Option<(T, usize)> {
        if start >= text.len() {
            return None;
        }
        let end = text.len().min(start.saturating_add(max_lookahead));

        let mut best = None;
        let mut node = ROOT;
        for (offset, &byte) in text[start..end].iter().enumerate() {
            match self.child(node, byte) {
                Some(next) => node = next,
                None => break,
            }
            if let Some(token) = self.nodes[node].token {
                best = Some((token, offset + 1));
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(tokens: &[(&str, u32)]) -> PrefixIndex<u32> {
        let mut index = PrefixIndex::new();
        for &(t, id) in tokens {
            index.insert(t.as_bytes(), id).unwrap();
        }
        index
    }

    #[test]
    fn test_insert_and_get() {
        let index = build(&[("un", 1), ("unfortunate", 2), ("ly", 3)]);

        assert_eq!(index.token_count(), 3);
        assert_eq!(index.get(b"un"), Some(1));
        assert_eq!(index.get(b"unfortunate"), Some(2));
        assert_eq!(index.get(b"unfortun"), None);
        assert_eq!(index.get(b"x"), None);

        // Shared prefix: "un" + "fortunate" + "ly".
        assert_eq!(index.node_count(), 1 + 11 + 2);
    }

    #[test]
    fn test_reinsert_and_conflict() {
        let mut index = build(&[("ab", 1)]);
        index.insert(b"ab", 1).unwrap();
        assert_eq!(index.token_count(), 1);

        assert!(index.insert(b"ab", 2).is_err());
        assert!(index.insert(b"", 3).is_err());
    }

    #[test]
    fn test_edges_sorted() {
        let mut index = PrefixIndex::<u32>::new();
        for (i, b) in (0..=255u8).rev().enumerate() {
            index.insert(&[b], i as u32).unwrap();
        }
        let root = index.node(ROOT);
        assert_eq!(root.keys().len(), 256);
        assert!(root.keys().windows(2).all(|w| w[0] < w[1]));

        for b in 0..=255u8 {
            assert_eq!(index.get(&[b]), Some(255 - b as u32));
        }
    }

    #[test]
    fn test_longest_match() {
        let index = build(&[("un", 1), ("fortunate", 2), ("ly", 3), ("unfortunate", 4)]);
        let text = b"unfortunately";

        assert_eq!(index.lookup_longest_match(text, 0, 256), Some((4, 11)));
        assert_eq!(index.lookup_longest_match(text, 11, 256), Some((3, 2)));
        assert_eq!(index.lookup_longest_match(text, 2, 256), Some((2, 9)));

        // Lookahead bound truncates to the shorter token.
        assert_eq!(index.lookup_longest_match(text, 0, 5), Some((1, 2)));

        // No match.
        assert_eq!(index.lookup_longest_match(b"xyz", 0, 256), None);
        assert_eq!(index.lookup_longest_match(text, 13, 256), None);
        assert_eq!(index.lookup_longest_match(text, 0, 0), None);
    }

    #[test]
    fn test_no_backtracking() {
        // "ab" and "abcd" exist, "abc" does not; "abcx" must fall back to "ab".
        let index = build(&[("ab", 1), ("abcd", 2)]);
        assert_eq!(index.lookup_longest_match(b"abcx", 0, 256), Some((1, 2)));
    }
}
