//! # Vocabulary Mapping ``{ Vec<u8> <-> T }``

use core::ops::Range;

use crate::{
    errors::{STResult, StableTokError},
    types::{STHashMap, TokenType, hash_map_with_capacity, token_from_usize, token_to_usize},
    vocab::{CategoryPolicy, TokenRecord},
};

/// The token/id bijection.
///
/// Records are kept in insertion order; the mapping is append-only,
/// an id is never reassigned to a different token.
///
/// ## Style Hints
/// Instance names should prefer `mapping`, or `vocab_mapping`.
#[derive(Debug, Clone)]
pub struct VocabMapping<T: TokenType> {
    records: Vec<TokenRecord<T>>,
    by_text: STHashMap<Vec<u8>, usize>,
    by_id: STHashMap<T, usize>,
}

impl<T: TokenType> Default for VocabMapping<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TokenType> PartialEq for VocabMapping<T> {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.records == other.records
    }
}

impl<T: TokenType> VocabMapping<T> {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty mapping with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            by_text: hash_map_with_capacity(capacity),
            by_id: hash_map_with_capacity(capacity),
        }
    }

    /// Build a mapping where list order implies id.
    ///
    /// Categories and frequency estimates are derived from `policy`.
    pub fn from_ordered_tokens<I>(
        tokens: I,
        policy: &CategoryPolicy,
    ) -> STResult<Self>
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        let mut mapping = Self::new();
        for (idx, text) in tokens.into_iter().enumerate() {
            let id: T = token_from_usize(idx)?;
            mapping.insert_derived(text, id, policy)?;
        }
        Ok(mapping)
    }

    /// Build a mapping from explicit ``(token, id)`` pairs.
    ///
    /// Records are inserted in ascending id order.
    pub fn from_pairs<I>(
        pairs: I,
        policy: &CategoryPolicy,
    ) -> STResult<Self>
    where
        I: IntoIterator<Item = (Vec<u8>, T)>,
    {
        let mut pairs: Vec<(Vec<u8>, T)> = pairs.into_iter().collect();
        pairs.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        let mut mapping = Self::with_capacity(pairs.len());
        for (text, id) in pairs {
            mapping.insert_derived(text, id, policy)?;
        }
        Ok(mapping)
    }

    /// Build a mapping from records, preserving their order.
    pub fn from_records<I>(records: I) -> STResult<Self>
    where
        I: IntoIterator<Item = TokenRecord<T>>,
    {
        let mut mapping = Self::new();
        for record in records {
            if !mapping.insert(record.clone())? {
                return Err(StableTokError::VocabConflict(format!(
                    "duplicate token {:?}",
                    record.text_lossy()
                )));
            }
        }
        Ok(mapping)
    }

    fn insert_derived(
        &mut self,
        text: Vec<u8>,
        id: T,
        policy: &CategoryPolicy,
    ) -> STResult<()> {
        let category = policy.categorize(&text);
        let frequency = policy.estimate_frequency(&text, category);
        let record = TokenRecord::new(text, id, category, frequency);
        if !self.insert(record.clone())? {
            return Err(StableTokError::VocabConflict(format!(
                "duplicate token {:?}",
                record.text_lossy()
            )));
        }
        Ok(())
    }

    /// Insert a record.
    ///
    /// ## Returns
    /// * `Ok(true)` if the record was added,
    /// * `Ok(false)` if an identical ``(token, id)`` entry was already present,
    /// * `Err(VocabConflict)` if the token or the id is bound elsewhere.
    pub fn insert(
        &mut self,
        record: TokenRecord<T>,
    ) -> STResult<bool> {
        if record.text().is_empty() {
            return Err(StableTokError::VocabConflict(
                "empty tokens are not permitted".to_string(),
            ));
        }

        match (
            self.by_text.get(record.text()).copied(),
            self.by_id.get(&record.id()).copied(),
        ) {
            (None, None) => {
                let idx = self.records.len();
                self.by_text.insert(record.text().to_vec(), idx);
                self.by_id.insert(record.id(), idx);
                self.records.push(record);
                Ok(true)
            }
            (Some(a), Some(b)) if a == b => Ok(false),
            (Some(idx), _) => Err(StableTokError::VocabConflict(format!(
                "token {:?} is already bound to id {}, not {}",
                record.text_lossy(),
                self.records[idx].id(),
                record.id()
            ))),
            (None, Some(idx)) => Err(StableTokError::VocabConflict(format!(
                "id {} is already bound to {:?}, not {:?}",
                record.id(),
                self.records[idx].text_lossy(),
                record.text_lossy()
            ))),
        }
    }

    /// The number of tokens.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Is the mapping empty?
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Is this token present?
    pub fn contains(
        &self,
        text: &[u8],
    ) -> bool {
        self.by_text.contains_key(text)
    }

    /// Is this id assigned?
    pub fn contains_id(
        &self,
        id: T,
    ) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Look up the id of a token.
    pub fn token_id(
        &self,
        text: &[u8],
    ) -> Option<T> {
        self.by_text.get(text).map(|&idx| self.records[idx].id())
    }

    /// Look up the token bytes of an id.
    pub fn token_text(
        &self,
        id: T,
    ) -> Option<&[u8]> {
        self.by_id.get(&id).map(|&idx| self.records[idx].text())
    }

    /// Look up the full record of an id.
    pub fn record(
        &self,
        id: T,
    ) -> Option<&TokenRecord<T>> {
        self.by_id.get(&id).map(|&idx| &self.records[idx])
    }

    /// Records, in insertion order.
    pub fn records(&self) -> &[TokenRecord<T>] {
        &self.records
    }

    /// Iterate over ``(token, id)`` pairs, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], T)> + '_ {
        self.records.iter().map(|r| (r.text(), r.id()))
    }

    /// The largest assigned id.
    pub fn max_token(&self) -> Option<T> {
        self.by_id.keys().max().copied()
    }

    /// The ids occupied within `range`, ascending.
    pub fn occupied_ids_in(
        &self,
        range: &Range<usize>,
    ) -> Vec<usize> {
        let mut ids: Vec<usize> = self
            .by_id
            .keys()
            .map(|&t| token_to_usize(t))
            .filter(|id| range.contains(id))
            .collect();
        ids.sort_unstable();
        ids
    }

    /// The tokens ordered by ascending id.
    pub fn tokens_by_id(&self) -> Vec<(T, &[u8])> {
        let mut pairs: Vec<(T, &[u8])> = self.records.iter().map(|r| (r.id(), r.text())).collect();
        pairs.sort_by_key(|&(id, _)| id);
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::TokenCategory;

    fn record(
        text: &str,
        id: u32,
    ) -> TokenRecord<u32> {
        TokenRecord::new(text.as_bytes().to_vec(), id, TokenCategory::Common, 1)
    }

    #[test]
    fn test_ordered_tokens() {
        type T = u32;
        let policy = CategoryPolicy::default();

        let mapping: VocabMapping<T> = VocabMapping::from_ordered_tokens(
            ["<UNK>", "a", "apple"].map(|s| s.as_bytes().to_vec()),
            &policy,
        )
        .unwrap();

        assert_eq!(mapping.len(), 3);
        assert_eq!(mapping.token_id(b"<UNK>"), Some(0));
        assert_eq!(mapping.token_id(b"apple"), Some(2));
        assert_eq!(mapping.token_text(1), Some(&b"a"[..]));
        assert_eq!(mapping.record(1).unwrap().category(), TokenCategory::AtomicUnit);
        assert_eq!(mapping.max_token(), Some(2));
        assert!(mapping.contains(b"a"));
        assert!(!mapping.contains(b"b"));
    }

    #[test]
    fn test_duplicate_ordered_tokens() {
        let policy = CategoryPolicy::default();
        let res = VocabMapping::<u32>::from_ordered_tokens(
            ["a", "a"].map(|s| s.as_bytes().to_vec()),
            &policy,
        );
        assert!(matches!(res, Err(StableTokError::VocabConflict(_))));
    }

    #[test]
    fn test_insert_bijection() {
        let mut mapping = VocabMapping::<u32>::new();

        assert!(mapping.insert(record("hello", 400)).unwrap());
        assert!(!mapping.insert(record("hello", 400)).unwrap());

        assert!(mapping.insert(record("hello", 401)).is_err());
        assert!(mapping.insert(record("world", 400)).is_err());
        assert!(mapping.insert(record("", 402)).is_err());

        assert_eq!(mapping.len(), 1);
    }

    #[test]
    fn test_from_pairs_orders_by_id() {
        let policy = CategoryPolicy::default();
        let mapping = VocabMapping::<u32>::from_pairs(
            vec![(b"b".to_vec(), 7), (b"a".to_vec(), 3)],
            &policy,
        )
        .unwrap();

        let order: Vec<u32> = mapping.iter().map(|(_, id)| id).collect();
        assert_eq!(order, vec![3, 7]);
        assert_eq!(mapping.occupied_ids_in(&(0..5)), vec![3]);
        assert_eq!(mapping.tokens_by_id()[1], (7, &b"b"[..]));
    }
}
