//! # Stable ID Allocator
//!
//! Assigns ids to new tokens so that:
//! * no previously assigned id changes;
//! * the result depends only on the new token set and the existing occupancy,
//!   never on submission order;
//! * each id lies in its category's range, or in RARE once that range is full.

use core::{cmp::Ordering, ops::Range};

use strum::IntoEnumIterator;

use crate::{
    allocation::AllocatorOptions,
    errors::{STResult, StableTokError},
    types::{STHashMap, STHashSet, TokenType, hash_map_new, token_from_usize},
    vocab::{CategoryPolicy, Fingerprint, TokenCategory, TokenRecord, VocabMapping, fingerprint},
};

/// Special tokens included in every mapping built by [`build_stable_mapping`].
pub const DEFAULT_SPECIAL_TOKENS: [&str; 4] = ["<PAD>", "<UNK>", "<BOS>", "<EOS>"];

/// The result of an allocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Allocation<T: TokenType> {
    /// New records, in ascending id order.
    pub assignments: Vec<TokenRecord<T>>,

    /// Submitted tokens skipped as duplicates or empty.
    pub skipped: usize,
}

impl<T: TokenType> Allocation<T> {
    /// The number of new assignments.
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Were no tokens assigned?
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Look up the id assigned to a token.
    pub fn id_of(
        &self,
        text: &[u8],
    ) -> Option<T> {
        self.assignments
            .iter()
            .find(|r| r.text() == text)
            .map(|r| r.id())
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    text: Vec<u8>,
    category: TokenCategory,
    frequency: u64,
    fingerprint: Fingerprint,
}

/// Forward-only probe for unoccupied ids in one range.
struct IdCursor {
    range: Range<usize>,
    occupied: Vec<usize>,
    occupied_pos: usize,
    next: usize,
}

impl IdCursor {
    fn new<T: TokenType>(
        range: Range<usize>,
        mapping: &VocabMapping<T>,
    ) -> Self {
        let occupied = mapping.occupied_ids_in(&range);
        let next = range.start;
        Self {
            range,
            occupied,
            occupied_pos: 0,
            next,
        }
    }

    fn next_free(&mut self) -> Option<usize> {
        while self.next < self.range.end {
            while self.occupied_pos < self.occupied.len()
                && self.occupied[self.occupied_pos] < self.next
            {
                self.occupied_pos += 1;
            }
            if self.occupied.get(self.occupied_pos) == Some(&self.next) {
                self.next += 1;
                continue;
            }
            let id = self.next;
            self.next += 1;
            return Some(id);
        }
        None
    }
}

/// Deterministic category-range id allocator.
///
/// A pure service: it reads the mapping it is handed and returns
/// new records; it never mutates the mapping.
#[derive(Debug, Clone)]
pub struct StableIdAllocator {
    options: AllocatorOptions,
}

impl StableIdAllocator {
    /// Create a new allocator; the category ranges are validated.
    pub fn new(options: AllocatorOptions) -> STResult<Self> {
        options.ranges.validate()?;
        Ok(Self { options })
    }

    /// The allocator options.
    pub fn options(&self) -> &AllocatorOptions {
        &self.options
    }

    /// The categorization policy.
    pub fn policy(&self) -> &CategoryPolicy {
        &self.options.policy
    }

    /// Classify a token.
    pub fn categorize(
        &self,
        text: &[u8],
    ) -> TokenCategory {
        self.options.policy.categorize(text)
    }

    fn compare(
        category: TokenCategory,
        a: &Candidate,
        b: &Candidate,
    ) -> Ordering {
        if category.is_frequency_prioritized() {
            b.frequency
                .cmp(&a.frequency)
                .then_with(|| a.text.len().cmp(&b.text.len()))
                .then_with(|| a.text.cmp(&b.text))
                .then_with(|| a.fingerprint.cmp(&b.fingerprint))
        } else {
            a.text
                .len()
                .cmp(&b.text.len())
                .then_with(|| a.text.cmp(&b.text))
                .then_with(|| b.frequency.cmp(&a.frequency))
                .then_with(|| a.fingerprint.cmp(&b.fingerprint))
        }
    }

    /// Sort tokens of one category into assignment order.
    pub fn sort_category<S: AsRef<[u8]>>(
        &self,
        category: TokenCategory,
        tokens: &[S],
    ) -> Vec<Vec<u8>> {
        let mut candidates: Vec<Candidate> = tokens
            .iter()
            .map(|t| self.candidate(t.as_ref().to_vec()))
            .collect();
        candidates.sort_by(|a, b| Self::compare(category, a, b));
        candidates.into_iter().map(|c| c.text).collect()
    }

    fn candidate(
        &self,
        text: Vec<u8>,
    ) -> Candidate {
        let policy = &self.options.policy;
        let category = policy.categorize(&text);
        let frequency = policy.estimate_frequency(&text, category);
        let fingerprint = fingerprint(&text);
        Candidate {
            text,
            category,
            frequency,
            fingerprint,
        }
    }

    /// Assign ids to the tokens not already in `mapping`.
    ///
    /// ## Arguments
    /// * `mapping` - the existing vocabulary; its ids are never changed.
    /// * `tokens` - the submitted tokens; duplicates are skipped.
    ///
    /// ## Returns
    /// The new records in ascending id order, or
    /// `VocabularyCapacityExceeded` if a token fits neither its own range
    /// nor RARE. On error, nothing has been assigned.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub fn allocate<T, I, S>(
        &self,
        mapping: &VocabMapping<T>,
        tokens: I,
    ) -> STResult<Allocation<T>>
    where
        T: TokenType,
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let mut skipped = 0;
        let mut seen: STHashSet<Vec<u8>> = Default::default();
        let mut groups: STHashMap<TokenCategory, Vec<Candidate>> = hash_map_new();

        for token in tokens {
            let text = token.as_ref();
            if text.is_empty() || mapping.contains(text) || seen.contains(text) {
                skipped += 1;
                continue;
            }
            seen.insert(text.to_vec());
            let candidate = self.candidate(text.to_vec());
            groups.entry(candidate.category).or_default().push(candidate);
        }

        let ranges = &self.options.ranges;
        let mut rare_cursor = IdCursor::new(ranges.rare.clone(), mapping);
        let mut assignments = Vec::with_capacity(seen.len());

        for category in TokenCategory::iter() {
            let Some(mut group) = groups.remove(&category) else {
                continue;
            };
            group.sort_by(|a, b| Self::compare(category, a, b));

            let mut own_cursor = match category {
                TokenCategory::Rare => None,
                _ => Some(IdCursor::new(ranges.get(category), mapping)),
            };

            for candidate in group {
                let id = match own_cursor.as_mut().and_then(IdCursor::next_free) {
                    Some(id) => id,
                    None => {
                        let id = rare_cursor
                            .next_free()
                            .ok_or(StableTokError::VocabularyCapacityExceeded { category })?;
                        if category != TokenCategory::Rare {
                            log::debug!(
                                "{category} range exhausted; {:?} spills over to rare id {id}",
                                String::from_utf8_lossy(&candidate.text)
                            );
                        }
                        id
                    }
                };
                assignments.push(TokenRecord::new(
                    candidate.text,
                    token_from_usize(id)?,
                    candidate.category,
                    candidate.frequency,
                ));
            }
        }

        assignments.sort_by_key(|r| r.id());
        Ok(Allocation {
            assignments,
            skipped,
        })
    }
}

/// Build a mapping from scratch.
///
/// [`DEFAULT_SPECIAL_TOKENS`] are always included.
pub fn build_stable_mapping<T, I, S>(
    tokens: I,
    options: &AllocatorOptions,
) -> STResult<VocabMapping<T>>
where
    T: TokenType,
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let allocator = StableIdAllocator::new(options.clone())?;

    let mut all: Vec<Vec<u8>> = DEFAULT_SPECIAL_TOKENS
        .iter()
        .map(|s| s.as_bytes().to_vec())
        .collect();
    all.extend(tokens.into_iter().map(|t| t.as_ref().to_vec()));

    let allocation = allocator.allocate(&VocabMapping::new(), all)?;
    log::info!(
        "built stable mapping: {} tokens ({} skipped)",
        allocation.len(),
        allocation.skipped
    );
    VocabMapping::from_records(allocation.assignments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::CategoryRanges;

    type T = u32;

    fn small_ranges() -> CategoryRanges {
        CategoryRanges {
            special: 0..2,
            atomic_unit: 2..4,
            common: 4..6,
            subword: 6..8,
            rare: 8..10,
        }
    }

    fn ids(
        allocation: &Allocation<T>,
        tokens: &[&str],
    ) -> Vec<Option<T>> {
        tokens
            .iter()
            .map(|t| allocation.id_of(t.as_bytes()))
            .collect()
    }

    #[test]
    fn test_fresh_allocation() {
        let allocator = StableIdAllocator::new(AllocatorOptions::default()).unwrap();
        let allocation: Allocation<T> = allocator
            .allocate(
                &VocabMapping::new(),
                ["apple", "<UNK>", "a", "b", "banana", "the", "unfortunately so"],
            )
            .unwrap();

        assert_eq!(allocation.len(), 7);
        assert_eq!(allocation.id_of(b"<UNK>"), Some(0));
        assert_eq!(allocation.id_of(b"a"), Some(100));
        assert_eq!(allocation.id_of(b"b"), Some(101));
        // Common: frequency desc, so the shorter "the" precedes "apple".
        assert_eq!(allocation.id_of(b"the"), Some(356));
        assert_eq!(allocation.id_of(b"apple"), Some(357));
        assert_eq!(allocation.id_of(b"banana"), Some(10_000));
        assert_eq!(allocation.id_of(b"unfortunately so"), Some(500_000));

        let order: Vec<T> = allocation.assignments.iter().map(|r| r.id()).collect();
        let mut sorted = order.clone();
        sorted.sort();
        assert_eq!(order, sorted);
    }

    #[test]
    fn test_order_independent() {
        let allocator = StableIdAllocator::new(AllocatorOptions::default()).unwrap();
        let tokens = ["ing", "tion", "er", "xyz!", "q", "zzz", "<BOS>", "hello world"];
        let mut reversed = tokens;
        reversed.reverse();

        let a: Allocation<T> = allocator.allocate(&VocabMapping::new(), tokens).unwrap();
        let b: Allocation<T> = allocator.allocate(&VocabMapping::new(), reversed).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_stable_under_growth() {
        let options = AllocatorOptions::default();
        let base: VocabMapping<T> = build_stable_mapping(["a", "apple", "band"], &options).unwrap();
        let before: Vec<(Vec<u8>, T)> = base.iter().map(|(t, id)| (t.to_vec(), id)).collect();

        let allocator = StableIdAllocator::new(options).unwrap();
        let allocation = allocator
            .allocate(&base, ["ant", "apple", "b", "ant"])
            .unwrap();

        // "apple" already present; second "ant" is a duplicate.
        assert_eq!(allocation.skipped, 2);
        assert_eq!(ids(&allocation, &["ant", "b"]), vec![Some(358), Some(101)]);

        let mut grown = base.clone();
        for record in allocation.assignments {
            grown.insert(record).unwrap();
        }
        for (text, id) in before {
            assert_eq!(grown.token_id(&text), Some(id));
        }
    }

    #[test]
    fn test_fills_holes() {
        let policy = CategoryPolicy::default();
        let mapping: VocabMapping<T> = VocabMapping::from_pairs(
            vec![(b"aa".to_vec(), 356), (b"bb".to_vec(), 358)],
            &policy,
        )
        .unwrap();

        let allocator = StableIdAllocator::new(AllocatorOptions::default()).unwrap();
        let allocation = allocator.allocate(&mapping, ["cc", "dd"]).unwrap();
        assert_eq!(ids(&allocation, &["cc", "dd"]), vec![Some(357), Some(359)]);
    }

    #[test]
    fn test_spillover_to_rare() {
        let options = AllocatorOptions::default().with_ranges(small_ranges());
        let allocator = StableIdAllocator::new(options).unwrap();

        let allocation: Allocation<T> = allocator
            .allocate(
                &VocabMapping::new(),
                ["ab", "cd", "ef", "unfortunately so"],
            )
            .unwrap();

        // Common holds two; "ef" spills to rare, ahead of native rare tokens.
        assert_eq!(
            ids(&allocation, &["ab", "cd", "ef", "unfortunately so"]),
            vec![Some(4), Some(5), Some(8), Some(9)]
        );
        let ef = allocation.assignments.iter().find(|r| r.text() == b"ef").unwrap();
        assert_eq!(ef.category(), TokenCategory::Common);
    }

    #[test]
    fn test_capacity_exceeded() {
        let options = AllocatorOptions::default().with_ranges(small_ranges());
        let allocator = StableIdAllocator::new(options).unwrap();

        let res: STResult<Allocation<T>> =
            allocator.allocate(&VocabMapping::new(), ["ab", "cd", "ef", "gh", "ij"]);
        assert!(matches!(
            res,
            Err(StableTokError::VocabularyCapacityExceeded {
                category: TokenCategory::Common
            })
        ));
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        let ranges = CategoryRanges {
            rare: 5..10,
            ..small_ranges()
        };
        assert!(StableIdAllocator::new(AllocatorOptions::default().with_ranges(ranges)).is_err());
    }

    #[test]
    fn test_sort_category() {
        let allocator = StableIdAllocator::new(AllocatorOptions::default()).unwrap();
        assert_eq!(
            allocator.sort_category(TokenCategory::Subword, &["zz9", "b9", "a99"]),
            vec![b"b9".to_vec(), b"a99".to_vec(), b"zz9".to_vec()]
        );
        assert_eq!(
            allocator.sort_category(TokenCategory::Common, &["apple", "an", "ox"]),
            vec![b"an".to_vec(), b"ox".to_vec(), b"apple".to_vec()]
        );
    }

    #[test]
    fn test_build_stable_mapping() {
        let mapping: VocabMapping<T> =
            build_stable_mapping(["hello", "<UNK>", "x"], &AllocatorOptions::default()).unwrap();

        assert_eq!(mapping.len(), 6);
        for special in DEFAULT_SPECIAL_TOKENS {
            assert!(mapping.token_id(special.as_bytes()).unwrap() < 100);
        }
        assert_eq!(mapping.token_id(b"x"), Some(100));
        assert_eq!(mapping.token_id(b"hello"), Some(356));
    }
}
