//! # Token Categories and Reserved Ranges
//!
//! Every token belongs to one [`TokenCategory`], and every category owns a
//! fixed, contiguous block of ids described by [`CategoryRanges`].
//!
//! The structural rule used to pick a category ([`CategoryPolicy`]) is a
//! heuristic stand-in for corpus frequency; it is a policy knob, and
//! deployments with real frequency data may want different thresholds.

use core::ops::Range;

use serde::{Deserialize, Serialize};

use crate::errors::{STResult, StableTokError};

/// Token category; each category owns a reserved id range.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::EnumIter,
    strum::Display,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TokenCategory {
    /// Delimiter-wrapped control tokens, e.g. ``<UNK>``.
    Special,

    /// Single-byte tokens.
    AtomicUnit,

    /// Short, purely alphabetic tokens.
    Common,

    /// Short-to-medium general tokens.
    Subword,

    /// Everything else; also the spillover target for exhausted ranges.
    Rare,
}

impl TokenCategory {
    /// Is this category ordered by descending frequency first?
    ///
    /// The remaining categories are ordered by ascending byte length first.
    pub fn is_frequency_prioritized(&self) -> bool {
        matches!(self, TokenCategory::Special | TokenCategory::Common)
    }
}

/// The reserved id range of each [`TokenCategory`].
///
/// Ranges never change size across a deployment; only their occupancy grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryRanges {
    /// Range for [`TokenCategory::Special`].
    pub special: Range<usize>,

    /// Range for [`TokenCategory::AtomicUnit`].
    pub atomic_unit: Range<usize>,

    /// Range for [`TokenCategory::Common`].
    pub common: Range<usize>,

    /// Range for [`TokenCategory::Subword`].
    pub subword: Range<usize>,

    /// Range for [`TokenCategory::Rare`].
    pub rare: Range<usize>,
}

impl Default for CategoryRanges {
    fn default() -> Self {
        Self {
            special: 0..100,
            atomic_unit: 100..356,
            common: 356..10_000,
            subword: 10_000..500_000,
            rare: 500_000..1_000_000,
        }
    }
}

impl CategoryRanges {
    /// Get the range reserved for a category.
    pub fn get(
        &self,
        category: TokenCategory,
    ) -> Range<usize> {
        match category {
            TokenCategory::Special => self.special.clone(),
            TokenCategory::AtomicUnit => self.atomic_unit.clone(),
            TokenCategory::Common => self.common.clone(),
            TokenCategory::Subword => self.subword.clone(),
            TokenCategory::Rare => self.rare.clone(),
        }
    }

    /// Find the category whose range contains `id`, if any.
    pub fn category_of_id(
        &self,
        id: usize,
    ) -> Option<TokenCategory> {
        use strum::IntoEnumIterator;
        TokenCategory::iter().find(|&c| self.get(c).contains(&id))
    }

    /// One past the largest reserved id.
    pub fn max_end(&self) -> usize {
        use strum::IntoEnumIterator;
        TokenCategory::iter()
            .map(|c| self.get(c).end)
            .max()
            .unwrap_or(0)
    }

    /// Validate that every range is non-empty, and no two ranges overlap.
    pub fn validate(&self) -> STResult<()> {
        use strum::IntoEnumIterator;

        let mut ranges: Vec<(TokenCategory, Range<usize>)> =
            TokenCategory::iter().map(|c| (c, self.get(c))).collect();

        for (category, range) in &ranges {
            if range.is_empty() {
                return Err(StableTokError::InvalidConfig(format!(
                    "{category} range {range:?} is empty"
                )));
            }
        }

        ranges.sort_by_key(|(_, r)| r.start);
        for w in ranges.windows(2) {
            let (a, ra) = &w[0];
            let (b, rb) = &w[1];
            if ra.end > rb.start {
                return Err(StableTokError::InvalidConfig(format!(
                    "{a} range {ra:?} overlaps {b} range {rb:?}"
                )));
            }
        }

        Ok(())
    }
}

/// Structural categorization rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryPolicy {
    /// Alphabetic tokens with fewer chars than this are [`TokenCategory::Common`].
    pub common_max_chars: usize,

    /// Tokens with fewer bytes than this are [`TokenCategory::Subword`].
    pub subword_max_bytes: usize,
}

impl Default for CategoryPolicy {
    fn default() -> Self {
        Self {
            common_max_chars: 6,
            subword_max_bytes: 16,
        }
    }
}

impl CategoryPolicy {
    /// Set the common-token char limit.
    pub fn with_common_max_chars(
        mut self,
        common_max_chars: usize,
    ) -> Self {
        self.common_max_chars = common_max_chars;
        self
    }

    /// Set the subword byte limit.
    pub fn with_subword_max_bytes(
        mut self,
        subword_max_bytes: usize,
    ) -> Self {
        self.subword_max_bytes = subword_max_bytes;
        self
    }

    /// Classify a token by its structure.
    pub fn categorize(
        &self,
        text: &[u8],
    ) -> TokenCategory {
        if text.len() >= 2 && text[0] == b'<' && text[text.len() - 1] == b'>' {
            return TokenCategory::Special;
        }
        if text.len() == 1 {
            return TokenCategory::AtomicUnit;
        }
        if let Ok(s) = core::str::from_utf8(text)
            && s.chars().count() < self.common_max_chars
            && is_alphabetic(s)
        {
            return TokenCategory::Common;
        }
        if text.len() < self.subword_max_bytes {
            return TokenCategory::Subword;
        }
        TokenCategory::Rare
    }

    /// Heuristic frequency estimate, used only for ordering.
    ///
    /// Longer tokens are assumed rarer (Zipf).
    pub fn estimate_frequency(
        &self,
        text: &[u8],
        category: TokenCategory,
    ) -> u64 {
        match category {
            TokenCategory::Special => 1_000_000_000,
            TokenCategory::AtomicUnit => 1_000_000,
            _ => 1_000_000 / (text.len() as u64 + 1),
        }
    }
}

/// Is `s` non-empty and made only of alphabetic chars?
pub fn is_alphabetic(s: &str) -> bool {
    !s.is_empty() && s.chars().all(char::is_alphabetic)
}
