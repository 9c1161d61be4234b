//! Vocabulary Store Options
//!
//! Options for building a [`VocabStore`](crate::VocabStore).

use serde::{Deserialize, Serialize};

use crate::{
    errors::{STResult, StableTokError},
    segmentation::BackendSelector,
};

/// The default segmentation lookahead, in bytes.
pub const DEFAULT_MAX_LOOKAHEAD: usize = 256;

/// The default unknown-token placeholder.
pub const DEFAULT_UNK_TOKEN: &str = "<UNK>";

/// Options for configuring a [`VocabStore`](crate::VocabStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Whether to use the accelerated backend.
    ///
    /// When the accelerated layout cannot be built,
    /// the reference backend is used instead.
    pub accelerated: bool,

    /// The maximum number of bytes walked per longest-match lookup.
    pub max_lookahead: usize,

    /// The placeholder text for unmatched input.
    pub unk_token: String,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            accelerated: true,
            max_lookahead: DEFAULT_MAX_LOOKAHEAD,
            unk_token: DEFAULT_UNK_TOKEN.to_string(),
        }
    }
}

impl StoreOptions {
    /// Validate the options.
    pub fn validate(&self) -> STResult<()> {
        if self.max_lookahead == 0 {
            return Err(StableTokError::InvalidConfig(
                "max_lookahead must be positive".to_string(),
            ));
        }
        if self.unk_token.is_empty() {
            return Err(StableTokError::InvalidConfig(
                "unk_token must be non-empty".to_string(),
            ));
        }
        Ok(())
    }

    /// The backend selector implied by [`Self::accelerated`].
    pub fn backend(&self) -> BackendSelector {
        BackendSelector::from_accelerated(self.accelerated)
    }

    /// Is the accelerated backend requested?
    pub fn accelerated(&self) -> bool {
        self.accelerated
    }

    /// Set whether the accelerated backend is requested.
    pub fn set_accelerated(
        &mut self,
        accelerated: bool,
    ) {
        self.accelerated = accelerated;
    }

    /// Set whether the accelerated backend is requested, and return the builder.
    pub fn with_accelerated(
        mut self,
        accelerated: bool,
    ) -> Self {
        self.set_accelerated(accelerated);
        self
    }

    /// Get the lookahead bound.
    pub fn max_lookahead(&self) -> usize {
        self.max_lookahead
    }

    /// Set the lookahead bound.
    pub fn set_max_lookahead(
        &mut self,
        max_lookahead: usize,
    ) {
        self.max_lookahead = max_lookahead;
    }

    /// Set the lookahead bound, and return the builder.
    pub fn with_max_lookahead(
        mut self,
        max_lookahead: usize,
    ) -> Self {
        self.set_max_lookahead(max_lookahead);
        self
    }

    /// Get the unknown-token placeholder.
    pub fn unk_token(&self) -> &str {
        &self.unk_token
    }

    /// Set the unknown-token placeholder.
    pub fn set_unk_token<S: Into<String>>(
        &mut self,
        unk_token: S,
    ) {
        self.unk_token = unk_token.into();
    }

    /// Set the unknown-token placeholder, and return the builder.
    pub fn with_unk_token<S: Into<String>>(
        mut self,
        unk_token: S,
    ) -> Self {
        self.set_unk_token(unk_token);
        self
    }
}
