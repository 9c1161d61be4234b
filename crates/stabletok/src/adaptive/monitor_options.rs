//! Adaptive Monitor Options

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{STResult, StableTokError};

/// Weights of the candidate utility score.
///
/// ``utility = compression * c + (1 / speed_impact) * s + coherence * h``
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UtilityWeights {
    /// Weight of ``byte_length * count``.
    pub compression: f64,

    /// Weight of the inverse vocabulary-growth penalty.
    pub speed: f64,

    /// Weight of the alphabetic-coherence bonus.
    pub coherence: f64,
}

impl Default for UtilityWeights {
    fn default() -> Self {
        Self {
            compression: 0.4,
            speed: 0.3,
            coherence: 0.3,
        }
    }
}

/// Options for configuring an [`AdaptiveMonitor`](super::AdaptiveMonitor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorOptions {
    /// Capacity of the rolling unknown-rate window.
    ///
    /// Adaptation is never triggered until the window is full.
    pub window_capacity: usize,

    /// Mean window unknown rate at which adaptation triggers.
    pub threshold: f64,

    /// Minimum seconds between adaptations.
    pub cooldown_secs: u64,

    /// Candidates seen fewer times than this are ignored.
    pub min_candidate_count: u64,

    /// Maximum candidates submitted per adaptation.
    pub top_k: usize,

    /// Utility score weights.
    pub weights: UtilityWeights,

    /// Number of recent texts kept as the validation sample.
    pub recent_text_capacity: usize,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            window_capacity: 100,
            threshold: 0.15,
            cooldown_secs: 300,
            min_candidate_count: 5,
            top_k: 50,
            weights: UtilityWeights::default(),
            recent_text_capacity: 64,
        }
    }
}

impl MonitorOptions {
    /// Validate the options.
    pub fn validate(&self) -> STResult<()> {
        if self.window_capacity == 0 {
            return Err(StableTokError::InvalidConfig(
                "window_capacity must be positive".to_string(),
            ));
        }
        if self.recent_text_capacity == 0 {
            return Err(StableTokError::InvalidConfig(
                "recent_text_capacity must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(StableTokError::InvalidConfig(format!(
                "threshold must be in [0, 1]: {}",
                self.threshold
            )));
        }
        Ok(())
    }

    /// The cooldown, as a [`Duration`].
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    /// Set the window capacity, and return the builder.
    pub fn with_window_capacity(
        mut self,
        window_capacity: usize,
    ) -> Self {
        self.window_capacity = window_capacity;
        self
    }

    /// Set the trigger threshold, and return the builder.
    pub fn with_threshold(
        mut self,
        threshold: f64,
    ) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the cooldown, and return the builder.
    pub fn with_cooldown(
        mut self,
        cooldown: Duration,
    ) -> Self {
        self.cooldown_secs = cooldown.as_secs();
        self
    }

    /// Set the minimum candidate count, and return the builder.
    pub fn with_min_candidate_count(
        mut self,
        min_candidate_count: u64,
    ) -> Self {
        self.min_candidate_count = min_candidate_count;
        self
    }

    /// Set the per-adaptation candidate limit, and return the builder.
    pub fn with_top_k(
        mut self,
        top_k: usize,
    ) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the utility weights, and return the builder.
    pub fn with_weights(
        mut self,
        weights: UtilityWeights,
    ) -> Self {
        self.weights = weights;
        self
    }

    /// Set the recent-text sample capacity, and return the builder.
    pub fn with_recent_text_capacity(
        mut self,
        recent_text_capacity: usize,
    ) -> Self {
        self.recent_text_capacity = recent_text_capacity;
        self
    }
}
