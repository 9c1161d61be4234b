//! Transactional Updater Options

use serde::{Deserialize, Serialize};

use crate::errors::{STResult, StableTokError};

/// Options for configuring a [`TransactionalUpdater`](super::TransactionalUpdater).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdaterOptions {
    /// Validated updates with a higher unknown-token rate are rejected.
    pub unknown_rate_ceiling: f64,
}

impl Default for UpdaterOptions {
    fn default() -> Self {
        Self {
            unknown_rate_ceiling: 0.1,
        }
    }
}

impl UpdaterOptions {
    /// Validate the options.
    pub fn validate(&self) -> STResult<()> {
        if !(0.0..=1.0).contains(&self.unknown_rate_ceiling) {
            return Err(StableTokError::InvalidConfig(format!(
                "unknown_rate_ceiling must be in [0, 1]: {}",
                self.unknown_rate_ceiling
            )));
        }
        Ok(())
    }

    /// Get the unknown-rate ceiling.
    pub fn unknown_rate_ceiling(&self) -> f64 {
        self.unknown_rate_ceiling
    }

    /// Set the unknown-rate ceiling.
    pub fn set_unknown_rate_ceiling(
        &mut self,
        unknown_rate_ceiling: f64,
    ) {
        self.unknown_rate_ceiling = unknown_rate_ceiling;
    }

    /// Set the unknown-rate ceiling, and return the builder.
    pub fn with_unknown_rate_ceiling(
        mut self,
        unknown_rate_ceiling: f64,
    ) -> Self {
        self.set_unknown_rate_ceiling(unknown_rate_ceiling);
        self
    }
}
