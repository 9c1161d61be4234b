//! # Configuration
//!
//! Every component's options, gathered into one serde document.
//! Missing fields take their defaults.
//!
//! ```json
//! {
//!   "store": { "accelerated": true, "max_lookahead": 256, "unk_token": "<UNK>" },
//!   "allocator": { "ranges": { "special": { "start": 0, "end": 100 } } },
//!   "monitor": { "threshold": 0.2 },
//!   "updater": { "unknown_rate_ceiling": 0.05 }
//! }
//! ```

use std::{fs::File, io::BufReader, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    adaptive::MonitorOptions,
    allocation::AllocatorOptions,
    errors::{STResult, StableTokError},
    store::StoreOptions,
    updater::UpdaterOptions,
};

/// Combined configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabletokConfig {
    /// See [`StoreOptions`].
    pub store: StoreOptions,

    /// See [`AllocatorOptions`].
    pub allocator: AllocatorOptions,

    /// See [`MonitorOptions`].
    pub monitor: MonitorOptions,

    /// See [`UpdaterOptions`].
    pub updater: UpdaterOptions,
}

impl StabletokConfig {
    /// Validate every section.
    pub fn validate(&self) -> STResult<()> {
        self.store.validate()?;
        self.allocator.ranges.validate()?;
        self.monitor.validate()?;
        self.updater.validate()
    }

    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> STResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| StableTokError::InvalidConfig(format!("invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn from_json_path<P: AsRef<Path>>(path: P) -> STResult<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: Self = serde_json::from_reader(reader)
            .map_err(|e| StableTokError::InvalidConfig(format!("invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}
