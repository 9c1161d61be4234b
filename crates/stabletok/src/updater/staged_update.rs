//! # Staged Updates and Commit Records

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Lifecycle of a [`StagedUpdate`].
///
/// ```text
/// pending --validate--> validated --commit--> committed
///    |                      |
///    +-------rollback-------+-----> rolled_back
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UpdateStatus {
    /// Staged; not yet validated.
    Pending,

    /// Validated; eligible for commit.
    Validated,

    /// Applied to the store; terminal.
    Committed,

    /// Discarded; terminal.
    RolledBack,
}

/// Quality metrics of a staged update, measured on a validation corpus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationMetrics {
    /// Source bytes per emitted token.
    pub compression_ratio: f64,

    /// Fraction of emitted tokens which were the unknown id.
    pub unknown_token_rate: f64,

    /// Estimated resident size growth, in MiB.
    pub memory_impact_mb: f64,

    /// Tokens the allocator would add.
    pub tokens_assigned: usize,

    /// When the metrics were measured, in unix millis.
    pub timestamp: u64,
}

/// A proposed vocabulary change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedUpdate {
    /// The stage id.
    pub stage_id: String,

    /// The proposed tokens, in submission order.
    pub tokens: Vec<String>,

    /// Free-form annotations.
    pub metadata: BTreeMap<String, String>,

    /// The lifecycle state.
    pub status: UpdateStatus,

    /// When the update was staged, in unix millis.
    pub created_at: u64,

    /// Set once validated.
    pub metrics: Option<ValidationMetrics>,
}

/// An entry in the commit history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// The committed stage id.
    pub stage_id: String,

    /// The number of tokens actually merged.
    pub tokens_added: usize,

    /// The validation metrics the commit was accepted on.
    pub metrics: ValidationMetrics,

    /// When the commit was applied, in unix millis.
    pub timestamp: u64,
}
