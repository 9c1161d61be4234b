//! # Adaptive Vocabulary Growth
//!
//! The [`AdaptiveMonitor`] tracks a rolling unknown-token rate over recent
//! segmentation batches, and accumulates the unmatched text behind those
//! unknowns as candidates. When the rate stays high, the best candidates
//! are submitted to a [`crate::updater::TransactionalUpdater`].

mod adaptive_monitor;
pub mod candidates;
mod monitor_options;

#[doc(inline)]
pub use adaptive_monitor::*;
#[doc(inline)]
pub use candidates::RankedCandidate;
#[doc(inline)]
pub use monitor_options::*;
