//! # Transactional Vocabulary Updates
//!
//! ## Lifecycle
//!
//! ```rust,no_run
//! use std::{collections::BTreeMap, sync::Arc};
//!
//! use stabletok::{
//!     STResult, StoreOptions, TransactionalUpdater, VocabStore,
//!     allocation::{AllocatorOptions, StableIdAllocator, build_stable_mapping},
//!     updater::UpdaterOptions,
//! };
//!
//! fn example() -> STResult<()> {
//!     let options = AllocatorOptions::default();
//!     let mapping = build_stable_mapping::<u32, _, _>(["a", "b"], &options)?;
//!     let store = Arc::new(VocabStore::new(mapping, StoreOptions::default())?);
//!     let updater = TransactionalUpdater::new(
//!         store.clone(),
//!         StableIdAllocator::new(options)?,
//!         UpdaterOptions::default(),
//!     )?;
//!
//!     let stage_id = updater.stage(["ab"], BTreeMap::new());
//!     updater.validate(&stage_id, ["abab", "ba"])?;
//!     if !updater.commit(&stage_id)? {
//!         updater.rollback(&stage_id);
//!     }
//!     updater.save_state("vocab_state.json")
//! }
//! ```

mod persisted_state;
mod staged_update;
mod transactional_updater;
mod updater_options;

#[doc(inline)]
pub use persisted_state::*;
#[doc(inline)]
pub use staged_update::*;
#[doc(inline)]
pub use transactional_updater::*;
#[doc(inline)]
pub use updater_options::*;
