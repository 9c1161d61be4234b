//! # `stabletok` Stable-ID Vocabulary and Segmenter
//!
//! `stabletok` assigns stable integer ids to text fragments, and segments
//! text into those ids by greedy longest-match over a byte trie.
//!
//! Ids never move: a vocabulary can grow online, and every id assigned
//! before the growth still names the same token after it.
//!
//! See:
//! * [`vocab`] for the token mapping, the prefix index, and vocab io.
//! * [`store`] for the live [`VocabStore`] and its segmentation API.
//! * [`segmentation`] for the reference and accelerated backends.
//! * [`allocation`] for deterministic, category-ranged id assignment.
//! * [`adaptive`] for the coverage monitor that proposes new tokens.
//! * [`updater`] for staged, validated, transactional vocabulary growth.
//!
//! ## Crate Features
//!
//! #### feature: ``default``
//!
//! * ``ahash``
//! * ``rayon``
//!
//! #### feature: ``ahash``
//!
//! This swaps all HashMap/HashSet implementations for ``ahash``; which is a performance
//! win on many/(most?) modern CPUs.
//!
//! This is done by the ``types::STHash{*}`` type alias machinery.
//!
//! #### feature: ``foldhash``
//!
//! Swaps the hash maps for ``foldhash``; ``ahash`` wins if both are enabled.
//!
//! #### feature: ``rayon``
//!
//! Parallel [`VocabStore::segment_batch`] using the ``rayon`` crate.
//!
//! #### feature: ``tracing``
//!
//! This enables a number of ``tracing`` instrumentation points.
//! This is only useful for timing tracing of the library itself.
//!
//! ## Segmenting Text
//!
//! ```rust
//! use stabletok::{StoreOptions, VocabStore, allocation::{AllocatorOptions, build_stable_mapping}};
//!
//! type T = u32;
//!
//! let mapping = build_stable_mapping::<T, _, _>(
//!     ["un", "fortunate", "unfortunate", "ly"],
//!     &AllocatorOptions::default(),
//! )
//! .unwrap();
//! let store: VocabStore<T> = VocabStore::new(mapping, StoreOptions::default()).unwrap();
//!
//! let tokens = store.tokenize("unfortunately");
//! assert_eq!(tokens.len(), 2);
//! assert_eq!(store.decode(&tokens), "unfortunately");
//! ```
#![warn(missing_docs, unused)]

pub mod adaptive;
pub mod allocation;
pub mod config;
pub mod errors;
pub mod segmentation;
pub mod store;
pub mod support;
pub mod types;
pub mod updater;
pub mod vocab;

#[doc(inline)]
pub use adaptive::AdaptiveMonitor;
#[doc(inline)]
pub use allocation::StableIdAllocator;
#[doc(inline)]
pub use config::StabletokConfig;
#[doc(inline)]
pub use errors::{STResult, StableTokError};
#[doc(inline)]
pub use store::{StoreOptions, VocabSnapshot, VocabStore};
#[doc(inline)]
pub use types::TokenType;
#[doc(inline)]
pub use updater::TransactionalUpdater;
#[doc(inline)]
pub use vocab::{TokenCategory, VocabMapping};
