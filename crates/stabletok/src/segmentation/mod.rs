//! # Segmentation Backends
//!
//! Greedy longest-match segmentation over a [`crate::vocab::PrefixIndex`].
//!
//! A backend is chosen once per snapshot by a [`BackendSelector`]:
//! * [`ReferenceBackend`] - walks the arena trie.
//! * [`AcceleratedBackend`] - walks a flattened CSR copy of the trie.

mod accelerated_backend;
mod backend_selector;
mod reference_backend;
mod segmentation_backend;

#[doc(inline)]
pub use accelerated_backend::*;
#[doc(inline)]
pub use backend_selector::*;
#[doc(inline)]
pub use reference_backend::*;
#[doc(inline)]
pub use segmentation_backend::*;
