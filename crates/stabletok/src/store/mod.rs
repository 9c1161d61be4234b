//! # Vocabulary Store
//!
//! The live vocabulary: an atomically swapped [`VocabSnapshot`] behind a
//! [`VocabStore`].

mod store_options;
mod vocab_snapshot;
mod vocab_store;

#[doc(inline)]
pub use store_options::*;
#[doc(inline)]
pub use vocab_snapshot::*;
#[doc(inline)]
pub use vocab_store::*;
