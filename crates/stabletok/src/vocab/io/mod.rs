//! # Vocabulary IO
//!
//! ## Loading A Vocab
//!
//! ```rust,no_run
//! use stabletok::vocab::{CategoryPolicy, VocabMapping, io::load_token_list_path};
//! use stabletok::{StoreOptions, VocabStore};
//!
//! fn example() -> stabletok::STResult<VocabStore<u32>> {
//!     let mapping: VocabMapping<u32> =
//!         load_token_list_path("vocab.txt", &CategoryPolicy::default())?;
//!     VocabStore::new(mapping, StoreOptions::default())
//! }
//! ```

mod json_vocab;
mod token_list;

#[doc(inline)]
pub use json_vocab::*;
#[doc(inline)]
pub use token_list::*;
