//! # Vocabulary
//!
//! * [`VocabMapping`] - the append-only ``token <-> id`` bijection.
//! * [`PrefixIndex`] - the byte trie over a mapping's tokens.
//! * [`TokenCategory`], [`CategoryRanges`], [`CategoryPolicy`] - the
//!   reserved id ranges, and the rules which sort tokens into them.
//! * [`io`] - line-oriented and JSON vocabulary files.

pub mod category;
pub mod io;
pub mod prefix_index;
pub mod token_record;
pub mod vocab_mapping;

#[doc(inline)]
pub use category::{CategoryPolicy, CategoryRanges, TokenCategory};
#[doc(inline)]
pub use prefix_index::PrefixIndex;
#[doc(inline)]
pub use token_record::{Fingerprint, TokenRecord, fingerprint};
#[doc(inline)]
pub use vocab_mapping::VocabMapping;
