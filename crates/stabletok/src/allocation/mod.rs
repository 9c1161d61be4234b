//! # Stable ID Allocation
//!
//! Categorize tokens, order them deterministically, and number them into
//! the reserved id ranges of their categories.

mod allocator_options;
mod stable_id_allocator;

#[doc(inline)]
pub use allocator_options::*;
#[doc(inline)]
pub use stable_id_allocator::*;
