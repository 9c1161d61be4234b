//! # Support Utilities

pub mod clock;

#[doc(inline)]
pub use clock::{Clock, ManualClock, SystemClock};
