//! Core types, constants and clocks for location acquisition

pub mod types;
pub mod constants;
pub mod clock;

pub use types::*;
pub use constants::*;
pub use clock::{Clock, ManualClock, SystemClock};
