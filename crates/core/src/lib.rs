// crates/core/src/lib.rs
pub mod calendar;
pub mod event;
pub mod overlap;
pub mod streak;
pub mod types;

pub use event::*;
pub use overlap::*;
pub use streak::*;
pub use types::*;
