// crates/db/src/queries/mod.rs
// Query surface over session history and running totals.

pub(crate) mod sessions;
pub(crate) mod totals;

pub use sessions::{ChannelUsage, UserOverview};
