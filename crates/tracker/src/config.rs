// crates/tracker/src/config.rs
//! Tracker configuration types.

use serde::Deserialize;

/// What a join does when the user already has an open session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejoinPolicy {
    /// Close the previous session at the join timestamp, commit it, then
    /// open the new one. No connected time is lost when a gateway reports
    /// a channel move as a bare join.
    #[default]
    CloseAndReopen,
    /// Discard the previous open session unrecorded. Matches gateways
    /// that re-send joins on reconnect glitches.
    Overwrite,
}

/// Tuning knobs for the session tracker.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub rejoin_policy: RejoinPolicy,
    /// Capacity of the parked-record queue used while the store is down.
    /// Values below 1 are treated as 1; on overflow the oldest parked
    /// record is dropped.
    pub pending_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            rejoin_policy: RejoinPolicy::CloseAndReopen,
            pending_capacity: 1024,
        }
    }
}
