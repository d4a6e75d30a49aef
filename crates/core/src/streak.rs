// crates/core/src/streak.rs
//! Consecutive-day streak detection over a user's active days.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;

/// Result of a streak scan.
///
/// `active_days == 0` means the user has no history at all; the zero
/// value doubles as the "insufficient data" signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Streak {
    /// Length of the consecutive run ending at the most recent active day.
    pub current: u32,
    /// Length of the longest consecutive run anywhere in the history.
    pub best: u32,
    /// Number of distinct active days scanned.
    pub active_days: u32,
}

/// Scan a set of active days for consecutive runs.
///
/// Walks the days in ascending order, extending the run while each day is
/// exactly one after the previous and resetting the counter to 1 at any
/// gap. A day with no neighbors is a run of length 1. Because the walk
/// ends at the most recent day, the counter's final value is the current
/// streak.
pub fn day_streaks(days: &BTreeSet<NaiveDate>) -> Streak {
    let mut current = 0u32;
    let mut best = 0u32;
    let mut prev: Option<NaiveDate> = None;

    for &day in days {
        current = match prev {
            Some(p) if (day - p).num_days() == 1 => current + 1,
            _ => 1,
        };
        best = best.max(current);
        prev = Some(day);
    }

    Streak {
        current,
        best,
        active_days: days.len() as u32,
    }
}
