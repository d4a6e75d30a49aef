// crates/stats/src/lib.rs
//! Read-only analytics over committed session history.
//!
//! [`StatsEngine`] derives per-user and cross-user figures from the
//! store: rolling daily/weekly/monthly totals, per-channel breakdowns,
//! day streaks, leaderboards, head-to-head comparisons and pairwise
//! co-presence time. Every clock-dependent operation takes an explicit
//! `now` (Unix seconds) so callers and tests control the reference time;
//! calendar bucketing happens in the configured service time zone.

pub mod config;

pub use config::StatsConfig;

use chrono::FixedOffset;
use serde::Serialize;
use tracing::debug;
use voicetime_core::{
    calendar, day_streaks, ChannelIndexed, OverlapStrategy, Streak, UserId, UserTotal,
};
use voicetime_db::{ChannelUsage, Store, StoreResult};

/// Width of the rolling window behind [`StatsEngine::monthly_total`].
/// A fixed 30 days, not a calendar month.
pub const MONTH_WINDOW_DAYS: i64 = 30;

// ============================================================================
// Result Types
// ============================================================================

/// One weekday's share of the rolling seven-day window. The breakdown
/// always contains all seven, Monday first, zeros included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekdayTotal {
    pub weekday: &'static str,
    pub total_secs: i64,
}

/// Average connected time per active day over a user's whole history.
///
/// Only days with at least one session count; a user absent on Tuesday
/// does not have their average diluted by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAverage {
    pub average_secs: i64,
    pub active_days: i64,
    pub total_secs: i64,
}

/// Two users' lifetime totals side by side.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub a: UserTotal,
    pub b: UserTotal,
    /// `a.total_secs - b.total_secs`.
    pub delta_secs: i64,
    /// Percentage lead of `a` over `b`, rounded to 1 decimal place.
    /// None if `b` has no time on record (cannot calculate percentage).
    pub delta_percent: Option<f64>,
}

impl Comparison {
    fn new(a: UserTotal, b: UserTotal) -> Self {
        let delta_secs = a.total_secs - b.total_secs;
        let delta_percent = if b.total_secs == 0 {
            None
        } else {
            let percent = (delta_secs as f64 / b.total_secs as f64) * 100.0;
            Some((percent * 10.0).round() / 10.0)
        };
        Self {
            a,
            b,
            delta_secs,
            delta_percent,
        }
    }
}

fn weekday_name(index: usize) -> &'static str {
    match index {
        0 => "Monday",
        1 => "Tuesday",
        2 => "Wednesday",
        3 => "Thursday",
        4 => "Friday",
        5 => "Saturday",
        6 => "Sunday",
        _ => "Unknown",
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Analytics facade over a [`Store`].
///
/// Holds a cheap store handle plus the service time zone; safe to share
/// behind an `Arc` and to query concurrently with live tracking.
pub struct StatsEngine {
    store: Store,
    tz: FixedOffset,
    overlap: Box<dyn OverlapStrategy>,
}

impl StatsEngine {
    pub fn new(store: Store) -> Self {
        Self::with_config(store, StatsConfig::default())
    }

    pub fn with_config(store: Store, config: StatsConfig) -> Self {
        Self::with_strategy(store, config, Box::new(ChannelIndexed))
    }

    /// Swap the co-presence algorithm; the quadratic
    /// [`voicetime_core::BruteForce`] is handy as an oracle in tests.
    pub fn with_strategy(
        store: Store,
        config: StatsConfig,
        overlap: Box<dyn OverlapStrategy>,
    ) -> Self {
        Self {
            store,
            tz: calendar::service_offset(config.tz_offset_minutes),
            overlap,
        }
    }

    /// Seconds connected since local midnight of `now`'s calendar day.
    pub async fn daily_total(&self, user: UserId, now: i64) -> StoreResult<i64> {
        let midnight = calendar::day_start(now, &self.tz);
        self.store.sum_durations_since(user, midnight).await
    }

    /// The last seven days bucketed by weekday, Monday..Sunday, absent
    /// days present with 0.
    pub async fn weekly_breakdown(
        &self,
        user: UserId,
        now: i64,
    ) -> StoreResult<Vec<WeekdayTotal>> {
        let from = now - 7 * calendar::SECS_PER_DAY;
        let records = self.store.records_for_user_since(user, from).await?;

        let mut totals = [0i64; 7];
        for record in &records {
            let index = calendar::local_weekday(record.started_at, &self.tz)
                .num_days_from_monday() as usize;
            totals[index] += record.duration_secs;
        }

        Ok(totals
            .iter()
            .enumerate()
            .map(|(index, &total_secs)| WeekdayTotal {
                weekday: weekday_name(index),
                total_secs,
            })
            .collect())
    }

    /// Seconds connected over the rolling 30-day window ending at `now`.
    pub async fn monthly_total(&self, user: UserId, now: i64) -> StoreResult<i64> {
        let from = now - MONTH_WINDOW_DAYS * calendar::SECS_PER_DAY;
        self.store.sum_durations_since(user, from).await
    }

    /// Average seconds per active day, or `None` before the user's first
    /// session. Never fabricates a zero for missing history.
    pub async fn daily_average(&self, user: UserId) -> StoreResult<Option<DailyAverage>> {
        let (overview, days) = tokio::join!(
            self.store.user_overview(user),
            self.store.distinct_session_days(user, &self.tz),
        );
        let overview = overview?;
        let days = days?;

        Ok(overview.map(|summary| {
            let active_days = days.len() as i64;
            DailyAverage {
                average_secs: summary.total_secs / active_days.max(1),
                active_days,
                total_secs: summary.total_secs,
            }
        }))
    }

    /// Per-channel totals, busiest first.
    pub async fn channel_breakdown(&self, user: UserId) -> StoreResult<Vec<ChannelUsage>> {
        self.store.channel_breakdown(user).await
    }

    /// Consecutive-day streaks over the user's whole history. Zero
    /// sessions yield the all-zero [`Streak`].
    pub async fn streak(&self, user: UserId) -> StoreResult<Streak> {
        let days = self.store.distinct_session_days(user, &self.tz).await?;
        Ok(day_streaks(&days))
    }

    /// Top users by lifetime total, ties broken by user id ascending.
    pub async fn leaderboard(&self, limit: u32) -> StoreResult<Vec<UserTotal>> {
        self.store.leaderboard(limit).await
    }

    /// Lifetime totals of two users side by side; a user with no history
    /// compares as zero.
    pub async fn compare(&self, a: UserId, b: UserId) -> StoreResult<Comparison> {
        let (total_a, total_b) = tokio::join!(
            self.store.total_for_user(a),
            self.store.total_for_user(b),
        );
        Ok(Comparison::new(total_a?, total_b?))
    }

    /// Seconds two users spent in the same channel at the same time,
    /// summed over all overlapping record pairs. Symmetric.
    pub async fn duo_time(&self, a: UserId, b: UserId) -> StoreResult<i64> {
        let (records_a, records_b) = tokio::join!(
            self.store.records_for_user(a),
            self.store.records_for_user(b),
        );
        let records_a = records_a?;
        let records_b = records_b?;

        let secs = self.overlap.total_overlap(&records_a, &records_b);
        debug!(
            strategy = self.overlap.name(),
            a = %a,
            b = %b,
            secs,
            "duo overlap computed"
        );
        Ok(secs)
    }
}
