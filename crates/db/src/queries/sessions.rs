// crates/db/src/queries/sessions.rs
// Session history: the atomic commit plus every read over session_records.

use chrono::{FixedOffset, NaiveDate};
use std::collections::BTreeSet;
use std::time::Duration;

use crate::{is_transient, Store, StoreError, StoreResult};
use serde::Serialize;
use tracing::{debug, warn};
use voicetime_core::{calendar, ChannelId, SessionRecord, UserId};

/// Per-channel slice of one user's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelUsage {
    pub channel_id: ChannelId,
    /// Name carried by the most recent record for this channel; channels
    /// get renamed, records keep the name they were closed under.
    pub channel_name: String,
    pub total_secs: i64,
    pub session_count: i64,
}

/// Lifetime summary of one user's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOverview {
    pub user_id: UserId,
    pub session_count: i64,
    pub total_secs: i64,
    pub first_session_at: i64,
    pub last_session_at: i64,
}

impl Store {
    /// Durably store a closed session and fold its duration into the
    /// user's running total.
    ///
    /// Both writes happen in one transaction: either the record exists
    /// and the total reflects it, or neither happened. Transient failures
    /// (lock contention, pool pressure, I/O) are retried with linear
    /// backoff up to the configured attempt ceiling, after which the
    /// store reports itself unavailable.
    pub async fn commit_session(&self, record: &SessionRecord) -> StoreResult<()> {
        self.bounded(self.commit_with_retries(record)).await
    }

    async fn commit_with_retries(&self, record: &SessionRecord) -> StoreResult<()> {
        let attempts = self.config().commit_retries.max(1);
        for attempt in 1..attempts {
            match self.commit_once(record).await {
                Ok(()) => {
                    if attempt > 1 {
                        debug!(attempt, user = %record.user_id, "session commit succeeded after retry");
                    }
                    return Ok(());
                }
                Err(err) if is_transient(&err) => {
                    warn!(attempt, error = %err, "transient session commit failure, will retry");
                    tokio::time::sleep(Duration::from_millis(
                        self.config().retry_backoff_ms * attempt as u64,
                    ))
                    .await;
                }
                Err(err) => return Err(err.into()),
            }
        }

        // Last attempt: a transient failure here means the ceiling is
        // spent and the caller should treat the store as down.
        match self.commit_once(record).await {
            Ok(()) => Ok(()),
            Err(err) if is_transient(&err) => Err(StoreError::Unavailable {
                attempts,
                source: err,
            }),
            Err(err) => Err(err.into()),
        }
    }

    async fn commit_once(&self, record: &SessionRecord) -> Result<(), sqlx::Error> {
        let mut tx = self.pool().begin().await?;

        sqlx::query(
            r#"
            INSERT INTO session_records
                (user_id, username, channel_id, channel_name, started_at, ended_at, duration_secs)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(record.user_id.0 as i64)
        .bind(&record.username)
        .bind(record.channel_id.0 as i64)
        .bind(&record.channel_name)
        .bind(record.started_at)
        .bind(record.ended_at)
        .bind(record.duration_secs)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO user_totals (user_id, username, total_secs)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id) DO UPDATE SET
                total_secs = user_totals.total_secs + excluded.total_secs,
                username = excluded.username
            "#,
        )
        .bind(record.user_id.0 as i64)
        .bind(&record.username)
        .bind(record.duration_secs)
        .execute(&mut *tx)
        .await?;

        tx.commit().await
    }

    /// All records for a user, ordered by start time ascending.
    pub async fn records_for_user(&self, user: UserId) -> StoreResult<Vec<SessionRecord>> {
        self.records_for_user_since(user, i64::MIN).await
    }

    /// Records for a user whose start falls in the half-open window
    /// `[from, now)`, ordered by start time ascending.
    pub async fn records_for_user_since(
        &self,
        user: UserId,
        from: i64,
    ) -> StoreResult<Vec<SessionRecord>> {
        self.bounded(async {
            let rows: Vec<(i64, String, i64, String, i64, i64, i64)> = sqlx::query_as(
                r#"
                SELECT user_id, username, channel_id, channel_name,
                       started_at, ended_at, duration_secs
                FROM session_records
                WHERE user_id = ?1 AND started_at >= ?2
                ORDER BY started_at ASC, id ASC
                "#,
            )
            .bind(user.0 as i64)
            .bind(from)
            .fetch_all(self.pool())
            .await?;

            Ok(rows.into_iter().map(row_to_record).collect())
        })
        .await
    }

    /// Sum of durations over records starting in `[from, now)`.
    pub async fn sum_durations_since(&self, user: UserId, from: i64) -> StoreResult<i64> {
        self.bounded(async {
            let (total,): (i64,) = sqlx::query_as(
                "SELECT COALESCE(SUM(duration_secs), 0) FROM session_records \
                 WHERE user_id = ?1 AND started_at >= ?2",
            )
            .bind(user.0 as i64)
            .bind(from)
            .fetch_one(self.pool())
            .await?;
            Ok(total)
        })
        .await
    }

    /// Start timestamps of every record for a user, ascending. Feeds the
    /// calendar-day bucketing behind streaks and daily averages.
    pub async fn session_starts(&self, user: UserId) -> StoreResult<Vec<i64>> {
        self.bounded(async {
            let rows: Vec<(i64,)> = sqlx::query_as(
                "SELECT started_at FROM session_records WHERE user_id = ?1 ORDER BY started_at ASC",
            )
            .bind(user.0 as i64)
            .fetch_all(self.pool())
            .await?;
            Ok(rows.into_iter().map(|(ts,)| ts).collect())
        })
        .await
    }

    /// Distinct calendar days, in the given zone, on which the user
    /// started at least one session. Ascending; feeds streak scans and
    /// daily averages.
    pub async fn distinct_session_days(
        &self,
        user: UserId,
        tz: &FixedOffset,
    ) -> StoreResult<BTreeSet<NaiveDate>> {
        let starts = self.session_starts(user).await?;
        Ok(starts.iter().map(|&ts| calendar::local_date(ts, tz)).collect())
    }

    /// Lifetime summary for a user, or `None` before their first session.
    pub async fn user_overview(&self, user: UserId) -> StoreResult<Option<UserOverview>> {
        self.bounded(async {
            let (session_count, total_secs, first, last): (i64, i64, Option<i64>, Option<i64>) =
                sqlx::query_as(
                    "SELECT COUNT(*), COALESCE(SUM(duration_secs), 0), \
                     MIN(started_at), MAX(started_at) \
                     FROM session_records WHERE user_id = ?1",
                )
                .bind(user.0 as i64)
                .fetch_one(self.pool())
                .await?;

            // COUNT > 0 guarantees MIN/MAX are non-NULL.
            Ok(match (first, last) {
                (Some(first_session_at), Some(last_session_at)) if session_count > 0 => {
                    Some(UserOverview {
                        user_id: user,
                        session_count,
                        total_secs,
                        first_session_at,
                        last_session_at,
                    })
                }
                _ => None,
            })
        })
        .await
    }

    /// Per-channel totals for a user, busiest channel first. Equal totals
    /// are ordered by channel id so the ranking is stable across runs.
    pub async fn channel_breakdown(&self, user: UserId) -> StoreResult<Vec<ChannelUsage>> {
        self.bounded(async {
            let rows: Vec<(i64, String, i64, i64)> = sqlx::query_as(
                r#"
                SELECT
                    r.channel_id,
                    (SELECT r2.channel_name FROM session_records r2
                     WHERE r2.user_id = r.user_id AND r2.channel_id = r.channel_id
                     ORDER BY r2.started_at DESC, r2.id DESC LIMIT 1) AS channel_name,
                    COALESCE(SUM(r.duration_secs), 0) AS total_secs,
                    COUNT(*) AS session_count
                FROM session_records r
                WHERE r.user_id = ?1
                GROUP BY r.channel_id
                ORDER BY total_secs DESC, r.channel_id ASC
                "#,
            )
            .bind(user.0 as i64)
            .fetch_all(self.pool())
            .await?;

            Ok(rows
                .into_iter()
                .map(
                    |(channel_id, channel_name, total_secs, session_count)| ChannelUsage {
                        channel_id: ChannelId(channel_id as u64),
                        channel_name,
                        total_secs,
                        session_count,
                    },
                )
                .collect())
        })
        .await
    }
}

fn row_to_record(row: (i64, String, i64, String, i64, i64, i64)) -> SessionRecord {
    let (user_id, username, channel_id, channel_name, started_at, ended_at, duration_secs) = row;
    SessionRecord {
        user_id: UserId(user_id as u64),
        username,
        channel_id: ChannelId(channel_id as u64),
        channel_name,
        started_at,
        ended_at,
        duration_secs,
    }
}
