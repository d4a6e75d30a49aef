// crates/db/src/queries/totals.rs
// Running totals: point lookups, the leaderboard, and the health probe.

use crate::{Store, StoreResult};
use voicetime_core::{UserId, UserTotal};

impl Store {
    /// The user's running total, or the zero row if they have none.
    pub async fn total_for_user(&self, user: UserId) -> StoreResult<UserTotal> {
        self.bounded(async {
            let row: Option<(String, i64)> =
                sqlx::query_as("SELECT username, total_secs FROM user_totals WHERE user_id = ?1")
                    .bind(user.0 as i64)
                    .fetch_optional(self.pool())
                    .await?;

            Ok(match row {
                Some((username, total_secs)) => UserTotal {
                    user_id: user,
                    username,
                    total_secs,
                },
                None => UserTotal::zero(user),
            })
        })
        .await
    }

    /// Top `limit` users by accumulated time. Equal totals are ordered by
    /// user id ascending so the ranking is deterministic.
    pub async fn leaderboard(&self, limit: u32) -> StoreResult<Vec<UserTotal>> {
        self.bounded(async {
            let rows: Vec<(i64, String, i64)> = sqlx::query_as(
                r#"
                SELECT user_id, username, total_secs
                FROM user_totals
                ORDER BY total_secs DESC, user_id ASC
                LIMIT ?1
                "#,
            )
            .bind(limit as i64)
            .fetch_all(self.pool())
            .await?;

            Ok(rows
                .into_iter()
                .map(|(user_id, username, total_secs)| UserTotal {
                    user_id: UserId(user_id as u64),
                    username,
                    total_secs,
                })
                .collect())
        })
        .await
    }

    /// Cheap liveness probe, used by health checks and by the tracker
    /// before replaying parked records.
    pub async fn ping(&self) -> StoreResult<()> {
        self.bounded(async {
            sqlx::query("SELECT 1").execute(self.pool()).await?;
            Ok(())
        })
        .await
    }
}
