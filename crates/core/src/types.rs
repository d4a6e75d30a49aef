// crates/core/src/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform user identifier (snowflake).
///
/// Opaque newtype so a user id can never be passed where a channel id is
/// expected.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Voice channel identifier (snowflake).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A user currently connected to a voice channel.
///
/// Ephemeral: lives in the tracker's open-session map, at most one per
/// user. Closing it is the only way to produce a [`SessionRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSession {
    pub user_id: UserId,
    pub username: String,
    pub channel_id: ChannelId,
    pub channel_name: String,
    /// Unix seconds at which the join notification was observed.
    pub started_at: i64,
}

impl OpenSession {
    pub fn new(
        user_id: UserId,
        username: impl Into<String>,
        channel_id: ChannelId,
        channel_name: impl Into<String>,
        started_at: i64,
    ) -> Self {
        Self {
            user_id,
            username: username.into(),
            channel_id,
            channel_name: channel_name.into(),
            started_at,
        }
    }

    /// Close the session at `ended_at`, producing the immutable record.
    ///
    /// An `ended_at` earlier than `started_at` (out-of-order delivery from
    /// the event source) is clamped so the record never carries a negative
    /// duration.
    pub fn close(self, ended_at: i64) -> SessionRecord {
        let ended_at = ended_at.max(self.started_at);
        SessionRecord {
            user_id: self.user_id,
            username: self.username,
            channel_id: self.channel_id,
            channel_name: self.channel_name,
            started_at: self.started_at,
            ended_at,
            duration_secs: ended_at - self.started_at,
        }
    }
}

/// One finished voice session. Append-only once persisted.
///
/// Invariant: `duration_secs == ended_at - started_at`, never negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub user_id: UserId,
    /// Display name snapshot taken when the session closed.
    pub username: String,
    pub channel_id: ChannelId,
    pub channel_name: String,
    pub started_at: i64,
    pub ended_at: i64,
    pub duration_secs: i64,
}

/// Running per-user total, one row per user.
///
/// `total_secs` always equals the sum of `duration_secs` over every
/// persisted record for the user; the persistence layer maintains it in
/// the same transaction that stores each record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTotal {
    pub user_id: UserId,
    /// Most recently seen display name.
    pub username: String,
    pub total_secs: i64,
}

impl UserTotal {
    /// The well-defined zero row for a user with no history.
    pub fn zero(user_id: UserId) -> Self {
        Self {
            user_id,
            username: String::new(),
            total_secs: 0,
        }
    }
}
