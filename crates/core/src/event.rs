// crates/core/src/event.rs
use crate::types::{ChannelId, UserId};
use serde::{Deserialize, Serialize};

/// Voice-state transitions delivered by the presence gateway.
///
/// A direct channel-to-channel move may arrive either as a single
/// [`PresenceEvent::Move`] or as a `Leave` + `Join` pair, depending on the
/// gateway; the tracker accepts both and produces the same session
/// history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PresenceEvent {
    /// User connected to a voice channel from no channel.
    Join {
        user_id: UserId,
        username: String,
        channel_id: ChannelId,
        channel_name: String,
        /// Unix seconds at which the gateway observed the transition.
        at: i64,
    },
    /// User disconnected from voice entirely.
    Leave { user_id: UserId, at: i64 },
    /// User switched channels without disconnecting.
    Move {
        user_id: UserId,
        username: String,
        channel_id: ChannelId,
        channel_name: String,
        at: i64,
    },
}

impl PresenceEvent {
    /// The user this event concerns.
    pub fn user_id(&self) -> UserId {
        match self {
            Self::Join { user_id, .. } | Self::Leave { user_id, .. } | Self::Move { user_id, .. } => {
                *user_id
            }
        }
    }

    /// When the gateway observed the transition (Unix seconds).
    pub fn at(&self) -> i64 {
        match self {
            Self::Join { at, .. } | Self::Leave { at, .. } | Self::Move { at, .. } => *at,
        }
    }
}
