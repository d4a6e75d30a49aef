// crates/tracker/src/lib.rs
//! Live voice-session tracking.
//!
//! [`SessionTracker`] owns the map of currently-open sessions and turns
//! paired join/leave notifications into committed [`SessionRecord`]s.
//! When the store is unreachable a closed record is parked in a bounded
//! in-memory queue instead of being dropped, and replayed in order once
//! commits succeed again.

pub mod config;

pub use config::{RejoinPolicy, TrackerConfig};

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};
use voicetime_core::{ChannelId, OpenSession, PresenceEvent, SessionRecord, UserId};
use voicetime_db::{Store, StoreError};

/// Errors surfaced by tracker operations.
///
/// Idempotent no-ops (leave without a session, duplicate joins) are not
/// errors; only store failures reach the caller, and the record involved
/// is already parked for replay by the time one does.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type TrackerResult<T> = Result<T, TrackerError>;

/// Converts presence notifications into durable session history.
///
/// Cheap to clone; all clones share the same open-session map and parked
/// queue. Event handling takes `&self`, so a gateway task and query
/// handlers can hold clones concurrently.
#[derive(Clone)]
pub struct SessionTracker {
    inner: Arc<Inner>,
}

struct Inner {
    store: Store,
    config: TrackerConfig,
    /// At most one open session per user.
    open: RwLock<HashMap<UserId, OpenSession>>,
    /// Closed records the store has not yet accepted, oldest first. The
    /// lock doubles as the commit-pipeline lock: holding it while
    /// replaying keeps history writes serialized and in close order.
    pending: Mutex<VecDeque<SessionRecord>>,
}

impl SessionTracker {
    pub fn new(store: Store) -> Self {
        Self::with_config(store, TrackerConfig::default())
    }

    pub fn with_config(store: Store, config: TrackerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                config,
                open: RwLock::new(HashMap::new()),
                pending: Mutex::new(VecDeque::new()),
            }),
        }
    }

    /// Dispatch a gateway notification to the matching handler.
    pub async fn apply(&self, event: &PresenceEvent) -> TrackerResult<Option<SessionRecord>> {
        match event {
            PresenceEvent::Join {
                user_id,
                username,
                channel_id,
                channel_name,
                at,
            } => {
                self.on_join(*user_id, username, *channel_id, channel_name, *at)
                    .await
            }
            PresenceEvent::Leave { user_id, at } => self.on_leave(*user_id, *at).await,
            PresenceEvent::Move {
                user_id,
                username,
                channel_id,
                channel_name,
                at,
            } => {
                self.on_move(*user_id, username, *channel_id, channel_name, *at)
                    .await
            }
        }
    }

    /// Open a session for a user who connected to a voice channel.
    ///
    /// If a session is already open for the user the configured
    /// [`RejoinPolicy`] applies: the default closes and commits the
    /// previous session at the join timestamp (returned as `Some`),
    /// `Overwrite` discards it. Either way the map ends up holding
    /// exactly the new session.
    pub async fn on_join(
        &self,
        user_id: UserId,
        username: &str,
        channel_id: ChannelId,
        channel_name: &str,
        at: i64,
    ) -> TrackerResult<Option<SessionRecord>> {
        let replaced = {
            let mut open = self.inner.open.write().await;
            open.insert(
                user_id,
                OpenSession::new(user_id, username, channel_id, channel_name, at),
            )
        };

        match replaced {
            None => {
                debug!(user = %user_id, channel = %channel_id, "voice session opened");
                Ok(None)
            }
            Some(previous) => match self.inner.config.rejoin_policy {
                RejoinPolicy::CloseAndReopen => {
                    debug!(user = %user_id, "duplicate join closes the previous session");
                    self.commit_closed(previous.close(at)).await.map(Some)
                }
                RejoinPolicy::Overwrite => {
                    warn!(
                        user = %user_id,
                        discarded_start = previous.started_at,
                        "duplicate join discarded the previous open session"
                    );
                    Ok(None)
                }
            },
        }
    }

    /// Close the user's session at the leave timestamp and commit it.
    ///
    /// A leave with no open session is an idempotent no-op: duplicate and
    /// out-of-order leave notifications are logged and ignored. The open
    /// session is removed from the map even when the commit fails; the
    /// closed record is then parked for replay and the failure surfaced.
    pub async fn on_leave(
        &self,
        user_id: UserId,
        at: i64,
    ) -> TrackerResult<Option<SessionRecord>> {
        let session = { self.inner.open.write().await.remove(&user_id) };

        match session {
            None => {
                debug!(user = %user_id, "leave without an open session ignored");
                Ok(None)
            }
            Some(open) => self.commit_closed(open.close(at)).await.map(Some),
        }
    }

    /// Handle a direct channel-to-channel move.
    ///
    /// Always closes the previous session and opens the new one in a
    /// single map update, regardless of the rejoin policy: a move is
    /// unambiguous about the user having been connected until now. A
    /// move for a user with no open session degrades to a join.
    pub async fn on_move(
        &self,
        user_id: UserId,
        username: &str,
        channel_id: ChannelId,
        channel_name: &str,
        at: i64,
    ) -> TrackerResult<Option<SessionRecord>> {
        let replaced = {
            let mut open = self.inner.open.write().await;
            open.insert(
                user_id,
                OpenSession::new(user_id, username, channel_id, channel_name, at),
            )
        };

        match replaced {
            None => {
                debug!(user = %user_id, "move without an open session treated as join");
                Ok(None)
            }
            Some(previous) => self.commit_closed(previous.close(at)).await.map(Some),
        }
    }

    /// Snapshot of everyone currently connected, in no particular order.
    pub async fn active_sessions(&self) -> Vec<OpenSession> {
        self.inner.open.read().await.values().cloned().collect()
    }

    /// The user's open session, if they are connected right now.
    pub async fn active_session(&self, user_id: UserId) -> Option<OpenSession> {
        self.inner.open.read().await.get(&user_id).cloned()
    }

    /// True while closed records are parked waiting for the store. A
    /// front end can use this to warn users that statistics are lagging.
    pub async fn degraded(&self) -> bool {
        !self.inner.pending.lock().await.is_empty()
    }

    /// Number of parked records awaiting replay.
    pub async fn pending_count(&self) -> usize {
        self.inner.pending.lock().await.len()
    }

    /// Replay parked records after the store recovers.
    ///
    /// Commits in close order and stops at the first failure, leaving the
    /// rest parked. Returns how many records were flushed.
    pub async fn flush_pending(&self) -> TrackerResult<usize> {
        self.inner.store.ping().await?;

        let mut pending = self.inner.pending.lock().await;
        let mut flushed = 0usize;
        while let Some(parked) = pending.front() {
            self.inner.store.commit_session(parked).await?;
            pending.pop_front();
            flushed += 1;
        }
        if flushed > 0 {
            info!(flushed, "replayed parked sessions after store recovery");
        }
        Ok(flushed)
    }

    /// Commit one closed record, replaying anything parked ahead of it
    /// first so history always lands in close order.
    async fn commit_closed(&self, record: SessionRecord) -> TrackerResult<SessionRecord> {
        let mut pending = self.inner.pending.lock().await;

        while let Some(parked) = pending.front() {
            match self.inner.store.commit_session(parked).await {
                Ok(()) => {
                    pending.pop_front();
                }
                Err(err) => {
                    park(&mut pending, record, self.inner.config.pending_capacity);
                    return Err(err.into());
                }
            }
        }

        match self.inner.store.commit_session(&record).await {
            Ok(()) => Ok(record),
            Err(err) => {
                warn!(
                    user = %record.user_id,
                    error = %err,
                    "parking closed session until the store recovers"
                );
                park(&mut pending, record, self.inner.config.pending_capacity);
                Err(err.into())
            }
        }
    }
}

/// Append to the parked queue, dropping the oldest entry on overflow so
/// the newest close is never the one lost.
fn park(pending: &mut VecDeque<SessionRecord>, record: SessionRecord, capacity: usize) {
    if pending.len() >= capacity.max(1) {
        if let Some(dropped) = pending.pop_front() {
            error!(
                user = %dropped.user_id,
                started_at = dropped.started_at,
                "pending queue full, dropping oldest unsaved session"
            );
        }
    }
    pending.push_back(record);
}
