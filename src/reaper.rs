//! Periodic eviction of idle, abandoned and finished sessions.

use crate::broadcast::{BroadcastError, BroadcastHub};
use crate::session::{GameSession, SessionId};
use crate::store::SessionStore;
use chrono::{DateTime, TimeDelta, Utc};
use derive_new::new;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Timeouts deciding when a session is evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, new)]
pub struct ReaperPolicy {
    /// Evict once this long has passed since the last move.
    pub idle_timeout: TimeDelta,
    /// Evict once no player is connected and nobody connected for this long.
    pub disconnect_timeout: TimeDelta,
}

impl Default for ReaperPolicy {
    fn default() -> Self {
        Self {
            idle_timeout: TimeDelta::seconds(300),
            disconnect_timeout: TimeDelta::seconds(600),
        }
    }
}

/// Why a session was evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum EvictionReason {
    /// No move for longer than the idle timeout.
    #[display("idle")]
    Idle,
    /// No connected player for longer than the disconnect timeout.
    #[display("abandoned")]
    Abandoned,
    /// The game already ended.
    #[display("finished")]
    Finished,
}

impl ReaperPolicy {
    /// Returns the reason `session` should be evicted at `now`, if any.
    pub fn eviction_reason(&self, session: &GameSession, now: DateTime<Utc>) -> Option<EvictionReason> {
        if now - session.last_move_time >= self.idle_timeout {
            Some(EvictionReason::Idle)
        } else if !session.has_connected_players()
            && now - session.last_player_activity_time >= self.disconnect_timeout
        {
            Some(EvictionReason::Abandoned)
        } else if session.is_finished() {
            Some(EvictionReason::Finished)
        } else {
            None
        }
    }
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Sessions examined.
    pub examined: usize,
    /// Sessions removed, with the reason.
    pub evicted: Vec<(SessionId, EvictionReason)>,
    /// Sessions whose eviction hit an error; they were still removed.
    pub failed: Vec<SessionId>,
}

/// Sweeps the session store on a fixed period.
#[derive(Clone)]
pub struct SessionReaper {
    store: Arc<dyn SessionStore>,
    hub: Arc<BroadcastHub>,
    policy: ReaperPolicy,
    period: Duration,
}

impl SessionReaper {
    /// Creates a reaper over `store`, publishing final frames through `hub`.
    pub fn new(
        store: Arc<dyn SessionStore>,
        hub: Arc<BroadcastHub>,
        policy: ReaperPolicy,
        period: Duration,
    ) -> Self {
        Self {
            store,
            hub,
            policy,
            period,
        }
    }

    /// Examines every stored session once and evicts the dead ones.
    ///
    /// Each session is handled under its own lock; an error on one session
    /// is logged and the sweep moves on.
    #[instrument(skip(self, now))]
    pub async fn sweep(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        for id in self.store.list_ids() {
            let Some(handle) = self.store.get(&id) else {
                continue;
            };
            report.examined += 1;

            let mut session = handle.lock().await;
            let Some(reason) = self.policy.eviction_reason(&session, now) else {
                continue;
            };

            if let Err(e) = self.evict(&mut session) {
                warn!(session_id = %id, error = %e, "Eviction failed, removing anyway");
                report.failed.push(id.clone());
            }
            self.hub.close_session(&id);
            self.store.delete(&id);
            info!(session_id = %id, %reason, "Game terminated");
            report.evicted.push((id, reason));
        }

        debug!(
            examined = report.examined,
            evicted = report.evicted.len(),
            "Sweep complete"
        );
        report
    }

    /// Finishes the game and publishes the final frame. Fails if any viewer
    /// could not receive it.
    fn evict(&self, session: &mut GameSession) -> Result<usize, BroadcastError> {
        session.finish();
        let watching = self.hub.viewer_count(&session.id);
        let delivered = self.hub.publish(&session.snapshot())?;
        if delivered < watching {
            return Err(BroadcastError::SinkClosed);
        }
        Ok(delivered)
    }

    /// Runs [`SessionReaper::sweep`] every period until the task is aborted.
    pub fn spawn(self) -> JoinHandle<()> {
        info!(period_secs = self.period.as_secs(), "Starting session reaper");
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.period);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                self.sweep(Utc::now()).await;
            }
        })
    }
}
