//! Cycle scheduling: enforce the minimum interval between poll cycles.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::models::{CycleState, CYCLE_LABEL};
use crate::store::{Store, StoreError};

/// Gates the coordinator's poll trigger on the persisted last-completed
/// marker. Single recurring task; the marker lives under [`CYCLE_LABEL`].
#[derive(Debug, Clone)]
pub struct Scheduler {
    store: Arc<dyn Store>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(store: Arc<dyn Store>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Whether the minimum interval has elapsed since the last completed
    /// cycle. A missing marker means a cycle is due immediately.
    pub async fn due_now(&self) -> Result<bool, StoreError> {
        Ok(self.remaining().await?.is_none())
    }

    /// Suspend until the next cycle is due. Returns early when the token is
    /// cancelled; the caller's loop re-checks the token.
    pub async fn wait_until_due(&self, shutdown: &CancellationToken) -> Result<(), StoreError> {
        if let Some(remaining) = self.remaining().await? {
            tracing::debug!("next cycle due in {:?}", remaining);
            sleep_cancellable(shutdown, remaining).await;
        }
        Ok(())
    }

    /// Record `completed_at` as the new last-completed marker.
    pub async fn mark_completed(&self, completed_at: DateTime<Utc>) -> Result<(), StoreError> {
        self.store
            .upsert_cycle(CycleState::new(CYCLE_LABEL, completed_at))
            .await
    }

    /// Time left until due, or `None` when already due.
    async fn remaining(&self) -> Result<Option<Duration>, StoreError> {
        let Some(state) = self.store.last_cycle(CYCLE_LABEL).await? else {
            return Ok(None);
        };
        let due_at = state.completed_at
            + chrono::Duration::from_std(self.interval).unwrap_or(chrono::TimeDelta::MAX);
        let now = Utc::now();
        if now >= due_at {
            return Ok(None);
        }
        Ok((due_at - now).to_std().ok())
    }
}

/// Sleep that aborts when the token is cancelled. Returns `true` when the
/// full duration elapsed.
pub async fn sleep_cancellable(token: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        () = token.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}
