//! Per-container build state and the readiness barrier.
//!
//! The board is the single authority on container states. Every transition
//! republishes the aggregate readiness flag through a watch channel; waiters
//! re-check the flag after each wake, so a spurious wake racing new work is
//! never observed as ready.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;

use symdex_api::models::Readiness;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    Clean,
    Building,
    Stale,
    Absent,
}

#[derive(Default)]
struct BoardInner {
    states: HashMap<String, IndexState>,
    /// Enqueued-but-not-yet-committed work, including exclusive tasks.
    pending: usize,
}

impl BoardInner {
    fn is_ready(&self) -> bool {
        self.pending == 0
            && !self
                .states
                .values()
                .any(|s| matches!(s, IndexState::Building | IndexState::Stale))
    }
}

pub struct IndexStatusBoard {
    inner: Mutex<BoardInner>,
    ready_tx: watch::Sender<bool>,
}

impl Default for IndexStatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexStatusBoard {
    pub fn new() -> Self {
        let (ready_tx, _) = watch::channel(true);
        Self {
            inner: Mutex::new(BoardInner::default()),
            ready_tx,
        }
    }

    fn update(&self, apply: impl FnOnce(&mut BoardInner)) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        apply(&mut inner);
        let ready = inner.is_ready();
        // Published under the lock so waiters never see a torn transition.
        self.ready_tx.send_replace(ready);
    }

    pub fn note_enqueued(&self, container_key: &str) {
        self.update(|inner| {
            inner.pending += 1;
            inner
                .states
                .insert(container_key.to_string(), IndexState::Building);
        });
    }

    pub fn note_enqueued_exclusive(&self) {
        self.update(|inner| inner.pending += 1);
    }

    /// A submission that never reached the queue; undoes its pending slot.
    pub fn note_dropped(&self) {
        self.update(|inner| inner.pending = inner.pending.saturating_sub(1));
    }

    pub fn note_clean(&self, container_key: &str) {
        self.update(|inner| {
            inner.pending = inner.pending.saturating_sub(1);
            inner
                .states
                .insert(container_key.to_string(), IndexState::Clean);
        });
    }

    pub fn note_absent(&self, container_key: &str) {
        self.update(|inner| {
            inner.pending = inner.pending.saturating_sub(1);
            inner
                .states
                .insert(container_key.to_string(), IndexState::Absent);
        });
    }

    pub fn note_stale(&self, container_key: &str) {
        self.update(|inner| {
            inner.pending = inner.pending.saturating_sub(1);
            inner
                .states
                .insert(container_key.to_string(), IndexState::Stale);
        });
    }

    /// Warm-start bookkeeping: the container is queryable without any
    /// queued work behind it.
    pub fn note_loaded(&self, container_key: &str) {
        self.update(|inner| {
            inner
                .states
                .insert(container_key.to_string(), IndexState::Clean);
        });
    }

    pub fn note_reset_done(&self) {
        self.update(|inner| {
            inner.pending = inner.pending.saturating_sub(1);
            inner.states.clear();
        });
    }

    pub fn state_of(&self, container_key: &str) -> IndexState {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .states
            .get(container_key)
            .copied()
            .unwrap_or(IndexState::Absent)
    }

    pub fn is_ready(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_ready()
    }

    /// Blocks until the queue is drained and every tracked container is
    /// Clean or Absent. All concurrent waiters release together. A zero
    /// timeout with outstanding work reports `TimedOut` without waiting.
    pub async fn wait_until_ready(&self, timeout: Option<Duration>) -> Readiness {
        let mut rx = self.ready_tx.subscribe();
        let wait = rx.wait_for(|ready| *ready);
        match timeout {
            None => {
                let _ = wait.await;
                Readiness::Ready
            }
            Some(limit) => match tokio::time::timeout(limit, wait).await {
                Ok(_) => Readiness::Ready,
                Err(_) => Readiness::TimedOut,
            },
        }
    }
}
