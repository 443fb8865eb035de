//! Bounded admission of concurrent analysis jobs, per workspace.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use crate::errors::EngineError;

/// Concurrent analysis jobs allowed per workspace.
pub const MAX_CONCURRENT_PER_WORKSPACE: usize = 3;

/// Requests queued beyond the running slots before callers are told to
/// retry later instead of queueing.
pub const MAX_QUEUE_DEPTH: usize = 32;

/// Queue depth at which the adaptive debounce starts climbing.
const PRESSURE_THRESHOLD: usize = 8;

const BASE_DEBOUNCE_MS: u64 = 200;
const MAX_DEBOUNCE_MS: u64 = 1600;

struct WorkspaceSlots {
    permits: Arc<Semaphore>,
    queued: AtomicUsize,
    active: AtomicUsize,
    debounce_ms: AtomicU64,
}

impl WorkspaceSlots {
    fn new() -> Self {
        WorkspaceSlots {
            permits: Arc::new(Semaphore::new(MAX_CONCURRENT_PER_WORKSPACE)),
            queued: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            debounce_ms: AtomicU64::new(BASE_DEBOUNCE_MS),
        }
    }

    fn raise_debounce(&self) {
        let current = self.debounce_ms.load(Ordering::Relaxed);
        let next = (current * 2).min(MAX_DEBOUNCE_MS);
        if next != current {
            self.debounce_ms.store(next, Ordering::Relaxed);
            debug!(debounce_ms = next, "raised adaptive debounce under load");
        }
    }

    fn decay_debounce(&self) {
        let current = self.debounce_ms.load(Ordering::Relaxed);
        let next = (current / 2).max(BASE_DEBOUNCE_MS);
        if next != current {
            self.debounce_ms.store(next, Ordering::Relaxed);
        }
    }
}

/// One in-flight analysis job. Dropping the slot releases it and lets the
/// next queued request run.
pub struct SchedulerSlot {
    _permit: OwnedSemaphorePermit,
    slots: Arc<WorkspaceSlots>,
}

impl Drop for SchedulerSlot {
    fn drop(&mut self) {
        self.slots.active.fetch_sub(1, Ordering::Relaxed);
        if self.slots.queued.load(Ordering::Relaxed) == 0 {
            self.slots.decay_debounce();
        }
    }
}

/// Admits at most [`MAX_CONCURRENT_PER_WORKSPACE`] jobs per workspace and
/// queues the rest in arrival order. The tokio semaphore's fair FIFO
/// ordering is the queue.
#[derive(Default)]
pub struct AnalysisScheduler {
    workspaces: DashMap<String, Arc<WorkspaceSlots>>,
}

impl AnalysisScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self, workspace: &str) -> Arc<WorkspaceSlots> {
        self.workspaces
            .entry(workspace.to_string())
            .or_insert_with(|| Arc::new(WorkspaceSlots::new()))
            .clone()
    }

    /// Acquire a slot, waiting in FIFO order when all slots are busy.
    ///
    /// Fails fast with [`EngineError::QueueOverflow`] when the queue is
    /// already at [`MAX_QUEUE_DEPTH`]; the caller retries after the
    /// suggested delay rather than blocking.
    pub async fn admit(&self, workspace: &str) -> Result<SchedulerSlot, EngineError> {
        let slots = self.slots(workspace);

        if let Ok(permit) = slots.permits.clone().try_acquire_owned() {
            slots.active.fetch_add(1, Ordering::Relaxed);
            return Ok(SchedulerSlot {
                _permit: permit,
                slots,
            });
        }

        let depth = slots.queued.fetch_add(1, Ordering::Relaxed) + 1;
        if depth > MAX_QUEUE_DEPTH {
            slots.queued.fetch_sub(1, Ordering::Relaxed);
            let retry_after_ms = slots.debounce_ms.load(Ordering::Relaxed);
            warn!(workspace, depth, "analysis queue overflow");
            return Err(EngineError::QueueOverflow {
                workspace: workspace.to_string(),
                retry_after_ms,
            });
        }
        if depth > PRESSURE_THRESHOLD {
            slots.raise_debounce();
        }

        let permit = slots
            .permits
            .clone()
            .acquire_owned()
            .await
            .expect("slot semaphore is never closed");
        slots.queued.fetch_sub(1, Ordering::Relaxed);
        slots.active.fetch_add(1, Ordering::Relaxed);
        Ok(SchedulerSlot {
            _permit: permit,
            slots,
        })
    }

    /// Effective debounce interval the host should apply before submitting
    /// the next analysis for this workspace.
    pub fn current_debounce(&self, workspace: &str) -> Duration {
        Duration::from_millis(self.slots(workspace).debounce_ms.load(Ordering::Relaxed))
    }

    pub fn active_jobs(&self, workspace: &str) -> usize {
        self.slots(workspace).active.load(Ordering::Relaxed)
    }

    pub fn queued_jobs(&self, workspace: &str) -> usize {
        self.slots(workspace).queued.load(Ordering::Relaxed)
    }

    /// Totals across all workspaces, for status reporting.
    pub fn totals(&self) -> (usize, usize) {
        let mut active = 0;
        let mut queued = 0;
        for entry in self.workspaces.iter() {
            active += entry.active.load(Ordering::Relaxed);
            queued += entry.queued.load(Ordering::Relaxed);
        }
        (active, queued)
    }
}
