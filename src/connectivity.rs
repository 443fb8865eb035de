//! Availability tracking for the remote analysis path.
//!
//! The engine runs fully local; when a remote classification assist is
//! configured, this state machine decides whether calling it is worthwhile
//! and drives degraded-mode behavior. Local syntactic detection is never
//! gated on connectivity.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::models::ClassifiedPattern;

/// Deadline for a remote structural analysis call.
pub const STRUCTURAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Deadline for a remote classification assist call.
pub const CLASSIFY_ASSIST_TIMEOUT: Duration = Duration::from_secs(10);

/// Consecutive failures that demote Retrying to Degraded.
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Backoff before each retry attempt.
pub const BACKOFF_SCHEDULE: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
];

/// Probe cadence while Degraded.
pub const PROBE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityState {
    Connected,
    Retrying,
    Degraded,
}

/// The remote side of the engine, when one is configured. Implementations
/// must be cancel-safe; calls are wrapped in tokio timeouts and a timeout
/// counts as a failure.
#[async_trait]
pub trait RemoteAssist: Send + Sync {
    /// Refine locally classified patterns (confidence calibration, extra
    /// metadata). The engine falls back to the local classification on any
    /// error.
    async fn refine(
        &self,
        patterns: &[ClassifiedPattern],
    ) -> anyhow::Result<Vec<ClassifiedPattern>>;

    /// Lightweight availability check, used as the probe out of degraded
    /// mode under the structural deadline.
    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

struct MonitorInner {
    state: ConnectivityState,
    consecutive_failures: u32,
    last_failure: Option<Instant>,
    degraded_since: Option<Instant>,
}

/// Tracks remote availability through consecutive success/failure counts.
///
/// Transitions:
/// - Connected -> Retrying on the first failure;
/// - Retrying -> Connected on any success;
/// - Retrying -> Degraded after [`MAX_RETRY_ATTEMPTS`] consecutive failures
///   at [`BACKOFF_SCHEDULE`] delays;
/// - Degraded -> Retrying via an automatic probe every [`PROBE_INTERVAL`].
pub struct ConnectivityMonitor {
    inner: Mutex<MonitorInner>,
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectivityMonitor {
    pub fn new() -> Self {
        ConnectivityMonitor {
            inner: Mutex::new(MonitorInner {
                state: ConnectivityState::Connected,
                consecutive_failures: 0,
                last_failure: None,
                degraded_since: None,
            }),
        }
    }

    pub fn state(&self) -> ConnectivityState {
        self.lock().state
    }

    pub fn is_degraded(&self) -> bool {
        self.state() == ConnectivityState::Degraded
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        if inner.state != ConnectivityState::Connected {
            info!("remote analysis path recovered");
        }
        inner.state = ConnectivityState::Connected;
        inner.consecutive_failures = 0;
        inner.last_failure = None;
        inner.degraded_since = None;
    }

    pub fn record_failure(&self) {
        self.record_failure_at(Instant::now());
    }

    pub fn record_failure_at(&self, now: Instant) {
        let mut inner = self.lock();
        inner.consecutive_failures += 1;
        inner.last_failure = Some(now);
        match inner.state {
            ConnectivityState::Connected => {
                debug!("remote call failed, entering retry");
                inner.state = ConnectivityState::Retrying;
                inner.consecutive_failures = 1;
            }
            ConnectivityState::Retrying => {
                if inner.consecutive_failures >= MAX_RETRY_ATTEMPTS {
                    warn!(
                        failures = inner.consecutive_failures,
                        "retry budget exhausted, entering degraded mode"
                    );
                    inner.state = ConnectivityState::Degraded;
                    inner.degraded_since = Some(now);
                }
            }
            ConnectivityState::Degraded => {
                // A failed probe restarts the probe clock.
                inner.degraded_since = Some(now);
            }
        }
    }

    /// Whether a remote attempt is allowed right now. While Retrying this
    /// enforces the backoff schedule; while Degraded it allows one probe per
    /// [`PROBE_INTERVAL`] and moves the machine back to Retrying for it.
    pub fn attempt_allowed(&self) -> bool {
        self.attempt_allowed_at(Instant::now())
    }

    pub fn attempt_allowed_at(&self, now: Instant) -> bool {
        let mut inner = self.lock();
        match inner.state {
            ConnectivityState::Connected => true,
            ConnectivityState::Retrying => {
                let delay = backoff_for(inner.consecutive_failures);
                match inner.last_failure {
                    Some(at) => now.duration_since(at) >= delay,
                    None => true,
                }
            }
            ConnectivityState::Degraded => {
                let due = inner
                    .degraded_since
                    .map(|since| now.duration_since(since) >= PROBE_INTERVAL)
                    .unwrap_or(true);
                if due {
                    info!("probing remote analysis path");
                    inner.state = ConnectivityState::Retrying;
                }
                due
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MonitorInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Backoff before the next attempt after `failures` consecutive failures.
fn backoff_for(failures: u32) -> Duration {
    let idx = (failures.saturating_sub(1) as usize).min(BACKOFF_SCHEDULE.len() - 1);
    BACKOFF_SCHEDULE[idx]
}
