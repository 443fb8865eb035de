//! The analysis engine facade: one `analyze` call per edit event, plus the
//! cache boundary the presentation layer consults before rendering.

use dashmap::DashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::buffer::BufferTracker;
use crate::cache::NotificationCache;
use crate::classify;
use crate::connectivity::{
    ConnectivityMonitor, RemoteAssist, CLASSIFY_ASSIST_TIMEOUT, STRUCTURAL_TIMEOUT,
};
use crate::detect;
use crate::errors::EngineError;
use crate::language;
use crate::models::{
    AnalysisStatus, AnalyzeRequest, AnalyzeResponse, CacheAction, ClassifiedPattern, EngineStatus,
    Language, SCHEMA_VERSION,
};
use crate::scheduler::AnalysisScheduler;

const DEFAULT_WORKSPACE: &str = "default";

/// The engine. One instance per host process; all methods take `&self` and
/// are safe to call concurrently.
pub struct AnalysisEngine {
    tracker: BufferTracker,
    scheduler: AnalysisScheduler,
    connectivity: Arc<ConnectivityMonitor>,
    cache: Arc<NotificationCache>,
    remote: Option<Arc<dyn RemoteAssist>>,
    /// Cancellation flag of the in-flight job per file. Inserting a new
    /// flag cancels the previous job cooperatively.
    cancel_flags: DashMap<String, Arc<AtomicBool>>,
}

impl Default for AnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisEngine {
    pub fn new() -> Self {
        AnalysisEngine {
            tracker: BufferTracker::new(),
            scheduler: AnalysisScheduler::new(),
            connectivity: Arc::new(ConnectivityMonitor::new()),
            cache: Arc::new(NotificationCache::new()),
            remote: None,
            cancel_flags: DashMap::new(),
        }
    }

    /// Attach a remote classification assist. Without one the engine is
    /// fully local and never leaves Connected state.
    pub fn with_remote(mut self, remote: Arc<dyn RemoteAssist>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Use a previously persisted notification cache snapshot.
    pub fn with_cache_snapshot(mut self, path: &Path) -> Self {
        self.cache = Arc::new(NotificationCache::load_from(path));
        self
    }

    /// Persist the notification cache so dismissals survive restarts.
    pub fn save_cache_snapshot(&self, path: &Path) -> anyhow::Result<()> {
        self.cache.save_to(path)
    }

    /// Analyze one revision of a file.
    ///
    /// Never fails for malformed or unsupported input; the only error is
    /// [`EngineError::QueueOverflow`] when the workspace queue is full.
    /// Idempotent for the same revision text.
    pub async fn analyze(&self, request: AnalyzeRequest) -> Result<AnalyzeResponse, EngineError> {
        let started = Instant::now();
        let settings = request.settings.clone().unwrap_or_default();
        let language = Language::from_identifier(&request.language);
        let workspace = request
            .workspace
            .clone()
            .unwrap_or_else(|| DEFAULT_WORKSPACE.to_string());

        let revision =
            self.tracker
                .record_edit(&request.file, &request.code, request.changed_ranges.as_deref());
        let revision_id = revision.revision;

        // Supersede any in-flight job for this file.
        let cancel = Arc::new(AtomicBool::new(false));
        if let Some(previous) = self
            .cancel_flags
            .insert(request.file.clone(), cancel.clone())
        {
            previous.store(true, Ordering::Relaxed);
        }

        let slot = self.scheduler.admit(&workspace).await?;

        if !self.tracker.is_current(&request.file, revision_id) {
            debug!(file = %request.file, revision = revision_id, "superseded while queued");
            return Ok(self.finish(Vec::new(), AnalysisStatus::Superseded, started));
        }

        // Parsing and detection are CPU-bound; keep them off the runtime's
        // I/O threads.
        let file = request.file.clone();
        let detect_settings = settings.clone();
        let detect_cancel = cancel.clone();
        let detected = tokio::task::spawn_blocking(move || {
            let tree = language::parse(&revision, language);
            let occurrences = detect::run_queries(&tree, &file, &detect_settings, &detect_cancel);
            (occurrences, tree.is_limited(), tree.has_errors())
        })
        .await;
        drop(slot);

        let (occurrences, limited, had_errors) = match detected {
            Ok(result) => result,
            Err(e) => {
                warn!(file = %request.file, error = %e, "analysis task failed");
                (Some(Vec::new()), true, false)
            }
        };
        if had_errors {
            debug!(file = %request.file, "parse errors localized, partial detection");
        }

        let Some(occurrences) = occurrences else {
            return Ok(self.finish(Vec::new(), AnalysisStatus::Superseded, started));
        };

        let mut patterns: Vec<ClassifiedPattern> = occurrences
            .into_iter()
            .map(|occurrence| {
                classify::classify(occurrence, language.unwrap_or(Language::JavaScript))
            })
            .filter(|classified| settings.category_enabled(classified.category))
            .filter(|classified| !self.cache.should_suppress(&classified.occurrence.id))
            .collect();

        patterns = self.refine_remote(patterns).await;

        if !self.tracker.is_current(&request.file, revision_id) {
            return Ok(self.finish(Vec::new(), AnalysisStatus::Superseded, started));
        }

        let status = if limited {
            AnalysisStatus::LimitedSupport
        } else {
            AnalysisStatus::Complete
        };
        Ok(self.finish(patterns, status, started))
    }

    /// The cache boundary used by the presentation layer before rendering.
    /// Returns whether the identity was already suppressed; the action is
    /// recorded either way.
    pub fn check_and_record(&self, identity: &str, action: CacheAction) -> bool {
        self.cache.record(identity, action)
    }

    /// Suppression check without recording anything.
    pub fn is_suppressed(&self, identity: &str) -> bool {
        self.cache.should_suppress(identity)
    }

    /// Point-in-time engine health for status bars.
    pub fn status(&self) -> EngineStatus {
        let (active_jobs, queued_jobs) = self.scheduler.totals();
        EngineStatus {
            schema_version: SCHEMA_VERSION,
            connectivity: self.connectivity.state(),
            active_jobs,
            queued_jobs,
            cache_entries: self.cache.len(),
            cache_bytes: self.cache.total_bytes(),
        }
    }

    /// Debounce interval the host should apply for a workspace right now.
    pub fn current_debounce(&self, workspace: &str) -> std::time::Duration {
        self.scheduler.current_debounce(workspace)
    }

    /// Drop per-file state for a closed file.
    pub fn forget_file(&self, file: &str) {
        self.tracker.forget(file);
        self.cancel_flags.remove(file);
        crate::language::tree_cache::invalidate(file);
    }

    /// Run the remote assist over locally classified patterns, when allowed.
    /// Local results always survive a remote failure.
    async fn refine_remote(&self, patterns: Vec<ClassifiedPattern>) -> Vec<ClassifiedPattern> {
        let Some(remote) = &self.remote else {
            return patterns;
        };
        let was_degraded = self.connectivity.is_degraded();
        if patterns.is_empty() || !self.connectivity.attempt_allowed() {
            return patterns;
        }

        // Out of degraded mode the first attempt is a cheap probe; a full
        // assist call is only worth making once the path answers again.
        if was_degraded {
            match timeout(STRUCTURAL_TIMEOUT, remote.ping()).await {
                Ok(Ok(())) => self.connectivity.record_success(),
                _ => {
                    debug!("degraded-mode probe failed");
                    self.connectivity.record_failure();
                    return patterns;
                }
            }
        }

        match timeout(CLASSIFY_ASSIST_TIMEOUT, remote.refine(&patterns)).await {
            Ok(Ok(refined)) => {
                self.connectivity.record_success();
                refined
            }
            Ok(Err(e)) => {
                debug!(error = %e, "remote assist failed, keeping local classification");
                self.connectivity.record_failure();
                patterns
            }
            Err(_) => {
                debug!("remote assist timed out, keeping local classification");
                self.connectivity.record_failure();
                patterns
            }
        }
    }

    fn finish(
        &self,
        patterns: Vec<ClassifiedPattern>,
        status: AnalysisStatus,
        started: Instant,
    ) -> AnalyzeResponse {
        AnalyzeResponse {
            schema_version: SCHEMA_VERSION,
            patterns,
            analysis_time_ms: started.elapsed().as_millis() as u64,
            degraded: self.connectivity.is_degraded(),
            status,
        }
    }
}
