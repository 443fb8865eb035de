use thiserror::Error;

/// Errors that cross the engine boundary.
///
/// Parse errors, classification ambiguity, and cache corruption are absorbed
/// internally (logged, never surfaced); only scheduling pressure and
/// persistent remote unavailability reach the caller.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The per-workspace queue is full. The caller should retry after the
    /// suggested delay instead of blocking.
    #[error("analysis queue is full for workspace '{workspace}', retry in {retry_after_ms}ms")]
    QueueOverflow {
        workspace: String,
        retry_after_ms: u64,
    },

    /// The remote analysis path is unavailable and the retry budget is
    /// exhausted. Local detection keeps working; this only reports status.
    #[error("remote analysis unavailable after {attempts} attempts")]
    RemoteUnavailable { attempts: u32 },
}
