//! mentor-engine turns raw source text into classified, de-duplicated
//! "learning moments" for an educational coding assistant.
//!
//! The engine parses TypeScript, JavaScript, and Python with error-tolerant,
//! incremental tree-sitter parsing, runs structural pattern queries (long
//! functions, magic numbers, nested loops, duplicated code), classifies each
//! occurrence into exactly one issue category, and filters already-surfaced
//! items through a TTL- and size-bounded notification cache. Concurrency is
//! bounded per workspace and a connectivity state machine drives degraded
//! mode when a remote assist is configured but unreachable.

pub mod buffer;
pub mod cache;
pub mod classify;
pub mod config;
pub mod connectivity;
pub mod detect;
pub mod engine;
pub mod errors;
pub mod language;
pub mod models;
pub mod scheduler;

// Re-export the types a host needs for the two boundary calls.
pub use config::{EngineSettings, Mode};
pub use engine::AnalysisEngine;
pub use errors::EngineError;
pub use models::{
    AnalysisStatus, AnalyzeRequest, AnalyzeResponse, CacheAction, Category, ClassifiedPattern,
    EngineStatus, Language, PatternKind, PatternOccurrence, Severity, SCHEMA_VERSION,
};

// Tests are defined in their respective modules with #[cfg(test)]
