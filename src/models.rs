use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Version stamped on every request/response payload for forward compatibility.
pub const SCHEMA_VERSION: u32 = 1;

/// Languages the engine can parse with full pattern support.
///
/// Anything else is accepted but yields a "limited support" tree with an
/// empty pattern surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    TypeScript,
    JavaScript,
    Python,
}

impl Language {
    /// Resolve a language from a host-supplied identifier or file extension.
    pub fn from_identifier(id: &str) -> Option<Self> {
        match id {
            "typescript" | "typescriptreact" | "ts" | "tsx" => Some(Language::TypeScript),
            "javascript" | "javascriptreact" | "js" | "jsx" | "mjs" | "cjs" => {
                Some(Language::JavaScript)
            }
            "python" | "py" => Some(Language::Python),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Python => "python",
        }
    }
}

/// The kinds of patterns the detectors can emit.
///
/// New kinds are added here plus one new query module under `detect/`;
/// existing queries are never touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatternKind {
    LongFunction,
    MagicNumber,
    NestedLoop,
    DuplicatedCode,
}

impl PatternKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::LongFunction => "long-function",
            PatternKind::MagicNumber => "magic-number",
            PatternKind::NestedLoop => "nested-loop",
            PatternKind::DuplicatedCode => "duplicated-code",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// One step down, saturating at Low.
    pub fn downgraded(self) -> Self {
        match self {
            Severity::High => Severity::Medium,
            _ => Severity::Low,
        }
    }
}

/// The fixed set of issue categories. Every classified pattern carries
/// exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    SyntaxBasics,
    LogicClarity,
    Performance,
    Readability,
    Security,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::SyntaxBasics,
        Category::LogicClarity,
        Category::Performance,
        Category::Readability,
        Category::Security,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::SyntaxBasics => "syntax-basics",
            Category::LogicClarity => "logic-clarity",
            Category::Performance => "performance",
            Category::Readability => "readability",
            Category::Security => "security",
        }
    }
}

/// Zero-based line/column position, matching tree-sitter's row/column model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
}

/// Half-open source range covering an occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRange {
    pub start: SourcePosition,
    pub end: SourcePosition,
}

impl SourceRange {
    pub fn new(start_line: usize, start_column: usize, end_line: usize, end_column: usize) -> Self {
        Self {
            start: SourcePosition {
                line: start_line,
                column: start_column,
            },
            end: SourcePosition {
                line: end_line,
                column: end_column,
            },
        }
    }
}

/// Inclusive range of zero-based line numbers touched by an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

/// A raw pattern emitted by one detector query. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternOccurrence {
    /// Stable identity: blake3 of kind + file + normalized location.
    pub id: String,
    pub kind: PatternKind,
    pub file: String,
    pub range: SourceRange,
    pub severity: Severity,
    /// Free-form detector metadata (line counts, literal values, duplicate
    /// span locations) consumed by lesson generation downstream.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl PatternOccurrence {
    /// Stable hash of kind + normalized location + file, used as the cache key.
    pub fn identity(kind: PatternKind, file: &str, start_line: usize, start_column: usize) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(kind.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(file.as_bytes());
        hasher.update(b":");
        hasher.update(start_line.to_string().as_bytes());
        hasher.update(b":");
        hasher.update(start_column.to_string().as_bytes());
        hasher.finalize().to_hex().to_string()
    }
}

/// An occurrence with its single assigned category and confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedPattern {
    #[serde(flatten)]
    pub occurrence: PatternOccurrence,
    pub category: Category,
    /// Confidence in [0,1]. Never gates category assignment, only logging.
    pub confidence: f64,
}

/// Terminal status of one `analyze` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisStatus {
    /// Full analysis completed.
    Complete,
    /// The language has no pattern support; the response is empty by design.
    LimitedSupport,
    /// A newer revision of the file superseded this job; result discarded.
    Superseded,
}

/// Request payload for [`crate::engine::AnalysisEngine::analyze`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default = "schema_version")]
    pub schema_version: u32,
    pub file: String,
    /// Host-supplied language identifier ("typescript", "python", ...).
    pub language: String,
    pub code: String,
    /// Workspace the file belongs to, for scheduler slot accounting.
    #[serde(default)]
    pub workspace: Option<String>,
    /// Line ranges the host already knows changed. When absent the tracker
    /// diffs against the previous revision.
    #[serde(default)]
    pub changed_ranges: Option<Vec<LineRange>>,
    /// Settings snapshot for this call; defaults apply when absent.
    #[serde(default)]
    pub settings: Option<crate::config::EngineSettings>,
}

fn schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Response payload for [`crate::engine::AnalysisEngine::analyze`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub schema_version: u32,
    pub patterns: Vec<ClassifiedPattern>,
    pub analysis_time_ms: u64,
    pub degraded: bool,
    pub status: AnalysisStatus,
}

/// Presentation-layer action reported through the cache boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheAction {
    Shown,
    Dismissed,
}

/// Point-in-time snapshot of engine health for collaborators' status bars.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub schema_version: u32,
    pub connectivity: crate::connectivity::ConnectivityState,
    pub active_jobs: usize,
    pub queued_jobs: usize,
    pub cache_entries: usize,
    pub cache_bytes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_identifiers_resolve() {
        assert_eq!(Language::from_identifier("ts"), Some(Language::TypeScript));
        assert_eq!(
            Language::from_identifier("javascriptreact"),
            Some(Language::JavaScript)
        );
        assert_eq!(Language::from_identifier("py"), Some(Language::Python));
        assert_eq!(Language::from_identifier("cobol"), None);
    }

    #[test]
    fn identity_is_stable_and_location_sensitive() {
        let a = PatternOccurrence::identity(PatternKind::MagicNumber, "a.ts", 10, 4);
        let b = PatternOccurrence::identity(PatternKind::MagicNumber, "a.ts", 10, 4);
        let c = PatternOccurrence::identity(PatternKind::MagicNumber, "a.ts", 11, 4);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn pattern_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&PatternKind::LongFunction).unwrap();
        assert_eq!(json, "\"long-function\"");
    }
}
