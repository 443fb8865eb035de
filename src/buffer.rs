use dashmap::DashMap;
use tracing::trace;

use crate::models::{LineRange, SourcePosition};

/// One byte-level edit between two revisions, with enough position data to
/// drive an incremental re-parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditSpan {
    pub start_byte: usize,
    pub old_end_byte: usize,
    pub new_end_byte: usize,
    pub start_position: SourcePosition,
    pub old_end_position: SourcePosition,
    pub new_end_position: SourcePosition,
}

/// The latest analyzed state of one file.
///
/// Replaced wholesale on each edit event; once superseded, the previous
/// revision's text is gone and only the new one is reachable.
#[derive(Debug, Clone)]
pub struct SourceRevision {
    pub file: String,
    /// Monotonically increasing per file; the supersession signal for
    /// in-flight jobs.
    pub revision: u64,
    pub text: String,
    /// Minimal line ranges touched since the prior revision. Empty when the
    /// text is unchanged; covers the whole file for a first-seen file.
    pub changed_ranges: Vec<LineRange>,
    /// Byte-level edits since the prior revision, for incremental parsing.
    /// Empty when there is no prior revision to edit against.
    pub edits: Vec<EditSpan>,
}

struct FileState {
    revision: u64,
    text: String,
}

/// Tracks the last recorded revision of every file and computes what
/// changed between revisions.
///
/// Malformed input text is treated as an opaque revision here; correctness
/// downstream is the parser's responsibility.
#[derive(Default)]
pub struct BufferTracker {
    files: DashMap<String, FileState>,
}

impl BufferTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an edit event and return the new revision.
    ///
    /// When the host supplies explicit changed ranges those are trusted;
    /// otherwise the new text is diffed against the previous revision's
    /// full text (common prefix/suffix trim) to find the minimal touched
    /// region.
    pub fn record_edit(
        &self,
        file: &str,
        new_text: &str,
        explicit_ranges: Option<&[LineRange]>,
    ) -> SourceRevision {
        let mut entry = self.files.entry(file.to_string()).or_insert(FileState {
            revision: 0,
            text: String::new(),
        });

        let previous = std::mem::take(&mut entry.text);
        entry.revision += 1;
        entry.text = new_text.to_string();
        let revision = entry.revision;
        drop(entry);

        let (changed_ranges, edits) = if revision == 1 {
            // First sighting of this file: everything is "changed" and there
            // is no prior tree to edit.
            let last_line = new_text.lines().count().saturating_sub(1);
            (
                vec![LineRange {
                    start: 0,
                    end: last_line,
                }],
                Vec::new(),
            )
        } else if let Some(ranges) = explicit_ranges {
            let edits = diff_edit(&previous, new_text).into_iter().collect();
            (ranges.to_vec(), edits)
        } else {
            match diff_edit(&previous, new_text) {
                Some(edit) => (
                    vec![LineRange {
                        start: edit.start_position.line,
                        end: edit.new_end_position.line,
                    }],
                    vec![edit],
                ),
                None => (Vec::new(), Vec::new()),
            }
        };

        trace!(
            file,
            revision,
            changed = changed_ranges.len(),
            "recorded edit"
        );

        SourceRevision {
            file: file.to_string(),
            revision,
            text: new_text.to_string(),
            changed_ranges,
            edits,
        }
    }

    /// Latest revision counter for a file, or 0 if never seen.
    pub fn latest_revision(&self, file: &str) -> u64 {
        self.files.get(file).map(|s| s.revision).unwrap_or(0)
    }

    /// Whether `revision` is still the newest for `file`. In-flight jobs
    /// check this before publishing; "last write wins".
    pub fn is_current(&self, file: &str, revision: u64) -> bool {
        self.latest_revision(file) == revision
    }

    /// Drop all state for a file (closed in the host editor).
    pub fn forget(&self, file: &str) {
        self.files.remove(file);
    }
}

/// Compute the single minimal byte-level edit turning `old` into `new`, or
/// `None` when the texts are identical.
fn diff_edit(old: &str, new: &str) -> Option<EditSpan> {
    if old == new {
        return None;
    }

    let old_bytes = old.as_bytes();
    let new_bytes = new.as_bytes();

    let mut prefix = 0;
    let max_prefix = old_bytes.len().min(new_bytes.len());
    while prefix < max_prefix && old_bytes[prefix] == new_bytes[prefix] {
        prefix += 1;
    }

    let mut suffix = 0;
    let max_suffix = max_prefix - prefix;
    while suffix < max_suffix
        && old_bytes[old_bytes.len() - 1 - suffix] == new_bytes[new_bytes.len() - 1 - suffix]
    {
        suffix += 1;
    }

    let old_end = old_bytes.len() - suffix;
    let new_end = new_bytes.len() - suffix;

    Some(EditSpan {
        start_byte: prefix,
        old_end_byte: old_end,
        new_end_byte: new_end,
        start_position: position_at(old_bytes, prefix),
        old_end_position: position_at(old_bytes, old_end),
        new_end_position: position_at(new_bytes, new_end),
    })
}

/// Row/column (byte column, tree-sitter convention) of a byte offset.
fn position_at(bytes: &[u8], offset: usize) -> SourcePosition {
    let mut line = 0;
    let mut line_start = 0;
    for (i, &b) in bytes[..offset].iter().enumerate() {
        if b == b'\n' {
            line += 1;
            line_start = i + 1;
        }
    }
    SourcePosition {
        line,
        column: offset - line_start,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revisions_are_monotonic_per_file() {
        let tracker = BufferTracker::new();
        let r1 = tracker.record_edit("a.ts", "let x = 1;\n", None);
        let r2 = tracker.record_edit("a.ts", "let x = 2;\n", None);
        let other = tracker.record_edit("b.ts", "pass\n", None);
        assert_eq!(r1.revision, 1);
        assert_eq!(r2.revision, 2);
        assert_eq!(other.revision, 1);
        assert!(tracker.is_current("a.ts", 2));
        assert!(!tracker.is_current("a.ts", 1));
    }

    #[test]
    fn first_revision_marks_whole_file_changed() {
        let tracker = BufferTracker::new();
        let rev = tracker.record_edit("a.py", "x = 1\ny = 2\nz = 3\n", None);
        assert_eq!(rev.changed_ranges, vec![LineRange { start: 0, end: 2 }]);
        assert!(rev.edits.is_empty());
    }

    #[test]
    fn diff_finds_the_touched_line() {
        let tracker = BufferTracker::new();
        tracker.record_edit("a.py", "a = 1\nb = 2\nc = 3\n", None);
        let rev = tracker.record_edit("a.py", "a = 1\nb = 42\nc = 3\n", None);
        assert_eq!(rev.changed_ranges.len(), 1);
        assert_eq!(rev.changed_ranges[0].start, 1);
        assert_eq!(rev.changed_ranges[0].end, 1);
        let edit = rev.edits[0];
        assert_eq!(edit.start_position.line, 1);
        assert!(edit.new_end_byte > edit.start_byte);
    }

    #[test]
    fn identical_text_yields_no_ranges() {
        let tracker = BufferTracker::new();
        tracker.record_edit("a.js", "const x = 1;\n", None);
        let rev = tracker.record_edit("a.js", "const x = 1;\n", None);
        assert!(rev.changed_ranges.is_empty());
        assert!(rev.edits.is_empty());
    }

    #[test]
    fn insertion_at_end_of_file() {
        let tracker = BufferTracker::new();
        tracker.record_edit("a.js", "const x = 1;\n", None);
        let rev = tracker.record_edit("a.js", "const x = 1;\nconst y = 2;\n", None);
        let edit = rev.edits[0];
        assert_eq!(edit.old_end_byte - edit.start_byte, 0);
        assert_eq!(edit.new_end_position.line, 2);
    }
}
