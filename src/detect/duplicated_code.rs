use std::collections::HashMap;

use super::{DetectContext, PatternQuery};
use crate::models::{PatternKind, PatternOccurrence, Severity, SourceRange};

/// Minimum run of identical lines that counts as duplication.
const MIN_DUPLICATE_LINES: usize = 5;

/// High severity once a duplicated span reaches this many lines.
const HIGH_SEVERITY_LINES: usize = 15;

/// Sliding-window duplicate detector over whitespace-normalized lines.
///
/// Lines are trimmed and internal whitespace runs collapsed before
/// comparison; windows containing a blank line do not participate, so runs
/// of empty lines cannot pair with each other. The occurrence anchors at
/// the later span and carries the earlier one in metadata. This query works
/// on the source text directly, so error nodes in the tree never affect it.
pub struct DuplicatedCodeQuery;

impl PatternQuery for DuplicatedCodeQuery {
    fn kind(&self) -> PatternKind {
        PatternKind::DuplicatedCode
    }

    fn run(&self, ctx: &DetectContext<'_>) -> Vec<PatternOccurrence> {
        let raw_lines: Vec<&str> = ctx.source.lines().collect();
        let normalized: Vec<String> = raw_lines.iter().map(|l| normalize_line(l)).collect();
        let n = normalized.len();
        if n < MIN_DUPLICATE_LINES * 2 {
            return Vec::new();
        }

        // First occurrence of each window, keyed by its joined text.
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut occurrences = Vec::new();
        let mut i = 0;
        while i + MIN_DUPLICATE_LINES <= n {
            let window = &normalized[i..i + MIN_DUPLICATE_LINES];
            if window.iter().any(|l| l.is_empty()) {
                i += 1;
                continue;
            }
            let key = window.join("\n");
            match seen.get(&key) {
                // Overlapping spans are self-similarity, not duplication.
                Some(&first) if first + MIN_DUPLICATE_LINES <= i => {
                    let mut len = MIN_DUPLICATE_LINES;
                    while i + len < n
                        && first + len < i
                        && !normalized[i + len].is_empty()
                        && normalized[first + len] == normalized[i + len]
                    {
                        len += 1;
                    }

                    let end_line = i + len - 1;
                    let mut metadata = HashMap::new();
                    metadata.insert("span_lines".to_string(), len.to_string());
                    metadata.insert("duplicate_of_start".to_string(), first.to_string());
                    metadata.insert(
                        "duplicate_of_end".to_string(),
                        (first + len - 1).to_string(),
                    );

                    occurrences.push(PatternOccurrence {
                        id: PatternOccurrence::identity(
                            PatternKind::DuplicatedCode,
                            ctx.file,
                            i,
                            0,
                        ),
                        kind: PatternKind::DuplicatedCode,
                        file: ctx.file.to_string(),
                        range: SourceRange::new(i, 0, end_line, raw_lines[end_line].len()),
                        severity: if len >= HIGH_SEVERITY_LINES {
                            Severity::High
                        } else {
                            Severity::Medium
                        },
                        metadata,
                    });

                    // Resume past the reported span so one duplicated region
                    // yields one occurrence, not one per window position.
                    i += len;
                    continue;
                }
                Some(_) => {}
                None => {
                    seen.insert(key, i);
                }
            }
            i += 1;
        }
        occurrences
    }
}

/// Trim and collapse internal whitespace runs to a single space.
fn normalize_line(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}
