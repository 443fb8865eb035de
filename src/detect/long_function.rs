use std::collections::HashMap;

use super::{walk_tree, DetectContext, PatternQuery};
use crate::models::{PatternKind, PatternOccurrence, Severity, SourceRange};

/// Flags function bodies with strictly more than the configured number of
/// logical lines (default 50). A logical line is a body line that is
/// non-blank and not a pure comment line.
pub struct LongFunctionQuery;

impl PatternQuery for LongFunctionQuery {
    fn kind(&self) -> PatternKind {
        PatternKind::LongFunction
    }

    fn run(&self, ctx: &DetectContext<'_>) -> Vec<PatternOccurrence> {
        let lines: Vec<&str> = ctx.source.lines().collect();
        let threshold = ctx.settings.min_function_lines;
        let mut functions = Vec::new();
        walk_tree(ctx.root, &mut |node| {
            if ctx.lang.is_function_node(&node) {
                functions.push(node);
            }
        });

        let mut occurrences = Vec::new();
        for node in functions {
            let Some(body) = node.child_by_field_name("body") else {
                continue;
            };
            let start = body.start_position().row;
            if start >= lines.len() {
                continue;
            }
            let end = body.end_position().row.min(lines.len() - 1);
            let logical = lines[start..=end]
                .iter()
                .filter(|line| is_logical_line(line, ctx.lang.comment_prefixes()))
                .count();
            if logical <= threshold {
                continue;
            }

            let name = ctx
                .lang
                .function_name(&node, ctx.source.as_bytes())
                .unwrap_or_else(|| "<anonymous>".to_string());
            let severity = if logical > threshold * 2 {
                Severity::High
            } else {
                Severity::Medium
            };
            let mut metadata = HashMap::new();
            metadata.insert("function".to_string(), name);
            metadata.insert("logical_lines".to_string(), logical.to_string());
            metadata.insert("threshold".to_string(), threshold.to_string());

            occurrences.push(PatternOccurrence {
                id: PatternOccurrence::identity(
                    PatternKind::LongFunction,
                    ctx.file,
                    node.start_position().row,
                    node.start_position().column,
                ),
                kind: PatternKind::LongFunction,
                file: ctx.file.to_string(),
                range: SourceRange::new(
                    node.start_position().row,
                    node.start_position().column,
                    node.end_position().row,
                    node.end_position().column,
                ),
                severity,
                metadata,
            });
        }
        occurrences
    }
}

fn is_logical_line(line: &str, comment_prefixes: &[&str]) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return false;
    }
    !comment_prefixes.iter().any(|p| trimmed.starts_with(p))
}
