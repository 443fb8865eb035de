use std::collections::HashMap;

use super::{walk_tree, DetectContext, PatternQuery};
use crate::language::LanguageImpl;
use crate::models::{PatternKind, PatternOccurrence, Severity, SourceRange};
use tree_sitter::Node;

/// Flags every loop that syntactically contains another loop, anchored at
/// the outer loop. A triple nest therefore yields two occurrences: one for
/// the outermost loop and one for the middle one.
pub struct NestedLoopQuery;

impl PatternQuery for NestedLoopQuery {
    fn kind(&self) -> PatternKind {
        PatternKind::NestedLoop
    }

    fn run(&self, ctx: &DetectContext<'_>) -> Vec<PatternOccurrence> {
        let mut loops = Vec::new();
        walk_tree(ctx.root, &mut |node| {
            if ctx.lang.is_loop_node(&node) {
                loops.push(node);
            }
        });

        let mut occurrences = Vec::new();
        for node in loops {
            let depth = nesting_depth(node, ctx.lang);
            if depth < 2 {
                continue;
            }

            let mut metadata = HashMap::new();
            metadata.insert("nesting_depth".to_string(), depth.to_string());

            occurrences.push(PatternOccurrence {
                id: PatternOccurrence::identity(
                    PatternKind::NestedLoop,
                    ctx.file,
                    node.start_position().row,
                    node.start_position().column,
                ),
                kind: PatternKind::NestedLoop,
                file: ctx.file.to_string(),
                range: SourceRange::new(
                    node.start_position().row,
                    node.start_position().column,
                    node.end_position().row,
                    node.end_position().column,
                ),
                severity: if depth >= 3 {
                    Severity::High
                } else {
                    Severity::Medium
                },
                metadata,
            });
        }
        occurrences
    }
}

/// Depth of the deepest loop chain rooted at `node` (1 = no inner loops).
fn nesting_depth(node: Node<'_>, lang: &dyn LanguageImpl) -> usize {
    let mut deepest_inner = 0;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.is_error() || child.is_missing() {
            continue;
        }
        let inner = if lang.is_loop_node(&child) {
            nesting_depth(child, lang)
        } else {
            deepest_loop_below(child, lang)
        };
        deepest_inner = deepest_inner.max(inner);
    }
    1 + deepest_inner
}

fn deepest_loop_below(node: Node<'_>, lang: &dyn LanguageImpl) -> usize {
    let mut deepest = 0;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.is_error() || child.is_missing() {
            continue;
        }
        let found = if lang.is_loop_node(&child) {
            nesting_depth(child, lang)
        } else {
            deepest_loop_below(child, lang)
        };
        deepest = deepest.max(found);
    }
    deepest
}
