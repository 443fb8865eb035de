use std::collections::HashMap;

use super::{walk_tree, DetectContext, PatternQuery};
use crate::config::Mode;
use crate::models::{PatternKind, PatternOccurrence, Severity, SourceRange};

/// Conventional literals that gentle mode leaves alone.
const GENTLE_SKIP: &[&str] = &["-1", "0", "1", "2", "0.0", "1.0"];

/// Flags numeric literals outside declaration context: anything that is not
/// the directly assigned value of a variable/constant declaration or enum
/// member, looked through a single unary sign.
pub struct MagicNumberQuery;

impl PatternQuery for MagicNumberQuery {
    fn kind(&self) -> PatternKind {
        PatternKind::MagicNumber
    }

    fn run(&self, ctx: &DetectContext<'_>) -> Vec<PatternOccurrence> {
        let source = ctx.source.as_bytes();
        let mut literals = Vec::new();
        walk_tree(ctx.root, &mut |node| {
            if ctx.lang.is_number_literal(&node) {
                literals.push(node);
            }
        });

        let mut occurrences = Vec::new();
        for node in literals {
            // `const X = -42` wraps the literal in a unary node; the
            // declaration sits one level further up.
            let mut context_node = node;
            if let Some(parent) = node.parent() {
                if ctx.lang.is_unary_wrapper(&parent) {
                    context_node = parent;
                }
            }
            let in_declaration = context_node
                .parent()
                .map(|p| ctx.lang.is_declaration_value_parent(&p))
                .unwrap_or(false);
            if in_declaration {
                continue;
            }

            let value = context_node.utf8_text(source).unwrap_or_default();
            if ctx.settings.mode == Mode::Gentle && GENTLE_SKIP.contains(&value) {
                continue;
            }

            let mut metadata = HashMap::new();
            metadata.insert("value".to_string(), value.to_string());

            occurrences.push(PatternOccurrence {
                id: PatternOccurrence::identity(
                    PatternKind::MagicNumber,
                    ctx.file,
                    node.start_position().row,
                    node.start_position().column,
                ),
                kind: PatternKind::MagicNumber,
                file: ctx.file.to_string(),
                range: SourceRange::new(
                    node.start_position().row,
                    node.start_position().column,
                    node.end_position().row,
                    node.end_position().column,
                ),
                severity: Severity::Low,
                metadata,
            });
        }
        occurrences
    }
}
