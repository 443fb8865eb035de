//! Structural pattern queries over parsed trees.
//!
//! Each pattern kind is one side-effect-free query; queries know nothing
//! about each other, so new kinds are added by dropping in a module and
//! registering it in [`all_queries`].

pub mod duplicated_code;
pub mod long_function;
pub mod magic_number;
pub mod nested_loop;

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;
use tree_sitter::Node;

use crate::config::{EngineSettings, Mode};
use crate::language::{get_language_impl, LanguageImpl, SyntaxTree};
use crate::models::{Language, PatternKind, PatternOccurrence};

/// Everything a query needs to inspect one revision.
pub struct DetectContext<'a> {
    pub root: Node<'a>,
    pub source: &'a str,
    pub file: &'a str,
    pub language: Language,
    pub lang: &'a dyn LanguageImpl,
    pub settings: &'a EngineSettings,
}

/// One structural query, producing raw occurrences for a single kind.
pub trait PatternQuery: Sync {
    fn kind(&self) -> PatternKind;
    fn run(&self, ctx: &DetectContext<'_>) -> Vec<PatternOccurrence>;
}

static QUERIES: &[&(dyn PatternQuery)] = &[
    &long_function::LongFunctionQuery,
    &magic_number::MagicNumberQuery,
    &nested_loop::NestedLoopQuery,
    &duplicated_code::DuplicatedCodeQuery,
];

pub fn all_queries() -> &'static [&'static dyn PatternQuery] {
    QUERIES
}

/// Run every registered query over a tree.
///
/// Returns `None` when the job was canceled; cancellation is cooperative,
/// checked at the end of each query so a canceled pass never publishes a
/// partial result. A limited-support tree yields an empty list.
pub fn run_queries(
    tree: &SyntaxTree,
    file: &str,
    settings: &EngineSettings,
    cancel: &AtomicBool,
) -> Option<Vec<PatternOccurrence>> {
    let (Some(root), Some(language)) = (tree.root(), tree.language()) else {
        return Some(Vec::new());
    };
    let lang = get_language_impl(language);
    let ctx = DetectContext {
        root,
        source: tree.text(),
        file,
        language,
        lang: lang.as_ref(),
        settings,
    };

    let mut occurrences = Vec::new();
    for query in all_queries() {
        if cancel.load(Ordering::Relaxed) {
            debug!(file, "analysis canceled between detector queries");
            return None;
        }
        let mut found = query.run(&ctx);
        if settings.mode == Mode::Gentle {
            for occurrence in &mut found {
                occurrence.severity = occurrence.severity.downgraded();
            }
        }
        occurrences.extend(found);
    }
    if cancel.load(Ordering::Relaxed) {
        return None;
    }
    Some(occurrences)
}

/// Depth-first visit of every node outside erroneous subtrees.
///
/// An ERROR or missing node and everything under it is skipped; detection
/// still covers the rest of the tree (partial-result policy).
pub(crate) fn walk_tree<'a>(node: Node<'a>, visit: &mut dyn FnMut(Node<'a>)) {
    if node.is_error() || node.is_missing() {
        return;
    }
    visit(node);
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_tree(child, visit);
    }
}
