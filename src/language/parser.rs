use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, warn};
use tree_sitter::{InputEdit, Node, Parser as TSParser, Point, Tree};

use crate::buffer::SourceRevision;
use crate::language::factory::get_language_impl;
use crate::language::tree_cache;
use crate::models::Language;

lazy_static::lazy_static! {
    /// A thread-safe pool of tree-sitter parsers keyed by language.
    ///
    /// Configuring a parser with a grammar is not free; parsers are checked
    /// out for one parse and returned instead of being rebuilt per call.
    static ref PARSER_POOL: Mutex<HashMap<Language, Vec<TSParser>>> = Mutex::new(HashMap::new());
}

const MAX_POOLED_PARSERS_PER_LANGUAGE: usize = 4;

fn get_pooled_parser(language: Language) -> Option<TSParser> {
    {
        let mut pool = PARSER_POOL
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(parsers) = pool.get_mut(&language) {
            if let Some(parser) = parsers.pop() {
                return Some(parser);
            }
        }
    }

    let ts_language = get_language_impl(language).get_tree_sitter_language();
    let mut parser = TSParser::new();
    match parser.set_language(&ts_language) {
        Ok(()) => Some(parser),
        Err(e) => {
            warn!(language = language.as_str(), error = %e, "failed to configure parser");
            None
        }
    }
}

fn return_pooled_parser(language: Language, mut parser: TSParser) {
    parser.reset();
    let mut pool = PARSER_POOL
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let parsers = pool.entry(language).or_default();
    if parsers.len() < MAX_POOLED_PARSERS_PER_LANGUAGE {
        parsers.push(parser);
    }
}

/// Parse result for one revision.
///
/// Never represents a failure: malformed input parses into a tree with
/// localized error nodes, and an unsupported language yields a "limited
/// support" tree with an empty pattern surface.
pub struct SyntaxTree {
    tree: Option<Tree>,
    text: String,
    language: Option<Language>,
}

impl SyntaxTree {
    /// Tree for a language the engine cannot parse. Detection over it finds
    /// nothing, by design of the limited-support path.
    pub fn limited(text: String) -> Self {
        SyntaxTree {
            tree: None,
            text,
            language: None,
        }
    }

    pub fn root(&self) -> Option<Node<'_>> {
        self.tree.as_ref().map(|t| t.root_node())
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn language(&self) -> Option<Language> {
        self.language
    }

    /// Whether this is a limited-support tree (unsupported language or an
    /// unrecoverable parse, both of which surface as "no patterns").
    pub fn is_limited(&self) -> bool {
        self.tree.is_none()
    }

    /// Whether any part of the source failed to parse. Detection still runs
    /// over the rest of the tree.
    pub fn has_errors(&self) -> bool {
        self.tree
            .as_ref()
            .map(|t| t.root_node().has_error())
            .unwrap_or(false)
    }
}

/// Parse a revision, reusing the previous tree for the file when possible.
///
/// Reuse levels, in order:
/// 1. identical content (hash match) — the cached tree is returned as-is;
/// 2. known byte edits against the cached text — the old tree is edited and
///    re-parsed incrementally, sharing unchanged subtrees;
/// 3. otherwise a full parse.
///
/// The resulting tree replaces the cached one for the file.
pub fn parse(revision: &SourceRevision, language: Option<Language>) -> SyntaxTree {
    let Some(language) = language else {
        debug!(file = %revision.file, "unsupported language, limited support tree");
        return SyntaxTree::limited(revision.text.clone());
    };

    let content_hash = tree_cache::compute_content_hash(&revision.text);
    if let Some(cached) = tree_cache::lookup_exact(&revision.file, content_hash) {
        return SyntaxTree {
            tree: Some(cached.tree),
            text: revision.text.clone(),
            language: Some(language),
        };
    }

    let Some(mut parser) = get_pooled_parser(language) else {
        return SyntaxTree::limited(revision.text.clone());
    };

    let old_tree = incremental_base(revision);
    let parsed = parser.parse(&revision.text, old_tree.as_ref());
    let parsed = match parsed {
        Some(tree) => Some(tree),
        // An edited base can in principle leave the parser in a state it
        // refuses; retry once from scratch before giving up.
        None => parser.parse(&revision.text, None),
    };
    return_pooled_parser(language, parser);

    match parsed {
        Some(tree) => {
            tree_cache::store(
                &revision.file,
                tree.clone(),
                content_hash,
                revision.text.clone(),
            );
            SyntaxTree {
                tree: Some(tree),
                text: revision.text.clone(),
                language: Some(language),
            }
        }
        None => {
            warn!(file = %revision.file, "parser returned no tree");
            tree_cache::invalidate(&revision.file);
            SyntaxTree::limited(revision.text.clone())
        }
    }
}

/// Build the edited old tree for an incremental parse, when the cached text
/// matches what the revision's edits were computed against.
fn incremental_base(revision: &SourceRevision) -> Option<Tree> {
    if revision.edits.is_empty() {
        return None;
    }
    let cached = tree_cache::lookup(&revision.file)?;

    let mut tree = cached.tree;
    for edit in &revision.edits {
        tree.edit(&InputEdit {
            start_byte: edit.start_byte,
            old_end_byte: edit.old_end_byte,
            new_end_byte: edit.new_end_byte,
            start_position: Point {
                row: edit.start_position.line,
                column: edit.start_position.column,
            },
            old_end_position: Point {
                row: edit.old_end_position.line,
                column: edit.old_end_position.column,
            },
            new_end_position: Point {
                row: edit.new_end_position.line,
                column: edit.new_end_position.column,
            },
        });
    }
    Some(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferTracker;
    use serial_test::serial;

    fn revision_for(file: &str, text: &str) -> SourceRevision {
        let tracker = BufferTracker::new();
        tracker.record_edit(file, text, None)
    }

    #[test]
    #[serial]
    fn malformed_input_still_yields_a_tree() {
        let rev = revision_for("broken.ts", "function ((((\nlet x = ;\n");
        let tree = parse(&rev, Some(Language::TypeScript));
        assert!(!tree.is_limited());
        assert!(tree.has_errors());

        // The parser stays usable after malformed input.
        let rev2 = revision_for("ok.ts", "const x = 1;\n");
        let tree2 = parse(&rev2, Some(Language::TypeScript));
        assert!(!tree2.is_limited());
        assert!(!tree2.has_errors());
    }

    #[test]
    #[serial]
    fn unsupported_language_is_limited_not_an_error() {
        let rev = revision_for("main.cob", "IDENTIFICATION DIVISION.\n");
        let tree = parse(&rev, None);
        assert!(tree.is_limited());
        assert!(tree.root().is_none());
    }

    #[test]
    #[serial]
    fn identical_content_hits_the_tree_cache() {
        tree_cache::clear();
        let tracker = BufferTracker::new();
        let r1 = tracker.record_edit("hit.py", "x = 1\n", None);
        parse(&r1, Some(Language::Python));
        let before = tree_cache::cache_hit_count();
        let r2 = tracker.record_edit("hit.py", "x = 1\n", None);
        parse(&r2, Some(Language::Python));
        assert_eq!(tree_cache::cache_hit_count(), before + 1);
    }

    #[test]
    #[serial]
    fn incremental_reparse_tracks_the_edit() {
        tree_cache::clear();
        let tracker = BufferTracker::new();
        let r1 = tracker.record_edit("inc.js", "const a = 1;\nconst b = 2;\n", None);
        let t1 = parse(&r1, Some(Language::JavaScript));
        assert!(!t1.has_errors());

        let r2 = tracker.record_edit("inc.js", "const a = 1;\nconst b = 999;\n", None);
        assert!(!r2.edits.is_empty());
        let t2 = parse(&r2, Some(Language::JavaScript));
        assert!(!t2.has_errors());
        assert_eq!(t2.text(), "const a = 1;\nconst b = 999;\n");
    }
}
