use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use tracing::trace;
use tree_sitter::Tree;

lazy_static::lazy_static! {
    /// Previous parse results keyed by file path.
    ///
    /// Each entry keeps the tree together with the exact text and content
    /// hash it was parsed from, so a new revision can either reuse the tree
    /// outright (hash match) or edit it and re-parse incrementally.
    static ref TREE_CACHE: Mutex<HashMap<String, CachedTree>> = Mutex::new(HashMap::new());

    /// A counter for cache hits, used for testing
    static ref CACHE_HITS: Mutex<usize> = Mutex::new(0);
}

/// A parse result retained for incremental reuse.
#[derive(Clone)]
pub struct CachedTree {
    pub tree: Tree,
    pub content_hash: u64,
    pub text: String,
}

/// Compute a hash of the content for cache validation
pub fn compute_content_hash(content: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

/// Look up the cached tree for a file, if any.
pub fn lookup(file: &str) -> Option<CachedTree> {
    let cache = TREE_CACHE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    cache.get(file).cloned()
}

/// Look up the cached tree only when the content is byte-identical, and
/// count it as a hit.
pub fn lookup_exact(file: &str, content_hash: u64) -> Option<CachedTree> {
    let cache = TREE_CACHE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    match cache.get(file) {
        Some(cached) if cached.content_hash == content_hash => {
            let mut hits = CACHE_HITS
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *hits += 1;
            trace!(file, "tree cache hit");
            Some(cached.clone())
        }
        _ => None,
    }
}

/// Store the latest tree for a file, replacing any previous entry.
pub fn store(file: &str, tree: Tree, content_hash: u64, text: String) {
    let mut cache = TREE_CACHE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    cache.insert(
        file.to_string(),
        CachedTree {
            tree,
            content_hash,
            text,
        },
    );
}

/// Remove a specific file from the tree cache
pub fn invalidate(file: &str) {
    let mut cache = TREE_CACHE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    cache.remove(file);
}

/// Clear the entire tree cache
#[allow(dead_code)]
pub fn clear() {
    let mut cache = TREE_CACHE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    cache.clear();

    let mut hits = CACHE_HITS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *hits = 0;
}

/// Get the current cache hit count (for testing)
#[allow(dead_code)]
pub fn cache_hit_count() -> usize {
    let hits = CACHE_HITS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *hits
}
