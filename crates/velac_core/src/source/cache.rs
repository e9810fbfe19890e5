//! File-level compilation cache. Each source file's unoptimized token stream is
//! hashed; if a later compilation sees the same file path with the same hash, the
//! front-end and middle-end stages are skipped for it. Deliberately file-level
//! only, not a persistent incremental-build graph: partial-invalidation across a
//! changed dependency is out of scope, so a cache hit for a file says nothing
//! about whether its dependencies also hit.

use std::cell::RefCell;
use std::collections::HashMap;

use sha2::{Digest, Sha256};

/// Hashes raw source text (or, in principle, the re-serialized token stream) into
/// a stable cache key. Hashing the text directly rather than requiring a fully
/// lexed token stream keeps `CacheManager` usable from `run_lexer` before a single
/// token has been produced.
pub fn compute_cache_key(source_text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_text.as_bytes());
    format!("{:x}", hasher.finalize())
}

struct CacheEntry {
    cache_key: String,
}

/// Owned by the [`super::global::GlobalResourceManager`] and consulted once per
/// source file, at the start of `run_lexer`.
pub struct CacheManager {
    entries: RefCell<HashMap<String, CacheEntry>>,
}

impl CacheManager {
    pub fn new() -> CacheManager {
        CacheManager { entries: RefCell::new(HashMap::new()) }
    }

    /// Returns true if `file_path` was cached before under the same `cache_key`,
    /// meaning this file's middle-end and back-end stages can be skipped.
    pub fn lookup_source_file(&self, file_path: &str, cache_key: &str) -> bool {
        self.entries.borrow().get(file_path).is_some_and(|entry| entry.cache_key == cache_key)
    }

    /// Records the current cache key for `file_path`, overwriting whatever was
    /// recorded for it before.
    pub fn cache_source_file(&self, file_path: &str, cache_key: &str) {
        self.entries.borrow_mut().insert(file_path.to_string(), CacheEntry { cache_key: cache_key.to_string() });
    }
}

impl Default for CacheManager {
    fn default() -> CacheManager {
        CacheManager::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_hashes_to_same_key() {
        assert_eq!(compute_cache_key("proc main() {}"), compute_cache_key("proc main() {}"));
    }

    #[test]
    fn different_text_hashes_to_different_key() {
        assert_ne!(compute_cache_key("proc main() {}"), compute_cache_key("proc main() { printf(\"hi\"); }"));
    }

    #[test]
    fn lookup_misses_until_cached_with_matching_key() {
        let manager = CacheManager::new();
        let key = compute_cache_key("struct Foo {}");
        assert!(!manager.lookup_source_file("foo.vl", &key));
        manager.cache_source_file("foo.vl", &key);
        assert!(manager.lookup_source_file("foo.vl", &key));
    }

    #[test]
    fn lookup_misses_when_key_changed() {
        let manager = CacheManager::new();
        manager.cache_source_file("foo.vl", &compute_cache_key("struct Foo {}"));
        assert!(!manager.lookup_source_file("foo.vl", &compute_cache_key("struct Foo { x: int; }")));
    }
}
