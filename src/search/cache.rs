//! Search result cache: an in-process LRU in front of the persistent file store
use super::store::{FileStore, Stored, StoredKind};
use super::{CacheKey, SearchResult};
use crate::error::Result;
use log::{debug, warn};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::path::Path;

/// Search result cache shared by every session of a process
pub struct SearchCache {
    memory: Option<Mutex<LruCache<CacheKey, SearchResult>>>,
    store: Option<FileStore>,
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub memory_entries: usize,
    pub disk_entries: usize,
}

impl SearchCache {
    /// Create a cache persisting under `root`
    pub fn new(root: impl AsRef<Path>, memory_entries: usize, verbatim_key_limit: usize) -> Self {
        Self {
            memory: NonZeroUsize::new(memory_entries).map(|n| Mutex::new(LruCache::new(n))),
            store: Some(FileStore::new(root.as_ref(), verbatim_key_limit)),
        }
    }

    /// A cache that never hits and never writes
    pub fn disabled() -> Self {
        Self {
            memory: None,
            store: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub fn root(&self) -> Option<&Path> {
        self.store.as_ref().map(FileStore::root)
    }

    /// Look up a stored result. Unreadable entries count as misses.
    pub fn lookup(&self, key: &CacheKey) -> Option<SearchResult> {
        if let Some(memory) = &self.memory
            && let Some(hit) = memory.lock().get(key)
        {
            debug!("Memory cache hit for {key}");
            return Some(hit.clone());
        }

        let store = self.store.as_ref()?;
        match store.get(key, StoredKind::Table) {
            Ok(Some(Stored::Table(result))) => {
                debug!("Disk cache hit for {key}");
                if let Some(memory) = &self.memory {
                    memory.lock().put(key.clone(), result.clone());
                }
                Some(result)
            }
            Ok(_) => None,
            Err(e) => {
                warn!(
                    "Ignoring unreadable cache entry {}: {e}",
                    store.path_for(key, StoredKind::Table).display()
                );
                None
            }
        }
    }

    /// Persist a result. Storing the same key twice overwrites the entry.
    pub fn store(&self, key: &CacheKey, result: &SearchResult) -> Result<()> {
        if let Some(memory) = &self.memory {
            memory.lock().put(key.clone(), result.clone());
        }
        if let Some(store) = &self.store {
            let path = store.put(key, &Stored::Table(result.clone()))?;
            debug!("Stored {key} at {}", path.display());
        }
        Ok(())
    }

    /// Drop all entries of one catalog
    pub fn clear(&self, namespace: &str) -> Result<()> {
        if let Some(memory) = &self.memory {
            let mut memory = memory.lock();
            let stale: Vec<_> = memory
                .iter()
                .filter(|(key, _)| key.namespace == namespace)
                .map(|(key, _)| key.clone())
                .collect();
            for key in stale {
                memory.pop(&key);
            }
        }
        match &self.store {
            Some(store) => store.clear_namespace(namespace),
            None => Ok(()),
        }
    }

    /// Drop every entry
    pub fn clear_all(&self) -> Result<()> {
        if let Some(memory) = &self.memory {
            memory.lock().clear();
        }
        match &self.store {
            Some(store) => store.clear_all(),
            None => Ok(()),
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            memory_entries: self.memory.as_ref().map_or(0, |m| m.lock().len()),
            disk_entries: self.store.as_ref().map_or(0, FileStore::entry_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::search::FilterParams;
    use std::fs;
    use tempfile::TempDir;

    fn result(title: &str) -> SearchResult {
        SearchResult {
            catalog: Catalog::new(vec!["title".into()], vec![vec![title.into()]]).unwrap(),
            relevant_columns: vec!["title".into()],
        }
    }

    fn key(term: &str) -> CacheKey {
        CacheKey::new("ns", &[term], &FilterParams::default())
    }

    #[test]
    fn test_store_then_lookup_across_instances() {
        let dir = TempDir::new().unwrap();
        let first = SearchCache::new(dir.path(), 8, 64);
        first.store(&key("wages"), &result("Wages")).unwrap();

        let second = SearchCache::new(dir.path(), 8, 64);
        assert_eq!(second.lookup(&key("wages")), Some(result("Wages")));
        assert_eq!(second.stats().memory_entries, 1);
        assert_eq!(second.lookup(&key("rail")), None);
    }

    #[test]
    fn test_corrupted_entry_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = SearchCache::new(dir.path(), 0, 64);
        cache.store(&key("wages"), &result("Wages")).unwrap();

        let path = FileStore::new(dir.path(), 64).path_for(&key("wages"), StoredKind::Table);
        fs::write(path, b"garbage").unwrap();
        assert_eq!(cache.lookup(&key("wages")), None);
    }

    #[test]
    fn test_disabled_cache_never_hits() {
        let cache = SearchCache::disabled();
        cache.store(&key("wages"), &result("Wages")).unwrap();
        assert_eq!(cache.lookup(&key("wages")), None);
        assert!(!cache.is_enabled());
    }

    #[test]
    fn test_clear_namespace() {
        let dir = TempDir::new().unwrap();
        let cache = SearchCache::new(dir.path(), 8, 64);
        cache.store(&key("wages"), &result("Wages")).unwrap();
        cache.clear("ns").unwrap();
        assert_eq!(cache.lookup(&key("wages")), None);
        assert_eq!(
            cache.stats(),
            CacheStats {
                memory_entries: 0,
                disk_entries: 0
            }
        );
    }
}
