use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Parsed tables keyed by the file path they were read from.
///
/// An entry is populated on the first successful load and then served as-is
/// until it is explicitly invalidated; changes on disk are not noticed.
/// Failed loads are not stored, so the next lookup tries the file again.
#[derive(Debug)]
pub struct TableCache<T> {
    entries: Mutex<HashMap<PathBuf, Arc<T>>>,
}

impl<T> Default for TableCache<T> {
    fn default() -> Self {
        TableCache {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> TableCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached table for `path`, running `load` only on a miss.
    pub fn get_or_load<E, F>(&self, path: &Path, load: F) -> Result<Arc<T>, E>
    where
        F: FnOnce(&Path) -> Result<T, E>,
    {
        if let Some(hit) = self.lock().get(path) {
            tracing::debug!("table cache hit for {:?}", path);
            return Ok(Arc::clone(hit));
        }

        tracing::debug!("table cache miss for {:?}", path);
        let table = Arc::new(load(path)?);
        self.lock().insert(path.to_path_buf(), Arc::clone(&table));
        Ok(table)
    }

    pub fn get(&self, path: &Path) -> Option<Arc<T>> {
        self.lock().get(path).cloned()
    }

    /// Forget `path`; returns whether an entry was present.
    pub fn invalidate(&self, path: &Path) -> bool {
        self.lock().remove(path).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave a half-written entry.
    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<T>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn loads_once_per_path() {
        let cache: TableCache<String> = TableCache::new();
        let calls = Cell::new(0);
        let load = |p: &Path| -> Result<String, ()> {
            calls.set(calls.get() + 1);
            Ok(p.display().to_string())
        };

        let a = cache.get_or_load(Path::new("zones.csv"), load).unwrap();
        let b = cache.get_or_load(Path::new("zones.csv"), load).unwrap();
        let c = cache.get_or_load(Path::new("houses.csv"), load).unwrap();

        assert_eq!(calls.get(), 2);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(*c, "houses.csv");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn invalidate_forces_a_reload() {
        let cache: TableCache<u32> = TableCache::new();
        let path = Path::new("zones.csv");
        cache.get_or_load(path, |_| Ok::<_, ()>(1)).unwrap();

        assert!(cache.invalidate(path));
        assert!(!cache.invalidate(path));
        let reloaded = cache.get_or_load(path, |_| Ok::<_, ()>(2)).unwrap();
        assert_eq!(*reloaded, 2);
    }

    #[test]
    fn failures_are_not_cached() {
        let cache: TableCache<u32> = TableCache::new();
        let path = Path::new("missing.csv");
        assert_eq!(cache.get_or_load(path, |_| Err::<u32, _>("nope")), Err("nope"));
        assert!(cache.get(path).is_none());
        assert_eq!(*cache.get_or_load(path, |_| Ok::<_, &str>(3)).unwrap(), 3);
    }

    #[test]
    fn clear_drops_everything() {
        let cache: TableCache<u32> = TableCache::new();
        cache.get_or_load(Path::new("a"), |_| Ok::<_, ()>(1)).unwrap();
        cache.get_or_load(Path::new("b"), |_| Ok::<_, ()>(2)).unwrap();
        cache.clear();
        assert!(cache.is_empty());
    }
}
