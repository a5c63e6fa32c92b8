//! Memoized file-backed values

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use log::debug;

use crate::Result;

struct CacheEntry<T> {
    modified: Vec<Option<SystemTime>>,
    value: T,
}

/// A value loaded from a file on first access and reloaded when the
/// modification time of the file or any companion file changes
pub struct FileCache<T> {
    path: PathBuf,
    companions: Vec<PathBuf>,
    entry: Option<CacheEntry<T>>,
}

impl<T> FileCache<T> {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        FileCache {
            path: path.into(),
            companions: Vec::new(),
            entry: None,
        }
    }

    /// Also reload when `path` changes (e.g. a sidecar read by the loader)
    pub fn with_companion<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.companions.push(path.into());
        self
    }

    fn modified_times(&self) -> Vec<Option<SystemTime>> {
        std::iter::once(&self.path)
            .chain(self.companions.iter())
            .map(|p| std::fs::metadata(p).and_then(|m| m.modified()).ok())
            .collect()
    }

    pub fn is_loaded(&self) -> bool {
        self.entry.is_some()
    }

    /// Drop the cached value; the next access reloads
    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// Cached value, calling `load` when empty or stale
    ///
    /// A file without a readable mtime is never considered fresh.
    pub fn get_or_load<F>(&mut self, load: F) -> Result<&T>
    where
        F: FnOnce(&Path) -> Result<T>,
    {
        let modified = self.modified_times();
        let fresh = matches!(
            &self.entry,
            Some(entry) if entry.modified.iter().all(Option::is_some) && entry.modified == modified
        );

        let entry = match self.entry.take() {
            Some(entry) if fresh => entry,
            _ => {
                debug!("Loading {}", self.path.display());
                CacheEntry {
                    modified,
                    value: load(&self.path)?,
                }
            }
        };
        Ok(&self.entry.insert(entry).value)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::time::Duration;

    use super::*;
    use crate::PredictorError;

    fn read(path: &Path) -> Result<String> {
        Ok(std::fs::read_to_string(path)?)
    }

    #[test]
    fn test_loads_once_until_file_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("value.txt");
        std::fs::write(&path, "one").unwrap();

        let loads = Cell::new(0);
        let counting = |p: &Path| {
            loads.set(loads.get() + 1);
            read(p)
        };

        let mut cache = FileCache::new(&path);
        assert!(!cache.is_loaded());
        assert_eq!(cache.get_or_load(counting).unwrap(), "one");
        assert_eq!(cache.get_or_load(counting).unwrap(), "one");
        assert_eq!(loads.get(), 1);

        // Push the mtime forward explicitly so coarse filesystem clocks still differ
        std::fs::write(&path, "two").unwrap();
        let file = std::fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(5)).unwrap();

        assert_eq!(cache.get_or_load(counting).unwrap(), "two");
        assert_eq!(loads.get(), 2);
    }

    #[test]
    fn test_companion_change_forces_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.mpk");
        let sidecar = dir.path().join("model.json");
        std::fs::write(&path, "weights").unwrap();
        std::fs::write(&sidecar, "scaler-1").unwrap();

        let load = |p: &Path| -> Result<String> {
            let weights = read(p)?;
            let meta = read(&p.with_extension("json"))?;
            Ok(format!("{weights}+{meta}"))
        };

        let mut cache = FileCache::new(&path).with_companion(&sidecar);
        assert_eq!(cache.get_or_load(load).unwrap(), "weights+scaler-1");

        // Only the sidecar changes
        std::fs::write(&sidecar, "scaler-2").unwrap();
        let file = std::fs::File::options().write(true).open(&sidecar).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(5)).unwrap();

        assert_eq!(cache.get_or_load(load).unwrap(), "weights+scaler-2");
    }

    #[test]
    fn test_invalidate_forces_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("value.txt");
        std::fs::write(&path, "one").unwrap();

        let mut cache = FileCache::new(&path);
        cache.get_or_load(read).unwrap();
        cache.invalidate();
        assert!(!cache.is_loaded());
        assert_eq!(cache.get_or_load(read).unwrap(), "one");
    }

    #[test]
    fn test_missing_file_propagates_loader_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache: FileCache<String> = FileCache::new(dir.path().join("absent"));
        let err = cache.get_or_load(|_| Err(PredictorError::NoModel)).unwrap_err();
        assert!(matches!(err, PredictorError::NoModel));
        assert!(!cache.is_loaded());
    }
}
