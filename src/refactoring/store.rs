use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Where refactorings read current text from and persist results to.
pub trait DocumentStore: Send + Sync {
    fn read(&self, path: &Path) -> io::Result<String>;

    fn write(&self, path: &Path, text: &str) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;
}

/// Documents on disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsStore;

impl DocumentStore for FsStore {
    fn read(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, text: &str) -> io::Result<()> {
        std::fs::write(path, text)
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// In-memory documents keyed by path.
///
/// Writes to a path registered with [`MemoryStore::fail_writes_to`] return
/// an error and leave the stored text unchanged.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: Mutex<HashMap<PathBuf, String>>,
    failing: Mutex<HashSet<PathBuf>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let store = Self::new();
        store.insert(path, text);
        store
    }

    pub fn insert(&self, path: impl Into<PathBuf>, text: impl Into<String>) {
        lock(&self.files).insert(path.into(), text.into());
    }

    pub fn get(&self, path: &Path) -> Option<String> {
        lock(&self.files).get(path).cloned()
    }

    pub fn fail_writes_to(&self, path: impl Into<PathBuf>) {
        lock(&self.failing).insert(path.into());
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = lock(&self.files).keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl DocumentStore for MemoryStore {
    fn read(&self, path: &Path) -> io::Result<String> {
        self.get(path).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no document {}", path.display()))
        })
    }

    fn write(&self, path: &Path, text: &str) -> io::Result<()> {
        if lock(&self.failing).contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("writes to {} are disabled", path.display()),
            ));
        }
        self.insert(path, text);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        lock(&self.files).contains_key(path)
    }
}

/// Reads through to another store; writes stay in memory. Used for dry runs.
pub struct OverlayStore<'a> {
    base: &'a dyn DocumentStore,
    overlay: MemoryStore,
}

impl<'a> OverlayStore<'a> {
    pub fn new(base: &'a dyn DocumentStore) -> Self {
        Self {
            base,
            overlay: MemoryStore::new(),
        }
    }

    /// Paths written so far with their new text.
    pub fn written(&self) -> Vec<(PathBuf, String)> {
        self.overlay
            .paths()
            .into_iter()
            .filter_map(|p| self.overlay.get(&p).map(|text| (p, text)))
            .collect()
    }
}

impl DocumentStore for OverlayStore<'_> {
    fn read(&self, path: &Path) -> io::Result<String> {
        match self.overlay.get(path) {
            Some(text) => Ok(text),
            None => self.base.read(path),
        }
    }

    fn write(&self, path: &Path, text: &str) -> io::Result<()> {
        self.overlay.write(path, text)
    }

    fn exists(&self, path: &Path) -> bool {
        self.overlay.exists(path) || self.base.exists(path)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
