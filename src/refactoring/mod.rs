pub mod store;

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error};

use crate::changeset::{ChangeSet, ChangeSetError};
use crate::parse::ast::{NodeId, TokenIdx};
use crate::parse::{Document, HEADER_EXTENSIONS, SOURCE_EXTENSIONS};

pub use store::{DocumentStore, FsStore, MemoryStore, OverlayStore};

#[derive(Debug, Error)]
pub enum RefactoringError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}: invalid change set: {source}", path.display())]
    InvalidChangeSet {
        path: PathBuf,
        #[source]
        source: ChangeSetError,
    },
    #[error("{}: a change set was already applied in this operation", path.display())]
    AlreadyApplied { path: PathBuf },
}

/// One file's text and tree during a single operation.
///
/// Offsets are always answered from the text the tree was parsed from. The
/// file accepts one change set; applying it writes the new text through the
/// store and retires the instance.
#[derive(Debug)]
pub struct RefactoringFile {
    document: Arc<Document>,
    change_set: Option<ChangeSet>,
    new_text: Option<String>,
}

impl RefactoringFile {
    pub fn new(document: Arc<Document>) -> Self {
        Self {
            document,
            change_set: None,
            new_text: None,
        }
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    pub fn path(&self) -> &Path {
        self.document.path()
    }

    pub fn text(&self) -> &str {
        self.document.text()
    }

    pub fn start_of(&self, node: NodeId) -> usize {
        self.document.start_of(node)
    }

    pub fn end_of(&self, node: NodeId) -> usize {
        self.document.end_of(node)
    }

    pub fn start_of_token(&self, token: TokenIdx) -> usize {
        self.document.start_of_token(token)
    }

    pub fn end_of_token(&self, token: TokenIdx) -> usize {
        self.document.end_of_token(token)
    }

    pub fn text_of(&self, node: NodeId) -> &str {
        self.document.text_of(node)
    }

    pub fn text_of_range(&self, start: usize, end: usize) -> &str {
        self.document.text_of_range(start, end)
    }

    pub fn is_applied(&self) -> bool {
        self.new_text.is_some()
    }

    /// Text written by [`RefactoringFile::apply`], if it ran.
    pub fn new_text(&self) -> Option<&str> {
        self.new_text.as_deref()
    }

    pub fn set_change_set(&mut self, change_set: ChangeSet) {
        self.change_set = Some(change_set);
    }

    /// Apply the pending change set and persist the result.
    ///
    /// Nothing is written when the change set is malformed or the write
    /// fails; the file can then still be inspected but not re-applied.
    pub fn apply(&mut self, store: &dyn DocumentStore) -> Result<(), RefactoringError> {
        if self.is_applied() {
            return Err(RefactoringError::AlreadyApplied {
                path: self.path().to_path_buf(),
            });
        }
        let change_set = self.change_set.take().unwrap_or_default();
        let new_text = change_set.apply(self.text()).map_err(|source| {
            error!(path = %self.path().display(), %source, "refusing change set");
            RefactoringError::InvalidChangeSet {
                path: self.path().to_path_buf(),
                source,
            }
        })?;
        if change_set.is_empty() {
            self.new_text = Some(new_text);
            return Ok(());
        }
        store
            .write(self.path(), &new_text)
            .map_err(|source| RefactoringError::Write {
                path: self.path().to_path_buf(),
                source,
            })?;
        debug!(
            path = %self.path().display(),
            edits = change_set.len(),
            "applied change set"
        );
        self.new_text = Some(new_text);
        Ok(())
    }
}

/// Path-keyed set of [`RefactoringFile`]s scoped to one operation.
///
/// A path is read and parsed at most once; every later request for it gets
/// the same instance.
pub struct RefactoringChanges<'s> {
    store: &'s dyn DocumentStore,
    files: HashMap<PathBuf, RefactoringFile>,
    /// Paths in the order they were applied.
    applied: Vec<PathBuf>,
}

impl<'s> RefactoringChanges<'s> {
    pub fn new(store: &'s dyn DocumentStore) -> Self {
        Self {
            store,
            files: HashMap::new(),
            applied: Vec::new(),
        }
    }

    pub fn store(&self) -> &'s dyn DocumentStore {
        self.store
    }

    /// Register an already parsed document, typically the one a candidate
    /// was matched against.
    pub fn seed(&mut self, document: Arc<Document>) {
        self.files
            .entry(document.path().to_path_buf())
            .or_insert_with(|| RefactoringFile::new(document));
    }

    pub fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.store.exists(path)
    }

    pub fn file(&mut self, path: &Path) -> Result<&mut RefactoringFile, RefactoringError> {
        let store = self.store;
        match self.files.entry(path.to_path_buf()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let text = store.read(path).map_err(|source| RefactoringError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                let document = Arc::new(Document::parse(path, text));
                Ok(entry.insert(RefactoringFile::new(document)))
            }
        }
    }

    /// The parsed document for `path`, reading it on first use.
    pub fn document(&mut self, path: &Path) -> Result<Arc<Document>, RefactoringError> {
        Ok(self.file(path)?.document().clone())
    }

    /// Attach `change_set` to the file for `path` and apply it.
    pub fn apply(&mut self, path: &Path, change_set: ChangeSet) -> Result<(), RefactoringError> {
        let store = self.store;
        let file = self.file(path)?;
        file.set_change_set(change_set);
        file.apply(store)?;
        self.applied.push(path.to_path_buf());
        Ok(())
    }

    /// Every applied file with its new text, in application order.
    pub fn written(&self) -> Vec<(PathBuf, String)> {
        self.applied
            .iter()
            .filter_map(|p| {
                let file = self.files.get(p)?;
                let text = file.new_text()?;
                (text != file.text()).then(|| (p.clone(), text.to_string()))
            })
            .collect()
    }
}

/// The header for a source file or the source for a header: same stem,
/// first extension of the other kind that exists.
pub fn corresponding_file(path: &Path, exists: impl Fn(&Path) -> bool) -> Option<PathBuf> {
    let ext = path.extension()?.to_str()?;
    let candidates = if SOURCE_EXTENSIONS.contains(&ext) {
        HEADER_EXTENSIONS
    } else if HEADER_EXTENSIONS.contains(&ext) {
        SOURCE_EXTENSIONS
    } else {
        return None;
    };
    candidates
        .iter()
        .map(|other| path.with_extension(other))
        .find(|candidate| exists(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_writes_through_store() {
        let store = MemoryStore::with_file("a.cpp", "int a, b;");
        let mut changes = RefactoringChanges::new(&store);
        let mut cs = ChangeSet::new();
        cs.replace(4, 5, "x");
        changes.apply(Path::new("a.cpp"), cs).unwrap();
        assert_eq!(store.get(Path::new("a.cpp")).as_deref(), Some("int x, b;"));
        assert_eq!(
            changes.written(),
            vec![(PathBuf::from("a.cpp"), "int x, b;".to_string())]
        );
    }

    #[test]
    fn same_path_yields_same_instance() {
        let store = MemoryStore::with_file("a.cpp", "int a;");
        let mut changes = RefactoringChanges::new(&store);
        let first = changes.document(Path::new("a.cpp")).unwrap();
        store.insert("a.cpp", "int changed;");
        let second = changes.document(Path::new("a.cpp")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.text(), "int a;");
    }

    #[test]
    fn second_apply_is_refused() {
        let store = MemoryStore::with_file("a.cpp", "int a;");
        let mut changes = RefactoringChanges::new(&store);
        let mut cs = ChangeSet::new();
        cs.insert(0, "static ");
        changes.apply(Path::new("a.cpp"), cs.clone()).unwrap();
        let err = changes.apply(Path::new("a.cpp"), cs).unwrap_err();
        assert!(matches!(err, RefactoringError::AlreadyApplied { .. }));
        assert_eq!(store.get(Path::new("a.cpp")).as_deref(), Some("static int a;"));
    }

    #[test]
    fn invalid_change_set_changes_nothing() {
        let store = MemoryStore::with_file("a.cpp", "int a;");
        let mut changes = RefactoringChanges::new(&store);
        let mut cs = ChangeSet::new();
        cs.remove(0, 4).remove(2, 5);
        let err = changes.apply(Path::new("a.cpp"), cs).unwrap_err();
        assert!(matches!(err, RefactoringError::InvalidChangeSet { .. }));
        assert_eq!(store.get(Path::new("a.cpp")).as_deref(), Some("int a;"));
        assert!(changes.written().is_empty());
    }

    #[test]
    fn write_failure_is_reported() {
        let store = MemoryStore::with_file("a.h", "void f();");
        store.fail_writes_to("a.h");
        let mut changes = RefactoringChanges::new(&store);
        let mut cs = ChangeSet::new();
        cs.insert(0, "// doc\n");
        let err = changes.apply(Path::new("a.h"), cs).unwrap_err();
        assert!(matches!(err, RefactoringError::Write { .. }));
        assert!(err.to_string().contains("a.h"));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let store = MemoryStore::new();
        let mut changes = RefactoringChanges::new(&store);
        assert!(matches!(
            changes.file(Path::new("nope.cpp")),
            Err(RefactoringError::Read { .. })
        ));
    }

    #[test]
    fn header_source_pairing() {
        let exists = |p: &Path| p == Path::new("src/foo.hpp") || p == Path::new("src/bar.cc");
        assert_eq!(
            corresponding_file(Path::new("src/foo.cpp"), exists),
            Some(PathBuf::from("src/foo.hpp"))
        );
        assert_eq!(
            corresponding_file(Path::new("src/bar.h"), exists),
            Some(PathBuf::from("src/bar.cc"))
        );
        assert_eq!(corresponding_file(Path::new("src/baz.cpp"), exists), None);
        assert_eq!(corresponding_file(Path::new("README"), exists), None);
    }
}
