use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::changeset::ChangeSet;
use crate::parse::Document;
use crate::parse::revision::Revision;
use crate::refactoring::{DocumentStore, RefactoringChanges, RefactoringError, corresponding_file};
use crate::report::{FileChange, PerformReport};

use super::interaction::Interaction;
use super::interface::QuickFixInterface;

#[derive(Debug, Error)]
pub enum FixError {
    #[error(
        "{}: document changed since the fix was offered (revision {expected} at match time, {found} now)",
        path.display()
    )]
    Stale {
        path: PathBuf,
        expected: String,
        found: String,
    },
    #[error(transparent)]
    Refactoring(#[from] RefactoringError),
    #[error("operation cancelled")]
    Cancelled,
}

/// The deferred edit of one candidate.
pub trait Perform: Send + Sync {
    fn perform(&self, ctx: &mut PerformContext<'_>) -> Result<(), FixError>;
}

impl<F> Perform for F
where
    F: Fn(&mut PerformContext<'_>) -> Result<(), FixError> + Send + Sync,
{
    fn perform(&self, ctx: &mut PerformContext<'_>) -> Result<(), FixError> {
        self(ctx)
    }
}

/// Pins a closure to the [`Perform`] signature.
pub fn perform_fn<F>(f: F) -> F
where
    F: Fn(&mut PerformContext<'_>) -> Result<(), FixError> + Send + Sync,
{
    f
}

/// A matched, not yet performed quick fix.
///
/// Holds the document snapshot it was matched against so node handles
/// captured by the action stay meaningful until `perform`.
pub struct QuickFixOperation {
    fix_name: &'static str,
    description: String,
    priority: i32,
    origin: Arc<Document>,
    action: Box<dyn Perform>,
}

impl fmt::Debug for QuickFixOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuickFixOperation")
            .field("fix_name", &self.fix_name)
            .field("description", &self.description)
            .field("priority", &self.priority)
            .field("path", &self.origin.path())
            .field("revision", &self.origin.revision())
            .finish()
    }
}

impl QuickFixOperation {
    pub fn new(
        interface: &QuickFixInterface<'_>,
        fix_name: &'static str,
        priority: i32,
        description: impl Into<String>,
        action: impl Perform + 'static,
    ) -> Self {
        Self {
            fix_name,
            description: description.into(),
            priority,
            origin: interface.document_arc().clone(),
            action: Box::new(action),
        }
    }

    pub fn fix_name(&self) -> &'static str {
        self.fix_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn path(&self) -> &Path {
        self.origin.path()
    }

    pub fn revision(&self) -> Revision {
        self.origin.revision()
    }

    /// Run the operation against the current contents of `store`.
    ///
    /// Refuses with [`FixError::Stale`] when the origin file no longer has
    /// the revision the candidate was matched on. Files applied before a
    /// later failure stay written.
    pub fn perform(
        &self,
        store: &dyn DocumentStore,
        interaction: &dyn Interaction,
    ) -> Result<PerformReport, FixError> {
        let path = self.origin.path();
        let current = store.read(path).map_err(|source| RefactoringError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let found = Revision::of(&current);
        if found != self.origin.revision() {
            warn!(
                path = %path.display(),
                expected = %self.origin.revision().short(),
                found = %found.short(),
                "discarding stale candidate"
            );
            return Err(FixError::Stale {
                path: path.to_path_buf(),
                expected: self.origin.revision().short(),
                found: found.short(),
            });
        }

        let mut changes = RefactoringChanges::new(store);
        changes.seed(self.origin.clone());
        let mut ctx = PerformContext {
            changes,
            interaction,
            origin: self.origin.clone(),
            warnings: Vec::new(),
        };
        self.action.perform(&mut ctx)?;
        debug!(fix = self.fix_name, path = %path.display(), "performed");
        Ok(ctx.into_report(self))
    }
}

/// State handed to [`Perform::perform`]: the operation's file set and the
/// parameter-collection seam.
pub struct PerformContext<'a> {
    changes: RefactoringChanges<'a>,
    interaction: &'a dyn Interaction,
    origin: Arc<Document>,
    warnings: Vec<String>,
}

impl<'a> PerformContext<'a> {
    /// The snapshot the candidate was matched on.
    pub fn origin(&self) -> &Arc<Document> {
        &self.origin
    }

    pub fn interaction(&self) -> &'a dyn Interaction {
        self.interaction
    }

    pub fn document(&mut self, path: &Path) -> Result<Arc<Document>, FixError> {
        Ok(self.changes.document(path)?)
    }

    pub fn exists(&self, path: &Path) -> bool {
        self.changes.exists(path)
    }

    /// Paired header or source of `path`, if one exists.
    pub fn corresponding_file(&self, path: &Path) -> Option<PathBuf> {
        corresponding_file(path, |p| self.changes.exists(p))
    }

    pub fn apply(&mut self, path: &Path, change_set: ChangeSet) -> Result<(), FixError> {
        Ok(self.changes.apply(path, change_set)?)
    }

    pub fn apply_origin(&mut self, change_set: ChangeSet) -> Result<(), FixError> {
        let path = self.origin.path().to_path_buf();
        self.apply(&path, change_set)
    }

    /// Apply an edit whose failure must not undo or abort the primary one.
    pub fn apply_secondary(&mut self, path: &Path, change_set: ChangeSet) {
        if let Err(err) = self.changes.apply(path, change_set) {
            self.warn(format!("skipped edit: {err}"));
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{message}");
        self.warnings.push(message);
    }

    fn into_report(self, op: &QuickFixOperation) -> PerformReport {
        PerformReport {
            fix_name: op.fix_name.to_string(),
            description: op.description.clone(),
            dry_run: false,
            changes: self
                .changes
                .written()
                .into_iter()
                .map(|(path, text)| FileChange {
                    path: path.to_string_lossy().into_owned(),
                    text,
                })
                .collect(),
            warnings: self.warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fix::PresetInteraction;
    use crate::refactoring::MemoryStore;

    fn operation(store: &MemoryStore, text: &str, action: impl Perform + 'static) -> QuickFixOperation {
        store.insert("a.cpp", text);
        let doc = Arc::new(Document::parse("a.cpp", text));
        let iface = QuickFixInterface::new(&doc, 0, None, store);
        QuickFixOperation::new(&iface, "Test/Fake", 3, "Fake", action)
    }

    #[test]
    fn perform_applies_to_origin() {
        let store = MemoryStore::new();
        let op = operation(&store, "int a;", |ctx: &mut PerformContext<'_>| {
            let mut cs = ChangeSet::new();
            cs.insert(0, "static ");
            ctx.apply_origin(cs)
        });
        let report = op.perform(&store, &PresetInteraction::default()).unwrap();
        assert_eq!(report.files_written(), vec!["a.cpp"]);
        assert_eq!(store.get(Path::new("a.cpp")).as_deref(), Some("static int a;"));
    }

    #[test]
    fn stale_candidate_is_refused() {
        let store = MemoryStore::new();
        let op = operation(&store, "int a;", |ctx: &mut PerformContext<'_>| {
            ctx.apply_origin(ChangeSet::new())
        });
        store.insert("a.cpp", "int b;");
        let err = op.perform(&store, &PresetInteraction::default()).unwrap_err();
        assert!(matches!(err, FixError::Stale { .. }));
        assert_eq!(store.get(Path::new("a.cpp")).as_deref(), Some("int b;"));
    }

    #[test]
    fn secondary_failure_becomes_warning() {
        let store = MemoryStore::new();
        store.insert("a.h", "void f();");
        store.fail_writes_to("a.h");
        let op = operation(&store, "void f() {}", |ctx: &mut PerformContext<'_>| {
            let mut primary = ChangeSet::new();
            primary.insert(0, "// doc\n");
            ctx.apply_origin(primary)?;
            let mut secondary = ChangeSet::new();
            secondary.insert(0, "// doc\n");
            ctx.apply_secondary(Path::new("a.h"), secondary);
            Ok(())
        });
        let report = op.perform(&store, &PresetInteraction::default()).unwrap();
        assert_eq!(report.files_written(), vec!["a.cpp"]);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(store.get(Path::new("a.h")).as_deref(), Some("void f();"));
    }

    #[test]
    fn debug_shows_identity() {
        let store = MemoryStore::new();
        let op = operation(&store, "", |_: &mut PerformContext<'_>| Ok(()));
        let text = format!("{op:?}");
        assert!(text.contains("Test/Fake"));
        assert!(text.contains("a.cpp"));
    }
}
