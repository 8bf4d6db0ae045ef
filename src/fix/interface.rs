use std::sync::Arc;

use crate::parse::Document;
use crate::parse::ast::{NodeId, NodeKind, TokenIdx};
use crate::refactoring::DocumentStore;
use crate::semantic::Semantic;

/// Read-only context for one match cycle: the document, the cursor and the
/// AST path from the root to the innermost node containing the cursor.
///
/// With a selection, the cursor is the selection start.
pub struct QuickFixInterface<'a> {
    document: &'a Arc<Document>,
    cursor: usize,
    selection: Option<(usize, usize)>,
    path: Vec<NodeId>,
    store: &'a dyn DocumentStore,
}

impl<'a> QuickFixInterface<'a> {
    pub fn new(
        document: &'a Arc<Document>,
        cursor: usize,
        selection: Option<(usize, usize)>,
        store: &'a dyn DocumentStore,
    ) -> Self {
        let selection = selection.map(|(a, b)| (a.min(b), a.max(b)));
        let cursor = selection.map_or(cursor, |(start, _)| start);
        let path = document.tree().path_to(cursor);
        Self {
            document,
            cursor,
            selection,
            path,
            store,
        }
    }

    pub fn document(&self) -> &'a Document {
        self.document
    }

    pub fn document_arc(&self) -> &'a Arc<Document> {
        self.document
    }

    pub fn semantic(&self) -> Semantic<'a> {
        self.document.semantic()
    }

    /// Store used to look at paired files while matching. Never written to.
    pub fn store(&self) -> &'a dyn DocumentStore {
        self.store
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// `[start, end)` of the selection, or an empty range at the cursor.
    pub fn selection(&self) -> (usize, usize) {
        self.selection.unwrap_or((self.cursor, self.cursor))
    }

    pub fn has_selection(&self) -> bool {
        self.selection.is_some_and(|(start, end)| start < end)
    }

    pub fn path(&self) -> &[NodeId] {
        &self.path
    }

    pub fn kind_at(&self, index: usize) -> &'a NodeKind {
        self.document.kind(self.path[index])
    }

    pub fn innermost(&self) -> NodeId {
        self.path[self.path.len() - 1]
    }

    /// Whether the cursor touches `token`, both ends inclusive.
    pub fn is_cursor_on_token(&self, token: TokenIdx) -> bool {
        let doc = self.document;
        doc.start_of_token(token) <= self.cursor && self.cursor <= doc.end_of_token(token)
    }

    /// Whether the cursor touches `node`, both ends inclusive.
    pub fn is_cursor_on(&self, node: NodeId) -> bool {
        let doc = self.document;
        doc.start_of(node) <= self.cursor && self.cursor <= doc.end_of(node)
    }

    /// Innermost path entry matching `pred`, with its index.
    pub fn find_innermost(&self, pred: impl Fn(&NodeKind) -> bool) -> Option<(usize, NodeId)> {
        self.path
            .iter()
            .enumerate()
            .rev()
            .find(|(_, id)| pred(self.document.kind(**id)))
            .map(|(i, id)| (i, *id))
    }
}
