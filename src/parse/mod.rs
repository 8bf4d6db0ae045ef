pub mod ast;
pub mod lexer;
pub mod parser;
pub mod revision;
pub mod source;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::semantic::{Semantic, SemanticModel};

use ast::{NodeId, NodeKind, ParseError, SyntaxTree, TokenIdx};
use lexer::Token;
use revision::Revision;
use source::SourceFile;

/// Header extensions; everything else C++ is treated as a source file.
pub const HEADER_EXTENSIONS: &[&str] = &["h", "hpp", "hh", "hxx"];
pub const SOURCE_EXTENSIONS: &[&str] = &["cpp", "cc", "cxx", "c++"];

/// One parsed snapshot of a file: text, syntax tree and fingerprint.
///
/// Immutable once built. Edits never update a document in place; the
/// refactoring layer re-parses the new text instead.
#[derive(Debug)]
pub struct Document {
    source: SourceFile,
    tree: SyntaxTree,
    errors: Vec<ParseError>,
    revision: Revision,
    model: OnceLock<SemanticModel>,
}

impl Document {
    pub fn parse(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let source = SourceFile::from_string(path.into(), text.into());
        let tokens = lexer::tokenize(source.as_str());
        let (tree, errors) = parser::parse(source.as_str(), tokens);
        let revision = Revision::of(source.as_str());
        if !errors.is_empty() {
            tracing::debug!(
                path = %source.path.display(),
                errors = errors.len(),
                "parsed with errors"
            );
        }
        Self {
            source,
            tree,
            errors,
            revision,
            model: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.source.path
    }

    pub fn text(&self) -> &str {
        self.source.as_str()
    }

    pub fn source(&self) -> &SourceFile {
        &self.source
    }

    pub fn tree(&self) -> &SyntaxTree {
        &self.tree
    }

    pub fn tokens(&self) -> &[Token] {
        self.tree.tokens()
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn revision(&self) -> Revision {
        self.revision
    }

    pub fn is_header(&self) -> bool {
        self.path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| HEADER_EXTENSIONS.contains(&e))
    }

    /// Symbol tables for this snapshot, built on first use.
    pub fn semantic(&self) -> Semantic<'_> {
        let model = self
            .model
            .get_or_init(|| SemanticModel::build(&self.tree, self.text()));
        Semantic::new(self, model)
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        self.tree.kind(id)
    }

    pub fn start_of(&self, id: NodeId) -> usize {
        self.tree.start_of(id)
    }

    pub fn end_of(&self, id: NodeId) -> usize {
        self.tree.end_of(id)
    }

    pub fn start_of_token(&self, idx: TokenIdx) -> usize {
        self.tree.start_of_token(idx)
    }

    pub fn end_of_token(&self, idx: TokenIdx) -> usize {
        self.tree.end_of_token(idx)
    }

    pub fn text_of(&self, id: NodeId) -> &str {
        &self.text()[self.start_of(id)..self.end_of(id)]
    }

    pub fn text_of_token(&self, idx: TokenIdx) -> &str {
        &self.text()[self.start_of_token(idx)..self.end_of_token(idx)]
    }

    pub fn text_of_range(&self, start: usize, end: usize) -> &str {
        let end = end.min(self.text().len());
        &self.text()[start.min(end)..end]
    }

    pub fn offset_to_line_col(&self, offset: usize) -> (usize, usize) {
        self.source.offset_to_line_col(offset)
    }

    pub fn line_col_to_offset(&self, line: usize, col: usize) -> Option<usize> {
        self.source.line_col_to_offset(line, col)
    }

    /// The innermost unqualified-name text of a name node (`b` for `a::b`).
    pub fn name_text(&self, name: NodeId) -> &str {
        match self.tree.name_token(name) {
            Some(token) => self.text_of_token(token),
            None => self.text_of(name),
        }
    }

    /// Index of the non-trivia token at or after `offset`, if any.
    pub fn significant_token_at(&self, offset: usize) -> Option<TokenIdx> {
        let idx = self.tree.token_at(offset)?;
        (!self.tree.token(idx).is_trivia()).then_some(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_map_back_to_text() {
        let doc = Document::parse("a.cpp", "int main() { return 0; }\n");
        let root = doc.tree().root();
        assert_eq!(doc.start_of(root), 0);
        assert_eq!(doc.end_of(root), doc.text().len());
        let returns: Vec<_> = doc
            .tree()
            .descendants(root)
            .into_iter()
            .filter(|id| matches!(doc.kind(*id), NodeKind::ReturnStatement { .. }))
            .collect();
        assert_eq!(doc.text_of(returns[0]), "return 0;");
    }

    #[test]
    fn header_detection() {
        assert!(Document::parse("x/foo.hpp", "").is_header());
        assert!(!Document::parse("x/foo.cpp", "").is_header());
    }

    #[test]
    fn empty_document_is_valid() {
        let doc = Document::parse("e.cpp", "");
        assert!(doc.errors().is_empty());
        assert_eq!(doc.tree().path_to(0), vec![doc.tree().root()]);
    }

    #[test]
    fn revision_tracks_text() {
        let a = Document::parse("a.cpp", "int x;");
        let b = Document::parse("b.cpp", "int x;");
        assert_eq!(a.revision(), b.revision());
    }

    mod prop_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn parser_never_panics(text in "[a-z0-9_ ;{}()<>\\[\\]=*&+,.:?!~\\-\\n\"'/#]{0,200}") {
                let doc = Document::parse("fuzz.cpp", text.clone());
                let tree = doc.tree();
                for id in tree.descendants(tree.root()) {
                    prop_assert!(doc.start_of(id) <= doc.end_of(id));
                    prop_assert!(doc.end_of(id) <= text.len());
                }
            }
        }
    }
}
