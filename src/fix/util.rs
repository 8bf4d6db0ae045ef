use std::sync::Arc;

use crate::changeset::ChangeSet;
use crate::fix::{Access, FixError, PerformContext, QuickFixInterface};
use crate::parse::Document;
use crate::parse::ast::{NodeId, NodeKind, TokenIdx};
use crate::parse::revision::Revision;
use crate::refactoring::corresponding_file;
use crate::semantic::ClassInfo;

/// The nearest non-trivia token before `token`.
pub fn prev_significant(doc: &Document, token: TokenIdx) -> Option<TokenIdx> {
    let tokens = doc.tokens();
    (0..token.min(tokens.len())).rev().find(|&i| !tokens[i].is_trivia())
}

/// The nearest non-trivia token after `token`.
pub fn next_significant(doc: &Document, token: TokenIdx) -> Option<TokenIdx> {
    let tokens = doc.tokens();
    (token + 1..tokens.len()).find(|&i| !tokens[i].is_trivia())
}

/// `[start, end)` of a specifier sequence.
pub fn specifiers_range(doc: &Document, specifiers: &[NodeId]) -> Option<(usize, usize)> {
    let first = specifiers.first()?;
    let last = specifiers.last()?;
    Some((doc.start_of(*first), doc.end_of(*last)))
}

/// Comment tokens documenting the declaration starting at `first_token`:
/// the run of comments directly above it with no blank line in between.
pub fn comments_before(doc: &Document, first_token: TokenIdx) -> Vec<TokenIdx> {
    let tokens = doc.tokens();
    let text = doc.text();
    let mut out = Vec::new();
    let mut next_start = match tokens.get(first_token) {
        Some(token) => token.start,
        None => return out,
    };
    let mut idx = first_token;
    while idx > 0 {
        idx -= 1;
        let token = tokens[idx];
        if !token.is_comment() {
            break;
        }
        let gap = &text[token.end..next_start];
        if !gap.chars().all(char::is_whitespace) || gap.matches('\n').count() > 1 {
            break;
        }
        // A trailing comment on the line of preceding code documents that code.
        let line_start = doc.source().line_start_of(token.start);
        if !text[line_start..token.start].trim().is_empty() {
            break;
        }
        out.push(idx);
        next_start = token.start;
    }
    out.reverse();
    out
}

/// Column (in characters) of `offset` within its line.
pub fn column_of(doc: &Document, offset: usize) -> usize {
    let line_start = doc.source().line_start_of(offset);
    doc.text()[line_start..offset].chars().count()
}

/// Innermost node on `path` that is a statement, with its path index.
pub fn enclosing_statement(doc: &Document, path: &[NodeId]) -> Option<(usize, NodeId)> {
    path.iter()
        .enumerate()
        .rev()
        .find(|(_, id)| doc.kind(**id).is_statement())
        .map(|(i, id)| (i, *id))
}

/// The parameter declarations of a function declarator.
pub fn parameters_of(doc: &Document, function_declarator: NodeId) -> &[NodeId] {
    match doc.kind(function_declarator) {
        NodeKind::FunctionDeclarator { parameters, .. } => parameters,
        _ => &[],
    }
}

/// `rparen` of a function declarator.
pub fn rparen_of(doc: &Document, function_declarator: NodeId) -> Option<TokenIdx> {
    match doc.kind(function_declarator) {
        NodeKind::FunctionDeclarator { rparen, .. } => Some(*rparen),
        _ => None,
    }
}

/// `name` with `X` appended until `taken` no longer claims it.
pub fn unique_name(base: &str, taken: impl Fn(&str) -> bool) -> String {
    let mut name = base.to_string();
    while taken(&name) {
        name.push('X');
    }
    name
}

/// `int name`, `Foo *name`.
pub fn with_type(ty: &str, rest: &str) -> String {
    if ty.ends_with('*') || ty.ends_with('&') {
        format!("{ty}{rest}")
    } else {
        format!("{ty} {rest}")
    }
}

/// Insert `declaration` after the matching access label, or append a new
/// section before the closing brace.
pub fn add_member_declaration(
    doc: &Document,
    class: &ClassInfo,
    access: Access,
    declaration: &str,
    cs: &mut ChangeSet,
) {
    let (members, rbrace) = match doc.kind(class.node) {
        NodeKind::ClassSpecifier {
            members,
            rbrace: Some(rbrace),
            ..
        } => (members, *rbrace),
        _ => return,
    };
    let indentation = members
        .iter()
        .find(|m| !matches!(doc.kind(**m), NodeKind::AccessDeclaration { .. }))
        .map_or_else(
            || "    ".to_string(),
            |m| doc.source().indentation_at(doc.start_of(*m)).to_string(),
        );

    let mut has_labels = false;
    for &member in members {
        if let NodeKind::AccessDeclaration { access: first, colon } = doc.kind(member) {
            has_labels = true;
            let label = doc.text_of_range(doc.start_of_token(*first), doc.start_of_token(*colon));
            if label.split_whitespace().collect::<Vec<_>>().join(" ") == access.label() {
                cs.insert(doc.end_of_token(*colon), format!("\n{indentation}{declaration}"));
                return;
            }
        }
    }

    let default_access = if class.is_struct { Access::Public } else { Access::Private };
    let text = if !has_labels && access == default_access {
        format!("{indentation}{declaration}\n")
    } else {
        format!("{}:\n{indentation}{declaration}\n", access.label())
    };
    let rbrace_start = doc.start_of_token(rbrace);
    let line_start = doc.source().line_start_of(rbrace_start);
    if doc.text_of_range(line_start, rbrace_start).trim().is_empty() {
        cs.insert(line_start, text);
    } else {
        cs.insert(rbrace_start, format!("\n{text}"));
    }
}

/// A class definition found while matching, in the current document or in
/// its paired header/source.
#[derive(Debug, Clone)]
pub struct ClassTarget {
    doc: Arc<Document>,
    name: String,
}

impl ClassTarget {
    /// Look `name` up in the current document, then in the paired file.
    pub fn locate(iface: &QuickFixInterface<'_>, name: &str) -> Option<Self> {
        let doc = iface.document_arc();
        if doc.semantic().find_class(name).is_some() {
            return Some(Self {
                doc: doc.clone(),
                name: name.to_string(),
            });
        }
        let store = iface.store();
        let paired = corresponding_file(doc.path(), |p| store.exists(p))?;
        let text = store.read(&paired).ok()?;
        let paired = Arc::new(Document::parse(paired, text));
        paired.semantic().find_class(name)?;
        Some(Self {
            doc: paired,
            name: name.to_string(),
        })
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.doc
    }

    pub fn class(&self) -> Option<&ClassInfo> {
        self.doc.semantic().find_class(&self.name)
    }

    pub fn revision(&self) -> Revision {
        self.doc.revision()
    }

    /// Whether a member called `name` is already declared.
    pub fn has_member(&self, name: &str) -> bool {
        self.class()
            .is_some_and(|c| c.field(name).is_some() || c.method(name).is_some())
    }

    /// Add `declaration` to the class under `access`. Refuses when the
    /// class's file changed since matching.
    pub fn declare(
        &self,
        ctx: &mut PerformContext<'_>,
        access: Access,
        declaration: &str,
    ) -> Result<(), FixError> {
        let path = self.doc.path();
        let current = ctx.document(path)?;
        if current.revision() != self.revision() {
            return Err(FixError::Stale {
                path: path.to_path_buf(),
                expected: self.revision().short(),
                found: current.revision().short(),
            });
        }
        let class = match current.semantic().find_class(&self.name) {
            Some(c) => c,
            None => return Ok(()),
        };
        let mut cs = ChangeSet::new();
        add_member_declaration(&current, class, access, declaration, &mut cs);
        ctx.apply(path, cs)
    }
}
