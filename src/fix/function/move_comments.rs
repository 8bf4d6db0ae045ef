use std::path::PathBuf;
use std::sync::Arc;

use crate::changeset::ChangeSet;
use crate::fix::util::{column_of, comments_before};
use crate::fix::{
    FixConfig, FixError, QuickFixFactory, QuickFixInterface, QuickFixOperation, perform_fn,
};
use crate::parse::Document;
use crate::parse::ast::{NodeId, NodeKind};
use crate::parse::revision::Revision;
use crate::refactoring::corresponding_file;

/// Moves the comments documenting a function between its declaration and
/// its definition, in the same file or the paired header/source.
pub struct MoveFunctionComments;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    ToDeclaration,
    ToDefinition,
}

impl Direction {
    fn description(self) -> &'static str {
        match self {
            Direction::ToDeclaration => "Move Function Documentation to Declaration",
            Direction::ToDefinition => "Move Function Documentation to Definition",
        }
    }
}

/// Where the comments land.
struct Target {
    path: PathBuf,
    revision: Revision,
    offset: usize,
    column: usize,
    /// Text between the target's line start and the target, when blank.
    indentation: String,
}

impl QuickFixFactory for MoveFunctionComments {
    fn name(&self) -> &'static str {
        "Function/MoveFunctionComments"
    }

    fn match_at(
        &self,
        iface: &QuickFixInterface<'_>,
        _config: &FixConfig,
        result: &mut Vec<QuickFixOperation>,
    ) {
        let doc = iface.document();
        let (node, direction) = match function_at_cursor(iface) {
            Some(found) => found,
            None => return,
        };
        let comments = comments_before(doc, doc.tree().node(node).first_token);
        let (first, last) = match (comments.first(), comments.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return,
        };
        let target = match find_target(iface, node, direction) {
            Some(t) => t,
            None => return,
        };

        let text = doc.text();
        let comment_start = doc.start_of_token(first);
        let comment_end = doc.end_of_token(last);
        let node_start = doc.start_of(node);
        let removal = if text[comment_end..node_start].contains('\n') {
            let source = doc.source();
            (source.line_start_of(comment_start), source.line_start_of(node_start))
        } else {
            (comment_start, node_start)
        };
        let block = reindent(
            &text[comment_start..comment_end],
            column_of(doc, comment_start),
            target.column,
        );
        let insertion = format!("{block}\n{}", target.indentation);

        result.push(QuickFixOperation::new(
            iface,
            self.name(),
            -1,
            direction.description(),
            perform_fn(move |ctx| {
                let origin = ctx.origin().clone();
                let mut removal_cs = ChangeSet::new();
                removal_cs.remove(removal.0, removal.1);
                if target.path == origin.path() {
                    removal_cs.insert(target.offset, insertion.clone());
                    return ctx.apply_origin(removal_cs);
                }

                let target_doc = ctx.document(&target.path)?;
                if target_doc.revision() != target.revision {
                    return Err(FixError::Stale {
                        path: target.path.clone(),
                        expected: target.revision.short(),
                        found: target_doc.revision().short(),
                    });
                }
                let mut insertion_cs = ChangeSet::new();
                insertion_cs.insert(target.offset, insertion.clone());
                ctx.apply(&target.path, insertion_cs)?;
                ctx.apply_secondary(origin.path(), removal_cs);
                Ok(())
            }),
        ));
    }
}

/// The definition (cursor outside its body) or function declaration the
/// cursor is in.
fn function_at_cursor(iface: &QuickFixInterface<'_>) -> Option<(NodeId, Direction)> {
    let doc = iface.document();
    for &node in iface.path().iter().rev() {
        match doc.kind(node) {
            NodeKind::FunctionDefinition { body, .. } => {
                if iface.cursor() >= doc.start_of(*body) {
                    return None;
                }
                return Some((node, Direction::ToDeclaration));
            }
            NodeKind::SimpleDeclaration { declarators, .. } => {
                let is_function = matches!(
                    declarators.as_slice(),
                    [d] if doc.tree().function_declarator(*d).is_some()
                );
                return is_function.then_some((node, Direction::ToDefinition));
            }
            _ => {}
        }
    }
    None
}

fn find_target(iface: &QuickFixInterface<'_>, node: NodeId, direction: Direction) -> Option<Target> {
    let doc = iface.document_arc();
    if let Some(target) = counterpart(doc, doc, node, direction) {
        return Some(target);
    }
    let store = iface.store();
    let paired = corresponding_file(doc.path(), |p| store.exists(p))?;
    let text = store.read(&paired).ok()?;
    let paired = Arc::new(Document::parse(paired, text));
    counterpart(doc, &paired, node, direction)
}

/// The counterpart of `node` (from `origin`) inside `candidate`, if it has no
/// documentation of its own.
fn counterpart(
    origin: &Document,
    candidate: &Arc<Document>,
    node: NodeId,
    direction: Direction,
) -> Option<Target> {
    let semantic = origin.semantic();
    let candidate_semantic = candidate.semantic();
    let target = match direction {
        Direction::ToDeclaration => {
            let function = semantic.function_for_definition(node)?;
            candidate_semantic.declarations_of(function).first()?.declaration
        }
        Direction::ToDefinition => {
            let declaration = semantic.declaration_for_node(node)?;
            candidate_semantic.definitions_of(declaration).first()?.definition
        }
    };
    if !comments_before(candidate, candidate.tree().node(target).first_token).is_empty() {
        return None;
    }

    let offset = candidate.start_of(target);
    let line_start = candidate.source().line_start_of(offset);
    let before = &candidate.text()[line_start..offset];
    let column = column_of(candidate, offset);
    let indentation = if before.trim().is_empty() {
        before.to_string()
    } else {
        " ".repeat(column)
    };
    Some(Target {
        path: candidate.path().to_path_buf(),
        revision: candidate.revision(),
        offset,
        column,
        indentation,
    })
}

/// Shift every line after the first from column `from` to column `to`.
fn reindent(block: &str, from: usize, to: usize) -> String {
    let mut lines = block.split('\n');
    let mut out = lines.next().unwrap_or_default().to_string();
    for line in lines {
        out.push('\n');
        if to >= from {
            out.push_str(&" ".repeat(to - from));
            out.push_str(line);
        } else {
            let strip = line
                .char_indices()
                .take(from - to)
                .take_while(|(_, c)| *c == ' ' || *c == '\t')
                .last()
                .map_or(0, |(i, c)| i + c.len_utf8());
            out.push_str(&line[strip..]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::fix::PresetInteraction;
    use crate::refactoring::MemoryStore;
    use crate::testutil::{assert_fix, assert_no_fix, perform_in};

    #[test]
    fn definition_comments_move_to_declaration() {
        assert_fix(
            &MoveFunctionComments,
            "void f();\n\n/// Does things.\nvoid @f() {}\n",
            "Move Function Documentation to Declaration",
            "/// Does things.\nvoid f();\n\nvoid f() {}\n",
        );
    }

    #[test]
    fn header_comments_move_to_source_definition() {
        let store = MemoryStore::new();
        store.insert("a.cpp", "#include \"a.h\"\n\nvoid A::run() {}\n");
        let report = perform_in(
            &MoveFunctionComments,
            &FixConfig::default(),
            &store,
            "a.h",
            "class A {\npublic:\n    // Runs.\n    // Twice.\n    void @run();\n};\n",
            "Move Function Documentation to Definition",
            &PresetInteraction::default(),
        );
        assert_eq!(report.files_written(), vec!["a.cpp", "a.h"]);
        assert_eq!(
            store.get(Path::new("a.cpp")).as_deref(),
            Some("#include \"a.h\"\n\n// Runs.\n// Twice.\nvoid A::run() {}\n")
        );
        assert_eq!(
            store.get(Path::new("a.h")).as_deref(),
            Some("class A {\npublic:\n    void run();\n};\n")
        );
    }

    #[test]
    fn comments_are_indented_to_target() {
        assert_fix(
            &MoveFunctionComments,
            "struct S {\n    void g();\n};\n/* one\n   two */\nvoid @S::g() {}\n",
            "Move Function Documentation to Declaration",
            "struct S {\n    /* one\n       two */\n    void g();\n};\nvoid S::g() {}\n",
        );
    }

    #[test]
    fn undocumented_function_is_ignored() {
        assert_no_fix(&MoveFunctionComments, "void f();\nvoid @f() {}\n");
    }

    #[test]
    fn cursor_in_body_is_ignored() {
        assert_no_fix(&MoveFunctionComments, "void f();\n// doc\nvoid f() { @g(); }\n");
    }

    #[test]
    fn documented_counterpart_is_left_alone() {
        assert_no_fix(&MoveFunctionComments, "// a\nvoid f();\n// b\nvoid @f() {}\n");
    }

    #[test]
    fn reindent_shifts_continuation_lines() {
        assert_eq!(reindent("/* a\n     b */", 4, 0), "/* a\n b */");
        assert_eq!(reindent("// a\n// b", 0, 2), "// a\n  // b");
        assert_eq!(reindent("// a\n\t// b", 4, 0), "// a\n// b");
    }
}
