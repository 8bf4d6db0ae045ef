use crate::changeset::ChangeSet;
use crate::fix::{FixConfig, QuickFixFactory, QuickFixInterface, QuickFixOperation, perform_fn};
use crate::parse::Document;
use crate::parse::ast::{NodeId, NodeKind};
use crate::parse::lexer::{Punct, TokenKind};

/// Rebinds `*` and `&` in declarations to the identifier (`int *p`) or to
/// the type (`int* p`), per `BindToIdentifier`.
pub struct ReformatPointerDeclaration;

/// One rewritten gap between a type and a declarator name.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Rebind {
    start: usize,
    end: usize,
    text: String,
    /// The declaration as it reads afterwards, from type to name.
    preview: String,
}

impl QuickFixFactory for ReformatPointerDeclaration {
    fn name(&self) -> &'static str {
        "Declaration/ReformatPointerDeclaration"
    }

    fn match_at(
        &self,
        iface: &QuickFixInterface<'_>,
        config: &FixConfig,
        result: &mut Vec<QuickFixOperation>,
    ) {
        let doc = iface.document();
        let bind_to_identifier = config.get_bool("BindToIdentifier", true);

        let (priority, edits) = if iface.has_selection() {
            let (sel_start, sel_end) = iface.selection();
            let tree = doc.tree();
            let mut edits = Vec::new();
            for node in tree.descendants(tree.root()) {
                if doc.start_of(node) >= sel_start && doc.end_of(node) <= sel_end {
                    edits.extend(rebinds_for(doc, node, bind_to_identifier));
                }
            }
            (0, edits)
        } else {
            let path = iface.path();
            let mut found = (0, Vec::new());
            for index in (0..path.len()).rev() {
                let node = path[index];
                if let NodeKind::FunctionDefinition { declarator, .. } = doc.kind(node) {
                    // Only the return type, not the whole body.
                    let name_end = doc
                        .tree()
                        .declarator_name(*declarator)
                        .map_or(0, |name| doc.end_of(name));
                    if iface.cursor() > name_end {
                        continue;
                    }
                }
                let edits = rebinds_for(doc, node, bind_to_identifier);
                if !edits.is_empty() {
                    found = (index as i32, edits);
                    break;
                }
            }
            found
        };
        if edits.is_empty() {
            return;
        }

        let description = match edits.as_slice() {
            [single] => format!("Reformat to \"{}\"", single.preview),
            _ => "Reformat Pointers or References".to_string(),
        };
        result.push(QuickFixOperation::new(
            iface,
            self.name(),
            priority,
            description,
            perform_fn(move |ctx| {
                let mut cs = ChangeSet::new();
                for edit in &edits {
                    cs.replace(edit.start, edit.end, edit.text.clone());
                }
                ctx.apply_origin(cs)
            }),
        ));
    }
}

/// Rebinds for one declaration site; empty for anything that is not one.
fn rebinds_for(doc: &Document, node: NodeId, bind_to_identifier: bool) -> Vec<Rebind> {
    let (specifiers, declarators): (&[NodeId], Vec<NodeId>) = match doc.kind(node) {
        NodeKind::SimpleDeclaration {
            specifiers,
            declarators,
            ..
        } => (specifiers, declarators.clone()),
        NodeKind::FunctionDefinition {
            specifiers,
            declarator,
            ..
        }
        | NodeKind::Condition {
            specifiers,
            declarator,
        }
        | NodeKind::RangeBasedForStatement {
            specifiers,
            declarator,
            ..
        } => (specifiers, vec![*declarator]),
        NodeKind::ParameterDeclaration {
            specifiers,
            declarator: Some(declarator),
            ..
        } => (specifiers, vec![*declarator]),
        _ => return Vec::new(),
    };
    let (spec_start, spec_end) = match (specifiers.first(), specifiers.last()) {
        (Some(first), Some(last)) => (doc.start_of(*first), doc.end_of(*last)),
        _ => return Vec::new(),
    };
    let spec_text = doc.text_of_range(spec_start, spec_end);

    let mut out = Vec::new();
    for (i, &declarator) in declarators.iter().enumerate() {
        let has_ptr_ops = matches!(
            doc.kind(declarator),
            NodeKind::Declarator { ptr_ops, .. } if !ptr_ops.is_empty()
        );
        if !has_ptr_ops {
            continue;
        }
        let name = match doc.tree().declarator_name(declarator) {
            Some(name) => name,
            None => continue,
        };
        let name_start = doc.start_of(name);
        let gap_start = if i == 0 {
            spec_end
        } else {
            doc.start_of(declarator)
        };
        let ops = match operator_text(doc, gap_start, name_start) {
            Some(ops) => ops,
            None => continue,
        };
        let text = match (i, bind_to_identifier) {
            (0, true) => format!(" {ops}"),
            (0, false) => format!("{ops} "),
            _ => ops,
        };
        if doc.text_of_range(gap_start, name_start) == text {
            continue;
        }
        let preview = if i == 0 {
            format!("{spec_text}{text}{}", doc.text_of(name))
        } else {
            format!("{text}{}", doc.text_of(name))
        };
        out.push(Rebind {
            start: gap_start,
            end: name_start,
            text,
            preview,
        });
    }
    out
}

/// The pointer and reference operators between `start` and `end`, or `None`
/// when anything else (cv-qualifiers, comments, parentheses) sits there.
fn operator_text(doc: &Document, start: usize, end: usize) -> Option<String> {
    let mut ops = String::new();
    for token in doc.tokens() {
        if token.end <= start {
            continue;
        }
        if token.start >= end {
            break;
        }
        match token.kind {
            TokenKind::Punct(Punct::Star | Punct::Amp | Punct::AmpAmp) => {
                ops.push_str(&doc.text()[token.start..token.end]);
            }
            _ => return None,
        }
    }
    (!ops.is_empty()).then_some(ops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{
        assert_fix, assert_fix_with_config, assert_no_fix, descriptions, run_fix,
    };

    fn bind_to_type() -> FixConfig {
        FixConfig::default().with_option("BindToIdentifier", serde_yml::Value::Bool(false))
    }

    #[test]
    fn binds_to_identifier() {
        assert_fix(
            &ReformatPointerDeclaration,
            "char* @s;",
            "Reformat to \"char *s\"",
            "char *s;",
        );
    }

    #[test]
    fn binds_to_type() {
        assert_fix_with_config(
            &ReformatPointerDeclaration,
            "const char *@s = 0;",
            "Reformat to \"const char* s\"",
            "const char* s = 0;",
            &bind_to_type(),
        );
    }

    #[test]
    fn later_declarators_lose_inner_spaces() {
        assert_fix(
            &ReformatPointerDeclaration,
            "int* @a, * b;",
            "Reformat Pointers or References",
            "int *a, *b;",
        );
    }

    #[test]
    fn references_in_parameters() {
        assert_fix(
            &ReformatPointerDeclaration,
            "void f(const Foo& @foo);",
            "Reformat to \"const Foo &foo\"",
            "void f(const Foo &foo);",
        );
    }

    #[test]
    fn function_return_type() {
        assert_fix(
            &ReformatPointerDeclaration,
            "char* @name() { return 0; }",
            "Reformat to \"char *name\"",
            "char *name() { return 0; }",
        );
    }

    #[test]
    fn selection_formats_every_declaration() {
        assert_fix(
            &ReformatPointerDeclaration,
            "@int* a;\nvoid g(char* c, int&& r);\n@",
            "Reformat Pointers or References",
            "int *a;\nvoid g(char *c, int &&r);\n",
        );
    }

    #[test]
    fn already_formatted_is_ignored() {
        assert_no_fix(&ReformatPointerDeclaration, "char *@s;");
        assert_no_fix(&ReformatPointerDeclaration, "int @x;");
    }

    #[test]
    fn cv_qualified_pointer_is_left_alone() {
        assert_no_fix(&ReformatPointerDeclaration, "char* const @s = 0;");
    }

    #[test]
    fn body_cursor_does_not_reformat_return_type() {
        let ops = run_fix(&ReformatPointerDeclaration, "char* name() { @return 0; }");
        assert!(descriptions(&ops).is_empty());
    }
}
