use crate::changeset::ChangeSet;
use crate::fix::{FixConfig, QuickFixFactory, QuickFixInterface, QuickFixOperation, perform_fn};
use crate::parse::Document;
use crate::parse::ast::{NodeId, NodeKind, TokenIdx};

/// Wraps non-block bodies of `if`, `while`, `for` and `do` in braces. A whole
/// `if`/`else if`/`else` chain is braced in one go.
pub struct AddBraces;

impl QuickFixFactory for AddBraces {
    fn name(&self) -> &'static str {
        "Statement/AddBraces"
    }

    fn match_at(
        &self,
        iface: &QuickFixInterface<'_>,
        _config: &FixConfig,
        result: &mut Vec<QuickFixOperation>,
    ) {
        let doc = iface.document();
        let statement = iface.innermost();
        let mut inserts: Vec<(usize, &'static str)> = Vec::new();
        match doc.kind(statement) {
            NodeKind::IfStatement { if_token, .. } => {
                let mut triggered = iface.is_cursor_on_token(*if_token);
                let mut current = statement;
                while let NodeKind::IfStatement {
                    rparen,
                    statement: body,
                    else_token,
                    else_statement,
                    ..
                } = doc.kind(current)
                {
                    if let Some(else_token) = else_token {
                        triggered |= iface.is_cursor_on_token(*else_token);
                    }
                    if let (Some(rparen), Some(body)) = (rparen, body) {
                        if !is_compound(doc, *body) {
                            inserts.push((doc.end_of_token(*rparen), " {"));
                            match else_token {
                                Some(else_token) => {
                                    inserts.push((doc.start_of_token(*else_token), "} "))
                                }
                                None => inserts.push((doc.end_of(*body), "\n}")),
                            }
                        }
                    }
                    let (else_token, else_statement) = match (else_token, else_statement) {
                        (Some(t), Some(s)) => (*t, *s),
                        _ => break,
                    };
                    match doc.kind(else_statement) {
                        NodeKind::IfStatement { .. } => current = else_statement,
                        NodeKind::CompoundStatement { .. } => break,
                        _ => {
                            inserts.push((doc.end_of_token(else_token), " {"));
                            inserts.push((doc.end_of(else_statement), "\n}"));
                            break;
                        }
                    }
                }
                if !triggered {
                    return;
                }
            }
            NodeKind::WhileStatement {
                while_token: keyword,
                rparen,
                statement: body,
                ..
            }
            | NodeKind::ForStatement {
                for_token: keyword,
                rparen,
                statement: body,
                ..
            }
            | NodeKind::RangeBasedForStatement {
                for_token: keyword,
                rparen,
                statement: body,
                ..
            } => {
                if !iface.is_cursor_on_token(*keyword) {
                    return;
                }
                let (rparen, body) = match (rparen, body) {
                    (Some(r), Some(b)) => (*r, *b),
                    _ => return,
                };
                if is_compound(doc, body) {
                    return;
                }
                inserts.push((doc.end_of_token(rparen), " {"));
                inserts.push((doc.end_of(body), "\n}"));
            }
            NodeKind::DoStatement {
                do_token,
                statement: body,
                while_token,
                ..
            } => {
                if !iface.is_cursor_on_token(*do_token) || is_compound(doc, *body) {
                    return;
                }
                let while_token: TokenIdx = match while_token {
                    Some(t) => *t,
                    None => return,
                };
                inserts.push((doc.end_of_token(*do_token), " {"));
                inserts.push((doc.start_of_token(while_token), "} "));
            }
            _ => return,
        }
        if inserts.is_empty() {
            return;
        }

        result.push(QuickFixOperation::new(
            iface,
            self.name(),
            0,
            "Add Curly Braces",
            perform_fn(move |ctx| {
                let mut cs = ChangeSet::new();
                for &(pos, text) in &inserts {
                    cs.insert(pos, text);
                }
                ctx.apply_origin(cs)
            }),
        ));
    }
}

fn is_compound(doc: &Document, node: NodeId) -> bool {
    matches!(doc.kind(node), NodeKind::CompoundStatement { .. })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{assert_fix, assert_no_fix};

    const DESCRIPTION: &str = "Add Curly Braces";

    #[test]
    fn braces_if_body() {
        assert_fix(
            &AddBraces,
            "void f() {\n    @if (a)\n        b();\n}\n",
            DESCRIPTION,
            "void f() {\n    if (a) {\n        b();\n}\n}\n",
        );
    }

    #[test]
    fn braces_whole_if_else_chain() {
        assert_fix(
            &AddBraces,
            "void f() {\n@if (a)\nx();\nelse if (b)\ny();\nelse\nz();\n}\n",
            DESCRIPTION,
            "void f() {\nif (a) {\nx();\n} else if (b) {\ny();\n} else {\nz();\n}\n}\n",
        );
    }

    #[test]
    fn braces_single_line_chain() {
        assert_fix(
            &AddBraces,
            "void f() {\n    @if (a) i(); else if (b) j(); else k();\n}\n",
            DESCRIPTION,
            "void f() {\n    if (a) { i(); } else if (b) { j(); } else { k();\n}\n}\n",
        );
    }

    #[test]
    fn cursor_on_else_triggers_chain() {
        assert_fix(
            &AddBraces,
            "void f() {\nif (a)\nx();\n@else\ny();\n}\n",
            DESCRIPTION,
            "void f() {\nif (a) {\nx();\n} else {\ny();\n}\n}\n",
        );
    }

    #[test]
    fn skips_arms_that_already_have_braces() {
        assert_fix(
            &AddBraces,
            "void f() {\n@if (a) {\nx();\n} else\ny();\n}\n",
            DESCRIPTION,
            "void f() {\nif (a) {\nx();\n} else {\ny();\n}\n}\n",
        );
    }

    #[test]
    fn braces_loops() {
        assert_fix(
            &AddBraces,
            "void f() {\n@while (a)\nb();\n}\n",
            DESCRIPTION,
            "void f() {\nwhile (a) {\nb();\n}\n}\n",
        );
        assert_fix(
            &AddBraces,
            "void f() {\n@for (int i = 0; i < n; ++i)\nb(i);\n}\n",
            DESCRIPTION,
            "void f() {\nfor (int i = 0; i < n; ++i) {\nb(i);\n}\n}\n",
        );
    }

    #[test]
    fn braces_do_while() {
        assert_fix(
            &AddBraces,
            "void f() {\n@do\nb();\nwhile (a);\n}\n",
            DESCRIPTION,
            "void f() {\ndo {\nb();\n} while (a);\n}\n",
        );
    }

    #[test]
    fn cursor_inside_condition_is_ignored() {
        assert_no_fix(&AddBraces, "void f() {\nif (@a)\nb();\n}\n");
    }

    #[test]
    fn compound_body_is_ignored() {
        assert_no_fix(&AddBraces, "void f() {\n@if (a) {\nb();\n}\n}\n");
    }
}
