use std::collections::HashSet;

use crate::changeset::ChangeSet;
use crate::fix::{FixConfig, QuickFixFactory, QuickFixInterface, QuickFixOperation, perform_fn};
use crate::parse::Document;
use crate::parse::ast::{NodeId, NodeKind};

/// Adds a `case X: break;` for every enumerator a `switch` over an enum does
/// not handle yet.
pub struct CompleteSwitchCase;

impl QuickFixFactory for CompleteSwitchCase {
    fn name(&self) -> &'static str {
        "Statement/CompleteSwitchCase"
    }

    fn match_at(
        &self,
        iface: &QuickFixInterface<'_>,
        _config: &FixConfig,
        result: &mut Vec<QuickFixOperation>,
    ) {
        let doc = iface.document();
        let (index, switch) =
            match iface.find_innermost(|k| matches!(k, NodeKind::SwitchStatement { .. })) {
                Some(found) => found,
                None => return,
            };
        let (condition, body) = match doc.kind(switch) {
            NodeKind::SwitchStatement {
                condition,
                statement: Some(body),
                ..
            } => (*condition, *body),
            _ => return,
        };
        let (lbrace, statements) = match doc.kind(body) {
            NodeKind::CompoundStatement {
                lbrace, statements, ..
            } => (*lbrace, statements),
            _ => return,
        };

        let semantic = iface.semantic();
        let function = semantic.function_at(iface.cursor());
        let ty = match semantic.type_of(condition, function) {
            Some(ty) => ty,
            None => return,
        };
        let enum_info = match semantic.find_enum(&ty) {
            Some(e) => e,
            None => return,
        };

        let covered = case_labels(doc, statements);
        let missing: Vec<String> = enum_info
            .qualified_members()
            .into_iter()
            .zip(&enum_info.members)
            .filter(|(_, member)| !covered.contains(member.as_str()))
            .map(|(qualified, _)| qualified)
            .collect();
        if missing.is_empty() {
            return;
        }

        let pos = doc.end_of_token(lbrace);
        let text = format!("\ncase {}:\nbreak;", missing.join(":\nbreak;\ncase "));
        result.push(QuickFixOperation::new(
            iface,
            self.name(),
            index as i32,
            "Complete Switch Statement",
            perform_fn(move |ctx| {
                let mut cs = ChangeSet::new();
                cs.insert(pos, text.clone());
                ctx.apply_origin(cs)
            }),
        ));
    }
}

/// Unqualified names of the enumerators already used as case labels.
fn case_labels<'d>(doc: &'d Document, statements: &[NodeId]) -> HashSet<&'d str> {
    let mut labels = HashSet::new();
    for &statement in statements {
        let mut current = Some(statement);
        while let Some(node) = current {
            current = match doc.kind(node) {
                NodeKind::CaseStatement {
                    expression,
                    statement,
                    ..
                } => {
                    if let NodeKind::IdExpression { name } = doc.kind(*expression) {
                        labels.insert(doc.name_text(*name));
                    }
                    *statement
                }
                NodeKind::DefaultStatement { statement, .. } => *statement,
                _ => None,
            };
        }
    }
    labels
}
