use crate::changeset::ChangeSet;
use crate::fix::{FixConfig, QuickFixFactory, QuickFixInterface, QuickFixOperation, perform_fn};
use crate::parse::ast::{BinaryOp, NodeKind};

/// Splits an `if` at a top-level `&&` or `||` of its condition.
///
/// ```text
/// if (a && b) x;   =>  if (a) {
///                      if (b) x;
///                      }
///
/// if (a || b) x;   =>  if (a) x;
///                      else if (b) x;
/// ```
pub struct SplitIfStatement;

impl QuickFixFactory for SplitIfStatement {
    fn name(&self) -> &'static str {
        "Statement/SplitIfStatement"
    }

    fn match_at(
        &self,
        iface: &QuickFixInterface<'_>,
        _config: &FixConfig,
        result: &mut Vec<QuickFixOperation>,
    ) {
        let doc = iface.document();
        let path = iface.path();
        let (if_index, if_stmt) =
            match iface.find_innermost(|k| matches!(k, NodeKind::IfStatement { .. })) {
                Some(found) => found,
                None => return,
            };
        let (rparen, statement, has_else) = match doc.kind(if_stmt) {
            NodeKind::IfStatement {
                rparen: Some(rparen),
                statement: Some(statement),
                else_statement,
                ..
            } => (*rparen, *statement, else_statement.is_some()),
            _ => return,
        };

        let mut split_kind = None;
        for index in if_index + 1..path.len() {
            let (left, op, op_first, right) = match doc.kind(path[index]) {
                NodeKind::BinaryExpression {
                    left,
                    op,
                    op_first,
                    right,
                    ..
                } => (*left, *op, *op_first, *right),
                _ => return,
            };
            match split_kind {
                None => {
                    if op != BinaryOp::LogicalAnd && op != BinaryOp::LogicalOr {
                        return;
                    }
                    if op == BinaryOp::LogicalAnd && has_else {
                        return;
                    }
                    split_kind = Some(op);
                }
                Some(kind) if kind != op => return,
                Some(_) => {}
            }
            if !iface.is_cursor_on_token(op_first) {
                continue;
            }

            let if_start = doc.start_of(if_stmt);
            let if_end = doc.end_of(if_stmt);
            let left_start = doc.start_of(left);
            let left_end = doc.end_of(left);
            let right_start = doc.start_of(right);
            let rparen_start = doc.start_of_token(rparen);
            let rparen_end = doc.end_of_token(rparen);
            let stmt_end = doc.end_of(statement);
            let compound_body = matches!(doc.kind(statement), NodeKind::CompoundStatement { .. });
            let action = perform_fn(move |ctx| {
                let mut cs = ChangeSet::new();
                if op == BinaryOp::LogicalAnd {
                    cs.insert(if_start, "if (")
                        .move_range(left_start, left_end, if_start)
                        .insert(if_start, ") {\n")
                        .remove(left_end, right_start)
                        .insert(if_end, "\n}");
                } else {
                    let separator = if compound_body { " " } else { "\n" };
                    cs.insert(stmt_end, separator)
                        .insert(stmt_end, "else if (")
                        .move_range(right_start, rparen_start, stmt_end)
                        .insert(stmt_end, ")")
                        .copy(rparen_end, stmt_end, stmt_end)
                        .remove(left_end, right_start);
                }
                ctx.apply_origin(cs)
            });
            result.push(QuickFixOperation::new(
                iface,
                self.name(),
                index as i32,
                "Split if Statement",
                action,
            ));
            return;
        }
    }
}
