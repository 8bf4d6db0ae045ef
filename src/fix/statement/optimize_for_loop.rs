use crate::changeset::ChangeSet;
use crate::fix::util::unique_name;
use crate::fix::{FixConfig, QuickFixFactory, QuickFixInterface, QuickFixOperation, perform_fn};
use crate::parse::Document;
use crate::parse::ast::{NodeId, NodeKind};
use crate::semantic::{Type, type_of_declaration};

/// Turns `i++` into `++i` and hoists the loop-invariant side of the
/// condition into a variable initialized once.
///
/// ```text
/// for (int i = 0; i < v.size(); i++)  =>  for (int i = 0, total = v.size(); i < total; ++i)
/// ```
pub struct OptimizeForLoop;

impl QuickFixFactory for OptimizeForLoop {
    fn name(&self) -> &'static str {
        "Statement/OptimizeForLoop"
    }

    fn match_at(
        &self,
        iface: &QuickFixInterface<'_>,
        _config: &FixConfig,
        result: &mut Vec<QuickFixOperation>,
    ) {
        let doc = iface.document();
        let for_stmt = iface.innermost();
        let (initializer, condition, expression) = match doc.kind(for_stmt) {
            NodeKind::ForStatement {
                initializer,
                condition,
                expression,
                ..
            } => (*initializer, *condition, *expression),
            _ => return,
        };
        if !iface.is_cursor_on(for_stmt) {
            return;
        }

        let postcrement = expression.and_then(|e| match doc.kind(e) {
            NodeKind::PostIncrDecr { base, op_token, .. } => Some((
                (doc.start_of(*base), doc.end_of(*base)),
                (doc.start_of_token(*op_token), doc.end_of_token(*op_token)),
            )),
            _ => None,
        });

        let hoist = condition.and_then(|c| hoistable_operand(iface, initializer, c));
        if postcrement.is_none() && hoist.is_none() {
            return;
        }

        let init_end = doc.end_of(initializer);
        let empty_init = doc.text_of(initializer) == ";";
        let taken: Vec<String> = declarator_names(doc, initializer);
        let hoist = hoist.map(|(operand, ty)| {
            let text = doc.text_of(operand).to_string();
            (doc.start_of(operand), doc.end_of(operand), text, ty)
        });
        result.push(QuickFixOperation::new(
            iface,
            self.name(),
            -1,
            "Optimize for-Loop",
            perform_fn(move |ctx| {
                let mut cs = ChangeSet::new();
                if let Some(((base_start, base_end), (op_start, op_end))) = postcrement {
                    cs.flip(base_start, base_end, op_start, op_end);
                }
                if let Some((start, end, text, ty)) = &hoist {
                    let before_semicolon = init_end - 1;
                    let name = if empty_init {
                        cs.insert(before_semicolon, format!("{} = {text}", ty.declare("total")));
                        "total".to_string()
                    } else {
                        let name = unique_name("total", |n| taken.iter().any(|t| t == n));
                        cs.insert(before_semicolon, format!(", {name} = {text}"));
                        name
                    };
                    cs.replace(*start, *end, name);
                }
                ctx.apply_origin(cs)
            }),
        ));
    }
}

/// The operand of `i < expr` worth evaluating once, with the loop variable's
/// type.
fn hoistable_operand(
    iface: &QuickFixInterface<'_>,
    initializer: NodeId,
    condition: NodeId,
) -> Option<(NodeId, Type)> {
    let doc = iface.document();
    let (left, right) = match doc.kind(condition) {
        NodeKind::BinaryExpression { left, right, .. } => (*left, *right),
        _ => return None,
    };
    let (id, operand) = if matches!(doc.kind(left), NodeKind::IdExpression { .. }) {
        (left, right)
    } else if matches!(doc.kind(right), NodeKind::IdExpression { .. }) {
        (right, left)
    } else {
        return None;
    };
    if matches!(
        doc.kind(operand),
        NodeKind::NumericLiteral { .. }
            | NodeKind::StringLiteral
            | NodeKind::IdExpression { .. }
            | NodeKind::UnaryExpression { .. }
    ) {
        return None;
    }

    let semantic = iface.semantic();
    let function = semantic.function_at(doc.start_of(condition));
    let condition_type = semantic.type_of(id, function)?;
    if !condition_type.is_valid() {
        return None;
    }
    let matches_init = doc.text_of(initializer) == ";"
        || initializer_type(doc, initializer).is_some_and(|t| t == condition_type);
    matches_init.then_some((operand, condition_type))
}

/// Type of the first declarator of a declaration in the init statement.
fn initializer_type(doc: &Document, initializer: NodeId) -> Option<Type> {
    let declaration = match doc.kind(initializer) {
        NodeKind::DeclarationStatement { declaration } => *declaration,
        _ => return None,
    };
    match doc.kind(declaration) {
        NodeKind::SimpleDeclaration {
            specifiers,
            declarators,
            ..
        } => Some(type_of_declaration(
            doc.tree(),
            doc.text(),
            specifiers,
            declarators.first().copied(),
        )),
        _ => None,
    }
}

fn declarator_names(doc: &Document, initializer: NodeId) -> Vec<String> {
    let declaration = match doc.kind(initializer) {
        NodeKind::DeclarationStatement { declaration } => *declaration,
        _ => return Vec::new(),
    };
    match doc.kind(declaration) {
        NodeKind::SimpleDeclaration { declarators, .. } => declarators
            .iter()
            .filter_map(|d| doc.tree().declarator_name(*d))
            .map(|name| doc.text_of(name).to_string())
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{assert_fix, assert_no_fix, run_fix};

    const DESCRIPTION: &str = "Optimize for-Loop";

    #[test]
    fn postcrement_becomes_precrement() {
        assert_fix(
            &OptimizeForLoop,
            "void f() {\n@for (int i = 0; i < 10; i++) {}\n}\n",
            DESCRIPTION,
            "void f() {\nfor (int i = 0; i < 10; ++i) {}\n}\n",
        );
    }

    #[test]
    fn hoists_condition_into_init_declaration() {
        assert_fix(
            &OptimizeForLoop,
            "int size();\nvoid f() {\n@for (int i = 0; i < size(); ++i) {}\n}\n",
            DESCRIPTION,
            "int size();\nvoid f() {\nfor (int i = 0, total = size(); i < total; ++i) {}\n}\n",
        );
    }

    #[test]
    fn hoists_into_empty_init() {
        assert_fix(
            &OptimizeForLoop,
            "int size();\nvoid f(int i) {\n@for (; i < size(); i++) {}\n}\n",
            DESCRIPTION,
            "int size();\nvoid f(int i) {\nfor (int total = size(); i < total; ++i) {}\n}\n",
        );
    }

    #[test]
    fn hoisted_name_avoids_existing_declarators() {
        assert_fix(
            &OptimizeForLoop,
            "int size();\nvoid f() {\n@for (int i = 0, total = 0; i < size(); ++i) {}\n}\n",
            DESCRIPTION,
            "int size();\nvoid f() {\nfor (int i = 0, total = 0, totalX = size(); i < totalX; ++i) {}\n}\n",
        );
    }

    #[test]
    fn already_optimal_loop_is_ignored() {
        assert_no_fix(&OptimizeForLoop, "void f(int n) {\n@for (int i = 0; i < n; ++i) {}\n}\n");
    }

    #[test]
    fn cursor_in_body_is_ignored() {
        let ops = run_fix(&OptimizeForLoop, "void f() {\nfor (int i = 0; i < 10; i++) { @g(); }\n}\n");
        assert!(ops.is_empty());
    }
}
