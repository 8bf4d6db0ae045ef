use crate::changeset::ChangeSet;
use crate::fix::{FixConfig, QuickFixFactory, QuickFixInterface, QuickFixOperation, perform_fn};
use crate::parse::ast::NodeKind;

const DESCRIPTION: &str = "Move Declaration out of Condition";

/// Hoists the declaration in an `if` or `while` condition above the statement.
///
/// ```text
/// if (Foo *f = get()) ...      Foo *f = get();
///                          =>  if (f) ...
///
/// while (int n = next()) ...   int n;
///                          =>  while ((n = next()) != 0) ...
/// ```
pub struct MoveDeclarationOutOfCondition;

impl QuickFixFactory for MoveDeclarationOutOfCondition {
    fn name(&self) -> &'static str {
        "Declaration/MoveDeclarationOutOfCondition"
    }

    fn match_at(
        &self,
        iface: &QuickFixInterface<'_>,
        _config: &FixConfig,
        result: &mut Vec<QuickFixOperation>,
    ) {
        let doc = iface.document();
        let path = iface.path();
        for index in (1..path.len()).rev() {
            let condition = path[index];
            let declarator = match doc.kind(condition) {
                NodeKind::Condition { declarator, .. } => *declarator,
                _ => continue,
            };
            let (core, has_initializer) = match doc.kind(declarator) {
                NodeKind::Declarator {
                    core: Some(core),
                    equal,
                    initializer,
                    ..
                } => (*core, equal.is_some() && initializer.is_some()),
                _ => return,
            };
            if !iface.is_cursor_on(core) {
                return;
            }

            let statement = path[index - 1];
            let stmt_start = doc.start_of(statement);
            let cond_start = doc.start_of(condition);
            let cond_end = doc.end_of(condition);
            let core_start = doc.start_of(core);
            let core_end = doc.end_of(core);
            match doc.kind(statement) {
                NodeKind::IfStatement { condition: c, .. } if *c == condition => {
                    result.push(QuickFixOperation::new(
                        iface,
                        self.name(),
                        index as i32,
                        DESCRIPTION,
                        perform_fn(move |ctx| {
                            let mut cs = ChangeSet::new();
                            cs.copy(core_start, core_end, cond_start)
                                .move_range(cond_start, cond_end, stmt_start)
                                .insert(stmt_start, ";\n");
                            ctx.apply_origin(cs)
                        }),
                    ));
                }
                NodeKind::WhileStatement { condition: c, .. }
                    if *c == condition && has_initializer =>
                {
                    result.push(QuickFixOperation::new(
                        iface,
                        self.name(),
                        index as i32,
                        DESCRIPTION,
                        perform_fn(move |ctx| {
                            let mut cs = ChangeSet::new();
                            cs.insert(cond_start, "(")
                                .insert(cond_end, ") != 0")
                                .move_range(cond_start, core_start, stmt_start)
                                .copy(core_start, core_end, stmt_start)
                                .insert(stmt_start, ";\n");
                            ctx.apply_origin(cs)
                        }),
                    ));
                }
                _ => {}
            }
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{assert_fix, assert_no_fix};

    #[test]
    fn hoists_out_of_if() {
        assert_fix(
            &MoveDeclarationOutOfCondition,
            "void f() {\nif (Foo *@foo = get()) use(foo);\n}\n",
            DESCRIPTION,
            "void f() {\nFoo *foo = get();\nif (foo) use(foo);\n}\n",
        );
    }

    #[test]
    fn hoists_out_of_while() {
        assert_fix(
            &MoveDeclarationOutOfCondition,
            "void f() {\nwhile (int @n = next()) use(n);\n}\n",
            DESCRIPTION,
            "void f() {\nint n;\nwhile ((n = next()) != 0) use(n);\n}\n",
        );
    }

    #[test]
    fn cursor_must_be_on_name() {
        assert_no_fix(
            &MoveDeclarationOutOfCondition,
            "void f() {\nif (Foo *foo = @get()) use(foo);\n}\n",
        );
    }

    #[test]
    fn plain_condition_is_ignored() {
        assert_no_fix(&MoveDeclarationOutOfCondition, "void f() {\nif (@x) g();\n}\n");
    }
}
