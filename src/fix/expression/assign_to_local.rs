use crate::changeset::ChangeSet;
use crate::fix::util::unique_name;
use crate::fix::{FixConfig, QuickFixFactory, QuickFixInterface, QuickFixOperation, perform_fn};
use crate::parse::Document;
use crate::parse::ast::{NodeId, NodeKind};

/// Stores the result of a call statement in a new local.
///
/// ```text
/// w.getSize();  =>  auto size = w.getSize();
/// ```
///
/// `UseAuto: false` spells out the resolved type instead of `auto`.
pub struct AssignToLocalVariable;

impl QuickFixFactory for AssignToLocalVariable {
    fn name(&self) -> &'static str {
        "Expression/AssignToLocalVariable"
    }

    fn match_at(
        &self,
        iface: &QuickFixInterface<'_>,
        config: &FixConfig,
        result: &mut Vec<QuickFixOperation>,
    ) {
        let doc = iface.document();
        let path = iface.path();
        let expression = match whole_statement_call(doc, path) {
            Some(e) => e,
            None => return,
        };
        let callee = match callee_name(doc, expression) {
            Some(name) => name,
            None => return,
        };

        let semantic = iface.semantic();
        let function = semantic.function_at(iface.cursor());
        let ty = match semantic.type_of(expression, function) {
            Some(ty) if ty.is_valid() && !ty.is_void() => ty,
            _ => return,
        };

        let name = unique_name(&local_name(callee), |candidate| {
            function.is_some_and(|f| f.locals.iter().any(|l| l.name == candidate))
        });
        let declaration = if config.get_bool("UseAuto", true) {
            format!("auto {name} = ")
        } else {
            format!("{} = ", ty.declare(&name))
        };
        let pos = doc.start_of(expression);
        result.push(QuickFixOperation::new(
            iface,
            self.name(),
            -1,
            "Assign to Local Variable",
            perform_fn(move |ctx| {
                let mut cs = ChangeSet::new();
                cs.insert(pos, declaration.clone());
                ctx.apply_origin(cs)
            }),
        ));
    }
}

/// The call or `new` expression on the path that makes up a whole
/// expression statement. Chained calls (`a.b().c()`) resolve to the outermost.
fn whole_statement_call(doc: &Document, path: &[NodeId]) -> Option<NodeId> {
    for index in (1..path.len()).rev() {
        let node = path[index];
        match doc.kind(node) {
            NodeKind::CallExpression { .. } | NodeKind::NewExpression { .. } => {}
            kind if kind.is_statement() => return None,
            _ => continue,
        }
        match doc.kind(path[index - 1]) {
            NodeKind::ExpressionStatement {
                expression: Some(e),
                ..
            } if *e == node => return Some(node),
            NodeKind::MemberAccess { base, .. } if *base == node => continue,
            _ => return None,
        }
    }
    None
}

fn callee_name(doc: &Document, expression: NodeId) -> Option<&str> {
    match doc.kind(expression) {
        NodeKind::CallExpression { base, .. } => match doc.kind(*base) {
            NodeKind::IdExpression { name } => Some(doc.name_text(*name)),
            NodeKind::MemberAccess { member, .. } => Some(doc.name_text(*member)),
            _ => None,
        },
        NodeKind::NewExpression { type_id, .. } => {
            let specifiers = match doc.kind(*type_id) {
                NodeKind::TypeId { specifiers, .. } => specifiers,
                _ => return None,
            };
            specifiers.iter().find_map(|s| match doc.kind(*s) {
                NodeKind::NamedTypeSpecifier { name }
                | NodeKind::ElaboratedTypeSpecifier { name, .. } => Some(doc.name_text(*name)),
                _ => None,
            })
        }
        _ => None,
    }
}

/// `getSize` -> `size`, `toString` -> `string`, `compute` -> `localCompute`.
fn local_name(callee: &str) -> String {
    for prefix in ["get", "to"] {
        if let Some(rest) = callee.strip_prefix(prefix)
            && rest.starts_with(|c: char| c.is_ascii_uppercase())
        {
            let mut chars = rest.chars();
            if let Some(first) = chars.next() {
                return first.to_ascii_lowercase().to_string() + chars.as_str();
            }
        }
    }
    let mut chars = callee.chars();
    match chars.next() {
        Some(first) => format!("local{}{}", first.to_ascii_uppercase(), chars.as_str()),
        None => "local".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{assert_fix, assert_fix_with_config, assert_no_fix};

    const DESCRIPTION: &str = "Assign to Local Variable";

    #[test]
    fn free_function_call() {
        assert_fix(
            &AssignToLocalVariable,
            "int compute();\nvoid f() {\n    @compute();\n}\n",
            DESCRIPTION,
            "int compute();\nvoid f() {\n    auto localCompute = compute();\n}\n",
        );
    }

    #[test]
    fn getter_drops_prefix() {
        assert_fix(
            &AssignToLocalVariable,
            "struct W { int getSize(); };\nvoid f(W w) {\n    w.@getSize();\n}\n",
            DESCRIPTION,
            "struct W { int getSize(); };\nvoid f(W w) {\n    auto size = w.getSize();\n}\n",
        );
    }

    #[test]
    fn explicit_type_when_auto_is_off() {
        let config = FixConfig::default().with_option("UseAuto", serde_yml::Value::Bool(false));
        assert_fix_with_config(
            &AssignToLocalVariable,
            "struct W { int getSize(); };\nvoid f(W w) {\n    w.@getSize();\n}\n",
            DESCRIPTION,
            "struct W { int getSize(); };\nvoid f(W w) {\n    int size = w.getSize();\n}\n",
            &config,
        );
    }

    #[test]
    fn new_expression_names_after_type() {
        assert_fix(
            &AssignToLocalVariable,
            "struct Foo {};\nvoid f() {\n    @new Foo;\n}\n",
            DESCRIPTION,
            "struct Foo {};\nvoid f() {\n    auto localFoo = new Foo;\n}\n",
        );
    }

    #[test]
    fn name_avoids_existing_locals() {
        assert_fix(
            &AssignToLocalVariable,
            "int compute();\nvoid f(int localCompute) {\n    @compute();\n}\n",
            DESCRIPTION,
            "int compute();\nvoid f(int localCompute) {\n    auto localComputeX = compute();\n}\n",
        );
    }

    #[test]
    fn void_call_is_ignored() {
        assert_no_fix(&AssignToLocalVariable, "void run();\nvoid f() {\n    @run();\n}\n");
    }

    #[test]
    fn call_inside_expression_is_ignored() {
        assert_no_fix(
            &AssignToLocalVariable,
            "int compute();\nvoid f() {\n    int x = @compute();\n}\n",
        );
    }

    #[test]
    fn derives_names() {
        assert_eq!(local_name("getValue"), "value");
        assert_eq!(local_name("toString"), "string");
        assert_eq!(local_name("together"), "localTogether");
        assert_eq!(local_name("size"), "localSize");
    }
}
