use crate::changeset::ChangeSet;
use crate::fix::util::{ClassTarget, with_type};
use crate::fix::{
    Access, FixConfig, QuickFixFactory, QuickFixInterface, QuickFixOperation, perform_fn,
};
use crate::parse::Document;
use crate::parse::ast::{BinaryOp, NodeId, NodeKind, TokenIdx};
use crate::semantic::{FunctionInfo, Semantic, Type};

/// Declares a name that is assigned or called inside a function body but
/// declared nowhere.
///
/// * `x = rhs;` offers a local declaration and, in a member function, a
///   private data member.
/// * `obj.x = rhs;`, `this->x = rhs;` and `A::x = rhs;` add a data member to
///   the class of the object (static for `A::x`).
/// * `f(args)`, `obj.f(args)` and `A::f(args)` add a member function whose
///   parameter types come from the arguments and whose return type comes
///   from where the call is used.
/// * `m_x(init)` in a constructor's initializer list adds a private member.
///
/// The local declaration is spelled `auto x` unless `UseAuto` is off.
pub struct AddDeclarationForUndeclaredIdentifier;

/// How the name under the cursor is reached.
enum Subject {
    Plain,
    Object { base: NodeId, arrow: bool },
    Scoped(String),
}

enum MemberShape {
    Field(Type),
    Function {
        return_type: Type,
        parameters: Vec<Type>,
        is_const: bool,
    },
}

/// A member declaration to add to `target`.
struct MemberRequest {
    target: ClassTarget,
    access: Access,
    is_static: bool,
    name: String,
    shape: MemberShape,
}

impl MemberRequest {
    fn description(&self) -> String {
        match self.shape {
            MemberShape::Field(_) => format!("Add Class Member \"{}\"", self.name),
            MemberShape::Function { .. } => format!("Add Member Function \"{}\"", self.name),
        }
    }

    fn declaration(&self) -> String {
        let declared = match &self.shape {
            MemberShape::Field(ty) => ty.declare(&self.name),
            MemberShape::Function {
                return_type,
                parameters,
                is_const,
            } => {
                let parameters: Vec<String> = parameters.iter().map(ToString::to_string).collect();
                let suffix = if *is_const { " const" } else { "" };
                with_type(
                    &return_type.to_string(),
                    &format!("{}({}){suffix}", self.name, parameters.join(", ")),
                )
            }
        };
        let storage = if self.is_static { "static " } else { "" };
        format!("{storage}{declared};")
    }
}

/// What the matcher knows about the enclosing function.
struct Scope<'a> {
    doc: &'a Document,
    semantic: Semantic<'a>,
    function: &'a FunctionInfo,
    /// Class of a member function, when it could be found.
    owner: Option<ClassTarget>,
}

impl Scope<'_> {
    /// Type of `expr`, falling back to parameters for constructor
    /// initializers, which sit outside the scanned body.
    fn type_of(&self, expr: NodeId) -> Option<Type> {
        if let Some(ty) = self.semantic.type_of(expr, Some(self.function)) {
            return Some(ty.without_reference());
        }
        let name = match self.doc.kind(expr) {
            NodeKind::IdExpression { name } => self.doc.text_of(*name),
            _ => return None,
        };
        self.function
            .parameters()
            .find(|p| p.name == name)
            .map(|p| p.ty.without_reference())
    }

    /// Whether `name` resolves to a local, member, global, function,
    /// enumerator or type.
    fn declares(&self, name: &str) -> bool {
        self.function.locals.iter().any(|l| l.name == name)
            || self.owner.as_ref().is_some_and(|t| t.has_member(name))
            || self.semantic.model().globals.iter().any(|g| g.name == name)
            || !self.semantic.functions_named(name).is_empty()
            || self.semantic.enum_of_enumerator(name).is_some()
            || self.semantic.find_class(name).is_some()
    }

    fn is_static(&self) -> bool {
        if has_static_specifier(self.doc, self.function.definition) {
            return true;
        }
        self.owner.as_ref().is_some_and(|t| {
            t.class()
                .and_then(|c| c.method(&self.function.name))
                .is_some_and(|m| has_static_specifier(t.document(), m.declaration))
        })
    }

    fn is_owner(&self, target: &ClassTarget) -> bool {
        match (&self.owner, target.class()) {
            (Some(owner), Some(class)) => owner
                .class()
                .is_some_and(|o| o.qualified_name == class.qualified_name),
            _ => false,
        }
    }

    /// Class of the object in `obj.x` or `ptr->x`.
    fn class_of_object(&self, iface: &QuickFixInterface<'_>, base: NodeId, arrow: bool) -> Option<ClassTarget> {
        let ty = self.type_of(base)?;
        let class_ty = if arrow {
            if !ty.is_pointer() {
                return None;
            }
            ty.pointee()
        } else {
            ty
        };
        if !class_ty.ptr_ops.is_empty() {
            return None;
        }
        ClassTarget::locate(iface, &class_ty.lookup_name())
    }
}

impl QuickFixFactory for AddDeclarationForUndeclaredIdentifier {
    fn name(&self) -> &'static str {
        "Declaration/AddDeclarationForUndeclaredIdentifier"
    }

    fn match_at(
        &self,
        iface: &QuickFixInterface<'_>,
        config: &FixConfig,
        result: &mut Vec<QuickFixOperation>,
    ) {
        let doc = iface.document();
        let path = iface.path();
        let last = path.len() - 1;
        let name_node = iface.innermost();
        let token = match doc.kind(name_node) {
            NodeKind::SimpleName { token } if last >= 2 => *token,
            _ => return,
        };
        let name = doc.text_of_token(token).to_string();
        let definition = match iface.find_innermost(|k| matches!(k, NodeKind::FunctionDefinition { .. })) {
            Some((_, node)) => node,
            None => return,
        };
        let semantic = iface.semantic();
        let function = match semantic.function_for_definition(definition) {
            Some(f) => f,
            None => return,
        };
        let owner = function.owner_class();
        let scope = Scope {
            doc,
            semantic,
            function,
            owner: owner.as_deref().and_then(|o| ClassTarget::locate(iface, o)),
        };
        // Members of a class we cannot see might declare the name.
        if owner.is_some() && scope.owner.is_none() {
            return;
        }

        if let NodeKind::MemInitializer { name: n, initializer } = doc.kind(path[last - 1])
            && *n == name_node
        {
            if let Some(request) = member_initializer(&scope, &name, *initializer) {
                push_member(self, iface, request, result);
            }
            return;
        }

        let (expr_index, subject) = match doc.kind(path[last - 1]) {
            NodeKind::IdExpression { name: n } if *n == name_node => (last - 1, Subject::Plain),
            NodeKind::MemberAccess {
                base,
                arrow,
                member,
                ..
            } if *member == name_node => (
                last - 1,
                Subject::Object {
                    base: *base,
                    arrow: *arrow,
                },
            ),
            NodeKind::QualifiedName {
                qualifiers, name: n, ..
            } if *n == name_node
                && !qualifiers.is_empty()
                && last >= 3
                && matches!(doc.kind(path[last - 2]), NodeKind::IdExpression { .. }) =>
            {
                let class = qualifiers
                    .iter()
                    .map(|q| doc.text_of(*q))
                    .collect::<Vec<_>>()
                    .join("::");
                (last - 2, Subject::Scoped(class))
            }
            _ => return,
        };
        if expr_index == 0 {
            return;
        }
        let expr = path[expr_index];
        let context = path[expr_index - 1];

        match doc.kind(context) {
            NodeKind::CallExpression {
                base, arguments, ..
            } if *base == expr => {
                let return_type = match call_return_type(&scope, iface, expr_index - 1) {
                    Some(ty) => ty,
                    None => return,
                };
                let parameters = match arguments
                    .iter()
                    .map(|a| scope.type_of(*a))
                    .collect::<Option<Vec<_>>>()
                {
                    Some(p) => p,
                    None => return,
                };
                let request = |target: ClassTarget, access: Access, is_static: bool, is_const: bool| {
                    MemberRequest {
                        target,
                        access,
                        is_static,
                        name: name.clone(),
                        shape: MemberShape::Function {
                            return_type: return_type.clone(),
                            parameters: parameters.clone(),
                            is_const,
                        },
                    }
                };
                let request = match subject {
                    Subject::Plain => {
                        let target = match &scope.owner {
                            Some(t) if !scope.declares(&name) => t.clone(),
                            _ => return,
                        };
                        request(target, Access::Private, scope.is_static(), function.is_const)
                    }
                    Subject::Object { base, arrow } => {
                        let target = match scope.class_of_object(iface, base, arrow) {
                            Some(t) if !t.has_member(&name) => t,
                            _ => return,
                        };
                        let own = scope.is_owner(&target);
                        let access = if own { Access::Private } else { Access::Public };
                        request(target, access, own && scope.is_static(), own && function.is_const)
                    }
                    Subject::Scoped(class) => {
                        let target = match ClassTarget::locate(iface, &class) {
                            Some(t) if !t.has_member(&name) => t,
                            _ => return,
                        };
                        request(target, Access::Public, true, false)
                    }
                };
                push_member(self, iface, request, result);
            }
            NodeKind::BinaryExpression {
                left,
                op: BinaryOp::Assign,
                right,
                ..
            } if *left == expr => {
                let value_type = scope.type_of(*right);
                let field = |target: ClassTarget, access: Access, is_static: bool| {
                    value_type.clone().map(|ty| MemberRequest {
                        target,
                        access,
                        is_static,
                        name: name.clone(),
                        shape: MemberShape::Field(ty),
                    })
                };
                match subject {
                    Subject::Plain => {
                        if scope.declares(&name) {
                            return;
                        }
                        let declaration = if config.get_bool("UseAuto", true) {
                            Some(format!("auto {name}"))
                        } else {
                            value_type.as_ref().map(|ty| ty.declare(&name))
                        };
                        if let Some(declaration) = declaration {
                            push_local(self, iface, token, declaration, expr_index as i32 - 1, result);
                        }
                        if let Some(request) = scope
                            .owner
                            .clone()
                            .and_then(|t| field(t, Access::Private, scope.is_static()))
                        {
                            push_member(self, iface, request, result);
                        }
                    }
                    Subject::Object { base, arrow } => {
                        let target = match scope.class_of_object(iface, base, arrow) {
                            Some(t) if !t.has_member(&name) => t,
                            _ => return,
                        };
                        let own = scope.is_owner(&target);
                        let access = if own { Access::Private } else { Access::Public };
                        if let Some(request) = field(target, access, own && scope.is_static()) {
                            push_member(self, iface, request, result);
                        }
                    }
                    Subject::Scoped(class) => {
                        let target = match ClassTarget::locate(iface, &class) {
                            Some(t) if !t.has_member(&name) => t,
                            _ => return,
                        };
                        if let Some(request) = field(target, Access::Public, true) {
                            push_member(self, iface, request, result);
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

fn member_initializer(scope: &Scope<'_>, name: &str, initializer: NodeId) -> Option<MemberRequest> {
    let target = scope.owner.clone()?;
    if target.has_member(name) {
        return None;
    }
    let ty = match scope.doc.kind(initializer) {
        NodeKind::ExpressionList { expressions, .. } if expressions.len() == 1 => {
            scope.type_of(expressions[0])?
        }
        _ => return None,
    };
    Some(MemberRequest {
        target,
        access: Access::Private,
        is_static: false,
        name: name.to_string(),
        shape: MemberShape::Field(ty),
    })
}

/// Return type implied by where the call at `path[call_index]` is used:
/// `void` as a statement, the other operand's type in a binary expression,
/// the enclosing function's return type in a `return`, or the declared
/// type when it initializes a local.
fn call_return_type(scope: &Scope<'_>, iface: &QuickFixInterface<'_>, call_index: usize) -> Option<Type> {
    let doc = scope.doc;
    let path = iface.path();
    for index in (0..call_index).rev() {
        let node = path[index];
        match doc.kind(node) {
            NodeKind::ExpressionStatement { .. } => return Some(Type::named("void")),
            NodeKind::BinaryExpression { left, right, .. } => {
                let other = if iface.is_cursor_on(*left) { *right } else { *left };
                return scope.type_of(other);
            }
            NodeKind::ReturnStatement { .. } => return Some(scope.function.return_type.clone()),
            NodeKind::Declarator {
                initializer: Some(_),
                ..
            } => {
                return scope
                    .function
                    .locals
                    .iter()
                    .find(|l| l.declarator == node)
                    .map(|l| l.ty.clone());
            }
            NodeKind::CompoundStatement { .. } | NodeKind::CallExpression { .. } => return None,
            _ => {}
        }
    }
    None
}

fn has_static_specifier(doc: &Document, node: NodeId) -> bool {
    let specifiers = match doc.kind(node) {
        NodeKind::SimpleDeclaration { specifiers, .. }
        | NodeKind::FunctionDefinition { specifiers, .. } => specifiers,
        _ => return false,
    };
    specifiers.iter().any(|s| doc.text_of(*s) == "static")
}

fn push_local(
    fix: &AddDeclarationForUndeclaredIdentifier,
    iface: &QuickFixInterface<'_>,
    token: TokenIdx,
    declaration: String,
    priority: i32,
    result: &mut Vec<QuickFixOperation>,
) {
    let doc = iface.document();
    let start = doc.start_of_token(token);
    let end = doc.end_of_token(token);
    result.push(QuickFixOperation::new(
        iface,
        fix.name(),
        priority,
        "Add Local Declaration",
        perform_fn(move |ctx| {
            let mut cs = ChangeSet::new();
            cs.replace(start, end, declaration.clone());
            ctx.apply_origin(cs)
        }),
    ));
}

fn push_member(
    fix: &AddDeclarationForUndeclaredIdentifier,
    iface: &QuickFixInterface<'_>,
    request: MemberRequest,
    result: &mut Vec<QuickFixOperation>,
) {
    let description = request.description();
    let declaration = request.declaration();
    let MemberRequest { target, access, .. } = request;
    result.push(QuickFixOperation::new(
        iface,
        fix.name(),
        -1,
        description,
        perform_fn(move |ctx| target.declare(ctx, access, &declaration)),
    ));
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::fix::PresetInteraction;
    use crate::refactoring::MemoryStore;
    use crate::testutil::{
        assert_fix, assert_fix_with_config, assert_no_fix, descriptions, perform_in, run_fix,
    };

    const LOCAL: &str = "Add Local Declaration";

    #[test]
    fn assignment_declares_auto_local() {
        assert_fix(
            &AddDeclarationForUndeclaredIdentifier,
            "void f() {\n    int a = 1;\n    @b = a + 1;\n}\n",
            LOCAL,
            "void f() {\n    int a = 1;\n    auto b = a + 1;\n}\n",
        );
    }

    #[test]
    fn typed_local_without_auto() {
        let config = FixConfig::default().with_option("UseAuto", serde_yml::Value::Bool(false));
        assert_fix_with_config(
            &AddDeclarationForUndeclaredIdentifier,
            "void f() {\n    @label = \"on\";\n}\n",
            LOCAL,
            "void f() {\n    const char *label = \"on\";\n}\n",
            &config,
        );
    }

    #[test]
    fn declared_names_are_ignored() {
        assert_no_fix(
            &AddDeclarationForUndeclaredIdentifier,
            "void f() {\n    int b;\n    @b = 2;\n}\n",
        );
        assert_no_fix(
            &AddDeclarationForUndeclaredIdentifier,
            "int g;\nvoid f() {\n    @g = 2;\n}\n",
        );
        assert_no_fix(
            &AddDeclarationForUndeclaredIdentifier,
            "class C {\n    int m_value;\n    void set(int v) { @m_value = v; }\n};\n",
        );
    }

    #[test]
    fn right_hand_side_is_ignored() {
        assert_no_fix(
            &AddDeclarationForUndeclaredIdentifier,
            "void f() {\n    int b;\n    b = @c;\n}\n",
        );
    }

    #[test]
    fn member_function_offers_local_and_member() {
        let ops = run_fix(
            &AddDeclarationForUndeclaredIdentifier,
            "class C {\npublic:\n    void setValue(int v) { @m_value = v; }\n};\n",
        );
        assert_eq!(descriptions(&ops), vec![LOCAL, "Add Class Member \"m_value\""]);
    }

    #[test]
    fn implicit_member_is_private() {
        assert_fix(
            &AddDeclarationForUndeclaredIdentifier,
            "class C {\npublic:\n    void setValue(int v) { @m_value = v; }\n};\n",
            "Add Class Member \"m_value\"",
            "class C {\npublic:\n    void setValue(int v) { m_value = v; }\nprivate:\n    int m_value;\n};\n",
        );
    }

    #[test]
    fn static_function_adds_static_member() {
        assert_fix(
            &AddDeclarationForUndeclaredIdentifier,
            "class C {\npublic:\n    static void setValue(int v) { @m_value = v; }\n};\n",
            "Add Class Member \"m_value\"",
            "class C {\npublic:\n    static void setValue(int v) { m_value = v; }\nprivate:\n    static int m_value;\n};\n",
        );
    }

    #[test]
    fn explicit_this_member() {
        assert_fix(
            &AddDeclarationForUndeclaredIdentifier,
            "class C {\npublic:\n    void setValue(int v);\n};\nvoid C::setValue(int v) { this->@m_value = v; }\n",
            "Add Class Member \"m_value\"",
            "class C {\npublic:\n    void setValue(int v);\nprivate:\n    int m_value;\n};\nvoid C::setValue(int v) { this->m_value = v; }\n",
        );
    }

    #[test]
    fn member_of_other_struct_is_public() {
        assert_fix(
            &AddDeclarationForUndeclaredIdentifier,
            "struct S {\n\n};\nclass C {\npublic:\n    void setValue(int v) { m_s.@value = v; }\nprivate:\n    S m_s;\n};\n",
            "Add Class Member \"value\"",
            "struct S {\n\n    int value;\n};\nclass C {\npublic:\n    void setValue(int v) { m_s.value = v; }\nprivate:\n    S m_s;\n};\n",
        );
    }

    #[test]
    fn scoped_name_adds_static_member() {
        assert_fix(
            &AddDeclarationForUndeclaredIdentifier,
            "struct S {\n\n};\nclass C {\npublic:\n    void setValue(int v) { S::@value = v; }\n};\n",
            "Add Class Member \"value\"",
            "struct S {\n\n    static int value;\n};\nclass C {\npublic:\n    void setValue(int v) { S::value = v; }\n};\n",
        );
    }

    #[test]
    fn call_statement_adds_void_member_function() {
        assert_fix(
            &AddDeclarationForUndeclaredIdentifier,
            "class C {\npublic:\n    void setValue(int v);\n};\nvoid C::setValue(int v) { this->@setValueInternal(v); }\n",
            "Add Member Function \"setValueInternal\"",
            "class C {\npublic:\n    void setValue(int v);\nprivate:\n    void setValueInternal(int);\n};\nvoid C::setValue(int v) { this->setValueInternal(v); }\n",
        );
    }

    #[test]
    fn returned_call_takes_function_return_type() {
        assert_fix(
            &AddDeclarationForUndeclaredIdentifier,
            "class C {\npublic:\n    int total() const { return @sum(2, 3.5); }\n};\n",
            "Add Member Function \"sum\"",
            "class C {\npublic:\n    int total() const { return sum(2, 3.5); }\nprivate:\n    int sum(int, double) const;\n};\n",
        );
    }

    #[test]
    fn call_on_other_struct_is_public() {
        assert_fix(
            &AddDeclarationForUndeclaredIdentifier,
            "struct S {\n\n};\nclass C {\npublic:\n    void setValue(int v) { m_s.@store(v); }\nprivate:\n    S m_s;\n};\n",
            "Add Member Function \"store\"",
            "struct S {\n\n    void store(int);\n};\nclass C {\npublic:\n    void setValue(int v) { m_s.store(v); }\nprivate:\n    S m_s;\n};\n",
        );
    }

    #[test]
    fn free_function_call_is_ignored() {
        assert_no_fix(
            &AddDeclarationForUndeclaredIdentifier,
            "void f() {\n    @g(1);\n}\n",
        );
    }

    #[test]
    fn member_initializer_adds_private_member() {
        assert_fix(
            &AddDeclarationForUndeclaredIdentifier,
            "class C {\npublic:\n    C(int x) : @m_x(x) {}\nprivate:\n    int m_y;\n};\n",
            "Add Class Member \"m_x\"",
            "class C {\npublic:\n    C(int x) : m_x(x) {}\nprivate:\n    int m_x;\n    int m_y;\n};\n",
        );
    }

    #[test]
    fn existing_member_initializer_is_ignored() {
        assert_no_fix(
            &AddDeclarationForUndeclaredIdentifier,
            "class C {\npublic:\n    C(int x) : @m_x(x) {}\nprivate:\n    int m_x;\n};\n",
        );
    }

    #[test]
    fn member_lands_in_paired_header() {
        let store = MemoryStore::new();
        store.insert("c.h", "class C {\npublic:\n    void reset();\n};\n");
        let report = perform_in(
            &AddDeclarationForUndeclaredIdentifier,
            &FixConfig::default(),
            &store,
            "c.cpp",
            "#include \"c.h\"\n\nvoid C::reset() { @m_count = 0; }\n",
            "Add Class Member \"m_count\"",
            &PresetInteraction::default(),
        );
        assert_eq!(report.files_written(), vec!["c.h"]);
        assert_eq!(
            store.get(Path::new("c.h")).as_deref(),
            Some("class C {\npublic:\n    void reset();\nprivate:\n    int m_count;\n};\n")
        );
    }

    #[test]
    fn unseen_class_is_ignored() {
        assert_no_fix(
            &AddDeclarationForUndeclaredIdentifier,
            "void C::reset() { @m_count = 0; }\n",
        );
    }
}
