pub mod types;

pub use types::{PtrOp, Type, numeric_literal_type};

use crate::parse::Document;
use crate::parse::ast::{BinaryOp, NodeId, NodeKind, SyntaxTree, TokenIdx, UnaryOp};
use crate::parse::lexer::TokenKind;

/// A variable or parameter local to one function definition.
#[derive(Debug, Clone)]
pub struct Local {
    pub name: String,
    pub ty: Type,
    /// The declaration (simple declaration, condition or parameter) it comes from.
    pub declaration: NodeId,
    pub declarator: NodeId,
    pub name_token: TokenIdx,
    pub is_parameter: bool,
    /// Every id-expression token referring to this local, excluding the
    /// declaring token, in source order.
    pub uses: Vec<TokenIdx>,
}

impl Local {
    /// The declaring token followed by every use.
    pub fn occurrences(&self) -> impl Iterator<Item = TokenIdx> + '_ {
        std::iter::once(self.name_token).chain(self.uses.iter().copied())
    }
}

#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub definition: NodeId,
    pub declarator: NodeId,
    pub name: String,
    /// `A::B` in `void A::B::f()`, outermost first.
    pub qualifiers: Vec<String>,
    /// Qualified name of the class the definition is written inside, for
    /// inline member definitions.
    pub enclosing_class: Option<String>,
    pub return_type: Type,
    pub is_const: bool,
    pub is_variadic: bool,
    pub parameter_count: usize,
    /// Parameters first, then body locals in declaration order.
    pub locals: Vec<Local>,
    pub body: NodeId,
}

impl FunctionInfo {
    /// Class the function is a member of, written inline or qualified.
    pub fn owner_class(&self) -> Option<String> {
        match &self.enclosing_class {
            Some(class) => Some(class.clone()),
            None if !self.qualifiers.is_empty() => Some(self.qualifiers.join("::")),
            None => None,
        }
    }

    pub fn is_member(&self) -> bool {
        self.owner_class().is_some()
    }

    pub fn parameters(&self) -> impl Iterator<Item = &Local> {
        self.locals.iter().filter(|l| l.is_parameter)
    }

    pub fn local_for_token(&self, token: TokenIdx) -> Option<&Local> {
        self.locals
            .iter()
            .find(|l| l.name_token == token || l.uses.binary_search(&token).is_ok())
    }
}

/// A non-defining function declaration.
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub declaration: NodeId,
    pub declarator: NodeId,
    pub name: String,
    pub qualifiers: Vec<String>,
    pub enclosing_class: Option<String>,
    pub return_type: Type,
    pub is_const: bool,
    pub parameter_count: usize,
}

impl FunctionDecl {
    /// Class the declared function belongs to, from its enclosing class or
    /// its qualifiers.
    pub fn owner_class(&self) -> Option<String> {
        match &self.enclosing_class {
            Some(class) => Some(class.clone()),
            None if !self.qualifiers.is_empty() => Some(self.qualifiers.join("::")),
            None => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub ty: Type,
    pub declarator: NodeId,
}

#[derive(Debug, Clone)]
pub struct Method {
    pub name: String,
    pub return_type: Type,
    /// Declaration or inline definition inside the class body.
    pub declaration: NodeId,
}

#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub node: NodeId,
    pub name: String,
    pub qualified_name: String,
    pub is_struct: bool,
    pub fields: Vec<Variable>,
    pub methods: Vec<Method>,
}

impl ClassInfo {
    pub fn field(&self, name: &str) -> Option<&Variable> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct EnumInfo {
    pub node: NodeId,
    pub name: Option<String>,
    pub qualified_name: Option<String>,
    pub scoped: bool,
    /// Prefix enumerators are qualified with: the enclosing scope for
    /// unscoped enums, the enum itself for scoped ones.
    pub member_prefix: String,
    pub members: Vec<String>,
}

impl EnumInfo {
    pub fn qualified_members(&self) -> Vec<String> {
        self.members
            .iter()
            .map(|m| qualify(&self.member_prefix, m))
            .collect()
    }
}

fn qualify(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}::{name}")
    }
}

/// Symbol tables for one parsed document.
#[derive(Debug, Default)]
pub struct SemanticModel {
    pub functions: Vec<FunctionInfo>,
    pub declarations: Vec<FunctionDecl>,
    pub classes: Vec<ClassInfo>,
    pub enums: Vec<EnumInfo>,
    pub globals: Vec<Variable>,
}

impl SemanticModel {
    pub fn build(tree: &SyntaxTree, text: &str) -> Self {
        let mut builder = Builder {
            tree,
            text,
            model: SemanticModel::default(),
        };
        let mut scope = Vec::new();
        if let NodeKind::TranslationUnit { declarations } = tree.kind(tree.root()) {
            builder.visit_declarations(declarations, &mut scope, None);
        }
        tracing::trace!(
            functions = builder.model.functions.len(),
            classes = builder.model.classes.len(),
            enums = builder.model.enums.len(),
            "semantic model built"
        );
        builder.model
    }
}

struct Builder<'a> {
    tree: &'a SyntaxTree,
    text: &'a str,
    model: SemanticModel,
}

impl<'a> Builder<'a> {
    fn text_of(&self, id: NodeId) -> &'a str {
        &self.text[self.tree.start_of(id)..self.tree.end_of(id)]
    }

    fn token_text(&self, idx: TokenIdx) -> &'a str {
        &self.text[self.tree.start_of_token(idx)..self.tree.end_of_token(idx)]
    }

    fn visit_declarations(&mut self, decls: &[NodeId], scope: &mut Vec<String>, class: Option<&str>) {
        for &decl in decls {
            self.visit_declaration(decl, scope, class);
        }
    }

    fn visit_declaration(&mut self, decl: NodeId, scope: &mut Vec<String>, class: Option<&str>) {
        let tree = self.tree;
        match tree.kind(decl) {
            NodeKind::Namespace {
                name, declarations, ..
            } => {
                let pushed = name.map(|n| self.text_of(n).to_string());
                if let Some(name) = &pushed {
                    scope.push(name.clone());
                }
                self.visit_declarations(declarations, scope, None);
                if pushed.is_some() {
                    scope.pop();
                }
            }
            NodeKind::LinkageBody { declarations } => {
                self.visit_declarations(declarations, scope, class);
            }
            NodeKind::TemplateDeclaration {
                declaration: Some(inner),
            } => self.visit_declaration(*inner, scope, class),
            NodeKind::SimpleDeclaration {
                specifiers,
                declarators,
                ..
            } => {
                for &spec in specifiers {
                    self.record_specifier(spec, scope);
                }
                for &declarator in declarators {
                    self.record_declarator(decl, specifiers, declarator, class);
                }
            }
            NodeKind::FunctionDefinition {
                specifiers,
                declarator,
                body,
                ..
            } => {
                for &spec in specifiers {
                    self.record_specifier(spec, scope);
                }
                self.record_function(decl, specifiers, *declarator, *body, class);
            }
            _ => {}
        }
    }

    fn record_specifier(&mut self, spec: NodeId, scope: &mut Vec<String>) {
        let tree = self.tree;
        match tree.kind(spec) {
            NodeKind::ClassSpecifier {
                key, name, members, ..
            } => {
                let Some(name) = name.and_then(|n| tree.name_token(n)) else {
                    return;
                };
                let name = self.token_text(name).to_string();
                let qualified_name = qualify(&scope.join("::"), &name);
                self.model.classes.push(ClassInfo {
                    node: spec,
                    name: name.clone(),
                    qualified_name: qualified_name.clone(),
                    is_struct: self.token_text(*key) != "class",
                    fields: Vec::new(),
                    methods: Vec::new(),
                });
                scope.push(name);
                self.visit_declarations(members, scope, Some(&qualified_name));
                scope.pop();
            }
            NodeKind::EnumSpecifier {
                scoped,
                name,
                enumerators,
                ..
            } => {
                let name = name.map(|n| self.text_of(n).to_string());
                let enclosing = scope.join("::");
                let qualified_name = name.as_deref().map(|n| qualify(&enclosing, n));
                let member_prefix = if *scoped {
                    qualified_name.clone().unwrap_or_default()
                } else {
                    enclosing
                };
                let members = enumerators
                    .iter()
                    .filter_map(|e| match tree.kind(*e) {
                        NodeKind::Enumerator { name, .. } => Some(self.token_text(*name).to_string()),
                        _ => None,
                    })
                    .collect();
                self.model.enums.push(EnumInfo {
                    node: spec,
                    name,
                    qualified_name,
                    scoped: *scoped,
                    member_prefix,
                    members,
                });
            }
            _ => {}
        }
    }

    fn record_declarator(
        &mut self,
        decl: NodeId,
        specifiers: &[NodeId],
        declarator: NodeId,
        class: Option<&str>,
    ) {
        let tree = self.tree;
        let Some(name) = tree.declarator_name(declarator) else {
            return;
        };
        let ty = type_of_declaration(tree, self.text, specifiers, Some(declarator));
        let (qualifiers, unqualified) = self.split_name(name);
        if let Some(function) = tree.function_declarator(declarator) {
            let return_type = Type::new(&ty.specifiers, ty.ptr_ops.clone());
            let (is_const, parameter_count, _) = self.function_shape(function);
            let enclosing_class = class.map(str::to_string);
            if let Some(class) = class {
                if let Some(info) = self.class_mut(class) {
                    info.methods.push(Method {
                        name: unqualified.clone(),
                        return_type: return_type.clone(),
                        declaration: decl,
                    });
                }
            }
            self.model.declarations.push(FunctionDecl {
                declaration: decl,
                declarator,
                name: unqualified,
                qualifiers,
                enclosing_class,
                return_type,
                is_const,
                parameter_count,
            });
            return;
        }
        let variable = Variable {
            name: unqualified,
            ty,
            declarator,
        };
        match class {
            Some(class) => {
                if let Some(info) = self.class_mut(class) {
                    info.fields.push(variable);
                }
            }
            None if qualifiers.is_empty() => self.model.globals.push(variable),
            None => {}
        }
    }

    fn record_function(
        &mut self,
        definition: NodeId,
        specifiers: &[NodeId],
        declarator: NodeId,
        body: NodeId,
        class: Option<&str>,
    ) {
        let tree = self.tree;
        let Some(name) = tree.declarator_name(declarator) else {
            return;
        };
        let (qualifiers, unqualified) = self.split_name(name);
        let return_type = type_of_declaration(tree, self.text, specifiers, Some(declarator));
        let Some(function) = tree.function_declarator(declarator) else {
            return;
        };
        let (is_const, parameter_count, is_variadic) = self.function_shape(function);

        let mut scanner = LocalScanner::new(tree, self.text);
        scanner.push_scope();
        if let NodeKind::FunctionDeclarator { parameters, .. } = tree.kind(function) {
            for &param in parameters {
                scanner.declare_parameter(param);
            }
        }
        scanner.visit(body);
        scanner.pop_scope();

        if let Some(class) = class {
            if let Some(info) = self.class_mut(class) {
                info.methods.push(Method {
                    name: unqualified.clone(),
                    return_type: return_type.clone(),
                    declaration: definition,
                });
            }
        }
        self.model.functions.push(FunctionInfo {
            definition,
            declarator,
            name: unqualified,
            qualifiers,
            enclosing_class: class.map(str::to_string),
            return_type,
            is_const,
            is_variadic,
            parameter_count,
            locals: scanner.finish(),
            body,
        });
    }

    fn class_mut(&mut self, qualified_name: &str) -> Option<&mut ClassInfo> {
        self.model
            .classes
            .iter_mut()
            .rev()
            .find(|c| c.qualified_name == qualified_name)
    }

    /// `(qualifiers, name)` for a possibly qualified declarator name.
    fn split_name(&self, name: NodeId) -> (Vec<String>, String) {
        let tree = self.tree;
        let mut parts: Vec<String> = tree
            .name_parts(name)
            .into_iter()
            .map(|part| match tree.name_token(part) {
                Some(token) if !matches!(tree.kind(part), NodeKind::DestructorName { .. }) => {
                    self.token_text(token).to_string()
                }
                _ => self.text_of(part).to_string(),
            })
            .collect();
        let last = parts.pop().unwrap_or_default();
        (parts, last)
    }

    /// `(is_const, parameter_count, is_variadic)` of a function postfix.
    fn function_shape(&self, function: NodeId) -> (bool, usize, bool) {
        match self.tree.kind(function) {
            NodeKind::FunctionDeclarator {
                parameters,
                ellipsis,
                cv_qualifiers,
                ..
            } => {
                let is_const = cv_qualifiers.iter().any(|t| self.token_text(*t) == "const");
                let is_void = parameters.len() == 1
                    && self.text_of(parameters[0]).trim() == "void";
                let count = if is_void { 0 } else { parameters.len() };
                (is_const, count, ellipsis.is_some())
            }
            _ => (false, 0, false),
        }
    }
}

/// Specifier text of a declaration, with class and enum specifiers reduced
/// to their names.
pub(crate) fn specifier_text(tree: &SyntaxTree, text: &str, specifiers: &[NodeId]) -> String {
    let span = |id: NodeId| &text[tree.start_of(id)..tree.end_of(id)];
    let token = |idx: TokenIdx| &text[tree.start_of_token(idx)..tree.end_of_token(idx)];
    let mut words = Vec::new();
    for &spec in specifiers {
        match tree.kind(spec) {
            NodeKind::SimpleSpecifier { token: t } => words.push(token(*t).to_string()),
            NodeKind::ClassSpecifier { name, .. } | NodeKind::EnumSpecifier { name, .. } => {
                if let Some(name) = name {
                    words.push(span(*name).to_string());
                }
            }
            _ => words.push(span(spec).to_string()),
        }
    }
    types::normalize_spaces(&words.join(" "))
}

/// Pointer and reference operators of a declarator, outermost first. An
/// array postfix counts as one more pointer.
pub(crate) fn declarator_ptr_ops(tree: &SyntaxTree, declarator: NodeId) -> Vec<PtrOp> {
    let NodeKind::Declarator {
        ptr_ops, postfix, ..
    } = tree.kind(declarator)
    else {
        return Vec::new();
    };
    let mut ops: Vec<PtrOp> = ptr_ops
        .iter()
        .filter_map(|op| match tree.kind(*op) {
            NodeKind::PointerOperator { .. } => Some(PtrOp::Pointer),
            NodeKind::ReferenceOperator { rvalue: false, .. } => Some(PtrOp::Reference),
            NodeKind::ReferenceOperator { rvalue: true, .. } => Some(PtrOp::RValueReference),
            _ => None,
        })
        .collect();
    for post in postfix {
        if matches!(tree.kind(*post), NodeKind::ArrayDeclarator { .. }) {
            ops.push(PtrOp::Pointer);
        }
    }
    ops
}

pub(crate) fn type_of_declaration(
    tree: &SyntaxTree,
    text: &str,
    specifiers: &[NodeId],
    declarator: Option<NodeId>,
) -> Type {
    let specifiers = specifier_text(tree, text, specifiers);
    let ptr_ops = declarator.map_or_else(Vec::new, |d| declarator_ptr_ops(tree, d));
    Type {
        specifiers,
        ptr_ops,
    }
}

fn type_of_type_id(tree: &SyntaxTree, text: &str, type_id: NodeId) -> Option<Type> {
    match tree.kind(type_id) {
        NodeKind::TypeId {
            specifiers,
            declarator,
        } => Some(type_of_declaration(tree, text, specifiers, *declarator)),
        _ => None,
    }
}

/// Resolves id-expressions to the locals of one function body, honouring
/// block scopes and points of declaration.
struct LocalScanner<'a> {
    tree: &'a SyntaxTree,
    text: &'a str,
    locals: Vec<Local>,
    scopes: Vec<Vec<usize>>,
}

impl<'a> LocalScanner<'a> {
    fn new(tree: &'a SyntaxTree, text: &'a str) -> Self {
        Self {
            tree,
            text,
            locals: Vec::new(),
            scopes: Vec::new(),
        }
    }

    fn finish(mut self) -> Vec<Local> {
        for local in &mut self.locals {
            local.uses.sort_unstable();
        }
        self.locals
    }

    fn push_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn token_text(&self, idx: TokenIdx) -> &'a str {
        &self.text[self.tree.start_of_token(idx)..self.tree.end_of_token(idx)]
    }

    fn resolve(&self, name: &str) -> Option<usize> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .copied()
            .find(|&i| self.locals[i].name == name)
    }

    fn declare(
        &mut self,
        declaration: NodeId,
        specifiers: &[NodeId],
        declarator: NodeId,
        is_parameter: bool,
    ) {
        let tree = self.tree;
        let Some(name) = tree.declarator_name(declarator) else {
            return;
        };
        let NodeKind::SimpleName { token } = tree.kind(name) else {
            return;
        };
        let ty = type_of_declaration(tree, self.text, specifiers, Some(declarator));
        let idx = self.locals.len();
        self.locals.push(Local {
            name: self.token_text(*token).to_string(),
            ty,
            declaration,
            declarator,
            name_token: *token,
            is_parameter,
            uses: Vec::new(),
        });
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(idx);
        }
    }

    fn declare_parameter(&mut self, param: NodeId) {
        if let NodeKind::ParameterDeclaration {
            specifiers,
            declarator: Some(declarator),
            ..
        } = self.tree.kind(param)
        {
            self.declare(param, specifiers, *declarator, true);
        }
    }

    /// Declares the name, then visits array sizes and the initializer, which
    /// already see it.
    fn declare_and_visit(&mut self, declaration: NodeId, specifiers: &[NodeId], declarator: NodeId) {
        self.declare(declaration, specifiers, declarator, false);
        if let NodeKind::Declarator {
            postfix,
            initializer,
            ..
        } = self.tree.kind(declarator)
        {
            for &post in postfix {
                self.visit(post);
            }
            if let Some(init) = initializer {
                self.visit(*init);
            }
        }
    }

    fn record_use(&mut self, token: TokenIdx) {
        let name = self.token_text(token);
        if let Some(idx) = self.resolve(name) {
            self.locals[idx].uses.push(token);
        }
    }

    fn visit_scoped(&mut self, id: NodeId) {
        self.push_scope();
        for child in self.tree.children(id) {
            self.visit(child);
        }
        self.pop_scope();
    }

    fn visit(&mut self, id: NodeId) {
        let tree = self.tree;
        match tree.kind(id) {
            NodeKind::CompoundStatement { .. }
            | NodeKind::IfStatement { .. }
            | NodeKind::WhileStatement { .. }
            | NodeKind::ForStatement { .. }
            | NodeKind::SwitchStatement { .. } => self.visit_scoped(id),
            NodeKind::CatchClause { declaration, body } => {
                self.push_scope();
                if let Some(param) = declaration {
                    self.declare_parameter(*param);
                }
                self.visit(*body);
                self.pop_scope();
            }
            NodeKind::RangeBasedForStatement {
                specifiers,
                declarator,
                range,
                statement,
                ..
            } => {
                self.push_scope();
                self.visit(*range);
                self.declare(id, specifiers, *declarator, false);
                if let Some(statement) = statement {
                    self.visit(*statement);
                }
                self.pop_scope();
            }
            NodeKind::LambdaExpression { parameters, body } => {
                self.push_scope();
                for &param in parameters {
                    self.declare_parameter(param);
                }
                self.visit(*body);
                self.pop_scope();
            }
            NodeKind::SimpleDeclaration {
                specifiers,
                declarators,
                ..
            } => {
                for &declarator in declarators {
                    self.declare_and_visit(id, specifiers, declarator);
                }
            }
            NodeKind::Condition {
                specifiers,
                declarator,
            } => self.declare_and_visit(id, specifiers, *declarator),
            NodeKind::IdExpression { name } => {
                if let NodeKind::SimpleName { token } = tree.kind(*name) {
                    self.record_use(*token);
                }
            }
            NodeKind::MemberAccess { base, .. } => self.visit(*base),
            // `sizeof(x)` parses as a type-id when `x` is a plain name.
            NodeKind::SizeofExpression { operand } => match tree.kind(*operand) {
                NodeKind::TypeId {
                    specifiers,
                    declarator: None,
                } if specifiers.len() == 1 => {
                    if let NodeKind::NamedTypeSpecifier { name } = tree.kind(specifiers[0]) {
                        if let NodeKind::SimpleName { token } = tree.kind(*name) {
                            self.record_use(*token);
                        }
                    }
                }
                _ => self.visit(*operand),
            },
            NodeKind::TypeId { .. }
            | NodeKind::NamedTypeSpecifier { .. }
            | NodeKind::ClassSpecifier { .. }
            | NodeKind::EnumSpecifier { .. }
            | NodeKind::FunctionDefinition { .. } => {}
            _ => {
                for child in tree.children(id) {
                    self.visit(child);
                }
            }
        }
    }
}

/// Semantic queries over one document.
#[derive(Debug, Clone, Copy)]
pub struct Semantic<'d> {
    doc: &'d Document,
    model: &'d SemanticModel,
}

impl<'d> Semantic<'d> {
    pub fn new(doc: &'d Document, model: &'d SemanticModel) -> Self {
        Self { doc, model }
    }

    pub fn model(&self) -> &'d SemanticModel {
        self.model
    }

    pub fn functions(&self) -> &'d [FunctionInfo] {
        &self.model.functions
    }

    /// The innermost function definition containing `offset`.
    pub fn function_at(&self, offset: usize) -> Option<&'d FunctionInfo> {
        self.model
            .functions
            .iter()
            .filter(|f| {
                self.doc.start_of(f.definition) <= offset && offset < self.doc.end_of(f.definition)
            })
            .min_by_key(|f| self.doc.end_of(f.definition) - self.doc.start_of(f.definition))
    }

    pub fn function_for_definition(&self, definition: NodeId) -> Option<&'d FunctionInfo> {
        self.model
            .functions
            .iter()
            .find(|f| f.definition == definition)
    }

    /// The local named `name` visible at `offset` inside `function`.
    pub fn local_at(
        &self,
        function: &'d FunctionInfo,
        name: &str,
        offset: usize,
    ) -> Option<&'d Local> {
        let token = self.doc.significant_token_at(offset)?;
        function
            .local_for_token(token)
            .filter(|l| l.name == name)
    }

    pub fn local_for_token(&self, token: TokenIdx) -> Option<(&'d FunctionInfo, &'d Local)> {
        let function = self.function_at(self.doc.start_of_token(token))?;
        let local = function.local_for_token(token)?;
        Some((function, local))
    }

    /// Class by qualified name, falling back to the last name component.
    pub fn find_class(&self, name: &str) -> Option<&'d ClassInfo> {
        let name = name.trim_start_matches("::");
        let unqualified = name.rsplit("::").next().unwrap_or(name);
        self.model
            .classes
            .iter()
            .find(|c| c.qualified_name == name)
            .or_else(|| self.model.classes.iter().find(|c| c.name == unqualified))
    }

    pub fn class_of(&self, function: &FunctionInfo) -> Option<&'d ClassInfo> {
        self.find_class(&function.owner_class()?)
    }

    /// Enum named by a type, matched on its qualified or plain name.
    pub fn find_enum(&self, ty: &Type) -> Option<&'d EnumInfo> {
        if ty.ptr_ops.contains(&PtrOp::Pointer) {
            return None;
        }
        let name = ty.lookup_name();
        let name = name.trim_start_matches("::");
        let unqualified = name.rsplit("::").next().unwrap_or(name);
        self.model
            .enums
            .iter()
            .find(|e| e.qualified_name.as_deref() == Some(name))
            .or_else(|| {
                self.model
                    .enums
                    .iter()
                    .find(|e| e.name.as_deref() == Some(unqualified))
            })
    }

    /// The enum declaring an enumerator spelled `name` (qualified or not).
    pub fn enum_of_enumerator(&self, name: &str) -> Option<&'d EnumInfo> {
        let name = name.trim_start_matches("::");
        let unqualified = name.rsplit("::").next().unwrap_or(name);
        self.model.enums.iter().find(|e| {
            e.members.iter().any(|m| m == unqualified)
                && (name == unqualified && !e.scoped
                    || e
                        .qualified_members()
                        .iter()
                        .any(|q| q == name || q.ends_with(&format!("::{name}"))))
        })
    }

    /// Return types of every function called `name`, definitions first.
    pub fn functions_named(&self, name: &str) -> Vec<Type> {
        let definitions = self
            .model
            .functions
            .iter()
            .filter(|f| f.name == name)
            .map(|f| f.return_type.clone());
        let declarations = self
            .model
            .declarations
            .iter()
            .filter(|d| d.name == name)
            .map(|d| d.return_type.clone());
        definitions.chain(declarations).collect()
    }

    /// Declarations matching a definition by name, owner class and arity.
    pub fn declarations_of(&self, function: &FunctionInfo) -> Vec<&'d FunctionDecl> {
        let owner = function.owner_class();
        self.model
            .declarations
            .iter()
            .filter(|d| {
                d.name == function.name
                    && d.parameter_count == function.parameter_count
                    && owner_matches(d.owner_class().as_deref(), owner.as_deref())
            })
            .collect()
    }

    /// Definitions matching a declaration by name, owner class and arity.
    pub fn definitions_of(&self, declaration: &FunctionDecl) -> Vec<&'d FunctionInfo> {
        let owner = declaration.owner_class();
        self.model
            .functions
            .iter()
            .filter(|f| {
                f.name == declaration.name
                    && f.parameter_count == declaration.parameter_count
                    && owner_matches(owner.as_deref(), f.owner_class().as_deref())
            })
            .collect()
    }

    pub fn declaration_for_node(&self, declaration: NodeId) -> Option<&'d FunctionDecl> {
        self.model
            .declarations
            .iter()
            .find(|d| d.declaration == declaration)
    }

    /// Best-effort static type of an expression.
    pub fn type_of(&self, expr: NodeId, function: Option<&FunctionInfo>) -> Option<Type> {
        let doc = self.doc;
        let tree = doc.tree();
        match tree.kind(expr) {
            NodeKind::NumericLiteral { token } => {
                let is_float = tree.token(*token).kind == TokenKind::FloatLiteral;
                Some(numeric_literal_type(doc.text_of_token(*token), is_float))
            }
            NodeKind::CharLiteral { token } => {
                Some(Type::named(char_type(doc.text_of_token(*token))))
            }
            NodeKind::StringLiteral => {
                let base = char_type(doc.text_of(expr));
                Some(Type::new(&format!("const {base}"), vec![PtrOp::Pointer]))
            }
            NodeKind::BoolLiteral { .. } => Some(Type::named("bool")),
            NodeKind::NullptrLiteral => Some(Type::named("std::nullptr_t")),
            NodeKind::IdExpression { name } => self.type_of_name(*name, function),
            NodeKind::NestedExpression { expression, .. } => self.type_of(*expression, function),
            NodeKind::PostIncrDecr { base, .. } => self.type_of(*base, function),
            NodeKind::MemberAccess {
                base,
                arrow,
                member,
                ..
            } => {
                let class = self.class_of_object(*base, *arrow, function)?;
                class.field(doc.name_text(*member)).map(|f| f.ty.clone())
            }
            NodeKind::CallExpression { base, .. } => self.type_of_call(*base, function),
            NodeKind::UnaryExpression { op, operand, .. } => match op {
                UnaryOp::Deref => {
                    let ty = self.type_of(*operand, function)?.without_reference();
                    ty.is_pointer().then(|| ty.pointee())
                }
                UnaryOp::AddressOf => Some(
                    self.type_of(*operand, function)?
                        .without_reference()
                        .pointer_to(),
                ),
                UnaryOp::Not => Some(Type::named("bool")),
                _ => self.type_of(*operand, function),
            },
            NodeKind::BinaryExpression {
                left, op, right, ..
            } => {
                if op.is_comparison() || op.is_logical() {
                    return Some(Type::named("bool"));
                }
                if *op == BinaryOp::Comma {
                    return self.type_of(*right, function);
                }
                self.type_of(*left, function)
                    .or_else(|| self.type_of(*right, function))
            }
            NodeKind::ConditionalExpression {
                then_expr,
                else_expr,
                ..
            } => self
                .type_of(*then_expr, function)
                .or_else(|| self.type_of(*else_expr, function)),
            NodeKind::ArrayAccess { base, .. } => {
                let ty = self.type_of(*base, function)?.without_reference();
                ty.is_pointer().then(|| ty.pointee())
            }
            NodeKind::CastExpression { type_id, .. }
            | NodeKind::CppCastExpression { type_id, .. } => {
                type_of_type_id(tree, doc.text(), *type_id)
            }
            NodeKind::NewExpression { type_id, .. } => {
                Some(type_of_type_id(tree, doc.text(), *type_id)?.pointer_to())
            }
            NodeKind::ThisExpression => {
                let class = function?.owner_class()?;
                Some(Type::new(&class, vec![PtrOp::Pointer]))
            }
            NodeKind::SizeofExpression { .. } => Some(Type::named("unsigned long")),
            NodeKind::TypeConstruction { specifier, .. } => {
                Some(Type::named(doc.text_of(*specifier)))
            }
            _ => None,
        }
    }

    fn type_of_name(&self, name: NodeId, function: Option<&FunctionInfo>) -> Option<Type> {
        let doc = self.doc;
        let tree = doc.tree();
        if let NodeKind::QualifiedName { .. } = tree.kind(name) {
            let spelled = doc.text_of(name).split_whitespace().collect::<String>();
            return self
                .enum_of_enumerator(&spelled)
                .and_then(|e| e.qualified_name.as_deref())
                .map(Type::named);
        }
        let token = tree.name_token(name)?;
        let text = doc.text_of_token(token);
        if let Some(function) = function {
            if let Some(local) = function.local_for_token(token) {
                return Some(local.ty.clone());
            }
            if let Some(field) = self.class_of(function).and_then(|c| c.field(text)) {
                return Some(field.ty.clone());
            }
        }
        if let Some(global) = self.model.globals.iter().find(|g| g.name == text) {
            return Some(global.ty.clone());
        }
        self.enum_of_enumerator(text)
            .and_then(|e| e.qualified_name.as_deref())
            .map(Type::named)
    }

    fn class_of_object(
        &self,
        object: NodeId,
        arrow: bool,
        function: Option<&FunctionInfo>,
    ) -> Option<&'d ClassInfo> {
        let ty = self.type_of(object, function)?.without_reference();
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
        self.find_class(&class_ty.lookup_name())
    }

    fn type_of_call(&self, callee: NodeId, function: Option<&FunctionInfo>) -> Option<Type> {
        let doc = self.doc;
        let tree = doc.tree();
        match tree.kind(callee) {
            NodeKind::IdExpression { name } => {
                let text = doc.name_text(*name);
                if let Some(method) = function
                    .and_then(|f| self.class_of(f))
                    .and_then(|c| c.method(text))
                {
                    return Some(method.return_type.clone());
                }
                if let Some(ty) = self.functions_named(text).into_iter().next() {
                    return Some(ty);
                }
                let class = self.find_class(doc.text_of(*name))?;
                Some(Type::named(&class.qualified_name))
            }
            NodeKind::MemberAccess {
                base,
                arrow,
                member,
                ..
            } => {
                let class = self.class_of_object(*base, *arrow, function)?;
                class
                    .method(doc.name_text(*member))
                    .map(|m| m.return_type.clone())
            }
            NodeKind::NestedExpression { expression, .. } => self.type_of_call(*expression, function),
            _ => None,
        }
    }
}

fn owner_matches(decl_owner: Option<&str>, def_owner: Option<&str>) -> bool {
    match (decl_owner, def_owner) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b || a.ends_with(&format!("::{b}")) || b.ends_with(&format!("::{a}")),
        _ => false,
    }
}

fn char_type(spelling: &str) -> &'static str {
    if spelling.starts_with("u8") {
        "char8_t"
    } else if spelling.starts_with('u') {
        "char16_t"
    } else if spelling.starts_with('U') {
        "char32_t"
    } else if spelling.starts_with('L') {
        "wchar_t"
    } else {
        "char"
    }
}
