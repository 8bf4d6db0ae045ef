//! Arena syntax tree for the C++ subset the parser understands.
//!
//! Nodes are addressed by [`NodeId`] handles and record the first and last
//! (inclusive) token they cover, so every node maps back to a text span
//! through the token stream.

use super::lexer::Token;

pub type TokenIdx = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Comma,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    ShlAssign,
    ShrAssign,
    LogicalOr,
    LogicalAnd,
    BitOr,
    BitXor,
    BitAnd,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Spaceship,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    PtrMem,
}

impl BinaryOp {
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            BinaryOp::Assign
                | BinaryOp::AddAssign
                | BinaryOp::SubAssign
                | BinaryOp::MulAssign
                | BinaryOp::DivAssign
                | BinaryOp::RemAssign
                | BinaryOp::AndAssign
                | BinaryOp::OrAssign
                | BinaryOp::XorAssign
                | BinaryOp::ShlAssign
                | BinaryOp::ShrAssign
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::LogicalAnd | BinaryOp::LogicalOr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    PreIncrement,
    PreDecrement,
    Deref,
    AddressOf,
    Plus,
    Minus,
    Not,
    BitNot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    TranslationUnit {
        declarations: Vec<NodeId>,
    },
    Namespace {
        name: Option<NodeId>,
        lbrace: TokenIdx,
        declarations: Vec<NodeId>,
        rbrace: Option<TokenIdx>,
    },
    /// `extern "C" { ... }`
    LinkageBody {
        declarations: Vec<NodeId>,
    },
    TemplateDeclaration {
        declaration: Option<NodeId>,
    },
    /// Tokens kept verbatim: using-directives, aliases, `static_assert`,
    /// `typeid(...)` and similar constructs no fix inspects.
    Opaque,
    EmptyDeclaration,
    AccessDeclaration {
        access: TokenIdx,
        colon: TokenIdx,
    },
    SimpleDeclaration {
        specifiers: Vec<NodeId>,
        declarators: Vec<NodeId>,
        semicolon: Option<TokenIdx>,
    },
    FunctionDefinition {
        specifiers: Vec<NodeId>,
        declarator: NodeId,
        ctor_initializer: Option<NodeId>,
        body: NodeId,
    },
    CtorInitializer {
        colon: TokenIdx,
        initializers: Vec<NodeId>,
    },
    MemInitializer {
        name: NodeId,
        initializer: NodeId,
    },

    SimpleSpecifier {
        token: TokenIdx,
    },
    NamedTypeSpecifier {
        name: NodeId,
    },
    ElaboratedTypeSpecifier {
        key: TokenIdx,
        name: NodeId,
    },
    DecltypeSpecifier,
    ClassSpecifier {
        key: TokenIdx,
        name: Option<NodeId>,
        lbrace: TokenIdx,
        members: Vec<NodeId>,
        rbrace: Option<TokenIdx>,
    },
    EnumSpecifier {
        key: TokenIdx,
        scoped: bool,
        name: Option<NodeId>,
        lbrace: TokenIdx,
        enumerators: Vec<NodeId>,
        rbrace: Option<TokenIdx>,
    },
    Enumerator {
        name: TokenIdx,
        value: Option<NodeId>,
    },

    Declarator {
        ptr_ops: Vec<NodeId>,
        core: Option<NodeId>,
        postfix: Vec<NodeId>,
        equal: Option<TokenIdx>,
        initializer: Option<NodeId>,
    },
    PointerOperator {
        star: TokenIdx,
    },
    ReferenceOperator {
        amp: TokenIdx,
        rvalue: bool,
    },
    DeclaratorId {
        name: NodeId,
    },
    NestedDeclarator {
        declarator: NodeId,
    },
    FunctionDeclarator {
        lparen: TokenIdx,
        parameters: Vec<NodeId>,
        ellipsis: Option<TokenIdx>,
        rparen: TokenIdx,
        /// `const`/`volatile` qualifiers after the parameter list.
        cv_qualifiers: Vec<TokenIdx>,
        trailing_return: Option<NodeId>,
    },
    ArrayDeclarator {
        size: Option<NodeId>,
    },
    ParameterDeclaration {
        specifiers: Vec<NodeId>,
        declarator: Option<NodeId>,
        equal: Option<TokenIdx>,
        default_value: Option<NodeId>,
    },
    TypeId {
        specifiers: Vec<NodeId>,
        declarator: Option<NodeId>,
    },

    SimpleName {
        token: TokenIdx,
    },
    TemplateId {
        token: TokenIdx,
        arguments: Vec<NodeId>,
    },
    DestructorName {
        token: TokenIdx,
    },
    OperatorName,
    QualifiedName {
        global: bool,
        qualifiers: Vec<NodeId>,
        name: NodeId,
    },

    CompoundStatement {
        lbrace: TokenIdx,
        statements: Vec<NodeId>,
        rbrace: Option<TokenIdx>,
    },
    DeclarationStatement {
        declaration: NodeId,
    },
    ExpressionStatement {
        expression: Option<NodeId>,
        semicolon: Option<TokenIdx>,
    },
    IfStatement {
        if_token: TokenIdx,
        lparen: TokenIdx,
        condition: NodeId,
        rparen: Option<TokenIdx>,
        statement: Option<NodeId>,
        else_token: Option<TokenIdx>,
        else_statement: Option<NodeId>,
    },
    /// A declaration used as a condition: `if (Foo *f = get())`.
    Condition {
        specifiers: Vec<NodeId>,
        declarator: NodeId,
    },
    WhileStatement {
        while_token: TokenIdx,
        lparen: TokenIdx,
        condition: NodeId,
        rparen: Option<TokenIdx>,
        statement: Option<NodeId>,
    },
    DoStatement {
        do_token: TokenIdx,
        statement: NodeId,
        while_token: Option<TokenIdx>,
        expression: Option<NodeId>,
        semicolon: Option<TokenIdx>,
    },
    ForStatement {
        for_token: TokenIdx,
        lparen: TokenIdx,
        initializer: NodeId,
        condition: Option<NodeId>,
        semicolon: Option<TokenIdx>,
        expression: Option<NodeId>,
        rparen: Option<TokenIdx>,
        statement: Option<NodeId>,
    },
    RangeBasedForStatement {
        for_token: TokenIdx,
        lparen: TokenIdx,
        specifiers: Vec<NodeId>,
        declarator: NodeId,
        colon: TokenIdx,
        range: NodeId,
        rparen: Option<TokenIdx>,
        statement: Option<NodeId>,
    },
    SwitchStatement {
        switch_token: TokenIdx,
        lparen: TokenIdx,
        condition: NodeId,
        rparen: Option<TokenIdx>,
        statement: Option<NodeId>,
    },
    CaseStatement {
        case_token: TokenIdx,
        expression: NodeId,
        colon: Option<TokenIdx>,
        statement: Option<NodeId>,
    },
    DefaultStatement {
        default_token: TokenIdx,
        statement: Option<NodeId>,
    },
    LabeledStatement {
        label: TokenIdx,
        statement: Option<NodeId>,
    },
    BreakStatement,
    ContinueStatement,
    ReturnStatement {
        expression: Option<NodeId>,
    },
    GotoStatement,
    TryBlockStatement {
        body: NodeId,
        handlers: Vec<NodeId>,
    },
    CatchClause {
        declaration: Option<NodeId>,
        body: NodeId,
    },

    NumericLiteral {
        token: TokenIdx,
    },
    CharLiteral {
        token: TokenIdx,
    },
    /// One or more adjacent string tokens.
    StringLiteral,
    BoolLiteral {
        token: TokenIdx,
    },
    NullptrLiteral,
    ThisExpression,
    IdExpression {
        name: NodeId,
    },
    BinaryExpression {
        left: NodeId,
        op: BinaryOp,
        /// First and last token of the operator (`>>` spans two `>` tokens).
        op_first: TokenIdx,
        op_last: TokenIdx,
        right: NodeId,
    },
    ConditionalExpression {
        condition: NodeId,
        then_expr: NodeId,
        else_expr: NodeId,
    },
    UnaryExpression {
        op: UnaryOp,
        op_token: TokenIdx,
        operand: NodeId,
    },
    PostIncrDecr {
        base: NodeId,
        op_token: TokenIdx,
        increment: bool,
    },
    CallExpression {
        base: NodeId,
        lparen: TokenIdx,
        arguments: Vec<NodeId>,
        rparen: Option<TokenIdx>,
    },
    MemberAccess {
        base: NodeId,
        access_token: TokenIdx,
        arrow: bool,
        member: NodeId,
    },
    ArrayAccess {
        base: NodeId,
        index: Option<NodeId>,
    },
    NewExpression {
        new_token: TokenIdx,
        type_id: NodeId,
        initializer: Option<NodeId>,
    },
    DeleteExpression {
        delete_token: TokenIdx,
        operand: NodeId,
    },
    CastExpression {
        type_id: NodeId,
        operand: NodeId,
    },
    CppCastExpression {
        cast_token: TokenIdx,
        type_id: NodeId,
        operand: NodeId,
    },
    SizeofExpression {
        operand: NodeId,
    },
    TypeConstruction {
        specifier: NodeId,
        initializer: NodeId,
    },
    /// `(a, b)` used as an initializer.
    ExpressionList {
        lparen: TokenIdx,
        expressions: Vec<NodeId>,
        rparen: Option<TokenIdx>,
    },
    BracedInitializer {
        lbrace: TokenIdx,
        expressions: Vec<NodeId>,
        rbrace: Option<TokenIdx>,
    },
    NestedExpression {
        lparen: TokenIdx,
        expression: NodeId,
        rparen: Option<TokenIdx>,
    },
    LambdaExpression {
        parameters: Vec<NodeId>,
        body: NodeId,
    },
    ThrowExpression {
        operand: Option<NodeId>,
    },
    Error,
}

impl NodeKind {
    /// Child handles in source order.
    pub fn children(&self) -> Vec<NodeId> {
        use NodeKind::*;
        let mut out = Vec::new();
        let opt = |out: &mut Vec<NodeId>, id: &Option<NodeId>| {
            if let Some(id) = id {
                out.push(*id);
            }
        };
        match self {
            TranslationUnit { declarations }
            | LinkageBody { declarations } => out.extend(declarations),
            Namespace {
                name, declarations, ..
            } => {
                opt(&mut out, name);
                out.extend(declarations);
            }
            TemplateDeclaration { declaration } => opt(&mut out, declaration),
            SimpleDeclaration {
                specifiers,
                declarators,
                ..
            } => {
                out.extend(specifiers);
                out.extend(declarators);
            }
            FunctionDefinition {
                specifiers,
                declarator,
                ctor_initializer,
                body,
            } => {
                out.extend(specifiers);
                out.push(*declarator);
                opt(&mut out, ctor_initializer);
                out.push(*body);
            }
            CtorInitializer { initializers, .. } => out.extend(initializers),
            MemInitializer { name, initializer } => {
                out.push(*name);
                out.push(*initializer);
            }
            NamedTypeSpecifier { name } | ElaboratedTypeSpecifier { name, .. } => out.push(*name),
            ClassSpecifier { name, members, .. } => {
                opt(&mut out, name);
                out.extend(members);
            }
            EnumSpecifier {
                name, enumerators, ..
            } => {
                opt(&mut out, name);
                out.extend(enumerators);
            }
            Enumerator { value, .. } => opt(&mut out, value),
            Declarator {
                ptr_ops,
                core,
                postfix,
                initializer,
                ..
            } => {
                out.extend(ptr_ops);
                opt(&mut out, core);
                out.extend(postfix);
                opt(&mut out, initializer);
            }
            DeclaratorId { name } => out.push(*name),
            NestedDeclarator { declarator } => out.push(*declarator),
            FunctionDeclarator {
                parameters,
                trailing_return,
                ..
            } => {
                out.extend(parameters);
                opt(&mut out, trailing_return);
            }
            ArrayDeclarator { size } => opt(&mut out, size),
            ParameterDeclaration {
                specifiers,
                declarator,
                default_value,
                ..
            } => {
                out.extend(specifiers);
                opt(&mut out, declarator);
                opt(&mut out, default_value);
            }
            TypeId {
                specifiers,
                declarator,
            } => {
                out.extend(specifiers);
                opt(&mut out, declarator);
            }
            TemplateId { arguments, .. } => out.extend(arguments),
            QualifiedName {
                qualifiers, name, ..
            } => {
                out.extend(qualifiers);
                out.push(*name);
            }
            CompoundStatement { statements, .. } => out.extend(statements),
            DeclarationStatement { declaration } => out.push(*declaration),
            ExpressionStatement { expression, .. } => opt(&mut out, expression),
            IfStatement {
                condition,
                statement,
                else_statement,
                ..
            } => {
                out.push(*condition);
                opt(&mut out, statement);
                opt(&mut out, else_statement);
            }
            Condition {
                specifiers,
                declarator,
            } => {
                out.extend(specifiers);
                out.push(*declarator);
            }
            WhileStatement {
                condition,
                statement,
                ..
            }
            | SwitchStatement {
                condition,
                statement,
                ..
            } => {
                out.push(*condition);
                opt(&mut out, statement);
            }
            DoStatement {
                statement,
                expression,
                ..
            } => {
                out.push(*statement);
                opt(&mut out, expression);
            }
            ForStatement {
                initializer,
                condition,
                expression,
                statement,
                ..
            } => {
                out.push(*initializer);
                opt(&mut out, condition);
                opt(&mut out, expression);
                opt(&mut out, statement);
            }
            RangeBasedForStatement {
                specifiers,
                declarator,
                range,
                statement,
                ..
            } => {
                out.extend(specifiers);
                out.push(*declarator);
                out.push(*range);
                opt(&mut out, statement);
            }
            CaseStatement {
                expression,
                statement,
                ..
            } => {
                out.push(*expression);
                opt(&mut out, statement);
            }
            DefaultStatement { statement, .. } | LabeledStatement { statement, .. } => {
                opt(&mut out, statement)
            }
            ReturnStatement { expression } => opt(&mut out, expression),
            TryBlockStatement { body, handlers } => {
                out.push(*body);
                out.extend(handlers);
            }
            CatchClause { declaration, body } => {
                opt(&mut out, declaration);
                out.push(*body);
            }
            IdExpression { name } => out.push(*name),
            BinaryExpression { left, right, .. } => {
                out.push(*left);
                out.push(*right);
            }
            ConditionalExpression {
                condition,
                then_expr,
                else_expr,
            } => {
                out.push(*condition);
                out.push(*then_expr);
                out.push(*else_expr);
            }
            UnaryExpression { operand, .. } => out.push(*operand),
            PostIncrDecr { base, .. } => out.push(*base),
            CallExpression {
                base, arguments, ..
            } => {
                out.push(*base);
                out.extend(arguments);
            }
            MemberAccess { base, member, .. } => {
                out.push(*base);
                out.push(*member);
            }
            ArrayAccess { base, index } => {
                out.push(*base);
                opt(&mut out, index);
            }
            NewExpression {
                type_id,
                initializer,
                ..
            } => {
                out.push(*type_id);
                opt(&mut out, initializer);
            }
            DeleteExpression { operand, .. } => out.push(*operand),
            CastExpression { type_id, operand } | CppCastExpression { type_id, operand, .. } => {
                out.push(*type_id);
                out.push(*operand);
            }
            SizeofExpression { operand } => out.push(*operand),
            TypeConstruction {
                specifier,
                initializer,
            } => {
                out.push(*specifier);
                out.push(*initializer);
            }
            ExpressionList { expressions, .. } | BracedInitializer { expressions, .. } => {
                out.extend(expressions)
            }
            NestedExpression { expression, .. } => out.push(*expression),
            LambdaExpression { parameters, body } => {
                out.extend(parameters);
                out.push(*body);
            }
            ThrowExpression { operand } => opt(&mut out, operand),
            Opaque
            | EmptyDeclaration
            | AccessDeclaration { .. }
            | SimpleSpecifier { .. }
            | DecltypeSpecifier
            | PointerOperator { .. }
            | ReferenceOperator { .. }
            | SimpleName { .. }
            | DestructorName { .. }
            | OperatorName
            | BreakStatement
            | ContinueStatement
            | GotoStatement
            | NumericLiteral { .. }
            | CharLiteral { .. }
            | StringLiteral
            | BoolLiteral { .. }
            | NullptrLiteral
            | ThisExpression
            | Error => {}
        }
        out
    }

    pub fn is_statement(&self) -> bool {
        use NodeKind::*;
        matches!(
            self,
            CompoundStatement { .. }
                | DeclarationStatement { .. }
                | ExpressionStatement { .. }
                | IfStatement { .. }
                | WhileStatement { .. }
                | DoStatement { .. }
                | ForStatement { .. }
                | RangeBasedForStatement { .. }
                | SwitchStatement { .. }
                | CaseStatement { .. }
                | DefaultStatement { .. }
                | LabeledStatement { .. }
                | BreakStatement
                | ContinueStatement
                | ReturnStatement { .. }
                | GotoStatement
                | TryBlockStatement { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub first_token: TokenIdx,
    /// Inclusive.
    pub last_token: TokenIdx,
}

#[derive(Debug, Clone)]
pub struct SyntaxTree {
    pub(crate) tokens: Vec<Token>,
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
    pub(crate) text_len: usize,
}

impl SyntaxTree {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.kind(id).children()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token(&self, idx: TokenIdx) -> &Token {
        &self.tokens[idx]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The root spans the whole text; every other node spans its tokens.
    pub fn start_of(&self, id: NodeId) -> usize {
        if id == self.root {
            return 0;
        }
        self.tokens[self.node(id).first_token].start
    }

    pub fn end_of(&self, id: NodeId) -> usize {
        if id == self.root {
            return self.text_len;
        }
        self.tokens[self.node(id).last_token].end
    }

    pub fn start_of_token(&self, idx: TokenIdx) -> usize {
        self.tokens[idx].start
    }

    pub fn end_of_token(&self, idx: TokenIdx) -> usize {
        self.tokens[idx].end
    }

    /// `id` and all of its descendants in pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            let mut children = self.children(next);
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// Root-to-innermost chain of nodes whose `[start, end)` span contains
    /// `offset`.
    pub fn path_to(&self, offset: usize) -> Vec<NodeId> {
        let mut path = vec![self.root];
        let mut current = self.root;
        'descend: loop {
            for child in self.children(current) {
                if self.start_of(child) <= offset && offset < self.end_of(child) {
                    path.push(child);
                    current = child;
                    continue 'descend;
                }
            }
            break;
        }
        path
    }

    /// Index of the first non-trivia token whose span ends after `offset`.
    pub fn token_at(&self, offset: usize) -> Option<TokenIdx> {
        let idx = self.tokens.partition_point(|t| t.end <= offset);
        let token = self.tokens.get(idx)?;
        (token.start <= offset).then_some(idx)
    }

    /// The chain of `SimpleName` handles making up a (possibly qualified) name.
    pub fn name_parts(&self, name: NodeId) -> Vec<NodeId> {
        match self.kind(name) {
            NodeKind::QualifiedName {
                qualifiers, name, ..
            } => {
                let mut parts = qualifiers.clone();
                parts.push(*name);
                parts
            }
            _ => vec![name],
        }
    }

    /// The token naming an unqualified name node, if it has one.
    pub fn name_token(&self, name: NodeId) -> Option<TokenIdx> {
        match self.kind(name) {
            NodeKind::SimpleName { token }
            | NodeKind::TemplateId { token, .. }
            | NodeKind::DestructorName { token } => Some(*token),
            NodeKind::QualifiedName { name, .. } => self.name_token(*name),
            _ => None,
        }
    }

    /// The innermost declarator-id name of a declarator, looking through
    /// nested declarators.
    pub fn declarator_name(&self, declarator: NodeId) -> Option<NodeId> {
        match self.kind(declarator) {
            NodeKind::Declarator { core, .. } => {
                let core = (*core)?;
                match self.kind(core) {
                    NodeKind::DeclaratorId { name } => Some(*name),
                    NodeKind::NestedDeclarator { declarator } => self.declarator_name(*declarator),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// The function postfix of a declarator such as `f(int a) const`.
    pub fn function_declarator(&self, declarator: NodeId) -> Option<NodeId> {
        let NodeKind::Declarator { core, postfix, .. } = self.kind(declarator) else {
            return None;
        };
        if let Some(first) = postfix.first() {
            if matches!(self.kind(*first), NodeKind::FunctionDeclarator { .. }) {
                return Some(*first);
            }
        }
        match core.map(|c| self.kind(c)) {
            Some(NodeKind::NestedDeclarator { declarator }) => {
                self.function_declarator(*declarator)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub offset: usize,
    pub message: String,
}
