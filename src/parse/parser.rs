//! Recursive-descent parser producing a [`SyntaxTree`].
//!
//! The grammar is a pragmatic C++ subset. Declaration-versus-expression
//! ambiguities are settled by tentative parsing: a declaration is tried
//! first and the arena is truncated back to a checkpoint when it fails.
//! A call such as `f(*x);` on a name already declared in scope is taken as
//! an expression unless `f` names a type.
//! Errors never abort the parse; the parser records them and resynchronizes
//! at the next `;` or closing brace.

use std::collections::HashSet;

use super::ast::{BinaryOp, Node, NodeId, NodeKind, ParseError, SyntaxTree, TokenIdx, UnaryOp};
use super::lexer::{Punct, Token, TokenKind};

const MAX_DEPTH: usize = 128;

const TYPE_KEYWORDS: &[&str] = &[
    "auto", "bool", "char", "char16_t", "char32_t", "char8_t", "double", "float", "int", "long",
    "short", "signed", "unsigned", "void", "wchar_t",
];

const SPECIFIER_KEYWORDS: &[&str] = &[
    "const",
    "consteval",
    "constexpr",
    "constinit",
    "explicit",
    "extern",
    "friend",
    "inline",
    "mutable",
    "register",
    "static",
    "thread_local",
    "typedef",
    "virtual",
    "volatile",
];

pub fn is_type_keyword(word: &str) -> bool {
    TYPE_KEYWORDS.contains(&word)
}

/// Parse `source`, whose tokens have already been produced by the lexer.
pub fn parse(source: &str, tokens: Vec<Token>) -> (SyntaxTree, Vec<ParseError>) {
    let (root, nodes, errors) = {
        let mut parser = Parser::new(source, &tokens);
        let root = parser.translation_unit();
        (root, parser.nodes, parser.errors)
    };
    let tree = SyntaxTree {
        tokens,
        nodes,
        root,
        text_len: source.len(),
    };
    (tree, errors)
}

/// Names the file introduces as types, found by a flat token scan.
fn scan_type_names<'a>(source: &'a str, tokens: &[Token], significant: &[TokenIdx]) -> HashSet<&'a str> {
    let text = |i: TokenIdx| &source[tokens[i].start..tokens[i].end];
    let ident_at = |n: usize| {
        significant
            .get(n)
            .copied()
            .filter(|&i| tokens[i].kind == TokenKind::Identifier)
    };
    let keyword_at = |n: usize| {
        significant
            .get(n)
            .copied()
            .filter(|&i| tokens[i].kind == TokenKind::Keyword)
            .map(text)
    };

    let mut names = HashSet::new();
    for n in 0..significant.len() {
        match keyword_at(n) {
            Some("class" | "struct" | "union" | "typename") => {
                if let Some(i) = ident_at(n + 1) {
                    names.insert(text(i));
                }
            }
            Some("enum") => {
                let skip = usize::from(matches!(keyword_at(n + 1), Some("class" | "struct")));
                if let Some(i) = ident_at(n + 1 + skip) {
                    names.insert(text(i));
                }
            }
            Some("using") => {
                let is_alias = significant
                    .get(n + 2)
                    .is_some_and(|&i| tokens[i].kind == TokenKind::Punct(Punct::Eq));
                if let (Some(i), true) = (ident_at(n + 1), is_alias) {
                    names.insert(text(i));
                }
            }
            Some("typedef") => {
                let mut last = None;
                for m in n + 1..significant.len() {
                    if tokens[significant[m]].kind == TokenKind::Punct(Punct::Semicolon) {
                        break;
                    }
                    if let Some(i) = ident_at(m) {
                        last = Some(i);
                    }
                }
                if let Some(i) = last {
                    names.insert(text(i));
                }
            }
            _ => {}
        }
    }
    names
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclContext {
    Namespace,
    Class,
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CoreRule {
    Required,
    Optional,
    Forbidden,
}

#[derive(Debug, Clone, Copy)]
struct DeclaratorMode {
    core: CoreRule,
    initializer: bool,
    function_postfix: bool,
    context: DeclContext,
}

struct Checkpoint {
    pos: usize,
    nodes: usize,
    errors: usize,
}

struct Parser<'a> {
    source: &'a str,
    tokens: &'a [Token],
    /// Indices of non-trivia tokens; `pos` walks this list.
    significant: Vec<TokenIdx>,
    pos: usize,
    nodes: Vec<Node>,
    errors: Vec<ParseError>,
    /// Set while parsing template arguments, where `>` closes the list.
    no_gt: bool,
    depth: usize,
    /// Positions of `<` tokens that already failed to open an argument list.
    failed_angles: HashSet<usize>,
    /// Names introduced by `class`/`struct`/`union`/`enum`/`typename`,
    /// `typedef` and alias declarations anywhere in the file.
    type_names: HashSet<&'a str>,
    /// Names declared by committed block declarations and parameters.
    declared_names: HashSet<&'a str>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, tokens: &'a [Token]) -> Self {
        let significant = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.is_trivia())
            .map(|(i, _)| i)
            .collect::<Vec<_>>();
        let type_names = scan_type_names(source, tokens, &significant);
        Self {
            source,
            tokens,
            significant,
            pos: 0,
            nodes: Vec::new(),
            errors: Vec::new(),
            no_gt: false,
            depth: 0,
            failed_angles: HashSet::new(),
            type_names,
            declared_names: HashSet::new(),
        }
    }

    // ── Token cursor ─────────────────────────────────────────────────────

    fn at_end(&self) -> bool {
        self.pos >= self.significant.len()
    }

    fn cur(&self) -> Option<TokenIdx> {
        self.nth(0)
    }

    fn nth(&self, n: usize) -> Option<TokenIdx> {
        self.significant.get(self.pos + n).copied()
    }

    fn kind_at(&self, n: usize) -> Option<TokenKind> {
        self.nth(n).map(|i| self.tokens[i].kind)
    }

    fn text(&self, idx: TokenIdx) -> &'a str {
        let t = &self.tokens[idx];
        &self.source[t.start..t.end]
    }

    fn is_punct_at(&self, n: usize, punct: Punct) -> bool {
        self.kind_at(n) == Some(TokenKind::Punct(punct))
    }

    fn at(&self, punct: Punct) -> bool {
        self.is_punct_at(0, punct)
    }

    fn keyword_at(&self, n: usize) -> Option<&'a str> {
        let idx = self.nth(n)?;
        (self.tokens[idx].kind == TokenKind::Keyword).then(|| self.text(idx))
    }

    fn at_kw(&self, kw: &str) -> bool {
        self.keyword_at(0) == Some(kw)
    }

    fn at_identifier(&self) -> bool {
        self.kind_at(0) == Some(TokenKind::Identifier)
    }

    fn at_contextual(&self, word: &str) -> bool {
        self.at_identifier() && self.cur().is_some_and(|i| self.text(i) == word)
    }

    fn bump(&mut self) -> TokenIdx {
        let idx = self.significant[self.pos];
        self.pos += 1;
        idx
    }

    fn bump_n(&mut self, count: usize) -> (TokenIdx, TokenIdx) {
        let first = self.bump();
        let mut last = first;
        for _ in 1..count {
            last = self.bump();
        }
        (first, last)
    }

    fn eat(&mut self, punct: Punct) -> Option<TokenIdx> {
        self.at(punct).then(|| self.bump())
    }

    fn eat_kw(&mut self, kw: &str) -> Option<TokenIdx> {
        self.at_kw(kw).then(|| self.bump())
    }

    fn expect(&mut self, punct: Punct, what: &str) -> Option<TokenIdx> {
        let found = self.eat(punct);
        if found.is_none() {
            self.error(format!("expected {what}"));
        }
        found
    }

    fn adjacent(&self, a: TokenIdx, b: TokenIdx) -> bool {
        self.tokens[a].end == self.tokens[b].start
    }

    fn error(&mut self, message: impl Into<String>) {
        let offset = self
            .cur()
            .map_or(self.source.len(), |i| self.tokens[i].start);
        self.errors.push(ParseError {
            offset,
            message: message.into(),
        });
    }

    fn mark(&self) -> Checkpoint {
        Checkpoint {
            pos: self.pos,
            nodes: self.nodes.len(),
            errors: self.errors.len(),
        }
    }

    fn reset(&mut self, cp: Checkpoint) {
        self.pos = cp.pos;
        self.nodes.truncate(cp.nodes);
        self.errors.truncate(cp.errors);
    }

    fn alloc(&mut self, kind: NodeKind, first_token: TokenIdx, last_token: TokenIdx) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            first_token,
            last_token,
        });
        id
    }

    /// Allocate a node spanning `first` through the last consumed token.
    fn finish(&mut self, kind: NodeKind, first: TokenIdx) -> NodeId {
        let last = self
            .pos
            .checked_sub(1)
            .and_then(|p| self.significant.get(p))
            .copied()
            .unwrap_or(first)
            .max(first);
        self.alloc(kind, first, last)
    }

    fn first_of(&self, id: NodeId) -> TokenIdx {
        self.nodes[id.index()].first_token
    }

    fn kind_of(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    /// Consume a bracketed group starting at the current opening token.
    fn skip_balanced(&mut self) -> Option<TokenIdx> {
        let mut depth = 0usize;
        while let Some(idx) = self.cur() {
            self.bump();
            match self.tokens[idx].kind {
                TokenKind::Punct(Punct::LParen | Punct::LBracket | Punct::LBrace) => depth += 1,
                TokenKind::Punct(Punct::RParen | Punct::RBracket | Punct::RBrace) => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Some(idx);
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn skip_angle_balanced(&mut self) {
        let mut depth = 0usize;
        while let Some(idx) = self.cur() {
            match self.tokens[idx].kind {
                TokenKind::Punct(Punct::Lt) => {
                    depth += 1;
                    self.bump();
                }
                TokenKind::Punct(Punct::Gt) => {
                    self.bump();
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return;
                    }
                }
                TokenKind::Punct(Punct::LParen) => {
                    self.skip_balanced();
                }
                TokenKind::Punct(Punct::Semicolon | Punct::LBrace) => return,
                _ => {
                    self.bump();
                }
            }
        }
    }

    fn skip_attributes(&mut self) {
        loop {
            if self.at(Punct::LBracket) && self.is_punct_at(1, Punct::LBracket) {
                self.skip_balanced();
            } else if self.at_kw("alignas") && self.is_punct_at(1, Punct::LParen) {
                self.bump();
                self.skip_balanced();
            } else {
                return;
            }
        }
    }

    /// Skip to the end of a broken construct and cover it with an error node.
    fn recover(&mut self) -> NodeId {
        let first = match self.cur() {
            Some(idx) => idx,
            None => {
                let last = self.significant.last().copied().unwrap_or(0);
                return self.alloc(NodeKind::Error, last, last);
            }
        };
        self.error("unexpected token");
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(idx) = self.cur() {
            match self.tokens[idx].kind {
                TokenKind::Punct(Punct::LBrace | Punct::LParen | Punct::LBracket) => {
                    depth += 1;
                    self.bump();
                }
                TokenKind::Punct(closer @ (Punct::RBrace | Punct::RParen | Punct::RBracket)) => {
                    if depth == 0 {
                        if self.pos == start {
                            self.bump();
                        }
                        break;
                    }
                    depth -= 1;
                    self.bump();
                    if depth == 0 && closer == Punct::RBrace {
                        break;
                    }
                }
                TokenKind::Punct(Punct::Semicolon) => {
                    self.bump();
                    if depth == 0 {
                        break;
                    }
                }
                _ => {
                    self.bump();
                }
            }
        }
        self.finish(NodeKind::Error, first)
    }

    // ── Declarations ─────────────────────────────────────────────────────

    fn translation_unit(&mut self) -> NodeId {
        let mut declarations = Vec::new();
        while !self.at_end() {
            self.declaration_or_recover(DeclContext::Namespace, &mut declarations);
        }
        let last = self.significant.last().copied().unwrap_or(0);
        self.alloc(NodeKind::TranslationUnit { declarations }, 0, last)
    }

    fn declaration_or_recover(&mut self, cx: DeclContext, out: &mut Vec<NodeId>) {
        let cp = self.mark();
        match self.declaration(cx) {
            Some(decl) => out.push(decl),
            None => {
                self.reset(cp);
                out.push(self.recover());
            }
        }
    }

    fn declaration(&mut self, cx: DeclContext) -> Option<NodeId> {
        self.depth += 1;
        let result = if self.depth > MAX_DEPTH {
            self.error("nesting too deep");
            None
        } else {
            self.declaration_inner(cx)
        };
        self.depth -= 1;
        result
    }

    fn declaration_inner(&mut self, cx: DeclContext) -> Option<NodeId> {
        let first = self.cur()?;
        if self.at(Punct::Semicolon) {
            self.bump();
            return Some(self.alloc(NodeKind::EmptyDeclaration, first, first));
        }
        if cx == DeclContext::Class
            && matches!(self.keyword_at(0), Some("public" | "private" | "protected"))
        {
            let access = self.bump();
            if self.at_identifier() && self.is_punct_at(1, Punct::Colon) {
                self.bump();
            }
            let colon = self.expect(Punct::Colon, "':' after access specifier")?;
            return Some(self.finish(NodeKind::AccessDeclaration { access, colon }, first));
        }
        match self.keyword_at(0) {
            Some("namespace") => return self.namespace(first),
            Some("inline") if self.keyword_at(1) == Some("namespace") => {
                self.bump();
                return self.namespace(first);
            }
            Some("using" | "static_assert") => return Some(self.opaque_statement(first)),
            Some("template") => return self.template_declaration(first, cx),
            Some("extern")
                if self.kind_at(1) == Some(TokenKind::StringLiteral)
                    && self.is_punct_at(2, Punct::LBrace) =>
            {
                return self.linkage_body(first);
            }
            _ => {}
        }
        self.simple_declaration(cx)
    }

    fn opaque_statement(&mut self, first: TokenIdx) -> NodeId {
        while let Some(idx) = self.cur() {
            match self.tokens[idx].kind {
                TokenKind::Punct(Punct::Semicolon) => {
                    self.bump();
                    break;
                }
                TokenKind::Punct(Punct::LParen | Punct::LBrace | Punct::LBracket) => {
                    self.skip_balanced();
                }
                TokenKind::Punct(Punct::RBrace) => break,
                _ => {
                    self.bump();
                }
            }
        }
        self.finish(NodeKind::Opaque, first)
    }

    fn namespace(&mut self, first: TokenIdx) -> Option<NodeId> {
        self.bump();
        self.skip_attributes();
        let name = if self.at_identifier() || self.at(Punct::ColonColon) {
            Some(self.name(false)?)
        } else {
            None
        };
        if self.at(Punct::Eq) {
            return Some(self.opaque_statement(first));
        }
        let lbrace = self.expect(Punct::LBrace, "'{' after namespace")?;
        let mut declarations = Vec::new();
        while !self.at_end() && !self.at(Punct::RBrace) {
            self.declaration_or_recover(DeclContext::Namespace, &mut declarations);
        }
        let rbrace = self.expect(Punct::RBrace, "'}' closing namespace");
        Some(self.finish(
            NodeKind::Namespace {
                name,
                lbrace,
                declarations,
                rbrace,
            },
            first,
        ))
    }

    fn linkage_body(&mut self, first: TokenIdx) -> Option<NodeId> {
        self.bump_n(3);
        let mut declarations = Vec::new();
        while !self.at_end() && !self.at(Punct::RBrace) {
            self.declaration_or_recover(DeclContext::Namespace, &mut declarations);
        }
        self.expect(Punct::RBrace, "'}' closing linkage block");
        Some(self.finish(NodeKind::LinkageBody { declarations }, first))
    }

    fn template_declaration(&mut self, first: TokenIdx, cx: DeclContext) -> Option<NodeId> {
        self.bump();
        if self.at(Punct::Lt) {
            self.skip_angle_balanced();
        }
        let declaration = Some(self.declaration(cx)?);
        Some(self.finish(NodeKind::TemplateDeclaration { declaration }, first))
    }

    fn is_type_specifier(&self, id: NodeId) -> bool {
        match self.kind_of(id) {
            NodeKind::SimpleSpecifier { token } => is_type_keyword(self.text(*token)),
            NodeKind::NamedTypeSpecifier { .. }
            | NodeKind::ElaboratedTypeSpecifier { .. }
            | NodeKind::DecltypeSpecifier
            | NodeKind::ClassSpecifier { .. }
            | NodeKind::EnumSpecifier { .. } => true,
            _ => false,
        }
    }

    fn simple_declaration(&mut self, cx: DeclContext) -> Option<NodeId> {
        let first = self.cur()?;
        let (mut specifiers, has_type) = self.decl_specifiers(cx)?;
        if cx == DeclContext::Block && !has_type {
            return None;
        }

        // A lone type name directly followed by `(` outside function bodies
        // names a constructor, destructor or out-of-line operator.
        let mut preset_core = None;
        if cx != DeclContext::Block && self.at(Punct::LParen) {
            let type_specs = specifiers
                .iter()
                .filter(|s| self.is_type_specifier(**s))
                .count();
            if let Some(&last) = specifiers.last() {
                if type_specs == 1 {
                    if let NodeKind::NamedTypeSpecifier { name } = *self.kind_of(last) {
                        let node = &self.nodes[last.index()];
                        let (f, l) = (node.first_token, node.last_token);
                        specifiers.pop();
                        preset_core = Some(self.alloc(NodeKind::DeclaratorId { name }, f, l));
                    }
                }
            }
        }

        if preset_core.is_none() && self.at(Punct::Semicolon) {
            if specifiers.is_empty() {
                return None;
            }
            let semicolon = Some(self.bump());
            return Some(self.finish(
                NodeKind::SimpleDeclaration {
                    specifiers,
                    declarators: Vec::new(),
                    semicolon,
                },
                first,
            ));
        }

        let mode = DeclaratorMode {
            core: CoreRule::Required,
            initializer: true,
            function_postfix: true,
            context: cx,
        };
        let declarator = self.declarator(mode, preset_core)?;
        let is_function = self.function_postfix_of(declarator);
        let has_init = matches!(
            self.kind_of(declarator),
            NodeKind::Declarator {
                initializer: Some(_),
                ..
            }
        );
        if is_function
            && !has_init
            && (self.at(Punct::LBrace) || self.at(Punct::Colon) || self.at_kw("try"))
        {
            if cx == DeclContext::Block {
                return None;
            }
            let ctor_initializer = if self.at(Punct::Colon) {
                Some(self.ctor_initializer()?)
            } else {
                None
            };
            let is_try = self.eat_kw("try").is_some();
            let body = self.compound_statement()?;
            if is_try {
                while self.at_kw("catch") {
                    self.catch_clause()?;
                }
            }
            return Some(self.finish(
                NodeKind::FunctionDefinition {
                    specifiers,
                    declarator,
                    ctor_initializer,
                    body,
                },
                first,
            ));
        }

        let mut declarators = vec![declarator];
        loop {
            if cx == DeclContext::Class && self.at(Punct::Colon) {
                self.bump();
                self.conditional_expression()?;
            }
            if self.eat(Punct::Comma).is_none() {
                break;
            }
            declarators.push(self.declarator(mode, None)?);
        }
        let semicolon = self.eat(Punct::Semicolon);
        if semicolon.is_none() {
            if cx == DeclContext::Block {
                return None;
            }
            self.error("expected ';' after declaration");
        }
        Some(self.finish(
            NodeKind::SimpleDeclaration {
                specifiers,
                declarators,
                semicolon,
            },
            first,
        ))
    }

    fn function_postfix_of(&self, declarator: NodeId) -> bool {
        match self.kind_of(declarator) {
            NodeKind::Declarator { postfix, .. } => postfix
                .first()
                .is_some_and(|p| matches!(self.kind_of(*p), NodeKind::FunctionDeclarator { .. })),
            _ => false,
        }
    }

    fn decl_specifiers(&mut self, cx: DeclContext) -> Option<(Vec<NodeId>, bool)> {
        let mut specifiers = Vec::new();
        let mut has_type = false;
        loop {
            self.skip_attributes();
            let Some(idx) = self.cur() else { break };
            match self.tokens[idx].kind {
                TokenKind::Keyword => {
                    let kw = self.text(idx);
                    if kw == "extern" && self.kind_at(1) == Some(TokenKind::StringLiteral) {
                        self.bump_n(2);
                        specifiers.push(self.finish(NodeKind::SimpleSpecifier { token: idx }, idx));
                    } else if is_type_keyword(kw) {
                        self.bump();
                        has_type = true;
                        specifiers.push(self.alloc(NodeKind::SimpleSpecifier { token: idx }, idx, idx));
                    } else if SPECIFIER_KEYWORDS.contains(&kw) {
                        self.bump();
                        specifiers.push(self.alloc(NodeKind::SimpleSpecifier { token: idx }, idx, idx));
                    } else if matches!(kw, "class" | "struct" | "union") && !has_type {
                        specifiers.push(self.class_specifier()?);
                        has_type = true;
                    } else if kw == "enum" && !has_type {
                        specifiers.push(self.enum_specifier()?);
                        has_type = true;
                    } else if kw == "typename" && !has_type {
                        self.bump();
                        let name = self.name(false)?;
                        specifiers.push(self.finish(NodeKind::NamedTypeSpecifier { name }, idx));
                        has_type = true;
                    } else if kw == "decltype" && !has_type && self.is_punct_at(1, Punct::LParen) {
                        self.bump();
                        self.skip_balanced()?;
                        specifiers.push(self.finish(NodeKind::DecltypeSpecifier, idx));
                        has_type = true;
                    } else {
                        break;
                    }
                }
                TokenKind::Identifier | TokenKind::Punct(Punct::ColonColon) if !has_type => {
                    if cx == DeclContext::Class
                        && self.text(idx) == "Q_OBJECT"
                        && !self.is_punct_at(1, Punct::LParen)
                    {
                        break;
                    }
                    let cp = self.mark();
                    match self.name(false) {
                        Some(name) => {
                            specifiers.push(self.finish(NodeKind::NamedTypeSpecifier { name }, idx));
                            has_type = true;
                        }
                        None => {
                            self.reset(cp);
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
        Some((specifiers, has_type))
    }

    fn class_specifier(&mut self) -> Option<NodeId> {
        let key = self.bump();
        self.skip_attributes();
        let name = if self.at_identifier() || self.at(Punct::ColonColon) {
            Some(self.name(false)?)
        } else {
            None
        };
        if self.at_contextual("final") {
            self.bump();
        }
        if self.eat(Punct::Colon).is_some() {
            loop {
                while matches!(
                    self.keyword_at(0),
                    Some("public" | "private" | "protected" | "virtual")
                ) {
                    self.bump();
                }
                self.name(false)?;
                self.eat(Punct::Ellipsis);
                if self.eat(Punct::Comma).is_none() {
                    break;
                }
            }
        }
        if self.at(Punct::LBrace) {
            let lbrace = self.bump();
            let mut members = Vec::new();
            while !self.at_end() && !self.at(Punct::RBrace) {
                if self.at_contextual("Q_OBJECT") {
                    let idx = self.bump();
                    members.push(self.alloc(NodeKind::Opaque, idx, idx));
                    continue;
                }
                self.declaration_or_recover(DeclContext::Class, &mut members);
            }
            let rbrace = self.expect(Punct::RBrace, "'}' closing class body");
            return Some(self.finish(
                NodeKind::ClassSpecifier {
                    key,
                    name,
                    lbrace,
                    members,
                    rbrace,
                },
                key,
            ));
        }
        let name = name?;
        Some(self.finish(NodeKind::ElaboratedTypeSpecifier { key, name }, key))
    }

    fn enum_specifier(&mut self) -> Option<NodeId> {
        let key = self.bump();
        let scoped = self.eat_kw("class").or_else(|| self.eat_kw("struct")).is_some();
        let name = if self.at_identifier() || self.at(Punct::ColonColon) {
            Some(self.name(false)?)
        } else {
            None
        };
        if self.eat(Punct::Colon).is_some() {
            self.decl_specifiers(DeclContext::Block)?;
        }
        if !self.at(Punct::LBrace) {
            let name = name?;
            return Some(self.finish(NodeKind::ElaboratedTypeSpecifier { key, name }, key));
        }
        let lbrace = self.bump();
        let mut enumerators = Vec::new();
        while !self.at_end() && !self.at(Punct::RBrace) {
            if !self.at_identifier() {
                self.error("expected enumerator");
                self.bump();
                continue;
            }
            let name_tok = self.bump();
            let value = if self.eat(Punct::Eq).is_some() {
                Some(self.conditional_expression()?)
            } else {
                None
            };
            enumerators.push(self.finish(
                NodeKind::Enumerator {
                    name: name_tok,
                    value,
                },
                name_tok,
            ));
            if self.eat(Punct::Comma).is_none() {
                break;
            }
        }
        let rbrace = self.expect(Punct::RBrace, "'}' closing enum");
        Some(self.finish(
            NodeKind::EnumSpecifier {
                key,
                scoped,
                name,
                lbrace,
                enumerators,
                rbrace,
            },
            key,
        ))
    }

    fn ctor_initializer(&mut self) -> Option<NodeId> {
        let colon = self.bump();
        let mut initializers = Vec::new();
        loop {
            let first = self.cur()?;
            let name = self.name(false)?;
            let initializer = if self.at(Punct::LParen) {
                self.expression_list()?
            } else if self.at(Punct::LBrace) {
                self.braced_initializer()?
            } else {
                self.error("expected member initializer");
                return None;
            };
            self.eat(Punct::Ellipsis);
            initializers.push(self.finish(NodeKind::MemInitializer { name, initializer }, first));
            if self.eat(Punct::Comma).is_none() {
                break;
            }
        }
        Some(self.finish(
            NodeKind::CtorInitializer {
                colon,
                initializers,
            },
            colon,
        ))
    }

    // ── Declarators ──────────────────────────────────────────────────────

    fn at_name_start(&self) -> bool {
        self.at_identifier()
            || self.at(Punct::ColonColon)
            || self.at_kw("operator")
            || (self.at(Punct::Tilde) && self.kind_at(1) == Some(TokenKind::Identifier))
    }

    fn nested_declarator_ahead(&self) -> bool {
        matches!(
            self.kind_at(1),
            Some(TokenKind::Punct(Punct::Star | Punct::Amp | Punct::AmpAmp))
        )
    }

    /// In function bodies `T x(...)` is usually a direct initialization;
    /// treat the parenthesis as a parameter list only when it reads like one.
    fn parameters_ahead(&self) -> bool {
        if self.is_punct_at(1, Punct::RParen) {
            return true;
        }
        if let Some(kw) = self.keyword_at(1) {
            return is_type_keyword(kw)
                || matches!(
                    kw,
                    "const" | "volatile" | "struct" | "class" | "enum" | "union" | "typename"
                );
        }
        let mut n = 1;
        if self.is_punct_at(n, Punct::ColonColon) {
            n += 1;
        }
        loop {
            if self.kind_at(n) != Some(TokenKind::Identifier) {
                return false;
            }
            n += 1;
            if self.is_punct_at(n, Punct::Lt) {
                match self.angles_end_ahead(n) {
                    Some(after) => n = after,
                    None => return false,
                }
            }
            if self.is_punct_at(n, Punct::ColonColon) {
                n += 1;
                continue;
            }
            break;
        }
        match self.kind_at(n) {
            Some(TokenKind::Identifier) => true,
            Some(TokenKind::Punct(Punct::Star | Punct::Amp | Punct::AmpAmp)) => {
                matches!(
                    self.kind_at(n + 1),
                    Some(TokenKind::Punct(
                        Punct::RParen | Punct::Comma | Punct::Star | Punct::Amp
                    ))
                ) || self.keyword_at(n + 1) == Some("const")
            }
            _ => false,
        }
    }

    fn angles_end_ahead(&self, start: usize) -> Option<usize> {
        let mut depth = 0usize;
        let mut n = start;
        loop {
            match self.kind_at(n)? {
                TokenKind::Punct(Punct::Lt) => depth += 1,
                TokenKind::Punct(Punct::Gt) => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(n + 1);
                    }
                }
                TokenKind::Punct(Punct::Semicolon | Punct::LBrace | Punct::RBrace) => return None,
                _ => {}
            }
            n += 1;
        }
    }

    /// Returns `None` both when nothing declarator-like is present and when
    /// parsing failed; callers distinguish by whether tokens were consumed.
    fn declarator(&mut self, mode: DeclaratorMode, preset: Option<NodeId>) -> Option<NodeId> {
        self.depth += 1;
        let result = if self.depth > MAX_DEPTH {
            self.error("nesting too deep");
            None
        } else {
            self.declarator_inner(mode, preset)
        };
        self.depth -= 1;
        result
    }

    fn declarator_inner(&mut self, mode: DeclaratorMode, preset: Option<NodeId>) -> Option<NodeId> {
        let first = match preset {
            Some(core) => self.first_of(core),
            None => self.cur()?,
        };
        let start_pos = self.pos;
        let mut ptr_ops = Vec::new();
        if preset.is_none() {
            loop {
                self.skip_attributes();
                if self.at(Punct::Star) {
                    let star = self.bump();
                    while self.at_kw("const") || self.at_kw("volatile") {
                        self.bump();
                    }
                    ptr_ops.push(self.finish(NodeKind::PointerOperator { star }, star));
                } else if self.at(Punct::Amp) || self.at(Punct::AmpAmp) {
                    let rvalue = self.at(Punct::AmpAmp);
                    let amp = self.bump();
                    ptr_ops.push(self.alloc(NodeKind::ReferenceOperator { amp, rvalue }, amp, amp));
                } else {
                    break;
                }
            }
        }

        let core = if preset.is_some() {
            preset
        } else {
            if self.at(Punct::Ellipsis) {
                self.bump();
            }
            if mode.core != CoreRule::Forbidden && self.at_name_start() {
                let name_first = self.cur()?;
                let name = self.name(false)?;
                Some(self.finish(NodeKind::DeclaratorId { name }, name_first))
            } else if self.at(Punct::LParen) && self.nested_declarator_ahead() {
                let lparen = self.bump();
                let inner_mode = DeclaratorMode {
                    initializer: false,
                    ..mode
                };
                let inner = self.declarator(inner_mode, None)?;
                self.expect(Punct::RParen, "')' closing declarator")?;
                Some(self.finish(NodeKind::NestedDeclarator { declarator: inner }, lparen))
            } else {
                None
            }
        };
        if core.is_none() && mode.core == CoreRule::Required {
            return None;
        }
        self.skip_attributes();

        let mut postfix = Vec::new();
        loop {
            if self.at(Punct::LParen) && mode.function_postfix {
                if mode.context == DeclContext::Block && core.is_some() && !self.parameters_ahead() {
                    break;
                }
                let cp = self.mark();
                match self.function_postfix() {
                    Some(node) => postfix.push(node),
                    None => {
                        self.reset(cp);
                        break;
                    }
                }
            } else if self.at(Punct::LBracket) && !self.is_punct_at(1, Punct::LBracket) {
                let lbracket = self.bump();
                let size = if self.at(Punct::RBracket) {
                    None
                } else {
                    Some(self.nested_expression_body()?)
                };
                self.expect(Punct::RBracket, "']'")?;
                postfix.push(self.finish(NodeKind::ArrayDeclarator { size }, lbracket));
            } else {
                break;
            }
        }

        let (equal, initializer) = if mode.initializer {
            let is_function = postfix
                .first()
                .is_some_and(|p| matches!(self.kind_of(*p), NodeKind::FunctionDeclarator { .. }));
            self.declarator_initializer(is_function, core.is_some())?
        } else {
            (None, None)
        };

        if self.pos == start_pos && preset.is_none() {
            return None;
        }
        Some(self.finish(
            NodeKind::Declarator {
                ptr_ops,
                core,
                postfix,
                equal,
                initializer,
            },
            first,
        ))
    }

    fn declarator_initializer(
        &mut self,
        is_function: bool,
        has_core: bool,
    ) -> Option<(Option<TokenIdx>, Option<NodeId>)> {
        if let Some(equal) = self.eat(Punct::Eq) {
            let init = if self.at_kw("default") || self.at_kw("delete") {
                let idx = self.bump();
                self.alloc(NodeKind::Opaque, idx, idx)
            } else if self.at(Punct::LBrace) {
                self.braced_initializer()?
            } else {
                self.assignment_expression()?
            };
            return Some((Some(equal), Some(init)));
        }
        if has_core && !is_function {
            if self.at(Punct::LParen) {
                return Some((None, Some(self.expression_list()?)));
            }
            if self.at(Punct::LBrace) {
                return Some((None, Some(self.braced_initializer()?)));
            }
        }
        Some((None, None))
    }

    fn function_postfix(&mut self) -> Option<NodeId> {
        let lparen = self.bump();
        let mut parameters = Vec::new();
        let mut ellipsis = None;
        if !self.at(Punct::RParen) {
            loop {
                if let Some(e) = self.eat(Punct::Ellipsis) {
                    ellipsis = Some(e);
                    break;
                }
                parameters.push(self.parameter_declaration()?);
                if self.eat(Punct::Comma).is_none() {
                    ellipsis = self.eat(Punct::Ellipsis);
                    break;
                }
            }
        }
        let rparen = self.eat(Punct::RParen)?;
        let mut cv_qualifiers = Vec::new();
        loop {
            if self.at_kw("const") || self.at_kw("volatile") {
                cv_qualifiers.push(self.bump());
            } else if self.at(Punct::Amp) || self.at(Punct::AmpAmp) {
                self.bump();
            } else if self.at_kw("noexcept") || self.at_kw("throw") {
                self.bump();
                if self.at(Punct::LParen) {
                    self.skip_balanced()?;
                }
            } else if self.at_contextual("override") || self.at_contextual("final") {
                self.bump();
            } else {
                break;
            }
        }
        let trailing_return = if self.eat(Punct::Arrow).is_some() {
            Some(self.type_id(false)?)
        } else {
            None
        };
        Some(self.finish(
            NodeKind::FunctionDeclarator {
                lparen,
                parameters,
                ellipsis,
                rparen,
                cv_qualifiers,
                trailing_return,
            },
            lparen,
        ))
    }

    fn parameter_declaration(&mut self) -> Option<NodeId> {
        let first = self.cur()?;
        let from = self.nodes.len();
        let (specifiers, has_type) = self.decl_specifiers(DeclContext::Block)?;
        if !has_type {
            return None;
        }
        let before = self.pos;
        let mode = DeclaratorMode {
            core: CoreRule::Optional,
            initializer: false,
            function_postfix: true,
            context: DeclContext::Namespace,
        };
        let declarator = self.declarator(mode, None);
        if declarator.is_none() && self.pos != before {
            return None;
        }
        let (equal, default_value) = match self.eat(Punct::Eq) {
            Some(eq) => {
                let value = if self.at(Punct::LBrace) {
                    self.braced_initializer()?
                } else {
                    self.assignment_expression()?
                };
                (Some(eq), Some(value))
            }
            None => (None, None),
        };
        self.record_declared_names(from);
        Some(self.finish(
            NodeKind::ParameterDeclaration {
                specifiers,
                declarator,
                equal,
                default_value,
            },
            first,
        ))
    }

    fn type_id(&mut self, new_type: bool) -> Option<NodeId> {
        let first = self.cur()?;
        let (specifiers, has_type) = self.decl_specifiers(DeclContext::Block)?;
        if !has_type {
            return None;
        }
        let before = self.pos;
        let mode = DeclaratorMode {
            core: CoreRule::Forbidden,
            initializer: false,
            function_postfix: !new_type,
            context: DeclContext::Namespace,
        };
        let declarator = self.declarator(mode, None);
        if declarator.is_none() && self.pos != before {
            return None;
        }
        Some(self.finish(
            NodeKind::TypeId {
                specifiers,
                declarator,
            },
            first,
        ))
    }

    // ── Names ────────────────────────────────────────────────────────────

    fn name(&mut self, in_expression: bool) -> Option<NodeId> {
        let first = self.cur()?;
        let global = self.eat(Punct::ColonColon).is_some();
        let mut qualifiers = Vec::new();
        loop {
            if !qualifiers.is_empty() || global {
                self.eat_kw("template");
            }
            let part = self.unqualified_name(in_expression)?;
            let can_qualify = matches!(
                self.kind_of(part),
                NodeKind::SimpleName { .. } | NodeKind::TemplateId { .. }
            );
            if can_qualify && self.at(Punct::ColonColon) && self.name_continues_after_scope() {
                self.bump();
                qualifiers.push(part);
                continue;
            }
            if qualifiers.is_empty() && !global {
                return Some(part);
            }
            return Some(self.finish(
                NodeKind::QualifiedName {
                    global,
                    qualifiers,
                    name: part,
                },
                first,
            ));
        }
    }

    fn name_continues_after_scope(&self) -> bool {
        matches!(
            self.kind_at(1),
            Some(TokenKind::Identifier | TokenKind::Punct(Punct::Tilde))
        ) || matches!(self.keyword_at(1), Some("operator" | "template"))
    }

    fn unqualified_name(&mut self, in_expression: bool) -> Option<NodeId> {
        let idx = self.cur()?;
        match self.tokens[idx].kind {
            TokenKind::Identifier => {
                self.bump();
                if self.at(Punct::Lt) {
                    if let Some(arguments) = self.try_template_arguments(in_expression) {
                        return Some(self.finish(NodeKind::TemplateId { token: idx, arguments }, idx));
                    }
                }
                Some(self.alloc(NodeKind::SimpleName { token: idx }, idx, idx))
            }
            TokenKind::Punct(Punct::Tilde) if self.kind_at(1) == Some(TokenKind::Identifier) => {
                self.bump();
                let token = self.bump();
                Some(self.finish(NodeKind::DestructorName { token }, idx))
            }
            TokenKind::Keyword if self.text(idx) == "operator" => {
                self.bump();
                self.operator_tail()?;
                Some(self.finish(NodeKind::OperatorName, idx))
            }
            _ => None,
        }
    }

    fn operator_tail(&mut self) -> Option<()> {
        let idx = self.cur()?;
        match self.tokens[idx].kind {
            TokenKind::Punct(Punct::LParen) => {
                self.bump();
                self.eat(Punct::RParen)?;
            }
            TokenKind::Punct(Punct::LBracket) => {
                self.bump();
                self.eat(Punct::RBracket)?;
            }
            TokenKind::Punct(Punct::Gt) => {
                self.bump();
                if let Some(next) = self.cur() {
                    if matches!(
                        self.tokens[next].kind,
                        TokenKind::Punct(Punct::Gt | Punct::GtEq)
                    ) && self.adjacent(idx, next)
                    {
                        self.bump();
                    }
                }
            }
            TokenKind::Punct(_) => {
                self.bump();
            }
            TokenKind::Keyword if matches!(self.text(idx), "new" | "delete") => {
                self.bump();
                if self.at(Punct::LBracket) {
                    self.bump();
                    self.eat(Punct::RBracket)?;
                }
            }
            TokenKind::StringLiteral => {
                self.bump();
                if self.at_identifier() {
                    self.bump();
                }
            }
            _ => {
                let (_, has_type) = self.decl_specifiers(DeclContext::Block)?;
                if !has_type {
                    return None;
                }
                while self.at(Punct::Star) || self.at(Punct::Amp) || self.at(Punct::AmpAmp) {
                    self.bump();
                }
            }
        }
        Some(())
    }

    fn try_template_arguments(&mut self, in_expression: bool) -> Option<Vec<NodeId>> {
        let start = self.pos;
        if self.failed_angles.contains(&start) || self.depth > MAX_DEPTH {
            return None;
        }
        let cp = self.mark();
        let saved = self.no_gt;
        self.no_gt = true;
        self.depth += 1;
        let result = self.template_arguments();
        self.depth -= 1;
        self.no_gt = saved;
        match result {
            Some(args) if !in_expression || self.template_follow_ok() => Some(args),
            Some(_) => {
                self.reset(cp);
                None
            }
            None => {
                self.reset(cp);
                self.failed_angles.insert(start);
                None
            }
        }
    }

    fn template_arguments(&mut self) -> Option<Vec<NodeId>> {
        self.bump();
        let mut args = Vec::new();
        if self.eat(Punct::Gt).is_some() {
            return Some(args);
        }
        loop {
            let arg = self.template_argument()?;
            self.eat(Punct::Ellipsis);
            args.push(arg);
            if self.eat(Punct::Comma).is_some() {
                continue;
            }
            self.eat(Punct::Gt)?;
            return Some(args);
        }
    }

    fn template_argument(&mut self) -> Option<NodeId> {
        let cp = self.mark();
        if let Some(ty) = self.type_id(false) {
            if self.at(Punct::Comma) || self.at(Punct::Gt) || self.at(Punct::Ellipsis) {
                return Some(ty);
            }
        }
        self.reset(cp);
        self.binary(SHIFT_PRECEDENCE)
    }

    fn template_follow_ok(&self) -> bool {
        match self.kind_at(0) {
            None => true,
            Some(TokenKind::Punct(p)) => matches!(
                p,
                Punct::LParen
                    | Punct::ColonColon
                    | Punct::LBrace
                    | Punct::RParen
                    | Punct::Semicolon
                    | Punct::Comma
                    | Punct::RBracket
                    | Punct::RBrace
                    | Punct::Gt
            ),
            _ => false,
        }
    }

    // ── Statements ───────────────────────────────────────────────────────

    fn statement(&mut self) -> Option<NodeId> {
        self.depth += 1;
        let result = if self.depth > MAX_DEPTH {
            self.error("nesting too deep");
            None
        } else {
            self.statement_inner()
        };
        self.depth -= 1;
        result
    }

    fn statement_or_recover(&mut self) -> NodeId {
        let cp = self.mark();
        match self.statement() {
            Some(stmt) => stmt,
            None => {
                self.reset(cp);
                self.recover()
            }
        }
    }

    /// The body of a control statement; absent at `}` or end of input.
    fn sub_statement(&mut self) -> Option<NodeId> {
        if self.at_end() || self.at(Punct::RBrace) {
            self.error("expected statement");
            return None;
        }
        Some(self.statement_or_recover())
    }

    fn statement_inner(&mut self) -> Option<NodeId> {
        let first = self.cur()?;
        match self.tokens[first].kind {
            TokenKind::Punct(Punct::RBrace) => None,
            TokenKind::Punct(Punct::LBrace) => self.compound_statement(),
            TokenKind::Punct(Punct::Semicolon) => {
                self.bump();
                Some(self.alloc(
                    NodeKind::ExpressionStatement {
                        expression: None,
                        semicolon: Some(first),
                    },
                    first,
                    first,
                ))
            }
            TokenKind::Keyword => match self.text(first) {
                "if" => self.if_statement(),
                "while" => self.while_statement(),
                "do" => self.do_statement(),
                "for" => self.for_statement(),
                "switch" => self.switch_statement(),
                "case" => self.case_statement(),
                "default" if self.is_punct_at(1, Punct::Colon) => self.default_statement(),
                "break" | "continue" => {
                    let is_break = self.text(first) == "break";
                    self.bump();
                    self.expect(Punct::Semicolon, "';'");
                    let kind = if is_break {
                        NodeKind::BreakStatement
                    } else {
                        NodeKind::ContinueStatement
                    };
                    Some(self.finish(kind, first))
                }
                "return" => self.return_statement(),
                "goto" => {
                    self.bump();
                    if self.at_identifier() {
                        self.bump();
                    }
                    self.expect(Punct::Semicolon, "';'");
                    Some(self.finish(NodeKind::GotoStatement, first))
                }
                "try" => self.try_statement(),
                _ => self.declaration_or_expression_statement(),
            },
            TokenKind::Identifier if self.is_punct_at(1, Punct::Colon) => {
                let label = self.bump();
                self.bump();
                let statement = if self.at_end() || self.at(Punct::RBrace) {
                    None
                } else {
                    Some(self.statement_or_recover())
                };
                Some(self.finish(NodeKind::LabeledStatement { label, statement }, first))
            }
            _ => self.declaration_or_expression_statement(),
        }
    }

    fn declaration_start_ahead(&self) -> bool {
        match self.kind_at(0) {
            Some(TokenKind::Identifier | TokenKind::Punct(Punct::ColonColon)) => true,
            Some(TokenKind::Keyword) => self.keyword_at(0).is_some_and(|kw| {
                is_type_keyword(kw)
                    || SPECIFIER_KEYWORDS.contains(&kw)
                    || matches!(
                        kw,
                        "class"
                            | "struct"
                            | "union"
                            | "enum"
                            | "typename"
                            | "decltype"
                            | "using"
                            | "static_assert"
                    )
            }),
            _ => false,
        }
    }

    /// `f(x);`, `f(*x);` or `f(&x);` where `f` is not a known type and `x`
    /// is already declared: a call, not a redeclaration of `x`.
    fn call_on_declared_name_ahead(&self) -> bool {
        let ident = |n: usize| {
            self.nth(n)
                .filter(|&i| self.tokens[i].kind == TokenKind::Identifier)
                .map(|i| self.text(i))
        };
        let Some(callee) = ident(0) else { return false };
        if self.type_names.contains(callee) || !self.is_punct_at(1, Punct::LParen) {
            return false;
        }
        let inner = if self.is_punct_at(2, Punct::Star) || self.is_punct_at(2, Punct::Amp) {
            3
        } else {
            2
        };
        ident(inner).is_some_and(|name| self.declared_names.contains(name))
            && self.is_punct_at(inner + 1, Punct::RParen)
            && self.is_punct_at(inner + 2, Punct::Semicolon)
    }

    /// Remember every plain declarator name allocated since `from`.
    fn record_declared_names(&mut self, from: usize) {
        for node in &self.nodes[from..] {
            if let NodeKind::DeclaratorId { name } = node.kind {
                if let NodeKind::SimpleName { token } = self.nodes[name.index()].kind {
                    let text = self.text(token);
                    self.declared_names.insert(text);
                }
            }
        }
    }

    fn declaration_or_expression_statement(&mut self) -> Option<NodeId> {
        let first = self.cur()?;
        if self.declaration_start_ahead() && !self.call_on_declared_name_ahead() {
            let cp = self.mark();
            let from = cp.nodes;
            let declaration = match self.keyword_at(0) {
                Some("using" | "static_assert") => Some(self.opaque_statement(first)),
                _ => self.simple_declaration(DeclContext::Block),
            };
            if let Some(declaration) = declaration {
                self.record_declared_names(from);
                return Some(self.finish(NodeKind::DeclarationStatement { declaration }, first));
            }
            self.reset(cp);
        }
        let expression = self.expression()?;
        let semicolon = self.expect(Punct::Semicolon, "';' after expression");
        Some(self.finish(
            NodeKind::ExpressionStatement {
                expression: Some(expression),
                semicolon,
            },
            first,
        ))
    }

    fn compound_statement(&mut self) -> Option<NodeId> {
        let lbrace = self.expect(Punct::LBrace, "'{'")?;
        let mut statements = Vec::new();
        while !self.at_end() && !self.at(Punct::RBrace) {
            statements.push(self.statement_or_recover());
        }
        let rbrace = self.expect(Punct::RBrace, "'}'");
        Some(self.finish(
            NodeKind::CompoundStatement {
                lbrace,
                statements,
                rbrace,
            },
            lbrace,
        ))
    }

    fn condition(&mut self) -> Option<NodeId> {
        let first = self.cur()?;
        if self.declaration_start_ahead() {
            let cp = self.mark();
            if let Some(cond) = self.condition_declaration(first) {
                return Some(cond);
            }
            self.reset(cp);
        }
        self.expression()
    }

    fn condition_declaration(&mut self, first: TokenIdx) -> Option<NodeId> {
        let (specifiers, has_type) = self.decl_specifiers(DeclContext::Block)?;
        if !has_type {
            return None;
        }
        let mode = DeclaratorMode {
            core: CoreRule::Required,
            initializer: true,
            function_postfix: false,
            context: DeclContext::Block,
        };
        let declarator = self.declarator(mode, None)?;
        let initialized = matches!(
            self.kind_of(declarator),
            NodeKind::Declarator {
                initializer: Some(_),
                ..
            }
        );
        if !initialized || !(self.at(Punct::RParen) || self.at(Punct::Semicolon)) {
            return None;
        }
        Some(self.finish(
            NodeKind::Condition {
                specifiers,
                declarator,
            },
            first,
        ))
    }

    fn if_statement(&mut self) -> Option<NodeId> {
        let if_token = self.bump();
        self.eat_kw("constexpr");
        let lparen = self.expect(Punct::LParen, "'(' after if")?;
        let condition = self.condition()?;
        let rparen = self.expect(Punct::RParen, "')' after condition");
        let statement = self.sub_statement();
        let (else_token, else_statement) = match self.eat_kw("else") {
            Some(e) => (Some(e), self.sub_statement()),
            None => (None, None),
        };
        Some(self.finish(
            NodeKind::IfStatement {
                if_token,
                lparen,
                condition,
                rparen,
                statement,
                else_token,
                else_statement,
            },
            if_token,
        ))
    }

    fn while_statement(&mut self) -> Option<NodeId> {
        let while_token = self.bump();
        let lparen = self.expect(Punct::LParen, "'(' after while")?;
        let condition = self.condition()?;
        let rparen = self.expect(Punct::RParen, "')' after condition");
        let statement = self.sub_statement();
        Some(self.finish(
            NodeKind::WhileStatement {
                while_token,
                lparen,
                condition,
                rparen,
                statement,
            },
            while_token,
        ))
    }

    fn do_statement(&mut self) -> Option<NodeId> {
        let do_token = self.bump();
        let statement = self.sub_statement()?;
        let while_token = self.eat_kw("while");
        let mut expression = None;
        let mut semicolon = None;
        if while_token.is_some() {
            self.expect(Punct::LParen, "'(' after while")?;
            expression = Some(self.expression()?);
            self.expect(Punct::RParen, "')'");
            semicolon = self.expect(Punct::Semicolon, "';' after do-while");
        } else {
            self.error("expected 'while'");
        }
        Some(self.finish(
            NodeKind::DoStatement {
                do_token,
                statement,
                while_token,
                expression,
                semicolon,
            },
            do_token,
        ))
    }

    fn for_statement(&mut self) -> Option<NodeId> {
        let for_token = self.bump();
        let lparen = self.expect(Punct::LParen, "'(' after for")?;
        if self.declaration_start_ahead() {
            let cp = self.mark();
            if let Some(node) = self.range_for_tail(for_token, lparen) {
                return Some(node);
            }
            self.reset(cp);
        }
        let initializer = match self.eat(Punct::Semicolon) {
            Some(semi) => self.alloc(
                NodeKind::ExpressionStatement {
                    expression: None,
                    semicolon: Some(semi),
                },
                semi,
                semi,
            ),
            None => self.declaration_or_expression_statement()?,
        };
        let condition = if self.at(Punct::Semicolon) {
            None
        } else {
            Some(self.condition()?)
        };
        let semicolon = self.expect(Punct::Semicolon, "';' in for");
        let expression = if self.at(Punct::RParen) {
            None
        } else {
            Some(self.expression()?)
        };
        let rparen = self.expect(Punct::RParen, "')' closing for");
        let statement = self.sub_statement();
        Some(self.finish(
            NodeKind::ForStatement {
                for_token,
                lparen,
                initializer,
                condition,
                semicolon,
                expression,
                rparen,
                statement,
            },
            for_token,
        ))
    }

    fn range_for_tail(&mut self, for_token: TokenIdx, lparen: TokenIdx) -> Option<NodeId> {
        let (specifiers, has_type) = self.decl_specifiers(DeclContext::Block)?;
        if !has_type {
            return None;
        }
        let mode = DeclaratorMode {
            core: CoreRule::Required,
            initializer: false,
            function_postfix: false,
            context: DeclContext::Block,
        };
        let declarator = self.declarator(mode, None)?;
        let colon = self.eat(Punct::Colon)?;
        let range = if self.at(Punct::LBrace) {
            self.braced_initializer()?
        } else {
            self.expression()?
        };
        let rparen = self.expect(Punct::RParen, "')' closing for");
        let statement = self.sub_statement();
        Some(self.finish(
            NodeKind::RangeBasedForStatement {
                for_token,
                lparen,
                specifiers,
                declarator,
                colon,
                range,
                rparen,
                statement,
            },
            for_token,
        ))
    }

    fn switch_statement(&mut self) -> Option<NodeId> {
        let switch_token = self.bump();
        let lparen = self.expect(Punct::LParen, "'(' after switch")?;
        let condition = self.condition()?;
        let rparen = self.expect(Punct::RParen, "')' after condition");
        let statement = self.sub_statement();
        Some(self.finish(
            NodeKind::SwitchStatement {
                switch_token,
                lparen,
                condition,
                rparen,
                statement,
            },
            switch_token,
        ))
    }

    fn labeled_tail(&mut self) -> Option<NodeId> {
        if self.at_end() || self.at(Punct::RBrace) {
            None
        } else {
            Some(self.statement_or_recover())
        }
    }

    fn case_statement(&mut self) -> Option<NodeId> {
        let case_token = self.bump();
        let expression = self.conditional_expression()?;
        if self.at(Punct::Ellipsis) {
            self.bump();
            self.conditional_expression()?;
        }
        let colon = self.expect(Punct::Colon, "':' after case");
        let statement = self.labeled_tail();
        Some(self.finish(
            NodeKind::CaseStatement {
                case_token,
                expression,
                colon,
                statement,
            },
            case_token,
        ))
    }

    fn default_statement(&mut self) -> Option<NodeId> {
        let default_token = self.bump();
        self.bump();
        let statement = self.labeled_tail();
        Some(self.finish(
            NodeKind::DefaultStatement {
                default_token,
                statement,
            },
            default_token,
        ))
    }

    fn return_statement(&mut self) -> Option<NodeId> {
        let first = self.bump();
        let expression = if self.at(Punct::Semicolon) {
            None
        } else if self.at(Punct::LBrace) {
            Some(self.braced_initializer()?)
        } else {
            Some(self.expression()?)
        };
        self.expect(Punct::Semicolon, "';' after return");
        Some(self.finish(NodeKind::ReturnStatement { expression }, first))
    }

    fn try_statement(&mut self) -> Option<NodeId> {
        let first = self.bump();
        let body = self.compound_statement()?;
        let mut handlers = Vec::new();
        while self.at_kw("catch") {
            handlers.push(self.catch_clause()?);
        }
        Some(self.finish(NodeKind::TryBlockStatement { body, handlers }, first))
    }

    fn catch_clause(&mut self) -> Option<NodeId> {
        let first = self.bump();
        self.expect(Punct::LParen, "'(' after catch")?;
        let declaration = if self.eat(Punct::Ellipsis).is_some() {
            None
        } else {
            Some(self.parameter_declaration()?)
        };
        self.expect(Punct::RParen, "')'")?;
        let body = self.compound_statement()?;
        Some(self.finish(NodeKind::CatchClause { declaration, body }, first))
    }

    // ── Expressions ──────────────────────────────────────────────────────

    fn expression(&mut self) -> Option<NodeId> {
        let mut left = self.assignment_expression()?;
        while let Some(comma) = self.eat(Punct::Comma) {
            let right = self.assignment_expression()?;
            left = self.binary_node(left, BinaryOp::Comma, comma, comma, right);
        }
        Some(left)
    }

    /// An expression inside brackets, where `>` is a comparison again.
    fn nested_expression_body(&mut self) -> Option<NodeId> {
        let saved = self.no_gt;
        self.no_gt = false;
        let result = self.expression();
        self.no_gt = saved;
        result
    }

    fn binary_node(
        &mut self,
        left: NodeId,
        op: BinaryOp,
        op_first: TokenIdx,
        op_last: TokenIdx,
        right: NodeId,
    ) -> NodeId {
        let first = self.first_of(left);
        self.finish(
            NodeKind::BinaryExpression {
                left,
                op,
                op_first,
                op_last,
                right,
            },
            first,
        )
    }

    fn assignment_expression(&mut self) -> Option<NodeId> {
        if self.at_kw("throw") {
            let first = self.bump();
            let operand = if self.at(Punct::Semicolon) || self.at(Punct::RParen) || self.at(Punct::Comma) {
                None
            } else {
                Some(self.assignment_expression()?)
            };
            return Some(self.finish(NodeKind::ThrowExpression { operand }, first));
        }
        let left = self.conditional_expression()?;
        if let Some((op, count)) = self.peek_assignment_op() {
            let (op_first, op_last) = self.bump_n(count);
            let right = if self.at(Punct::LBrace) {
                self.braced_initializer()?
            } else {
                self.assignment_expression()?
            };
            return Some(self.binary_node(left, op, op_first, op_last, right));
        }
        Some(left)
    }

    fn peek_assignment_op(&self) -> Option<(BinaryOp, usize)> {
        let TokenKind::Punct(p) = self.kind_at(0)? else {
            return None;
        };
        let op = match p {
            Punct::Eq => BinaryOp::Assign,
            Punct::PlusEq => BinaryOp::AddAssign,
            Punct::MinusEq => BinaryOp::SubAssign,
            Punct::StarEq => BinaryOp::MulAssign,
            Punct::SlashEq => BinaryOp::DivAssign,
            Punct::PercentEq => BinaryOp::RemAssign,
            Punct::AmpEq => BinaryOp::AndAssign,
            Punct::PipeEq => BinaryOp::OrAssign,
            Punct::CaretEq => BinaryOp::XorAssign,
            Punct::ShlEq => BinaryOp::ShlAssign,
            Punct::Gt if !self.no_gt && self.split_gt_ahead(Punct::GtEq) => {
                return Some((BinaryOp::ShrAssign, 2));
            }
            _ => return None,
        };
        Some((op, 1))
    }

    /// Whether the current `>` is immediately followed by `second`.
    fn split_gt_ahead(&self, second: Punct) -> bool {
        match (self.nth(0), self.nth(1)) {
            (Some(a), Some(b)) => {
                self.tokens[b].kind == TokenKind::Punct(second) && self.adjacent(a, b)
            }
            _ => false,
        }
    }

    fn conditional_expression(&mut self) -> Option<NodeId> {
        let condition = self.binary(1)?;
        if self.eat(Punct::Question).is_none() {
            return Some(condition);
        }
        let then_expr = self.nested_expression_body()?;
        self.expect(Punct::Colon, "':' in conditional expression")?;
        let else_expr = self.assignment_expression()?;
        let first = self.first_of(condition);
        Some(self.finish(
            NodeKind::ConditionalExpression {
                condition,
                then_expr,
                else_expr,
            },
            first,
        ))
    }

    fn peek_binary_op(&self) -> Option<(BinaryOp, u8, usize)> {
        let TokenKind::Punct(p) = self.kind_at(0)? else {
            return None;
        };
        let single = |op, prec| Some((op, prec, 1));
        match p {
            Punct::PipePipe => single(BinaryOp::LogicalOr, 1),
            Punct::AmpAmp => single(BinaryOp::LogicalAnd, 2),
            Punct::Pipe => single(BinaryOp::BitOr, 3),
            Punct::Caret => single(BinaryOp::BitXor, 4),
            Punct::Amp => single(BinaryOp::BitAnd, 5),
            Punct::EqEq => single(BinaryOp::Eq, 6),
            Punct::BangEq => single(BinaryOp::Ne, 6),
            Punct::Lt => single(BinaryOp::Lt, 7),
            Punct::LtEq => single(BinaryOp::Le, 7),
            Punct::Gt if self.no_gt => None,
            Punct::Gt if self.split_gt_ahead(Punct::GtEq) => None,
            Punct::Gt if self.split_gt_ahead(Punct::Gt) => Some((BinaryOp::Shr, SHIFT_PRECEDENCE, 2)),
            Punct::Gt => single(BinaryOp::Gt, 7),
            Punct::GtEq if self.no_gt => None,
            Punct::GtEq => single(BinaryOp::Ge, 7),
            Punct::Spaceship => single(BinaryOp::Spaceship, 8),
            Punct::Shl => single(BinaryOp::Shl, SHIFT_PRECEDENCE),
            Punct::Plus => single(BinaryOp::Add, 10),
            Punct::Minus => single(BinaryOp::Sub, 10),
            Punct::Star => single(BinaryOp::Mul, 11),
            Punct::Slash => single(BinaryOp::Div, 11),
            Punct::Percent => single(BinaryOp::Rem, 11),
            Punct::DotStar | Punct::ArrowStar => single(BinaryOp::PtrMem, 12),
            _ => None,
        }
    }

    fn binary(&mut self, min_prec: u8) -> Option<NodeId> {
        let mut left = self.unary()?;
        while let Some((op, prec, count)) = self.peek_binary_op() {
            if prec < min_prec {
                break;
            }
            let (op_first, op_last) = self.bump_n(count);
            let right = self.binary(prec + 1)?;
            left = self.binary_node(left, op, op_first, op_last, right);
        }
        Some(left)
    }

    fn unary(&mut self) -> Option<NodeId> {
        self.depth += 1;
        let result = if self.depth > MAX_DEPTH {
            self.error("nesting too deep");
            None
        } else {
            self.unary_inner()
        };
        self.depth -= 1;
        result
    }

    fn unary_inner(&mut self) -> Option<NodeId> {
        let idx = self.cur()?;
        let op = match self.tokens[idx].kind {
            TokenKind::Punct(Punct::PlusPlus) => Some(UnaryOp::PreIncrement),
            TokenKind::Punct(Punct::MinusMinus) => Some(UnaryOp::PreDecrement),
            TokenKind::Punct(Punct::Star) => Some(UnaryOp::Deref),
            TokenKind::Punct(Punct::Amp) => Some(UnaryOp::AddressOf),
            TokenKind::Punct(Punct::Plus) => Some(UnaryOp::Plus),
            TokenKind::Punct(Punct::Minus) => Some(UnaryOp::Minus),
            TokenKind::Punct(Punct::Bang) => Some(UnaryOp::Not),
            TokenKind::Punct(Punct::Tilde) => Some(UnaryOp::BitNot),
            _ => None,
        };
        if let Some(op) = op {
            self.bump();
            let operand = self.unary()?;
            return Some(self.finish(
                NodeKind::UnaryExpression {
                    op,
                    op_token: idx,
                    operand,
                },
                idx,
            ));
        }
        if self.at(Punct::LParen) {
            if let Some(cast) = self.try_cast() {
                return Some(cast);
            }
            return self.postfix();
        }
        if self.at(Punct::ColonColon) && matches!(self.keyword_at(1), Some("new" | "delete")) {
            self.bump();
            return if self.at_kw("new") {
                self.new_expression(idx)
            } else {
                self.delete_expression(idx)
            };
        }
        match self.keyword_at(0) {
            Some("sizeof" | "alignof") => self.sizeof_expression(),
            Some("new") => self.new_expression(idx),
            Some("delete") => self.delete_expression(idx),
            _ => self.postfix(),
        }
    }

    fn sizeof_expression(&mut self) -> Option<NodeId> {
        let first = self.bump();
        self.eat(Punct::Ellipsis);
        if self.at(Punct::LParen) {
            let cp = self.mark();
            self.bump();
            if let Some(ty) = self.type_id(false) {
                if self.eat(Punct::RParen).is_some() {
                    return Some(self.finish(NodeKind::SizeofExpression { operand: ty }, first));
                }
            }
            self.reset(cp);
        }
        let operand = self.unary()?;
        Some(self.finish(NodeKind::SizeofExpression { operand }, first))
    }

    fn type_start_ahead(&self) -> bool {
        self.at_identifier()
            || self.at(Punct::ColonColon)
            || self.keyword_at(0).is_some_and(|kw| {
                is_type_keyword(kw)
                    || matches!(
                        kw,
                        "const" | "volatile" | "struct" | "class" | "enum" | "union" | "typename"
                    )
            })
    }

    fn try_cast(&mut self) -> Option<NodeId> {
        let cp = self.mark();
        let lparen = self.bump();
        let keyword_led = self.keyword_at(0).is_some_and(|kw| {
            is_type_keyword(kw)
                || matches!(
                    kw,
                    "const" | "volatile" | "struct" | "class" | "enum" | "union" | "typename"
                )
        });
        if !keyword_led && !(self.at_identifier() || self.at(Punct::ColonColon)) {
            self.reset(cp);
            return None;
        }
        let Some(type_id) = self.type_id(false) else {
            self.reset(cp);
            return None;
        };
        let has_declarator = matches!(
            self.kind_of(type_id),
            NodeKind::TypeId {
                declarator: Some(_),
                ..
            }
        );
        if self.eat(Punct::RParen).is_none()
            || (!keyword_led && !has_declarator)
            || !self.operand_start_ahead()
        {
            self.reset(cp);
            return None;
        }
        let Some(operand) = self.unary() else {
            self.reset(cp);
            return None;
        };
        Some(self.finish(NodeKind::CastExpression { type_id, operand }, lparen))
    }

    fn operand_start_ahead(&self) -> bool {
        match self.kind_at(0) {
            Some(
                TokenKind::Identifier
                | TokenKind::Keyword
                | TokenKind::IntLiteral
                | TokenKind::FloatLiteral
                | TokenKind::CharLiteral
                | TokenKind::StringLiteral,
            ) => true,
            Some(TokenKind::Punct(p)) => matches!(
                p,
                Punct::LParen
                    | Punct::Tilde
                    | Punct::Bang
                    | Punct::Minus
                    | Punct::Plus
                    | Punct::Star
                    | Punct::Amp
                    | Punct::PlusPlus
                    | Punct::MinusMinus
                    | Punct::ColonColon
            ),
            _ => false,
        }
    }

    fn new_expression(&mut self, first: TokenIdx) -> Option<NodeId> {
        let new_token = self.bump();
        let type_id = if self.at(Punct::LParen) {
            let cp = self.mark();
            let placement = self.expression_list();
            if placement.is_some() && self.type_start_ahead() {
                self.type_id(true)?
            } else {
                self.reset(cp);
                self.bump();
                let ty = self.type_id(false)?;
                self.expect(Punct::RParen, "')' after type")?;
                ty
            }
        } else {
            self.type_id(true)?
        };
        let initializer = if self.at(Punct::LParen) {
            Some(self.expression_list()?)
        } else if self.at(Punct::LBrace) {
            Some(self.braced_initializer()?)
        } else {
            None
        };
        Some(self.finish(
            NodeKind::NewExpression {
                new_token,
                type_id,
                initializer,
            },
            first,
        ))
    }

    fn delete_expression(&mut self, first: TokenIdx) -> Option<NodeId> {
        let delete_token = self.bump();
        if self.at(Punct::LBracket) {
            self.bump();
            self.expect(Punct::RBracket, "']' after delete[")?;
        }
        let operand = self.unary()?;
        Some(self.finish(
            NodeKind::DeleteExpression {
                delete_token,
                operand,
            },
            first,
        ))
    }

    fn postfix(&mut self) -> Option<NodeId> {
        let mut base = self.primary()?;
        while let Some(idx) = self.cur() {
            let first = self.first_of(base);
            base = match self.tokens[idx].kind {
                TokenKind::Punct(Punct::LParen) => {
                    let (arguments, rparen) = self.call_arguments()?;
                    self.finish(
                        NodeKind::CallExpression {
                            base,
                            lparen: idx,
                            arguments,
                            rparen,
                        },
                        first,
                    )
                }
                TokenKind::Punct(Punct::LBracket) => {
                    self.bump();
                    let index = if self.at(Punct::RBracket) {
                        None
                    } else {
                        Some(self.nested_expression_body()?)
                    };
                    self.expect(Punct::RBracket, "']'");
                    self.finish(NodeKind::ArrayAccess { base, index }, first)
                }
                TokenKind::Punct(p @ (Punct::Dot | Punct::Arrow)) => {
                    self.bump();
                    self.eat_kw("template");
                    let member = self.name(true)?;
                    self.finish(
                        NodeKind::MemberAccess {
                            base,
                            access_token: idx,
                            arrow: p == Punct::Arrow,
                            member,
                        },
                        first,
                    )
                }
                TokenKind::Punct(p @ (Punct::PlusPlus | Punct::MinusMinus)) => {
                    self.bump();
                    self.finish(
                        NodeKind::PostIncrDecr {
                            base,
                            op_token: idx,
                            increment: p == Punct::PlusPlus,
                        },
                        first,
                    )
                }
                TokenKind::Punct(Punct::LBrace)
                    if matches!(self.kind_of(base), NodeKind::IdExpression { .. }) =>
                {
                    let initializer = self.braced_initializer()?;
                    self.finish(
                        NodeKind::TypeConstruction {
                            specifier: base,
                            initializer,
                        },
                        first,
                    )
                }
                _ => break,
            };
        }
        Some(base)
    }

    fn call_arguments(&mut self) -> Option<(Vec<NodeId>, Option<TokenIdx>)> {
        self.bump();
        let saved = self.no_gt;
        self.no_gt = false;
        let mut arguments = Vec::new();
        let result = loop {
            if self.at(Punct::RParen) {
                break Some(());
            }
            let arg = if self.at(Punct::LBrace) {
                self.braced_initializer()
            } else {
                self.assignment_expression()
            };
            let Some(arg) = arg else { break None };
            self.eat(Punct::Ellipsis);
            arguments.push(arg);
            if self.eat(Punct::Comma).is_none() {
                break Some(());
            }
        };
        self.no_gt = saved;
        result?;
        let rparen = self.expect(Punct::RParen, "')' closing call");
        Some((arguments, rparen))
    }

    fn expression_list(&mut self) -> Option<NodeId> {
        let lparen = self.cur()?;
        let (expressions, rparen) = self.call_arguments()?;
        Some(self.finish(
            NodeKind::ExpressionList {
                lparen,
                expressions,
                rparen,
            },
            lparen,
        ))
    }

    fn braced_initializer(&mut self) -> Option<NodeId> {
        let lbrace = self.bump();
        let saved = self.no_gt;
        self.no_gt = false;
        let mut expressions = Vec::new();
        let result = loop {
            if self.at(Punct::RBrace) {
                break Some(());
            }
            if self.at(Punct::Dot)
                && self.kind_at(1) == Some(TokenKind::Identifier)
                && self.is_punct_at(2, Punct::Eq)
            {
                self.bump_n(3);
            }
            let expr = if self.at(Punct::LBrace) {
                self.braced_initializer()
            } else {
                self.assignment_expression()
            };
            let Some(expr) = expr else { break None };
            self.eat(Punct::Ellipsis);
            expressions.push(expr);
            if self.eat(Punct::Comma).is_none() {
                break Some(());
            }
        };
        self.no_gt = saved;
        result?;
        let rbrace = self.expect(Punct::RBrace, "'}' closing initializer");
        Some(self.finish(
            NodeKind::BracedInitializer {
                lbrace,
                expressions,
                rbrace,
            },
            lbrace,
        ))
    }

    fn primary(&mut self) -> Option<NodeId> {
        let idx = self.cur()?;
        match self.tokens[idx].kind {
            TokenKind::IntLiteral | TokenKind::FloatLiteral => {
                self.bump();
                Some(self.alloc(NodeKind::NumericLiteral { token: idx }, idx, idx))
            }
            TokenKind::CharLiteral => {
                self.bump();
                Some(self.alloc(NodeKind::CharLiteral { token: idx }, idx, idx))
            }
            TokenKind::StringLiteral => {
                self.bump();
                while self.kind_at(0) == Some(TokenKind::StringLiteral) {
                    self.bump();
                }
                Some(self.finish(NodeKind::StringLiteral, idx))
            }
            TokenKind::Punct(Punct::LParen) => {
                let lparen = self.bump();
                let expression = self.nested_expression_body()?;
                let rparen = self.expect(Punct::RParen, "')'");
                Some(self.finish(
                    NodeKind::NestedExpression {
                        lparen,
                        expression,
                        rparen,
                    },
                    lparen,
                ))
            }
            TokenKind::Punct(Punct::LBracket) => self.lambda(),
            TokenKind::Punct(Punct::LBrace) => self.braced_initializer(),
            TokenKind::Identifier | TokenKind::Punct(Punct::ColonColon) => {
                let name = self.name(true)?;
                Some(self.finish(NodeKind::IdExpression { name }, idx))
            }
            TokenKind::Keyword => self.keyword_primary(idx),
            _ => None,
        }
    }

    fn keyword_primary(&mut self, idx: TokenIdx) -> Option<NodeId> {
        let kw = self.text(idx);
        match kw {
            "true" | "false" => {
                self.bump();
                Some(self.alloc(NodeKind::BoolLiteral { token: idx }, idx, idx))
            }
            "nullptr" => {
                self.bump();
                Some(self.alloc(NodeKind::NullptrLiteral, idx, idx))
            }
            "this" => {
                self.bump();
                Some(self.alloc(NodeKind::ThisExpression, idx, idx))
            }
            "static_cast" | "dynamic_cast" | "const_cast" | "reinterpret_cast" => {
                self.bump();
                self.expect(Punct::Lt, "'<' after cast")?;
                let saved = self.no_gt;
                self.no_gt = true;
                let type_id = self.type_id(false);
                self.no_gt = saved;
                let type_id = type_id?;
                self.expect(Punct::Gt, "'>' after cast type")?;
                self.expect(Punct::LParen, "'(' after cast")?;
                let operand = self.nested_expression_body()?;
                self.expect(Punct::RParen, "')' closing cast");
                Some(self.finish(
                    NodeKind::CppCastExpression {
                        cast_token: idx,
                        type_id,
                        operand,
                    },
                    idx,
                ))
            }
            "typeid" | "noexcept" => {
                self.bump();
                if self.at(Punct::LParen) {
                    self.skip_balanced()?;
                }
                Some(self.finish(NodeKind::Opaque, idx))
            }
            "operator" => {
                let name = self.name(true)?;
                Some(self.finish(NodeKind::IdExpression { name }, idx))
            }
            "typename" => {
                self.bump();
                let name = self.name(true)?;
                let specifier = self.finish(NodeKind::NamedTypeSpecifier { name }, idx);
                self.construction(specifier, idx)
            }
            _ if is_type_keyword(kw)
                && (self.is_punct_at(1, Punct::LParen) || self.is_punct_at(1, Punct::LBrace)) =>
            {
                self.bump();
                let specifier = self.alloc(NodeKind::SimpleSpecifier { token: idx }, idx, idx);
                self.construction(specifier, idx)
            }
            _ => None,
        }
    }

    fn construction(&mut self, specifier: NodeId, first: TokenIdx) -> Option<NodeId> {
        let initializer = if self.at(Punct::LParen) {
            self.expression_list()?
        } else if self.at(Punct::LBrace) {
            self.braced_initializer()?
        } else {
            return None;
        };
        Some(self.finish(
            NodeKind::TypeConstruction {
                specifier,
                initializer,
            },
            first,
        ))
    }

    fn lambda(&mut self) -> Option<NodeId> {
        let first = self.cur()?;
        self.skip_balanced()?;
        if self.at(Punct::Lt) {
            self.skip_angle_balanced();
        }
        let mut parameters = Vec::new();
        if self.at(Punct::LParen) {
            let postfix = self.function_postfix()?;
            if let NodeKind::FunctionDeclarator { parameters: p, .. } = self.kind_of(postfix) {
                parameters = p.clone();
            }
        }
        loop {
            if self.at_kw("mutable") || self.at_kw("constexpr") {
                self.bump();
            } else if self.at_kw("noexcept") {
                self.bump();
                if self.at(Punct::LParen) {
                    self.skip_balanced()?;
                }
            } else {
                break;
            }
        }
        if self.eat(Punct::Arrow).is_some() {
            self.type_id(false)?;
        }
        let body = self.compound_statement()?;
        Some(self.finish(NodeKind::LambdaExpression { parameters, body }, first))
    }
}

const SHIFT_PRECEDENCE: u8 = 9;
