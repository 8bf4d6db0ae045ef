//! C++ lexer.
//!
//! Produces every token of the input, comments and preprocessor lines
//! included, each with its byte span. The parser skips the trivia kinds;
//! comment-aware fixes read them straight from the token stream.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    /// `// ...`
    Line,
    /// `/// ...` or `//! ...`
    LineDoxygen,
    /// `/* ... */`
    Block,
    /// `/** ... */` or `/*! ... */`
    BlockDoxygen,
}

impl CommentKind {
    pub fn is_line(self) -> bool {
        matches!(self, CommentKind::Line | CommentKind::LineDoxygen)
    }

    pub fn is_doxygen(self) -> bool {
        matches!(self, CommentKind::LineDoxygen | CommentKind::BlockDoxygen)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Punct {
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
    Colon,
    ColonColon,
    Dot,
    DotStar,
    Ellipsis,
    Arrow,
    ArrowStar,
    Question,
    Plus,
    PlusPlus,
    PlusEq,
    Minus,
    MinusMinus,
    MinusEq,
    Star,
    StarEq,
    Slash,
    SlashEq,
    Percent,
    PercentEq,
    Amp,
    AmpAmp,
    AmpEq,
    Pipe,
    PipePipe,
    PipeEq,
    Caret,
    CaretEq,
    Tilde,
    Bang,
    BangEq,
    Eq,
    EqEq,
    Lt,
    LtEq,
    Shl,
    ShlEq,
    Spaceship,
    // `>` is never merged with a following `>`; see the parser's shift handling.
    Gt,
    GtEq,
    Hash,
    HashHash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Keyword,
    IntLiteral,
    FloatLiteral,
    CharLiteral,
    StringLiteral,
    Punct(Punct),
    Comment(CommentKind),
    Preprocessor,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn is_trivia(&self) -> bool {
        matches!(self.kind, TokenKind::Comment(_) | TokenKind::Preprocessor)
    }

    pub fn is_comment(&self) -> bool {
        matches!(self.kind, TokenKind::Comment(_))
    }

    pub fn is_punct(&self, punct: Punct) -> bool {
        self.kind == TokenKind::Punct(punct)
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::IntLiteral
                | TokenKind::FloatLiteral
                | TokenKind::CharLiteral
                | TokenKind::StringLiteral
        )
    }
}

pub const KEYWORDS: &[&str] = &[
    "alignas",
    "alignof",
    "asm",
    "auto",
    "bool",
    "break",
    "case",
    "catch",
    "char",
    "char16_t",
    "char32_t",
    "char8_t",
    "class",
    "const",
    "const_cast",
    "consteval",
    "constexpr",
    "constinit",
    "continue",
    "decltype",
    "default",
    "delete",
    "do",
    "double",
    "dynamic_cast",
    "else",
    "enum",
    "explicit",
    "export",
    "extern",
    "false",
    "float",
    "for",
    "friend",
    "goto",
    "if",
    "inline",
    "int",
    "long",
    "mutable",
    "namespace",
    "new",
    "noexcept",
    "nullptr",
    "operator",
    "private",
    "protected",
    "public",
    "register",
    "reinterpret_cast",
    "return",
    "short",
    "signed",
    "sizeof",
    "static",
    "static_assert",
    "static_cast",
    "struct",
    "switch",
    "template",
    "this",
    "thread_local",
    "throw",
    "true",
    "try",
    "typedef",
    "typeid",
    "typename",
    "union",
    "unsigned",
    "using",
    "virtual",
    "void",
    "volatile",
    "wchar_t",
    "while",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.binary_search(&word).is_ok()
}

const STRING_PREFIXES: &[&str] = &["L", "u", "U", "u8"];
const RAW_PREFIXES: &[&str] = &["R", "LR", "uR", "UR", "u8R"];

pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    /// True while only whitespace has been seen on the current line.
    line_start: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
            line_start: true,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.input.get(self.pos + ahead).copied()
    }

    fn starts_with(&self, s: &[u8]) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            match ch {
                b'\n' => {
                    self.line_start = true;
                    self.pos += 1;
                }
                b' ' | b'\t' | b'\r' | 0x0b | 0x0c => self.pos += 1,
                b'\\' if matches!(self.peek_at(1), Some(b'\n')) => self.pos += 2,
                b'\\' if self.input[self.pos + 1..].starts_with(b"\r\n") => self.pos += 3,
                _ => break,
            }
        }
    }

    fn read_while(&mut self, pred: impl Fn(u8) -> bool) {
        while self.pos < self.input.len() && pred(self.input[self.pos]) {
            self.pos += 1;
        }
    }

    fn is_ident_start(ch: u8) -> bool {
        ch.is_ascii_alphabetic() || ch == b'_' || ch >= 0x80
    }

    fn is_ident_char(ch: u8) -> bool {
        ch.is_ascii_alphanumeric() || ch == b'_' || ch >= 0x80
    }

    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let Some(ch) = self.peek() else { break };
            let start = self.pos;
            let kind = if ch == b'#' && self.line_start {
                self.lex_preprocessor();
                TokenKind::Preprocessor
            } else if self.starts_with(b"//") {
                self.lex_line_comment()
            } else if self.starts_with(b"/*") {
                self.lex_block_comment()
            } else if ch.is_ascii_digit()
                || (ch == b'.' && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()))
            {
                self.lex_number()
            } else if Self::is_ident_start(ch) {
                self.lex_word()
            } else if ch == b'"' {
                self.lex_quoted(b'"');
                TokenKind::StringLiteral
            } else if ch == b'\'' {
                self.lex_quoted(b'\'');
                TokenKind::CharLiteral
            } else if let Some((punct, len)) = self.match_punct() {
                self.pos += len;
                TokenKind::Punct(punct)
            } else {
                self.pos += 1;
                self.read_while(|c| (c & 0xC0) == 0x80);
                TokenKind::Unknown
            };
            self.line_start = false;
            tokens.push(Token {
                kind,
                start,
                end: self.pos,
            });
        }
        tokens
    }

    fn lex_preprocessor(&mut self) {
        while let Some(ch) = self.peek() {
            match ch {
                b'\n' => break,
                b'\\' if matches!(self.peek_at(1), Some(b'\n')) => self.pos += 2,
                b'\\' if self.input[self.pos + 1..].starts_with(b"\r\n") => self.pos += 3,
                _ => self.pos += 1,
            }
        }
        // Trailing '\r' of a CRLF line ending is not part of the directive.
        if self.pos > 0 && self.input[self.pos - 1] == b'\r' {
            self.pos -= 1;
        }
    }

    fn lex_line_comment(&mut self) -> TokenKind {
        let doxygen = (self.starts_with(b"///") && self.peek_at(3) != Some(b'/'))
            || self.starts_with(b"//!");
        self.read_while(|c| c != b'\n');
        if self.pos > 0 && self.input[self.pos - 1] == b'\r' {
            self.pos -= 1;
        }
        TokenKind::Comment(if doxygen {
            CommentKind::LineDoxygen
        } else {
            CommentKind::Line
        })
    }

    fn lex_block_comment(&mut self) -> TokenKind {
        let doxygen = (self.starts_with(b"/**")
            && !matches!(self.peek_at(3), Some(b'*') | Some(b'/')))
            || self.starts_with(b"/*!");
        self.pos += 2;
        loop {
            match self.peek() {
                None => break,
                Some(b'*') if self.peek_at(1) == Some(b'/') => {
                    self.pos += 2;
                    break;
                }
                Some(_) => self.pos += 1,
            }
        }
        TokenKind::Comment(if doxygen {
            CommentKind::BlockDoxygen
        } else {
            CommentKind::Block
        })
    }

    fn lex_number(&mut self) -> TokenKind {
        let start = self.pos;
        let hex = self.starts_with(b"0x") || self.starts_with(b"0X");
        loop {
            match self.peek() {
                Some(c) if c.is_ascii_alphanumeric() || c == b'_' || c == b'.' => {
                    let exponent = if hex {
                        matches!(c, b'p' | b'P')
                    } else {
                        matches!(c, b'e' | b'E')
                    };
                    self.pos += 1;
                    if exponent && matches!(self.peek(), Some(b'+') | Some(b'-')) {
                        self.pos += 1;
                    }
                }
                Some(b'\'') if self.peek_at(1).is_some_and(|c| c.is_ascii_alphanumeric()) => {
                    self.pos += 1;
                }
                _ => break,
            }
        }
        let text = &self.input[start..self.pos];
        let float = if hex {
            text.iter().any(|&c| matches!(c, b'.' | b'p' | b'P'))
        } else {
            text.iter().any(|&c| matches!(c, b'.' | b'e' | b'E'))
        };
        if float {
            TokenKind::FloatLiteral
        } else {
            TokenKind::IntLiteral
        }
    }

    fn lex_word(&mut self) -> TokenKind {
        let start = self.pos;
        self.read_while(Self::is_ident_char);
        let word = String::from_utf8_lossy(&self.input[start..self.pos]);
        match self.peek() {
            Some(b'"') if RAW_PREFIXES.contains(&word.as_ref()) => {
                self.lex_raw_string();
                return TokenKind::StringLiteral;
            }
            Some(b'"') if STRING_PREFIXES.contains(&word.as_ref()) => {
                self.lex_quoted(b'"');
                return TokenKind::StringLiteral;
            }
            Some(b'\'') if STRING_PREFIXES.contains(&word.as_ref()) => {
                self.lex_quoted(b'\'');
                return TokenKind::CharLiteral;
            }
            _ => {}
        }
        if is_keyword(&word) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        }
    }

    /// Reads a quoted literal including any user-defined suffix. An
    /// unterminated literal stops at the end of the line.
    fn lex_quoted(&mut self, quote: u8) {
        self.pos += 1;
        while let Some(ch) = self.peek() {
            match ch {
                b'\\' => self.pos = (self.pos + 2).min(self.input.len()),
                b'\n' => return,
                c if c == quote => {
                    self.pos += 1;
                    self.read_while(Self::is_ident_char);
                    return;
                }
                _ => self.pos += 1,
            }
        }
    }

    fn lex_raw_string(&mut self) {
        // At the opening quote of R"delim( ... )delim"
        self.pos += 1;
        let delim_start = self.pos;
        self.read_while(|c| c != b'(' && c != b'\n' && c != b'"');
        if self.peek() != Some(b'(') {
            return;
        }
        let mut terminator = vec![b')'];
        terminator.extend_from_slice(&self.input[delim_start..self.pos]);
        terminator.push(b'"');
        self.pos += 1;
        while self.pos < self.input.len() {
            if self.starts_with(&terminator) {
                self.pos += terminator.len();
                self.read_while(Self::is_ident_char);
                return;
            }
            self.pos += 1;
        }
    }

    fn match_punct(&self) -> Option<(Punct, usize)> {
        use Punct::*;
        const TABLE: &[(&[u8], Punct)] = &[
            (b"<=>", Spaceship),
            (b"<<=", ShlEq),
            (b"...", Ellipsis),
            (b"->*", ArrowStar),
            (b"::", ColonColon),
            (b"->", Arrow),
            (b".*", DotStar),
            (b"++", PlusPlus),
            (b"+=", PlusEq),
            (b"--", MinusMinus),
            (b"-=", MinusEq),
            (b"*=", StarEq),
            (b"/=", SlashEq),
            (b"%=", PercentEq),
            (b"&&", AmpAmp),
            (b"&=", AmpEq),
            (b"||", PipePipe),
            (b"|=", PipeEq),
            (b"^=", CaretEq),
            (b"!=", BangEq),
            (b"==", EqEq),
            (b"<=", LtEq),
            (b"<<", Shl),
            (b">=", GtEq),
            (b"##", HashHash),
            (b"(", LParen),
            (b")", RParen),
            (b"{", LBrace),
            (b"}", RBrace),
            (b"[", LBracket),
            (b"]", RBracket),
            (b";", Semicolon),
            (b",", Comma),
            (b":", Colon),
            (b".", Dot),
            (b"?", Question),
            (b"+", Plus),
            (b"-", Minus),
            (b"*", Star),
            (b"/", Slash),
            (b"%", Percent),
            (b"&", Amp),
            (b"|", Pipe),
            (b"^", Caret),
            (b"~", Tilde),
            (b"!", Bang),
            (b"=", Eq),
            (b"<", Lt),
            (b">", Gt),
            (b"#", Hash),
        ];
        TABLE
            .iter()
            .find(|(text, _)| self.starts_with(text))
            .map(|(text, punct)| (*punct, text.len()))
    }
}

pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}
