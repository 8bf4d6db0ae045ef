use std::fmt;

use crate::parse::parser::is_type_keyword;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PtrOp {
    Pointer,
    Reference,
    RValueReference,
}

impl PtrOp {
    fn as_str(self) -> &'static str {
        match self {
            PtrOp::Pointer => "*",
            PtrOp::Reference => "&",
            PtrOp::RValueReference => "&&",
        }
    }
}

/// Keywords that qualify a declaration but are not part of its type.
const STORAGE_KEYWORDS: &[&str] = &[
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
];

/// A spelled type: the specifier words plus the pointer/reference operators
/// of one declarator, innermost (closest to the name) last.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Type {
    pub specifiers: String,
    pub ptr_ops: Vec<PtrOp>,
}

impl Type {
    pub fn new(specifiers: &str, ptr_ops: Vec<PtrOp>) -> Self {
        Self {
            specifiers: normalize_spaces(specifiers),
            ptr_ops,
        }
    }

    pub fn named(specifiers: &str) -> Self {
        Self::new(specifiers, Vec::new())
    }

    pub fn is_valid(&self) -> bool {
        !self.specifiers.is_empty()
    }

    pub fn is_pointer(&self) -> bool {
        self.ptr_ops.last() == Some(&PtrOp::Pointer)
    }

    pub fn is_reference(&self) -> bool {
        matches!(
            self.ptr_ops.last(),
            Some(PtrOp::Reference | PtrOp::RValueReference)
        )
    }

    pub fn pointer_depth(&self) -> usize {
        self.ptr_ops.iter().filter(|op| **op == PtrOp::Pointer).count()
    }

    /// The type with its innermost operator removed.
    pub fn pointee(&self) -> Type {
        let mut ptr_ops = self.ptr_ops.clone();
        ptr_ops.pop();
        Type {
            specifiers: self.specifiers.clone(),
            ptr_ops,
        }
    }

    pub fn pointer_to(&self) -> Type {
        let mut ptr_ops = self.ptr_ops.clone();
        ptr_ops.push(PtrOp::Pointer);
        Type {
            specifiers: self.specifiers.clone(),
            ptr_ops,
        }
    }

    /// Strip a trailing reference, keeping pointers.
    pub fn without_reference(&self) -> Type {
        if self.is_reference() {
            self.pointee()
        } else {
            self.clone()
        }
    }

    pub fn is_const(&self) -> bool {
        self.specifiers.split(' ').any(|w| w == "const")
    }

    /// Specifier words minus cv-qualifiers and storage keywords.
    pub fn base_name(&self) -> String {
        self.specifiers
            .split(' ')
            .filter(|w| *w != "const" && *w != "volatile" && !STORAGE_KEYWORDS.contains(w))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Without `class`/`struct`/`enum` keys, for name lookups.
    pub fn lookup_name(&self) -> String {
        self.base_name()
            .split(' ')
            .filter(|w| !matches!(*w, "class" | "struct" | "union" | "enum" | "typename"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn is_auto(&self) -> bool {
        self.base_name() == "auto"
    }

    pub fn is_void(&self) -> bool {
        self.ptr_ops.is_empty() && self.base_name() == "void"
    }

    pub fn is_builtin(&self) -> bool {
        let base = self.base_name();
        !base.is_empty() && base.split(' ').all(is_type_keyword)
    }

    pub fn is_bool(&self) -> bool {
        self.ptr_ops.is_empty() && self.base_name() == "bool"
    }

    /// `int *name`, `const Foo &name`, or `int name`.
    pub fn declare(&self, name: &str) -> String {
        let ops: String = self.ptr_ops.iter().map(|op| op.as_str()).collect();
        match (ops.is_empty(), name.is_empty()) {
            (true, true) => self.specifiers.clone(),
            (true, false) => format!("{} {name}", self.specifiers),
            (false, _) => format!("{} {ops}{name}", self.specifiers),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.declare(""))
    }
}

pub(crate) fn normalize_spaces(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The type of an integer or floating literal, read from its suffix.
pub fn numeric_literal_type(spelling: &str, is_float: bool) -> Type {
    let lower = spelling.to_ascii_lowercase();
    let is_hex = lower.starts_with("0x");
    if is_float {
        let suffix = lower.chars().last().unwrap_or('0');
        return match suffix {
            'f' if !is_hex => Type::named("float"),
            'l' => Type::named("long double"),
            _ => Type::named("double"),
        };
    }
    let suffix: String = lower
        .chars()
        .rev()
        .take_while(|c| matches!(c, 'u' | 'l' | 'z'))
        .collect();
    let unsigned = suffix.contains('u');
    let longs = suffix.matches('l').count();
    let name = match (unsigned, longs) {
        (false, 0) => "int",
        (true, 0) => "unsigned int",
        (false, 1) => "long",
        (true, 1) => "unsigned long",
        (false, _) => "long long",
        (true, _) => "unsigned long long",
    };
    Type::named(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_with_operators() {
        let ty = Type::new("const  char", vec![PtrOp::Pointer]);
        assert_eq!(ty.declare("s"), "const char *s");
        assert_eq!(ty.to_string(), "const char *");
        assert_eq!(Type::named("int").declare("x"), "int x");
        assert_eq!(Type::new("Foo", vec![PtrOp::Reference]).declare("f"), "Foo &f");
    }

    #[test]
    fn pointer_queries() {
        let ty = Type::new("Foo", vec![PtrOp::Pointer, PtrOp::Pointer]);
        assert!(ty.is_pointer());
        assert_eq!(ty.pointer_depth(), 2);
        assert_eq!(ty.pointee().pointer_depth(), 1);
        let r = Type::new("int", vec![PtrOp::Pointer, PtrOp::Reference]);
        assert!(r.is_reference());
        assert!(r.without_reference().is_pointer());
    }

    #[test]
    fn base_name_strips_qualifiers() {
        let ty = Type::named("static const unsigned int");
        assert_eq!(ty.base_name(), "unsigned int");
        assert!(ty.is_builtin());
        assert!(ty.is_const());
        assert_eq!(Type::named("enum Color").lookup_name(), "Color");
        assert!(!Type::named("std::string").is_builtin());
    }

    #[test]
    fn literal_suffixes() {
        assert_eq!(numeric_literal_type("42", false), Type::named("int"));
        assert_eq!(numeric_literal_type("42u", false), Type::named("unsigned int"));
        assert_eq!(numeric_literal_type("42UL", false), Type::named("unsigned long"));
        assert_eq!(numeric_literal_type("42ll", false), Type::named("long long"));
        assert_eq!(numeric_literal_type("0xFFull", false), Type::named("unsigned long long"));
        assert_eq!(numeric_literal_type("1.5", true), Type::named("double"));
        assert_eq!(numeric_literal_type("1.5f", true), Type::named("float"));
        assert_eq!(numeric_literal_type("1.5L", true), Type::named("long double"));
    }
}
