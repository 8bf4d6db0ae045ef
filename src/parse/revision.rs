use std::fmt;

use sha2::{Digest, Sha256};

/// SHA-256 fingerprint of a document's text.
///
/// Captured when candidates are matched and compared again before they are
/// performed, so an operation never applies offsets to edited text.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Revision([u8; 32]);

impl Revision {
    pub fn of(text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        Self(hasher.finalize().into())
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// First 12 hex digits, enough for log lines.
    pub fn short(&self) -> String {
        self.to_hex()[..12].to_string()
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Revision({})", self.short())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_same_revision() {
        assert_eq!(Revision::of("int x;"), Revision::of("int x;"));
        assert_ne!(Revision::of("int x;"), Revision::of("int y;"));
    }

    #[test]
    fn hex_form() {
        let rev = Revision::of("");
        assert_eq!(
            rev.to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(rev.short(), "e3b0c44298fc");
        assert_eq!(format!("{rev:?}"), "Revision(e3b0c44298fc)");
    }
}
