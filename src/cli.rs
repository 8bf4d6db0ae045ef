use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;

use crate::fix::Access;

/// A `LINE:COL` position: 1-indexed line, 0-indexed column in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextPosition {
    pub line: usize,
    pub column: usize,
}

impl FromStr for TextPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (line, column) = s
            .split_once(':')
            .ok_or_else(|| format!("expected LINE:COL, got `{s}`"))?;
        let line: usize = line
            .trim()
            .parse()
            .map_err(|_| format!("invalid line in `{s}`"))?;
        let column: usize = column
            .trim()
            .parse()
            .map_err(|_| format!("invalid column in `{s}`"))?;
        if line == 0 {
            return Err(format!("lines are 1-indexed, got `{s}`"));
        }
        Ok(Self { line, column })
    }
}

impl fmt::Display for TextPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A `L:C-L:C` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRange {
    pub start: TextPosition,
    pub end: TextPosition,
}

impl FromStr for TextRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| format!("expected L:C-L:C, got `{s}`"))?;
        Ok(Self {
            start: start.parse()?,
            end: end.parse()?,
        })
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "cppfix",
    version,
    about = "Cursor-driven quick fixes and refactorings for C++ sources"
)]
pub struct Args {
    /// File to fix at a position, or files and directories to survey
    #[arg(default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Cursor position (1-indexed line, 0-indexed column)
    #[arg(long, value_name = "LINE:COL", conflicts_with_all = ["offset", "select"])]
    pub at: Option<TextPosition>,

    /// Cursor position as a byte offset
    #[arg(long, value_name = "N", conflicts_with = "select")]
    pub offset: Option<usize>,

    /// Selection range; the cursor is its start
    #[arg(long, value_name = "L:C-L:C")]
    pub select: Option<TextRange>,

    /// Perform the candidate with this list index or fix name
    #[arg(long, value_name = "INDEX|FIX_NAME")]
    pub apply: Option<String>,

    /// Print the resulting texts instead of writing them
    #[arg(long, requires = "apply")]
    pub dry_run: bool,

    /// Name for an extracted function
    #[arg(long, value_name = "NAME")]
    pub function_name: Option<String>,

    /// Access section for an extracted member function (public, private slots, ...)
    #[arg(long, value_name = "ACCESS")]
    pub access: Option<Access>,

    /// List every fix offered anywhere in the given files and directories
    #[arg(long, conflicts_with_all = ["at", "offset", "select", "apply"])]
    pub survey: bool,

    /// List all registered fix names, one per line, then exit
    #[arg(long)]
    pub list_fixes: bool,

    /// Read source from stdin, use PATH for display and config matching
    #[arg(long, value_name = "PATH")]
    pub stdin: Option<PathBuf>,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

/// Where the user pointed, before it is resolved against a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorRequest {
    Position(TextPosition),
    Offset(usize),
    Selection(TextRange),
}

impl Args {
    pub fn cursor_request(&self) -> Option<CursorRequest> {
        if let Some(range) = self.select {
            return Some(CursorRequest::Selection(range));
        }
        if let Some(pos) = self.at {
            return Some(CursorRequest::Position(pos));
        }
        self.offset.map(CursorRequest::Offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("cppfix").chain(args.iter().copied()))
    }

    #[test]
    fn positions() {
        assert_eq!(
            "3:4".parse::<TextPosition>(),
            Ok(TextPosition { line: 3, column: 4 })
        );
        assert!("0:4".parse::<TextPosition>().is_err());
        assert!("3".parse::<TextPosition>().is_err());
        assert!("a:1".parse::<TextPosition>().is_err());
    }

    #[test]
    fn ranges() {
        let range: TextRange = "2:0-4:10".parse().unwrap();
        assert_eq!(range.start, TextPosition { line: 2, column: 0 });
        assert_eq!(range.end, TextPosition { line: 4, column: 10 });
        assert!("2:0".parse::<TextRange>().is_err());
    }

    #[test]
    fn cursor_forms() {
        let args = parse(&["a.cpp", "--at", "1:2"]).unwrap();
        assert_eq!(
            args.cursor_request(),
            Some(CursorRequest::Position(TextPosition { line: 1, column: 2 }))
        );
        let args = parse(&["a.cpp", "--offset", "7"]).unwrap();
        assert_eq!(args.cursor_request(), Some(CursorRequest::Offset(7)));
        let args = parse(&["a.cpp"]).unwrap();
        assert_eq!(args.cursor_request(), None);
    }

    #[test]
    fn conflicting_cursor_forms_are_rejected() {
        assert!(parse(&["a.cpp", "--at", "1:2", "--offset", "3"]).is_err());
        assert!(parse(&["a.cpp", "--survey", "--at", "1:2"]).is_err());
    }

    #[test]
    fn dry_run_requires_apply() {
        assert!(parse(&["a.cpp", "--at", "1:2", "--dry-run"]).is_err());
        let args = parse(&["a.cpp", "--at", "1:2", "--apply", "0", "--dry-run"]).unwrap();
        assert!(args.dry_run);
        assert_eq!(args.apply.as_deref(), Some("0"));
    }

    #[test]
    fn access_flag() {
        let args = parse(&["a.cpp", "--access", "private slots"]).unwrap();
        assert_eq!(args.access, Some(Access::PrivateSlots));
        assert!(parse(&["a.cpp", "--access", "friend"]).is_err());
    }

    #[test]
    fn format_is_restricted() {
        assert!(parse(&["--format", "json"]).is_ok());
        assert!(parse(&["--format", "xml"]).is_err());
    }
}
