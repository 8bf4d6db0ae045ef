use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Location {
    /// 1-indexed line number
    pub line: usize,
    /// 0-indexed column (characters within the line)
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// One operation offered at a cursor, as presented to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    /// Position in the ranked list, usable with `--apply`.
    pub index: usize,
    pub fix_name: String,
    pub description: String,
    pub priority: i32,
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} (priority {})",
            self.index, self.fix_name, self.description, self.priority
        )
    }
}

/// Ranked candidates for one cursor position.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateListing {
    pub path: String,
    pub location: Location,
    pub candidates: Vec<Candidate>,
}

/// A fix offered somewhere in a surveyed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SurveyEntry {
    pub path: String,
    pub location: Location,
    pub fix_name: String,
    pub description: String,
}

impl SurveyEntry {
    pub fn sort_key(&self) -> (&str, Location, &str, &str) {
        (&self.path, self.location, &self.fix_name, &self.description)
    }
}

impl fmt::Display for SurveyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.path, self.location, self.fix_name, self.description
        )
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SurveyReport {
    pub files_inspected: usize,
    pub entries: Vec<SurveyEntry>,
}

/// New text of one file touched by an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    pub path: String,
    pub text: String,
}

/// What a performed operation did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PerformReport {
    pub fix_name: String,
    pub description: String,
    pub dry_run: bool,
    pub changes: Vec<FileChange>,
    /// Secondary edits that were skipped or failed.
    pub warnings: Vec<String>,
}

impl PerformReport {
    pub fn files_written(&self) -> Vec<&str> {
        self.changes.iter().map(|c| c.path.as_str()).collect()
    }
}
