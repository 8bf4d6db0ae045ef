use std::io::Write;

use crate::formatter::Formatter;
use crate::report::{CandidateListing, PerformReport, SurveyReport};

pub struct TextFormatter;

fn plural(count: usize, one: &str, many: &str) -> String {
    format!("{count} {}", if count == 1 { one } else { many })
}

impl Formatter for TextFormatter {
    fn format_listing(&self, listing: &CandidateListing, out: &mut dyn Write) {
        if listing.candidates.is_empty() {
            let _ = writeln!(out, "{}:{}: no quick fix available", listing.path, listing.location);
            return;
        }
        let _ = writeln!(out, "{}:{}:", listing.path, listing.location);
        for candidate in &listing.candidates {
            let _ = writeln!(out, "  {candidate}");
        }
    }

    fn format_survey(&self, report: &SurveyReport, out: &mut dyn Write) {
        for entry in &report.entries {
            let _ = writeln!(out, "{entry}");
        }
        let _ = writeln!(
            out,
            "\n{} inspected, {} offered",
            plural(report.files_inspected, "file", "files"),
            plural(report.entries.len(), "fix", "fixes")
        );
    }

    fn format_report(&self, report: &PerformReport, out: &mut dyn Write) {
        let verb = if report.dry_run { "would change" } else { "changed" };
        let _ = writeln!(out, "{}: {}", report.fix_name, report.description);
        for change in &report.changes {
            if report.dry_run {
                let _ = writeln!(out, "--- {} ---", change.path);
                let _ = write!(out, "{}", change.text);
                if !change.text.ends_with('\n') {
                    let _ = writeln!(out);
                }
            } else {
                let _ = writeln!(out, "  {verb} {}", change.path);
            }
        }
        for warning in &report.warnings {
            let _ = writeln!(out, "  warning: {warning}");
        }
        let _ = writeln!(out, "{} {verb}", plural(report.changes.len(), "file", "files"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{Candidate, FileChange, Location, SurveyEntry};

    fn render(f: impl Fn(&mut Vec<u8>)) -> String {
        let mut out = Vec::new();
        f(&mut out);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn listing_shows_ranked_candidates() {
        let listing = CandidateListing {
            path: "a.cpp".to_string(),
            location: Location { line: 2, column: 4 },
            candidates: vec![Candidate {
                index: 0,
                fix_name: "Statement/AddBraces".to_string(),
                description: "Add Curly Braces".to_string(),
                priority: 0,
            }],
        };
        let text = render(|out| TextFormatter.format_listing(&listing, out));
        assert_eq!(text, "a.cpp:2:4:\n  [0] Statement/AddBraces: Add Curly Braces (priority 0)\n");
    }

    #[test]
    fn empty_listing_says_so() {
        let listing = CandidateListing {
            path: "a.cpp".to_string(),
            location: Location { line: 1, column: 0 },
            candidates: Vec::new(),
        };
        let text = render(|out| TextFormatter.format_listing(&listing, out));
        assert_eq!(text, "a.cpp:1:0: no quick fix available\n");
    }

    #[test]
    fn survey_summary() {
        let report = SurveyReport {
            files_inspected: 1,
            entries: vec![SurveyEntry {
                path: "a.cpp".to_string(),
                location: Location { line: 1, column: 8 },
                fix_name: "Expression/ConvertNumericLiteral".to_string(),
                description: "Convert to Octal".to_string(),
            }],
        };
        let text = render(|out| TextFormatter.format_survey(&report, out));
        assert!(text.starts_with("a.cpp:1:8: Expression/ConvertNumericLiteral: Convert to Octal\n"));
        assert!(text.ends_with("1 file inspected, 1 fix offered\n"));
    }

    #[test]
    fn dry_run_prints_new_text() {
        let report = PerformReport {
            fix_name: "Statement/AddBraces".to_string(),
            description: "Add Curly Braces".to_string(),
            dry_run: true,
            changes: vec![FileChange {
                path: "a.cpp".to_string(),
                text: "if (x) {\n    f();\n}".to_string(),
            }],
            warnings: vec!["skipped edit".to_string()],
        };
        let text = render(|out| TextFormatter.format_report(&report, out));
        assert!(text.contains("--- a.cpp ---\nif (x) {\n    f();\n}\n"));
        assert!(text.contains("  warning: skipped edit\n"));
        assert!(text.ends_with("1 file would change\n"));
    }
}
