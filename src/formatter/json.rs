use std::io::Write;

use serde::Serialize;

use crate::formatter::Formatter;
use crate::report::{CandidateListing, PerformReport, SurveyReport};

pub struct JsonFormatter;

fn write_json(value: &impl Serialize, out: &mut dyn Write) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            let _ = writeln!(out, "{json}");
        }
        Err(err) => tracing::error!(%err, "failed to serialize output"),
    }
}

#[derive(Serialize)]
struct SurveyOutput<'a> {
    metadata: SurveyMetadata,
    entries: &'a [crate::report::SurveyEntry],
}

#[derive(Serialize)]
struct SurveyMetadata {
    files_inspected: usize,
    fix_count: usize,
}

impl Formatter for JsonFormatter {
    fn format_listing(&self, listing: &CandidateListing, out: &mut dyn Write) {
        write_json(listing, out);
    }

    fn format_survey(&self, report: &SurveyReport, out: &mut dyn Write) {
        let output = SurveyOutput {
            metadata: SurveyMetadata {
                files_inspected: report.files_inspected,
                fix_count: report.entries.len(),
            },
            entries: &report.entries,
        };
        write_json(&output, out);
    }

    fn format_report(&self, report: &PerformReport, out: &mut dyn Write) {
        write_json(report, out);
    }
}
