pub mod json;
pub mod text;

use std::io::Write;

use crate::report::{CandidateListing, PerformReport, SurveyReport};

/// Renders engine results for the terminal or for tools.
pub trait Formatter {
    fn format_listing(&self, listing: &CandidateListing, out: &mut dyn Write);

    fn format_survey(&self, report: &SurveyReport, out: &mut dyn Write);

    fn format_report(&self, report: &PerformReport, out: &mut dyn Write);

    fn print_listing(&self, listing: &CandidateListing) {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        self.format_listing(listing, &mut lock);
    }

    fn print_survey(&self, report: &SurveyReport) {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        self.format_survey(report, &mut lock);
    }

    fn print_report(&self, report: &PerformReport) {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        self.format_report(report, &mut lock);
    }
}

pub fn create_formatter(format: &str) -> Box<dyn Formatter> {
    match format {
        "json" => Box::new(json::JsonFormatter),
        // "text" and any unknown value
        _ => Box::new(text::TextFormatter),
    }
}
