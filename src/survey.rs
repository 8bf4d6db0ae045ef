use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::ResolvedConfig;
use crate::dispatcher::Dispatcher;
use crate::fix::registry::FactoryRegistry;
use crate::parse::Document;
use crate::parse::lexer::TokenKind;
use crate::refactoring::DocumentStore;
use crate::report::{SurveyEntry, SurveyReport};

/// List every fix offered anywhere in `files`.
///
/// Files are surveyed in parallel; matching inside one file stays on one
/// thread. Unreadable files are logged and skipped.
pub fn survey(
    files: &[PathBuf],
    registry: &FactoryRegistry,
    config: &ResolvedConfig,
    store: &dyn DocumentStore,
) -> SurveyReport {
    let start = Instant::now();
    let inspected = AtomicUsize::new(0);

    let mut entries: Vec<SurveyEntry> = files
        .par_iter()
        .flat_map(|path| {
            let text = match store.read(path) {
                Ok(t) => t,
                Err(err) => {
                    warn!(path = %path.display(), %err, "skipping unreadable file");
                    return Vec::new();
                }
            };
            inspected.fetch_add(1, Ordering::Relaxed);
            survey_document(&Arc::new(Document::parse(path.clone(), text)), registry, config, store)
        })
        .collect();

    entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    entries.dedup();
    let files_inspected = inspected.into_inner();
    debug!(
        files = files_inspected,
        entries = entries.len(),
        elapsed = ?start.elapsed(),
        "survey finished"
    );
    SurveyReport {
        files_inspected,
        entries,
    }
}

/// Check the start of every token other than preprocessor lines.
pub fn survey_document(
    document: &Arc<Document>,
    registry: &FactoryRegistry,
    config: &ResolvedConfig,
    store: &dyn DocumentStore,
) -> Vec<SurveyEntry> {
    let dispatcher = Dispatcher::new(registry, config);
    let path = display_path(document.path());
    let mut entries = Vec::new();
    for token in document.tokens() {
        if token.kind == TokenKind::Preprocessor {
            continue;
        }
        let location = document.source().offset_to_location(token.start);
        for op in dispatcher.candidates(document, token.start, None, store) {
            entries.push(SurveyEntry {
                path: path.clone(),
                location,
                fix_name: op.fix_name().to_string(),
                description: op.description().to_string(),
            });
        }
    }
    entries
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
