#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;

use cppfix::config::ResolvedConfig;
use cppfix::dispatcher::Dispatcher;
use cppfix::fix::PresetInteraction;
use cppfix::fix::registry::FactoryRegistry;
use cppfix::parse::Document;
use cppfix::refactoring::{MemoryStore, OverlayStore};

// Match every fix at every token start and perform whatever is offered
// against an in-memory copy.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let registry = FactoryRegistry::default_registry();
    let config = ResolvedConfig::empty();
    let dispatcher = Dispatcher::new(&registry, &config);
    let store = MemoryStore::with_file("fuzz.cpp", text);
    let doc = Arc::new(Document::parse("fuzz.cpp", text));
    for token in doc.tokens() {
        for op in dispatcher.candidates(&doc, token.start, None, &store) {
            let overlay = OverlayStore::new(&store);
            let _ = op.perform(&overlay, &PresetInteraction::default());
        }
    }
});
