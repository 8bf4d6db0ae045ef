use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::config::ResolvedConfig;
use crate::fix::registry::FactoryRegistry;
use crate::fix::{QuickFixInterface, QuickFixOperation};
use crate::parse::Document;
use crate::refactoring::DocumentStore;
use crate::report::{Candidate, CandidateListing};

/// Runs every enabled factory against one cursor position and ranks what
/// they offer.
pub struct Dispatcher<'a> {
    registry: &'a FactoryRegistry,
    config: &'a ResolvedConfig,
}

impl<'a> Dispatcher<'a> {
    pub fn new(registry: &'a FactoryRegistry, config: &'a ResolvedConfig) -> Self {
        Self { registry, config }
    }

    /// Candidates at `cursor` (or for `selection`), highest priority first.
    /// Equal priorities keep registration order.
    pub fn candidates(
        &self,
        document: &Arc<Document>,
        cursor: usize,
        selection: Option<(usize, usize)>,
        store: &dyn DocumentStore,
    ) -> Vec<QuickFixOperation> {
        let interface = QuickFixInterface::new(document, cursor, selection, store);
        self.collect(&interface)
    }

    pub fn collect(&self, interface: &QuickFixInterface<'_>) -> Vec<QuickFixOperation> {
        let path = interface.document().path();
        let mut result = Vec::new();
        for factory in self.registry.factories() {
            let name = factory.name();
            if !self.config.is_fix_enabled(name, path) {
                continue;
            }
            let fix_config = self.config.fix_config(name);
            let before = result.len();
            let start = Instant::now();
            factory.match_at(interface, &fix_config, &mut result);
            let offered = result.len() - before;
            if offered > 0 {
                debug!(fix = name, offered, elapsed = ?start.elapsed(), "matched");
            }
        }
        result.sort_by(|a, b| b.priority().cmp(&a.priority()));
        debug!(
            path = %path.display(),
            cursor = interface.cursor(),
            candidates = result.len(),
            "dispatch finished"
        );
        result
    }
}

/// Present ranked candidates for `cursor` in `document`.
pub fn listing(document: &Document, cursor: usize, operations: &[QuickFixOperation]) -> CandidateListing {
    CandidateListing {
        path: document.path().to_string_lossy().into_owned(),
        location: document.source().offset_to_location(cursor),
        candidates: operations
            .iter()
            .enumerate()
            .map(|(index, op)| Candidate {
                index,
                fix_name: op.fix_name().to_string(),
                description: op.description().to_string(),
                priority: op.priority(),
            })
            .collect(),
    }
}

/// Pick a candidate by list index or by fix name. A fix name selects its
/// first (highest ranked) candidate.
pub fn select<'o>(operations: &'o [QuickFixOperation], key: &str) -> Option<&'o QuickFixOperation> {
    if let Ok(index) = key.parse::<usize>() {
        return operations.get(index);
    }
    operations.iter().find(|op| op.fix_name() == key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::fix::{FixConfig, QuickFixFactory, perform_fn};
    use crate::refactoring::MemoryStore;
    use crate::testutil::parse_marked;

    struct Fixed(&'static str, i32);

    impl QuickFixFactory for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        fn match_at(
            &self,
            interface: &QuickFixInterface<'_>,
            _config: &FixConfig,
            result: &mut Vec<QuickFixOperation>,
        ) {
            result.push(QuickFixOperation::new(
                interface,
                self.0,
                self.1,
                self.0,
                perform_fn(|_| Ok(())),
            ));
        }
    }

    fn dispatch(registry: &FactoryRegistry, config: &ResolvedConfig, marked: &str) -> Vec<QuickFixOperation> {
        let fixture = parse_marked(marked);
        let store = MemoryStore::with_file("test.cpp", fixture.text.clone());
        let doc = Arc::new(Document::parse("test.cpp", fixture.text));
        Dispatcher::new(registry, config).candidates(&doc, fixture.cursor, fixture.selection, &store)
    }

    fn names(ops: &[QuickFixOperation]) -> Vec<&str> {
        ops.iter().map(|op| op.fix_name()).collect()
    }

    #[test]
    fn sorts_by_descending_priority_keeping_registration_order() {
        let mut registry = FactoryRegistry::new();
        registry.register(Box::new(Fixed("Test/Low", -1)));
        registry.register(Box::new(Fixed("Test/HighA", 3)));
        registry.register(Box::new(Fixed("Test/Mid", 0)));
        registry.register(Box::new(Fixed("Test/HighB", 3)));
        let ops = dispatch(&registry, &ResolvedConfig::empty(), "int @x;");
        assert_eq!(names(&ops), vec!["Test/HighA", "Test/HighB", "Test/Mid", "Test/Low"]);
    }

    #[test]
    fn disabled_fixes_are_skipped() {
        let mut registry = FactoryRegistry::new();
        registry.register(Box::new(Fixed("Test/A", 0)));
        registry.register(Box::new(Fixed("Test/B", 0)));
        let config = parse_config("Test/A:\n  Enabled: false\n").unwrap();
        let ops = dispatch(&registry, &config, "int @x;");
        assert_eq!(names(&ops), vec!["Test/B"]);
    }

    #[test]
    fn default_registry_offers_every_literal_conversion() {
        let registry = FactoryRegistry::default_registry();
        let ops = dispatch(&registry, &ResolvedConfig::empty(), "int x = @42;");
        let descriptions: Vec<&str> = ops.iter().map(|op| op.description()).collect();
        assert!(descriptions.contains(&"Convert to Hexadecimal"));
        assert!(descriptions.contains(&"Convert to Octal"));
        assert!(descriptions.contains(&"Convert to Binary"));
        assert!(ops.windows(2).all(|w| w[0].priority() >= w[1].priority()));
    }

    #[test]
    fn listing_numbers_candidates() {
        let mut registry = FactoryRegistry::new();
        registry.register(Box::new(Fixed("Test/A", 1)));
        registry.register(Box::new(Fixed("Test/B", 2)));
        let fixture = parse_marked("int a;\nint @b;");
        let doc = Document::parse("test.cpp", fixture.text.clone());
        let ops = dispatch(&registry, &ResolvedConfig::empty(), "int a;\nint @b;");
        let listing = listing(&doc, fixture.cursor, &ops);
        assert_eq!(listing.location.line, 2);
        assert_eq!(listing.location.column, 4);
        assert_eq!(listing.candidates[0].index, 0);
        assert_eq!(listing.candidates[0].fix_name, "Test/B");
        assert_eq!(listing.candidates[1].fix_name, "Test/A");
    }

    #[test]
    fn select_by_index_or_name() {
        let mut registry = FactoryRegistry::new();
        registry.register(Box::new(Fixed("Test/A", 1)));
        registry.register(Box::new(Fixed("Test/B", 2)));
        let ops = dispatch(&registry, &ResolvedConfig::empty(), "int @x;");
        assert_eq!(select(&ops, "1").map(|op| op.fix_name()), Some("Test/A"));
        assert_eq!(select(&ops, "Test/B").map(|op| op.fix_name()), Some("Test/B"));
        assert!(select(&ops, "7").is_none());
        assert!(select(&ops, "Test/C").is_none());
    }
}
