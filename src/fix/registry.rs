use std::collections::HashMap;

use super::QuickFixFactory;

/// Registered quick-fix factories in registration order.
///
/// Order matters: the dispatcher keeps it for candidates of equal priority.
pub struct FactoryRegistry {
    factories: Vec<Box<dyn QuickFixFactory>>,
    index: HashMap<&'static str, usize>,
}

impl Default for FactoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self {
            factories: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Build the default registry with all built-in fixes.
    pub fn default_registry() -> Self {
        let mut registry = Self::new();
        super::declaration::register_all(&mut registry);
        super::statement::register_all(&mut registry);
        super::expression::register_all(&mut registry);
        super::naming::register_all(&mut registry);
        super::function::register_all(&mut registry);
        super::comment::register_all(&mut registry);
        registry
    }

    /// Add a factory. A factory with the same name replaces the old one in
    /// place.
    pub fn register(&mut self, factory: Box<dyn QuickFixFactory>) {
        let name = factory.name();
        match self.index.get(name) {
            Some(&idx) => self.factories[idx] = factory,
            None => {
                self.index.insert(name, self.factories.len());
                self.factories.push(factory);
            }
        }
    }

    /// Remove a factory, e.g. when another backend already offers the fix.
    pub fn unregister(&mut self, name: &str) -> Option<Box<dyn QuickFixFactory>> {
        let idx = self.index.remove(name)?;
        let removed = self.factories.remove(idx);
        for slot in self.index.values_mut() {
            if *slot > idx {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    pub fn factories(&self) -> &[Box<dyn QuickFixFactory>] {
        &self.factories
    }

    pub fn get(&self, name: &str) -> Option<&dyn QuickFixFactory> {
        self.index.get(name).map(|&idx| &*self.factories[idx])
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.factories.iter().map(|f| f.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fix::{FixConfig, QuickFixInterface, QuickFixOperation};

    struct FakeFix(&'static str);

    impl QuickFixFactory for FakeFix {
        fn name(&self) -> &'static str {
            self.0
        }

        fn match_at(
            &self,
            _interface: &QuickFixInterface<'_>,
            _config: &FixConfig,
            _result: &mut Vec<QuickFixOperation>,
        ) {
        }
    }

    #[test]
    fn default_registry_has_fixes() {
        let reg = FactoryRegistry::default_registry();
        assert_eq!(reg.len(), 18);
        // Spot-check fixes from each department
        assert!(reg.get("Declaration/SplitDeclaration").is_some());
        assert!(reg.get("Declaration/ConvertPointer").is_some());
        assert!(reg.get("Declaration/InsertDeclarationFromDefinition").is_some());
        assert!(reg.get("Declaration/AddDeclarationForUndeclaredIdentifier").is_some());
        assert!(reg.get("Statement/AddBraces").is_some());
        assert!(reg.get("Statement/OptimizeForLoop").is_some());
        assert!(reg.get("Expression/ConvertNumericLiteral").is_some());
        assert!(reg.get("Naming/ConvertToCamelCase").is_some());
        assert!(reg.get("Function/ExtractFunction").is_some());
        assert!(reg.get("Comment/ConvertCommentStyle").is_some());
    }

    #[test]
    fn names_are_unique_and_qualified() {
        let reg = FactoryRegistry::default_registry();
        let mut names = reg.names();
        assert!(names.iter().all(|n| n.contains('/')));
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), reg.len());
    }

    #[test]
    fn register_and_get() {
        let mut reg = FactoryRegistry::new();
        reg.register(Box::new(FakeFix("Test/Fake")));
        assert_eq!(reg.len(), 1);
        assert!(!reg.is_empty());
        assert_eq!(reg.get("Test/Fake").unwrap().name(), "Test/Fake");
        assert!(reg.get("Test/Nope").is_none());
    }

    #[test]
    fn reregistering_keeps_position() {
        let mut reg = FactoryRegistry::new();
        reg.register(Box::new(FakeFix("Test/A")));
        reg.register(Box::new(FakeFix("Test/B")));
        reg.register(Box::new(FakeFix("Test/A")));
        assert_eq!(reg.names(), vec!["Test/A", "Test/B"]);
    }

    #[test]
    fn unregister_reindexes() {
        let mut reg = FactoryRegistry::new();
        reg.register(Box::new(FakeFix("Test/A")));
        reg.register(Box::new(FakeFix("Test/B")));
        reg.register(Box::new(FakeFix("Test/C")));
        assert!(reg.unregister("Test/A").is_some());
        assert!(reg.unregister("Test/A").is_none());
        assert_eq!(reg.names(), vec!["Test/B", "Test/C"]);
        assert_eq!(reg.get("Test/C").unwrap().name(), "Test/C");
    }
}
