pub mod comment;
pub mod declaration;
pub mod expression;
pub mod function;
pub mod interaction;
pub mod interface;
pub mod naming;
pub mod operation;
pub mod registry;
pub mod statement;
pub mod util;

use std::collections::HashMap;

pub use interaction::{Access, ExtractFunctionOptions, Interaction, PresetInteraction};
pub use interface::QuickFixInterface;
pub use operation::{FixError, Perform, PerformContext, QuickFixOperation, perform_fn};

/// Per-fix configuration extracted from .cppfix.yml.
#[derive(Debug, Clone)]
pub struct FixConfig {
    pub enabled: bool,
    pub exclude: Vec<String>,
    pub include: Vec<String>,
    pub options: HashMap<String, serde_yml::Value>,
}

impl Default for FixConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            exclude: Vec::new(),
            include: Vec::new(),
            options: HashMap::new(),
        }
    }
}

impl FixConfig {
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.options
            .get(key)
            .and_then(|v| v.as_bool())
            .unwrap_or(default)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(|v| v.as_str())
    }

    /// String entries of a list option; empty when absent.
    pub fn get_string_array(&self, key: &str) -> Vec<String> {
        self.options
            .get(key)
            .and_then(|v| v.as_sequence())
            .map(|seq| {
                seq.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn with_option(mut self, key: &str, value: serde_yml::Value) -> Self {
        self.options.insert(key.to_string(), value);
        self
    }
}

/// A quick-fix matcher. Implementations must be Send + Sync so a survey can
/// share one registry across rayon worker threads.
pub trait QuickFixFactory: Send + Sync {
    /// The department-qualified fix name, e.g. "Statement/AddBraces".
    fn name(&self) -> &'static str;

    /// Append every operation this fix offers at the interface's cursor.
    ///
    /// Matching never touches a file; all edits happen in
    /// [`QuickFixOperation::perform`].
    fn match_at(
        &self,
        interface: &QuickFixInterface<'_>,
        config: &FixConfig,
        result: &mut Vec<QuickFixOperation>,
    );
}
