use std::fmt;
use std::str::FromStr;

/// Access section a generated member declaration goes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
    #[default]
    Public,
    PublicSlots,
    Protected,
    ProtectedSlots,
    Private,
    PrivateSlots,
}

impl Access {
    pub const ALL: [Access; 6] = [
        Access::Public,
        Access::PublicSlots,
        Access::Protected,
        Access::ProtectedSlots,
        Access::Private,
        Access::PrivateSlots,
    ];

    /// Label text without the trailing colon.
    pub fn label(self) -> &'static str {
        match self {
            Access::Public => "public",
            Access::PublicSlots => "public slots",
            Access::Protected => "protected",
            Access::ProtectedSlots => "protected slots",
            Access::Private => "private",
            Access::PrivateSlots => "private slots",
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Access {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        Access::ALL
            .into_iter()
            .find(|a| a.label() == normalized)
            .ok_or_else(|| format!("unknown access specifier: {s}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractFunctionOptions {
    pub name: String,
    pub access: Access,
}

impl ExtractFunctionOptions {
    pub fn has_valid_name(&self) -> bool {
        is_valid_identifier(&self.name)
    }
}

pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        && !crate::parse::lexer::is_keyword(name)
}

/// Parameter collection consulted only while an operation performs.
pub trait Interaction: Send + Sync {
    /// Name and access for a function about to be extracted. `None` cancels.
    fn extract_function_options(
        &self,
        defaults: &ExtractFunctionOptions,
    ) -> Option<ExtractFunctionOptions>;
}

/// Answers from values fixed up front (command line or tests).
#[derive(Debug, Clone, Default)]
pub struct PresetInteraction {
    pub function_name: Option<String>,
    pub access: Option<Access>,
}

impl Interaction for PresetInteraction {
    fn extract_function_options(
        &self,
        defaults: &ExtractFunctionOptions,
    ) -> Option<ExtractFunctionOptions> {
        let options = ExtractFunctionOptions {
            name: self
                .function_name
                .clone()
                .unwrap_or_else(|| defaults.name.clone()),
            access: self.access.unwrap_or(defaults.access),
        };
        options.has_valid_name().then_some(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_parsing() {
        assert_eq!("public".parse::<Access>(), Ok(Access::Public));
        assert_eq!("private_slots".parse::<Access>(), Ok(Access::PrivateSlots));
        assert_eq!("Protected Slots".parse::<Access>(), Ok(Access::ProtectedSlots));
        assert!("friend".parse::<Access>().is_err());
    }

    #[test]
    fn identifiers() {
        assert!(is_valid_identifier("extracted"));
        assert!(is_valid_identifier("_x1"));
        assert!(!is_valid_identifier("1x"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("for"));
        assert!(!is_valid_identifier("a-b"));
    }

    #[test]
    fn preset_overrides_defaults_and_cancels_on_bad_name() {
        let defaults = ExtractFunctionOptions {
            name: "extracted".to_string(),
            access: Access::Private,
        };
        let preset = PresetInteraction {
            function_name: Some("compute".to_string()),
            access: None,
        };
        let options = preset.extract_function_options(&defaults).unwrap();
        assert_eq!(options.name, "compute");
        assert_eq!(options.access, Access::Private);

        let bad = PresetInteraction {
            function_name: Some("not valid".to_string()),
            access: None,
        };
        assert!(bad.extract_function_options(&defaults).is_none());
        assert!(
            PresetInteraction::default()
                .extract_function_options(&ExtractFunctionOptions::default())
                .is_none()
        );
    }
}
