use crate::changeset::ChangeSet;
use crate::fix::{FixConfig, QuickFixFactory, QuickFixInterface, QuickFixOperation, perform_fn};
use crate::parse::ast::NodeKind;
use crate::parse::lexer::TokenKind;

/// Rewrites `word_word` identifiers as `wordWord`.
///
/// `Mode: rename` (default) updates every occurrence of the resolved local,
/// or every identifier with the same spelling when nothing resolves.
/// `Mode: in_place` touches only the token under the cursor. Names listed in
/// `AllowedIdentifiers` or matching a regex in `AllowedPatterns` are left
/// alone.
pub struct ConvertToCamelCase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    InPlace,
    Rename,
}

impl Mode {
    fn from_config(config: &FixConfig) -> Self {
        match config.get_str("Mode") {
            Some("in_place") => Mode::InPlace,
            _ => Mode::Rename,
        }
    }
}

impl QuickFixFactory for ConvertToCamelCase {
    fn name(&self) -> &'static str {
        "Naming/ConvertToCamelCase"
    }

    fn match_at(
        &self,
        iface: &QuickFixInterface<'_>,
        config: &FixConfig,
        result: &mut Vec<QuickFixOperation>,
    ) {
        let doc = iface.document();
        let token = match doc.kind(iface.innermost()) {
            NodeKind::SimpleName { token } => *token,
            _ => return,
        };
        let name = doc.text_of_token(token);
        if is_allowed(
            name,
            &config.get_string_array("AllowedIdentifiers"),
            &config.get_string_array("AllowedPatterns"),
        ) {
            return;
        }
        let converted = match to_camel_case(name) {
            Some(c) => c,
            None => return,
        };

        let occurrences: Vec<_> = match Mode::from_config(config) {
            Mode::InPlace => vec![token],
            Mode::Rename => match iface.semantic().local_for_token(token) {
                Some((_, local)) => local.occurrences().collect(),
                None => doc
                    .tokens()
                    .iter()
                    .enumerate()
                    .filter(|(i, t)| t.kind == TokenKind::Identifier && doc.text_of_token(*i) == name)
                    .map(|(i, _)| i)
                    .collect(),
            },
        };
        let spans: Vec<(usize, usize)> = occurrences
            .into_iter()
            .map(|t| (doc.start_of_token(t), doc.end_of_token(t)))
            .collect();

        result.push(QuickFixOperation::new(
            iface,
            self.name(),
            -1,
            "Convert to Camel Case",
            perform_fn(move |ctx| {
                let mut cs = ChangeSet::new();
                for &(start, end) in &spans {
                    cs.replace(start, end, converted.clone());
                }
                ctx.apply_origin(cs)
            }),
        ));
    }
}

fn is_allowed(name: &str, allowed_ids: &[String], allowed_pats: &[String]) -> bool {
    if allowed_ids.iter().any(|a| a == name) {
        return true;
    }
    allowed_pats.iter().any(|pattern| match regex::Regex::new(pattern) {
        Ok(re) => re.is_match(name),
        Err(err) => {
            tracing::warn!(%pattern, %err, "ignoring invalid AllowedPatterns entry");
            false
        }
    })
}

/// An underscore followed by a letter, not counting the `_` of an `m_` prefix.
fn is_convertible_underscore(chars: &[char], pos: usize) -> bool {
    chars[pos] == '_'
        && chars.get(pos + 1).is_some_and(|c| c.is_alphabetic())
        && !(pos == 1 && chars[0] == 'm')
}

/// `None` when the identifier has nothing to convert.
fn to_camel_case(name: &str) -> Option<String> {
    let mut chars: Vec<char> = name.chars().collect();
    if chars.len() < 3 {
        return None;
    }
    if !(1..chars.len() - 1).any(|pos| is_convertible_underscore(&chars, pos)) {
        return None;
    }
    if !chars.iter().any(|c| c.is_lowercase()) {
        chars = name.to_lowercase().chars().collect();
    }

    let mut out = String::with_capacity(chars.len());
    let mut upper_next = false;
    for pos in 0..chars.len() {
        if pos > 0 && pos + 1 < chars.len() && is_convertible_underscore(&chars, pos) {
            upper_next = true;
            continue;
        }
        if upper_next {
            out.extend(chars[pos].to_uppercase());
            upper_next = false;
        } else {
            out.push(chars[pos]);
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{
        assert_fix, assert_fix_with_config, assert_no_fix, assert_no_fix_with_config,
        run_fix_with_config,
    };

    const DESCRIPTION: &str = "Convert to Camel Case";

    #[test]
    fn renames_every_use_of_a_local() {
        assert_fix(
            &ConvertToCamelCase,
            "void f() {\n    int @item_count = 0;\n    item_count++;\n}\n",
            DESCRIPTION,
            "void f() {\n    int itemCount = 0;\n    itemCount++;\n}\n",
        );
    }

    #[test]
    fn unresolved_names_rename_by_spelling() {
        assert_fix(
            &ConvertToCamelCase,
            "void do_work();\nvoid f() { @do_work(); }\n",
            DESCRIPTION,
            "void doWork();\nvoid f() { doWork(); }\n",
        );
    }

    #[test]
    fn in_place_mode_touches_one_token() {
        let config = FixConfig::default()
            .with_option("Mode", serde_yml::Value::String("in_place".to_string()));
        assert_fix_with_config(
            &ConvertToCamelCase,
            "void f() {\n    int @item_count = 0;\n    item_count++;\n}\n",
            DESCRIPTION,
            "void f() {\n    int itemCount = 0;\n    item_count++;\n}\n",
            &config,
        );
    }

    #[test]
    fn allowed_names_are_skipped() {
        let patterns = serde_yml::Value::Sequence(vec![serde_yml::Value::String("^Q_".to_string())]);
        let ids = serde_yml::Value::Sequence(vec![serde_yml::Value::String("my_api".to_string())]);
        let config = FixConfig::default()
            .with_option("AllowedPatterns", patterns)
            .with_option("AllowedIdentifiers", ids);
        assert_no_fix_with_config(&ConvertToCamelCase, "int @Q_PROPERTY_X;", &config);
        assert_no_fix_with_config(&ConvertToCamelCase, "int @my_api;", &config);
        assert!(!run_fix_with_config(&ConvertToCamelCase, "int @other_name;", &config).is_empty());
    }

    #[test]
    fn member_prefix_is_not_converted() {
        assert_no_fix(&ConvertToCamelCase, "int @m_value;");
    }

    #[test]
    fn conversions() {
        assert_eq!(to_camel_case("MAX_SIZE").as_deref(), Some("maxSize"));
        assert_eq!(to_camel_case("m_first_name").as_deref(), Some("m_firstName"));
        assert_eq!(to_camel_case("a_b").as_deref(), Some("aB"));
        assert_eq!(to_camel_case("_private"), None);
        assert_eq!(to_camel_case("trailing_"), None);
        assert_eq!(to_camel_case("x_1"), None);
        assert_eq!(to_camel_case("ab"), None);
        assert_eq!(to_camel_case("camelCase"), None);
    }
}
