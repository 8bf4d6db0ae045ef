use crate::changeset::ChangeSet;
use crate::fix::{FixConfig, QuickFixFactory, QuickFixInterface, QuickFixOperation, perform_fn};
use crate::parse::ast::NodeKind;
use crate::parse::lexer::TokenKind;

/// Offers the other bases for an integer literal. The suffix (`u`, `L`, ...)
/// is kept.
pub struct ConvertNumericLiteral;

impl QuickFixFactory for ConvertNumericLiteral {
    fn name(&self) -> &'static str {
        "Expression/ConvertNumericLiteral"
    }

    fn match_at(
        &self,
        iface: &QuickFixInterface<'_>,
        _config: &FixConfig,
        result: &mut Vec<QuickFixOperation>,
    ) {
        let doc = iface.document();
        let token = match doc.kind(iface.innermost()) {
            NodeKind::NumericLiteral { token } => *token,
            _ => return,
        };
        if doc.tokens()[token].kind != TokenKind::IntLiteral {
            return;
        }
        let spelling = doc.text_of_token(token);
        let number_len = spelling
            .rfind(|c: char| c.is_ascii_hexdigit())
            .map_or(0, |i| i + 1);
        let number = &spelling[..number_len];
        let value = match parse_integer(number) {
            Some(v) => v,
            None => return,
        };

        let lower = number.to_ascii_lowercase();
        let is_binary = lower.len() > 2 && lower.starts_with("0b");
        let is_hex = lower.starts_with("0x");
        let is_octal = lower.len() >= 2
            && lower.starts_with('0')
            && lower.as_bytes()[1].is_ascii_digit()
            && lower.as_bytes()[1] < b'8';

        let mut conversions: Vec<(&str, String)> = Vec::new();
        if !is_hex {
            conversions.push(("Convert to Hexadecimal", format!("0x{value:X}")));
        }
        if !is_octal {
            conversions.push(("Convert to Octal", format!("0{value:o}")));
        }
        if is_binary || is_octal || is_hex {
            conversions.push(("Convert to Decimal", value.to_string()));
        }
        if !is_binary {
            conversions.push(("Convert to Binary", format!("0b{value:b}")));
        }

        let start = doc.start_of_token(token);
        let end = start + number_len;
        let priority = (iface.path().len() - 1) as i32;
        for (description, replacement) in conversions {
            result.push(QuickFixOperation::new(
                iface,
                self.name(),
                priority,
                description,
                perform_fn(move |ctx| {
                    let mut cs = ChangeSet::new();
                    cs.replace(start, end, replacement.clone());
                    ctx.apply_origin(cs)
                }),
            ));
        }
    }
}

/// C integer literal value: `0x` hex, `0b` binary, leading `0` octal.
fn parse_integer(number: &str) -> Option<u64> {
    let lower = number.to_ascii_lowercase();
    if let Some(digits) = lower.strip_prefix("0b") {
        return u64::from_str_radix(digits, 2).ok();
    }
    if let Some(digits) = lower.strip_prefix("0x") {
        return u64::from_str_radix(digits, 16).ok();
    }
    if lower.len() > 1 && lower.starts_with('0') {
        return u64::from_str_radix(&lower[1..], 8).ok();
    }
    lower.parse().ok()
}
