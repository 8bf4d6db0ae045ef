use crate::changeset::ChangeSet;
use crate::fix::{FixConfig, QuickFixFactory, QuickFixInterface, QuickFixOperation, perform_fn};
use crate::parse::ast::NodeKind;

/// Swaps a parameter with its previous or next neighbour.
pub struct RearrangeParameters;

impl QuickFixFactory for RearrangeParameters {
    fn name(&self) -> &'static str {
        "Function/RearrangeParameters"
    }

    fn match_at(
        &self,
        iface: &QuickFixInterface<'_>,
        _config: &FixConfig,
        result: &mut Vec<QuickFixOperation>,
    ) {
        let doc = iface.document();
        let (index, parameter) =
            match iface.find_innermost(|k| matches!(k, NodeKind::ParameterDeclaration { .. })) {
                Some(found) if found.0 > 0 => found,
                _ => return,
            };
        let siblings = match doc.kind(iface.path()[index - 1]) {
            NodeKind::FunctionDeclarator { parameters, .. }
            | NodeKind::LambdaExpression { parameters, .. } => parameters,
            _ => return,
        };
        let position = match siblings.iter().position(|p| *p == parameter) {
            Some(p) => p,
            None => return,
        };

        let span = |id| (doc.start_of(id), doc.end_of(id));
        let current = span(parameter);
        let neighbours = [
            ("Switch with Previous Parameter", position.checked_sub(1)),
            ("Switch with Next Parameter", Some(position + 1)),
        ];
        for (description, other) in neighbours {
            let other = match other.and_then(|i| siblings.get(i)) {
                Some(&id) => span(id),
                None => continue,
            };
            let (first, second) = if other.0 < current.0 {
                (other, current)
            } else {
                (current, other)
            };
            result.push(QuickFixOperation::new(
                iface,
                self.name(),
                index as i32,
                description,
                perform_fn(move |ctx| {
                    let mut cs = ChangeSet::new();
                    cs.flip(first.0, first.1, second.0, second.1);
                    ctx.apply_origin(cs)
                }),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{assert_fix, assert_no_fix, descriptions, run_fix};

    #[test]
    fn middle_parameter_offers_both_directions() {
        let ops = run_fix(&RearrangeParameters, "void f(int a, char @b, long c);");
        assert_eq!(
            descriptions(&ops),
            vec!["Switch with Previous Parameter", "Switch with Next Parameter"]
        );
    }

    #[test]
    fn switches_with_next() {
        assert_fix(
            &RearrangeParameters,
            "void f(int @a, const char *b) {}",
            "Switch with Next Parameter",
            "void f(const char *b, int a) {}",
        );
    }

    #[test]
    fn switches_with_previous() {
        assert_fix(
            &RearrangeParameters,
            "void f(int a, double @b = 1.0) {}",
            "Switch with Previous Parameter",
            "void f(double b = 1.0, int a) {}",
        );
    }

    #[test]
    fn last_parameter_has_no_next() {
        let ops = run_fix(&RearrangeParameters, "void f(int a, int @b);");
        assert_eq!(descriptions(&ops), vec!["Switch with Previous Parameter"]);
    }

    #[test]
    fn single_parameter_is_ignored() {
        assert_no_fix(&RearrangeParameters, "void f(int @a);");
    }
}
