use crate::changeset::ChangeSet;
use crate::fix::util::specifiers_range;
use crate::fix::{FixConfig, QuickFixFactory, QuickFixInterface, QuickFixOperation, perform_fn};
use crate::parse::ast::NodeKind;

/// `int a, b;` becomes `int a;\nint b;`.
pub struct SplitDeclaration;

impl QuickFixFactory for SplitDeclaration {
    fn name(&self) -> &'static str {
        "Declaration/SplitDeclaration"
    }

    fn match_at(
        &self,
        iface: &QuickFixInterface<'_>,
        _config: &FixConfig,
        result: &mut Vec<QuickFixOperation>,
    ) {
        let doc = iface.document();
        let path = iface.path();
        let mut core = None;
        for index in (0..path.len()).rev() {
            let node = path[index];
            let (specifiers, declarators, semicolon) = match doc.kind(node) {
                NodeKind::DeclaratorId { .. } => {
                    core = Some(node);
                    continue;
                }
                NodeKind::SimpleDeclaration {
                    specifiers,
                    declarators,
                    semicolon,
                } => (specifiers, declarators, semicolon),
                _ => continue,
            };

            let semicolon = match semicolon {
                Some(t) => *t,
                None => return,
            };
            if declarators.len() < 2 {
                return;
            }
            if specifiers.iter().any(|s| {
                matches!(
                    doc.kind(*s),
                    NodeKind::ClassSpecifier { .. } | NodeKind::EnumSpecifier { .. }
                )
            }) {
                return;
            }
            let (spec_start, spec_end) = match specifiers_range(doc, specifiers) {
                Some(range) => range,
                None => return,
            };

            let cursor = iface.cursor();
            let on_specifiers = spec_start <= cursor && cursor <= spec_end;
            let on_core = core.is_some_and(|c| iface.is_cursor_on(c));
            if !on_specifiers && !on_core {
                return;
            }

            let ranges: Vec<(usize, usize)> = declarators
                .iter()
                .map(|d| (doc.start_of(*d), doc.end_of(*d)))
                .collect();
            let insert_pos = doc.end_of_token(semicolon);
            result.push(QuickFixOperation::new(
                iface,
                self.name(),
                index as i32,
                "Split Declaration",
                perform_fn(move |ctx| {
                    let mut cs = ChangeSet::new();
                    let mut prev_end = ranges[0].1;
                    for &(start, end) in &ranges[1..] {
                        cs.insert(insert_pos, "\n")
                            .copy(spec_start, spec_end, insert_pos)
                            .insert(insert_pos, " ")
                            .move_range(start, end, insert_pos)
                            .insert(insert_pos, ";")
                            .remove(prev_end, start);
                        prev_end = end;
                    }
                    ctx.apply_origin(cs)
                }),
            ));
            return;
        }
    }
}
