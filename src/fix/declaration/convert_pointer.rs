use crate::changeset::ChangeSet;
use crate::fix::util::{next_significant, prev_significant};
use crate::fix::{FixConfig, QuickFixFactory, QuickFixInterface, QuickFixOperation, perform_fn};
use crate::parse::Document;
use crate::parse::ast::{NodeId, NodeKind, TokenIdx, UnaryOp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    FromPointer,
    FromReference,
    FromVariable,
}

/// Converts a local between a heap pointer, a reference and a stack variable,
/// rewriting its declaration and every use in the function.
///
/// ```text
/// Foo *f = new Foo(1);    Foo f(1);
/// f->bar();          <=>  f.bar();
/// delete f;               // delete f;
/// ```
pub struct ConvertPointer;

/// Everything perform needs, captured while matching.
struct Plan {
    mode: Mode,
    is_auto: bool,
    declarator: NodeId,
    name_token: TokenIdx,
    ptr_op_token: Option<TokenIdx>,
    type_name: Option<String>,
    uses: Vec<TokenIdx>,
}

impl QuickFixFactory for ConvertPointer {
    fn name(&self) -> &'static str {
        "Declaration/ConvertPointer"
    }

    fn match_at(
        &self,
        iface: &QuickFixInterface<'_>,
        _config: &FixConfig,
        result: &mut Vec<QuickFixOperation>,
    ) {
        let doc = iface.document();
        let path = iface.path();
        let n = path.len();
        if n < 5 {
            return;
        }
        let name_token = match doc.kind(path[n - 1]) {
            NodeKind::SimpleName { token } => *token,
            _ => return,
        };
        if !matches!(doc.kind(path[n - 2]), NodeKind::DeclaratorId { .. }) {
            return;
        }
        let declarator = path[n - 3];
        let (ptr_ops, initializer) = match doc.kind(declarator) {
            NodeKind::Declarator {
                ptr_ops,
                initializer,
                ..
            } => (ptr_ops, *initializer),
            _ => return,
        };
        let specifiers = match doc.kind(path[n - 4]) {
            NodeKind::SimpleDeclaration { specifiers, .. } => specifiers,
            _ => return,
        };
        for &ancestor in path[..n - 4].iter().rev() {
            match doc.kind(ancestor) {
                NodeKind::ClassSpecifier { .. } => return,
                NodeKind::FunctionDefinition { .. } => break,
                NodeKind::TranslationUnit { .. } => return,
                _ => {}
            }
        }

        let semantic = iface.semantic();
        let (function, local) = match semantic.local_for_token(name_token) {
            Some(found) => found,
            None => return,
        };
        let is_auto = local.ty.is_auto();

        let mode = if is_auto {
            let initializer = match initializer {
                Some(init) => init,
                None => return,
            };
            let init_type = semantic.type_of(initializer, Some(function));
            if init_type.is_some_and(|t| t.is_pointer()) {
                Mode::FromPointer
            } else {
                Mode::FromVariable
            }
        } else {
            match ptr_ops.as_slice() {
                [] => Mode::FromVariable,
                [op] => match doc.kind(*op) {
                    NodeKind::PointerOperator { .. } => Mode::FromPointer,
                    NodeKind::ReferenceOperator { rvalue: false, .. } => Mode::FromReference,
                    _ => return,
                },
                _ => return,
            }
        };

        let ptr_op_token = ptr_ops.first().and_then(|op| match doc.kind(*op) {
            NodeKind::PointerOperator { star } => Some(*star),
            NodeKind::ReferenceOperator { amp, .. } => Some(*amp),
            _ => None,
        });
        let type_name = specifiers.iter().find_map(|s| match doc.kind(*s) {
            NodeKind::NamedTypeSpecifier { .. } => Some(doc.text_of(*s).to_string()),
            _ => None,
        });
        if mode != Mode::FromPointer && type_name.is_none() && !is_auto {
            return;
        }

        let description = match mode {
            Mode::FromPointer => "Convert to Stack Variable",
            Mode::FromReference | Mode::FromVariable => "Convert to Pointer",
        };
        let plan = Plan {
            mode,
            is_auto,
            declarator,
            name_token,
            ptr_op_token,
            type_name,
            uses: local.uses.clone(),
        };
        result.push(QuickFixOperation::new(
            iface,
            self.name(),
            (n - 1) as i32,
            description,
            perform_fn(move |ctx| {
                let doc = ctx.origin().clone();
                let mut cs = ChangeSet::new();
                match plan.mode {
                    Mode::FromPointer => convert_to_stack_variable(&doc, &plan, &mut cs),
                    Mode::FromReference => {
                        if let Some(amp) = plan.ptr_op_token {
                            cs.remove(doc.start_of_token(amp), doc.end_of_token(amp));
                        }
                        convert_to_pointer(&doc, &plan, &mut cs);
                    }
                    Mode::FromVariable => convert_to_pointer(&doc, &plan, &mut cs),
                }
                ctx.apply_origin(cs)
            }),
        ));
    }
}

fn token_range(doc: &Document, token: TokenIdx) -> (usize, usize) {
    (doc.start_of_token(token), doc.end_of_token(token))
}

/// Path to a use and the index of its id-expression on that path.
fn use_site(doc: &Document, token: TokenIdx) -> Option<(Vec<NodeId>, usize)> {
    let path = doc.tree().path_to(doc.start_of_token(token));
    let index = path
        .iter()
        .rposition(|id| matches!(doc.kind(*id), NodeKind::IdExpression { .. }))?;
    Some((path, index))
}

fn convert_to_stack_variable(doc: &Document, plan: &Plan, cs: &mut ChangeSet) {
    if let Some(star) = plan.ptr_op_token {
        let (start, end) = token_range(doc, star);
        cs.remove(start, end);
    }

    let (core, equal, initializer) = match doc.kind(plan.declarator) {
        NodeKind::Declarator {
            core,
            equal,
            initializer,
            ..
        } => (*core, *equal, *initializer),
        _ => return,
    };
    if let Some(init) = initializer {
        match doc.kind(init) {
            NodeKind::NewExpression {
                type_id,
                initializer: new_init,
                ..
            } => {
                if plan.is_auto {
                    if new_init.is_none() {
                        cs.insert(doc.end_of(init), "()");
                    }
                    cs.remove(doc.start_of(init), doc.start_of(*type_id));
                } else if let Some(new_init) = new_init {
                    cs.remove(doc.start_of(init), doc.start_of(*new_init));
                    if let Some(equal) = equal {
                        let before = prev_significant(doc, equal).unwrap_or(equal);
                        let after = next_significant(doc, equal).unwrap_or(equal);
                        cs.remove(doc.end_of_token(before), doc.start_of_token(after));
                    }
                } else if let Some(core) = core {
                    cs.remove(doc.end_of(core), doc.end_of(init));
                }
            }
            NodeKind::UnaryExpression {
                op: UnaryOp::AddressOf,
                op_token,
                ..
            } => {
                let (start, end) = token_range(doc, *op_token);
                cs.remove(start, end);
            }
            _ => {}
        }
    }

    for &token in &plan.uses {
        let (path, index) = match use_site(doc, token) {
            Some(site) => site,
            None => continue,
        };
        let mut child = path[index];
        let mut star_found = false;
        let mut ampersand = None;
        let mut handled = false;
        for &node in path[..index].iter().rev() {
            match doc.kind(node) {
                NodeKind::MemberAccess {
                    base,
                    access_token,
                    arrow,
                    ..
                } if *base == child => {
                    if *arrow {
                        let (start, end) = token_range(doc, *access_token);
                        cs.replace(start, end, ".");
                    }
                    handled = true;
                    break;
                }
                NodeKind::DeleteExpression { delete_token, .. } => {
                    cs.insert(doc.start_of_token(*delete_token), "// ");
                    handled = true;
                    break;
                }
                NodeKind::UnaryExpression {
                    op: UnaryOp::Deref,
                    op_token,
                    ..
                } => {
                    if !star_found {
                        let (start, end) = token_range(doc, *op_token);
                        cs.remove(start, end);
                    }
                    star_found = true;
                }
                NodeKind::UnaryExpression {
                    op: UnaryOp::AddressOf,
                    op_token,
                    ..
                } => ampersand = Some(doc.start_of_token(*op_token)),
                NodeKind::NestedExpression { .. } => {}
                _ => break,
            }
            child = node;
        }
        if handled || star_found {
            continue;
        }
        match ampersand {
            Some(pos) => {
                cs.insert(pos, "&(");
                cs.insert(doc.end_of_token(token), ")");
            }
            None => {
                cs.insert(doc.start_of_token(token), "&");
            }
        }
    }
}

fn convert_to_pointer(doc: &Document, plan: &Plan, cs: &mut ChangeSet) {
    let (initializer, declarator_end) = match doc.kind(plan.declarator) {
        NodeKind::Declarator { initializer, .. } => (*initializer, doc.end_of(plan.declarator)),
        _ => return,
    };
    let type_name = plan.type_name.as_deref().filter(|_| !plan.is_auto);
    match initializer {
        Some(init) => match doc.kind(init) {
            NodeKind::IdExpression { .. } => {
                cs.insert(doc.start_of(init), "&");
            }
            NodeKind::CallExpression { .. } | NodeKind::TypeConstruction { .. } => {
                match type_name {
                    Some(name) => {
                        cs.insert(doc.start_of(init), format!("new {name}("));
                        cs.insert(doc.end_of(init), ")");
                    }
                    None => {
                        cs.insert(doc.start_of(init), "new ");
                    }
                }
            }
            NodeKind::ExpressionList { .. } | NodeKind::BracedInitializer { .. } => {
                if let Some(name) = type_name {
                    cs.insert(doc.start_of(init), format!(" = new {name}"));
                }
            }
            _ => {}
        },
        None => {
            if let Some(name) = type_name {
                cs.insert(declarator_end, format!(" = new {name}"));
            }
        }
    }
    if !plan.is_auto {
        cs.insert(doc.start_of_token(plan.name_token), "*");
    }

    for &token in &plan.uses {
        let (path, index) = match use_site(doc, token) {
            Some(site) => site,
            None => continue,
        };
        let id = path[index];
        let parent = if index > 0 { Some(path[index - 1]) } else { None };
        let start = doc.start_of_token(token);
        let end = doc.end_of_token(token);
        match parent.map(|p| doc.kind(p)) {
            Some(NodeKind::MemberAccess {
                base,
                access_token,
                arrow,
                ..
            }) if *base == id => {
                if !*arrow {
                    let (s, e) = token_range(doc, *access_token);
                    cs.replace(s, e, "->");
                }
            }
            Some(NodeKind::UnaryExpression {
                op: UnaryOp::AddressOf,
                op_token,
                operand,
            }) if *operand == id => {
                let (s, e) = token_range(doc, *op_token);
                cs.remove(s, e);
            }
            Some(
                NodeKind::ArrayAccess { base, .. }
                | NodeKind::CallExpression { base, .. }
                | NodeKind::PostIncrDecr { base, .. },
            ) if *base == id => {
                cs.insert(start, "(*");
                cs.insert(end, ")");
            }
            _ => {
                cs.insert(start, "*");
            }
        }
    }
}
