use std::sync::Arc;

use crate::changeset::ChangeSet;
use crate::fix::util::{parameters_of, rparen_of, unique_name};
use crate::fix::{
    FixConfig, FixError, PerformContext, QuickFixFactory, QuickFixInterface, QuickFixOperation,
    perform_fn,
};
use crate::parse::Document;
use crate::parse::ast::{NodeId, NodeKind};
use crate::semantic::FunctionInfo;

/// Turns a literal inside a function body into a new trailing parameter
/// whose default value is the literal.
///
/// Every occurrence of the same literal in the body is replaced. The default
/// goes on the declaration when one exists (same file or the paired
/// header/source), otherwise on the definition.
pub struct ExtractLiteralAsParameter;

impl QuickFixFactory for ExtractLiteralAsParameter {
    fn name(&self) -> &'static str {
        "Function/ExtractLiteralAsParameter"
    }

    fn match_at(
        &self,
        iface: &QuickFixInterface<'_>,
        _config: &FixConfig,
        result: &mut Vec<QuickFixOperation>,
    ) {
        let doc = iface.document();
        let path = iface.path();
        let literal = iface.innermost();
        if !is_literal(doc.kind(literal)) {
            return;
        }

        let mut definition = None;
        for &node in path.iter().rev().skip(1) {
            match doc.kind(node) {
                NodeKind::LambdaExpression { .. } => return,
                NodeKind::FunctionDefinition { .. } => {
                    definition = Some(node);
                    break;
                }
                _ => {}
            }
        }
        let semantic = iface.semantic();
        let function = match definition.and_then(|d| semantic.function_for_definition(d)) {
            Some(f) if !f.is_variadic => f,
            _ => return,
        };
        if doc.start_of(literal) < doc.start_of(function.body) {
            return;
        }
        let ty = match semantic.type_of(literal, Some(function)) {
            Some(ty) if ty.is_valid() => ty,
            _ => return,
        };
        let function_declarator = match doc.tree().function_declarator(function.declarator) {
            Some(f) => f,
            None => return,
        };

        let literal_text = doc.text_of(literal).to_string();
        let occurrences: Vec<(usize, usize)> = doc
            .tree()
            .descendants(function.body)
            .into_iter()
            .filter(|id| is_literal(doc.kind(*id)) && doc.text_of(*id) == literal_text)
            .map(|id| (doc.start_of(id), doc.end_of(id)))
            .collect();

        let name = unique_name("newParameter", |n| function.locals.iter().any(|l| l.name == n));
        let ty = ty.to_string();
        let separator = if ty.ends_with('*') || ty.ends_with('&') { "" } else { " " };
        let parameter = format!("{ty}{separator}{name}");

        let local_declaration = semantic
            .declarations_of(function)
            .first()
            .and_then(|d| doc.tree().function_declarator(d.declarator));
        let function = function.clone();

        result.push(QuickFixOperation::new(
            iface,
            self.name(),
            (path.len() - 1) as i32,
            "Extract Constant as Function Parameter",
            perform_fn(move |ctx| {
                let origin = ctx.origin().clone();
                let with_default = format!("{parameter} = {literal_text}");

                let mut declared = local_declaration.is_some();
                if !declared {
                    declared = add_to_paired_declaration(ctx, &origin, &function, &with_default)?;
                }

                let mut cs = ChangeSet::new();
                let definition_parameter = if declared { &parameter } else { &with_default };
                append_parameter(&origin, function_declarator, definition_parameter, &mut cs);
                if let Some(declaration) = local_declaration {
                    append_parameter(&origin, declaration, &with_default, &mut cs);
                }
                for &(start, end) in &occurrences {
                    cs.replace(start, end, name.clone());
                }
                ctx.apply_origin(cs)
            }),
        ));
    }
}

fn is_literal(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::NumericLiteral { .. }
            | NodeKind::StringLiteral
            | NodeKind::CharLiteral { .. }
            | NodeKind::BoolLiteral { .. }
    )
}

/// Add `parameter` to the matching declaration in the paired file. Returns
/// whether a declaration was found.
fn add_to_paired_declaration(
    ctx: &mut PerformContext<'_>,
    origin: &Arc<Document>,
    function: &FunctionInfo,
    parameter: &str,
) -> Result<bool, FixError> {
    let paired = match ctx.corresponding_file(origin.path()) {
        Some(p) => p,
        None => return Ok(false),
    };
    let doc = ctx.document(&paired)?;
    let declarator = doc
        .semantic()
        .declarations_of(function)
        .first()
        .and_then(|d| doc.tree().function_declarator(d.declarator));
    let declarator = match declarator {
        Some(d) => d,
        None => return Ok(false),
    };
    let mut cs = ChangeSet::new();
    append_parameter(&doc, declarator, parameter, &mut cs);
    ctx.apply(&paired, cs)?;
    Ok(true)
}

/// Append `parameter` to the list of `function_declarator`, replacing a lone
/// `void`.
fn append_parameter(doc: &Document, function_declarator: NodeId, parameter: &str, cs: &mut ChangeSet) {
    let parameters = parameters_of(doc, function_declarator);
    if let [only] = parameters
        && doc.text_of(*only).trim() == "void"
    {
        cs.replace(doc.start_of(*only), doc.end_of(*only), parameter.to_string());
        return;
    }
    let rparen = match rparen_of(doc, function_declarator) {
        Some(r) => r,
        None => return,
    };
    let text = if parameters.is_empty() {
        parameter.to_string()
    } else {
        format!(", {parameter}")
    };
    cs.insert(doc.start_of_token(rparen), text);
}
