use std::path::PathBuf;

use crate::changeset::ChangeSet;
use crate::fix::util::{add_member_declaration, comments_before, with_type};
use crate::fix::{
    Access, ExtractFunctionOptions, FixConfig, FixError, PerformContext, QuickFixFactory,
    QuickFixInterface, QuickFixOperation, perform_fn,
};
use crate::parse::Document;
use crate::parse::ast::{NodeId, NodeKind};
use crate::semantic::{FunctionInfo, Local};

/// Moves the statements covered by the selection into a new function and
/// calls it in their place.
///
/// Locals used before and inside the selection become parameters. A local
/// first seen inside and still used afterwards becomes the return value;
/// more than one such local, or a `return` in the selection, means no
/// candidate.
///
/// For an out-of-line member the new function is qualified the same way and
/// a declaration goes into the class, in the access section the interaction
/// picks.
pub struct ExtractFunction;

impl QuickFixFactory for ExtractFunction {
    fn name(&self) -> &'static str {
        "Function/ExtractFunction"
    }

    fn match_at(
        &self,
        iface: &QuickFixInterface<'_>,
        config: &FixConfig,
        result: &mut Vec<QuickFixOperation>,
    ) {
        if !iface.has_selection() {
            return;
        }
        let doc = iface.document();
        let selection = iface.selection();
        let semantic = iface.semantic();
        let function = match semantic.function_at(selection.0) {
            Some(f) => f,
            None => return,
        };
        if selection.0 < doc.start_of(function.body) || selection.1 > doc.end_of(function.body) {
            return;
        }
        let statements = match doc.kind(function.body) {
            NodeKind::CompoundStatement { statements, .. } if !statements.is_empty() => statements,
            _ => return,
        };

        let mut range = StatementRange::default();
        range.visit(doc, statements, selection);
        let start = match range.start {
            Some(start) if !range.failed => start,
            _ => return,
        };
        let end = range.end;
        let plan = match plan_extraction(doc, function, start, end) {
            Some(plan) => plan,
            None => return,
        };

        let defaults = ExtractFunctionOptions {
            name: config.get_str("DefaultName").unwrap_or("extracted").to_string(),
            access: config
                .get_str("DefaultAccess")
                .and_then(|a| a.parse().ok())
                .unwrap_or(Access::Public),
        };
        result.push(QuickFixOperation::new(
            iface,
            self.name(),
            -1,
            "Extract Function",
            perform_fn(move |ctx| {
                let options = ctx
                    .interaction()
                    .extract_function_options(&defaults)
                    .filter(ExtractFunctionOptions::has_valid_name)
                    .ok_or(FixError::Cancelled)?;
                let name = options.name.as_str();
                let signature = format!(
                    "{name}({}){}",
                    plan.parameters.join(", "),
                    if plan.is_const { " const" } else { "" }
                );
                let return_type = plan.returned.as_ref().map_or("void", |r| r.ty.as_str());

                let mut body = plan.extract.clone();
                if let Some(returned) = &plan.returned {
                    body.push_str(&format!("\nreturn {};", returned.name));
                }
                let definition = format!(
                    "{}{}\n{{\n{body}\n}}\n\n{}",
                    plan.inline_prefix,
                    with_type(return_type, &format!("{}{signature}", plan.qualification)),
                    plan.indentation,
                );
                let arguments = plan.arguments.join(", ");
                let call = match &plan.returned {
                    Some(returned) => format!("{} = {name}({arguments});", returned.declaration),
                    None => format!("{name}({arguments});"),
                };

                let mut cs = ChangeSet::new();
                cs.insert(plan.definition_at, definition);
                cs.replace(plan.start, plan.end, call);

                let mut paired_edit: Option<(PathBuf, ChangeSet)> = None;
                if let Some(owner) = &plan.out_of_line_owner {
                    let declaration = format!("{};", with_type(return_type, &signature));
                    let origin = ctx.origin().clone();
                    let semantic = origin.semantic();
                    match semantic.find_class(owner) {
                        Some(class) => {
                            let access = options.access;
                            add_member_declaration(&origin, class, access, &declaration, &mut cs);
                        }
                        None => {
                            paired_edit = paired_class_edit(ctx, owner, options.access, &declaration)?;
                            if paired_edit.is_none() {
                                ctx.warn(format!(
                                    "class {owner} not found; declaration of {name} skipped"
                                ));
                            }
                        }
                    }
                }

                ctx.apply_origin(cs)?;
                if let Some((path, edit)) = paired_edit {
                    ctx.apply_secondary(&path, edit);
                }
                Ok(())
            }),
        ));
    }
}

/// Contiguous complete statements of one block inside the selection.
#[derive(Debug, Default)]
struct StatementRange {
    start: Option<usize>,
    end: usize,
    done: bool,
    failed: bool,
}

impl StatementRange {
    fn visit(&mut self, doc: &Document, statements: &[NodeId], selection: (usize, usize)) {
        for &statement in statements {
            if self.done {
                return;
            }
            let (start, end) = (doc.start_of(statement), doc.end_of(statement));
            if start >= selection.1 || (self.start.is_some() && end > selection.1) {
                self.done = true;
                return;
            }
            if self.start.is_none() && start >= selection.0 {
                if end > selection.1 {
                    self.done = true;
                    return;
                }
                self.start = Some(start);
            }
            if self.start.is_some() {
                if contains_return(doc, statement) {
                    self.failed = true;
                    self.done = true;
                    return;
                }
                self.end = end;
                continue;
            }
            if end <= selection.0 {
                continue;
            }
            for block in nested_blocks(doc, statement) {
                self.visit(doc, &block, selection);
                if self.start.is_some() || self.done {
                    self.done = true;
                    return;
                }
            }
        }
    }
}

/// Statement lists directly nested in `statement`, one per branch or body.
fn nested_blocks(doc: &Document, statement: NodeId) -> Vec<Vec<NodeId>> {
    match doc.kind(statement) {
        NodeKind::CompoundStatement { statements, .. } => vec![statements.clone()],
        NodeKind::IfStatement {
            statement,
            else_statement,
            ..
        } => statement
            .iter()
            .chain(else_statement.iter())
            .map(|s| vec![*s])
            .collect(),
        NodeKind::WhileStatement { statement, .. }
        | NodeKind::ForStatement { statement, .. }
        | NodeKind::RangeBasedForStatement { statement, .. }
        | NodeKind::SwitchStatement { statement, .. }
        | NodeKind::CaseStatement { statement, .. }
        | NodeKind::DefaultStatement { statement, .. }
        | NodeKind::LabeledStatement { statement, .. } => {
            statement.iter().map(|s| vec![*s]).collect()
        }
        NodeKind::DoStatement { statement, .. } => vec![vec![*statement]],
        NodeKind::TryBlockStatement { body, handlers } => std::iter::once(*body)
            .chain(handlers.iter().filter_map(|h| match doc.kind(*h) {
                NodeKind::CatchClause { body, .. } => Some(*body),
                _ => None,
            }))
            .map(|s| vec![s])
            .collect(),
        _ => Vec::new(),
    }
}

fn contains_return(doc: &Document, node: NodeId) -> bool {
    match doc.kind(node) {
        NodeKind::ReturnStatement { .. } => true,
        NodeKind::LambdaExpression { .. } => false,
        kind => kind.children().into_iter().any(|c| contains_return(doc, c)),
    }
}

#[derive(Debug, Clone)]
struct ReturnedLocal {
    name: String,
    ty: String,
    declaration: String,
}

/// Everything the perform step needs, resolved at match time.
#[derive(Debug, Clone)]
struct Plan {
    start: usize,
    end: usize,
    extract: String,
    parameters: Vec<String>,
    arguments: Vec<String>,
    returned: Option<ReturnedLocal>,
    definition_at: usize,
    indentation: String,
    inline_prefix: &'static str,
    qualification: String,
    is_const: bool,
    /// Owner class of an out-of-line member, which needs a declaration.
    out_of_line_owner: Option<String>,
}

fn plan_extraction(doc: &Document, function: &FunctionInfo, start: usize, end: usize) -> Option<Plan> {
    let mut parameters: Vec<&Local> = Vec::new();
    let mut returned: Option<&Local> = None;
    for local in &function.locals {
        let (mut before, mut inside, mut after) = (false, false, false);
        for token in local.occurrences() {
            let offset = doc.start_of_token(token);
            if offset < start {
                before = true;
            } else if offset < end {
                inside = true;
            } else {
                after = true;
            }
        }
        if before && inside {
            parameters.push(local);
        } else if inside && after {
            if returned.is_some() {
                return None;
            }
            returned = Some(local);
        }
    }

    let first_token = doc.tree().node(function.definition).first_token;
    let definition_at = comments_before(doc, first_token)
        .first()
        .map_or_else(|| doc.start_of(function.definition), |c| doc.start_of_token(*c));
    let line_start = doc.source().line_start_of(definition_at);
    let before = doc.text_of_range(line_start, definition_at);
    let indentation = if before.trim().is_empty() { before.to_string() } else { String::new() };

    let in_class = function.enclosing_class.is_some();
    let qualification = if in_class || function.qualifiers.is_empty() {
        String::new()
    } else {
        format!("{}::", function.qualifiers.join("::"))
    };
    let out_of_line_owner = if in_class { None } else { function.owner_class() };

    Some(Plan {
        start,
        end,
        extract: doc.text_of_range(start, end).to_string(),
        parameters: parameters.iter().map(|l| l.ty.declare(&l.name)).collect(),
        arguments: parameters.iter().map(|l| l.name.clone()).collect(),
        returned: returned.map(|l| ReturnedLocal {
            name: l.name.clone(),
            ty: l.ty.to_string(),
            declaration: l.ty.declare(&l.name),
        }),
        definition_at,
        indentation,
        inline_prefix: if doc.is_header() && !function.is_member() { "inline " } else { "" },
        qualification,
        is_const: function.is_const && function.is_member(),
        out_of_line_owner,
    })
}

/// Declare `declaration` in the paired file's copy of `owner`.
fn paired_class_edit(
    ctx: &mut PerformContext<'_>,
    owner: &str,
    access: Access,
    declaration: &str,
) -> Result<Option<(PathBuf, ChangeSet)>, FixError> {
    let origin = ctx.origin().clone();
    let paired = match ctx.corresponding_file(origin.path()) {
        Some(p) => p,
        None => return Ok(None),
    };
    let doc = ctx.document(&paired)?;
    let semantic = doc.semantic();
    let class = match semantic.find_class(owner) {
        Some(c) => c,
        None => return Ok(None),
    };
    let mut cs = ChangeSet::new();
    add_member_declaration(&doc, class, access, declaration, &mut cs);
    Ok(Some((paired, cs)))
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use super::*;
    use crate::fix::PresetInteraction;
    use crate::refactoring::MemoryStore;
    use crate::testutil::{assert_fix, assert_fix_with_config, assert_no_fix, match_in, perform_in};

    const DESCRIPTION: &str = "Extract Function";

    #[test]
    fn extracts_statements_with_parameters() {
        assert_fix(
            &ExtractFunction,
            "void f() {\n    int a = 1;\n    @g(a);\n    h(a);@\n}\n",
            DESCRIPTION,
            "void extracted(int a)\n{\ng(a);\n    h(a);\n}\n\nvoid f() {\n    int a = 1;\n    extracted(a);\n}\n",
        );
    }

    #[test]
    fn local_used_afterwards_is_returned() {
        assert_fix(
            &ExtractFunction,
            "int f(int x) {\n    @int y = x * 2;@\n    return y;\n}\n",
            DESCRIPTION,
            "int extracted(int x)\n{\nint y = x * 2;\nreturn y;\n}\n\nint f(int x) {\n    int y = extracted(x);\n    return y;\n}\n",
        );
    }

    #[test]
    fn definition_goes_above_doc_comments() {
        assert_fix(
            &ExtractFunction,
            "// Runs.\nvoid f() {\n    @g();@\n}\n",
            DESCRIPTION,
            "void extracted()\n{\ng();\n}\n\n// Runs.\nvoid f() {\n    extracted();\n}\n",
        );
    }

    #[test]
    fn selection_shrinks_to_complete_statements() {
        assert_fix(
            &ExtractFunction,
            "void f() {\n    @g();\n    h(1,@ 2);\n}\n",
            DESCRIPTION,
            "void extracted()\n{\ng();\n}\n\nvoid f() {\n    extracted();\n    h(1, 2);\n}\n",
        );
    }

    #[test]
    fn nested_block_is_extracted_alone() {
        assert_fix(
            &ExtractFunction,
            "void f(bool c) {\n    if (c) {\n        @g();\n    }\n    h();@\n}\n",
            DESCRIPTION,
            "void extracted()\n{\ng();\n}\n\nvoid f(bool c) {\n    if (c) {\n        extracted();\n    }\n    h();\n}\n",
        );
    }

    #[test]
    fn out_of_line_member_declares_in_class() {
        assert_fix(
            &ExtractFunction,
            "class A {\npublic:\n    int run() const;\n    int v;\n};\nint A::run() const {\n    @int t = v + 1;@\n    return t;\n}\n",
            DESCRIPTION,
            "class A {\npublic:\n    int extracted() const;\n    int run() const;\n    int v;\n};\nint A::extracted() const\n{\nint t = v + 1;\nreturn t;\n}\n\nint A::run() const {\n    int t = extracted();\n    return t;\n}\n",
        );
    }

    #[test]
    fn new_access_section_when_missing() {
        let store = MemoryStore::new();
        perform_in(
            &ExtractFunction,
            &FixConfig::default(),
            &store,
            "a.cpp",
            "class A {\npublic:\n    void run();\n};\nvoid A::run() {\n    @g();@\n}\n",
            DESCRIPTION,
            &PresetInteraction {
                function_name: Some("helper".to_string()),
                access: Some(Access::Private),
            },
        );
        assert_eq!(
            store.get(Path::new("a.cpp")).as_deref(),
            Some(
                "class A {\npublic:\n    void run();\nprivate:\n    void helper();\n};\nvoid A::helper()\n{\ng();\n}\n\nvoid A::run() {\n    helper();\n}\n"
            )
        );
    }

    #[test]
    fn class_in_paired_header_gets_declaration() {
        let store = MemoryStore::new();
        store.insert("a.h", "struct A {\n    void run();\n};\n");
        let report = perform_in(
            &ExtractFunction,
            &FixConfig::default(),
            &store,
            "a.cpp",
            "#include \"a.h\"\nvoid A::run() {\n    @g();@\n}\n",
            DESCRIPTION,
            &PresetInteraction::default(),
        );
        assert!(report.warnings.is_empty());
        assert_eq!(
            store.get(Path::new("a.h")).as_deref(),
            Some("struct A {\n    void run();\n    void extracted();\n};\n")
        );
    }

    #[test]
    fn missing_class_only_warns() {
        let store = MemoryStore::new();
        let report = perform_in(
            &ExtractFunction,
            &FixConfig::default(),
            &store,
            "a.cpp",
            "void A::run() {\n    @g();@\n}\n",
            DESCRIPTION,
            &PresetInteraction::default(),
        );
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(
            store.get(Path::new("a.cpp")).as_deref(),
            Some("void A::extracted()\n{\ng();\n}\n\nvoid A::run() {\n    extracted();\n}\n")
        );
    }

    #[test]
    fn header_free_function_is_inline() {
        let store = MemoryStore::new();
        perform_in(
            &ExtractFunction,
            &FixConfig::default(),
            &store,
            "util.h",
            "inline void f() {\n    @g();@\n}\n",
            DESCRIPTION,
            &PresetInteraction::default(),
        );
        assert_eq!(
            store.get(Path::new("util.h")).as_deref(),
            Some("inline void extracted()\n{\ng();\n}\n\ninline void f() {\n    extracted();\n}\n")
        );
    }

    #[test]
    fn default_name_comes_from_config() {
        let config = FixConfig::default()
            .with_option("DefaultName", serde_yml::Value::String("step".to_string()));
        assert_fix_with_config(
            &ExtractFunction,
            "void f() {\n    @g();@\n}\n",
            DESCRIPTION,
            "void step()\n{\ng();\n}\n\nvoid f() {\n    step();\n}\n",
            &config,
        );
    }

    #[test]
    fn invalid_name_cancels() {
        let store = MemoryStore::new();
        let ops = match_in(
            &ExtractFunction,
            &FixConfig::default(),
            &store,
            "a.cpp",
            "void f() {\n    @g();@\n}\n",
        );
        let interaction = PresetInteraction {
            function_name: Some("not valid".to_string()),
            access: None,
        };
        let err = ops[0].perform(&store, &interaction).unwrap_err();
        assert!(matches!(err, FixError::Cancelled));
        assert_eq!(
            store.get(Path::new("a.cpp")).as_deref(),
            Some("void f() {\n    g();\n}\n")
        );
    }

    #[test]
    fn return_in_selection_is_ignored() {
        assert_no_fix(&ExtractFunction, "int f() {\n    @g();\n    return 1;@\n}\n");
    }

    #[test]
    fn two_results_are_ignored() {
        assert_no_fix(
            &ExtractFunction,
            "int f() {\n    @int a = 1;\n    int b = 2;@\n    return a + b;\n}\n",
        );
    }

    #[test]
    fn cursor_without_selection_is_ignored() {
        assert_no_fix(&ExtractFunction, "void f() {\n    @g();\n}\n");
    }

    #[test]
    fn statement_range_skips_partial_statements() {
        let text = "void f() {\n    a();\n    b();\n}\n";
        let doc = Arc::new(Document::parse("t.cpp", text));
        let body = doc.semantic().functions()[0].body;
        let NodeKind::CompoundStatement { statements, .. } = doc.kind(body) else {
            panic!("body is not a block");
        };
        let mut range = StatementRange::default();
        range.visit(&doc, statements, (text.find("a()").unwrap() + 1, text.len()));
        assert_eq!(range.start, Some(text.find("b()").unwrap()));
    }
}
