use crate::fix::util::ClassTarget;
use crate::fix::{
    Access, FixConfig, QuickFixFactory, QuickFixInterface, QuickFixOperation, perform_fn,
};
use crate::parse::ast::NodeKind;
use crate::semantic::types::normalize_spaces;

/// Declares an out-of-line member function definition that its class does
/// not declare yet.
///
/// ```text
/// class C {                     class C {
/// public:                       public:
/// };                        =>      int get() const;
///                               };
/// int C::get() const { ... }    int C::get() const { ... }
/// ```
///
/// One candidate per access section. The class may live in the paired
/// header.
pub struct InsertDeclarationFromDefinition;

impl QuickFixFactory for InsertDeclarationFromDefinition {
    fn name(&self) -> &'static str {
        "Declaration/InsertDeclarationFromDefinition"
    }

    fn match_at(
        &self,
        iface: &QuickFixInterface<'_>,
        _config: &FixConfig,
        result: &mut Vec<QuickFixOperation>,
    ) {
        let doc = iface.document();
        let tree = doc.tree();
        if iface
            .path()
            .iter()
            .any(|&n| matches!(doc.kind(n), NodeKind::ClassSpecifier { .. }))
        {
            return;
        }
        let definition = match iface.find_innermost(|k| matches!(k, NodeKind::FunctionDefinition { .. })) {
            Some((_, node)) => node,
            None => return,
        };
        let declarator = match doc.kind(definition) {
            NodeKind::FunctionDefinition { declarator, .. } => *declarator,
            _ => return,
        };
        let name = match tree.declarator_name(declarator) {
            Some(n) if iface.is_cursor_on(n) => n,
            _ => return,
        };
        let unqualified = match (doc.kind(name), tree.name_token(name)) {
            (NodeKind::QualifiedName { .. }, Some(token)) => token,
            _ => return,
        };

        let function = match iface.semantic().function_for_definition(definition) {
            Some(f) => f,
            None => return,
        };
        let owner = match function.owner_class() {
            Some(o) => o,
            None => return,
        };
        let target = match ClassTarget::locate(iface, &owner) {
            Some(t) => t,
            None => return,
        };
        if !target.document().semantic().declarations_of(function).is_empty() {
            return;
        }

        let before = doc.text_of_range(doc.start_of(definition), doc.start_of(name));
        let after = doc.text_of_range(doc.start_of_token(unqualified), doc.end_of(declarator));
        let declaration = format!("{};", normalize_spaces(&format!("{before}{after}")));

        for (index, access) in Access::ALL.into_iter().enumerate() {
            let target = target.clone();
            let declaration = declaration.clone();
            result.push(QuickFixOperation::new(
                iface,
                self.name(),
                (Access::ALL.len() - 1 - index) as i32,
                format!("Add {} Declaration", access.label()),
                perform_fn(move |ctx| target.declare(ctx, access, &declaration)),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::fix::PresetInteraction;
    use crate::refactoring::MemoryStore;
    use crate::testutil::{assert_fix, assert_no_fix, descriptions, perform_in, run_fix};

    #[test]
    fn declares_under_existing_label() {
        assert_fix(
            &InsertDeclarationFromDefinition,
            "class C {\npublic:\n    int x;\n};\n\nint C::@get() const { return x; }\n",
            "Add public Declaration",
            "class C {\npublic:\n    int get() const;\n    int x;\n};\n\nint C::get() const { return x; }\n",
        );
    }

    #[test]
    fn default_access_needs_no_label() {
        assert_fix(
            &InsertDeclarationFromDefinition,
            "class C {\n    int x;\n};\n\nvoid C::@reset() { x = 0; }\n",
            "Add private Declaration",
            "class C {\n    int x;\n    void reset();\n};\n\nvoid C::reset() { x = 0; }\n",
        );
    }

    #[test]
    fn pointer_return_and_parameters_are_kept() {
        assert_fix(
            &InsertDeclarationFromDefinition,
            "struct S {\n};\n\nconst char *S::@label(int index, bool upper) { return 0; }\n",
            "Add public Declaration",
            "struct S {\n    const char *label(int index, bool upper);\n};\n\nconst char *S::label(int index, bool upper) { return 0; }\n",
        );
    }

    #[test]
    fn one_candidate_per_access_section() {
        let ops = run_fix(
            &InsertDeclarationFromDefinition,
            "class C {\n};\n\nvoid C::@run() {}\n",
        );
        assert_eq!(
            descriptions(&ops),
            vec![
                "Add public Declaration",
                "Add public slots Declaration",
                "Add protected Declaration",
                "Add protected slots Declaration",
                "Add private Declaration",
                "Add private slots Declaration",
            ]
        );
        let priorities: Vec<i32> = ops.iter().map(|op| op.priority()).collect();
        assert_eq!(priorities, vec![5, 4, 3, 2, 1, 0]);
    }

    #[test]
    fn declared_member_is_ignored() {
        assert_no_fix(
            &InsertDeclarationFromDefinition,
            "class C {\npublic:\n    void run();\n};\n\nvoid C::@run() {}\n",
        );
    }

    #[test]
    fn free_function_is_ignored() {
        assert_no_fix(&InsertDeclarationFromDefinition, "void @run() {}\n");
    }

    #[test]
    fn unknown_class_is_ignored() {
        assert_no_fix(&InsertDeclarationFromDefinition, "void ns::@run() {}\n");
    }

    #[test]
    fn cursor_in_body_is_ignored() {
        assert_no_fix(
            &InsertDeclarationFromDefinition,
            "class C {\n};\n\nvoid C::run() { @go(); }\n",
        );
    }

    #[test]
    fn class_in_paired_header() {
        let store = MemoryStore::new();
        store.insert("a.h", "class C {\npublic:\n    C();\n};\n");
        let report = perform_in(
            &InsertDeclarationFromDefinition,
            &FixConfig::default(),
            &store,
            "a.cpp",
            "#include \"a.h\"\n\nint C::@size() const\n{\n    return 0;\n}\n",
            "Add protected Declaration",
            &PresetInteraction::default(),
        );
        assert_eq!(report.files_written(), vec!["a.h"]);
        assert_eq!(
            store.get(Path::new("a.h")).as_deref(),
            Some("class C {\npublic:\n    C();\nprotected:\n    int size() const;\n};\n")
        );
    }
}
