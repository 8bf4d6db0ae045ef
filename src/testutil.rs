use std::path::Path;
use std::sync::Arc;

use crate::fix::{
    FixConfig, Interaction, PresetInteraction, QuickFixFactory, QuickFixInterface,
    QuickFixOperation,
};
use crate::parse::Document;
use crate::refactoring::MemoryStore;
use crate::report::PerformReport;

/// A fixture with its cursor markers removed.
#[derive(Debug, Clone)]
pub struct Fixture {
    pub text: String,
    pub cursor: usize,
    pub selection: Option<(usize, usize)>,
}

/// Strip `@` markers from fixture text.
///
/// One `@` marks the cursor. Two mark a selection running from the first
/// marker to the second.
///
/// # Panics
///
/// Panics if the fixture has no marker or more than two.
pub fn parse_marked(raw: &str) -> Fixture {
    let mut text = String::with_capacity(raw.len());
    let mut marks = Vec::new();
    for ch in raw.chars() {
        if ch == '@' {
            marks.push(text.len());
        } else {
            text.push(ch);
        }
    }
    match marks.as_slice() {
        [cursor] => Fixture {
            text,
            cursor: *cursor,
            selection: None,
        },
        [start, end] => Fixture {
            text,
            cursor: *start,
            selection: Some((*start, *end)),
        },
        _ => panic!("fixture needs one or two '@' markers, found {}", marks.len()),
    }
}

/// Match one fix against `marked` (parsed as `test.cpp`).
pub fn run_fix(fix: &dyn QuickFixFactory, marked: &str) -> Vec<QuickFixOperation> {
    run_fix_with_config(fix, marked, &FixConfig::default())
}

pub fn run_fix_with_config(
    fix: &dyn QuickFixFactory,
    marked: &str,
    config: &FixConfig,
) -> Vec<QuickFixOperation> {
    let store = MemoryStore::new();
    match_in(fix, config, &store, "test.cpp", marked)
}

/// Match one fix against `marked` stored at `path` in `store`.
///
/// The unmarked text is written to the store so a later perform sees the
/// revision the candidates were matched on.
pub fn match_in(
    fix: &dyn QuickFixFactory,
    config: &FixConfig,
    store: &MemoryStore,
    path: &str,
    marked: &str,
) -> Vec<QuickFixOperation> {
    let fixture = parse_marked(marked);
    store.insert(path, fixture.text.clone());
    let doc = Arc::new(Document::parse(path, fixture.text));
    let iface = QuickFixInterface::new(&doc, fixture.cursor, fixture.selection, store);
    let mut result = Vec::new();
    fix.match_at(&iface, config, &mut result);
    result
}

pub fn descriptions(ops: &[QuickFixOperation]) -> Vec<&str> {
    ops.iter().map(|op| op.description()).collect()
}

/// Assert that `fix` offers nothing at the marked position.
pub fn assert_no_fix(fix: &dyn QuickFixFactory, marked: &str) {
    assert_no_fix_with_config(fix, marked, &FixConfig::default());
}

pub fn assert_no_fix_with_config(fix: &dyn QuickFixFactory, marked: &str, config: &FixConfig) {
    let ops = run_fix_with_config(fix, marked, config);
    assert!(
        ops.is_empty(),
        "expected no candidates from {}, got {:?}",
        fix.name(),
        descriptions(&ops)
    );
}

/// Perform the candidate described as `description` and assert the result.
pub fn assert_fix(fix: &dyn QuickFixFactory, marked: &str, description: &str, expected: &str) {
    assert_fix_with_config(fix, marked, description, expected, &FixConfig::default());
}

pub fn assert_fix_with_config(
    fix: &dyn QuickFixFactory,
    marked: &str,
    description: &str,
    expected: &str,
    config: &FixConfig,
) {
    let store = MemoryStore::new();
    perform_in(
        fix,
        config,
        &store,
        "test.cpp",
        marked,
        description,
        &PresetInteraction::default(),
    );
    let actual = store.get(Path::new("test.cpp")).unwrap_or_default();
    assert_eq!(
        actual, expected,
        "{} ({description}) produced unexpected text",
        fix.name()
    );
}

/// Match `fix` against `marked` at `path` and perform the candidate
/// described as `description`.
///
/// # Panics
///
/// Panics if no such candidate is offered or performing fails.
pub fn perform_in(
    fix: &dyn QuickFixFactory,
    config: &FixConfig,
    store: &MemoryStore,
    path: &str,
    marked: &str,
    description: &str,
    interaction: &dyn Interaction,
) -> PerformReport {
    let ops = match_in(fix, config, store, path, marked);
    let op = ops
        .iter()
        .find(|op| op.description() == description)
        .unwrap_or_else(|| {
            panic!(
                "{} offered no '{description}' candidate; got {:?}",
                fix.name(),
                descriptions(&ops)
            )
        });
    op.perform(store, interaction)
        .unwrap_or_else(|err| panic!("{} failed to perform: {err}", fix.name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_marker_is_cursor() {
        let f = parse_marked("int @a;");
        assert_eq!(f.text, "int a;");
        assert_eq!(f.cursor, 4);
        assert!(f.selection.is_none());
    }

    #[test]
    fn two_markers_are_selection() {
        let f = parse_marked("@int a;@\n");
        assert_eq!(f.text, "int a;\n");
        assert_eq!(f.selection, Some((0, 6)));
    }

    #[test]
    #[should_panic(expected = "one or two")]
    fn missing_marker_panics() {
        parse_marked("int a;");
    }
}
