//! Integration tests for the cppfix engine.
//!
//! These tests exercise the full path from files on disk to written
//! results: config loading, discovery, dispatch, perform through the
//! filesystem store, the stale-revision guard and the CLI entry point.
//! Each test works in its own temporary directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;

use cppfix::cli::Args;
use cppfix::config::{ResolvedConfig, load_config};
use cppfix::dispatcher::{Dispatcher, listing, select};
use cppfix::fix::registry::FactoryRegistry;
use cppfix::fix::{FixError, PresetInteraction, QuickFixOperation};
use cppfix::fs::discover_files;
use cppfix::parse::Document;
use cppfix::refactoring::{DocumentStore, FsStore, OverlayStore};
use cppfix::survey::survey;

fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Candidates at the first occurrence of `needle` in `path`.
fn candidates_at(path: &Path, needle: &str, config: &ResolvedConfig) -> Vec<QuickFixOperation> {
    let text = fs::read_to_string(path).unwrap();
    let cursor = text.find(needle).expect("needle present");
    let doc = Arc::new(Document::parse(path, text));
    let registry = FactoryRegistry::default_registry();
    Dispatcher::new(&registry, config).candidates(&doc, cursor, None, &FsStore)
}

fn cli(args: &[&str]) -> Args {
    Args::try_parse_from(std::iter::once("cppfix").chain(args.iter().copied())).unwrap()
}

// ---------- Perform through the filesystem ----------

#[test]
fn add_braces_rewrites_file_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "a.cpp", "void f() {\n    if (a)\n        b();\n}\n");

    let ops = candidates_at(&file, "if", &ResolvedConfig::empty());
    let op = select(&ops, "Statement/AddBraces").expect("AddBraces offered");
    let report = op.perform(&FsStore, &PresetInteraction::default()).unwrap();

    assert_eq!(report.files_written(), vec![file.to_string_lossy()]);
    assert_eq!(
        fs::read_to_string(&file).unwrap(),
        "void f() {\n    if (a) {\n        b();\n}\n}\n"
    );
}

#[test]
fn extract_literal_updates_header_and_source() {
    let dir = tempfile::tempdir().unwrap();
    let header = write_file(dir.path(), "greet.h", "void greet();\n");
    let source = write_file(
        dir.path(),
        "greet.cpp",
        "#include \"greet.h\"\nvoid greet() {\n    print(\"hi\");\n}\n",
    );

    let ops = candidates_at(&source, "\"hi\"", &ResolvedConfig::empty());
    let op = select(&ops, "Function/ExtractLiteralAsParameter").expect("offered");
    let report = op.perform(&FsStore, &PresetInteraction::default()).unwrap();

    assert_eq!(report.changes.len(), 2);
    assert_eq!(
        fs::read_to_string(&header).unwrap(),
        "void greet(const char *newParameter = \"hi\");\n"
    );
    assert_eq!(
        fs::read_to_string(&source).unwrap(),
        "#include \"greet.h\"\nvoid greet(const char *newParameter) {\n    print(newParameter);\n}\n"
    );
}

#[test]
fn member_declaration_lands_in_header() {
    let dir = tempfile::tempdir().unwrap();
    let header = write_file(dir.path(), "counter.h", "class Counter {\npublic:\n    Counter();\n};\n");
    let source = write_file(
        dir.path(),
        "counter.cpp",
        "#include \"counter.h\"\n\nint Counter::value() const\n{\n    return 0;\n}\n",
    );

    let ops = candidates_at(&source, "value", &ResolvedConfig::empty());
    let op = select(&ops, "Declaration/InsertDeclarationFromDefinition").expect("offered");
    assert_eq!(op.description(), "Add public Declaration");
    let report = op.perform(&FsStore, &PresetInteraction::default()).unwrap();

    assert_eq!(report.files_written(), vec![header.to_string_lossy()]);
    assert_eq!(
        fs::read_to_string(&header).unwrap(),
        "class Counter {\npublic:\n    int value() const;\n    Counter();\n};\n"
    );
}

#[test]
fn stale_candidate_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "a.cpp", "int x = 42;\n");

    let ops = candidates_at(&file, "42", &ResolvedConfig::empty());
    let op = select(&ops, "Expression/ConvertNumericLiteral").expect("offered");
    fs::write(&file, "int x = 42; // edited\n").unwrap();

    let err = op.perform(&FsStore, &PresetInteraction::default()).unwrap_err();
    assert!(matches!(err, FixError::Stale { .. }), "got {err}");
    assert_eq!(fs::read_to_string(&file).unwrap(), "int x = 42; // edited\n");
}

#[test]
fn dry_run_leaves_disk_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let original = "int x = 255;\n";
    let file = write_file(dir.path(), "a.cpp", original);

    let ops = candidates_at(&file, "255", &ResolvedConfig::empty());
    let hex = ops
        .iter()
        .find(|op| op.description() == "Convert to Hexadecimal")
        .expect("hex offered");
    let overlay = OverlayStore::new(&FsStore);
    let report = hex.perform(&overlay, &PresetInteraction::default()).unwrap();

    assert_eq!(report.changes[0].text, "int x = 0xFF;\n");
    assert_eq!(overlay.read(&file).unwrap(), "int x = 0xFF;\n");
    assert_eq!(fs::read_to_string(&file).unwrap(), original);
}

#[test]
fn candidates_are_ranked() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "a.cpp", "void f(int a, int b) {}\n");
    let text = fs::read_to_string(&file).unwrap();
    let cursor = text.find("int b").unwrap();

    let ops = candidates_at(&file, "int b", &ResolvedConfig::empty());
    let doc = Document::parse(&file, text);
    let listing = listing(&doc, cursor, &ops);

    assert!(!listing.candidates.is_empty());
    assert!(
        listing
            .candidates
            .windows(2)
            .all(|w| w[0].priority >= w[1].priority)
    );
    assert!(
        listing
            .candidates
            .iter()
            .any(|c| c.description == "Switch with Previous Parameter")
    );
}

// ---------- Config ----------

#[test]
fn config_disables_fix_for_matching_paths() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_file(
        dir.path(),
        ".cppfix.yml",
        "Expression/ConvertNumericLiteral:\n  Exclude:\n    - 'generated/**'\n",
    );
    let generated = write_file(dir.path(), "generated/a.cpp", "int x = 42;\n");
    let handwritten = write_file(dir.path(), "src/a.cpp", "int x = 42;\n");
    let config = load_config(Some(&config_path)).unwrap();

    let fix = "Expression/ConvertNumericLiteral";
    assert!(select(&candidates_at(&generated, "42", &config), fix).is_none());
    assert!(select(&candidates_at(&handwritten, "42", &config), fix).is_some());
}

// ---------- Survey ----------

#[test]
fn survey_walks_directory() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a.cpp", "int x = 10;\n");
    write_file(dir.path(), "lib/b.h", "// note\nvoid g();\n");
    write_file(dir.path(), "README.md", "# readme\n");

    let config = ResolvedConfig::empty();
    let files = discover_files(&[dir.path().to_path_buf()], &config).unwrap();
    assert_eq!(files.len(), 2);

    let report = survey(&files, &FactoryRegistry::default_registry(), &config, &FsStore);
    assert_eq!(report.files_inspected, 2);
    assert!(
        report
            .entries
            .iter()
            .any(|e| e.path.ends_with("a.cpp") && e.fix_name == "Expression/ConvertNumericLiteral")
    );
    assert!(
        report
            .entries
            .iter()
            .any(|e| e.path.ends_with("b.h") && e.description == "Convert Comment to C-Style")
    );
}

// ---------- CLI entry point ----------

#[test]
fn cli_applies_named_fix() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "a.cpp", "void f() {\n    if (a)\n        b();\n}\n");
    let path = file.to_str().unwrap();

    let code = cppfix::run(cli(&[path, "--at", "2:4", "--apply", "Statement/AddBraces"])).unwrap();

    assert_eq!(code, 0);
    assert!(fs::read_to_string(&file).unwrap().contains("if (a) {"));
}

#[test]
fn cli_dry_run_does_not_write() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "a.cpp", "int x = 42;\n");
    let path = file.to_str().unwrap();

    let code = cppfix::run(cli(&[path, "--at", "1:8", "--apply", "0", "--dry-run"])).unwrap();

    assert_eq!(code, 0);
    assert_eq!(fs::read_to_string(&file).unwrap(), "int x = 42;\n");
}

#[test]
fn cli_reports_missing_candidate() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "a.cpp", "\n\nint x;\n");
    let path = file.to_str().unwrap();

    assert_eq!(cppfix::run(cli(&[path, "--at", "1:0"])).unwrap(), 1);
    assert_eq!(
        cppfix::run(cli(&[path, "--at", "3:4", "--apply", "Function/ExtractFunction"])).unwrap(),
        1
    );
}

#[test]
fn cli_cancelled_extraction_fails_perform() {
    let dir = tempfile::tempdir().unwrap();
    let original = "void f() {\n    int a = 1;\n    g(a);\n}\n";
    let file = write_file(dir.path(), "a.cpp", original);
    let path = file.to_str().unwrap();

    let code = cppfix::run(cli(&[
        path,
        "--select",
        "2:4-2:14",
        "--apply",
        "Function/ExtractFunction",
        "--function-name",
        "1bad",
    ]))
    .unwrap();

    assert_eq!(code, 2);
    assert_eq!(fs::read_to_string(&file).unwrap(), original);
}

#[test]
fn cli_without_cursor_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "a.cpp", "int x;\n");
    assert!(cppfix::run(cli(&[file.to_str().unwrap()])).is_err());
}

#[test]
fn cli_survey_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a.cpp", "int x = 42;\n");
    let root = dir.path().to_str().unwrap();
    assert_eq!(cppfix::run(cli(&[root, "--survey", "--format", "json"])).unwrap(), 0);

    let empty = tempfile::tempdir().unwrap();
    let root = empty.path().to_str().unwrap();
    assert_eq!(cppfix::run(cli(&[root, "--survey"])).unwrap(), 1);
}
