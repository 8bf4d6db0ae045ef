pub mod changeset;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod fix;
pub mod formatter;
pub mod fs;
pub mod parse;
pub mod refactoring;
pub mod report;
pub mod semantic;
pub mod survey;

#[cfg(test)]
pub mod testutil;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};

use anyhow::{Context, Result, bail};
use tracing::debug;

use cli::{Args, CursorRequest};
use config::load_config;
use dispatcher::Dispatcher;
use fix::PresetInteraction;
use fix::registry::FactoryRegistry;
use formatter::create_formatter;
use fs::discover_files;
use parse::Document;
use refactoring::{DocumentStore, FsStore, MemoryStore, OverlayStore};

/// Environment variable holding a `tracing` filter directive.
pub const LOG_ENV: &str = "CPPFIX_LOG";

static TRACING_INIT: Once = Once::new();

/// Install the stderr log subscriber. `--debug` wins over `CPPFIX_LOG`;
/// the default level is WARN. Safe to call more than once.
pub fn init_logging(debug: bool) {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        let filter = if debug {
            EnvFilter::new("debug")
        } else {
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
        };
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .with(filter)
            .try_init();
    });
}

/// Run the tool. Returns the exit code: 0 = candidates listed or operation
/// applied, 1 = no candidate, 2 = perform failed.
pub fn run(args: Args) -> Result<i32> {
    let config_start = std::time::Instant::now();
    let config = load_config(args.config.as_deref())?;
    debug!(elapsed = ?config_start.elapsed(), dir = ?config.config_dir(), "config loaded");
    debug!(excludes = ?config.global_excludes(), "global excludes");

    let registry = FactoryRegistry::default_registry();

    // --list-fixes: print all registered fix names and exit
    if args.list_fixes {
        let mut names = registry.names();
        names.sort_unstable();
        for name in names {
            println!("{name}");
        }
        return Ok(0);
    }

    let formatter = create_formatter(&args.format);

    // --stdin: the single input comes from stdin and is never written back
    let stdin_input = match &args.stdin {
        Some(display_path) => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("failed to read stdin")?;
            Some((display_path.clone(), input))
        }
        None => None,
    };

    if args.survey {
        let report = match &stdin_input {
            Some((path, text)) => {
                let store = MemoryStore::with_file(path.clone(), text.clone());
                survey::survey(std::slice::from_ref(path), &registry, &config, &store)
            }
            None => {
                let files = discover_files(&args.paths, &config)?;
                debug!(files = files.len(), fixes = registry.len(), "surveying");
                survey::survey(&files, &registry, &config, &FsStore)
            }
        };
        formatter.print_survey(&report);
        return Ok(if report.entries.is_empty() { 1 } else { 0 });
    }

    let request = match args.cursor_request() {
        Some(r) => r,
        None => bail!("no cursor given: pass --at, --offset or --select, or use --survey"),
    };

    let (path, store): (PathBuf, Box<dyn DocumentStore>) = match stdin_input {
        Some((path, text)) => {
            let store = MemoryStore::with_file(path.clone(), text);
            (path, Box::new(store))
        }
        None => (single_file(&args.paths)?, Box::new(FsStore)),
    };
    let text = store
        .read(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let document = Arc::new(Document::parse(path.clone(), text));
    let (cursor, selection) = resolve_cursor(&document, request)?;

    let operations = Dispatcher::new(&registry, &config).candidates(&document, cursor, selection, &*store);

    let key = match &args.apply {
        Some(k) => k,
        None => {
            formatter.print_listing(&dispatcher::listing(&document, cursor, &operations));
            return Ok(if operations.is_empty() { 1 } else { 0 });
        }
    };
    let operation = match dispatcher::select(&operations, key) {
        Some(op) => op,
        None => {
            eprintln!("no candidate matches `{key}` at {}", path.display());
            return Ok(1);
        }
    };

    let interaction = PresetInteraction {
        function_name: args.function_name.clone(),
        access: args.access,
    };
    let dry_run = args.dry_run || args.stdin.is_some();
    let overlay;
    let target: &dyn DocumentStore = if dry_run {
        overlay = OverlayStore::new(&*store);
        &overlay
    } else {
        &*store
    };
    match operation.perform(target, &interaction) {
        Ok(mut report) => {
            report.dry_run = dry_run;
            formatter.print_report(&report);
            Ok(0)
        }
        Err(err) => {
            eprintln!("error: {} failed: {err}", operation.fix_name());
            Ok(2)
        }
    }
}

fn single_file(paths: &[PathBuf]) -> Result<PathBuf> {
    match paths {
        [path] if path.is_file() => Ok(path.clone()),
        [path] => bail!("not a file: {}", path.display()),
        _ => bail!("a cursor position needs exactly one file, got {}", paths.len()),
    }
}

/// Turn the requested position into a byte offset and optional selection.
fn resolve_cursor(document: &Document, request: CursorRequest) -> Result<(usize, Option<(usize, usize)>)> {
    let offset_of = |pos: cli::TextPosition| {
        document
            .line_col_to_offset(pos.line, pos.column)
            .with_context(|| format!("position {pos} is outside {}", display(document.path())))
    };
    match request {
        CursorRequest::Offset(offset) => {
            if offset > document.text().len() || !document.text().is_char_boundary(offset) {
                bail!("offset {offset} is not a valid position in {}", display(document.path()));
            }
            Ok((offset, None))
        }
        CursorRequest::Position(pos) => Ok((offset_of(pos)?, None)),
        CursorRequest::Selection(range) => {
            let start = offset_of(range.start)?;
            let end = offset_of(range.end)?;
            Ok((start.min(end), Some((start, end))))
        }
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_resolution() {
        let doc = Document::parse("a.cpp", "int a;\nint b;\n");
        let at = |line, column| CursorRequest::Position(cli::TextPosition { line, column });
        assert_eq!(resolve_cursor(&doc, at(2, 4)).unwrap(), (11, None));
        assert_eq!(resolve_cursor(&doc, CursorRequest::Offset(3)).unwrap(), (3, None));
        assert!(resolve_cursor(&doc, CursorRequest::Offset(99)).is_err());
        assert!(resolve_cursor(&doc, at(9, 0)).is_err());

        let range = CursorRequest::Selection(cli::TextRange {
            start: cli::TextPosition { line: 2, column: 4 },
            end: cli::TextPosition { line: 1, column: 0 },
        });
        assert_eq!(resolve_cursor(&doc, range).unwrap(), (0, Some((11, 0))));
    }

    #[test]
    fn cursor_needs_one_file() {
        assert!(single_file(&[]).is_err());
        assert!(single_file(&[PathBuf::from("a.cpp"), PathBuf::from("b.cpp")]).is_err());
        assert!(single_file(&[PathBuf::from("/no/such/file.cpp")]).is_err());
    }
}
