//! Time parsing, dispatch and surveying on a C++ tree.
//!
//! Usage:
//!   cargo run --release --bin bench_cppfix -- path/to/src     # survey a real tree
//!   cargo run --release --bin bench_cppfix -- --synthetic 200 # generated corpus

use std::fmt::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;

use cppfix::config::ResolvedConfig;
use cppfix::dispatcher::Dispatcher;
use cppfix::fix::registry::FactoryRegistry;
use cppfix::fs::discover_files;
use cppfix::parse::Document;
use cppfix::refactoring::{DocumentStore, FsStore, MemoryStore};
use cppfix::survey::survey;

#[derive(Parser)]
#[command(about = "Benchmark cppfix parsing, dispatch and survey.")]
struct Args {
    /// Files or directories to benchmark
    paths: Vec<PathBuf>,

    /// Generate this many synthetic files instead of reading paths
    #[arg(long, value_name = "N")]
    synthetic: Option<usize>,

    /// Repetitions per phase; the best run is reported
    #[arg(long, default_value_t = 3)]
    runs: u32,
}

fn synthetic_file(seed: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "// generated file {seed}");
    let _ = writeln!(out, "struct Widget{seed} {{\n    int m_value;\n    void update(int delta);\n}};\n");
    for f in 0..20 {
        let _ = writeln!(
            out,
            "/// Function {f}.\nint compute_{f}(int a, int b) {{\n    int x = {f}, y = 0x{f:X};\n    if (a && b)\n        y = a * {seed};\n    for (int i = 0; i < values.size(); i++) {{\n        x += i;\n    }}\n    return x + y;\n}}\n"
        );
    }
    out
}

fn best_of(runs: u32, mut f: impl FnMut()) -> Duration {
    (0..runs.max(1))
        .map(|_| {
            let start = Instant::now();
            f();
            start.elapsed()
        })
        .min()
        .unwrap_or_default()
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = ResolvedConfig::empty();
    let registry = FactoryRegistry::default_registry();

    let memory = MemoryStore::new();
    let (files, store): (Vec<PathBuf>, &dyn DocumentStore) = match args.synthetic {
        Some(n) => {
            let files: Vec<PathBuf> = (0..n).map(|i| PathBuf::from(format!("gen_{i}.cpp"))).collect();
            for (i, path) in files.iter().enumerate() {
                memory.insert(path.clone(), synthetic_file(i));
            }
            (files, &memory)
        }
        None => {
            let paths = if args.paths.is_empty() {
                vec![PathBuf::from(".")]
            } else {
                args.paths.clone()
            };
            (discover_files(&paths, &config)?, &FsStore)
        }
    };

    let texts: Vec<(PathBuf, String)> = files
        .iter()
        .map(|p| {
            store
                .read(p)
                .map(|t| (p.clone(), t))
                .with_context(|| format!("failed to read {}", p.display()))
        })
        .collect::<Result<_>>()?;
    let bytes: usize = texts.iter().map(|(_, t)| t.len()).sum();
    println!("{} files, {} KiB", texts.len(), bytes / 1024);

    let parse = best_of(args.runs, || {
        for (path, text) in &texts {
            let _ = Document::parse(path.clone(), text.clone());
        }
    });
    println!("parse:    {parse:.2?}");

    let docs: Vec<Arc<Document>> = texts
        .iter()
        .map(|(p, t)| Arc::new(Document::parse(p.clone(), t.clone())))
        .collect();
    let dispatcher = Dispatcher::new(&registry, &config);
    let mut positions = 0usize;
    let dispatch = best_of(args.runs, || {
        positions = 0;
        for doc in &docs {
            for token in doc.tokens() {
                positions += 1;
                let _ = dispatcher.candidates(doc, token.start, None, store);
            }
        }
    });
    println!("dispatch: {dispatch:.2?} ({positions} cursor positions)");

    let mut offered = 0;
    let surveyed = best_of(args.runs, || {
        offered = survey(&files, &registry, &config, store).entries.len();
    });
    println!("survey:   {surveyed:.2?} ({offered} fixes offered, parallel)");
    Ok(())
}
