use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;

use crate::config::ResolvedConfig;

/// Extensions treated as C++ sources and headers during discovery.
pub const CPP_EXTENSIONS: &[&str] = &[
    "cpp", "cc", "cxx", "c++", "cp", "h", "hpp", "hh", "hxx", "h++", "inl", "ipp", "tpp",
];

pub fn is_cpp_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| CPP_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Discover C++ files from the given paths, respecting .gitignore
/// and AllFixes.Exclude patterns.
pub fn discover_files(paths: &[PathBuf], config: &ResolvedConfig) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            // Direct file paths bypass extension filtering
            files.push(path.clone());
        } else if path.is_dir() {
            let dir_files = walk_directory(path, config)?;
            files.extend(dir_files);
        } else {
            anyhow::bail!("path does not exist: {}", path.display());
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

fn walk_directory(dir: &Path, config: &ResolvedConfig) -> Result<Vec<PathBuf>> {
    let mut builder = WalkBuilder::new(dir);
    builder.hidden(true).git_ignore(true).git_global(true);

    let global_excludes = config.global_excludes();
    if !global_excludes.is_empty() {
        let mut overrides = OverrideBuilder::new(config.config_dir().unwrap_or(dir));
        for pattern in global_excludes {
            // ignore crate overrides: prefix with ! to exclude
            overrides
                .add(&format!("!{pattern}"))
                .with_context(|| format!("invalid exclude pattern: {pattern}"))?;
        }
        let overrides = overrides.build().context("failed to build overrides")?;
        builder.overrides(overrides);
    }

    let mut files = Vec::new();
    for entry in builder.build() {
        let entry = entry.context("error walking directory")?;
        let path = entry.path();
        if path.is_file() && is_cpp_file(path) {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config;
    use std::fs;

    fn empty_config() -> ResolvedConfig {
        ResolvedConfig::empty()
    }

    #[test]
    fn recognizes_cpp_extensions() {
        assert!(is_cpp_file(Path::new("a.cpp")));
        assert!(is_cpp_file(Path::new("dir/a.HPP")));
        assert!(is_cpp_file(Path::new("a.c++")));
        assert!(!is_cpp_file(Path::new("a.c")));
        assert!(!is_cpp_file(Path::new("Makefile")));
    }

    #[test]
    fn discovers_cpp_files_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.cpp"), "").unwrap();
        fs::write(dir.path().join("a.h"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = discover_files(&[dir.path().to_path_buf()], &empty_config()).unwrap();

        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| is_cpp_file(f)));
    }

    #[test]
    fn direct_file_bypasses_extension_filter() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("snippet");
        fs::write(&plain, "int x;").unwrap();

        let files = discover_files(std::slice::from_ref(&plain), &empty_config()).unwrap();

        assert_eq!(files, vec![plain]);
    }

    #[test]
    fn nonexistent_path_errors() {
        let result = discover_files(&[PathBuf::from("/no/such/path")], &empty_config());
        assert!(result.is_err());
    }

    #[test]
    fn results_are_sorted_and_deduped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("z.cpp"), "").unwrap();
        fs::write(dir.path().join("a.cpp"), "").unwrap();
        fs::write(dir.path().join("m.h"), "").unwrap();

        let root = dir.path().to_path_buf();
        let files = discover_files(&[root.clone(), root.join("a.cpp")], &empty_config()).unwrap();

        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.cpp", "m.h", "z.cpp"]);
    }

    #[test]
    fn global_excludes_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let vendor = dir.path().join("third_party");
        fs::create_dir_all(&vendor).unwrap();
        fs::write(dir.path().join("main.cpp"), "").unwrap();
        fs::write(vendor.join("lib.cpp"), "").unwrap();
        let config_path = dir.path().join(".cppfix.yml");
        fs::write(&config_path, "AllFixes:\n  Exclude:\n    - 'third_party/**'\n").unwrap();

        let config = load_config(Some(&config_path)).unwrap();
        let files = discover_files(&[dir.path().to_path_buf()], &config).unwrap();

        assert_eq!(files, vec![dir.path().join("main.cpp")]);
    }
}
