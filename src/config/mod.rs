use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde_yml::Value;

use crate::fix::FixConfig;

pub const CONFIG_FILE: &str = ".cppfix.yml";

/// Resolved configuration from .cppfix.yml.
///
/// Reads a single YAML file: `AllFixes.Exclude` plus one mapping per
/// department-qualified fix name with `Enabled`, `Include`, `Exclude` and
/// free-form options.
#[derive(Debug)]
pub struct ResolvedConfig {
    /// Directory holding the config file, when one was loaded.
    config_dir: Option<PathBuf>,
    /// Per-fix configs keyed by fix name (e.g. "Statement/AddBraces").
    fix_configs: HashMap<String, FixConfig>,
    /// Compiled Include/Exclude globs, keyed like `fix_configs`.
    fix_globs: HashMap<String, PathFilter>,
    global_excludes: Vec<String>,
    global_filter: PathFilter,
}

/// Include/Exclude globs compiled once per fix.
#[derive(Debug, Default)]
struct PathFilter {
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl PathFilter {
    fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        Ok(Self {
            include: build_globs(include)?,
            exclude: build_globs(exclude)?,
        })
    }

    fn allows(&self, path: &Path) -> bool {
        if self.exclude.as_ref().is_some_and(|set| set.is_match(path)) {
            return false;
        }
        self.include.as_ref().is_none_or(|set| set.is_match(path))
    }
}

fn build_globs(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))?;
        builder.add(glob);
    }
    builder
        .build()
        .map(Some)
        .context("failed to compile glob patterns")
}

impl ResolvedConfig {
    pub fn empty() -> Self {
        Self {
            config_dir: None,
            fix_configs: HashMap::new(),
            fix_globs: HashMap::new(),
            global_excludes: Vec::new(),
            global_filter: PathFilter::default(),
        }
    }
}

/// Load config from the given path, or look for `.cppfix.yml` in the
/// current directory. Returns an empty config if the file doesn't exist.
pub fn load_config(path: Option<&Path>) -> Result<ResolvedConfig> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => Path::new(CONFIG_FILE).to_path_buf(),
    };

    if !config_path.exists() {
        if path.is_some() {
            tracing::warn!(path = %config_path.display(), "config file not found, using defaults");
        }
        return Ok(ResolvedConfig::empty());
    }

    let contents = std::fs::read_to_string(&config_path)
        .with_context(|| format!("failed to read config {}", config_path.display()))?;
    let mut config = parse_config(&contents)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    config.config_dir = config_path.parent().map(Path::to_path_buf);
    Ok(config)
}

/// Build a config from YAML text.
pub fn parse_config(contents: &str) -> Result<ResolvedConfig> {
    let raw: Value = serde_yml::from_str(contents)?;

    let mut fix_configs = HashMap::new();
    let mut global_excludes = Vec::new();

    if let Value::Mapping(map) = &raw {
        for (key, value) in map {
            let key_str = match key.as_str() {
                Some(s) => s,
                None => continue,
            };

            if key_str == "AllFixes" {
                if let Some(excludes) = extract_string_list(value, "Exclude") {
                    global_excludes = excludes;
                }
                continue;
            }

            // Fix names carry a department (e.g. "Statement/AddBraces")
            if key_str.contains('/') {
                fix_configs.insert(key_str.to_string(), parse_fix_config(value));
            } else {
                tracing::debug!(key = key_str, "ignoring unknown config key");
            }
        }
    }

    let mut fix_globs = HashMap::new();
    for (name, config) in &fix_configs {
        let filter = PathFilter::new(&config.include, &config.exclude)
            .with_context(|| format!("in {name}"))?;
        fix_globs.insert(name.clone(), filter);
    }
    let global_filter = PathFilter::new(&[], &global_excludes).context("in AllFixes")?;

    Ok(ResolvedConfig {
        config_dir: None,
        fix_configs,
        fix_globs,
        global_excludes,
        global_filter,
    })
}

impl ResolvedConfig {
    /// Check if a fix is enabled for the given file path.
    pub fn is_fix_enabled(&self, name: &str, path: &Path) -> bool {
        let path = self.relative(path);
        if !self.global_filter.allows(&path) {
            return false;
        }
        match self.fix_configs.get(name) {
            Some(config) if !config.enabled => false,
            Some(_) => self.fix_globs.get(name).is_none_or(|f| f.allows(&path)),
            None => true, // enabled by default
        }
    }

    /// Get the resolved config for a specific fix.
    pub fn fix_config(&self, name: &str) -> FixConfig {
        self.fix_configs.get(name).cloned().unwrap_or_default()
    }

    /// Global exclude patterns from AllFixes.Exclude.
    pub fn global_excludes(&self) -> &[String] {
        &self.global_excludes
    }

    pub fn config_dir(&self) -> Option<&Path> {
        self.config_dir.as_deref()
    }

    /// Names of fixes the config mentions.
    pub fn configured_fix_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fix_configs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Globs are written relative to the config file.
    fn relative(&self, path: &Path) -> PathBuf {
        let path = path.strip_prefix("./").unwrap_or(path);
        match self.config_dir.as_deref() {
            Some(dir) if !dir.as_os_str().is_empty() => {
                path.strip_prefix(dir).unwrap_or(path).to_path_buf()
            }
            _ => path.to_path_buf(),
        }
    }
}

fn parse_fix_config(value: &Value) -> FixConfig {
    let mut config = FixConfig::default();

    if let Value::Mapping(map) = value {
        for (k, v) in map {
            let key = match k.as_str() {
                Some(s) => s,
                None => continue,
            };
            match key {
                "Enabled" => {
                    if let Some(b) = v.as_bool() {
                        config.enabled = b;
                    }
                }
                "Exclude" => {
                    if let Some(list) = value_to_string_list(v) {
                        config.exclude = list;
                    }
                }
                "Include" => {
                    if let Some(list) = value_to_string_list(v) {
                        config.include = list;
                    }
                }
                _ => {
                    config.options.insert(key.to_string(), v.clone());
                }
            }
        }
    }

    config
}

fn extract_string_list(value: &Value, key: &str) -> Option<Vec<String>> {
    value
        .as_mapping()?
        .get(&Value::String(key.to_string()))?
        .as_sequence()
        .map(|seq| {
            seq.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
}

fn value_to_string_list(value: &Value) -> Option<Vec<String>> {
    value.as_sequence().map(|seq| {
        seq.iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join(CONFIG_FILE);
        fs::write(&path, content).unwrap();
        path
    }

    fn load(content: &str) -> (tempfile::TempDir, ResolvedConfig) {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), content);
        let config = load_config(Some(&path)).unwrap();
        (dir, config)
    }

    #[test]
    fn missing_config_returns_empty() {
        let config = load_config(Some(Path::new("/nonexistent/.cppfix.yml"))).unwrap();
        assert!(config.global_excludes().is_empty());
        assert!(config.config_dir().is_none());
        assert!(config.is_fix_enabled("Statement/AddBraces", Path::new("a.cpp")));
    }

    #[test]
    fn all_fixes_exclude() {
        let (_dir, config) = load("AllFixes:\n  Exclude:\n    - 'third_party/**'\n    - 'build/**'\n");
        assert_eq!(
            config.global_excludes(),
            &["third_party/**".to_string(), "build/**".to_string()]
        );
        assert!(!config.is_fix_enabled("Statement/AddBraces", Path::new("third_party/x/a.cpp")));
        assert!(config.is_fix_enabled("Statement/AddBraces", Path::new("src/a.cpp")));
    }

    #[test]
    fn fix_enabled_false() {
        let (_dir, config) = load("Statement/AddBraces:\n  Enabled: false\n");
        assert!(!config.is_fix_enabled("Statement/AddBraces", Path::new("a.cpp")));
        // Unknown fixes default to enabled
        assert!(config.is_fix_enabled("Statement/SplitIfStatement", Path::new("a.cpp")));
    }

    #[test]
    fn fix_exclude_include_patterns() {
        let (_dir, config) = load(
            "Naming/ConvertToCamelCase:\n  Exclude:\n    - 'gen/**'\n  Include:\n    - '**/*.cpp'\n",
        );
        let fc = config.fix_config("Naming/ConvertToCamelCase");
        assert_eq!(fc.exclude, vec!["gen/**".to_string()]);
        assert_eq!(fc.include, vec!["**/*.cpp".to_string()]);

        let name = "Naming/ConvertToCamelCase";
        assert!(config.is_fix_enabled(name, Path::new("src/a.cpp")));
        assert!(!config.is_fix_enabled(name, Path::new("src/a.h")));
        assert!(!config.is_fix_enabled(name, Path::new("gen/a.cpp")));
    }

    #[test]
    fn paths_are_matched_relative_to_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "AllFixes:\n  Exclude:\n    - 'vendor/**'\n");
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.config_dir(), Some(dir.path()));
        let vendored = dir.path().join("vendor").join("lib.cpp");
        assert!(!config.is_fix_enabled("Statement/AddBraces", &vendored));
        assert!(config.is_fix_enabled("Statement/AddBraces", &dir.path().join("main.cpp")));
    }

    #[test]
    fn fix_custom_options() {
        let (_dir, config) = load("Expression/AssignToLocalVariable:\n  UseAuto: false\n");
        let fc = config.fix_config("Expression/AssignToLocalVariable");
        assert!(!fc.get_bool("UseAuto", true));
    }

    #[test]
    fn non_fix_keys_ignored() {
        let (_dir, config) = load("AllFixes:\n  Exclude: []\nversion: 2\n");
        assert!(config.configured_fix_names().is_empty());
        assert!(config.is_fix_enabled("version", Path::new("a.cpp")));
    }

    #[test]
    fn invalid_glob_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "Statement/AddBraces:\n  Exclude:\n    - 'a/[b'\n");
        let err = load_config(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("Statement/AddBraces"));
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "AllFixes: [\n");
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn default_fix_config() {
        let config = ResolvedConfig::empty();
        let fc = config.fix_config("Statement/Whatever");
        assert!(fc.enabled);
        assert!(fc.exclude.is_empty());
        assert!(fc.options.is_empty());
    }
}
