use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::logging::OutputLog;

/// Workspace-level config file, looked up in the workspace root.
pub const WORKSPACE_CONFIG_FILE: &str = ".hooknav.json";

/// Directories never searched, whatever the config says.
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &["node_modules", "out", "dist", "build"];

pub fn default_search_patterns() -> Vec<String> {
    [
        "**/features/**/api/**/*.{ts,tsx,js,jsx}",
        "**/api/**/*.{ts,tsx,js,jsx}",
        "**/services/**/*.{ts,tsx,js,jsx}",
        "**/*api*.{ts,tsx,js,jsx}",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Globs tried in order during the workspace phase. Earlier patterns win.
    pub search_patterns: Vec<String>,
    /// Extra directory *names* to skip anywhere in the tree, on top of
    /// [`DEFAULT_EXCLUDE_DIRS`]. Compared against path components.
    pub exclude_dir_names: Vec<String>,
    /// Cap on files returned per pattern.
    pub max_files_per_pattern: usize,
    /// Wall-clock budget for the whole workspace phase.
    pub timeout_ms: u64,
    pub max_file_bytes: u64,
    /// Apply `.gitignore`/`.ignore` filters while listing files.
    pub respect_gitignore: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search_patterns: default_search_patterns(),
            exclude_dir_names: vec![],
            max_files_per_pattern: 100,
            timeout_ms: 5_000,
            max_file_bytes: 1024 * 1024,
            respect_gitignore: false,
        }
    }
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Configured patterns, or the defaults when the list is empty.
    pub fn effective_patterns(&self) -> Vec<String> {
        let patterns: Vec<String> = self
            .search_patterns
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect();
        if patterns.is_empty() {
            default_search_patterns()
        } else {
            patterns
        }
    }

    /// Default exclusions plus configured ones, deduplicated, order kept.
    pub fn excluded_dirs(&self) -> Vec<String> {
        let mut out: Vec<String> = DEFAULT_EXCLUDE_DIRS.iter().map(|s| s.to_string()).collect();
        for d in &self.exclude_dir_names {
            let d = d.trim().trim_matches('/');
            if !d.is_empty() && !out.iter().any(|e| e == d) {
                out.push(d.to_string());
            }
        }
        out
    }
}

/// `~/.config/hooknav/config.json` (platform equivalent), if a config dir exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("hooknav").join("config.json"))
}

/// Defaults, then the user config, then `<root>/.hooknav.json`.
///
/// Each layer is a partial object merged key-by-key over the one below it.
/// A malformed file is reported and skipped.
pub fn load_config(repo_root: &Path, log: &dyn OutputLog) -> Config {
    load_config_from(repo_root, user_config_path().as_deref(), log)
}

/// Like [`load_config`], with the user layer given explicitly. `None` skips it.
pub fn load_config_from(repo_root: &Path, user_config: Option<&Path>, log: &dyn OutputLog) -> Config {
    let workspace_config = repo_root.join(WORKSPACE_CONFIG_FILE);
    load_layers(user_config.into_iter().chain([workspace_config.as_path()]), log)
}

fn load_layers<'a>(paths: impl Iterator<Item = &'a Path>, log: &dyn OutputLog) -> Config {
    let mut merged = match serde_json::to_value(Config::default()) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => return Config::default(),
    };

    for path in paths {
        let Ok(text) = std::fs::read_to_string(path) else { continue };
        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(serde_json::Value::Object(layer)) => {
                log.debug(&format!("config: applying {}", path.display()));
                merged.extend(layer);
            }
            Ok(_) => log.warn(&format!("config: {} is not a JSON object, ignored", path.display())),
            Err(e) => log.warn(&format!("config: failed to parse {}: {e}", path.display())),
        }
    }

    match serde_json::from_value::<Config>(serde_json::Value::Object(merged)) {
        Ok(cfg) => cfg,
        Err(e) => {
            log.warn(&format!("config: invalid value ({e}), using defaults"));
            Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{Level, MemoryLog};
    use tempfile::TempDir;

    #[test]
    fn defaults_when_nothing_on_disk() {
        let tmp = TempDir::new().unwrap();
        let log = MemoryLog::new();
        let cfg = load_layers(std::iter::once(tmp.path().join("missing.json").as_path()), log.as_ref());
        assert_eq!(cfg.search_patterns, default_search_patterns());
        assert_eq!(cfg.timeout(), Duration::from_secs(5));
        assert!(log.lines().is_empty());
    }

    #[test]
    fn workspace_layer_overrides_user_layer_per_key() {
        let tmp = TempDir::new().unwrap();
        let user = tmp.path().join("user.json");
        let ws = tmp.path().join(WORKSPACE_CONFIG_FILE);
        std::fs::write(&user, r#"{"timeoutMs": 900, "maxFilesPerPattern": 7}"#).unwrap();
        std::fs::write(&ws, r#"{"timeoutMs": 250, "searchPatterns": ["src/store/**/*.ts"]}"#).unwrap();

        let log = MemoryLog::new();
        let cfg = load_layers([user.as_path(), ws.as_path()].into_iter(), log.as_ref());
        assert_eq!(cfg.timeout_ms, 250);
        assert_eq!(cfg.max_files_per_pattern, 7);
        assert_eq!(cfg.effective_patterns(), vec!["src/store/**/*.ts".to_string()]);
    }

    #[test]
    fn explicit_user_layer_or_none() {
        let tmp = TempDir::new().unwrap();
        let user = tmp.path().join("user.json");
        std::fs::write(&user, r#"{"timeoutMs": 900, "maxFilesPerPattern": 7}"#).unwrap();
        std::fs::write(tmp.path().join(WORKSPACE_CONFIG_FILE), r#"{"timeoutMs": 250}"#).unwrap();
        let log = MemoryLog::new();

        let cfg = load_config_from(tmp.path(), Some(user.as_path()), log.as_ref());
        assert_eq!((cfg.timeout_ms, cfg.max_files_per_pattern), (250, 7));

        let cfg = load_config_from(tmp.path(), None, log.as_ref());
        assert_eq!((cfg.timeout_ms, cfg.max_files_per_pattern), (250, 100));
    }

    #[test]
    fn malformed_layer_is_skipped_and_logged() {
        let tmp = TempDir::new().unwrap();
        let bad = tmp.path().join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();
        let log = MemoryLog::new();
        let cfg = load_layers(std::iter::once(bad.as_path()), log.as_ref());
        assert_eq!(cfg.max_files_per_pattern, 100);
        assert!(log.contains(Level::Warn, "failed to parse"));
    }

    #[test]
    fn wrong_type_falls_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let p = tmp.path().join("c.json");
        std::fs::write(&p, r#"{"timeoutMs": "soon"}"#).unwrap();
        let log = MemoryLog::new();
        let cfg = load_layers(std::iter::once(p.as_path()), log.as_ref());
        assert_eq!(cfg.timeout_ms, 5_000);
        assert!(log.contains(Level::Warn, "invalid value"));
    }

    #[test]
    fn empty_patterns_fall_back_and_excludes_extend_defaults() {
        let cfg = Config {
            search_patterns: vec!["  ".into()],
            exclude_dir_names: vec!["/generated/".into(), "dist".into()],
            ..Config::default()
        };
        assert_eq!(cfg.effective_patterns(), default_search_patterns());
        assert_eq!(cfg.excluded_dirs(), vec!["node_modules", "out", "dist", "build", "generated"]);
    }
}
