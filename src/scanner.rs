use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher};
use ignore::overrides::{Override, OverrideBuilder};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::logging::OutputLog;

/// Never descended into, even when not listed in the config.
const ALWAYS_SKIP_DIRS: &[&str] = &[".git"];

/// What a lookup needs from the workspace: file listing and file contents.
///
/// Every call blocks; the orchestrator runs them on the blocking pool.
pub trait Workspace: Send + Sync {
    fn root(&self) -> &Path;

    /// Files matching `pattern` (relative to the root), at most `max_results`,
    /// with excluded directories pruned.
    fn find_files(&self, pattern: &str, max_results: usize) -> Result<Vec<PathBuf>>;

    /// One listing per pattern, in pattern order. A file can appear under
    /// several patterns.
    fn list_batches(&self, patterns: &[String], max_per_pattern: usize) -> Result<Vec<Vec<PathBuf>>> {
        patterns
            .iter()
            .map(|p| self.find_files(p, max_per_pattern))
            .collect()
    }

    fn read_text(&self, path: &Path) -> std::io::Result<String>;
}

/// Compile a search glob. `*` stops at `/`, `**` crosses directories, `{a,b}`
/// is supported. Matching ignores case so `*api*` also finds `userApi.ts`.
pub fn compile_pattern(pattern: &str) -> Result<GlobMatcher> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .case_insensitive(true)
        .build()
        .with_context(|| format!("Invalid search pattern: {pattern}"))?;
    Ok(glob.compile_matcher())
}

fn exclude_overrides(root: &Path, exclude_dir_names: &[String]) -> Result<Override> {
    let mut ob = OverrideBuilder::new(root);
    // `!` globs are ignores; with no whitelist globs everything else passes.
    for d in ALWAYS_SKIP_DIRS.iter().copied().chain(exclude_dir_names.iter().map(String::as_str)) {
        ob.add(&format!("!**/{d}"))?;
        ob.add(&format!("!**/{d}/**"))?;
    }
    Ok(ob.build()?)
}

/// The real filesystem under a root directory.
#[derive(Clone)]
pub struct DiskWorkspace {
    root: PathBuf,
    exclude_dir_names: Vec<String>,
    max_file_bytes: u64,
    respect_gitignore: bool,
    log: Arc<dyn OutputLog>,
}

impl DiskWorkspace {
    pub fn new(root: impl Into<PathBuf>, cfg: &Config, log: Arc<dyn OutputLog>) -> Self {
        Self {
            root: root.into(),
            exclude_dir_names: cfg.excluded_dirs(),
            max_file_bytes: cfg.max_file_bytes,
            respect_gitignore: cfg.respect_gitignore,
            log,
        }
    }

    /// Single walk of the tree; each file goes into the listing of every
    /// matcher it satisfies until that listing holds `max_per_matcher` files.
    fn walk(&self, matchers: &[GlobMatcher], max_per_matcher: usize) -> Result<Vec<Vec<PathBuf>>> {
        let overrides = exclude_overrides(&self.root, &self.exclude_dir_names)?;

        let walker = WalkBuilder::new(&self.root)
            .standard_filters(self.respect_gitignore)
            .hidden(false)
            .overrides(overrides)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut listings: Vec<Vec<PathBuf>> = vec![Vec::new(); matchers.len()];
        for item in walker {
            if listings.iter().all(|l| l.len() >= max_per_matcher) {
                break;
            }
            let Ok(dent) = item else { continue };
            if !dent.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let abs_path = dent.into_path();
            let Ok(rel) = abs_path.strip_prefix(&self.root) else { continue };
            let rel = rel.to_string_lossy().replace('\\', "/");
            let wanted: Vec<usize> = matchers
                .iter()
                .enumerate()
                .filter(|(i, m)| listings[*i].len() < max_per_matcher && m.is_match(&rel))
                .map(|(i, _)| i)
                .collect();
            if wanted.is_empty() {
                continue;
            }

            let bytes = match std::fs::metadata(&abs_path).map(|m| m.len()) {
                Ok(b) => b,
                Err(e) => {
                    self.log.debug(&format!("Skipping {rel}: {e}"));
                    continue;
                }
            };
            if bytes == 0 {
                self.log.debug(&format!("Skipping empty file {rel}"));
                continue;
            }
            if bytes > self.max_file_bytes {
                self.log.debug(&format!(
                    "Skipping {rel}: {bytes} bytes exceeds maxFileBytes ({})",
                    self.max_file_bytes
                ));
                continue;
            }

            for i in wanted {
                listings[i].push(abs_path.clone());
            }
        }

        Ok(listings)
    }
}

impl Workspace for DiskWorkspace {
    fn root(&self) -> &Path {
        &self.root
    }

    fn find_files(&self, pattern: &str, max_results: usize) -> Result<Vec<PathBuf>> {
        let matcher = compile_pattern(pattern)?;
        Ok(self.walk(&[matcher], max_results)?.pop().unwrap_or_default())
    }

    fn list_batches(&self, patterns: &[String], max_per_pattern: usize) -> Result<Vec<Vec<PathBuf>>> {
        let matchers = patterns
            .iter()
            .map(|p| compile_pattern(p))
            .collect::<Result<Vec<_>>>()?;
        self.walk(&matchers, max_per_pattern)
    }

    fn read_text(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }
}
