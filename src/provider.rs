//! Entry points exposed to hosts: the modifier-click definition provider, the
//! manually triggered "go to endpoint" command, and pattern diagnostics.

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::{load_config, Config};
use crate::document::{word_at, Document, Location, Position};
use crate::error::LookupError;
use crate::logging::OutputLog;
use crate::naming::endpoint_name_for_hook;
use crate::scanner::{DiskWorkspace, Workspace};
use crate::search::{Resolution, Resolver};

const REPORT_SAMPLE_FILES: usize = 5;

/// How many files one search pattern currently matches.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternReport {
    pub pattern: String,
    pub matched: usize,
    pub sample: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct DefinitionProvider {
    resolver: Resolver,
    log: Arc<dyn OutputLog>,
}

impl DefinitionProvider {
    pub fn new(workspace: Arc<dyn Workspace>, config: Config, log: Arc<dyn OutputLog>) -> Self {
        Self {
            resolver: Resolver::new(workspace, config, log.clone()),
            log,
        }
    }

    /// Provider over the real filesystem, with config loaded from `root`.
    pub fn for_workspace(root: &Path, log: Arc<dyn OutputLog>) -> Self {
        let config = load_config(root, log.as_ref());
        Self::with_config(root, config, log)
    }

    /// Provider over the real filesystem with an already resolved config.
    pub fn with_config(root: &Path, config: Config, log: Arc<dyn OutputLog>) -> Self {
        let workspace = Arc::new(DiskWorkspace::new(root, &config, log.clone()));
        Self::new(workspace, config, log)
    }

    pub fn config(&self) -> &Config {
        self.resolver.config()
    }

    pub fn root(&self) -> &Path {
        self.resolver.workspace().root()
    }

    /// Click path. Anything that is not a hook, or not found, quietly yields `None`.
    pub async fn provide_definition(
        &self,
        document: &Document,
        position: Position,
        cancel: &CancellationToken,
    ) -> Option<Location> {
        let (word, _) = word_at(&document.text, position)?;
        let endpoint = endpoint_name_for_hook(&word)?;
        self.log.debug(&format!("Definition requested for {word} -> {endpoint}"));

        match self.resolver.resolve(Some(document), &endpoint, cancel).await {
            Ok(Resolution::Found(loc)) => Some(loc),
            Ok(Resolution::NotFound(reason)) => {
                self.log.debug(&format!("No definition for {endpoint}: {reason}"));
                None
            }
            Err(e) => {
                self.log.error(&format!("Error finding definition for {word}: {e:#}"));
                None
            }
        }
    }

    /// Manual command: same lookup on the word at the cursor, with every
    /// failure turned into a message for the user.
    pub async fn go_to_endpoint(
        &self,
        document: &Document,
        position: Position,
    ) -> Result<Location, LookupError> {
        let (word, _) = word_at(&document.text, position).ok_or(LookupError::NoWordAtCursor)?;
        self.go_to_hook(Some(document), &word).await
    }

    /// Resolve a hook name directly, optionally with an open document to try first.
    pub async fn go_to_hook(
        &self,
        document: Option<&Document>,
        hook: &str,
    ) -> Result<Location, LookupError> {
        let endpoint = endpoint_name_for_hook(hook).ok_or_else(|| LookupError::NotAHook {
            word: hook.to_string(),
        })?;
        self.log.info(&format!("Looking up endpoint {endpoint} for {hook}"));

        let result = self
            .resolver
            .resolve(document, &endpoint, &CancellationToken::new())
            .await;
        match result {
            Ok(Resolution::Found(loc)) => Ok(loc),
            Ok(Resolution::NotFound(reason)) => Err(LookupError::EndpointNotFound { endpoint, reason }),
            Err(e) => {
                self.log.error(&format!("Lookup for {hook} failed: {e:#}"));
                Err(LookupError::Internal(e))
            }
        }
    }

    /// For each configured pattern, how many files it matches right now.
    /// Purely informational; navigation is unaffected.
    pub async fn diagnose_patterns(&self) -> Result<Vec<PatternReport>> {
        let workspace = self.resolver.workspace().clone();
        let patterns = self.config().effective_patterns();
        let max = self.config().max_files_per_pattern;

        let reports = tokio::task::spawn_blocking(move || {
            patterns
                .par_iter()
                .map(|pattern| match workspace.find_files(pattern, max) {
                    Ok(files) => PatternReport {
                        pattern: pattern.clone(),
                        matched: files.len(),
                        sample: files.into_iter().take(REPORT_SAMPLE_FILES).collect(),
                        error: None,
                    },
                    Err(e) => PatternReport {
                        pattern: pattern.clone(),
                        matched: 0,
                        sample: vec![],
                        error: Some(format!("{e:#}")),
                    },
                })
                .collect::<Vec<_>>()
        })
        .await
        .context("pattern diagnostics task failed")?;

        for r in &reports {
            self.log.info(&format!("Pattern {}: {} file(s)", r.pattern, r.matched));
        }
        Ok(reports)
    }
}

/// Human-readable diagnostics, paths shown relative to `root`.
pub fn format_reports(reports: &[PatternReport], root: &Path, max_per_pattern: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!("Search patterns for {}\n", root.display()));
    for (i, r) in reports.iter().enumerate() {
        let capped = if r.matched >= max_per_pattern { " (capped)" } else { "" };
        out.push_str(&format!("{}. {} -> {} file(s){capped}\n", i + 1, r.pattern, r.matched));
        if let Some(err) = &r.error {
            out.push_str(&format!("   error: {err}\n"));
        }
        for f in &r.sample {
            let shown = f.strip_prefix(root).unwrap_or(f);
            out.push_str(&format!("   - {}\n", shown.display()));
        }
    }
    out
}
