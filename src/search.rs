//! Two-phase endpoint lookup.
//!
//! ```text
//! Start ─► CheckCurrentDocument ─hit─► Done(Found)
//!                 │ miss (or no document)
//!                 ▼
//!          SearchWorkspace ── batch i hit ─► Done(Found)
//!                 │  batch i miss ─► batch i+1
//!                 ├─ patterns exhausted ─► Done(NotFound(Exhausted))
//!                 ├─ timeout ────────────► Done(NotFound(TimedOut))
//!                 └─ cancelled ──────────► Done(NotFound(Cancelled))
//! ```
//!
//! The workspace is walked once per lookup, producing one batch per glob
//! pattern. Batches are scanned in pattern order. Inside a batch every file is
//! read and scanned concurrently; whichever matching file finishes first wins.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::document::{position_at, Document, Location};
use crate::error::NotFoundReason;
use crate::logging::OutputLog;
use crate::matcher::DefinitionMatcher;
use crate::scanner::Workspace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(Location),
    NotFound(NotFoundReason),
}

impl Resolution {
    pub fn location(self) -> Option<Location> {
        match self {
            Resolution::Found(loc) => Some(loc),
            Resolution::NotFound(_) => None,
        }
    }
}

#[derive(Debug)]
enum Phase {
    CheckCurrentDocument,
    SearchWorkspace,
    Done(Resolution),
}

#[derive(Clone)]
pub struct Resolver {
    workspace: Arc<dyn Workspace>,
    config: Arc<Config>,
    log: Arc<dyn OutputLog>,
}

impl Resolver {
    pub fn new(workspace: Arc<dyn Workspace>, config: Config, log: Arc<dyn OutputLog>) -> Self {
        Self {
            workspace,
            config: Arc::new(config),
            log,
        }
    }

    pub fn workspace(&self) -> &Arc<dyn Workspace> {
        &self.workspace
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve `endpoint` to its declaration: the open document first (if any),
    /// then the workspace, bounded by the configured timeout.
    pub async fn resolve(
        &self,
        document: Option<&Document>,
        endpoint: &str,
        cancel: &CancellationToken,
    ) -> Result<Resolution> {
        let matcher = Arc::new(DefinitionMatcher::new(endpoint)?);

        let mut phase = match document {
            Some(_) => Phase::CheckCurrentDocument,
            None => Phase::SearchWorkspace,
        };

        loop {
            self.log.debug(&format!("lookup {endpoint}: {phase:?}"));
            phase = match phase {
                Phase::CheckCurrentDocument => {
                    let doc = document.context("current-document phase without a document")?;
                    match matcher.find(&doc.text) {
                        Some(hit) => {
                            self.log.info(&format!(
                                "Found {endpoint} in current document at offset {}",
                                hit.offset
                            ));
                            Phase::Done(Resolution::Found(doc.location_at(hit.offset)))
                        }
                        None if cancel.is_cancelled() => {
                            Phase::Done(Resolution::NotFound(NotFoundReason::Cancelled))
                        }
                        None => Phase::SearchWorkspace,
                    }
                }
                Phase::SearchWorkspace => {
                    let skip = document.map(|d| self.absolute(&d.path));
                    let search = self.search_workspace(matcher.clone(), skip);
                    let outcome = tokio::select! {
                        res = tokio::time::timeout(self.config.timeout(), search) => match res {
                            Ok(res) => res?,
                            Err(_) => {
                                self.log.info(&format!(
                                    "Workspace search for {endpoint} timed out after {}ms",
                                    self.config.timeout_ms
                                ));
                                Resolution::NotFound(NotFoundReason::TimedOut)
                            }
                        },
                        _ = cancel.cancelled() => Resolution::NotFound(NotFoundReason::Cancelled),
                    };
                    Phase::Done(outcome)
                }
                Phase::Done(resolution) => return Ok(resolution),
            };
        }
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.root().join(path)
        }
    }

    async fn search_workspace(
        &self,
        matcher: Arc<DefinitionMatcher>,
        skip: Option<PathBuf>,
    ) -> Result<Resolution> {
        let patterns = self.config.effective_patterns();
        let workspace = self.workspace.clone();
        let listed = patterns.clone();
        let max = self.config.max_files_per_pattern;
        let batches = tokio::task::spawn_blocking(move || workspace.list_batches(&listed, max))
            .await
            .context("file listing task failed")??;

        // A file already scanned in an earlier batch cannot match in a later one.
        let mut seen: HashSet<PathBuf> = skip.into_iter().collect();
        for (pattern, files) in patterns.iter().zip(batches) {
            let files: Vec<PathBuf> = files.into_iter().filter(|f| seen.insert(f.clone())).collect();
            self.log.debug(&format!("pattern {pattern}: {} new file(s)", files.len()));
            if let Some(loc) = self.scan_batch(files, &matcher).await {
                self.log.info(&format!(
                    "Found {} via pattern {pattern} at {loc}",
                    matcher.endpoint()
                ));
                return Ok(Resolution::Found(loc));
            }
        }
        self.log.info(&format!("Endpoint {} not found in workspace", matcher.endpoint()));
        Ok(Resolution::NotFound(NotFoundReason::Exhausted))
    }

    /// Read and scan every file of one batch concurrently.
    async fn scan_batch(&self, files: Vec<PathBuf>, matcher: &Arc<DefinitionMatcher>) -> Option<Location> {
        let mut tasks = JoinSet::new();
        for path in files {
            let workspace = self.workspace.clone();
            let matcher = matcher.clone();
            let log = self.log.clone();
            tasks.spawn_blocking(move || scan_file(workspace.as_ref(), &matcher, path, log.as_ref()));
        }

        // Dropping `tasks` on return aborts whatever has not started yet.
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(loc)) => return Some(loc),
                Ok(None) => {}
                Err(e) => self.log.warn(&format!("scan task failed: {e}")),
            }
        }
        None
    }
}

fn scan_file(
    workspace: &dyn Workspace,
    matcher: &DefinitionMatcher,
    path: PathBuf,
    log: &dyn OutputLog,
) -> Option<Location> {
    let text = match workspace.read_text(&path) {
        Ok(t) => t,
        Err(e) => {
            log.warn(&format!("Could not read {}: {e}", path.display()));
            return None;
        }
    };
    let hit = matcher.find(&text)?;
    Some(Location {
        position: position_at(&text, hit.offset),
        path,
    })
}
