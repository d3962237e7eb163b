use anyhow::Result;
use serde_json::json;
use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::document::{Document, Position};
use crate::logging::OutputLog;
use crate::provider::{format_reports, DefinitionProvider};

pub struct ServerState {
    repo_root: Option<PathBuf>,
    providers: HashMap<PathBuf, DefinitionProvider>,
    log: Arc<dyn OutputLog>,
    runtime: tokio::runtime::Runtime,
}

impl ServerState {
    pub fn new(repo_root: Option<PathBuf>, log: Arc<dyn OutputLog>) -> Result<Self> {
        Ok(Self {
            repo_root,
            providers: HashMap::new(),
            log,
            runtime: tokio::runtime::Runtime::new()?,
        })
    }

    fn repo_root_from_params(&mut self, params: &serde_json::Value) -> PathBuf {
        let repo_root = params
            .get("repoPath")
            .and_then(|v| v.as_str())
            .map(PathBuf::from)
            .or_else(|| self.repo_root.clone())
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

        self.repo_root = Some(repo_root.clone());
        repo_root
    }

    /// One provider per root; config is read when a root is first seen.
    fn provider(&mut self, repo_root: &Path) -> DefinitionProvider {
        let log = self.log.clone();
        self.providers
            .entry(repo_root.to_path_buf())
            .or_insert_with(|| DefinitionProvider::for_workspace(repo_root, log))
            .clone()
    }

    fn tool_list(&self, id: serde_json::Value) -> serde_json::Value {
        let position_props = json!({
            "repoPath": { "type": "string", "description": "Absolute path to the workspace root" },
            "path": { "type": "string", "description": "File containing the hook call" },
            "line": { "type": "integer", "description": "Zero-based line of the cursor" },
            "column": { "type": "integer", "description": "Zero-based column of the cursor" },
            "text": { "type": "string", "description": "Optional: unsaved buffer contents; read from disk when omitted" }
        });

        json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {
                "tools": [
                    {
                        "name": "find_endpoint_definition",
                        "description": "Go to definition for a generated API hook (useXQuery / useXLazyQuery / useXMutation) at a cursor position. Returns the endpoint declaration location as JSON, or null when there is none.",
                        "inputSchema": {
                            "type": "object",
                            "properties": position_props,
                            "required": ["path", "line", "column"]
                        }
                    },
                    {
                        "name": "go_to_endpoint",
                        "description": "Same lookup as find_endpoint_definition, but failures (no word, not a hook, endpoint not found) are reported as errors with a readable message.",
                        "inputSchema": {
                            "type": "object",
                            "properties": position_props,
                            "required": ["path", "line", "column"]
                        }
                    },
                    {
                        "name": "resolve_hook",
                        "description": "Resolve a hook name (e.g. useGetUserQuery) to its endpoint declaration by searching the workspace.",
                        "inputSchema": {
                            "type": "object",
                            "properties": {
                                "repoPath": { "type": "string" },
                                "hook": { "type": "string", "description": "Hook identifier" }
                            },
                            "required": ["hook"]
                        }
                    },
                    {
                        "name": "diagnose_search_patterns",
                        "description": "List each configured search pattern with the number of files it matches. Use when lookups unexpectedly find nothing.",
                        "inputSchema": {
                            "type": "object",
                            "properties": {
                                "repoPath": { "type": "string" }
                            }
                        }
                    }
                ]
            }
        })
    }

    fn tool_call(&mut self, id: serde_json::Value, params: &serde_json::Value) -> serde_json::Value {
        let name = params.get("name").and_then(|n| n.as_str()).unwrap_or("");
        let args = params.get("arguments").cloned().unwrap_or(json!({}));

        let ok = |text: String| {
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": { "content": [{"type":"text","text": text }], "isError": false }
            })
        };

        let err = |msg: String| {
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": { "content": [{"type":"text","text": msg }], "isError": true }
            })
        };

        match name {
            "find_endpoint_definition" | "go_to_endpoint" => {
                let repo_root = self.repo_root_from_params(&args);
                let (document, position) = match document_and_position(&repo_root, &args) {
                    Ok(v) => v,
                    Err(msg) => return err(msg),
                };
                let provider = self.provider(&repo_root);

                if name == "find_endpoint_definition" {
                    let cancel = CancellationToken::new();
                    let found = self
                        .runtime
                        .block_on(provider.provide_definition(&document, position, &cancel));
                    ok(serde_json::to_string(&found).unwrap_or_else(|_| "null".to_string()))
                } else {
                    match self.runtime.block_on(provider.go_to_endpoint(&document, position)) {
                        Ok(loc) => ok(serde_json::to_string(&loc).unwrap_or_else(|_| loc.to_string())),
                        Err(e) => err(e.to_string()),
                    }
                }
            }
            "resolve_hook" => {
                let repo_root = self.repo_root_from_params(&args);
                let Some(hook) = args.get("hook").and_then(|v| v.as_str()) else {
                    return err("Missing hook".to_string());
                };
                let provider = self.provider(&repo_root);
                match self.runtime.block_on(provider.go_to_hook(None, hook)) {
                    Ok(loc) => ok(serde_json::to_string(&loc).unwrap_or_else(|_| loc.to_string())),
                    Err(e) => err(e.to_string()),
                }
            }
            "diagnose_search_patterns" => {
                let repo_root = self.repo_root_from_params(&args);
                let provider = self.provider(&repo_root);
                match self.runtime.block_on(provider.diagnose_patterns()) {
                    Ok(reports) => ok(format_reports(
                        &reports,
                        &repo_root,
                        provider.config().max_files_per_pattern,
                    )),
                    Err(e) => err(format!("diagnostics failed: {e:#}")),
                }
            }
            _ => err(format!("Tool not found: {name}")),
        }
    }
}

/// Build the document (from `text` or disk) and cursor position from tool arguments.
fn document_and_position(
    repo_root: &Path,
    args: &serde_json::Value,
) -> std::result::Result<(Document, Position), String> {
    let Some(p) = args.get("path").and_then(|v| v.as_str()) else {
        return Err("Missing path".to_string());
    };
    let Some(line) = args.get("line").and_then(|v| v.as_u64()) else {
        return Err("Missing line".to_string());
    };
    let Some(column) = args.get("column").and_then(|v| v.as_u64()) else {
        return Err("Missing column".to_string());
    };
    let abs = resolve_path(repo_root, p);

    let document = match args.get("text").and_then(|v| v.as_str()) {
        Some(text) => Document::new(abs, text),
        None => Document::open(&abs).map_err(|e| format!("Cannot read {}: {e}", abs.display()))?,
    };
    Ok((document, Position::new(line as usize, column as usize)))
}

/// Resolve a path parameter: if absolute, use as-is; otherwise join to repo_root.
fn resolve_path(repo_root: &Path, p: &str) -> PathBuf {
    let pb = PathBuf::from(p);
    if pb.is_absolute() { pb } else { repo_root.join(p) }
}

pub fn run_stdio_server(repo_root: Option<PathBuf>, log: Arc<dyn OutputLog>) -> Result<()> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    let mut state = ServerState::new(repo_root, log.clone())?;

    for line in stdin.lock().lines() {
        let Ok(line) = line else { continue };
        if line.trim().is_empty() {
            continue;
        }

        let msg: serde_json::Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                log.warn(&format!("Ignoring malformed request: {e}"));
                continue;
            }
        };

        // Notifications carry no "id" and get no reply.
        if msg.get("id").is_none() {
            continue;
        }

        let id = msg.get("id").cloned().unwrap_or(json!(null));
        let method = msg.get("method").and_then(|m| m.as_str()).unwrap_or("");

        let reply = match method {
            "initialize" => json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "protocolVersion": msg.get("params").and_then(|p| p.get("protocolVersion")).cloned().unwrap_or(json!("2024-11-05")),
                    "capabilities": { "tools": { "listChanged": false } },
                    "serverInfo": { "name": "hooknav", "version": env!("CARGO_PKG_VERSION") }
                }
            }),
            "ping" => json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {}
            }),
            "tools/list" => state.tool_list(id),
            "tools/call" => {
                let params = msg.get("params").cloned().unwrap_or(json!({}));
                state.tool_call(id, &params)
            }
            "resources/list" => json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": { "resources": [] }
            }),
            "prompts/list" => json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": { "prompts": [] }
            }),
            _ => json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32601, "message": format!("Method not found: {method}") }
            }),
        };

        writeln!(stdout, "{}", reply)?;
        stdout.flush()?;
    }

    Ok(())
}
