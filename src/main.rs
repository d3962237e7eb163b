use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hooknav::document::{Document, Position};
use hooknav::logging::{self, OutputLog, TracingLog};
use hooknav::provider::{format_reports, DefinitionProvider};
use hooknav::server::run_stdio_server;
use hooknav::{Location, LookupError};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "hooknav")]
#[command(version)]
#[command(about = "Jump from generated API hooks (useXQuery / useXMutation) to their endpoint declarations")]
struct Cli {
    /// Workspace root (defaults to the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Debug-level logging on stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve the hook under a cursor position (1-based line and column)
    Lookup {
        file: PathBuf,
        #[arg(long)]
        line: usize,
        #[arg(long)]
        column: usize,
        /// Print the location as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve a hook name, e.g. `useGetUserQuery`
    Resolve {
        hook: String,
        /// Document to check before the workspace
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Show how many files each configured search pattern matches
    Diagnose {
        #[arg(long)]
        json: bool,
    },
    /// Start the stdio tool server
    Mcp,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let log: Arc<dyn OutputLog> = Arc::new(TracingLog);

    let repo_root = match cli.root {
        Some(r) => r,
        None => std::env::current_dir().context("Failed to get current dir")?,
    };

    if matches!(cli.cmd, Command::Mcp) {
        return run_stdio_server(Some(repo_root), log);
    }

    let provider = DefinitionProvider::for_workspace(&repo_root, log);
    let rt = tokio::runtime::Runtime::new()?;

    match cli.cmd {
        Command::Lookup { file, line, column, json } => {
            let document = open_document(&repo_root, &file)?;
            let position = Position::new(line.saturating_sub(1), column.saturating_sub(1));
            let result = rt.block_on(provider.go_to_endpoint(&document, position));
            report(result, json)
        }
        Command::Resolve { hook, file, json } => {
            let document = file.map(|f| open_document(&repo_root, &f)).transpose()?;
            let result = rt.block_on(provider.go_to_hook(document.as_ref(), &hook));
            report(result, json)
        }
        Command::Diagnose { json } => {
            let reports = rt.block_on(provider.diagnose_patterns())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                print!(
                    "{}",
                    format_reports(&reports, &repo_root, provider.config().max_files_per_pattern)
                );
            }
            Ok(())
        }
        Command::Mcp => Ok(()),
    }
}

fn open_document(repo_root: &Path, file: &Path) -> Result<Document> {
    let abs = if file.is_absolute() { file.to_path_buf() } else { repo_root.join(file) };
    Document::open(&abs).with_context(|| format!("Cannot read {}", abs.display()))
}

fn report(result: Result<Location, LookupError>, json: bool) -> Result<()> {
    match result {
        Ok(loc) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&loc)?);
            } else {
                println!("{loc}");
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(e.exit_code());
        }
    }
}
