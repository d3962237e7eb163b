use thiserror::Error;

/// Why the workspace phase came back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    /// Every pattern batch was scanned without a hit.
    Exhausted,
    /// The wall-clock budget ran out first.
    TimedOut,
    /// The caller cancelled after the current-document check.
    Cancelled,
}

impl std::fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotFoundReason::Exhausted => write!(f, "no search pattern matched"),
            NotFoundReason::TimedOut => write!(f, "workspace search timed out"),
            NotFoundReason::Cancelled => write!(f, "lookup was cancelled"),
        }
    }
}

/// Failures of the manual lookup command, each rendered as a user-facing message.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("No word found at cursor")]
    NoWordAtCursor,

    #[error("\"{word}\" is not a generated query/mutation hook (expected use<Name>Query, use<Name>LazyQuery or use<Name>Mutation)")]
    NotAHook { word: String },

    #[error("Endpoint \"{endpoint}\" not found ({reason})")]
    EndpointNotFound {
        endpoint: String,
        reason: NotFoundReason,
    },

    #[error("Lookup failed: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl LookupError {
    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            LookupError::EndpointNotFound { .. } => 2,
            LookupError::NoWordAtCursor | LookupError::NotAHook { .. } => 3,
            LookupError::Internal(_) => 1,
        }
    }
}
