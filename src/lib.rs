pub mod block;
pub mod config;
pub mod document;
pub mod error;
pub mod logging;
pub mod matcher;
pub mod naming;
pub mod provider;
pub mod scanner;
pub mod search;
pub mod server;

pub use document::{Document, Location, Position};
pub use error::{LookupError, NotFoundReason};
pub use provider::{DefinitionProvider, PatternReport};
