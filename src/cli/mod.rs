//! CLI support for clove-canon
//!
//! Provides programmatic access to the clove-canon commands for embedding
//! in other tools.

mod commands;
mod convert;
mod decode;

pub use commands::{
    HashOptions, NormalizeOptions, PathOptions, execute_equal, execute_hash, execute_normalize,
    execute_path,
};
pub use convert::{json_to_value, value_to_json};
pub use decode::AstDecoder;

use std::io;

/// Errors that can occur during CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Input is not valid JSON
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON does not encode a tree
    #[error("Invalid tree: {0}")]
    InvalidAst(String),

    /// Bindings are not a JSON object
    #[error("Invalid bindings: {0}")]
    InvalidBindings(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// No input provided
    #[error("No input provided. Pass the tree as an argument or pipe it to stdin.")]
    NoInput,
}
