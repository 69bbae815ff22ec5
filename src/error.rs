use thiserror::Error;

use crate::scan::SyntaxError;

/// Everything that can go wrong between reading a script and printing its
/// minified form.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// The input parsed cleanly but the minified output does not.
    #[error("minified output fails to parse at line {line}, column {column}")]
    Verification { line: usize, column: usize },

    #[error("bash grammar unavailable: {0}")]
    Parser(String),

    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config {path}: {message}")]
    Config { path: String, message: String },
}
