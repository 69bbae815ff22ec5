//! bash-minifier: shrink bash scripts without changing what they do.
//!
//! A script goes through four character-level passes, each driven by a
//! [`Scanner`](scan::Scanner) that knows whether the current character sits
//! inside a string, an expansion, a command substitution, a comment or a
//! here-document. Text in those protected regions is never rewritten.
//!
//! # Architecture
//!
//! - **[`scan`]**: contextual scanner, context markers, syntax errors.
//! - **[`passes`]**: comment stripping, whitespace normalization, line joining
//!   and operator trimming.
//! - **[`pipeline`]**: configured pass sequence with shebang and line-ending
//!   handling.
//! - **[`verify`]**: optional tree-sitter-bash check of the output.
//! - **[`config`]**: embedded defaults plus user overlay.
//! - **[`logging`]**: stderr logger and the per-run record.

/// Configuration types, loading, and overlay merge logic.
pub mod config;
/// Crate-level error type.
pub mod error;
/// Logger setup and run records.
pub mod logging;
/// The four minification passes.
pub mod passes;
/// Pass sequencing.
pub mod pipeline;
/// Character scanner with shell context tracking.
pub mod scan;
/// Syntax check of minified output.
pub mod verify;

pub use error::Error;
pub use pipeline::Pipeline;
pub use scan::{Marker, SyntaxError};

/// Minify `source` with every pass enabled and no pre- or post-processing.
///
/// This is the main entry point for tests and simple usage. For shebang
/// handling, verification or disabled passes, build a [`Pipeline`] from a
/// [`config::Config`].
pub fn minify(source: &str) -> Result<String, SyntaxError> {
    Pipeline::standard().apply(source)
}
