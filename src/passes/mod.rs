//! Minification passes: each one rewrites the whole text with a fresh scanner.
//!
//! Passes run in a fixed order and each consumes the previous one's output.
//! Every pass is total over well-formed input and only fails when the scanner
//! finds an unterminated quote, expansion, substitution or here-document.

/// Removes comments.
pub mod comments;
/// Drops spaces and tabs adjacent to shell metacharacters.
pub mod operators;
/// Replaces newlines with `;`, `;;`, a space, or nothing.
pub mod separators;
/// Collapses whitespace runs, joins continuation lines, drops blank lines.
pub mod whitespace;

use crate::scan::SyntaxError;

pub use comments::StripComments;
pub use operators::TrimOperators;
pub use separators::JoinLines;
pub use whitespace::NormalizeWhitespace;

/// A single text-to-text minification step.
pub trait Pass: Send + Sync {
    /// Short name used in logs and configuration.
    fn name(&self) -> &'static str;

    /// Rewrite `source`, returning the new text.
    fn run(&self, source: &str) -> Result<String, SyntaxError>;
}
