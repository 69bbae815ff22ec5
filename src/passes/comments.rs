use crate::passes::Pass;
use crate::scan::{Scanner, SyntaxError};

/// Copies everything the scanner does not report as comment text.
///
/// The newline ending a comment is kept; only the `#` and what follows it on
/// the line go away. A `#` inside quotes, expansions or here-documents is
/// never classified as a comment, so it survives.
pub struct StripComments;

impl Pass for StripComments {
    fn name(&self) -> &'static str {
        "strip_comments"
    }

    fn run(&self, source: &str) -> Result<String, SyntaxError> {
        let mut scanner = Scanner::new(source);
        let mut out = String::with_capacity(source.len());
        while let Some(ch) = scanner.advance()? {
            if !scanner.in_comment() {
                out.push(ch);
            }
        }
        Ok(out)
    }
}
