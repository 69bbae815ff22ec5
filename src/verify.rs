//! Output verification with tree-sitter-bash.
//!
//! The minifier works on characters, not on a syntax tree, so an independent
//! parser is a useful cross-check: if the input parses cleanly and the output
//! does not, minifying broke the script.

use log::debug;
use tree_sitter::{Node, Parser};

use crate::error::Error;

/// One-based position of a syntax error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorSite {
    pub line: usize,
    pub column: usize,
}

impl ErrorSite {
    fn of(node: Node<'_>) -> Self {
        let point = node.start_position();
        Self {
            line: point.row + 1,
            column: point.column + 1,
        }
    }
}

fn bash_parser() -> Result<Parser, Error> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_bash::LANGUAGE.into())
        .map_err(|e| Error::Parser(e.to_string()))?;
    Ok(parser)
}

/// The first ERROR or MISSING node in `source`, if any.
pub fn first_error(source: &str) -> Result<Option<ErrorSite>, Error> {
    let mut parser = bash_parser()?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| Error::Parser("parse did not complete".into()))?;
    Ok(find_error(tree.root_node()))
}

/// Depth-first search for the leftmost error node.
fn find_error(node: Node<'_>) -> Option<ErrorSite> {
    if !node.has_error() {
        return None;
    }
    if node.is_error() || node.is_missing() {
        return Some(ErrorSite::of(node));
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(site) = find_error(child) {
            return Some(site);
        }
    }
    Some(ErrorSite::of(node))
}

/// Fail when `minified` has a syntax error that `original` did not.
///
/// Input tree-sitter already rejects is not held against the output.
pub fn check(original: &str, minified: &str) -> Result<(), Error> {
    if let Some(site) = first_error(original)? {
        debug!(
            "input has syntax errors from line {} column {}; skipping verification",
            site.line, site.column
        );
        return Ok(());
    }
    match first_error(minified)? {
        Some(ErrorSite { line, column }) => Err(Error::Verification { line, column }),
        None => Ok(()),
    }
}
