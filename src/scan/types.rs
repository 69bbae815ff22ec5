//! Types produced by the scanner and consumed by the minification passes.

use std::fmt;

/// Opening delimiter of a protected region. All but `HereDoc` are tracked
/// on the context stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// `$(`, `<(`, `>(` or `((`: command, process or arithmetic substitution
    Paren,
    /// `${`: parameter expansion
    Brace,
    /// `` ` ``: backtick command substitution
    Backtick,
    /// `'`: single-quoted string
    SingleQuote,
    /// `"`: double-quoted string
    DoubleQuote,
    /// `<<`: here-document body, open until its terminator line
    HereDoc,
}

impl Marker {
    /// Human-readable description used in error messages.
    pub fn describe(self) -> &'static str {
        match self {
            Marker::Paren => "substitution `(`",
            Marker::Brace => "parameter expansion `${`",
            Marker::Backtick => "backtick substitution",
            Marker::SingleQuote => "single-quoted string",
            Marker::DoubleQuote => "double-quoted string",
            Marker::HereDoc => "here-document",
        }
    }

    /// Marker for a quote character, if `ch` is one.
    pub(crate) fn quote(ch: char) -> Option<Self> {
        match ch {
            '\'' => Some(Marker::SingleQuote),
            '"' => Some(Marker::DoubleQuote),
            _ => None,
        }
    }

    /// Marker for an expansion bracket, if `ch` opens one.
    pub(crate) fn bracket(ch: char) -> Option<Self> {
        match ch {
            '(' => Some(Marker::Paren),
            '{' => Some(Marker::Brace),
            _ => None,
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// One entry of the context stack: the marker and where it was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub marker: Marker,
    /// Character offset of the opening delimiter.
    pub opened_at: usize,
}

/// Copy of the scanner's context at the current character.
///
/// Taken with [`Scanner::snapshot`](super::Scanner::snapshot); useful when a
/// caller wants to compare regions of two characters without holding a
/// borrow on the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Snapshot {
    /// Innermost open marker, if any.
    pub top: Option<Marker>,
    /// Number of open markers.
    pub depth: usize,
    pub in_comment: bool,
    pub in_heredoc: bool,
    /// The current character follows an odd run of backslashes.
    pub escaped: bool,
}

impl Snapshot {
    /// Inside a quote, expansion, substitution or here-document.
    pub fn is_protected(&self) -> bool {
        self.depth > 0 || self.in_heredoc
    }
}

/// Failure to scan a source text to completion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxError {
    /// A quote, expansion, substitution or here-document was still open at
    /// end of input. `delimiter` names the missing terminator line of a
    /// here-document.
    #[error("unterminated {marker} opened on line {line}{}", expected_terminator(.delimiter))]
    UnterminatedContext {
        marker: Marker,
        line: usize,
        delimiter: Option<String>,
    },
}

fn expected_terminator(delimiter: &Option<String>) -> String {
    delimiter
        .as_ref()
        .map(|d| format!(", expected a `{d}` line"))
        .unwrap_or_default()
}
