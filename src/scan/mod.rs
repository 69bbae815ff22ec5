mod heredoc;
pub mod scanner;
pub mod types;

pub use scanner::Scanner;
pub use types::{Frame, Marker, Snapshot, SyntaxError};

/// Shell metacharacters that never need surrounding whitespace.
pub const METACHARS: [char; 7] = ['|', '&', ';', '<', '>', '(', ')'];

/// Returns true for `| & ; < > ( )`.
pub fn is_metachar(c: char) -> bool {
    METACHARS.contains(&c)
}
