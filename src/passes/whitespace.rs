use crate::passes::Pass;
use crate::scan::{Scanner, SyntaxError};

/// Collapses runs of blanks, strips leading and trailing blanks from lines,
/// removes blank lines and joins backslash-continued lines.
///
/// Text inside strings, expansions, substitutions and here-documents is
/// copied untouched.
pub struct NormalizeWhitespace;

fn is_blank(c: Option<char>) -> bool {
    matches!(c, None | Some(' ' | '\t'))
}

/// First character after the current one, looking through line continuations.
fn next_past_continuations(scanner: &Scanner) -> Option<char> {
    let mut i = scanner.position() + 1;
    while scanner.char_at(i) == Some('\\') && scanner.char_at(i + 1) == Some('\n') {
        i += 2;
    }
    scanner.char_at(i)
}

impl Pass for NormalizeWhitespace {
    fn name(&self) -> &'static str {
        "normalize_whitespace"
    }

    fn run(&self, source: &str) -> Result<String, SyntaxError> {
        let mut scanner = Scanner::new(source);
        let mut out = String::with_capacity(source.len());
        let mut empty_line = true;
        let mut space_emitted = true;

        while let Some(ch) = scanner.advance()? {
            if scanner.is_protected() {
                out.push(ch);
                // A here-document body ends with a newline; what follows starts a line.
                empty_line = ch == '\n';
                space_emitted = ch == '\n';
                continue;
            }
            match ch {
                // Line continuation: drop the backslash and the newline.
                '\\' if scanner.is_escaped() && scanner.next_char() == Some('\n') => {
                    scanner.skip_next();
                }
                ' ' | '\t' if scanner.is_escaped() => {
                    out.push(ch);
                    empty_line = false;
                    space_emitted = false;
                }
                ' ' | '\t' => {
                    let next = next_past_continuations(&scanner);
                    if !space_emitted && !empty_line && !is_blank(next) && next != Some('\n') {
                        out.push(' ');
                        space_emitted = true;
                    }
                }
                '\n' => {
                    if scanner.prev_char() != Some('\n') && !empty_line {
                        out.push('\n');
                        empty_line = true;
                        space_emitted = true;
                    }
                }
                _ => {
                    out.push(ch);
                    empty_line = false;
                    space_emitted = false;
                }
            }
        }

        Ok(out)
    }
}
