//! Here-document terminator capture and matching.

use super::is_metachar;

/// Extracts the terminator word from the text following a `<<` operator.
///
/// A leading `-` (the `<<-` form) is dropped, then the first shell word is
/// taken with its quoting removed: `<<-'EOF'`, `<< "EOF"` and `<<E\OF` all
/// yield `EOF`. Anything after the word (pipes, redirections, further
/// arguments) is ignored.
pub(crate) fn capture_terminator(rest: &str) -> String {
    let rest = rest.strip_prefix('-').unwrap_or(rest).trim();
    let mut word = String::new();
    let (mut sq, mut dq, mut esc) = (false, false, false);

    for c in rest.chars() {
        if esc {
            word.push(c);
            esc = false;
            continue;
        }
        if c == '\\' && !sq {
            esc = true;
            continue;
        }
        if c == '\'' && !dq {
            sq = !sq;
            continue;
        }
        if c == '"' && !sq {
            dq = !dq;
            continue;
        }
        if !sq && !dq && (c.is_whitespace() || is_metachar(c)) {
            break;
        }
        word.push(c);
    }

    word
}

/// Returns true when `line` ends the here-document delimited by `terminator`.
///
/// Leading and trailing whitespace is ignored, so tab-indented terminators of
/// `<<-` documents and space-indented ones of plain `<<` documents both match.
pub(crate) fn is_terminator_line(line: &str, terminator: &str) -> bool {
    line.trim() == terminator
}
