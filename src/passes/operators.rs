use crate::passes::Pass;
use crate::scan::{Marker, Scanner, SyntaxError, is_metachar};

/// Drops spaces and tabs that touch a shell metacharacter (`| & ; < > ( )`)
/// or the ends of the text.
///
/// Whitespace inside strings, comments, here-documents and `${...}` is kept.
/// Some metacharacters are really part of a word, so the blank next to them
/// separates words and stays: an escaped one (`\;`), the `)` closing a
/// substitution (`$(ls) x`), and the `<` or `>` opening a process
/// substitution (`diff <(a) <(b)`).
pub struct TrimOperators;

/// Whether the word ending right before `end` is all digits: `echo 2 >f`
/// prints `2`, `echo 2>f` redirects descriptor 2.
fn ends_digit_word(scanner: &Scanner, end: usize) -> bool {
    let mut i = end;
    let mut digits = 0;
    while let Some(c) = i.checked_sub(1).and_then(|j| scanner.char_at(j)) {
        if c.is_ascii_digit() {
            digits += 1;
            i -= 1;
        } else if c.is_whitespace() || is_metachar(c) {
            break;
        } else {
            return false;
        }
    }
    digits > 0
}

/// Offsets of the first blank of the run holding the current character and
/// of the first character past it.
fn blank_run(scanner: &Scanner) -> (usize, usize) {
    let is_blank = |i: usize| matches!(scanner.char_at(i), Some(' ' | '\t'));
    let mut start = scanner.position();
    while start > 0 && is_blank(start - 1) && !scanner.is_escaped_at(start - 1) {
        start -= 1;
    }
    let mut end = scanner.position() + 1;
    while is_blank(end) {
        end += 1;
    }
    (start, end)
}

/// Operator pairs that read differently once their blank is gone.
const FUSED_OPERATORS: [[char; 2]; 15] = [
    ['<', '<'],
    ['>', '>'],
    ['&', '&'],
    ['|', '|'],
    [';', ';'],
    ['(', '('],
    ['<', '>'],
    ['>', '|'],
    ['&', '>'],
    ['>', '&'],
    ['<', '&'],
    ['|', '&'],
    [';', '&'],
    ['<', '('],
    ['>', '('],
];

/// A blank run that must survive even next to an operator.
fn is_required(scanner: &Scanner, start: usize, end: usize, after_operator: bool) -> bool {
    let next = scanner.char_at(end);
    let redirect = matches!(next, Some('<' | '>'));
    let fuses = match (start.checked_sub(1).and_then(|i| scanner.char_at(i)), next) {
        (Some(prev), Some(next)) => after_operator && FUSED_OPERATORS.contains(&[prev, next]),
        _ => false,
    };
    fuses
        || (redirect && ends_digit_word(scanner, start))
        // `<(` and `>(` start a word of their own.
        || (redirect && scanner.char_at(end + 1) == Some('('))
        // `$( (` must not collapse into the arithmetic opener `$((`.
        || (next == Some('(')
            && start >= 2
            && scanner.char_at(start - 2) == Some('$')
            && scanner.char_at(start - 1) == Some('('))
}

impl Pass for TrimOperators {
    fn name(&self) -> &'static str {
        "trim_operators"
    }

    fn run(&self, source: &str) -> Result<String, SyntaxError> {
        let mut scanner = Scanner::new(source);
        let mut out = String::with_capacity(source.len());
        let mut depth = 0;
        let mut in_array = false;
        // Last character that is not a trimmable blank acts as an operator.
        // The start of the text counts as one.
        let mut after_operator = true;

        while let Some(ch) = scanner.advance()? {
            let mut closed = ch == ')' && scanner.depth() < depth;
            depth = scanner.depth();
            if !scanner.in_expansion() && !scanner.is_escaped() {
                match ch {
                    '(' if scanner.prev_char() == Some('=') => in_array = true,
                    ')' if in_array => {
                        in_array = false;
                        closed = true;
                    }
                    _ => {}
                }
            }

            let trimmable = matches!(ch, ' ' | '\t')
                && !scanner.in_string_comment_or_heredoc()
                && scanner.top() != Some(Marker::Brace)
                && !scanner.is_escaped();
            if !trimmable {
                // The `)` closing a substitution or array ends a word, not a command.
                after_operator = is_metachar(ch) && !scanner.is_escaped() && !closed;
                out.push(ch);
                continue;
            }

            let (start, end) = blank_run(&scanner);
            let before_operator = scanner.char_at(end).is_none_or(is_metachar);
            if (after_operator || before_operator)
                && !is_required(&scanner, start, end, after_operator)
            {
                continue;
            }
            out.push(ch);
        }

        Ok(out)
    }
}
