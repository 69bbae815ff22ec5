use crate::passes::Pass;
use crate::scan::{Scanner, SyntaxError, is_metachar};

/// Reserved words followed by a command: a newline after one of them only
/// separates the keyword from its body, and the next word is in command
/// position.
const COMMAND_PREFIXES: [&str; 7] = ["then", "do", "else", "elif", "if", "while", "until"];

/// Replaces each unprotected newline with the shortest equivalent separator:
/// `;`, `;;` before `esac`, a single space, or nothing.
///
/// Newlines inside strings, expansions, substitutions and here-documents are
/// kept, as are newlines ending a line that still carries a comment.
pub struct JoinLines;

impl Pass for JoinLines {
    fn name(&self) -> &'static str {
        "join_lines"
    }

    fn run(&self, source: &str) -> Result<String, SyntaxError> {
        let mut scanner = Scanner::new(source);
        let mut out = String::with_capacity(source.len());
        let mut structure = Structure::default();
        let mut line_has_comment = false;

        while let Some(ch) = scanner.advance()? {
            if scanner.is_protected() {
                out.push(ch);
                continue;
            }
            if scanner.in_comment() {
                line_has_comment = true;
                out.push(ch);
                continue;
            }
            structure.observe(&scanner, ch);
            if ch != '\n' {
                out.push(ch);
                continue;
            }
            if line_has_comment {
                line_has_comment = false;
                out.push('\n');
                continue;
            }
            out.push_str(separator(&scanner, &structure));
        }

        Ok(out)
    }
}

/// Decide what replaces the newline under the cursor.
fn separator(s: &Scanner, structure: &Structure) -> &'static str {
    let prev = s.prev_unescaped();
    let next = s.next_char();
    let next_word = next_keyword(s);

    if structure.in_array
        || prev_keyword(s).is_some_and(|w| opens_body(s, structure, &w))
        || (next_word == "in" && structure.expects_in())
        || matches!(prev, Some('{' | '(' | '&' | '|'))
        || structure.closes_pattern(s.position().wrapping_sub(1))
    {
        return " ";
    }
    if next == Some('{') {
        return if s.prev_chars(2) == ['(', ')'] {
            ""
        } else if is_function_keyword_header(&s.line_before()) {
            " "
        } else if prev == Some(';') {
            ""
        } else {
            ";"
        };
    }
    if next_word == "esac" {
        return if s.prev_chars(2) == [';', ';'] {
            ""
        } else if prev == Some(';') {
            ";"
        } else {
            ";;"
        };
    }
    // The next line opens with a case terminator of its own.
    if next == Some(';') {
        return "";
    }
    if next.is_some() && prev != Some(';') {
        return ";";
    }
    ""
}

/// `word`, ending at the cursor, is a reserved word waiting for its body: a
/// compound keyword in command position, or the `in` of a `case` header.
/// As an argument (`echo do`) it is an ordinary word.
fn opens_body(s: &Scanner, structure: &Structure, word: &str) -> bool {
    if word == "in" {
        return structure.case_in_at == Some(s.position());
    }
    COMMAND_PREFIXES.contains(&word)
        && is_command_position(s, s.position() - word.chars().count())
}

/// The line ends in `function name` at command position: the body brace
/// follows on the next line.
fn is_function_keyword_header(line: &str) -> bool {
    let is_blank = |c: char| c == ' ' || c == '\t';
    let line = line.trim_end_matches(is_blank);
    let Some(split) = line.rfind(is_blank) else {
        return false;
    };
    if line[split + 1..].contains(is_metachar) {
        return false;
    }
    let Some(before) = line[..split].trim_end_matches(is_blank).strip_suffix("function") else {
        return false;
    };
    if !before.is_empty()
        && !before.ends_with(|c: char| is_blank(c) || is_metachar(c) || c == '{')
    {
        return false;
    }
    let before = before.trim_end_matches(is_blank);
    let Some(last) = before.chars().last() else {
        return true;
    };
    if matches!(last, ';' | '&' | '|' | '(' | '{') {
        let escapes = before[..before.len() - 1]
            .chars()
            .rev()
            .take_while(|&c| c == '\\')
            .count();
        return escapes % 2 == 0;
    }
    let word = before.rsplit(|c: char| is_blank(c) || is_metachar(c)).next();
    word.is_some_and(|w| COMMAND_PREFIXES.contains(&w))
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Characters that may surround a reserved word.
fn is_word_boundary(c: Option<char>) -> bool {
    matches!(
        c,
        None | Some(' ' | '\t' | '\n' | ';' | '&' | '|' | '(' | ')')
    )
}

/// The alphabetic word right before the cursor, when it stands on its own.
fn prev_keyword(s: &Scanner) -> Option<String> {
    let word = s.prev_word();
    if word.is_empty() {
        return None;
    }
    let start = s.position() - word.chars().count();
    let before = start.checked_sub(1).and_then(|i| s.char_at(i));
    is_word_boundary(before).then_some(word)
}

/// The alphabetic word right after the cursor, or empty when it runs into
/// other word characters (`index`, `in-place`).
fn next_keyword(s: &Scanner) -> String {
    let word = s.next_word();
    let after = s.char_at(s.position() + 1 + word.chars().count());
    if is_word_boundary(after) {
        word
    } else {
        String::new()
    }
}

/// Alphabetic run ending right before `end`, and where it starts.
fn word_ending_at(s: &Scanner, end: usize) -> (String, usize) {
    let mut start = end;
    while start > 0 && s.char_at(start - 1).is_some_and(char::is_alphabetic) {
        start -= 1;
    }
    ((start..end).filter_map(|i| s.char_at(i)).collect(), start)
}

/// Whether a word starting at `start` would be read as a command name.
fn is_command_position(s: &Scanner, start: usize) -> bool {
    let mut i = start;
    while i > 0 && matches!(s.char_at(i - 1), Some(' ' | '\t')) {
        i -= 1;
    }
    if i == 0 {
        return true;
    }
    match s.char_at(i - 1) {
        Some('\n' | ';' | '&' | '|' | '(' | ')' | '{') => true,
        Some(c) if c.is_alphabetic() => {
            let (word, word_start) = word_ending_at(s, i);
            let before = word_start.checked_sub(1).and_then(|j| s.char_at(j));
            is_word_boundary(before) && COMMAND_PREFIXES.contains(&word.as_str())
        }
        _ => false,
    }
}

/// Position inside a `case` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaseState {
    /// Between `case` and `in`.
    Subject,
    /// Expecting a pattern list or `esac`.
    Pattern,
    /// Inside a clause body, until `;;`, `;&`, `;;&` or `esac`.
    Body,
}

/// The little grammar the separator choice depends on beyond its immediate
/// neighbours: case clauses, `for` headers and array literals.
#[derive(Debug, Default)]
struct Structure {
    cases: Vec<CaseState>,
    in_array: bool,
    /// Between `for name` (or `select name`) and its `in` or `do`.
    for_header: bool,
    /// Offset of the `)` that most recently closed a case pattern.
    pattern_closed_at: Option<usize>,
    /// Offset right after the `in` that opened the innermost case body.
    case_in_at: Option<usize>,
}

impl Structure {
    fn top(&self) -> Option<CaseState> {
        self.cases.last().copied()
    }

    fn set_top(&mut self, state: CaseState) {
        if let Some(top) = self.cases.last_mut() {
            *top = state;
        }
    }

    fn closes_pattern(&self, offset: usize) -> bool {
        self.pattern_closed_at == Some(offset)
    }

    /// A `case` or `for` header is waiting for its `in`.
    fn expects_in(&self) -> bool {
        self.for_header || self.top() == Some(CaseState::Subject)
    }

    /// Update from an unprotected character of the input.
    fn observe(&mut self, s: &Scanner, ch: char) {
        if !is_word_char(ch) {
            self.end_word(s);
        }
        if s.is_escaped() {
            return;
        }
        if matches!(ch, ';' | '&' | '|') {
            self.for_header = false;
        }
        match ch {
            '(' if s.prev_unescaped() == Some('=') => self.in_array = true,
            ')' if self.in_array => self.in_array = false,
            ')' if self.top() == Some(CaseState::Pattern) => {
                self.set_top(CaseState::Body);
                self.pattern_closed_at = Some(s.position());
            }
            ';' if self.top() == Some(CaseState::Body)
                && matches!(s.next_char(), Some(';' | '&')) =>
            {
                self.set_top(CaseState::Pattern);
            }
            _ => {}
        }
    }

    /// React to the reserved word that ends right before the cursor, if any.
    fn end_word(&mut self, s: &Scanner) {
        let word = s.prev_word();
        if word.is_empty() {
            return;
        }
        let start = s.position() - word.chars().count();
        let before = start.checked_sub(1).and_then(|i| s.char_at(i));
        if before.is_some_and(is_word_char) {
            return;
        }
        let standalone = matches!(before, None | Some(' ' | '\t' | '\n' | ';'));

        if matches!(word.as_str(), "in" | "do") {
            self.for_header = false;
        }
        match (word.as_str(), self.top()) {
            ("for" | "select", _) if is_command_position(s, start) => {
                self.for_header = true;
            }
            ("case", top) if top != Some(CaseState::Pattern) && is_command_position(s, start) => {
                self.cases.push(CaseState::Subject);
            }
            ("in", Some(CaseState::Subject)) if standalone => {
                self.set_top(CaseState::Pattern);
                self.case_in_at = Some(s.position());
            }
            ("esac", Some(CaseState::Pattern)) if standalone => {
                self.cases.pop();
            }
            ("esac", Some(CaseState::Body)) if is_command_position(s, start) => {
                self.cases.pop();
            }
            _ => {}
        }
    }
}
