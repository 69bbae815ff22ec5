//! Character-at-a-time scanner tracking shell quoting and expansion context.

use log::trace;

use super::heredoc::{capture_terminator, is_terminator_line};
use super::types::{Frame, Marker, Snapshot, SyntaxError};

/// Single-pass scanner over a shell source text.
///
/// Each call to [`advance`](Scanner::advance) exposes the next character with
/// the context already updated for it: the opening `"` of a string is
/// reported as inside that string, the `#` starting a comment as inside the
/// comment. Between calls the query methods describe the exposed character
/// and its neighbourhood in the source.
///
/// A scanner is consumed once. Every pass builds a fresh one over its input.
pub struct Scanner {
    chars: Vec<char>,
    pos: usize,
    /// Character exposed by the last `advance`, still awaiting its post-step.
    current: Option<char>,
    stack: Vec<Frame>,
    escaped: bool,
    in_comment: bool,
    in_heredoc: bool,
    heredoc_opened_at: usize,
    terminator: String,
    close_heredoc_after: bool,
    /// Characters still to be exposed without classification.
    as_is: usize,
    /// Offset of the last `)` that closed a substitution.
    substitution_closed_at: Option<usize>,
}

impl Scanner {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            current: None,
            stack: Vec::new(),
            escaped: false,
            in_comment: false,
            in_heredoc: false,
            heredoc_opened_at: 0,
            terminator: String::new(),
            close_heredoc_after: false,
            as_is: 0,
            substitution_closed_at: None,
        }
    }

    /// Moves to the next character and returns it, or `None` at end of input.
    ///
    /// Reaching the end with a quote, expansion, substitution or here-document
    /// still open is an error.
    pub fn advance(&mut self) -> Result<Option<char>, SyntaxError> {
        if let Some(prev) = self.current.take() {
            self.finish_step(prev);
        }
        let Some(&ch) = self.chars.get(self.pos) else {
            self.check_balanced()?;
            return Ok(None);
        };
        self.classify(ch);
        self.current = Some(ch);
        Ok(Some(ch))
    }

    /// Drops the character after the current one without classifying it.
    ///
    /// Only safe for characters that cannot change context (a newline after a
    /// line-continuation backslash). Never skip quotes, brackets or escapes.
    pub fn skip_next(&mut self) {
        self.escaped = false;
        self.pos = (self.pos + 1).min(self.chars.len());
    }

    // ── Context update ──

    fn finish_step(&mut self, ch: char) {
        if ch != '\\' {
            self.escaped = false;
        }
        if self.close_heredoc_after {
            self.close_heredoc_after = false;
            self.in_heredoc = false;
            trace!("here-document `{}` closed at offset {}", self.terminator, self.pos);
        }
        self.pos = (self.pos + 1).min(self.chars.len());
    }

    fn classify(&mut self, ch: char) {
        if self.as_is > 0 {
            self.as_is -= 1;
            return;
        }
        if ch == '\\' {
            self.escaped = !self.escaped;
            return;
        }

        if ch == '\n' && !self.in_string() {
            if self.in_comment {
                self.in_comment = false;
            } else if self.in_heredoc && is_terminator_line(&self.line_before(), &self.terminator)
            {
                self.close_heredoc_after = true;
            }
            return;
        }
        if self.in_comment || self.in_heredoc {
            return;
        }

        if let Some(quote) = Marker::quote(ch) {
            // A single quote cannot be escaped inside a single-quoted string.
            if !self.escaped || (quote == Marker::SingleQuote && self.in_single_quote()) {
                self.toggle_quote(quote);
            }
            return;
        }
        if self.in_single_quote() || self.escaped {
            return;
        }

        match ch {
            '#' if self.stack.is_empty() && self.at_word_boundary() => {
                self.in_comment = true;
            }
            '`' => {
                if self.top() == Some(Marker::Backtick) {
                    self.stack.pop();
                } else {
                    self.push(Marker::Backtick, self.pos);
                }
            }
            '$' => {
                if let Some(marker) = self.next_char().and_then(Marker::bracket) {
                    self.push(marker, self.pos + 1);
                    self.as_is = 1;
                }
            }
            // Process substitution: `<(` and `>(` open a substitution like `$(`.
            '<' | '>' if self.next_char() == Some('(') && !self.in_double_quote() => {
                self.push(Marker::Paren, self.pos + 1);
                self.as_is = 1;
            }
            // Arithmetic command: `(( ... ))` and `for (( ... ))`.
            '(' if self.next_char() == Some('(') && self.stack.is_empty() => {
                self.push(Marker::Paren, self.pos);
                self.as_is = 1;
            }
            '(' | '{' => {
                if let Some(marker) = Marker::bracket(ch)
                    && self.top() == Some(marker)
                {
                    self.push(marker, self.pos);
                }
            }
            ')' if self.top() == Some(Marker::Paren) => {
                self.stack.pop();
                self.substitution_closed_at = Some(self.pos);
            }
            '}' if self.top() == Some(Marker::Brace) => {
                self.stack.pop();
            }
            '<' if self.next_char() == Some('<') && self.stack.is_empty() => {
                self.as_is = 1;
                // `<<<` is a here-string, not a here-document.
                if self.next_chars(2) != ['<', '<'] {
                    self.open_heredoc();
                }
            }
            _ => {}
        }
    }

    fn toggle_quote(&mut self, quote: Marker) {
        let other = match quote {
            Marker::SingleQuote => Marker::DoubleQuote,
            _ => Marker::SingleQuote,
        };
        match self.top() {
            Some(top) if top == quote => {
                self.stack.pop();
            }
            Some(top) if top == other => {}
            _ => self.push(quote, self.pos),
        }
    }

    fn open_heredoc(&mut self) {
        let rest: String = self.line_from(self.pos + 2);
        self.terminator = capture_terminator(&rest);
        self.in_heredoc = true;
        self.heredoc_opened_at = self.pos;
        trace!(
            "here-document `{}` opened at offset {}",
            self.terminator, self.pos
        );
    }

    fn push(&mut self, marker: Marker, opened_at: usize) {
        self.stack.push(Frame { marker, opened_at });
    }

    /// A `#` here starts a new word: nothing before it, or an unescaped
    /// blank, newline or metacharacter. The `)` of a substitution is part of
    /// the word it closes.
    fn at_word_boundary(&self) -> bool {
        let Some(index) = self.pos.checked_sub(1) else {
            return true;
        };
        let Some(prev) = self.char_at(index) else {
            return true;
        };
        matches!(prev, '\n' | '\t' | ' ' | ';' | '|' | '&' | '<' | '>' | '(' | ')')
            && !self.is_escaped_at(index)
            && self.substitution_closed_at != Some(index)
    }

    fn check_balanced(&self) -> Result<(), SyntaxError> {
        if let Some(frame) = self.stack.last() {
            return Err(SyntaxError::UnterminatedContext {
                marker: frame.marker,
                line: self.line_of(frame.opened_at),
                delimiter: None,
            });
        }
        if self.in_heredoc && !is_terminator_line(&self.line_before(), &self.terminator) {
            return Err(SyntaxError::UnterminatedContext {
                marker: Marker::HereDoc,
                line: self.line_of(self.heredoc_opened_at),
                delimiter: Some(self.terminator.clone()),
            });
        }
        Ok(())
    }

    fn line_of(&self, offset: usize) -> usize {
        1 + self.chars[..offset.min(self.chars.len())]
            .iter()
            .filter(|&&c| c == '\n')
            .count()
    }

    fn line_from(&self, start: usize) -> String {
        self.chars
            .iter()
            .skip(start)
            .take_while(|&&c| c != '\n')
            .collect()
    }

    // ── Lookahead / lookbehind ──

    /// Offset of the current character.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Character at an arbitrary offset.
    pub fn char_at(&self, index: usize) -> Option<char> {
        self.chars.get(index).copied()
    }

    pub fn prev_char(&self) -> Option<char> {
        self.pos.checked_sub(1).and_then(|i| self.char_at(i))
    }

    pub fn next_char(&self) -> Option<char> {
        self.char_at(self.pos + 1)
    }

    /// Up to `n` characters immediately before the current one.
    pub fn prev_chars(&self, n: usize) -> &[char] {
        &self.chars[self.pos.saturating_sub(n)..self.pos]
    }

    /// Up to `n` characters immediately after the current one.
    pub fn next_chars(&self, n: usize) -> &[char] {
        let start = (self.pos + 1).min(self.chars.len());
        let end = (self.pos + 1 + n).min(self.chars.len());
        &self.chars[start..end]
    }

    /// Previous character, unless a backslash escapes it.
    pub fn prev_unescaped(&self) -> Option<char> {
        let index = self.pos.checked_sub(1)?;
        if self.is_escaped_at(index) {
            None
        } else {
            self.char_at(index)
        }
    }

    /// Contiguous alphabetic run ending right before the current character.
    pub fn prev_word(&self) -> String {
        let start = self.chars[..self.pos]
            .iter()
            .rposition(|c| !c.is_alphabetic())
            .map_or(0, |i| i + 1);
        self.chars[start..self.pos].iter().collect()
    }

    /// Contiguous alphabetic run starting right after the current character.
    pub fn next_word(&self) -> String {
        self.chars
            .iter()
            .skip(self.pos + 1)
            .take_while(|c| c.is_alphabetic())
            .collect()
    }

    /// Text of the current physical line before the current character.
    pub fn line_before(&self) -> String {
        let end = self.pos.min(self.chars.len());
        let start = self.chars[..end]
            .iter()
            .rposition(|&c| c == '\n')
            .map_or(0, |i| i + 1);
        self.chars[start..end].iter().collect()
    }

    /// Text of the current physical line after the current character.
    pub fn line_after(&self) -> String {
        self.line_from(self.pos + 1)
    }

    /// Whether the character at `index` follows an odd run of backslashes.
    pub fn is_escaped_at(&self, index: usize) -> bool {
        let run = self.chars[..index.min(self.chars.len())]
            .iter()
            .rev()
            .take_while(|&&c| c == '\\')
            .count();
        run % 2 == 1
    }

    // ── Context queries ──

    /// The current character is escaped; at a backslash, that backslash
    /// escapes the next character.
    pub fn is_escaped(&self) -> bool {
        self.escaped
    }

    pub fn top(&self) -> Option<Marker> {
        self.stack.last().map(|f| f.marker)
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn in_single_quote(&self) -> bool {
        self.top() == Some(Marker::SingleQuote)
    }

    pub fn in_double_quote(&self) -> bool {
        self.top() == Some(Marker::DoubleQuote)
    }

    /// Inside a single- or double-quoted string.
    pub fn in_string(&self) -> bool {
        self.in_single_quote() || self.in_double_quote()
    }

    /// Inside any string, expansion or substitution.
    pub fn in_expansion(&self) -> bool {
        !self.stack.is_empty()
    }

    pub fn in_comment(&self) -> bool {
        self.in_comment
    }

    pub fn in_heredoc(&self) -> bool {
        self.in_heredoc
    }

    pub fn in_string_comment_or_heredoc(&self) -> bool {
        self.in_string() || self.in_comment || self.in_heredoc
    }

    /// Inside any string, expansion, substitution or here-document.
    pub fn is_protected(&self) -> bool {
        self.in_expansion() || self.in_heredoc
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            top: self.top(),
            depth: self.depth(),
            in_comment: self.in_comment,
            in_heredoc: self.in_heredoc,
            escaped: self.escaped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scan `source` to the end, collecting the snapshot for every character.
    fn snapshots(source: &str) -> Vec<(char, Snapshot)> {
        let mut scanner = Scanner::new(source);
        let mut out = Vec::new();
        while let Some(ch) = scanner.advance().unwrap() {
            out.push((ch, scanner.snapshot()));
        }
        out
    }

    /// Characters reported inside any protected region, as a string.
    fn protected_text(source: &str) -> String {
        snapshots(source)
            .into_iter()
            .filter(|(_, s)| s.is_protected())
            .map(|(c, _)| c)
            .collect()
    }

    fn comment_text(source: &str) -> String {
        snapshots(source)
            .into_iter()
            .filter(|(_, s)| s.in_comment)
            .map(|(c, _)| c)
            .collect()
    }

    #[test]
    fn plain_text_is_unprotected() {
        assert_eq!(protected_text("echo hello world"), "");
    }

    #[test]
    fn double_quotes_include_delimiters_except_closing() {
        // The closing quote pops the stack before it is exposed.
        assert_eq!(protected_text("echo \"a b\" c"), "\"a b");
    }

    #[test]
    fn single_quote_inside_double_is_literal() {
        let snaps = snapshots("\"it's\"");
        assert!(snaps[3].1.top == Some(Marker::DoubleQuote));
        assert_eq!(snaps[5].1.depth, 0);
    }

    #[test]
    fn double_quote_inside_single_is_literal() {
        let snaps = snapshots("'say \"hi'");
        assert_eq!(snaps[5].1.top, Some(Marker::SingleQuote));
        assert_eq!(snaps.last().unwrap().1.depth, 0);
    }

    #[test]
    fn escaped_quote_is_literal() {
        let snaps = snapshots("echo \\\"x");
        assert!(snaps.iter().all(|(_, s)| s.depth == 0));
    }

    #[test]
    fn backslash_does_not_escape_closing_single_quote() {
        let snaps = snapshots("'a\\' b");
        assert_eq!(snaps[3].1.depth, 0);
        assert_eq!(snaps[5].1.depth, 0);
    }

    #[test]
    fn double_backslash_does_not_escape() {
        let snaps = snapshots("\\\\\"x\"");
        assert_eq!(snaps[2].1.top, Some(Marker::DoubleQuote));
        assert_eq!(snaps[4].1.depth, 0);
    }

    #[test]
    fn command_substitution_nesting() {
        let snaps = snapshots("$(a $(b) c)");
        let depths: Vec<usize> = snaps.iter().map(|(_, s)| s.depth).collect();
        assert_eq!(depths, vec![1, 1, 1, 1, 2, 2, 2, 1, 1, 1, 0]);
    }

    #[test]
    fn arithmetic_expansion_balances() {
        let snaps = snapshots("$((1 + (2)))");
        assert_eq!(snaps.last().unwrap().1.depth, 0);
        assert_eq!(snaps[2].1.depth, 2);
    }

    #[test]
    fn parameter_expansion_with_braces() {
        let snaps = snapshots("${a:-{b}}x");
        assert_eq!(snaps[1].1.top, Some(Marker::Brace));
        assert_eq!(snaps.last().unwrap().1.depth, 0);
    }

    #[test]
    fn process_substitution_is_tracked() {
        assert_eq!(protected_text("diff <(ls a) >(wc)"), "<(ls a>(wc");
        assert_eq!(protected_text("echo \"<(x)\""), "\"<(x)");
    }

    #[test]
    fn bare_parens_are_not_tracked() {
        assert_eq!(protected_text("(cd /tmp && ls)"), "");
        assert_eq!(protected_text("f() { echo; }"), "");
    }

    #[test]
    fn backticks_toggle() {
        assert_eq!(protected_text("a `b c` d"), "`b c");
    }

    #[test]
    fn substitution_inside_backticks() {
        let snaps = snapshots("x=`echo $(echo a)`");
        let depths: Vec<usize> = snaps.iter().map(|(_, s)| s.depth).collect();
        assert_eq!(depths, vec![0, 0, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 2, 2, 1, 0]);
        assert_eq!(snaps[9].1.top, Some(Marker::Paren));
    }

    #[test]
    fn backticks_inside_substitution() {
        let snaps = snapshots("$(echo `date`)");
        assert_eq!(snaps[7].1.top, Some(Marker::Backtick));
        assert_eq!(snaps[7].1.depth, 2);
        assert_eq!(snaps.last().unwrap().1.depth, 0);
    }

    #[test]
    fn arithmetic_command_is_protected() {
        let src = "(( x = 1 << 2 ))\necho $x";
        assert_eq!(protected_text(src), "(( x = 1 << 2 ");
        assert!(snapshots(src).iter().all(|(_, s)| !s.in_heredoc));
    }

    #[test]
    fn arithmetic_for_loop_is_protected() {
        let src = "for ((i = 0; i < 1 << 2; i++)); do :; done";
        assert_eq!(protected_text(src), "((i = 0; i < 1 << 2; i++");
    }

    #[test]
    fn spaced_parens_are_subshells() {
        assert_eq!(protected_text("( (cd x) )"), "");
    }

    #[test]
    fn substitution_inside_double_quotes() {
        let snaps = snapshots("\"$(echo \")\")\"");
        assert_eq!(snaps[3].1.top, Some(Marker::Paren));
        assert_eq!(snaps[8].1.top, Some(Marker::DoubleQuote));
        assert_eq!(snaps.last().unwrap().1.depth, 0);
    }

    #[test]
    fn comment_at_start_of_input() {
        assert_eq!(comment_text("#!/bin/bash\necho"), "#!/bin/bash");
    }

    #[test]
    fn comment_after_space_ends_before_newline() {
        assert_eq!(comment_text("echo hi # note\nls"), "# note");
    }

    #[test]
    fn comment_after_semicolon() {
        assert_eq!(comment_text("a;#x"), "#x");
    }

    #[test]
    fn hash_inside_word_is_not_comment() {
        assert_eq!(comment_text("echo a#b ${#arr[@]}"), "");
    }

    #[test]
    fn hash_after_operator_starts_comment() {
        assert_eq!(comment_text("ls|#c\nwc"), "#c");
        assert_eq!(comment_text("(ls)#c\n"), "#c");
    }

    #[test]
    fn hash_after_escaped_separator_is_a_word() {
        assert_eq!(comment_text("echo \\;#c"), "");
        assert_eq!(comment_text("echo a\\ #c"), "");
        assert_eq!(comment_text("echo $(ls)#c"), "");
    }

    #[test]
    fn hash_inside_string_is_not_comment() {
        assert_eq!(comment_text("echo \"# no\" '# no'"), "");
    }

    #[test]
    fn quotes_in_comment_are_ignored() {
        let snaps = snapshots("# don't\necho");
        assert!(snaps.iter().all(|(_, s)| s.depth == 0));
    }

    #[test]
    fn heredoc_body_is_protected() {
        let src = "cat <<EOF\n# not a comment\nEOF\necho";
        assert_eq!(protected_text(src), "<<EOF\n# not a comment\nEOF\n");
        assert_eq!(comment_text(src), "");
    }

    #[test]
    fn heredoc_strip_tabs_and_quoted_word() {
        let src = "cat <<-'END'\n\t$x\n\tEND\nls";
        assert_eq!(protected_text(src), "<<-'END'\n\t$x\n\tEND\n");
    }

    #[test]
    fn heredoc_with_trailing_pipeline() {
        let src = "cat <<EOF | tr a b\nabc\nEOF\nls";
        let snaps = snapshots(src);
        assert!(!snaps.last().unwrap().1.in_heredoc);
    }

    #[test]
    fn here_string_is_not_heredoc() {
        assert_eq!(protected_text("cat <<< word\necho"), "");
    }

    #[test]
    fn shift_inside_arithmetic_is_not_heredoc() {
        assert_eq!(protected_text("echo $((1<<2))"), "$((1<<2)");
    }

    #[test]
    fn heredoc_terminated_at_end_of_input() {
        let mut scanner = Scanner::new("cat <<EOF\nbody\nEOF");
        while scanner.advance().unwrap().is_some() {}
    }

    #[test]
    fn unterminated_double_quote() {
        let mut scanner = Scanner::new("echo\n\"unterminated");
        let err = loop {
            match scanner.advance() {
                Ok(Some(_)) => {}
                Ok(None) => panic!("expected error"),
                Err(e) => break e,
            }
        };
        assert_eq!(
            err,
            SyntaxError::UnterminatedContext {
                marker: Marker::DoubleQuote,
                line: 2,
                delimiter: None,
            }
        );
    }

    #[test]
    fn unterminated_substitution() {
        let mut scanner = Scanner::new("x=$(ls");
        let err = loop {
            if let Err(e) = scanner.advance() {
                break e;
            }
        };
        assert!(matches!(
            err,
            SyntaxError::UnterminatedContext {
                marker: Marker::Paren,
                ..
            }
        ));
    }

    #[test]
    fn unterminated_heredoc_names_its_terminator() {
        let err = SyntaxError::UnterminatedContext {
            marker: Marker::HereDoc,
            line: 4,
            delimiter: Some("END".into()),
        };
        assert_eq!(
            err.to_string(),
            "unterminated here-document opened on line 4, expected a `END` line"
        );
    }

    #[test]
    fn unterminated_heredoc() {
        let mut scanner = Scanner::new("cat <<EOF\nbody\n");
        let err = loop {
            if let Err(e) = scanner.advance() {
                break e;
            }
        };
        assert_eq!(
            err,
            SyntaxError::UnterminatedContext {
                marker: Marker::HereDoc,
                line: 1,
                delimiter: Some("EOF".into()),
            }
        );
    }

    #[test]
    fn lookaround_queries() {
        let mut scanner = Scanner::new("if true\nthen x");
        while let Some(ch) = scanner.advance().unwrap() {
            if ch == '\n' {
                break;
            }
        }
        assert_eq!(scanner.prev_word(), "true");
        assert_eq!(scanner.next_word(), "then");
        assert_eq!(scanner.prev_chars(2), ['u', 'e']);
        assert_eq!(scanner.next_chars(3), ['t', 'h', 'e']);
        assert_eq!(scanner.line_before(), "if true");
        assert_eq!(scanner.line_after(), "then x");
    }

    #[test]
    fn lookaround_clamps_at_edges() {
        let mut scanner = Scanner::new("ab");
        scanner.advance().unwrap();
        assert_eq!(scanner.prev_char(), None);
        assert!(scanner.prev_chars(5).is_empty());
        assert_eq!(scanner.next_chars(5), ['b']);
        scanner.advance().unwrap();
        assert_eq!(scanner.next_char(), None);
        assert!(scanner.next_chars(2).is_empty());
        assert_eq!(scanner.advance().unwrap(), None);
    }

    #[test]
    fn escape_state_tracks_backslash_runs() {
        let mut scanner = Scanner::new("\\\\\\ x");
        let mut states = Vec::new();
        while scanner.advance().unwrap().is_some() {
            states.push(scanner.is_escaped());
        }
        assert_eq!(states, vec![true, false, true, true, false]);
        assert!(scanner.is_escaped_at(3));
        assert!(!scanner.is_escaped_at(2));
    }

    #[test]
    fn skip_next_drops_line_continuation() {
        let mut scanner = Scanner::new("a\\\nb");
        let mut seen = String::new();
        while let Some(ch) = scanner.advance().unwrap() {
            if ch == '\\' && scanner.next_char() == Some('\n') {
                scanner.skip_next();
                continue;
            }
            seen.push(ch);
        }
        assert_eq!(seen, "ab");
    }
}
