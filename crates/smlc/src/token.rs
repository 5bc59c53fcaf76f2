//! Source reader and lexer (C1 + C2)
//!
//! Ported from a regex-driven, one-line-at-a-time scanner: each line gets a
//! trailing space appended so every terminal rule (in particular the
//! whitespace-lookahead on keywords) always has a character to look at, even
//! for the last token on a line. Block comments nest via a depth counter and
//! may span multiple lines; string and character literals may not.
//!
//! Rule priority on every match attempt, matching the original scanner:
//! BOOL -> KEYWORD -> CHAR -> STRING -> ID (alphanumeric or symbolic) ->
//! reserved punctuation -> REAL -> INT -> whitespace -> single-char error.

use crate::diagnostic::{Diagnostic, Position};

/// Characters that make up a symbolic identifier, per the grammar in
/// spec.md section 3.
const SYMBOLIC_CHARS: &str = "!%&$#+-/:<=>?@\\~`^|*";

const KEYWORDS: &[&str] = &[
    "abstype", "andalso", "and", "as", "case", "datatype", "do", "else", "end", "exception", "fn",
    "fun", "handle", "if", "infixr", "infix", "in", "let", "local", "nonfix", "of", "op", "open",
    "orelse", "raise", "rec", "then", "type", "val", "with", "withtype", "while",
];

/// Reserved operators, longest lexeme first so a greedy match never stops
/// short (e.g. `"..."` before `"."`-shaped prefixes, `"=>"` before `"="`).
const RESERVED_OPERATORS: &[&str] = &[
    "...", "=>", "->", "(", ")", "[", "]", "{", "}", ",", ":", ";", "_", "|", "#",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Int,
    Real,
    Char,
    String,
    Bool,
    Keyword,
    Operator,
    Id,
}

/// The decoded payload of a literal token; `None` for keywords, operators,
/// and plain identifiers.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Real(f64),
    Char(char),
    String(String),
    Bool(bool),
}

/// A token with source position, immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub literal: Option<Literal>,
    pub pos: Position,
}

impl Token {
    fn new(kind: TokenKind, text: String, pos: Position) -> Self {
        Token {
            kind,
            text,
            literal: None,
            pos,
        }
    }

    fn with_literal(kind: TokenKind, text: String, pos: Position, literal: Literal) -> Self {
        Token {
            kind,
            text,
            literal: Some(literal),
            pos,
        }
    }

    pub fn is_operator(&self, lexeme: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == lexeme
    }

    pub fn is_keyword(&self, lexeme: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text == lexeme
    }
}

pub struct Lexer<'a> {
    lines: Vec<&'a str>,
    next_line: usize,
    chars: Vec<char>,
    col: usize,
    row: usize,
    comment_depth: usize,
    /// Set once a string/char literal ran off the end of a line unclosed;
    /// surfaced as a diagnostic on the next `next_token` call.
    unclosed_literal: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            lines: source.split('\n').collect(),
            next_line: 0,
            chars: Vec::new(),
            col: 0,
            row: 0,
            comment_depth: 0,
            unclosed_literal: false,
        }
    }

    fn load_line(&mut self) -> bool {
        if self.next_line >= self.lines.len() {
            return false;
        }
        let mut chars: Vec<char> = self.lines[self.next_line].chars().collect();
        chars.push(' ');
        self.chars = chars;
        self.row = self.next_line;
        self.col = 0;
        self.next_line += 1;
        true
    }

    fn remaining(&self) -> &[char] {
        &self.chars[self.col.min(self.chars.len())..]
    }

    /// Text not yet consumed: the rest of the current line (minus the
    /// artificial trailing space [`Lexer::load_line`] appends) plus every
    /// line not yet loaded, rejoined with newlines. Lets a caller that
    /// stopped after one complete item recover what is left of a larger
    /// buffer without re-lexing it from the start.
    pub(crate) fn remaining_source(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if self.col < self.chars.len() {
            let tail: String = self.chars[self.col..].iter().collect();
            parts.push(tail.trim_end().to_string());
        }
        parts.extend(self.lines[self.next_line..].iter().map(|s| s.to_string()));
        parts.join("\n")
    }

    fn pos(&self) -> Position {
        Position::new(self.row, self.col)
    }

    /// Consume characters (spanning lines if needed) until the comment depth
    /// returns to zero or input is exhausted.
    fn skip_comment(&mut self) -> bool {
        loop {
            if self.col >= self.chars.len() {
                if !self.load_line() {
                    return false;
                }
                continue;
            }
            let rest = self.remaining();
            if starts_with(rest, "(*") {
                self.comment_depth += 1;
                self.col += 2;
            } else if starts_with(rest, "*)") {
                self.comment_depth -= 1;
                self.col += 2;
                if self.comment_depth == 0 {
                    return true;
                }
            } else {
                self.col += 1;
            }
        }
    }

    /// Produce the next token, or `Ok(None)` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Token>, Diagnostic> {
        loop {
            if self.comment_depth > 0 && !self.skip_comment() {
                return Ok(None);
            }
            if self.col >= self.chars.len() {
                if !self.load_line() {
                    return Ok(None);
                }
                continue;
            }

            let rest_owned: Vec<char> = self.remaining().to_vec();
            let rest = rest_owned.as_slice();
            let start = self.pos();

            if starts_with(rest, "(*") {
                self.comment_depth = 1;
                self.col += 2;
                if !self.skip_comment() {
                    return Ok(None);
                }
                continue;
            }

            if starts_with(rest, "true") {
                self.col += 4;
                return Ok(Some(Token::with_literal(
                    TokenKind::Bool,
                    "true".to_string(),
                    start,
                    Literal::Bool(true),
                )));
            }
            if starts_with(rest, "false") {
                self.col += 5;
                return Ok(Some(Token::with_literal(
                    TokenKind::Bool,
                    "false".to_string(),
                    start,
                    Literal::Bool(false),
                )));
            }

            if let Some(kw) = match_keyword(rest) {
                self.col += kw.chars().count();
                return Ok(Some(Token::new(TokenKind::Keyword, kw.to_string(), start)));
            }

            if rest[0] == '#' && rest.get(1) == Some(&'"') {
                if let Some((text, ch, len)) = match_char_literal(rest) {
                    self.col += len;
                    return Ok(Some(Token::with_literal(
                        TokenKind::Char,
                        text,
                        start,
                        Literal::Char(ch),
                    )));
                }
                self.unclosed_literal = true;
                self.col = self.chars.len();
                return Err(Diagnostic::Syntax {
                    pos: start,
                    detail: crate::diagnostic::SyntaxDetail::Invalid(
                        "unterminated character literal".to_string(),
                    ),
                });
            }

            if rest[0] == '"' {
                if let Some((text, s, len)) = match_string_literal(rest) {
                    self.col += len;
                    return Ok(Some(Token::with_literal(
                        TokenKind::String,
                        text,
                        start,
                        Literal::String(s),
                    )));
                }
                self.unclosed_literal = true;
                self.col = self.chars.len();
                return Err(Diagnostic::Syntax {
                    pos: start,
                    detail: crate::diagnostic::SyntaxDetail::Invalid(
                        "unterminated string literal".to_string(),
                    ),
                });
            }

            if rest[0].is_ascii_alphabetic() || rest[0] == '\'' {
                let len = alpha_id_len(rest);
                let text: String = rest[..len].iter().collect();
                self.col += len;
                return Ok(Some(Token::new(TokenKind::Id, text, start)));
            }

            if SYMBOLIC_CHARS.contains(rest[0]) {
                let len = symbolic_run_len(rest);
                let text: String = rest[..len].iter().collect();
                self.col += len;
                let kind = if RESERVED_OPERATORS.contains(&text.as_str()) {
                    TokenKind::Operator
                } else {
                    TokenKind::Id
                };
                return Ok(Some(Token::new(kind, text, start)));
            }

            if let Some(op) = match_reserved_punct(rest) {
                self.col += op.chars().count();
                return Ok(Some(Token::new(TokenKind::Operator, op.to_string(), start)));
            }

            if rest[0].is_ascii_digit() {
                let (kind, text, literal, len) = match_number(rest);
                self.col += len;
                return Ok(Some(Token::with_literal(kind, text, start, literal)));
            }

            if rest[0].is_whitespace() {
                self.col += 1;
                continue;
            }

            let bad = rest[0];
            self.col += 1;
            return Err(Diagnostic::Lex { pos: start, ch: bad });
        }
    }
}

fn starts_with(rest: &[char], lit: &str) -> bool {
    let lit_chars: Vec<char> = lit.chars().collect();
    rest.len() >= lit_chars.len() && rest[..lit_chars.len()] == lit_chars[..]
}

fn match_keyword(rest: &[char]) -> Option<&'static str> {
    for kw in KEYWORDS {
        if starts_with(rest, kw) {
            let after = rest.get(kw.chars().count());
            if after.map(|c| c.is_whitespace()).unwrap_or(false) {
                return Some(kw);
            }
        }
    }
    None
}

fn alpha_id_len(rest: &[char]) -> usize {
    let mut i = 1;
    while i < rest.len() && (rest[i].is_ascii_alphanumeric() || rest[i] == '_' || rest[i] == '\'')
    {
        i += 1;
    }
    i
}

fn symbolic_run_len(rest: &[char]) -> usize {
    let mut i = 0;
    while i < rest.len() && SYMBOLIC_CHARS.contains(rest[i]) {
        i += 1;
    }
    i
}

fn match_reserved_punct(rest: &[char]) -> Option<&'static str> {
    for op in RESERVED_OPERATORS {
        if starts_with(rest, op) {
            return Some(op);
        }
    }
    None
}

/// Decode one escape-or-plain-character item starting at `rest[0]`. Returns
/// the decoded char and the number of source chars consumed.
fn match_item(rest: &[char]) -> Option<(char, usize)> {
    if rest.is_empty() {
        return None;
    }
    if rest[0] != '\\' {
        return Some((rest[0], 1));
    }
    match rest.get(1) {
        Some('a') => Some(('\u{07}', 2)),
        Some('b') => Some(('\u{08}', 2)),
        Some('n') => Some(('\n', 2)),
        Some('r') => Some(('\r', 2)),
        Some('v') => Some(('\u{0B}', 2)),
        Some('\\') => Some(('\\', 2)),
        Some('"') => Some(('"', 2)),
        Some(c) if c.is_digit(8) => {
            if rest.len() < 5 {
                return None;
            }
            let d1 = rest[1].to_digit(8)?;
            let d2 = rest[2].to_digit(8)?;
            let d3 = rest[3].to_digit(8)?;
            let val = d1 * 64 + d2 * 8 + d3;
            Some((char::from_u32(val)?, 4))
        }
        _ => None,
    }
}

fn match_char_literal(rest: &[char]) -> Option<(String, char, usize)> {
    // rest[0]='#', rest[1]='"'
    let (ch, item_len) = match_item(&rest[2..])?;
    let close = 2 + item_len;
    if rest.get(close) != Some(&'"') {
        return None;
    }
    let text: String = rest[..=close].iter().collect();
    Some((text, ch, close + 1))
}

fn match_string_literal(rest: &[char]) -> Option<(String, String, usize)> {
    // rest[0]='"'
    let mut i = 1;
    let mut decoded = String::new();
    loop {
        if i >= rest.len() {
            return None;
        }
        if rest[i] == '"' {
            let text: String = rest[..=i].iter().collect();
            return Some((text, decoded, i + 1));
        }
        let (ch, len) = match_item(&rest[i..])?;
        decoded.push(ch);
        i += len;
    }
}

fn match_number(rest: &[char]) -> (TokenKind, String, Literal, usize) {
    // Hex int: 0[xX][0-9a-fA-F]+
    if rest[0] == '0' && matches!(rest.get(1), Some('x') | Some('X')) {
        let mut i = 2;
        while i < rest.len() && rest[i].is_ascii_hexdigit() {
            i += 1;
        }
        if i > 2 {
            let text: String = rest[..i].iter().collect();
            let value = i64::from_str_radix(&text[2..], 16).unwrap_or(0);
            return (TokenKind::Int, text, Literal::Int(value), i);
        }
    }

    let mut i = 0;
    while i < rest.len() && rest[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = i;

    // d+.d+[eE]~?d+  |  d+[eE]~?d+  |  d+.d+
    let mut j = i;
    let mut is_real = false;
    let mut has_frac = false;
    if rest.get(j) == Some(&'.') && rest.get(j + 1).map(|c| c.is_ascii_digit()).unwrap_or(false) {
        has_frac = true;
        j += 1;
        while j < rest.len() && rest[j].is_ascii_digit() {
            j += 1;
        }
        is_real = true;
    }
    if matches!(rest.get(j), Some('e') | Some('E')) {
        let mut k = j + 1;
        if rest.get(k) == Some(&'~') {
            k += 1;
        }
        let exp_start = k;
        while k < rest.len() && rest[k].is_ascii_digit() {
            k += 1;
        }
        if k > exp_start {
            j = k;
            is_real = true;
        }
    }

    if is_real {
        let text: String = rest[..j].iter().collect();
        let normalized = text.replacen('~', "-", 1);
        let value: f64 = normalized.parse().unwrap_or(0.0);
        return (TokenKind::Real, text, Literal::Real(value), j);
    }

    let _ = has_frac;
    let text: String = rest[..int_digits].iter().collect();
    let value: i64 = text.parse().unwrap_or(0);
    (TokenKind::Int, text, Literal::Int(value), int_digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(src: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(src);
        let mut tokens = Vec::new();
        while let Some(tok) = lexer.next_token().unwrap() {
            tokens.push(tok);
        }
        tokens
    }

    #[test]
    fn lexes_simple_val_binding() {
        let tokens = lex_all("val i : int = 42;");
        let kinds: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(kinds, vec!["val", "i", ":", "int", "=", "42", ";"]);
    }

    #[test]
    fn lexes_nested_block_comments() {
        let tokens = lex_all("(* outer (* inner *) still-comment *) 1;");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text, "1");
        assert_eq!(tokens[1].text, ";");
    }

    #[test]
    fn decodes_string_escapes() {
        let tokens = lex_all(r#""a\nb";"#);
        assert_eq!(
            tokens[0].literal,
            Some(Literal::String("a\nb".to_string()))
        );
    }

    #[test]
    fn decodes_octal_char_escape() {
        let tokens = lex_all(r#"#"\101";"#);
        assert_eq!(tokens[0].literal, Some(Literal::Char('A')));
    }

    #[test]
    fn reserved_operator_forces_punctuation_kind() {
        let tokens = lex_all("(a, b) => c;");
        assert_eq!(tokens[0].kind, TokenKind::Operator);
        assert_eq!(tokens[0].text, "(");
        let arrow = tokens.iter().find(|t| t.text == "=>").unwrap();
        assert_eq!(arrow.kind, TokenKind::Operator);
    }

    #[test]
    fn symbolic_identifier_stays_id_unless_reserved() {
        let tokens = lex_all("x := y;");
        let walrus = tokens.iter().find(|t| t.text == ":=").unwrap();
        assert_eq!(walrus.kind, TokenKind::Id);
    }

    #[test]
    fn real_literal_with_negative_exponent() {
        let tokens = lex_all("1.5e~3;");
        match tokens[0].literal {
            Some(Literal::Real(v)) => assert!((v - 1.5e-3).abs() < 1e-12),
            _ => panic!("expected real literal"),
        }
    }

    #[test]
    fn hex_int_literal() {
        let tokens = lex_all("0xFF;");
        assert_eq!(tokens[0].literal, Some(Literal::Int(255)));
    }

    #[test]
    fn remaining_source_recovers_text_after_partial_consumption() {
        let mut lexer = Lexer::new("val x = 1;\nval y = 2;");
        for _ in 0..5 {
            lexer.next_token().unwrap();
        }
        assert_eq!(lexer.remaining_source(), ";\nval y = 2;");
    }

    #[test]
    fn remaining_source_is_whole_input_before_any_token_is_read() {
        let lexer = Lexer::new("val x = 1;");
        assert_eq!(lexer.remaining_source(), "val x = 1;");
    }
}
