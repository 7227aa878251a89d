use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use crate::error::Error;

/// A token kind. Keywords are only recognized in their lowercase spelling;
/// e.g. uppercase SELECT scans as a plain identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Identifiers and literals.
    Ident,
    Number,
    String,

    // Keywords.
    And,
    Distinct,
    False,
    From,
    Is,
    Not,
    Null,
    Or,
    Select,
    True,
    Where,

    // Punctuation.
    Comma,
    Semicolon,
    Period,
    OpenParen,
    CloseParen,

    // Relational operators.
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Equal,
    NotEqual,

    // Arithmetic operators.
    Plus,
    Minus,
    Asterisk,
    Slash,

    /// The end-of-input marker, always the final token of a scan.
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ident => "identifier",
            Self::Number => "number",
            Self::String => "string",
            Self::And => "AND",
            Self::Distinct => "DISTINCT",
            Self::False => "FALSE",
            Self::From => "FROM",
            Self::Is => "IS",
            Self::Not => "NOT",
            Self::Null => "NULL",
            Self::Or => "OR",
            Self::Select => "SELECT",
            Self::True => "TRUE",
            Self::Where => "WHERE",
            Self::Comma => ",",
            Self::Semicolon => ";",
            Self::Period => ".",
            Self::OpenParen => "(",
            Self::CloseParen => ")",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Asterisk => "*",
            Self::Slash => "/",
            Self::Eof => "end of input",
        })
    }
}

/// A typed literal value carried by number and string tokens.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Number(f64),
    String(String),
}

/// A scanner token: its kind, the exact source text it covers, the literal
/// value for number and string tokens, and the 1-based source line it starts
/// on. Immutable once created.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub literal: Option<Value>,
    pub line: usize,
}

/// The keyword table, mapping reserved words to their token kinds. Built once
/// and shared read-only by all scanners. Lookup is an exact string match, so
/// only the lowercase spellings are keywords.
static KEYWORDS: LazyLock<HashMap<&'static str, TokenKind>> = LazyLock::new(|| {
    HashMap::from([
        ("and", TokenKind::And),
        ("distinct", TokenKind::Distinct),
        ("false", TokenKind::False),
        ("from", TokenKind::From),
        ("is", TokenKind::Is),
        ("not", TokenKind::Not),
        ("null", TokenKind::Null),
        ("or", TokenKind::Or),
        ("select", TokenKind::Select),
        ("true", TokenKind::True),
        ("where", TokenKind::Where),
    ])
});

/// The scanner turns a source string into tokens. It scans eagerly: scan()
/// consumes the entire input and returns the full token sequence, terminated
/// by an Eof token, along with any lexical errors encountered on the way.
/// Lexical errors never abort the scan; the offending input is skipped and
/// scanning resumes at the next character.
pub struct Scanner<'a> {
    source: &'a str,
    /// Byte offset of the start of the lexeme currently being scanned.
    start: usize,
    /// Byte offset of the read cursor.
    current: usize,
    /// The current 1-based source line, incremented on every newline consumed.
    line: usize,
    tokens: Vec<Token>,
    errors: Vec<Error>,
}

impl<'a> Scanner<'a> {
    /// Creates a new scanner for the given source string.
    pub fn new(source: &'a str) -> Self {
        Self { source, start: 0, current: 0, line: 1, tokens: Vec::new(), errors: Vec::new() }
    }

    /// Scans the entire input, returning the token sequence and any lexical
    /// errors, in the order they were encountered.
    pub fn scan(mut self) -> (Vec<Token>, Vec<Error>) {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token();
        }
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            lexeme: String::new(),
            literal: None,
            line: self.line,
        });
        (self.tokens, self.errors)
    }

    /// Scans a single token, comment, or whitespace run starting at the
    /// current lexeme start.
    fn scan_token(&mut self) {
        let Some(c) = self.advance() else { return };
        match c {
            '(' => self.emit(TokenKind::OpenParen),
            ')' => self.emit(TokenKind::CloseParen),
            ',' => self.emit(TokenKind::Comma),
            ';' => self.emit(TokenKind::Semicolon),
            '.' => self.emit(TokenKind::Period),
            '+' => self.emit(TokenKind::Plus),
            '*' => self.emit(TokenKind::Asterisk),
            '=' => self.emit(TokenKind::Equal),
            // -- starts a line comment, otherwise - is subtraction.
            '-' => match self.next_is('-') {
                true => self.skip_line_comment(),
                false => self.emit(TokenKind::Minus),
            },
            '/' => {
                if self.next_is('/') {
                    self.skip_line_comment()
                } else if self.next_is('*') {
                    self.skip_block_comment()
                } else {
                    self.emit(TokenKind::Slash)
                }
            }
            '<' => match self.next_is('=') {
                true => self.emit(TokenKind::LessThanOrEqual),
                false => self.emit(TokenKind::LessThan),
            },
            '>' => match self.next_is('=') {
                true => self.emit(TokenKind::GreaterThanOrEqual),
                false => self.emit(TokenKind::GreaterThan),
            },
            // != is the only token starting with !.
            '!' => match self.next_is('=') {
                true => self.emit(TokenKind::NotEqual),
                false => self.error("unexpected character '!'".to_string()),
            },
            '"' => self.scan_string(),
            ' ' | '\r' | '\t' => {}
            '\n' => self.line += 1,
            c if c.is_ascii_digit() => self.scan_number(),
            c if c.is_ascii_alphabetic() || c == '_' => self.scan_ident(),
            c => self.error(format!("unexpected character {c:?}")),
        }
    }

    /// Skips a // or -- comment, up to but not including the newline, which
    /// the main scan loop uses to advance the line counter.
    fn skip_line_comment(&mut self) {
        while self.peek().is_some_and(|c| c != '\n') {
            self.advance();
        }
    }

    /// Skips a /* */ comment, which may span lines. An unterminated comment is
    /// reported but treated as implicitly closed at the end of input.
    fn skip_block_comment(&mut self) {
        loop {
            match self.advance() {
                Some('*') if self.next_is('/') => return,
                Some('\n') => self.line += 1,
                Some(_) => {}
                None => {
                    self.error("unterminated block comment".to_string());
                    return;
                }
            }
        }
    }

    /// Scans a "-delimited string literal. There is no escape processing: the
    /// literal value is the raw content between the quotes. An unterminated
    /// string is reported and yields no token.
    fn scan_string(&mut self) {
        while self.peek().is_some_and(|c| c != '"') {
            if self.peek() == Some('\n') {
                self.line += 1;
            }
            self.advance();
        }
        if self.is_at_end() {
            self.error("unterminated string".to_string());
            return;
        }
        self.advance(); // the closing quote
        let content = self.source[self.start + 1..self.current - 1].to_string();
        self.emit_literal(TokenKind::String, Some(Value::String(content)));
    }

    /// Scans a number literal: an integer part, an optional fraction, and an
    /// optional exponent. The exponent (and the fraction's period) is only
    /// consumed when followed by at least one digit, so e.g. "1e" scans as the
    /// number 1 followed by the identifier e. The token's literal holds the
    /// f64 value while the lexeme preserves the original text.
    fn scan_number(&mut self) {
        while self.next_if(|c| c.is_ascii_digit()).is_some() {}

        let mut chars = self.source[self.current..].chars();
        if chars.next() == Some('.') && chars.next().is_some_and(|c| c.is_ascii_digit()) {
            self.advance(); // the period
            while self.next_if(|c| c.is_ascii_digit()).is_some() {}
        }

        let mut chars = self.source[self.current..].chars();
        if matches!(chars.next(), Some('e' | 'E')) {
            let mut next = chars.next();
            if matches!(next, Some('+' | '-')) {
                next = chars.next();
            }
            if next.is_some_and(|c| c.is_ascii_digit()) {
                self.advance(); // e or E
                if matches!(self.peek(), Some('+' | '-')) {
                    self.advance();
                }
                while self.next_if(|c| c.is_ascii_digit()).is_some() {}
            }
        }

        // The forms consumed above are all valid f64 representations.
        let value = self.source[self.start..self.current].parse().unwrap_or(f64::NAN);
        self.emit_literal(TokenKind::Number, Some(Value::Number(value)));
    }

    /// Scans an identifier or keyword.
    fn scan_ident(&mut self) {
        while self.next_if(|c| c.is_ascii_alphanumeric() || c == '_').is_some() {}
        let lexeme = &self.source[self.start..self.current];
        let kind = KEYWORDS.get(lexeme).copied().unwrap_or(TokenKind::Ident);
        self.emit(kind);
    }

    /// Emits a token covering the current lexeme.
    fn emit(&mut self, kind: TokenKind) {
        self.emit_literal(kind, None)
    }

    /// Emits a token covering the current lexeme, with a literal value.
    fn emit_literal(&mut self, kind: TokenKind, literal: Option<Value>) {
        let lexeme = self.source[self.start..self.current].to_string();
        self.tokens.push(Token { kind, lexeme, literal, line: self.line });
    }

    /// Records a lexical error on the current line. Scanning continues.
    fn error(&mut self, message: String) {
        self.errors.push(Error::parse(self.line, message));
    }

    /// Returns true once the read cursor has consumed the whole input.
    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    /// The next unconsumed character, if any.
    fn peek(&self) -> Option<char> {
        self.source[self.current..].chars().next()
    }

    /// Consumes and returns the next character, if any.
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.current += c.len_utf8();
        Some(c)
    }

    /// Consumes the next character if it is the expected one, returning true.
    fn next_is(&mut self, expected: char) -> bool {
        self.next_if(|c| c == expected).is_some()
    }

    /// Consumes and returns the next character if it matches the predicate.
    fn next_if(&mut self, predicate: impl Fn(char) -> bool) -> Option<char> {
        match self.peek() {
            Some(c) if predicate(c) => self.advance(),
            _ => None,
        }
    }
}
