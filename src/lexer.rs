//! Lexer for the ES5 source subset.
//!
//! Converts source text into a stream of tokens. The lexer resolves the
//! regex-literal/division ambiguity itself by tracking the previous
//! significant token, and records for every token whether a line terminator
//! preceded it (semicolon insertion needs that).

use std::iter::Peekable;
use std::str::CharIndices;

use crate::error::EngineError;
use crate::value::JsStr;

/// Source span information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }
}

impl Default for Span {
    fn default() -> Self {
        Self {
            start: 0,
            end: 0,
            line: 1,
            column: 1,
        }
    }
}

/// Token types for the ES5 subset.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(f64),
    String(JsStr),
    RegExp(JsStr, JsStr), // (pattern, flags)
    True,
    False,
    Null,

    // Identifiers & keywords
    Identifier(JsStr),
    Var,
    Function,
    Return,
    If,
    Else,
    For,
    While,
    Do,
    Break,
    Continue,
    Switch,
    Case,
    Default,
    Try,
    Catch,
    Finally,
    Throw,
    New,
    This,
    Typeof,
    Instanceof,
    In,
    Void,
    Delete,
    Debugger,
    With,

    // Operators
    Plus,            // +
    Minus,           // -
    Star,            // *
    Slash,           // /
    Percent,         // %
    PlusPlus,        // ++
    MinusMinus,      // --
    Eq,              // =
    EqEq,            // ==
    EqEqEq,          // ===
    NotEq,           // !=
    NotEqEq,         // !==
    Lt,              // <
    Gt,              // >
    LtEq,            // <=
    GtEq,            // >=
    AndAnd,          // &&
    OrOr,            // ||
    Not,             // !
    Amp,             // &
    Pipe,            // |
    Caret,           // ^
    Tilde,           // ~
    Shl,             // <<
    Shr,             // >>
    UShr,            // >>>
    PlusEq,          // +=
    MinusEq,         // -=
    StarEq,          // *=
    SlashEq,         // /=
    PercentEq,       // %=
    ShlEq,           // <<=
    ShrEq,           // >>=
    UShrEq,          // >>>=
    AmpEq,           // &=
    PipeEq,          // |=
    CaretEq,         // ^=
    Question,        // ?
    Colon,           // :
    Semicolon,       // ;
    Comma,           // ,
    Dot,             // .
    LeftParen,       // (
    RightParen,      // )
    LeftBrace,       // {
    RightBrace,      // }
    LeftBracket,     // [
    RightBracket,    // ]

    Eof,
}

/// One token with its position.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// A line terminator appeared between the previous token and this one.
    pub newline_before: bool,
}

impl Token {
    pub fn eof(offset: usize, line: u32, column: u32) -> Self {
        Self {
            kind: TokenKind::Eof,
            span: Span::new(offset, offset, line, column),
            newline_before: false,
        }
    }
}

/// Lexer over a source string. `Clone` gives the parser cheap lookahead.
#[derive(Clone)]
pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: u32,
    column: u32,
    /// Kind of the last significant token; decides regex vs. division.
    prev: Option<TokenKind>,
    pending_newline: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            line: 1,
            column: 1,
            prev: None,
            pending_newline: false,
        }
    }

    pub fn next_token(&mut self) -> Result<Token, EngineError> {
        self.skip_trivia()?;
        let newline_before = std::mem::take(&mut self.pending_newline);
        let (start, line, column) = (self.offset(), self.line, self.column);

        let Some(&(_, c)) = self.chars.peek() else {
            let mut token = Token::eof(self.source.len(), line, column);
            token.newline_before = newline_before;
            return Ok(token);
        };

        let kind = if c.is_ascii_digit() || (c == '.' && self.peek_second_is_digit()) {
            self.scan_number()?
        } else if c == '"' || c == '\'' {
            self.scan_string(c)?
        } else if is_ident_start(c) {
            self.scan_identifier()
        } else if c == '/' && self.regex_allowed() {
            self.scan_regex()?
        } else {
            self.scan_operator()?
        };

        let span = Span::new(start, self.offset(), line, column);
        self.prev = Some(kind.clone());
        Ok(Token {
            kind,
            span,
            newline_before,
        })
    }

    fn offset(&mut self) -> usize {
        self.chars
            .peek()
            .map(|&(i, _)| i)
            .unwrap_or(self.source.len())
    }

    fn bump(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn peek_second_is_digit(&self) -> bool {
        let mut clone = self.chars.clone();
        clone.next();
        matches!(clone.next(), Some((_, c)) if c.is_ascii_digit())
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn skip_trivia(&mut self) -> Result<(), EngineError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    if c == '\n' || c == '\r' || c == '\u{2028}' || c == '\u{2029}' {
                        self.pending_newline = true;
                    }
                    self.bump();
                }
                Some('/') => {
                    let mut clone = self.chars.clone();
                    clone.next();
                    match clone.next() {
                        Some((_, '/')) => {
                            while let Some(c) = self.peek() {
                                if c == '\n' {
                                    break;
                                }
                                self.bump();
                            }
                        }
                        Some((_, '*')) => {
                            self.bump();
                            self.bump();
                            let (line, column) = (self.line, self.column);
                            loop {
                                match self.bump() {
                                    Some('*') if self.peek() == Some('/') => {
                                        self.bump();
                                        break;
                                    }
                                    Some('\n') => self.pending_newline = true,
                                    Some(_) => {}
                                    None => {
                                        return Err(self.error("unterminated comment", line, column))
                                    }
                                }
                            }
                        }
                        _ => return Ok(()),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// A `/` starts a regex literal unless the previous token could end an
    /// expression.
    fn regex_allowed(&self) -> bool {
        !matches!(
            self.prev,
            Some(
                TokenKind::Identifier(_)
                    | TokenKind::Number(_)
                    | TokenKind::String(_)
                    | TokenKind::RegExp(..)
                    | TokenKind::True
                    | TokenKind::False
                    | TokenKind::Null
                    | TokenKind::This
                    | TokenKind::RightParen
                    | TokenKind::RightBracket
                    | TokenKind::RightBrace
                    | TokenKind::PlusPlus
                    | TokenKind::MinusMinus
            )
        )
    }

    fn scan_number(&mut self) -> Result<TokenKind, EngineError> {
        let start = self.offset();
        let (line, column) = (self.line, self.column);
        if self.peek() == Some('0') {
            let mut clone = self.chars.clone();
            clone.next();
            if matches!(clone.next(), Some((_, 'x' | 'X'))) {
                self.bump();
                self.bump();
                let hex_start = self.offset();
                while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
                    self.bump();
                }
                let digits = &self.source[hex_start..self.offset()];
                if digits.is_empty() {
                    return Err(self.error("missing hexadecimal digits", line, column));
                }
                let value = u64::from_str_radix(digits, 16)
                    .map(|v| v as f64)
                    .unwrap_or(f64::INFINITY);
                return Ok(TokenKind::Number(value));
            }
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek() == Some('.') {
            self.bump();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.bump();
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let mut clone = self.chars.clone();
            clone.next();
            let next = clone.next().map(|(_, c)| c);
            let second = clone.next().map(|(_, c)| c);
            let has_exponent = match next {
                Some(c) if c.is_ascii_digit() => true,
                Some('+' | '-') => matches!(second, Some(c) if c.is_ascii_digit()),
                _ => false,
            };
            if has_exponent {
                self.bump();
                if matches!(self.peek(), Some('+' | '-')) {
                    self.bump();
                }
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.bump();
                }
            }
        }
        let text = &self.source[start..self.offset()];
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| self.error(format!("invalid number literal '{text}'"), line, column))
    }

    fn scan_string(&mut self, quote: char) -> Result<TokenKind, EngineError> {
        let (line, column) = (self.line, self.column);
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(self.error("unterminated string literal", line, column))
                }
                Some(c) if c == quote => break,
                Some('\\') => match self.bump() {
                    None => return Err(self.error("unterminated string literal", line, column)),
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('b') => value.push('\u{8}'),
                    Some('f') => value.push('\u{c}'),
                    Some('v') => value.push('\u{b}'),
                    Some('0') => value.push('\0'),
                    Some('x') => {
                        let code = self.scan_hex_escape(2, line, column)?;
                        value.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                    }
                    Some('u') => {
                        let code = self.scan_hex_escape(4, line, column)?;
                        value.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                    }
                    // Escaped line terminator: line continuation.
                    Some('\n') => {}
                    Some(other) => value.push(other),
                },
                Some(c) => value.push(c),
            }
        }
        Ok(TokenKind::String(JsStr::from(value)))
    }

    fn scan_hex_escape(&mut self, len: usize, line: u32, column: u32) -> Result<u32, EngineError> {
        let mut code = 0u32;
        for _ in 0..len {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error("invalid escape sequence", line, column))?;
            code = code * 16 + digit;
        }
        Ok(code)
    }

    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.offset();
        while matches!(self.peek(), Some(c) if is_ident_continue(c)) {
            self.bump();
        }
        let text = &self.source[start..self.offset()];
        keyword(text).unwrap_or_else(|| TokenKind::Identifier(JsStr::from(text)))
    }

    fn scan_regex(&mut self) -> Result<TokenKind, EngineError> {
        let (line, column) = (self.line, self.column);
        self.bump(); // opening slash
        let body_start = self.offset();
        let mut in_class = false;
        loop {
            match self.peek() {
                None | Some('\n') => {
                    return Err(self.error("unterminated regular expression", line, column))
                }
                Some('\\') => {
                    self.bump();
                    self.bump();
                }
                Some('[') => {
                    in_class = true;
                    self.bump();
                }
                Some(']') => {
                    in_class = false;
                    self.bump();
                }
                Some('/') if !in_class => break,
                Some(_) => {
                    self.bump();
                }
            }
        }
        let pattern = JsStr::from(&self.source[body_start..self.offset()]);
        self.bump(); // closing slash
        let flags_start = self.offset();
        while matches!(self.peek(), Some(c) if is_ident_continue(c)) {
            self.bump();
        }
        let flags = JsStr::from(&self.source[flags_start..self.offset()]);
        Ok(TokenKind::RegExp(pattern, flags))
    }

    fn scan_operator(&mut self) -> Result<TokenKind, EngineError> {
        let (line, column) = (self.line, self.column);
        let c = self.bump().expect("caller checked for a character");
        let kind = match c {
            '+' => {
                if self.eat('+') {
                    TokenKind::PlusPlus
                } else if self.eat('=') {
                    TokenKind::PlusEq
                } else {
                    TokenKind::Plus
                }
            }
            '-' => {
                if self.eat('-') {
                    TokenKind::MinusMinus
                } else if self.eat('=') {
                    TokenKind::MinusEq
                } else {
                    TokenKind::Minus
                }
            }
            '*' => {
                if self.eat('=') {
                    TokenKind::StarEq
                } else {
                    TokenKind::Star
                }
            }
            '/' => {
                if self.eat('=') {
                    TokenKind::SlashEq
                } else {
                    TokenKind::Slash
                }
            }
            '%' => {
                if self.eat('=') {
                    TokenKind::PercentEq
                } else {
                    TokenKind::Percent
                }
            }
            '=' => {
                if self.eat('=') {
                    if self.eat('=') {
                        TokenKind::EqEqEq
                    } else {
                        TokenKind::EqEq
                    }
                } else {
                    TokenKind::Eq
                }
            }
            '!' => {
                if self.eat('=') {
                    if self.eat('=') {
                        TokenKind::NotEqEq
                    } else {
                        TokenKind::NotEq
                    }
                } else {
                    TokenKind::Not
                }
            }
            '<' => {
                if self.eat('<') {
                    if self.eat('=') {
                        TokenKind::ShlEq
                    } else {
                        TokenKind::Shl
                    }
                } else if self.eat('=') {
                    TokenKind::LtEq
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.eat('>') {
                    if self.eat('>') {
                        if self.eat('=') {
                            TokenKind::UShrEq
                        } else {
                            TokenKind::UShr
                        }
                    } else if self.eat('=') {
                        TokenKind::ShrEq
                    } else {
                        TokenKind::Shr
                    }
                } else if self.eat('=') {
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            '&' => {
                if self.eat('&') {
                    TokenKind::AndAnd
                } else if self.eat('=') {
                    TokenKind::AmpEq
                } else {
                    TokenKind::Amp
                }
            }
            '|' => {
                if self.eat('|') {
                    TokenKind::OrOr
                } else if self.eat('=') {
                    TokenKind::PipeEq
                } else {
                    TokenKind::Pipe
                }
            }
            '^' => {
                if self.eat('=') {
                    TokenKind::CaretEq
                } else {
                    TokenKind::Caret
                }
            }
            '~' => TokenKind::Tilde,
            '?' => TokenKind::Question,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            other => {
                return Err(self.error(format!("unexpected character '{other}'"), line, column))
            }
        };
        Ok(kind)
    }

    fn error(&self, message: impl Into<String>, line: u32, column: u32) -> EngineError {
        EngineError::Syntax {
            message: message.into(),
            line,
            column,
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn keyword(text: &str) -> Option<TokenKind> {
    Some(match text {
        "var" => TokenKind::Var,
        "function" => TokenKind::Function,
        "return" => TokenKind::Return,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "for" => TokenKind::For,
        "while" => TokenKind::While,
        "do" => TokenKind::Do,
        "break" => TokenKind::Break,
        "continue" => TokenKind::Continue,
        "switch" => TokenKind::Switch,
        "case" => TokenKind::Case,
        "default" => TokenKind::Default,
        "try" => TokenKind::Try,
        "catch" => TokenKind::Catch,
        "finally" => TokenKind::Finally,
        "throw" => TokenKind::Throw,
        "new" => TokenKind::New,
        "this" => TokenKind::This,
        "typeof" => TokenKind::Typeof,
        "instanceof" => TokenKind::Instanceof,
        "in" => TokenKind::In,
        "void" => TokenKind::Void,
        "delete" => TokenKind::Delete,
        "debugger" => TokenKind::Debugger,
        "with" => TokenKind::With,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "null" => TokenKind::Null,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(source);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token().unwrap();
            if token.kind == TokenKind::Eof {
                break;
            }
            out.push(token.kind);
        }
        out
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("42 3.14 0x1f .5 1e3"),
            vec![
                TokenKind::Number(42.0),
                TokenKind::Number(3.14),
                TokenKind::Number(31.0),
                TokenKind::Number(0.5),
                TokenKind::Number(1000.0),
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#"'a\nb' "A""#),
            vec![
                TokenKind::String(JsStr::from("a\nb")),
                TokenKind::String(JsStr::from("A")),
            ]
        );
    }

    #[test]
    fn test_regex_vs_division() {
        // After an identifier a slash is division.
        assert_eq!(
            kinds("a / b"),
            vec![
                TokenKind::Identifier(JsStr::from("a")),
                TokenKind::Slash,
                TokenKind::Identifier(JsStr::from("b")),
            ]
        );
        // At expression position it is a regex literal.
        assert_eq!(
            kinds("= /ab+c/gi"),
            vec![
                TokenKind::Eq,
                TokenKind::RegExp(JsStr::from("ab+c"), JsStr::from("gi")),
            ]
        );
    }

    #[test]
    fn test_newline_tracking() {
        let mut lexer = Lexer::new("a\nb");
        let a = lexer.next_token().unwrap();
        let b = lexer.next_token().unwrap();
        assert!(!a.newline_before);
        assert!(b.newline_before);
    }

    #[test]
    fn test_shift_operators() {
        assert_eq!(
            kinds(">> >>> >>= >>>="),
            vec![
                TokenKind::Shr,
                TokenKind::UShr,
                TokenKind::ShrEq,
                TokenKind::UShrEq,
            ]
        );
    }
}
