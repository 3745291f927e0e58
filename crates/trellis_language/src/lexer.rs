//! Lexer for the rule surface.
//!
//! The lexer converts source text into a stream of spanned tokens.

use crate::token::{Span, Token, TokenKind};

/// Lexer for `define-prdt` source text.
pub struct Lexer<'src> {
    /// Remaining source text.
    rest: &'src str,
    /// Current byte offset in source.
    position: usize,
    /// Current line number (1-based).
    line: u32,
    /// Current column number (1-based).
    column: u32,
}

impl<'src> Lexer<'src> {
    /// Creates a new lexer for the given source.
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        Self {
            rest: source,
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Returns the next token from the source.
    pub fn next_token(&mut self) -> Token {
        self.skip_trivia();

        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;
        let span = |lexer: &Self| Span::new(start, lexer.position, start_line, start_column);

        let Some(c) = self.peek_char() else {
            return Token::new(TokenKind::Eof, span(self));
        };

        let kind = match c {
            '(' => {
                self.advance();
                TokenKind::LParen
            }
            ')' => {
                self.advance();
                TokenKind::RParen
            }
            '#' => self.scan_hash(),
            '"' => self.scan_string(),
            '$' => {
                self.advance();
                if self.peek_char() == Some('$') {
                    self.advance();
                    TokenKind::SelfAttr
                } else {
                    TokenKind::Error("expected `$$`".to_string())
                }
            }
            c if c.is_ascii_digit() => self.scan_number(false),
            '-' if self.rest[1..].chars().next().is_some_and(|c| c.is_ascii_digit()) => {
                self.advance();
                self.scan_number(true)
            }
            c if is_symbol_start(c) => self.scan_symbol(),
            c => {
                self.advance();
                TokenKind::Error(format!("unexpected character: {c}"))
            }
        };

        Token::new(kind, span(self))
    }

    /// Tokenizes all source, ending with an `Eof` token.
    #[must_use]
    pub fn tokenize_all(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    fn peek_char(&self) -> Option<char> {
        self.rest.chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            let len = c.len_utf8();
            self.rest = &self.rest[len..];
            self.position += len;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    /// Skips whitespace and `;` line comments.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => self.advance(),
                Some(';') => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    /// Scans `#t`, `#f`, and `#:option` markers.
    fn scan_hash(&mut self) -> TokenKind {
        self.advance();
        match self.peek_char() {
            Some('t') => {
                self.advance();
                TokenKind::Bool(true)
            }
            Some('f') => {
                self.advance();
                TokenKind::Bool(false)
            }
            Some(':') => {
                self.advance();
                let mut name = String::new();
                while let Some(c) = self.peek_char() {
                    if !is_symbol_continue(c) {
                        break;
                    }
                    name.push(c);
                    self.advance();
                }
                if name.is_empty() {
                    TokenKind::Error("expected an option name after `#:`".to_string())
                } else {
                    TokenKind::Option(name)
                }
            }
            _ => TokenKind::Error("expected `#t`, `#f`, or `#:option`".to_string()),
        }
    }

    fn scan_string(&mut self) -> TokenKind {
        self.advance(); // opening quote
        let mut text = String::new();
        loop {
            match self.peek_char() {
                None => return TokenKind::Error("unterminated string literal".to_string()),
                Some('"') => {
                    self.advance();
                    return TokenKind::String(text);
                }
                Some('\\') => {
                    self.advance();
                    match self.peek_char() {
                        Some('n') => text.push('\n'),
                        Some('t') => text.push('\t'),
                        Some('"') => text.push('"'),
                        Some('\\') => text.push('\\'),
                        other => {
                            return TokenKind::Error(format!(
                                "unknown escape: \\{}",
                                other.unwrap_or(' ')
                            ));
                        }
                    }
                    self.advance();
                }
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
            }
        }
    }

    /// Scans a numeric literal. A `u` suffix makes it unsigned, an `f`
    /// suffix or a decimal point makes it a float.
    fn scan_number(&mut self, negative: bool) -> TokenKind {
        let mut digits = String::new();
        let mut is_float = false;
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.advance();
            } else if c == '.' && !is_float {
                is_float = true;
                digits.push(c);
                self.advance();
            } else {
                break;
            }
        }

        match self.peek_char() {
            Some('u' | 'U') if !is_float && !negative => {
                self.advance();
                match digits.parse::<u64>() {
                    Ok(n) => TokenKind::Uint(n),
                    Err(err) => TokenKind::Error(format!("bad unsigned literal: {err}")),
                }
            }
            Some('f' | 'F') => {
                self.advance();
                match digits.parse::<f64>() {
                    Ok(n) => TokenKind::Float(if negative { -n } else { n }),
                    Err(err) => TokenKind::Error(format!("bad float literal: {err}")),
                }
            }
            _ if is_float => match digits.parse::<f64>() {
                Ok(n) => TokenKind::Float(if negative { -n } else { n }),
                Err(err) => TokenKind::Error(format!("bad float literal: {err}")),
            },
            _ => match digits.parse::<i64>() {
                Ok(n) => TokenKind::Int(if negative { -n } else { n }),
                Err(err) => TokenKind::Error(format!("bad integer literal: {err}")),
            },
        }
    }

    fn scan_symbol(&mut self) -> TokenKind {
        let mut name = String::new();
        while let Some(c) = self.peek_char() {
            if !is_symbol_continue(c) {
                break;
            }
            name.push(c);
            self.advance();
        }
        TokenKind::Symbol(name)
    }
}

fn is_symbol_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_symbol_continue(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '/' | '?' | '!')
}
