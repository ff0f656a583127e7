// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Converts source text into a token stream.

use std::str::FromStr;

use crate::error::{Result, SyntaxError};
use crate::span::Span;
use crate::token::{Keyword, Token, TokenKind};

/// Hand-written scanner over UTF-8 source text.
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Create a lexer positioned at the start of `src`.
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    /// Lex the whole input. The last token is always [`TokenKind::Eof`].
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            let start = self.pos;
            let Some(ch) = self.peek() else {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    span: Span::new(start, start),
                });
                return Ok(tokens);
            };

            let kind = if ch.is_ascii_alphabetic() || ch == '_' {
                self.lex_word()
            } else if ch == '\'' {
                // Quoted identifier, e.g. 'type
                self.bump();
                let word = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
                TokenKind::Ident(word.to_string())
            } else if ch.is_ascii_digit() {
                self.lex_number()
            } else if ch == '"' {
                self.lex_string()?
            } else {
                self.lex_punct(ch)?
            };

            tokens.push(Token {
                kind,
                span: Span::new(start, self.pos),
            });
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if !pred(ch) {
                break;
            }
            self.bump();
        }
        &self.src[start..self.pos]
    }

    fn skip_trivia(&mut self) {
        loop {
            self.take_while(char::is_whitespace);
            if self.src[self.pos..].starts_with("//") {
                self.take_while(|c| c != '\n');
            } else {
                return;
            }
        }
    }

    fn lex_word(&mut self) -> TokenKind {
        let word = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
        match Keyword::from_str(word) {
            Ok(kw) => TokenKind::Keyword(kw),
            Err(_) => TokenKind::Ident(word.to_string()),
        }
    }

    fn lex_number(&mut self) -> TokenKind {
        let start = self.pos;
        if self.src[self.pos..].starts_with("0x") || self.src[self.pos..].starts_with("0X") {
            self.bump();
            self.bump();
            self.take_while(|c| c.is_ascii_hexdigit());
            return TokenKind::Int(self.src[start..self.pos].to_string());
        }
        self.take_while(|c| c.is_ascii_digit());
        let mut is_float = false;
        // A dot only continues the number when a digit follows, so `1...3` and `x.0.y` stay intact.
        if self.peek() == Some('.') && self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.bump();
            self.take_while(|c| c.is_ascii_digit());
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let sign = matches!(self.peek_nth(1), Some('+' | '-'));
            let digit_at = if sign { 2 } else { 1 };
            if self.peek_nth(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.bump();
                if sign {
                    self.bump();
                }
                self.take_while(|c| c.is_ascii_digit());
            }
        }
        // Decimal and float suffixes
        if matches!(self.peek(), Some('d' | 'D' | 'f' | 'F'))
            && !self
                .peek_nth(1)
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            is_float = true;
            self.bump();
        }
        let text = self.src[start..self.pos].to_string();
        if is_float {
            TokenKind::Float(text)
        } else {
            TokenKind::Int(text)
        }
    }

    fn lex_string(&mut self) -> Result<TokenKind> {
        let start = self.pos;
        self.bump();
        let mut value = String::new();
        loop {
            let Some(ch) = self.bump() else {
                return Err(SyntaxError::UnterminatedString {
                    span: Span::new(start, self.pos),
                });
            };
            match ch {
                '"' => return Ok(TokenKind::Str(value)),
                '\n' => {
                    return Err(SyntaxError::UnterminatedString {
                        span: Span::new(start, self.pos),
                    });
                }
                '\\' => {
                    let esc_start = self.pos - 1;
                    let Some(esc) = self.bump() else {
                        return Err(SyntaxError::UnterminatedString {
                            span: Span::new(start, self.pos),
                        });
                    };
                    let resolved = match esc {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '\\' => '\\',
                        '"' => '"',
                        '\'' => '\'',
                        '0' => '\0',
                        other => {
                            return Err(SyntaxError::InvalidEscape {
                                ch: other,
                                span: Span::new(esc_start, self.pos),
                            });
                        }
                    };
                    value.push(resolved);
                }
                other => value.push(other),
            }
        }
    }

    fn lex_punct(&mut self, ch: char) -> Result<TokenKind> {
        let rest = &self.src[self.pos..];
        // Longest match first
        let multi = [
            ("...", TokenKind::Ellipsis),
            ("{|", TokenKind::OpenBracePipe),
            ("|}", TokenKind::ClosePipeBrace),
            ("->", TokenKind::RightArrow),
            ("=>", TokenKind::FatArrow),
            ("==", TokenKind::EqEq),
            ("!=", TokenKind::NotEq),
            ("<=", TokenKind::LtEq),
            (">=", TokenKind::GtEq),
            ("&&", TokenKind::AndAnd),
            ("||", TokenKind::OrOr),
            ("+=", TokenKind::PlusAssign),
            ("-=", TokenKind::MinusAssign),
            ("*=", TokenKind::StarAssign),
            ("/=", TokenKind::SlashAssign),
        ];
        if let Some((text, kind)) = multi.into_iter().find(|(text, _)| rest.starts_with(text)) {
            self.pos += text.len();
            return Ok(kind);
        }

        let kind = match ch {
            '{' => TokenKind::OpenBrace,
            '}' => TokenKind::CloseBrace,
            '(' => TokenKind::OpenParen,
            ')' => TokenKind::CloseParen,
            '[' => TokenKind::OpenBracket,
            ']' => TokenKind::CloseBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            ':' => TokenKind::Colon,
            '?' => TokenKind::Question,
            '@' => TokenKind::At,
            '=' => TokenKind::Assign,
            '<' => TokenKind::Lt,
            '>' => TokenKind::Gt,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '!' => TokenKind::Bang,
            '|' => TokenKind::Pipe,
            '&' => TokenKind::Amp,
            other => {
                let start = self.pos;
                return Err(SyntaxError::UnexpectedChar {
                    ch: other,
                    span: Span::new(start, start + other.len_utf8()),
                });
            }
        };
        self.bump();
        Ok(kind)
    }
}

/// Convenience wrapper around [`Lexer::tokenize`].
pub fn tokenize(src: &str) -> Result<Vec<Token>> {
    Lexer::new(src).tokenize()
}
