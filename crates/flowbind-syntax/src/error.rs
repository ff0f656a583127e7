// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Syntax errors raised by the lexer and parser.

use thiserror::Error;

use crate::span::Span;

/// First syntax error found in a source file.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyntaxError {
    /// A character that cannot start any token.
    #[error("unexpected character `{ch}`")]
    UnexpectedChar {
        /// The offending character.
        ch: char,
        /// Where it appeared.
        span: Span,
    },

    /// A string literal without its closing quote.
    #[error("unterminated string literal")]
    UnterminatedString {
        /// Span from the opening quote to end of input.
        span: Span,
    },

    /// An unknown escape sequence inside a string literal.
    #[error("invalid escape sequence `\\{ch}`")]
    InvalidEscape {
        /// Character following the backslash.
        ch: char,
        /// Where the escape appeared.
        span: Span,
    },

    /// The parser found a token it could not use.
    #[error("expected {expected}, found {found}")]
    Unexpected {
        /// Human description of what would have been accepted.
        expected: String,
        /// Description of the token that was found.
        found: String,
        /// Span of the found token.
        span: Span,
    },
}

impl SyntaxError {
    /// Source span of the error.
    pub fn span(&self) -> Span {
        match self {
            SyntaxError::UnexpectedChar { span, .. }
            | SyntaxError::UnterminatedString { span }
            | SyntaxError::InvalidEscape { span, .. }
            | SyntaxError::Unexpected { span, .. } => *span,
        }
    }
}

/// Result alias for syntax operations.
pub type Result<T> = std::result::Result<T, SyntaxError>;
