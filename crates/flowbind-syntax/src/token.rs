// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Token definitions produced by the lexer.

use std::fmt;
use strum::{AsRefStr, EnumString};

use crate::span::Span;

/// Reserved words of the workflow language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
#[allow(missing_docs)]
pub enum Keyword {
    Import,
    As,
    Function,
    Returns,
    Return,
    Service,
    On,
    Remote,
    Resource,
    Isolated,
    Public,
    Private,
    Final,
    Configurable,
    Transactional,
    Var,
    Type,
    Record,
    Map,
    Future,
    Stream,
    Listener,
    Annotation,
    Const,
    Lock,
    If,
    Else,
    While,
    Foreach,
    In,
    Check,
    Checkpanic,
    New,
    Wait,
    Start,
    True,
    False,
    Is,
    Panic,
    Fail,
    Break,
    Continue,
    Do,
    // Builtin type names
    Int,
    Float,
    Decimal,
    String,
    Boolean,
    Byte,
    Anydata,
    Any,
    Json,
    Xml,
    Error,
    Readonly,
    Never,
    Handle,
    Typedesc,
}

impl Keyword {
    /// Source spelling of the keyword.
    pub fn as_str(&self) -> &str {
        self.as_ref()
    }
}

/// Kind of a lexical token.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum TokenKind {
    /// Identifier (never a keyword).
    Ident(String),
    /// Reserved word.
    Keyword(Keyword),
    /// Integer literal, kept as written.
    Int(String),
    /// Floating point literal, kept as written.
    Float(String),
    /// String literal with escapes already processed.
    Str(String),
    OpenBrace,
    CloseBrace,
    /// `{|`
    OpenBracePipe,
    /// `|}`
    ClosePipeBrace,
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    Semicolon,
    Comma,
    Dot,
    Ellipsis,
    Colon,
    Question,
    At,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    EqEq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    AndAnd,
    OrOr,
    Pipe,
    Amp,
    /// `->`
    RightArrow,
    /// `=>`
    FatArrow,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Ident(name) => return write!(f, "identifier `{}`", name),
            TokenKind::Keyword(kw) => return write!(f, "`{}`", kw.as_str()),
            TokenKind::Int(v) | TokenKind::Float(v) => return write!(f, "number `{}`", v),
            TokenKind::Str(_) => "string literal",
            TokenKind::OpenBrace => "`{`",
            TokenKind::CloseBrace => "`}`",
            TokenKind::OpenBracePipe => "`{|`",
            TokenKind::ClosePipeBrace => "`|}`",
            TokenKind::OpenParen => "`(`",
            TokenKind::CloseParen => "`)`",
            TokenKind::OpenBracket => "`[`",
            TokenKind::CloseBracket => "`]`",
            TokenKind::Semicolon => "`;`",
            TokenKind::Comma => "`,`",
            TokenKind::Dot => "`.`",
            TokenKind::Ellipsis => "`...`",
            TokenKind::Colon => "`:`",
            TokenKind::Question => "`?`",
            TokenKind::At => "`@`",
            TokenKind::Assign => "`=`",
            TokenKind::PlusAssign => "`+=`",
            TokenKind::MinusAssign => "`-=`",
            TokenKind::StarAssign => "`*=`",
            TokenKind::SlashAssign => "`/=`",
            TokenKind::EqEq => "`==`",
            TokenKind::NotEq => "`!=`",
            TokenKind::Lt => "`<`",
            TokenKind::Gt => "`>`",
            TokenKind::LtEq => "`<=`",
            TokenKind::GtEq => "`>=`",
            TokenKind::Plus => "`+`",
            TokenKind::Minus => "`-`",
            TokenKind::Star => "`*`",
            TokenKind::Slash => "`/`",
            TokenKind::Percent => "`%`",
            TokenKind::Bang => "`!`",
            TokenKind::AndAnd => "`&&`",
            TokenKind::OrOr => "`||`",
            TokenKind::Pipe => "`|`",
            TokenKind::Amp => "`&`",
            TokenKind::RightArrow => "`->`",
            TokenKind::FatArrow => "`=>`",
            TokenKind::Eof => "end of file",
        };
        f.write_str(text)
    }
}

/// A token with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// What was lexed.
    pub kind: TokenKind,
    /// Where it was lexed.
    pub span: Span,
}

impl Token {
    /// Whether this token is the given keyword.
    pub fn is_keyword(&self, kw: Keyword) -> bool {
        matches!(&self.kind, TokenKind::Keyword(k) if *k == kw)
    }
}
