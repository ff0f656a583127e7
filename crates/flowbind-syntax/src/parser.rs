// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Recursive-descent parser producing a [`ModulePart`].
//!
//! The parser stops at the first syntax error. Local declarations are told
//! apart from expression statements by speculatively parsing a type
//! descriptor followed by an identifier and backtracking when that fails.

use crate::ast::*;
use crate::error::{Result, SyntaxError};
use crate::lexer::tokenize;
use crate::span::Span;
use crate::token::{Keyword, Token, TokenKind};

/// Parse a whole source file.
pub fn parse_module(src: &str) -> Result<ModulePart> {
    let tokens = tokenize(src)?;
    Parser::new(src, tokens).module_part()
}

/// Parse a single expression, e.g. for tests and tooling.
pub fn parse_expr(src: &str) -> Result<Expr> {
    let tokens = tokenize(src)?;
    let mut parser = Parser::new(src, tokens);
    let expr = parser.expr()?;
    parser.expect(TokenKind::Eof, "end of input")?;
    Ok(expr)
}

/// Parse a single type descriptor.
pub fn parse_type(src: &str) -> Result<TypeDesc> {
    let tokens = tokenize(src)?;
    let mut parser = Parser::new(src, tokens);
    let ty = parser.type_desc()?;
    parser.expect(TokenKind::Eof, "end of input")?;
    Ok(ty)
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, tokens: Vec<Token>) -> Self {
        Self {
            src,
            tokens,
            pos: 0,
        }
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    fn peek(&self) -> &TokenKind {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> &TokenKind {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn token_at(&self, n: usize) -> &Token {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn span(&self) -> Span {
        self.token_at(0).span
    }

    fn start(&self) -> usize {
        self.span().start
    }

    fn prev_end(&self) -> usize {
        if self.pos == 0 {
            0
        } else {
            self.tokens[self.pos - 1].span.end
        }
    }

    fn since(&self, start: usize) -> Span {
        Span::new(start, self.prev_end().max(start))
    }

    fn bump(&mut self) -> Token {
        let token = self.token_at(0).clone();
        if !matches!(token.kind, TokenKind::Eof) {
            self.pos += 1;
        }
        token
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.peek() == kind
    }

    fn at_kw(&self, kw: Keyword) -> bool {
        matches!(self.peek(), TokenKind::Keyword(k) if *k == kw)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_kw(&mut self, kw: Keyword) -> bool {
        if self.at_kw(kw) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        SyntaxError::Unexpected {
            expected: expected.to_string(),
            found: self.peek().to_string(),
            span: self.span(),
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Span> {
        if self.at(&kind) {
            Ok(self.bump().span)
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_kw(&mut self, kw: Keyword) -> Result<Span> {
        if self.at_kw(kw) {
            Ok(self.bump().span)
        } else {
            Err(self.unexpected(&format!("`{}`", kw.as_str())))
        }
    }

    fn ident(&mut self) -> Result<Ident> {
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                let span = self.bump().span;
                Ok(Ident::new(name, span))
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// Identifier or keyword used as a member name, e.g. `ctx.start`.
    fn member_name(&mut self) -> Result<Ident> {
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                let span = self.bump().span;
                Ok(Ident::new(name, span))
            }
            TokenKind::Keyword(kw) => {
                let span = self.bump().span;
                Ok(Ident::new(kw.as_str(), span))
            }
            _ => Err(self.unexpected("name")),
        }
    }

    /// Whether tokens `n` and `n + 1` touch without whitespace.
    fn adjacent(&self, n: usize) -> bool {
        self.token_at(n).span.end == self.token_at(n + 1).span.start
    }

    /// Whether a `prefix:name` qualified reference starts here.
    fn at_qualified(&self) -> bool {
        matches!(self.peek_at(1), TokenKind::Colon)
            && matches!(self.peek_at(2), TokenKind::Ident(_))
            && self.adjacent(0)
            && self.adjacent(1)
    }

    /// Run `f`, rewinding the token position when it fails.
    fn speculate<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Option<T> {
        let saved = self.pos;
        match f(self) {
            Ok(value) => Some(value),
            Err(_) => {
                self.pos = saved;
                None
            }
        }
    }

    fn comma_separated<T>(
        &mut self,
        close: TokenKind,
        close_desc: &str,
        mut item: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        if self.eat(&close) {
            return Ok(items);
        }
        loop {
            items.push(item(self)?);
            if self.eat(&TokenKind::Comma) {
                continue;
            }
            self.expect(close, close_desc)?;
            return Ok(items);
        }
    }

    // ========================================================================
    // Module level
    // ========================================================================

    fn module_part(&mut self) -> Result<ModulePart> {
        let mut imports = Vec::new();
        while self.at_kw(Keyword::Import) {
            imports.push(self.import_decl()?);
        }
        let mut members = Vec::new();
        while !self.at(&TokenKind::Eof) {
            members.push(self.module_member()?);
        }
        Ok(ModulePart {
            imports,
            members,
            span: Span::new(0, self.src.len()),
        })
    }

    fn import_decl(&mut self) -> Result<ImportDecl> {
        let start = self.start();
        self.expect_kw(Keyword::Import)?;
        let first = self.member_name()?;
        let (org, mut module) = if self.eat(&TokenKind::Slash) {
            (Some(first), vec![self.member_name()?])
        } else {
            (None, vec![first])
        };
        while self.eat(&TokenKind::Dot) {
            module.push(self.member_name()?);
        }
        let prefix = if self.eat_kw(Keyword::As) {
            Some(self.ident()?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon, "`;`")?;
        Ok(ImportDecl {
            org,
            module,
            prefix,
            span: self.since(start),
        })
    }

    fn annotations(&mut self) -> Result<Vec<Annotation>> {
        let mut annotations = Vec::new();
        while self.at(&TokenKind::At) {
            let start = self.start();
            self.bump();
            let name = self.name_ref()?;
            let value = if self.at(&TokenKind::OpenBrace) {
                Some(self.mapping_constructor()?)
            } else {
                None
            };
            annotations.push(Annotation {
                name,
                value,
                span: self.since(start),
            });
        }
        Ok(annotations)
    }

    fn qualifiers(&mut self) -> Qualifiers {
        let mut qualifiers = Vec::new();
        loop {
            let q = match self.peek() {
                TokenKind::Keyword(Keyword::Public) => Qualifier::Public,
                TokenKind::Keyword(Keyword::Private) => Qualifier::Private,
                TokenKind::Keyword(Keyword::Isolated) => Qualifier::Isolated,
                TokenKind::Keyword(Keyword::Remote) => Qualifier::Remote,
                TokenKind::Keyword(Keyword::Resource) => Qualifier::Resource,
                TokenKind::Keyword(Keyword::Transactional) => Qualifier::Transactional,
                TokenKind::Keyword(Keyword::Final) => Qualifier::Final,
                TokenKind::Keyword(Keyword::Configurable) => Qualifier::Configurable,
                _ => return Qualifiers(qualifiers),
            };
            let span = self.bump().span;
            qualifiers.push((q, span));
        }
    }

    fn module_member(&mut self) -> Result<ModuleMember> {
        let annotations = self.annotations()?;
        let start = self.start();
        let qualifiers = self.qualifiers();
        match self.peek() {
            TokenKind::Keyword(Keyword::Function) => Ok(ModuleMember::Function(
                self.function_def(start, annotations, qualifiers)?,
            )),
            TokenKind::Keyword(Keyword::Service) => Ok(ModuleMember::Service(
                self.service_decl(start, annotations, qualifiers)?,
            )),
            TokenKind::Keyword(Keyword::Const) => {
                self.bump();
                let ty = if matches!(self.peek_at(1), TokenKind::Assign) {
                    None
                } else {
                    Some(self.type_desc()?)
                };
                let name = self.ident()?;
                self.expect(TokenKind::Assign, "`=`")?;
                let value = self.expr()?;
                self.expect(TokenKind::Semicolon, "`;`")?;
                Ok(ModuleMember::Const(ConstDecl {
                    annotations,
                    qualifiers,
                    ty,
                    name,
                    value,
                    span: self.since(start),
                }))
            }
            TokenKind::Keyword(Keyword::Type) => {
                self.bump();
                let name = self.ident()?;
                let ty = self.type_desc()?;
                self.expect(TokenKind::Semicolon, "`;`")?;
                Ok(ModuleMember::Type(TypeDefinition {
                    annotations,
                    qualifiers,
                    name,
                    ty,
                    span: self.since(start),
                }))
            }
            TokenKind::Keyword(Keyword::Listener) => {
                self.bump();
                let ty = if matches!(self.peek_at(1), TokenKind::Assign) {
                    None
                } else {
                    Some(self.type_desc()?)
                };
                let name = self.ident()?;
                self.expect(TokenKind::Assign, "`=`")?;
                let init = self.expr()?;
                self.expect(TokenKind::Semicolon, "`;`")?;
                Ok(ModuleMember::Listener(ListenerDecl {
                    annotations,
                    qualifiers,
                    ty,
                    name,
                    init,
                    span: self.since(start),
                }))
            }
            TokenKind::Keyword(Keyword::Annotation) => {
                self.bump();
                let ty = if matches!(
                    self.peek_at(1),
                    TokenKind::Keyword(Keyword::On) | TokenKind::Semicolon
                ) {
                    None
                } else {
                    Some(self.type_desc()?)
                };
                let name = self.ident()?;
                let mut attach_points = Vec::new();
                if self.eat_kw(Keyword::On) {
                    loop {
                        let mut words = Vec::new();
                        while !matches!(self.peek(), TokenKind::Comma | TokenKind::Semicolon) {
                            words.push(self.member_name()?.name);
                        }
                        attach_points.push(words.join(" "));
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::Semicolon, "`;`")?;
                Ok(ModuleMember::Annotation(AnnotationDecl {
                    qualifiers,
                    ty,
                    name,
                    attach_points,
                    span: self.since(start),
                }))
            }
            _ => {
                let ty = self.type_desc()?;
                let name = self.ident()?;
                let init = if self.eat(&TokenKind::Assign) {
                    if self.at(&TokenKind::Question)
                        && matches!(self.peek_at(1), TokenKind::Semicolon)
                    {
                        let span = self.bump().span;
                        Some(Expr {
                            kind: ExprKind::Required,
                            span,
                        })
                    } else {
                        Some(self.expr()?)
                    }
                } else {
                    None
                };
                self.expect(TokenKind::Semicolon, "`;`")?;
                Ok(ModuleMember::Var(ModuleVarDecl {
                    annotations,
                    qualifiers,
                    ty,
                    name,
                    init,
                    span: self.since(start),
                }))
            }
        }
    }

    fn function_def(
        &mut self,
        start: usize,
        annotations: Vec<Annotation>,
        qualifiers: Qualifiers,
    ) -> Result<FunctionDef> {
        self.expect_kw(Keyword::Function)?;
        let name = self.member_name()?;
        let resource_path = if qualifiers.has(Qualifier::Resource) {
            self.resource_path()?
        } else {
            None
        };
        self.expect(TokenKind::OpenParen, "`(`")?;
        let params = self.comma_separated(TokenKind::CloseParen, "`)`", Self::param)?;
        let return_type = if self.eat_kw(Keyword::Returns) {
            // Return type annotations are accepted and dropped.
            self.annotations()?;
            Some(self.type_desc()?)
        } else {
            None
        };
        let body = self.block()?;
        Ok(FunctionDef {
            annotations,
            qualifiers,
            name,
            resource_path,
            params,
            return_type,
            body,
            span: self.since(start),
        })
    }

    /// Raw text between a resource accessor and its parameter list.
    fn resource_path(&mut self) -> Result<Option<String>> {
        let start = self.start();
        let mut depth = 0usize;
        while !(depth == 0 && self.at(&TokenKind::OpenParen)) {
            match self.peek() {
                TokenKind::OpenBracket => depth += 1,
                TokenKind::CloseBracket => depth = depth.saturating_sub(1),
                TokenKind::Eof => return Err(self.unexpected("`(`")),
                _ => {}
            }
            self.bump();
        }
        let end = self.prev_end();
        if end <= start {
            return Ok(None);
        }
        Ok(Some(self.src[start..end].to_string()))
    }

    fn param(&mut self) -> Result<Param> {
        let start = self.start();
        let annotations = self.annotations()?;
        let ty = self.type_desc()?;
        let mut kind = ParamKind::Required;
        if self.eat(&TokenKind::Ellipsis) {
            kind = ParamKind::Rest;
        }
        let name = self.ident()?;
        let default = if kind == ParamKind::Required && self.eat(&TokenKind::Assign) {
            kind = ParamKind::Defaultable;
            Some(self.expr()?)
        } else {
            None
        };
        Ok(Param {
            annotations,
            kind,
            ty,
            name,
            default,
            span: self.since(start),
        })
    }

    fn service_decl(
        &mut self,
        start: usize,
        annotations: Vec<Annotation>,
        qualifiers: Qualifiers,
    ) -> Result<ServiceDecl> {
        let keyword_span = self.expect_kw(Keyword::Service)?;
        let type_desc = if matches!(
            self.peek(),
            TokenKind::Ident(_) | TokenKind::OpenParen
        ) {
            Some(self.type_desc()?)
        } else {
            None
        };
        let base_path = match self.peek() {
            TokenKind::Slash => {
                let path_start = self.start();
                while !self.at_kw(Keyword::On) {
                    if self.at(&TokenKind::Eof) {
                        return Err(self.unexpected("`on`"));
                    }
                    self.bump();
                }
                Some(self.src[path_start..self.prev_end()].to_string())
            }
            TokenKind::Str(_) => {
                let span = self.bump().span;
                Some(self.src[span.start..span.end].to_string())
            }
            _ => None,
        };
        self.expect_kw(Keyword::On)?;
        let mut listeners = vec![self.expr()?];
        while self.eat(&TokenKind::Comma) {
            listeners.push(self.expr()?);
        }
        self.expect(TokenKind::OpenBrace, "`{`")?;
        let mut members = Vec::new();
        while !self.eat(&TokenKind::CloseBrace) {
            if self.at(&TokenKind::Eof) {
                return Err(self.unexpected("`}`"));
            }
            members.push(self.service_member()?);
        }
        Ok(ServiceDecl {
            annotations,
            qualifiers,
            type_desc,
            base_path,
            listeners,
            members,
            keyword_span,
            span: self.since(start),
        })
    }

    fn service_member(&mut self) -> Result<ServiceMember> {
        let annotations = self.annotations()?;
        let start = self.start();
        let qualifiers = self.qualifiers();
        if self.at_kw(Keyword::Function) {
            return Ok(ServiceMember::Method(self.function_def(
                start,
                annotations,
                qualifiers,
            )?));
        }
        let ty = self.type_desc()?;
        let name = self.ident()?;
        let init = if self.eat(&TokenKind::Assign) {
            Some(self.expr()?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon, "`;`")?;
        Ok(ServiceMember::Field(ObjectField {
            annotations,
            qualifiers,
            ty,
            name,
            init,
            span: self.since(start),
        }))
    }

    // ========================================================================
    // Types
    // ========================================================================

    fn type_desc(&mut self) -> Result<TypeDesc> {
        let start = self.start();
        let first = self.intersection_type()?;
        if !self.at(&TokenKind::Pipe) {
            return Ok(first);
        }
        let mut members = vec![first];
        while self.eat(&TokenKind::Pipe) {
            members.push(self.intersection_type()?);
        }
        Ok(TypeDesc {
            kind: TypeDescKind::Union(members),
            span: self.since(start),
        })
    }

    fn intersection_type(&mut self) -> Result<TypeDesc> {
        let start = self.start();
        let first = self.postfix_type()?;
        if !self.at(&TokenKind::Amp) {
            return Ok(first);
        }
        let mut members = vec![first];
        while self.eat(&TokenKind::Amp) {
            members.push(self.postfix_type()?);
        }
        Ok(TypeDesc {
            kind: TypeDescKind::Intersection(members),
            span: self.since(start),
        })
    }

    fn postfix_type(&mut self) -> Result<TypeDesc> {
        let start = self.start();
        let mut ty = self.primary_type()?;
        loop {
            if self.at(&TokenKind::Question) {
                self.bump();
                ty = TypeDesc {
                    kind: TypeDescKind::Optional(Box::new(ty)),
                    span: self.since(start),
                };
            } else if self.at(&TokenKind::OpenBracket)
                && matches!(self.peek_at(1), TokenKind::CloseBracket)
            {
                self.bump();
                self.bump();
                ty = TypeDesc {
                    kind: TypeDescKind::Array(Box::new(ty)),
                    span: self.since(start),
                };
            } else {
                return Ok(ty);
            }
        }
    }

    fn type_param(&mut self) -> Result<TypeDesc> {
        self.expect(TokenKind::Lt, "`<`")?;
        let ty = self.type_desc()?;
        self.expect(TokenKind::Gt, "`>`")?;
        Ok(ty)
    }

    fn primary_type(&mut self) -> Result<TypeDesc> {
        let start = self.start();
        let kind = match self.peek().clone() {
            TokenKind::Keyword(kw) => {
                if let Some(builtin) = builtin_type(kw) {
                    if self.at_qualified() {
                        TypeDescKind::Named(self.name_ref()?)
                    } else {
                        self.bump();
                        TypeDescKind::Builtin(builtin)
                    }
                } else {
                    match kw {
                        Keyword::Var => {
                            self.bump();
                            TypeDescKind::Var
                        }
                        Keyword::Map => {
                            self.bump();
                            TypeDescKind::Map(Box::new(self.type_param()?))
                        }
                        Keyword::Future => {
                            self.bump();
                            if self.at(&TokenKind::Lt) {
                                TypeDescKind::Future(Some(Box::new(self.type_param()?)))
                            } else {
                                TypeDescKind::Future(None)
                            }
                        }
                        Keyword::Stream => {
                            self.bump();
                            self.expect(TokenKind::Lt, "`<`")?;
                            let item = self.type_desc()?;
                            let completion = if self.eat(&TokenKind::Comma) {
                                Some(Box::new(self.type_desc()?))
                            } else {
                                None
                            };
                            self.expect(TokenKind::Gt, "`>`")?;
                            TypeDescKind::Stream(Box::new(item), completion)
                        }
                        Keyword::Function => {
                            self.bump();
                            TypeDescKind::Function(self.function_sig()?)
                        }
                        Keyword::Record => {
                            self.bump();
                            TypeDescKind::Record(self.record_body()?)
                        }
                        Keyword::True | Keyword::False => {
                            self.bump();
                            TypeDescKind::Singleton(Literal::Bool(kw == Keyword::True))
                        }
                        _ => return Err(self.unexpected("type")),
                    }
                }
            }
            TokenKind::Ident(_) => TypeDescKind::Named(self.name_ref()?),
            TokenKind::OpenParen => {
                self.bump();
                if self.eat(&TokenKind::CloseParen) {
                    TypeDescKind::Nil
                } else {
                    let inner = self.type_desc()?;
                    self.expect(TokenKind::CloseParen, "`)`")?;
                    TypeDescKind::Paren(Box::new(inner))
                }
            }
            TokenKind::Str(value) => {
                self.bump();
                TypeDescKind::Singleton(Literal::String(value))
            }
            TokenKind::Int(value) => {
                self.bump();
                TypeDescKind::Singleton(Literal::Int(value))
            }
            TokenKind::Float(value) => {
                self.bump();
                TypeDescKind::Singleton(Literal::Float(value))
            }
            _ => return Err(self.unexpected("type")),
        };
        Ok(TypeDesc {
            kind,
            span: self.since(start),
        })
    }

    fn function_sig(&mut self) -> Result<Option<FunctionSig>> {
        if !self.eat(&TokenKind::OpenParen) {
            return Ok(None);
        }
        let mut params = Vec::new();
        let mut rest = None;
        if !self.eat(&TokenKind::CloseParen) {
            loop {
                let ty = self.type_desc()?;
                let is_rest = self.eat(&TokenKind::Ellipsis);
                // Parameter names are optional in function types.
                if matches!(self.peek(), TokenKind::Ident(_)) {
                    self.bump();
                }
                if is_rest {
                    rest = Some(Box::new(ty));
                } else {
                    params.push(ty);
                }
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::CloseParen, "`)`")?;
        }
        let return_type = if self.eat_kw(Keyword::Returns) {
            Some(Box::new(self.type_desc()?))
        } else {
            None
        };
        Ok(Some(FunctionSig {
            params,
            rest,
            return_type,
        }))
    }

    fn record_body(&mut self) -> Result<RecordType> {
        let (closed, close) = if self.eat(&TokenKind::OpenBracePipe) {
            (true, TokenKind::ClosePipeBrace)
        } else {
            self.expect(TokenKind::OpenBrace, "`{`")?;
            (false, TokenKind::CloseBrace)
        };
        let mut fields = Vec::new();
        let mut rest = None;
        while !self.eat(&close) {
            let start = self.start();
            // `readonly T name;` marks the field; `readonly name;` is a field of type readonly.
            let readonly = self.at_kw(Keyword::Readonly)
                && matches!(self.peek_at(1), TokenKind::Ident(_) | TokenKind::Keyword(_))
                && !matches!(self.peek_at(2), TokenKind::Semicolon | TokenKind::Assign);
            if readonly {
                self.bump();
            }
            let ty = self.type_desc()?;
            if self.eat(&TokenKind::Ellipsis) {
                self.expect(TokenKind::Semicolon, "`;`")?;
                rest = Some(Box::new(ty));
                continue;
            }
            let name = self.member_name()?;
            let optional = self.eat(&TokenKind::Question);
            let default = if self.eat(&TokenKind::Assign) {
                Some(self.expr()?)
            } else {
                None
            };
            self.expect(TokenKind::Semicolon, "`;`")?;
            fields.push(RecordField {
                readonly,
                ty,
                name,
                optional,
                default,
                span: self.since(start),
            });
        }
        Ok(RecordType {
            closed,
            fields,
            rest,
        })
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn block(&mut self) -> Result<Block> {
        let start = self.start();
        self.expect(TokenKind::OpenBrace, "`{`")?;
        let mut stmts = Vec::new();
        while !self.eat(&TokenKind::CloseBrace) {
            if self.at(&TokenKind::Eof) {
                return Err(self.unexpected("`}`"));
            }
            stmts.push(self.stmt()?);
        }
        Ok(Block {
            stmts,
            span: self.since(start),
        })
    }

    fn stmt(&mut self) -> Result<Stmt> {
        let start = self.start();
        let kind = match self.peek() {
            TokenKind::OpenBrace => StmtKind::Block(self.block()?),
            TokenKind::Keyword(Keyword::Lock) => {
                self.bump();
                StmtKind::Lock(self.block()?)
            }
            TokenKind::Keyword(Keyword::If) => return self.if_stmt(),
            TokenKind::Keyword(Keyword::While) => {
                self.bump();
                let cond = self.expr()?;
                let body = self.block()?;
                StmtKind::While { cond, body }
            }
            TokenKind::Keyword(Keyword::Foreach) => {
                self.bump();
                let ty = self.type_desc()?;
                let name = self.ident()?;
                self.expect_kw(Keyword::In)?;
                let iter = self.expr()?;
                let body = self.block()?;
                StmtKind::Foreach {
                    ty,
                    name,
                    iter,
                    body,
                }
            }
            TokenKind::Keyword(Keyword::Return) => {
                self.bump();
                let value = if self.at(&TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.expr()?)
                };
                self.expect(TokenKind::Semicolon, "`;`")?;
                StmtKind::Return(value)
            }
            TokenKind::Keyword(Keyword::Do) => {
                self.bump();
                let body = self.block()?;
                let on_fail = if self.eat_kw(Keyword::On) {
                    self.expect_kw(Keyword::Fail)?;
                    let ty = self.type_desc()?;
                    let name = self.ident()?;
                    let body = self.block()?;
                    Some(OnFail { ty, name, body })
                } else {
                    None
                };
                StmtKind::Do { body, on_fail }
            }
            TokenKind::Keyword(Keyword::Panic) => {
                self.bump();
                let value = self.expr()?;
                self.expect(TokenKind::Semicolon, "`;`")?;
                StmtKind::Panic(value)
            }
            TokenKind::Keyword(Keyword::Fail) => {
                self.bump();
                let value = self.expr()?;
                self.expect(TokenKind::Semicolon, "`;`")?;
                StmtKind::Fail(value)
            }
            TokenKind::Keyword(Keyword::Break) => {
                self.bump();
                self.expect(TokenKind::Semicolon, "`;`")?;
                StmtKind::Break
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.bump();
                self.expect(TokenKind::Semicolon, "`;`")?;
                StmtKind::Continue
            }
            TokenKind::At | TokenKind::Keyword(Keyword::Final) | TokenKind::Keyword(Keyword::Var) => {
                StmtKind::VarDecl(self.local_var_decl()?)
            }
            _ => {
                if let Some(decl) = self.speculate(Self::local_var_decl) {
                    StmtKind::VarDecl(decl)
                } else {
                    let target = self.expr()?;
                    let op = match self.peek() {
                        TokenKind::Assign => Some(AssignOp::Assign),
                        TokenKind::PlusAssign => Some(AssignOp::Add),
                        TokenKind::MinusAssign => Some(AssignOp::Sub),
                        TokenKind::StarAssign => Some(AssignOp::Mul),
                        TokenKind::SlashAssign => Some(AssignOp::Div),
                        _ => None,
                    };
                    let kind = match op {
                        Some(op) => {
                            self.bump();
                            let value = self.expr()?;
                            StmtKind::Assign { target, op, value }
                        }
                        None => StmtKind::Expr(target),
                    };
                    self.expect(TokenKind::Semicolon, "`;`")?;
                    kind
                }
            }
        };
        Ok(Stmt {
            kind,
            span: self.since(start),
        })
    }

    fn if_stmt(&mut self) -> Result<Stmt> {
        let start = self.start();
        self.expect_kw(Keyword::If)?;
        let cond = self.expr()?;
        let then_block = self.block()?;
        let else_branch = if self.eat_kw(Keyword::Else) {
            if self.at_kw(Keyword::If) {
                Some(Box::new(self.if_stmt()?))
            } else {
                let block_start = self.start();
                let block = self.block()?;
                Some(Box::new(Stmt {
                    kind: StmtKind::Block(block),
                    span: self.since(block_start),
                }))
            }
        } else {
            None
        };
        Ok(Stmt {
            kind: StmtKind::If {
                cond,
                then_block,
                else_branch,
            },
            span: self.since(start),
        })
    }

    fn local_var_decl(&mut self) -> Result<LocalVarDecl> {
        let annotations = self.annotations()?;
        let is_final = self.eat_kw(Keyword::Final);
        let ty = self.type_desc()?;
        let name = self.ident()?;
        if !matches!(self.peek(), TokenKind::Assign | TokenKind::Semicolon) {
            return Err(self.unexpected("`=` or `;`"));
        }
        let init = if self.eat(&TokenKind::Assign) {
            Some(self.expr()?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon, "`;`")?;
        Ok(LocalVarDecl {
            annotations,
            is_final,
            ty,
            name,
            init,
        })
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn expr(&mut self) -> Result<Expr> {
        let start = self.start();
        let cond = self.binary_expr(0)?;
        if !self.eat(&TokenKind::Question) {
            return Ok(cond);
        }
        let then_expr = self.expr()?;
        self.expect(TokenKind::Colon, "`:`")?;
        let else_expr = self.expr()?;
        Ok(Expr {
            kind: ExprKind::Conditional {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            span: self.since(start),
        })
    }

    fn binary_expr(&mut self, min_prec: u8) -> Result<Expr> {
        let start = self.start();
        let mut lhs = self.unary_expr()?;
        loop {
            if self.at_kw(Keyword::Is) && min_prec <= 4 {
                self.bump();
                let ty = self.type_desc()?;
                lhs = Expr {
                    kind: ExprKind::TypeTest {
                        expr: Box::new(lhs),
                        ty,
                    },
                    span: self.since(start),
                };
                continue;
            }
            let Some(op) = binary_op(self.peek()) else {
                return Ok(lhs);
            };
            let prec = op.precedence();
            if prec < min_prec {
                return Ok(lhs);
            }
            self.bump();
            let rhs = self.binary_expr(prec + 1)?;
            lhs = Expr {
                kind: ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span: self.since(start),
            };
        }
    }

    fn unary_expr(&mut self) -> Result<Expr> {
        let start = self.start();
        let kind = match self.peek() {
            TokenKind::Minus | TokenKind::Plus | TokenKind::Bang => {
                let op = match self.bump().kind {
                    TokenKind::Minus => UnaryOp::Neg,
                    TokenKind::Plus => UnaryOp::Plus,
                    _ => UnaryOp::Not,
                };
                ExprKind::Unary {
                    op,
                    operand: Box::new(self.unary_expr()?),
                }
            }
            TokenKind::Keyword(Keyword::Check) => {
                self.bump();
                ExprKind::Check(Box::new(self.unary_expr()?))
            }
            TokenKind::Keyword(Keyword::Checkpanic) => {
                self.bump();
                ExprKind::CheckPanic(Box::new(self.unary_expr()?))
            }
            TokenKind::Keyword(Keyword::Wait) => {
                self.bump();
                ExprKind::Wait(Box::new(self.unary_expr()?))
            }
            TokenKind::Keyword(Keyword::Start) => {
                self.bump();
                ExprKind::Start(Box::new(self.unary_expr()?))
            }
            TokenKind::Lt => {
                self.bump();
                let ty = self.type_desc()?;
                self.expect(TokenKind::Gt, "`>`")?;
                ExprKind::Cast {
                    ty,
                    expr: Box::new(self.unary_expr()?),
                }
            }
            _ => return self.postfix_expr(),
        };
        Ok(Expr {
            kind,
            span: self.since(start),
        })
    }

    fn postfix_expr(&mut self) -> Result<Expr> {
        let start = self.start();
        let mut expr = self.primary_expr()?;
        loop {
            let kind = match self.peek() {
                TokenKind::Dot => {
                    self.bump();
                    let name = self.member_name()?;
                    if self.eat(&TokenKind::OpenParen) {
                        let args = self.args()?;
                        ExprKind::MethodCall {
                            receiver: Box::new(expr),
                            method: name,
                            args,
                        }
                    } else {
                        ExprKind::FieldAccess {
                            target: Box::new(expr),
                            field: name,
                        }
                    }
                }
                TokenKind::RightArrow => {
                    self.bump();
                    let method = self.member_name()?;
                    self.expect(TokenKind::OpenParen, "`(`")?;
                    let args = self.args()?;
                    ExprKind::RemoteCall {
                        receiver: Box::new(expr),
                        method,
                        args,
                    }
                }
                TokenKind::OpenBracket => {
                    self.bump();
                    let index = self.expr()?;
                    self.expect(TokenKind::CloseBracket, "`]`")?;
                    ExprKind::Index {
                        target: Box::new(expr),
                        index: Box::new(index),
                    }
                }
                _ => return Ok(expr),
            };
            expr = Expr {
                kind,
                span: self.since(start),
            };
        }
    }

    fn primary_expr(&mut self) -> Result<Expr> {
        let start = self.start();
        let kind = match self.peek().clone() {
            TokenKind::Int(value) => {
                self.bump();
                ExprKind::Literal(Literal::Int(value))
            }
            TokenKind::Float(value) => {
                self.bump();
                ExprKind::Literal(Literal::Float(value))
            }
            TokenKind::Str(value) => {
                self.bump();
                ExprKind::Literal(Literal::String(value))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.bump();
                ExprKind::Literal(Literal::Bool(true))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.bump();
                ExprKind::Literal(Literal::Bool(false))
            }
            TokenKind::OpenParen => {
                self.bump();
                if self.eat(&TokenKind::CloseParen) {
                    ExprKind::Literal(Literal::Nil)
                } else {
                    let inner = self.expr()?;
                    self.expect(TokenKind::CloseParen, "`)`")?;
                    ExprKind::Paren(Box::new(inner))
                }
            }
            TokenKind::OpenBrace => return self.mapping_constructor(),
            TokenKind::OpenBracket => {
                self.bump();
                ExprKind::List(self.comma_separated(
                    TokenKind::CloseBracket,
                    "`]`",
                    Self::expr,
                )?)
            }
            TokenKind::Keyword(Keyword::New) => {
                self.bump();
                let ty = if matches!(self.peek(), TokenKind::Ident(_)) {
                    Some(self.postfix_type()?)
                } else {
                    None
                };
                let args = if self.eat(&TokenKind::OpenParen) {
                    self.args()?
                } else {
                    Vec::new()
                };
                ExprKind::New { ty, args }
            }
            TokenKind::Keyword(Keyword::Error) if matches!(self.peek_at(1), TokenKind::OpenParen) => {
                let span = self.bump().span;
                self.bump();
                ExprKind::Call {
                    callee: NameRef::simple(Ident::new("error", span)),
                    args: self.args()?,
                }
            }
            TokenKind::Keyword(kw) if builtin_type(kw).is_some() && self.at_qualified() => {
                self.name_or_call()?
            }
            TokenKind::Ident(_) => self.name_or_call()?,
            _ => return Err(self.unexpected("expression")),
        };
        Ok(Expr {
            kind,
            span: self.since(start),
        })
    }

    fn name_or_call(&mut self) -> Result<ExprKind> {
        let name = self.name_ref()?;
        if self.eat(&TokenKind::OpenParen) {
            Ok(ExprKind::Call {
                callee: name,
                args: self.args()?,
            })
        } else {
            Ok(ExprKind::Name(name))
        }
    }

    /// `name` or `prefix:name`. Builtin type keywords may serve as prefixes.
    fn name_ref(&mut self) -> Result<NameRef> {
        let start = self.start();
        if self.at_qualified() {
            let prefix = self.member_name()?;
            self.bump();
            let name = self.ident()?;
            return Ok(NameRef {
                prefix: Some(prefix),
                name,
                span: self.since(start),
            });
        }
        Ok(NameRef::simple(self.ident()?))
    }

    /// Arguments after an already consumed `(`.
    fn args(&mut self) -> Result<Vec<Arg>> {
        self.comma_separated(TokenKind::CloseParen, "`)`", |p| {
            if p.eat(&TokenKind::Ellipsis) {
                return Ok(Arg::Rest(p.expr()?));
            }
            if matches!(p.peek(), TokenKind::Ident(_)) && matches!(p.peek_at(1), TokenKind::Assign)
            {
                let name = p.ident()?;
                p.bump();
                return Ok(Arg::Named {
                    name,
                    value: p.expr()?,
                });
            }
            Ok(Arg::Positional(p.expr()?))
        })
    }

    fn mapping_constructor(&mut self) -> Result<Expr> {
        let start = self.start();
        self.expect(TokenKind::OpenBrace, "`{`")?;
        let fields = self.comma_separated(TokenKind::CloseBrace, "`}`", Self::mapping_field)?;
        Ok(Expr {
            kind: ExprKind::Mapping(fields),
            span: self.since(start),
        })
    }

    fn mapping_field(&mut self) -> Result<MappingField> {
        if self.eat(&TokenKind::Ellipsis) {
            return Ok(MappingField::Spread(self.expr()?));
        }
        let key = match self.peek().clone() {
            TokenKind::Str(value) => {
                let span = self.bump().span;
                MappingKey::String(value, span)
            }
            TokenKind::OpenBracket => {
                self.bump();
                let key = self.expr()?;
                self.expect(TokenKind::CloseBracket, "`]`")?;
                MappingKey::Computed(Box::new(key))
            }
            TokenKind::Ident(_) | TokenKind::Keyword(_) => {
                let name = self.member_name()?;
                if !self.at(&TokenKind::Colon) {
                    return Ok(MappingField::Shorthand(NameRef::simple(name)));
                }
                MappingKey::Ident(name)
            }
            _ => return Err(self.unexpected("mapping field")),
        };
        self.expect(TokenKind::Colon, "`:`")?;
        let value = self.expr()?;
        Ok(MappingField::KeyValue { key, value })
    }
}

fn builtin_type(kw: Keyword) -> Option<BuiltinType> {
    Some(match kw {
        Keyword::Int => BuiltinType::Int,
        Keyword::Float => BuiltinType::Float,
        Keyword::Decimal => BuiltinType::Decimal,
        Keyword::String => BuiltinType::String,
        Keyword::Boolean => BuiltinType::Boolean,
        Keyword::Byte => BuiltinType::Byte,
        Keyword::Anydata => BuiltinType::Anydata,
        Keyword::Any => BuiltinType::Any,
        Keyword::Json => BuiltinType::Json,
        Keyword::Xml => BuiltinType::Xml,
        Keyword::Error => BuiltinType::Error,
        Keyword::Readonly => BuiltinType::Readonly,
        Keyword::Never => BuiltinType::Never,
        Keyword::Handle => BuiltinType::Handle,
        Keyword::Typedesc => BuiltinType::Typedesc,
        _ => return None,
    })
}

fn binary_op(kind: &TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::OrOr => BinaryOp::Or,
        TokenKind::AndAnd => BinaryOp::And,
        TokenKind::EqEq => BinaryOp::Eq,
        TokenKind::NotEq => BinaryOp::NotEq,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::LtEq => BinaryOp::LtEq,
        TokenKind::GtEq => BinaryOp::GtEq,
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Rem,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_function(module: &ModulePart) -> &FunctionDef {
        module
            .members
            .iter()
            .find_map(|m| match m {
                ModuleMember::Function(f) => Some(f),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_parse_import_with_prefix() {
        let module = parse_module("import ballerina/workflow.internal as wi;").unwrap();
        let import = &module.imports[0];
        assert_eq!(import.org.as_ref().unwrap().name, "ballerina");
        assert_eq!(import.module_name(), "workflow.internal");
        assert_eq!(import.effective_prefix(), "wi");
    }

    #[test]
    fn test_parse_annotated_activity_function() {
        let src = r#"
            @workflow:Activity
            isolated function sendEmail(string to, int retries = 3, string... cc) returns error? {
                return;
            }
        "#;
        let module = parse_module(src).unwrap();
        let f = first_function(&module);
        assert_eq!(f.name.name, "sendEmail");
        assert!(f.is_isolated());
        assert_eq!(f.annotations[0].name.as_written(), "workflow:Activity");
        let kinds: Vec<ParamKind> = f.params.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![ParamKind::Required, ParamKind::Defaultable, ParamKind::Rest]
        );
        assert!(matches!(
            f.return_type.as_ref().unwrap().kind,
            TypeDescKind::Optional(_)
        ));
    }

    #[test]
    fn test_parse_service_with_resource_and_remote_methods() {
        let src = r#"
            service "orders" on new workflow:Listener() {
                private int count = 0;
                resource function get orders/[string id]() returns string {
                    return id;
                }
                isolated remote function execute(workflow:Context ctx) returns error? {
                }
            }
        "#;
        let module = parse_module(src).unwrap();
        let ModuleMember::Service(service) = &module.members[0] else {
            panic!("expected service");
        };
        assert_eq!(service.base_path.as_deref(), Some("\"orders\""));
        assert_eq!(service.members.len(), 3);
        let ServiceMember::Method(resource) = &service.members[1] else {
            panic!("expected method");
        };
        assert!(resource.is_resource());
        assert_eq!(resource.name.name, "get");
        assert_eq!(resource.resource_path.as_deref(), Some("orders/[string id]"));
    }

    #[test]
    fn test_var_decl_versus_assignment() {
        let src = r#"
            function f() {
                int x = 1;
                x = 2;
                var y = m1:compute(x);
                total += x;
                foo:bar(x);
                map<int> counts = {a: 1, "b": 2, x};
            }
        "#;
        let module = parse_module(src).unwrap();
        let f = first_function(&module);
        let stmts = &f.body.stmts;
        assert!(matches!(stmts[0].kind, StmtKind::VarDecl(_)));
        assert!(matches!(
            stmts[1].kind,
            StmtKind::Assign {
                op: AssignOp::Assign,
                ..
            }
        ));
        let StmtKind::VarDecl(decl) = &stmts[2].kind else {
            panic!("expected var decl");
        };
        assert!(decl.ty.is_var());
        assert!(matches!(
            decl.init.as_ref().unwrap().kind,
            ExprKind::Call { .. }
        ));
        assert!(matches!(
            stmts[3].kind,
            StmtKind::Assign {
                op: AssignOp::Add,
                ..
            }
        ));
        assert!(matches!(stmts[4].kind, StmtKind::Expr(_)));
        let StmtKind::VarDecl(counts) = &stmts[5].kind else {
            panic!("expected var decl");
        };
        let Some(Expr {
            kind: ExprKind::Mapping(fields),
            ..
        }) = &counts.init
        else {
            panic!("expected mapping");
        };
        let keys: Vec<_> = fields.iter().filter_map(|f| f.static_key()).collect();
        assert_eq!(keys, vec!["a", "b", "x"]);
    }

    #[test]
    fn test_remote_call_with_function_reference_and_mapping() {
        let expr = parse_expr(r#"check ctx->callActivity(sendEmail, {"to": addr})"#).unwrap();
        let ExprKind::Check(inner) = expr.kind else {
            panic!("expected check");
        };
        let ExprKind::RemoteCall { method, args, .. } = inner.kind else {
            panic!("expected remote call");
        };
        assert_eq!(method.name, "callActivity");
        assert_eq!(args.len(), 2);
        assert!(matches!(args[0].expr().kind, ExprKind::Name(_)));
    }

    #[test]
    fn test_qualified_name_requires_adjacency() {
        let expr = parse_expr("flag ? a : b").unwrap();
        assert!(matches!(expr.kind, ExprKind::Conditional { .. }));
        let expr = parse_expr("m1:value").unwrap();
        let ExprKind::Name(name) = expr.kind else {
            panic!("expected name");
        };
        assert_eq!(name.as_written(), "m1:value");
    }

    #[test]
    fn test_binary_precedence() {
        let expr = parse_expr("a + b * c").unwrap();
        let ExprKind::Binary { op, rhs, .. } = expr.kind else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(
            rhs.kind,
            ExprKind::Binary {
                op: BinaryOp::Mul,
                ..
            }
        ));
    }

    #[test]
    fn test_configurable_required_value() {
        let module = parse_module("configurable string apiKey = ?;").unwrap();
        let ModuleMember::Var(var) = &module.members[0] else {
            panic!("expected module var");
        };
        assert!(var.qualifiers.has(Qualifier::Configurable));
        assert!(matches!(var.init.as_ref().unwrap().kind, ExprKind::Required));
    }

    #[test]
    fn test_types() {
        let ty = parse_type("readonly & record {| future<int> approved; string name?; |}").unwrap();
        let TypeDescKind::Intersection(parts) = ty.kind else {
            panic!("expected intersection");
        };
        let TypeDescKind::Record(record) = &parts[1].kind else {
            panic!("expected record");
        };
        assert!(record.closed);
        assert_eq!(record.fields.len(), 2);
        assert!(record.fields[1].optional);
        assert!(matches!(
            parse_type("int[]|error").unwrap().kind,
            TypeDescKind::Union(_)
        ));
    }

    #[test]
    fn test_lock_and_control_flow() {
        let src = r#"
            function f() {
                lock {
                    if counter > 0 {
                        counter -= 1;
                    } else if counter == 0 {
                        return;
                    } else {
                        panic error("negative");
                    }
                }
                foreach int i in items {
                    continue;
                }
                do {
                    fail error("x");
                } on fail error e {
                    break;
                }
            }
        "#;
        let module = parse_module(src).unwrap();
        let f = first_function(&module);
        assert!(matches!(f.body.stmts[0].kind, StmtKind::Lock(_)));
        assert!(matches!(f.body.stmts[1].kind, StmtKind::Foreach { .. }));
        assert!(matches!(
            f.body.stmts[2].kind,
            StmtKind::Do {
                on_fail: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn test_syntax_error_reports_found_token() {
        let err = parse_module("function f( {").unwrap_err();
        let SyntaxError::Unexpected { found, .. } = err else {
            panic!("expected unexpected-token error");
        };
        assert_eq!(found, "`{`");
    }
}
