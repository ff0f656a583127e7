// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Renders a syntax tree back into source text.
//!
//! Output is deterministic: four-space indentation, one member per
//! paragraph and a blank line between the import list and the members.
//! Comments and original formatting are not preserved.

use crate::ast::*;

const INDENT: &str = "    ";

/// Render a module part.
pub fn print_module(module: &ModulePart) -> String {
    let mut printer = Printer::default();
    printer.module_part(module);
    printer.out
}

/// Render a single expression.
pub fn print_expr(expr: &Expr) -> String {
    let mut printer = Printer::default();
    printer.expr(expr);
    printer.out
}

/// Render a type descriptor.
pub fn print_type(ty: &TypeDesc) -> String {
    let mut printer = Printer::default();
    printer.type_desc(ty);
    printer.out
}

/// Render an annotation, `@` through its value.
pub fn print_annotation(annotation: &Annotation) -> String {
    let mut printer = Printer::default();
    printer.annotation(annotation);
    printer.out
}

/// Render an import declaration including its `;`.
pub fn print_import(import: &ImportDecl) -> String {
    let mut printer = Printer::default();
    printer.import(import);
    printer.out
}

/// Quote a string literal, escaping as the lexer expects.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

#[derive(Default)]
struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn write(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn newline(&mut self) {
        self.out.push('\n');
        for _ in 0..self.indent {
            self.out.push_str(INDENT);
        }
    }

    fn separated<T>(&mut self, items: &[T], sep: &str, mut f: impl FnMut(&mut Self, &T)) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.write(sep);
            }
            f(self, item);
        }
    }

    fn module_part(&mut self, module: &ModulePart) {
        for import in &module.imports {
            self.import(import);
            self.write("\n");
        }
        for (i, member) in module.members.iter().enumerate() {
            if i > 0 || !module.imports.is_empty() {
                self.write("\n");
            }
            self.member(member);
            self.write("\n");
        }
    }

    fn import(&mut self, import: &ImportDecl) {
        self.write("import ");
        if let Some(org) = &import.org {
            self.write(&org.name);
            self.write("/");
        }
        self.write(&import.module_name());
        if let Some(prefix) = &import.prefix {
            self.write(" as ");
            self.write(&prefix.name);
        }
        self.write(";");
    }

    fn annotations(&mut self, annotations: &[Annotation]) {
        for annotation in annotations {
            self.annotation(annotation);
            self.newline();
        }
    }

    fn annotation(&mut self, annotation: &Annotation) {
        self.write("@");
        self.write(&annotation.name.as_written());
        if let Some(value) = &annotation.value {
            self.write(" ");
            self.expr(value);
        }
    }

    fn qualifiers(&mut self, qualifiers: &Qualifiers) {
        for q in qualifiers.iter() {
            self.write(q.as_str());
            self.write(" ");
        }
    }

    fn member(&mut self, member: &ModuleMember) {
        match member {
            ModuleMember::Function(f) => self.function(f),
            ModuleMember::Service(s) => self.service(s),
            ModuleMember::Var(v) => {
                self.annotations(&v.annotations);
                self.qualifiers(&v.qualifiers);
                self.type_desc(&v.ty);
                self.write(" ");
                self.write(&v.name.name);
                if let Some(init) = &v.init {
                    self.write(" = ");
                    self.expr(init);
                }
                self.write(";");
            }
            ModuleMember::Const(c) => {
                self.annotations(&c.annotations);
                self.qualifiers(&c.qualifiers);
                self.write("const ");
                if let Some(ty) = &c.ty {
                    self.type_desc(ty);
                    self.write(" ");
                }
                self.write(&c.name.name);
                self.write(" = ");
                self.expr(&c.value);
                self.write(";");
            }
            ModuleMember::Type(t) => {
                self.annotations(&t.annotations);
                self.qualifiers(&t.qualifiers);
                self.write("type ");
                self.write(&t.name.name);
                self.write(" ");
                self.type_desc(&t.ty);
                self.write(";");
            }
            ModuleMember::Listener(l) => {
                self.annotations(&l.annotations);
                self.qualifiers(&l.qualifiers);
                self.write("listener ");
                if let Some(ty) = &l.ty {
                    self.type_desc(ty);
                    self.write(" ");
                }
                self.write(&l.name.name);
                self.write(" = ");
                self.expr(&l.init);
                self.write(";");
            }
            ModuleMember::Annotation(a) => {
                self.qualifiers(&a.qualifiers);
                self.write("annotation ");
                if let Some(ty) = &a.ty {
                    self.type_desc(ty);
                    self.write(" ");
                }
                self.write(&a.name.name);
                if !a.attach_points.is_empty() {
                    self.write(" on ");
                    self.write(&a.attach_points.join(", "));
                }
                self.write(";");
            }
        }
    }

    fn function(&mut self, f: &FunctionDef) {
        self.annotations(&f.annotations);
        self.qualifiers(&f.qualifiers);
        self.write("function ");
        self.write(&f.name.name);
        if let Some(path) = &f.resource_path {
            self.write(" ");
            self.write(path);
        }
        self.write("(");
        self.separated(&f.params, ", ", Self::param);
        self.write(")");
        if let Some(ret) = &f.return_type {
            self.write(" returns ");
            self.type_desc(ret);
        }
        self.write(" ");
        self.block(&f.body);
    }

    fn param(&mut self, param: &Param) {
        for annotation in &param.annotations {
            self.annotation(annotation);
            self.write(" ");
        }
        self.type_desc(&param.ty);
        if param.kind == ParamKind::Rest {
            self.write("...");
        }
        self.write(" ");
        self.write(&param.name.name);
        if let Some(default) = &param.default {
            self.write(" = ");
            self.expr(default);
        }
    }

    fn service(&mut self, s: &ServiceDecl) {
        self.annotations(&s.annotations);
        self.qualifiers(&s.qualifiers);
        self.write("service ");
        if let Some(ty) = &s.type_desc {
            self.type_desc(ty);
            self.write(" ");
        }
        if let Some(path) = &s.base_path {
            self.write(path);
            self.write(" ");
        }
        self.write("on ");
        self.separated(&s.listeners, ", ", Self::expr);
        self.write(" {");
        self.indent += 1;
        for (i, member) in s.members.iter().enumerate() {
            if i > 0 {
                self.write("\n");
            }
            self.newline();
            match member {
                ServiceMember::Method(f) => self.function(f),
                ServiceMember::Field(field) => {
                    self.annotations(&field.annotations);
                    self.qualifiers(&field.qualifiers);
                    self.type_desc(&field.ty);
                    self.write(" ");
                    self.write(&field.name.name);
                    if let Some(init) = &field.init {
                        self.write(" = ");
                        self.expr(init);
                    }
                    self.write(";");
                }
            }
        }
        self.indent -= 1;
        self.newline();
        self.write("}");
    }

    // ========================================================================
    // Types
    // ========================================================================

    fn type_desc(&mut self, ty: &TypeDesc) {
        match &ty.kind {
            TypeDescKind::Builtin(builtin) => self.write(builtin.as_str()),
            TypeDescKind::Nil => self.write("()"),
            TypeDescKind::Var => self.write("var"),
            TypeDescKind::Named(name) => self.write(&name.as_written()),
            TypeDescKind::Optional(inner) => {
                self.type_desc(inner);
                self.write("?");
            }
            TypeDescKind::Array(inner) => {
                self.type_desc(inner);
                self.write("[]");
            }
            TypeDescKind::Union(members) => self.separated(members, "|", Self::type_desc),
            TypeDescKind::Intersection(members) => {
                self.separated(members, " & ", Self::type_desc)
            }
            TypeDescKind::Map(inner) => {
                self.write("map<");
                self.type_desc(inner);
                self.write(">");
            }
            TypeDescKind::Future(inner) => {
                self.write("future");
                if let Some(inner) = inner {
                    self.write("<");
                    self.type_desc(inner);
                    self.write(">");
                }
            }
            TypeDescKind::Stream(item, completion) => {
                self.write("stream<");
                self.type_desc(item);
                if let Some(completion) = completion {
                    self.write(", ");
                    self.type_desc(completion);
                }
                self.write(">");
            }
            TypeDescKind::Function(sig) => {
                self.write("function");
                if let Some(sig) = sig {
                    self.write(" (");
                    self.separated(&sig.params, ", ", Self::type_desc);
                    if let Some(rest) = &sig.rest {
                        if !sig.params.is_empty() {
                            self.write(", ");
                        }
                        self.type_desc(rest);
                        self.write("...");
                    }
                    self.write(")");
                    if let Some(ret) = &sig.return_type {
                        self.write(" returns ");
                        self.type_desc(ret);
                    }
                }
            }
            TypeDescKind::Record(record) => {
                self.write(if record.closed { "record {|" } else { "record {" });
                for field in &record.fields {
                    self.write(" ");
                    if field.readonly {
                        self.write("readonly ");
                    }
                    self.type_desc(&field.ty);
                    self.write(" ");
                    self.write(&field.name.name);
                    if field.optional {
                        self.write("?");
                    }
                    if let Some(default) = &field.default {
                        self.write(" = ");
                        self.expr(default);
                    }
                    self.write(";");
                }
                if let Some(rest) = &record.rest {
                    self.write(" ");
                    self.type_desc(rest);
                    self.write("...;");
                }
                self.write(if record.closed { " |}" } else { " }" });
            }
            TypeDescKind::Singleton(literal) => self.literal(literal),
            TypeDescKind::Paren(inner) => {
                self.write("(");
                self.type_desc(inner);
                self.write(")");
            }
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn block(&mut self, block: &Block) {
        self.write("{");
        self.indent += 1;
        for stmt in &block.stmts {
            self.newline();
            self.stmt(stmt);
        }
        self.indent -= 1;
        self.newline();
        self.write("}");
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::VarDecl(decl) => {
                for annotation in &decl.annotations {
                    self.annotation(annotation);
                    self.write(" ");
                }
                if decl.is_final {
                    self.write("final ");
                }
                self.type_desc(&decl.ty);
                self.write(" ");
                self.write(&decl.name.name);
                if let Some(init) = &decl.init {
                    self.write(" = ");
                    self.expr(init);
                }
                self.write(";");
            }
            StmtKind::Assign { target, op, value } => {
                self.expr(target);
                self.write(" ");
                self.write(op.as_str());
                self.write(" ");
                self.expr(value);
                self.write(";");
            }
            StmtKind::Expr(expr) => {
                self.expr(expr);
                self.write(";");
            }
            StmtKind::Lock(body) => {
                self.write("lock ");
                self.block(body);
            }
            StmtKind::If {
                cond,
                then_block,
                else_branch,
            } => {
                self.write("if ");
                self.expr(cond);
                self.write(" ");
                self.block(then_block);
                if let Some(else_branch) = else_branch {
                    self.write(" else ");
                    self.stmt(else_branch);
                }
            }
            StmtKind::While { cond, body } => {
                self.write("while ");
                self.expr(cond);
                self.write(" ");
                self.block(body);
            }
            StmtKind::Foreach {
                ty,
                name,
                iter,
                body,
            } => {
                self.write("foreach ");
                self.type_desc(ty);
                self.write(" ");
                self.write(&name.name);
                self.write(" in ");
                self.expr(iter);
                self.write(" ");
                self.block(body);
            }
            StmtKind::Return(value) => match value {
                Some(value) => {
                    self.write("return ");
                    self.expr(value);
                    self.write(";");
                }
                None => self.write("return;"),
            },
            StmtKind::Do { body, on_fail } => {
                self.write("do ");
                self.block(body);
                if let Some(on_fail) = on_fail {
                    self.write(" on fail ");
                    self.type_desc(&on_fail.ty);
                    self.write(" ");
                    self.write(&on_fail.name.name);
                    self.write(" ");
                    self.block(&on_fail.body);
                }
            }
            StmtKind::Block(block) => self.block(block),
            StmtKind::Panic(value) => {
                self.write("panic ");
                self.expr(value);
                self.write(";");
            }
            StmtKind::Fail(value) => {
                self.write("fail ");
                self.expr(value);
                self.write(";");
            }
            StmtKind::Break => self.write("break;"),
            StmtKind::Continue => self.write("continue;"),
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn literal(&mut self, literal: &Literal) {
        match literal {
            Literal::Nil => self.write("()"),
            Literal::Bool(value) => self.write(if *value { "true" } else { "false" }),
            Literal::Int(text) | Literal::Float(text) => self.write(text),
            Literal::String(value) => self.write(&quote(value)),
        }
    }

    fn args(&mut self, args: &[Arg]) {
        self.write("(");
        self.separated(args, ", ", |p, arg| match arg {
            Arg::Positional(expr) => p.expr(expr),
            Arg::Named { name, value } => {
                p.write(&name.name);
                p.write(" = ");
                p.expr(value);
            }
            Arg::Rest(expr) => {
                p.write("...");
                p.expr(expr);
            }
        });
        self.write(")");
    }

    fn mapping_field(&mut self, field: &MappingField) {
        match field {
            MappingField::KeyValue { key, value } => {
                match key {
                    MappingKey::Ident(ident) => self.write(&ident.name),
                    MappingKey::String(text, _) => self.write(&quote(text)),
                    MappingKey::Computed(expr) => {
                        self.write("[");
                        self.expr(expr);
                        self.write("]");
                    }
                }
                self.write(": ");
                self.expr(value);
            }
            MappingField::Shorthand(name) => self.write(&name.as_written()),
            MappingField::Spread(expr) => {
                self.write("...");
                self.expr(expr);
            }
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Literal(literal) => self.literal(literal),
            ExprKind::Name(name) => self.write(&name.as_written()),
            ExprKind::Call { callee, args } => {
                self.write(&callee.as_written());
                self.args(args);
            }
            ExprKind::MethodCall {
                receiver,
                method,
                args,
            } => {
                self.expr(receiver);
                self.write(".");
                self.write(&method.name);
                self.args(args);
            }
            ExprKind::RemoteCall {
                receiver,
                method,
                args,
            } => {
                self.expr(receiver);
                self.write("->");
                self.write(&method.name);
                self.args(args);
            }
            ExprKind::FieldAccess { target, field } => {
                self.expr(target);
                self.write(".");
                self.write(&field.name);
            }
            ExprKind::Index { target, index } => {
                self.expr(target);
                self.write("[");
                self.expr(index);
                self.write("]");
            }
            ExprKind::Mapping(fields) => {
                self.write("{");
                self.separated(fields, ", ", Self::mapping_field);
                self.write("}");
            }
            ExprKind::List(items) => {
                self.write("[");
                self.separated(items, ", ", Self::expr);
                self.write("]");
            }
            ExprKind::Unary { op, operand } => {
                self.write(op.as_str());
                self.expr(operand);
            }
            ExprKind::Binary { op, lhs, rhs } => {
                self.expr(lhs);
                self.write(" ");
                self.write(op.as_str());
                self.write(" ");
                self.expr(rhs);
            }
            ExprKind::TypeTest { expr, ty } => {
                self.expr(expr);
                self.write(" is ");
                self.type_desc(ty);
            }
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                self.expr(cond);
                self.write(" ? ");
                self.expr(then_expr);
                self.write(" : ");
                self.expr(else_expr);
            }
            ExprKind::Check(inner) => {
                self.write("check ");
                self.expr(inner);
            }
            ExprKind::CheckPanic(inner) => {
                self.write("checkpanic ");
                self.expr(inner);
            }
            ExprKind::Cast { ty, expr } => {
                self.write("<");
                self.type_desc(ty);
                self.write(">");
                self.expr(expr);
            }
            ExprKind::New { ty, args } => {
                self.write("new");
                if let Some(ty) = ty {
                    self.write(" ");
                    self.type_desc(ty);
                } else {
                    self.write(" ");
                }
                self.args(args);
            }
            ExprKind::Wait(inner) => {
                self.write("wait ");
                self.expr(inner);
            }
            ExprKind::Start(inner) => {
                self.write("start ");
                self.expr(inner);
            }
            ExprKind::Paren(inner) => {
                self.write("(");
                self.expr(inner);
                self.write(")");
            }
            ExprKind::Required => self.write("?"),
        }
    }
}
