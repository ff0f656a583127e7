// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Syntax tree traversal.
//!
//! [`Visitor`] walks a tree by shared reference and [`VisitMut`] by mutable
//! reference. Every `visit_*` method defaults to the matching `walk_*`
//! function, which recurses into all children, so implementors override only
//! the nodes they care about and call `walk_*` to keep descending.
//! Annotation tags and type references are not reported as value names.

use crate::ast::*;

/// Read-only syntax tree visitor.
#[allow(missing_docs)]
pub trait Visitor {
    fn visit_module_part(&mut self, module: &ModulePart) {
        walk_module_part(self, module);
    }
    fn visit_member(&mut self, member: &ModuleMember) {
        walk_member(self, member);
    }
    fn visit_function(&mut self, function: &FunctionDef) {
        walk_function(self, function);
    }
    fn visit_service(&mut self, service: &ServiceDecl) {
        walk_service(self, service);
    }
    fn visit_annotation(&mut self, annotation: &Annotation) {
        walk_annotation(self, annotation);
    }
    fn visit_param(&mut self, param: &Param) {
        walk_param(self, param);
    }
    fn visit_type(&mut self, ty: &TypeDesc) {
        walk_type(self, ty);
    }
    fn visit_block(&mut self, block: &Block) {
        walk_block(self, block);
    }
    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }
    fn visit_local_var_decl(&mut self, decl: &LocalVarDecl) {
        walk_local_var_decl(self, decl);
    }
    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }
    fn visit_arg(&mut self, arg: &Arg) {
        walk_arg(self, arg);
    }
    fn visit_mapping_field(&mut self, field: &MappingField) {
        walk_mapping_field(self, field);
    }
    fn visit_name_ref(&mut self, _name: &NameRef) {}
}

/// Visit every member of a module.
pub fn walk_module_part<V: Visitor + ?Sized>(v: &mut V, module: &ModulePart) {
    for member in &module.members {
        v.visit_member(member);
    }
}

/// Visit the children of a module member.
pub fn walk_member<V: Visitor + ?Sized>(v: &mut V, member: &ModuleMember) {
    match member {
        ModuleMember::Function(f) => v.visit_function(f),
        ModuleMember::Service(s) => v.visit_service(s),
        ModuleMember::Var(var) => {
            for a in &var.annotations {
                v.visit_annotation(a);
            }
            v.visit_type(&var.ty);
            if let Some(init) = &var.init {
                v.visit_expr(init);
            }
        }
        ModuleMember::Const(c) => {
            for a in &c.annotations {
                v.visit_annotation(a);
            }
            if let Some(ty) = &c.ty {
                v.visit_type(ty);
            }
            v.visit_expr(&c.value);
        }
        ModuleMember::Type(t) => {
            for a in &t.annotations {
                v.visit_annotation(a);
            }
            v.visit_type(&t.ty);
        }
        ModuleMember::Listener(l) => {
            for a in &l.annotations {
                v.visit_annotation(a);
            }
            if let Some(ty) = &l.ty {
                v.visit_type(ty);
            }
            v.visit_expr(&l.init);
        }
        ModuleMember::Annotation(a) => {
            if let Some(ty) = &a.ty {
                v.visit_type(ty);
            }
        }
    }
}

/// Visit annotations, parameters, return type and body.
pub fn walk_function<V: Visitor + ?Sized>(v: &mut V, function: &FunctionDef) {
    for a in &function.annotations {
        v.visit_annotation(a);
    }
    for param in &function.params {
        v.visit_param(param);
    }
    if let Some(ret) = &function.return_type {
        v.visit_type(ret);
    }
    v.visit_block(&function.body);
}

/// Visit annotations, listeners and members of a service.
pub fn walk_service<V: Visitor + ?Sized>(v: &mut V, service: &ServiceDecl) {
    for a in &service.annotations {
        v.visit_annotation(a);
    }
    if let Some(ty) = &service.type_desc {
        v.visit_type(ty);
    }
    for listener in &service.listeners {
        v.visit_expr(listener);
    }
    for member in &service.members {
        match member {
            ServiceMember::Method(f) => v.visit_function(f),
            ServiceMember::Field(field) => {
                for a in &field.annotations {
                    v.visit_annotation(a);
                }
                v.visit_type(&field.ty);
                if let Some(init) = &field.init {
                    v.visit_expr(init);
                }
            }
        }
    }
}

/// Visit an annotation's value.
pub fn walk_annotation<V: Visitor + ?Sized>(v: &mut V, annotation: &Annotation) {
    if let Some(value) = &annotation.value {
        v.visit_expr(value);
    }
}

/// Visit a parameter's type and default value.
pub fn walk_param<V: Visitor + ?Sized>(v: &mut V, param: &Param) {
    for a in &param.annotations {
        v.visit_annotation(a);
    }
    v.visit_type(&param.ty);
    if let Some(default) = &param.default {
        v.visit_expr(default);
    }
}

/// Visit nested types and record field defaults.
pub fn walk_type<V: Visitor + ?Sized>(v: &mut V, ty: &TypeDesc) {
    match &ty.kind {
        TypeDescKind::Optional(inner)
        | TypeDescKind::Array(inner)
        | TypeDescKind::Map(inner)
        | TypeDescKind::Paren(inner) => v.visit_type(inner),
        TypeDescKind::Future(inner) => {
            if let Some(inner) = inner {
                v.visit_type(inner);
            }
        }
        TypeDescKind::Stream(item, completion) => {
            v.visit_type(item);
            if let Some(completion) = completion {
                v.visit_type(completion);
            }
        }
        TypeDescKind::Union(members) | TypeDescKind::Intersection(members) => {
            for member in members {
                v.visit_type(member);
            }
        }
        TypeDescKind::Function(Some(sig)) => {
            for param in &sig.params {
                v.visit_type(param);
            }
            if let Some(rest) = &sig.rest {
                v.visit_type(rest);
            }
            if let Some(ret) = &sig.return_type {
                v.visit_type(ret);
            }
        }
        TypeDescKind::Record(record) => {
            for field in &record.fields {
                v.visit_type(&field.ty);
                if let Some(default) = &field.default {
                    v.visit_expr(default);
                }
            }
            if let Some(rest) = &record.rest {
                v.visit_type(rest);
            }
        }
        TypeDescKind::Builtin(_)
        | TypeDescKind::Nil
        | TypeDescKind::Var
        | TypeDescKind::Named(_)
        | TypeDescKind::Function(None)
        | TypeDescKind::Singleton(_) => {}
    }
}

/// Visit each statement of a block.
pub fn walk_block<V: Visitor + ?Sized>(v: &mut V, block: &Block) {
    for stmt in &block.stmts {
        v.visit_stmt(stmt);
    }
}

/// Visit the children of a statement.
pub fn walk_stmt<V: Visitor + ?Sized>(v: &mut V, stmt: &Stmt) {
    match &stmt.kind {
        StmtKind::VarDecl(decl) => v.visit_local_var_decl(decl),
        StmtKind::Assign { target, value, .. } => {
            v.visit_expr(target);
            v.visit_expr(value);
        }
        StmtKind::Expr(expr)
        | StmtKind::Panic(expr)
        | StmtKind::Fail(expr)
        | StmtKind::Return(Some(expr)) => v.visit_expr(expr),
        StmtKind::Lock(block) | StmtKind::Block(block) => v.visit_block(block),
        StmtKind::If {
            cond,
            then_block,
            else_branch,
        } => {
            v.visit_expr(cond);
            v.visit_block(then_block);
            if let Some(else_branch) = else_branch {
                v.visit_stmt(else_branch);
            }
        }
        StmtKind::While { cond, body } => {
            v.visit_expr(cond);
            v.visit_block(body);
        }
        StmtKind::Foreach { ty, iter, body, .. } => {
            v.visit_type(ty);
            v.visit_expr(iter);
            v.visit_block(body);
        }
        StmtKind::Do { body, on_fail } => {
            v.visit_block(body);
            if let Some(on_fail) = on_fail {
                v.visit_type(&on_fail.ty);
                v.visit_block(&on_fail.body);
            }
        }
        StmtKind::Return(None) | StmtKind::Break | StmtKind::Continue => {}
    }
}

/// Visit a local declaration's type and initializer.
pub fn walk_local_var_decl<V: Visitor + ?Sized>(v: &mut V, decl: &LocalVarDecl) {
    for a in &decl.annotations {
        v.visit_annotation(a);
    }
    v.visit_type(&decl.ty);
    if let Some(init) = &decl.init {
        v.visit_expr(init);
    }
}

/// Visit the children of an expression. Call targets are reported through
/// [`Visitor::visit_name_ref`] like any other name.
pub fn walk_expr<V: Visitor + ?Sized>(v: &mut V, expr: &Expr) {
    match &expr.kind {
        ExprKind::Literal(_) | ExprKind::Required => {}
        ExprKind::Name(name) => v.visit_name_ref(name),
        ExprKind::Call { callee, args } => {
            v.visit_name_ref(callee);
            for arg in args {
                v.visit_arg(arg);
            }
        }
        ExprKind::MethodCall { receiver, args, .. } | ExprKind::RemoteCall { receiver, args, .. } => {
            v.visit_expr(receiver);
            for arg in args {
                v.visit_arg(arg);
            }
        }
        ExprKind::FieldAccess { target, .. } => v.visit_expr(target),
        ExprKind::Index { target, index } => {
            v.visit_expr(target);
            v.visit_expr(index);
        }
        ExprKind::Mapping(fields) => {
            for field in fields {
                v.visit_mapping_field(field);
            }
        }
        ExprKind::List(items) => {
            for item in items {
                v.visit_expr(item);
            }
        }
        ExprKind::Unary { operand, .. } => v.visit_expr(operand),
        ExprKind::Binary { lhs, rhs, .. } => {
            v.visit_expr(lhs);
            v.visit_expr(rhs);
        }
        ExprKind::TypeTest { expr, ty } => {
            v.visit_expr(expr);
            v.visit_type(ty);
        }
        ExprKind::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            v.visit_expr(cond);
            v.visit_expr(then_expr);
            v.visit_expr(else_expr);
        }
        ExprKind::Check(inner)
        | ExprKind::CheckPanic(inner)
        | ExprKind::Wait(inner)
        | ExprKind::Start(inner)
        | ExprKind::Paren(inner) => v.visit_expr(inner),
        ExprKind::Cast { ty, expr } => {
            v.visit_type(ty);
            v.visit_expr(expr);
        }
        ExprKind::New { ty, args } => {
            if let Some(ty) = ty {
                v.visit_type(ty);
            }
            for arg in args {
                v.visit_arg(arg);
            }
        }
    }
}

/// Visit an argument's value.
pub fn walk_arg<V: Visitor + ?Sized>(v: &mut V, arg: &Arg) {
    v.visit_expr(arg.expr());
}

/// Visit a mapping field's key and value.
pub fn walk_mapping_field<V: Visitor + ?Sized>(v: &mut V, field: &MappingField) {
    match field {
        MappingField::KeyValue { key, value } => {
            if let MappingKey::Computed(key) = key {
                v.visit_expr(key);
            }
            v.visit_expr(value);
        }
        MappingField::Shorthand(name) => v.visit_name_ref(name),
        MappingField::Spread(expr) => v.visit_expr(expr),
    }
}

// ============================================================================
// Mutable traversal
// ============================================================================

/// Mutable syntax tree visitor, used by tree rewriters.
///
/// Descends through members, statements and expressions only; types and
/// annotations are left untouched.
#[allow(missing_docs)]
pub trait VisitMut {
    fn visit_module_part_mut(&mut self, module: &mut ModulePart) {
        walk_module_part_mut(self, module);
    }
    fn visit_member_mut(&mut self, member: &mut ModuleMember) {
        walk_member_mut(self, member);
    }
    fn visit_service_mut(&mut self, service: &mut ServiceDecl) {
        walk_service_mut(self, service);
    }
    fn visit_function_mut(&mut self, function: &mut FunctionDef) {
        walk_function_mut(self, function);
    }
    fn visit_block_mut(&mut self, block: &mut Block) {
        walk_block_mut(self, block);
    }
    fn visit_stmt_mut(&mut self, stmt: &mut Stmt) {
        walk_stmt_mut(self, stmt);
    }
    fn visit_local_var_decl_mut(&mut self, decl: &mut LocalVarDecl) {
        walk_local_var_decl_mut(self, decl);
    }
    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        walk_expr_mut(self, expr);
    }
}

/// Visit every member of a module.
pub fn walk_module_part_mut<V: VisitMut + ?Sized>(v: &mut V, module: &mut ModulePart) {
    for member in &mut module.members {
        v.visit_member_mut(member);
    }
}

/// Visit functions, services and initializers of a member.
pub fn walk_member_mut<V: VisitMut + ?Sized>(v: &mut V, member: &mut ModuleMember) {
    match member {
        ModuleMember::Function(f) => v.visit_function_mut(f),
        ModuleMember::Service(s) => v.visit_service_mut(s),
        ModuleMember::Var(var) => {
            if let Some(init) = &mut var.init {
                v.visit_expr_mut(init);
            }
        }
        ModuleMember::Const(c) => v.visit_expr_mut(&mut c.value),
        ModuleMember::Listener(l) => v.visit_expr_mut(&mut l.init),
        ModuleMember::Type(_) | ModuleMember::Annotation(_) => {}
    }
}

/// Visit listeners and members of a service.
pub fn walk_service_mut<V: VisitMut + ?Sized>(v: &mut V, service: &mut ServiceDecl) {
    for listener in &mut service.listeners {
        v.visit_expr_mut(listener);
    }
    for member in &mut service.members {
        match member {
            ServiceMember::Method(f) => v.visit_function_mut(f),
            ServiceMember::Field(field) => {
                if let Some(init) = &mut field.init {
                    v.visit_expr_mut(init);
                }
            }
        }
    }
}

/// Visit parameter defaults and the body.
pub fn walk_function_mut<V: VisitMut + ?Sized>(v: &mut V, function: &mut FunctionDef) {
    for param in &mut function.params {
        if let Some(default) = &mut param.default {
            v.visit_expr_mut(default);
        }
    }
    v.visit_block_mut(&mut function.body);
}

/// Visit each statement of a block.
pub fn walk_block_mut<V: VisitMut + ?Sized>(v: &mut V, block: &mut Block) {
    for stmt in &mut block.stmts {
        v.visit_stmt_mut(stmt);
    }
}

/// Visit the children of a statement.
pub fn walk_stmt_mut<V: VisitMut + ?Sized>(v: &mut V, stmt: &mut Stmt) {
    match &mut stmt.kind {
        StmtKind::VarDecl(decl) => v.visit_local_var_decl_mut(decl),
        StmtKind::Assign { target, value, .. } => {
            v.visit_expr_mut(target);
            v.visit_expr_mut(value);
        }
        StmtKind::Expr(expr)
        | StmtKind::Panic(expr)
        | StmtKind::Fail(expr)
        | StmtKind::Return(Some(expr)) => v.visit_expr_mut(expr),
        StmtKind::Lock(block) | StmtKind::Block(block) => v.visit_block_mut(block),
        StmtKind::If {
            cond,
            then_block,
            else_branch,
        } => {
            v.visit_expr_mut(cond);
            v.visit_block_mut(then_block);
            if let Some(else_branch) = else_branch {
                v.visit_stmt_mut(else_branch);
            }
        }
        StmtKind::While { cond, body } => {
            v.visit_expr_mut(cond);
            v.visit_block_mut(body);
        }
        StmtKind::Foreach { iter, body, .. } => {
            v.visit_expr_mut(iter);
            v.visit_block_mut(body);
        }
        StmtKind::Do { body, on_fail } => {
            v.visit_block_mut(body);
            if let Some(on_fail) = on_fail {
                v.visit_block_mut(&mut on_fail.body);
            }
        }
        StmtKind::Return(None) | StmtKind::Break | StmtKind::Continue => {}
    }
}

/// Visit a local declaration's initializer.
pub fn walk_local_var_decl_mut<V: VisitMut + ?Sized>(v: &mut V, decl: &mut LocalVarDecl) {
    if let Some(init) = &mut decl.init {
        v.visit_expr_mut(init);
    }
}

/// Visit the sub-expressions of an expression.
pub fn walk_expr_mut<V: VisitMut + ?Sized>(v: &mut V, expr: &mut Expr) {
    match &mut expr.kind {
        ExprKind::Literal(_) | ExprKind::Name(_) | ExprKind::Required => {}
        ExprKind::Call { args, .. } | ExprKind::New { args, .. } => {
            for arg in args {
                walk_arg_mut(v, arg);
            }
        }
        ExprKind::MethodCall { receiver, args, .. } | ExprKind::RemoteCall { receiver, args, .. } => {
            v.visit_expr_mut(receiver);
            for arg in args {
                walk_arg_mut(v, arg);
            }
        }
        ExprKind::FieldAccess { target, .. } => v.visit_expr_mut(target),
        ExprKind::Index { target, index } => {
            v.visit_expr_mut(target);
            v.visit_expr_mut(index);
        }
        ExprKind::Mapping(fields) => {
            for field in fields {
                match field {
                    MappingField::KeyValue { key, value } => {
                        if let MappingKey::Computed(key) = key {
                            v.visit_expr_mut(key);
                        }
                        v.visit_expr_mut(value);
                    }
                    MappingField::Spread(expr) => v.visit_expr_mut(expr),
                    MappingField::Shorthand(_) => {}
                }
            }
        }
        ExprKind::List(items) => {
            for item in items {
                v.visit_expr_mut(item);
            }
        }
        ExprKind::Unary { operand, .. } => v.visit_expr_mut(operand),
        ExprKind::Binary { lhs, rhs, .. } => {
            v.visit_expr_mut(lhs);
            v.visit_expr_mut(rhs);
        }
        ExprKind::TypeTest { expr, .. } => v.visit_expr_mut(expr),
        ExprKind::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            v.visit_expr_mut(cond);
            v.visit_expr_mut(then_expr);
            v.visit_expr_mut(else_expr);
        }
        ExprKind::Check(inner)
        | ExprKind::CheckPanic(inner)
        | ExprKind::Wait(inner)
        | ExprKind::Start(inner)
        | ExprKind::Paren(inner)
        | ExprKind::Cast { expr: inner, .. } => v.visit_expr_mut(inner),
    }
}

fn walk_arg_mut<V: VisitMut + ?Sized>(v: &mut V, arg: &mut Arg) {
    match arg {
        Arg::Positional(expr) | Arg::Rest(expr) => v.visit_expr_mut(expr),
        Arg::Named { value, .. } => v.visit_expr_mut(value),
    }
}
