// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Body rules for workflow entry points.
//!
//! Entry bodies are replayed by the engine, so two patterns are rejected:
//!
//! - touching a mutable `isolated` module variable inside a `lock` block;
//! - binding the result of an activity call to a `var` declaration.
//!
//! Both rules share a single walk. Each keeps its own piece of scope state,
//! saved and restored around the node that introduces it.

use flowbind_syntax::Span;
use flowbind_syntax::ast::{
    Block, Expr, ExprKind, FunctionDef, LocalVarDecl, NameRef, Qualifier, Stmt, StmtKind,
};
use flowbind_syntax::visit::{self, Visitor};

use crate::classify::resolve_activity;
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSet};
use crate::project::Document;
use crate::semantic::{SemanticModel, Symbol};

/// Run the body rules over an entry function or `execute` method.
pub fn analyze_body(
    model: &SemanticModel<'_>,
    doc: &Document,
    function: &FunctionDef,
    out: &mut DiagnosticSet,
) {
    let mut analyzer = BodyAnalyzer {
        model,
        doc,
        out,
        in_lock: false,
        var_type: None,
    };
    analyzer.visit_block(&function.body);
}

/// Flag a reference made inside a `lock` block when it names a module
/// variable that is `isolated` and still mutable.
///
/// Configurable variables are exempt, and so is a `final` variable whose
/// type is read-only.
pub fn check_lock_access(
    model: &SemanticModel<'_>,
    doc: &Document,
    name: &NameRef,
    out: &mut DiagnosticSet,
) {
    let Symbol::ModuleVar(item) = model.symbol(doc.id, name) else {
        return;
    };
    let Some(decl) = model.module_var(item) else {
        return;
    };
    let qualifiers = &decl.qualifiers;
    if !qualifiers.has(Qualifier::Isolated) || qualifiers.has(Qualifier::Configurable) {
        return;
    }
    if qualifiers.has(Qualifier::Final) && model.is_readonly(item.doc, &decl.ty) {
        return;
    }
    out.push(Diagnostic::at(
        DiagnosticKind::MutableGlobalInLock {
            variable: name.as_written(),
        },
        &doc.source,
        name.span,
    ));
}

/// Flag an activity call made while initializing a `var` declaration.
///
/// The diagnostic points at the `var` keyword of the enclosing declaration.
pub fn check_var_binding(
    model: &SemanticModel<'_>,
    doc: &Document,
    var_type: Span,
    callee: &NameRef,
    out: &mut DiagnosticSet,
) {
    if resolve_activity(model, doc.id, callee).is_some() {
        out.push(Diagnostic::at(
            DiagnosticKind::VarBindingActivityCall,
            &doc.source,
            var_type,
        ));
    }
}

struct BodyAnalyzer<'m, 'a> {
    model: &'m SemanticModel<'a>,
    doc: &'m Document,
    out: &'m mut DiagnosticSet,
    in_lock: bool,
    /// Span of the `var` type of the innermost enclosing declaration.
    var_type: Option<Span>,
}

impl BodyAnalyzer<'_, '_> {
    fn locked(&mut self, block: &Block) {
        let saved = self.in_lock;
        self.in_lock = true;
        self.visit_block(block);
        self.in_lock = saved;
    }
}

impl Visitor for BodyAnalyzer<'_, '_> {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Lock(block) => self.locked(block),
            _ => visit::walk_stmt(self, stmt),
        }
    }

    fn visit_local_var_decl(&mut self, decl: &LocalVarDecl) {
        let saved = self.var_type;
        self.var_type = decl.ty.is_var().then_some(decl.ty.span);
        visit::walk_local_var_decl(self, decl);
        self.var_type = saved;
    }

    fn visit_expr(&mut self, expr: &Expr) {
        if let ExprKind::Call { callee, .. } = &expr.kind
            && let Some(var_type) = self.var_type
        {
            check_var_binding(self.model, self.doc, var_type, callee, self.out);
        }
        visit::walk_expr(self, expr);
    }

    fn visit_name_ref(&mut self, name: &NameRef) {
        if self.in_lock {
            check_lock_access(self.model, self.doc, name, self.out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::AnalyzerOptions;
    use crate::project::Package;
    use flowbind_syntax::ast::ModuleMember;

    const PRELUDE: &str = r#"import ballerina/workflow;

isolated int counter = 0;
isolated final string[] & readonly NAMES = ["a"];
isolated final int[] buckets = [];
configurable int limit = ?;
int plain = 0;

@workflow:Activity
function fetch(int id) returns string|error {
    return "x";
}

function helper() returns string {
    return "";
}
"#;

    fn analyze(process: &str) -> DiagnosticSet {
        let source = format!("{}\n{}", PRELUDE, process);
        let package = Package::from_sources("acme", "orders", [("main.wf", source)]).unwrap();
        let options = AnalyzerOptions::default();
        let model = SemanticModel::build(&package, &options);
        let doc = package.documents().next().unwrap();
        let mut out = DiagnosticSet::new();
        for member in &doc.tree.members {
            if let ModuleMember::Function(f) = member
                && f.name.name == "run"
            {
                analyze_body(&model, doc, f, &mut out);
            }
        }
        out
    }

    #[test]
    fn test_mutable_isolated_in_lock() {
        let out = analyze(
            r#"
function run() {
    lock {
        counter += 1;
        string first = NAMES[0];
        int n = buckets.length();
        int l = limit;
        int p = plain;
    }
    int outside = counter;
}
"#,
        );
        assert_eq!(out.codes(), vec!["WORKFLOW_108", "WORKFLOW_108"]);
        let messages: Vec<String> = out.iter().map(|d| d.message()).collect();
        assert!(messages[0].contains("counter"));
        assert!(messages[1].contains("buckets"));
    }

    #[test]
    fn test_nested_lock_restores_state() {
        let out = analyze(
            r#"
function run() {
    lock {
        lock {
            int a = 1;
        }
        counter = 2;
    }
    counter = 3;
}
"#,
        );
        assert_eq!(out.codes(), vec!["WORKFLOW_108"]);
    }

    #[test]
    fn test_local_shadowing_is_not_flagged() {
        let out = analyze(
            r#"
function run(int counter) {
    lock {
        int x = counter;
    }
}
"#,
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_var_binding_of_activity_call() {
        let out = analyze(
            r#"
function run() {
    var a = fetch(1);
    var b = helper();
    string c = check fetch(2);
    var d = check fetch(3);
}
"#,
        );
        assert_eq!(out.codes(), vec!["WORKFLOW_109", "WORKFLOW_109"]);
        let columns: Vec<(usize, usize)> = out
            .iter()
            .map(|d| (d.location.line, d.location.column))
            .collect();
        let run_line = PRELUDE.lines().count() + 4;
        assert_eq!(columns, vec![(run_line, 5), (run_line + 3, 5)]);
    }
}
