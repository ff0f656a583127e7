// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Activity call sites inside entry bodies.
//!
//! Processes invoke activities through the context:
//!
//! ```text
//! string name = check ctx->callActivity(fetchName, {"id": id});
//! ```
//!
//! The first argument must name an `@workflow:Activity` function and the
//! keys of the mapping argument must match its parameter names. Calling the
//! activity directly, `fetchName(id)`, bypasses the engine and is rejected.

use std::collections::HashSet;

use flowbind_syntax::ast::{Arg, Expr, ExprKind, FunctionDef, MappingField, ParamKind};
use flowbind_syntax::{Span, print_expr};
use flowbind_syntax::visit::{self, Visitor};
use tracing::debug;

use crate::classify::resolve_activity;
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSet};
use crate::project::Document;
use crate::semantic::SemanticModel;

/// Check every `->callActivity(...)` in a function body.
pub fn validate_mediated_calls(
    model: &SemanticModel<'_>,
    doc: &Document,
    function: &FunctionDef,
    out: &mut DiagnosticSet,
) {
    let mut validator = MediatedCalls { model, doc, out };
    validator.visit_block(&function.body);
}

/// Report every direct call of an activity in a function body, including
/// calls nested in the arguments of other calls.
pub fn validate_direct_calls(
    model: &SemanticModel<'_>,
    doc: &Document,
    function: &FunctionDef,
    out: &mut DiagnosticSet,
) {
    let mut validator = DirectCalls { model, doc, out };
    validator.visit_block(&function.body);
}

// ============================================================================
// Mediated calls
// ============================================================================

struct MediatedCalls<'m, 'a> {
    model: &'m SemanticModel<'a>,
    doc: &'m Document,
    out: &'m mut DiagnosticSet,
}

impl MediatedCalls<'_, '_> {
    fn check_call(&mut self, method_span: Span, args: &[Arg]) {
        let Some(Arg::Positional(target)) = args.first() else {
            return;
        };

        let activity = match &target.unparenthesized().kind {
            ExprKind::Name(name) => resolve_activity(self.model, self.doc.id, name),
            _ => None,
        };
        let Some((_, activity)) = activity else {
            self.push(
                DiagnosticKind::MissingActivityAnnotation {
                    target: print_expr(target),
                },
                method_span,
            );
            return;
        };

        if let Some(params) = args.get(1) {
            self.check_params(activity, target, params);
        }
    }

    fn check_params(&mut self, activity: &FunctionDef, target: &Expr, params: &Arg) {
        let name = print_expr(target);
        if activity.params.iter().any(|p| p.kind == ParamKind::Rest) {
            self.push(
                DiagnosticKind::RestParamsUnsupported { activity: name },
                target.span,
            );
            return;
        }

        let span = params.expr().span;
        let fields = match (params, &params.expr().unparenthesized().kind) {
            (Arg::Positional(_), ExprKind::Mapping(fields)) => fields,
            _ => {
                debug!(activity = %name, "Activity arguments are not a mapping literal");
                self.push(DiagnosticKind::UncheckedActivityArgs, span);
                return;
            }
        };

        let mut provided: Vec<&str> = Vec::new();
        for key in fields.iter().filter_map(MappingField::static_key) {
            if !provided.contains(&key) {
                provided.push(key);
            }
        }
        // Spreads and computed keys may supply any name; only extras can be judged.
        let complete = fields.iter().all(|f| f.static_key().is_some());

        if complete {
            for param in &activity.params {
                if param.kind == ParamKind::Required && !provided.contains(&param.name.name.as_str()) {
                    self.push(
                        DiagnosticKind::MissingActivityParam {
                            activity: name.clone(),
                            param: param.name.name.clone(),
                        },
                        span,
                    );
                }
            }
        }

        let declared: HashSet<&str> = activity.params.iter().map(|p| p.name.name.as_str()).collect();
        for key in provided {
            if !declared.contains(key) {
                self.push(
                    DiagnosticKind::ExtraActivityParam {
                        activity: name.clone(),
                        param: key.to_string(),
                    },
                    span,
                );
            }
        }
    }

    fn push(&mut self, kind: DiagnosticKind, span: Span) {
        self.out.push(Diagnostic::at(kind, &self.doc.source, span));
    }
}

impl Visitor for MediatedCalls<'_, '_> {
    fn visit_expr(&mut self, expr: &Expr) {
        if let ExprKind::RemoteCall { method, args, .. } = &expr.kind
            && method.name == self.model.options().dispatch_method
        {
            self.check_call(method.span, args);
        }
        visit::walk_expr(self, expr);
    }
}

// ============================================================================
// Direct calls
// ============================================================================

struct DirectCalls<'m, 'a> {
    model: &'m SemanticModel<'a>,
    doc: &'m Document,
    out: &'m mut DiagnosticSet,
}

impl Visitor for DirectCalls<'_, '_> {
    fn visit_expr(&mut self, expr: &Expr) {
        if let ExprKind::Call { callee, .. } = &expr.kind
            && resolve_activity(self.model, self.doc.id, callee).is_some()
        {
            self.out.push(Diagnostic::at(
                DiagnosticKind::DirectActivityCall {
                    activity: callee.as_written(),
                },
                &self.doc.source,
                callee.span,
            ));
        }
        visit::walk_expr(self, expr);
    }
}
