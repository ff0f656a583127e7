// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Signature contracts of activity and process functions.
//!
//! A process takes an optional ordered triple `(Context, Input, Events)`:
//!
//! ```text
//! function p()                                     returns R|error
//! function p(workflow:Context ctx)                 returns R|error
//! function p(workflow:Context ctx, Input input)    returns R|error
//! function p(Input input, Events events)           returns R|error
//! function p(workflow:Context ctx, Input input, Events events) returns R|error
//! ```
//!
//! where `Input` is anydata and `Events` is a record of `future<anydata>`
//! fields. Parameter checking stops at the first offending parameter since
//! later positions are meaningless once the order is broken; the return
//! type is always checked.

use flowbind_syntax::ast::{FunctionDef, Param, TypeDescKind};
use tracing::debug;

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSet};
use crate::project::Document;
use crate::semantic::SemanticModel;

/// Maximum number of process parameters: context, input and events.
pub const MAX_PROCESS_PARAMS: usize = 3;

/// Check an `@workflow:Activity` function.
///
/// Reports every non-anydata parameter at that parameter and a bad return
/// type at the return type.
pub fn validate_activity(
    model: &SemanticModel<'_>,
    doc: &Document,
    function: &FunctionDef,
    out: &mut DiagnosticSet,
) {
    for param in &function.params {
        if !model.is_anydata(doc.id, &param.ty) {
            out.push(Diagnostic::at(
                DiagnosticKind::ActivityParamNotAnydata,
                &doc.source,
                param.span,
            ));
        }
    }
    if let Some(ret) = &function.return_type
        && !model.is_subtype_of_anydata_or_error(doc.id, ret)
    {
        out.push(Diagnostic::at(
            DiagnosticKind::ActivityReturnType,
            &doc.source,
            ret.span,
        ));
    }
}

/// Check an `@workflow:Process` function.
pub fn validate_process(
    model: &SemanticModel<'_>,
    doc: &Document,
    function: &FunctionDef,
    out: &mut DiagnosticSet,
) {
    validate_process_params(model, doc, function, out);

    if let Some(ret) = &function.return_type
        && !model.is_subtype_of_anydata_or_error(doc.id, ret)
    {
        out.push(Diagnostic::at(
            DiagnosticKind::ProcessReturnType,
            &doc.source,
            ret.span,
        ));
    }
}

fn validate_process_params(
    model: &SemanticModel<'_>,
    doc: &Document,
    function: &FunctionDef,
    out: &mut DiagnosticSet,
) {
    let params = &function.params;
    let report = |out: &mut DiagnosticSet, kind, param: &Param| {
        debug!(function = %function.name.name, param = %param.name.name, "Invalid process parameter");
        out.push(Diagnostic::at(kind, &doc.source, param.span));
    };

    if params.len() > MAX_PROCESS_PARAMS {
        out.push(Diagnostic::at(
            DiagnosticKind::TooManyProcessParams,
            &doc.source,
            function.name.span,
        ));
        return;
    }

    let mut rest = params.as_slice();
    if let Some(first) = params.first() {
        if model.is_framework_context(doc.id, &first.ty) {
            rest = &params[1..];
        } else if looks_like_context(first) {
            report(out, DiagnosticKind::InvalidContextParam, first);
            return;
        }
    }

    let mut has_input = false;
    let mut has_events = false;
    for param in rest {
        if has_input {
            if !model.is_events_record(doc.id, &param.ty) {
                report(out, DiagnosticKind::InvalidEventsParam, param);
                return;
            }
            if has_events {
                report(out, DiagnosticKind::TooManyProcessParams, param);
                return;
            }
            has_events = true;
        } else if model.is_events_record(doc.id, &param.ty) {
            if has_events {
                report(out, DiagnosticKind::TooManyProcessParams, param);
                return;
            }
            has_events = true;
        } else if model.is_anydata(doc.id, &param.ty) {
            if has_events {
                report(out, DiagnosticKind::InputAfterEvents, param);
                return;
            }
            has_input = true;
        } else {
            report(out, DiagnosticKind::ProcessInputNotAnydata, param);
            return;
        }
    }
}

/// A first parameter meant as the context but typed otherwise: named `ctx`
/// or `context`, or typed by some other `Context`.
fn looks_like_context(param: &Param) -> bool {
    let named_like = matches!(param.name.name.as_str(), "ctx" | "context");
    let typed_like = matches!(&param.ty.kind, TypeDescKind::Named(name) if name.name.name == "Context");
    named_like || typed_like
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::AnalyzerOptions;
    use crate::project::Package;
    use flowbind_syntax::ast::ModuleMember;

    fn check(source: &str, validate: fn(&SemanticModel<'_>, &Document, &FunctionDef, &mut DiagnosticSet)) -> DiagnosticSet {
        let source = format!(
            "import ballerina/workflow;\ntype Events record {{| future<string> approval; |}};\n{}",
            source
        );
        let package = Package::from_sources("acme", "orders", [("main.wf", source)]).unwrap();
        let options = AnalyzerOptions::default();
        let model = SemanticModel::build(&package, &options);
        let doc = package.documents().next().unwrap();
        let mut out = DiagnosticSet::new();
        for member in &doc.tree.members {
            if let ModuleMember::Function(f) = member {
                validate(&model, doc, f, &mut out);
            }
        }
        out
    }

    #[test]
    fn test_activity_reports_each_bad_param() {
        let out = check(
            "function a(int ok, function () f, stream<int> s) returns string|error { return \"\"; }",
            validate_activity,
        );
        assert_eq!(out.codes(), vec!["WORKFLOW_107", "WORKFLOW_107"]);
        let columns: Vec<usize> = out.iter().map(|d| d.location.column).collect();
        assert_eq!(columns, vec![20, 35]);
    }

    #[test]
    fn test_activity_return_type() {
        let out = check("function a() returns future<int> { }", validate_activity);
        assert_eq!(out.codes(), vec!["WORKFLOW_110"]);
        assert_eq!(out.iter().next().unwrap().location.line, 3);
    }

    #[test]
    fn test_valid_process_shapes() {
        let out = check(
            r#"
            function p1() returns error? { }
            function p2(workflow:Context ctx) returns string|error { return ""; }
            function p3(workflow:Context ctx, int input) returns int { return input; }
            function p4(int input, Events events) { }
            function p5(workflow:Context ctx, json input, Events events) returns error? { }
            function p6(Events events) { }
            "#,
            validate_process,
        );
        assert!(out.is_empty(), "{:?}", out.codes());
    }

    #[test]
    fn test_too_many_params_is_single_diagnostic() {
        let out = check(
            "function p(workflow:Context ctx, int a, int b, Events e) returns any { }",
            validate_process,
        );
        // Return type is still checked.
        assert_eq!(out.codes(), vec!["WORKFLOW_115", "WORKFLOW_116"]);
    }

    #[test]
    fn test_near_miss_context() {
        let out = check("function p(string ctx, int input) { }", validate_process);
        assert_eq!(out.codes(), vec!["WORKFLOW_111"]);
    }

    #[test]
    fn test_input_after_events() {
        let out = check("function p(Events events, int input) { }", validate_process);
        assert_eq!(out.codes(), vec!["WORKFLOW_113"]);
    }

    #[test]
    fn test_events_must_be_future_record() {
        let out = check(
            "function p(int input, record {| future<int> a; string b; |} events) { }",
            validate_process,
        );
        assert_eq!(out.codes(), vec!["WORKFLOW_114"]);
    }

    #[test]
    fn test_non_anydata_input() {
        let out = check("function p(workflow:Context ctx, any input) { }", validate_process);
        assert_eq!(out.codes(), vec!["WORKFLOW_112"]);
    }

    #[test]
    fn test_duplicate_events() {
        let out = check("function p(Events a, Events b) { }", validate_process);
        assert_eq!(out.codes(), vec!["WORKFLOW_115"]);
    }
}
