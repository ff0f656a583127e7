// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Contract of workflow services.
//!
//! A workflow service is a service attached to the framework listener. Its
//! remote methods form the workflow's external surface:
//!
//! - exactly one remote `execute` method runs the workflow;
//! - every other remote method is a `@workflow:Signal` or `@workflow:Query`;
//! - all remote methods are `isolated` and take anydata parameters;
//! - query methods return `anydata|error`, every other remote method `error?`;
//! - resource methods are not allowed.

use flowbind_syntax::ast::{FunctionDef, ServiceDecl, ServiceMember};
use tracing::debug;

use crate::classify::{Role, classify_function};
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSet};
use crate::project::Document;
use crate::semantic::SemanticModel;

/// Check a workflow service and return its entry methods.
///
/// More than one entry method is reported, but all of them are returned so
/// their bodies are still analyzed.
pub fn validate_service<'t>(
    model: &SemanticModel<'_>,
    doc: &Document,
    service: &'t ServiceDecl,
    out: &mut DiagnosticSet,
) -> Vec<&'t FunctionDef> {
    let entry_name = &model.options().entry_method;
    let mut entries = Vec::new();

    for member in &service.members {
        let ServiceMember::Method(method) = member else {
            continue;
        };
        if method.is_resource() {
            out.push(Diagnostic::at(
                DiagnosticKind::ResourceMethodNotAllowed,
                &doc.source,
                method.span,
            ));
            continue;
        }
        if !method.is_remote() {
            continue;
        }

        let role = classify_function(model, doc.id, method);
        if &method.name.name == entry_name {
            if !entries.is_empty() {
                out.push(Diagnostic::at(
                    DiagnosticKind::DuplicateExecuteMethod,
                    &doc.source,
                    method.name.span,
                ));
            }
            entries.push(method);
        } else if !matches!(role, Role::Signal | Role::Query) {
            out.push(Diagnostic::at(
                DiagnosticKind::RemoteMethodNotAnnotated,
                &doc.source,
                method.span,
            ));
        }

        validate_remote_method(model, doc, method, role, out);
    }

    if entries.is_empty() {
        debug!(path = %doc.path().display(), "Workflow service without entry method");
        out.push(Diagnostic::at(
            DiagnosticKind::MissingExecuteMethod,
            &doc.source,
            service.span,
        ));
    }
    entries
}

fn validate_remote_method(
    model: &SemanticModel<'_>,
    doc: &Document,
    method: &FunctionDef,
    role: Role,
    out: &mut DiagnosticSet,
) {
    if !method.is_isolated() {
        out.push(Diagnostic::at(
            DiagnosticKind::RemoteMethodNotIsolated,
            &doc.source,
            method.span,
        ));
    }

    for param in &method.params {
        if !model.is_anydata(doc.id, &param.ty) {
            out.push(Diagnostic::at(
                DiagnosticKind::RemoteMethodParamNotAnydata,
                &doc.source,
                param.span,
            ));
        }
    }

    // A missing return type is nil, which satisfies both contracts.
    let Some(ret) = &method.return_type else {
        return;
    };
    if role == Role::Query {
        if !model.is_subtype_of_anydata_or_error(doc.id, ret) {
            out.push(Diagnostic::at(
                DiagnosticKind::QueryReturnType,
                &doc.source,
                ret.span,
            ));
        }
    } else if !model.is_subtype_of_error_or_nil(doc.id, ret) {
        out.push(Diagnostic::at(
            DiagnosticKind::RemoteMethodReturnType,
            &doc.source,
            ret.span,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::AnalyzerOptions;
    use crate::project::Package;
    use flowbind_syntax::ast::ModuleMember;

    fn check(body: &str) -> (DiagnosticSet, Vec<String>) {
        let source = format!(
            "import ballerina/workflow;\n\nservice on new workflow:Listener() {{\n{}\n}}\n",
            body
        );
        let package = Package::from_sources("acme", "orders", [("svc.wf", source)]).unwrap();
        let options = AnalyzerOptions::default();
        let model = SemanticModel::build(&package, &options);
        let doc = package.documents().next().unwrap();
        let ModuleMember::Service(service) = &doc.tree.members[0] else {
            panic!("expected service");
        };
        let mut out = DiagnosticSet::new();
        let entries = validate_service(&model, doc, service, &mut out)
            .into_iter()
            .map(|f| f.name.name.clone())
            .collect();
        (out, entries)
    }

    #[test]
    fn test_valid_service() {
        let (out, entries) = check(
            r#"
    isolated remote function execute(string input) returns error? {
    }

    @workflow:Signal
    isolated remote function approve(boolean ok) {
    }

    @workflow:Query
    isolated remote function status() returns string {
        return "ok";
    }

    function helper() {
    }
"#,
        );
        assert!(out.is_empty(), "{:?}", out.codes());
        assert_eq!(entries, vec!["execute"]);
    }

    #[test]
    fn test_missing_execute_points_at_service() {
        let (out, entries) = check("");
        assert!(entries.is_empty());
        assert_eq!(out.codes(), vec!["WORKFLOW_101"]);
        assert_eq!(out.iter().next().unwrap().location.line, 3);
    }

    #[test]
    fn test_resource_method_not_allowed() {
        let (out, _) = check(
            r#"
    isolated remote function execute() {
    }

    resource function get status() returns string {
        return "";
    }
"#,
        );
        assert_eq!(out.codes(), vec!["WORKFLOW_100"]);
    }

    #[test]
    fn test_signal_method_must_be_isolated() {
        let (out, _) = check(
            r#"
    isolated remote function execute() {
    }

    @workflow:Signal
    remote function approve(boolean ok) {
    }
"#,
        );
        assert_eq!(out.codes(), vec!["WORKFLOW_104"]);
        let location = &out.iter().next().unwrap().location;
        assert_eq!((location.line, location.column), (9, 5));
    }

    #[test]
    fn test_unannotated_remote_and_bad_types() {
        let (out, _) = check(
            r#"
    isolated remote function execute() returns string {
        return "";
    }

    isolated remote function poke(function () f) {
    }

    @workflow:Query
    isolated remote function peek() returns stream<int> {
    }
"#,
        );
        assert_eq!(
            out.codes(),
            vec!["WORKFLOW_106", "WORKFLOW_103", "WORKFLOW_102", "WORKFLOW_105"]
        );
    }

    #[test]
    fn test_duplicate_execute() {
        let (out, entries) = check(
            r#"
    isolated remote function execute() {
    }

    isolated remote function execute() {
    }
"#,
        );
        assert_eq!(out.codes(), vec!["WORKFLOW_122"]);
        assert_eq!(entries.len(), 2);
    }
}
