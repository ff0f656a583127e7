// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Analysis and rewrite pipeline over a whole package.

use std::time::Instant;

use flowbind_syntax::ast::ModuleMember;
use tracing::{debug, info};

use crate::body::analyze_body;
use crate::call_site::{validate_direct_calls, validate_mediated_calls};
use crate::classify::{Role, classify_function};
use crate::diagnostics::DiagnosticSet;
use crate::options::AnalyzerOptions;
use crate::project::{Document, Package};
use crate::rewrite::{RewrittenDocument, rewrite_package};
use crate::semantic::SemanticModel;
use crate::service::validate_service;
use crate::signature::{validate_activity, validate_process};

/// Outcome of checking a package.
#[derive(Debug, Clone)]
pub struct Outcome {
    /// Every diagnostic found, sorted by location.
    pub diagnostics: DiagnosticSet,
    /// Rewritten documents; `None` when error diagnostics blocked the rewrite.
    pub rewritten: Option<Vec<RewrittenDocument>>,
}

impl Outcome {
    /// Whether analysis found no errors.
    pub fn is_clean(&self) -> bool {
        !self.diagnostics.has_errors()
    }
}

/// Run every workflow rule over the package.
///
/// Rules never stop at the first violation; all diagnostics of all
/// documents are collected.
pub fn analyze(package: &Package, options: &AnalyzerOptions) -> DiagnosticSet {
    let model = SemanticModel::build(package, options);
    analyze_model(&model)
}

/// Analyze the package and, when no errors were found, rewrite it.
pub fn check(package: &Package, options: &AnalyzerOptions) -> Outcome {
    let start = Instant::now();
    let model = SemanticModel::build(package, options);
    let diagnostics = analyze_model(&model);

    let rewritten = if diagnostics.has_errors() {
        info!(
            errors = diagnostics.error_count(),
            "Skipping rewrite of package with errors"
        );
        None
    } else {
        Some(rewrite_package(&model))
    };

    info!(
        package = %package.name,
        diagnostics = diagnostics.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Checked package"
    );
    Outcome {
        diagnostics,
        rewritten,
    }
}

fn analyze_model(model: &SemanticModel<'_>) -> DiagnosticSet {
    let mut out = DiagnosticSet::new();
    for doc in model.package().documents() {
        analyze_document(model, doc, &mut out);
    }
    out.sort();
    out
}

fn analyze_document(model: &SemanticModel<'_>, doc: &Document, out: &mut DiagnosticSet) {
    debug!(path = %doc.path().display(), "Analyzing document");
    for member in &doc.tree.members {
        match member {
            ModuleMember::Function(function) => match classify_function(model, doc.id, function) {
                Role::Process => {
                    validate_process(model, doc, function, out);
                    analyze_body(model, doc, function, out);
                    validate_mediated_calls(model, doc, function, out);
                    validate_direct_calls(model, doc, function, out);
                }
                Role::Activity => validate_activity(model, doc, function, out),
                Role::Signal | Role::Query | Role::Unmarked => {}
            },
            ModuleMember::Service(service) if model.is_workflow_service(doc.id, service) => {
                for entry in validate_service(model, doc, service, out) {
                    analyze_body(model, doc, entry, out);
                    validate_mediated_calls(model, doc, entry, out);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(source: &str) -> Package {
        Package::from_sources("acme", "orders", [("main.wf", source)]).unwrap()
    }

    #[test]
    fn test_clean_package_is_rewritten() {
        let pkg = package(
            r#"import ballerina/workflow;

@workflow:Activity
function fetch(string id) returns string|error {
    return id;
}

service on new workflow:Listener() {
    isolated remote function execute(string id) returns error? {
        string|error name = fetch(id);
    }
}
"#,
        );
        let outcome = check(&pkg, &AnalyzerOptions::default());
        assert!(outcome.is_clean());
        let rewritten = outcome.rewritten.unwrap();
        assert_eq!(rewritten.len(), 1);
        assert!(rewritten[0].changed);
        assert!(rewritten[0].text.contains(
            r#"string|error name = <string|error>workflow_internal:invokeActivity("fetch", id);"#
        ));
    }

    #[test]
    fn test_errors_block_rewrite() {
        let pkg = package(
            r#"import ballerina/workflow;

@workflow:Activity
function fetch(string id) returns string|error {
    return id;
}

service on new workflow:Listener() {
    remote function execute(string id) returns error? {
        string|error name = fetch(id);
    }
}
"#,
        );
        let outcome = check(&pkg, &AnalyzerOptions::default());
        assert_eq!(outcome.diagnostics.codes(), vec!["WORKFLOW_104"]);
        assert!(outcome.rewritten.is_none());
    }

    #[test]
    fn test_warnings_do_not_block_rewrite() {
        let pkg = package(
            r#"import ballerina/workflow;

@workflow:Activity
function fetch(string id) returns string|error {
    return id;
}

@workflow:Process
function run(workflow:Context ctx, map<anydata> args) returns error? {
    string name = check ctx->callActivity(fetch, args);
}
"#,
        );
        let outcome = check(&pkg, &AnalyzerOptions::default());
        assert_eq!(outcome.diagnostics.codes(), vec!["WORKFLOW_123"]);
        assert!(outcome.rewritten.is_some());
    }

    #[test]
    fn test_diagnostics_are_sorted_across_rules() {
        let pkg = package(
            r#"import ballerina/workflow;

@workflow:Activity
function fetch(function () f) returns string|error {
    return "";
}

@workflow:Process
function run(workflow:Context ctx) returns error? {
    string a = check fetch("x");
    var b = fetch("y");
}
"#,
        );
        let diagnostics = analyze(&pkg, &AnalyzerOptions::default());
        let lines: Vec<usize> = diagnostics.iter().map(|d| d.location.line).collect();
        let mut sorted = lines.clone();
        sorted.sort();
        assert_eq!(lines, sorted);
        assert_eq!(
            diagnostics.codes(),
            vec!["WORKFLOW_107", "WORKFLOW_118", "WORKFLOW_109", "WORKFLOW_118"]
        );
    }
}
