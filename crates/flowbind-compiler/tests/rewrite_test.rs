// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Integration tests for package-wide activity rewriting.

mod common;

use common::load_fixture;
use flowbind_compiler::{AnalyzerOptions, Package, check};

fn rewritten_text(outcome: &flowbind_compiler::Outcome, path: &str) -> String {
    outcome
        .rewritten
        .as_ref()
        .expect("package should be rewritten")
        .iter()
        .find(|d| d.path.to_str() == Some(path))
        .unwrap_or_else(|| panic!("{} not rewritten", path))
        .text
        .clone()
}

#[test]
fn test_every_document_is_reported() {
    let package = load_fixture("orders");
    let outcome = check(&package, &AnalyzerOptions::default());

    let documents = outcome.rewritten.unwrap();
    let mut summary: Vec<(String, bool)> = documents
        .iter()
        .map(|d| (d.path.display().to_string(), d.changed))
        .collect();
    summary.sort();
    assert_eq!(
        summary,
        vec![
            ("modules/m1/activities.wf".to_string(), false),
            ("process.wf".to_string(), false),
            ("service.wf".to_string(), true),
        ]
    );
}

#[test]
fn test_service_calls_are_dispatched() {
    let package = load_fixture("orders");
    let outcome = check(&package, &AnalyzerOptions::default());
    let text = rewritten_text(&outcome, "service.wf");

    assert!(text.contains(
        r#"int d = <int>workflow_internal:invokeActivity("m1:performActivity", 7, "smith");"#
    ));
    assert!(text.contains(
        r#"m1:Receipt|error receipt = <m1:Receipt|error>workflow_internal:invokeActivity("m1:issueReceipt", orderId, 10.5);"#
    ));
    assert!(text.contains(
        "@workflow_internal:Activities {\"m1:performActivity\": m1:performActivity, \"m1:issueReceipt\": m1:issueReceipt} service on"
    ));
    assert_eq!(
        text.matches("import ballerina/workflow.internal as workflow_internal;")
            .count(),
        1
    );
}

#[test]
fn test_rewrite_keeps_comments_and_line_numbers() {
    let package = load_fixture("orders");
    let outcome = check(&package, &AnalyzerOptions::default());
    let original = package.document_by_path("service.wf").unwrap().source.text();
    let text = rewritten_text(&outcome, "service.wf");

    let before: Vec<&str> = original.lines().collect();
    let after: Vec<&str> = text.lines().collect();
    assert_eq!(before.len(), after.len());
    assert_eq!(after[0], "// Order fulfilment service.");

    let edited: Vec<usize> = (0..before.len())
        .filter(|&i| before[i] != after[i])
        .map(|i| i + 1)
        .collect();
    // Last import, the service line and the two calls.
    assert_eq!(edited, vec![3, 5, 8, 9]);
    assert_eq!(after[6].trim(), "// Reserve stock before billing.");
}

#[test]
fn test_unchanged_documents_keep_source_text() {
    let package = load_fixture("orders");
    let outcome = check(&package, &AnalyzerOptions::default());

    let original = package.document_by_path("process.wf").unwrap();
    assert_eq!(rewritten_text(&outcome, "process.wf"), original.source.text());
}

#[test]
fn test_rewritten_source_reparses_cleanly() {
    let package = load_fixture("orders");
    let outcome = check(&package, &AnalyzerOptions::default());

    let sources: Vec<(std::path::PathBuf, String)> = outcome
        .rewritten
        .unwrap()
        .into_iter()
        .map(|d| (d.path, d.text))
        .collect();
    let reparsed = Package::from_sources("acme", "orders", sources).unwrap();
    assert_eq!(reparsed.documents().count(), 3);
}

#[test]
fn test_package_with_errors_is_not_rewritten() {
    let package = load_fixture("invalid");
    let outcome = check(&package, &AnalyzerOptions::default());

    assert!(!outcome.is_clean());
    assert!(outcome.rewritten.is_none());
}

#[test]
fn test_package_without_services_is_unchanged() {
    let package = load_fixture("plain");
    let outcome = check(&package, &AnalyzerOptions::default());

    let documents = outcome.rewritten.unwrap();
    assert_eq!(documents.len(), 1);
    assert!(!documents[0].changed);
    assert!(!documents[0].text.contains("workflow.internal"));
}
