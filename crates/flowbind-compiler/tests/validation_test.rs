// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Integration tests for package validation.
//!
//! These tests analyze the packages under tests/fixtures.

mod common;

use common::load_fixture;
use flowbind_compiler::{AnalyzerOptions, DiagnosticKind, Severity, analyze};

// ============================================================================
// Valid Package Tests
// ============================================================================

#[test]
fn test_valid_package_has_no_diagnostics() {
    let package = load_fixture("orders");
    let diagnostics = analyze(&package, &AnalyzerOptions::default());

    assert!(diagnostics.is_empty(), "{:?}", diagnostics.codes());
}

#[test]
fn test_package_without_workflows_has_no_diagnostics() {
    let package = load_fixture("plain");
    let diagnostics = analyze(&package, &AnalyzerOptions::default());

    assert!(diagnostics.is_empty());
}

// ============================================================================
// Invalid Package Tests
// ============================================================================

#[test]
fn test_all_violations_are_collected() {
    let package = load_fixture("invalid");
    let diagnostics = analyze(&package, &AnalyzerOptions::default());

    assert_eq!(
        diagnostics.codes(),
        vec![
            "WORKFLOW_107",
            "WORKFLOW_107",
            "WORKFLOW_110",
            "WORKFLOW_118",
            "WORKFLOW_118",
            "WORKFLOW_118",
            "WORKFLOW_118",
            "WORKFLOW_119",
            "WORKFLOW_120",
            "WORKFLOW_104",
        ]
    );
    assert_eq!(diagnostics.error_count(), 10);
    assert_eq!(diagnostics.warning_count(), 0);
}

#[test]
fn test_each_direct_call_is_reported_once() {
    let package = load_fixture("invalid");
    let diagnostics = analyze(&package, &AnalyzerOptions::default());

    let direct: Vec<String> = diagnostics
        .iter()
        .filter_map(|d| match &d.kind {
            DiagnosticKind::DirectActivityCall { activity } => Some(activity.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(direct, vec!["fetch", "fetch", "fetch", "m1:performActivity"]);

    let lines: Vec<usize> = diagnostics
        .iter()
        .filter(|d| d.code() == "WORKFLOW_118")
        .map(|d| d.location.line)
        .collect();
    assert_eq!(lines, vec![6, 7, 8, 9]);
}

#[test]
fn test_signal_isolation_reported_at_method() {
    let package = load_fixture("invalid");
    let diagnostics = analyze(&package, &AnalyzerOptions::default());

    let diagnostic = diagnostics
        .iter()
        .find(|d| d.code() == "WORKFLOW_104")
        .unwrap();
    assert_eq!(diagnostic.location.file.to_str(), Some("service.wf"));
    assert_eq!((diagnostic.location.line, diagnostic.location.column), (8, 5));
    assert_eq!(diagnostic.severity(), Severity::Error);
}

#[test]
fn test_mediated_call_reports_missing_and_extra() {
    let package = load_fixture("invalid");
    let diagnostics = analyze(&package, &AnalyzerOptions::default());

    let kinds: Vec<&DiagnosticKind> = diagnostics
        .iter()
        .filter(|d| d.location.line == 14)
        .map(|d| &d.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            &DiagnosticKind::MissingActivityParam {
                activity: "fetch".to_string(),
                param: "id".to_string(),
            },
            &DiagnosticKind::ExtraActivityParam {
                activity: "fetch".to_string(),
                param: "key".to_string(),
            },
        ]
    );
}

#[test]
fn test_diagnostics_serialize_to_json() {
    let package = load_fixture("invalid");
    let diagnostics = analyze(&package, &AnalyzerOptions::default());

    let json = serde_json::to_value(&diagnostics).unwrap();
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), diagnostics.len());
    assert_eq!(entries[0]["code"], "WORKFLOW_107");
    assert_eq!(entries[0]["severity"], "error");
    assert_eq!(entries[0]["file"], "activities.wf");
}
