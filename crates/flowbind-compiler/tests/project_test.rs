// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Integration tests for loading packages from disk.

mod common;

use std::fs;

use common::load_fixture;
use flowbind_compiler::{Package, ProjectError};
use tempfile::TempDir;

#[test]
fn test_fixture_manifest_and_modules() {
    let package = load_fixture("orders");

    assert_eq!(package.org, "acme");
    assert_eq!(package.name, "orders");
    let modules: Vec<String> = package.modules.iter().map(|m| m.id.to_string()).collect();
    assert_eq!(modules, vec!["acme/orders", "acme/orders.m1"]);
    assert_eq!(package.documents().count(), 3);
    assert!(package.document_by_path("modules/m1/activities.wf").is_some());
}

#[test]
fn test_defaults_without_manifest() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("billing");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("main.wf"), "function a() {}\n").unwrap();

    let package = Package::load(&root).unwrap();
    assert_eq!(package.org, "local");
    assert_eq!(package.name, "billing");
    assert_eq!(package.root, root);
}

#[test]
fn test_non_source_files_are_ignored() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("main.wf"), "function a() {}\n").unwrap();
    fs::write(dir.path().join("README.md"), "# notes\n").unwrap();
    fs::create_dir_all(dir.path().join("modules/util")).unwrap();
    fs::write(dir.path().join("modules/util/u.wf"), "function u() {}\n").unwrap();
    fs::write(dir.path().join("modules/util/u.txt"), "not a source").unwrap();

    let package = Package::load(dir.path()).unwrap();
    let mut paths: Vec<String> = package
        .documents()
        .map(|d| d.path().display().to_string())
        .collect();
    paths.sort();
    assert_eq!(paths, vec!["main.wf", "modules/util/u.wf"]);
}

#[test]
fn test_missing_directory() {
    let dir = TempDir::new().unwrap();
    let err = Package::load(dir.path().join("absent")).unwrap_err();
    assert!(matches!(err, ProjectError::NotADirectory(_)));
}

#[test]
fn test_empty_package() {
    let dir = TempDir::new().unwrap();
    let err = Package::load(dir.path()).unwrap_err();
    assert!(matches!(err, ProjectError::NoSources(_)));
}

#[test]
fn test_invalid_manifest() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("Flowbind.toml"), "[package\norg = ").unwrap();
    fs::write(dir.path().join("main.wf"), "function a() {}\n").unwrap();

    let err = Package::load(dir.path()).unwrap_err();
    assert!(matches!(err, ProjectError::Manifest { .. }));
}

#[test]
fn test_syntax_error_names_the_file() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("broken.wf"), "function (\n").unwrap();

    let err = Package::load(dir.path()).unwrap_err();
    assert!(matches!(err, ProjectError::Parse(_)));
    assert!(err.to_string().starts_with("broken.wf:1:"));
}
