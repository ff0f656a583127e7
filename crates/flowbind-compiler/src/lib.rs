// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Flowbind Compiler - Workflow Authoring Checks and Activity Rewriting
//!
//! This crate enforces the authoring rules of durable workflows at build
//! time and rewrites activity calls so they are executed by the engine.
//!
//! # Pipeline
//!
//! ```text
//!     ┌─────────────┐      ┌─────────────┐      ┌─────────────┐
//!     │  Package    │      │  Semantic   │      │ Validators  │
//!     │  (*.wf)     │─────▶│   Model     │─────▶│ (diagnostics│
//!     │             │      │             │      │   WORKFLOW) │
//!     └─────────────┘      └─────────────┘      └──────┬──────┘
//!                                                      │ no errors
//!                                                      ▼
//!                                               ┌─────────────┐
//!                                               │  Rewriter   │
//!                                               │ (invoke via │
//!                                               │  internal)  │
//!                                               └─────────────┘
//! ```
//!
//! 1. **Load**: read the package sources and parse every document
//! 2. **Resolve**: build the [`semantic::SemanticModel`] (imports, names, types)
//! 3. **Classify**: find process, activity, signal and query declarations
//! 4. **Validate**: signatures, service contracts, entry bodies and call sites
//! 5. **Rewrite**: route activity calls through the internal dispatch function
//!
//! # Usage
//!
//! ```ignore
//! use flowbind_compiler::{AnalyzerOptions, Package, check};
//!
//! let package = Package::load("./orders")?;
//! let outcome = check(&package, &AnalyzerOptions::default());
//! for diagnostic in &outcome.diagnostics {
//!     eprintln!("{}", diagnostic);
//! }
//! ```

#![deny(missing_docs)]

/// Rules over entry bodies: `lock` access and `var` bindings.
pub mod body;

/// Mediated and direct activity call sites.
pub mod call_site;

/// Workflow role classification.
pub mod classify;

/// Diagnostic codes, messages and collections.
pub mod diagnostics;

/// Framework module identity and analyzer settings.
pub mod options;

/// Package orchestration: analysis then rewrite.
pub mod pipeline;

/// Packages, modules and documents loaded from disk or memory.
pub mod project;

/// Activity call rewriting.
pub mod rewrite;

/// Name and type resolution.
pub mod semantic;

/// Workflow service contracts.
pub mod service;

/// Activity and process signatures.
pub mod signature;

pub use classify::Role;
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSet, Severity};
pub use options::AnalyzerOptions;
pub use pipeline::{Outcome, analyze, check};
pub use project::{Package, ProjectError};
pub use rewrite::RewrittenDocument;
