// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Workflow package checker CLI
//!
//! Analyzes a workflow package, prints diagnostics and optionally writes the
//! rewritten sources.
//!
//! Usage:
//!
//! ```text
//! flowbind-check <dir> [--emit <out-dir>] [--format text|json]
//! ```
//!
//! Example:
//!
//! ```text
//! flowbind-check ./orders --emit ./target/orders
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use flowbind_compiler::{AnalyzerOptions, DiagnosticSet, Package, RewrittenDocument, check};

fn print_usage() {
    eprintln!(
        r#"Usage: flowbind-check <dir> [OPTIONS]

Check a workflow package and rewrite its activity calls.

OPTIONS:
    --emit <out-dir>       Write rewritten sources under this directory (only when no errors)
    --format <text|json>   Diagnostic output format (default: text)
    --help                 Show this help message

ENVIRONMENT:
    RUST_LOG               Log filter for stderr output (default: warn)

EXAMPLES:
    # Report diagnostics only
    flowbind-check ./orders

    # Check and write rewritten sources
    flowbind-check ./orders --emit ./target/orders

    # Machine-readable diagnostics
    flowbind-check ./orders --format json
"#
    );
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Text,
    Json,
}

struct Args {
    package_dir: PathBuf,
    emit_dir: Option<PathBuf>,
    format: Format,
}

fn parse_args() -> Result<Args, String> {
    let args: Vec<String> = std::env::args().collect();

    let mut package_dir: Option<PathBuf> = None;
    let mut emit_dir: Option<PathBuf> = None;
    let mut format = Format::Text;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--emit" => {
                i += 1;
                if i >= args.len() {
                    return Err("--emit requires a path".to_string());
                }
                emit_dir = Some(PathBuf::from(&args[i]));
            }
            "--format" => {
                i += 1;
                if i >= args.len() {
                    return Err("--format requires text or json".to_string());
                }
                format = match args[i].as_str() {
                    "text" => Format::Text,
                    "json" => Format::Json,
                    other => return Err(format!("Invalid format: {}", other)),
                };
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown argument: {}", arg));
            }
            arg => {
                if package_dir.is_some() {
                    return Err(format!("Unexpected argument: {}", arg));
                }
                package_dir = Some(PathBuf::from(arg));
            }
        }
        i += 1;
    }

    let package_dir = package_dir.ok_or("package directory is required")?;

    Ok(Args {
        package_dir,
        emit_dir,
        format,
    })
}

fn print_diagnostics(diagnostics: &DiagnosticSet, format: Format) -> anyhow::Result<()> {
    match format {
        Format::Text => {
            for diagnostic in diagnostics {
                println!("{}", diagnostic);
            }
        }
        Format::Json => {
            let json = serde_json::to_string_pretty(diagnostics)
                .context("Failed to serialize diagnostics")?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn emit(out_dir: &Path, documents: &[RewrittenDocument]) -> anyhow::Result<usize> {
    let mut changed = 0;
    for document in documents {
        let target = out_dir.join(&document.path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&target, &document.text)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        if document.changed {
            changed += 1;
        }
    }
    Ok(changed)
}

fn run(args: &Args) -> anyhow::Result<bool> {
    let package = Package::load(&args.package_dir)
        .with_context(|| format!("Failed to load package {}", args.package_dir.display()))?;

    eprintln!(
        "Checking package: {}/{} ({} documents)",
        package.org,
        package.name,
        package.documents().count()
    );

    let outcome = check(&package, &AnalyzerOptions::default());
    print_diagnostics(&outcome.diagnostics, args.format)?;

    eprintln!(
        "{} error(s), {} warning(s)",
        outcome.diagnostics.error_count(),
        outcome.diagnostics.warning_count()
    );

    if let (Some(out_dir), Some(documents)) = (&args.emit_dir, &outcome.rewritten) {
        let changed = emit(out_dir, documents)?;
        eprintln!(
            "Wrote {} document(s) to {} ({} rewritten)",
            documents.len(),
            out_dir.display(),
            changed
        );
    } else if args.emit_dir.is_some() {
        eprintln!("Skipping emit: package has errors");
    }

    Ok(outcome.is_clean())
}

fn main() -> ExitCode {
    // Initialize minimal logging (default to warn if RUST_LOG not set)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(io::stderr)
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
