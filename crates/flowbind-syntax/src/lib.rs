// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Front end for flowbind workflow sources.
//!
//! Provides the lexer, the recursive-descent parser producing the syntax
//! tree in [`ast`], traversal helpers in [`visit`] and a deterministic source
//! printer used to emit rewritten files.
//!
//! ```ignore
//! use flowbind_syntax::{parse, SourceFile};
//!
//! let file = SourceFile::new("main.wf", "import ballerina/workflow;");
//! let module = parse(&file)?;
//! assert_eq!(module.imports.len(), 1);
//! ```

#![deny(missing_docs)]

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod span;
pub mod token;
pub mod visit;

use thiserror::Error;

pub use error::SyntaxError;
pub use parser::{parse_expr, parse_module, parse_type};
pub use printer::{print_annotation, print_expr, print_import, print_module, print_type, quote};
pub use span::{Location, SourceFile, Span};

/// A syntax error resolved to a file location.
#[derive(Debug, Clone, Error)]
#[error("{location}: {source}")]
pub struct ParseError {
    /// Where parsing stopped.
    pub location: Location,
    /// What went wrong.
    pub source: SyntaxError,
}

/// Parse a source file, attaching the file location to any syntax error.
pub fn parse(file: &SourceFile) -> Result<ast::ModulePart, ParseError> {
    parse_module(file.text()).map_err(|source| ParseError {
        location: file.location(source.span()),
        source,
    })
}
