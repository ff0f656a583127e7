// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Workflow rule diagnostics.
//!
//! Every rule has a stable `WORKFLOW_1xx` code and a fixed message template.
//! Diagnostics accumulate into a [`DiagnosticSet`]; analysis never stops at
//! the first violation.

use std::fmt;

use flowbind_syntax::{Location, SourceFile, Span};
use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};

// ============================================================================
// Severity
// ============================================================================

/// How serious a diagnostic is. Only errors block the rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks rewriting and fails the build.
    Error,
    /// Reported but does not block.
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warning => write!(f, "WARNING"),
        }
    }
}

// ============================================================================
// Rule catalogue
// ============================================================================

/// One variant per workflow rule.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)] // Fields are self-documenting from variant docs
pub enum DiagnosticKind {
    // === Service rules ===
    /// A workflow service declares a resource method.
    ResourceMethodNotAllowed,
    /// A workflow service has no `execute` remote method.
    MissingExecuteMethod,
    /// A remote method parameter is not a subtype of `anydata`.
    RemoteMethodParamNotAnydata,
    /// A non-entry remote method has neither `@workflow:Signal` nor `@workflow:Query`.
    RemoteMethodNotAnnotated,
    /// A remote method lacks the `isolated` qualifier.
    RemoteMethodNotIsolated,
    /// A query method returns something outside `anydata|error`.
    QueryReturnType,
    /// A non-query remote method returns something outside `error?`.
    RemoteMethodReturnType,
    /// A service declares `execute` more than once.
    DuplicateExecuteMethod,

    // === Activity signatures ===
    /// An activity parameter is not a subtype of `anydata`.
    ActivityParamNotAnydata,
    /// An activity returns something outside `anydata|error`.
    ActivityReturnType,

    // === Process signatures ===
    /// The first parameter looks like a context but is not `workflow:Context`.
    InvalidContextParam,
    /// The input parameter is not a subtype of `anydata`.
    ProcessInputNotAnydata,
    /// The input parameter follows the events parameter.
    InputAfterEvents,
    /// The events parameter is not a record of `future<anydata>` fields.
    InvalidEventsParam,
    /// More than context, input and events.
    TooManyProcessParams,
    /// A process returns something outside `anydata|error`.
    ProcessReturnType,

    // === Body rules ===
    /// A `lock` block in an entry body touches a mutable isolated module variable.
    MutableGlobalInLock { variable: String },
    /// A `var` declaration captures an activity call.
    VarBindingActivityCall,

    // === Call sites ===
    /// The first `callActivity` argument is not an activity function.
    MissingActivityAnnotation { target: String },
    /// An activity function is called directly inside a process.
    DirectActivityCall { activity: String },
    /// The `callActivity` argument mapping lacks a required parameter.
    MissingActivityParam { activity: String, param: String },
    /// The `callActivity` argument mapping names an unknown parameter.
    ExtraActivityParam { activity: String, param: String },
    /// The target activity declares a rest parameter.
    RestParamsUnsupported { activity: String },
    /// The `callActivity` arguments are not a mapping literal.
    UncheckedActivityArgs,
}

impl DiagnosticKind {
    /// Stable rule code.
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticKind::ResourceMethodNotAllowed => "WORKFLOW_100",
            DiagnosticKind::MissingExecuteMethod => "WORKFLOW_101",
            DiagnosticKind::RemoteMethodParamNotAnydata => "WORKFLOW_102",
            DiagnosticKind::RemoteMethodNotAnnotated => "WORKFLOW_103",
            DiagnosticKind::RemoteMethodNotIsolated => "WORKFLOW_104",
            DiagnosticKind::QueryReturnType => "WORKFLOW_105",
            DiagnosticKind::RemoteMethodReturnType => "WORKFLOW_106",
            DiagnosticKind::ActivityParamNotAnydata => "WORKFLOW_107",
            DiagnosticKind::MutableGlobalInLock { .. } => "WORKFLOW_108",
            DiagnosticKind::VarBindingActivityCall => "WORKFLOW_109",
            DiagnosticKind::ActivityReturnType => "WORKFLOW_110",
            DiagnosticKind::InvalidContextParam => "WORKFLOW_111",
            DiagnosticKind::ProcessInputNotAnydata => "WORKFLOW_112",
            DiagnosticKind::InputAfterEvents => "WORKFLOW_113",
            DiagnosticKind::InvalidEventsParam => "WORKFLOW_114",
            DiagnosticKind::TooManyProcessParams => "WORKFLOW_115",
            DiagnosticKind::ProcessReturnType => "WORKFLOW_116",
            DiagnosticKind::MissingActivityAnnotation { .. } => "WORKFLOW_117",
            DiagnosticKind::DirectActivityCall { .. } => "WORKFLOW_118",
            DiagnosticKind::MissingActivityParam { .. } => "WORKFLOW_119",
            DiagnosticKind::ExtraActivityParam { .. } => "WORKFLOW_120",
            DiagnosticKind::RestParamsUnsupported { .. } => "WORKFLOW_121",
            DiagnosticKind::DuplicateExecuteMethod => "WORKFLOW_122",
            DiagnosticKind::UncheckedActivityArgs => "WORKFLOW_123",
        }
    }

    /// Severity of the rule.
    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticKind::UncheckedActivityArgs => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::ResourceMethodNotAllowed => {
                write!(f, "resource methods are not allowed in a workflow service")
            }
            DiagnosticKind::MissingExecuteMethod => {
                write!(f, "workflow service should contain remote method `execute`")
            }
            DiagnosticKind::RemoteMethodParamNotAnydata => write!(
                f,
                "parameters of a remote method in a workflow service should be a subtype of `anydata`"
            ),
            DiagnosticKind::RemoteMethodNotAnnotated => write!(
                f,
                "remote methods in a workflow service should be annotated with `@workflow:Signal` or `@workflow:Query` annotation"
            ),
            DiagnosticKind::RemoteMethodNotIsolated => {
                write!(f, "remote methods in a workflow service should be isolated")
            }
            DiagnosticKind::QueryReturnType => write!(
                f,
                "return type of a remote method annotated with `@workflow:Query` should be a subtype of `anydata|error`"
            ),
            DiagnosticKind::RemoteMethodReturnType => write!(
                f,
                "return type of a remote method in a workflow service should be a subtype of `error?`"
            ),
            DiagnosticKind::DuplicateExecuteMethod => write!(
                f,
                "workflow service should contain only one remote method `execute`"
            ),
            DiagnosticKind::ActivityParamNotAnydata => write!(
                f,
                "parameters of an activity function should be a subtype of `anydata`"
            ),
            DiagnosticKind::ActivityReturnType => write!(
                f,
                "return type of an activity function should be a subtype of `anydata|error`"
            ),
            DiagnosticKind::InvalidContextParam => write!(
                f,
                "first parameter of a process function should be of type `workflow:Context`"
            ),
            DiagnosticKind::ProcessInputNotAnydata => write!(
                f,
                "input parameter of a process function should be a subtype of `anydata`"
            ),
            DiagnosticKind::InputAfterEvents => write!(
                f,
                "input parameter of a process function should come before the events parameter"
            ),
            DiagnosticKind::InvalidEventsParam => write!(
                f,
                "events parameter of a process function should be a record whose fields are all `future<anydata>`"
            ),
            DiagnosticKind::TooManyProcessParams => write!(
                f,
                "a process function accepts at most a context, an input and an events parameter"
            ),
            DiagnosticKind::ProcessReturnType => write!(
                f,
                "return type of a process function should be a subtype of `anydata|error`"
            ),
            DiagnosticKind::MutableGlobalInLock { variable } => write!(
                f,
                "execute function cannot access mutable global variable `{}`",
                variable
            ),
            DiagnosticKind::VarBindingActivityCall => write!(
                f,
                "cannot use var binding pattern when calling an activity function"
            ),
            DiagnosticKind::MissingActivityAnnotation { target } => write!(
                f,
                "`{}` passed to `callActivity` should be a function annotated with `@workflow:Activity`",
                target
            ),
            DiagnosticKind::DirectActivityCall { activity } => write!(
                f,
                "activity function `{}` cannot be called directly; use `callActivity`",
                activity
            ),
            DiagnosticKind::MissingActivityParam { activity, param } => write!(
                f,
                "missing required parameter `{}` for activity `{}`",
                param, activity
            ),
            DiagnosticKind::ExtraActivityParam { activity, param } => write!(
                f,
                "`{}` is not a parameter of activity `{}`",
                param, activity
            ),
            DiagnosticKind::RestParamsUnsupported { activity } => write!(
                f,
                "activity `{}` declares rest parameters, which `callActivity` does not support",
                activity
            ),
            DiagnosticKind::UncheckedActivityArgs => write!(
                f,
                "arguments of `callActivity` are not a mapping literal; parameter names are not checked"
            ),
        }
    }
}

// ============================================================================
// Diagnostic
// ============================================================================

/// A rule violation at a source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Which rule was violated.
    pub kind: DiagnosticKind,
    /// Where.
    pub location: Location,
}

impl Diagnostic {
    /// Create a diagnostic.
    pub fn new(kind: DiagnosticKind, location: Location) -> Self {
        Self { kind, location }
    }

    /// Create a diagnostic at a span of a source file.
    pub fn at(kind: DiagnosticKind, file: &SourceFile, span: Span) -> Self {
        Self::new(kind, file.location(span))
    }

    /// Stable rule code.
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Severity of the rule.
    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    /// Rendered message.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} ({})",
            self.severity(),
            self.location,
            self.kind,
            self.code()
        )
    }
}

impl Serialize for Diagnostic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Diagnostic", 6)?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("severity", &self.severity())?;
        state.serialize_field("message", &self.message())?;
        state.serialize_field("file", &self.location.file.display().to_string())?;
        state.serialize_field("line", &self.location.line)?;
        state.serialize_field("column", &self.location.column)?;
        state.end()
    }
}

// ============================================================================
// Diagnostic set
// ============================================================================

/// Diagnostics collected across a whole package.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct DiagnosticSet {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Merge another set into this one.
    pub fn merge(&mut self, other: DiagnosticSet) {
        self.diagnostics.extend(other.diagnostics);
    }

    /// Order by file, line, column, then code.
    pub fn sort(&mut self) {
        self.diagnostics.sort_by(|a, b| {
            (&a.location.file, a.location.line, a.location.column, a.code()).cmp(&(
                &b.location.file,
                b.location.line,
                b.location.column,
                b.code(),
            ))
        });
    }

    /// Returns true if there are any errors (warnings are allowed).
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity() == Severity::Error)
    }

    /// Number of error-severity diagnostics.
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity() == Severity::Error)
            .count()
    }

    /// Number of warning-severity diagnostics.
    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity() == Severity::Warning)
            .count()
    }

    /// Total number of diagnostics.
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Returns true if nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Iterate in current order.
    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.diagnostics.iter()
    }

    /// Codes in current order.
    pub fn codes(&self) -> Vec<&'static str> {
        self.diagnostics.iter().map(Diagnostic::code).collect()
    }
}

impl<'a> IntoIterator for &'a DiagnosticSet {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.iter()
    }
}

impl Extend<Diagnostic> for DiagnosticSet {
    fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
        self.diagnostics.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn at(file: &str, line: usize, column: usize) -> Location {
        Location {
            file: PathBuf::from(file),
            line,
            column,
            end_line: line,
            end_column: column + 1,
        }
    }

    #[test]
    fn test_display_format() {
        let diagnostic = Diagnostic::new(DiagnosticKind::RemoteMethodNotIsolated, at("svc.wf", 12, 5));
        assert_eq!(
            diagnostic.to_string(),
            "ERROR [svc.wf:12:5] remote methods in a workflow service should be isolated (WORKFLOW_104)"
        );
    }

    #[test]
    fn test_warning_does_not_count_as_error() {
        let mut set = DiagnosticSet::new();
        set.push(Diagnostic::new(DiagnosticKind::UncheckedActivityArgs, at("a.wf", 1, 1)));
        assert!(!set.has_errors());
        assert_eq!(set.warning_count(), 1);
        assert_eq!(set.error_count(), 0);
    }

    #[test]
    fn test_sort_by_file_line_column_code() {
        let mut set = DiagnosticSet::new();
        set.push(Diagnostic::new(DiagnosticKind::QueryReturnType, at("b.wf", 1, 1)));
        set.push(Diagnostic::new(DiagnosticKind::RemoteMethodNotIsolated, at("a.wf", 3, 9)));
        set.push(Diagnostic::new(DiagnosticKind::RemoteMethodNotAnnotated, at("a.wf", 3, 9)));
        set.push(Diagnostic::new(DiagnosticKind::MissingExecuteMethod, at("a.wf", 1, 1)));
        set.sort();
        assert_eq!(
            set.codes(),
            vec!["WORKFLOW_101", "WORKFLOW_103", "WORKFLOW_104", "WORKFLOW_105"]
        );
    }

    #[test]
    fn test_json_shape() {
        let diagnostic = Diagnostic::new(
            DiagnosticKind::MissingActivityParam {
                activity: "sendMail".to_string(),
                param: "to".to_string(),
            },
            at("svc.wf", 4, 20),
        );
        let json = serde_json::to_value(&diagnostic).unwrap();
        assert_eq!(json["code"], "WORKFLOW_119");
        assert_eq!(json["severity"], "error");
        assert_eq!(json["line"], 4);
        assert_eq!(
            json["message"],
            "missing required parameter `to` for activity `sendMail`"
        );
    }
}
