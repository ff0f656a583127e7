// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Routes activity calls in workflow services through the engine.
//!
//! Inside a workflow service, an activity call that initializes a local
//! variable is replaced by a call to the internal dispatch function:
//!
//! ```text
//! int d = m1:performActivity(7, "smith");
//! // becomes
//! int d = <int>workflow_internal:invokeActivity("m1:performActivity", 7, "smith");
//! ```
//!
//! Each modified service gains an `@workflow_internal:Activities` annotation
//! mapping every rewritten name to its function, and the document gains the
//! internal module import once. Documents without rewritten calls are left
//! byte-for-byte unchanged.
//!
//! Changes are spliced into the source text by span. Comments, layout and
//! the line of every existing token are kept: the annotation is placed on
//! the service's first line and the import after the last import on its
//! line.
//!
//! The rewriter assumes a package without error diagnostics; the pipeline
//! never calls it otherwise.

use std::cmp::Reverse;
use std::path::PathBuf;

use flowbind_syntax::ast::{
    Annotation, Expr, ExprKind, Ident, ImportDecl, LocalVarDecl, MappingField, MappingKey,
    ModuleMember, NameRef, TypeDesc, TypeDescKind,
};
use flowbind_syntax::visit::{self, Visitor};
use flowbind_syntax::{Span, print_annotation, print_import, print_type, quote};
use serde::Serialize;
use tracing::{debug, info};

use crate::classify::resolve_activity;
use crate::project::{Document, DocumentId};
use crate::semantic::{ImportTarget, SemanticModel};

/// Name of the internal dispatch function.
pub const INVOKE_ACTIVITY: &str = "invokeActivity";

/// Name of the internal annotation listing a service's activities.
pub const ACTIVITIES_ANNOTATION: &str = "Activities";

/// Result of rewriting one document.
#[derive(Debug, Clone, Serialize)]
pub struct RewrittenDocument {
    /// Path relative to the package root.
    pub path: PathBuf,
    /// Whether any call was rewritten.
    pub changed: bool,
    /// Activity names rewritten in this document, in first-seen order.
    pub activities: Vec<String>,
    /// Source text with the rewrites applied.
    #[serde(skip)]
    pub text: String,
}

/// Replacement of `span` in the original source; an empty span inserts.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Edit {
    span: Span,
    text: String,
}

impl Edit {
    fn insert(at: usize, text: String) -> Self {
        Self {
            span: Span::new(at, at),
            text,
        }
    }
}

/// Rewrite every document of every module of the package.
pub fn rewrite_package(model: &SemanticModel<'_>) -> Vec<RewrittenDocument> {
    let documents: Vec<RewrittenDocument> = model
        .package()
        .documents()
        .map(|doc| rewrite_document(model, doc))
        .collect();
    let changed = documents.iter().filter(|d| d.changed).count();
    info!(
        documents = documents.len(),
        changed, "Rewrote activity calls"
    );
    documents
}

/// Rewrite the workflow services of a single document.
pub fn rewrite_document(model: &SemanticModel<'_>, doc: &Document) -> RewrittenDocument {
    let source = doc.source.text();
    let prefix = internal_prefix(model, doc);
    let mut edits: Vec<Edit> = Vec::new();
    let mut activities: Vec<String> = Vec::new();

    for member in &doc.tree.members {
        let ModuleMember::Service(service) = member else {
            continue;
        };
        if !model.is_workflow_service(doc.id, service) {
            continue;
        }

        let mut rewriter = CallRewriter {
            model,
            doc: doc.id,
            source,
            prefix: &prefix,
            activities: Vec::new(),
            edits: Vec::new(),
        };
        visit::walk_service(&mut rewriter, service);
        if rewriter.activities.is_empty() {
            continue;
        }

        let annotation = activities_annotation(&prefix, &rewriter.activities);
        edits.push(Edit::insert(
            service.span.start,
            format!("{} ", print_annotation(&annotation)),
        ));
        edits.append(&mut rewriter.edits);
        for (name, _) in rewriter.activities {
            if !activities.contains(&name) {
                activities.push(name);
            }
        }
    }

    if activities.is_empty() {
        return RewrittenDocument {
            path: doc.path().to_path_buf(),
            changed: false,
            activities,
            text: source.to_string(),
        };
    }

    if !model.imports_module(doc.id, &ImportTarget::FrameworkInternal) {
        let import = print_import(&internal_import(model, &prefix));
        edits.push(match doc.tree.imports.last() {
            Some(last) => Edit::insert(last.span.end, format!(" {import}")),
            None => Edit::insert(0, format!("{import} ")),
        });
    }
    debug!(
        path = %doc.path().display(),
        activities = ?activities,
        edits = edits.len(),
        "Rewrote document"
    );

    RewrittenDocument {
        path: doc.path().to_path_buf(),
        changed: true,
        activities,
        text: apply_edits(source, edits),
    }
}

/// Apply non-overlapping edits, last first so earlier offsets stay valid.
fn apply_edits(source: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|edit| Reverse(edit.span.start));
    let mut text = source.to_string();
    for edit in edits {
        text.replace_range(edit.span.start..edit.span.end, &edit.text);
    }
    text
}

/// `@<prefix>:Activities {"name": function, ...}` for one service.
fn activities_annotation(prefix: &str, activities: &[(String, NameRef)]) -> Annotation {
    let fields = activities
        .iter()
        .map(|(name, callee)| MappingField::KeyValue {
            key: MappingKey::String(name.clone(), Span::synthetic()),
            value: Expr::synthetic(ExprKind::Name(callee.clone())),
        })
        .collect();
    Annotation {
        name: NameRef::synthetic(Some(prefix), ACTIVITIES_ANNOTATION),
        value: Some(Expr::synthetic(ExprKind::Mapping(fields))),
        span: Span::synthetic(),
    }
}

/// Prefix under which the document reaches the internal module: the
/// existing import's prefix, or the configured default.
fn internal_prefix(model: &SemanticModel<'_>, doc: &Document) -> String {
    doc.tree
        .imports
        .iter()
        .map(ImportDecl::effective_prefix)
        .find(|prefix| model.import(doc.id, prefix) == Some(&ImportTarget::FrameworkInternal))
        .unwrap_or(&model.options().internal_prefix)
        .to_string()
}

fn internal_import(model: &SemanticModel<'_>, prefix: &str) -> ImportDecl {
    let options = model.options();
    ImportDecl {
        org: Some(Ident::synthetic(&options.framework_org)),
        module: options
            .internal_module
            .split('.')
            .map(Ident::synthetic)
            .collect(),
        prefix: Some(Ident::synthetic(prefix)),
        span: Span::synthetic(),
    }
}

struct CallRewriter<'m, 'a> {
    model: &'m SemanticModel<'a>,
    doc: DocumentId,
    source: &'m str,
    prefix: &'m str,
    /// Rewritten names with a reference to the function, deduplicated.
    activities: Vec<(String, NameRef)>,
    edits: Vec<Edit>,
}

impl CallRewriter<'_, '_> {
    /// Edits turning `callee(args)` into `<T>prefix:invokeActivity("callee", args)`.
    /// The argument text is left as written.
    fn rewrite_call(&mut self, expr: &Expr) -> Option<[Edit; 2]> {
        let ExprKind::Call { callee, args } = &expr.kind else {
            return None;
        };
        let (_, activity) = resolve_activity(self.model, self.doc, callee)?;
        let open_paren = callee.span.end + self.source.get(callee.span.end..)?.find('(')?;
        let name = callee.as_written();

        let ty = match &activity.return_type {
            Some(ret) => {
                let mut ty = ret.clone();
                if let Some(prefix) = &callee.prefix {
                    qualify(&mut ty, &prefix.name);
                }
                ty
            }
            None => TypeDesc::synthetic(TypeDescKind::Nil),
        };
        let head = format!("<{}>{}:{}", print_type(&ty), self.prefix, INVOKE_ACTIVITY);
        let mut first_arg = quote(&name);
        if !args.is_empty() {
            first_arg.push_str(", ");
        }

        if !self.activities.iter().any(|(existing, _)| *existing == name) {
            let reference = NameRef::synthetic(
                callee.prefix.as_ref().map(|p| p.name.as_str()),
                &callee.name.name,
            );
            self.activities.push((name, reference));
        }

        Some([
            Edit {
                span: callee.span,
                text: head,
            },
            Edit::insert(open_paren + 1, first_arg),
        ])
    }
}

impl Visitor for CallRewriter<'_, '_> {
    fn visit_local_var_decl(&mut self, decl: &LocalVarDecl) {
        // Only a call that is itself the initializer is rewritten.
        if let Some(init) = &decl.init
            && let Some(edits) = self.rewrite_call(init)
        {
            self.edits.extend(edits);
            return;
        }
        visit::walk_local_var_decl(self, decl);
    }
}

/// Qualify unqualified type references with `prefix`, so a type declared
/// next to the activity resolves at the call site.
fn qualify(ty: &mut TypeDesc, prefix: &str) {
    match &mut ty.kind {
        TypeDescKind::Named(name) => {
            if name.prefix.is_none() {
                name.prefix = Some(Ident::synthetic(prefix));
            }
        }
        TypeDescKind::Optional(inner)
        | TypeDescKind::Array(inner)
        | TypeDescKind::Map(inner)
        | TypeDescKind::Paren(inner) => qualify(inner, prefix),
        TypeDescKind::Future(Some(inner)) => qualify(inner, prefix),
        TypeDescKind::Stream(item, completion) => {
            qualify(item, prefix);
            if let Some(completion) = completion {
                qualify(completion, prefix);
            }
        }
        TypeDescKind::Union(members) | TypeDescKind::Intersection(members) => {
            for member in members {
                qualify(member, prefix);
            }
        }
        TypeDescKind::Record(record) => {
            for field in &mut record.fields {
                qualify(&mut field.ty, prefix);
            }
            if let Some(rest) = &mut record.rest {
                qualify(rest, prefix);
            }
        }
        TypeDescKind::Function(Some(sig)) => {
            for param in &mut sig.params {
                qualify(param, prefix);
            }
            if let Some(rest) = &mut sig.rest {
                qualify(rest, prefix);
            }
            if let Some(ret) = &mut sig.return_type {
                qualify(ret, prefix);
            }
        }
        TypeDescKind::Builtin(_)
        | TypeDescKind::Nil
        | TypeDescKind::Var
        | TypeDescKind::Future(None)
        | TypeDescKind::Function(None)
        | TypeDescKind::Singleton(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::AnalyzerOptions;
    use crate::project::Package;

    const M1: &str = r#"import ballerina/workflow;

public type Receipt record {| string id; |};

@workflow:Activity
public function performActivity(int id, string name) returns int {
    return id;
}

@workflow:Activity
public function issue(string id) returns Receipt|error {
    return {id: id};
}

@workflow:Activity
public function notify(string id) {
}
"#;

    fn rewrite(main: &str) -> RewrittenDocument {
        let package = Package::from_sources(
            "acme",
            "orders",
            [("main.wf", main), ("modules/m1/activities.wf", M1)],
        )
        .unwrap();
        let options = AnalyzerOptions::default();
        let model = SemanticModel::build(&package, &options);
        let doc = package.document_by_path("main.wf").unwrap();
        rewrite_document(&model, doc)
    }

    #[test]
    fn test_activity_call_is_dispatched() {
        let out = rewrite(
            r#"import ballerina/workflow;
import orders.m1;

service on new workflow:Listener() {
    isolated remote function execute() returns error? {
        int d = m1:performActivity(7, "smith");
    }
}
"#,
        );
        assert!(out.changed);
        assert_eq!(out.activities, vec!["m1:performActivity"]);
        assert!(out.text.contains(
            r#"int d = <int>workflow_internal:invokeActivity("m1:performActivity", 7, "smith");"#
        ));
        assert!(out.text.contains(
            "@workflow_internal:Activities {\"m1:performActivity\": m1:performActivity} service on"
        ));
        assert!(
            out.text
                .contains("import orders.m1; import ballerina/workflow.internal as workflow_internal;\n")
        );
    }

    #[test]
    fn test_return_type_is_qualified_at_call_site() {
        let out = rewrite(
            r#"import ballerina/workflow;
import orders.m1;

service on new workflow:Listener() {
    isolated remote function execute() returns error? {
        m1:Receipt|error r = m1:issue("a");
        () n = m1:notify("a");
    }
}
"#,
        );
        assert!(out.text.contains(
            r#"<m1:Receipt|error>workflow_internal:invokeActivity("m1:issue", "a")"#
        ));
        assert!(out.text.contains(r#"<()>workflow_internal:invokeActivity("m1:notify", "a")"#));
    }

    #[test]
    fn test_names_are_deduplicated_and_metadata_appended() {
        let out = rewrite(
            r#"import ballerina/workflow;
import ballerina/log;
import orders.m1;

@log:Tag {name: "orders"}
service on new workflow:Listener() {
    isolated remote function execute() returns error? {
        int a = m1:performActivity(1, "x");
        int b = m1:performActivity(2, "y");
        m1:Receipt|error c = m1:issue("z");
    }
}
"#,
        );
        assert_eq!(out.activities, vec!["m1:performActivity", "m1:issue"]);
        assert!(out.text.contains(
            "@log:Tag {name: \"orders\"}\n@workflow_internal:Activities {\"m1:performActivity\": m1:performActivity, \"m1:issue\": m1:issue} service on"
        ));
    }

    #[test]
    fn test_only_initializer_calls_are_rewritten() {
        let out = rewrite(
            r#"import ballerina/workflow;
import orders.m1;

service on new workflow:Listener() {
    isolated remote function execute() returns error? {
        m1:Receipt r = check m1:issue("a");
        int total = 1 + m1:performActivity(1, "x");
    }
}
"#,
        );
        assert!(!out.changed);
        assert!(out.activities.is_empty());
    }

    #[test]
    fn test_document_without_workflow_service_is_untouched() {
        let source = r#"import ballerina/http;
import orders.m1;

service /api on new http:Listener(8080) {
    resource function get total() returns int {
        int d = m1:performActivity(7, "smith");
        return d;
    }
}
"#;
        let out = rewrite(source);
        assert!(!out.changed);
        assert_eq!(out.text, source);
    }

    #[test]
    fn test_existing_internal_import_is_reused() {
        let out = rewrite(
            r#"import ballerina/workflow;
import ballerina/workflow.internal as wi;
import orders.m1;

service on new workflow:Listener() {
    isolated remote function execute() returns error? {
        int d = m1:performActivity(7, "smith");
    }
}
"#,
        );
        assert!(out.text.contains(r#"<int>wi:invokeActivity("m1:performActivity", 7, "smith")"#));
        assert_eq!(out.text.matches("workflow.internal").count(), 1);
    }

    #[test]
    fn test_comments_and_lines_survive() {
        let source = r#"// Order workflow.
import ballerina/workflow;
import orders.m1;

// Entry point for new orders.
service on new workflow:Listener() {
    isolated remote function execute() returns error? {
        // Billing is not idempotent yet.
        int d = m1:performActivity(
            7,
            "smith"   // customer
        );
    }
}
"#;
        let out = rewrite(source);
        assert!(out.changed);
        assert_eq!(out.text.lines().count(), source.lines().count());
        for comment in [
            "// Order workflow.",
            "// Entry point for new orders.",
            "// Billing is not idempotent yet.",
            "\"smith\"   // customer",
        ] {
            assert!(out.text.contains(comment), "missing `{comment}`");
        }
        let line = |text: &str, needle: &str| text.lines().position(|l| l.contains(needle));
        assert_eq!(
            line(&out.text, "workflow_internal:invokeActivity(\"m1:performActivity\", "),
            line(source, "m1:performActivity(")
        );
        assert_eq!(line(&out.text, "service on"), line(source, "service on"));
    }

    #[test]
    fn test_rewritten_text_reparses() {
        let out = rewrite(
            r#"import ballerina/workflow;
import orders.m1;

service on new workflow:Listener() {
    isolated remote function execute() returns error? {
        () n = m1:notify("a");
    }
}
"#,
        );
        let module = flowbind_syntax::parse_module(&out.text).unwrap();
        assert_eq!(module.imports.len(), 3);
        let ModuleMember::Service(service) = &module.members[0] else {
            panic!("expected a service");
        };
        assert_eq!(service.annotations.len(), 1);
    }
}
