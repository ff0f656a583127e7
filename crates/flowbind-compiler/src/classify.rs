// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Workflow role classification of declarations.

use flowbind_syntax::ast::{Annotation, FunctionDef, NameRef};

use crate::project::DocumentId;
use crate::semantic::{FrameworkItem, ItemRef, SemanticModel};

/// Role a declaration plays in a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// `@workflow:Process` entry function.
    Process,
    /// `@workflow:Activity` function.
    Activity,
    /// `@workflow:Signal` remote method.
    Signal,
    /// `@workflow:Query` remote method.
    Query,
    /// No workflow marker.
    Unmarked,
}

/// Classify a declaration by its annotations. The first workflow marker wins.
///
/// Markers only count when the annotation tag resolves to the framework
/// module, so an unrelated module imported under the same prefix never
/// produces a role.
pub fn classify(model: &SemanticModel<'_>, doc: DocumentId, annotations: &[Annotation]) -> Role {
    annotations
        .iter()
        .find_map(|annotation| match model.framework_annotation(doc, &annotation.name)? {
            FrameworkItem::Process => Some(Role::Process),
            FrameworkItem::Activity => Some(Role::Activity),
            FrameworkItem::Signal => Some(Role::Signal),
            FrameworkItem::Query => Some(Role::Query),
            _ => None,
        })
        .unwrap_or(Role::Unmarked)
}

/// Classify a function or method definition.
pub fn classify_function(model: &SemanticModel<'_>, doc: DocumentId, function: &FunctionDef) -> Role {
    classify(model, doc, &function.annotations)
}

/// Resolve a value reference to a package function carrying `@workflow:Activity`.
///
/// The marker is classified in the document that declares the function, so
/// activities imported from other modules are recognized under their own
/// import prefixes.
pub fn resolve_activity<'a>(
    model: &SemanticModel<'a>,
    doc: DocumentId,
    name: &NameRef,
) -> Option<(ItemRef, &'a FunctionDef)> {
    model
        .resolve_function(doc, name)
        .filter(|(item, f)| classify_function(model, item.doc, f) == Role::Activity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::AnalyzerOptions;
    use crate::project::Package;
    use flowbind_syntax::ast::ModuleMember;

    fn roles(source: &str) -> Vec<Role> {
        let package = Package::from_sources("acme", "orders", [("main.wf", source)]).unwrap();
        let options = AnalyzerOptions::default();
        let model = SemanticModel::build(&package, &options);
        let doc = package.documents().next().unwrap();
        doc.tree
            .members
            .iter()
            .filter_map(|m| match m {
                ModuleMember::Function(f) => Some(classify_function(&model, doc.id, f)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_markers() {
        let found = roles(
            r#"
            import ballerina/workflow;
            import ballerina/log;

            @workflow:Process
            function p() {}

            @workflow:Activity
            function a() {}

            @log:Sensitive
            function plain() {}

            function bare() {}
            "#,
        );
        assert_eq!(
            found,
            vec![Role::Process, Role::Activity, Role::Unmarked, Role::Unmarked]
        );
    }

    #[test]
    fn test_aliased_framework_import() {
        let found = roles(
            r#"
            import ballerina/workflow as wf;

            @wf:Activity
            function a() {}

            @workflow:Activity
            function b() {}
            "#,
        );
        assert_eq!(found, vec![Role::Activity, Role::Unmarked]);
    }

    #[test]
    fn test_first_marker_wins() {
        let found = roles(
            r#"
            import ballerina/workflow;

            @workflow:Activity
            @workflow:Process
            function both() {}
            "#,
        );
        assert_eq!(found, vec![Role::Activity]);
    }
}
