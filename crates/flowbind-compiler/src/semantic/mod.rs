// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Name and type resolution over a whole package.
//!
//! The model is built once per analysis. Module-level declarations are
//! indexed per module, imports per document, and every value reference in
//! every document is resolved up front into a side table keyed by the
//! reference's span, so analyzers never re-implement scoping.
//!
//! Workflow markers are recognized by resolving the annotation or type
//! reference through the document's imports to the framework module, never
//! by comparing prefixes textually. A document that imports some other
//! module under the prefix `workflow` does not get workflow semantics.

pub mod types;

use std::collections::{HashMap, HashSet};

use flowbind_syntax::Span;
use flowbind_syntax::ast::{
    Expr, ExprKind, FunctionDef, ImportDecl, ListenerDecl, ModuleMember, ModuleVarDecl, NameRef,
    ServiceDecl, Stmt, StmtKind, TypeDefinition, TypeDesc, TypeDescKind,
};
use flowbind_syntax::visit::{self, Visitor};
use tracing::debug;

use crate::options::AnalyzerOptions;
use crate::project::{DocumentId, ModuleId, Package};

/// Upper bound on alias chains followed while resolving types and listeners.
const MAX_ALIAS_DEPTH: usize = 32;

// ============================================================================
// Resolution results
// ============================================================================

/// A module-level declaration: the document it lives in and its member index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemRef {
    /// Declaring document.
    pub doc: DocumentId,
    /// Index into the document's `members`.
    pub index: usize,
}

/// Declarations exported by the workflow framework modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameworkItem {
    /// `@workflow:Process` annotation.
    Process,
    /// `@workflow:Activity` annotation.
    Activity,
    /// `@workflow:Signal` annotation.
    Signal,
    /// `@workflow:Query` annotation.
    Query,
    /// `workflow:Context` object type.
    Context,
    /// `workflow:Listener` listener type.
    Listener,
    /// Internal `invokeActivity` dispatch function.
    InvokeActivity,
    /// Internal `@Activities` annotation written by the rewriter.
    Activities,
    /// Any other framework declaration.
    Other,
}

impl FrameworkItem {
    fn public(name: &str) -> Self {
        match name {
            "Process" => FrameworkItem::Process,
            "Activity" => FrameworkItem::Activity,
            "Signal" => FrameworkItem::Signal,
            "Query" => FrameworkItem::Query,
            "Context" => FrameworkItem::Context,
            "Listener" => FrameworkItem::Listener,
            _ => FrameworkItem::Other,
        }
    }

    fn internal(name: &str) -> Self {
        match name {
            "invokeActivity" => FrameworkItem::InvokeActivity,
            "Activities" => FrameworkItem::Activities,
            _ => FrameworkItem::Other,
        }
    }
}

/// What a value reference denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    /// Parameter, local variable, loop variable or `self`.
    Local,
    /// Module-level function.
    Function(ItemRef),
    /// Module-level variable.
    ModuleVar(ItemRef),
    /// Module-level constant.
    Const(ItemRef),
    /// Module-level listener.
    Listener(ItemRef),
    /// Declaration of the workflow framework.
    Framework(FrameworkItem),
    /// Declaration of a module outside the package.
    External,
    /// Nothing visible under that name.
    Unresolved,
}

/// What a type reference denotes.
#[derive(Debug, Clone, Copy)]
pub enum TypeRef<'a> {
    /// A type definition in the package.
    Defined {
        /// Declaring document, used to resolve names inside the definition.
        doc: DocumentId,
        /// The definition.
        def: &'a TypeDefinition,
    },
    /// A framework type.
    Framework(FrameworkItem),
    /// A type of a module outside the package.
    External,
    /// Nothing visible under that name.
    Unresolved,
}

/// Where an import prefix points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportTarget {
    /// A module of the current package, by index.
    Module(usize),
    /// The public framework module.
    Framework,
    /// The framework's internal support module.
    FrameworkInternal,
    /// Any other module.
    External(ModuleId),
}

#[derive(Debug, Default)]
struct ModuleScope {
    values: HashMap<String, ItemRef>,
    types: HashMap<String, ItemRef>,
}

// ============================================================================
// Semantic model
// ============================================================================

/// Resolved view of a [`Package`].
pub struct SemanticModel<'a> {
    package: &'a Package,
    options: &'a AnalyzerOptions,
    scopes: Vec<ModuleScope>,
    imports: HashMap<DocumentId, HashMap<String, ImportTarget>>,
    symbols: HashMap<(DocumentId, Span), Symbol>,
}

impl<'a> SemanticModel<'a> {
    /// Index declarations and resolve every value reference in the package.
    pub fn build(package: &'a Package, options: &'a AnalyzerOptions) -> Self {
        let mut scopes: Vec<ModuleScope> = package
            .modules
            .iter()
            .map(|_| ModuleScope::default())
            .collect();
        let mut imports = HashMap::new();

        for doc in package.documents() {
            let scope = &mut scopes[doc.id.module];
            for (index, member) in doc.tree.members.iter().enumerate() {
                let item = ItemRef { doc: doc.id, index };
                match member {
                    ModuleMember::Function(f) => {
                        scope.values.insert(f.name.name.clone(), item);
                    }
                    ModuleMember::Var(v) => {
                        scope.values.insert(v.name.name.clone(), item);
                    }
                    ModuleMember::Const(c) => {
                        scope.values.insert(c.name.name.clone(), item);
                    }
                    ModuleMember::Listener(l) => {
                        scope.values.insert(l.name.name.clone(), item);
                    }
                    ModuleMember::Type(t) => {
                        scope.types.insert(t.name.name.clone(), item);
                    }
                    ModuleMember::Service(_) | ModuleMember::Annotation(_) => {}
                }
            }

            let table = doc
                .tree
                .imports
                .iter()
                .map(|import| {
                    (
                        import.effective_prefix().to_string(),
                        import_target(package, options, import),
                    )
                })
                .collect();
            imports.insert(doc.id, table);
        }

        let mut model = Self {
            package,
            options,
            scopes,
            imports,
            symbols: HashMap::new(),
        };

        let mut symbols = HashMap::new();
        for doc in package.documents() {
            let mut resolver = Resolver {
                model: &model,
                doc: doc.id,
                locals: Vec::new(),
                symbols: &mut symbols,
            };
            resolver.visit_module_part(&doc.tree);
        }
        debug!(references = symbols.len(), "Resolved value references");
        model.symbols = symbols;
        model
    }

    /// The analyzed package.
    pub fn package(&self) -> &'a Package {
        self.package
    }

    /// Analyzer options in effect.
    pub fn options(&self) -> &'a AnalyzerOptions {
        self.options
    }

    /// The member an item refers to.
    pub fn member(&self, item: ItemRef) -> &'a ModuleMember {
        &self.package.document(item.doc).tree.members[item.index]
    }

    /// The function an item refers to, if it is one.
    pub fn function(&self, item: ItemRef) -> Option<&'a FunctionDef> {
        match self.member(item) {
            ModuleMember::Function(f) => Some(f),
            _ => None,
        }
    }

    /// The module variable an item refers to, if it is one.
    pub fn module_var(&self, item: ItemRef) -> Option<&'a ModuleVarDecl> {
        match self.member(item) {
            ModuleMember::Var(v) => Some(v),
            _ => None,
        }
    }

    fn listener(&self, item: ItemRef) -> Option<&'a ListenerDecl> {
        match self.member(item) {
            ModuleMember::Listener(l) => Some(l),
            _ => None,
        }
    }

    /// Where an import prefix of a document points.
    pub fn import(&self, doc: DocumentId, prefix: &str) -> Option<&ImportTarget> {
        self.imports.get(&doc).and_then(|table| table.get(prefix))
    }

    /// Resolve a value reference as seen from `doc`.
    ///
    /// References that were part of the parsed document are answered from
    /// the side table, so locals shadow module-level names. Other references
    /// are resolved at module scope.
    pub fn symbol(&self, doc: DocumentId, name: &NameRef) -> Symbol {
        match self.symbols.get(&(doc, name.span)) {
            Some(symbol) => *symbol,
            None => self.resolve_global(doc, name),
        }
    }

    /// Resolve a reference to a package function.
    pub fn resolve_function(
        &self,
        doc: DocumentId,
        name: &NameRef,
    ) -> Option<(ItemRef, &'a FunctionDef)> {
        match self.symbol(doc, name) {
            Symbol::Function(item) => self.function(item).map(|f| (item, f)),
            _ => None,
        }
    }

    /// The framework annotation an annotation tag denotes, if any.
    pub fn framework_annotation(&self, doc: DocumentId, name: &NameRef) -> Option<FrameworkItem> {
        let prefix = name.prefix.as_ref()?;
        match self.import(doc, &prefix.name)? {
            ImportTarget::Framework => Some(FrameworkItem::public(&name.name.name)),
            ImportTarget::FrameworkInternal => Some(FrameworkItem::internal(&name.name.name)),
            _ => None,
        }
    }

    /// Resolve a type reference as seen from `doc`.
    pub fn resolve_type(&self, doc: DocumentId, name: &NameRef) -> TypeRef<'a> {
        let lookup = |module: usize| -> TypeRef<'a> {
            match self.scopes[module].types.get(&name.name.name) {
                Some(item) => match self.member(*item) {
                    ModuleMember::Type(def) => TypeRef::Defined { doc: item.doc, def },
                    _ => TypeRef::Unresolved,
                },
                None => TypeRef::Unresolved,
            }
        };
        match &name.prefix {
            None => lookup(doc.module),
            Some(prefix) => match self.import(doc, &prefix.name) {
                Some(ImportTarget::Module(module)) => lookup(*module),
                Some(ImportTarget::Framework) => {
                    TypeRef::Framework(FrameworkItem::public(&name.name.name))
                }
                Some(ImportTarget::FrameworkInternal) => {
                    TypeRef::Framework(FrameworkItem::internal(&name.name.name))
                }
                Some(ImportTarget::External(_)) => TypeRef::External,
                None => TypeRef::Unresolved,
            },
        }
    }

    /// Whether `ty` denotes the given framework type, following aliases.
    pub fn is_framework_type(&self, doc: DocumentId, ty: &TypeDesc, item: FrameworkItem) -> bool {
        self.is_framework_type_at(doc, ty, item, 0)
    }

    fn is_framework_type_at(
        &self,
        doc: DocumentId,
        ty: &TypeDesc,
        item: FrameworkItem,
        depth: usize,
    ) -> bool {
        if depth > MAX_ALIAS_DEPTH {
            return false;
        }
        match &ty.kind {
            TypeDescKind::Paren(inner) => self.is_framework_type_at(doc, inner, item, depth + 1),
            TypeDescKind::Named(name) => match self.resolve_type(doc, name) {
                TypeRef::Framework(found) => found == item,
                TypeRef::Defined { doc, def } => {
                    self.is_framework_type_at(doc, &def.ty, item, depth + 1)
                }
                TypeRef::External | TypeRef::Unresolved => false,
            },
            _ => false,
        }
    }

    /// Whether a service is attached to a workflow listener.
    ///
    /// A listener expression qualifies when it constructs the framework
    /// listener, or references a listener or module variable that is typed
    /// by or initialized with it.
    pub fn is_workflow_service(&self, doc: DocumentId, service: &ServiceDecl) -> bool {
        service
            .listeners
            .iter()
            .any(|listener| self.is_workflow_listener(doc, listener, 0))
    }

    fn is_workflow_listener(&self, doc: DocumentId, expr: &Expr, depth: usize) -> bool {
        if depth > MAX_ALIAS_DEPTH {
            return false;
        }
        match &expr.unparenthesized().kind {
            ExprKind::Check(inner) | ExprKind::CheckPanic(inner) => {
                self.is_workflow_listener(doc, inner, depth + 1)
            }
            ExprKind::New { ty: Some(ty), .. } => {
                self.is_framework_type(doc, ty, FrameworkItem::Listener)
            }
            ExprKind::Name(name) => match self.symbol(doc, name) {
                Symbol::Listener(item) => self.listener(item).is_some_and(|decl| {
                    decl.ty.as_ref().is_some_and(|ty| {
                        self.is_framework_type(item.doc, ty, FrameworkItem::Listener)
                    }) || self.is_workflow_listener(item.doc, &decl.init, depth + 1)
                }),
                Symbol::ModuleVar(item) => self.module_var(item).is_some_and(|decl| {
                    self.is_framework_type(item.doc, &decl.ty, FrameworkItem::Listener)
                        || decl
                            .init
                            .as_ref()
                            .is_some_and(|init| self.is_workflow_listener(item.doc, init, depth + 1))
                }),
                _ => false,
            },
            _ => false,
        }
    }

    /// Whether a document already imports the given module.
    pub fn imports_module(&self, doc: DocumentId, target: &ImportTarget) -> bool {
        self.imports
            .get(&doc)
            .is_some_and(|table| table.values().any(|t| t == target))
    }

    fn resolve_global(&self, doc: DocumentId, name: &NameRef) -> Symbol {
        let lookup = |module: usize| -> Symbol {
            match self.scopes[module].values.get(&name.name.name) {
                Some(item) => self.value_symbol(*item),
                None => Symbol::Unresolved,
            }
        };
        match &name.prefix {
            None => lookup(doc.module),
            Some(prefix) => match self.import(doc, &prefix.name) {
                Some(ImportTarget::Module(module)) => lookup(*module),
                Some(ImportTarget::Framework) => {
                    Symbol::Framework(FrameworkItem::public(&name.name.name))
                }
                Some(ImportTarget::FrameworkInternal) => {
                    Symbol::Framework(FrameworkItem::internal(&name.name.name))
                }
                Some(ImportTarget::External(_)) => Symbol::External,
                None => Symbol::Unresolved,
            },
        }
    }

    fn value_symbol(&self, item: ItemRef) -> Symbol {
        match self.member(item) {
            ModuleMember::Function(_) => Symbol::Function(item),
            ModuleMember::Var(_) => Symbol::ModuleVar(item),
            ModuleMember::Const(_) => Symbol::Const(item),
            ModuleMember::Listener(_) => Symbol::Listener(item),
            _ => Symbol::Unresolved,
        }
    }
}

fn import_target(package: &Package, options: &AnalyzerOptions, import: &ImportDecl) -> ImportTarget {
    let org = import.org.as_ref().map(|o| o.name.as_str());
    let module = import.module_name();
    if org == Some(options.framework_org.as_str()) {
        if module == options.framework_module {
            return ImportTarget::Framework;
        }
        if module == options.internal_module {
            return ImportTarget::FrameworkInternal;
        }
    }
    if (org.is_none() || org == Some(package.org.as_str()))
        && let Some(idx) = package.modules.iter().position(|m| m.id.name == module)
    {
        return ImportTarget::Module(idx);
    }
    ImportTarget::External(ModuleId::new(org.unwrap_or_default(), module))
}

// ============================================================================
// Reference resolver
// ============================================================================

struct Resolver<'m, 'a> {
    model: &'m SemanticModel<'a>,
    doc: DocumentId,
    locals: Vec<HashSet<String>>,
    symbols: &'m mut HashMap<(DocumentId, Span), Symbol>,
}

impl Resolver<'_, '_> {
    fn declare(&mut self, name: &str) {
        if let Some(scope) = self.locals.last_mut() {
            scope.insert(name.to_string());
        }
    }

    fn is_local(&self, name: &str) -> bool {
        self.locals.iter().rev().any(|scope| scope.contains(name))
    }

    fn scoped(&mut self, names: &[&str], f: impl FnOnce(&mut Self)) {
        self.locals
            .push(names.iter().map(|n| n.to_string()).collect());
        f(self);
        self.locals.pop();
    }
}

impl Visitor for Resolver<'_, '_> {
    fn visit_function(&mut self, function: &FunctionDef) {
        for annotation in &function.annotations {
            self.visit_annotation(annotation);
        }
        self.scoped(&[], |r| {
            for param in &function.params {
                r.visit_param(param);
                r.declare(&param.name.name);
            }
            if let Some(ret) = &function.return_type {
                r.visit_type(ret);
            }
            r.visit_block(&function.body);
        });
    }

    fn visit_service(&mut self, service: &ServiceDecl) {
        self.scoped(&["self"], |r| visit::walk_service(r, service));
    }

    fn visit_block(&mut self, block: &flowbind_syntax::ast::Block) {
        self.scoped(&[], |r| visit::walk_block(r, block));
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Foreach {
                ty,
                name,
                iter,
                body,
            } => {
                self.visit_type(ty);
                self.visit_expr(iter);
                self.scoped(&[name.name.as_str()], |r| r.visit_block(body));
            }
            StmtKind::Do { body, on_fail } => {
                self.visit_block(body);
                if let Some(on_fail) = on_fail {
                    self.visit_type(&on_fail.ty);
                    self.scoped(&[on_fail.name.name.as_str()], |r| {
                        r.visit_block(&on_fail.body)
                    });
                }
            }
            _ => visit::walk_stmt(self, stmt),
        }
    }

    fn visit_local_var_decl(&mut self, decl: &flowbind_syntax::ast::LocalVarDecl) {
        visit::walk_local_var_decl(self, decl);
        self.declare(&decl.name.name);
    }

    fn visit_name_ref(&mut self, name: &NameRef) {
        let symbol = if name.prefix.is_none() && self.is_local(&name.name.name) {
            Symbol::Local
        } else {
            self.model.resolve_global(self.doc, name)
        };
        self.symbols.insert((self.doc, name.span), symbol);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowbind_syntax::ast::ServiceMember;

    fn package(sources: &[(&str, &str)]) -> Package {
        Package::from_sources("acme", "orders", sources.iter().copied()).unwrap()
    }

    #[derive(Default)]
    struct Names(Vec<(String, Span)>);

    impl Visitor for Names {
        fn visit_name_ref(&mut self, name: &NameRef) {
            self.0.push((name.as_written(), name.span));
        }
    }

    fn symbols_of(model: &SemanticModel<'_>, doc: DocumentId) -> Vec<(String, Symbol)> {
        let mut names = Names::default();
        names.visit_module_part(&model.package().document(doc).tree);
        names
            .0
            .into_iter()
            .map(|(written, span)| {
                let symbol = model.symbols[&(doc, span)];
                (written, symbol)
            })
            .collect()
    }

    #[test]
    fn test_locals_shadow_module_symbols() {
        let pkg = package(&[(
            "main.wf",
            r#"
            int counter = 0;
            function f(int counter) returns int {
                return counter;
            }
            function g() returns int {
                return counter;
            }
            "#,
        )]);
        let options = AnalyzerOptions::default();
        let model = SemanticModel::build(&pkg, &options);
        let doc = pkg.documents().next().unwrap().id;
        let symbols = symbols_of(&model, doc);
        assert_eq!(symbols[0].1, Symbol::Local);
        assert!(matches!(symbols[1].1, Symbol::ModuleVar(_)));
    }

    #[test]
    fn test_qualified_reference_resolves_across_modules() {
        let pkg = package(&[
            (
                "main.wf",
                "import orders.m1;\nfunction f() { int x = m1:run(); }",
            ),
            ("modules/m1/a.wf", "function run() returns int { return 1; }"),
        ]);
        let options = AnalyzerOptions::default();
        let model = SemanticModel::build(&pkg, &options);
        let doc = pkg.document_by_path("main.wf").unwrap().id;
        let symbols = symbols_of(&model, doc);
        let Symbol::Function(item) = symbols[0].1 else {
            panic!("expected function, got {:?}", symbols[0].1);
        };
        assert_eq!(model.function(item).unwrap().name.name, "run");
        assert_eq!(item.doc.module, 1);
    }

    #[test]
    fn test_framework_annotation_requires_framework_import() {
        let pkg = package(&[
            (
                "a.wf",
                "import ballerina/workflow;\n@workflow:Activity\nfunction a() {}",
            ),
            (
                "b.wf",
                "import acme/workflow;\n@workflow:Activity\nfunction b() {}",
            ),
        ]);
        let options = AnalyzerOptions::default();
        let model = SemanticModel::build(&pkg, &options);
        let resolve = |path: &str| {
            let doc = pkg.document_by_path(path).unwrap();
            let ModuleMember::Function(f) = &doc.tree.members[0] else {
                panic!("expected function");
            };
            model.framework_annotation(doc.id, &f.annotations[0].name)
        };
        assert_eq!(resolve("a.wf"), Some(FrameworkItem::Activity));
        assert_eq!(resolve("b.wf"), None);
    }

    #[test]
    fn test_workflow_service_detection() {
        let pkg = package(&[(
            "main.wf",
            r#"
            import ballerina/workflow;
            import ballerina/http;

            listener workflow:Listener wl = new;
            listener http:Listener hl = new (8080);

            service on wl {
            }

            service on new workflow:Listener() {
            }

            service /api on hl {
            }
            "#,
        )]);
        let options = AnalyzerOptions::default();
        let model = SemanticModel::build(&pkg, &options);
        let doc = pkg.documents().next().unwrap();
        let flags: Vec<bool> = doc
            .tree
            .members
            .iter()
            .filter_map(|m| match m {
                ModuleMember::Service(s) => Some(model.is_workflow_service(doc.id, s)),
                _ => None,
            })
            .collect();
        assert_eq!(flags, vec![true, true, false]);
    }

    #[test]
    fn test_self_is_local_in_service_methods() {
        let pkg = package(&[(
            "main.wf",
            r#"
            service on x {
                isolated remote function execute() {
                    int y = self.count;
                }
            }
            "#,
        )]);
        let options = AnalyzerOptions::default();
        let model = SemanticModel::build(&pkg, &options);
        let doc = pkg.documents().next().unwrap();
        let ModuleMember::Service(service) = &doc.tree.members[0] else {
            panic!("expected service");
        };
        assert!(matches!(service.members[0], ServiceMember::Method(_)));
        let symbols = symbols_of(&model, doc.id);
        assert_eq!(symbols[0], ("x".to_string(), Symbol::Unresolved));
        assert_eq!(symbols[1], ("self".to_string(), Symbol::Local));
    }
}
