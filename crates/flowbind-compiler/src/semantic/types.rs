// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Structural type predicates.
//!
//! Types are judged from their declared descriptors, following named
//! references across modules. References that leave the package (or do not
//! resolve at all) are accepted so that missing library sources never
//! produce workflow diagnostics on their own.

use flowbind_syntax::ast::{BuiltinType, Literal, TypeDesc, TypeDescKind};

use super::{FrameworkItem, MAX_ALIAS_DEPTH, SemanticModel, TypeRef};
use crate::project::DocumentId;

/// Value spaces a type may draw from.
#[derive(Debug, Clone, Copy)]
struct Allowed {
    anydata: bool,
    error: bool,
    nil: bool,
}

const ANYDATA: Allowed = Allowed {
    anydata: true,
    error: false,
    nil: true,
};

const ANYDATA_OR_ERROR: Allowed = Allowed {
    anydata: true,
    error: true,
    nil: true,
};

const ERROR_OR_NIL: Allowed = Allowed {
    anydata: false,
    error: true,
    nil: true,
};

impl<'a> SemanticModel<'a> {
    /// Whether `ty` is a subtype of `anydata`.
    pub fn is_anydata(&self, doc: DocumentId, ty: &TypeDesc) -> bool {
        self.fits(doc, ty, ANYDATA, 0)
    }

    /// Whether `ty` is a subtype of `anydata|error`.
    pub fn is_subtype_of_anydata_or_error(&self, doc: DocumentId, ty: &TypeDesc) -> bool {
        self.fits(doc, ty, ANYDATA_OR_ERROR, 0)
    }

    /// Whether `ty` is a subtype of `error?`.
    pub fn is_subtype_of_error_or_nil(&self, doc: DocumentId, ty: &TypeDesc) -> bool {
        self.fits(doc, ty, ERROR_OR_NIL, 0)
    }

    /// Whether `ty` is the framework `Context` type.
    pub fn is_framework_context(&self, doc: DocumentId, ty: &TypeDesc) -> bool {
        self.is_framework_type(doc, ty, FrameworkItem::Context)
    }

    /// Whether values of `ty` are always immutable.
    pub fn is_readonly(&self, doc: DocumentId, ty: &TypeDesc) -> bool {
        self.readonly(doc, ty, 0)
    }

    /// Whether `ty` is a record whose fields are all `future<T>` with `T` anydata.
    ///
    /// The record needs at least one field, and an explicit rest field must
    /// be a future of anydata as well.
    pub fn is_events_record(&self, doc: DocumentId, ty: &TypeDesc) -> bool {
        let Some((doc, ty)) = self.resolve_alias(doc, ty) else {
            return false;
        };
        let TypeDescKind::Record(record) = &ty.kind else {
            return false;
        };
        if record.fields.is_empty() {
            return false;
        }
        record
            .fields
            .iter()
            .all(|field| self.is_anydata_future(doc, &field.ty))
            && record
                .rest
                .as_ref()
                .is_none_or(|rest| self.is_anydata_future(doc, rest))
    }

    fn is_anydata_future(&self, doc: DocumentId, ty: &TypeDesc) -> bool {
        match self.resolve_alias(doc, ty) {
            Some((
                doc,
                TypeDesc {
                    kind: TypeDescKind::Future(Some(inner)),
                    ..
                },
            )) => self.is_anydata(doc, inner),
            _ => false,
        }
    }

    /// Follow parentheses and named references to package definitions.
    fn resolve_alias<'t>(
        &self,
        doc: DocumentId,
        ty: &'t TypeDesc,
    ) -> Option<(DocumentId, &'t TypeDesc)>
    where
        'a: 't,
    {
        let mut current = (doc, ty);
        for _ in 0..MAX_ALIAS_DEPTH {
            match &current.1.kind {
                TypeDescKind::Paren(inner) => current = (current.0, inner),
                TypeDescKind::Named(name) => match self.resolve_type(current.0, name) {
                    TypeRef::Defined { doc, def } => current = (doc, &def.ty),
                    _ => return Some(current),
                },
                _ => return Some(current),
            }
        }
        None
    }

    fn fits(&self, doc: DocumentId, ty: &TypeDesc, allowed: Allowed, depth: usize) -> bool {
        // Recursive type definitions are accepted once the chain is this deep.
        if depth > MAX_ALIAS_DEPTH {
            return true;
        }
        let next = depth + 1;
        match &ty.kind {
            TypeDescKind::Builtin(builtin) => match builtin {
                BuiltinType::Int
                | BuiltinType::Float
                | BuiltinType::Decimal
                | BuiltinType::String
                | BuiltinType::Boolean
                | BuiltinType::Byte
                | BuiltinType::Anydata
                | BuiltinType::Json
                | BuiltinType::Xml => allowed.anydata,
                BuiltinType::Error => allowed.error,
                BuiltinType::Never => true,
                BuiltinType::Any
                | BuiltinType::Readonly
                | BuiltinType::Handle
                | BuiltinType::Typedesc => false,
            },
            TypeDescKind::Nil | TypeDescKind::Singleton(Literal::Nil) => allowed.nil,
            TypeDescKind::Singleton(_) => allowed.anydata,
            TypeDescKind::Var => true,
            TypeDescKind::Paren(inner) => self.fits(doc, inner, allowed, next),
            TypeDescKind::Optional(inner) => allowed.nil && self.fits(doc, inner, allowed, next),
            TypeDescKind::Array(inner) | TypeDescKind::Map(inner) => {
                allowed.anydata && self.fits(doc, inner, ANYDATA, next)
            }
            TypeDescKind::Union(members) => {
                members.iter().all(|m| self.fits(doc, m, allowed, next))
            }
            // `readonly & T` is as serializable as `T`.
            TypeDescKind::Intersection(members) => {
                members.iter().any(|m| self.fits(doc, m, allowed, next))
            }
            TypeDescKind::Record(record) => {
                allowed.anydata
                    && record
                        .fields
                        .iter()
                        .all(|f| self.fits(doc, &f.ty, ANYDATA, next))
                    && record
                        .rest
                        .as_ref()
                        .is_none_or(|rest| self.fits(doc, rest, ANYDATA, next))
            }
            TypeDescKind::Future(_) | TypeDescKind::Stream(..) | TypeDescKind::Function(_) => false,
            TypeDescKind::Named(name) => match self.resolve_type(doc, name) {
                TypeRef::Defined { doc, def } => self.fits(doc, &def.ty, allowed, next),
                TypeRef::Framework(_) => false,
                TypeRef::External | TypeRef::Unresolved => true,
            },
        }
    }

    fn readonly(&self, doc: DocumentId, ty: &TypeDesc, depth: usize) -> bool {
        if depth > MAX_ALIAS_DEPTH {
            return false;
        }
        let next = depth + 1;
        match &ty.kind {
            TypeDescKind::Builtin(builtin) => matches!(
                builtin,
                BuiltinType::Int
                    | BuiltinType::Float
                    | BuiltinType::Decimal
                    | BuiltinType::String
                    | BuiltinType::Boolean
                    | BuiltinType::Byte
                    | BuiltinType::Error
                    | BuiltinType::Readonly
                    | BuiltinType::Never
                    | BuiltinType::Typedesc
            ),
            TypeDescKind::Nil | TypeDescKind::Singleton(_) => true,
            TypeDescKind::Paren(inner) | TypeDescKind::Optional(inner) => {
                self.readonly(doc, inner, next)
            }
            TypeDescKind::Union(members) => members.iter().all(|m| self.readonly(doc, m, next)),
            TypeDescKind::Intersection(members) => {
                members.iter().any(|m| self.readonly(doc, m, next))
            }
            TypeDescKind::Named(name) => match self.resolve_type(doc, name) {
                TypeRef::Defined { doc, def } => self.readonly(doc, &def.ty, next),
                _ => false,
            },
            _ => false,
        }
    }
}
