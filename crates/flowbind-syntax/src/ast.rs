// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Syntax tree for workflow source files.
//!
//! Every node carries the [`Span`] it was parsed from. Nodes created by a
//! rewrite use [`Span::synthetic`], which the printer ignores.

use crate::span::Span;

// ============================================================================
// Names
// ============================================================================

/// An identifier with its span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    /// Identifier text.
    pub name: String,
    /// Source span.
    pub span: Span,
}

impl Ident {
    /// Create an identifier.
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }

    /// Create an identifier that does not come from source text.
    pub fn synthetic(name: impl Into<String>) -> Self {
        Self::new(name, Span::synthetic())
    }
}

/// A possibly module-qualified name, `name` or `prefix:name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRef {
    /// Module prefix, if qualified.
    pub prefix: Option<Ident>,
    /// The referenced name.
    pub name: Ident,
    /// Span of the whole reference.
    pub span: Span,
}

impl NameRef {
    /// Unqualified reference.
    pub fn simple(name: Ident) -> Self {
        let span = name.span;
        Self {
            prefix: None,
            name,
            span,
        }
    }

    /// Qualified reference without source positions.
    pub fn synthetic(prefix: Option<&str>, name: &str) -> Self {
        Self {
            prefix: prefix.map(Ident::synthetic),
            name: Ident::synthetic(name),
            span: Span::synthetic(),
        }
    }

    /// The reference as written, `prefix:name` or `name`.
    pub fn as_written(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix.name, self.name.name),
            None => self.name.name.clone(),
        }
    }
}

// ============================================================================
// Module level
// ============================================================================

/// A parsed source file.
#[derive(Debug, Clone, PartialEq)]
pub struct ModulePart {
    /// Import declarations, in source order.
    pub imports: Vec<ImportDecl>,
    /// Module members, in source order.
    pub members: Vec<ModuleMember>,
    /// Span of the whole file.
    pub span: Span,
}

/// `import org/name.sub as prefix;`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    /// Organization, when written.
    pub org: Option<Ident>,
    /// Dotted module name components.
    pub module: Vec<Ident>,
    /// Explicit `as` prefix.
    pub prefix: Option<Ident>,
    /// Source span.
    pub span: Span,
}

impl ImportDecl {
    /// Dotted module name, e.g. `workflow.internal`.
    pub fn module_name(&self) -> String {
        self.module
            .iter()
            .map(|part| part.name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Prefix used to refer to the module: the `as` alias, or the last name component.
    pub fn effective_prefix(&self) -> &str {
        match &self.prefix {
            Some(prefix) => &prefix.name,
            None => self
                .module
                .last()
                .map(|part| part.name.as_str())
                .unwrap_or_default(),
        }
    }
}

/// `@prefix:Name { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Annotation tag.
    pub name: NameRef,
    /// Optional mapping constructor value.
    pub value: Option<Expr>,
    /// Source span, starting at `@`.
    pub span: Span,
}

/// Declaration qualifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Qualifier {
    Public,
    Private,
    Isolated,
    Remote,
    Resource,
    Transactional,
    Final,
    Configurable,
}

impl Qualifier {
    /// Source keyword.
    pub fn as_str(&self) -> &'static str {
        match self {
            Qualifier::Public => "public",
            Qualifier::Private => "private",
            Qualifier::Isolated => "isolated",
            Qualifier::Remote => "remote",
            Qualifier::Resource => "resource",
            Qualifier::Transactional => "transactional",
            Qualifier::Final => "final",
            Qualifier::Configurable => "configurable",
        }
    }
}

/// Qualifier list in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Qualifiers(pub Vec<(Qualifier, Span)>);

impl Qualifiers {
    /// Whether the qualifier is present.
    pub fn has(&self, q: Qualifier) -> bool {
        self.0.iter().any(|(existing, _)| *existing == q)
    }

    /// Span of the qualifier, if present.
    pub fn span_of(&self, q: Qualifier) -> Option<Span> {
        self.0
            .iter()
            .find(|(existing, _)| *existing == q)
            .map(|(_, span)| *span)
    }

    /// Iterate qualifiers in source order.
    pub fn iter(&self) -> impl Iterator<Item = Qualifier> + '_ {
        self.0.iter().map(|(q, _)| *q)
    }
}

/// A top-level declaration. Member spans start after any annotations.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleMember {
    /// Function definition.
    Function(FunctionDef),
    /// Service declaration.
    Service(ServiceDecl),
    /// Module-level variable.
    Var(ModuleVarDecl),
    /// Constant.
    Const(ConstDecl),
    /// Type definition.
    Type(TypeDefinition),
    /// Listener declaration.
    Listener(ListenerDecl),
    /// Annotation declaration.
    Annotation(AnnotationDecl),
}

impl ModuleMember {
    /// Source span of the member.
    pub fn span(&self) -> Span {
        match self {
            ModuleMember::Function(f) => f.span,
            ModuleMember::Service(s) => s.span,
            ModuleMember::Var(v) => v.span,
            ModuleMember::Const(c) => c.span,
            ModuleMember::Type(t) => t.span,
            ModuleMember::Listener(l) => l.span,
            ModuleMember::Annotation(a) => a.span,
        }
    }
}

/// Function definition, also used for object and service methods.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    /// Attached annotations.
    pub annotations: Vec<Annotation>,
    /// Qualifiers before `function`.
    pub qualifiers: Qualifiers,
    /// Function name. For resource methods this is the accessor, e.g. `get`.
    pub name: Ident,
    /// Raw resource path of a resource method, e.g. `orders/[string id]`.
    pub resource_path: Option<String>,
    /// Parameters in declaration order.
    pub params: Vec<Param>,
    /// Declared return type.
    pub return_type: Option<TypeDesc>,
    /// Function body.
    pub body: Block,
    /// Span from the first qualifier (or `function`) to the closing brace.
    pub span: Span,
}

impl FunctionDef {
    /// Whether the function carries the `isolated` qualifier.
    pub fn is_isolated(&self) -> bool {
        self.qualifiers.has(Qualifier::Isolated)
    }

    /// Whether this is a remote method.
    pub fn is_remote(&self) -> bool {
        self.qualifiers.has(Qualifier::Remote)
    }

    /// Whether this is a resource method.
    pub fn is_resource(&self) -> bool {
        self.qualifiers.has(Qualifier::Resource)
    }
}

/// How a parameter receives its argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Must be supplied.
    Required,
    /// Has a default value.
    Defaultable,
    /// Collects remaining positional arguments.
    Rest,
}

/// Function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Attached annotations.
    pub annotations: Vec<Annotation>,
    /// Parameter kind.
    pub kind: ParamKind,
    /// Declared type.
    pub ty: TypeDesc,
    /// Parameter name.
    pub name: Ident,
    /// Default value of a defaultable parameter.
    pub default: Option<Expr>,
    /// Span from the type to the end of the parameter.
    pub span: Span,
}

/// `service /path on listener { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDecl {
    /// Attached annotations (the service metadata).
    pub annotations: Vec<Annotation>,
    /// Qualifiers before `service`.
    pub qualifiers: Qualifiers,
    /// Optional service type descriptor.
    pub type_desc: Option<TypeDesc>,
    /// Raw attach point text, e.g. `/orders` or `"name"`.
    pub base_path: Option<String>,
    /// Listener expressions after `on`.
    pub listeners: Vec<Expr>,
    /// Body members.
    pub members: Vec<ServiceMember>,
    /// Span of the `service` keyword.
    pub keyword_span: Span,
    /// Span from the first qualifier (or `service`) to the closing brace.
    pub span: Span,
}

/// Member of a service body.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceMember {
    /// Method definition.
    Method(FunctionDef),
    /// Object field.
    Field(ObjectField),
}

/// Field inside a service or object body.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectField {
    /// Attached annotations.
    pub annotations: Vec<Annotation>,
    /// Qualifiers.
    pub qualifiers: Qualifiers,
    /// Declared type.
    pub ty: TypeDesc,
    /// Field name.
    pub name: Ident,
    /// Initializer.
    pub init: Option<Expr>,
    /// Source span.
    pub span: Span,
}

/// Module-level variable.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleVarDecl {
    /// Attached annotations.
    pub annotations: Vec<Annotation>,
    /// Qualifiers.
    pub qualifiers: Qualifiers,
    /// Declared type.
    pub ty: TypeDesc,
    /// Variable name.
    pub name: Ident,
    /// Initializer; [`ExprKind::Required`] for `configurable T x = ?;`.
    pub init: Option<Expr>,
    /// Source span.
    pub span: Span,
}

/// `const T? NAME = expr;`
#[derive(Debug, Clone, PartialEq)]
pub struct ConstDecl {
    /// Attached annotations.
    pub annotations: Vec<Annotation>,
    /// Qualifiers.
    pub qualifiers: Qualifiers,
    /// Declared type, if any.
    pub ty: Option<TypeDesc>,
    /// Constant name.
    pub name: Ident,
    /// Value.
    pub value: Expr,
    /// Source span.
    pub span: Span,
}

/// `type Name T;`
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDefinition {
    /// Attached annotations.
    pub annotations: Vec<Annotation>,
    /// Qualifiers.
    pub qualifiers: Qualifiers,
    /// Type name.
    pub name: Ident,
    /// Defined type.
    pub ty: TypeDesc,
    /// Source span.
    pub span: Span,
}

/// `listener T? name = expr;`
#[derive(Debug, Clone, PartialEq)]
pub struct ListenerDecl {
    /// Attached annotations.
    pub annotations: Vec<Annotation>,
    /// Qualifiers.
    pub qualifiers: Qualifiers,
    /// Declared type, if any.
    pub ty: Option<TypeDesc>,
    /// Listener name.
    pub name: Ident,
    /// Initializer.
    pub init: Expr,
    /// Source span.
    pub span: Span,
}

/// `annotation T? Name on point, point;`
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationDecl {
    /// Qualifiers.
    pub qualifiers: Qualifiers,
    /// Value type, if any.
    pub ty: Option<TypeDesc>,
    /// Annotation tag name.
    pub name: Ident,
    /// Attach points as written, e.g. `function`, `service remote function`.
    pub attach_points: Vec<String>,
    /// Source span.
    pub span: Span,
}

// ============================================================================
// Types
// ============================================================================

/// Builtin type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum BuiltinType {
    Int,
    Float,
    Decimal,
    String,
    Boolean,
    Byte,
    Anydata,
    Any,
    Json,
    Xml,
    Error,
    Readonly,
    Never,
    Handle,
    Typedesc,
}

impl BuiltinType {
    /// Source keyword.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuiltinType::Int => "int",
            BuiltinType::Float => "float",
            BuiltinType::Decimal => "decimal",
            BuiltinType::String => "string",
            BuiltinType::Boolean => "boolean",
            BuiltinType::Byte => "byte",
            BuiltinType::Anydata => "anydata",
            BuiltinType::Any => "any",
            BuiltinType::Json => "json",
            BuiltinType::Xml => "xml",
            BuiltinType::Error => "error",
            BuiltinType::Readonly => "readonly",
            BuiltinType::Never => "never",
            BuiltinType::Handle => "handle",
            BuiltinType::Typedesc => "typedesc",
        }
    }
}

/// A type descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDesc {
    /// What kind of type.
    pub kind: TypeDescKind,
    /// Source span.
    pub span: Span,
}

impl TypeDesc {
    /// Create a type descriptor without source positions.
    pub fn synthetic(kind: TypeDescKind) -> Self {
        Self {
            kind,
            span: Span::synthetic(),
        }
    }

    /// Whether this is the inferred `var` marker.
    pub fn is_var(&self) -> bool {
        matches!(self.kind, TypeDescKind::Var)
    }
}

/// Type descriptor variants.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescKind {
    /// `int`, `string`, ...
    Builtin(BuiltinType),
    /// `()`
    Nil,
    /// `var`
    Var,
    /// `Name` or `prefix:Name`
    Named(NameRef),
    /// `T?`
    Optional(Box<TypeDesc>),
    /// `T[]`
    Array(Box<TypeDesc>),
    /// `A|B|C`
    Union(Vec<TypeDesc>),
    /// `A & B`
    Intersection(Vec<TypeDesc>),
    /// `map<T>`
    Map(Box<TypeDesc>),
    /// `future<T>`, or bare `future`
    Future(Option<Box<TypeDesc>>),
    /// `stream<T, E>`
    Stream(Box<TypeDesc>, Option<Box<TypeDesc>>),
    /// `function (A, B) returns R`, or bare `function`
    Function(Option<FunctionSig>),
    /// `record { ... }` and `record {| ... |}`
    Record(RecordType),
    /// Singleton type such as `"pending"` or `1`.
    Singleton(Literal),
    /// `(T)`
    Paren(Box<TypeDesc>),
}

/// Signature of a function type.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSig {
    /// Parameter types.
    pub params: Vec<TypeDesc>,
    /// Rest parameter type.
    pub rest: Option<Box<TypeDesc>>,
    /// Return type.
    pub return_type: Option<Box<TypeDesc>>,
}

/// Record type descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordType {
    /// Closed (`{| |}`) or open (`{ }`).
    pub closed: bool,
    /// Declared fields.
    pub fields: Vec<RecordField>,
    /// Rest field type `T...;`.
    pub rest: Option<Box<TypeDesc>>,
}

/// Field of a record type.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordField {
    /// `readonly` field qualifier.
    pub readonly: bool,
    /// Field type.
    pub ty: TypeDesc,
    /// Field name.
    pub name: Ident,
    /// `name?` optional field.
    pub optional: bool,
    /// Default value.
    pub default: Option<Expr>,
    /// Source span.
    pub span: Span,
}

// ============================================================================
// Statements
// ============================================================================

/// `{ stmts }`
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Statements in order.
    pub stmts: Vec<Stmt>,
    /// Span including braces.
    pub span: Span,
}

/// A statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    /// Statement kind.
    pub kind: StmtKind,
    /// Source span.
    pub span: Span,
}

/// Local variable declaration `final? T name = expr;`.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalVarDecl {
    /// Attached annotations.
    pub annotations: Vec<Annotation>,
    /// `final` qualifier.
    pub is_final: bool,
    /// Declared type, possibly `var`.
    pub ty: TypeDesc,
    /// Bound name.
    pub name: Ident,
    /// Initializer.
    pub init: Option<Expr>,
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
}

impl AssignOp {
    /// Source text.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
        }
    }
}

/// `on fail T name { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct OnFail {
    /// Declared error type.
    pub ty: TypeDesc,
    /// Bound error name.
    pub name: Ident,
    /// Handler body.
    pub body: Block,
}

/// Statement variants.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// Local variable declaration.
    VarDecl(LocalVarDecl),
    /// `target op value;`
    Assign {
        /// Assigned place.
        target: Expr,
        /// Operator.
        op: AssignOp,
        /// Assigned value.
        value: Expr,
    },
    /// Expression statement.
    Expr(Expr),
    /// `lock { ... }`
    Lock(Block),
    /// `if cond { ... } else ...`
    If {
        /// Condition.
        cond: Expr,
        /// Then branch.
        then_block: Block,
        /// Else branch: another `if` statement or a block statement.
        else_branch: Option<Box<Stmt>>,
    },
    /// `while cond { ... }`
    While {
        /// Condition.
        cond: Expr,
        /// Loop body.
        body: Block,
    },
    /// `foreach T x in expr { ... }`
    Foreach {
        /// Declared item type.
        ty: TypeDesc,
        /// Item name.
        name: Ident,
        /// Iterated expression.
        iter: Expr,
        /// Loop body.
        body: Block,
    },
    /// `return expr?;`
    Return(Option<Expr>),
    /// `do { ... } on fail ...`
    Do {
        /// Body.
        body: Block,
        /// Failure handler.
        on_fail: Option<OnFail>,
    },
    /// Nested block.
    Block(Block),
    /// `panic expr;`
    Panic(Expr),
    /// `fail expr;`
    Fail(Expr),
    /// `break;`
    Break,
    /// `continue;`
    Continue,
}

// ============================================================================
// Expressions
// ============================================================================

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    /// Expression kind.
    pub kind: ExprKind,
    /// Source span.
    pub span: Span,
}

impl Expr {
    /// Create an expression without source positions.
    pub fn synthetic(kind: ExprKind) -> Self {
        Self {
            kind,
            span: Span::synthetic(),
        }
    }

    /// Strip enclosing parentheses.
    pub fn unparenthesized(&self) -> &Expr {
        match &self.kind {
            ExprKind::Paren(inner) => inner.unparenthesized(),
            _ => self,
        }
    }
}

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// `()` or `null`
    Nil,
    /// `true` / `false`
    Bool(bool),
    /// Integer literal as written.
    Int(String),
    /// Floating point literal as written.
    Float(String),
    /// String literal value.
    String(String),
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

impl UnaryOp {
    /// Source text.
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    /// Source text.
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::LtEq => "<=",
            BinaryOp::GtEq => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }

    /// Binding power; higher binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq | BinaryOp::NotEq => 3,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::LtEq | BinaryOp::GtEq => 4,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 6,
        }
    }
}

/// Call argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// `expr`
    Positional(Expr),
    /// `name = expr`
    Named {
        /// Parameter name.
        name: Ident,
        /// Argument value.
        value: Expr,
    },
    /// `...expr`
    Rest(Expr),
}

impl Arg {
    /// The argument's value expression.
    pub fn expr(&self) -> &Expr {
        match self {
            Arg::Positional(expr) | Arg::Rest(expr) => expr,
            Arg::Named { value, .. } => value,
        }
    }
}

/// Key of a mapping constructor field.
#[derive(Debug, Clone, PartialEq)]
pub enum MappingKey {
    /// `name: value`
    Ident(Ident),
    /// `"name": value`
    String(String, Span),
    /// `[expr]: value`
    Computed(Box<Expr>),
}

/// Field of a mapping constructor.
#[derive(Debug, Clone, PartialEq)]
pub enum MappingField {
    /// `key: value`
    KeyValue {
        /// Field key.
        key: MappingKey,
        /// Field value.
        value: Expr,
    },
    /// `name` (shorthand for `name: name`)
    Shorthand(NameRef),
    /// `...expr`
    Spread(Expr),
}

impl MappingField {
    /// Statically known field name, when the key is not computed.
    pub fn static_key(&self) -> Option<&str> {
        match self {
            MappingField::KeyValue {
                key: MappingKey::Ident(ident),
                ..
            } => Some(&ident.name),
            MappingField::KeyValue {
                key: MappingKey::String(value, _),
                ..
            } => Some(value),
            MappingField::Shorthand(name) if name.prefix.is_none() => Some(&name.name.name),
            _ => None,
        }
    }
}

/// Expression variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Literal value.
    Literal(Literal),
    /// Variable or function reference.
    Name(NameRef),
    /// `f(args)` or `prefix:f(args)`
    Call {
        /// Called function.
        callee: NameRef,
        /// Arguments.
        args: Vec<Arg>,
    },
    /// `receiver.method(args)`
    MethodCall {
        /// Receiver expression.
        receiver: Box<Expr>,
        /// Method name.
        method: Ident,
        /// Arguments.
        args: Vec<Arg>,
    },
    /// `receiver->method(args)`
    RemoteCall {
        /// Client expression.
        receiver: Box<Expr>,
        /// Remote method name.
        method: Ident,
        /// Arguments.
        args: Vec<Arg>,
    },
    /// `target.field`
    FieldAccess {
        /// Accessed expression.
        target: Box<Expr>,
        /// Field name.
        field: Ident,
    },
    /// `target[index]`
    Index {
        /// Indexed expression.
        target: Box<Expr>,
        /// Index expression.
        index: Box<Expr>,
    },
    /// `{ k: v, ... }`
    Mapping(Vec<MappingField>),
    /// `[a, b]`
    List(Vec<Expr>),
    /// Prefix operator.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: Box<Expr>,
    },
    /// Infix operator.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
    /// `expr is T`
    TypeTest {
        /// Tested expression.
        expr: Box<Expr>,
        /// Tested type.
        ty: TypeDesc,
    },
    /// `cond ? a : b`
    Conditional {
        /// Condition.
        cond: Box<Expr>,
        /// Value when true.
        then_expr: Box<Expr>,
        /// Value when false.
        else_expr: Box<Expr>,
    },
    /// `check expr`
    Check(Box<Expr>),
    /// `checkpanic expr`
    CheckPanic(Box<Expr>),
    /// `<T> expr`
    Cast {
        /// Target type.
        ty: TypeDesc,
        /// Cast operand.
        expr: Box<Expr>,
    },
    /// `new T(args)` or `new (args)`
    New {
        /// Constructed type.
        ty: Option<TypeDesc>,
        /// Constructor arguments.
        args: Vec<Arg>,
    },
    /// `wait expr`
    Wait(Box<Expr>),
    /// `start call`
    Start(Box<Expr>),
    /// `(expr)`
    Paren(Box<Expr>),
    /// `?` as the initializer of a configurable variable.
    Required,
}
