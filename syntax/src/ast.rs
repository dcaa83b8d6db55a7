// Copyright (c) 2016-2021 Fabian Schuiki

//! The abstract syntax tree the parser produces. Nodes are written once
//! during parsing and never mutated; they stay addressable for the lifetime
//! of the compilation unit that owns the root.

use crate::token::{AssignOp, Kw, Lit, Op};
use sylva_common::name::Name;
use sylva_common::source::{Span, Spanned, INVALID_SPAN};
use sylva_common::util::{HasDesc, HasSpan};

pub use self::ExprData::*;
pub use self::StmtData::*;
pub use self::TypeData::*;

/// The tag carried by every syntax node. Downstream tools pattern-match on
/// this to dispatch without knowing the node's concrete type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SyntaxKind {
    Root,
    ModuleDecl,
    PackageDecl,
    ClassDecl,
    ImportDecl,
    ParamDecl,
    Typedef,
    PortDecl,
    Port,
    Procedure,
    SubroutineDecl,
    ContAssign,
    GenvarDecl,
    GenerateRegion,
    GenerateFor,
    GenerateIf,
    GenerateCase,
    GenerateBlock,
    Assertion,
    NetDecl,
    VarDecl,
    Inst,
    ConstraintDecl,
    ConstraintExpr,
    ConstraintSoftExpr,
    ConstraintImplication,
    ConstraintConditional,
    ConstraintUnique,
    ConstraintList,
    Timeunit,
    DummyItem,

    NullStmt,
    SequentialBlock,
    ParallelBlock,
    IfStmt,
    CaseStmt,
    ForeverStmt,
    RepeatStmt,
    WhileStmt,
    DoStmt,
    ForStmt,
    ForeachStmt,
    ExprStmt,
    VarDeclStmt,
    GenvarDeclStmt,
    TimedStmt,
    AssertionStmt,
    ReturnStmt,
    BreakStmt,
    ContinueStmt,
    ImportStmt,
    AssignStmt,
    WaitExprStmt,
    WaitForkStmt,
    DisableForkStmt,
    DisableStmt,
    ErrorStmt,

    LiteralExpr,
    IdentExpr,
    SysIdentExpr,
    ScopeExpr,
    IndexExpr,
    UnaryExpr,
    BinaryExpr,
    TernaryExpr,
    AssignExpr,
    CallExpr,
    MemberExpr,
    PatternExpr,
    InsideExpr,
    CastExpr,
    CastSizeExpr,
    CastSignExpr,
    ConcatExpr,
    EmptyQueueExpr,
    RangeExpr,
    MinTypMaxExpr,
    ErrorExpr,

    ImplicitType,
    NamedType,
    BuiltinType,
    EnumType,
    StructType,
}

/// A visitor for the AST. The default methods descend into children; an
/// implementation overrides the node kinds it cares about.
pub trait Visitor {
    fn visit_root(&mut self, node: &Root) {
        node.accept(self);
    }
    fn visit_item(&mut self, node: &Item) {
        node.accept(self);
    }
    fn visit_module(&mut self, node: &ModDecl) {
        node.accept(self);
    }
    fn visit_package(&mut self, node: &PackageDecl) {
        node.accept(self);
    }
    fn visit_class(&mut self, node: &ClassDecl) {
        node.accept(self);
    }
    fn visit_constraint(&mut self, node: &Constraint) {
        node.accept(self);
    }
    fn visit_constraint_item(&mut self, node: &ConstraintItem) {
        node.accept(self);
    }
    fn visit_port(&mut self, node: &Port) {
        node.accept(self);
    }
    fn visit_procedure(&mut self, node: &Procedure) {
        node.accept(self);
    }
    fn visit_stmt(&mut self, node: &Stmt) {
        node.accept(self);
    }
    fn visit_expr(&mut self, node: &Expr) {
        node.accept(self);
    }
    fn visit_type(&mut self, node: &Type) {
        node.accept(self);
    }
    fn visit_assertion(&mut self, node: &Assertion) {
        node.accept(self);
    }
}

/// A node that walks a `Visitor` over its children.
pub trait AcceptVisitor {
    fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V);
}

impl<T> AcceptVisitor for Vec<T>
where
    T: AcceptVisitor,
{
    fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        for c in self {
            c.accept(visitor);
        }
    }
}

impl<T> AcceptVisitor for Option<T>
where
    T: AcceptVisitor,
{
    fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        if let Some(c) = self {
            c.accept(visitor);
        }
    }
}

impl<T> AcceptVisitor for Box<T>
where
    T: AcceptVisitor,
{
    fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        (**self).accept(visitor)
    }
}

/// The root of a parsed compilation unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Root {
    pub span: Span,
    pub timeunits: Timeunit,
    pub items: Vec<Item>,
}

impl Root {
    pub fn kind(&self) -> SyntaxKind {
        SyntaxKind::Root
    }
}

impl HasSpan for Root {
    fn span(&self) -> Span {
        self.span
    }
}

impl AcceptVisitor for Root {
    fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        for item in &self.items {
            visitor.visit_item(item);
        }
    }
}

/// An item in a compilation unit, module, package, or generate scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Item {
    Dummy,
    ModuleDecl(ModDecl),
    PackageDecl(PackageDecl),
    ClassDecl(ClassDecl),
    ImportDecl(ImportDecl),
    ParamDecl(ParamDecl),
    Typedef(Typedef),
    PortDecl(PortDecl),
    Procedure(Procedure),
    SubroutineDecl(SubroutineDecl),
    ContAssign(ContAssign),
    GenvarDecl(Vec<GenvarDecl>),
    GenerateRegion(Span, Vec<Item>),
    GenerateFor(GenerateFor),
    GenerateIf(GenerateIf),
    GenerateCase(GenerateCase),
    Assertion(Assertion),
    NetDecl(NetDecl),
    VarDecl(VarDecl),
    Inst(Inst),
}

impl Item {
    pub fn kind(&self) -> SyntaxKind {
        match *self {
            Item::Dummy => SyntaxKind::DummyItem,
            Item::ModuleDecl(_) => SyntaxKind::ModuleDecl,
            Item::PackageDecl(_) => SyntaxKind::PackageDecl,
            Item::ClassDecl(_) => SyntaxKind::ClassDecl,
            Item::ImportDecl(_) => SyntaxKind::ImportDecl,
            Item::ParamDecl(_) => SyntaxKind::ParamDecl,
            Item::Typedef(_) => SyntaxKind::Typedef,
            Item::PortDecl(_) => SyntaxKind::PortDecl,
            Item::Procedure(_) => SyntaxKind::Procedure,
            Item::SubroutineDecl(_) => SyntaxKind::SubroutineDecl,
            Item::ContAssign(_) => SyntaxKind::ContAssign,
            Item::GenvarDecl(_) => SyntaxKind::GenvarDecl,
            Item::GenerateRegion(..) => SyntaxKind::GenerateRegion,
            Item::GenerateFor(_) => SyntaxKind::GenerateFor,
            Item::GenerateIf(_) => SyntaxKind::GenerateIf,
            Item::GenerateCase(_) => SyntaxKind::GenerateCase,
            Item::Assertion(_) => SyntaxKind::Assertion,
            Item::NetDecl(_) => SyntaxKind::NetDecl,
            Item::VarDecl(_) => SyntaxKind::VarDecl,
            Item::Inst(_) => SyntaxKind::Inst,
        }
    }
}

impl HasSpan for Item {
    fn span(&self) -> Span {
        match *self {
            Item::ModuleDecl(ref decl) => decl.span(),
            Item::PackageDecl(ref decl) => decl.span,
            Item::ClassDecl(ref decl) => decl.span,
            Item::ImportDecl(ref decl) => decl.span,
            Item::ParamDecl(ref decl) => decl.span,
            Item::Typedef(ref td) => td.span,
            Item::PortDecl(ref decl) => decl.span,
            Item::Procedure(ref prc) => prc.span,
            Item::SubroutineDecl(ref decl) => decl.span,
            Item::ContAssign(ref ca) => ca.span,
            Item::GenerateRegion(span, _) => span,
            Item::GenerateFor(ref gf) => gf.span,
            Item::GenerateIf(ref gi) => gi.span,
            Item::GenerateCase(ref gc) => gc.span,
            Item::Assertion(ref a) => a.span,
            Item::NetDecl(ref decl) => decl.span,
            Item::VarDecl(ref decl) => decl.span,
            Item::Inst(ref inst) => inst.span,
            Item::GenvarDecl(ref decls) => {
                decls.first().map(|d| d.span).unwrap_or(INVALID_SPAN)
            }
            Item::Dummy => INVALID_SPAN,
        }
    }

    fn human_span(&self) -> Span {
        match *self {
            Item::ModuleDecl(ref decl) => decl.human_span(),
            _ => self.span(),
        }
    }
}

impl HasDesc for Item {
    fn desc(&self) -> &'static str {
        match *self {
            Item::ModuleDecl(_) => "module declaration",
            Item::PackageDecl(_) => "package declaration",
            Item::ClassDecl(_) => "class declaration",
            Item::ImportDecl(_) => "import declaration",
            Item::ParamDecl(_) => "parameter declaration",
            Item::Typedef(_) => "typedef",
            Item::PortDecl(_) => "port declaration",
            Item::Procedure(_) => "procedure",
            Item::SubroutineDecl(_) => "subroutine declaration",
            Item::ContAssign(_) => "continuous assignment",
            Item::GenvarDecl(_) => "genvar declaration",
            Item::GenerateRegion(..) => "generate region",
            Item::GenerateFor(_) => "for-generate construct",
            Item::GenerateIf(_) => "if-generate construct",
            Item::GenerateCase(_) => "case-generate construct",
            Item::Assertion(_) => "assertion",
            Item::NetDecl(_) => "net declaration",
            Item::VarDecl(_) => "variable declaration",
            Item::Inst(_) => "instantiation",
            Item::Dummy => "<dummy item>",
        }
    }
}

impl AcceptVisitor for Item {
    fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        match *self {
            Item::ModuleDecl(ref decl) => visitor.visit_module(decl),
            Item::PackageDecl(ref decl) => visitor.visit_package(decl),
            Item::ClassDecl(ref decl) => visitor.visit_class(decl),
            Item::Procedure(ref prc) => visitor.visit_procedure(prc),
            Item::Assertion(ref a) => visitor.visit_assertion(a),
            Item::ContAssign(ref ca) => {
                for &(ref lhs, ref rhs) in &ca.assignments {
                    visitor.visit_expr(lhs);
                    visitor.visit_expr(rhs);
                }
            }
            Item::GenerateRegion(_, ref items) => {
                for item in items {
                    visitor.visit_item(item);
                }
            }
            Item::GenerateFor(ref gf) => {
                visitor.visit_stmt(&gf.init);
                visitor.visit_expr(&gf.cond);
                visitor.visit_expr(&gf.step);
                for item in &gf.block.items {
                    visitor.visit_item(item);
                }
            }
            Item::GenerateIf(ref gi) => {
                visitor.visit_expr(&gi.cond);
                for item in &gi.main_block.items {
                    visitor.visit_item(item);
                }
                if let Some(ref block) = gi.else_block {
                    for item in &block.items {
                        visitor.visit_item(item);
                    }
                }
            }
            Item::NetDecl(ref decl) => {
                visitor.visit_type(&decl.ty);
                for name in &decl.names {
                    if let Some(ref init) = name.init {
                        visitor.visit_expr(init);
                    }
                }
            }
            Item::VarDecl(ref decl) => {
                visitor.visit_type(&decl.ty);
                for name in &decl.names {
                    if let Some(ref init) = name.init {
                        visitor.visit_expr(init);
                    }
                }
            }
            _ => (),
        }
    }
}

/// Lifetime specifier for variables, tasks, and functions. Defaults to
/// static.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifetime {
    Static,
    Automatic,
}

/// A time unit specification.
///
/// ```text
/// "timeunit" time_literal ["/" time_literal] ";"
/// "timeprecision" time_literal ";"
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Timeunit {
    pub unit: Option<Spanned<Lit>>,
    pub prec: Option<Spanned<Lit>>,
}

/// A module declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModDecl {
    pub span: Span,
    pub lifetime: Lifetime, // default static
    pub name: Name,
    pub name_span: Span,
    pub imports: Vec<ImportDecl>,
    pub params: Vec<ParamDecl>,
    pub ports: Vec<Port>,
    pub items: Vec<Item>,
}

impl HasSpan for ModDecl {
    fn span(&self) -> Span {
        self.span
    }

    fn human_span(&self) -> Span {
        self.name_span
    }
}

impl HasDesc for ModDecl {
    fn desc(&self) -> &'static str {
        "module declaration"
    }

    fn desc_full(&self) -> String {
        format!("module `{}`", self.name)
    }
}

impl AcceptVisitor for ModDecl {
    fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        for port in &self.ports {
            visitor.visit_port(port);
        }
        for item in &self.items {
            visitor.visit_item(item);
        }
    }
}

/// A package declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageDecl {
    pub span: Span,
    pub lifetime: Lifetime,
    pub name: Name,
    pub name_span: Span,
    pub timeunits: Timeunit,
    pub items: Vec<Item>,
}

impl HasSpan for PackageDecl {
    fn span(&self) -> Span {
        self.span
    }

    fn human_span(&self) -> Span {
        self.name_span
    }
}

impl HasDesc for PackageDecl {
    fn desc(&self) -> &'static str {
        "package declaration"
    }

    fn desc_full(&self) -> String {
        format!("package `{}`", self.name)
    }
}

impl AcceptVisitor for PackageDecl {
    fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        for item in &self.items {
            visitor.visit_item(item);
        }
    }
}

/// A class declaration, the host of constraint blocks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassDecl {
    pub span: Span,
    pub virt: bool,
    pub lifetime: Lifetime,
    pub name: Identifier,
    pub extends: Option<Identifier>,
    pub items: Vec<ClassItem>,
}

impl HasSpan for ClassDecl {
    fn span(&self) -> Span {
        self.span
    }

    fn human_span(&self) -> Span {
        self.name.span
    }
}

impl HasDesc for ClassDecl {
    fn desc(&self) -> &'static str {
        "class declaration"
    }

    fn desc_full(&self) -> String {
        format!("class `{}`", self.name.name)
    }
}

impl AcceptVisitor for ClassDecl {
    fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        for item in &self.items {
            match item.data {
                ClassItemData::Constraint(ref c) => visitor.visit_constraint(c),
                ClassItemData::Property(ref decl) => {
                    visitor.visit_type(&decl.ty);
                }
                _ => (),
            }
        }
    }
}

/// An item inside a class body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassItem {
    pub span: Span,
    pub rand: Option<RandQualifier>,
    pub data: ClassItemData,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClassItemData {
    Property(VarDecl),
    Constraint(Constraint),
    SubroutineDecl(SubroutineDecl),
    Typedef(Typedef),
    Null,
}

/// The `rand` or `randc` qualifier on class properties.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RandQualifier {
    Rand,
    Randc,
}

/// A constraint block or prototype inside a class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Constraint {
    pub span: Span,
    pub kind: ConstraintKind,
    pub statik: bool,
    pub name: Name,
    pub name_span: Span,
    pub items: Vec<ConstraintItem>,
}

impl Constraint {
    pub fn kind_tag(&self) -> SyntaxKind {
        SyntaxKind::ConstraintDecl
    }
}

impl HasSpan for Constraint {
    fn span(&self) -> Span {
        self.span
    }

    fn human_span(&self) -> Span {
        self.name_span
    }
}

impl HasDesc for Constraint {
    fn desc(&self) -> &'static str {
        "constraint"
    }

    fn desc_full(&self) -> String {
        format!("constraint `{}`", self.name)
    }
}

impl AcceptVisitor for Constraint {
    fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        for item in &self.items {
            visitor.visit_constraint_item(item);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstraintKind {
    Decl,
    Proto,
    ExternProto,
    PureProto,
}

/// One item of a constraint block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstraintItem {
    pub span: Span,
    pub data: ConstraintItemData,
}

impl ConstraintItem {
    pub fn kind(&self) -> SyntaxKind {
        match self.data {
            ConstraintItemData::Expr(_) => SyntaxKind::ConstraintExpr,
            ConstraintItemData::SoftExpr(_) => SyntaxKind::ConstraintSoftExpr,
            ConstraintItemData::Implication(..) => SyntaxKind::ConstraintImplication,
            ConstraintItemData::Conditional(..) => SyntaxKind::ConstraintConditional,
            ConstraintItemData::Unique(_) => SyntaxKind::ConstraintUnique,
            ConstraintItemData::List(_) => SyntaxKind::ConstraintList,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConstraintItemData {
    /// A boolean expression constraint, `expr;`.
    Expr(Expr),
    /// A soft expression constraint, `soft expr;`.
    SoftExpr(Expr),
    /// An implication, `expr -> constraint_set`.
    Implication(Expr, Vec<ConstraintItem>),
    /// A conditional, `if (expr) set [else set]`.
    Conditional(Expr, Vec<ConstraintItem>, Option<Vec<ConstraintItem>>),
    /// A uniqueness constraint, `unique { exprs }`.
    Unique(Vec<Expr>),
    /// A braced list of nested items.
    List(Vec<ConstraintItem>),
}

impl AcceptVisitor for ConstraintItem {
    fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        match self.data {
            ConstraintItemData::Expr(ref e) | ConstraintItemData::SoftExpr(ref e) => {
                visitor.visit_expr(e)
            }
            ConstraintItemData::Implication(ref e, ref body) => {
                visitor.visit_expr(e);
                for item in body {
                    visitor.visit_constraint_item(item);
                }
            }
            ConstraintItemData::Conditional(ref e, ref then_items, ref else_items) => {
                visitor.visit_expr(e);
                for item in then_items {
                    visitor.visit_constraint_item(item);
                }
                if let Some(items) = else_items {
                    for item in items {
                        visitor.visit_constraint_item(item);
                    }
                }
            }
            ConstraintItemData::Unique(ref exprs) => {
                for e in exprs {
                    visitor.visit_expr(e);
                }
            }
            ConstraintItemData::List(ref items) => {
                for item in items {
                    visitor.visit_constraint_item(item);
                }
            }
        }
    }
}

/// An identifier together with its span.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Identifier {
    pub span: Span,
    pub name: Name,
}

/// An import declaration, `import pkg::*;` or `import pkg::name;`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportDecl {
    pub span: Span,
    pub items: Vec<ImportItem>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportItem {
    pub span: Span,
    pub pkg: Spanned<Name>,
    /// `None` for a wildcard import.
    pub name: Option<Spanned<Name>>,
}

/// A parameter or localparam declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamDecl {
    pub span: Span,
    pub local: bool,
    pub ty: Option<Type>,
    pub names: Vec<ParamName>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamName {
    pub span: Span,
    pub name: Identifier,
    pub dims: Vec<TypeDim>,
    pub expr: Option<Expr>,
}

/// A typedef.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Typedef {
    pub span: Span,
    pub name: Identifier,
    pub ty: Type,
    pub dims: Vec<TypeDim>,
}

/// A data type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Type {
    pub span: Span,
    pub data: TypeData,
    pub sign: TypeSign,
    pub dims: Vec<TypeDim>,
}

impl Type {
    pub fn kind(&self) -> SyntaxKind {
        match self.data {
            ImplicitType => SyntaxKind::ImplicitType,
            NamedType(_) => SyntaxKind::NamedType,
            EnumType(..) => SyntaxKind::EnumType,
            StructType { .. } => SyntaxKind::StructType,
            _ => SyntaxKind::BuiltinType,
        }
    }
}

impl HasSpan for Type {
    fn span(&self) -> Span {
        self.span
    }
}

impl HasDesc for Type {
    fn desc(&self) -> &'static str {
        match self.data {
            ImplicitType => "implicit type",
            _ => "type",
        }
    }
}

impl AcceptVisitor for Type {
    fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        for dim in &self.dims {
            match *dim {
                TypeDim::Expr(ref e) => visitor.visit_expr(e),
                TypeDim::Range(ref lo, ref hi) => {
                    visitor.visit_expr(lo);
                    visitor.visit_expr(hi);
                }
                _ => (),
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeData {
    ImplicitType,
    VoidType,
    NamedType(Identifier),

    // Integer vector types
    BitType,
    LogicType,
    RegType,

    // Integer atom types
    ByteType,
    ShortIntType,
    IntType,
    LongIntType,
    IntegerType,
    TimeType,

    // Non-integer types
    StringType,
    EventType,

    EnumType(Option<Box<Type>>, Vec<EnumName>),
    StructType {
        packed: bool,
        signing: TypeSign,
        members: Vec<StructMember>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeSign {
    None,
    Signed,
    Unsigned,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeDim {
    Expr(Expr),
    Range(Expr, Expr),
    Queue,
    Unsized,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumName {
    pub span: Span,
    pub name: Identifier,
    pub range: Option<Expr>,
    pub value: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructMember {
    pub span: Span,
    pub rand: Option<RandQualifier>,
    pub ty: Box<Type>,
    pub names: Vec<VarDeclName>,
}

/// A port in a module's port list. ANSI ports carry their full declaration;
/// non-ANSI port lists name the ports and leave the declarations to the
/// module body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Port {
    /// An ANSI port with direction, kind, type, and name, e.g.
    /// `input logic [7:0] a`.
    Named {
        span: Span,
        dir: Option<PortDir>,
        kind: Option<PortKind>,
        ty: Type,
        name: Identifier,
        dims: Vec<TypeDim>,
        expr: Option<Expr>,
    },
    /// An explicit port binding, e.g. `output .a(expr)`.
    Explicit {
        span: Span,
        dir: Option<PortDir>,
        name: Identifier,
        expr: Option<Expr>,
    },
    /// A non-ANSI port given as an expression over internal names, e.g.
    /// `{a, b}` or `c[3:0]`.
    Implicit(Expr),
}

impl HasSpan for Port {
    fn span(&self) -> Span {
        match *self {
            Port::Named { span, .. } => span,
            Port::Explicit { span, .. } => span,
            Port::Implicit(ref e) => e.span,
        }
    }

    fn human_span(&self) -> Span {
        match *self {
            Port::Named { name, .. } => name.span,
            _ => self.span(),
        }
    }
}

impl HasDesc for Port {
    fn desc(&self) -> &'static str {
        "port"
    }
}

impl AcceptVisitor for Port {
    fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        match *self {
            Port::Named {
                ref ty, ref expr, ..
            } => {
                visitor.visit_type(ty);
                if let Some(e) = expr {
                    visitor.visit_expr(e);
                }
            }
            Port::Explicit { ref expr, .. } => {
                if let Some(e) = expr {
                    visitor.visit_expr(e);
                }
            }
            Port::Implicit(ref e) => visitor.visit_expr(e),
        }
    }
}

/// The direction of a port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortDir {
    Input,
    Output,
    Inout,
    Ref,
}

/// Whether a port is a net or a variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortKind {
    Net(NetType),
    Var,
}

/// A port declaration in a module body, e.g. `input logic [7:0] a;`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortDecl {
    pub span: Span,
    pub dir: PortDir,
    pub kind: Option<PortKind>,
    pub ty: Type,
    pub names: Vec<VarDeclName>,
}

/// A net type as per IEEE 1800-2009 section 6.6.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetType {
    Supply0,
    Supply1,
    Tri,
    Triand,
    Trior,
    Trireg,
    Tri0,
    Tri1,
    Uwire,
    Wire,
    Wand,
    Wor,
}

impl NetType {
    /// Map a keyword to its net type.
    pub fn from_keyword(kw: Kw) -> Option<NetType> {
        Some(match kw {
            Kw::Supply0 => NetType::Supply0,
            Kw::Supply1 => NetType::Supply1,
            Kw::Tri => NetType::Tri,
            Kw::Triand => NetType::Triand,
            Kw::Trior => NetType::Trior,
            Kw::Trireg => NetType::Trireg,
            Kw::Tri0 => NetType::Tri0,
            Kw::Tri1 => NetType::Tri1,
            Kw::Uwire => NetType::Uwire,
            Kw::Wire => NetType::Wire,
            Kw::Wand => NetType::Wand,
            Kw::Wor => NetType::Wor,
            _ => return None,
        })
    }
}

/// A drive or charge strength on a net declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetStrength {
    Drive(DriveStrength, DriveStrength),
    Charge(ChargeStrength),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriveStrength {
    Supply0,
    Strong0,
    Pull0,
    Weak0,
    HighZ0,
    Supply1,
    Strong1,
    Pull1,
    Weak1,
    HighZ1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChargeStrength {
    Small,
    Medium,
    Large,
}

/// A net declaration, e.g. `wire [7:0] x = value;`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetDecl {
    pub span: Span,
    pub net_type: NetType,
    pub strength: Option<NetStrength>,
    pub ty: Type,
    pub delay: Option<Expr>,
    pub names: Vec<VarDeclName>,
}

/// A variable declaration, e.g. `logic [7:0] x = value;`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VarDecl {
    pub span: Span,
    pub konst: bool,
    pub var: bool,
    pub lifetime: Option<Lifetime>,
    pub ty: Type,
    pub names: Vec<VarDeclName>,
}

/// One declared name, shared between net, variable, and port declarations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VarDeclName {
    pub span: Span,
    pub name: Name,
    pub name_span: Span,
    pub dims: Vec<TypeDim>,
    pub init: Option<Expr>,
}

/// A hierarchy instantiation, e.g. `Leaf l();`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inst {
    pub span: Span,
    /// The name of the instantiated module.
    pub target: Identifier,
    /// The parameter assignments after `#`.
    pub params: Vec<ParamAssignment>,
    /// The instances, each with a name and port connections.
    pub names: Vec<InstName>,
}

impl HasSpan for Inst {
    fn span(&self) -> Span {
        self.span
    }

    fn human_span(&self) -> Span {
        self.target.span
    }
}

impl HasDesc for Inst {
    fn desc(&self) -> &'static str {
        "instantiation"
    }

    fn desc_full(&self) -> String {
        format!("`{}` instantiation", self.target.name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstName {
    pub span: Span,
    pub name: Identifier,
    pub dims: Vec<TypeDim>,
    pub conns: Vec<PortConn>,
}

/// A parameter assignment in an instantiation, positional or named.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamAssignment {
    pub span: Span,
    pub name: Option<Identifier>,
    pub expr: Expr,
}

/// A port connection in an instantiation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortConn {
    pub span: Span,
    pub kind: PortConnKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PortConnKind {
    /// The wildcard connection `.*`.
    Auto,
    /// A named connection `.port`, `.port()`, or `.port(expr)`.
    Named(Identifier, Option<Expr>),
    /// A positional connection `expr`.
    Positional(Expr),
}

/// A continuous assignment, `assign lhs = rhs, ...;`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContAssign {
    pub span: Span,
    pub strength: Option<NetStrength>,
    pub delay: Option<Expr>,
    pub assignments: Vec<(Expr, Expr)>,
}

/// A structured procedure as per IEEE 1800-2009 section 9.2.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Procedure {
    pub span: Span,
    pub kind: ProcedureKind,
    pub stmt: Stmt,
}

impl AcceptVisitor for Procedure {
    fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        visitor.visit_stmt(&self.stmt);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcedureKind {
    Initial,
    Always,
    AlwaysComb,
    AlwaysLatch,
    AlwaysFf,
    Final,
}

/// A function or task declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubroutineDecl {
    pub span: Span,
    pub prototype: SubroutinePrototype,
    pub stmts: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubroutinePrototype {
    pub span: Span,
    pub kind: SubroutineKind,
    pub lifetime: Option<Lifetime>,
    pub name: Identifier,
    pub args: Vec<SubroutinePort>,
    pub retty: Option<Type>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubroutineKind {
    Func,
    Task,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubroutinePort {
    pub span: Span,
    pub dir: Option<SubroutinePortDir>,
    pub var: bool,
    pub ty: Type,
    pub name: Option<Identifier>,
    pub dims: Vec<TypeDim>,
    pub default: Option<Expr>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubroutinePortDir {
    Input,
    Output,
    Inout,
    Ref,
    ConstRef,
}

/// A genvar declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenvarDecl {
    pub span: Span,
    pub name: Name,
    pub name_span: Span,
    pub init: Option<Expr>,
}

/// A for-generate construct.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerateFor {
    pub span: Span,
    pub init: Stmt,
    pub cond: Expr,
    pub step: Expr,
    pub block: GenerateBlock,
}

/// An if-generate construct.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerateIf {
    pub span: Span,
    pub cond: Expr,
    pub main_block: GenerateBlock,
    pub else_block: Option<GenerateBlock>,
}

/// A case-generate construct.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerateCase {
    pub span: Span,
    pub expr: Expr,
    pub items: Vec<GenerateCaseItem>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenerateCaseItem {
    Default(GenerateBlock),
    Expr(Vec<Expr>, GenerateBlock),
}

/// A body of a generate construct.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerateBlock {
    pub span: Span,
    pub label: Option<Name>,
    pub items: Vec<Item>,
}

/// An immediate or deferred assertion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assertion {
    pub span: Span,
    pub label: Option<(Name, Span)>,
    pub data: AssertionData,
}

impl AcceptVisitor for Assertion {
    fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        let blocking = match self.data {
            AssertionData::Immediate(ref b) => b,
            AssertionData::Deferred(_, ref b) => b,
        };
        match *blocking {
            BlockingAssertion::Assert(ref e, ref action)
            | BlockingAssertion::Assume(ref e, ref action) => {
                visitor.visit_expr(e);
                match *action {
                    AssertionActionBlock::Positive(ref s)
                    | AssertionActionBlock::Negative(ref s) => visitor.visit_stmt(s),
                    AssertionActionBlock::Both(ref a, ref b) => {
                        visitor.visit_stmt(a);
                        visitor.visit_stmt(b);
                    }
                }
            }
            BlockingAssertion::Cover(ref e, ref s) => {
                visitor.visit_expr(e);
                visitor.visit_stmt(s);
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssertionData {
    Immediate(BlockingAssertion),
    Deferred(AssertionDeferred, BlockingAssertion),
}

/// The deferral mode of an assertion: `assert #0` or `assert final`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssertionDeferred {
    Observed,
    Final,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockingAssertion {
    Assert(Expr, AssertionActionBlock),
    Assume(Expr, AssertionActionBlock),
    Cover(Expr, Stmt),
}

/// The action block of an assertion: pass statement, fail statement after
/// `else`, or both.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssertionActionBlock {
    Positive(Stmt),
    Negative(Stmt),
    Both(Stmt, Stmt),
}

/// A statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stmt {
    pub span: Span,
    pub label: Option<Name>,
    pub data: StmtData,
}

impl Stmt {
    pub fn new_null(span: Span) -> Stmt {
        Stmt {
            span: span,
            label: None,
            data: NullStmt,
        }
    }

    pub fn new_error(span: Span) -> Stmt {
        Stmt {
            span: span,
            label: None,
            data: ErrorStmt,
        }
    }

    pub fn kind(&self) -> SyntaxKind {
        match self.data {
            NullStmt => SyntaxKind::NullStmt,
            SequentialBlock(_) => SyntaxKind::SequentialBlock,
            ParallelBlock(..) => SyntaxKind::ParallelBlock,
            IfStmt { .. } => SyntaxKind::IfStmt,
            CaseStmt { .. } => SyntaxKind::CaseStmt,
            ForeverStmt(_) => SyntaxKind::ForeverStmt,
            RepeatStmt(..) => SyntaxKind::RepeatStmt,
            WhileStmt(..) => SyntaxKind::WhileStmt,
            DoStmt(..) => SyntaxKind::DoStmt,
            ForStmt(..) => SyntaxKind::ForStmt,
            ForeachStmt(..) => SyntaxKind::ForeachStmt,
            ExprStmt(_) => SyntaxKind::ExprStmt,
            VarDeclStmt(_) => SyntaxKind::VarDeclStmt,
            GenvarDeclStmt(_) => SyntaxKind::GenvarDeclStmt,
            TimedStmt(..) => SyntaxKind::TimedStmt,
            AssertionStmt(_) => SyntaxKind::AssertionStmt,
            ReturnStmt(_) => SyntaxKind::ReturnStmt,
            BreakStmt => SyntaxKind::BreakStmt,
            ContinueStmt => SyntaxKind::ContinueStmt,
            ImportStmt(_) => SyntaxKind::ImportStmt,
            AssignStmt { .. } => SyntaxKind::AssignStmt,
            WaitExprStmt(..) => SyntaxKind::WaitExprStmt,
            WaitForkStmt => SyntaxKind::WaitForkStmt,
            DisableForkStmt => SyntaxKind::DisableForkStmt,
            DisableStmt(_) => SyntaxKind::DisableStmt,
            ErrorStmt => SyntaxKind::ErrorStmt,
        }
    }
}

impl HasSpan for Stmt {
    fn span(&self) -> Span {
        self.span
    }
}

impl HasDesc for Stmt {
    fn desc(&self) -> &'static str {
        "statement"
    }
}

impl AcceptVisitor for Stmt {
    fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        match self.data {
            SequentialBlock(ref stmts) | ParallelBlock(ref stmts, _) => {
                for s in stmts {
                    visitor.visit_stmt(s);
                }
            }
            IfStmt {
                ref cond,
                ref main_stmt,
                ref else_stmt,
                ..
            } => {
                visitor.visit_expr(cond);
                visitor.visit_stmt(main_stmt);
                if let Some(s) = else_stmt {
                    visitor.visit_stmt(s);
                }
            }
            CaseStmt {
                ref expr,
                ref items,
                ..
            } => {
                visitor.visit_expr(expr);
                for item in items {
                    match *item {
                        CaseItem::Default(ref s) => visitor.visit_stmt(s),
                        CaseItem::Expr(ref exprs, ref s) => {
                            for e in exprs {
                                visitor.visit_expr(e);
                            }
                            visitor.visit_stmt(s);
                        }
                    }
                }
            }
            ForeverStmt(ref s) => visitor.visit_stmt(s),
            RepeatStmt(ref e, ref s) | WhileStmt(ref e, ref s) => {
                visitor.visit_expr(e);
                visitor.visit_stmt(s);
            }
            DoStmt(ref s, ref e) => {
                visitor.visit_stmt(s);
                visitor.visit_expr(e);
            }
            ForStmt(ref init, ref cond, ref step, ref s) => {
                visitor.visit_stmt(init);
                visitor.visit_expr(cond);
                visitor.visit_expr(step);
                visitor.visit_stmt(s);
            }
            ForeachStmt(ref e, _, ref s) => {
                visitor.visit_expr(e);
                visitor.visit_stmt(s);
            }
            ExprStmt(ref e) => visitor.visit_expr(e),
            TimedStmt(_, ref s) => visitor.visit_stmt(s),
            AssertionStmt(ref a) => visitor.visit_assertion(a),
            ReturnStmt(Some(ref e)) => visitor.visit_expr(e),
            AssignStmt {
                ref lhs, ref rhs, ..
            } => {
                visitor.visit_expr(lhs);
                visitor.visit_expr(rhs);
            }
            WaitExprStmt(ref e, ref s) => {
                visitor.visit_expr(e);
                visitor.visit_stmt(s);
            }
            VarDeclStmt(ref decl) => {
                visitor.visit_type(&decl.ty);
                for name in &decl.names {
                    if let Some(ref init) = name.init {
                        visitor.visit_expr(init);
                    }
                }
            }
            _ => (),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StmtData {
    NullStmt,
    SequentialBlock(Vec<Stmt>),
    ParallelBlock(Vec<Stmt>, JoinKind),
    IfStmt {
        up: Option<UniquePriority>,
        cond: Expr,
        main_stmt: Box<Stmt>,
        else_stmt: Option<Box<Stmt>>,
    },
    CaseStmt {
        up: Option<UniquePriority>,
        kind: CaseKind,
        expr: Expr,
        items: Vec<CaseItem>,
    },
    ForeverStmt(Box<Stmt>),
    RepeatStmt(Expr, Box<Stmt>),
    WhileStmt(Expr, Box<Stmt>),
    DoStmt(Box<Stmt>, Expr),
    ForStmt(Box<Stmt>, Expr, Expr, Box<Stmt>),
    ForeachStmt(Expr, Vec<Option<Identifier>>, Box<Stmt>),
    ExprStmt(Expr),
    VarDeclStmt(VarDecl),
    GenvarDeclStmt(Vec<GenvarDecl>),
    TimedStmt(TimingControl, Box<Stmt>),
    AssertionStmt(Box<Assertion>),
    ReturnStmt(Option<Expr>),
    BreakStmt,
    ContinueStmt,
    ImportStmt(ImportDecl),
    AssignStmt {
        kind: AssignKind,
        lhs: Expr,
        rhs: Expr,
    },
    WaitExprStmt(Expr, Box<Stmt>),
    WaitForkStmt,
    DisableForkStmt,
    DisableStmt(Name),
    /// A statement that failed to parse. Never leaves the parser except as
    /// a placeholder under a diagnostic.
    ErrorStmt,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinKind {
    All,
    Any,
    None,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniquePriority {
    Unique,
    Unique0,
    Priority,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaseKind {
    Normal,
    DontCareZ,
    DontCareXZ,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaseItem {
    Default(Box<Stmt>),
    Expr(Vec<Expr>, Box<Stmt>),
}

/// The kind of a procedural assignment: blocking (`=`, possibly with an
/// operator) or nonblocking (`<=`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignKind {
    Block(AssignOp),
    Nonblock,
}

/// A timing control before a statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimingControl {
    Delay(DelayControl),
    Event(EventControl),
    Cycle(CycleDelay),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DelayControl {
    pub span: Span,
    pub expr: Expr,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventControl {
    pub span: Span,
    pub data: EventControlData,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventControlData {
    /// The implicit event `@*` or `@(*)`.
    Implicit,
    /// An explicit event expression.
    Expr(EventExpr),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CycleDelay {
    pub span: Span,
    pub expr: Expr,
}

/// An event expression after `@`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventExpr {
    Edge {
        span: Span,
        edge: EdgeIdent,
        value: Expr,
    },
    Iff {
        span: Span,
        expr: Box<EventExpr>,
        cond: Expr,
    },
    Or {
        span: Span,
        lhs: Box<EventExpr>,
        rhs: Box<EventExpr>,
    },
}

impl HasSpan for EventExpr {
    fn span(&self) -> Span {
        match *self {
            EventExpr::Edge { span, .. } => span,
            EventExpr::Iff { span, .. } => span,
            EventExpr::Or { span, .. } => span,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeIdent {
    Implicit,
    Edge,
    Posedge,
    Negedge,
}

/// An expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expr {
    pub span: Span,
    pub data: ExprData,
}

impl Expr {
    pub fn new(span: Span, data: ExprData) -> Expr {
        Expr {
            span: span,
            data: data,
        }
    }

    pub fn new_error(span: Span) -> Expr {
        Expr::new(span, ErrorExpr)
    }

    pub fn kind(&self) -> SyntaxKind {
        match self.data {
            LiteralExpr(_) => SyntaxKind::LiteralExpr,
            IdentExpr(_) => SyntaxKind::IdentExpr,
            SysIdentExpr(_) => SyntaxKind::SysIdentExpr,
            ScopeExpr(..) => SyntaxKind::ScopeExpr,
            IndexExpr { .. } => SyntaxKind::IndexExpr,
            UnaryExpr { .. } => SyntaxKind::UnaryExpr,
            BinaryExpr { .. } => SyntaxKind::BinaryExpr,
            TernaryExpr { .. } => SyntaxKind::TernaryExpr,
            AssignExpr { .. } => SyntaxKind::AssignExpr,
            CallExpr(..) => SyntaxKind::CallExpr,
            MemberExpr { .. } => SyntaxKind::MemberExpr,
            PatternExpr(_) => SyntaxKind::PatternExpr,
            InsideExpr(..) => SyntaxKind::InsideExpr,
            CastExpr(..) => SyntaxKind::CastExpr,
            CastSizeExpr(..) => SyntaxKind::CastSizeExpr,
            CastSignExpr(..) => SyntaxKind::CastSignExpr,
            ConcatExpr { .. } => SyntaxKind::ConcatExpr,
            EmptyQueueExpr => SyntaxKind::EmptyQueueExpr,
            RangeExpr { .. } => SyntaxKind::RangeExpr,
            MinTypMaxExpr(..) => SyntaxKind::MinTypMaxExpr,
            ErrorExpr => SyntaxKind::ErrorExpr,
        }
    }
}

impl HasSpan for Expr {
    fn span(&self) -> Span {
        self.span
    }
}

impl HasDesc for Expr {
    fn desc(&self) -> &'static str {
        "expression"
    }
}

impl AcceptVisitor for Expr {
    fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        match self.data {
            ScopeExpr(ref e, _) => visitor.visit_expr(e),
            IndexExpr {
                ref indexee,
                ref index,
            } => {
                visitor.visit_expr(indexee);
                visitor.visit_expr(index);
            }
            UnaryExpr { ref expr, .. } => visitor.visit_expr(expr),
            BinaryExpr {
                ref lhs, ref rhs, ..
            } => {
                visitor.visit_expr(lhs);
                visitor.visit_expr(rhs);
            }
            TernaryExpr {
                ref cond,
                ref true_expr,
                ref false_expr,
            } => {
                visitor.visit_expr(cond);
                visitor.visit_expr(true_expr);
                visitor.visit_expr(false_expr);
            }
            AssignExpr {
                ref lhs, ref rhs, ..
            } => {
                visitor.visit_expr(lhs);
                visitor.visit_expr(rhs);
            }
            CallExpr(ref callee, ref args) => {
                visitor.visit_expr(callee);
                for arg in args {
                    if let Some(ref e) = arg.expr {
                        visitor.visit_expr(e);
                    }
                }
            }
            MemberExpr { ref expr, .. } => visitor.visit_expr(expr),
            InsideExpr(ref e, ref ranges) => {
                visitor.visit_expr(e);
                for r in ranges {
                    match *r {
                        ValueRange::Single(ref e) => visitor.visit_expr(e),
                        ValueRange::Range {
                            ref lo, ref hi, ..
                        } => {
                            visitor.visit_expr(lo);
                            visitor.visit_expr(hi);
                        }
                    }
                }
            }
            CastExpr(ref ty, ref e) => {
                visitor.visit_type(ty);
                visitor.visit_expr(e);
            }
            CastSizeExpr(ref size, ref e) => {
                visitor.visit_expr(size);
                visitor.visit_expr(e);
            }
            CastSignExpr(_, ref e) => visitor.visit_expr(e),
            ConcatExpr {
                ref repeat,
                ref exprs,
            } => {
                if let Some(r) = repeat {
                    visitor.visit_expr(r);
                }
                for e in exprs {
                    visitor.visit_expr(e);
                }
            }
            RangeExpr {
                ref lhs, ref rhs, ..
            } => {
                visitor.visit_expr(lhs);
                visitor.visit_expr(rhs);
            }
            MinTypMaxExpr(ref min, ref typ, ref max) => {
                visitor.visit_expr(min);
                visitor.visit_expr(typ);
                visitor.visit_expr(max);
            }
            PatternExpr(ref fields) => {
                for field in fields {
                    match field.data {
                        PatternFieldData::Default(ref e) | PatternFieldData::Expr(ref e) => {
                            visitor.visit_expr(e)
                        }
                        PatternFieldData::Member(ref a, ref b) => {
                            visitor.visit_expr(a);
                            visitor.visit_expr(b);
                        }
                        PatternFieldData::Type(ref ty, ref e) => {
                            visitor.visit_type(ty);
                            visitor.visit_expr(e);
                        }
                        PatternFieldData::Repeat(ref e, ref exprs) => {
                            visitor.visit_expr(e);
                            for inner in exprs {
                                visitor.visit_expr(inner);
                            }
                        }
                    }
                }
            }
            _ => (),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExprData {
    LiteralExpr(Lit),
    IdentExpr(Identifier),
    SysIdentExpr(Identifier),
    ScopeExpr(Box<Expr>, Identifier),
    IndexExpr {
        indexee: Box<Expr>,
        index: Box<Expr>,
    },
    UnaryExpr {
        op: Op,
        expr: Box<Expr>,
        postfix: bool,
    },
    BinaryExpr {
        op: Op,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    TernaryExpr {
        cond: Box<Expr>,
        true_expr: Box<Expr>,
        false_expr: Box<Expr>,
    },
    AssignExpr {
        op: AssignOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    CallExpr(Box<Expr>, Vec<CallArg>),
    MemberExpr {
        expr: Box<Expr>,
        name: Identifier,
    },
    PatternExpr(Vec<PatternField>),
    InsideExpr(Box<Expr>, Vec<ValueRange>),
    CastExpr(Type, Box<Expr>),
    CastSizeExpr(Box<Expr>, Box<Expr>),
    CastSignExpr(Spanned<TypeSign>, Box<Expr>),
    ConcatExpr {
        repeat: Option<Box<Expr>>,
        exprs: Vec<Expr>,
    },
    EmptyQueueExpr,
    RangeExpr {
        mode: RangeMode,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    MinTypMaxExpr(Box<Expr>, Box<Expr>, Box<Expr>),
    /// An expression that failed to parse.
    ErrorExpr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeMode {
    Absolute,
    RelativeDown,
    RelativeUp,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValueRange {
    Single(Expr),
    Range { lo: Expr, hi: Expr, span: Span },
}

/// A call argument, positional or named.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallArg {
    pub span: Span,
    pub name_span: Span,
    pub name: Option<Name>,
    pub expr: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatternField {
    pub span: Span,
    pub data: PatternFieldData,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatternFieldData {
    Default(Box<Expr>),
    Member(Box<Expr>, Box<Expr>),
    Type(Type, Box<Expr>),
    Expr(Box<Expr>),
    Repeat(Box<Expr>, Vec<Expr>),
}
