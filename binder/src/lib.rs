// Copyright (c) 2016-2021 Fabian Schuiki

//! Binding of syntax to semantic trees. The binder lifts expressions,
//! statements, and constraints out of the AST into kind-tagged semantic
//! nodes, resolving names against a scope and deriving simple types along
//! the way.
//!
//! Binding is total: a construct that cannot be bound yields an `Invalid`
//! node that carries its best partial child, and every parent that receives
//! an invalid child produces an invalid result. Diagnostics are emitted once
//! at the root cause; parents wrap silently.

#[macro_use]
extern crate log;
#[macro_use]
extern crate sylva_common;

pub mod constraint;
pub mod context;
pub mod expr;
pub mod stmt;
pub mod visit;

pub use crate::constraint::{Constraint, ConstraintKind};
pub use crate::context::{BindContext, BindFlags, Def, DefKind, Scope, ScopeMap};
pub use crate::expr::{Expr, ExprKind, Ty};
pub use crate::stmt::{Stmt, StmtKind};
pub use crate::visit::{Serializer, Visitor};

make_arenas! {
    /// The arena holding the semantic nodes of one compilation unit. Nodes
    /// are allocated during binding and freed together with the arena; no
    /// per-node free exists.
    pub struct SemanticArena<'a> {
        exprs: expr::Expr<'a>,
        stmts: stmt::Stmt<'a>,
        constraints: constraint::Constraint<'a>,
    }
}
