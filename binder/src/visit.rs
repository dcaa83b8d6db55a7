// Copyright (c) 2016-2021 Fabian Schuiki

//! An implementation of the visitor pattern for the semantic trees.
//!
//! Every node dispatches on its kind tag to the visitor's typed method; the
//! `walk_*` functions descend into children. The `Serializer` renders bound
//! trees to structured text and is the reference consumer of the visitor.

use crate::constraint::{Constraint, ConstraintKind};
use crate::expr::{Expr, ExprKind};
use crate::stmt::{Stmt, StmtKind};
use std::fmt::Write;

/// A visitor of the semantic trees. The default methods walk into children;
/// implementations override the kinds they care about.
pub trait Visitor<'a>: Sized {
    fn visit_expr(&mut self, expr: &'a Expr<'a>) {
        walk_expr(self, expr);
    }

    fn visit_stmt(&mut self, stmt: &'a Stmt<'a>) {
        walk_stmt(self, stmt);
    }

    fn visit_constraint(&mut self, constraint: &'a Constraint<'a>) {
        walk_constraint(self, constraint);
    }
}

/// Walk a visitor over the children of an expression.
pub fn walk_expr<'a, V: Visitor<'a>>(visitor: &mut V, expr: &'a Expr<'a>) {
    match expr.kind {
        ExprKind::IntLiteral(_)
        | ExprKind::TimeLiteral { .. }
        | ExprKind::StringLiteral(_)
        | ExprKind::NamedValue(_) => (),
        ExprKind::Unary { arg, .. } => visitor.visit_expr(arg),
        ExprKind::Binary { lhs, rhs, .. } => {
            visitor.visit_expr(lhs);
            visitor.visit_expr(rhs);
        }
        ExprKind::Ternary {
            cond,
            true_expr,
            false_expr,
        } => {
            visitor.visit_expr(cond);
            visitor.visit_expr(true_expr);
            visitor.visit_expr(false_expr);
        }
        ExprKind::Call { ref args, .. } => {
            for arg in args {
                visitor.visit_expr(arg);
            }
        }
        ExprKind::Concat { repeat, ref exprs } => {
            if let Some(r) = repeat {
                visitor.visit_expr(r);
            }
            for e in exprs {
                visitor.visit_expr(e);
            }
        }
        ExprKind::Invalid(child) => {
            if let Some(c) = child {
                visitor.visit_expr(c);
            }
        }
    }
}

/// Walk a visitor over the children of a statement.
pub fn walk_stmt<'a, V: Visitor<'a>>(visitor: &mut V, stmt: &'a Stmt<'a>) {
    match stmt.kind {
        StmtKind::Empty => (),
        StmtKind::List(ref stmts) => {
            for s in stmts {
                visitor.visit_stmt(s);
            }
        }
        StmtKind::ExprStmt(expr) => visitor.visit_expr(expr),
        StmtKind::Assign { lhs, rhs, .. } => {
            visitor.visit_expr(lhs);
            visitor.visit_expr(rhs);
        }
        StmtKind::Conditional {
            cond,
            if_body,
            else_body,
        } => {
            visitor.visit_expr(cond);
            visitor.visit_stmt(if_body);
            if let Some(s) = else_body {
                visitor.visit_stmt(s);
            }
        }
        StmtKind::Loop { cond, body, .. } => {
            if let Some(c) = cond {
                visitor.visit_expr(c);
            }
            visitor.visit_stmt(body);
        }
        StmtKind::Return(expr) => {
            if let Some(e) = expr {
                visitor.visit_expr(e);
            }
        }
        StmtKind::Invalid(child) => {
            if let Some(c) = child {
                visitor.visit_stmt(c);
            }
        }
    }
}

/// Walk a visitor over the children of a constraint.
pub fn walk_constraint<'a, V: Visitor<'a>>(visitor: &mut V, constraint: &'a Constraint<'a>) {
    match constraint.kind {
        ConstraintKind::Invalid(child) => {
            if let Some(c) = child {
                visitor.visit_constraint(c);
            }
        }
        ConstraintKind::List(ref list) => {
            for c in list {
                visitor.visit_constraint(c);
            }
        }
        ConstraintKind::Expression { expr, .. } => visitor.visit_expr(expr),
        ConstraintKind::Implication { predicate, body } => {
            visitor.visit_expr(predicate);
            visitor.visit_constraint(body);
        }
        ConstraintKind::Conditional {
            predicate,
            if_body,
            else_body,
        } => {
            visitor.visit_expr(predicate);
            visitor.visit_constraint(if_body);
            if let Some(c) = else_body {
                visitor.visit_constraint(c);
            }
        }
        ConstraintKind::Uniqueness { ref items } => {
            for item in items {
                visitor.visit_expr(item);
            }
        }
    }
}

/// Renders semantic trees to a compact structured text form, one
/// parenthesized node per kind. Useful for snapshot tests and debugging.
pub struct Serializer {
    out: String,
}

impl Serializer {
    pub fn new() -> Serializer {
        Serializer { out: String::new() }
    }

    /// Render an expression tree.
    pub fn serialize_expr(expr: &Expr) -> String {
        let mut s = Serializer::new();
        s.visit_expr(expr);
        s.out
    }

    /// Render a statement tree.
    pub fn serialize_stmt(stmt: &Stmt) -> String {
        let mut s = Serializer::new();
        s.visit_stmt(stmt);
        s.out
    }

    /// Render a constraint tree.
    pub fn serialize_constraint(constraint: &Constraint) -> String {
        let mut s = Serializer::new();
        s.visit_constraint(constraint);
        s.out
    }

    fn open(&mut self, tag: &str) {
        if !self.out.is_empty() && !self.out.ends_with('(') {
            self.out.push(' ');
        }
        self.out.push('(');
        self.out.push_str(tag);
    }

    fn close(&mut self) {
        self.out.push(')');
    }
}

impl Default for Serializer {
    fn default() -> Serializer {
        Serializer::new()
    }
}

impl<'a> Visitor<'a> for Serializer {
    fn visit_expr(&mut self, expr: &'a Expr<'a>) {
        match expr.kind {
            ExprKind::IntLiteral(ref bv) => {
                let _ = write!(self.out, " (int {})", bv.value);
                if bv.has_xz() {
                    let _ = write!(self.out, "/* xz */");
                }
                return;
            }
            ExprKind::TimeLiteral { int, frac, unit } => {
                let _ = match frac {
                    Some(frac) => write!(self.out, " (time {}.{}{})", int, frac, unit),
                    None => write!(self.out, " (time {}{})", int, unit),
                };
                return;
            }
            ExprKind::StringLiteral(s) => {
                let _ = write!(self.out, " (str {:?})", &*s.as_str());
                return;
            }
            ExprKind::NamedValue(def) => {
                let _ = write!(self.out, " (name {})", def.name);
                return;
            }
            ExprKind::Unary { op, .. } => self.open(&format!("unary {}", op)),
            ExprKind::Binary { op, .. } => self.open(&format!("binary {}", op)),
            ExprKind::Ternary { .. } => self.open("ternary"),
            ExprKind::Call { name, system, .. } => {
                self.open(&format!("call {}{}", if system { "$" } else { "" }, name))
            }
            ExprKind::Concat { .. } => self.open("concat"),
            ExprKind::Invalid(_) => self.open("invalid"),
        }
        walk_expr(self, expr);
        self.close();
    }

    fn visit_stmt(&mut self, stmt: &'a Stmt<'a>) {
        match stmt.kind {
            StmtKind::Empty => {
                self.out.push_str(" (empty)");
                return;
            }
            StmtKind::List(_) => self.open("list"),
            StmtKind::ExprStmt(_) => self.open("expr-stmt"),
            StmtKind::Assign { nonblocking, .. } => {
                self.open(if nonblocking { "assign-nb" } else { "assign" })
            }
            StmtKind::Conditional { .. } => self.open("if"),
            StmtKind::Loop { kind, .. } => self.open(&format!("loop {:?}", kind)),
            StmtKind::Return(_) => self.open("return"),
            StmtKind::Invalid(_) => self.open("invalid"),
        }
        walk_stmt(self, stmt);
        self.close();
    }

    fn visit_constraint(&mut self, constraint: &'a Constraint<'a>) {
        match constraint.kind {
            ConstraintKind::Invalid(_) => self.open("invalid"),
            ConstraintKind::List(_) => self.open("list"),
            ConstraintKind::Expression { soft, .. } => {
                self.open(if soft { "soft-expr" } else { "expr" })
            }
            ConstraintKind::Implication { .. } => self.open("implication"),
            ConstraintKind::Conditional { .. } => self.open("conditional"),
            ConstraintKind::Uniqueness { .. } => self.open("unique"),
        }
        walk_constraint(self, constraint);
        self.close();
    }
}
