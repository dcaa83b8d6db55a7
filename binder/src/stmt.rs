// Copyright (c) 2016-2021 Fabian Schuiki

//! Semantic statements. The binder covers the local procedural constructs;
//! anything requiring elaboration context becomes an `Invalid` node with a
//! diagnostic at the root cause.

use crate::context::BindContext;
use crate::expr::Expr;
use sylva_syntax::ast;
use sylva_common::errors::*;
use sylva_common::source::Span;
use sylva_common::util::HasSpan;

/// A bound statement.
#[derive(Debug)]
pub struct Stmt<'a> {
    /// The span of the syntax this statement was bound from.
    pub span: Span,
    pub kind: StmtKind<'a>,
}

#[derive(Debug)]
pub enum StmtKind<'a> {
    /// A statement with no effect, e.g. `;` or a declaration handled during
    /// elaboration.
    Empty,
    /// An ordered list of statements, e.g. a `begin`/`end` block.
    List(Vec<&'a Stmt<'a>>),
    /// An expression evaluated for its side effect.
    ExprStmt(&'a Expr<'a>),
    /// A blocking or nonblocking assignment.
    Assign {
        lhs: &'a Expr<'a>,
        rhs: &'a Expr<'a>,
        nonblocking: bool,
    },
    /// An if statement.
    Conditional {
        cond: &'a Expr<'a>,
        if_body: &'a Stmt<'a>,
        else_body: Option<&'a Stmt<'a>>,
    },
    /// A loop with an optional condition expression.
    Loop {
        kind: LoopKind,
        cond: Option<&'a Expr<'a>>,
        body: &'a Stmt<'a>,
    },
    /// A return with an optional value.
    Return(Option<&'a Expr<'a>>),
    /// The sentinel for a statement that failed to bind, with the best
    /// partial child.
    Invalid(Option<&'a Stmt<'a>>),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LoopKind {
    Forever,
    Repeat,
    While,
    DoWhile,
}

impl<'a> Stmt<'a> {
    /// Whether this statement failed to bind.
    pub fn bad(&self) -> bool {
        match self.kind {
            StmtKind::Invalid(_) => true,
            _ => false,
        }
    }

    /// Bind a syntax statement in the given context.
    pub fn bind(syntax: &ast::Stmt, cx: &BindContext<'a>) -> &'a Stmt<'a> {
        bind_stmt(syntax, cx)
    }
}

fn alloc<'a>(span: Span, kind: StmtKind<'a>, cx: &BindContext<'a>) -> &'a Stmt<'a> {
    cx.arena.stmts.alloc(Stmt {
        span: span,
        kind: kind,
    })
}

fn invalid<'a>(
    span: Span,
    child: Option<&'a Stmt<'a>>,
    cx: &BindContext<'a>,
) -> &'a Stmt<'a> {
    alloc(span, StmtKind::Invalid(child), cx)
}

fn bind_stmt<'a>(syntax: &ast::Stmt, cx: &BindContext<'a>) -> &'a Stmt<'a> {
    let span = syntax.span();
    match syntax.data {
        ast::StmtData::NullStmt | ast::StmtData::VarDeclStmt(_)
        | ast::StmtData::GenvarDeclStmt(_) | ast::StmtData::ImportStmt(_) => {
            alloc(span, StmtKind::Empty, cx)
        }

        ast::StmtData::SequentialBlock(ref stmts) => {
            let mut bound = Vec::new();
            let mut bad_child = None;
            for stmt in stmts {
                let b = bind_stmt(stmt, cx);
                if b.bad() && bad_child.is_none() {
                    bad_child = Some(b);
                }
                bound.push(b);
            }
            let node = alloc(span, StmtKind::List(bound), cx);
            match bad_child {
                Some(_) => invalid(span, Some(node), cx),
                None => node,
            }
        }

        ast::StmtData::ExprStmt(ref expr) => {
            let expr = Expr::bind(expr, cx);
            if expr.bad() {
                return invalid(span, None, cx);
            }
            alloc(span, StmtKind::ExprStmt(expr), cx)
        }

        ast::StmtData::AssignStmt {
            kind,
            ref lhs,
            ref rhs,
        } => {
            let lhs = Expr::bind(lhs, cx);
            let rhs = Expr::bind(rhs, cx);
            if lhs.bad() || rhs.bad() {
                return invalid(span, None, cx);
            }
            let nonblocking = kind == ast::AssignKind::Nonblock;
            alloc(
                span,
                StmtKind::Assign {
                    lhs: lhs,
                    rhs: rhs,
                    nonblocking: nonblocking,
                },
                cx,
            )
        }

        ast::StmtData::IfStmt {
            ref cond,
            ref main_stmt,
            ref else_stmt,
            ..
        } => {
            let cond = Expr::bind(cond, cx);
            let if_body = bind_stmt(main_stmt, cx);
            let else_body = else_stmt.as_ref().map(|s| bind_stmt(s, cx));
            if cond.bad() || if_body.bad() || else_body.map(|s| s.bad()).unwrap_or(false) {
                let node = alloc(
                    span,
                    StmtKind::Conditional {
                        cond: cond,
                        if_body: if_body,
                        else_body: else_body,
                    },
                    cx,
                );
                return invalid(span, Some(node), cx);
            }
            alloc(
                span,
                StmtKind::Conditional {
                    cond: cond,
                    if_body: if_body,
                    else_body: else_body,
                },
                cx,
            )
        }

        ast::StmtData::ForeverStmt(ref body) => bind_loop(span, LoopKind::Forever, None, body, cx),
        ast::StmtData::RepeatStmt(ref count, ref body) => {
            bind_loop(span, LoopKind::Repeat, Some(count), body, cx)
        }
        ast::StmtData::WhileStmt(ref cond, ref body) => {
            bind_loop(span, LoopKind::While, Some(cond), body, cx)
        }
        ast::StmtData::DoStmt(ref body, ref cond) => {
            bind_loop(span, LoopKind::DoWhile, Some(cond), body, cx)
        }

        ast::StmtData::ReturnStmt(ref expr) => {
            let expr = expr.as_ref().map(|e| Expr::bind(e, cx));
            if expr.map(|e| e.bad()).unwrap_or(false) {
                return invalid(span, None, cx);
            }
            alloc(span, StmtKind::Return(expr), cx)
        }

        // Timing controls are elaboration material; the controlled
        // statement is bound in place of the wrapper.
        ast::StmtData::TimedStmt(_, ref body) => bind_stmt(body, cx),

        ast::StmtData::ErrorStmt => invalid(span, None, cx),

        _ => {
            cx.emitter.emit(
                DiagBuilder2::error("statement form is not supported by the binder").span(span),
            );
            invalid(span, None, cx)
        }
    }
}

fn bind_loop<'a>(
    span: Span,
    kind: LoopKind,
    cond: Option<&ast::Expr>,
    body: &ast::Stmt,
    cx: &BindContext<'a>,
) -> &'a Stmt<'a> {
    let cond = cond.map(|c| Expr::bind(c, cx));
    let body = bind_stmt(body, cx);
    if cond.map(|c| c.bad()).unwrap_or(false) || body.bad() {
        let node = alloc(
            span,
            StmtKind::Loop {
                kind: kind,
                cond: cond,
                body: body,
            },
            cx,
        );
        return invalid(span, Some(node), cx);
    }
    alloc(
        span,
        StmtKind::Loop {
            kind: kind,
            cond: cond,
            body: body,
        },
        cx,
    )
}
