// Copyright (c) 2016-2021 Fabian Schuiki

//! Semantic constraints. A constraint block binds to a `List` of items;
//! each item is an expression, implication, conditional, or uniqueness
//! constraint, with `Invalid` as the sentinel for anything that failed.

use crate::context::BindContext;
use crate::expr::{Expr, Ty};
use sylva_syntax::ast;
use sylva_common::errors::*;
use sylva_common::source::Span;

/// A bound constraint.
#[derive(Debug)]
pub struct Constraint<'a> {
    /// The span of the syntax this constraint was bound from.
    pub span: Span,
    pub kind: ConstraintKind<'a>,
}

#[derive(Debug)]
pub enum ConstraintKind<'a> {
    /// The sentinel for a constraint that failed to bind, carrying the best
    /// partial child.
    Invalid(Option<&'a Constraint<'a>>),
    /// An ordered sequence of child constraints.
    List(Vec<&'a Constraint<'a>>),
    /// A boolean expression constraint, optionally soft.
    Expression { expr: &'a Expr<'a>, soft: bool },
    /// An implication: the body holds whenever the predicate does.
    Implication {
        predicate: &'a Expr<'a>,
        body: &'a Constraint<'a>,
    },
    /// A conditional constraint with an optional else body.
    Conditional {
        predicate: &'a Expr<'a>,
        if_body: &'a Constraint<'a>,
        else_body: Option<&'a Constraint<'a>>,
    },
    /// An ordered set of expressions whose runtime values must be pairwise
    /// distinct.
    Uniqueness { items: Vec<&'a Expr<'a>> },
}

impl<'a> Constraint<'a> {
    /// Whether this constraint failed to bind.
    pub fn bad(&self) -> bool {
        match self.kind {
            ConstraintKind::Invalid(_) => true,
            _ => false,
        }
    }

    /// Bind a single constraint item.
    pub fn bind(syntax: &ast::ConstraintItem, cx: &BindContext<'a>) -> &'a Constraint<'a> {
        bind_item(syntax, cx)
    }

    /// Bind a whole constraint block to a `List` constraint.
    pub fn bind_block(syntax: &ast::Constraint, cx: &BindContext<'a>) -> &'a Constraint<'a> {
        debug!("binding constraint block `{}`", syntax.name);
        bind_list(syntax.span, &syntax.items, cx)
    }
}

fn alloc<'a>(span: Span, kind: ConstraintKind<'a>, cx: &BindContext<'a>) -> &'a Constraint<'a> {
    cx.arena.constraints.alloc(Constraint {
        span: span,
        kind: kind,
    })
}

fn invalid<'a>(
    span: Span,
    child: Option<&'a Constraint<'a>>,
    cx: &BindContext<'a>,
) -> &'a Constraint<'a> {
    alloc(span, ConstraintKind::Invalid(child), cx)
}

/// Wrap a freshly bound node: if any of its children went bad, the parent
/// becomes an invalid node pointing at the partial result. Diagnostics were
/// already emitted at the root cause.
fn wrap<'a>(
    node: &'a Constraint<'a>,
    any_bad: bool,
    cx: &BindContext<'a>,
) -> &'a Constraint<'a> {
    if any_bad {
        invalid(node.span, Some(node), cx)
    } else {
        node
    }
}

fn bind_list<'a>(
    span: Span,
    items: &[ast::ConstraintItem],
    cx: &BindContext<'a>,
) -> &'a Constraint<'a> {
    let mut bound = Vec::new();
    let mut any_bad = false;
    for item in items {
        let b = bind_item(item, cx);
        any_bad |= b.bad();
        bound.push(b);
    }
    let node = alloc(span, ConstraintKind::List(bound), cx);
    wrap(node, any_bad, cx)
}

fn bind_item<'a>(syntax: &ast::ConstraintItem, cx: &BindContext<'a>) -> &'a Constraint<'a> {
    let span = syntax.span;
    match syntax.data {
        ast::ConstraintItemData::Expr(ref expr) => bind_expression(span, expr, false, cx),
        ast::ConstraintItemData::SoftExpr(ref expr) => bind_expression(span, expr, true, cx),

        ast::ConstraintItemData::Implication(ref predicate, ref body) => {
            let predicate = Expr::bind(predicate, cx);
            let body = bind_list(span, body, cx);
            let any_bad = predicate.bad() || body.bad();
            let node = alloc(
                span,
                ConstraintKind::Implication {
                    predicate: predicate,
                    body: body,
                },
                cx,
            );
            wrap(node, any_bad, cx)
        }

        ast::ConstraintItemData::Conditional(ref predicate, ref then_items, ref else_items) => {
            let predicate = Expr::bind(predicate, cx);
            let if_body = bind_list(span, then_items, cx);
            let else_body = else_items.as_ref().map(|items| bind_list(span, items, cx));
            let any_bad = predicate.bad()
                || if_body.bad()
                || else_body.map(|c| c.bad()).unwrap_or(false);
            let node = alloc(
                span,
                ConstraintKind::Conditional {
                    predicate: predicate,
                    if_body: if_body,
                    else_body: else_body,
                },
                cx,
            );
            wrap(node, any_bad, cx)
        }

        ast::ConstraintItemData::Unique(ref exprs) => {
            if exprs.len() < 2 {
                // Pairwise distinctness over fewer than two values is
                // vacuous; the standard does not forbid it, so this only
                // warns.
                cx.emitter.emit(
                    DiagBuilder2::warning(
                        "unique constraint over a single expression has no effect",
                    )
                    .span(span),
                );
            }
            let mut items = Vec::new();
            let mut any_bad = false;
            for expr in exprs {
                let b = Expr::bind(expr, cx);
                any_bad |= b.bad();
                items.push(b);
            }
            let node = alloc(span, ConstraintKind::Uniqueness { items: items }, cx);
            wrap(node, any_bad, cx)
        }

        ast::ConstraintItemData::List(ref items) => bind_list(span, items, cx),
    }
}

fn bind_expression<'a>(
    span: Span,
    expr: &ast::Expr,
    soft: bool,
    cx: &BindContext<'a>,
) -> &'a Constraint<'a> {
    let expr = Expr::bind(expr, cx);
    let mut any_bad = expr.bad();
    if !any_bad {
        // The constraint needs a boolean interpretation of the expression.
        match expr.ty {
            Ty::Logic { .. } => (),
            ty => {
                cx.emitter.emit(
                    DiagBuilder2::error(format!(
                        "constraint expression must be integral, not {:?}",
                        ty
                    ))
                    .span(span),
                );
                any_bad = true;
            }
        }
    }
    let node = alloc(
        span,
        ConstraintKind::Expression {
            expr: expr,
            soft: soft,
        },
        cx,
    );
    wrap(node, any_bad, cx)
}
