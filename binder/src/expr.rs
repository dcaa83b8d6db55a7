// Copyright (c) 2016-2021 Fabian Schuiki

//! Semantic expressions. Syntax expressions are bound into a kind-tagged
//! tree with literal values folded, names resolved, and a simple type
//! attached to every node. An expression that cannot be bound becomes an
//! `Invalid` node; any parent receiving one yields an invalid result.

use crate::context::{BindContext, Def};
use sylva_syntax::ast;
use sylva_syntax::number::{self, BitVec};
use sylva_syntax::token::{Lit, Op, TimeUnit};
use sylva_common::errors::*;
use sylva_common::name::Name;
use sylva_common::source::Span;

/// A simple type, sufficient for the local derivations the binder performs.
/// Full type checking happens during elaboration.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Ty {
    /// The type of an invalid expression. Absorbing: any derivation
    /// involving it yields `Error` again.
    Error,
    Void,
    /// A packed logic vector.
    Logic { width: usize, signed: bool },
    String,
    Time,
    Event,
}

impl Ty {
    /// A single unsigned bit, the result type of comparisons and
    /// reductions.
    pub fn bit() -> Ty {
        Ty::Logic {
            width: 1,
            signed: false,
        }
    }

    pub fn is_error(&self) -> bool {
        *self == Ty::Error
    }

    /// The type two operands jointly propagate: the wider of the two logic
    /// vectors, or `Error` if either side already failed.
    pub fn join(self, other: Ty) -> Ty {
        match (self, other) {
            (Ty::Error, _) | (_, Ty::Error) => Ty::Error,
            (
                Ty::Logic {
                    width: a,
                    signed: sa,
                },
                Ty::Logic {
                    width: b,
                    signed: sb,
                },
            ) => Ty::Logic {
                width: a.max(b),
                signed: sa && sb,
            },
            (a, b) if a == b => a,
            _ => Ty::Error,
        }
    }
}

/// A bound expression.
#[derive(Debug)]
pub struct Expr<'a> {
    /// The span of the syntax this expression was bound from.
    pub span: Span,
    /// The derived type.
    pub ty: Ty,
    pub kind: ExprKind<'a>,
}

#[derive(Debug)]
pub enum ExprKind<'a> {
    /// An integer literal, folded into value bits and an X/Z mask.
    IntLiteral(BitVec),
    /// A time literal.
    TimeLiteral {
        int: Name,
        frac: Option<Name>,
        unit: TimeUnit,
    },
    /// A string literal; the name holds the decoded contents.
    StringLiteral(Name),
    /// A reference to a resolved definition.
    NamedValue(Def),
    Unary {
        op: Op,
        arg: &'a Expr<'a>,
    },
    Binary {
        op: Op,
        lhs: &'a Expr<'a>,
        rhs: &'a Expr<'a>,
    },
    Ternary {
        cond: &'a Expr<'a>,
        true_expr: &'a Expr<'a>,
        false_expr: &'a Expr<'a>,
    },
    /// A call of a subroutine or system function.
    Call {
        name: Name,
        system: bool,
        args: Vec<&'a Expr<'a>>,
    },
    /// A concatenation, possibly with a repeat count.
    Concat {
        repeat: Option<&'a Expr<'a>>,
        exprs: Vec<&'a Expr<'a>>,
    },
    /// The sentinel for an expression that failed to bind. Carries the best
    /// partial child, if any.
    Invalid(Option<&'a Expr<'a>>),
}

impl<'a> Expr<'a> {
    /// Whether this expression failed to bind.
    pub fn bad(&self) -> bool {
        match self.kind {
            ExprKind::Invalid(_) => true,
            _ => false,
        }
    }

    /// Bind a syntax expression in the given context.
    pub fn bind(syntax: &ast::Expr, cx: &BindContext<'a>) -> &'a Expr<'a> {
        bind_expr(syntax, cx)
    }
}

/// Allocate an invalid expression wrapping the given partial child.
fn invalid<'a>(
    span: Span,
    child: Option<&'a Expr<'a>>,
    cx: &BindContext<'a>,
) -> &'a Expr<'a> {
    cx.arena.exprs.alloc(Expr {
        span: span,
        ty: Ty::Error,
        kind: ExprKind::Invalid(child),
    })
}

fn bind_expr<'a>(syntax: &ast::Expr, cx: &BindContext<'a>) -> &'a Expr<'a> {
    let span = syntax.span;
    match syntax.data {
        ast::ExprData::LiteralExpr(lit) => bind_literal(lit, span, cx),

        ast::ExprData::IdentExpr(id) => match cx.scope.resolve(id.name) {
            Some(def) => cx.arena.exprs.alloc(Expr {
                span: span,
                ty: def.ty,
                kind: ExprKind::NamedValue(def),
            }),
            None => {
                cx.emitter.emit(
                    DiagBuilder2::error(format!("`{}` is not declared in this scope", id.name))
                        .span(span),
                );
                invalid(span, None, cx)
            }
        },

        ast::ExprData::UnaryExpr {
            op, ref expr, ..
        } => {
            let arg = bind_expr(expr, cx);
            if arg.bad() {
                return invalid(span, Some(arg), cx);
            }
            let ty = match op {
                // Reductions and logic negation produce a single bit.
                Op::BitAnd | Op::BitNand | Op::BitOr | Op::BitNor | Op::BitXor | Op::BitXnor
                | Op::BitNxor | Op::LogicNot => Ty::bit(),
                _ => arg.ty,
            };
            cx.arena.exprs.alloc(Expr {
                span: span,
                ty: ty,
                kind: ExprKind::Unary { op: op, arg: arg },
            })
        }

        ast::ExprData::BinaryExpr {
            op,
            ref lhs,
            ref rhs,
        } => {
            let lhs = bind_expr(lhs, cx);
            let rhs = bind_expr(rhs, cx);
            if lhs.bad() {
                return invalid(span, Some(lhs), cx);
            }
            if rhs.bad() {
                return invalid(span, Some(rhs), cx);
            }
            let ty = binary_ty(op, lhs.ty, rhs.ty);
            if ty.is_error() {
                cx.emitter.emit(
                    DiagBuilder2::error(format!(
                        "operator `{}` cannot be applied to these operands",
                        op
                    ))
                    .span(span),
                );
                let partial = cx.arena.exprs.alloc(Expr {
                    span: span,
                    ty: Ty::Error,
                    kind: ExprKind::Binary {
                        op: op,
                        lhs: lhs,
                        rhs: rhs,
                    },
                });
                return invalid(span, Some(partial), cx);
            }
            cx.arena.exprs.alloc(Expr {
                span: span,
                ty: ty,
                kind: ExprKind::Binary {
                    op: op,
                    lhs: lhs,
                    rhs: rhs,
                },
            })
        }

        ast::ExprData::TernaryExpr {
            ref cond,
            ref true_expr,
            ref false_expr,
        } => {
            let cond = bind_expr(cond, cx);
            let true_expr = bind_expr(true_expr, cx);
            let false_expr = bind_expr(false_expr, cx);
            for &child in &[cond, true_expr, false_expr] {
                if child.bad() {
                    return invalid(span, Some(child), cx);
                }
            }
            cx.arena.exprs.alloc(Expr {
                span: span,
                ty: true_expr.ty.join(false_expr.ty),
                kind: ExprKind::Ternary {
                    cond: cond,
                    true_expr: true_expr,
                    false_expr: false_expr,
                },
            })
        }

        ast::ExprData::CallExpr(ref callee, ref args) => {
            let (name, system) = match callee.data {
                ast::ExprData::IdentExpr(id) => (id.name, false),
                ast::ExprData::SysIdentExpr(id) => (id.name, true),
                _ => {
                    cx.emitter.emit(
                        DiagBuilder2::error("called expression is not a subroutine name")
                            .span(callee.span),
                    );
                    return invalid(span, None, cx);
                }
            };
            let mut bound_args = Vec::new();
            let mut bad_arg = None;
            for arg in args {
                if let Some(ref expr) = arg.expr {
                    let bound = bind_expr(expr, cx);
                    if bound.bad() && bad_arg.is_none() {
                        bad_arg = Some(bound);
                    }
                    bound_args.push(bound);
                }
            }
            let node = cx.arena.exprs.alloc(Expr {
                span: span,
                ty: Ty::Logic {
                    width: 32,
                    signed: true,
                },
                kind: ExprKind::Call {
                    name: name,
                    system: system,
                    args: bound_args,
                },
            });
            match bad_arg {
                Some(_) => invalid(span, Some(node), cx),
                None => node,
            }
        }

        ast::ExprData::ConcatExpr {
            ref repeat,
            ref exprs,
        } => {
            let repeat = repeat.as_ref().map(|r| bind_expr(r, cx));
            let mut bound = Vec::new();
            let mut bad_child = repeat.filter(|r| r.bad());
            let mut width = 0usize;
            for expr in exprs {
                let b = bind_expr(expr, cx);
                if b.bad() && bad_child.is_none() {
                    bad_child = Some(b);
                }
                if let Ty::Logic { width: w, .. } = b.ty {
                    width += w;
                }
                bound.push(b);
            }
            let node = cx.arena.exprs.alloc(Expr {
                span: span,
                ty: Ty::Logic {
                    width: width,
                    signed: false,
                },
                kind: ExprKind::Concat {
                    repeat: repeat,
                    exprs: bound,
                },
            });
            match bad_child {
                Some(_) => invalid(span, Some(node), cx),
                None => node,
            }
        }

        ast::ExprData::SysIdentExpr(id) => cx.arena.exprs.alloc(Expr {
            span: span,
            ty: Ty::Logic {
                width: 32,
                signed: true,
            },
            kind: ExprKind::Call {
                name: id.name,
                system: true,
                args: Vec::new(),
            },
        }),

        ast::ExprData::MinTypMaxExpr(_, ref typ, _) => bind_expr(typ, cx),

        ast::ExprData::ErrorExpr => invalid(span, None, cx),

        ref other => {
            cx.emitter.emit(
                DiagBuilder2::error(format!(
                    "{} expressions are not supported by the binder",
                    discriminant_name(other)
                ))
                .span(span),
            );
            invalid(span, None, cx)
        }
    }
}

fn bind_literal<'a>(lit: Lit, span: Span, cx: &BindContext<'a>) -> &'a Expr<'a> {
    match lit {
        Lit::Str(s) => cx.arena.exprs.alloc(Expr {
            span: span,
            ty: Ty::String,
            kind: ExprKind::StringLiteral(s),
        }),
        Lit::Time(int, frac, unit) => cx.arena.exprs.alloc(Expr {
            span: span,
            ty: Ty::Time,
            kind: ExprKind::TimeLiteral {
                int: int,
                frac: frac,
                unit: unit,
            },
        }),
        Lit::Number(_, Some(_)) => {
            cx.emitter.emit(
                DiagBuilder2::error("real-valued literals are not supported here").span(span),
            );
            invalid(span, None, cx)
        }
        lit => {
            // The digits were checked when the token was constructed, so no
            // diagnostics are expected here; a degraded value is fine either
            // way.
            let mut ignored = Vec::new();
            match number::from_literal(lit, span, &mut ignored) {
                Some(bv) => {
                    let ty = Ty::Logic {
                        width: bv.effective_width(),
                        signed: bv.signed,
                    };
                    cx.arena.exprs.alloc(Expr {
                        span: span,
                        ty: ty,
                        kind: ExprKind::IntLiteral(bv),
                    })
                }
                None => invalid(span, None, cx),
            }
        }
    }
}

/// Derive the result type of a binary operator.
fn binary_ty(op: Op, lhs: Ty, rhs: Ty) -> Ty {
    if lhs.is_error() || rhs.is_error() {
        return Ty::Error;
    }
    match op {
        // Comparisons and logic connectives produce a single bit.
        Op::LogicEq
        | Op::LogicNeq
        | Op::CaseEq
        | Op::CaseNeq
        | Op::WildcardEq
        | Op::WildcardNeq
        | Op::Lt
        | Op::Leq
        | Op::Gt
        | Op::Geq
        | Op::LogicAnd
        | Op::LogicOr
        | Op::LogicImpl
        | Op::LogicEquiv => Ty::bit(),
        // Shifts keep the left operand's type.
        Op::LogicShL | Op::LogicShR | Op::ArithShL | Op::ArithShR => lhs,
        // Everything else joins the operand types.
        _ => lhs.join(rhs),
    }
}

fn discriminant_name(data: &ast::ExprData) -> &'static str {
    match *data {
        ast::ExprData::ScopeExpr(..) => "scope access",
        ast::ExprData::IndexExpr { .. } => "index access",
        ast::ExprData::MemberExpr { .. } => "member access",
        ast::ExprData::PatternExpr(_) => "assignment pattern",
        ast::ExprData::InsideExpr(..) => "inside expression",
        ast::ExprData::CastExpr(..) | ast::ExprData::CastSizeExpr(..)
        | ast::ExprData::CastSignExpr(..) => "cast",
        ast::ExprData::AssignExpr { .. } => "assignment",
        ast::ExprData::RangeExpr { .. } => "range",
        ast::ExprData::EmptyQueueExpr => "empty queue",
        _ => "expression",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{DefKind, ScopeMap};
    use crate::SemanticArena;
    use sylva_common::name::get_name_table;
    use sylva_common::source::{get_source_manager, INVALID_SPAN};
    use sylva_syntax::lexer::Lexer;
    use sylva_syntax::parser;
    use sylva_syntax::preproc::Preprocessor;
    use std::cell::Cell;

    fn parse_expr(input: &str, coll: &DiagCollector) -> ast::Expr {
        thread_local!(static INDEX: Cell<usize> = Cell::new(0));
        let sm = get_source_manager();
        let idx = INDEX.with(|i| {
            let v = i.get();
            i.set(v + 1);
            v
        });
        let source = sm.add(&format!("bind_expr_{}.sv", idx), input);
        let pp = Preprocessor::new(source, &[], &[]);
        let lexer = Lexer::new(pp);
        parser::parse_expression(lexer, coll)
    }

    fn scope_with(names: &[(&str, usize)]) -> ScopeMap<'static> {
        let nt = get_name_table();
        let mut scope = ScopeMap::new();
        for &(name, width) in names {
            scope.insert(crate::context::Def {
                name: nt.intern(name, true),
                span: INVALID_SPAN,
                kind: DefKind::Var,
                ty: Ty::Logic {
                    width: width,
                    signed: false,
                },
            });
        }
        scope
    }

    #[test]
    fn literal_folding() {
        let arena = SemanticArena::new();
        let coll = DiagCollector::new();
        let scope = ScopeMap::new();
        let cx = BindContext::new(&scope, &arena, &coll);
        let ast = parse_expr("4'b1010", &coll);
        let bound = Expr::bind(&ast, &cx);
        match bound.kind {
            ExprKind::IntLiteral(ref bv) => {
                assert_eq!(bv.width, Some(4));
                assert_eq!(bv.value, num::BigInt::from(0b1010));
                assert!(!bv.has_xz());
            }
            ref other => panic!("expected integer literal, got {:?}", other),
        }
        assert_eq!(
            bound.ty,
            Ty::Logic {
                width: 4,
                signed: false
            }
        );
        assert!(coll.is_empty());
    }

    #[test]
    fn name_resolution() {
        let arena = SemanticArena::new();
        let coll = DiagCollector::new();
        let scope = scope_with(&[("x", 8)]);
        let cx = BindContext::new(&scope, &arena, &coll);
        let ast = parse_expr("x + 1", &coll);
        let bound = Expr::bind(&ast, &cx);
        assert!(!bound.bad());
        match bound.kind {
            ExprKind::Binary { op: Op::Add, lhs, .. } => match lhs.kind {
                ExprKind::NamedValue(def) => assert_eq!(def.kind, DefKind::Var),
                ref other => panic!("expected named value, got {:?}", other),
            },
            ref other => panic!("expected binary expression, got {:?}", other),
        }
        assert!(coll.is_empty());
    }

    #[test]
    fn undeclared_name_diagnosed_once() {
        let arena = SemanticArena::new();
        let coll = DiagCollector::new();
        let scope = ScopeMap::new();
        let cx = BindContext::new(&scope, &arena, &coll);
        // The undeclared `y` sits two parents deep; only one diagnostic may
        // be emitted, and every ancestor must be invalid.
        let ast = parse_expr("1 + (2 * y)", &coll);
        let bound = Expr::bind(&ast, &cx);
        assert!(bound.bad());
        assert_eq!(coll.len(), 1);
        assert!(coll.diags.borrow()[0]
            .get_message()
            .contains("not declared"));
    }

    #[test]
    fn invalid_propagates_through_parents() {
        let arena = SemanticArena::new();
        let coll = DiagCollector::new();
        let scope = scope_with(&[("a", 1)]);
        let cx = BindContext::new(&scope, &arena, &coll);
        let ast = parse_expr("a ? missing : 0", &coll);
        let bound = Expr::bind(&ast, &cx);
        assert!(bound.bad());
        match bound.kind {
            ExprKind::Invalid(Some(child)) => assert!(child.bad()),
            ref other => panic!("expected invalid with child, got {:?}", other),
        }
    }

    #[test]
    fn comparison_yields_single_bit() {
        let arena = SemanticArena::new();
        let coll = DiagCollector::new();
        let scope = scope_with(&[("a", 8), ("b", 8)]);
        let cx = BindContext::new(&scope, &arena, &coll);
        let ast = parse_expr("a == b", &coll);
        let bound = Expr::bind(&ast, &cx);
        assert_eq!(bound.ty, Ty::bit());
    }

    #[test]
    fn concat_width_is_sum() {
        let arena = SemanticArena::new();
        let coll = DiagCollector::new();
        let scope = scope_with(&[("a", 8), ("b", 4)]);
        let cx = BindContext::new(&scope, &arena, &coll);
        let ast = parse_expr("{a, b}", &coll);
        let bound = Expr::bind(&ast, &cx);
        assert_eq!(
            bound.ty,
            Ty::Logic {
                width: 12,
                signed: false
            }
        );
    }
}
