// Copyright (c) 2016-2021 Fabian Schuiki

//! End-to-end binding tests: source text through the parser into the binder,
//! checking constraint kinds, invalid propagation, and serialization.

mod common;

use crate::common::{first_class, first_constraint, parse_clean};
use sylva_binder::{
    BindContext, Constraint, ConstraintKind, ScopeMap, SemanticArena, Serializer, Stmt, StmtKind,
};
use sylva_common::errors::{DiagCollector, Severity};

#[test]
fn constraint_block_kinds() {
    let root = parse_clean(
        "class Bar;\n\
         rand int x;\n\
         rand int y;\n\
         constraint c {\n\
         x > 0;\n\
         soft y < 8;\n\
         x -> { y != 4; }\n\
         if (x) { y != 5; } else { y != 6; }\n\
         unique { x, y };\n\
         }\n\
         endclass",
    );
    let class = first_class(&root);
    let scope = ScopeMap::from_class(class);
    let arena = SemanticArena::new();
    let coll = DiagCollector::new();
    let cx = BindContext::new(&scope, &arena, &coll);
    let bound = Constraint::bind_block(first_constraint(class), &cx);
    assert!(!bound.bad(), "constraint block must bind cleanly");
    assert!(coll.is_empty());

    let items = match bound.kind {
        ConstraintKind::List(ref items) => items,
        ref other => panic!("expected constraint list, got {:?}", other),
    };
    assert_eq!(items.len(), 5);
    match items[0].kind {
        ConstraintKind::Expression { soft: false, .. } => (),
        ref other => panic!("expected expression constraint, got {:?}", other),
    }
    match items[1].kind {
        ConstraintKind::Expression { soft: true, .. } => (),
        ref other => panic!("expected soft expression constraint, got {:?}", other),
    }
    match items[2].kind {
        ConstraintKind::Implication { ref body, .. } => assert!(!body.bad()),
        ref other => panic!("expected implication, got {:?}", other),
    }
    match items[3].kind {
        ConstraintKind::Conditional {
            else_body: Some(_), ..
        } => (),
        ref other => panic!("expected conditional with else, got {:?}", other),
    }
    match items[4].kind {
        ConstraintKind::Uniqueness { ref items } => assert_eq!(items.len(), 2),
        ref other => panic!("expected uniqueness, got {:?}", other),
    }
}

/// An undeclared name deep inside a constraint poisons every ancestor, and
/// the diagnostic appears exactly once.
#[test]
fn invalid_propagation_through_constraints() {
    let root = parse_clean(
        "class Bad;\n\
         rand int x;\n\
         constraint c { x -> { missing != 0; } }\n\
         endclass",
    );
    let class = first_class(&root);
    let scope = ScopeMap::from_class(class);
    let arena = SemanticArena::new();
    let coll = DiagCollector::new();
    let cx = BindContext::new(&scope, &arena, &coll);
    let bound = Constraint::bind_block(first_constraint(class), &cx);
    assert!(bound.bad(), "invalid must propagate to the block");
    assert_eq!(coll.len(), 1, "one root cause, one diagnostic");
    assert!(coll.diags.borrow()[0].get_message().contains("not declared"));

    // The invalid node still carries the partial list for diagnosis.
    match bound.kind {
        ConstraintKind::Invalid(Some(child)) => match child.kind {
            ConstraintKind::List(_) => (),
            ref other => panic!("expected partial list child, got {:?}", other),
        },
        ref other => panic!("expected invalid wrapper, got {:?}", other),
    }
}

#[test]
fn unique_single_item_warns() {
    let root = parse_clean(
        "class Solo; rand int x; constraint c { unique { x }; } endclass",
    );
    let class = first_class(&root);
    let scope = ScopeMap::from_class(class);
    let arena = SemanticArena::new();
    let coll = DiagCollector::new();
    let cx = BindContext::new(&scope, &arena, &coll);
    let bound = Constraint::bind_block(first_constraint(class), &cx);
    assert!(!bound.bad(), "a single-item unique still binds");
    assert_eq!(coll.severity(), Some(Severity::Warning));
}

#[test]
fn statement_binding_in_module_scope() {
    let root = parse_clean(
        "module M;\n\
         logic [7:0] a, b;\n\
         logic y;\n\
         always_comb begin\n\
         if (a == b) y = 1; else y = 0;\n\
         end\n\
         endmodule",
    );
    let module = match root.items[0] {
        sylva_syntax::ast::Item::ModuleDecl(ref m) => m,
        _ => panic!("expected module"),
    };
    let proc_stmt = match module.items[2] {
        sylva_syntax::ast::Item::Procedure(ref p) => &p.stmt,
        ref other => panic!("expected procedure, got {:?}", other),
    };
    let scope = ScopeMap::from_module(module);
    let arena = SemanticArena::new();
    let coll = DiagCollector::new();
    let cx = BindContext::new(&scope, &arena, &coll);
    let bound = Stmt::bind(proc_stmt, &cx);
    assert!(!bound.bad(), "statement must bind cleanly");
    assert!(coll.is_empty());
    match bound.kind {
        StmtKind::List(ref stmts) => {
            assert_eq!(stmts.len(), 1);
            match stmts[0].kind {
                StmtKind::Conditional { .. } => (),
                ref other => panic!("expected conditional, got {:?}", other),
            }
        }
        ref other => panic!("expected statement list, got {:?}", other),
    }
}

#[test]
fn serializer_renders_constraints() {
    let root = parse_clean(
        "class Ser; rand int x; constraint c { x > 0; } endclass",
    );
    let class = first_class(&root);
    let scope = ScopeMap::from_class(class);
    let arena = SemanticArena::new();
    let coll = DiagCollector::new();
    let cx = BindContext::new(&scope, &arena, &coll);
    let bound = Constraint::bind_block(first_constraint(class), &cx);
    let text = Serializer::serialize_constraint(bound);
    assert_eq!(text.trim(), "(list (expr (binary > (name x) (int 0))))");
}
