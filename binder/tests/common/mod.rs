// Copyright (c) 2016-2021 Fabian Schuiki
#![allow(dead_code)]

//! Utilities for binder tests.

use sylva_common::errors::DiagCollector;
use sylva_common::source::get_source_manager;
use sylva_syntax::ast;
use sylva_syntax::lexer::Lexer;
use sylva_syntax::parser;
use sylva_syntax::preproc::Preprocessor;
use std::cell::Cell;

/// Parse an input to a compilation unit, asserting that no errors occur.
pub fn parse_clean(input: &str) -> ast::Root {
    thread_local!(static INDEX: Cell<usize> = Cell::new(0));
    let sm = get_source_manager();
    let idx = INDEX.with(|i| {
        let v = i.get();
        i.set(v + 1);
        v
    });
    let source = sm.add(&format!("bind_test_{}.sv", idx), input);
    let pp = Preprocessor::new(source, &[], &[]);
    let lexer = Lexer::new(pp);
    let coll = DiagCollector::new();
    let root = parser::parse(lexer, &coll);
    assert!(
        coll.is_empty(),
        "unexpected parse diagnostics: {:?}",
        coll.diags
            .borrow()
            .iter()
            .map(|d| d.get_message().clone())
            .collect::<Vec<_>>()
    );
    root
}

/// Extract the first class declaration of a compilation unit.
pub fn first_class(root: &ast::Root) -> &ast::ClassDecl {
    for item in &root.items {
        if let ast::Item::ClassDecl(ref c) = *item {
            return c;
        }
    }
    panic!("no class declaration in input");
}

/// Extract the first constraint block of a class.
pub fn first_constraint(class: &ast::ClassDecl) -> &ast::Constraint {
    for item in &class.items {
        if let ast::ClassItemData::Constraint(ref c) = item.data {
            return c;
        }
    }
    panic!("no constraint block in class");
}
