// Copyright (c) 2016-2021 Fabian Schuiki
#![allow(dead_code)]

//! Utilities for parser and preprocessor tests.

use sylva_common::errors::DiagCollector;
use sylva_common::source::{get_source_manager, Source};
use sylva_syntax::ast;
use sylva_syntax::lexer::Lexer;
use sylva_syntax::parser;
use sylva_syntax::preproc::Preprocessor;
use sylva_syntax::token::FullToken;
use std::cell::Cell;

/// Register an input string as a fresh virtual source file.
pub fn inject(input: &str) -> Source {
    thread_local!(static INDEX: Cell<usize> = Cell::new(0));
    let sm = get_source_manager();
    let idx = INDEX.with(|i| {
        let v = i.get();
        i.set(v + 1);
        v
    });
    sm.add(&format!("test_{}.sv", idx), input)
}

/// Lex an input to the full token stream, including the final EOF token.
pub fn lex(input: &str) -> Vec<FullToken> {
    let source = inject(input);
    let pp = Preprocessor::new(source, &[], &[]);
    let mut lexer = Lexer::new(pp);
    let mut tokens = Vec::new();
    loop {
        let tkn = lexer.next_token().expect("lexer failed");
        let done = tkn.kind == sylva_syntax::token::Token::Eof;
        tokens.push(tkn);
        if done {
            return tokens;
        }
    }
}

/// Parse an input to a compilation unit, collecting diagnostics.
pub fn parse(input: &str) -> (ast::Root, DiagCollector) {
    let source = inject(input);
    let pp = Preprocessor::new(source, &[], &[]);
    let lexer = Lexer::new(pp);
    let coll = DiagCollector::new();
    let root = parser::parse(lexer, &coll);
    (root, coll)
}

/// Reconstruct the input text from a token stream by concatenating all
/// trivia and token spans in emission order.
pub fn reconstruct(tokens: &[FullToken]) -> String {
    let mut text = String::new();
    for tkn in tokens {
        for trivia in &tkn.trivia {
            text.push_str(&trivia.span().extract());
        }
        text.push_str(&tkn.raw_text());
    }
    text
}

/// Collect the kind sequence of the significant tokens of an input, for
/// structural stream comparison.
pub fn token_kinds(input: &str) -> Vec<sylva_syntax::token::Token> {
    lex(input).into_iter().map(|t| t.kind).collect()
}

/// A visitor that records the kind tag of every node it encounters, for
/// structural tree comparison.
pub struct KindCollector {
    pub kinds: Vec<ast::SyntaxKind>,
}

impl KindCollector {
    pub fn collect(root: &ast::Root) -> Vec<ast::SyntaxKind> {
        use sylva_syntax::ast::Visitor;
        let mut v = KindCollector { kinds: Vec::new() };
        v.visit_root(root);
        v.kinds
    }
}

impl ast::Visitor for KindCollector {
    fn visit_root(&mut self, node: &ast::Root) {
        self.kinds.push(node.kind());
        use sylva_syntax::ast::AcceptVisitor;
        node.accept(self);
    }

    fn visit_item(&mut self, node: &ast::Item) {
        self.kinds.push(node.kind());
        use sylva_syntax::ast::AcceptVisitor;
        node.accept(self);
    }

    fn visit_stmt(&mut self, node: &ast::Stmt) {
        self.kinds.push(node.kind());
        use sylva_syntax::ast::AcceptVisitor;
        node.accept(self);
    }

    fn visit_expr(&mut self, node: &ast::Expr) {
        self.kinds.push(node.kind());
        use sylva_syntax::ast::AcceptVisitor;
        node.accept(self);
    }

    fn visit_type(&mut self, node: &ast::Type) {
        self.kinds.push(node.kind());
        use sylva_syntax::ast::AcceptVisitor;
        node.accept(self);
    }

    fn visit_constraint_item(&mut self, node: &ast::ConstraintItem) {
        self.kinds.push(node.kind());
        use sylva_syntax::ast::AcceptVisitor;
        node.accept(self);
    }
}
