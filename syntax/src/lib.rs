// Copyright (c) 2016-2021 Fabian Schuiki

//! This crate implements lexing, preprocessing, and parsing of SystemVerilog
//! source files into an abstract syntax tree, based on IEEE 1800-2009.

#[macro_use]
extern crate log;

pub mod ast;
pub mod cat;
pub mod lexer;
pub mod number;
pub mod parser;
pub mod preproc;
pub mod token;
pub mod trivia;
