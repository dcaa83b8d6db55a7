// Copyright (c) 2016-2021 Fabian Schuiki

//! A SystemVerilog front end: lexer, preprocessor, parser, and expression
//! binder.

// Re-export everything from the common crate.
pub extern crate sylva_common as common;
pub use crate::common::*;

// Pull in the subcrates.
pub extern crate sylva_binder as binder;
pub extern crate sylva_syntax as syntax;
