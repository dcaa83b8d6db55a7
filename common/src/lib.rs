// Copyright (c) 2016-2021 Fabian Schuiki

//! This crate contains the fundamental utilities used by the rest of the
//! sylva front end: source management, name interning, diagnostics, and
//! arena allocation.

#[macro_use]
extern crate bitflags;

pub mod arenas;
pub mod errors;
pub mod name;
pub mod source;
pub mod util;

use crate::errors::{DiagBuilder2, DiagEmitter, Severity};
use std::cell::Cell;

/// A compilation session.
///
/// Carries the options all pipeline stages consult, and tracks whether any
/// error diagnostic has been produced.
pub struct Session {
    pub opts: SessionOptions,
    /// Whether any error diagnostics were produced.
    pub failed: Cell<bool>,
}

impl Session {
    /// Create a new session with default options.
    pub fn new() -> Session {
        Session {
            opts: Default::default(),
            failed: Cell::new(false),
        }
    }
}

impl Default for Session {
    fn default() -> Session {
        Session::new()
    }
}

impl DiagEmitter for Session {
    fn emit(&self, diag: DiagBuilder2) {
        if diag.get_severity() >= Severity::Error {
            self.failed.set(true);
        }
        eprintln!("{}", diag);
    }
}

/// A set of options for a session.
///
/// The arguments passed on the command line are intended to modify these
/// values in order to configure the execution of the program.
#[derive(Debug, Default)]
pub struct SessionOptions {
    /// Reset the `default_nettype` directive state when an include file is
    /// popped, rather than letting the included file's setting leak into the
    /// including file.
    pub scoped_default_nettype: bool,
    /// The verbosity options.
    pub verbosity: Verbosity,
}

bitflags! {
    /// A set of verbosity options for a session.
    ///
    /// These flags control how much information the front end emits.
    #[derive(Default)]
    pub struct Verbosity: u8 {
        const TOKENS     = 0b0001;
        const DIRECTIVES = 0b0010;
        const EXPANSIONS = 0b0100;
        const NAMES      = 0b1000;
    }
}
