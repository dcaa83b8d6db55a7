// Copyright (c) 2016-2021 Fabian Schuiki

//! A preprocessor for SystemVerilog files that takes the categorized token
//! stream and performs include and macro resolution, conditional
//! compilation, and the remaining compiler directives of IEEE 1800-2009
//! section 22.
//!
//! The preprocessor sits between the categorizer and the lexer: its output
//! is again a stream of categorized tokens, so macro expansion never takes a
//! detour through an intermediate character form. Processed directives and
//! conditionally skipped regions are forwarded as dedicated tokens which the
//! lexer attaches to the next real token as trivia.

use crate::cat::*;
use crate::number::{TimeScale, TimeScaleValue};
use crate::token::TimeUnit;
use sylva_common::errors::*;
use sylva_common::name::*;
use sylva_common::source::*;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

/// The directives the preprocessor recognizes after a backtick.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DirectiveKind {
    Include,
    Define,
    Undef,
    Undefineall,
    Ifdef,
    Ifndef,
    Elsif,
    Else,
    Endif,
    Timescale,
    DefaultNettype,
    Line,
    Resetall,
    Celldefine,
    Endcelldefine,
    Pragma,
    BeginKeywords,
    EndKeywords,
    /// The use site of a user-defined macro.
    MacroUsage,
    /// A directive the preprocessor does not know. Diagnosed and skipped.
    Unknown,
}

/// Look up a directive name, without the leading backtick.
pub fn find_directive(name: &str) -> Option<DirectiveKind> {
    Some(match name {
        "include" => DirectiveKind::Include,
        "define" => DirectiveKind::Define,
        "undef" => DirectiveKind::Undef,
        "undefineall" => DirectiveKind::Undefineall,
        "ifdef" => DirectiveKind::Ifdef,
        "ifndef" => DirectiveKind::Ifndef,
        "elsif" => DirectiveKind::Elsif,
        "else" => DirectiveKind::Else,
        "endif" => DirectiveKind::Endif,
        "timescale" => DirectiveKind::Timescale,
        "default_nettype" => DirectiveKind::DefaultNettype,
        "line" => DirectiveKind::Line,
        "resetall" => DirectiveKind::Resetall,
        "celldefine" => DirectiveKind::Celldefine,
        "endcelldefine" => DirectiveKind::Endcelldefine,
        "pragma" => DirectiveKind::Pragma,
        "begin_keywords" => DirectiveKind::BeginKeywords,
        "end_keywords" => DirectiveKind::EndKeywords,
        _ => return None,
    })
}

/// A macro definition in the macro table.
#[derive(Clone, Debug)]
struct Macro {
    name: Name,
    span: Span,
    /// Whether the macro was defined with a parenthesized parameter list.
    /// Such macros must be invoked with arguments; others must not.
    function_like: bool,
    args: Vec<MacroArg>,
    body: Vec<CatToken>,
}

/// A formal parameter of a macro, with an optional default.
#[derive(Clone, Debug)]
struct MacroArg {
    name: Name,
    span: Span,
    default: Option<Vec<CatToken>>,
}

/// The state of one conditional-inclusion frame.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum CondState {
    /// Tokens pass through; a taken branch is being emitted.
    Active,
    /// Tokens are skipped, but a later `else`/`elsif` may still take.
    InactiveCanFlip,
    /// Tokens are skipped and no later branch may take, either because a
    /// branch was already taken or because an enclosing frame is inactive.
    InactiveDone,
}

/// One entry of the conditional-inclusion stack.
#[derive(Clone, Copy, Debug)]
struct CondFrame {
    state: CondState,
    else_seen: bool,
    span: Span,
}

/// One entry of the include stack.
struct Stream {
    cat: Cat,
    saved_nettype: Option<Spanned<Name>>,
}

/// A line override established by a `` `line `` directive.
#[derive(Clone, Debug)]
pub struct LineDirective {
    pub line: usize,
    pub filename: Name,
    pub level: u8,
    pub span: Span,
}

/// The preprocessor for SystemVerilog files.
pub struct Preprocessor<'a> {
    /// The include stack; the file currently being read is last.
    stack: Vec<Stream>,
    /// Raw tokens pushed back by lookahead.
    raw_buffer: VecDeque<CatToken>,
    /// Expanded tokens waiting to be emitted.
    buffer: VecDeque<CatToken>,
    /// The macro table.
    macro_defs: HashMap<Name, Macro>,
    /// The conditional-inclusion stack.
    cond_stack: Vec<CondFrame>,
    /// Directories searched for include files, after the directory of the
    /// including file itself.
    include_paths: &'a [&'a Path],
    /// Whether `default_nettype` resets when an include file is popped.
    scoped_default_nettype: bool,
    /// The recorded `` `timescale `` setting.
    timescale: Option<TimeScale>,
    /// The recorded `` `default_nettype `` setting.
    default_nettype: Option<Spanned<Name>>,
    /// The recorded `` `line `` override.
    line_directive: Option<LineDirective>,
    /// Whether we are between `` `celldefine `` and `` `endcelldefine ``.
    celldefine: bool,
    /// The `` `begin_keywords `` version stack.
    keyword_stack: Vec<Spanned<Name>>,
    /// Set once the final EOF has been reached.
    done: bool,
}

impl<'a> Preprocessor<'a> {
    /// Create a new preprocessor over a source file. The `defines` are
    /// pre-defined object-like macros, given as (name, body-text) pairs.
    pub fn new(
        source: Source,
        include_paths: &'a [&'a Path],
        defines: &'a [(&'a str, &'a str)],
    ) -> Preprocessor<'a> {
        let nt = get_name_table();
        let mut macro_defs = HashMap::new();
        for &(name, value) in defines {
            let name = nt.intern(name, true);
            let body = if value.is_empty() {
                Vec::new()
            } else {
                let sm = get_source_manager();
                let src = sm.add_anonymous(value.to_string());
                Cat::new(src).collect()
            };
            macro_defs.insert(
                name,
                Macro {
                    name: name,
                    span: INVALID_SPAN,
                    function_like: false,
                    args: Vec::new(),
                    body: body,
                },
            );
        }
        Preprocessor {
            stack: vec![Stream {
                cat: Cat::new(source),
                saved_nettype: None,
            }],
            raw_buffer: VecDeque::new(),
            buffer: VecDeque::new(),
            macro_defs: macro_defs,
            cond_stack: Vec::new(),
            include_paths: include_paths,
            scoped_default_nettype: false,
            timescale: None,
            default_nettype: None,
            line_directive: None,
            celldefine: false,
            keyword_stack: Vec::new(),
            done: false,
        }
    }

    /// Configure whether `default_nettype` is restored when an include file
    /// is popped.
    pub fn set_scoped_default_nettype(&mut self, scoped: bool) {
        self.scoped_default_nettype = scoped;
    }

    /// Whether a macro with the given name is currently defined.
    pub fn is_defined(&self, name: Name) -> bool {
        self.macro_defs.contains_key(&name)
    }

    /// The recorded `` `timescale `` setting, if any was seen.
    pub fn timescale(&self) -> Option<TimeScale> {
        self.timescale
    }

    /// The recorded `` `default_nettype `` setting, if any was seen.
    pub fn default_nettype(&self) -> Option<Spanned<Name>> {
        self.default_nettype
    }

    /// The recorded `` `line `` override, if any was seen.
    pub fn line_directive(&self) -> Option<&LineDirective> {
        self.line_directive.as_ref()
    }

    /// Whether the current position is between `` `celldefine `` and
    /// `` `endcelldefine ``.
    pub fn in_celldefine(&self) -> bool {
        self.celldefine
    }

    /// Pull the next token from the raw stream, popping the include stack at
    /// file boundaries.
    fn raw_next(&mut self) -> Option<CatToken> {
        if let Some(tkn) = self.raw_buffer.pop_front() {
            return Some(tkn);
        }
        loop {
            match self.stack.last_mut() {
                Some(stream) => match stream.cat.next() {
                    Some(tkn) => return Some(tkn),
                    None => {
                        let popped = self.stack.pop().unwrap();
                        if self.scoped_default_nettype && !self.stack.is_empty() {
                            self.default_nettype = popped.saved_nettype;
                        }
                    }
                },
                None => return None,
            }
        }
    }

    /// Push a raw token back for later consumption.
    fn raw_undo(&mut self, tkn: CatToken) {
        self.raw_buffer.push_front(tkn);
    }

    /// Skip whitespace on the current line, without crossing a newline.
    /// Returns the first non-whitespace token, which the caller must process
    /// or push back.
    fn raw_skip_inline_space(&mut self) -> Option<CatToken> {
        loop {
            match self.raw_next() {
                Some((Whitespace, _)) | Some((LineComment, _)) | Some((BlockComment, _)) => (),
                other => return other,
            }
        }
    }

    /// Accumulate a full identifier from the raw stream, starting with the
    /// given token. Identifiers may span several categorized tokens
    /// (letters, digits, underscores, dollar signs), which count as one name
    /// as long as they are byte-adjacent.
    fn raw_match_ident(&mut self, first: CatToken) -> Option<(Name, Span)> {
        match first.0 {
            Text | Digits | Symbol('_') | Symbol('$') => (),
            _ => {
                self.raw_undo(first);
                return None;
            }
        }
        let mut span = first.1;
        let mut s = span.extract();
        loop {
            match self.raw_next() {
                Some((kind, sp))
                    if sp.begin == span.end
                        && match kind {
                            Text | Digits | Symbol('_') | Symbol('$') => true,
                            _ => false,
                        } =>
                {
                    s.push_str(&sp.extract());
                    span.expand(sp);
                }
                Some(other) => {
                    self.raw_undo(other);
                    break;
                }
                None => break,
            }
        }
        Some((get_name_table().intern(&s, true), span))
    }

    /// Whether all conditional frames are currently active.
    fn all_active(&self) -> bool {
        self.cond_stack.iter().all(|f| f.state == CondState::Active)
    }

    /// Handle a backtick from the raw stream. Queues any resulting tokens
    /// into the emission buffer.
    fn handle_backtick(&mut self, backtick_sp: Span) -> DiagResult2<()> {
        let first = match self.raw_next() {
            Some(tkn) => tkn,
            None => {
                return Err(
                    DiagBuilder2::error("expected directive name after `").span(backtick_sp)
                );
            }
        };
        let (name, name_sp) = match self.raw_match_ident(first) {
            Some(x) => x,
            None => {
                return Err(
                    DiagBuilder2::error("expected directive name after `").span(backtick_sp)
                );
            }
        };
        let mut span = Span::union(backtick_sp, name_sp);
        let name_str = name.as_str();
        trace!("handling directive `{}`", name_str);

        match find_directive(&name_str) {
            Some(DirectiveKind::Include) => self.handle_include(span),
            Some(DirectiveKind::Define) => self.handle_define(span),
            Some(DirectiveKind::Undef) => {
                let arg = self.raw_skip_inline_space();
                match arg.and_then(|t| self.raw_match_ident(t)) {
                    Some((undef_name, undef_sp)) => {
                        span.expand(undef_sp);
                        if self.macro_defs.remove(&undef_name).is_none() {
                            return Err(DiagBuilder2::warning(format!(
                                "macro `{}` is not defined",
                                undef_name
                            ))
                            .span(undef_sp));
                        }
                        self.emit_directive(DirectiveKind::Undef, span);
                        Ok(())
                    }
                    None => Err(DiagBuilder2::error("expected macro name after `undef").span(span)),
                }
            }
            Some(DirectiveKind::Undefineall) => {
                self.macro_defs.clear();
                self.emit_directive(DirectiveKind::Undefineall, span);
                Ok(())
            }
            Some(kind @ DirectiveKind::Ifdef) | Some(kind @ DirectiveKind::Ifndef) => {
                let arg = self.raw_skip_inline_space();
                let (cond_name, cond_sp) = match arg.and_then(|t| self.raw_match_ident(t)) {
                    Some(x) => x,
                    None => {
                        return Err(DiagBuilder2::error(format!(
                            "expected macro name after `{}",
                            name_str
                        ))
                        .span(span));
                    }
                };
                span.expand(cond_sp);
                let defined = self.is_defined(cond_name);
                let taken = defined == (kind == DirectiveKind::Ifdef);
                let state = if !self.all_active() {
                    CondState::InactiveDone
                } else if taken {
                    CondState::Active
                } else {
                    CondState::InactiveCanFlip
                };
                self.cond_stack.push(CondFrame {
                    state: state,
                    else_seen: false,
                    span: span,
                });
                self.emit_directive(kind, span);
                if state != CondState::Active {
                    self.skip_disabled()?;
                }
                Ok(())
            }
            Some(DirectiveKind::Elsif) => {
                let arg = self.raw_skip_inline_space();
                let (cond_name, cond_sp) = match arg.and_then(|t| self.raw_match_ident(t)) {
                    Some(x) => x,
                    None => {
                        return Err(DiagBuilder2::error("expected macro name after `elsif")
                            .span(span));
                    }
                };
                span.expand(cond_sp);
                let defined = self.is_defined(cond_name);
                let active = self.apply_elsif(defined, span)?;
                self.emit_directive(DirectiveKind::Elsif, span);
                if !active {
                    self.skip_disabled()?;
                }
                Ok(())
            }
            Some(DirectiveKind::Else) => {
                let active = self.apply_else(span)?;
                self.emit_directive(DirectiveKind::Else, span);
                if !active {
                    self.skip_disabled()?;
                }
                Ok(())
            }
            Some(DirectiveKind::Endif) => {
                if self.cond_stack.pop().is_none() {
                    return Err(
                        DiagBuilder2::error("`endif without matching `ifdef or `ifndef")
                            .span(span),
                    );
                }
                self.emit_directive(DirectiveKind::Endif, span);
                Ok(())
            }
            Some(DirectiveKind::Timescale) => self.handle_timescale(span),
            Some(DirectiveKind::DefaultNettype) => {
                let arg = self.raw_skip_inline_space();
                match arg.and_then(|t| self.raw_match_ident(t)) {
                    Some((nt_name, nt_sp)) => {
                        span.expand(nt_sp);
                        match &*nt_name.as_str() {
                            "wire" | "tri" | "tri0" | "tri1" | "wand" | "triand" | "wor"
                            | "trior" | "trireg" | "uwire" | "none" => {
                                self.default_nettype = Some(Spanned::new(nt_name, nt_sp));
                                self.emit_directive(DirectiveKind::DefaultNettype, span);
                                Ok(())
                            }
                            other => Err(DiagBuilder2::error(format!(
                                "`{}` is not a valid default net type",
                                other
                            ))
                            .span(nt_sp)),
                        }
                    }
                    None => Err(
                        DiagBuilder2::error("expected net type after `default_nettype").span(span)
                    ),
                }
            }
            Some(DirectiveKind::Line) => self.handle_line(span),
            Some(DirectiveKind::Resetall) => {
                self.default_nettype = None;
                self.timescale = None;
                self.line_directive = None;
                self.celldefine = false;
                self.emit_directive(DirectiveKind::Resetall, span);
                Ok(())
            }
            Some(DirectiveKind::Celldefine) => {
                self.celldefine = true;
                self.emit_directive(DirectiveKind::Celldefine, span);
                Ok(())
            }
            Some(DirectiveKind::Endcelldefine) => {
                self.celldefine = false;
                self.emit_directive(DirectiveKind::Endcelldefine, span);
                Ok(())
            }
            Some(DirectiveKind::Pragma) => {
                let end = self.skip_to_eol(&mut span);
                self.emit_directive(DirectiveKind::Pragma, span);
                if let Some(newline) = end {
                    self.buffer.push_back(newline);
                }
                Ok(())
            }
            Some(DirectiveKind::BeginKeywords) => {
                match self.parse_string_argument(&mut span) {
                    Some(version) => {
                        let known = match &*version.value.as_str() {
                            "1800-2009" | "1800-2005" | "1800-2012" | "1364-2005"
                            | "1364-2001" | "1364-1995" => true,
                            _ => false,
                        };
                        self.keyword_stack.push(version);
                        self.emit_directive(DirectiveKind::BeginKeywords, span);
                        if !known {
                            return Err(DiagBuilder2::warning(format!(
                                "unknown keyword version `{}`",
                                version.value
                            ))
                            .span(version.span));
                        }
                        Ok(())
                    }
                    None => Err(DiagBuilder2::error(
                        "expected version string after `begin_keywords",
                    )
                    .span(span)),
                }
            }
            Some(DirectiveKind::EndKeywords) => {
                if self.keyword_stack.pop().is_none() {
                    return Err(DiagBuilder2::error(
                        "`end_keywords without matching `begin_keywords",
                    )
                    .span(span));
                }
                self.emit_directive(DirectiveKind::EndKeywords, span);
                Ok(())
            }
            Some(DirectiveKind::MacroUsage) | Some(DirectiveKind::Unknown) => unreachable!(),
            None => {
                if self.macro_defs.contains_key(&name) {
                    self.handle_macro_usage(name, span)
                } else {
                    self.emit_directive(DirectiveKind::Unknown, span);
                    Err(DiagBuilder2::error(format!(
                        "unknown compiler directive or macro `{}`",
                        name
                    ))
                    .span(span))
                }
            }
        }
    }

    fn emit_directive(&mut self, kind: DirectiveKind, span: Span) {
        self.buffer.push_back((CatTokenKind::Directive(kind), span));
    }

    /// Consume raw tokens up to, but excluding, the next newline. Expands
    /// `span` to cover the consumed tokens and returns the newline, if any.
    fn skip_to_eol(&mut self, span: &mut Span) -> Option<CatToken> {
        loop {
            match self.raw_next() {
                Some(tkn @ (Newline, _)) => return Some(tkn),
                Some((_, sp)) => {
                    span.expand(sp);
                }
                None => return None,
            }
        }
    }

    /// Parse a `"..."` argument on the directive line, e.g. for
    /// `` `begin_keywords `` and `` `line ``.
    fn parse_string_argument(&mut self, span: &mut Span) -> Option<Spanned<Name>> {
        match self.raw_skip_inline_space() {
            Some((Symbol('"'), open_sp)) => {
                let mut str_span = open_sp;
                let mut s = String::new();
                loop {
                    match self.raw_next() {
                        Some((Symbol('"'), close_sp)) => {
                            str_span.expand(close_sp);
                            span.expand(str_span);
                            return Some(Spanned::new(
                                get_name_table().intern(&s, true),
                                str_span,
                            ));
                        }
                        Some((Newline, sp)) | Some((Eof, sp)) => {
                            str_span.expand(sp);
                            span.expand(str_span);
                            return None;
                        }
                        Some((_, sp)) => {
                            s.push_str(&sp.extract());
                            str_span.expand(sp);
                        }
                        None => return None,
                    }
                }
            }
            Some(other) => {
                self.raw_undo(other);
                None
            }
            None => None,
        }
    }

    /// Handle the `` `include `` directive.
    fn handle_include(&mut self, mut span: Span) -> DiagResult2<()> {
        // Parse the file name, in either the `"..."` or `<...>` form.
        let (filename, file_sp, system) = match self.raw_skip_inline_space() {
            Some((Symbol('"'), open_sp)) => {
                self.raw_undo((Symbol('"'), open_sp));
                match self.parse_string_argument(&mut span) {
                    Some(f) => (f.value, f.span, false),
                    None => {
                        return Err(
                            DiagBuilder2::error("malformed `include file name").span(span)
                        );
                    }
                }
            }
            Some((Symbol('<'), open_sp)) => {
                let mut file_sp = open_sp;
                let mut s = String::new();
                loop {
                    match self.raw_next() {
                        Some((Symbol('>'), close_sp)) => {
                            file_sp.expand(close_sp);
                            break;
                        }
                        Some((Newline, _)) | None => {
                            return Err(DiagBuilder2::error("unterminated `include file name")
                                .span(file_sp));
                        }
                        Some((_, sp)) => {
                            s.push_str(&sp.extract());
                            file_sp.expand(sp);
                        }
                    }
                }
                span.expand(file_sp);
                (get_name_table().intern(&s, true), file_sp, true)
            }
            Some((kind, sp)) => {
                self.raw_undo((kind, sp));
                return Err(DiagBuilder2::error("expected file name after `include").span(span));
            }
            None => {
                return Err(DiagBuilder2::error("expected file name after `include").span(span));
            }
        };

        // Resolve the file against the including file's directory and the
        // search paths. System includes (`<...>`) skip the local directory.
        let sm = get_source_manager();
        let filename_str = filename.as_str();
        let local_dir: Option<PathBuf> = self
            .stack
            .last()
            .and_then(|s| Path::new(&*s.cat.source().get_path()).parent().map(|p| p.to_path_buf()));
        let mut dirs: Vec<&Path> = Vec::new();
        if !system {
            if let Some(ref d) = local_dir {
                dirs.push(d);
            }
        }
        dirs.extend(self.include_paths.iter().cloned());
        let source = match sm.resolve(&filename_str, &dirs) {
            Some(s) => s,
            None => {
                self.emit_directive(DirectiveKind::Include, span);
                return Err(DiagBuilder2::error(format!(
                    "include file `{}` not found",
                    filename_str
                ))
                .span(file_sp));
            }
        };

        // Refuse to include a file that is already open further down the
        // stack, which would recurse forever.
        if self.stack.iter().any(|s| s.cat.source() == source) {
            self.emit_directive(DirectiveKind::Include, span);
            return Err(DiagBuilder2::error(format!(
                "recursive include of `{}`",
                filename_str
            ))
            .span(file_sp));
        }

        self.emit_directive(DirectiveKind::Include, span);
        self.stack.push(Stream {
            cat: Cat::new(source),
            saved_nettype: self.default_nettype,
        });
        Ok(())
    }

    /// Handle the `` `define `` directive.
    fn handle_define(&mut self, mut span: Span) -> DiagResult2<()> {
        let first = self.raw_skip_inline_space();
        let (name, name_sp) = match first.and_then(|t| self.raw_match_ident(t)) {
            Some(x) => x,
            None => {
                return Err(DiagBuilder2::error("expected macro name after `define").span(span));
            }
        };
        span.expand(name_sp);

        // A parameter list only exists if the opening parenthesis directly
        // follows the macro name, without intervening whitespace.
        let mut args = Vec::new();
        let mut function_like = false;
        match self.raw_next() {
            Some((Symbol('('), open_sp)) if open_sp.begin == name_sp.end => {
                function_like = true;
                loop {
                    let tkn = match self.raw_skip_inline_space() {
                        Some(t) => t,
                        None => {
                            return Err(DiagBuilder2::error(
                                "unterminated macro parameter list",
                            )
                            .span(span));
                        }
                    };
                    match tkn.0 {
                        Symbol(')') => {
                            span.expand(tkn.1);
                            break;
                        }
                        Symbol(',') => continue,
                        _ => {
                            let (arg_name, arg_sp) = match self.raw_match_ident(tkn) {
                                Some(x) => x,
                                None => {
                                    return Err(DiagBuilder2::error(
                                        "expected macro parameter name",
                                    )
                                    .span(span));
                                }
                            };
                            // An optional default follows after `=`, up to
                            // the next top-level comma or closing paren.
                            let mut default = None;
                            match self.raw_skip_inline_space() {
                                Some((Symbol('='), _)) => {
                                    let mut tokens = Vec::new();
                                    let mut depth = 0;
                                    loop {
                                        match self.raw_next() {
                                            Some((Symbol('('), sp)) => {
                                                depth += 1;
                                                tokens.push((Symbol('('), sp));
                                            }
                                            Some((Symbol(')'), sp)) if depth == 0 => {
                                                self.raw_undo((Symbol(')'), sp));
                                                break;
                                            }
                                            Some((Symbol(')'), sp)) => {
                                                depth -= 1;
                                                tokens.push((Symbol(')'), sp));
                                            }
                                            Some((Symbol(','), sp)) if depth == 0 => {
                                                self.raw_undo((Symbol(','), sp));
                                                break;
                                            }
                                            Some(t) => tokens.push(t),
                                            None => break,
                                        }
                                    }
                                    default = Some(trim_whitespace(tokens));
                                }
                                Some(other) => self.raw_undo(other),
                                None => (),
                            }
                            args.push(MacroArg {
                                name: arg_name,
                                span: arg_sp,
                                default: default,
                            });
                        }
                    }
                }
            }
            Some(other) => self.raw_undo(other),
            None => (),
        }

        // The body extends to the end of the line, with backslash-newline
        // continuations joining lines.
        let mut body = Vec::new();
        loop {
            match self.raw_next() {
                Some((Newline, sp)) => {
                    // The newline terminates the directive but stays part of
                    // the output stream.
                    self.raw_undo((Newline, sp));
                    break;
                }
                Some((Symbol('\\'), bs_sp)) => match self.raw_next() {
                    Some((Newline, nl_sp)) => {
                        span.expand(bs_sp);
                        span.expand(nl_sp);
                        body.push((Whitespace, nl_sp));
                    }
                    Some(other) => {
                        span.expand(bs_sp);
                        body.push((Symbol('\\'), bs_sp));
                        self.raw_undo(other);
                    }
                    None => break,
                },
                Some((kind, sp)) => {
                    span.expand(sp);
                    body.push((kind, sp));
                }
                None => break,
            }
        }
        let body = trim_whitespace(body);

        let prev = self.macro_defs.insert(
            name,
            Macro {
                name: name,
                span: span,
                function_like: function_like,
                args: args,
                body: body,
            },
        );
        self.emit_directive(DirectiveKind::Define, span);
        if let Some(prev) = prev {
            if prev.span != INVALID_SPAN {
                return Err(DiagBuilder2::warning(format!("macro `{}` redefined", name))
                    .span(span)
                    .segment(DiagSegment::Span(prev.span)));
            }
        }
        Ok(())
    }

    /// Handle the `` `timescale `` directive.
    fn handle_timescale(&mut self, mut span: Span) -> DiagResult2<()> {
        let base = self.parse_time_scale_value(&mut span)?;
        match self.raw_skip_inline_space() {
            Some((Symbol('/'), sp)) => {
                span.expand(sp);
            }
            Some(other) => {
                self.raw_undo(other);
                self.emit_directive(DirectiveKind::Timescale, span);
                return Err(
                    DiagBuilder2::error("expected `/` between time unit and precision").span(span)
                );
            }
            None => {
                self.emit_directive(DirectiveKind::Timescale, span);
                return Err(DiagBuilder2::error("unterminated `timescale directive").span(span));
            }
        }
        let precision = self.parse_time_scale_value(&mut span)?;
        self.timescale = Some(TimeScale {
            base: base,
            precision: precision,
        });
        self.emit_directive(DirectiveKind::Timescale, span);
        Ok(())
    }

    /// Parse one half of a `` `timescale `` directive: a magnitude of 1, 10,
    /// or 100, followed by a time unit.
    fn parse_time_scale_value(&mut self, span: &mut Span) -> DiagResult2<TimeScaleValue> {
        let (mag, mag_sp) = match self.raw_skip_inline_space() {
            Some((Digits, sp)) => (sp.extract(), sp),
            Some((kind, sp)) => {
                self.raw_undo((kind, sp));
                return Err(DiagBuilder2::error("expected time magnitude").span(*span));
            }
            None => return Err(DiagBuilder2::error("expected time magnitude").span(*span)),
        };
        span.expand(mag_sp);
        let (unit, unit_sp) = match self.raw_skip_inline_space() {
            Some((Text, sp)) => match TimeUnit::from_suffix(&sp.extract()) {
                Some(u) => (u, sp),
                None => {
                    return Err(DiagBuilder2::error(format!(
                        "`{}` is not a valid time unit",
                        sp.extract()
                    ))
                    .span(sp));
                }
            },
            Some((kind, sp)) => {
                self.raw_undo((kind, sp));
                return Err(DiagBuilder2::error("expected time unit").span(mag_sp));
            }
            None => return Err(DiagBuilder2::error("expected time unit").span(mag_sp)),
        };
        span.expand(unit_sp);
        match TimeScaleValue::from_literal(&mag, unit) {
            Some(v) => Ok(v),
            None => Err(DiagBuilder2::error(format!(
                "time scale magnitude must be 1, 10, or 100; got {}",
                mag
            ))
            .span(mag_sp)),
        }
    }

    /// Handle the `` `line `` directive.
    fn handle_line(&mut self, mut span: Span) -> DiagResult2<()> {
        let line = match self.raw_skip_inline_space() {
            Some((Digits, sp)) => {
                span.expand(sp);
                sp.extract().parse::<usize>().unwrap_or(0)
            }
            Some(other) => {
                self.raw_undo(other);
                return Err(DiagBuilder2::error("expected line number after `line").span(span));
            }
            None => {
                return Err(DiagBuilder2::error("expected line number after `line").span(span));
            }
        };
        let filename = match self.parse_string_argument(&mut span) {
            Some(f) => f,
            None => {
                return Err(DiagBuilder2::error("expected file name in `line directive").span(span));
            }
        };
        let level = match self.raw_skip_inline_space() {
            Some((Digits, sp)) => {
                span.expand(sp);
                sp.extract().parse::<u8>().unwrap_or(0)
            }
            Some(other) => {
                self.raw_undo(other);
                return Err(DiagBuilder2::error("expected level in `line directive").span(span));
            }
            None => {
                return Err(DiagBuilder2::error("expected level in `line directive").span(span));
            }
        };
        if level > 2 {
            return Err(
                DiagBuilder2::error("`line level must be 0, 1, or 2").span(span)
            );
        }
        self.line_directive = Some(LineDirective {
            line: line,
            filename: filename.value,
            level: level,
            span: span,
        });
        self.emit_directive(DirectiveKind::Line, span);
        Ok(())
    }

    /// Flip the top conditional frame for an `` `else `` directive. Returns
    /// whether the frame is active afterwards.
    fn apply_else(&mut self, span: Span) -> DiagResult2<bool> {
        let all_outer_active = self
            .cond_stack
            .iter()
            .rev()
            .skip(1)
            .all(|f| f.state == CondState::Active);
        match self.cond_stack.last_mut() {
            Some(frame) => {
                if frame.else_seen {
                    return Err(DiagBuilder2::error("`else after earlier `else").span(span));
                }
                frame.else_seen = true;
                frame.state = match frame.state {
                    CondState::InactiveCanFlip if all_outer_active => CondState::Active,
                    CondState::Active => CondState::InactiveDone,
                    s => s,
                };
                Ok(frame.state == CondState::Active)
            }
            None => Err(DiagBuilder2::error("`else without matching `ifdef or `ifndef").span(span)),
        }
    }

    /// Flip the top conditional frame for an `` `elsif `` directive. Returns
    /// whether the frame is active afterwards.
    fn apply_elsif(&mut self, defined: bool, span: Span) -> DiagResult2<bool> {
        let all_outer_active = self
            .cond_stack
            .iter()
            .rev()
            .skip(1)
            .all(|f| f.state == CondState::Active);
        match self.cond_stack.last_mut() {
            Some(frame) => {
                if frame.else_seen {
                    return Err(DiagBuilder2::error("`elsif after `else").span(span));
                }
                frame.state = match frame.state {
                    CondState::InactiveCanFlip if all_outer_active && defined => CondState::Active,
                    CondState::Active => CondState::InactiveDone,
                    s => s,
                };
                Ok(frame.state == CondState::Active)
            }
            None => {
                Err(DiagBuilder2::error("`elsif without matching `ifdef or `ifndef").span(span))
            }
        }
    }

    /// Consume and collect raw tokens while the top conditional frame is
    /// inactive, up to and including the directive that reactivates the
    /// stream or closes the frame. The skipped region is emitted as a
    /// `Disabled` token so the lexer can preserve it as disabled-text
    /// trivia.
    fn skip_disabled(&mut self) -> DiagResult2<()> {
        let mut depth = 0usize;
        let mut region: Option<Span> = None;
        loop {
            let (kind, sp) = match self.raw_next() {
                Some(t) => t,
                None => {
                    // Unterminated frames are reported when the final EOF is
                    // handled; just stop skipping here.
                    self.flush_disabled(region);
                    return Ok(());
                }
            };
            if kind != Symbol('`') {
                expand_region(&mut region, sp);
                continue;
            }

            // Resolve the directive name to decide whether this affects the
            // conditional stack. Anything else is part of the skipped text.
            let first = match self.raw_next() {
                Some(t) => t,
                None => {
                    expand_region(&mut region, sp);
                    self.flush_disabled(region);
                    return Ok(());
                }
            };
            let (name, name_sp) = match self.raw_match_ident(first) {
                Some(x) => x,
                None => {
                    expand_region(&mut region, sp);
                    continue;
                }
            };
            let mut dir_span = Span::union(sp, name_sp);
            match find_directive(&name.as_str()) {
                Some(DirectiveKind::Ifdef) | Some(DirectiveKind::Ifndef) => {
                    depth += 1;
                    expand_region(&mut region, dir_span);
                }
                Some(DirectiveKind::Endif) => {
                    if depth > 0 {
                        depth -= 1;
                        expand_region(&mut region, dir_span);
                    } else {
                        self.flush_disabled(region);
                        if self.cond_stack.pop().is_none() {
                            return Err(DiagBuilder2::error(
                                "`endif without matching `ifdef or `ifndef",
                            )
                            .span(dir_span));
                        }
                        self.emit_directive(DirectiveKind::Endif, dir_span);
                        return Ok(());
                    }
                }
                Some(DirectiveKind::Else) if depth == 0 => {
                    self.flush_disabled(region);
                    let active = self.apply_else(dir_span)?;
                    self.emit_directive(DirectiveKind::Else, dir_span);
                    if active {
                        return Ok(());
                    }
                    region = None;
                }
                Some(DirectiveKind::Elsif) if depth == 0 => {
                    let arg = self.raw_skip_inline_space();
                    let (cond_name, cond_sp) = match arg.and_then(|t| self.raw_match_ident(t)) {
                        Some(x) => x,
                        None => {
                            return Err(DiagBuilder2::error("expected macro name after `elsif")
                                .span(dir_span));
                        }
                    };
                    dir_span.expand(cond_sp);
                    self.flush_disabled(region);
                    let defined = self.is_defined(cond_name);
                    let active = self.apply_elsif(defined, dir_span)?;
                    self.emit_directive(DirectiveKind::Elsif, dir_span);
                    if active {
                        return Ok(());
                    }
                    region = None;
                }
                _ => {
                    expand_region(&mut region, dir_span);
                }
            }
        }
    }

    /// Emit the span of a skipped region as a `Disabled` token, if there is
    /// one.
    fn flush_disabled(&mut self, region: Option<Span>) {
        if let Some(sp) = region {
            self.buffer.push_back((CatTokenKind::Disabled, sp));
        }
    }

    /// Handle the use of a user-defined macro at the top level of the input.
    fn handle_macro_usage(&mut self, name: Name, mut span: Span) -> DiagResult2<()> {
        let mac = self.macro_defs[&name].clone();

        // For function-like macros, parse the parenthesized argument list
        // from the raw stream. Object-like macros take no arguments.
        let actuals = if mac.function_like {
            match self.raw_skip_inline_space() {
                Some((Symbol('('), open_sp)) => {
                    span.expand(open_sp);
                    let (args, close_sp) = self.parse_macro_actuals()?;
                    span.expand(close_sp);
                    Some(args)
                }
                Some(other) => {
                    self.raw_undo(other);
                    self.emit_directive(DirectiveKind::MacroUsage, span);
                    return Err(DiagBuilder2::error(format!(
                        "macro `{}` takes arguments and must be called with `()`",
                        name
                    ))
                    .span(span));
                }
                None => {
                    self.emit_directive(DirectiveKind::MacroUsage, span);
                    return Err(DiagBuilder2::error(format!(
                        "macro `{}` takes arguments and must be called with `()`",
                        name
                    ))
                    .span(span));
                }
            }
        } else {
            None
        };

        // Bind the actuals to the formals, falling back to defaults.
        let mut bindings: HashMap<Name, Vec<CatToken>> = HashMap::new();
        if let Some(actuals) = actuals {
            if actuals.len() > mac.args.len() {
                self.emit_directive(DirectiveKind::MacroUsage, span);
                return Err(DiagBuilder2::error(format!(
                    "macro `{}` takes {} arguments, but {} were given",
                    name,
                    mac.args.len(),
                    actuals.len()
                ))
                .span(span));
            }
            for (i, formal) in mac.args.iter().enumerate() {
                let actual = actuals.get(i).filter(|a| !a.is_empty()).cloned();
                match actual.or_else(|| formal.default.clone()) {
                    Some(tokens) => {
                        bindings.insert(formal.name, tokens);
                    }
                    None => {
                        self.emit_directive(DirectiveKind::MacroUsage, span);
                        return Err(DiagBuilder2::error(format!(
                            "no value for macro argument `{}`",
                            formal.name
                        ))
                        .span(span));
                    }
                }
            }
        } else if mac.function_like {
            unreachable!();
        }

        // Expand the body and queue the result.
        self.emit_directive(DirectiveKind::MacroUsage, span);
        let mut active = vec![name];
        let mut out = Vec::new();
        self.expand_tokens(&mac.body, &bindings, &mut active, &mut out, span)?;
        for tkn in out {
            self.buffer.push_back(tkn);
        }
        Ok(())
    }

    /// Parse the actual arguments of a function-like macro call. The opening
    /// parenthesis has already been consumed. Returns the arguments and the
    /// span of the closing parenthesis.
    fn parse_macro_actuals(&mut self) -> DiagResult2<(Vec<Vec<CatToken>>, Span)> {
        let mut args = Vec::new();
        let mut current = Vec::new();
        let mut depth = 0usize;
        loop {
            match self.raw_next() {
                Some((Symbol(')'), sp)) if depth == 0 => {
                    if !current.is_empty() || !args.is_empty() {
                        args.push(trim_whitespace(current));
                    }
                    return Ok((args, sp));
                }
                Some((Symbol(','), _)) if depth == 0 => {
                    args.push(trim_whitespace(std::mem::replace(&mut current, Vec::new())));
                }
                Some(tkn @ (Symbol('('), _)) | Some(tkn @ (Symbol('['), _))
                | Some(tkn @ (Symbol('{'), _)) => {
                    depth += 1;
                    current.push(tkn);
                }
                Some(tkn @ (Symbol(')'), _)) | Some(tkn @ (Symbol(']'), _))
                | Some(tkn @ (Symbol('}'), _)) => {
                    depth = depth.saturating_sub(1);
                    current.push(tkn);
                }
                Some(tkn) => current.push(tkn),
                None => {
                    return Err(DiagBuilder2::error("unterminated macro argument list")
                        .span(current.last().map(|t| t.1).unwrap_or(INVALID_SPAN)));
                }
            }
        }
    }

    /// Expand a token list, substituting macro parameters, processing token
    /// pasting and stringification, and recursively expanding nested macro
    /// uses. `active` is the stack of macros currently being expanded, which
    /// implements the recursion guard: a name already on the stack is
    /// emitted verbatim.
    fn expand_tokens(
        &mut self,
        body: &[CatToken],
        bindings: &HashMap<Name, Vec<CatToken>>,
        active: &mut Vec<Name>,
        out: &mut Vec<CatToken>,
        use_site: Span,
    ) -> DiagResult2<()> {
        let mut work: VecDeque<CatToken> = body.iter().cloned().collect();
        while let Some((kind, sp)) = work.pop_front() {
            match kind {
                // Identifiers may be macro parameters. Accumulate the full
                // byte-adjacent identifier first, so a parameter `a` does
                // not fire inside an identifier `a1`.
                Text | Digits | Symbol('_') | Symbol('$') => {
                    let mut segments = vec![(kind, sp)];
                    let mut full_span = sp;
                    let mut s = sp.extract();
                    while let Some(&(nkind, nsp)) = work.front() {
                        let is_ident_part = match nkind {
                            Text | Digits | Symbol('_') | Symbol('$') => true,
                            _ => false,
                        };
                        if is_ident_part && nsp.begin == full_span.end {
                            s.push_str(&nsp.extract());
                            full_span.expand(nsp);
                            segments.push(work.pop_front().unwrap());
                        } else {
                            break;
                        }
                    }
                    let ident = get_name_table().intern(&s, true);
                    match bindings.get(&ident) {
                        Some(actual) => {
                            // Substitute the full actual; it is walked too,
                            // so nested macro uses inside arguments expand.
                            for tkn in actual.iter().rev() {
                                work.push_front(tkn.clone());
                            }
                        }
                        None => out.extend(segments),
                    }
                }

                Symbol('`') => match work.pop_front() {
                    // `` — token pasting: drop the marker. Nothing separates
                    // the neighboring fragments in the output, so the lexer
                    // accumulates them into a single token.
                    Some((Symbol('`'), _)) => (),

                    // `" — stringification marker: re-emit as a plain
                    // double quote so the collected tokens form a string
                    // literal in the lexer.
                    Some((Symbol('"'), qsp)) => out.push((Symbol('"'), qsp)),

                    // `\`" — an escaped quote inside a stringified body.
                    Some((Symbol('\\'), bsp)) => out.push((Symbol('\\'), bsp)),

                    // A nested macro use or parameter-less directive.
                    Some(first) => {
                        let (nested, nested_sp) = match self.raw_ident_from_work(
                            first,
                            &mut work,
                        ) {
                            Some(x) => x,
                            None => {
                                out.push((Symbol('`'), sp));
                                continue;
                            }
                        };
                        if active.contains(&nested) {
                            // Recursive self-reference: emit the name
                            // verbatim, exactly once.
                            out.push((Text, nested_sp));
                            continue;
                        }
                        let mac = match self.macro_defs.get(&nested) {
                            Some(m) => m.clone(),
                            None => {
                                // Not a macro; reproduce the tokens and let
                                // the lexer complain if need be.
                                out.push((Symbol('`'), sp));
                                out.push((Text, nested_sp));
                                continue;
                            }
                        };
                        let mut nested_bindings = HashMap::new();
                        if mac.function_like {
                            let actuals = parse_actuals_from_work(&mut work);
                            match actuals {
                                Some(actuals) if actuals.len() <= mac.args.len() => {
                                    for (i, formal) in mac.args.iter().enumerate() {
                                        let actual =
                                            actuals.get(i).filter(|a| !a.is_empty()).cloned();
                                        match actual.or_else(|| formal.default.clone()) {
                                            Some(tokens) => {
                                                nested_bindings.insert(formal.name, tokens);
                                            }
                                            None => {
                                                return Err(DiagBuilder2::error(format!(
                                                    "no value for macro argument `{}`",
                                                    formal.name
                                                ))
                                                .span(nested_sp)
                                                .add_note("in this macro expansion")
                                                .segment(DiagSegment::Span(use_site)));
                                            }
                                        }
                                    }
                                }
                                _ => {
                                    return Err(DiagBuilder2::error(format!(
                                        "macro `{}` takes {} arguments",
                                        nested,
                                        mac.args.len()
                                    ))
                                    .span(nested_sp)
                                    .segment(DiagSegment::Span(use_site)));
                                }
                            }
                        }
                        active.push(nested);
                        // Substitute the current bindings into the nested
                        // call's arguments first.
                        let mut resolved = HashMap::new();
                        for (k, v) in nested_bindings {
                            let mut rv = Vec::new();
                            self.expand_tokens(&v, bindings, active, &mut rv, use_site)?;
                            resolved.insert(k, rv);
                        }
                        self.expand_tokens(&mac.body, &resolved, active, out, use_site)?;
                        active.pop();
                    }
                    None => out.push((Symbol('`'), sp)),
                },

                _ => out.push((kind, sp)),
            }
        }
        Ok(())
    }

    /// Accumulate a byte-adjacent identifier from the expansion worklist.
    fn raw_ident_from_work(
        &mut self,
        first: CatToken,
        work: &mut VecDeque<CatToken>,
    ) -> Option<(Name, Span)> {
        match first.0 {
            Text | Digits | Symbol('_') | Symbol('$') => (),
            _ => {
                work.push_front(first);
                return None;
            }
        }
        let mut span = first.1;
        let mut s = span.extract();
        while let Some(&(nkind, nsp)) = work.front() {
            let is_ident_part = match nkind {
                Text | Digits | Symbol('_') | Symbol('$') => true,
                _ => false,
            };
            if is_ident_part && nsp.begin == span.end {
                s.push_str(&nsp.extract());
                span.expand(nsp);
                work.pop_front();
            } else {
                break;
            }
        }
        Some((get_name_table().intern(&s, true), span))
    }

    /// Final end of input: report unterminated conditional frames once.
    fn finish(&mut self) -> Option<DiagResult2<CatToken>> {
        if self.done {
            return None;
        }
        self.done = true;
        if let Some(frame) = self.cond_stack.first().cloned() {
            let count = self.cond_stack.len();
            self.cond_stack.clear();
            let mut diag = DiagBuilder2::error("unterminated `ifdef at end of input")
                .span(frame.span);
            if count > 1 {
                diag = diag.add_note(format!("{} conditional frames were left open", count));
            }
            return Some(Err(diag));
        }
        None
    }
}

/// Parse the actual arguments of a nested macro call from the expansion
/// worklist. The tokens up to the balanced closing parenthesis are consumed.
fn parse_actuals_from_work(work: &mut VecDeque<CatToken>) -> Option<Vec<Vec<CatToken>>> {
    // Skip whitespace before the opening parenthesis.
    loop {
        match work.front() {
            Some(&(Whitespace, _)) | Some(&(Newline, _)) => {
                work.pop_front();
            }
            Some(&(Symbol('('), _)) => {
                work.pop_front();
                break;
            }
            _ => return None,
        }
    }
    let mut args = Vec::new();
    let mut current = Vec::new();
    let mut depth = 0usize;
    while let Some(tkn) = work.pop_front() {
        match tkn {
            (Symbol(')'), _) if depth == 0 => {
                if !current.is_empty() || !args.is_empty() {
                    args.push(trim_whitespace(current));
                }
                return Some(args);
            }
            (Symbol(','), _) if depth == 0 => {
                args.push(trim_whitespace(std::mem::replace(&mut current, Vec::new())));
            }
            (Symbol('('), _) | (Symbol('['), _) | (Symbol('{'), _) => {
                depth += 1;
                current.push(tkn);
            }
            (Symbol(')'), _) | (Symbol(']'), _) | (Symbol('}'), _) => {
                depth = depth.saturating_sub(1);
                current.push(tkn);
            }
            _ => current.push(tkn),
        }
    }
    None
}

/// Strip leading and trailing whitespace tokens from a token list.
fn trim_whitespace(mut tokens: Vec<CatToken>) -> Vec<CatToken> {
    let is_space = |t: &CatToken| match t.0 {
        Whitespace | Newline => true,
        _ => false,
    };
    while tokens.first().map(|t| is_space(t)).unwrap_or(false) {
        tokens.remove(0);
    }
    while tokens.last().map(|t| is_space(t)).unwrap_or(false) {
        tokens.pop();
    }
    tokens
}

fn expand_region(region: &mut Option<Span>, sp: Span) {
    match region {
        Some(r) if r.source == sp.source => {
            r.expand(sp);
        }
        Some(_) => (),
        None => *region = Some(sp),
    }
}

impl<'a> Iterator for Preprocessor<'a> {
    type Item = DiagResult2<CatToken>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(tkn) = self.buffer.pop_front() {
                return Some(Ok(tkn));
            }
            let (kind, sp) = match self.raw_next() {
                Some(t) => t,
                None => return self.finish(),
            };
            match kind {
                Symbol('`') => match self.handle_backtick(sp) {
                    Ok(()) => continue,
                    Err(e) => return Some(Err(e)),
                },
                _ => return Some(Ok((kind, sp))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn preproc(input: &str) -> Preprocessor<'static> {
        thread_local!(static INDEX: Cell<usize> = Cell::new(0));
        let sm = get_source_manager();
        let idx = INDEX.with(|i| {
            let v = i.get();
            i.set(v + 1);
            v
        });
        let source = sm.add(&format!("preproc_{}.sv", idx), input);
        Preprocessor::new(source, &[], &[])
    }

    /// Collect the significant output text, skipping whitespace, directive,
    /// and disabled tokens.
    fn significant(input: &str) -> String {
        preproc(input)
            .filter_map(|t| t.ok())
            .filter(|&(kind, _)| match kind {
                Whitespace | Newline | LineComment | BlockComment => false,
                CatTokenKind::Directive(_) | Disabled => false,
                _ => true,
            })
            .map(|(_, sp)| sp.extract())
            .collect()
    }

    /// Collect all output text, including directives and disabled regions.
    fn all_text(input: &str) -> String {
        preproc(input)
            .filter_map(|t| t.ok())
            .map(|(_, sp)| sp.extract())
            .collect()
    }

    #[test]
    fn no_directives() {
        assert_eq!(significant("a + b;"), "a+b;");
    }

    #[test]
    fn object_macro() {
        assert_eq!(significant("`define X 42\nX X `X+1\n"), "XX42+1");
    }

    #[test]
    fn function_macro() {
        assert_eq!(
            significant("`define ADD(a, b) ((a)+(b))\n`ADD(1, 2)\n"),
            "((1)+(2))"
        );
    }

    #[test]
    fn macro_default_argument() {
        assert_eq!(
            significant("`define INC(x, by = 1) x + by\n`INC(q)\n"),
            "q+1"
        );
    }

    #[test]
    fn nested_macro() {
        assert_eq!(
            significant("`define A 1\n`define B `A + 2\n`B\n"),
            "1+2"
        );
    }

    #[test]
    fn recursive_macro_emits_name_once() {
        // A self-referential macro must not recurse; the inner name is
        // emitted verbatim.
        assert_eq!(significant("`define M M + `M\n`M\n"), "M+M");
    }

    #[test]
    fn token_pasting_is_adjacent() {
        let out: Vec<_> = preproc("`define CAT(a, b) a``b\n`CAT(foo, bar)\n")
            .filter_map(|t| t.ok())
            .filter(|&(kind, _)| match kind {
                Text => true,
                _ => false,
            })
            .collect();
        // Both fragments survive with no separating token between them,
        // which makes the lexer join them into one identifier.
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].1.extract(), "foo");
        assert_eq!(out[1].1.extract(), "bar");
    }

    #[test]
    fn conditional_taken_and_skipped() {
        assert_eq!(
            significant("`define FOO\n`ifdef FOO\nx = 1;\n`else\ny = 2;\n`endif\n"),
            "x=1;"
        );
        assert_eq!(
            significant("`ifdef FOO\nx = 1;\n`else\ny = 2;\n`endif\n"),
            "y=2;"
        );
    }

    #[test]
    fn conditional_elsif() {
        assert_eq!(
            significant("`define B\n`ifdef A\na;\n`elsif B\nb;\n`else\nc;\n`endif\n"),
            "b;"
        );
    }

    #[test]
    fn nested_conditionals_in_skipped_region() {
        assert_eq!(
            significant("`ifdef A\n`ifdef B\nx;\n`endif\ny;\n`else\nz;\n`endif\n"),
            "z;"
        );
    }

    #[test]
    fn ifndef_takes_when_undefined() {
        assert_eq!(significant("`ifndef FOO\nx;\n`endif\n"), "x;");
    }

    #[test]
    fn disabled_region_is_preserved() {
        let tokens: Vec<_> = preproc("`ifdef FOO\nskip me\n`endif\nok\n")
            .filter_map(|t| t.ok())
            .collect();
        let disabled: Vec<_> = tokens
            .iter()
            .filter(|&&(kind, _)| kind == Disabled)
            .collect();
        assert_eq!(disabled.len(), 1);
        assert_eq!(disabled[0].1.extract(), "skip me\n");
    }

    #[test]
    fn unbalanced_endif_is_diagnosed() {
        let errors: Vec<_> = preproc("`endif\n").filter_map(|t| t.err()).collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].get_message().contains("without matching"));
    }

    #[test]
    fn unterminated_ifdef_is_diagnosed() {
        let errors: Vec<_> = preproc("`ifdef FOO\nx;\n").filter_map(|t| t.err()).collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].get_message().contains("unterminated"));
    }

    #[test]
    fn timescale_is_recorded() {
        let mut pp = preproc("`timescale 1ns / 10ps\nx\n");
        while let Some(_) = pp.next() {}
        let ts = pp.timescale().expect("timescale not recorded");
        assert_eq!(ts.to_string(), "1ns / 10ps");
    }

    #[test]
    fn timescale_rejects_bad_magnitude() {
        let errors: Vec<_> = preproc("`timescale 42ns / 10ps\n")
            .filter_map(|t| t.err())
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].get_message().contains("1, 10, or 100"));
    }

    #[test]
    fn default_nettype_is_recorded() {
        let mut pp = preproc("`default_nettype none\nx\n");
        while let Some(_) = pp.next() {}
        assert_eq!(&*pp.default_nettype().unwrap().value.as_str(), "none");
    }

    #[test]
    fn unknown_directive_is_diagnosed() {
        let errors: Vec<_> = preproc("`gibberish\nx\n").filter_map(|t| t.err()).collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].get_message().contains("unknown"));
    }

    #[test]
    fn output_covers_input() {
        // Directive and disabled tokens carry the text that the significant
        // tokens do not, keeping the stream lossless.
        let input = "`define X 1\n`ifdef X\na;\n`else\nb;\n`endif\n";
        assert_eq!(all_text(input), input);
    }

    #[test]
    fn arity_mismatch_is_diagnosed() {
        let errors: Vec<_> = preproc("`define F(a, b) a+b\n`F(1, 2, 3)\n")
            .filter_map(|t| t.err())
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].get_message().contains("arguments"));
    }

    #[test]
    fn object_macro_called_without_args() {
        // An object-like macro followed by parentheses leaves the
        // parentheses alone.
        assert_eq!(significant("`define X 5\n`X(3)\n"), "5(3)");
    }
}
