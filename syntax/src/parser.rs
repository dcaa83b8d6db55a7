// Copyright (c) 2016-2021 Fabian Schuiki

//! A parser for the SystemVerilog language. Based on IEEE 1800-2009.
//!
//! The parser is a hand-written recursive descent over the preprocessed
//! token stream, with a Pratt loop driving expression parsing. Ambiguous
//! productions are decided either by speculative scanners over the peek
//! buffer, which never consume tokens, or by running the candidate
//! productions on a branch parser and committing the one that succeeds.

use crate::ast::{self, *};
use crate::lexer::{Lexer, TokenAndSpan};
use crate::token::*;
use sylva_common::errors::*;
use sylva_common::name::*;
use sylva_common::source::*;
use sylva_common::util::HasSpan;
use std::collections::VecDeque;

// The problem with data_declaration and data_type_or_implicit:
//
//     [7:0] foo;            # implicit "[7:0]", var "foo"
//     foo bar;              # explicit "foo", var "bar"
//     foo [7:0];            # implicit, var "foo[7:0]"
//     foo [7:0] bar [7:0];  # explicit "foo[7:0]", var "bar[7:0]"

/// Return type of the lower parse primitives, allowing for further
/// adjustment of the diagnostic message that would be generated.
type ParseResult<T> = Result<T, DiagBuilder2>;

/// Return type of functions that emit diagnostic messages and only need to
/// communicate success to the parent.
type ReportedResult<T> = Result<T, ()>;

/// An abstraction around concrete parsers, such that speculative branch
/// parsers can run the same productions as the main parser.
trait AbstractParser {
    fn peek(&mut self, offset: usize) -> TokenAndSpan;
    fn bump(&mut self);
    fn skip(&mut self);
    fn consumed(&self) -> usize;
    fn last_span(&self) -> Span;
    fn add_diag(&mut self, diag: DiagBuilder2);
    fn severity(&self) -> Severity;
    fn note_missing(&mut self, token: FullToken);

    fn try_eat_ident(&mut self) -> Option<(Name, Span)> {
        match self.peek(0) {
            (Ident(name), span) | (EscIdent(name), span) => {
                self.bump();
                Some((name, span))
            }
            _ => None,
        }
    }

    fn eat_ident(&mut self, msg: &str) -> ReportedResult<(Name, Span)> {
        match self.peek(0) {
            (Ident(name), span) | (EscIdent(name), span) => {
                self.bump();
                Ok((name, span))
            }
            (tkn, span) => {
                self.add_diag(
                    DiagBuilder2::error(format!("expected {} before `{}`", msg, tkn)).span(span),
                );
                Err(())
            }
        }
    }

    fn is_ident(&mut self) -> bool {
        match self.peek(0).0 {
            Ident(_) | EscIdent(_) => true,
            _ => false,
        }
    }

    fn require(&mut self, expect: Token) -> ParseResult<()> {
        match self.peek(0) {
            (actual, _) if actual == expect => {
                self.bump();
                Ok(())
            }
            (wrong, span) => Err(DiagBuilder2::error(format!(
                "expected `{}`, but found `{}` instead",
                expect, wrong
            ))
            .span(span)),
        }
    }

    fn require_reported(&mut self, expect: Token) -> ReportedResult<()> {
        match self.require(expect) {
            Ok(x) => Ok(x),
            Err(e) => {
                self.add_diag(e);
                Err(())
            }
        }
    }

    /// Consume the expected token, or report it and synthesize a missing
    /// token in its place. Used where the follow set is unambiguous, e.g.
    /// for statement semicolons, so that one missing token does not abort
    /// the production.
    fn eat_or_synthesize(&mut self, expect: Token) {
        match self.require(expect) {
            Ok(()) => (),
            Err(e) => {
                self.add_diag(e);
                let sp = self.peek(0).1;
                self.note_missing(FullToken::missing(expect, sp));
            }
        }
    }

    fn try_eat(&mut self, expect: Token) -> bool {
        match self.peek(0) {
            (actual, _) if actual == expect => {
                self.bump();
                true
            }
            _ => false,
        }
    }

    /// Skip tokens until one of the terminators appears at the current
    /// nesting depth, keeping delimiters balanced along the way.
    fn recover_balanced(&mut self, terminators: &[Token], eat_terminator: bool) {
        let mut stack = Vec::new();
        loop {
            let (tkn, sp) = self.peek(0);
            if stack.is_empty() {
                for t in terminators {
                    if *t == tkn {
                        if eat_terminator {
                            self.skip();
                        }
                        return;
                    }
                }
            }

            match tkn {
                OpenDelim(x) => stack.push(x),
                CloseDelim(x) => {
                    if let Some(open) = stack.pop() {
                        if open != x {
                            self.add_diag(DiagBuilder2::fatal(format!(
                                "found closing `{}` which is not the complement to the previous \
                                 opening `{}`",
                                CloseDelim(x),
                                OpenDelim(open)
                            ))
                            .span(sp));
                            break;
                        }
                    } else {
                        self.add_diag(
                            DiagBuilder2::fatal(format!(
                                "found closing `{}` without an earlier opening `{}`",
                                CloseDelim(x),
                                OpenDelim(x)
                            ))
                            .span(sp),
                        );
                        break;
                    }
                }
                Eof => break,
                _ => (),
            }
            self.skip();
        }
    }

    fn is_fatal(&self) -> bool {
        self.severity() >= Severity::Fatal
    }

    fn is_error(&self) -> bool {
        self.severity() >= Severity::Error
    }

    fn anticipate(&mut self, tokens: &[Token]) -> ReportedResult<()> {
        let (tkn, sp) = self.peek(0);
        for t in tokens {
            if *t == tkn {
                return Ok(());
            }
        }
        self.add_diag(
            DiagBuilder2::error(format!("expected {:?}, but found {:?} instead", tokens, tkn))
                .span(sp),
        );
        Err(())
    }
}

/// The concrete parser over a lexer. Holds the token queue that backs the
/// peek buffer, and forwards diagnostics to the sink it was created with.
struct Parser<'a, 'e> {
    input: Lexer<'a>,
    emitter: &'e dyn DiagEmitter,
    queue: VecDeque<FullToken>,
    /// Tokens synthesized during recovery. They carry no text and stand in
    /// for expected-but-absent tokens.
    synthesized: Vec<FullToken>,
    last_span: Span,
    severity: Severity,
    consumed: usize,
}

impl<'a, 'e> AbstractParser for Parser<'a, 'e> {
    fn peek(&mut self, offset: usize) -> TokenAndSpan {
        self.ensure_queue_filled(offset);
        let tkn = if offset < self.queue.len() {
            &self.queue[offset]
        } else {
            self.queue
                .back()
                .expect("at least an Eof token should be in the queue")
        };
        (tkn.kind, tkn.span)
    }

    fn bump(&mut self) {
        if self.queue.is_empty() {
            self.ensure_queue_filled(1);
        }
        if let Some(tkn) = self.queue.pop_front() {
            self.last_span = tkn.span;
            self.consumed += 1;
        }
    }

    fn skip(&mut self) {
        self.bump()
    }

    fn consumed(&self) -> usize {
        self.consumed
    }

    fn last_span(&self) -> Span {
        self.last_span
    }

    fn add_diag(&mut self, diag: DiagBuilder2) {
        if diag.get_severity() >= Severity::Error {
            trace!(
                "diagnostic triggered here:\n{:?}",
                backtrace::Backtrace::new()
            );
        }

        // Keep track of the worst severity encountered, such that parsing
        // can be aborted accordingly.
        if diag.get_severity() > self.severity {
            self.severity = diag.get_severity();
        }
        self.emitter.emit(diag);
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn note_missing(&mut self, token: FullToken) {
        self.synthesized.push(token);
    }
}

impl<'a, 'e> Parser<'a, 'e> {
    fn new(input: Lexer<'a>, emitter: &'e dyn DiagEmitter) -> Parser<'a, 'e> {
        Parser {
            input: input,
            emitter: emitter,
            queue: VecDeque::new(),
            synthesized: Vec::new(),
            last_span: INVALID_SPAN,
            severity: Severity::Note,
            consumed: 0,
        }
    }

    fn ensure_queue_filled(&mut self, min_tokens: usize) {
        if let Some(tkn) = self.queue.back() {
            if tkn.kind == Eof {
                return;
            }
        }
        while self.queue.len() <= min_tokens {
            match self.input.next_token() {
                Ok(tkn) => {
                    let done = tkn.kind == Eof;
                    self.queue.push_back(tkn);
                    for diag in self.input.take_diagnostics() {
                        self.add_diag(diag);
                    }
                    if done {
                        break;
                    }
                }
                Err(e) => self.add_diag(e),
            }
        }
    }
}

/// Parses the opening delimiter, calls the `inner` function, and parses the
/// closing delimiter. Properly recovers to and including the closing
/// delimiter if the `inner` function throws an error.
fn flanked<R, F>(p: &mut dyn AbstractParser, delim: DelimToken, mut inner: F) -> ReportedResult<R>
where
    F: FnMut(&mut dyn AbstractParser) -> ReportedResult<R>,
{
    p.require_reported(OpenDelim(delim))?;
    match inner(p) {
        Ok(r) => match p.require_reported(CloseDelim(delim)) {
            Ok(_) => Ok(r),
            Err(e) => {
                p.recover_balanced(&[CloseDelim(delim)], true);
                Err(e)
            }
        },
        Err(e) => {
            p.recover_balanced(&[CloseDelim(delim)], true);
            Err(e)
        }
    }
}

/// If the opening delimiter is present, consumes it, calls the `inner`
/// function, and parses the closing delimiter. Otherwise returns `None`.
fn try_flanked<R, F>(
    p: &mut dyn AbstractParser,
    delim: DelimToken,
    inner: F,
) -> ReportedResult<Option<R>>
where
    F: FnMut(&mut dyn AbstractParser) -> ReportedResult<R>,
{
    if p.peek(0).0 == OpenDelim(delim) {
        flanked(p, delim, inner).map(|r| Some(r))
    } else {
        Ok(None)
    }
}

/// Parse a comma-separated list of items, until a terminator token has been
/// reached. The terminator is not consumed.
fn comma_list<R, F, T>(
    p: &mut dyn AbstractParser,
    mut term: T,
    msg: &str,
    mut item: F,
) -> ReportedResult<Vec<R>>
where
    F: FnMut(&mut dyn AbstractParser) -> ReportedResult<R>,
    T: Predicate,
{
    let mut v = Vec::new();
    while !p.is_fatal() && p.peek(0).0 != Eof && !term.matches(p) {
        // Parse the item.
        match item(p) {
            Ok(x) => v.push(x),
            Err(e) => {
                term.recover(p, false);
                return Err(e);
            }
        }

        // Try to match the terminator. If it does not, consume a comma and
        // catch the case where the comma is immediately followed by the
        // terminator (superfluous trailing comma).
        if term.matches(p) {
            break;
        } else if p.try_eat(Comma) {
            if term.matches(p) {
                let q = p.last_span();
                p.add_diag(DiagBuilder2::warning("superfluous trailing comma").span(q));
                break;
            }
        } else {
            let sp = p.peek(0).1;
            p.add_diag(
                DiagBuilder2::error(format!("expected , or {} after {}", term.describe(), msg))
                    .span(sp),
            );
            term.recover(p, false);
            return Err(());
        }
    }
    Ok(v)
}

/// Same as `comma_list`, but at least one item is required.
fn comma_list_nonempty<R, F, T>(
    p: &mut dyn AbstractParser,
    term: T,
    msg: &str,
    item: F,
) -> ReportedResult<Vec<R>>
where
    F: FnMut(&mut dyn AbstractParser) -> ReportedResult<R>,
    T: Predicate,
{
    let q = p.peek(0).1;
    let v = comma_list(p, term, msg, item)?;
    if v.is_empty() {
        p.add_diag(DiagBuilder2::error(format!("expected at least one {}", msg)).span(q));
        Err(())
    } else {
        Ok(v)
    }
}

fn repeat_until<R, F>(p: &mut dyn AbstractParser, term: Token, mut item: F) -> ReportedResult<Vec<R>>
where
    F: FnMut(&mut dyn AbstractParser) -> ReportedResult<R>,
{
    let mut v = Vec::new();
    while p.peek(0).0 != term && p.peek(0).0 != Eof && !p.is_fatal() {
        match item(p) {
            Ok(x) => v.push(x),
            Err(_) => {
                p.recover_balanced(&[term], false);
                break;
            }
        }
    }
    Ok(v)
}

fn recovered<R, F>(p: &mut dyn AbstractParser, term: Token, mut item: F) -> ReportedResult<R>
where
    F: FnMut(&mut dyn AbstractParser) -> ReportedResult<R>,
{
    match item(p) {
        Ok(x) => Ok(x),
        Err(e) => {
            p.recover_balanced(&[term], false);
            Err(e)
        }
    }
}

/// Speculatively apply a parse function. If it fails, the parser `p` is left
/// untouched. If it succeeds, `p` is in the same state as if `parse` was
/// called on it directly.
fn speculate<R, F>(p: &mut dyn AbstractParser, mut parse: F) -> Option<R>
where
    F: FnMut(&mut dyn AbstractParser) -> ReportedResult<R>,
{
    let mut bp = BranchParser::new(p);
    match parse(&mut bp) {
        Ok(r) => {
            bp.commit();
            Some(r)
        }
        Err(_) => None,
    }
}

/// Consumes an `Ident` or `EscIdent` token, wrapping it in an
/// `ast::Identifier`.
fn parse_identifier<M: std::fmt::Display>(
    p: &mut dyn AbstractParser,
    msg: M,
) -> ReportedResult<ast::Identifier> {
    parse_identifier_name(p, msg).map(|n| ast::Identifier {
        span: n.span,
        name: n.value,
    })
}

/// Consumes an `Ident` or `EscIdent` token, wrapping it in a
/// `Spanned<Name>`.
fn parse_identifier_name<M: std::fmt::Display>(
    p: &mut dyn AbstractParser,
    msg: M,
) -> ReportedResult<Spanned<Name>> {
    let (tkn, span) = p.peek(0);
    match tkn {
        Ident(n) | EscIdent(n) => {
            p.bump();
            Ok(Spanned::new(n, span))
        }
        x => {
            p.add_diag(
                DiagBuilder2::error(format!("expected {}, but found `{}` instead", msg, x))
                    .span(span),
            );
            Err(())
        }
    }
}

fn try_identifier(p: &mut dyn AbstractParser) -> Option<ast::Identifier> {
    let (tkn, span) = p.peek(0);
    match tkn {
        Ident(n) | EscIdent(n) => {
            p.bump();
            Some(ast::Identifier {
                span: span,
                name: n,
            })
        }
        _ => None,
    }
}

trait Predicate {
    fn matches(&mut self, _: &mut dyn AbstractParser) -> bool;
    fn recover(&mut self, _: &mut dyn AbstractParser, consume: bool);
    fn describe(&self) -> String;
}

impl Predicate for Token {
    fn matches(&mut self, p: &mut dyn AbstractParser) -> bool {
        p.peek(0).0 == *self
    }

    fn recover(&mut self, p: &mut dyn AbstractParser, consume: bool) {
        p.recover_balanced(&[*self], consume)
    }

    fn describe(&self) -> String {
        self.as_str().into()
    }
}

/// A parser that speculatively runs a production over the peek buffer of an
/// underlying parser, without consuming any real tokens. This is the
/// virtual-cursor mechanism behind the disambiguation routines: `commit`
/// replays the consumed tokens onto the real stream, and dropping the branch
/// leaves the real stream untouched.
struct BranchParser<'tp> {
    parser: &'tp mut dyn AbstractParser,
    consumed: usize,
    skipped: usize,
    diagnostics: Vec<DiagBuilder2>,
    synthesized: Vec<FullToken>,
    last_span: Span,
    severity: Severity,
}

impl<'tp> BranchParser<'tp> {
    pub fn new(parser: &'tp mut dyn AbstractParser) -> BranchParser<'tp> {
        let last = parser.last_span();
        BranchParser {
            parser: parser,
            consumed: 0,
            skipped: 0,
            diagnostics: Vec::new(),
            synthesized: Vec::new(),
            last_span: last,
            severity: Severity::Note,
        }
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn commit(self) {
        for _ in 0..self.consumed {
            self.parser.bump();
        }
        for d in self.diagnostics {
            self.parser.add_diag(d);
        }
        for t in self.synthesized {
            self.parser.note_missing(t);
        }
    }
}

impl<'tp> AbstractParser for BranchParser<'tp> {
    fn peek(&mut self, offset: usize) -> TokenAndSpan {
        self.parser.peek(self.consumed + offset)
    }

    fn bump(&mut self) {
        self.last_span = self.parser.peek(self.consumed).1;
        self.consumed += 1;
    }

    fn skip(&mut self) {
        self.bump();
        self.skipped += 1;
    }

    fn consumed(&self) -> usize {
        self.consumed
    }

    fn last_span(&self) -> Span {
        self.last_span
    }

    fn add_diag(&mut self, diag: DiagBuilder2) {
        if diag.severity > self.severity {
            self.severity = diag.severity;
        }
        self.diagnostics.push(diag);
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn note_missing(&mut self, token: FullToken) {
        self.synthesized.push(token);
    }
}

/// A parser that tries several productions on the same input and commits
/// whichever succeeds. Greedy branches commit immediately upon success;
/// regular branches are compared and the parse is rejected as ambiguous if
/// more than one matches.
struct ParallelParser<'a, R: Clone> {
    branches: Vec<(
        String,
        Box<dyn FnMut(&mut dyn AbstractParser) -> ReportedResult<R> + 'a>,
        bool,
    )>,
}

impl<'a, R: Clone> ParallelParser<'a, R> {
    pub fn new() -> Self {
        ParallelParser {
            branches: Vec::new(),
        }
    }

    pub fn add<F>(&mut self, name: &str, func: F)
    where
        F: FnMut(&mut dyn AbstractParser) -> ReportedResult<R> + 'a,
    {
        self.branches.push((name.to_owned(), Box::new(func), false));
    }

    pub fn add_greedy<F>(&mut self, name: &str, func: F)
    where
        F: FnMut(&mut dyn AbstractParser) -> ReportedResult<R> + 'a,
    {
        self.branches.push((name.to_owned(), Box::new(func), true));
    }

    pub fn finish(self, p: &mut dyn AbstractParser, msg: &str) -> ReportedResult<R> {
        let (tkn, q) = p.peek(0);

        // Run each branch on a separate speculative parser.
        let mut results = Vec::new();
        let mut matched = Vec::new();
        for (name, mut func, greedy) in self.branches {
            let mut bp = BranchParser::new(p);
            match func(&mut bp) {
                Ok(x) => {
                    if greedy {
                        bp.commit();
                        return Ok(x);
                    } else {
                        let sp = bp.last_span();
                        results.push((
                            name,
                            bp.consumed,
                            bp.diagnostics,
                            bp.synthesized,
                            x,
                            Span::union(q, sp),
                        ));
                    }
                }
                Err(_) => matched.push((
                    name,
                    bp.consumed() - bp.skipped(),
                    bp.consumed(),
                    bp.diagnostics,
                )),
            }
        }

        if results.len() > 1 {
            let mut names = String::new();
            names.push_str(&results[0].0);
            if results.len() == 2 {
                names.push_str(" or ");
                names.push_str(&results[1].0);
            } else {
                for &(ref name, ..) in &results[1..results.len() - 1] {
                    names.push_str(", ");
                    names.push_str(name);
                }
                names.push_str(", or ");
                names.push_str(&results[results.len() - 1].0);
            }
            p.add_diag(DiagBuilder2::fatal(format!("ambiguous code, could be {}", names)).span(q));
            for &(ref name, .., span) in &results {
                p.add_diag(DiagBuilder2::note(format!("{} would be this part", name)).span(span));
            }
            Err(())
        } else if let Some((_, consumed, diagnostics, synthesized, res, _)) = results.pop() {
            for d in diagnostics {
                p.add_diag(d);
            }
            for t in synthesized {
                p.note_missing(t);
            }
            for _ in 0..consumed {
                p.bump();
            }
            Ok(res)
        } else {
            // Sort the failed branches by score and keep the highest scoring
            // ones for the report.
            matched.sort_by(|a, b| (b.1).cmp(&a.1));
            let highest_score = matched[0].1;
            let highest_consumed = matched[0].2;
            let errors = matched
                .into_iter()
                .take_while(|e| e.1 == highest_score)
                .collect::<Vec<_>>();
            let num_errors = errors.len();

            if num_errors != 1 {
                p.add_diag(
                    DiagBuilder2::error(format!("expected {}, found `{}` instead", msg, tkn))
                        .span(q),
                );
                for (name, _, _, ds) in errors {
                    p.add_diag(DiagBuilder2::note(format!("parsing as {}:", name)));
                    for d in ds {
                        p.add_diag(d);
                    }
                }
            } else {
                for d in errors.into_iter().next().unwrap().3 {
                    p.add_diag(d);
                }
            }
            for _ in 0..highest_consumed {
                p.bump();
            }
            Err(())
        }
    }
}

/// Parse a whole compilation unit. Always returns a root node, even when
/// diagnostics were emitted.
pub fn parse(input: Lexer, emitter: &dyn DiagEmitter) -> Root {
    let mut p = Parser::new(input, emitter);
    let root = parse_source_text(&mut p);
    if !p.synthesized.is_empty() {
        debug!(
            "{} missing tokens were synthesized during recovery",
            p.synthesized.len()
        );
    }
    root
}

/// Parse a single expression. Yields an error expression if the input does
/// not form one.
pub fn parse_expression(input: Lexer, emitter: &dyn DiagEmitter) -> Expr {
    let mut p = Parser::new(input, emitter);
    match parse_expr(&mut p) {
        Ok(x) => x,
        Err(()) => Expr::new_error(p.last_span()),
    }
}

/// Parse a single statement. Yields an error statement if the input does not
/// form one.
pub fn parse_statement(input: Lexer, emitter: &dyn DiagEmitter) -> Stmt {
    let mut p = Parser::new(input, emitter);
    match parse_stmt(&mut p) {
        Ok(x) => x,
        Err(()) => Stmt::new_error(p.last_span()),
    }
}

/// Parse a single module declaration. Yields a placeholder module if the
/// input does not form one.
pub fn parse_module(input: Lexer, emitter: &dyn DiagEmitter) -> ModDecl {
    let mut p = Parser::new(input, emitter);
    let span = p.peek(0).1;
    match parse_module_decl(&mut p) {
        Ok(x) => x,
        Err(()) => ModDecl {
            span: span,
            lifetime: Lifetime::Static,
            name: get_name_table().intern("<error>", true),
            name_span: span,
            imports: vec![],
            params: vec![],
            ports: vec![],
            items: vec![],
        },
    }
}

fn parse_source_text(p: &mut dyn AbstractParser) -> Root {
    let mut span = p.peek(0).1;
    let mut root = Root {
        span: span,
        timeunits: Timeunit {
            unit: None,
            prec: None,
        },
        items: Vec::new(),
    };

    // Parse the optional timeunits declaration.
    match parse_time_units(p) {
        Ok(x) => root.timeunits = x,
        Err(()) => (),
    }

    // Parse the descriptions in the source text. A production that fails
    // recovers internally, so the loop only has to guarantee progress.
    while !p.is_fatal() && p.peek(0).0 != Eof {
        let before = p.consumed();
        match parse_hierarchy_item(p) {
            Ok(item) => root.items.push(item),
            Err(()) => (),
        }
        if p.consumed() == before {
            p.skip();
        }
    }

    span.expand(p.last_span());
    root.span = span;
    root
}

fn parse_time_units(p: &mut dyn AbstractParser) -> ReportedResult<Timeunit> {
    let mut unit = None;
    let mut prec = None;
    while p.peek(0).0 == Keyword(Kw::Timeunit) || p.peek(0).0 == Keyword(Kw::Timeprecision) {
        recovered(p, Semicolon, |p| {
            if p.try_eat(Keyword(Kw::Timeunit)) {
                unit = Some(parse_time_literal(p)?);
                if p.try_eat(Operator(Op::Div)) {
                    prec = Some(parse_time_literal(p)?);
                }
            } else if p.try_eat(Keyword(Kw::Timeprecision)) {
                prec = Some(parse_time_literal(p)?);
            } else {
                unreachable!();
            }
            Ok(())
        })?;
        p.eat_or_synthesize(Semicolon);
    }

    Ok(Timeunit {
        unit: unit,
        prec: prec,
    })
}

fn parse_time_literal(p: &mut dyn AbstractParser) -> ReportedResult<Spanned<Lit>> {
    let (tkn, sp) = p.peek(0);
    match tkn {
        Literal(lit @ Time(..)) => {
            p.bump();
            Ok(Spanned::new(lit, sp))
        }
        _ => {
            p.add_diag(
                DiagBuilder2::error(format!("expected time literal, instead got `{}`", tkn))
                    .span(sp),
            );
            Err(())
        }
    }
}

/// Convert a token to the corresponding lifetime. Yields `None` if the token
/// does not correspond to a lifetime.
fn as_lifetime(tkn: Token) -> Option<Lifetime> {
    match tkn {
        Keyword(Kw::Static) => Some(Lifetime::Static),
        Keyword(Kw::Automatic) => Some(Lifetime::Automatic),
        _ => None,
    }
}

fn parse_module_decl(p: &mut dyn AbstractParser) -> ReportedResult<ModDecl> {
    let mut span = p.peek(0).1;
    if !p.try_eat(Keyword(Kw::Macromodule)) {
        p.require_reported(Keyword(Kw::Module))?;
    }
    let result = recovered(p, Keyword(Kw::Endmodule), |p| {
        // Eat the optional lifetime.
        let lifetime = match as_lifetime(p.peek(0).0) {
            Some(l) => {
                p.bump();
                l
            }
            None => Lifetime::Static,
        };

        // Eat the module name.
        let (name, name_sp) = p.eat_ident("module name")?;

        // Eat the package import declarations.
        let mut imports = Vec::new();
        while p.peek(0).0 == Keyword(Kw::Import) {
            imports.push(parse_import_decl(p)?);
        }

        // Eat the parameter port list.
        let params = if p.try_eat(Hashtag) {
            parse_parameter_port_list(p)?
        } else {
            Vec::new()
        };

        // Eat the optional list of ports.
        let ports = if p.try_eat(OpenDelim(Paren)) {
            parse_port_list(p)?
        } else {
            Vec::new()
        };
        p.eat_or_synthesize(Semicolon);

        // Eat the items in the module body.
        let items = parse_hierarchy_items(p, Kw::Endmodule);

        Ok((lifetime, name, name_sp, imports, params, ports, items))
    });
    p.require_reported(Keyword(Kw::Endmodule))?;
    parse_optional_end_label(p);
    span.expand(p.last_span());

    let (lifetime, name, name_sp, imports, params, ports, items) = result?;
    Ok(ModDecl {
        span: span,
        lifetime: lifetime,
        name: name,
        name_span: name_sp,
        imports: imports,
        params: params,
        ports: ports,
        items: items,
    })
}

fn parse_package_decl(p: &mut dyn AbstractParser) -> ReportedResult<PackageDecl> {
    let mut span = p.peek(0).1;
    p.require_reported(Keyword(Kw::Package))?;
    let result = recovered(p, Keyword(Kw::Endpackage), |p| {
        let lifetime = match as_lifetime(p.peek(0).0) {
            Some(l) => {
                p.bump();
                l
            }
            None => Lifetime::Static,
        };
        let (name, name_sp) = p.eat_ident("package name")?;
        p.eat_or_synthesize(Semicolon);
        let timeunits = parse_time_units(p)?;
        let items = parse_hierarchy_items(p, Kw::Endpackage);
        Ok((lifetime, name, name_sp, timeunits, items))
    });
    p.require_reported(Keyword(Kw::Endpackage))?;
    parse_optional_end_label(p);
    span.expand(p.last_span());

    let (lifetime, name, name_sp, timeunits, items) = result?;
    Ok(PackageDecl {
        span: span,
        lifetime: lifetime,
        name: name,
        name_span: name_sp,
        timeunits: timeunits,
        items: items,
    })
}

/// Parse the items of a hierarchy body up to the given terminating keyword.
/// Item productions recover internally; the loop merely guarantees progress.
fn parse_hierarchy_items(p: &mut dyn AbstractParser, term: Kw) -> Vec<Item> {
    let mut items = Vec::new();
    while !p.is_fatal() && p.peek(0).0 != Keyword(term) && p.peek(0).0 != Eof {
        let before = p.consumed();
        match parse_hierarchy_item(p) {
            Ok(item) => items.push(item),
            Err(()) => (),
        }
        if p.consumed() == before {
            p.skip();
        }
    }
    items
}

/// Consume an optional `: name` label after an `end...` keyword.
fn parse_optional_end_label(p: &mut dyn AbstractParser) {
    if p.try_eat(Colon) {
        if p.try_eat_ident().is_none() {
            let sp = p.peek(0).1;
            p.add_diag(DiagBuilder2::error("expected label after `:`").span(sp));
        }
    }
}

fn parse_hierarchy_item(p: &mut dyn AbstractParser) -> ReportedResult<Item> {
    // Consume an optional leading label.
    if p.is_ident() && p.peek(1).0 == Colon {
        p.bump();
        p.bump();
    }

    // First attempt the simple cases where a keyword reliably identifies the
    // following item.
    match p.peek(0).0 {
        Keyword(Kw::Module) | Keyword(Kw::Macromodule) => {
            return parse_module_decl(p).map(Item::ModuleDecl)
        }
        Keyword(Kw::Package) => return parse_package_decl(p).map(Item::PackageDecl),
        Keyword(Kw::Class) => return parse_class_decl(p).map(Item::ClassDecl),
        Keyword(Kw::Virtual) if p.peek(1).0 == Keyword(Kw::Class) => {
            return parse_class_decl(p).map(Item::ClassDecl)
        }

        Keyword(Kw::Localparam) | Keyword(Kw::Parameter) => {
            let decl = parse_param_decl(p)?;
            p.eat_or_synthesize(Semicolon);
            return Ok(Item::ParamDecl(decl));
        }
        Keyword(Kw::Typedef) => return parse_typedef(p).map(Item::Typedef),
        Keyword(Kw::Import) => return parse_import_decl(p).map(Item::ImportDecl),

        // Structured procedures as per IEEE 1800-2009 section 9.2
        Keyword(Kw::Initial) => {
            return parse_procedure(p, ProcedureKind::Initial).map(Item::Procedure)
        }
        Keyword(Kw::Always) => {
            return parse_procedure(p, ProcedureKind::Always).map(Item::Procedure)
        }
        Keyword(Kw::AlwaysComb) => {
            return parse_procedure(p, ProcedureKind::AlwaysComb).map(Item::Procedure)
        }
        Keyword(Kw::AlwaysLatch) => {
            return parse_procedure(p, ProcedureKind::AlwaysLatch).map(Item::Procedure)
        }
        Keyword(Kw::AlwaysFf) => {
            return parse_procedure(p, ProcedureKind::AlwaysFf).map(Item::Procedure)
        }
        Keyword(Kw::Final) => return parse_procedure(p, ProcedureKind::Final).map(Item::Procedure),
        Keyword(Kw::Function) | Keyword(Kw::Task) => {
            return parse_subroutine_decl(p).map(Item::SubroutineDecl)
        }

        // Port declarations
        Keyword(Kw::Inout) | Keyword(Kw::Input) | Keyword(Kw::Output) | Keyword(Kw::Ref) => {
            return parse_port_decl(p).map(Item::PortDecl)
        }

        // Continuous assign
        Keyword(Kw::Assign) => return parse_cont_assign(p).map(Item::ContAssign),

        // Genvar declaration
        Keyword(Kw::Genvar) => {
            p.bump();
            let decl = comma_list_nonempty(p, Semicolon, "genvar declaration", parse_genvar_decl)?;
            p.eat_or_synthesize(Semicolon);
            return Ok(Item::GenvarDecl(decl));
        }

        // Generate region and constructs
        Keyword(Kw::Generate) => {
            let mut span = p.peek(0).1;
            p.bump();
            let items = repeat_until(p, Keyword(Kw::Endgenerate), parse_generate_item)?;
            p.require_reported(Keyword(Kw::Endgenerate))?;
            span.expand(p.last_span());
            return Ok(Item::GenerateRegion(span, items));
        }
        Keyword(Kw::For) => return parse_generate_for(p).map(Item::GenerateFor),
        Keyword(Kw::If) => return parse_generate_if(p).map(Item::GenerateIf),
        Keyword(Kw::Case) => return parse_generate_case(p).map(Item::GenerateCase),

        // Assertions
        Keyword(Kw::Assert) | Keyword(Kw::Assume) | Keyword(Kw::Cover) | Keyword(Kw::Expect)
        | Keyword(Kw::Restrict) => return parse_assertion(p).map(Item::Assertion),

        Semicolon => {
            p.bump();
            return Ok(Item::Dummy);
        }

        // Elaboration system tasks are recognized but not interpreted.
        SysIdent(..) => {
            let mut span = p.peek(0).1;
            p.recover_balanced(&[Semicolon], true);
            span.expand(p.last_span());
            p.add_diag(DiagBuilder2::warning("unsupported elaboration system task").span(span));
            return Ok(Item::Dummy);
        }

        _ => (),
    }

    // Handle the possibly ambiguous cases. Net declarations always lead with
    // a net type keyword; instantiations are picked out by scanning the peek
    // buffer without consuming tokens. What remains is dominated by variable
    // declarations, with a branch parser as the final arbiter.
    if is_net_declaration(p) {
        return parse_net_decl(p).map(Item::NetDecl);
    }
    if is_hierarchy_instantiation(p) {
        return parse_inst(p).map(Item::Inst);
    }
    if is_variable_declaration(p) {
        let res = parse_var_decl(p).map(Item::VarDecl);
        if res.is_err() {
            p.recover_balanced(&[Semicolon], true);
        }
        return res;
    }
    let mut pp = ParallelParser::new();
    pp.add("variable declaration", |p| {
        parse_var_decl(p).map(Item::VarDecl)
    });
    pp.add("instantiation", |p| parse_inst(p).map(Item::Inst));
    let res = pp.finish(p, "hierarchy item");
    if res.is_err() {
        p.recover_balanced(&[Semicolon], true);
    }
    res
}

fn parse_import_decl(p: &mut dyn AbstractParser) -> ReportedResult<ImportDecl> {
    let mut span = p.peek(0).1;
    p.require_reported(Keyword(Kw::Import))?;

    // DPI imports are recognized but not supported.
    if let (Literal(Str(_)), sp) = p.peek(0) {
        p.add_diag(DiagBuilder2::warning("unsupported DPI import").span(sp));
        p.recover_balanced(&[Semicolon], true);
        span.expand(p.last_span());
        return Ok(ImportDecl {
            span: span,
            items: vec![],
        });
    }

    let items = comma_list_nonempty(p, Semicolon, "import item", |p| {
        // package_ident "::" ident
        // package_ident "::" "*"
        let mut span = p.peek(0).1;
        let pkg = parse_identifier_name(p, "package name")?;
        p.require_reported(Namespace)?;
        let (tkn, sp) = p.peek(0);
        match tkn {
            Operator(Op::Mul) => {
                p.bump();
                span.expand(p.last_span());
                Ok(ImportItem {
                    span: span,
                    pkg: pkg,
                    name: None,
                })
            }
            Ident(n) | EscIdent(n) => {
                p.bump();
                span.expand(p.last_span());
                Ok(ImportItem {
                    span: span,
                    pkg: pkg,
                    name: Some(Spanned::new(n, sp)),
                })
            }
            _ => {
                p.add_diag(
                    DiagBuilder2::error(
                        "expected identifier or `*` after `::` in import declaration",
                    )
                    .span(sp),
                );
                Err(())
            }
        }
    })?;
    p.eat_or_synthesize(Semicolon);
    span.expand(p.last_span());
    Ok(ImportDecl {
        span: span,
        items: items,
    })
}

/// Parse a parameter or localparam declaration, without the trailing
/// semicolon.
fn parse_param_decl(p: &mut dyn AbstractParser) -> ReportedResult<ParamDecl> {
    let mut span = p.peek(0).1;
    let local = p.try_eat(Keyword(Kw::Localparam));
    if !local {
        p.require_reported(Keyword(Kw::Parameter))?;
    }
    let ty = try_explicit_param_type(p);
    let names = comma_list_nonempty(p, Semicolon, "parameter name", parse_param_name)?;
    span.expand(p.last_span());
    Ok(ParamDecl {
        span: span,
        local: local,
        ty: ty,
        names: names,
    })
}

/// Speculatively parse an explicit parameter type. The branch commits only
/// if a parameter name follows, which tells `parameter foo = 1` apart from
/// `parameter int foo = 1`.
fn try_explicit_param_type(p: &mut dyn AbstractParser) -> Option<Type> {
    speculate(p, |p| {
        let ty = parse_explicit_type(p)?;
        if p.is_ident() {
            Ok(ty)
        } else {
            Err(())
        }
    })
}

fn parse_param_name(p: &mut dyn AbstractParser) -> ReportedResult<ParamName> {
    let mut span = p.peek(0).1;
    let name = parse_identifier(p, "parameter name")?;
    let (dims, _) = parse_optional_dimensions(p)?;
    let expr = if p.try_eat(Operator(Op::Assign)) {
        Some(parse_expr(p)?)
    } else {
        None
    };
    span.expand(p.last_span());
    Ok(ParamName {
        span: span,
        name: name,
        dims: dims,
        expr: expr,
    })
}

/// Parse the parameter port list of a module, after the `#` has been
/// consumed.
fn parse_parameter_port_list(p: &mut dyn AbstractParser) -> ReportedResult<Vec<ParamDecl>> {
    flanked(p, Paren, |p| {
        comma_list(p, CloseDelim(Paren), "parameter", |p| {
            let mut span = p.peek(0).1;
            let local = p.try_eat(Keyword(Kw::Localparam));
            if !local {
                p.try_eat(Keyword(Kw::Parameter));
            }
            let ty = try_explicit_param_type(p);
            let name = parse_param_name(p)?;
            span.expand(p.last_span());
            Ok(ParamDecl {
                span: span,
                local: local,
                ty: ty,
                names: vec![name],
            })
        })
    })
}

fn parse_typedef(p: &mut dyn AbstractParser) -> ReportedResult<Typedef> {
    let mut span = p.peek(0).1;
    p.require_reported(Keyword(Kw::Typedef))?;
    let ty = parse_explicit_type(p)?;
    let name = parse_identifier(p, "type name")?;
    let (dims, _) = parse_optional_dimensions(p)?;
    p.eat_or_synthesize(Semicolon);
    span.expand(p.last_span());
    Ok(Typedef {
        span: span,
        name: name,
        ty: ty,
        dims: dims,
    })
}

fn parse_class_decl(p: &mut dyn AbstractParser) -> ReportedResult<ClassDecl> {
    let mut span = p.peek(0).1;
    let virt = p.try_eat(Keyword(Kw::Virtual));
    p.require_reported(Keyword(Kw::Class))?;
    let result = recovered(p, Keyword(Kw::Endclass), |p| {
        let lifetime = match as_lifetime(p.peek(0).0) {
            Some(l) => {
                p.bump();
                l
            }
            None => Lifetime::Static,
        };
        let name = parse_identifier(p, "class name")?;
        let extends = if p.try_eat(Keyword(Kw::Extends)) {
            Some(parse_identifier(p, "base class name")?)
        } else {
            None
        };
        p.eat_or_synthesize(Semicolon);

        let mut items = Vec::new();
        while !p.is_fatal() && p.peek(0).0 != Keyword(Kw::Endclass) && p.peek(0).0 != Eof {
            let before = p.consumed();
            match parse_class_item(p) {
                Ok(item) => items.push(item),
                Err(()) => (),
            }
            if p.consumed() == before {
                p.skip();
            }
        }
        Ok((lifetime, name, extends, items))
    });
    p.require_reported(Keyword(Kw::Endclass))?;
    parse_optional_end_label(p);
    span.expand(p.last_span());

    let (lifetime, name, extends, items) = result?;
    Ok(ClassDecl {
        span: span,
        virt: virt,
        lifetime: lifetime,
        name: name,
        extends: extends,
        items: items,
    })
}

fn parse_class_item(p: &mut dyn AbstractParser) -> ReportedResult<ClassItem> {
    let mut span = p.peek(0).1;

    // Null items.
    if p.try_eat(Semicolon) {
        return Ok(ClassItem {
            span: span,
            rand: None,
            data: ClassItemData::Null,
        });
    }

    // Constraint blocks and prototypes.
    if leads_constraint(p) {
        let c = parse_constraint(p);
        if c.is_err() {
            p.recover_balanced(&[Semicolon], true);
        }
        let c = c?;
        span.expand(p.last_span());
        return Ok(ClassItem {
            span: span,
            rand: None,
            data: ClassItemData::Constraint(c),
        });
    }

    let data = match p.peek(0).0 {
        Keyword(Kw::Function) | Keyword(Kw::Task) => {
            ClassItemData::SubroutineDecl(parse_subroutine_decl(p)?)
        }
        Keyword(Kw::Typedef) => ClassItemData::Typedef(parse_typedef(p)?),
        _ => {
            // A class property: optional rand qualifier, then a variable
            // declaration.
            let rand = match p.peek(0).0 {
                Keyword(Kw::Rand) => {
                    p.bump();
                    Some(RandQualifier::Rand)
                }
                Keyword(Kw::Randc) => {
                    p.bump();
                    Some(RandQualifier::Randc)
                }
                _ => None,
            };
            let decl = match parse_var_decl(p) {
                Ok(x) => x,
                Err(e) => {
                    p.recover_balanced(&[Semicolon], true);
                    return Err(e);
                }
            };
            span.expand(p.last_span());
            return Ok(ClassItem {
                span: span,
                rand: rand,
                data: ClassItemData::Property(decl),
            });
        }
    };
    span.expand(p.last_span());
    Ok(ClassItem {
        span: span,
        rand: None,
        data: data,
    })
}

/// Whether the upcoming tokens introduce a constraint block or prototype.
fn leads_constraint(p: &mut dyn AbstractParser) -> bool {
    match (p.peek(0).0, p.peek(1).0, p.peek(2).0) {
        (Keyword(Kw::Constraint), ..) => true,
        (Keyword(Kw::Static), Keyword(Kw::Constraint), _) => true,
        (Keyword(Kw::Extern), Keyword(Kw::Constraint), _)
        | (Keyword(Kw::Pure), Keyword(Kw::Constraint), _) => true,
        (Keyword(Kw::Extern), Keyword(Kw::Static), Keyword(Kw::Constraint))
        | (Keyword(Kw::Pure), Keyword(Kw::Static), Keyword(Kw::Constraint)) => true,
        _ => false,
    }
}

fn parse_constraint(p: &mut dyn AbstractParser) -> ReportedResult<Constraint> {
    let mut span = p.peek(0).1;

    // Parse the prototype qualifier.
    let kind = match p.peek(0).0 {
        Keyword(Kw::Extern) => {
            p.bump();
            ConstraintKind::ExternProto
        }
        Keyword(Kw::Pure) => {
            p.bump();
            ConstraintKind::PureProto
        }
        _ => ConstraintKind::Decl,
    };
    let kind_span = span;

    // Parse the optional "static" keyword.
    let statik = p.try_eat(Keyword(Kw::Static));

    // Parse the "constraint" keyword and the constraint name.
    p.require_reported(Keyword(Kw::Constraint))?;
    let (name, name_span) = p.eat_ident("constraint name")?;

    let mut has_body = false;
    let items = if p.try_eat(Semicolon) {
        Vec::new()
    } else {
        has_body = true;
        // Make sure that no "extern" or "pure" keyword was used, as these
        // are only valid for prototypes.
        if kind == ConstraintKind::ExternProto || kind == ConstraintKind::PureProto {
            p.add_diag(
                DiagBuilder2::error("only constraint prototypes can be extern or pure")
                    .span(kind_span),
            );
            return Err(());
        }
        flanked(p, Brace, |p| {
            repeat_until(p, CloseDelim(Brace), parse_constraint_item)
        })?
    };
    span.expand(p.last_span());

    let kind = match (kind, has_body) {
        (ConstraintKind::Decl, false) => ConstraintKind::Proto,
        (kind, _) => kind,
    };

    Ok(Constraint {
        span: span,
        kind: kind,
        statik: statik,
        name: name,
        name_span: name_span,
        items: items,
    })
}

fn parse_constraint_item(p: &mut dyn AbstractParser) -> ReportedResult<ConstraintItem> {
    let mut span = p.peek(0).1;
    let data = parse_constraint_item_data(p)?;
    span.expand(p.last_span());
    Ok(ConstraintItem {
        span: span,
        data: data,
    })
}

fn parse_constraint_item_data(p: &mut dyn AbstractParser) -> ReportedResult<ConstraintItemData> {
    // Handle the cases that start with a keyword or brace first.
    if p.try_eat(Keyword(Kw::If)) {
        let cond = flanked(p, Paren, parse_expr)?;
        let then_items = parse_constraint_set(p)?;
        let else_items = if p.try_eat(Keyword(Kw::Else)) {
            Some(parse_constraint_set(p)?)
        } else {
            None
        };
        return Ok(ConstraintItemData::Conditional(cond, then_items, else_items));
    }

    if p.peek(0).0 == Keyword(Kw::Unique) && p.peek(1).0 == OpenDelim(Brace) {
        p.bump();
        let exprs = flanked(p, Brace, |p| {
            comma_list_nonempty(p, CloseDelim(Brace), "expression", parse_expr)
        })?;
        p.eat_or_synthesize(Semicolon);
        return Ok(ConstraintItemData::Unique(exprs));
    }

    if p.try_eat(Keyword(Kw::Soft)) {
        let expr = parse_expr(p)?;
        p.eat_or_synthesize(Semicolon);
        return Ok(ConstraintItemData::SoftExpr(expr));
    }

    if p.peek(0).0 == OpenDelim(Brace) {
        let items = flanked(p, Brace, |p| {
            repeat_until(p, CloseDelim(Brace), parse_constraint_item)
        })?;
        return Ok(ConstraintItemData::List(items));
    }

    if p.peek(0).0 == Keyword(Kw::Foreach) {
        let sp = p.peek(0).1;
        p.add_diag(DiagBuilder2::error("foreach constraint items are not supported").span(sp));
        return Err(());
    }

    // Everything else starts with an expression, which either stands on its
    // own or is the predicate of an implication. The expression is parsed
    // just above the implication precedence so the `->` stays visible.
    let expr = parse_expr_prec(p, Precedence::Implication)?;
    if p.try_eat(Operator(Op::LogicImpl)) {
        let body = parse_constraint_set(p)?;
        Ok(ConstraintItemData::Implication(expr, body))
    } else {
        p.eat_or_synthesize(Semicolon);
        Ok(ConstraintItemData::Expr(expr))
    }
}

/// Parse a constraint set: either a braced list of items or a single item.
fn parse_constraint_set(p: &mut dyn AbstractParser) -> ReportedResult<Vec<ConstraintItem>> {
    if p.peek(0).0 == OpenDelim(Brace) {
        flanked(p, Brace, |p| {
            repeat_until(p, CloseDelim(Brace), parse_constraint_item)
        })
    } else {
        parse_constraint_item(p).map(|i| vec![i])
    }
}

/// Parse an explicit data type, e.g. `logic [7:0]` or `foo_t`.
fn parse_explicit_type(p: &mut dyn AbstractParser) -> ReportedResult<Type> {
    let mut span = p.peek(0).1;
    let data = parse_type_data(p)?;
    let sign = parse_signing(p);
    let (dims, _) = parse_optional_dimensions(p)?;
    span.expand(p.last_span());
    Ok(Type {
        span: span,
        data: data,
        sign: sign,
        dims: dims,
    })
}

/// Parse an implicit data type, i.e. only an optional signing and packed
/// dimensions. Always succeeds, possibly with an empty type.
fn parse_implicit_type(p: &mut dyn AbstractParser) -> ReportedResult<Type> {
    let mut span = p.peek(0).1;
    span.end = span.begin;
    let sign = parse_signing(p);
    let (dims, _) = parse_optional_dimensions(p)?;
    span.expand(p.last_span());
    Ok(Type {
        span: span,
        data: ImplicitType,
        sign: sign,
        dims: dims,
    })
}

fn parse_type_data(p: &mut dyn AbstractParser) -> ReportedResult<TypeData> {
    let (tkn, sp) = p.peek(0);
    match tkn {
        Keyword(Kw::Void) => {
            p.bump();
            Ok(VoidType)
        }
        Keyword(Kw::Bit) => {
            p.bump();
            Ok(BitType)
        }
        Keyword(Kw::Logic) => {
            p.bump();
            Ok(LogicType)
        }
        Keyword(Kw::Reg) => {
            p.bump();
            Ok(RegType)
        }
        Keyword(Kw::Byte) => {
            p.bump();
            Ok(ByteType)
        }
        Keyword(Kw::Shortint) => {
            p.bump();
            Ok(ShortIntType)
        }
        Keyword(Kw::Int) => {
            p.bump();
            Ok(IntType)
        }
        Keyword(Kw::Longint) => {
            p.bump();
            Ok(LongIntType)
        }
        Keyword(Kw::Integer) => {
            p.bump();
            Ok(IntegerType)
        }
        Keyword(Kw::Time) => {
            p.bump();
            Ok(TimeType)
        }
        Keyword(Kw::String) => {
            p.bump();
            Ok(StringType)
        }
        Keyword(Kw::Event) => {
            p.bump();
            Ok(EventType)
        }
        Keyword(Kw::Enum) => parse_enum_type(p),
        Keyword(Kw::Struct) => parse_struct_type(p),
        Keyword(Kw::Union) => {
            p.add_diag(DiagBuilder2::error("union types are not supported").span(sp));
            Err(())
        }
        Ident(n) | EscIdent(n) => {
            p.bump();
            Ok(NamedType(Identifier {
                span: sp,
                name: n,
            }))
        }
        _ => {
            p.add_diag(DiagBuilder2::error(format!("expected data type, found `{}`", tkn)).span(sp));
            Err(())
        }
    }
}

fn parse_enum_type(p: &mut dyn AbstractParser) -> ReportedResult<TypeData> {
    p.require_reported(Keyword(Kw::Enum))?;

    // Parse the optional base type.
    let base = if p.peek(0).0 != OpenDelim(Brace) {
        Some(Box::new(parse_explicit_type(p)?))
    } else {
        None
    };

    let names = flanked(p, Brace, |p| {
        comma_list_nonempty(p, CloseDelim(Brace), "enum name", parse_enum_name)
    })?;
    Ok(EnumType(base, names))
}

fn parse_enum_name(p: &mut dyn AbstractParser) -> ReportedResult<EnumName> {
    let mut span = p.peek(0).1;
    let name = parse_identifier(p, "enum name")?;
    let range = try_flanked(p, Brack, parse_expr)?;
    let value = if p.try_eat(Operator(Op::Assign)) {
        Some(parse_expr(p)?)
    } else {
        None
    };
    span.expand(p.last_span());
    Ok(EnumName {
        span: span,
        name: name,
        range: range,
        value: value,
    })
}

fn parse_struct_type(p: &mut dyn AbstractParser) -> ReportedResult<TypeData> {
    p.require_reported(Keyword(Kw::Struct))?;
    let packed = p.try_eat(Keyword(Kw::Packed));
    let signing = parse_signing(p);
    let members = flanked(p, Brace, |p| {
        repeat_until(p, CloseDelim(Brace), parse_struct_member)
    })?;
    Ok(StructType {
        packed: packed,
        signing: signing,
        members: members,
    })
}

fn parse_struct_member(p: &mut dyn AbstractParser) -> ReportedResult<StructMember> {
    let mut span = p.peek(0).1;
    let rand = match p.peek(0).0 {
        Keyword(Kw::Rand) => {
            p.bump();
            Some(RandQualifier::Rand)
        }
        Keyword(Kw::Randc) => {
            p.bump();
            Some(RandQualifier::Randc)
        }
        _ => None,
    };
    let ty = Box::new(parse_explicit_type(p)?);
    let names = comma_list_nonempty(p, Semicolon, "member name", parse_variable_decl_assignment)?;
    p.eat_or_synthesize(Semicolon);
    span.expand(p.last_span());
    Ok(StructMember {
        span: span,
        rand: rand,
        ty: ty,
        names: names,
    })
}

fn parse_signing(p: &mut dyn AbstractParser) -> TypeSign {
    match try_signing(p) {
        Some(s) => s,
        None => TypeSign::None,
    }
}

fn try_signing(p: &mut dyn AbstractParser) -> Option<TypeSign> {
    match p.peek(0).0 {
        Keyword(Kw::Signed) => {
            p.bump();
            Some(TypeSign::Signed)
        }
        Keyword(Kw::Unsigned) => {
            p.bump();
            Some(TypeSign::Unsigned)
        }
        _ => None,
    }
}

fn parse_optional_dimensions(
    p: &mut dyn AbstractParser,
) -> ReportedResult<(Vec<TypeDim>, Span)> {
    let mut v = Vec::new();
    let mut span;
    if let Some((d, sp)) = try_dimension(p)? {
        span = sp;
        v.push(d);
    } else {
        return Ok((v, p.peek(0).1));
    }
    while let Some((d, sp)) = try_dimension(p)? {
        v.push(d);
        span.expand(sp);
    }
    Ok((v, span))
}

fn try_dimension(p: &mut dyn AbstractParser) -> ReportedResult<Option<(TypeDim, Span)>> {
    if p.peek(0).0 != OpenDelim(Brack) {
        return Ok(None);
    }
    let mut span = p.peek(0).1;
    p.bump();

    // An empty `[]` is an unsized dimension, `[$]` a queue.
    let dim = match p.peek(0).0 {
        CloseDelim(Brack) => TypeDim::Unsized,
        Dollar => {
            p.bump();
            TypeDim::Queue
        }
        _ => {
            let expr = match parse_expr(p) {
                Ok(x) => x,
                Err(e) => {
                    p.recover_balanced(&[CloseDelim(Brack)], true);
                    return Err(e);
                }
            };
            if p.try_eat(Colon) {
                let hi = match parse_expr(p) {
                    Ok(x) => x,
                    Err(e) => {
                        p.recover_balanced(&[CloseDelim(Brack)], true);
                        return Err(e);
                    }
                };
                TypeDim::Range(expr, hi)
            } else {
                TypeDim::Expr(expr)
            }
        }
    };
    p.require_reported(CloseDelim(Brack))?;
    span.expand(p.last_span());
    Ok(Some((dim, span)))
}

/// Parse the contents of a module port list, up to and including the closing
/// parenthesis.
fn parse_port_list(p: &mut dyn AbstractParser) -> ReportedResult<Vec<Port>> {
    let ports = comma_list(p, CloseDelim(Paren), "port", parse_port)?;
    p.require_reported(CloseDelim(Paren))?;
    Ok(ports)
}

fn parse_port(p: &mut dyn AbstractParser) -> ReportedResult<Port> {
    let mut span = p.peek(0).1;

    // Explicit ports, e.g. `.a(expr)`.
    if p.try_eat(Period) {
        let name = parse_identifier(p, "port name")?;
        let expr = flanked(p, Paren, |p| {
            if p.peek(0).0 == CloseDelim(Paren) {
                Ok(None)
            } else {
                parse_expr(p).map(Some)
            }
        })?;
        span.expand(p.last_span());
        return Ok(Port::Explicit {
            span: span,
            dir: None,
            name: name,
            expr: expr,
        });
    }

    // Non-ANSI ports stay expressions over internal names; the declarations
    // follow in the module body.
    if is_non_ansi_port(p) {
        if p.peek(0).0 == OpenDelim(Brace) {
            return parse_primary_expr(p).map(Port::Implicit);
        }
        let (name, sp) = p.eat_ident("port name")?;
        if p.peek(0).0 == OpenDelim(Brack) {
            let prefix = Expr::new(
                sp,
                IdentExpr(Identifier {
                    span: sp,
                    name: name,
                }),
            );
            return parse_expr_suffix(p, prefix, Precedence::Unary).map(Port::Implicit);
        }
        return Ok(Port::Implicit(Expr::new(
            sp,
            IdentExpr(Identifier {
                span: sp,
                name: name,
            }),
        )));
    }

    // Everything else is an ANSI port: optional direction, optional net or
    // variable kind, explicit or implicit type, name, dimensions, and
    // default value.
    let dir = match as_port_direction(p.peek(0).0) {
        Some(d) => {
            p.bump();
            Some(d)
        }
        None => None,
    };
    if p.try_eat(Period) {
        // An explicit port may also carry a direction.
        let name = parse_identifier(p, "port name")?;
        let expr = flanked(p, Paren, |p| {
            if p.peek(0).0 == CloseDelim(Paren) {
                Ok(None)
            } else {
                parse_expr(p).map(Some)
            }
        })?;
        span.expand(p.last_span());
        return Ok(Port::Explicit {
            span: span,
            dir: dir,
            name: name,
            expr: expr,
        });
    }
    let kind = if let Keyword(kw) = p.peek(0).0 {
        match NetType::from_keyword(kw) {
            Some(nt) => {
                p.bump();
                Some(PortKind::Net(nt))
            }
            None if kw == Kw::Var => {
                p.bump();
                Some(PortKind::Var)
            }
            None => None,
        }
    } else {
        None
    };

    // Branch on explicit and implicit types.
    let mut pp = ParallelParser::new();
    pp.add("explicit type", |p| {
        let ty = parse_explicit_type(p)?;
        Ok((ty, parse_port_tail(p)?))
    });
    pp.add("implicit type", |p| {
        let ty = parse_implicit_type(p)?;
        Ok((ty, parse_port_tail(p)?))
    });
    let (ty, (name, dims, expr)) = pp.finish(p, "port")?;
    span.expand(p.last_span());
    Ok(Port::Named {
        span: span,
        dir: dir,
        kind: kind,
        ty: ty,
        name: name,
        dims: dims,
        expr: expr,
    })
}

/// The tail of an ANSI port: name, unpacked dimensions, default value.
fn parse_port_tail(
    p: &mut dyn AbstractParser,
) -> ReportedResult<(Identifier, Vec<TypeDim>, Option<Expr>)> {
    let name = parse_identifier(p, "port name")?;
    let (dims, _) = parse_optional_dimensions(p)?;
    let expr = if p.try_eat(Operator(Op::Assign)) {
        Some(parse_expr(p)?)
    } else {
        None
    };
    p.anticipate(&[Comma, CloseDelim(Paren)])?;
    Ok((name, dims, expr))
}

fn as_port_direction(tkn: Token) -> Option<PortDir> {
    match tkn {
        Keyword(Kw::Input) => Some(PortDir::Input),
        Keyword(Kw::Output) => Some(PortDir::Output),
        Keyword(Kw::Inout) => Some(PortDir::Inout),
        Keyword(Kw::Ref) => Some(PortDir::Ref),
        _ => None,
    }
}

/// Parse a port declaration in a module body, e.g. `input logic [7:0] a;`.
fn parse_port_decl(p: &mut dyn AbstractParser) -> ReportedResult<PortDecl> {
    let mut span = p.peek(0).1;

    let dir = match as_port_direction(p.peek(0).0) {
        Some(x) => {
            p.bump();
            x
        }
        None => {
            p.add_diag(
                DiagBuilder2::error("expected port direction (inout, input, output, or ref)")
                    .span(span),
            );
            return Err(());
        }
    };

    // Consume the optional net type or "var" keyword.
    let kind = if let Keyword(kw) = p.peek(0).0 {
        match NetType::from_keyword(kw) {
            Some(nt) => {
                p.bump();
                Some(PortKind::Net(nt))
            }
            None if kw == Kw::Var => {
                p.bump();
                Some(PortKind::Var)
            }
            None => None,
        }
    } else {
        None
    };

    // Branch on explicit and implicit types.
    let mut pp = ParallelParser::new();
    pp.add("explicit type", |p| {
        let ty = parse_explicit_type(p)?;
        Ok((ty, parse_decl_names_tail(p)?))
    });
    pp.add("implicit type", |p| {
        let ty = parse_implicit_type(p)?;
        Ok((ty, parse_decl_names_tail(p)?))
    });
    let (ty, names) = pp.finish(p, "port declaration")?;
    p.eat_or_synthesize(Semicolon);
    span.expand(p.last_span());
    Ok(PortDecl {
        span: span,
        dir: dir,
        kind: kind,
        ty: ty,
        names: names,
    })
}

/// The declared names of a net, variable, or port declaration, up to but
/// excluding the semicolon.
fn parse_decl_names_tail(p: &mut dyn AbstractParser) -> ReportedResult<Vec<VarDeclName>> {
    let names =
        comma_list_nonempty(p, Semicolon, "declaration name", parse_variable_decl_assignment)?;
    p.anticipate(&[Semicolon])?;
    Ok(names)
}

fn parse_variable_decl_assignment(p: &mut dyn AbstractParser) -> ReportedResult<VarDeclName> {
    let mut span = p.peek(0).1;
    let (name, name_span) = p.eat_ident("variable name")?;
    let (dims, _) = parse_optional_dimensions(p)?;
    let init = if p.try_eat(Operator(Op::Assign)) {
        Some(parse_expr(p)?)
    } else {
        None
    };
    span.expand(p.last_span());
    Ok(VarDeclName {
        span: span,
        name: name,
        name_span: name_span,
        dims: dims,
        init: init,
    })
}

/// Parse a net declaration, e.g. `wire [7:0] x = a & b;`.
fn parse_net_decl(p: &mut dyn AbstractParser) -> ReportedResult<NetDecl> {
    let mut span = p.peek(0).1;

    let net_type = match p.peek(0).0 {
        Keyword(kw) => match NetType::from_keyword(kw) {
            Some(nt) => {
                p.bump();
                nt
            }
            None => {
                p.add_diag(DiagBuilder2::error("expected net type").span(span));
                return Err(());
            }
        },
        _ => {
            p.add_diag(DiagBuilder2::error("expected net type").span(span));
            return Err(());
        }
    };

    // Consume the optional drive or charge strength.
    let strength = try_net_strength(p)?;

    // Consume the optional delay.
    let delay = if p.try_eat(Hashtag) {
        Some(parse_delay_value(p)?)
    } else {
        None
    };

    // Branch on explicit and implicit types.
    let mut pp = ParallelParser::new();
    pp.add("explicit type", |p| {
        let ty = parse_explicit_type(p)?;
        Ok((ty, parse_decl_names_tail(p)?))
    });
    pp.add("implicit type", |p| {
        let ty = parse_implicit_type(p)?;
        Ok((ty, parse_decl_names_tail(p)?))
    });
    let (ty, names) = pp.finish(p, "net declaration")?;
    p.eat_or_synthesize(Semicolon);
    span.expand(p.last_span());
    Ok(NetDecl {
        span: span,
        net_type: net_type,
        strength: strength,
        ty: ty,
        delay: delay,
        names: names,
    })
}

/// Parse a variable declaration. Without a `const`, `var`, or lifetime
/// introduction, an explicit type is required; this is what tells `x = 1;`
/// apart from a declaration.
fn parse_var_decl(p: &mut dyn AbstractParser) -> ReportedResult<VarDecl> {
    let mut span = p.peek(0).1;
    let konst = p.try_eat(Keyword(Kw::Const));
    let var = p.try_eat(Keyword(Kw::Var));
    let lifetime = match as_lifetime(p.peek(0).0) {
        Some(l) => {
            p.bump();
            Some(l)
        }
        None => None,
    };

    let (ty, names) = if konst || var || lifetime.is_some() {
        let mut pp = ParallelParser::new();
        pp.add("explicit type", |p| {
            let ty = parse_explicit_type(p)?;
            Ok((ty, parse_decl_names_tail(p)?))
        });
        pp.add("implicit type", |p| {
            let ty = parse_implicit_type(p)?;
            Ok((ty, parse_decl_names_tail(p)?))
        });
        pp.finish(p, "variable declaration")?
    } else {
        let ty = parse_explicit_type(p)?;
        let names = parse_decl_names_tail(p)?;
        (ty, names)
    };
    p.eat_or_synthesize(Semicolon);
    span.expand(p.last_span());
    Ok(VarDecl {
        span: span,
        konst: konst,
        var: var,
        lifetime: lifetime,
        ty: ty,
        names: names,
    })
}

fn try_net_strength(p: &mut dyn AbstractParser) -> ReportedResult<Option<NetStrength>> {
    // Only treat the parenthesis as a strength if a strength keyword
    // follows it; otherwise it belongs to whatever comes next.
    let next = p.peek(1).0;
    let leads_strength = p.peek(0).0 == OpenDelim(Paren)
        && (as_drive_strength(next).is_some() || as_charge_strength(next).is_some());
    if !leads_strength {
        return Ok(None);
    }
    flanked(p, Paren, |p| {
        let (tkn, sp) = p.peek(0);
        if let Some(cs) = as_charge_strength(tkn) {
            p.bump();
            return Ok(NetStrength::Charge(cs));
        }
        let s0 = match as_drive_strength(tkn) {
            Some(s) => {
                p.bump();
                s
            }
            None => {
                p.add_diag(DiagBuilder2::error("expected drive strength").span(sp));
                return Err(());
            }
        };
        p.require_reported(Comma)?;
        let (tkn, sp) = p.peek(0);
        let s1 = match as_drive_strength(tkn) {
            Some(s) => {
                p.bump();
                s
            }
            None => {
                p.add_diag(DiagBuilder2::error("expected drive strength").span(sp));
                return Err(());
            }
        };
        Ok(NetStrength::Drive(s0, s1))
    })
    .map(Some)
}

fn as_drive_strength(tkn: Token) -> Option<DriveStrength> {
    match tkn {
        Keyword(Kw::Supply0) => Some(DriveStrength::Supply0),
        Keyword(Kw::Strong0) => Some(DriveStrength::Strong0),
        Keyword(Kw::Pull0) => Some(DriveStrength::Pull0),
        Keyword(Kw::Weak0) => Some(DriveStrength::Weak0),
        Keyword(Kw::Highz0) => Some(DriveStrength::HighZ0),
        Keyword(Kw::Supply1) => Some(DriveStrength::Supply1),
        Keyword(Kw::Strong1) => Some(DriveStrength::Strong1),
        Keyword(Kw::Pull1) => Some(DriveStrength::Pull1),
        Keyword(Kw::Weak1) => Some(DriveStrength::Weak1),
        Keyword(Kw::Highz1) => Some(DriveStrength::HighZ1),
        _ => None,
    }
}

fn as_charge_strength(tkn: Token) -> Option<ChargeStrength> {
    match tkn {
        Keyword(Kw::Small) => Some(ChargeStrength::Small),
        Keyword(Kw::Medium) => Some(ChargeStrength::Medium),
        Keyword(Kw::Large) => Some(ChargeStrength::Large),
        _ => None,
    }
}

/// Parse a hierarchy instantiation, e.g. `foo #(8) a(), b();`.
fn parse_inst(p: &mut dyn AbstractParser) -> ReportedResult<Inst> {
    let mut span = p.peek(0).1;
    let target = parse_identifier(p, "module or interface name")?;

    // Parse the optional parameter assignments after `#`.
    let params = if p.try_eat(Hashtag) {
        flanked(p, Paren, |p| {
            comma_list(p, CloseDelim(Paren), "parameter assignment", parse_param_assignment)
        })?
    } else {
        Vec::new()
    };

    // Parse the instances.
    let names = comma_list_nonempty(p, Semicolon, "instance", parse_inst_name)?;
    p.eat_or_synthesize(Semicolon);
    span.expand(p.last_span());
    Ok(Inst {
        span: span,
        target: target,
        params: params,
        names: names,
    })
}

fn parse_param_assignment(p: &mut dyn AbstractParser) -> ReportedResult<ParamAssignment> {
    let mut span = p.peek(0).1;
    if p.try_eat(Period) {
        let name = parse_identifier(p, "parameter name")?;
        let expr = flanked(p, Paren, parse_expr)?;
        span.expand(p.last_span());
        Ok(ParamAssignment {
            span: span,
            name: Some(name),
            expr: expr,
        })
    } else {
        let expr = parse_expr(p)?;
        span.expand(p.last_span());
        Ok(ParamAssignment {
            span: span,
            name: None,
            expr: expr,
        })
    }
}

fn parse_inst_name(p: &mut dyn AbstractParser) -> ReportedResult<InstName> {
    let mut span = p.peek(0).1;
    let name = parse_identifier(p, "instance name")?;
    let (dims, _) = parse_optional_dimensions(p)?;
    let conns = flanked(p, Paren, parse_list_of_port_connections)?;
    span.expand(p.last_span());
    Ok(InstName {
        span: span,
        name: name,
        dims: dims,
        conns: conns,
    })
}

fn parse_list_of_port_connections(p: &mut dyn AbstractParser) -> ReportedResult<Vec<PortConn>> {
    comma_list(p, CloseDelim(Paren), "port connection", |p| {
        let mut span = p.peek(0).1;
        let kind = if p.try_eat(Period) {
            if p.try_eat(Operator(Op::Mul)) {
                PortConnKind::Auto
            } else {
                let name = parse_identifier(p, "port name")?;
                let expr = if p.peek(0).0 == OpenDelim(Paren) {
                    flanked(p, Paren, |p| {
                        if p.peek(0).0 == CloseDelim(Paren) {
                            Ok(None)
                        } else {
                            parse_expr(p).map(Some)
                        }
                    })?
                } else {
                    None
                };
                PortConnKind::Named(name, expr)
            }
        } else {
            PortConnKind::Positional(parse_expr(p)?)
        };
        span.expand(p.last_span());
        Ok(PortConn {
            span: span,
            kind: kind,
        })
    })
}

/// Parse a continuous assignment.
///
/// ```text
/// "assign" [drive_strength] [delay] list_of_assignments ";"
/// ```
fn parse_cont_assign(p: &mut dyn AbstractParser) -> ReportedResult<ContAssign> {
    let mut span = p.peek(0).1;
    p.require_reported(Keyword(Kw::Assign))?;

    let strength = try_net_strength(p)?;
    let delay = if p.try_eat(Hashtag) {
        Some(parse_delay_value(p)?)
    } else {
        None
    };

    let assignments = comma_list_nonempty(p, Semicolon, "assignment", |p| {
        let lhs = parse_expr_prec(p, Precedence::Unary)?;
        p.require_reported(Operator(Op::Assign))?;
        let rhs = parse_expr(p)?;
        Ok((lhs, rhs))
    })?;
    p.eat_or_synthesize(Semicolon);
    span.expand(p.last_span());
    Ok(ContAssign {
        span: span,
        strength: strength,
        delay: delay,
        assignments: assignments,
    })
}

fn parse_procedure(
    p: &mut dyn AbstractParser,
    kind: ProcedureKind,
) -> ReportedResult<Procedure> {
    let mut span = p.peek(0).1;
    p.bump(); // eat the introducing keyword
    let stmt = parse_stmt(p)?;
    span.expand(p.last_span());
    Ok(Procedure {
        span: span,
        kind: kind,
        stmt: stmt,
    })
}

fn parse_genvar_decl(p: &mut dyn AbstractParser) -> ReportedResult<GenvarDecl> {
    let mut span = p.peek(0).1;
    let (name, name_span) = p.eat_ident("genvar name")?;
    let init = if p.try_eat(Operator(Op::Assign)) {
        Some(parse_expr(p)?)
    } else {
        None
    };
    span.expand(p.last_span());
    Ok(GenvarDecl {
        span: span,
        name: name,
        name_span: name_span,
        init: init,
    })
}

fn parse_generate_item(p: &mut dyn AbstractParser) -> ReportedResult<Item> {
    match p.peek(0).0 {
        Keyword(Kw::For) => parse_generate_for(p).map(Item::GenerateFor),
        Keyword(Kw::If) => parse_generate_if(p).map(Item::GenerateIf),
        Keyword(Kw::Case) => parse_generate_case(p).map(Item::GenerateCase),
        _ => parse_hierarchy_item(p),
    }
}

fn parse_generate_for(p: &mut dyn AbstractParser) -> ReportedResult<GenerateFor> {
    let mut span = p.peek(0).1;
    p.require_reported(Keyword(Kw::For))?;
    let (init, cond, step) = flanked(p, Paren, |p| {
        let init = parse_stmt(p)?;
        let cond = parse_expr(p)?;
        p.require_reported(Semicolon)?;
        let step = parse_expr(p)?;
        Ok((init, cond, step))
    })?;
    let block = parse_generate_block(p)?;
    span.expand(p.last_span());
    Ok(GenerateFor {
        span: span,
        init: init,
        cond: cond,
        step: step,
        block: block,
    })
}

fn parse_generate_if(p: &mut dyn AbstractParser) -> ReportedResult<GenerateIf> {
    let mut span = p.peek(0).1;
    p.require_reported(Keyword(Kw::If))?;
    let cond = flanked(p, Paren, parse_expr)?;
    let main_block = parse_generate_block(p)?;
    let else_block = if p.try_eat(Keyword(Kw::Else)) {
        Some(parse_generate_block(p)?)
    } else {
        None
    };
    span.expand(p.last_span());
    Ok(GenerateIf {
        span: span,
        cond: cond,
        main_block: main_block,
        else_block: else_block,
    })
}

fn parse_generate_case(p: &mut dyn AbstractParser) -> ReportedResult<GenerateCase> {
    let mut span = p.peek(0).1;
    p.require_reported(Keyword(Kw::Case))?;
    let expr = flanked(p, Paren, parse_expr)?;
    let mut items = Vec::new();
    while !p.try_eat(Keyword(Kw::Endcase)) {
        if p.peek(0).0 == Eof || p.is_fatal() {
            let sp = p.peek(0).1;
            p.add_diag(DiagBuilder2::error("expected `endcase`").span(sp));
            return Err(());
        }
        if p.try_eat(Keyword(Kw::Default)) {
            p.try_eat(Colon);
            items.push(GenerateCaseItem::Default(parse_generate_block(p)?));
        } else {
            let exprs = comma_list_nonempty(p, Colon, "case expression", parse_expr)?;
            p.require_reported(Colon)?;
            items.push(GenerateCaseItem::Expr(exprs, parse_generate_block(p)?));
        }
    }
    span.expand(p.last_span());
    Ok(GenerateCase {
        span: span,
        expr: expr,
        items: items,
    })
}

fn parse_generate_block(p: &mut dyn AbstractParser) -> ReportedResult<GenerateBlock> {
    let mut span = p.peek(0).1;

    // A generate block is either flanked by `begin` and `end`, or is a
    // single item.
    if !p.try_eat(OpenDelim(Bgend)) {
        let item = parse_generate_item(p)?;
        span.expand(p.last_span());
        return Ok(GenerateBlock {
            span: span,
            label: None,
            items: vec![item],
        });
    }

    let mut label = None;
    if p.try_eat(Colon) {
        label = p.try_eat_ident().map(|(n, _)| n);
        if label.is_none() {
            let sp = p.peek(0).1;
            p.add_diag(DiagBuilder2::error("expected label after `:`").span(sp));
        }
    }

    let items = repeat_until(p, CloseDelim(Bgend), parse_generate_item)?;
    p.require_reported(CloseDelim(Bgend))?;
    parse_optional_end_label(p);
    span.expand(p.last_span());
    Ok(GenerateBlock {
        span: span,
        label: label,
        items: items,
    })
}

fn parse_subroutine_decl(p: &mut dyn AbstractParser) -> ReportedResult<SubroutineDecl> {
    let mut span = p.peek(0).1;
    let (kind, end_kw) = match p.peek(0).0 {
        Keyword(Kw::Function) => (SubroutineKind::Func, Kw::Endfunction),
        Keyword(Kw::Task) => (SubroutineKind::Task, Kw::Endtask),
        tkn => {
            p.add_diag(
                DiagBuilder2::error(format!("expected function or task, found `{}`", tkn))
                    .span(span),
            );
            return Err(());
        }
    };
    p.bump();

    let result = recovered(p, Keyword(end_kw), |p| {
        let lifetime = match as_lifetime(p.peek(0).0) {
            Some(l) => {
                p.bump();
                Some(l)
            }
            None => None,
        };

        // The return type is present if the name is not directly followed by
        // a parenthesis or semicolon.
        let mut proto_span = p.peek(0).1;
        let (retty, name) = if p.is_ident()
            && (p.peek(1).0 == OpenDelim(Paren) || p.peek(1).0 == Semicolon)
        {
            (None, parse_identifier(p, "subroutine name")?)
        } else {
            let ty = parse_explicit_type(p)?;
            let name = parse_identifier(p, "subroutine name")?;
            (Some(ty), name)
        };

        let args = match try_flanked(p, Paren, |p| {
            comma_list(p, CloseDelim(Paren), "subroutine port", parse_subroutine_port)
        })? {
            Some(args) => args,
            None => Vec::new(),
        };
        p.eat_or_synthesize(Semicolon);
        proto_span.expand(p.last_span());

        // The body statements, including variable declarations.
        let mut stmts = Vec::new();
        while !p.is_fatal() && p.peek(0).0 != Keyword(end_kw) && p.peek(0).0 != Eof {
            let before = p.consumed();
            match parse_stmt(p) {
                Ok(stmt) => stmts.push(stmt),
                Err(()) => (),
            }
            if p.consumed() == before {
                p.skip();
            }
        }

        Ok((lifetime, retty, name, args, proto_span, stmts))
    });
    p.require_reported(Keyword(end_kw))?;
    parse_optional_end_label(p);
    span.expand(p.last_span());

    let (lifetime, retty, name, args, proto_span, stmts) = result?;
    Ok(SubroutineDecl {
        span: span,
        prototype: SubroutinePrototype {
            span: proto_span,
            kind: kind,
            lifetime: lifetime,
            name: name,
            args: args,
            retty: retty,
        },
        stmts: stmts,
    })
}

fn parse_subroutine_port(p: &mut dyn AbstractParser) -> ReportedResult<SubroutinePort> {
    let mut span = p.peek(0).1;

    // Consume the optional port direction.
    let dir = match p.peek(0).0 {
        Keyword(Kw::Input) => {
            p.bump();
            Some(SubroutinePortDir::Input)
        }
        Keyword(Kw::Output) => {
            p.bump();
            Some(SubroutinePortDir::Output)
        }
        Keyword(Kw::Inout) => {
            p.bump();
            Some(SubroutinePortDir::Inout)
        }
        Keyword(Kw::Ref) => {
            p.bump();
            Some(SubroutinePortDir::Ref)
        }
        Keyword(Kw::Const) => {
            p.bump();
            p.require_reported(Keyword(Kw::Ref))?;
            Some(SubroutinePortDir::ConstRef)
        }
        _ => None,
    };
    let var = p.try_eat(Keyword(Kw::Var));

    // A lone identifier followed by a separator is a name with an implicit
    // type; everything else starts with an explicit type.
    let (ty, name) = if p.is_ident()
        && match p.peek(1).0 {
            Comma | CloseDelim(Paren) | Operator(Op::Assign) | OpenDelim(Brack) => true,
            _ => false,
        } {
        let ty = parse_implicit_type(p)?;
        (ty, try_identifier(p))
    } else {
        let ty = parse_explicit_type(p)?;
        (ty, try_identifier(p))
    };
    let (dims, _) = parse_optional_dimensions(p)?;
    let default = if p.try_eat(Operator(Op::Assign)) {
        Some(parse_expr(p)?)
    } else {
        None
    };
    span.expand(p.last_span());
    Ok(SubroutinePort {
        span: span,
        dir: dir,
        var: var,
        ty: ty,
        name: name,
        dims: dims,
        default: default,
    })
}

fn parse_assertion(p: &mut dyn AbstractParser) -> ReportedResult<Assertion> {
    let mut span = p.peek(0).1;

    // Concurrent assertions over properties and sequences are outside this
    // front end's scope; recognize and skip them.
    if p.peek(1).0 == Keyword(Kw::Property) || p.peek(1).0 == Keyword(Kw::Sequence) {
        p.add_diag(
            DiagBuilder2::error("property and sequence assertions are not supported").span(span),
        );
        p.recover_balanced(&[Semicolon], true);
        return Err(());
    }

    // Peek ahead to see whether a `#0` or `final` follows the keyword, which
    // makes the assertion deferred.
    let zero = get_name_table().intern("0", true);
    let is_deferred_observed =
        p.peek(1).0 == Hashtag && p.peek(2).0 == Literal(Number(zero, None));
    let is_deferred_final = p.peek(1).0 == Keyword(Kw::Final);
    let is_deferred = is_deferred_observed || is_deferred_final;
    let deferred_mode = match is_deferred_final {
        true => AssertionDeferred::Final,
        false => AssertionDeferred::Observed,
    };

    let data = match p.peek(0).0 {
        Keyword(Kw::Assert) => {
            p.bump();
            if is_deferred {
                p.bump();
                if is_deferred_observed {
                    p.bump();
                }
            }
            let expr = flanked(p, Paren, parse_expr)?;
            let action = parse_assertion_action_block(p)?;
            let a = BlockingAssertion::Assert(expr, action);
            if is_deferred {
                AssertionData::Deferred(deferred_mode, a)
            } else {
                AssertionData::Immediate(a)
            }
        }
        Keyword(Kw::Assume) => {
            p.bump();
            if is_deferred {
                p.bump();
                if is_deferred_observed {
                    p.bump();
                }
            }
            let expr = flanked(p, Paren, parse_expr)?;
            let action = parse_assertion_action_block(p)?;
            let a = BlockingAssertion::Assume(expr, action);
            if is_deferred {
                AssertionData::Deferred(deferred_mode, a)
            } else {
                AssertionData::Immediate(a)
            }
        }
        Keyword(Kw::Cover) => {
            p.bump();
            if is_deferred {
                p.bump();
                if is_deferred_observed {
                    p.bump();
                }
            }
            let expr = flanked(p, Paren, parse_expr)?;
            let stmt = parse_stmt(p)?;
            let a = BlockingAssertion::Cover(expr, stmt);
            if is_deferred {
                AssertionData::Deferred(deferred_mode, a)
            } else {
                AssertionData::Immediate(a)
            }
        }
        _ => {
            p.add_diag(
                DiagBuilder2::error("expected assert, assume, or cover").span(span),
            );
            return Err(());
        }
    };

    span.expand(p.last_span());
    Ok(Assertion {
        span: span,
        label: None,
        data: data,
    })
}

fn parse_assertion_action_block(
    p: &mut dyn AbstractParser,
) -> ReportedResult<AssertionActionBlock> {
    if p.try_eat(Keyword(Kw::Else)) {
        Ok(AssertionActionBlock::Negative(parse_stmt(p)?))
    } else {
        let stmt = parse_stmt(p)?;
        if p.try_eat(Keyword(Kw::Else)) {
            Ok(AssertionActionBlock::Both(stmt, parse_stmt(p)?))
        } else {
            Ok(AssertionActionBlock::Positive(stmt))
        }
    }
}

fn parse_stmt(p: &mut dyn AbstractParser) -> ReportedResult<Stmt> {
    let mut span = p.peek(0).1;

    // Null statements simply consist of a semicolon.
    if p.try_eat(Semicolon) {
        return Ok(Stmt::new_null(span));
    }

    // Consume the optional statement label.
    let mut label = if p.is_ident() && p.peek(1).0 == Colon {
        let (n, _) = p.eat_ident("statement label")?;
        p.bump(); // eat the colon
        Some(n)
    } else {
        None
    };

    // Parse the actual statement item.
    let data = parse_stmt_data(p, &mut label)?;
    span.expand(p.last_span());

    Ok(Stmt {
        span: span,
        label: label,
        data: data,
    })
}

fn parse_stmt_data(
    p: &mut dyn AbstractParser,
    label: &mut Option<Name>,
) -> ReportedResult<StmtData> {
    let tkn = p.peek(0).0;

    // See if this is a timing-controlled statement as per IEEE 1800-2009
    // section 9.4.
    if let Some(dc) = try_delay_control(p)? {
        let stmt = Box::new(parse_stmt(p)?);
        return Ok(TimedStmt(TimingControl::Delay(dc), stmt));
    }
    if let Some(ec) = try_event_control(p)? {
        let stmt = Box::new(parse_stmt(p)?);
        return Ok(TimedStmt(TimingControl::Event(ec), stmt));
    }
    if let Some(cd) = try_cycle_delay(p)? {
        let stmt = Box::new(parse_stmt(p)?);
        return Ok(TimedStmt(TimingControl::Cycle(cd), stmt));
    }

    Ok(match tkn {
        // Sequential blocks
        OpenDelim(Bgend) => {
            p.bump();
            let (stmts, _) = parse_block(p, label, &[CloseDelim(Bgend)])?;
            SequentialBlock(stmts)
        }

        // Parallel blocks
        Keyword(Kw::Fork) => {
            p.bump();
            let (stmts, terminator) = parse_block(
                p,
                label,
                &[
                    Keyword(Kw::Join),
                    Keyword(Kw::JoinAny),
                    Keyword(Kw::JoinNone),
                ],
            )?;
            let join = match terminator {
                Keyword(Kw::Join) => JoinKind::All,
                Keyword(Kw::JoinAny) => JoinKind::Any,
                Keyword(Kw::JoinNone) => JoinKind::None,
                x => panic!("invalid parallel block terminator {:?}", x),
            };
            ParallelBlock(stmts, join)
        }

        // If and case statements
        Keyword(Kw::Unique) => {
            p.bump();
            parse_if_or_case(p, Some(UniquePriority::Unique))?
        }
        Keyword(Kw::Unique0) => {
            p.bump();
            parse_if_or_case(p, Some(UniquePriority::Unique0))?
        }
        Keyword(Kw::Priority) => {
            p.bump();
            parse_if_or_case(p, Some(UniquePriority::Priority))?
        }
        Keyword(Kw::If) | Keyword(Kw::Case) | Keyword(Kw::Casex) | Keyword(Kw::Casez) => {
            parse_if_or_case(p, None)?
        }

        // Loops, as per IEEE 1800-2009 section 12.7.
        Keyword(Kw::Forever) => {
            p.bump();
            let stmt = Box::new(parse_stmt(p)?);
            ForeverStmt(stmt)
        }
        Keyword(Kw::Repeat) => {
            p.bump();
            let expr = flanked(p, Paren, parse_expr)?;
            let stmt = Box::new(parse_stmt(p)?);
            RepeatStmt(expr, stmt)
        }
        Keyword(Kw::While) => {
            p.bump();
            let expr = flanked(p, Paren, parse_expr)?;
            let stmt = Box::new(parse_stmt(p)?);
            WhileStmt(expr, stmt)
        }
        Keyword(Kw::Do) => {
            p.bump();
            let stmt = Box::new(parse_stmt(p)?);
            let q = p.last_span();
            if !p.try_eat(Keyword(Kw::While)) {
                p.add_diag(DiagBuilder2::error("do loop requires a while clause").span(q));
                return Err(());
            }
            let expr = flanked(p, Paren, parse_expr)?;
            p.eat_or_synthesize(Semicolon);
            DoStmt(stmt, expr)
        }
        Keyword(Kw::For) => {
            p.bump();
            let (init, cond, step) = flanked(p, Paren, |p| {
                let init = Box::new(parse_stmt(p)?);
                let cond = parse_expr(p)?;
                p.require_reported(Semicolon)?;
                let step = parse_expr(p)?;
                Ok((init, cond, step))
            })?;
            let stmt = Box::new(parse_stmt(p)?);
            ForStmt(init, cond, step, stmt)
        }
        Keyword(Kw::Foreach) => {
            p.bump();
            let (expr, vars) = flanked(p, Paren, |p| {
                let expr = parse_expr_prec(p, Precedence::Scope)?;
                let vars = flanked(p, Brack, |p| {
                    let mut v = Vec::new();
                    while p.peek(0).0 != Eof && p.peek(0).0 != CloseDelim(Brack) {
                        if p.peek(0).0 != Comma {
                            v.push(Some(parse_identifier(p, "loop variable name")?));
                        } else {
                            v.push(None)
                        }
                        match p.peek(0) {
                            (Comma, _) => p.bump(),
                            (CloseDelim(Brack), _) => (),
                            (tkn, sp) => {
                                p.add_diag(
                                    DiagBuilder2::error(format!(
                                        "expected , or ] after loop variable; found {} instead",
                                        tkn
                                    ))
                                    .span(sp),
                                );
                                return Err(());
                            }
                        }
                    }
                    Ok(v)
                })?;
                Ok((expr, vars))
            })?;
            let stmt = Box::new(parse_stmt(p)?);
            ForeachStmt(expr, vars, stmt)
        }

        // Generate variables
        Keyword(Kw::Genvar) => {
            p.bump();
            let names = comma_list_nonempty(p, Semicolon, "genvar declaration", parse_genvar_decl)?;
            p.eat_or_synthesize(Semicolon);
            GenvarDeclStmt(names)
        }

        // Flow control
        Keyword(Kw::Return) => {
            p.bump();
            ReturnStmt(if p.try_eat(Semicolon) {
                None
            } else {
                let expr = parse_expr(p)?;
                p.eat_or_synthesize(Semicolon);
                Some(expr)
            })
        }
        Keyword(Kw::Break) => {
            p.bump();
            p.eat_or_synthesize(Semicolon);
            BreakStmt
        }
        Keyword(Kw::Continue) => {
            p.bump();
            p.eat_or_synthesize(Semicolon);
            ContinueStmt
        }

        // Import statements
        Keyword(Kw::Import) => ImportStmt(parse_import_decl(p)?),

        // Assertion statements
        Keyword(Kw::Assert) | Keyword(Kw::Assume) | Keyword(Kw::Cover) | Keyword(Kw::Expect)
        | Keyword(Kw::Restrict) => AssertionStmt(Box::new(parse_assertion(p)?)),

        // Wait statements
        Keyword(Kw::Wait) => {
            p.bump();
            match p.peek(0) {
                (OpenDelim(Paren), _) => {
                    let expr = flanked(p, Paren, parse_expr)?;
                    let stmt = Box::new(parse_stmt(p)?);
                    WaitExprStmt(expr, stmt)
                }
                (Keyword(Kw::Fork), _) => {
                    p.bump();
                    p.eat_or_synthesize(Semicolon);
                    WaitForkStmt
                }
                (tkn, sp) => {
                    p.add_diag(
                        DiagBuilder2::error(format!(
                            "expected (<expr>) or fork after wait, found {} instead",
                            tkn
                        ))
                        .span(sp),
                    );
                    return Err(());
                }
            }
        }

        // Disable statements
        Keyword(Kw::Disable) => {
            p.bump();
            if p.try_eat(Keyword(Kw::Fork)) {
                p.eat_or_synthesize(Semicolon);
                DisableForkStmt
            } else {
                let (name, _) = p.eat_ident("task or block name")?;
                p.eat_or_synthesize(Semicolon);
                DisableStmt(name)
            }
        }

        // Everything else needs special treatment, as variable declarations
        // look very similar to expressions and assignments.
        _ => {
            let result = {
                let mut pp = ParallelParser::new();
                pp.add("variable declaration", |p| {
                    parse_var_decl(p).map(VarDeclStmt)
                });
                pp.add("statement expression", parse_expr_or_assign_stmt);
                pp.finish(p, "statement")
            };
            match result {
                Ok(x) => x,
                Err(_) => {
                    p.recover_balanced(&[Semicolon], true);
                    return Err(());
                }
            }
        }
    })
}

/// Parse a statement that starts with an expression: a blocking or
/// nonblocking assignment, or an expression statement such as a call. The
/// left hand side is parsed at unary precedence first, which keeps a `<=`
/// visible as the nonblocking assignment operator rather than a comparison.
fn parse_expr_or_assign_stmt(p: &mut dyn AbstractParser) -> ReportedResult<StmtData> {
    let lhs = parse_expr_prec(p, Precedence::Unary)?;

    // Nonblocking assignment.
    if p.try_eat(Operator(Op::Leq)) {
        let rhs = parse_expr(p)?;
        p.eat_or_synthesize(Semicolon);
        return Ok(AssignStmt {
            kind: AssignKind::Nonblock,
            lhs: lhs,
            rhs: rhs,
        });
    }

    // Blocking assignment, possibly with an operator.
    if let Some(op) = as_assign_operator(p.peek(0).0) {
        p.bump();
        let rhs = parse_expr(p)?;
        p.eat_or_synthesize(Semicolon);
        return Ok(AssignStmt {
            kind: AssignKind::Block(op),
            lhs: lhs,
            rhs: rhs,
        });
    }

    // Not an assignment after all; resume parsing the full expression from
    // the prefix we already have.
    let expr = parse_expr_suffix(p, lhs, Precedence::Min)?;
    p.require_reported(Semicolon)?;
    Ok(ExprStmt(expr))
}

fn parse_block(
    p: &mut dyn AbstractParser,
    label: &mut Option<Name>,
    terminators: &[Token],
) -> ReportedResult<(Vec<Stmt>, Token)> {
    // Consume the optional block label. If the block has already been
    // labelled via a statement label, an additional block label is illegal.
    if p.try_eat(Colon) {
        let (name, name_span) = p.eat_ident("block label")?;
        if let Some(existing) = *label {
            if name == existing {
                p.add_diag(
                    DiagBuilder2::warning(format!("block {} labelled twice", name)).span(name_span),
                );
            } else {
                p.add_diag(
                    DiagBuilder2::error(format!(
                        "block has been given two conflicting labels, {} and {}",
                        existing, name
                    ))
                    .span(name_span),
                );
            }
        } else {
            *label = Some(name);
        }
    }

    // Parse the block statements.
    let mut v = Vec::new();
    let terminator;
    'outer: loop {
        // Check if we have reached one of the terminators.
        let tkn = p.peek(0).0;
        for term in terminators {
            if tkn == *term {
                terminator = *term;
                p.bump();
                break 'outer;
            }
        }
        if tkn == Eof {
            let sp = p.peek(0).1;
            p.add_diag(
                DiagBuilder2::error(format!("expected {:?} before end of input", terminators))
                    .span(sp),
            );
            return Err(());
        }

        // Otherwise parse the next statement.
        match parse_stmt(p) {
            Ok(x) => v.push(x),
            Err(()) => {
                p.recover_balanced(terminators, false);
                terminator = p.peek(0).0;
                p.bump();
                break;
            }
        }
    }

    // Consume the optional block label after the terminator and verify that
    // it matches the label provided at the beginning of the block.
    if p.try_eat(Colon) {
        let (name, name_span) = p.eat_ident("block label")?;
        if let Some(before) = *label {
            if before != name {
                p.add_diag(
                    DiagBuilder2::error(format!(
                        "block label {} at end of block does not match label {} at beginning \
                         of block",
                        name, before
                    ))
                    .span(name_span),
                );
            }
        } else {
            p.add_diag(
                DiagBuilder2::error(format!(
                    "block label {} provided at the end of the block, but not at the beginning",
                    name
                ))
                .span(name_span),
            );
        }
    }

    Ok((v, terminator))
}

fn parse_if_or_case(
    p: &mut dyn AbstractParser,
    up: Option<UniquePriority>,
) -> ReportedResult<StmtData> {
    match p.peek(0).0 {
        Keyword(Kw::If) => parse_if(p, up),
        Keyword(Kw::Case) => parse_case(p, up, CaseKind::Normal),
        Keyword(Kw::Casez) => parse_case(p, up, CaseKind::DontCareZ),
        Keyword(Kw::Casex) => parse_case(p, up, CaseKind::DontCareXZ),
        tkn => {
            let sp = p.peek(0).1;
            p.add_diag(
                DiagBuilder2::error(format!("expected if or case statement, found `{}`", tkn))
                    .span(sp),
            );
            Err(())
        }
    }
}

fn parse_if(p: &mut dyn AbstractParser, up: Option<UniquePriority>) -> ReportedResult<StmtData> {
    p.require_reported(Keyword(Kw::If))?;
    let cond = flanked(p, Paren, parse_expr)?;
    let main_stmt = Box::new(parse_stmt(p)?);
    let else_stmt = if p.try_eat(Keyword(Kw::Else)) {
        Some(Box::new(parse_stmt(p)?))
    } else {
        None
    };
    Ok(IfStmt {
        up: up,
        cond: cond,
        main_stmt: main_stmt,
        else_stmt: else_stmt,
    })
}

fn parse_case(
    p: &mut dyn AbstractParser,
    up: Option<UniquePriority>,
    kind: CaseKind,
) -> ReportedResult<StmtData> {
    p.bump(); // eat the case keyword
    let expr = flanked(p, Paren, parse_expr)?;

    let mut items = Vec::new();
    while !p.try_eat(Keyword(Kw::Endcase)) {
        if p.peek(0).0 == Eof || p.is_fatal() {
            let sp = p.peek(0).1;
            p.add_diag(DiagBuilder2::error("expected `endcase`").span(sp));
            return Err(());
        }
        let item = if p.try_eat(Keyword(Kw::Default)) {
            p.try_eat(Colon);
            parse_stmt(p).map(|s| CaseItem::Default(Box::new(s)))
        } else {
            comma_list_nonempty(p, Colon, "case expression", parse_expr).and_then(|exprs| {
                p.require_reported(Colon)?;
                parse_stmt(p).map(|s| CaseItem::Expr(exprs, Box::new(s)))
            })
        };
        match item {
            Ok(x) => items.push(x),
            Err(()) => p.recover_balanced(&[Keyword(Kw::Endcase)], false),
        }
    }
    Ok(CaseStmt {
        up: up,
        kind: kind,
        expr: expr,
        items: items,
    })
}

/// Try to parse a delay control as per IEEE 1800-2009 section 9.4.1, e.g.
/// `#42`.
fn try_delay_control(p: &mut dyn AbstractParser) -> ReportedResult<Option<DelayControl>> {
    // A `##` introduces a cycle delay, and a `#` followed by `0` after an
    // assertion keyword never reaches this function, so a lone `#` is
    // reliably a delay control.
    if p.peek(0).0 != Hashtag {
        return Ok(None);
    }
    let mut span = p.peek(0).1;
    p.bump();
    let expr = parse_delay_value(p)?;
    span.expand(p.last_span());
    Ok(Some(DelayControl {
        span: span,
        expr: expr,
    }))
}

/// Parse the value of a delay: a literal, an identifier, or a parenthesized
/// (min:typ:max) expression.
fn parse_delay_value(p: &mut dyn AbstractParser) -> ReportedResult<Expr> {
    let (tkn, sp) = p.peek(0);
    match tkn {
        Literal(lit) => {
            p.bump();
            Ok(Expr::new(sp, LiteralExpr(lit)))
        }
        Ident(n) | EscIdent(n) => {
            p.bump();
            Ok(Expr::new(
                sp,
                IdentExpr(Identifier {
                    span: sp,
                    name: n,
                }),
            ))
        }
        OpenDelim(Paren) => {
            p.bump();
            let expr = match parse_primary_parenthesis(p) {
                Ok(x) => x,
                Err(e) => {
                    p.recover_balanced(&[CloseDelim(Paren)], true);
                    return Err(e);
                }
            };
            p.require_reported(CloseDelim(Paren))?;
            Ok(expr)
        }
        _ => {
            p.add_diag(
                DiagBuilder2::error(format!("expected delay value, found `{}`", tkn)).span(sp),
            );
            Err(())
        }
    }
}

/// Try to parse an event control as per IEEE 1800-2009 section 9.4.2, e.g.
/// `@(posedge clk)`.
fn try_event_control(p: &mut dyn AbstractParser) -> ReportedResult<Option<EventControl>> {
    if p.peek(0).0 != At {
        return Ok(None);
    }
    let mut span = p.peek(0).1;
    p.bump();

    // The implicit events `@*` and `@(*)`.
    if p.try_eat(Operator(Op::Mul)) {
        span.expand(p.last_span());
        return Ok(Some(EventControl {
            span: span,
            data: EventControlData::Implicit,
        }));
    }
    if p.peek(0).0 == OpenDelim(Paren)
        && p.peek(1).0 == Operator(Op::Mul)
        && p.peek(2).0 == CloseDelim(Paren)
    {
        p.bump();
        p.bump();
        p.bump();
        span.expand(p.last_span());
        return Ok(Some(EventControl {
            span: span,
            data: EventControlData::Implicit,
        }));
    }

    // An explicit event expression, parenthesized or not.
    let expr = if p.peek(0).0 == OpenDelim(Paren) {
        flanked(p, Paren, |p| parse_event_expr(p, EventPrecedence::Min))?
    } else {
        parse_event_expr(p, EventPrecedence::Unary)?
    };
    span.expand(p.last_span());
    Ok(Some(EventControl {
        span: span,
        data: EventControlData::Expr(expr),
    }))
}

/// Try to parse a cycle delay, e.g. `##3`.
fn try_cycle_delay(p: &mut dyn AbstractParser) -> ReportedResult<Option<CycleDelay>> {
    if p.peek(0).0 != DoubleHashtag {
        return Ok(None);
    }
    let mut span = p.peek(0).1;
    p.bump();
    let expr = parse_delay_value(p)?;
    span.expand(p.last_span());
    Ok(Some(CycleDelay {
        span: span,
        expr: expr,
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EventPrecedence {
    Min,
    Iff,
    Unary,
}

fn parse_event_expr(
    p: &mut dyn AbstractParser,
    precedence: EventPrecedence,
) -> ReportedResult<EventExpr> {
    let mut span = p.peek(0).1;

    // Parse the optional edge identifier and the value expression.
    let edge = as_edge_ident(p.peek(0).0);
    if edge != EdgeIdent::Implicit {
        p.bump();
    }
    let value = parse_expr_prec(p, Precedence::Unary)?;
    span.expand(p.last_span());
    let expr = EventExpr::Edge {
        span: span,
        edge: edge,
        value: value,
    };
    parse_event_expr_suffix(p, expr, precedence)
}

fn parse_event_expr_suffix(
    p: &mut dyn AbstractParser,
    prefix: EventExpr,
    precedence: EventPrecedence,
) -> ReportedResult<EventExpr> {
    match p.peek(0).0 {
        // event_expr "iff" expr
        Keyword(Kw::Iff) if precedence < EventPrecedence::Iff => {
            p.bump();
            let cond = parse_expr_prec(p, Precedence::Unary)?;
            let span = Span::union(prefix.span(), p.last_span());
            parse_event_expr_suffix(
                p,
                EventExpr::Iff {
                    span: span,
                    expr: Box::new(prefix),
                    cond: cond,
                },
                precedence,
            )
        }

        // event_expr "or" event_expr
        // event_expr "," event_expr
        Keyword(Kw::Or) | Comma if precedence == EventPrecedence::Min => {
            p.bump();
            let rhs = parse_event_expr(p, EventPrecedence::Min)?;
            let span = Span::union(prefix.span(), rhs.span());
            Ok(EventExpr::Or {
                span: span,
                lhs: Box::new(prefix),
                rhs: Box::new(rhs),
            })
        }

        _ => Ok(prefix),
    }
}

fn as_edge_ident(tkn: Token) -> EdgeIdent {
    match tkn {
        Keyword(Kw::Edge) => EdgeIdent::Edge,
        Keyword(Kw::Posedge) => EdgeIdent::Posedge,
        Keyword(Kw::Negedge) => EdgeIdent::Negedge,
        _ => EdgeIdent::Implicit,
    }
}

fn parse_expr(p: &mut dyn AbstractParser) -> ReportedResult<Expr> {
    parse_expr_prec(p, Precedence::Min)
}

fn parse_expr_prec(
    p: &mut dyn AbstractParser,
    precedence: Precedence,
) -> ReportedResult<Expr> {
    // Try to parse a cast or pattern expression, which starts with an
    // explicit type, followed by an apostrophe.
    {
        let mut bp = BranchParser::new(p);
        let mut span = bp.peek(0).1;
        let ty = parse_explicit_type(&mut bp);
        match (ty, bp.peek(0).0, bp.peek(1).0) {
            // type `'` `(` ...
            (Ok(ty), Apostrophe, OpenDelim(Paren)) => {
                bp.commit();
                p.require_reported(Apostrophe)?;
                let expr = flanked(p, Paren, parse_expr)?;
                span.expand(p.last_span());
                let cast = Expr::new(span, CastExpr(ty, Box::new(expr)));
                return parse_expr_suffix(p, cast, precedence);
            }
            // type `'` `{` ...
            (Ok(ty), Apostrophe, OpenDelim(Brace)) => {
                bp.commit();
                // Don't consume the apostrophe -- it's part of the pattern.
                let expr = parse_expr(p)?;
                span.expand(p.last_span());
                let cast = Expr::new(span, CastExpr(ty, Box::new(expr)));
                return parse_expr_suffix(p, cast, precedence);
            }
            _ => (),
        }
    }

    // Try to parse a sign cast expression, which starts with a `signed` or
    // `unsigned` keyword.
    if let Some(sign) = try_signing(p) {
        let mut span = p.last_span();
        let sign = Spanned::new(sign, span);
        p.require_reported(Apostrophe)?;
        let expr = flanked(p, Paren, parse_expr)?;
        span.expand(p.last_span());
        let cast = Expr::new(span, CastSignExpr(sign, Box::new(expr)));
        return parse_expr_suffix(p, cast, precedence);
    }

    // Otherwise treat this as a normal expression.
    let prefix = parse_expr_first(p, precedence)?;
    parse_expr_suffix(p, prefix, precedence)
}

fn parse_expr_suffix(
    p: &mut dyn AbstractParser,
    prefix: Expr,
    precedence: Precedence,
) -> ReportedResult<Expr> {
    // Try to parse the index and call expressions.
    let (tkn, _) = p.peek(0);
    match tkn {
        // Index: "[" range_expression "]"
        OpenDelim(Brack) if precedence <= Precedence::Postfix => {
            p.bump();
            let expr = match parse_range_expr(p) {
                Ok(x) => x,
                Err(e) => {
                    p.recover_balanced(&[CloseDelim(Brack)], true);
                    return Err(e);
                }
            };
            p.require_reported(CloseDelim(Brack))?;
            let expr = Expr::new(
                Span::union(prefix.span, p.last_span()),
                IndexExpr {
                    indexee: Box::new(prefix),
                    index: Box::new(expr),
                },
            );
            return parse_expr_suffix(p, expr, precedence);
        }

        // Call: "(" [list_of_arguments] ")"
        OpenDelim(Paren) if precedence <= Precedence::Postfix => {
            let args = flanked(p, Paren, parse_call_args)?;
            let expr = Expr::new(
                Span::union(prefix.span, p.last_span()),
                CallExpr(Box::new(prefix), args),
            );
            return parse_expr_suffix(p, expr, precedence);
        }

        // expr "." ident
        Period if precedence <= Precedence::Scope => {
            p.bump();
            let (name, name_span) = p.eat_ident("member name")?;
            let expr = Expr::new(
                Span::union(prefix.span, p.last_span()),
                MemberExpr {
                    expr: Box::new(prefix),
                    name: Identifier {
                        span: name_span,
                        name: name,
                    },
                },
            );
            return parse_expr_suffix(p, expr, precedence);
        }

        // expr "::" ident
        Namespace if precedence <= Precedence::Scope => {
            p.bump();
            let ident = parse_identifier(p, "scope name")?;
            let expr = Expr::new(
                Span::union(prefix.span, p.last_span()),
                ScopeExpr(Box::new(prefix), ident),
            );
            return parse_expr_suffix(p, expr, precedence);
        }

        // expr "++" and expr "--"
        Operator(Op::Inc) if precedence <= Precedence::Unary => {
            p.bump();
            let expr = Expr::new(
                Span::union(prefix.span, p.last_span()),
                UnaryExpr {
                    op: Op::Inc,
                    expr: Box::new(prefix),
                    postfix: true,
                },
            );
            return parse_expr_suffix(p, expr, precedence);
        }
        Operator(Op::Dec) if precedence <= Precedence::Unary => {
            p.bump();
            let expr = Expr::new(
                Span::union(prefix.span, p.last_span()),
                UnaryExpr {
                    op: Op::Dec,
                    expr: Box::new(prefix),
                    postfix: true,
                },
            );
            return parse_expr_suffix(p, expr, precedence);
        }

        // expr "?" expr ":" expr
        //
        // The false branch recurses one level below the ternary itself,
        // which makes the operator right-associative.
        Ternary if precedence < Precedence::Ternary => {
            p.bump();
            let true_expr = parse_expr_prec(p, Precedence::Ternary)?;
            p.require_reported(Colon)?;
            let false_expr = parse_expr_prec(p, Precedence::Implication)?;
            let expr = Expr::new(
                Span::union(prefix.span, p.last_span()),
                TernaryExpr {
                    cond: Box::new(prefix),
                    true_expr: Box::new(true_expr),
                    false_expr: Box::new(false_expr),
                },
            );
            return parse_expr_suffix(p, expr, precedence);
        }

        // expr "inside" "{" open_range_list "}"
        Keyword(Kw::Inside) if precedence <= Precedence::Relational => {
            p.bump();
            let set = flanked(p, Brace, |p| {
                comma_list_nonempty(p, CloseDelim(Brace), "range", |p| {
                    if p.peek(0).0 == OpenDelim(Brack) {
                        p.require_reported(OpenDelim(Brack))?;
                        let mut sp = p.last_span();
                        let lo = parse_expr(p)?;
                        p.require_reported(Colon)?;
                        let hi = parse_expr(p)?;
                        p.require_reported(CloseDelim(Brack))?;
                        sp.expand(p.last_span());
                        Ok(ValueRange::Range {
                            lo: lo,
                            hi: hi,
                            span: sp,
                        })
                    } else {
                        Ok(ValueRange::Single(parse_expr(p)?))
                    }
                })
            })?;
            let expr = Expr::new(
                Span::union(prefix.span, p.last_span()),
                InsideExpr(Box::new(prefix), set),
            );
            return parse_expr_suffix(p, expr, precedence);
        }

        // expr "'" "(" expr ")"
        Apostrophe if precedence <= Precedence::Postfix => {
            p.bump();
            let inner = flanked(p, Paren, |p| parse_expr(p))?;
            let expr = Expr::new(
                Span::union(prefix.span, p.last_span()),
                CastSizeExpr(Box::new(prefix), Box::new(inner)),
            );
            return parse_expr_suffix(p, expr, precedence);
        }
        _ => (),
    }

    // Try assign operators.
    if let Some(op) = as_assign_operator(tkn) {
        if precedence <= Precedence::Assignment {
            p.bump();
            let rhs = parse_expr_prec(p, Precedence::Assignment)?;
            let expr = Expr::new(
                Span::union(prefix.span, p.last_span()),
                AssignExpr {
                    op: op,
                    lhs: Box::new(prefix),
                    rhs: Box::new(rhs),
                },
            );
            return parse_expr_suffix(p, expr, precedence);
        }
    }

    // Try to parse binary operations.
    if let Some(op) = as_binary_operator(tkn) {
        let prec = op.get_precedence();
        if precedence < prec {
            p.bump();
            let rhs = parse_expr_prec(p, rhs_precedence(op))?;
            let expr = Expr::new(
                Span::union(prefix.span, p.last_span()),
                BinaryExpr {
                    op: op,
                    lhs: Box::new(prefix),
                    rhs: Box::new(rhs),
                },
            );
            return parse_expr_suffix(p, expr, precedence);
        }
    }

    Ok(prefix)
}

/// The precedence to parse the right hand side of a binary operator at.
/// Right-associative operators recurse one level below their own precedence.
fn rhs_precedence(op: Op) -> Precedence {
    match op {
        Op::Pow => Precedence::Multiplicative,
        Op::LogicImpl | Op::LogicEquiv => Precedence::Assignment,
        other => other.get_precedence(),
    }
}

fn parse_expr_first(
    p: &mut dyn AbstractParser,
    precedence: Precedence,
) -> ReportedResult<Expr> {
    let first = p.peek(0).1;

    // Certain expressions are introduced by an operator or keyword. Handle
    // these cases first, since they are the quickest to decide.
    match p.peek(0) {
        (Operator(Op::Inc), _) if precedence <= Precedence::Unary => {
            p.bump();
            let expr = parse_expr_prec(p, Precedence::Unary)?;
            return Ok(Expr::new(
                Span::union(first, p.last_span()),
                UnaryExpr {
                    op: Op::Inc,
                    expr: Box::new(expr),
                    postfix: false,
                },
            ));
        }

        (Operator(Op::Dec), _) if precedence <= Precedence::Unary => {
            p.bump();
            let expr = parse_expr_prec(p, Precedence::Unary)?;
            return Ok(Expr::new(
                Span::union(first, p.last_span()),
                UnaryExpr {
                    op: Op::Dec,
                    expr: Box::new(expr),
                    postfix: false,
                },
            ));
        }

        (Keyword(Kw::Tagged), sp) => {
            p.add_diag(DiagBuilder2::error("tagged union expressions not supported").span(sp));
            return Err(());
        }

        _ => (),
    }

    // Try the unary operators next.
    if let Some(op) = as_unary_operator(p.peek(0).0) {
        p.bump();
        let expr = parse_expr_prec(p, Precedence::Unary)?;
        return Ok(Expr::new(
            Span::union(first, p.last_span()),
            UnaryExpr {
                op: op,
                expr: Box::new(expr),
                postfix: false,
            },
        ));
    }

    // Since none of the above matched, this must be a primary expression.
    parse_primary_expr(p)
}

fn parse_primary_expr(p: &mut dyn AbstractParser) -> ReportedResult<Expr> {
    let (tkn, sp) = p.peek(0);
    match tkn {
        // Primary literals
        Literal(lit) => {
            p.bump();
            Ok(Expr::new(sp, LiteralExpr(lit)))
        }

        // Identifiers
        Ident(n) | EscIdent(n) => {
            p.bump();
            Ok(Expr::new(
                sp,
                IdentExpr(Identifier {
                    span: sp,
                    name: n,
                }),
            ))
        }
        SysIdent(n) => {
            p.bump();
            Ok(Expr::new(
                sp,
                SysIdentExpr(Identifier {
                    span: sp,
                    name: n,
                }),
            ))
        }

        // Concatenation and empty queue
        OpenDelim(Brace) => {
            p.bump();
            if p.try_eat(CloseDelim(Brace)) {
                return Ok(Expr::new(Span::union(sp, p.last_span()), EmptyQueueExpr));
            }
            let data = match parse_concat_expr(p) {
                Ok(x) => x,
                Err(e) => {
                    p.recover_balanced(&[CloseDelim(Brace)], true);
                    return Err(e);
                }
            };
            p.require_reported(CloseDelim(Brace))?;
            Ok(Expr::new(Span::union(sp, p.last_span()), data))
        }

        // Parenthesis
        OpenDelim(Paren) => {
            p.bump();
            let expr = match parse_primary_parenthesis(p) {
                Ok(x) => x,
                Err(e) => {
                    p.recover_balanced(&[CloseDelim(Paren)], true);
                    return Err(e);
                }
            };
            p.require_reported(CloseDelim(Paren))?;
            Ok(expr)
        }

        // Patterns
        Apostrophe => {
            p.bump();
            let fields = flanked(p, Brace, |p| {
                comma_list_nonempty(p, CloseDelim(Brace), "pattern field", parse_pattern_field)
            })?;
            Ok(Expr::new(
                Span::union(sp, p.last_span()),
                PatternExpr(fields),
            ))
        }

        tkn => {
            p.add_diag(
                DiagBuilder2::error(format!("expected expression, found `{}` instead", tkn))
                    .span(sp),
            );
            Err(())
        }
    }
}

fn parse_pattern_field(p: &mut dyn AbstractParser) -> ReportedResult<PatternField> {
    let mut span = p.peek(0).1;

    // Handle the trivial case of the "default" pattern.
    if p.try_eat(Keyword(Kw::Default)) {
        p.require_reported(Colon)?;
        let value = Box::new(parse_expr(p)?);
        span.expand(p.last_span());
        return Ok(PatternField {
            span: span,
            data: PatternFieldData::Default(value),
        });
    }

    // Otherwise handle the non-trivial cases.
    let mut pp = ParallelParser::new();

    // Expression patterns, of the form `expr ":" ...`.
    pp.add_greedy("expression pattern", |p| {
        let expr = Box::new(parse_expr(p)?);
        p.require_reported(Colon)?;
        let value = Box::new(parse_expr(p)?);
        Ok(PatternFieldData::Member(expr, value))
    });

    // Type patterns, of the form `type ":" ...`.
    pp.add_greedy("type pattern", |p| {
        let ty = parse_explicit_type(p)?;
        p.require_reported(Colon)?;
        let value = Box::new(parse_expr(p)?);
        Ok(PatternFieldData::Type(ty, value))
    });

    // Pattern fields that start with an expression: either a simple
    // expression pattern or a repeat pattern.
    pp.add("expression or repeat pattern", |p| {
        let expr = Box::new(parse_expr(p)?);
        let data = if let Some(inner_exprs) = try_flanked(p, Brace, |p| {
            comma_list(p, CloseDelim(Brace), "expression", parse_expr)
        })? {
            PatternFieldData::Repeat(expr, inner_exprs)
        } else {
            PatternFieldData::Expr(expr)
        };
        // Make sure this covers the whole pattern field.
        p.anticipate(&[Comma, CloseDelim(Brace)])?;
        Ok(data)
    });

    let data = pp.finish(p, "pattern field")?;
    span.expand(p.last_span());
    Ok(PatternField {
        span: span,
        data: data,
    })
}

/// Parse the interior of a concatenation `{...}`. The opening brace has been
/// consumed; the caller eats the closing brace.
fn parse_concat_expr(p: &mut dyn AbstractParser) -> ReportedResult<ExprData> {
    let first = parse_expr(p)?;

    // A nested brace list makes this a multiple concatenation, with the
    // first expression as the repeat count.
    if p.peek(0).0 == OpenDelim(Brace) {
        let exprs = flanked(p, Brace, parse_expr_list)?;
        return Ok(ConcatExpr {
            repeat: Some(Box::new(first)),
            exprs: exprs,
        });
    }

    let mut exprs = vec![first];
    while p.try_eat(Comma) {
        if p.peek(0).0 == CloseDelim(Brace) {
            let q = p.last_span();
            p.add_diag(DiagBuilder2::warning("superfluous trailing comma").span(q));
            break;
        }
        exprs.push(parse_expr(p)?);
    }
    Ok(ConcatExpr {
        repeat: None,
        exprs: exprs,
    })
}

fn parse_expr_list(p: &mut dyn AbstractParser) -> ReportedResult<Vec<Expr>> {
    comma_list_nonempty(p, CloseDelim(Brace), "expression", parse_expr)
}

/// Parse the interior of a parenthesized primary. The opening parenthesis
/// has been consumed; the caller eats the closing one. A colon after the
/// expression turns it into a min:typ:max expression.
fn parse_primary_parenthesis(p: &mut dyn AbstractParser) -> ReportedResult<Expr> {
    let mut span = p.peek(0).1;
    let expr = parse_expr(p)?;
    if p.try_eat(Colon) {
        let typ = parse_expr(p)?;
        p.require_reported(Colon)?;
        let max = parse_expr(p)?;
        span.expand(p.last_span());
        return Ok(Expr::new(
            span,
            MinTypMaxExpr(Box::new(expr), Box::new(typ), Box::new(max)),
        ));
    }
    Ok(expr)
}

/// Parse the interior of an index access `[...]`: either a plain expression
/// or a `lo:hi`, `base+:width`, or `base-:width` range.
fn parse_range_expr(p: &mut dyn AbstractParser) -> ReportedResult<Expr> {
    let mut span = p.peek(0).1;
    let expr = parse_expr(p)?;
    let mode = match p.peek(0).0 {
        Colon => RangeMode::Absolute,
        AddColon => RangeMode::RelativeUp,
        SubColon => RangeMode::RelativeDown,
        _ => return Ok(expr),
    };
    p.bump();
    let rhs = parse_expr(p)?;
    span.expand(p.last_span());
    Ok(Expr::new(
        span,
        RangeExpr {
            mode: mode,
            lhs: Box::new(expr),
            rhs: Box::new(rhs),
        },
    ))
}

/// Parse the arguments of a call expression as per IEEE 1800-2009 section
/// 13.5: positional, named, and empty arguments.
fn parse_call_args(p: &mut dyn AbstractParser) -> ReportedResult<Vec<CallArg>> {
    let mut v = Vec::new();
    if p.peek(0).0 == CloseDelim(Paren) {
        return Ok(v);
    }
    loop {
        let mut span = p.peek(0).1;
        match p.peek(0).0 {
            // An empty positional argument.
            Comma | CloseDelim(Paren) => {
                span.end = span.begin;
                v.push(CallArg {
                    span: span,
                    name_span: span,
                    name: None,
                    expr: None,
                });
            }

            // A named argument, `.name(expr)` or `.name()`.
            Period => {
                p.bump();
                let (name, name_span) = p.eat_ident("argument name")?;
                let expr = flanked(p, Paren, |p| {
                    if p.peek(0).0 == CloseDelim(Paren) {
                        Ok(None)
                    } else {
                        parse_expr(p).map(Some)
                    }
                })?;
                span.expand(p.last_span());
                v.push(CallArg {
                    span: span,
                    name_span: name_span,
                    name: Some(name),
                    expr: expr,
                });
            }

            // A positional argument.
            _ => {
                let expr = parse_expr(p)?;
                span.expand(p.last_span());
                v.push(CallArg {
                    span: span,
                    name_span: span,
                    name: None,
                    expr: Some(expr),
                });
            }
        }
        if !p.try_eat(Comma) {
            break;
        }
    }
    p.anticipate(&[CloseDelim(Paren)])?;
    Ok(v)
}

fn as_unary_operator(tkn: Token) -> Option<Op> {
    match tkn {
        Operator(op) => match op {
            Op::Add
            | Op::Sub
            | Op::LogicNot
            | Op::BitNot
            | Op::BitAnd
            | Op::BitNand
            | Op::BitOr
            | Op::BitNor
            | Op::BitXor
            | Op::BitXnor
            | Op::BitNxor => Some(op),
            _ => None,
        },
        _ => None,
    }
}

fn as_binary_operator(tkn: Token) -> Option<Op> {
    match tkn {
        Operator(op) => match op {
            Op::Add
            | Op::Sub
            | Op::Mul
            | Op::Div
            | Op::Mod
            | Op::Pow
            | Op::LogicEq
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
            | Op::LogicEquiv
            | Op::BitAnd
            | Op::BitNand
            | Op::BitOr
            | Op::BitNor
            | Op::BitXor
            | Op::BitXnor
            | Op::BitNxor
            | Op::LogicShL
            | Op::LogicShR
            | Op::ArithShL
            | Op::ArithShR => Some(op),
            _ => None,
        },
        _ => None,
    }
}

fn as_assign_operator(tkn: Token) -> Option<AssignOp> {
    match tkn {
        Operator(Op::Assign) => Some(AssignOp::Identity),
        Operator(Op::AssignAdd) => Some(AssignOp::Add),
        Operator(Op::AssignSub) => Some(AssignOp::Sub),
        Operator(Op::AssignMul) => Some(AssignOp::Mul),
        Operator(Op::AssignDiv) => Some(AssignOp::Div),
        Operator(Op::AssignMod) => Some(AssignOp::Mod),
        Operator(Op::AssignBitAnd) => Some(AssignOp::BitAnd),
        Operator(Op::AssignBitOr) => Some(AssignOp::BitOr),
        Operator(Op::AssignBitXor) => Some(AssignOp::BitXor),
        Operator(Op::AssignLogicShL) => Some(AssignOp::LogicShL),
        Operator(Op::AssignLogicShR) => Some(AssignOp::LogicShR),
        Operator(Op::AssignArithShL) => Some(AssignOp::ArithShL),
        Operator(Op::AssignArithShR) => Some(AssignOp::ArithShR),
        _ => None,
    }
}

// The disambiguation routines below operate in a speculative-lookahead mode
// over the peek buffer: a virtual cursor is advanced over the upcoming
// tokens without ever mutating the real stream. When a rule cannot decide,
// it errs on the side of the more permissive production.

/// Scan a qualified name, i.e. an identifier optionally followed by `::`
/// segments, advancing `idx` past it. Returns false if no name is present.
fn scan_qualified_name(p: &mut dyn AbstractParser, idx: &mut usize) -> bool {
    match p.peek(*idx).0 {
        Ident(_) | EscIdent(_) => *idx += 1,
        _ => return false,
    }
    loop {
        match (p.peek(*idx).0, p.peek(*idx + 1).0) {
            (Namespace, Ident(_)) | (Namespace, EscIdent(_)) => *idx += 2,
            _ => return true,
        }
    }
}

/// Scan a list of `[...]` dimensions, advancing `idx` past it. Returns false
/// if a bracket is left unbalanced before the end of input.
fn scan_dimension_list(p: &mut dyn AbstractParser, idx: &mut usize) -> bool {
    while p.peek(*idx).0 == OpenDelim(Brack) {
        let mut depth = 0usize;
        loop {
            match p.peek(*idx).0 {
                OpenDelim(Brack) => depth += 1,
                CloseDelim(Brack) => {
                    depth -= 1;
                    if depth == 0 {
                        *idx += 1;
                        break;
                    }
                }
                Eof => return false,
                _ => (),
            }
            *idx += 1;
        }
    }
    true
}

/// Scan a balanced parenthesized region starting at `idx`, advancing `idx`
/// past the closing parenthesis.
fn scan_balanced_parens(p: &mut dyn AbstractParser, idx: &mut usize) -> bool {
    if p.peek(*idx).0 != OpenDelim(Paren) {
        return false;
    }
    let mut depth = 0usize;
    loop {
        match p.peek(*idx).0 {
            OpenDelim(Paren) => depth += 1,
            CloseDelim(Paren) => {
                depth -= 1;
                if depth == 0 {
                    *idx += 1;
                    return true;
                }
            }
            Eof => return false,
            _ => (),
        }
        *idx += 1;
    }
}

/// Whether the upcoming tokens form a hierarchy instantiation: a module
/// name, an optional parameter value assignment, and an instance name with
/// optional dimensions followed by a parenthesis.
fn is_hierarchy_instantiation(p: &mut dyn AbstractParser) -> bool {
    let mut idx = 0;
    if !scan_qualified_name(p, &mut idx) {
        return false;
    }
    if p.peek(idx).0 == Hashtag {
        idx += 1;
        if !scan_balanced_parens(p, &mut idx) {
            return false;
        }
    }
    match p.peek(idx).0 {
        Ident(_) | EscIdent(_) => idx += 1,
        _ => return false,
    }
    if !scan_dimension_list(p, &mut idx) {
        return false;
    }
    p.peek(idx).0 == OpenDelim(Paren)
}

/// Whether the upcoming tokens form a net declaration, which always leads
/// with a net type keyword.
fn is_net_declaration(p: &mut dyn AbstractParser) -> bool {
    match p.peek(0).0 {
        Keyword(kw) => NetType::from_keyword(kw).is_some(),
        _ => false,
    }
}

/// Whether the upcoming tokens form a variable declaration: a declaration
/// keyword, a builtin type, or a (possibly dimensioned) named type followed
/// by a declared name.
fn is_variable_declaration(p: &mut dyn AbstractParser) -> bool {
    match p.peek(0).0 {
        Keyword(Kw::Var)
        | Keyword(Kw::Const)
        | Keyword(Kw::Static)
        | Keyword(Kw::Automatic)
        | Keyword(Kw::Bit)
        | Keyword(Kw::Logic)
        | Keyword(Kw::Reg)
        | Keyword(Kw::Byte)
        | Keyword(Kw::Shortint)
        | Keyword(Kw::Int)
        | Keyword(Kw::Longint)
        | Keyword(Kw::Integer)
        | Keyword(Kw::Time)
        | Keyword(Kw::String)
        | Keyword(Kw::Event)
        | Keyword(Kw::Enum)
        | Keyword(Kw::Struct) => return true,
        _ => (),
    }
    let mut idx = 0;
    if !scan_qualified_name(p, &mut idx) {
        return false;
    }
    if !scan_dimension_list(p, &mut idx) {
        return false;
    }
    match p.peek(idx).0 {
        Ident(_) | EscIdent(_) => p.peek(idx + 1).0 != OpenDelim(Paren),
        _ => false,
    }
}

/// Whether the next port in a port list is a plain non-ANSI port name.
fn is_plain_port_name(p: &mut dyn AbstractParser) -> bool {
    match p.peek(0).0 {
        Ident(_) | EscIdent(_) => (),
        _ => return false,
    }
    match p.peek(1).0 {
        Comma | CloseDelim(Paren) | OpenDelim(Brack) => true,
        _ => false,
    }
}

/// Whether the next port is given in the non-ANSI style, naming an internal
/// signal without declaring it.
fn is_non_ansi_port(p: &mut dyn AbstractParser) -> bool {
    is_plain_port_name(p) || p.peek(0).0 == OpenDelim(Brace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preproc::Preprocessor;
    use std::cell::Cell;

    fn with_parser<F, R>(input: &str, f: F) -> R
    where
        F: FnOnce(Lexer, &DiagCollector) -> R,
    {
        thread_local!(static INDEX: Cell<usize> = Cell::new(0));
        let sm = get_source_manager();
        let idx = INDEX.with(|i| {
            let v = i.get();
            i.set(v + 1);
            v
        });
        let source = sm.add(&format!("parser_{}.sv", idx), input);
        let pp = Preprocessor::new(source, &[], &[]);
        let lexer = Lexer::new(pp);
        let coll = DiagCollector::new();
        f(lexer, &coll)
    }

    fn parse_clean(input: &str) -> Root {
        with_parser(input, |lexer, coll| {
            let root = parse(lexer, coll);
            let worst = coll.severity();
            assert!(
                worst.map(|s| s < Severity::Error).unwrap_or(true),
                "unexpected diagnostics: {:?}",
                coll.diags
                    .borrow()
                    .iter()
                    .map(|d| d.get_message().clone())
                    .collect::<Vec<_>>()
            );
            root
        })
    }

    fn parse_stmt_clean(input: &str) -> Stmt {
        with_parser(input, |lexer, coll| {
            let stmt = parse_statement(lexer, coll);
            assert!(
                coll.severity().map(|s| s < Severity::Error).unwrap_or(true),
                "unexpected diagnostics: {:?}",
                coll.diags
                    .borrow()
                    .iter()
                    .map(|d| d.get_message().clone())
                    .collect::<Vec<_>>()
            );
            stmt
        })
    }

    fn parse_expr_clean(input: &str) -> Expr {
        with_parser(input, |lexer, coll| {
            let expr = parse_expression(lexer, coll);
            assert!(coll.is_empty(), "unexpected diagnostics");
            expr
        })
    }

    #[test]
    fn module_decl() {
        let root = parse_clean("module A; endmodule");
        assert_eq!(root.items.len(), 1);
        match root.items[0] {
            Item::ModuleDecl(ref m) => {
                assert_eq!(&*m.name.as_str(), "A");
                assert_eq!(m.name_span.extract(), "A");
                assert!(m.items.is_empty());
            }
            ref other => panic!("expected module declaration, got {:?}", other),
        }
    }

    #[test]
    fn hierarchy_instantiation() {
        let root =
            parse_clean("module A; Leaf l(); endmodule\nmodule Leaf(); endmodule");
        assert_eq!(root.items.len(), 2);
        let module = match root.items[0] {
            Item::ModuleDecl(ref m) => m,
            ref other => panic!("expected module declaration, got {:?}", other),
        };
        assert_eq!(module.items.len(), 1);
        match module.items[0] {
            Item::Inst(ref inst) => {
                assert_eq!(&*inst.target.name.as_str(), "Leaf");
                assert_eq!(inst.names.len(), 1);
                assert_eq!(&*inst.names[0].name.name.as_str(), "l");
                assert!(inst.names[0].conns.is_empty());
            }
            ref other => panic!("expected instantiation, got {:?}", other),
        }
    }

    #[test]
    fn instantiation_with_connections_and_params() {
        let root = parse_clean(
            "module A; Leaf #(.WIDTH(8)) l(.clk(clk), .out(), .*, data); endmodule",
        );
        let module = match root.items[0] {
            Item::ModuleDecl(ref m) => m,
            _ => unreachable!(),
        };
        let inst = match module.items[0] {
            Item::Inst(ref i) => i,
            ref other => panic!("expected instantiation, got {:?}", other),
        };
        assert_eq!(inst.params.len(), 1);
        assert_eq!(inst.names[0].conns.len(), 4);
        match inst.names[0].conns[2].kind {
            PortConnKind::Auto => (),
            ref other => panic!("expected wildcard connection, got {:?}", other),
        }
    }

    /// An immediate assertion with an else action block, parsed as a
    /// statement.
    #[test]
    fn immediate_assertion_stmt() {
        let stmt = parse_stmt_clean("assert (a == b) else $error(\"nope\");");
        let assertion = match stmt.data {
            AssertionStmt(ref a) => a,
            ref other => panic!("expected assertion statement, got {:?}", other),
        };
        match assertion.data {
            AssertionData::Immediate(BlockingAssertion::Assert(ref expr, ref action)) => {
                match expr.data {
                    BinaryExpr { op: Op::LogicEq, .. } => (),
                    ref other => panic!("expected equality expression, got {:?}", other),
                }
                match *action {
                    AssertionActionBlock::Negative(ref s) => match s.data {
                        ExprStmt(ref e) => match e.data {
                            CallExpr(..) => (),
                            ref other => panic!("expected call, got {:?}", other),
                        },
                        ref other => panic!("expected expression statement, got {:?}", other),
                    },
                    ref other => panic!("expected negative action block, got {:?}", other),
                }
            }
            ref other => panic!("expected immediate assert, got {:?}", other),
        }
    }

    #[test]
    fn deferred_assertion() {
        let stmt = parse_stmt_clean("assert final (x) $display(\"ok\");");
        match stmt.data {
            AssertionStmt(ref a) => match a.data {
                AssertionData::Deferred(AssertionDeferred::Final, _) => (),
                ref other => panic!("expected deferred assertion, got {:?}", other),
            },
            ref other => panic!("expected assertion statement, got {:?}", other),
        }
    }

    #[test]
    fn precedence_mul_over_add() {
        let expr = parse_expr_clean("1 + 2 * 3");
        match expr.data {
            BinaryExpr {
                op: Op::Add,
                ref rhs,
                ..
            } => match rhs.data {
                BinaryExpr { op: Op::Mul, .. } => (),
                ref other => panic!("expected multiplication on the right, got {:?}", other),
            },
            ref other => panic!("expected addition at the top, got {:?}", other),
        }
    }

    #[test]
    fn ternary_right_associative() {
        let expr = parse_expr_clean("a ? b : c ? d : e");
        match expr.data {
            TernaryExpr { ref false_expr, .. } => match false_expr.data {
                TernaryExpr { .. } => (),
                ref other => panic!("expected nested ternary, got {:?}", other),
            },
            ref other => panic!("expected ternary, got {:?}", other),
        }
    }

    #[test]
    fn nonblocking_assignment() {
        let stmt = parse_stmt_clean("q <= d;");
        match stmt.data {
            AssignStmt {
                kind: AssignKind::Nonblock,
                ..
            } => (),
            ref other => panic!("expected nonblocking assignment, got {:?}", other),
        }
    }

    #[test]
    fn timed_statement() {
        let stmt = parse_stmt_clean("@(posedge clk) q <= d;");
        match stmt.data {
            TimedStmt(TimingControl::Event(_), ref inner) => match inner.data {
                AssignStmt { .. } => (),
                ref other => panic!("expected assignment, got {:?}", other),
            },
            ref other => panic!("expected timed statement, got {:?}", other),
        }
    }

    #[test]
    fn non_ansi_ports() {
        let root = parse_clean("module A(a, b); input a; output b; endmodule");
        let module = match root.items[0] {
            Item::ModuleDecl(ref m) => m,
            _ => unreachable!(),
        };
        assert_eq!(module.ports.len(), 2);
        for port in &module.ports {
            match *port {
                Port::Implicit(_) => (),
                ref other => panic!("expected implicit port, got {:?}", other),
            }
        }
        assert_eq!(module.items.len(), 2);
    }

    #[test]
    fn ansi_ports() {
        let root = parse_clean(
            "module B(input logic [7:0] a, output wire b, inout c); endmodule",
        );
        let module = match root.items[0] {
            Item::ModuleDecl(ref m) => m,
            _ => unreachable!(),
        };
        assert_eq!(module.ports.len(), 3);
        match module.ports[0] {
            Port::Named {
                dir: Some(PortDir::Input),
                ref ty,
                ref name,
                ..
            } => {
                assert_eq!(ty.data, LogicType);
                assert_eq!(ty.dims.len(), 1);
                assert_eq!(&*name.name.as_str(), "a");
            }
            ref other => panic!("expected named input port, got {:?}", other),
        }
        match module.ports[1] {
            Port::Named {
                dir: Some(PortDir::Output),
                kind: Some(PortKind::Net(NetType::Wire)),
                ..
            } => (),
            ref other => panic!("expected output wire port, got {:?}", other),
        }
    }

    #[test]
    fn module_with_params() {
        let root = parse_clean(
            "module Top #(parameter int foo = 4) (); Leaf l(); endmodule\nmodule Leaf(); endmodule",
        );
        let module = match root.items[0] {
            Item::ModuleDecl(ref m) => m,
            _ => unreachable!(),
        };
        assert_eq!(module.params.len(), 1);
        assert_eq!(&*module.params[0].names[0].name.name.as_str(), "foo");
        assert!(module.params[0].ty.is_some());
    }

    #[test]
    fn continuous_assign() {
        let root = parse_clean("module A; assign x = a & b, y = ~a; endmodule");
        let module = match root.items[0] {
            Item::ModuleDecl(ref m) => m,
            _ => unreachable!(),
        };
        match module.items[0] {
            Item::ContAssign(ref ca) => assert_eq!(ca.assignments.len(), 2),
            ref other => panic!("expected continuous assignment, got {:?}", other),
        }
    }

    #[test]
    fn net_and_var_decls() {
        let root = parse_clean(
            "module A; wire [7:0] x; logic y = 0; foo_t z; int i, j = 2; endmodule",
        );
        let module = match root.items[0] {
            Item::ModuleDecl(ref m) => m,
            _ => unreachable!(),
        };
        assert_eq!(module.items.len(), 4);
        match module.items[0] {
            Item::NetDecl(ref d) => {
                assert_eq!(d.net_type, NetType::Wire);
                assert_eq!(d.ty.dims.len(), 1);
            }
            ref other => panic!("expected net declaration, got {:?}", other),
        }
        match module.items[2] {
            Item::VarDecl(ref d) => match d.ty.data {
                NamedType(id) => assert_eq!(&*id.name.as_str(), "foo_t"),
                ref other => panic!("expected named type, got {:?}", other),
            },
            ref other => panic!("expected variable declaration, got {:?}", other),
        }
    }

    #[test]
    fn constraint_block() {
        let root = parse_clean(
            "class Bar;\n\
             rand int x;\n\
             constraint c {\n\
             x > 0;\n\
             soft x < 9;\n\
             x -> { x != 4; }\n\
             if (x) { x != 5; } else { x != 6; }\n\
             unique { x };\n\
             }\n\
             endclass",
        );
        let class = match root.items[0] {
            Item::ClassDecl(ref c) => c,
            ref other => panic!("expected class declaration, got {:?}", other),
        };
        assert_eq!(class.items.len(), 2);
        let constraint = match class.items[1].data {
            ClassItemData::Constraint(ref c) => c,
            ref other => panic!("expected constraint, got {:?}", other),
        };
        assert_eq!(constraint.kind, ConstraintKind::Decl);
        let kinds: Vec<_> = constraint.items.iter().map(|i| i.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                SyntaxKind::ConstraintExpr,
                SyntaxKind::ConstraintSoftExpr,
                SyntaxKind::ConstraintImplication,
                SyntaxKind::ConstraintConditional,
                SyntaxKind::ConstraintUnique,
            ]
        );
    }

    #[test]
    fn constraint_prototypes() {
        let root = parse_clean(
            "class Bar; constraint proto; extern constraint ext; endclass",
        );
        let class = match root.items[0] {
            Item::ClassDecl(ref c) => c,
            _ => unreachable!(),
        };
        match class.items[0].data {
            ClassItemData::Constraint(ref c) => assert_eq!(c.kind, ConstraintKind::Proto),
            _ => panic!("expected constraint"),
        }
        match class.items[1].data {
            ClassItemData::Constraint(ref c) => {
                assert_eq!(c.kind, ConstraintKind::ExternProto)
            }
            _ => panic!("expected constraint"),
        }
    }

    #[test]
    fn generate_for() {
        let root = parse_clean(
            "module G; genvar i; for (i = 0; i < 4; i = i + 1) begin : g wire x; end \
             endmodule",
        );
        let module = match root.items[0] {
            Item::ModuleDecl(ref m) => m,
            _ => unreachable!(),
        };
        match module.items[1] {
            Item::GenerateFor(ref gf) => {
                assert_eq!(gf.block.label, Some(get_name_table().intern("g", true)));
                assert_eq!(gf.block.items.len(), 1);
            }
            ref other => panic!("expected for-generate, got {:?}", other),
        }
    }

    #[test]
    fn package_and_import() {
        let root = parse_clean(
            "package P; typedef logic [7:0] octet_t; parameter W = 8; endpackage\n\
             module M; import P::*; endmodule",
        );
        match root.items[0] {
            Item::PackageDecl(ref pkg) => assert_eq!(pkg.items.len(), 2),
            ref other => panic!("expected package, got {:?}", other),
        }
    }

    #[test]
    fn subroutine_decl() {
        let root = parse_clean(
            "module S; function int add(int a, int b); return a + b; endfunction endmodule",
        );
        let module = match root.items[0] {
            Item::ModuleDecl(ref m) => m,
            _ => unreachable!(),
        };
        match module.items[0] {
            Item::SubroutineDecl(ref decl) => {
                assert_eq!(decl.prototype.kind, SubroutineKind::Func);
                assert_eq!(decl.prototype.args.len(), 2);
                assert_eq!(decl.stmts.len(), 1);
            }
            ref other => panic!("expected subroutine, got {:?}", other),
        }
    }

    #[test]
    fn statement_after_conditional_compilation() {
        let stmt = with_parser(
            "`ifdef FOO\nx = 1;\n`else\ny = 2;\n`endif\n",
            |lexer, coll| {
                let stmt = parse_statement(lexer, coll);
                assert!(coll.is_empty());
                stmt
            },
        );
        match stmt.data {
            AssignStmt { ref lhs, .. } => match lhs.data {
                IdentExpr(id) => assert_eq!(&*id.name.as_str(), "y"),
                ref other => panic!("expected identifier, got {:?}", other),
            },
            ref other => panic!("expected assignment, got {:?}", other),
        }
    }

    /// A parse error must produce diagnostics but still yield a root node
    /// covering the rest of the input.
    #[test]
    fn recovery_keeps_root() {
        with_parser("module A; wire x = ; endmodule\nmodule B; endmodule", |lexer, coll| {
            let root = parse(lexer, coll);
            assert!(coll.severity().map(|s| s >= Severity::Error).unwrap_or(false));
            assert_eq!(root.items.len(), 2);
            match root.items[1] {
                Item::ModuleDecl(ref m) => assert_eq!(&*m.name.as_str(), "B"),
                ref other => panic!("expected module declaration, got {:?}", other),
            }
        });
    }

    #[test]
    fn expression_entry_never_fails() {
        with_parser("+", |lexer, coll| {
            let expr = parse_expression(lexer, coll);
            assert!(!coll.is_empty());
            assert_eq!(expr.kind(), SyntaxKind::ErrorExpr);
        });
    }

    #[test]
    fn module_entry() {
        let module = with_parser("module M(input clk); endmodule", |lexer, coll| {
            let m = parse_module(lexer, coll);
            assert!(coll.is_empty());
            m
        });
        assert_eq!(&*module.name.as_str(), "M");
        assert_eq!(module.ports.len(), 1);
    }

    #[test]
    fn concat_and_index_expressions() {
        let expr = parse_expr_clean("{2{a, b}}");
        match expr.data {
            ConcatExpr {
                repeat: Some(_),
                ref exprs,
            } => assert_eq!(exprs.len(), 2),
            ref other => panic!("expected multiple concatenation, got {:?}", other),
        }
        let expr = parse_expr_clean("mem[addr+:4]");
        match expr.data {
            IndexExpr { ref index, .. } => match index.data {
                RangeExpr {
                    mode: RangeMode::RelativeUp,
                    ..
                } => (),
                ref other => panic!("expected relative range, got {:?}", other),
            },
            ref other => panic!("expected index expression, got {:?}", other),
        }
    }

    #[test]
    fn case_statement() {
        let stmt = parse_stmt_clean(
            "case (sel) 2'b00: y = a; 2'b01, 2'b10: y = b; default: y = c; endcase",
        );
        match stmt.data {
            CaseStmt { ref items, .. } => {
                assert_eq!(items.len(), 3);
                match items[1] {
                    CaseItem::Expr(ref exprs, _) => assert_eq!(exprs.len(), 2),
                    ref other => panic!("expected expression case item, got {:?}", other),
                }
            }
            ref other => panic!("expected case statement, got {:?}", other),
        }
    }
}
