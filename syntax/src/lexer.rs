// Copyright (c) 2016-2021 Fabian Schuiki

//! A lexical analyzer for SystemVerilog files, based on IEEE 1800-2009,
//! section 5. Consumes the preprocessed stream of categorized tokens and
//! assembles the primary tokens the parser operates on, attaching the
//! whitespace, comments, and preprocessor residue in between as leading
//! trivia.

use crate::cat::CatTokenKind;
use crate::number;
use crate::preproc::*;
use crate::trivia::Trivia;
pub use crate::token::*;
use sylva_common::errors::*;
use sylva_common::name::*;
use sylva_common::source::*;

type CatTokenAndSpan = (CatTokenKind, Span);
pub type TokenAndSpan = (Token, Span);

/// A lexical analyzer for SystemVerilog files.
pub struct Lexer<'a> {
    input: Preprocessor<'a>,
    peek: [CatTokenAndSpan; 4],
    /// Leading trivia accumulated for the token under construction.
    trivia: Vec<Trivia>,
    /// Diagnostics for recoverable lexical errors. The lexer degrades the
    /// affected token and continues; the caller drains these.
    diags: Vec<DiagBuilder2>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: Preprocessor<'a>) -> Lexer<'a> {
        Lexer {
            input: input,
            peek: [(CatTokenKind::Eof, INVALID_SPAN); 4],
            trivia: Vec::new(),
            diags: Vec::new(),
        }
    }

    /// Access the preprocessor driving this lexer, e.g. to query recorded
    /// directive state.
    pub fn preprocessor(&self) -> &Preprocessor<'a> {
        &self.input
    }

    /// Take the diagnostics produced for recoverable lexical errors since
    /// the last call.
    pub fn take_diagnostics(&mut self) -> Vec<DiagBuilder2> {
        std::mem::replace(&mut self.diags, Vec::new())
    }

    /// Slide the peek window forward by one token. Diagnostics produced by
    /// the preprocessor are buffered and the stream continues.
    pub fn bump(&mut self) {
        self.peek[0] = self.peek[1];
        self.peek[1] = self.peek[2];
        self.peek[2] = self.peek[3];
        self.peek[3] = loop {
            match self.input.next() {
                Some(Ok(x)) => break x,
                Some(Err(e)) => self.diags.push(e),
                None => break (CatTokenKind::Eof, self.peek[2].1),
            }
        };
    }

    /// Produce the next token with its leading trivia. Returns the same EOF
    /// token indefinitely once the input is exhausted.
    pub fn next_token(&mut self) -> DiagResult2<FullToken> {
        // Upon the first invocation the peek buffer is still empty, so load
        // the first batch of tokens.
        if self.peek[0].0 == CatTokenKind::Eof && self.peek[0].1 == INVALID_SPAN {
            self.bump();
            self.bump();
            self.bump();
            self.bump();
        }

        let name_table = get_name_table();
        self.collect_trivia();

        // Match 4-character symbols.
        if let (
            CatTokenKind::Symbol(c0),
            CatTokenKind::Symbol(c1),
            CatTokenKind::Symbol(c2),
            CatTokenKind::Symbol(c3),
        ) = (
            self.peek[0].0,
            self.peek[1].0,
            self.peek[2].0,
            self.peek[3].0,
        ) {
            let sym = match (c0, c1, c2, c3) {
                ('<', '<', '<', '=') => Some(Operator(Op::AssignArithShL)),
                ('>', '>', '>', '=') => Some(Operator(Op::AssignArithShR)),
                _ => None,
            };
            if let Some(tkn) = sym {
                let sp = Span::union(self.peek[0].1, self.peek[3].1);
                self.bump();
                self.bump();
                self.bump();
                self.bump();
                return Ok(self.assemble(tkn, sp));
            }
        }

        // Match 3-character symbols.
        if let (CatTokenKind::Symbol(c0), CatTokenKind::Symbol(c1), CatTokenKind::Symbol(c2)) =
            (self.peek[0].0, self.peek[1].0, self.peek[2].0)
        {
            let sym = match (c0, c1, c2) {
                ('<', '<', '=') => Some(Operator(Op::AssignLogicShL)),
                ('>', '>', '=') => Some(Operator(Op::AssignLogicShR)),
                ('=', '=', '=') => Some(Operator(Op::CaseEq)),
                ('!', '=', '=') => Some(Operator(Op::CaseNeq)),
                ('=', '=', '?') => Some(Operator(Op::WildcardEq)),
                ('!', '=', '?') => Some(Operator(Op::WildcardNeq)),
                ('<', '-', '>') => Some(Operator(Op::LogicEquiv)),
                ('<', '<', '<') => Some(Operator(Op::ArithShL)),
                ('>', '>', '>') => Some(Operator(Op::ArithShR)),
                ('|', '-', '>') => Some(Operator(Op::SeqImplOl)),
                ('|', '=', '>') => Some(Operator(Op::SeqImplNol)),
                ('#', '-', '#') => Some(Operator(Op::SeqFollowOl)),
                ('#', '=', '#') => Some(Operator(Op::SeqFollowNol)),
                _ => None,
            };
            if let Some(tkn) = sym {
                let sp = Span::union(self.peek[0].1, self.peek[2].1);
                self.bump();
                self.bump();
                self.bump();
                return Ok(self.assemble(tkn, sp));
            }
        }

        // Match 2-character symbols.
        if let (CatTokenKind::Symbol(c0), CatTokenKind::Symbol(c1)) =
            (self.peek[0].0, self.peek[1].0)
        {
            let sym = match (c0, c1) {
                ('+', '=') => Some(Operator(Op::AssignAdd)),
                ('-', '=') => Some(Operator(Op::AssignSub)),
                ('*', '=') => Some(Operator(Op::AssignMul)),
                ('/', '=') => Some(Operator(Op::AssignDiv)),
                ('%', '=') => Some(Operator(Op::AssignMod)),
                ('&', '=') => Some(Operator(Op::AssignBitAnd)),
                ('|', '=') => Some(Operator(Op::AssignBitOr)),
                ('^', '=') => Some(Operator(Op::AssignBitXor)),
                ('+', '+') => Some(Operator(Op::Inc)),
                ('-', '-') => Some(Operator(Op::Dec)),
                ('*', '*') => Some(Operator(Op::Pow)),
                ('<', '=') => Some(Operator(Op::Leq)),
                ('>', '=') => Some(Operator(Op::Geq)),
                ('=', '=') => Some(Operator(Op::LogicEq)),
                ('!', '=') => Some(Operator(Op::LogicNeq)),
                ('-', '>') => Some(Operator(Op::LogicImpl)),
                ('|', '|') => Some(Operator(Op::LogicOr)),
                ('&', '&') => Some(Operator(Op::LogicAnd)),
                ('~', '&') => Some(Operator(Op::BitNand)),
                ('~', '|') => Some(Operator(Op::BitNor)),
                ('~', '^') => Some(Operator(Op::BitNxor)),
                ('^', '~') => Some(Operator(Op::BitXnor)),
                ('<', '<') => Some(Operator(Op::LogicShL)),
                ('>', '>') => Some(Operator(Op::LogicShR)),
                (':', ':') => Some(Namespace),
                ('+', ':') => Some(AddColon),
                ('-', ':') => Some(SubColon),
                ('#', '#') => Some(DoubleHashtag),
                _ => None,
            };
            if let Some(tkn) = sym {
                let sp = Span::union(self.peek[0].1, self.peek[1].1);
                self.bump();
                self.bump();
                return Ok(self.assemble(tkn, sp));
            }
        }

        // Match 1-character symbols.
        if let CatTokenKind::Symbol(c0) = self.peek[0].0 {
            let sym = match c0 {
                '=' => Some(Operator(Op::Assign)),
                '+' => Some(Operator(Op::Add)),
                '-' => Some(Operator(Op::Sub)),
                '*' => Some(Operator(Op::Mul)),
                '/' => Some(Operator(Op::Div)),
                '%' => Some(Operator(Op::Mod)),
                '<' => Some(Operator(Op::Lt)),
                '>' => Some(Operator(Op::Gt)),
                '!' => Some(Operator(Op::LogicNot)),
                '~' => Some(Operator(Op::BitNot)),
                '&' => Some(Operator(Op::BitAnd)),
                '|' => Some(Operator(Op::BitOr)),
                '^' => Some(Operator(Op::BitXor)),
                '(' => Some(OpenDelim(Paren)),
                ')' => Some(CloseDelim(Paren)),
                '[' => Some(OpenDelim(Brack)),
                ']' => Some(CloseDelim(Brack)),
                '{' => Some(OpenDelim(Brace)),
                '}' => Some(CloseDelim(Brace)),
                '#' => Some(Hashtag),
                ',' => Some(Comma),
                '.' => Some(Period),
                ':' => Some(Colon),
                ';' => Some(Semicolon),
                '?' => Some(Ternary),
                '@' => Some(At),
                _ => None,
            };
            if let Some(tkn) = sym {
                let sp = self.peek[0].1;
                self.bump();
                return Ok(self.assemble(tkn, sp));
            }
        }

        match self.peek[0] {
            // A text token introduces an identifier or keyword, as do
            // underscores. Keywords are mapped to their own token; `begin`
            // and `end` act as delimiters.
            // IEEE 1800-2009 5.6 Identifiers, 5.6.2 Keywords
            (CatTokenKind::Text, _) | (CatTokenKind::Symbol('_'), _) => {
                let (m, msp) = self.match_ident();
                let tkn = match find_keyword(&m) {
                    Some(Kw::Begin) => OpenDelim(Bgend),
                    Some(Kw::End) => CloseDelim(Bgend),
                    Some(kw) => Keyword(kw),
                    None => Ident(name_table.intern(&m, true)),
                };
                Ok(self.assemble(tkn, msp))
            }

            // System tasks and functions start with a dollar sign, after
            // which all regular identifier characters are allowed.
            // IEEE 1800-2009 5.6.3
            (CatTokenKind::Symbol('$'), sp) => {
                self.bump();
                match self.peek[0].0 {
                    CatTokenKind::Text
                    | CatTokenKind::Digits
                    | CatTokenKind::Symbol('_')
                    | CatTokenKind::Symbol('$') => {
                        let (m, msp) = self.match_ident();
                        let tkn = SysIdent(name_table.intern(&m, true));
                        Ok(self.assemble(tkn, Span::union(sp, msp)))
                    }
                    _ => Ok(self.assemble(Dollar, sp)),
                }
            }

            // Escaped identifiers are introduced with a backslash and last
            // until the next whitespace or newline character.
            // IEEE 1800-2009 5.6.1
            (CatTokenKind::Symbol('\\'), mut sp) => {
                let mut s = String::new();
                loop {
                    self.bump();
                    match self.peek[0].0 {
                        CatTokenKind::Whitespace
                        | CatTokenKind::Newline
                        | CatTokenKind::Eof
                        | CatTokenKind::Disabled
                        | CatTokenKind::Directive(_) => break,
                        _ => {
                            sp.expand(self.peek[0].1);
                            s.push_str(&self.peek[0].1.extract());
                        }
                    }
                }
                if s.is_empty() {
                    self.diags.push(
                        DiagBuilder2::error("expected escaped identifier after backslash `\\`")
                            .span(sp),
                    );
                    return Ok(self.assemble(Unknown(name_table.intern("\\", true)), sp));
                }
                Ok(self.assemble(EscIdent(name_table.intern(&s, true)), sp))
            }

            // Numbers are either introduced by digits for a sized literal or
            // plain number, or by an apostrophe for an unsized based number.
            // IEEE 1800-2009 5.7 Numbers
            (CatTokenKind::Symbol('\''), sp) => {
                self.bump();
                self.match_based_number(None, sp)
            }
            (CatTokenKind::Digits, mut sp) => {
                // Consume the leading digits. They are either the size of
                // the literal if followed by a base specification, or the
                // number itself.
                let value = {
                    let mut s = sp.extract();
                    self.bump();
                    self.eat_number_body_into(&mut s, &mut sp, false);
                    name_table.intern(&s, true)
                };

                // A period introduces a fractional part if digits follow.
                let frac = if self.peek[0].0 == CatTokenKind::Symbol('.')
                    && self.peek[1].0 == CatTokenKind::Digits
                {
                    let mut s = String::new();
                    self.bump();
                    self.eat_number_body_into(&mut s, &mut sp, false);
                    Some(name_table.intern(&s, true))
                } else {
                    None
                };

                // A time unit suffix turns the number into a time literal.
                if let Some(unit) = self.try_time_unit() {
                    sp.expand(self.peek[0].1);
                    self.bump();
                    return Ok(self.assemble(Literal(Time(value, frac, unit)), sp));
                }
                if self.peek[0].0 == CatTokenKind::Text {
                    self.diags.push(
                        DiagBuilder2::error(format!(
                            "number literal `{}` may not directly be followed by letters `{}`",
                            sp.extract(),
                            self.peek[0].1.extract(),
                        ))
                        .span(sp),
                    );
                    return Ok(self.assemble(Literal(Number(value, frac)), sp));
                }
                if frac.is_some() {
                    return Ok(self.assemble(Literal(Number(value, frac)), sp));
                }

                // Whitespace is allowed between the size and the base of a
                // based literal. Scan ahead in the peek window; if no base
                // follows, the whitespace is the next token's trivia.
                let mut i = 0;
                while i < 2 {
                    match self.peek[i].0 {
                        CatTokenKind::Whitespace | CatTokenKind::Newline => i += 1,
                        _ => break,
                    }
                }
                match (self.peek[i].0, self.peek[i + 1].0) {
                    (CatTokenKind::Symbol('\''), CatTokenKind::Text)
                    | (CatTokenKind::Symbol('\''), CatTokenKind::Digits)
                    | (CatTokenKind::Symbol('\''), CatTokenKind::Symbol('?')) => {
                        for _ in 0..(i + 1) {
                            self.bump(); // eat the whitespace and apostrophe
                        }
                        self.match_based_number(Some(value), sp)
                    }
                    _ => Ok(self.assemble(Literal(Number(value, None)), sp)),
                }
            }

            // IEEE 1800-2009 5.9 String literals
            (CatTokenKind::Symbol('"'), span) => {
                self.bump();
                self.match_string(span)
            }

            (CatTokenKind::Eof, sp) => Ok(self.assemble(Eof, sp)),

            (_, sp) => {
                // Invalid characters become a distinct token carrying the
                // offending bytes, which the caller may skip.
                self.bump();
                self.diags
                    .push(DiagBuilder2::error(format!("unknown token `{}`", sp.extract())).span(sp));
                Ok(self.assemble(Unknown(name_table.intern(&sp.extract(), true)), sp))
            }
        }
    }

    /// Wrap a token kind and span into a `FullToken`, attaching the trivia
    /// collected so far.
    fn assemble(&mut self, kind: Token, span: Span) -> FullToken {
        FullToken::new(kind, span, std::mem::replace(&mut self.trivia, Vec::new()))
    }

    /// Collect all leading trivia in front of the next token: whitespace,
    /// newlines, comments, attribute instances, disabled text, and directive
    /// residue.
    fn collect_trivia(&mut self) {
        loop {
            match self.peek[0] {
                (CatTokenKind::Whitespace, sp) | (CatTokenKind::Newline, sp) => {
                    // Merge runs of whitespace into one piece of trivia.
                    let mut span = sp;
                    loop {
                        self.bump();
                        match self.peek[0] {
                            (CatTokenKind::Whitespace, nsp) | (CatTokenKind::Newline, nsp) => {
                                span.expand(nsp);
                            }
                            _ => break,
                        }
                    }
                    self.trivia.push(Trivia::Whitespace(span));
                }
                (CatTokenKind::LineComment, sp) => {
                    self.trivia.push(Trivia::LineComment(sp));
                    self.bump();
                }
                (CatTokenKind::BlockComment, sp) => {
                    self.trivia.push(Trivia::BlockComment(sp));
                    self.bump();
                }
                (CatTokenKind::Disabled, sp) => {
                    self.trivia.push(Trivia::DisabledText(sp));
                    self.bump();
                }
                (CatTokenKind::Directive(kind), sp) => {
                    self.trivia.push(Trivia::Directive(kind, sp));
                    self.bump();
                }
                // Attribute instances `(* ... *)` are not part of the core
                // grammar; skip them but keep their text.
                (CatTokenKind::Symbol('('), mut sp)
                    if self.peek[1].0 == CatTokenKind::Symbol('*')
                        && self.peek[2].0 != CatTokenKind::Symbol(')') =>
                {
                    self.bump();
                    self.bump();
                    loop {
                        match (self.peek[0].0, self.peek[1].0) {
                            (CatTokenKind::Eof, _) => break,
                            (CatTokenKind::Symbol('*'), CatTokenKind::Symbol(')')) => {
                                sp.expand(self.peek[1].1);
                                self.bump();
                                self.bump();
                                break;
                            }
                            _ => {
                                sp.expand(self.peek[0].1);
                                self.bump();
                            }
                        }
                    }
                    self.trivia.push(Trivia::SkippedTokens(sp));
                }
                _ => return,
            }
        }
    }

    /// Matches an identifier. Consumes all consecutive text, digit,
    /// underscore, and dollar tokens, which together make up the identifier.
    /// Token pasting relies on this accumulation: once the preprocessor has
    /// dropped a `` marker, nothing separates the fragments and they join
    /// here.
    fn match_ident(&mut self) -> (String, Span) {
        let mut s = String::new();
        let mut sp = self.peek[0].1;
        loop {
            match self.peek[0] {
                (CatTokenKind::Text, this_sp)
                | (CatTokenKind::Digits, this_sp)
                | (CatTokenKind::Symbol('_'), this_sp)
                | (CatTokenKind::Symbol('$'), this_sp) => {
                    s.push_str(&this_sp.extract());
                    sp.expand(this_sp);
                    self.bump();
                }
                _ => break,
            }
        }
        debug_assert!(!s.is_empty());
        (s, sp)
    }

    /// Match a based number. The apostrophe before the base indication has
    /// already been consumed.
    fn match_based_number(
        &mut self,
        size: Option<Name>,
        mut span: Span,
    ) -> DiagResult2<FullToken> {
        let name_table = get_name_table();
        match self.peek[0] {
            (CatTokenKind::Text, sp) => {
                self.bump();
                let text = sp.extract();
                span.expand(sp);
                let mut chars = text.chars();
                let mut c = chars.next();

                // Consume the optional sign indicator, or emit an unbased
                // unsized literal if the apostrophe is immediately followed
                // by [zZxX].
                let signed = match c {
                    Some('s') | Some('S') => {
                        c = chars.next();
                        true
                    }
                    Some('z') | Some('Z') if text.len() == 1 => {
                        return Ok(self.assemble(Literal(UnbasedUnsized('z')), span));
                    }
                    Some('x') | Some('X') if text.len() == 1 => {
                        return Ok(self.assemble(Literal(UnbasedUnsized('x')), span));
                    }
                    _ => false,
                };

                // Consume the base of the number.
                let base = match c {
                    Some('d') | Some('D') => 'd',
                    Some('b') | Some('B') => 'b',
                    Some('o') | Some('O') => 'o',
                    Some('h') | Some('H') => 'h',
                    Some(x) => {
                        self.diags.push(
                            DiagBuilder2::error(format!("`{}` is not a valid number base", x))
                                .span(span),
                        );
                        return Ok(self.assemble(
                            Unknown(name_table.intern(&span.extract(), true)),
                            span,
                        ));
                    }
                    None => {
                        self.diags
                            .push(DiagBuilder2::error("missing number base").span(span));
                        return Ok(self.assemble(
                            Unknown(name_table.intern(&span.extract(), true)),
                            span,
                        ));
                    }
                };
                c = chars.next();

                // If no more characters remain, whitespace and subsequent
                // digits may follow. Otherwise the remaining characters are
                // part of the number body.
                let mut body = String::new();
                if let Some(c) = c {
                    body.push(c);
                    body.push_str(chars.as_str());
                } else {
                    self.skip_inner_noise();
                }
                self.eat_number_body_into(&mut body, &mut span, true);

                // Check the digits against the base. The token is produced
                // either way; a bad digit only degrades it.
                self.check_digits(size, signed, base, &body, span);

                Ok(self.assemble(
                    Literal(BasedInteger(size, signed, base, name_table.intern(&body, true))),
                    span,
                ))
            }

            (CatTokenKind::Digits, sp) if size.is_none() => {
                self.bump();
                let value = sp.extract();
                span.expand(sp);
                match value.chars().next() {
                    Some('0') if value.len() == 1 => {
                        Ok(self.assemble(Literal(UnbasedUnsized('0')), span))
                    }
                    Some('1') if value.len() == 1 => {
                        Ok(self.assemble(Literal(UnbasedUnsized('1')), span))
                    }
                    _ => {
                        self.diags.push(
                            DiagBuilder2::error(
                                "unbased unsized literal may only be '0, '1, 'x, or 'z",
                            )
                            .span(span),
                        );
                        Ok(self.assemble(
                            Unknown(get_name_table().intern(&span.extract(), true)),
                            span,
                        ))
                    }
                }
            }

            (CatTokenKind::Symbol('?'), sp) => {
                self.bump();
                span.expand(sp);
                Ok(self.assemble(Literal(UnbasedUnsized('z')), span))
            }

            // Digits after a size, e.g. the `3` in `5 'd 3`, arrive here
            // when the base text and digits were separated by whitespace.
            (CatTokenKind::Digits, _) => {
                let mut body = String::new();
                self.eat_number_body_into(&mut body, &mut span, true);
                self.check_digits(size, false, 'd', &body, span);
                Ok(self.assemble(
                    Literal(BasedInteger(size, false, 'd', name_table.intern(&body, true))),
                    span,
                ))
            }

            // Anything else: this is an apostrophe on its own, e.g. the one
            // introducing an assignment pattern `'{...}`.
            _ => Ok(self.assemble(Apostrophe, span)),
        }
    }

    /// Validate the digits of a based literal, deferring a diagnostic for
    /// every digit that is invalid for the base.
    fn check_digits(&mut self, size: Option<Name>, signed: bool, base: char, body: &str, span: Span) {
        let mut invalid = Vec::new();
        let size_str = size.map(|s| s.as_str());
        number::parse_based(
            size_str.as_ref().map(|s| &s[..]),
            signed,
            base,
            body,
            span,
            &mut invalid,
        );
        self.diags.extend(invalid);
    }

    /// Eats all text, digit, and underscore tokens, accumulating them
    /// (except for the underscores) in a string.
    fn eat_number_body_into(&mut self, into: &mut String, span: &mut Span, allow_alphabetic: bool) {
        loop {
            match self.peek[0] {
                (CatTokenKind::Digits, sp) | (CatTokenKind::Text, sp) => {
                    if self.peek[0].0 == CatTokenKind::Text && !allow_alphabetic {
                        break;
                    }
                    into.push_str(&sp.extract());
                    span.expand(sp);
                }
                (CatTokenKind::Symbol('_'), sp) => {
                    span.expand(sp);
                }
                (CatTokenKind::Symbol('?'), sp) => {
                    into.push('?');
                    span.expand(sp);
                }
                _ => break,
            }
            self.bump();
        }
    }

    /// Skip whitespace and comments inside a token, e.g. between the size
    /// and base of a literal. The bytes are covered by the token's span, so
    /// no trivia is recorded.
    fn skip_inner_noise(&mut self) {
        loop {
            match self.peek[0].0 {
                CatTokenKind::Whitespace
                | CatTokenKind::Newline
                | CatTokenKind::LineComment
                | CatTokenKind::BlockComment => self.bump(),
                _ => return,
            }
        }
    }

    /// Try to read the next text token as a time unit.
    fn try_time_unit(&mut self) -> Option<TimeUnit> {
        if self.peek[0].0 == CatTokenKind::Text {
            TimeUnit::from_suffix(&self.peek[0].1.extract())
        } else {
            None
        }
    }

    /// Assemble a string literal. The opening quote has been consumed.
    /// Escape sequences are decoded; an unterminated string is diagnosed at
    /// the end of the line and a closing quote is synthesized.
    fn match_string(&mut self, mut span: Span) -> DiagResult2<FullToken> {
        let mut s = String::new();
        loop {
            match self.peek[0] {
                (CatTokenKind::Symbol('"'), sp) => {
                    span.expand(sp);
                    self.bump();
                    break;
                }
                (CatTokenKind::Symbol('\\'), sp) => {
                    span.expand(sp);
                    self.bump();
                    self.match_string_escape(&mut s, &mut span);
                }
                (CatTokenKind::Newline, sp) => {
                    self.diags.push(
                        DiagBuilder2::error("string literal is not closed before end of line")
                            .span(Span::union(span, sp)),
                    );
                    // Synthesize the closing quote; the newline stays in the
                    // stream as the next token's trivia.
                    break;
                }
                (CatTokenKind::Eof, sp) => {
                    self.diags.push(
                        DiagBuilder2::error("string literal is not closed before end of input")
                            .span(Span::union(span, sp)),
                    );
                    break;
                }
                (_, sp) => {
                    span.expand(sp);
                    s.push_str(&sp.extract());
                    self.bump();
                }
            }
        }
        Ok(self.assemble(Literal(Str(get_name_table().intern(&s, true))), span))
    }

    /// Decode one escape sequence after a backslash inside a string.
    fn match_string_escape(&mut self, s: &mut String, span: &mut Span) {
        match self.peek[0] {
            (CatTokenKind::Symbol('\\'), sp) => {
                span.expand(sp);
                s.push('\\');
                self.bump();
            }
            (CatTokenKind::Symbol('"'), sp) => {
                span.expand(sp);
                s.push('"');
                self.bump();
            }
            (CatTokenKind::Symbol('\''), sp) => {
                span.expand(sp);
                s.push('\'');
                self.bump();
            }
            // A backtick escape carries an embedded macro reference through
            // to later stages; keep the backtick itself.
            (CatTokenKind::Symbol('`'), sp) => {
                span.expand(sp);
                s.push('`');
                self.bump();
            }
            // An escaped newline continues the string on the next line.
            (CatTokenKind::Newline, sp) => {
                span.expand(sp);
                self.bump();
            }
            // Octal escapes, e.g. `\101`.
            (CatTokenKind::Digits, sp) => {
                span.expand(sp);
                let text = sp.extract();
                let octal: String = text.chars().take(3).collect();
                match u32::from_str_radix(&octal, 8).ok().and_then(std::char::from_u32) {
                    Some(c) => s.push(c),
                    None => {
                        self.diags.push(
                            DiagBuilder2::warning(format!("invalid octal escape `\\{}`", octal))
                                .span(sp),
                        );
                    }
                }
                s.push_str(&text[octal.len()..]);
                self.bump();
            }
            (CatTokenKind::Text, sp) => {
                span.expand(sp);
                let text = sp.extract();
                let mut chars = text.chars();
                match chars.next() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('v') => s.push('\x0b'),
                    Some('f') => s.push('\x0c'),
                    Some('a') => s.push('\x07'),
                    Some('x') => {
                        // Hexadecimal escape; the digits may sit in this
                        // token or spill into the next.
                        let mut hex: String = chars.clone().take(2).collect();
                        if hex.len() < 2 {
                            if let (CatTokenKind::Digits, dsp) = self.peek[1] {
                                if dsp.begin == sp.end {
                                    hex.push_str(&dsp.extract());
                                    hex.truncate(2);
                                }
                            }
                        }
                        match u32::from_str_radix(&hex, 16).ok().and_then(std::char::from_u32) {
                            Some(c) => s.push(c),
                            None => {
                                self.diags.push(
                                    DiagBuilder2::warning("invalid hex escape in string")
                                        .span(sp),
                                );
                            }
                        }
                        let consumed_here = hex.len().min(text.len() - 1);
                        s.push_str(&text[1 + consumed_here..]);
                        if hex.len() > consumed_here {
                            // Part of the escape came from the next token.
                            self.bump();
                            let rest = self.peek[0].1.extract();
                            let from_next = hex.len() - consumed_here;
                            span.expand(self.peek[0].1);
                            s.push_str(&rest[from_next.min(rest.len())..]);
                        }
                    }
                    Some(c) => {
                        self.diags.push(
                            DiagBuilder2::warning(format!("unknown escape sequence `\\{}`", c))
                                .span(sp),
                        );
                        s.push(c);
                        s.push_str(chars.as_str());
                        self.bump();
                        return;
                    }
                    None => (),
                }
                if let Some('x') = text.chars().next() {
                    // Remainder already handled above.
                } else {
                    s.push_str(chars.as_str());
                }
                self.bump();
            }
            (_, sp) => {
                self.diags.push(
                    DiagBuilder2::warning("unknown escape sequence in string").span(sp),
                );
                self.bump();
            }
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = DiagResult2<FullToken>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_token() {
            Ok(tkn) if tkn.kind == Eof => None,
            x => Some(x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trivia::Trivia;
    use std::cell::Cell;

    fn make_lexer(input: &str) -> Lexer<'static> {
        thread_local!(static INDEX: Cell<usize> = Cell::new(0));
        let sm = get_source_manager();
        let idx = INDEX.with(|i| {
            let v = i.get();
            i.set(v + 1);
            v
        });
        let source = sm.add(&format!("lexer_{}.sv", idx), input);
        let pp = Preprocessor::new(source, &[], &[]);
        Lexer::new(pp)
    }

    fn check(input: &str, expected: &[Token]) {
        let lexer = make_lexer(input);
        let actual: Vec<_> = lexer.map(|x| x.unwrap().kind).collect();
        assert_eq!(actual, expected);
    }

    fn check_single(input: &str, expected: Token) {
        check(input, &[expected]);
    }

    fn name(n: &str) -> Name {
        get_name_table().intern(n, true)
    }

    /// According to IEEE 1800-2009 5.6
    #[test]
    fn idents() {
        check(
            "shiftreg_a busa_index error_condition merge_ab _bus3 n$657",
            &[
                Ident(name("shiftreg_a")),
                Ident(name("busa_index")),
                Ident(name("error_condition")),
                Ident(name("merge_ab")),
                Ident(name("_bus3")),
                Ident(name("n$657")),
            ],
        );
    }

    /// According to IEEE 1800-2009 5.6.1
    #[test]
    fn esc_idents() {
        check(
            "\\busa+index \\-clock \\***error-condition*** \\net1/\\net2 \\{a,b} \\a*(b+c)",
            &[
                EscIdent(name("busa+index")),
                EscIdent(name("-clock")),
                EscIdent(name("***error-condition***")),
                EscIdent(name("net1/\\net2")),
                EscIdent(name("{a,b}")),
                EscIdent(name("a*(b+c)")),
            ],
        );
    }

    /// According to IEEE 1800-2009 5.6.3
    #[test]
    fn sys_idents() {
        check(
            "$display $finish $01_ad$as3_",
            &[
                SysIdent(name("display")),
                SysIdent(name("finish")),
                SysIdent(name("01_ad$as3_")),
            ],
        );
    }

    #[test]
    fn keywords_and_delims() {
        check(
            "module begin end endmodule",
            &[
                Keyword(Kw::Module),
                OpenDelim(Bgend),
                CloseDelim(Bgend),
                Keyword(Kw::Endmodule),
            ],
        );
    }

    /// According to IEEE 1800-2009 5.7.1
    #[test]
    fn unbased_unsized_literal() {
        check_single("'0", Literal(UnbasedUnsized('0')));
        check_single("'1", Literal(UnbasedUnsized('1')));
        check_single("'X", Literal(UnbasedUnsized('x')));
        check_single("'x", Literal(UnbasedUnsized('x')));
        check_single("'Z", Literal(UnbasedUnsized('z')));
        check_single("'z", Literal(UnbasedUnsized('z')));
        check_single("'?", Literal(UnbasedUnsized('z')));
    }

    #[test]
    fn unsized_literal_constant_numbers() {
        check(
            "659; 'h 837FF; 'o7460",
            &[
                Literal(Number(name("659"), None)),
                Semicolon,
                Literal(BasedInteger(None, false, 'h', name("837FF"))),
                Semicolon,
                Literal(BasedInteger(None, false, 'o', name("7460"))),
            ],
        );
    }

    #[test]
    fn sized_literal_constant_numbers() {
        check(
            "4'b1001; 5 'D 3; 3'b01x; 12'hx; 16'hz",
            &[
                Literal(BasedInteger(Some(name("4")), false, 'b', name("1001"))),
                Semicolon,
                Literal(BasedInteger(Some(name("5")), false, 'd', name("3"))),
                Semicolon,
                Literal(BasedInteger(Some(name("3")), false, 'b', name("01x"))),
                Semicolon,
                Literal(BasedInteger(Some(name("12")), false, 'h', name("x"))),
                Semicolon,
                Literal(BasedInteger(Some(name("16")), false, 'h', name("z"))),
            ],
        );
    }

    #[test]
    fn signed_literal_constant_numbers() {
        check(
            "4 'shf; 16'sd?",
            &[
                Literal(BasedInteger(Some(name("4")), true, 'h', name("f"))),
                Semicolon,
                Literal(BasedInteger(Some(name("16")), true, 'd', name("?"))),
            ],
        );
    }

    #[test]
    fn underscores_in_literal_constant_numbers() {
        check(
            "16'b0011_0101_0001_1111; 32 'h 12ab_f001",
            &[
                Literal(BasedInteger(
                    Some(name("16")),
                    false,
                    'b',
                    name("0011010100011111"),
                )),
                Semicolon,
                Literal(BasedInteger(Some(name("32")), false, 'h', name("12abf001"))),
            ],
        );
    }

    #[test]
    fn number_followed_by_letters_is_diagnosed() {
        let mut lexer = make_lexer("4af");
        let tkn = lexer.next_token().unwrap();
        assert_eq!(tkn.kind, Literal(Number(name("4"), None)));
        let diags = lexer.take_diagnostics();
        assert_eq!(diags.len(), 1);
        assert!(diags[0].get_message().contains("letters"));
    }

    #[test]
    fn bad_digit_is_diagnosed_but_token_produced() {
        let mut lexer = make_lexer("4'b012");
        let tkn = lexer.next_token().unwrap();
        assert_eq!(
            tkn.kind,
            Literal(BasedInteger(Some(name("4")), false, 'b', name("012")))
        );
        let diags = lexer.take_diagnostics();
        assert_eq!(diags.len(), 1);
        assert!(diags[0].get_message().contains("not valid for base"));
    }

    /// According to IEEE 1800-2009 5.9
    #[test]
    fn multiline_string_literal() {
        check(
            "$display(\"Humpty Dumpty sat on a wall. \\\nHumpty Dumpty had a great fall.\")",
            &[
                SysIdent(name("display")),
                OpenDelim(Paren),
                Literal(Str(name(
                    "Humpty Dumpty sat on a wall. Humpty Dumpty had a great fall.",
                ))),
                CloseDelim(Paren),
            ],
        );
    }

    #[test]
    fn string_escapes() {
        check_single("\"a\\nb\\tc\\\\d\\\"e\"", Literal(Str(name("a\nb\tc\\d\"e"))));
    }

    #[test]
    fn unterminated_string_synthesizes_quote() {
        let mut lexer = make_lexer("\"oops\nx");
        let tkn = lexer.next_token().unwrap();
        assert_eq!(tkn.kind, Literal(Str(name("oops"))));
        let diags = lexer.take_diagnostics();
        assert_eq!(diags.len(), 1);
        assert!(diags[0].get_message().contains("not closed"));
        // Lexing continues after the synthesized quote.
        let tkn = lexer.next_token().unwrap();
        assert_eq!(tkn.kind, Ident(name("x")));
    }

    #[test]
    fn unknown_token_degrades() {
        let mut lexer = make_lexer("a \u{fffd} b");
        assert_eq!(lexer.next_token().unwrap().kind, Ident(name("a")));
        let tkn = lexer.next_token().unwrap();
        match tkn.kind {
            Unknown(_) => (),
            other => panic!("expected unknown token, got {:?}", other),
        }
        assert_eq!(lexer.take_diagnostics().len(), 1);
        assert_eq!(lexer.next_token().unwrap().kind, Ident(name("b")));
    }

    #[test]
    fn time_literal() {
        check(
            "42s 14.3ms 16.32us 9ns 0.1ps 8123fs",
            &[
                Literal(Time(name("42"), None, TimeUnit::Second)),
                Literal(Time(name("14"), Some(name("3")), TimeUnit::MilliSecond)),
                Literal(Time(name("16"), Some(name("32")), TimeUnit::MicroSecond)),
                Literal(Time(name("9"), None, TimeUnit::NanoSecond)),
                Literal(Time(name("0"), Some(name("1")), TimeUnit::PicoSecond)),
                Literal(Time(name("8123"), None, TimeUnit::FemtoSecond)),
            ],
        );
    }

    #[test]
    fn number_literal() {
        check(
            "42 4.2",
            &[
                Literal(Number(name("42"), None)),
                Literal(Number(name("4"), Some(name("2")))),
            ],
        );
    }

    #[test]
    fn macro_pasting_joins_identifiers() {
        check(
            "`define CAT(a, b) a``b\n`CAT(foo, bar)\n",
            &[Ident(name("foobar"))],
        );
    }

    #[test]
    fn macro_stringification() {
        check(
            "`define STR(x) `\"x`\"\n`STR(hello)\n",
            &[Literal(Str(name("hello")))],
        );
    }

    #[test]
    fn leading_trivia_attachment() {
        let mut lexer = make_lexer("  // hello\nfoo bar");
        let tkn = lexer.next_token().unwrap();
        assert_eq!(tkn.kind, Ident(name("foo")));
        assert_eq!(tkn.trivia.len(), 3);
        match (&tkn.trivia[0], &tkn.trivia[1], &tkn.trivia[2]) {
            (&Trivia::Whitespace(_), &Trivia::LineComment(c), &Trivia::Whitespace(_)) => {
                assert_eq!(c.extract(), "// hello");
            }
            other => panic!("unexpected trivia {:?}", other),
        }
        // The trailing space belongs to `bar`.
        let tkn = lexer.next_token().unwrap();
        assert_eq!(tkn.kind, Ident(name("bar")));
        assert_eq!(tkn.trivia.len(), 1);
    }

    #[test]
    fn disabled_text_trivia() {
        let mut lexer = make_lexer("`ifdef FOO\nx = 1;\n`else\ny\n`endif\n");
        let tkn = lexer.next_token().unwrap();
        assert_eq!(tkn.kind, Ident(name("y")));
        let disabled: Vec<_> = tkn
            .trivia
            .iter()
            .filter_map(|t| match *t {
                Trivia::DisabledText(sp) => Some(sp.extract()),
                _ => None,
            })
            .collect();
        assert_eq!(disabled, vec!["\nx = 1;\n"]);
    }

    #[test]
    fn eof_carries_trailing_trivia() {
        let mut lexer = make_lexer("x // trailing\n");
        assert_eq!(lexer.next_token().unwrap().kind, Ident(name("x")));
        let eof = lexer.next_token().unwrap();
        assert_eq!(eof.kind, Eof);
        assert!(!eof.trivia.is_empty());
        // EOF is idempotent; the trivia is handed out once.
        let eof2 = lexer.next_token().unwrap();
        assert_eq!(eof2.kind, Eof);
        assert!(eof2.trivia.is_empty());
    }

    #[test]
    fn roundtrip_through_trivia() {
        let input = "module A; // hi\n  wire [7:0] x = 8'hFF;\nendmodule\n";
        let mut lexer = make_lexer(input);
        let mut text = String::new();
        loop {
            let tkn = lexer.next_token().unwrap();
            for trivia in &tkn.trivia {
                text.push_str(&trivia.span().extract());
            }
            if tkn.kind == Eof {
                break;
            }
            text.push_str(&tkn.raw_text());
        }
        assert_eq!(text, input);
    }

    #[test]
    fn location_monotonicity() {
        let lexer = make_lexer("module A; wire x; endmodule\n");
        let mut last = 0;
        for tkn in lexer {
            let tkn = tkn.unwrap();
            assert!(tkn.span.begin >= last, "token locations must not decrease");
            last = tkn.span.begin;
        }
    }
}
