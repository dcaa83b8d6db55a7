// Copyright (c) 2016-2021 Fabian Schuiki

//! Defines all tokens that may result from lexical analysis of a
//! SystemVerilog file, based on IEEE 1800-2009.

use crate::trivia::Trivia;
use sylva_common::name::{get_name_table, Name};
use sylva_common::source::Span;
use std::fmt;

pub use self::DelimToken::*;
pub use self::Lit::*;
pub use self::Token::*;

/// A primary token emitted by the lexer.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Token {
    // Symbols
    Comma,
    Period,
    Colon,
    Semicolon,
    At,
    Hashtag,
    DoubleHashtag,
    Namespace,
    Ternary,
    AddColon,
    SubColon,
    Apostrophe,
    Dollar,

    Operator(Op),

    /// An opening delimiter
    OpenDelim(DelimToken),
    /// A closing delimiter
    CloseDelim(DelimToken),

    /// A literal
    Literal(Lit),
    /// An identifier
    Ident(Name),
    /// An escaped identifier
    EscIdent(Name),
    /// A system task or function identifier, e.g. `$display`
    SysIdent(Name),
    /// A keyword
    Keyword(Kw),
    /// Bytes that do not form a valid token. Kept so the caller can skip
    /// them and continue.
    Unknown(Name),

    /// The end of the input file
    Eof,
}

impl Token {
    /// A human-readable description of the token, usable in diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            Comma => ",",
            Period => ".",
            Colon => ":",
            Semicolon => ";",
            At => "@",
            Hashtag => "#",
            DoubleHashtag => "##",
            Namespace => "::",
            Ternary => "?",
            AddColon => "+:",
            SubColon => "-:",
            Apostrophe => "'",
            Dollar => "$",
            Operator(op) => op.as_str(),
            OpenDelim(Paren) => "(",
            OpenDelim(Brack) => "[",
            OpenDelim(Brace) => "{",
            OpenDelim(Bgend) => "begin",
            CloseDelim(Paren) => ")",
            CloseDelim(Brack) => "]",
            CloseDelim(Brace) => "}",
            CloseDelim(Bgend) => "end",
            Literal(_) => "literal",
            Ident(_) => "identifier",
            EscIdent(_) => "escaped identifier",
            SysIdent(_) => "system identifier",
            Keyword(kw) => kw.as_str(),
            Unknown(_) => "unknown token",
            Eof => "end of input",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Ident(n) | EscIdent(n) | Unknown(n) => write!(f, "{}", n),
            SysIdent(n) => write!(f, "${}", n),
            Literal(lit) => write!(f, "{}", lit),
            tkn => write!(f, "{}", tkn.as_str()),
        }
    }
}

/// A delimiter token such as parentheses or brackets.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DelimToken {
    /// A round paranthesis `(` or `)`
    Paren,
    /// A square bracket `[` or `]`
    Brack,
    /// A curly brace `{` or `}`
    Brace,
    /// A `begin` or `end`
    Bgend,
}

/// A literal, together with its typed payload.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Lit {
    /// A string literal; the name refers to the decoded contents.
    Str(Name),

    /// A based integer literal, e.g. `16'hff`. Consists of the size, the
    /// signedness, the base character, and the digit body including X/Z/?
    /// digits.
    BasedInteger(Option<Name>, bool, char, Name),

    /// One of `'0`, `'1`, `'x`, `'z`.
    UnbasedUnsized(char),

    /// A number given as integer and optional fractional part, e.g. `42`,
    /// `4.2`.
    Number(Name, Option<Name>),

    /// A time literal, e.g. `4.2ns`.
    Time(Name, Option<Name>, TimeUnit),
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Str(s) => write!(f, "\"{}\"", s),
            BasedInteger(Some(size), signed, base, body) => {
                write!(f, "{}'{}{}{}", size, if signed { "s" } else { "" }, base, body)
            }
            BasedInteger(None, signed, base, body) => {
                write!(f, "'{}{}{}", if signed { "s" } else { "" }, base, body)
            }
            UnbasedUnsized(c) => write!(f, "'{}", c),
            Number(int, Some(frac)) => write!(f, "{}.{}", int, frac),
            Number(int, None) => write!(f, "{}", int),
            Time(int, Some(frac), unit) => write!(f, "{}.{}{}", int, frac, unit.as_str()),
            Time(int, None, unit) => write!(f, "{}{}", int, unit.as_str()),
        }
    }
}

/// The unit of a time literal, from the closed suffix set of IEEE 1800-2009
/// section 5.8.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum TimeUnit {
    Second,
    MilliSecond,
    MicroSecond,
    NanoSecond,
    PicoSecond,
    FemtoSecond,
}

impl TimeUnit {
    /// The literal suffix of the unit.
    pub fn as_str(self) -> &'static str {
        match self {
            TimeUnit::Second => "s",
            TimeUnit::MilliSecond => "ms",
            TimeUnit::MicroSecond => "us",
            TimeUnit::NanoSecond => "ns",
            TimeUnit::PicoSecond => "ps",
            TimeUnit::FemtoSecond => "fs",
        }
    }

    /// Parse a time unit from its suffix.
    pub fn from_suffix(s: &str) -> Option<TimeUnit> {
        Some(match s {
            "s" => TimeUnit::Second,
            "ms" => TimeUnit::MilliSecond,
            "us" => TimeUnit::MicroSecond,
            "ns" => TimeUnit::NanoSecond,
            "ps" => TimeUnit::PicoSecond,
            "fs" => TimeUnit::FemtoSecond,
            _ => return None,
        })
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An operator.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Op {
    // Assignment
    Assign,
    AssignAdd,
    AssignSub,
    AssignMul,
    AssignDiv,
    AssignMod,
    AssignBitAnd,
    AssignBitOr,
    AssignBitXor,
    AssignLogicShL,
    AssignLogicShR,
    AssignArithShL,
    AssignArithShR,

    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Inc,
    Dec,

    // Equality
    LogicEq,
    LogicNeq,
    CaseEq,
    CaseNeq,
    WildcardEq,
    WildcardNeq,

    // Relational
    Lt,
    Leq,
    Gt,
    Geq,

    // Logic
    LogicNot,
    LogicAnd,
    LogicOr,
    LogicImpl,
    LogicEquiv,

    // Bitwise
    BitNot,
    BitAnd,
    BitNand,
    BitOr,
    BitNor,
    BitXor,
    BitXnor,
    BitNxor,

    // Shift
    LogicShL,
    LogicShR,
    ArithShL,
    ArithShR,

    // Sequence
    SeqImplOl,
    SeqImplNol,
    SeqFollowOl,
    SeqFollowNol,
}

impl Op {
    /// The textual spelling of the operator.
    pub fn as_str(self) -> &'static str {
        match self {
            Op::Assign => "=",
            Op::AssignAdd => "+=",
            Op::AssignSub => "-=",
            Op::AssignMul => "*=",
            Op::AssignDiv => "/=",
            Op::AssignMod => "%=",
            Op::AssignBitAnd => "&=",
            Op::AssignBitOr => "|=",
            Op::AssignBitXor => "^=",
            Op::AssignLogicShL => "<<=",
            Op::AssignLogicShR => ">>=",
            Op::AssignArithShL => "<<<=",
            Op::AssignArithShR => ">>>=",
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Mod => "%",
            Op::Pow => "**",
            Op::Inc => "++",
            Op::Dec => "--",
            Op::LogicEq => "==",
            Op::LogicNeq => "!=",
            Op::CaseEq => "===",
            Op::CaseNeq => "!==",
            Op::WildcardEq => "==?",
            Op::WildcardNeq => "!=?",
            Op::Lt => "<",
            Op::Leq => "<=",
            Op::Gt => ">",
            Op::Geq => ">=",
            Op::LogicNot => "!",
            Op::LogicAnd => "&&",
            Op::LogicOr => "||",
            Op::LogicImpl => "->",
            Op::LogicEquiv => "<->",
            Op::BitNot => "~",
            Op::BitAnd => "&",
            Op::BitNand => "~&",
            Op::BitOr => "|",
            Op::BitNor => "~|",
            Op::BitXor => "^",
            Op::BitXnor => "^~",
            Op::BitNxor => "~^",
            Op::LogicShL => "<<",
            Op::LogicShR => ">>",
            Op::ArithShL => "<<<",
            Op::ArithShR => ">>>",
            Op::SeqImplOl => "|->",
            Op::SeqImplNol => "|=>",
            Op::SeqFollowOl => "#-#",
            Op::SeqFollowNol => "#=#",
        }
    }

    /// The precedence this operator binds with when used as a binary
    /// operator, following the SystemVerilog operator hierarchy.
    pub fn get_precedence(self) -> Precedence {
        match self {
            Op::Assign
            | Op::AssignAdd
            | Op::AssignSub
            | Op::AssignMul
            | Op::AssignDiv
            | Op::AssignMod
            | Op::AssignBitAnd
            | Op::AssignBitOr
            | Op::AssignBitXor
            | Op::AssignLogicShL
            | Op::AssignLogicShR
            | Op::AssignArithShL
            | Op::AssignArithShR => Precedence::Assignment,
            Op::LogicImpl | Op::LogicEquiv => Precedence::Implication,
            Op::LogicOr => Precedence::LogicOr,
            Op::LogicAnd => Precedence::LogicAnd,
            Op::BitOr | Op::BitNor => Precedence::BitOr,
            Op::BitXor | Op::BitXnor | Op::BitNxor => Precedence::BitXor,
            Op::BitAnd | Op::BitNand => Precedence::BitAnd,
            Op::LogicEq
            | Op::LogicNeq
            | Op::CaseEq
            | Op::CaseNeq
            | Op::WildcardEq
            | Op::WildcardNeq => Precedence::Equality,
            Op::Lt | Op::Leq | Op::Gt | Op::Geq => Precedence::Relational,
            Op::LogicShL | Op::LogicShR | Op::ArithShL | Op::ArithShR => Precedence::Shift,
            Op::Add | Op::Sub => Precedence::Additive,
            Op::Mul | Op::Div | Op::Mod => Precedence::Multiplicative,
            Op::Pow => Precedence::Pow,
            Op::Inc | Op::Dec | Op::LogicNot | Op::BitNot => Precedence::Unary,
            Op::SeqImplOl | Op::SeqImplNol | Op::SeqFollowOl | Op::SeqFollowNol => {
                Precedence::Implication
            }
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The operation carried by an assignment, e.g. `=` or `+=`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AssignOp {
    Identity,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    LogicShL,
    LogicShR,
    ArithShL,
    ArithShR,
}

impl AssignOp {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignOp::Identity => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Mod => "%=",
            AssignOp::BitAnd => "&=",
            AssignOp::BitOr => "|=",
            AssignOp::BitXor => "^=",
            AssignOp::LogicShL => "<<=",
            AssignOp::LogicShR => ">>=",
            AssignOp::ArithShL => "<<<=",
            AssignOp::ArithShR => ">>>=",
        }
    }
}

impl fmt::Display for AssignOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The levels of precedence an expression can bind with, from lowest
/// (`Min`) to highest (`Max`). Right-associative operators recurse at their
/// own level rather than one above, which yields the `prec` vs `prec-1`
/// behavior of a classic Pratt parser.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Precedence {
    Min,
    MinTypMax,
    Concatenation,
    Assignment,
    Implication,
    Ternary,
    LogicOr,
    LogicAnd,
    BitOr,
    BitXor,
    BitAnd,
    Equality,
    Relational,
    Shift,
    Additive,
    Multiplicative,
    Pow,
    Unary,
    Postfix,
    Scope,
    Max,
}

/// A fully assembled token as handed to the parser: the kind with payload,
/// the span it covers, the leading trivia, and whether the token was
/// synthesized during error recovery.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct FullToken {
    pub kind: Token,
    pub span: Span,
    pub trivia: Vec<Trivia>,
    pub missing: bool,
}

impl FullToken {
    /// Create a token with the given kind, span and leading trivia.
    pub fn new(kind: Token, span: Span, trivia: Vec<Trivia>) -> FullToken {
        FullToken {
            kind: kind,
            span: span,
            trivia: trivia,
            missing: false,
        }
    }

    /// Create a synthesized token standing in for an expected-but-absent
    /// token. Carries no text.
    pub fn missing(kind: Token, span: Span) -> FullToken {
        FullToken {
            kind: kind,
            span: Span::new(span.source, span.begin, span.begin),
            trivia: Vec::new(),
            missing: true,
        }
    }

    /// The raw source text of the token itself, excluding trivia. Empty for
    /// missing tokens.
    pub fn raw_text(&self) -> String {
        if self.missing {
            String::new()
        } else {
            self.span.extract()
        }
    }
}

macro_rules! declare_keywords {(
    $( ($konst:ident, $string:expr) )*
) => {
    /// A SystemVerilog reserved word, as per IEEE 1800-2009 Annex B.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    pub enum Kw {
        $($konst,)*
    }

    impl Kw {
        pub fn as_str(self) -> &'static str {
            match self {
                $(Kw::$konst => $string,)*
            }
        }
    }

    impl fmt::Display for Kw {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "{}", self.as_str())
        }
    }

    /// Look up a string in the keyword table. The table is built once per
    /// thread before the first lexer runs.
    pub fn find_keyword<S: AsRef<str>>(name: S) -> Option<Kw> {
        use std::collections::HashMap;
        thread_local!(static TBL: HashMap<String, Kw> = {
            let mut tbl = HashMap::new();
            $(tbl.insert($string.to_string(), Kw::$konst);)*
            tbl
        });
        TBL.with(|tbl| tbl.get(name.as_ref()).map(|kw| *kw))
    }
}}

declare_keywords! {
    // IEEE 1800-2009 Table B.1
    (AcceptOn,             "accept_on")
    (Alias,                "alias")
    (Always,               "always")
    (AlwaysComb,           "always_comb")
    (AlwaysFf,             "always_ff")
    (AlwaysLatch,          "always_latch")
    (And,                  "and")
    (Assert,               "assert")
    (Assign,               "assign")
    (Assume,               "assume")
    (Automatic,            "automatic")
    (Before,               "before")
    (Begin,                "begin")
    (Bind,                 "bind")
    (Bins,                 "bins")
    (Binsof,               "binsof")
    (Bit,                  "bit")
    (Break,                "break")
    (Buf,                  "buf")
    (Bufif0,               "bufif0")
    (Bufif1,               "bufif1")
    (Byte,                 "byte")
    (Case,                 "case")
    (Casex,                "casex")
    (Casez,                "casez")
    (Cell,                 "cell")
    (Chandle,              "chandle")
    (Checker,              "checker")
    (Class,                "class")
    (Clocking,             "clocking")
    (Cmos,                 "cmos")
    (Config,               "config")
    (Const,                "const")
    (Constraint,           "constraint")
    (Context,              "context")
    (Continue,             "continue")
    (Cover,                "cover")
    (Covergroup,           "covergroup")
    (Coverpoint,           "coverpoint")
    (Cross,                "cross")
    (Deassign,             "deassign")
    (Default,              "default")
    (Defparam,             "defparam")
    (Design,               "design")
    (Disable,              "disable")
    (Dist,                 "dist")
    (Do,                   "do")
    (Edge,                 "edge")
    (Else,                 "else")
    (End,                  "end")
    (Endcase,              "endcase")
    (Endchecker,           "endchecker")
    (Endclass,             "endclass")
    (Endclocking,          "endclocking")
    (Endconfig,            "endconfig")
    (Endfunction,          "endfunction")
    (Endgenerate,          "endgenerate")
    (Endgroup,             "endgroup")
    (Endinterface,         "endinterface")
    (Endmodule,            "endmodule")
    (Endpackage,           "endpackage")
    (Endprimitive,         "endprimitive")
    (Endprogram,           "endprogram")
    (Endproperty,          "endproperty")
    (Endspecify,           "endspecify")
    (Endsequence,          "endsequence")
    (Endtable,             "endtable")
    (Endtask,              "endtask")
    (Enum,                 "enum")
    (Event,                "event")
    (Eventually,           "eventually")
    (Expect,               "expect")
    (Export,               "export")
    (Extends,              "extends")
    (Extern,               "extern")
    (Final,                "final")
    (FirstMatch,           "first_match")
    (For,                  "for")
    (Force,                "force")
    (Foreach,              "foreach")
    (Forever,              "forever")
    (Fork,                 "fork")
    (Forkjoin,             "forkjoin")
    (Function,             "function")
    (Generate,             "generate")
    (Genvar,               "genvar")
    (Global,               "global")
    (Highz0,               "highz0")
    (Highz1,               "highz1")
    (If,                   "if")
    (Iff,                  "iff")
    (Ifnone,               "ifnone")
    (IgnoreBins,           "ignore_bins")
    (IllegalBins,          "illegal_bins")
    (Implements,           "implements")
    (Implies,              "implies")
    (Import,               "import")
    (Incdir,               "incdir")
    (Include,              "include")
    (Initial,              "initial")
    (Inout,                "inout")
    (Input,                "input")
    (Inside,               "inside")
    (Instance,             "instance")
    (Int,                  "int")
    (Integer,              "integer")
    (Interconnect,         "interconnect")
    (Interface,            "interface")
    (Intersect,            "intersect")
    (Join,                 "join")
    (JoinAny,              "join_any")
    (JoinNone,             "join_none")
    (Large,                "large")
    (Let,                  "let")
    (Liblist,              "liblist")
    (Library,              "library")
    (Local,                "local")
    (Localparam,           "localparam")
    (Logic,                "logic")
    (Longint,              "longint")
    (Macromodule,          "macromodule")
    (Matches,              "matches")
    (Medium,               "medium")
    (Modport,              "modport")
    (Module,               "module")
    (Nand,                 "nand")
    (Negedge,              "negedge")
    (Nettype,              "nettype")
    (New,                  "new")
    (Nexttime,             "nexttime")
    (Nmos,                 "nmos")
    (Nor,                  "nor")
    (Noshowcancelled,      "noshowcancelled")
    (Not,                  "not")
    (Notif0,               "notif0")
    (Notif1,               "notif1")
    (Null,                 "null")
    (Or,                   "or")
    (Output,               "output")
    (Package,              "package")
    (Packed,               "packed")
    (Parameter,            "parameter")
    (Pmos,                 "pmos")
    (Posedge,              "posedge")
    (Primitive,            "primitive")
    (Priority,             "priority")
    (Program,              "program")
    (Property,             "property")
    (Protected,            "protected")
    (Pull0,                "pull0")
    (Pull1,                "pull1")
    (Pulldown,             "pulldown")
    (Pullup,               "pullup")
    (PulsestyleOndetect,   "pulsestyle_ondetect")
    (PulsestyleOnevent,    "pulsestyle_onevent")
    (Pure,                 "pure")
    (Rand,                 "rand")
    (Randc,                "randc")
    (Randcase,             "randcase")
    (Randsequence,         "randsequence")
    (Rcmos,                "rcmos")
    (Real,                 "real")
    (Realtime,             "realtime")
    (Ref,                  "ref")
    (Reg,                  "reg")
    (RejectOn,             "reject_on")
    (Release,              "release")
    (Repeat,               "repeat")
    (Restrict,             "restrict")
    (Return,               "return")
    (Rnmos,                "rnmos")
    (Rpmos,                "rpmos")
    (Rtran,                "rtran")
    (Rtranif0,             "rtranif0")
    (Rtranif1,             "rtranif1")
    (SAlways,              "s_always")
    (SEventually,          "s_eventually")
    (SNexttime,            "s_nexttime")
    (SUntil,               "s_until")
    (SUntilWith,           "s_until_with")
    (Scalared,             "scalared")
    (Sequence,             "sequence")
    (Shortint,             "shortint")
    (Shortreal,            "shortreal")
    (Showcancelled,        "showcancelled")
    (Signed,               "signed")
    (Small,                "small")
    (Soft,                 "soft")
    (Solve,                "solve")
    (Specify,              "specify")
    (Specparam,            "specparam")
    (Static,               "static")
    (String,               "string")
    (Strong,               "strong")
    (Strong0,              "strong0")
    (Strong1,              "strong1")
    (Struct,               "struct")
    (Super,                "super")
    (Supply0,              "supply0")
    (Supply1,              "supply1")
    (SyncAcceptOn,         "sync_accept_on")
    (SyncRejectOn,         "sync_reject_on")
    (Table,                "table")
    (Tagged,               "tagged")
    (Task,                 "task")
    (This,                 "this")
    (Throughout,           "throughout")
    (Time,                 "time")
    (Timeprecision,        "timeprecision")
    (Timeunit,             "timeunit")
    (Tran,                 "tran")
    (Tranif0,              "tranif0")
    (Tranif1,              "tranif1")
    (Tri,                  "tri")
    (Tri0,                 "tri0")
    (Tri1,                 "tri1")
    (Triand,               "triand")
    (Trior,                "trior")
    (Trireg,               "trireg")
    (Type,                 "type")
    (Typedef,              "typedef")
    (Union,                "union")
    (Unique,               "unique")
    (Unique0,              "unique0")
    (Unsigned,             "unsigned")
    (Until,                "until")
    (UntilWith,            "until_with")
    (Untyped,              "untyped")
    (Use,                  "use")
    (Uwire,                "uwire")
    (Var,                  "var")
    (Vectored,             "vectored")
    (Virtual,              "virtual")
    (Void,                 "void")
    (Wait,                 "wait")
    (WaitOrder,            "wait_order")
    (Wand,                 "wand")
    (Weak,                 "weak")
    (Weak0,                "weak0")
    (Weak1,                "weak1")
    (While,                "while")
    (Wildcard,             "wildcard")
    (Wire,                 "wire")
    (With,                 "with")
    (Within,               "within")
    (Wor,                  "wor")
    (Xnor,                 "xnor")
    (Xor,                  "xor")
}

/// Intern a string into the global name table, case sensitively. Shorthand
/// used throughout the lexer and its tests.
pub fn intern(s: &str) -> Name {
    get_name_table().intern(s, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lookup() {
        assert_eq!(find_keyword("module"), Some(Kw::Module));
        assert_eq!(find_keyword("always_ff"), Some(Kw::AlwaysFf));
        assert_eq!(find_keyword("join_none"), Some(Kw::JoinNone));
        assert_eq!(find_keyword("s_until_with"), Some(Kw::SUntilWith));
        assert_eq!(find_keyword("modulex"), None);
        assert_eq!(find_keyword("Module"), None);
    }

    #[test]
    fn keyword_spelling() {
        assert_eq!(Kw::Endmodule.as_str(), "endmodule");
        assert_eq!(Kw::PulsestyleOndetect.as_str(), "pulsestyle_ondetect");
    }

    #[test]
    fn operator_precedence() {
        assert!(Op::Mul.get_precedence() > Op::Add.get_precedence());
        assert!(Op::Add.get_precedence() > Op::LogicShL.get_precedence());
        assert!(Op::LogicShL.get_precedence() > Op::Lt.get_precedence());
        assert!(Op::Lt.get_precedence() > Op::LogicEq.get_precedence());
        assert!(Op::LogicEq.get_precedence() > Op::BitAnd.get_precedence());
        assert!(Op::BitAnd.get_precedence() > Op::BitXor.get_precedence());
        assert!(Op::BitXor.get_precedence() > Op::BitOr.get_precedence());
        assert!(Op::BitOr.get_precedence() > Op::LogicAnd.get_precedence());
        assert!(Op::LogicAnd.get_precedence() > Op::LogicOr.get_precedence());
        assert!(Op::LogicOr.get_precedence() > Op::LogicImpl.get_precedence());
        assert!(Precedence::Ternary > Precedence::Implication);
        assert!(Op::Pow.get_precedence() > Op::Mul.get_precedence());
    }

    #[test]
    fn token_equality_ignores_span() {
        let sm = sylva_common::source::get_source_manager();
        let source = sm.add("token_eq.sv", "foo foo");
        let a = FullToken::new(Ident(intern("foo")), Span::new(source, 0, 3), vec![]);
        let b = FullToken::new(Ident(intern("foo")), Span::new(source, 4, 7), vec![]);
        assert_eq!(a.kind, b.kind);
    }
}
