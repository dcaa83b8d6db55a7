// Copyright (c) 2016-2021 Fabian Schuiki

//! Trivia attached to tokens: whitespace, comments, and preprocessor
//! residue. Trivia is not part of the grammar but is preserved so that the
//! emitted token stream can reproduce the input byte for byte.

use crate::preproc::DirectiveKind;
use sylva_common::source::Span;

/// A piece of trivia, attached to the token that follows it. The final
/// end-of-file token carries any trailing trivia of the buffer.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Trivia {
    /// Spaces, tabs, and newlines.
    Whitespace(Span),
    /// A `// ...` comment, excluding the terminating newline.
    LineComment(Span),
    /// A `/* ... */` comment.
    BlockComment(Span),
    /// Tokens skipped over during parser error recovery or lexer noise
    /// removal, e.g. attribute instances.
    SkippedTokens(Span),
    /// A region excluded by the conditional-inclusion directives.
    DisabledText(Span),
    /// The full text of a processed preprocessor directive.
    Directive(DirectiveKind, Span),
}

impl Trivia {
    /// The source span this trivia covers.
    pub fn span(&self) -> Span {
        match *self {
            Trivia::Whitespace(sp)
            | Trivia::LineComment(sp)
            | Trivia::BlockComment(sp)
            | Trivia::SkippedTokens(sp)
            | Trivia::DisabledText(sp)
            | Trivia::Directive(_, sp) => sp,
        }
    }

    /// Whether this trivia stems from the preprocessor rather than the raw
    /// character stream.
    pub fn is_preprocessed(&self) -> bool {
        match *self {
            Trivia::DisabledText(_) | Trivia::Directive(..) => true,
            _ => false,
        }
    }
}
