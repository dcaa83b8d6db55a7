// Copyright (c) 2016-2021 Fabian Schuiki

//! The categorizing lexer. Divides the bytes of an input file into coarse
//! groups of tokens: newlines, whitespace, comments, symbols, digits, and
//! text. Concatenating the spans of the emitted tokens reproduces the file,
//! i.e. no information is lost.

use crate::preproc::DirectiveKind;
use sylva_common::source::*;
use std::rc::Rc;

pub use self::CatTokenKind::*;

/// A token emitted by the categorizing lexer.
pub type CatToken = (CatTokenKind, Span);

/// The different kinds of tokens the categorizing lexer can emit.
///
/// The `Disabled` and `Directive` variants are never produced by the
/// categorizer itself. They are synthesized by the preprocessor to carry
/// conditionally skipped regions and processed directives downstream, where
/// the lexer attaches them to tokens as trivia.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CatTokenKind {
    Newline,
    Whitespace,
    LineComment,
    BlockComment,
    Symbol(char),
    Digits,
    Text,
    Disabled,
    Directive(DirectiveKind),
    Eof,
}

/// The categorizing lexer over one source file.
///
/// Owns the file content and walks it by byte offset, so the preprocessor can
/// keep a whole stack of these alive without borrowing from the source
/// manager.
pub struct Cat {
    source: Source,
    content: Rc<dyn SourceContent>,
    pos: usize,
}

impl Cat {
    /// Create a new categorizing lexer at the beginning of a source file.
    pub fn new(source: Source) -> Cat {
        let content = source.get_content();
        Cat {
            source: source,
            content: content,
            pos: 0,
        }
    }

    /// The source file this lexer operates on.
    pub fn source(&self) -> Source {
        self.source
    }

    /// Decode the character at byte offset `at`, together with its encoded
    /// length. Invalid UTF-8 sequences decode to the replacement character
    /// one byte at a time, which later surfaces as an unknown token.
    fn char_at(&self, at: usize) -> Option<(char, usize)> {
        let bytes = self.content.bytes();
        if at >= bytes.len() {
            return None;
        }
        let window = &bytes[at..bytes.len().min(at + 4)];
        match std::str::from_utf8(window) {
            Ok(s) => s.chars().next().map(|c| (c, c.len_utf8())),
            Err(e) if e.valid_up_to() > 0 => {
                let s = unsafe { std::str::from_utf8_unchecked(&window[..e.valid_up_to()]) };
                s.chars().next().map(|c| (c, c.len_utf8()))
            }
            Err(_) => Some((std::char::REPLACEMENT_CHARACTER, 1)),
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        let mut at = self.pos;
        let mut remaining = offset;
        loop {
            let (c, len) = self.char_at(at)?;
            if remaining == 0 {
                return Some(c);
            }
            at += len;
            remaining -= 1;
        }
    }

    /// Advance past the character at the current position.
    fn bump(&mut self) {
        if let Some((_, len)) = self.char_at(self.pos) {
            self.pos += len;
        }
    }

    fn span_from(&self, begin: usize) -> Span {
        Span::new(self.source, begin, self.pos)
    }
}

impl Iterator for Cat {
    type Item = CatToken;

    fn next(&mut self) -> Option<CatToken> {
        let p0 = self.pos;
        let c0 = self.peek(0)?;

        // Newlines are tokens of their own, since the preprocessor cares
        // about logical line boundaries.
        if c0 == '\n' {
            self.bump();
            return Some((Newline, self.span_from(p0)));
        }

        // IEEE 1800-2009 5.3
        if is_whitespace(c0) {
            while let Some(c) = self.peek(0) {
                if !is_whitespace(c) {
                    break;
                }
                self.bump();
            }
            return Some((Whitespace, self.span_from(p0)));
        }

        // IEEE 1800-2009 5.4 Comments
        if c0 == '/' && self.peek(1) == Some('/') {
            while let Some(c) = self.peek(0) {
                if c == '\n' {
                    break;
                }
                self.bump();
            }
            return Some((LineComment, self.span_from(p0)));
        }
        if c0 == '/' && self.peek(1) == Some('*') {
            self.bump();
            self.bump();
            loop {
                match (self.peek(0), self.peek(1)) {
                    (Some('*'), Some('/')) => {
                        self.bump();
                        self.bump();
                        break;
                    }
                    (Some(_), _) => self.bump(),
                    (None, _) => break,
                }
            }
            return Some((BlockComment, self.span_from(p0)));
        }

        // Digit runs are kept separate from text, which allows the lexer to
        // tell numbers and identifiers apart by their leading token.
        if c0.is_ascii_digit() {
            while let Some(c) = self.peek(0) {
                if !c.is_ascii_digit() {
                    break;
                }
                self.bump();
            }
            return Some((Digits, self.span_from(p0)));
        }

        // IEEE 1800-2009 5.5 Operators & 11.3 Operators
        if is_symbol(c0) {
            self.bump();
            return Some((Symbol(c0), self.span_from(p0)));
        }

        // Letter runs, ASCII or not, form text tokens.
        if c0.is_alphanumeric() {
            while let Some(c) = self.peek(0) {
                if !c.is_alphanumeric() || c.is_ascii_digit() {
                    break;
                }
                self.bump();
            }
            return Some((Text, self.span_from(p0)));
        }

        // Anything left cannot be classified; emit it as a symbol so the
        // lexer can diagnose it.
        self.bump();
        Some((Symbol(c0), self.span_from(p0)))
    }
}

/// Check whether the given character is considered a whitespace in
/// SystemVerilog. Newlines are treated separately.
fn is_whitespace(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\r' || c == (0xA0 as char)
}

/// Check whether the given character is considered a symbol in SystemVerilog.
fn is_symbol(c: char) -> bool {
    c.is_ascii_punctuation()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(name: &str, input: &str) -> Vec<(CatTokenKind, String)> {
        let sm = get_source_manager();
        let source = sm.add(name, input);
        Cat::new(source)
            .map(|(kind, sp)| (kind, sp.extract()))
            .collect()
    }

    #[test]
    fn empty() {
        assert_eq!(lex("cat_empty.sv", ""), vec![]);
    }

    #[test]
    fn non_ascii_text() {
        assert_eq!(
            lex("cat_text.sv", "Löwe 老虎 Léopard\n"),
            vec![
                (Text, "Löwe".into()),
                (Whitespace, " ".into()),
                (Text, "老虎".into()),
                (Whitespace, " ".into()),
                (Text, "Léopard".into()),
                (Newline, "\n".into()),
            ]
        );
    }

    #[test]
    fn digits_and_symbols() {
        assert_eq!(
            lex("cat_num.sv", "a4 = 16'h2F;"),
            vec![
                (Text, "a".into()),
                (Digits, "4".into()),
                (Whitespace, " ".into()),
                (Symbol('='), "=".into()),
                (Whitespace, " ".into()),
                (Digits, "16".into()),
                (Symbol('\''), "'".into()),
                (Text, "h".into()),
                (Digits, "2".into()),
                (Text, "F".into()),
                (Symbol(';'), ";".into()),
            ]
        );
    }

    #[test]
    fn comments() {
        assert_eq!(
            lex("cat_comments.sv", "x// line\n/* block\n */y"),
            vec![
                (Text, "x".into()),
                (LineComment, "// line".into()),
                (Newline, "\n".into()),
                (BlockComment, "/* block\n */".into()),
                (Text, "y".into()),
            ]
        );
    }

    #[test]
    fn lossless() {
        let input = "module A; // hi\n  wire [7:0] x = 8'hFF;\nendmodule\n";
        let sm = get_source_manager();
        let source = sm.add("cat_lossless.sv", input);
        let text: String = Cat::new(source).map(|(_, sp)| sp.extract()).collect();
        assert_eq!(text, input);
    }
}
