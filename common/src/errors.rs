// Copyright (c) 2016-2021 Fabian Schuiki

//! Utilities to implement diagnostics and error reporting facilities.

use crate::source::Span;
use std::fmt;

/// Emits diagnostic messages. This is the sink every pipeline stage reports
/// into; the implementation decides whether to print, collect, or discard.
pub trait DiagEmitter {
    /// Emit a diagnostic message.
    fn emit(&self, diag: DiagBuilder2);
}

impl<'a, T> DiagEmitter for &'a T
where
    T: DiagEmitter + ?Sized,
{
    fn emit(&self, diag: DiagBuilder2) {
        (*self).emit(diag)
    }
}

/// A diagnostic message under construction, together with the severity and
/// the source spans and notes that accompany it.
#[must_use]
#[derive(Clone, Debug)]
pub struct DiagBuilder2 {
    pub severity: Severity,
    pub message: String,
    pub segments: Vec<DiagSegment>,
}

/// A portion of a diagnostic message.
#[derive(Clone, Debug)]
pub enum DiagSegment {
    Span(Span),
    Note(String),
}

/// A diagnostic result type. Either carries the result `T` in the Ok variant,
/// or an assembled diagnostic in the Err variant.
pub type DiagResult2<T> = Result<T, DiagBuilder2>;

impl DiagBuilder2 {
    pub fn new<S: Into<String>>(severity: Severity, message: S) -> DiagBuilder2 {
        DiagBuilder2 {
            severity: severity,
            message: message.into(),
            segments: Vec::new(),
        }
    }

    pub fn bug<S: Into<String>>(message: S) -> DiagBuilder2 {
        DiagBuilder2::new(Severity::Bug, message)
    }

    pub fn fatal<S: Into<String>>(message: S) -> DiagBuilder2 {
        DiagBuilder2::new(Severity::Fatal, message)
    }

    pub fn error<S: Into<String>>(message: S) -> DiagBuilder2 {
        DiagBuilder2::new(Severity::Error, message)
    }

    pub fn warning<S: Into<String>>(message: S) -> DiagBuilder2 {
        DiagBuilder2::new(Severity::Warning, message)
    }

    pub fn note<S: Into<String>>(message: S) -> DiagBuilder2 {
        DiagBuilder2::new(Severity::Note, message)
    }

    pub fn segment(self, segment: DiagSegment) -> DiagBuilder2 {
        let mut segments = self.segments;
        segments.push(segment);
        DiagBuilder2 {
            segments: segments,
            ..self
        }
    }

    pub fn span<S: Into<Span>>(self, span: S) -> DiagBuilder2 {
        self.segment(DiagSegment::Span(span.into()))
    }

    pub fn add_note<S: Into<String>>(self, message: S) -> DiagBuilder2 {
        self.segment(DiagSegment::Note(message.into()))
    }

    pub fn get_severity(&self) -> Severity {
        self.severity
    }

    pub fn get_message(&self) -> &String {
        &self.message
    }

    pub fn get_segments(&self) -> &[DiagSegment] {
        &self.segments
    }
}

/// The severity of a diagnostic.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Severity {
    Note,
    Warning,
    Error,
    Fatal,
    Bug,
}

impl Severity {
    pub fn to_str(self) -> &'static str {
        match self {
            Severity::Fatal => "fatal",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
            Severity::Bug => "compiler bug",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl fmt::Display for DiagBuilder2 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}\n", self.get_severity(), self.get_message())?;
        for segment in &self.segments {
            match *segment {
                DiagSegment::Span(sp) => {
                    if sp.source.0 == 0 {
                        continue;
                    }
                    let (line, col, line_offset) = sp.begin().human();
                    let content = sp.source.get_content();
                    let bytes = content.bytes();
                    let line_end = bytes[line_offset..]
                        .iter()
                        .position(|&b| b == b'\n')
                        .map(|p| line_offset + p)
                        .unwrap_or(bytes.len());
                    let text = content.extract(line_offset, line_end);
                    write!(f, "  --> {}:{}:{}\n", sp.source.get_path(), line, col)?;
                    write!(f, "   | {}\n", text)?;
                    write!(f, "   | ")?;
                    for (i, c) in text.char_indices() {
                        let i = i + line_offset;
                        let d = if (i >= sp.begin && i < sp.end)
                            || (i == sp.begin && sp.begin == sp.end)
                        {
                            '^'
                        } else if c == '\t' {
                            '\t'
                        } else {
                            ' '
                        };
                        write!(f, "{}", d)?;
                    }
                    write!(f, "\n")?;
                }
                DiagSegment::Note(ref message) => write!(f, "   = note: {}\n", message)?,
            }
        }
        Ok(())
    }
}

/// A collector that stores emitted diagnostics for later inspection. Useful
/// in unit tests and for callers that render diagnostics themselves.
#[derive(Default)]
pub struct DiagCollector {
    pub diags: std::cell::RefCell<Vec<DiagBuilder2>>,
}

impl DiagCollector {
    pub fn new() -> DiagCollector {
        Default::default()
    }

    /// The worst severity collected so far, if any.
    pub fn severity(&self) -> Option<Severity> {
        self.diags.borrow().iter().map(|d| d.severity).max()
    }

    /// Number of collected diagnostics.
    pub fn len(&self) -> usize {
        self.diags.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.diags.borrow().is_empty()
    }
}

impl DiagEmitter for DiagCollector {
    fn emit(&self, diag: DiagBuilder2) {
        self.diags.borrow_mut().push(diag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_order() {
        assert!(Severity::Bug > Severity::Fatal);
        assert!(Severity::Fatal > Severity::Error);
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Note);
    }

    #[test]
    fn collector() {
        let coll = DiagCollector::new();
        assert!(coll.is_empty());
        coll.emit(DiagBuilder2::warning("careful"));
        coll.emit(DiagBuilder2::error("broken"));
        assert_eq!(coll.len(), 2);
        assert_eq!(coll.severity(), Some(Severity::Error));
    }
}
