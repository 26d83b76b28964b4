//! Diagnostic reporting.
//!
//! Errors detected by the semantic core are fatal: the first one aborts the
//! compilation. The driver turns it into a [`Diagnostic`] and renders it with
//! the source location and a snippet.
//!
//! # Examples
//!
//! ```
//! use vapc_util::diagnostic::{Diagnostic, DiagnosticCode};
//! use vapc_util::span::{SourceMap, Span};
//!
//! let diag = Diagnostic::error("`x` is not declared", Span::DUMMY).with_code(DiagnosticCode::E3001);
//! let rendered = diag.render(&SourceMap::new());
//! assert!(rendered.ends_with("error[E3001]: `x` is not declared"));
//! ```

mod codes;

pub use codes::DiagnosticCode;

use std::fmt;

use crate::span::{SourceMap, Span};

/// Diagnostic severity level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Level {
    Note,
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Note => "note",
            Level::Warning => "warning",
            Level::Error => "error",
        })
    }
}

/// A single diagnostic message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// Diagnostic severity level
    pub level: Level,
    /// Main diagnostic message
    pub message: String,
    /// Source location
    pub span: Span,
    /// Optional diagnostic code
    pub code: Option<DiagnosticCode>,
    /// Additional notes for context
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn new(level: Level, message: impl Into<String>, span: Span) -> Self {
        Self {
            level,
            message: message.into(),
            span,
            code: None,
            notes: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self::new(Level::Error, message, span)
    }

    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self::new(Level::Warning, message, span)
    }

    pub fn with_code(mut self, code: DiagnosticCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Render as `file:line:column: level[code]: message`, followed by the
    /// source snippet and notes when available.
    pub fn render(&self, sources: &SourceMap) -> String {
        let mut out = format!("{}: {}", sources.location(self.span), self.level);
        if let Some(code) = self.code {
            out.push_str(&format!("[{code}]"));
        }
        out.push_str(": ");
        out.push_str(&self.message);
        if let Some(snippet) = sources.snippet(self.span) {
            out.push('\n');
            out.push_str(&snippet);
        }
        for note in &self.notes {
            out.push_str("\n     = note: ");
            out.push_str(note);
        }
        out
    }
}
