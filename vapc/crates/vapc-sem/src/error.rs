//! Semantic errors.
//!
//! Every error is fatal: it unwinds out of the future that detected it and
//! aborts the compilation. [`SemaError`] is `Clone` because a failed analysis
//! future is shared by every node that awaited it.

use thiserror::Error;
use vapc_util::{Diagnostic, DiagnosticCode, Span};

use crate::config::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemaError {
    // ---- lookup ----
    #[error("`{name}` is not declared in this scope")]
    FailedLookup { name: String, span: Span },

    // ---- type mismatch ----
    #[error("type mismatch: expected `{expected}`, found `{found}`")]
    TypeMismatch {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("no overload of `{name}` matches arguments ({args})")]
    NoMatchingOverload {
        name: String,
        args: String,
        span: Span,
    },

    #[error("call to `{name}` is ambiguous: {count} overloads match ({args})")]
    AmbiguousOverload {
        name: String,
        args: String,
        count: usize,
        span: Span,
    },

    #[error("`{what}` is not a type")]
    NotAType { what: String, span: Span },

    // ---- structural ----
    #[error("redeclaration of `{name}`")]
    Redeclaration { name: String, span: Span },

    #[error("`{name}` already has an overload taking ({params})")]
    DuplicateOverload {
        name: String,
        params: String,
        span: Span,
    },

    #[error("constructor of `{ty}` is not exported from its module")]
    NonExportedConstructor { ty: String, span: Span },

    #[error("invalid entry point `{name}`: {reason}")]
    InvalidEntryPoint {
        name: String,
        reason: String,
        span: Span,
    },

    #[error("invalid instance of `{typeclass}`: {reason}")]
    InstanceMismatch {
        typeclass: String,
        reason: String,
        span: Span,
    },

    #[error("compile-time evaluation failed: {reason}")]
    ConstantEvaluation { reason: String, span: Span },

    // ---- unimplemented ----
    #[error("not implemented: {what}")]
    Unimplemented { what: String, span: Span },

    // ---- engine ----
    #[error("analysis cannot make progress: cyclic or unresolved dependency")]
    Stalled,

    #[error("simplification did not reach a fixpoint after {rounds} rounds")]
    NoFixpoint { rounds: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("malformed module interface: {0}")]
    Interface(String),

    #[error("internal compiler error: {0}")]
    Internal(String),
}

pub type SemaResult<T> = Result<T, SemaError>;

impl SemaError {
    pub fn internal(message: impl Into<String>) -> Self {
        SemaError::Internal(message.into())
    }

    pub fn unimplemented(what: impl Into<String>, span: Span) -> Self {
        SemaError::Unimplemented {
            what: what.into(),
            span,
        }
    }

    /// Source range of the offending node, [`Span::DUMMY`] for engine errors
    pub fn span(&self) -> Span {
        match self {
            SemaError::FailedLookup { span, .. }
            | SemaError::TypeMismatch { span, .. }
            | SemaError::NoMatchingOverload { span, .. }
            | SemaError::AmbiguousOverload { span, .. }
            | SemaError::NotAType { span, .. }
            | SemaError::Redeclaration { span, .. }
            | SemaError::DuplicateOverload { span, .. }
            | SemaError::NonExportedConstructor { span, .. }
            | SemaError::InvalidEntryPoint { span, .. }
            | SemaError::InstanceMismatch { span, .. }
            | SemaError::ConstantEvaluation { span, .. }
            | SemaError::Unimplemented { span, .. } => *span,
            SemaError::Stalled
            | SemaError::NoFixpoint { .. }
            | SemaError::Config(_)
            | SemaError::Interface(_)
            | SemaError::Internal(_) => Span::DUMMY,
        }
    }

    pub fn code(&self) -> DiagnosticCode {
        match self {
            SemaError::FailedLookup { .. } => DiagnosticCode::E3001,
            SemaError::TypeMismatch { .. } => DiagnosticCode::E3002,
            SemaError::NoMatchingOverload { .. } => DiagnosticCode::E3003,
            SemaError::AmbiguousOverload { .. } => DiagnosticCode::E3004,
            SemaError::NotAType { .. } => DiagnosticCode::E3005,
            SemaError::Redeclaration { .. } => DiagnosticCode::E3006,
            SemaError::DuplicateOverload { .. } => DiagnosticCode::E3007,
            SemaError::NonExportedConstructor { .. } => DiagnosticCode::E3008,
            SemaError::InvalidEntryPoint { .. } => DiagnosticCode::E3009,
            SemaError::InstanceMismatch { .. } => DiagnosticCode::E3010,
            SemaError::ConstantEvaluation { .. } => DiagnosticCode::E3011,
            SemaError::Unimplemented { .. } => DiagnosticCode::E3012,
            SemaError::Stalled => DiagnosticCode::E3013,
            SemaError::NoFixpoint { .. } => DiagnosticCode::E3014,
            SemaError::Config(_) | SemaError::Interface(_) | SemaError::Internal(_) => {
                DiagnosticCode::E3099
            }
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let diagnostic = Diagnostic::error(self.to_string(), self.span()).with_code(self.code());
        match self {
            SemaError::Stalled => diagnostic
                .with_note("a recursive function needs an explicit return type annotation"),
            SemaError::Unimplemented { .. } => {
                diagnostic.with_note("this construct is reserved for a future version")
            }
            _ => diagnostic,
        }
    }
}

impl From<ConfigError> for SemaError {
    fn from(err: ConfigError) -> Self {
        SemaError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_error_display() {
        let err = SemaError::FailedLookup {
            name: "x".into(),
            span: Span::point(4, 2),
        };
        assert_eq!(err.to_string(), "`x` is not declared in this scope");
        assert_eq!(err.span(), Span::point(4, 2));
        assert_eq!(err.code(), DiagnosticCode::E3001);
    }

    #[test]
    fn test_engine_errors_have_dummy_span() {
        assert!(SemaError::Stalled.span().is_dummy());
        assert_eq!(
            SemaError::NoFixpoint { rounds: 3 }.to_string(),
            "simplification did not reach a fixpoint after 3 rounds"
        );
    }

    #[test]
    fn test_stalled_diagnostic_has_note() {
        let diag = SemaError::Stalled.to_diagnostic();
        assert_eq!(diag.code, Some(DiagnosticCode::E3013));
        assert_eq!(diag.notes.len(), 1);
    }
}
