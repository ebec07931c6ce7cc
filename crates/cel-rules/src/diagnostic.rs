//! Compile diagnostics.
//!
//! Parse and check problems are both reported as [`Diagnostic`]s carrying a
//! byte span and a 1-based line/column, so a caller can show every problem
//! in an expression at once.

use std::fmt;

use crate::checker::{CheckError, CheckErrorKind};
use crate::parser::ParseError;
use crate::types::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Malformed expression text.
    Syntax,
    /// Identifier not declared in the environment.
    UnknownVariable,
    /// Call to a function the environment does not know.
    UnknownFunction,
    /// Operator, function or selection applied to incompatible types.
    TypeMismatch,
    /// Field absent from the sample document. Only ever a warning.
    UnobservedField,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::Syntax => "syntax error",
            DiagnosticKind::UnknownVariable => "unknown variable",
            DiagnosticKind::UnknownFunction => "unknown function",
            DiagnosticKind::TypeMismatch => "type mismatch",
            DiagnosticKind::UnobservedField => "unobserved field",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
}

/// 1-based line and column; columns count characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let mut offset = offset.min(source.len());
        while !source.is_char_boundary(offset) {
            offset -= 1;
        }
        let before = &source[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;
        Self { line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    pub location: Location,
}

impl Diagnostic {
    pub fn from_parse_error(error: &ParseError, source: &str) -> Self {
        Self {
            kind: DiagnosticKind::Syntax,
            severity: Severity::Error,
            message: error.message.clone(),
            span: error.span.clone(),
            location: Location::from_offset(source, error.span.start),
        }
    }

    pub fn from_check_error(error: &CheckError, source: &str) -> Self {
        let kind = match &error.kind {
            CheckErrorKind::UndeclaredReference { .. } => DiagnosticKind::UnknownVariable,
            CheckErrorKind::UndeclaredFunction { .. } => DiagnosticKind::UnknownFunction,
            CheckErrorKind::NoMatchingOverload { .. }
            | CheckErrorKind::TypeMismatch { .. }
            | CheckErrorKind::UndefinedField { .. } => DiagnosticKind::TypeMismatch,
            CheckErrorKind::UnobservedField { .. } => DiagnosticKind::UnobservedField,
        };
        let severity = if error.is_warning() {
            Severity::Warning
        } else {
            Severity::Error
        };
        Self {
            kind,
            severity,
            message: error.message(),
            span: error.span.clone(),
            location: Location::from_offset(source, error.span.start),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", self.kind, self.location, self.message)
    }
}

/// An expression failed to compile.
///
/// Holds every diagnostic found, warnings included.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{}", summarize(.diagnostics))]
pub struct CompileError {
    pub diagnostics: Vec<Diagnostic>,
}

fn summarize(diagnostics: &[Diagnostic]) -> String {
    let errors: Vec<String> = diagnostics
        .iter()
        .filter(|d| d.is_error())
        .map(Diagnostic::to_string)
        .collect();
    match errors.as_slice() {
        [] => "compilation failed".to_string(),
        [only] => only.clone(),
        [first, rest @ ..] => format!("{} (and {} more)", first, rest.len()),
    }
}

impl CompileError {
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn has_kind(&self, kind: DiagnosticKind) -> bool {
        self.diagnostics.iter().any(|d| d.kind == kind)
    }
}
