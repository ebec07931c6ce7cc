//! Problems found while type checking.

use std::fmt;

use crate::types::{CelType, Span};

/// A type checking problem attached to an expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckError {
    pub kind: CheckErrorKind,
    pub span: Span,
    pub expr_id: i64,
}

impl CheckError {
    pub fn new(kind: CheckErrorKind, span: Span, expr_id: i64) -> Self {
        Self {
            kind,
            span,
            expr_id,
        }
    }

    pub fn undeclared_reference(name: &str, span: Span, expr_id: i64) -> Self {
        Self::new(
            CheckErrorKind::UndeclaredReference {
                name: name.to_string(),
            },
            span,
            expr_id,
        )
    }

    pub fn undeclared_function(name: &str, span: Span, expr_id: i64) -> Self {
        Self::new(
            CheckErrorKind::UndeclaredFunction {
                name: name.to_string(),
            },
            span,
            expr_id,
        )
    }

    pub fn no_matching_overload(function: &str, arg_types: Vec<CelType>, span: Span, expr_id: i64) -> Self {
        Self::new(
            CheckErrorKind::NoMatchingOverload {
                function: function.to_string(),
                arg_types,
            },
            span,
            expr_id,
        )
    }

    pub fn type_mismatch(expected: CelType, actual: CelType, span: Span, expr_id: i64) -> Self {
        Self::new(CheckErrorKind::TypeMismatch { expected, actual }, span, expr_id)
    }

    pub fn undefined_field(type_name: &str, field: &str, span: Span, expr_id: i64) -> Self {
        Self::new(
            CheckErrorKind::UndefinedField {
                type_name: type_name.to_string(),
                field: field.to_string(),
            },
            span,
            expr_id,
        )
    }

    pub fn unobserved_field(field: &str, observed: Vec<String>, span: Span, expr_id: i64) -> Self {
        Self::new(
            CheckErrorKind::UnobservedField {
                field: field.to_string(),
                observed,
            },
            span,
            expr_id,
        )
    }

    /// Warnings are reported but do not fail compilation.
    pub fn is_warning(&self) -> bool {
        matches!(self.kind, CheckErrorKind::UnobservedField { .. })
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for CheckError {}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckErrorKind {
    /// An identifier that is neither declared nor bound by a macro.
    UndeclaredReference { name: String },

    UndeclaredFunction { name: String },

    /// No overload of the function accepts the argument types.
    NoMatchingOverload {
        function: String,
        arg_types: Vec<CelType>,
    },

    TypeMismatch { expected: CelType, actual: CelType },

    /// Field selection on a type that has no fields.
    UndefinedField { type_name: String, field: String },

    /// A field that the sample document did not contain. Advisory only.
    UnobservedField { field: String, observed: Vec<String> },
}

impl fmt::Display for CheckErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckErrorKind::UndeclaredReference { name } => {
                write!(f, "undeclared reference to '{}'", name)
            }
            CheckErrorKind::UndeclaredFunction { name } => {
                write!(f, "undeclared function '{}'", name)
            }
            CheckErrorKind::NoMatchingOverload {
                function,
                arg_types,
            } => {
                let types: Vec<_> = arg_types.iter().map(|t| t.display_name()).collect();
                write!(
                    f,
                    "found no matching overload for '{}' applied to ({})",
                    function,
                    types.join(", ")
                )
            }
            CheckErrorKind::TypeMismatch { expected, actual } => {
                write!(f, "expected type '{}' but found '{}'", expected, actual)
            }
            CheckErrorKind::UndefinedField { type_name, field } => {
                write!(f, "type '{}' does not support field selection of '{}'", type_name, field)
            }
            CheckErrorKind::UnobservedField { field, observed } => {
                write!(
                    f,
                    "field '{}' was not observed in the sample document (observed: {})",
                    field,
                    observed.join(", ")
                )
            }
        }
    }
}
