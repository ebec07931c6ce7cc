//! Runtime faults.

use thiserror::Error;

/// A fault raised while evaluating a program.
///
/// Faults abort evaluation. The only place one is recovered is the `??`
/// operator, which absorbs [`EvalErrorKind::FieldNotFound`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum EvalErrorKind {
    /// A variable or map key is absent from the input.
    #[error("field not found")]
    FieldNotFound,
    /// An operand is of a kind the operation does not accept.
    #[error("type coercion")]
    TypeCoercion,
    /// Integer division or modulo by zero.
    #[error("division by zero")]
    DivisionByZero,
    /// No overload of a function accepts the runtime arguments.
    #[error("no matching overload")]
    NoMatchingOverload,
    /// 64-bit integer arithmetic overflowed.
    #[error("overflow")]
    Overflow,
    #[error("index out of bounds")]
    IndexOutOfBounds,
    /// An argument has the right kind but an unusable value.
    #[error("invalid argument")]
    InvalidArgument,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn field_not_found(name: &str) -> Self {
        Self::new(EvalErrorKind::FieldNotFound, format!("no such key: {}", name))
    }

    pub fn type_coercion(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::TypeCoercion, message)
    }

    /// Convenience for the common "expected X, got Y" coercion fault.
    pub fn unexpected_kind(expected: &str, actual: &str) -> Self {
        Self::type_coercion(format!("expected {}, got {}", expected, actual))
    }

    pub fn division_by_zero() -> Self {
        Self::new(EvalErrorKind::DivisionByZero, "division by zero")
    }

    pub fn modulo_by_zero() -> Self {
        Self::new(EvalErrorKind::DivisionByZero, "modulus by zero")
    }

    pub fn no_matching_overload(function: &str, arg_kinds: &[&str]) -> Self {
        Self::new(
            EvalErrorKind::NoMatchingOverload,
            format!("no matching overload for '{}' applied to ({})", function, arg_kinds.join(", ")),
        )
    }

    pub fn overflow(operation: &str) -> Self {
        Self::new(EvalErrorKind::Overflow, format!("integer overflow in {}", operation))
    }

    pub fn index_out_of_bounds(index: i64, len: usize) -> Self {
        Self::new(
            EvalErrorKind::IndexOutOfBounds,
            format!("index {} out of bounds for list of size {}", index, len),
        )
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::InvalidArgument, message)
    }

    pub fn is_field_not_found(&self) -> bool {
        self.kind == EvalErrorKind::FieldNotFound
    }
}
