//! Compiled program ready for evaluation.

use std::sync::Arc;

use super::{Activation, EmptyActivation, EvalError, Evaluator, FunctionRegistry, Value};
use crate::Ast;

/// A checked expression bound to the functions it was checked against.
///
/// Programs are immutable. Clones share the tree and the registry, and a
/// single program may be evaluated from many threads at once.
#[derive(Clone)]
pub struct Program {
    ast: Arc<Ast>,
    functions: Arc<FunctionRegistry>,
}

impl Program {
    pub fn new(ast: Arc<Ast>, functions: Arc<FunctionRegistry>) -> Self {
        Self { ast, functions }
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Evaluates the program with the given variable bindings.
    pub fn eval(&self, activation: &dyn Activation) -> Result<Value, EvalError> {
        Evaluator::new(activation, &self.functions).eval(self.ast.expr())
    }

    /// Evaluates against a normalized document whose top-level keys are
    /// the variables.
    ///
    /// A document that is not a map cannot bind anything and is a
    /// [`TypeCoercion`](super::EvalErrorKind::TypeCoercion) fault.
    pub fn eval_document(&self, document: &Value) -> Result<Value, EvalError> {
        match document {
            Value::Map(map) => self.eval(&**map),
            other => Err(EvalError::unexpected_kind("map document", other.kind_name())),
        }
    }

    pub fn eval_empty(&self) -> Result<Value, EvalError> {
        self.eval(&EmptyActivation)
    }
}

impl std::fmt::Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program")
            .field("source", &self.ast.source())
            .field("functions", &format!("{} functions", self.functions.len()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{EvalErrorKind, MapActivation};
    use crate::parse;

    fn create_program(source: &str) -> Program {
        let result = parse(source);
        assert!(result.errors.is_empty());
        let ast = Ast::new_unchecked(result.ast.unwrap(), source);
        Program::new(Arc::new(ast), Arc::new(FunctionRegistry::new()))
    }

    #[test]
    fn test_eval_literal() {
        let program = create_program("42");
        assert_eq!(program.eval_empty().unwrap(), Value::Int(42));
    }

    #[test]
    fn test_reuse_program() {
        let program = create_program("x * 2");

        let act1 = MapActivation::new().with("x", 5i64);
        assert_eq!(program.eval(&act1).unwrap(), Value::Int(10));

        let act2 = MapActivation::new().with("x", 21i64);
        assert_eq!(program.eval(&act2).unwrap(), Value::Int(42));
    }

    #[test]
    fn test_eval_document() {
        let program = create_program("totalAmount > 100");
        let document = Value::map([("totalAmount", Value::Int(250))]);
        assert_eq!(program.eval_document(&document).unwrap(), Value::Bool(true));

        let err = program.eval_document(&Value::Int(1)).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::TypeCoercion);
    }

    #[test]
    fn test_program_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Program>();
    }
}
