//! Declarations for variables, functions and their overloads.
//!
//! These are shared by the checker, which reads the signatures, and the
//! evaluator, which calls the implementations.

use std::fmt;
use std::sync::Arc;

use crate::eval::{EvalError, Value};
use crate::types::CelType;

/// Native implementation of one overload.
///
/// Receives the already-evaluated arguments, receiver first for methods.
pub type FunctionImpl = Arc<dyn Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync>;

/// A named, typed input variable.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    pub name: String,
    pub cel_type: CelType,
}

impl VariableDecl {
    pub fn new(name: impl Into<String>, cel_type: CelType) -> Self {
        Self {
            name: name.into(),
            cel_type,
        }
    }
}

/// One signature of a function.
///
/// Parameter types may mention [`CelType::TypeParam`]s, which are bound
/// freshly for every call site during overload resolution.
#[derive(Clone)]
pub struct OverloadDecl {
    /// Unique identifier, e.g. `add_int64_double`.
    pub id: String,
    /// Parameter types, receiver first for member overloads.
    pub params: Vec<CelType>,
    pub result: CelType,
    pub is_member: bool,
    /// Operators are evaluated inline and carry no implementation.
    pub implementation: Option<FunctionImpl>,
}

impl fmt::Debug for OverloadDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverloadDecl")
            .field("id", &self.id)
            .field("params", &self.params)
            .field("result", &self.result)
            .field("is_member", &self.is_member)
            .field("has_impl", &self.implementation.is_some())
            .finish()
    }
}

impl OverloadDecl {
    /// A global function overload: `name(args)`.
    pub fn function(id: impl Into<String>, params: Vec<CelType>, result: CelType) -> Self {
        Self {
            id: id.into(),
            params,
            result,
            is_member: false,
            implementation: None,
        }
    }

    /// A receiver-style overload: `target.name(args)`.
    pub fn method(id: impl Into<String>, params: Vec<CelType>, result: CelType) -> Self {
        Self {
            is_member: true,
            ..Self::function(id, params, result)
        }
    }

    pub fn with_impl<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.implementation = Some(Arc::new(f));
        self
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// A function and all of its overloads.
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: String,
    pub overloads: Vec<OverloadDecl>,
}

impl FunctionDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            overloads: Vec::new(),
        }
    }

    pub fn with_overload(mut self, overload: OverloadDecl) -> Self {
        self.overloads.push(overload);
        self
    }

    /// Merges overloads from another declaration of the same function.
    ///
    /// Overloads whose id is already present are replaced.
    pub fn merge(&mut self, other: FunctionDecl) {
        for overload in other.overloads {
            match self.overloads.iter_mut().find(|o| o.id == overload.id) {
                Some(existing) => *existing = overload,
                None => self.overloads.push(overload),
            }
        }
    }

    /// Overloads callable with the given call shape.
    pub fn candidates(&self, is_member: bool, arity: usize) -> impl Iterator<Item = &OverloadDecl> {
        self.overloads
            .iter()
            .filter(move |o| o.is_member == is_member && o.arity() == arity)
    }
}
