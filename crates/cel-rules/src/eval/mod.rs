//! Evaluation engine.
//!
//! - [`Value`] is the runtime representation of data
//! - [`Activation`] provides variable bindings
//! - [`Program`] pairs a checked expression with its function registry
//! - [`Evaluator`] walks the expression tree
//!
//! # Example
//!
//! ```
//! use cel_rules::{CelType, Env};
//! use cel_rules::eval::{MapActivation, Value};
//!
//! let mut env = Env::with_standard_library();
//! env.declare("totalAmount", CelType::Int).unwrap();
//!
//! let ast = env.compile("totalAmount + 1").unwrap();
//! let program = env.program(&ast);
//!
//! let activation = MapActivation::new().with("totalAmount", 41i64);
//! assert_eq!(program.eval(&activation).unwrap(), Value::Int(42));
//! ```

mod activation;
mod error;
mod evaluator;
mod functions;
mod program;
mod value;

pub use activation::{Activation, EmptyActivation, HierarchicalActivation, MapActivation};
pub use error::{EvalError, EvalErrorKind};
pub use evaluator::Evaluator;
pub use functions::{value_matches, FunctionRegistry};
pub use program::Program;
pub use value::{map_key, OptionalValue, Value, ValueMap};

pub use crate::types::FunctionImpl;
