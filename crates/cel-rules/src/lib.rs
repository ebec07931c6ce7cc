//! CEL rule expressions over JSON order documents.
//!
//! Expressions are compiled once against an [`Env`] declaring the document's
//! top-level variables, then evaluated any number of times, from any number
//! of threads, against normalized documents.
//!
//! # Quick Start
//!
//! ```
//! use cel_rules::{adapter, CelType, Env, Value};
//! use serde_json::json;
//!
//! let env = Env::with_standard_library()
//!     .with_variable("totalAmount", CelType::Int)
//!     .and_then(|env| env.with_variable("items", CelType::Dyn))
//!     .unwrap();
//!
//! let ast = env
//!     .compile("totalAmount == items.map(i, i.price * i.quantity).sum()")
//!     .unwrap();
//! let program = env.program(&ast);
//!
//! let order = adapter::normalize(&json!({
//!     "totalAmount": 750000,
//!     "items": [
//!         {"price": 300000, "quantity": 2},
//!         {"price": 150000, "quantity": 1}
//!     ]
//! }));
//! assert_eq!(program.eval_document(&order).unwrap(), Value::Bool(true));
//! ```
//!
//! # Modules
//!
//! - `types`: types, declarations and the expression tree
//! - `parser`: lexer, parser and macro expansion
//! - `checker`: type checking, overload resolution, sample shapes
//! - `eval`: values, programs and the evaluator
//! - `ext`: string, list and optional function libraries
//! - `adapter`: JSON in and out
//! - `config`: serializable environment and rule configuration
//! - `rules`: reward rules and the rule engine

mod ast;
mod cache;
mod diagnostic;
mod env;

pub mod adapter;
pub mod checker;
pub mod config;
pub mod eval;
pub mod ext;
pub mod parser;
pub mod rules;
pub mod types;

pub use adapter::{normalize, to_json, AdapterError, RawDocument};
pub use ast::Ast;
pub use cache::ProgramCache;
pub use checker::{check, CheckError, CheckErrorKind, CheckResult, STANDARD_LIBRARY};
pub use config::{ConfigError, EnvConfig, RuleSet, VariableConfig};
pub use diagnostic::{CompileError, Diagnostic, DiagnosticKind, Location, Severity};
pub use env::{Env, EnvError};
pub use eval::{
    Activation, EmptyActivation, EvalError, EvalErrorKind, Evaluator, FunctionRegistry,
    HierarchicalActivation, MapActivation, OptionalValue, Program, Value, ValueMap,
};
pub use parser::{parse, ParseError, ParseResult};
pub use rules::{RewardPolicy, RewardType, Rule, RuleEngine, RuleOutcome, RuleReport};
pub use types::{
    BinaryOp, CelType, ComprehensionKind, Expr, FunctionDecl, MapEntry, ObjectShape,
    OverloadDecl, Span, Spanned, SpannedExpr, TypeParseError, UnaryOp, VariableDecl,
};

/// Failure of a one-shot compile-and-evaluate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}
