//! Type checking.
//!
//! The checker infers a type for every node of a parsed expression, resolves
//! operators and functions against their declared overloads, and reports
//! undeclared names and statically impossible operations. Shapes observed in
//! a sample document can stand in for `dyn` declarations, see [`shape`].

#[allow(clippy::module_inception)]
mod checker;
mod errors;
mod overload;
mod scope;
pub mod shape;
mod standard_library;

pub use checker::{check, CheckResult, Checker};
pub use errors::{CheckError, CheckErrorKind};
pub use overload::{resolve_overload, OverloadResult};
pub use scope::{Scope, ScopeStack};
pub use standard_library::STANDARD_LIBRARY;
