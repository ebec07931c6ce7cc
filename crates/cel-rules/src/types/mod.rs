//! Types shared by the parser, checker and evaluator.

mod cel_type;
mod decls;
mod expr;

pub use cel_type::{CelType, ObjectShape, TypeParseError};
pub use decls::{FunctionDecl, FunctionImpl, OverloadDecl, VariableDecl};
pub use expr::{
    BinaryOp, ComprehensionKind, Expr, MapEntry, Span, Spanned, SpannedExpr, UnaryOp,
};
