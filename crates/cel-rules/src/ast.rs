//! Parsed and checked expressions.

use std::sync::Arc;

use crate::checker::CheckResult;
use crate::diagnostic::Diagnostic;
use crate::types::{CelType, SpannedExpr};

/// An expression tree together with its source text.
///
/// [`Env::compile`](crate::Env::compile) produces checked ASTs carrying the
/// inferred type of every node and any warnings the checker raised. An
/// unchecked AST holds only the parse.
#[derive(Debug, Clone)]
pub struct Ast {
    expr: SpannedExpr,
    source: Arc<str>,
    type_info: Option<CheckResult>,
    warnings: Vec<Diagnostic>,
}

impl Ast {
    pub fn new_unchecked(expr: SpannedExpr, source: impl Into<Arc<str>>) -> Self {
        Self {
            expr,
            source: source.into(),
            type_info: None,
            warnings: Vec::new(),
        }
    }

    /// Builds a checked AST. Warnings are taken from `check_result`.
    pub fn new_checked(expr: SpannedExpr, source: impl Into<Arc<str>>, check_result: CheckResult) -> Self {
        let source = source.into();
        let warnings = check_result
            .errors
            .iter()
            .filter(|e| e.is_warning())
            .map(|e| Diagnostic::from_check_error(e, &source))
            .collect();
        Self {
            expr,
            source,
            type_info: Some(check_result),
            warnings,
        }
    }

    pub fn is_checked(&self) -> bool {
        self.type_info.is_some()
    }

    pub fn expr(&self) -> &SpannedExpr {
        &self.expr
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn type_info(&self) -> Option<&CheckResult> {
        self.type_info.as_ref()
    }

    /// Type of the whole expression, if checked.
    pub fn result_type(&self) -> Option<&CelType> {
        self.type_info
            .as_ref()
            .and_then(|info| info.get_type(self.expr.id))
    }

    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }
}
