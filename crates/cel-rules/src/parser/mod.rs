//! Expression parser.
//!
//! [`parse`] turns source text into a [`SpannedExpr`] tree. Macros such as
//! `all` and `map` are expanded while parsing, so the tree never contains a
//! macro call.

mod lexer;
mod macros;
#[allow(clippy::module_inception)]
mod parser;

use std::sync::LazyLock;

pub use macros::{Macro, MacroContext, MacroExpansion, MacroRegistry, MacroStyle, STANDARD_MACROS};

use crate::types::{Span, SpannedExpr};

static STANDARD_REGISTRY: LazyLock<MacroRegistry> = LazyLock::new(MacroRegistry::standard);

/// A syntax error with its source location.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} at {}..{}", .span.start, .span.end)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

/// Result of parsing; `ast` is present only when `errors` is empty.
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub ast: Option<SpannedExpr>,
    pub errors: Vec<ParseError>,
}

impl ParseResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty() && self.ast.is_some()
    }

    pub fn into_result(self) -> Result<SpannedExpr, Vec<ParseError>> {
        match self.ast {
            Some(ast) if self.errors.is_empty() => Ok(ast),
            _ => Err(self.errors),
        }
    }
}

/// Parses an expression with the standard macros.
pub fn parse(input: &str) -> ParseResult {
    parse_with_macros(input, &STANDARD_REGISTRY)
}

pub fn parse_with_macros(input: &str, macros: &MacroRegistry) -> ParseResult {
    let tokens = match lexer::lex(input) {
        Ok(tokens) => tokens,
        Err(errors) => {
            return ParseResult {
                ast: None,
                errors: errors
                    .into_iter()
                    .map(|e| ParseError {
                        message: e.message,
                        span: e.span,
                    })
                    .collect(),
            };
        }
    };

    let (ast, errors) = parser::parse_tokens(&tokens, macros);
    ParseResult { ast, errors }
}
