//! The compilation environment.
//!
//! An [`Env`] owns the declared input variables and the function registry.
//! It is built once, then shared read-only by every compilation; compiled
//! [`Program`]s keep their own handle on the registry.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::adapter::normalize;
use crate::ast::Ast;
use crate::checker::{check, shape, CheckResult, STANDARD_LIBRARY};
use crate::config::EnvConfig;
use crate::diagnostic::{CompileError, Diagnostic};
use crate::eval::{FunctionRegistry, Program, Value};
use crate::ext;
use crate::parser::{self, ParseResult};
use crate::types::{CelType, FunctionDecl, SpannedExpr, TypeParseError, VariableDecl};
use crate::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvError {
    #[error("variable '{name}' is already declared")]
    DuplicateDeclaration { name: String },
    #[error("variable '{name}': {source}")]
    InvalidType {
        name: String,
        #[source]
        source: TypeParseError,
    },
}

/// Declared variables plus the functions expressions may call.
///
/// # Example
///
/// ```
/// use cel_rules::{CelType, Env, Value};
///
/// let mut env = Env::with_standard_library();
/// env.declare("totalAmount", CelType::Int).unwrap();
///
/// let ast = env.compile("totalAmount >= 500000").unwrap();
/// assert_eq!(ast.result_type(), Some(&CelType::Bool));
///
/// let document = Value::map([("totalAmount", Value::Int(750000))]);
/// let result = env.program(&ast).eval_document(&document).unwrap();
/// assert_eq!(result, Value::Bool(true));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Env {
    /// In declaration order.
    variables: Vec<VariableDecl>,
    names: HashSet<String>,
    functions: Arc<FunctionRegistry>,
}

impl Env {
    /// An environment with no variables and no functions.
    pub fn new() -> Self {
        Self::default()
    }

    /// An environment with the operators, conversions and extension
    /// libraries registered.
    pub fn with_standard_library() -> Self {
        let mut functions = FunctionRegistry::new();
        for func in STANDARD_LIBRARY.iter() {
            functions.register(func.clone());
        }
        for func in ext::all_extensions() {
            functions.register(func);
        }

        Self {
            functions: Arc::new(functions),
            ..Self::default()
        }
    }

    /// Builds a standard-library environment declaring every configured
    /// variable.
    pub fn from_config(config: &EnvConfig) -> Result<Self, EnvError> {
        let mut env = Self::with_standard_library();
        for var in &config.variables {
            let cel_type = var.cel_type().map_err(|source| EnvError::InvalidType {
                name: var.name.clone(),
                source,
            })?;
            env.declare(var.name.clone(), cel_type)?;
        }
        Ok(env)
    }

    /// Declares an input variable.
    pub fn declare(&mut self, name: impl Into<String>, cel_type: CelType) -> Result<(), EnvError> {
        let name = name.into();
        if !self.names.insert(name.clone()) {
            return Err(EnvError::DuplicateDeclaration { name });
        }
        self.variables.push(VariableDecl::new(name, cel_type));
        Ok(())
    }

    /// Builder form of [`declare`](Self::declare).
    pub fn with_variable(mut self, name: impl Into<String>, cel_type: CelType) -> Result<Self, EnvError> {
        self.declare(name, cel_type)?;
        Ok(self)
    }

    /// Registers a function, merging overloads with an existing one of the
    /// same name.
    pub fn add_function(&mut self, decl: FunctionDecl) {
        Arc::make_mut(&mut self.functions).register(decl);
    }

    pub fn with_function(mut self, decl: FunctionDecl) -> Self {
        self.add_function(decl);
        self
    }

    pub fn variables(&self) -> &[VariableDecl] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&CelType> {
        self.variables
            .iter()
            .find(|v| v.name == name)
            .map(|v| &v.cel_type)
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn parse(&self, source: &str) -> ParseResult {
        parser::parse(source)
    }

    pub fn check(&self, expr: &SpannedExpr) -> CheckResult {
        check(expr, &self.variables, &self.functions)
    }

    /// Parses and type-checks an expression.
    ///
    /// On failure every diagnostic found is returned, not just the first.
    pub fn compile(&self, source: &str) -> Result<Ast, CompileError> {
        self.compile_with(source, &self.variables)
    }

    /// Like [`compile`](Self::compile), with `dyn` declarations refined from
    /// the shape of a sample document.
    ///
    /// Fields the sample lacks are reported as warnings on the returned
    /// [`Ast`]; they never fail compilation.
    pub fn compile_with_sample(&self, source: &str, sample: &Value) -> Result<Ast, CompileError> {
        let Some(document) = sample.as_map() else {
            return self.compile(source);
        };
        let variables: Vec<VariableDecl> = self
            .variables
            .iter()
            .map(|decl| match document.get(&decl.name) {
                Some(value) => VariableDecl::new(
                    decl.name.clone(),
                    shape::refine(&decl.cel_type, &shape::observed_type(value)),
                ),
                None => decl.clone(),
            })
            .collect();
        self.compile_with(source, &variables)
    }

    fn compile_with(&self, source: &str, variables: &[VariableDecl]) -> Result<Ast, CompileError> {
        let expr = match self.parse(source).into_result() {
            Ok(expr) => expr,
            Err(errors) => {
                debug!(len = source.len(), errors = errors.len(), "expression failed to parse");
                let diagnostics = errors
                    .iter()
                    .map(|e| Diagnostic::from_parse_error(e, source))
                    .collect();
                return Err(CompileError::new(diagnostics));
            }
        };

        let result = check(&expr, variables, &self.functions);
        let warnings = result.errors.iter().filter(|e| e.is_warning()).count();
        let errors = result.errors.len() - warnings;
        debug!(len = source.len(), errors, warnings, "checked expression");

        if !result.is_ok() {
            let diagnostics = result
                .errors
                .iter()
                .map(|e| Diagnostic::from_check_error(e, source))
                .collect();
            return Err(CompileError::new(diagnostics));
        }
        Ok(Ast::new_checked(expr, source, result))
    }

    /// Binds a checked AST to this environment's functions.
    pub fn program(&self, ast: &Ast) -> Program {
        Program::new(Arc::new(ast.clone()), Arc::clone(&self.functions))
    }

    /// Compiles `source` using `document` as the sample, then evaluates it
    /// against the same document.
    pub fn eval_json(&self, source: &str, document: &serde_json::Value) -> Result<Value, Error> {
        let document = normalize(document);
        let ast = self.compile_with_sample(source, &document)?;
        Ok(self.program(&ast).eval_document(&document)?)
    }
}
