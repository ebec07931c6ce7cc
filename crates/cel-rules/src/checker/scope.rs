//! Variable scopes for type checking.
//!
//! Declared variables live in the outermost scope; every comprehension
//! pushes a scope holding its iteration variable, which shadows outer names.

use std::collections::HashMap;

use crate::types::{CelType, VariableDecl};

#[derive(Debug, Clone, Default)]
pub struct Scope {
    variables: HashMap<String, VariableDecl>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_variable(&mut self, name: impl Into<String>, cel_type: CelType) {
        let name = name.into();
        self.variables.insert(name.clone(), VariableDecl::new(name, cel_type));
    }

    pub fn add_decl(&mut self, decl: VariableDecl) {
        self.variables.insert(decl.name.clone(), decl);
    }

    pub fn get(&self, name: &str) -> Option<&VariableDecl> {
        self.variables.get(name)
    }
}

/// Scopes searched from innermost to outermost.
#[derive(Debug, Default)]
pub struct ScopeStack {
    globals: Scope,
    locals: Vec<Scope>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter_scope(&mut self) {
        self.locals.push(Scope::new());
    }

    /// Pops the innermost scope. The global scope is never popped.
    pub fn exit_scope(&mut self) -> Option<Scope> {
        self.locals.pop()
    }

    fn current_mut(&mut self) -> &mut Scope {
        match self.locals.last_mut() {
            Some(scope) => scope,
            None => &mut self.globals,
        }
    }

    /// Adds a variable to the innermost scope.
    pub fn add_variable(&mut self, name: impl Into<String>, cel_type: CelType) {
        self.current_mut().add_variable(name, cel_type);
    }

    pub fn add_decl(&mut self, decl: VariableDecl) {
        self.current_mut().add_decl(decl);
    }

    pub fn resolve(&self, name: &str) -> Option<&VariableDecl> {
        self.locals
            .iter()
            .rev()
            .chain(std::iter::once(&self.globals))
            .find_map(|scope| scope.get(name))
    }

    /// Number of scopes, including the global one.
    pub fn depth(&self) -> usize {
        self.locals.len() + 1
    }
}
