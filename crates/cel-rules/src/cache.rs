//! Compiled programs keyed by expression text.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::diagnostic::CompileError;
use crate::env::Env;
use crate::eval::Program;

/// Compiles each distinct expression once per environment.
///
/// Safe to share between threads. Two threads missing on the same text at
/// the same time may both compile it; the first insert wins and both get
/// equivalent programs. Failed compilations are not cached.
#[derive(Debug)]
pub struct ProgramCache {
    env: Arc<Env>,
    programs: DashMap<String, Arc<Program>>,
}

impl ProgramCache {
    pub fn new(env: Arc<Env>) -> Self {
        Self {
            env,
            programs: DashMap::new(),
        }
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn get_or_compile(&self, source: &str) -> Result<Arc<Program>, CompileError> {
        if let Some(program) = self.programs.get(source) {
            debug!(len = source.len(), "program cache hit");
            return Ok(Arc::clone(program.value()));
        }

        debug!(len = source.len(), "program cache miss");
        let ast = self.env.compile(source)?;
        let program = Arc::new(self.env.program(&ast));
        let entry = self
            .programs
            .entry(source.to_string())
            .or_insert(program);
        Ok(Arc::clone(entry.value()))
    }

    pub fn get(&self, source: &str) -> Option<Arc<Program>> {
        self.programs.get(source).map(|p| Arc::clone(p.value()))
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    pub fn clear(&self) {
        self.programs.clear();
    }
}
