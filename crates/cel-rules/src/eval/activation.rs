//! Variable bindings for evaluation.

use std::collections::HashMap;

use super::{Value, ValueMap};

/// Resolves variable names to values during evaluation.
pub trait Activation: Send + Sync {
    /// Returns `None` when the name is not bound.
    fn resolve(&self, name: &str) -> Option<Value>;
}

/// Bindings held in a `HashMap`.
#[derive(Debug, Clone, Default)]
pub struct MapActivation {
    bindings: HashMap<String, Value>,
}

impl MapActivation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.bindings.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }
}

impl Activation for MapActivation {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.bindings.get(name).cloned()
    }
}

/// A normalized input document: each top-level key is a variable.
impl Activation for ValueMap {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

/// A scope that shadows its parent, used for comprehension variables.
pub struct HierarchicalActivation<'a> {
    parent: &'a dyn Activation,
    name: &'a str,
    value: Value,
}

impl<'a> HierarchicalActivation<'a> {
    pub fn new(parent: &'a dyn Activation, name: &'a str, value: Value) -> Self {
        Self {
            parent,
            name,
            value,
        }
    }
}

impl Activation for HierarchicalActivation<'_> {
    fn resolve(&self, name: &str) -> Option<Value> {
        if name == self.name {
            Some(self.value.clone())
        } else {
            self.parent.resolve(name)
        }
    }
}

/// No bindings at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyActivation;

impl Activation for EmptyActivation {
    fn resolve(&self, _name: &str) -> Option<Value> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hierarchical_shadows_parent() {
        let parent = MapActivation::new().with("i", 1i64).with("total", 10i64);
        let scope = HierarchicalActivation::new(&parent, "i", Value::Int(2));
        assert_eq!(scope.resolve("i"), Some(Value::Int(2)));
        assert_eq!(scope.resolve("total"), Some(Value::Int(10)));
        assert_eq!(parent.resolve("i"), Some(Value::Int(1)));
        assert_eq!(scope.resolve("missing"), None);
    }

    #[test]
    fn document_map_resolves_top_level_keys() {
        let doc: ValueMap = [("orderId", Value::string("ORD-1"))].into_iter().collect();
        assert_eq!(doc.resolve("orderId"), Some(Value::string("ORD-1")));
        assert_eq!(doc.resolve("items"), None);
        assert_eq!(EmptyActivation.resolve("x"), None);
    }
}
