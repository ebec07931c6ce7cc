//! Function registry and runtime overload dispatch.
//!
//! The registry is shared by the checker, which resolves overloads by their
//! declared types, and the evaluator, which picks an implementation from the
//! kinds of the evaluated arguments.

use std::collections::HashMap;

use super::{EvalError, Value};
use crate::types::{CelType, FunctionDecl, OverloadDecl};

/// All functions known to an environment, by name.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionDecl>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a function, merging with an existing one of the same name.
    pub fn register(&mut self, function: FunctionDecl) {
        match self.functions.get_mut(&function.name) {
            Some(existing) => existing.merge(function),
            None => {
                self.functions.insert(function.name.clone(), function);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&FunctionDecl> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FunctionDecl)> {
        self.functions.iter()
    }

    /// Calls the first overload whose parameters accept the argument kinds.
    ///
    /// `args` holds the receiver first when `is_member` is set.
    pub fn dispatch(&self, name: &str, is_member: bool, args: &[Value]) -> Result<Value, EvalError> {
        let overload = self
            .get(name)
            .and_then(|function| {
                function
                    .candidates(is_member, args.len())
                    .find(|o| o.implementation.is_some() && accepts(o, args))
            })
            .ok_or_else(|| {
                let kinds: Vec<&str> = args.iter().map(Value::kind_name).collect();
                EvalError::no_matching_overload(name, &kinds)
            })?;

        match &overload.implementation {
            Some(implementation) => implementation(args),
            None => Err(EvalError::no_matching_overload(name, &[])),
        }
    }
}

fn accepts(overload: &OverloadDecl, args: &[Value]) -> bool {
    overload
        .params
        .iter()
        .zip(args)
        .all(|(param, arg)| value_matches(arg, param))
}

/// Shallow kind check of a runtime value against a declared parameter type.
///
/// Element types of lists, maps and optionals are not inspected; the
/// implementation reports a fault if an element has the wrong kind.
pub fn value_matches(value: &Value, ty: &CelType) -> bool {
    match (ty, value) {
        (CelType::Dyn | CelType::TypeParam(_) | CelType::Error, _) => true,
        (CelType::Null, Value::Null) => true,
        (CelType::Bool, Value::Bool(_)) => true,
        (CelType::Int, Value::Int(_)) => true,
        (CelType::Double, Value::Double(_)) => true,
        (CelType::String, Value::String(_)) => true,
        (CelType::Bytes, Value::Bytes(_)) => true,
        (CelType::List(_), Value::List(_)) => true,
        (CelType::Map(_, _) | CelType::Object(_), Value::Map(_)) => true,
        (CelType::Optional(_), Value::Optional(_)) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::EvalErrorKind;

    fn registry() -> FunctionRegistry {
        let mut registry = FunctionRegistry::new();
        registry.register(
            FunctionDecl::new("double_it")
                .with_overload(
                    OverloadDecl::function("double_it_int", vec![CelType::Int], CelType::Int)
                        .with_impl(|args| match args {
                            [Value::Int(i)] => Ok(Value::Int(i * 2)),
                            _ => Err(EvalError::unexpected_kind("int", "other")),
                        }),
                )
                .with_overload(
                    OverloadDecl::function("double_it_string", vec![CelType::String], CelType::String)
                        .with_impl(|args| match args {
                            [Value::String(s)] => Ok(Value::string(format!("{s}{s}"))),
                            _ => Err(EvalError::unexpected_kind("string", "other")),
                        }),
                ),
        );
        registry
    }

    #[test]
    fn dispatches_on_runtime_kind() {
        let registry = registry();
        assert_eq!(
            registry.dispatch("double_it", false, &[Value::Int(21)]).unwrap(),
            Value::Int(42)
        );
        assert_eq!(
            registry.dispatch("double_it", false, &[Value::string("ab")]).unwrap(),
            Value::string("abab")
        );
    }

    #[test]
    fn unmatched_kind_is_a_fault() {
        let err = registry()
            .dispatch("double_it", false, &[Value::Bool(true)])
            .unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::NoMatchingOverload);
        assert!(err.message.contains("bool"));
    }

    #[test]
    fn member_flag_must_match() {
        let err = registry()
            .dispatch("double_it", true, &[Value::Int(1)])
            .unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::NoMatchingOverload);
    }

    #[test]
    fn register_merges_overloads() {
        let mut registry = registry();
        registry.register(FunctionDecl::new("double_it").with_overload(OverloadDecl::function(
            "double_it_double",
            vec![CelType::Double],
            CelType::Double,
        )));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("double_it").unwrap().overloads.len(), 3);
    }

    #[test]
    fn shallow_matching() {
        assert!(value_matches(&Value::list(vec![Value::Int(1)]), &CelType::list(CelType::String)));
        assert!(value_matches(&Value::map([("a", Value::Null)]), &CelType::map(CelType::String, CelType::Int)));
        assert!(value_matches(&Value::Null, &CelType::Dyn));
        assert!(!value_matches(&Value::Int(1), &CelType::Double));
    }
}
