//! Methods on optional values produced by `.?field` selection.
//!
//! - `.hasValue() -> bool`
//! - `.value() -> T`, a fault when empty
//! - `.orValue(T) -> T`

use crate::eval::{EvalError, OptionalValue, Value};
use crate::types::{CelType, FunctionDecl, OverloadDecl};

fn optional_arg<'v>(args: &'v [Value], function: &str) -> Result<&'v OptionalValue, EvalError> {
    match args.first() {
        Some(Value::Optional(opt)) => Ok(opt),
        Some(other) => Err(EvalError::no_matching_overload(function, &[other.kind_name()])),
        None => Err(EvalError::no_matching_overload(function, &[])),
    }
}

/// Returns the optionals extension function declarations.
pub fn optionals_extension() -> Vec<FunctionDecl> {
    let opt_t = CelType::optional(CelType::type_param("T"));
    vec![
        FunctionDecl::new("hasValue").with_overload(
            OverloadDecl::method("optional_has_value", vec![opt_t.clone()], CelType::Bool)
                .with_impl(|args| Ok(Value::Bool(optional_arg(args, "hasValue")?.is_present()))),
        ),
        FunctionDecl::new("value").with_overload(
            OverloadDecl::method("optional_value", vec![opt_t.clone()], CelType::type_param("T"))
                .with_impl(|args| match optional_arg(args, "value")? {
                    OptionalValue::Some(v) => Ok((**v).clone()),
                    OptionalValue::None => Err(EvalError::invalid_argument("optional has no value")),
                }),
        ),
        FunctionDecl::new("orValue").with_overload(
            OverloadDecl::method(
                "optional_or_value",
                vec![opt_t, CelType::type_param("T")],
                CelType::type_param("T"),
            )
            .with_impl(|args| match (optional_arg(args, "orValue")?, args.get(1)) {
                (OptionalValue::Some(v), _) => Ok((**v).clone()),
                (OptionalValue::None, Some(default)) => Ok(default.clone()),
                (OptionalValue::None, None) => Err(EvalError::no_matching_overload("orValue", &["optional"])),
            }),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::EvalErrorKind;

    fn call(name: &str, args: &[Value]) -> Result<Value, EvalError> {
        let decl = optionals_extension().into_iter().find(|f| f.name == name).unwrap();
        (decl.overloads[0].implementation.as_ref().unwrap())(args)
    }

    #[test]
    fn has_value() {
        assert_eq!(call("hasValue", &[Value::optional_some(Value::Int(1))]).unwrap(), Value::Bool(true));
        assert_eq!(call("hasValue", &[Value::optional_none()]).unwrap(), Value::Bool(false));
    }

    #[test]
    fn value_of_empty_optional_is_a_fault() {
        assert_eq!(call("value", &[Value::optional_some(Value::Int(1))]).unwrap(), Value::Int(1));
        let err = call("value", &[Value::optional_none()]).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::InvalidArgument);
    }

    #[test]
    fn or_value() {
        assert_eq!(
            call("orValue", &[Value::optional_none(), Value::Int(0)]).unwrap(),
            Value::Int(0)
        );
        assert_eq!(
            call("orValue", &[Value::optional_some(Value::Int(5)), Value::Int(0)]).unwrap(),
            Value::Int(5)
        );
    }
}
