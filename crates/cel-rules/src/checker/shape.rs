//! Types observed in a sample document.
//!
//! A declared `dyn` says nothing about the fields a value will have. When a
//! sample document is available its shape is used in place of `dyn`, so that
//! selecting a field nobody has seen can be flagged while the expression is
//! still being written.

use crate::eval::Value;
use crate::types::{CelType, ObjectShape};

/// The type a sample value exhibits.
///
/// Maps become object shapes; list elements are joined, with the fields of
/// object elements merged. `null` and empty lists reveal nothing and stay
/// `dyn`.
pub fn observed_type(value: &Value) -> CelType {
    match value {
        Value::Null | Value::Optional(_) => CelType::Dyn,
        Value::Bool(_) => CelType::Bool,
        Value::Int(_) => CelType::Int,
        Value::Double(_) => CelType::Double,
        Value::String(_) => CelType::String,
        Value::Bytes(_) => CelType::Bytes,
        Value::List(items) => {
            let element = items
                .iter()
                .filter(|item| !item.is_null())
                .map(observed_type)
                .reduce(|acc, ty| acc.join(&ty))
                .unwrap_or(CelType::Dyn);
            CelType::list(element)
        }
        Value::Map(map) => {
            let shape = map
                .iter()
                .fold(ObjectShape::new(), |shape, (name, value)| {
                    shape.with_field(name, observed_type(value))
                });
            CelType::object(shape)
        }
    }
}

/// Replaces `dyn` positions of a declared type with what was observed.
///
/// Concrete parts of the declaration always win; a sample can only make a
/// declaration more precise, never contradict it.
pub fn refine(declared: &CelType, observed: &CelType) -> CelType {
    match (declared, observed) {
        (CelType::Dyn, observed) => observed.clone(),
        (CelType::List(elem), CelType::List(observed_elem)) => CelType::list(refine(elem, observed_elem)),
        (CelType::Map(key, value), CelType::Object(shape))
            if matches!(**key, CelType::String | CelType::Dyn) && value.is_dynamic() =>
        {
            CelType::Object(shape.clone())
        }
        (CelType::Optional(inner), observed) => CelType::optional(refine(inner, observed)),
        (declared, _) => declared.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, extra: Option<(&str, Value)>) -> Value {
        let mut fields = vec![("id", Value::string(id)), ("price", Value::Int(100))];
        fields.extend(extra);
        Value::map(fields)
    }

    #[test]
    fn scalars_and_null() {
        assert_eq!(observed_type(&Value::Int(1)), CelType::Int);
        assert_eq!(observed_type(&Value::Null), CelType::Dyn);
        assert_eq!(observed_type(&Value::list(vec![])), CelType::list(CelType::Dyn));
    }

    #[test]
    fn list_elements_merge_fields() {
        let items = Value::list(vec![
            item("A", Some(("quantity", Value::Int(2)))),
            item("B", None),
            Value::Null,
        ]);
        let CelType::List(elem) = observed_type(&items) else {
            panic!("expected a list type");
        };
        let CelType::Object(shape) = elem.as_ref() else {
            panic!("expected an object element");
        };
        assert_eq!(shape.len(), 3);
        assert_eq!(shape.field("quantity"), Some(&CelType::Int));
        assert_eq!(shape.field("id"), Some(&CelType::String));
    }

    #[test]
    fn mixed_numbers_join_to_dyn() {
        let list = Value::list(vec![Value::Int(1), Value::Double(1.5)]);
        assert_eq!(observed_type(&list), CelType::list(CelType::Dyn));
    }

    #[test]
    fn refine_only_replaces_dyn() {
        let observed = observed_type(&Value::list(vec![item("A", None)]));
        let refined = refine(&CelType::Dyn, &observed);
        assert_eq!(refined, observed);

        let declared = CelType::list(CelType::map(CelType::String, CelType::Dyn));
        assert!(matches!(refine(&declared, &observed), CelType::List(elem) if matches!(*elem, CelType::Object(_))));

        assert_eq!(refine(&CelType::String, &CelType::Int), CelType::String);
        assert_eq!(refine(&CelType::Int, &observed), CelType::Int);
    }
}
