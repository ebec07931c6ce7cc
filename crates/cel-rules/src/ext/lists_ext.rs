//! List aggregates.
//!
//! - `sum()` over a list of numbers; ints sum to an int, any double makes the
//!   result a double, and the empty list sums to `0`
//! - `unique()` removes duplicates by `==`, keeping first occurrences in order
//! - `min()` / `max()` over mutually comparable elements

use std::cmp::Ordering;

use crate::eval::{EvalError, Value};
use crate::types::{CelType, FunctionDecl, OverloadDecl};

fn receiver<'v>(args: &'v [Value], function: &str) -> Result<&'v [Value], EvalError> {
    match args.first() {
        Some(Value::List(items)) => Ok(&**items),
        Some(other) => Err(EvalError::no_matching_overload(function, &[other.kind_name()])),
        None => Err(EvalError::no_matching_overload(function, &[])),
    }
}

enum Sum {
    Int(i64),
    Double(f64),
}

fn sum(args: &[Value]) -> Result<Value, EvalError> {
    let mut total = Sum::Int(0);
    for item in receiver(args, "sum")? {
        total = match (total, item) {
            (Sum::Int(acc), Value::Int(i)) => {
                Sum::Int(acc.checked_add(*i).ok_or_else(|| EvalError::overflow("sum"))?)
            }
            (Sum::Int(acc), Value::Double(d)) => Sum::Double(acc as f64 + d),
            (Sum::Double(acc), Value::Int(i)) => Sum::Double(acc + *i as f64),
            (Sum::Double(acc), Value::Double(d)) => Sum::Double(acc + d),
            (_, other) => {
                return Err(EvalError::type_coercion(format!(
                    "sum() expects numeric elements, got {}",
                    other.kind_name()
                )))
            }
        };
    }
    Ok(match total {
        Sum::Int(i) => Value::Int(i),
        Sum::Double(d) => Value::Double(d),
    })
}

fn unique(args: &[Value]) -> Result<Value, EvalError> {
    let mut kept: Vec<Value> = Vec::new();
    for item in receiver(args, "unique")? {
        if !kept.contains(item) {
            kept.push(item.clone());
        }
    }
    Ok(Value::from(kept))
}

/// Picks the element that `wanted` prefers over every other one.
fn extremum(args: &[Value], function: &str, wanted: Ordering) -> Result<Value, EvalError> {
    let items = receiver(args, function)?;
    let (first, rest) = items
        .split_first()
        .ok_or_else(|| EvalError::invalid_argument(format!("{}() called on an empty list", function)))?;

    let mut best = first;
    for item in rest {
        match item.compare(best) {
            Some(ordering) if ordering == wanted => best = item,
            Some(_) => {}
            None => {
                return Err(EvalError::no_matching_overload(
                    function,
                    &[best.kind_name(), item.kind_name()],
                ))
            }
        }
    }
    Ok(best.clone())
}

/// Returns the list extension function declarations.
pub fn list_extension() -> Vec<FunctionDecl> {
    let list_t = CelType::list(CelType::type_param("T"));
    vec![
        // One implementation serves both; the overloads only differ in type.
        FunctionDecl::new("sum")
            .with_overload(
                OverloadDecl::method("list_int_sum", vec![CelType::list(CelType::Int)], CelType::Int)
                    .with_impl(sum),
            )
            .with_overload(
                OverloadDecl::method("list_double_sum", vec![CelType::list(CelType::Double)], CelType::Double)
                    .with_impl(sum),
            ),
        FunctionDecl::new("unique").with_overload(
            OverloadDecl::method("list_unique", vec![list_t.clone()], list_t.clone()).with_impl(unique),
        ),
        FunctionDecl::new("min").with_overload(
            OverloadDecl::method("list_min", vec![list_t.clone()], CelType::type_param("T"))
                .with_impl(|args| extremum(args, "min", Ordering::Less)),
        ),
        FunctionDecl::new("max").with_overload(
            OverloadDecl::method("list_max", vec![list_t], CelType::type_param("T"))
                .with_impl(|args| extremum(args, "max", Ordering::Greater)),
        ),
    ]
}
