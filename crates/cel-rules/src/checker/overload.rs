//! Overload resolution for function calls and operators.
//!
//! Type parameters are bound per candidate overload in a map local to that
//! attempt, so resolving one call never affects another and compiling the
//! same expression twice yields the same types.

use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{CelType, FunctionDecl};

/// Outcome of resolving one call site.
#[derive(Debug, Clone, PartialEq)]
pub struct OverloadResult {
    /// Result type; `dyn` when matching overloads disagree.
    pub result_type: CelType,
    /// Every overload that accepted the argument types.
    pub overload_ids: Vec<String>,
}

/// Finds the overloads of `func` that accept the given argument types.
///
/// `target` is the receiver type for method-style calls. Returns `None`
/// when no overload matches.
pub fn resolve_overload(
    func: &FunctionDecl,
    target: Option<&CelType>,
    args: &[CelType],
) -> Option<OverloadResult> {
    let full_args: Vec<&CelType> = target.into_iter().chain(args.iter()).collect();

    let mut result_type: Option<CelType> = None;
    let mut overload_ids = Vec::new();

    for overload in func.candidates(target.is_some(), full_args.len()) {
        let mut bindings = HashMap::new();
        let matched = overload
            .params
            .iter()
            .zip(&full_args)
            .all(|(param, arg)| bind(param, arg, &mut bindings));
        if !matched {
            continue;
        }

        let resolved = overload.result.substitute(&bindings);
        result_type = Some(match result_type {
            None => resolved,
            Some(previous) if previous == resolved => previous,
            Some(_) => CelType::Dyn,
        });
        overload_ids.push(overload.id.clone());
    }

    result_type.map(|result_type| OverloadResult {
        result_type,
        overload_ids,
    })
}

/// Matches an argument type against a parameter type, binding type params.
fn bind(param: &CelType, arg: &CelType, bindings: &mut HashMap<Arc<str>, CelType>) -> bool {
    match (param, arg) {
        (CelType::TypeParam(name), _) => {
            let arg = match arg {
                CelType::Error | CelType::TypeParam(_) => CelType::Dyn,
                other => other.clone(),
            };
            let binding = match bindings.get(name) {
                None | Some(CelType::Null) => arg,
                Some(bound) if arg == CelType::Null => bound.clone(),
                // Conflicting uses of one parameter widen it.
                Some(bound) => bound.join(&arg),
            };
            bindings.insert(name.clone(), binding);
            true
        }
        (_, arg) if arg.is_dynamic() => true,
        (CelType::Dyn, _) => true,
        (CelType::List(p), CelType::List(a)) => bind(p, a, bindings),
        (CelType::Optional(p), CelType::Optional(a)) => bind(p, a, bindings),
        (CelType::Map(pk, pv), CelType::Map(ak, av)) => bind(pk, ak, bindings) && bind(pv, av, bindings),
        (CelType::Map(pk, pv), CelType::Object(_)) => {
            bind(pk, &CelType::String, bindings) && bind(pv, &CelType::Dyn, bindings)
        }
        _ => param.is_assignable_from(arg),
    }
}
