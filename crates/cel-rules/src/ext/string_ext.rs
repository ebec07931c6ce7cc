//! String predicates.
//!
//! - `contains(substring)`, `startsWith(prefix)`, `endsWith(suffix)`
//! - `matches(pattern)`, both as a method and as `matches(string, pattern)`
//!
//! Patterns use the `regex` crate's RE2-style syntax and match anywhere in
//! the string unless anchored.

use regex::Regex;

use crate::eval::{EvalError, Value};
use crate::types::{CelType, FunctionDecl, OverloadDecl};

fn string_pair<'v>(args: &'v [Value], function: &str) -> Result<(&'v str, &'v str), EvalError> {
    match args {
        [Value::String(s), Value::String(arg)] => Ok((&**s, &**arg)),
        _ => {
            let kinds: Vec<&str> = args.iter().map(Value::kind_name).collect();
            Err(EvalError::no_matching_overload(function, &kinds))
        }
    }
}

fn string_predicate(name: &'static str, id: &str, predicate: fn(&str, &str) -> bool) -> FunctionDecl {
    FunctionDecl::new(name).with_overload(
        OverloadDecl::method(id, vec![CelType::String, CelType::String], CelType::Bool).with_impl(move |args| {
            let (s, arg) = string_pair(args, name)?;
            Ok(Value::Bool(predicate(s, arg)))
        }),
    )
}

fn regex_matches(args: &[Value]) -> Result<Value, EvalError> {
    let (s, pattern) = string_pair(args, "matches")?;
    let re = Regex::new(pattern)
        .map_err(|e| EvalError::invalid_argument(format!("invalid regex '{}': {}", pattern, e)))?;
    Ok(Value::Bool(re.is_match(s)))
}

/// Returns the string extension function declarations.
pub fn string_extension() -> Vec<FunctionDecl> {
    vec![
        string_predicate("contains", "contains_string", |s, sub| s.contains(sub)),
        string_predicate("startsWith", "starts_with_string", |s, prefix| s.starts_with(prefix)),
        string_predicate("endsWith", "ends_with_string", |s, suffix| s.ends_with(suffix)),
        FunctionDecl::new("matches")
            .with_overload(
                OverloadDecl::method(
                    "matches_string",
                    vec![CelType::String, CelType::String],
                    CelType::Bool,
                )
                .with_impl(regex_matches),
            )
            .with_overload(
                OverloadDecl::function(
                    "matches",
                    vec![CelType::String, CelType::String],
                    CelType::Bool,
                )
                .with_impl(regex_matches),
            ),
    ]
}
