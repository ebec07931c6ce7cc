//! Standard library declarations.
//!
//! Operators are declared for type checking only; the evaluator applies
//! them inline. Functions carry their runtime implementation.

use std::sync::LazyLock;

use crate::eval::{EvalError, Value};
use crate::types::{CelType, FunctionDecl, OverloadDecl};

/// Built-in operators and functions, shared by every environment.
pub static STANDARD_LIBRARY: LazyLock<Vec<FunctionDecl>> = LazyLock::new(build_standard_library);

fn t() -> CelType {
    CelType::type_param("T")
}

fn list_t() -> CelType {
    CelType::list(t())
}

fn map_kv() -> CelType {
    CelType::map(CelType::type_param("K"), CelType::type_param("V"))
}

/// Int, double and the two mixed promotions for a numeric operator.
fn numeric_operator(name: &str, prefix: &str) -> FunctionDecl {
    use CelType::{Double, Int};
    FunctionDecl::new(name)
        .with_overload(OverloadDecl::function(format!("{prefix}_int64_int64"), vec![Int, Int], Int))
        .with_overload(OverloadDecl::function(format!("{prefix}_double_double"), vec![Double, Double], Double))
        .with_overload(OverloadDecl::function(format!("{prefix}_int64_double"), vec![Int, Double], Double))
        .with_overload(OverloadDecl::function(format!("{prefix}_double_int64"), vec![Double, Int], Double))
}

fn ordering_operator(name: &str, prefix: &str) -> FunctionDecl {
    use CelType::{Bool, Bytes, Double, Int, String};
    [
        ("bool_bool", Bool, Bool),
        ("int64_int64", Int, Int),
        ("double_double", Double, Double),
        ("int64_double", Int, Double),
        ("double_int64", Double, Int),
        ("string_string", String, String),
        ("bytes_bytes", Bytes, Bytes),
    ]
    .into_iter()
    .fold(FunctionDecl::new(name), |decl, (suffix, left, right)| {
        decl.with_overload(OverloadDecl::function(format!("{prefix}_{suffix}"), vec![left, right], Bool))
    })
}

fn build_standard_library() -> Vec<FunctionDecl> {
    let mut funcs = Vec::new();

    // ==================== Operators ====================

    funcs.push(
        numeric_operator("_+_", "add")
            .with_overload(OverloadDecl::function(
                "add_string_string",
                vec![CelType::String, CelType::String],
                CelType::String,
            ))
            .with_overload(OverloadDecl::function(
                "add_bytes_bytes",
                vec![CelType::Bytes, CelType::Bytes],
                CelType::Bytes,
            ))
            .with_overload(OverloadDecl::function("add_list_list", vec![list_t(), list_t()], list_t())),
    );
    funcs.push(numeric_operator("_-_", "subtract"));
    funcs.push(numeric_operator("_*_", "multiply"));
    funcs.push(numeric_operator("_/_", "divide"));
    funcs.push(FunctionDecl::new("_%_").with_overload(OverloadDecl::function(
        "modulo_int64_int64",
        vec![CelType::Int, CelType::Int],
        CelType::Int,
    )));

    funcs.push(
        FunctionDecl::new("-_")
            .with_overload(OverloadDecl::function("negate_int64", vec![CelType::Int], CelType::Int))
            .with_overload(OverloadDecl::function("negate_double", vec![CelType::Double], CelType::Double)),
    );
    funcs.push(FunctionDecl::new("!_").with_overload(OverloadDecl::function(
        "logical_not",
        vec![CelType::Bool],
        CelType::Bool,
    )));

    // Comparability of the two sides is checked separately.
    funcs.push(FunctionDecl::new("_==_").with_overload(OverloadDecl::function("equals", vec![t(), t()], CelType::Bool)));
    funcs.push(FunctionDecl::new("_!=_").with_overload(OverloadDecl::function("not_equals", vec![t(), t()], CelType::Bool)));

    funcs.push(ordering_operator("_<_", "less"));
    funcs.push(ordering_operator("_<=_", "less_equals"));
    funcs.push(ordering_operator("_>_", "greater"));
    funcs.push(ordering_operator("_>=_", "greater_equals"));

    funcs.push(
        FunctionDecl::new("_&&_").with_overload(OverloadDecl::function(
            "logical_and",
            vec![CelType::Bool, CelType::Bool],
            CelType::Bool,
        )),
    );
    funcs.push(
        FunctionDecl::new("_||_").with_overload(OverloadDecl::function(
            "logical_or",
            vec![CelType::Bool, CelType::Bool],
            CelType::Bool,
        )),
    );
    funcs.push(FunctionDecl::new("_?_:_").with_overload(OverloadDecl::function(
        "conditional",
        vec![CelType::Bool, t(), t()],
        t(),
    )));

    funcs.push(
        FunctionDecl::new("@in")
            .with_overload(OverloadDecl::function("in_list", vec![t(), list_t()], CelType::Bool))
            .with_overload(OverloadDecl::function(
                "in_map",
                vec![CelType::type_param("K"), map_kv()],
                CelType::Bool,
            )),
    );
    funcs.push(
        FunctionDecl::new("_[_]")
            .with_overload(OverloadDecl::function("index_list", vec![list_t(), CelType::Int], t()))
            .with_overload(OverloadDecl::function(
                "index_map",
                vec![map_kv(), CelType::type_param("K")],
                CelType::type_param("V"),
            )),
    );

    // ==================== Functions ====================

    funcs.push(size_function());
    funcs.push(int_function());
    funcs.push(double_function());
    funcs.push(string_function());

    funcs
}

fn size_of(args: &[Value]) -> Result<Value, EvalError> {
    let size = match args.first() {
        Some(Value::String(s)) => s.chars().count(),
        Some(Value::Bytes(b)) => b.len(),
        Some(Value::List(l)) => l.len(),
        Some(Value::Map(m)) => m.len(),
        Some(other) => return Err(EvalError::no_matching_overload("size", &[other.kind_name()])),
        None => return Err(EvalError::no_matching_overload("size", &[])),
    };
    i64::try_from(size)
        .map(Value::Int)
        .map_err(|_| EvalError::overflow("size"))
}

fn size_function() -> FunctionDecl {
    let receivers = [
        ("string", CelType::String),
        ("bytes", CelType::Bytes),
        ("list", list_t()),
        ("map", map_kv()),
    ];
    let mut decl = FunctionDecl::new("size");
    for (name, ty) in receivers {
        decl = decl
            .with_overload(OverloadDecl::function(format!("size_{name}"), vec![ty.clone()], CelType::Int).with_impl(size_of))
            .with_overload(OverloadDecl::method(format!("{name}_size"), vec![ty], CelType::Int).with_impl(size_of));
    }
    decl
}

fn int_function() -> FunctionDecl {
    FunctionDecl::new("int")
        .with_overload(
            OverloadDecl::function("int64_to_int64", vec![CelType::Int], CelType::Int)
                .with_impl(|args| Ok(args[0].clone())),
        )
        .with_overload(
            OverloadDecl::function("double_to_int64", vec![CelType::Double], CelType::Int).with_impl(|args| {
                match &args[0] {
                    // Truncates toward zero; the range check rejects NaN too.
                    Value::Double(d) if *d >= -9.223_372_036_854_776e18 && *d < 9.223_372_036_854_776e18 => {
                        Ok(Value::Int(d.trunc() as i64))
                    }
                    Value::Double(d) => Err(EvalError::overflow(&format!("int({})", d))),
                    other => Err(EvalError::unexpected_kind("double", other.kind_name())),
                }
            }),
        )
        .with_overload(
            OverloadDecl::function("string_to_int64", vec![CelType::String], CelType::Int).with_impl(|args| {
                match &args[0] {
                    Value::String(s) => s
                        .trim()
                        .parse::<i64>()
                        .map(Value::Int)
                        .map_err(|_| EvalError::invalid_argument(format!("cannot convert '{}' to int", s))),
                    other => Err(EvalError::unexpected_kind("string", other.kind_name())),
                }
            }),
        )
}

fn double_function() -> FunctionDecl {
    FunctionDecl::new("double")
        .with_overload(
            OverloadDecl::function("double_to_double", vec![CelType::Double], CelType::Double)
                .with_impl(|args| Ok(args[0].clone())),
        )
        .with_overload(
            OverloadDecl::function("int64_to_double", vec![CelType::Int], CelType::Double).with_impl(|args| {
                match &args[0] {
                    Value::Int(i) => Ok(Value::Double(*i as f64)),
                    other => Err(EvalError::unexpected_kind("int", other.kind_name())),
                }
            }),
        )
        .with_overload(
            OverloadDecl::function("string_to_double", vec![CelType::String], CelType::Double).with_impl(|args| {
                match &args[0] {
                    Value::String(s) => s
                        .trim()
                        .parse::<f64>()
                        .map(Value::Double)
                        .map_err(|_| EvalError::invalid_argument(format!("cannot convert '{}' to double", s))),
                    other => Err(EvalError::unexpected_kind("string", other.kind_name())),
                }
            }),
        )
}

fn string_function() -> FunctionDecl {
    let to_string = |args: &[Value]| -> Result<Value, EvalError> {
        match &args[0] {
            Value::String(_) => Ok(args[0].clone()),
            Value::Int(i) => Ok(Value::string(i.to_string())),
            Value::Double(d) => Ok(Value::string(d.to_string())),
            Value::Bool(b) => Ok(Value::string(b.to_string())),
            Value::Bytes(b) => std::str::from_utf8(b)
                .map(Value::from)
                .map_err(|_| EvalError::invalid_argument("bytes are not valid UTF-8")),
            other => Err(EvalError::no_matching_overload("string", &[other.kind_name()])),
        }
    };

    [
        ("string_to_string", CelType::String),
        ("int64_to_string", CelType::Int),
        ("double_to_string", CelType::Double),
        ("bool_to_string", CelType::Bool),
        ("bytes_to_string", CelType::Bytes),
    ]
    .into_iter()
    .fold(FunctionDecl::new("string"), |decl, (id, ty)| {
        decl.with_overload(OverloadDecl::function(id, vec![ty], CelType::String).with_impl(to_string))
    })
}
