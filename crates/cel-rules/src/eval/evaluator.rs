//! Tree-walking evaluator.
//!
//! Every sub-expression returns `Result<Value, EvalError>`; a fault aborts the
//! enclosing expression. `&&` and `||` absorb a fault from one side when the
//! other side alone decides the result, `has()` never faults, and `??`
//! recovers from a missing field.

use std::cmp::Ordering;

use super::{map_key, Activation, EvalError, FunctionRegistry, HierarchicalActivation, OptionalValue, Value, ValueMap};
use crate::types::{BinaryOp, ComprehensionKind, Expr, MapEntry, SpannedExpr, UnaryOp};

type EvalResult = Result<Value, EvalError>;

/// Evaluates an expression tree against variable bindings.
pub struct Evaluator<'a> {
    activation: &'a dyn Activation,
    functions: &'a FunctionRegistry,
}

impl<'a> Evaluator<'a> {
    pub fn new(activation: &'a dyn Activation, functions: &'a FunctionRegistry) -> Self {
        Self {
            activation,
            functions,
        }
    }

    pub fn eval(&self, expr: &SpannedExpr) -> EvalResult {
        self.eval_expr(expr)
    }

    fn eval_expr(&self, expr: &SpannedExpr) -> EvalResult {
        match &expr.node {
            Expr::Null => Ok(Value::Null),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Int(i) => Ok(Value::Int(*i)),
            Expr::Double(d) => Ok(Value::Double(*d)),
            Expr::String(s) => Ok(Value::string(s.as_str())),
            Expr::Bytes(b) => Ok(Value::bytes(b.as_slice())),

            Expr::Ident(name) => self
                .activation
                .resolve(name)
                .ok_or_else(|| EvalError::field_not_found(name)),

            Expr::List(items) => {
                let values = items
                    .iter()
                    .map(|item| self.eval_expr(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::from(values))
            }
            Expr::Map(entries) => self.eval_map(entries),

            Expr::Unary { op, expr } => self.eval_unary(*op, expr),
            Expr::Binary { op, left, right } => self.eval_binary(*op, left, right),
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
            } => self.eval_ternary(cond, then_expr, else_expr),

            Expr::Member {
                expr,
                field,
                optional,
            } => {
                let operand = self.eval_expr(expr)?;
                select_field(&operand, field, *optional)
            }
            Expr::Index { expr, index } => {
                let container = self.eval_expr(expr)?;
                let index = self.eval_expr(index)?;
                eval_index(&container, &index)
            }
            Expr::Call {
                function,
                target,
                args,
            } => self.eval_call(function, target.as_deref(), args),

            Expr::Comprehension {
                kind,
                iter_var,
                iter_range,
                filter,
                body,
            } => self.eval_comprehension(*kind, iter_var, iter_range, filter.as_deref(), body),

            Expr::MemberTestOnly { expr, field } => Ok(Value::Bool(self.eval_member_test(expr, field))),
        }
    }

    fn eval_map(&self, entries: &[MapEntry]) -> EvalResult {
        let mut map = ValueMap::new();
        for entry in entries {
            let key = map_key(&self.eval_expr(&entry.key)?)?;
            if map.contains_key(&key) {
                return Err(EvalError::invalid_argument(format!(
                    "repeated key '{}' in map literal",
                    key
                )));
            }
            let value = self.eval_expr(&entry.value)?;
            map.insert(key, value);
        }
        Ok(Value::from(map))
    }

    fn eval_unary(&self, op: UnaryOp, expr: &SpannedExpr) -> EvalResult {
        let value = self.eval_expr(expr)?;
        match (op, &value) {
            (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
            (UnaryOp::Neg, Value::Int(i)) => i
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| EvalError::overflow("negation")),
            (UnaryOp::Neg, Value::Double(d)) => Ok(Value::Double(-d)),
            _ => Err(EvalError::no_matching_overload(
                op.function_name(),
                &[value.kind_name()],
            )),
        }
    }

    fn eval_binary(&self, op: BinaryOp, left: &SpannedExpr, right: &SpannedExpr) -> EvalResult {
        match op {
            BinaryOp::And => self.eval_and(left, right),
            BinaryOp::Or => self.eval_or(left, right),
            BinaryOp::Coalesce => self.eval_coalesce(left, right),
            _ => {
                let left = self.eval_expr(left)?;
                let right = self.eval_expr(right)?;
                apply_binary(op, &left, &right)
            }
        }
    }

    fn eval_bool(&self, expr: &SpannedExpr, function: &str) -> Result<bool, EvalError> {
        match self.eval_expr(expr)? {
            Value::Bool(b) => Ok(b),
            other => Err(EvalError::no_matching_overload(function, &[other.kind_name()])),
        }
    }

    fn eval_and(&self, left: &SpannedExpr, right: &SpannedExpr) -> EvalResult {
        match self.eval_bool(left, "_&&_") {
            Ok(false) => Ok(Value::Bool(false)),
            Ok(true) => self.eval_bool(right, "_&&_").map(Value::Bool),
            // A false right side decides the result regardless of the left fault.
            Err(err) => match self.eval_bool(right, "_&&_") {
                Ok(false) => Ok(Value::Bool(false)),
                _ => Err(err),
            },
        }
    }

    fn eval_or(&self, left: &SpannedExpr, right: &SpannedExpr) -> EvalResult {
        match self.eval_bool(left, "_||_") {
            Ok(true) => Ok(Value::Bool(true)),
            Ok(false) => self.eval_bool(right, "_||_").map(Value::Bool),
            Err(err) => match self.eval_bool(right, "_||_") {
                Ok(true) => Ok(Value::Bool(true)),
                _ => Err(err),
            },
        }
    }

    fn eval_coalesce(&self, left: &SpannedExpr, right: &SpannedExpr) -> EvalResult {
        match self.eval_expr(left) {
            Ok(Value::Optional(OptionalValue::Some(value))) => Ok(*value),
            Ok(Value::Optional(OptionalValue::None)) => self.eval_expr(right),
            Ok(value) => Ok(value),
            Err(err) if err.is_field_not_found() => self.eval_expr(right),
            Err(err) => Err(err),
        }
    }

    fn eval_ternary(
        &self,
        cond: &SpannedExpr,
        then_expr: &SpannedExpr,
        else_expr: &SpannedExpr,
    ) -> EvalResult {
        if self.eval_bool(cond, "_?_:_")? {
            self.eval_expr(then_expr)
        } else {
            self.eval_expr(else_expr)
        }
    }

    fn eval_call(&self, function: &str, target: Option<&SpannedExpr>, args: &[SpannedExpr]) -> EvalResult {
        let mut values = Vec::with_capacity(args.len() + 1);
        if let Some(target) = target {
            values.push(self.eval_expr(target)?);
        }
        for arg in args {
            values.push(self.eval_expr(arg)?);
        }
        self.functions.dispatch(function, target.is_some(), &values)
    }

    /// `has(e.f)`: true when `e` evaluates to a map containing `f`.
    fn eval_member_test(&self, expr: &SpannedExpr, field: &str) -> bool {
        match self.eval_expr(expr) {
            Ok(Value::Map(map)) => map.contains_key(field),
            Ok(Value::Optional(OptionalValue::Some(inner))) => {
                inner.as_map().is_some_and(|map| map.contains_key(field))
            }
            _ => false,
        }
    }

    fn eval_comprehension(
        &self,
        kind: ComprehensionKind,
        iter_var: &str,
        iter_range: &SpannedExpr,
        filter: Option<&SpannedExpr>,
        body: &SpannedExpr,
    ) -> EvalResult {
        let range = self.eval_expr(iter_range)?;
        let elements: Vec<Value> = match &range {
            Value::List(items) => items.to_vec(),
            Value::Map(map) => map.keys().map(|k| Value::String(k.clone())).collect(),
            other => {
                return Err(EvalError::type_coercion(format!(
                    "{}() expects a list or map receiver, got {}",
                    kind.macro_name(),
                    other.kind_name()
                )))
            }
        };

        match kind {
            ComprehensionKind::All => {
                for element in elements {
                    if !self.eval_predicate(kind, iter_var, element, body)? {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            ComprehensionKind::Exists => {
                for element in elements {
                    if self.eval_predicate(kind, iter_var, element, body)? {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            ComprehensionKind::ExistsOne => {
                let mut count = 0usize;
                for element in elements {
                    if self.eval_predicate(kind, iter_var, element, body)? {
                        count += 1;
                    }
                }
                Ok(Value::Bool(count == 1))
            }
            ComprehensionKind::Filter => {
                let mut kept = Vec::new();
                for element in elements {
                    if self.eval_predicate(kind, iter_var, element.clone(), body)? {
                        kept.push(element);
                    }
                }
                Ok(Value::from(kept))
            }
            ComprehensionKind::Map => {
                let mut mapped = Vec::with_capacity(elements.len());
                for element in elements {
                    if let Some(filter) = filter {
                        if !self.eval_predicate(kind, iter_var, element.clone(), filter)? {
                            continue;
                        }
                    }
                    mapped.push(self.eval_in_scope(iter_var, element, body)?);
                }
                Ok(Value::from(mapped))
            }
        }
    }

    /// Evaluates `expr` with `name` bound to `value` on top of the current bindings.
    fn eval_in_scope(&self, name: &str, value: Value, expr: &SpannedExpr) -> EvalResult {
        let scope = HierarchicalActivation::new(self.activation, name, value);
        Evaluator::new(&scope, self.functions).eval_expr(expr)
    }

    fn eval_predicate(
        &self,
        kind: ComprehensionKind,
        name: &str,
        value: Value,
        predicate: &SpannedExpr,
    ) -> Result<bool, EvalError> {
        match self.eval_in_scope(name, value, predicate)? {
            Value::Bool(b) => Ok(b),
            other => Err(EvalError::type_coercion(format!(
                "{}() predicate must evaluate to bool, got {}",
                kind.macro_name(),
                other.kind_name()
            ))),
        }
    }
}

/// Field selection, `e.f` or `e.?f`.
fn select_field(operand: &Value, field: &str, optional: bool) -> EvalResult {
    match operand {
        Value::Map(map) => match (map.get(field), optional) {
            (Some(value), false) => Ok(value.clone()),
            (Some(value), true) => Ok(Value::optional_some(value.clone())),
            (None, false) => Err(EvalError::field_not_found(field)),
            (None, true) => Ok(Value::optional_none()),
        },
        // Selection on an optional stays optional.
        Value::Optional(OptionalValue::None) => Ok(Value::optional_none()),
        Value::Optional(OptionalValue::Some(inner)) => select_field(inner, field, true),
        other => Err(EvalError::type_coercion(format!(
            "cannot select field '{}' on {}",
            field,
            other.kind_name()
        ))),
    }
}

fn eval_index(container: &Value, index: &Value) -> EvalResult {
    match (container, index) {
        (Value::List(items), Value::Int(i)) => usize::try_from(*i)
            .ok()
            .and_then(|i| items.get(i))
            .cloned()
            .ok_or_else(|| EvalError::index_out_of_bounds(*i, items.len())),
        (Value::List(_), other) => Err(EvalError::unexpected_kind("int list index", other.kind_name())),
        (Value::Map(map), key) => {
            let key = map_key(key)?;
            map.get(&key)
                .cloned()
                .ok_or_else(|| EvalError::field_not_found(&key))
        }
        (other, _) => Err(EvalError::type_coercion(format!(
            "cannot index into {}",
            other.kind_name()
        ))),
    }
}

/// Strict binary operators, applied to already-evaluated operands.
fn apply_binary(op: BinaryOp, left: &Value, right: &Value) -> EvalResult {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(left == right)),
        BinaryOp::Ne => Ok(Value::Bool(left != right)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => compare(op, left, right),
        BinaryOp::In => eval_in(left, right),
        _ => arithmetic(op, left, right),
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> EvalResult {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => int_arithmetic(op, *a, *b),
        (Value::Int(_) | Value::Double(_), Value::Int(_) | Value::Double(_)) if op != BinaryOp::Mod => {
            let (a, b) = match (left.as_f64(), right.as_f64()) {
                (Some(a), Some(b)) => (a, b),
                _ => return Err(overload_fault(op, left, right)),
            };
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                _ => a / b,
            };
            Ok(Value::Double(result))
        }
        (Value::String(a), Value::String(b)) if op == BinaryOp::Add => {
            Ok(Value::string(format!("{}{}", a, b)))
        }
        (Value::Bytes(a), Value::Bytes(b)) if op == BinaryOp::Add => {
            Ok(Value::bytes(a.iter().chain(b.iter()).copied().collect::<Vec<u8>>()))
        }
        (Value::List(a), Value::List(b)) if op == BinaryOp::Add => {
            Ok(Value::list(a.iter().chain(b.iter()).cloned().collect::<Vec<_>>()))
        }
        _ => Err(overload_fault(op, left, right)),
    }
}

fn int_arithmetic(op: BinaryOp, a: i64, b: i64) -> EvalResult {
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::Div if b == 0 => return Err(EvalError::division_by_zero()),
        BinaryOp::Div => a.checked_div(b),
        BinaryOp::Mod if b == 0 => return Err(EvalError::modulo_by_zero()),
        BinaryOp::Mod => a.checked_rem(b),
        _ => return Err(EvalError::no_matching_overload(op.function_name(), &["int", "int"])),
    };
    result
        .map(Value::Int)
        .ok_or_else(|| EvalError::overflow(op.symbol()))
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> EvalResult {
    let ordering = match left.compare(right) {
        Some(ordering) => ordering,
        // NaN compares false against everything.
        None if left.as_f64().is_some() && right.as_f64().is_some() => return Ok(Value::Bool(false)),
        None => return Err(overload_fault(op, left, right)),
    };
    let result = match op {
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    };
    Ok(Value::Bool(result))
}

fn eval_in(element: &Value, container: &Value) -> EvalResult {
    match container {
        Value::List(items) => Ok(Value::Bool(items.iter().any(|item| item == element))),
        Value::Map(map) => Ok(Value::Bool(map.contains_key(&map_key(element)?))),
        _ => Err(overload_fault(BinaryOp::In, element, container)),
    }
}

fn overload_fault(op: BinaryOp, left: &Value, right: &Value) -> EvalError {
    EvalError::no_matching_overload(op.function_name(), &[left.kind_name(), right.kind_name()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::STANDARD_LIBRARY;
    use crate::eval::{EvalErrorKind, MapActivation};
    use crate::ext;
    use crate::parse;

    fn registry() -> FunctionRegistry {
        let mut registry = FunctionRegistry::new();
        for function in STANDARD_LIBRARY.iter().cloned().chain(ext::all_extensions()) {
            registry.register(function);
        }
        registry
    }

    fn eval_with_vars(source: &str, vars: &[(&str, Value)]) -> EvalResult {
        let result = parse(source);
        assert!(result.errors.is_empty(), "parse errors: {:?}", result.errors);
        let ast = result.ast.unwrap();

        let mut activation = MapActivation::new();
        for (name, value) in vars {
            activation.insert(*name, value.clone());
        }
        let registry = registry();
        Evaluator::new(&activation, &registry).eval(&ast)
    }

    fn eval_expr(source: &str) -> EvalResult {
        eval_with_vars(source, &[])
    }

    fn fault_kind(source: &str) -> EvalErrorKind {
        eval_expr(source).unwrap_err().kind
    }

    fn order() -> Value {
        Value::map([
            ("orderId", Value::string("ORD-1")),
            (
                "items",
                Value::list(vec![
                    Value::map([
                        ("id", Value::string("A")),
                        ("price", Value::Int(100)),
                        ("quantity", Value::Int(2)),
                    ]),
                    Value::map([("id", Value::string("B")), ("price", Value::Int(50))]),
                ]),
            ),
        ])
    }

    #[test]
    fn test_literals() {
        assert_eq!(eval_expr("null").unwrap(), Value::Null);
        assert_eq!(eval_expr("true").unwrap(), Value::Bool(true));
        assert_eq!(eval_expr("42").unwrap(), Value::Int(42));
        assert_eq!(eval_expr("3.5").unwrap(), Value::Double(3.5));
        assert_eq!(eval_expr("\"hello\"").unwrap(), Value::string("hello"));
        assert_eq!(eval_expr("b\"ab\"").unwrap(), Value::bytes(b"ab".as_slice()));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval_expr("1 + 2 * 3").unwrap(), Value::Int(7));
        assert_eq!(eval_expr("7 / 2").unwrap(), Value::Int(3));
        assert_eq!(eval_expr("-7 % 3").unwrap(), Value::Int(-1));
        assert_eq!(eval_expr("2 * 1.5").unwrap(), Value::Double(3.0));
        assert_eq!(eval_expr("1.0 / 0.0").unwrap(), Value::Double(f64::INFINITY));
        assert_eq!(eval_expr("'ab' + 'cd'").unwrap(), Value::string("abcd"));
        assert_eq!(
            eval_expr("[1] + [2]").unwrap(),
            Value::list(vec![Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn test_arithmetic_faults() {
        assert_eq!(fault_kind("1 / 0"), EvalErrorKind::DivisionByZero);
        assert_eq!(fault_kind("1 % 0"), EvalErrorKind::DivisionByZero);
        assert_eq!(fault_kind("9223372036854775807 + 1"), EvalErrorKind::Overflow);
        assert_eq!(fault_kind("-(-9223372036854775807 - 1)"), EvalErrorKind::Overflow);
        assert_eq!(fault_kind("1.5 % 1.0"), EvalErrorKind::NoMatchingOverload);
        assert_eq!(fault_kind("'a' + 1"), EvalErrorKind::NoMatchingOverload);
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval_expr("1 == 1.0").unwrap(), Value::Bool(true));
        assert_eq!(eval_expr("1 < 1.5").unwrap(), Value::Bool(true));
        assert_eq!(eval_expr("'b' >= 'a'").unwrap(), Value::Bool(true));
        assert_eq!(eval_expr("null == null").unwrap(), Value::Bool(true));
        assert_eq!(eval_expr("1 != 'a'").unwrap(), Value::Bool(true));
        assert_eq!(fault_kind("1 < 'a'"), EvalErrorKind::NoMatchingOverload);
    }

    #[test]
    fn test_in() {
        assert_eq!(eval_expr("'card' in ['cash', 'card']").unwrap(), Value::Bool(true));
        assert_eq!(eval_expr("3 in [1, 2]").unwrap(), Value::Bool(false));
        assert_eq!(eval_expr("'a' in {'a': 1}").unwrap(), Value::Bool(true));
        assert_eq!(eval_expr("1 in {1: 'x'}").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_logical_short_circuit() {
        assert_eq!(eval_expr("false && (1 / 0 == 1)").unwrap(), Value::Bool(false));
        assert_eq!(eval_expr("true || (1 / 0 == 1)").unwrap(), Value::Bool(true));
        assert_eq!(eval_expr("(1 / 0 == 1) && false").unwrap(), Value::Bool(false));
        assert_eq!(eval_expr("(1 / 0 == 1) || true").unwrap(), Value::Bool(true));
        assert_eq!(fault_kind("(1 / 0 == 1) && true"), EvalErrorKind::DivisionByZero);
        assert_eq!(fault_kind("1 && true"), EvalErrorKind::NoMatchingOverload);
    }

    #[test]
    fn test_ternary() {
        assert_eq!(eval_expr("true ? 1 : 2").unwrap(), Value::Int(1));
        assert_eq!(eval_expr("false ? 1 / 0 : 2").unwrap(), Value::Int(2));
        assert_eq!(fault_kind("1 ? 1 : 2"), EvalErrorKind::NoMatchingOverload);
    }

    #[test]
    fn test_member_access() {
        let vars = [("order", order())];
        assert_eq!(
            eval_with_vars("order.orderId", &vars).unwrap(),
            Value::string("ORD-1")
        );
        let err = eval_with_vars("order.nonExistentField", &vars).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::FieldNotFound);
        assert!(err.message.contains("nonExistentField"));

        let err = eval_with_vars("order.orderId.length", &vars).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::TypeCoercion);
    }

    #[test]
    fn test_unbound_identifier_is_field_not_found() {
        assert_eq!(fault_kind("missing"), EvalErrorKind::FieldNotFound);
    }

    #[test]
    fn test_optional_select() {
        let vars = [("order", order())];
        assert_eq!(
            eval_with_vars("order.?orderId", &vars).unwrap(),
            Value::optional_some(Value::string("ORD-1"))
        );
        assert_eq!(
            eval_with_vars("order.?coupon.?code", &vars).unwrap(),
            Value::optional_none()
        );
        assert_eq!(
            eval_with_vars("order.?coupon.orValue('none')", &vars).unwrap(),
            Value::string("none")
        );
    }

    #[test]
    fn test_coalesce() {
        let vars = [("order", order())];
        assert_eq!(eval_with_vars("order.coupon ?? 'none'", &vars).unwrap(), Value::string("none"));
        assert_eq!(eval_with_vars("order.orderId ?? 'none'", &vars).unwrap(), Value::string("ORD-1"));
        assert_eq!(eval_with_vars("order.?coupon ?? 0", &vars).unwrap(), Value::Int(0));
        assert_eq!(eval_with_vars("order.?orderId ?? ''", &vars).unwrap(), Value::string("ORD-1"));
        // Only absence is absorbed.
        let err = eval_with_vars("(1 / 0) ?? 0", &vars).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::DivisionByZero);
    }

    #[test]
    fn test_has_never_faults() {
        let vars = [("order", order())];
        assert_eq!(eval_with_vars("has(order.orderId)", &vars).unwrap(), Value::Bool(true));
        assert_eq!(eval_with_vars("has(order.coupon)", &vars).unwrap(), Value::Bool(false));
        assert_eq!(eval_with_vars("has(order.coupon.code)", &vars).unwrap(), Value::Bool(false));
        assert_eq!(eval_with_vars("has(order.orderId.x)", &vars).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_index() {
        let vars = [("order", order())];
        assert_eq!(
            eval_with_vars("order.items[1].id", &vars).unwrap(),
            Value::string("B")
        );
        assert_eq!(
            eval_with_vars("order['orderId']", &vars).unwrap(),
            Value::string("ORD-1")
        );
        assert_eq!(
            eval_with_vars("order.items[2]", &vars).unwrap_err().kind,
            EvalErrorKind::IndexOutOfBounds
        );
        assert_eq!(fault_kind("[1, 2][-1]"), EvalErrorKind::IndexOutOfBounds);
        assert_eq!(fault_kind("[1, 2]['a']"), EvalErrorKind::TypeCoercion);
        assert_eq!(fault_kind("true[0]"), EvalErrorKind::TypeCoercion);
    }

    #[test]
    fn test_map_literal() {
        assert_eq!(
            eval_expr("{'a': 1, 2: 'b'}").unwrap(),
            Value::map([("a", Value::Int(1)), ("2", Value::string("b"))])
        );
        assert_eq!(fault_kind("{'a': 1, 'a': 2}"), EvalErrorKind::InvalidArgument);
    }

    #[test]
    fn test_comprehensions() {
        assert_eq!(eval_expr("[1, 2, 3].all(x, x > 0)").unwrap(), Value::Bool(true));
        assert_eq!(eval_expr("[1, 2, 3].exists(x, x > 2)").unwrap(), Value::Bool(true));
        assert_eq!(eval_expr("[1, 2, 3].exists_one(x, x > 1)").unwrap(), Value::Bool(false));
        assert_eq!(
            eval_expr("[1, 2, 3].map(x, x * 2)").unwrap(),
            Value::list(vec![Value::Int(2), Value::Int(4), Value::Int(6)])
        );
        assert_eq!(
            eval_expr("[1, 2, 3].filter(x, x != 2)").unwrap(),
            Value::list(vec![Value::Int(1), Value::Int(3)])
        );
        assert_eq!(
            eval_expr("[1, 2, 3].map(x, x > 1, x * 10)").unwrap(),
            Value::list(vec![Value::Int(20), Value::Int(30)])
        );
        assert_eq!(
            eval_expr("{'a': 1, 'b': 2}.map(k, k)").unwrap(),
            Value::list(vec![Value::string("a"), Value::string("b")])
        );
    }

    #[test]
    fn test_comprehension_edge_cases() {
        assert_eq!(eval_expr("[].all(x, x > 0)").unwrap(), Value::Bool(true));
        assert_eq!(eval_expr("[].exists(x, x > 0)").unwrap(), Value::Bool(false));
        assert_eq!(eval_expr("[].map(x, x)").unwrap(), Value::list(vec![]));
        // all() stops at the first false element, exists() at the first true one.
        assert_eq!(eval_expr("[0, 1].all(x, 10 / (1 - x) < 0)").unwrap(), Value::Bool(false));
        assert_eq!(eval_expr("[1, 0].exists(x, 10 / x > 0)").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_comprehension_faults_abort() {
        assert_eq!(fault_kind("[1, 0].map(x, 1 / x)"), EvalErrorKind::DivisionByZero);
        assert_eq!(fault_kind("[1, 2].all(x, x)"), EvalErrorKind::TypeCoercion);
        assert_eq!(fault_kind("'abc'.all(x, x)"), EvalErrorKind::TypeCoercion);
    }

    #[test]
    fn test_comprehension_scope_is_local() {
        let vars = [("x", Value::Int(100))];
        assert_eq!(
            eval_with_vars("[1, 2].map(x, x + 1) == [2, 3] && x == 100", &vars).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            eval_with_vars("[[1, 2], [3]].map(x, x.map(y, y + x.size()))", &[]).unwrap(),
            Value::list(vec![
                Value::list(vec![Value::Int(3), Value::Int(4)]),
                Value::list(vec![Value::Int(4)]),
            ])
        );
    }

    #[test]
    fn test_function_calls() {
        let vars = [("order", order())];
        assert_eq!(eval_with_vars("size(order.items)", &vars).unwrap(), Value::Int(2));
        assert_eq!(
            eval_with_vars("order.items.map(i, i.price).sum()", &vars).unwrap(),
            Value::Int(150)
        );
        assert_eq!(
            eval_with_vars("order.items.map(i, has(i.quantity) ? i.quantity : 0)", &vars).unwrap(),
            Value::list(vec![Value::Int(2), Value::Int(0)])
        );
        assert_eq!(fault_kind("size(1)"), EvalErrorKind::NoMatchingOverload);
        assert_eq!(fault_kind("undefined_function(1)"), EvalErrorKind::NoMatchingOverload);
    }
}
