//! Type checker.
//!
//! Walks a parsed expression, infers a type for every node and collects every
//! problem it finds instead of stopping at the first one.

use std::collections::HashMap;

use super::errors::CheckError;
use super::overload::resolve_overload;
use super::scope::ScopeStack;
use crate::eval::FunctionRegistry;
use crate::types::{
    BinaryOp, CelType, ComprehensionKind, Expr, MapEntry, SpannedExpr, UnaryOp, VariableDecl,
};

/// Result of type checking an expression.
#[derive(Debug, Clone, Default)]
pub struct CheckResult {
    /// Inferred type of every expression node, by node id.
    pub type_map: HashMap<i64, CelType>,
    /// Errors and warnings, in the order they were found.
    pub errors: Vec<CheckError>,
}

impl CheckResult {
    /// True when nothing but warnings was reported.
    pub fn is_ok(&self) -> bool {
        self.errors.iter().all(CheckError::is_warning)
    }

    pub fn get_type(&self, expr_id: i64) -> Option<&CelType> {
        self.type_map.get(&expr_id)
    }
}

pub struct Checker<'a> {
    scopes: ScopeStack,
    functions: &'a FunctionRegistry,
    type_map: HashMap<i64, CelType>,
    errors: Vec<CheckError>,
}

impl<'a> Checker<'a> {
    pub fn new(variables: &[VariableDecl], functions: &'a FunctionRegistry) -> Self {
        let mut scopes = ScopeStack::new();
        for decl in variables {
            scopes.add_decl(decl.clone());
        }

        Self {
            scopes,
            functions,
            type_map: HashMap::new(),
            errors: Vec::new(),
        }
    }

    pub fn check(mut self, expr: &SpannedExpr) -> CheckResult {
        self.check_expr(expr);
        CheckResult {
            type_map: self.type_map,
            errors: self.errors,
        }
    }

    fn report(&mut self, error: CheckError) {
        self.errors.push(error);
    }

    fn check_expr(&mut self, expr: &SpannedExpr) -> CelType {
        let result = match &expr.node {
            Expr::Null => CelType::Null,
            Expr::Bool(_) => CelType::Bool,
            Expr::Int(_) => CelType::Int,
            Expr::Double(_) => CelType::Double,
            Expr::String(_) => CelType::String,
            Expr::Bytes(_) => CelType::Bytes,

            Expr::Ident(name) => self.check_ident(name, expr),
            Expr::List(items) => self.check_list(items),
            Expr::Map(entries) => self.check_map(entries),

            Expr::Unary { op, expr: inner } => self.check_unary(*op, inner, expr),
            Expr::Binary { op, left, right } => self.check_binary(*op, left, right, expr),
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
            } => self.check_ternary(cond, then_expr, else_expr, expr),

            Expr::Member {
                expr: operand,
                field,
                optional,
            } => self.check_member(operand, field, *optional, expr),
            Expr::Index {
                expr: operand,
                index,
            } => self.check_index(operand, index, expr),
            Expr::Call {
                function,
                target,
                args,
            } => self.check_call(function, target.as_deref(), args, expr),

            Expr::Comprehension {
                kind,
                iter_var,
                iter_range,
                filter,
                body,
            } => self.check_comprehension(*kind, iter_var, iter_range, filter.as_deref(), body),

            Expr::MemberTestOnly {
                expr: operand,
                field,
            } => self.check_member_test(operand, field, expr),
        };

        self.type_map.insert(expr.id, result.clone());
        result
    }

    fn check_ident(&mut self, name: &str, expr: &SpannedExpr) -> CelType {
        match self.scopes.resolve(name) {
            Some(decl) => decl.cel_type.clone(),
            None => {
                self.report(CheckError::undeclared_reference(name, expr.span.clone(), expr.id));
                CelType::Error
            }
        }
    }

    fn check_list(&mut self, items: &[SpannedExpr]) -> CelType {
        let elem = items
            .iter()
            .map(|item| self.check_expr(item))
            .reduce(|acc, ty| acc.join(&ty))
            .unwrap_or(CelType::Dyn);
        CelType::list(elem)
    }

    fn check_map(&mut self, entries: &[MapEntry]) -> CelType {
        if entries.is_empty() {
            return CelType::map(CelType::Dyn, CelType::Dyn);
        }

        let mut key_type: Option<CelType> = None;
        let mut value_type: Option<CelType> = None;
        for entry in entries {
            let key = self.check_expr(&entry.key);
            if !matches!(
                key,
                CelType::String | CelType::Int | CelType::Bool | CelType::Dyn | CelType::Error
            ) {
                self.report(CheckError::type_mismatch(
                    CelType::String,
                    key.clone(),
                    entry.key.span.clone(),
                    entry.key.id,
                ));
            }
            let value = self.check_expr(&entry.value);
            key_type = Some(key_type.map_or(key.clone(), |k| k.join(&key)));
            value_type = Some(value_type.map_or(value.clone(), |v| v.join(&value)));
        }

        CelType::map(
            key_type.unwrap_or(CelType::Dyn),
            value_type.unwrap_or(CelType::Dyn),
        )
    }

    fn check_unary(&mut self, op: UnaryOp, inner: &SpannedExpr, expr: &SpannedExpr) -> CelType {
        let inner_type = self.check_expr(inner);
        self.resolve_function_call(op.function_name(), None, &[inner_type], expr)
    }

    fn check_binary(&mut self, op: BinaryOp, left: &SpannedExpr, right: &SpannedExpr, expr: &SpannedExpr) -> CelType {
        let left_type = self.check_expr(left);
        let right_type = self.check_expr(right);

        match op {
            BinaryOp::Eq | BinaryOp::Ne => {
                if !left_type.is_comparable_with(&right_type) {
                    self.report(CheckError::no_matching_overload(
                        op.function_name(),
                        vec![left_type, right_type],
                        expr.span.clone(),
                        expr.id,
                    ));
                }
                CelType::Bool
            }
            BinaryOp::Coalesce => {
                let present = match left_type {
                    CelType::Optional(inner) => (*inner).clone(),
                    other => other,
                };
                present.join(&right_type)
            }
            _ => self.resolve_function_call(op.function_name(), None, &[left_type, right_type], expr),
        }
    }

    fn check_ternary(
        &mut self,
        cond: &SpannedExpr,
        then_expr: &SpannedExpr,
        else_expr: &SpannedExpr,
        expr: &SpannedExpr,
    ) -> CelType {
        let cond_type = self.check_expr(cond);
        let then_type = self.check_expr(then_expr);
        let else_type = self.check_expr(else_expr);

        self.expect_bool(&cond_type, cond);
        self.resolve_function_call("_?_:_", None, &[CelType::Bool, then_type, else_type], expr)
    }

    fn expect_bool(&mut self, actual: &CelType, expr: &SpannedExpr) {
        if !actual.is_dynamic() && *actual != CelType::Bool {
            self.report(CheckError::type_mismatch(
                CelType::Bool,
                actual.clone(),
                expr.span.clone(),
                expr.id,
            ));
        }
    }

    fn check_member(&mut self, operand: &SpannedExpr, field: &str, optional: bool, expr: &SpannedExpr) -> CelType {
        let operand_type = self.check_expr(operand);

        let (inner_type, was_optional) = match &operand_type {
            CelType::Optional(inner) => ((**inner).clone(), true),
            other => (other.clone(), false),
        };

        let result = self.select_field_type(&inner_type, field, expr);
        if (optional || was_optional) && !matches!(result, CelType::Optional(_) | CelType::Error) {
            CelType::optional(result)
        } else {
            result
        }
    }

    fn select_field_type(&mut self, operand: &CelType, field: &str, expr: &SpannedExpr) -> CelType {
        match operand {
            CelType::Dyn | CelType::TypeParam(_) => CelType::Dyn,
            CelType::Error => CelType::Error,
            CelType::Map(key, value) if matches!(**key, CelType::String | CelType::Dyn) => (**value).clone(),
            CelType::Object(shape) => match shape.field(field) {
                Some(ty) => ty.clone(),
                None => {
                    let observed = shape.fields().map(|(name, _)| name.to_string()).collect();
                    self.report(CheckError::unobserved_field(field, observed, expr.span.clone(), expr.id));
                    CelType::Dyn
                }
            },
            other => {
                self.report(CheckError::undefined_field(
                    &other.display_name(),
                    field,
                    expr.span.clone(),
                    expr.id,
                ));
                CelType::Error
            }
        }
    }

    fn check_index(&mut self, operand: &SpannedExpr, index: &SpannedExpr, expr: &SpannedExpr) -> CelType {
        let operand_type = self.check_expr(operand);
        let index_type = self.check_expr(index);
        self.resolve_function_call("_[_]", None, &[operand_type, index_type], expr)
    }

    fn check_call(
        &mut self,
        function: &str,
        target: Option<&SpannedExpr>,
        args: &[SpannedExpr],
        expr: &SpannedExpr,
    ) -> CelType {
        let target_type = target.map(|t| self.check_expr(t));
        let arg_types: Vec<CelType> = args.iter().map(|a| self.check_expr(a)).collect();
        self.resolve_function_call(function, target_type, &arg_types, expr)
    }

    fn resolve_function_call(
        &mut self,
        name: &str,
        target: Option<CelType>,
        args: &[CelType],
        expr: &SpannedExpr,
    ) -> CelType {
        let Some(func) = self.functions.get(name) else {
            self.report(CheckError::undeclared_function(name, expr.span.clone(), expr.id));
            return CelType::Error;
        };

        match resolve_overload(func, target.as_ref(), args) {
            Some(result) => result.result_type,
            None => {
                let all_args: Vec<CelType> = target.into_iter().chain(args.iter().cloned()).collect();
                // Arguments that already failed were reported where they failed.
                if !all_args.contains(&CelType::Error) {
                    self.report(CheckError::no_matching_overload(
                        name,
                        all_args,
                        expr.span.clone(),
                        expr.id,
                    ));
                }
                CelType::Error
            }
        }
    }

    fn check_comprehension(
        &mut self,
        kind: ComprehensionKind,
        iter_var: &str,
        iter_range: &SpannedExpr,
        filter: Option<&SpannedExpr>,
        body: &SpannedExpr,
    ) -> CelType {
        let range_type = self.check_expr(iter_range);
        let iter_type = match &range_type {
            CelType::List(elem) => (**elem).clone(),
            CelType::Map(key, _) => (**key).clone(),
            CelType::Object(_) => CelType::String,
            CelType::Dyn | CelType::TypeParam(_) | CelType::Error => CelType::Dyn,
            other => {
                self.report(CheckError::type_mismatch(
                    CelType::list(CelType::Dyn),
                    other.clone(),
                    iter_range.span.clone(),
                    iter_range.id,
                ));
                CelType::Dyn
            }
        };

        self.scopes.enter_scope();
        self.scopes.add_variable(iter_var, iter_type.clone());

        if let Some(filter) = filter {
            let filter_type = self.check_expr(filter);
            self.expect_bool(&filter_type, filter);
        }
        let body_type = self.check_expr(body);

        self.scopes.exit_scope();

        match kind {
            ComprehensionKind::All | ComprehensionKind::Exists | ComprehensionKind::ExistsOne => {
                self.expect_bool(&body_type, body);
                CelType::Bool
            }
            ComprehensionKind::Filter => {
                self.expect_bool(&body_type, body);
                CelType::list(iter_type)
            }
            ComprehensionKind::Map => CelType::list(body_type),
        }
    }

    /// `has(e.f)` only needs `e` to be something with fields.
    fn check_member_test(&mut self, operand: &SpannedExpr, field: &str, expr: &SpannedExpr) -> CelType {
        let operand_type = self.check_expr(operand);
        let inner = match &operand_type {
            CelType::Optional(inner) => (**inner).clone(),
            other => other.clone(),
        };
        if !inner.is_dynamic() && inner.as_map_like().is_none() {
            self.report(CheckError::undefined_field(
                &inner.display_name(),
                field,
                expr.span.clone(),
                expr.id,
            ));
        }
        CelType::Bool
    }
}

/// Type checks `expr` against the given variables and functions.
pub fn check(expr: &SpannedExpr, variables: &[VariableDecl], functions: &FunctionRegistry) -> CheckResult {
    Checker::new(variables, functions).check(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::{CheckErrorKind, STANDARD_LIBRARY};
    use crate::ext;
    use crate::parse;
    use crate::types::ObjectShape;

    fn functions() -> FunctionRegistry {
        let mut registry = FunctionRegistry::new();
        for function in STANDARD_LIBRARY.iter().cloned().chain(ext::all_extensions()) {
            registry.register(function);
        }
        registry
    }

    fn check_with(source: &str, variables: &[VariableDecl]) -> (CheckResult, CelType) {
        let ast = parse(source).into_result().unwrap();
        let result = check(&ast, variables, &functions());
        let ty = result.get_type(ast.id).cloned().unwrap();
        (result, ty)
    }

    fn check_expr(source: &str) -> (CheckResult, CelType) {
        check_with(source, &[])
    }

    fn order_vars() -> Vec<VariableDecl> {
        vec![
            VariableDecl::new("orderId", CelType::String),
            VariableDecl::new("totalAmount", CelType::Int),
            VariableDecl::new("items", CelType::Dyn),
            VariableDecl::new("paymentMethod", CelType::Dyn),
        ]
    }

    fn first_error(result: &CheckResult) -> &CheckErrorKind {
        &result.errors.first().unwrap().kind
    }

    #[test]
    fn test_literal_types() {
        assert_eq!(check_expr("null").1, CelType::Null);
        assert_eq!(check_expr("1").1, CelType::Int);
        assert_eq!(check_expr("1.5").1, CelType::Double);
        assert_eq!(check_expr("'a'").1, CelType::String);
        assert_eq!(check_expr("[1, 2]").1, CelType::list(CelType::Int));
        assert_eq!(check_expr("[1, 'a']").1, CelType::list(CelType::Dyn));
        assert_eq!(check_expr("{'a': 1}").1, CelType::map(CelType::String, CelType::Int));
    }

    #[test]
    fn test_undeclared_variable() {
        let (result, _) = check_expr("missing + 1");
        assert!(!result.is_ok());
        assert_eq!(result.errors.len(), 1);
        assert!(matches!(
            first_error(&result),
            CheckErrorKind::UndeclaredReference { name } if name == "missing"
        ));
    }

    #[test]
    fn test_all_errors_are_collected() {
        let (result, _) = check_expr("a + b");
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn test_undeclared_function() {
        let (result, _) = check_expr("frobnicate(1)");
        assert!(matches!(
            first_error(&result),
            CheckErrorKind::UndeclaredFunction { name } if name == "frobnicate"
        ));
    }

    #[test]
    fn test_arithmetic() {
        let vars = order_vars();
        assert_eq!(check_with("totalAmount * 2", &vars).1, CelType::Int);
        assert_eq!(check_with("totalAmount * 1.5", &vars).1, CelType::Double);
        let (result, _) = check_with("orderId + 1", &vars);
        assert!(matches!(first_error(&result), CheckErrorKind::NoMatchingOverload { .. }));
    }

    #[test]
    fn test_equality() {
        let vars = order_vars();
        let (result, ty) = check_with("orderId != null && size(orderId) > 0", &vars);
        assert!(result.is_ok(), "{:?}", result.errors);
        assert_eq!(ty, CelType::Bool);

        let (result, _) = check_with("orderId == 1", &vars);
        assert!(!result.is_ok());
        assert!(check_with("totalAmount == 1.0", &vars).0.is_ok());
    }

    #[test]
    fn test_dynamic_fields_check_at_runtime() {
        let (result, ty) = check_with("items.map(i, i.nonExistentField)", &order_vars());
        assert!(result.is_ok());
        assert_eq!(ty, CelType::list(CelType::Dyn));
    }

    #[test]
    fn test_macros() {
        let vars = order_vars();
        assert_eq!(
            check_with("items.all(i, i.quantity > 0)", &vars).1,
            CelType::Bool
        );
        assert_eq!(
            check_with("[1, 2].filter(x, x > 1)", &vars).1,
            CelType::list(CelType::Int)
        );
        assert_eq!(
            check_with("[1, 2].map(x, x * 1.5)", &vars).1,
            CelType::list(CelType::Double)
        );
        let (result, _) = check_with("[1, 2].all(x, x)", &vars);
        assert!(matches!(first_error(&result), CheckErrorKind::TypeMismatch { .. }));
        let (result, _) = check_with("totalAmount.all(x, true)", &vars);
        assert!(!result.is_ok());
    }

    #[test]
    fn test_macro_variable_scope() {
        let (result, _) = check_with("[1].map(x, x) == [1] && x > 0", &order_vars());
        assert!(matches!(
            first_error(&result),
            CheckErrorKind::UndeclaredReference { name } if name == "x"
        ));
    }

    #[test]
    fn test_aggregates() {
        let vars = order_vars();
        let (result, ty) = check_with("totalAmount == items.map(i, i.price * i.quantity).sum()", &vars);
        assert!(result.is_ok(), "{:?}", result.errors);
        assert_eq!(ty, CelType::Bool);
        assert_eq!(check_with("[1, 2].sum()", &vars).1, CelType::Int);
        assert_eq!(check_with("[1, 2].unique()", &vars).1, CelType::list(CelType::Int));
    }

    #[test]
    fn test_field_selection_on_scalar_is_an_error() {
        let (result, _) = check_with("totalAmount.value", &order_vars());
        assert!(matches!(first_error(&result), CheckErrorKind::UndefinedField { .. }));
        let (result, _) = check_expr("true[0]");
        assert!(matches!(first_error(&result), CheckErrorKind::NoMatchingOverload { .. }));
    }

    #[test]
    fn test_object_shape_fields() {
        let shape = ObjectShape::new()
            .with_field("id", CelType::String)
            .with_field("price", CelType::Int);
        let vars = vec![VariableDecl::new("items", CelType::list(CelType::object(shape)))];

        let (result, ty) = check_with("items.map(i, i.price)", &vars);
        assert!(result.errors.is_empty());
        assert_eq!(ty, CelType::list(CelType::Int));

        let (result, ty) = check_with("items.map(i, i.prise)", &vars);
        assert!(result.is_ok());
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].is_warning());
        assert_eq!(ty, CelType::list(CelType::Dyn));
    }

    #[test]
    fn test_optional_and_coalesce() {
        let vars = order_vars();
        assert_eq!(check_with("items.?first", &vars).1, CelType::optional(CelType::Dyn));
        assert_eq!(check_with("totalAmount ?? 0", &vars).1, CelType::Int);
        assert_eq!(
            check_with("{'a': 1}.?a.orValue(0)", &vars).1,
            CelType::Int
        );
    }

    #[test]
    fn test_has() {
        let vars = order_vars();
        assert_eq!(check_with("has(items.quantity)", &vars).1, CelType::Bool);
        assert!(!check_with("has(orderId.length)", &vars).0.is_ok());
    }

    #[test]
    fn test_ternary() {
        let vars = order_vars();
        assert_eq!(check_with("true ? 1 : 2", &vars).1, CelType::Int);
        assert_eq!(check_with("true ? 1 : 'a'", &vars).1, CelType::Dyn);
        let (result, _) = check_with("1 ? 1 : 2", &vars);
        assert!(matches!(first_error(&result), CheckErrorKind::TypeMismatch { .. }));
    }

    #[test]
    fn test_check_is_deterministic() {
        let vars = order_vars();
        let source = "items.map(i, i.price * i.quantity).sum() > totalAmount ? [1] : []";
        let (a, _) = check_with(source, &vars);
        let (b, _) = check_with(source, &vars);
        assert_eq!(a.type_map, b.type_map);
        assert_eq!(a.errors, b.errors);
    }
}
