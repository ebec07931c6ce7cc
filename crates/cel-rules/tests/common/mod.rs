//! Common test utilities for cel-rules integration tests.

use cel_rules::{adapter, CelType, CompileError, Env, EvalError, Value};
use serde_json::json;

/// The order document the rule service is exercised with.
#[allow(dead_code)]
pub fn order_json() -> serde_json::Value {
    json!({
        "orderId": "ORD-001",
        "sponsorCode": "AUTO2000",
        "totalAmount": 750000,
        "branch": {"code": "AHASS-LBKBULUS"},
        "transactionDate": "2025-12-10",
        "items": [
            {"id": "ITM-001", "sku": "OLI123", "quantity": 2, "price": 300000},
            {"id": "ITM-002", "sku": "SERV001", "quantity": 1, "price": 150000}
        ],
        "customer": {"phoneNumber": "081234567890"},
        "paymentMethod": [
            {"method": "QRIS", "amount": 70000},
            {"method": "CASH", "amount": 15000}
        ],
        "additional_info": {
            "source_sales_person_id": "AKG-1234",
            "channel": "In-Person"
        }
    })
}

#[allow(dead_code)]
pub fn order() -> Value {
    adapter::normalize(&order_json())
}

/// Scalars typed, nested structures left dynamic.
#[allow(dead_code)]
pub fn order_env() -> Env {
    let mut env = Env::with_standard_library();
    let declarations = [
        ("orderId", CelType::String),
        ("sponsorCode", CelType::String),
        ("totalAmount", CelType::Int),
        ("branch", CelType::Dyn),
        ("transactionDate", CelType::String),
        ("customer", CelType::Dyn),
        ("items", CelType::Dyn),
        ("paymentMethod", CelType::Dyn),
        ("additional_info", CelType::Dyn),
    ];
    for (name, ty) in declarations {
        env.declare(name, ty).expect("declaration");
    }
    env
}

/// Compile against the order as sample, then evaluate against it.
#[allow(dead_code)]
pub fn eval_order(expr: &str) -> Result<Value, EvalError> {
    let env = order_env();
    let doc = order();
    let ast = env
        .compile_with_sample(expr, &doc)
        .unwrap_or_else(|e| panic!("failed to compile '{}': {}", expr, e));
    env.program(&ast).eval_document(&doc)
}

#[allow(dead_code)]
pub fn assert_true(expr: &str) {
    match eval_order(expr) {
        Ok(Value::Bool(true)) => {}
        other => panic!("expected '{}' to be true, got {:?}", expr, other),
    }
}

#[allow(dead_code)]
pub fn assert_compile_error(expr: &str) -> CompileError {
    match order_env().compile_with_sample(expr, &order()) {
        Ok(ast) => panic!("expected '{}' to fail to compile, got {:?}", expr, ast.result_type()),
        Err(err) => err,
    }
}
