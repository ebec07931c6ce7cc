use cel_rules::{parse, BinaryOp, ComprehensionKind, Expr, SpannedExpr};

fn parses(input: &str) -> SpannedExpr {
    let result = parse(input);
    if !result.errors.is_empty() {
        panic!(
            "failed to parse '{}': {:?}",
            input,
            result.errors.iter().map(|e| e.to_string()).collect::<Vec<_>>()
        );
    }
    result.ast.expect("expected AST")
}

fn fails(input: &str) -> Vec<cel_rules::ParseError> {
    let result = parse(input);
    if result.errors.is_empty() {
        panic!("expected parse error for '{}', but got: {:?}", input, result.ast);
    }
    result.errors
}

#[test]
fn literals() {
    assert_eq!(parses("null").node, Expr::Null);
    assert_eq!(parses("0x1F").node, Expr::Int(31));
    assert_eq!(parses("1e3").node, Expr::Double(1000.0));
    assert_eq!(parses(r#""a\tb""#).node, Expr::String("a\tb".to_string()));
    assert_eq!(parses(r#"r"a\tb""#).node, Expr::String("a\\tb".to_string()));
    assert_eq!(parses("'''multi\nline'''").node, Expr::String("multi\nline".to_string()));
    assert_eq!(parses("b'ab'").node, Expr::Bytes(b"ab".to_vec()));
}

#[test]
fn comments_are_ignored() {
    assert_eq!(parses("1 // one\n").node, Expr::Int(1));
}

#[test]
fn arithmetic_binds_tighter_than_comparison() {
    match parses("a + b * c == d").node {
        Expr::Binary { op: BinaryOp::Eq, left, .. } => match left.node {
            Expr::Binary { op: BinaryOp::Add, right, .. } => {
                assert!(matches!(right.node, Expr::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("expected addition, got {:?}", other),
        },
        other => panic!("expected equality, got {:?}", other),
    }
}

#[test]
fn and_binds_tighter_than_or() {
    match parses("a || b && c").node {
        Expr::Binary { op: BinaryOp::Or, right, .. } => {
            assert!(matches!(right.node, Expr::Binary { op: BinaryOp::And, .. }));
        }
        other => panic!("expected or, got {:?}", other),
    }
}

#[test]
fn collection_literals_allow_trailing_commas() {
    assert!(matches!(parses("[1, 2,]").node, Expr::List(items) if items.len() == 2));
    assert!(matches!(parses("{'a': 1,}").node, Expr::Map(entries) if entries.len() == 1));
}

#[test]
fn macros_expand_to_comprehensions() {
    let cases = [
        ("items.all(i, i.ok)", ComprehensionKind::All),
        ("items.exists(i, i.ok)", ComprehensionKind::Exists),
        ("items.exists_one(i, i.ok)", ComprehensionKind::ExistsOne),
        ("items.map(i, i.price)", ComprehensionKind::Map),
        ("items.filter(i, i.ok)", ComprehensionKind::Filter),
    ];
    for (input, expected) in cases {
        match parses(input).node {
            Expr::Comprehension { kind, iter_var, .. } => {
                assert_eq!(kind, expected, "{}", input);
                assert_eq!(iter_var, "i");
            }
            other => panic!("expected comprehension for '{}', got {:?}", input, other),
        }
    }
}

#[test]
fn three_argument_map_keeps_its_filter() {
    match parses("items.map(i, i.ok, i.price)").node {
        Expr::Comprehension { kind: ComprehensionKind::Map, filter, .. } => assert!(filter.is_some()),
        other => panic!("expected map, got {:?}", other),
    }
}

#[test]
fn has_expands_to_presence_test() {
    assert!(matches!(
        parses("has(customer.phoneNumber)").node,
        Expr::MemberTestOnly { field, .. } if field == "phoneNumber"
    ));
}

#[test]
fn aggregates_are_ordinary_method_calls() {
    match parses("items.map(i, i.id).unique()").node {
        Expr::Call { function, target, args } => {
            assert_eq!(function, "unique");
            assert!(target.is_some());
            assert!(args.is_empty());
        }
        other => panic!("expected call, got {:?}", other),
    }
}

#[test]
fn optional_select_and_coalesce() {
    assert!(matches!(parses("a.?b").node, Expr::Member { optional: true, .. }));
    assert!(matches!(parses("a.b ?? 0").node, Expr::Binary { op: BinaryOp::Coalesce, .. }));
}

#[test]
fn safe_navigation_is_not_syntax() {
    fails("customer?.phoneNumber");
}

#[test]
fn invalid_macro_shapes() {
    fails("has(customer)");
    fails("items.all(1, true)");
}

#[test]
fn reserved_words_are_not_identifiers() {
    let errors = fails("if > 1");
    assert!(errors[0].message.contains("reserved"));
}

#[test]
fn errors_carry_spans() {
    let errors = fails("1 + ");
    assert!(errors[0].span.start >= 2);
}

#[test]
fn node_ids_are_unique() {
    fn collect(expr: &SpannedExpr, ids: &mut Vec<i64>) {
        ids.push(expr.id);
        match &expr.node {
            Expr::Binary { left, right, .. } => {
                collect(left, ids);
                collect(right, ids);
            }
            Expr::Member { expr, .. } => collect(expr, ids),
            _ => {}
        }
    }
    let mut ids = Vec::new();
    collect(&parses("a.b + c.d"), &mut ids);
    let count = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), count);
}
