//! End-to-end tests: source text to live matches.

use std::sync::Arc;

use trellis_engine::Rete;
use trellis_foundation::{ErrorKind, Fact, Identity, Record, Value};
use trellis_language::parse_productions;

#[test]
fn string_rule_from_source() {
    let productions = parse_productions(
        r#"(define-prdt find-bar
             (when (for-string foo (eq $$ "BAR")))
             #:desc "strings equal to BAR")"#,
    )
    .unwrap();
    assert_eq!(productions.len(), 1);

    let mut rete = Rete::new();
    let handle = rete.add_production(productions.into_iter().next().unwrap()).unwrap();
    rete.add_fact(Fact::new(Identity::new("a"), Value::from("BAR")));
    rete.add_fact(Fact::new(Identity::new("b"), Value::from("BAZ")));

    let matches = rete.matches(&handle);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0][&Identity::new("foo")], Value::from("BAR"));
}

#[test]
fn negated_guard_from_source() {
    let productions = parse_productions(
        r#"(define-prdt not-bar
             (when (for-string foo (neq $$ "BAR"))))"#,
    )
    .unwrap();

    let mut rete = Rete::new();
    let handle = rete.add_production(productions.into_iter().next().unwrap()).unwrap();
    rete.add_fact(Fact::new(Identity::new("a"), Value::from("BAR")));
    rete.add_fact(Fact::new(Identity::new("b"), Value::from("BAZ")));

    let matches = rete.matches(&handle);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0][&Identity::new("foo")], Value::from("BAZ"));
}

struct Box_ {
    color: &'static str,
    on: Option<Arc<Box_>>,
}

impl Record for Box_ {
    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "Color" => Some(Value::from(self.color)),
            "On" => Some(
                self.on
                    .as_ref()
                    .map_or(Value::Nil, |b| Value::from(b.clone())),
            ),
            _ => None,
        }
    }

    fn has_field(&self, name: &str) -> bool {
        matches!(name, "Color" | "On")
    }

    fn type_name(&self) -> &'static str {
        "Box"
    }
}

#[test]
fn struct_rule_with_join_from_source() {
    let productions = parse_productions(
        "(define-prdt stacked
           (when
             (for-struct top (fields (Color string)) (eq Color \"red\"))
             (for-struct bottom (fields (Color string)) (eq Color \"blue\")))
           (where (eq (top On) (bottom $$))))",
    )
    .unwrap();

    let blue = Arc::new(Box_ {
        color: "blue",
        on: None,
    });
    let red = Arc::new(Box_ {
        color: "red",
        on: Some(blue.clone()),
    });
    let lone = Arc::new(Box_ {
        color: "red",
        on: None,
    });

    let mut rete = Rete::new();
    let handle = rete.add_production(productions.into_iter().next().unwrap()).unwrap();
    rete.add_fact(Fact::new(Identity::new("blue"), Value::from(blue.clone())));
    rete.add_fact(Fact::new(Identity::new("red"), Value::from(red.clone())));
    rete.add_fact(Fact::new(Identity::new("lone"), Value::from(lone)));

    let matches = rete.matches(&handle);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0][&Identity::new("top")], Value::from(red));
    assert_eq!(matches[0][&Identity::new("bottom")], Value::from(blue));
}

#[test]
fn negated_join_from_source() {
    let productions = parse_productions(
        "(define-prdt unstacked
           (when
             (for-struct x (fields (Color string)) (eq Color \"red\"))
             (for-struct base (fields (Color string)) (eq Color \"blue\")))
           (where (not (eq (x On) (base $$)))))",
    )
    .unwrap();
    assert!(productions[0].join_tests[0].negative);

    let blue = Arc::new(Box_ {
        color: "blue",
        on: None,
    });
    let stacked = Arc::new(Box_ {
        color: "red",
        on: Some(blue.clone()),
    });

    let mut rete = Rete::new();
    let handle = rete.add_production(productions.into_iter().next().unwrap()).unwrap();
    rete.add_fact(Fact::new(Identity::new("blue"), Value::from(blue)));
    rete.add_fact(Fact::new(Identity::new("red"), Value::from(stacked)));

    // The only red box sits on a blue one, so nothing floats.
    assert!(!rete.any_matches(&handle));
}

#[test]
fn multiple_definitions_in_one_source() {
    let productions = parse_productions(
        r#"; two rules in one file
           (define-prdt first (when (for-int i (less $$ 10))))
           (define-prdt second (when (for-bool b (eq $$ #t))))"#,
    )
    .unwrap();
    assert_eq!(productions.len(), 2);
    assert_eq!(productions[0].id, "first");
    assert_eq!(productions[1].id, "second");

    let mut rete = Rete::new();
    let first = rete.add_production(productions[0].clone()).unwrap();
    let second = rete.add_production(productions[1].clone()).unwrap();
    rete.add_fact(Fact::new(Identity::new("n"), Value::Int(5)));
    rete.add_fact(Fact::new(Identity::new("t"), Value::Bool(true)));
    rete.add_fact(Fact::new(Identity::new("f"), Value::Bool(false)));

    assert_eq!(rete.matches(&first).len(), 1);
    assert_eq!(rete.matches(&second).len(), 1);
}

#[test]
fn parse_errors_carry_positions() {
    let err = parse_productions("(define-prdt broken").unwrap_err();
    let ErrorKind::ParseError { line, column, .. } = err.kind else {
        panic!("expected a parse error, got {err}");
    };
    assert_eq!(line, 1);
    assert_eq!(column, 1);

    let err = parse_productions(
        "(define-prdt nope
           (when (for-string s (eq $$ \"x\")))
           #:unknown 3)",
    )
    .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ParseError { .. }));
}
