//! Compile-time rejection of malformed productions.

use trellis_engine::{AliasDeclaration, Guard, JoinTest, Production, Rete, Selector};
use trellis_foundation::{
    ErrorKind, Identity, TypeInfo, Value, VariantTag, FIELD_ID, FIELD_SELF,
};

use crate::fixtures::chess_alias;

fn expect_rejection(production: Production) -> ErrorKind {
    let mut rete = Rete::new();
    let err = rete.add_production(production).unwrap_err();
    // A rejected production must leave no trace.
    assert_eq!(rete.production_count(), 0);
    assert_eq!(rete.alpha_root_child_count(), 0);
    assert!(rete.beta_is_empty());
    err.kind
}

#[test]
fn unknown_variant_type_info() {
    let kind = expect_rejection(Production::new("p").with_alias(AliasDeclaration::new(
        "X",
        TypeInfo::of_variant(VariantTag::Unknown),
    )));
    assert!(matches!(kind, ErrorKind::InvalidTypeInfo { .. }));
}

#[test]
fn duplicate_alias() {
    let kind = expect_rejection(
        Production::new("p")
            .with_alias(chess_alias("X"))
            .with_alias(chess_alias("X")),
    );
    assert!(matches!(kind, ErrorKind::DuplicateAlias { .. }));
}

#[test]
fn identity_guard_value() {
    let kind = expect_rejection(Production::new("p").with_alias(
        chess_alias("X").with_guard(Guard::equal(
            "On",
            Value::Identity(Identity::new("Y")),
        )),
    ));
    assert!(matches!(kind, ErrorKind::InvalidGuard { .. }));
}

#[test]
fn join_test_on_undeclared_alias() {
    let kind = expect_rejection(
        Production::new("p")
            .with_alias(chess_alias("X"))
            .with_alias(chess_alias("Y"))
            .with_join_test(JoinTest::equal(vec![
                Selector::new("X", "On"),
                Selector::new("Z", FIELD_SELF),
            ])),
    );
    assert!(matches!(kind, ErrorKind::UnguardedAlias { .. }));
}

#[test]
fn negated_guard_on_the_id_attribute() {
    let kind = expect_rejection(Production::new("p").with_alias(
        chess_alias("X").with_guard(Guard::equal(FIELD_ID, "B1").negated()),
    ));
    assert!(matches!(kind, ErrorKind::NegationOnUnsupportedNode { .. }));
}

#[test]
fn single_selector_join_test() {
    let kind = expect_rejection(
        Production::new("p")
            .with_alias(chess_alias("X"))
            .with_join_test(JoinTest::equal(vec![Selector::new("X", "On")])),
    );
    assert!(matches!(kind, ErrorKind::InvalidJoinTest { .. }));
}

#[test]
fn rejection_does_not_disturb_existing_rules() {
    let mut rete = Rete::new();
    let board = crate::fixtures::Board::new();
    let good = rete.add_production(crate::fixtures::red_rule("good")).unwrap();
    for fact in board.facts() {
        rete.add_fact(fact);
    }
    let nodes = rete.beta_node_count();

    let err = rete.add_production(
        Production::new("bad")
            .with_alias(chess_alias("X"))
            .with_alias(chess_alias("X")),
    );
    assert!(err.is_err());
    assert_eq!(rete.beta_node_count(), nodes);
    assert_eq!(rete.matches(&good).len(), 2);
}
