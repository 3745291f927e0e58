//! Incrementality and order-independence properties.

use std::collections::HashMap;

use trellis_engine::Rete;
use trellis_foundation::{Identity, Value};

use crate::fixtures::{not_on_table_rule, red_rule, stack_rule, Board};

/// Normalizes a match set for comparison across engines.
fn match_set(
    rete: &Rete,
    handle: &trellis_engine::ProductionHandle,
) -> Vec<Vec<(String, Value)>> {
    let mut matches: Vec<Vec<(String, Value)>> = rete
        .matches(handle)
        .into_iter()
        .map(|m: HashMap<Identity, Value>| {
            let mut pairs: Vec<(String, Value)> = m
                .into_iter()
                .map(|(alias, value)| (alias.as_str().to_string(), value))
                .collect();
            pairs.sort_by(|a, b| a.0.cmp(&b.0));
            pairs
        })
        .collect();
    matches.sort_by(|a, b| format!("{a:?}").cmp(&format!("{b:?}")));
    matches
}

#[test]
fn add_remove_roundtrip_preserves_match_set() {
    let mut rete = Rete::new();
    let board = Board::new();
    let handle = rete.add_production(stack_rule("stack")).unwrap();
    for fact in board.facts() {
        rete.add_fact(fact);
    }
    let baseline = match_set(&rete, &handle);
    assert_eq!(baseline.len(), 1);

    for name in ["B1", "B2", "B3", "table"] {
        let fact = board.fact(name);
        rete.remove_fact(&fact);
        rete.add_fact(fact);
        assert_eq!(match_set(&rete, &handle), baseline, "after cycling {name}");
    }
}

#[test]
fn final_match_set_is_insertion_order_independent() {
    let board = Board::new();
    let orders = [
        ["B1", "B2", "B3", "table"],
        ["table", "B3", "B2", "B1"],
        ["B2", "table", "B1", "B3"],
        ["B3", "B1", "table", "B2"],
    ];

    let mut reference = None;
    for order in orders {
        let mut rete = Rete::new();
        let handle = rete.add_production(stack_rule("stack")).unwrap();
        for name in order {
            rete.add_fact(board.fact(name));
        }
        let set = match_set(&rete, &handle);
        match &reference {
            None => reference = Some(set),
            Some(expected) => assert_eq!(&set, expected, "order {order:?}"),
        }
    }
}

#[test]
fn rules_before_or_after_facts_agree() {
    let board = Board::new();

    let mut rules_first = Rete::new();
    let h1 = rules_first.add_production(not_on_table_rule("floating")).unwrap();
    for fact in board.facts() {
        rules_first.add_fact(fact);
    }

    let mut facts_first = Rete::new();
    for fact in board.facts() {
        facts_first.add_fact(fact);
    }
    let h2 = facts_first.add_production(not_on_table_rule("floating")).unwrap();

    assert_eq!(match_set(&rules_first, &h1), match_set(&facts_first, &h2));

    // Interleaved: half the facts, then the rule, then the rest.
    let mut interleaved = Rete::new();
    interleaved.add_fact(board.fact("table"));
    interleaved.add_fact(board.fact("B2"));
    let h3 = interleaved.add_production(not_on_table_rule("floating")).unwrap();
    interleaved.add_fact(board.fact("B1"));
    interleaved.add_fact(board.fact("B3"));

    assert_eq!(match_set(&rules_first, &h1), match_set(&interleaved, &h3));
}

#[test]
fn duplicate_adds_do_not_duplicate_matches() {
    let mut rete = Rete::new();
    let board = Board::new();
    let handle = rete.add_production(red_rule("red")).unwrap();
    for _ in 0..3 {
        for fact in board.facts() {
            rete.add_fact(fact);
        }
    }
    assert_eq!(rete.matches(&handle).len(), 2);
    assert_eq!(rete.fact_count(), 4);
}

#[test]
fn removing_an_absent_fact_is_a_no_op() {
    let mut rete = Rete::new();
    let board = Board::new();
    let handle = rete.add_production(red_rule("red")).unwrap();
    rete.add_fact(board.fact("B1"));

    rete.remove_fact(&board.fact("B3"));
    assert_eq!(rete.matches(&handle).len(), 1);
    assert_eq!(rete.fact_count(), 1);
}

#[test]
fn late_production_sees_existing_facts() {
    let mut rete = Rete::new();
    let board = Board::new();
    for fact in board.facts() {
        rete.add_fact(fact);
    }

    let handle = rete.add_production(stack_rule("late")).unwrap();
    assert!(rete.any_matches(&handle));
    assert_eq!(rete.matches(&handle).len(), 1);
}
