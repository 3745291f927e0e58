//! Integration tests for facts.

use trellis_foundation::{Fact, Identity, Value, FIELD_SELF};

#[test]
fn equal_facts_hash_equal() {
    let a = Fact::new(Identity::new("B1"), Value::from("red"));
    let b = Fact::new(Identity::new("B1"), Value::from("red"));
    assert_eq!(a, b);
    assert_eq!(a.hash_value(), b.hash_value());
}

#[test]
fn hash_depends_on_both_components() {
    let base = Fact::new(Identity::new("B1"), Value::Int(1));
    let other_id = Fact::new(Identity::new("B2"), Value::Int(1));
    let other_value = Fact::new(Identity::new("B1"), Value::Int(2));
    assert_ne!(base.hash_value(), other_id.hash_value());
    assert_ne!(base.hash_value(), other_value.hash_value());
}

#[test]
fn self_field_reads_the_value() {
    let fact = Fact::new(Identity::new("B1"), Value::from("red"));
    assert_eq!(fact.get_value(FIELD_SELF).unwrap(), Value::from("red"));
    assert!(fact.has_field(FIELD_SELF));
    assert!(!fact.has_field("Color"));
}
