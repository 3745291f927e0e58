//! Integration tests for the value model.

use std::sync::Arc;

use trellis_foundation::{Identity, Record, TestOp, TypeInfo, Value, VariantTag, FIELD_SELF};

struct Account {
    owner: String,
    balance: i64,
    parent: Option<Arc<Account>>,
}

impl Record for Account {
    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "Owner" => Some(Value::from(self.owner.as_str())),
            "Balance" => Some(Value::Int(self.balance)),
            "Parent" => Some(
                self.parent
                    .as_ref()
                    .map_or(Value::Nil, |p| Value::from(p.clone())),
            ),
            _ => None,
        }
    }

    fn has_field(&self, name: &str) -> bool {
        matches!(name, "Owner" | "Balance" | "Parent")
    }

    fn type_name(&self) -> &'static str {
        "Account"
    }
}

fn account(owner: &str, balance: i64) -> Arc<Account> {
    Arc::new(Account {
        owner: owner.to_string(),
        balance,
        parent: None,
    })
}

#[test]
fn scalar_values_compare_by_content() {
    assert_eq!(Value::from("red"), Value::from("red"));
    assert_eq!(Value::Int(1), Value::Int(1));
    assert_eq!(Value::Nil, Value::Nil);
    assert_ne!(Value::Int(1), Value::Uint(1));
    assert_ne!(Value::Bool(false), Value::Nil);
}

#[test]
fn identities_are_not_strings() {
    let as_string = Value::from("table");
    let as_identity = Value::Identity(Identity::new("table"));
    assert_ne!(as_string, as_identity);
    assert_ne!(as_string.hash_value(), as_identity.hash_value());
}

#[test]
fn struct_values_compare_by_record_identity() {
    let a = account("ada", 10);
    let va = Value::from(a.clone());
    let va_again = Value::from(a);
    let vb = Value::from(account("ada", 10));

    assert_eq!(va, va_again);
    assert_ne!(va, vb);
}

#[test]
fn reflective_field_access() {
    let a = account("ada", 10);
    let v = Value::from(a);
    assert_eq!(v.get_field("Owner").unwrap(), Value::from("ada"));
    assert_eq!(v.get_field("Balance").unwrap(), Value::Int(10));
    assert_eq!(v.get_field("Parent").unwrap(), Value::Nil);
    assert!(v.get_field("Missing").is_err());
}

#[test]
fn nested_record_fields_share_the_referenced_record() {
    let parent = account("root", 0);
    let child = Arc::new(Account {
        owner: "ada".to_string(),
        balance: 10,
        parent: Some(parent.clone()),
    });
    let v = Value::from(child);
    assert_eq!(v.get_field("Parent").unwrap(), Value::from(parent));
}

#[test]
fn downcast_recovers_the_host_record() {
    let v = Value::from(account("ada", 10));
    let back: &Account = v.downcast_record().unwrap();
    assert_eq!(back.owner, "ada");
    assert_eq!(back.balance, 10);
}

#[test]
fn self_field_on_scalars() {
    let v = Value::Float(2.5);
    assert_eq!(v.get_field(FIELD_SELF).unwrap(), v);
}

#[test]
fn less_promotes_across_numeric_variants() {
    assert!(TestOp::Less
        .apply(&Value::Int(2), &Value::Uint(3))
        .unwrap());
    assert!(TestOp::Less
        .apply(&Value::Uint(2), &Value::Float(2.5))
        .unwrap());
    assert!(!TestOp::Less
        .apply(&Value::Float(3.5), &Value::Int(3))
        .unwrap());
}

#[test]
fn less_rejects_non_numeric_operands() {
    assert!(TestOp::Less
        .apply(&Value::from("a"), &Value::Int(1))
        .is_err());
    assert!(TestOp::Less.apply(&Value::Nil, &Value::Nil).is_err());
}

#[test]
fn nominal_type_info_distinguishes_record_types() {
    struct Other;
    impl Record for Other {
        fn field(&self, _: &str) -> Option<Value> {
            None
        }
        fn has_field(&self, _: &str) -> bool {
            false
        }
        fn type_name(&self) -> &'static str {
            "Other"
        }
    }

    let accounts = TypeInfo::of_record::<Account>();
    let fact = trellis_foundation::Fact::new(Identity::new("a"), Value::from(account("ada", 1)));
    assert!(accounts.matches(&fact));

    let other = trellis_foundation::Fact::new(Identity::new("o"), Value::from(Arc::new(Other)));
    assert!(!accounts.matches(&other));
}

#[test]
fn structural_type_info_checks_listed_fields() {
    let mut fields = std::collections::HashMap::new();
    fields.insert("Balance".to_string(), VariantTag::Int);
    let shape = TypeInfo::of_struct(fields);

    let fact = trellis_foundation::Fact::new(Identity::new("a"), Value::from(account("ada", 1)));
    assert!(shape.matches(&fact));

    let mut wrong = std::collections::HashMap::new();
    wrong.insert("Balance".to_string(), VariantTag::String);
    assert!(!TypeInfo::of_struct(wrong).matches(&fact));
}
