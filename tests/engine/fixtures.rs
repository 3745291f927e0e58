//! Shared fixtures: the four-piece chess working set and its rules.

use std::collections::HashMap;
use std::sync::Arc;

use trellis_engine::{AliasDeclaration, Guard, JoinTest, Production, Selector};
use trellis_foundation::{
    Fact, Identity, Record, TypeInfo, Value, VariantTag, FIELD_SELF,
};

pub struct Chess {
    pub color: &'static str,
    pub on: Option<Arc<Chess>>,
    pub left_of: Option<Arc<Chess>>,
    pub rank: i64,
}

impl Record for Chess {
    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "Color" => Some(Value::from(self.color)),
            "On" => Some(
                self.on
                    .as_ref()
                    .map_or(Value::Nil, |c| Value::from(c.clone())),
            ),
            "LeftOf" => Some(
                self.left_of
                    .as_ref()
                    .map_or(Value::Nil, |c| Value::from(c.clone())),
            ),
            "Rank" => Some(Value::Int(self.rank)),
            _ => None,
        }
    }

    fn has_field(&self, name: &str) -> bool {
        matches!(name, "Color" | "On" | "LeftOf" | "Rank")
    }

    fn type_name(&self) -> &'static str {
        "Chess"
    }
}

/// B1 red on B2, B2 blue on table left of B3, B3 red on table, table.
pub struct Board {
    pub b1: Arc<Chess>,
    pub b2: Arc<Chess>,
    pub b3: Arc<Chess>,
    pub table: Arc<Chess>,
}

impl Board {
    pub fn new() -> Self {
        let table = Arc::new(Chess {
            color: "",
            on: None,
            left_of: None,
            rank: 0,
        });
        let b3 = Arc::new(Chess {
            color: "red",
            on: Some(table.clone()),
            left_of: None,
            rank: 3,
        });
        let b2 = Arc::new(Chess {
            color: "blue",
            on: Some(table.clone()),
            left_of: Some(b3.clone()),
            rank: 2,
        });
        let b1 = Arc::new(Chess {
            color: "red",
            on: Some(b2.clone()),
            left_of: None,
            rank: 1,
        });
        Self { b1, b2, b3, table }
    }

    pub fn fact(&self, name: &str) -> Fact {
        let record = match name {
            "B1" => self.b1.clone(),
            "B2" => self.b2.clone(),
            "B3" => self.b3.clone(),
            "table" => self.table.clone(),
            _ => panic!("unknown piece {name}"),
        };
        Fact::new(Identity::new(name), Value::from(record))
    }

    pub fn facts(&self) -> Vec<Fact> {
        ["B1", "B2", "B3", "table"]
            .iter()
            .map(|name| self.fact(name))
            .collect()
    }
}

pub fn chess_type() -> TypeInfo {
    let mut fields = HashMap::new();
    fields.insert("Color".to_string(), VariantTag::String);
    TypeInfo::of_struct(fields)
}

pub fn chess_alias(name: &str) -> AliasDeclaration {
    AliasDeclaration::new(name, chess_type())
}

/// Alias X guarded by `Color = "red"`.
pub fn red_rule(id: &str) -> Production {
    Production::new(id)
        .with_alias(chess_alias("X").with_guard(Guard::equal("Color", "red")))
}

/// X on Y, Y left of red Z, Z on the table.
pub fn stack_rule(id: &str) -> Production {
    Production::new(id)
        .with_alias(chess_alias("X"))
        .with_alias(chess_alias("Y"))
        .with_alias(chess_alias("Z").with_guard(Guard::equal("Color", "red")))
        .with_alias(chess_alias("Table").with_guard(Guard::equal("Color", "")))
        .with_join_test(JoinTest::equal(vec![
            Selector::new("X", "On"),
            Selector::new("Y", FIELD_SELF),
        ]))
        .with_join_test(JoinTest::equal(vec![
            Selector::new("Y", "LeftOf"),
            Selector::new("Z", FIELD_SELF),
        ]))
        .with_join_test(JoinTest::equal(vec![
            Selector::new("Z", "On"),
            Selector::new("Table", FIELD_SELF),
        ]))
}

/// Rank-1 X that does not sit on any table.
pub fn not_on_table_rule(id: &str) -> Production {
    Production::new(id)
        .with_alias(chess_alias("Table").with_guard(Guard::equal("Color", "")))
        .with_alias(chess_alias("X").with_guard(Guard::equal("Rank", 1i64)))
        .with_join_test(
            JoinTest::equal(vec![
                Selector::new("X", "On"),
                Selector::new("Table", FIELD_SELF),
            ])
            .negated(),
        )
}

/// True if some match binds `alias` to exactly `value`.
pub fn binds(
    matches: &[HashMap<Identity, Value>],
    alias: &str,
    value: &Value,
) -> bool {
    matches
        .iter()
        .any(|m| m.get(&Identity::new(alias)) == Some(value))
}
