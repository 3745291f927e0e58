//! Shared fixtures for the engine's unit tests: a four-piece chess
//! working set with reference-valued fields.

use std::collections::HashMap;
use std::sync::Arc;

use trellis_foundation::{Fact, Identity, Record, TypeInfo, Value, VariantTag};

/// A chess piece (or the table) with reference fields.
pub(crate) struct Chess {
    pub(crate) color: &'static str,
    pub(crate) on: Option<Arc<Chess>>,
    pub(crate) left_of: Option<Arc<Chess>>,
    pub(crate) rank: i64,
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

/// The standard working set:
/// B1 red on B2, B2 blue on table left of B3, B3 red on table, table.
pub(crate) struct ChessBoard {
    pub(crate) b1: Arc<Chess>,
    pub(crate) b2: Arc<Chess>,
    pub(crate) b3: Arc<Chess>,
    pub(crate) table: Arc<Chess>,
}

impl ChessBoard {
    pub(crate) fn fact(&self, name: &str) -> Fact {
        let record = match name {
            "B1" => self.b1.clone(),
            "B2" => self.b2.clone(),
            "B3" => self.b3.clone(),
            "table" => self.table.clone(),
            _ => panic!("unknown piece {name}"),
        };
        Fact::new(Identity::new(name), Value::from(record))
    }

    /// All four facts, in B1, B2, B3, table order.
    pub(crate) fn facts(&self) -> Vec<Fact> {
        ["B1", "B2", "B3", "table"]
            .iter()
            .map(|name| self.fact(name))
            .collect()
    }
}

pub(crate) fn chess_board() -> ChessBoard {
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
    ChessBoard { b1, b2, b3, table }
}

/// Structural descriptor for chess facts: a struct with a string color.
pub(crate) fn chess_type() -> TypeInfo {
    let mut fields = HashMap::new();
    fields.insert("Color".to_string(), VariantTag::String);
    TypeInfo::of_struct(fields)
}
