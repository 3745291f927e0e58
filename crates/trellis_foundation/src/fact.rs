//! Facts: identified values submitted to the engine.

use std::fmt;

use crate::hash::mix64;
use crate::value::{Identity, Value, FIELD_SELF};
use crate::Result;

/// An identified value.
///
/// Two facts with equal id and equal value are the same fact; the engine
/// keys its working memory on [`Fact::hash_value`].
#[derive(Clone, PartialEq, Eq)]
pub struct Fact {
    /// Name other facts can refer to this fact by.
    pub id: Identity,
    /// The fact's value.
    pub value: Value,
}

impl Fact {
    /// Creates a fact.
    #[must_use]
    pub fn new(id: Identity, value: Value) -> Self {
        Self { id, value }
    }

    /// Returns the stable hash identifying this fact in working memory.
    #[must_use]
    pub fn hash_value(&self) -> u64 {
        mix64(self.id.hash_value(), self.value.hash_value())
    }

    /// Reads a field of the fact's value.
    ///
    /// [`FIELD_SELF`] always yields the value itself; other names reflect
    /// on struct values.
    ///
    /// # Errors
    /// Returns [`ErrorKind::FieldNotFound`](crate::ErrorKind::FieldNotFound)
    /// when the field does not exist.
    pub fn get_value(&self, field: &str) -> Result<Value> {
        if field == FIELD_SELF {
            return Ok(self.value.clone());
        }
        self.value.get_field(field)
    }

    /// Returns true if the fact's value has the named field.
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.value.has_field(field)
    }
}

impl fmt::Debug for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fact({} = {:?})", self.id, self.value)
    }
}
