//! Type descriptors for alias declarations.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::fact::Fact;
use crate::hash::{hash_str, hash_u64, mix64};
use crate::value::Value;

/// Variant tag of a [`Value`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum VariantTag {
    /// No variant; invalid in declarations.
    #[default]
    Unknown,
    /// The nil value.
    Nil,
    /// A fact reference.
    Identity,
    /// String value.
    String,
    /// Signed 64-bit integer.
    Int,
    /// Unsigned 64-bit integer.
    Uint,
    /// 64-bit float.
    Float,
    /// Boolean value.
    Bool,
    /// Host record with reflective field access.
    Struct,
}

impl VariantTag {
    /// Returns true if this tag names a numeric variant.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Uint | Self::Float)
    }

    /// Returns true if this tag names a scalar (non-struct, non-unknown)
    /// variant.
    #[must_use]
    pub const fn is_scalar(self) -> bool {
        !matches!(self, Self::Unknown | Self::Struct)
    }
}

impl fmt::Debug for VariantTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "unknown",
            Self::Nil => "nil",
            Self::Identity => "identity",
            Self::String => "string",
            Self::Int => "int",
            Self::Uint => "uint",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Struct => "struct",
        };
        write!(f, "{name}")
    }
}

impl fmt::Display for VariantTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Type requirement an alias places on the facts it can bind.
///
/// With `rtype` set the check is nominal: a struct fact must wrap exactly
/// that record type. Otherwise the fact's variant must equal `variant`,
/// and for structs every listed field must exist on the record, with the
/// field's variant checked only for scalar expectations (`Unknown` and
/// `Struct` expectations are existence-only).
#[derive(Clone, Debug, Default)]
pub struct TypeInfo {
    /// Required variant of the fact value.
    pub variant: VariantTag,
    /// Field shape required of struct facts.
    pub fields: Option<HashMap<String, VariantTag>>,
    /// Exact host record type for nominal matching.
    pub rtype: Option<TypeId>,
}

impl TypeInfo {
    /// Creates a structural descriptor for a scalar variant.
    #[must_use]
    pub fn of_variant(variant: VariantTag) -> Self {
        Self {
            variant,
            fields: None,
            rtype: None,
        }
    }

    /// Creates a structural descriptor for struct facts with the given
    /// field shape.
    #[must_use]
    pub fn of_struct(fields: HashMap<String, VariantTag>) -> Self {
        Self {
            variant: VariantTag::Struct,
            fields: Some(fields),
            rtype: None,
        }
    }

    /// Creates a nominal descriptor for one concrete record type.
    #[must_use]
    pub fn of_record<T: crate::value::Record>() -> Self {
        Self {
            variant: VariantTag::Struct,
            fields: None,
            rtype: Some(TypeId::of::<T>()),
        }
    }

    /// Returns true if the fact satisfies this descriptor.
    #[must_use]
    pub fn matches(&self, fact: &Fact) -> bool {
        if let Some(rtype) = self.rtype {
            return match &fact.value {
                Value::Struct(s) => s.record_type_id() == rtype,
                _ => false,
            };
        }

        if fact.value.variant() != self.variant {
            return false;
        }

        if let (Value::Struct(s), Some(fields)) = (&fact.value, &self.fields) {
            for (name, expect) in fields {
                if !s.record().has_field(name) {
                    return false;
                }
                if expect.is_scalar() {
                    match s.record().field(name) {
                        Some(v) if v.variant() == *expect => {}
                        _ => return false,
                    }
                }
            }
        }

        true
    }

    /// Returns a stable content hash of this descriptor.
    ///
    /// Field maps are folded order-independently so equal shapes hash
    /// equal regardless of declaration order.
    #[must_use]
    pub fn hash_value(&self) -> u64 {
        let mut h = hash_u64(self.variant as u64);
        if let Some(fields) = &self.fields {
            let mut folded = hash_u64(fields.len() as u64);
            for (name, tag) in fields {
                // XOR keeps the fold commutative across iteration order.
                folded ^= mix64(hash_str(name), hash_u64(*tag as u64));
            }
            h = mix64(h, folded);
        }
        if let Some(rtype) = self.rtype {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            rtype.hash(&mut hasher);
            h = mix64(h, hasher.finish());
        }
        h
    }
}
