//! The tagged value type facts are made of.
//!
//! Values are cheap to clone: strings and identities are shared `Arc`s,
//! struct values are shared references to host records. Struct equality is
//! identity of the underlying record, not structural equality.

use std::any::{Any, TypeId};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::Error;
use crate::hash::{hash_str, hash_u64, mix64};
use crate::types::VariantTag;
use crate::Result;

/// Sentinel field name through which scalar values expose themselves.
pub const FIELD_SELF: &str = "__Self__";

/// Sentinel field name reserved for the owning working-memory element's
/// identity. Resolved by the engine, never by [`Value`] itself.
pub const FIELD_ID: &str = "__ID__";

/// A by-name reference to another fact.
///
/// Identities are semantically references, never constants: guards may not
/// carry them, and cross-alias references appear only in join tests.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(Arc<str>);

impl Identity {
    /// Creates an identity from a name.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    /// Returns the name this identity refers to.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a stable content hash of this identity.
    #[must_use]
    pub fn hash_value(&self) -> u64 {
        hash_str(&self.0)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.0)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Identity {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Reflective field access for host record types.
///
/// Hosts implement this once per record type they want to match on. The
/// engine only ever reads records through this trait; it never assumes a
/// layout.
pub trait Record: Any {
    /// Returns the named field as a [`Value`], or `None` if the record has
    /// no such field.
    fn field(&self, name: &str) -> Option<Value>;

    /// Returns true if the record has the named field.
    fn has_field(&self, name: &str) -> bool;

    /// A short name for diagnostics.
    fn type_name(&self) -> &'static str;
}

/// A shared reference to a host record.
///
/// Two `StructRef`s are equal iff they point at the same record. Hashing
/// combines the record's concrete type with its address, so equal
/// references hash equal for the lifetime of the engine.
#[derive(Clone)]
pub struct StructRef(Arc<dyn Record>);

impl StructRef {
    /// Wraps a shared record.
    #[must_use]
    pub fn new(record: Arc<dyn Record>) -> Self {
        Self(record)
    }

    /// Returns the underlying record.
    #[must_use]
    pub fn record(&self) -> &dyn Record {
        self.0.as_ref()
    }

    /// Returns the concrete type of the underlying record.
    #[must_use]
    pub fn record_type_id(&self) -> TypeId {
        self.0.as_ref().type_id()
    }

    /// Attempts to view the underlying record as a concrete type.
    #[must_use]
    pub fn downcast_ref<T: Record>(&self) -> Option<&T> {
        let any: &dyn Any = self.0.as_ref();
        any.downcast_ref::<T>()
    }

    /// Returns true if both references point at the same record.
    #[must_use]
    pub fn same_record(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Returns a stable content hash: concrete type mixed with address.
    #[must_use]
    pub fn hash_value(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.record_type_id().hash(&mut hasher);
        mix64(hasher.finish(), Arc::as_ptr(&self.0) as *const () as u64)
    }
}

impl fmt::Debug for StructRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StructRef({})", self.0.type_name())
    }
}

impl<T: Record> From<Arc<T>> for StructRef {
    fn from(record: Arc<T>) -> Self {
        Self(record)
    }
}

/// The value of a fact or of a guard literal.
#[derive(Clone)]
pub enum Value {
    /// The nil value (represents absence).
    Nil,
    /// A reference to another fact by name.
    Identity(Identity),
    /// String value.
    String(Arc<str>),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit unsigned integer.
    Uint(u64),
    /// 64-bit floating point.
    Float(f64),
    /// Boolean value.
    Bool(bool),
    /// A shared host record with reflective field access.
    Struct(StructRef),
}

impl Value {
    /// Returns the variant tag of this value.
    #[must_use]
    pub fn variant(&self) -> VariantTag {
        match self {
            Self::Nil => VariantTag::Nil,
            Self::Identity(_) => VariantTag::Identity,
            Self::String(_) => VariantTag::String,
            Self::Int(_) => VariantTag::Int,
            Self::Uint(_) => VariantTag::Uint,
            Self::Float(_) => VariantTag::Float,
            Self::Bool(_) => VariantTag::Bool,
            Self::Struct(_) => VariantTag::Struct,
        }
    }

    /// Returns true if this value is nil.
    #[must_use]
    pub const fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Attempts to extract an identity.
    #[must_use]
    pub fn as_identity(&self) -> Option<&Identity> {
        match self {
            Self::Identity(id) => Some(id),
            _ => None,
        }
    }

    /// Attempts to extract a string reference.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Attempts to extract an integer value.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to extract an unsigned integer value.
    #[must_use]
    pub const fn as_uint(&self) -> Option<u64> {
        match self {
            Self::Uint(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to extract a float value.
    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to extract a boolean value.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to extract a struct reference.
    #[must_use]
    pub const fn as_struct(&self) -> Option<&StructRef> {
        match self {
            Self::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// Attempts to view a struct value's record as a concrete type.
    #[must_use]
    pub fn downcast_record<T: Record>(&self) -> Option<&T> {
        self.as_struct().and_then(StructRef::downcast_ref)
    }

    /// Attempts to read this value as an `f64` (numeric variants only).
    ///
    /// Converting large integers loses precision; this is deliberate and
    /// only used for cross-numeric `Less` tests.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Uint(n) => Some(*n as f64),
            Self::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Reads a field of this value.
    ///
    /// Scalars expose themselves under [`FIELD_SELF`] and nothing else.
    /// Struct values reflect on the underlying record. [`FIELD_ID`] is
    /// owned by the engine and always fails here.
    ///
    /// # Errors
    /// Returns [`ErrorKind::FieldNotFound`](crate::ErrorKind::FieldNotFound)
    /// when the field does not exist.
    pub fn get_field(&self, name: &str) -> Result<Value> {
        if name == FIELD_SELF {
            return Ok(self.clone());
        }
        match self {
            Self::Struct(s) => s
                .record()
                .field(name)
                .ok_or_else(|| Error::field_not_found(name)),
            _ => Err(Error::field_not_found(name)),
        }
    }

    /// Returns true if this value has the named field.
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        if name == FIELD_SELF {
            return true;
        }
        match self {
            Self::Struct(s) => s.record().has_field(name),
            _ => false,
        }
    }

    /// Returns a stable content hash of this value.
    ///
    /// Equal values hash equal for the lifetime of the engine; struct
    /// values hash by record identity, matching their equality.
    #[must_use]
    pub fn hash_value(&self) -> u64 {
        let tag = hash_u64(self.variant() as u64);
        let payload = match self {
            Self::Nil => 0,
            Self::Identity(id) => id.hash_value(),
            Self::String(s) => hash_str(s),
            Self::Int(n) => hash_u64(*n as u64),
            Self::Uint(n) => hash_u64(*n),
            Self::Float(n) => hash_u64(n.to_bits()),
            Self::Bool(b) => hash_u64(u64::from(*b)),
            Self::Struct(s) => s.hash_value(),
        };
        mix64(tag, payload)
    }
}

// Struct values compare by record identity, floats by bit pattern, so that
// Eq stays reflexive and consistent with hashing.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Identity(a), Self::Identity(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Uint(a), Self::Uint(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Struct(a), Self::Struct(b)) => a.same_record(b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash_value().hash(state);
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "nil"),
            Self::Identity(id) => write!(f, "@{id}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Uint(n) => write!(f, "{n}u"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Struct(s) => write!(f, "{s:?}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            other => write!(f, "{other:?}"),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Nil
    }
}

// Convenience From implementations

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Self::Uint(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s.into())
    }
}

impl From<Identity> for Value {
    fn from(id: Identity) -> Self {
        Self::Identity(id)
    }
}

impl From<StructRef> for Value {
    fn from(s: StructRef) -> Self {
        Self::Struct(s)
    }
}

impl<T: Record> From<Arc<T>> for Value {
    fn from(record: Arc<T>) -> Self {
        Self::Struct(record.into())
    }
}

/// Operator applied by guards and join tests.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum TestOp {
    /// Value equality, defined on all variants.
    #[default]
    Equal,
    /// Numeric less-than, with cross-numeric promotion to float.
    Less,
}

impl TestOp {
    /// Applies this operator to two values.
    ///
    /// `Equal` never fails. `Less` compares same-variant numerics
    /// directly and mixed numerics through `f64` promotion.
    ///
    /// # Errors
    /// Returns [`ErrorKind::TypeMismatch`](crate::ErrorKind::TypeMismatch)
    /// when `Less` receives a non-numeric or otherwise incomparable pair.
    pub fn apply(self, lhs: &Value, rhs: &Value) -> Result<bool> {
        match self {
            Self::Equal => Ok(lhs == rhs),
            Self::Less => match (lhs, rhs) {
                (Value::Int(a), Value::Int(b)) => Ok(a < b),
                (Value::Uint(a), Value::Uint(b)) => Ok(a < b),
                (Value::Float(a), Value::Float(b)) => {
                    Ok(a.partial_cmp(b) == Some(Ordering::Less))
                }
                _ => match (lhs.as_number(), rhs.as_number()) {
                    (Some(a), Some(b)) => Ok(a.partial_cmp(&b) == Some(Ordering::Less)),
                    _ => Err(Error::type_mismatch(lhs.variant(), rhs.variant())),
                },
            },
        }
    }
}

impl fmt::Display for TestOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "="),
            Self::Less => write!(f, "<"),
        }
    }
}
