//! Core types, values, and hashing for Trellis.
//!
//! This crate provides:
//! - [`Value`] - The tagged value type facts are made of
//! - [`Identity`] - Cheap, by-name references between facts
//! - [`Record`] - The reflective accessor trait host structs implement
//! - [`Fact`] - An identified value in working memory
//! - [`TypeInfo`] - Type descriptors for alias declarations
//! - [`Error`] - Rich error types with categorized kinds
//! - Stable 64-bit content hashing ([`hash`])

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod fact;
pub mod hash;
pub mod types;
pub mod value;

// Re-export primary types at crate root for convenience
pub use error::{Error, ErrorKind};
pub use fact::Fact;
pub use types::{TypeInfo, VariantTag};
pub use value::{Identity, Record, StructRef, TestOp, Value, FIELD_ID, FIELD_SELF};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
