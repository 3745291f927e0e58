//! Error types for the Trellis system.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.

use thiserror::Error;

use crate::types::VariantTag;

/// The main error type for Trellis operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind }
    }

    /// Creates a field-not-found error.
    #[must_use]
    pub fn field_not_found(field: impl Into<String>) -> Self {
        Self::new(ErrorKind::FieldNotFound {
            field: field.into(),
        })
    }

    /// Creates a type mismatch error.
    #[must_use]
    pub fn type_mismatch(expected: VariantTag, actual: VariantTag) -> Self {
        Self::new(ErrorKind::TypeMismatch { expected, actual })
    }

    /// Creates an invalid type info error.
    #[must_use]
    pub fn invalid_type_info(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidTypeInfo {
            reason: reason.into(),
        })
    }

    /// Creates an invalid guard error.
    #[must_use]
    pub fn invalid_guard(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidGuard {
            reason: reason.into(),
        })
    }

    /// Creates an invalid join test error.
    #[must_use]
    pub fn invalid_join_test(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidJoinTest {
            reason: reason.into(),
        })
    }

    /// Creates an unguarded alias error.
    #[must_use]
    pub fn unguarded_alias(alias: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnguardedAlias {
            alias: alias.into(),
        })
    }

    /// Creates a duplicate alias error.
    #[must_use]
    pub fn duplicate_alias(alias: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicateAlias {
            alias: alias.into(),
        })
    }

    /// Creates an unsupported negation error.
    #[must_use]
    pub fn unsupported_negation(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::NegationOnUnsupportedNode {
            reason: reason.into(),
        })
    }

    /// Creates a production-not-found error.
    #[must_use]
    pub fn production_not_found(id: impl Into<String>) -> Self {
        Self::new(ErrorKind::ProductionNotFound { id: id.into() })
    }

    /// Creates a parse error.
    #[must_use]
    pub fn parse(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self::new(ErrorKind::ParseError {
            message: message.into(),
            line,
            column,
        })
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal(message.into()))
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Field does not exist on a value.
    #[error("field not found: {field}")]
    FieldNotFound {
        /// The field name that was requested.
        field: String,
    },

    /// Incomparable operands reached a test.
    #[error("type mismatch: cannot compare {expected} with {actual}")]
    TypeMismatch {
        /// Variant of the left operand.
        expected: VariantTag,
        /// Variant of the right operand.
        actual: VariantTag,
    },

    /// An alias declaration carries an unusable type descriptor.
    #[error("invalid type info: {reason}")]
    InvalidTypeInfo {
        /// Why the descriptor was rejected.
        reason: String,
    },

    /// A guard carries an unusable value or attribute.
    #[error("invalid guard: {reason}")]
    InvalidGuard {
        /// Why the guard was rejected.
        reason: String,
    },

    /// A join test is malformed.
    #[error("invalid join test: {reason}")]
    InvalidJoinTest {
        /// Why the join test was rejected.
        reason: String,
    },

    /// A join test references an alias with no declaration.
    #[error("join test references undeclared alias: {alias}")]
    UnguardedAlias {
        /// The alias that was referenced.
        alias: String,
    },

    /// A production declares the same alias twice.
    #[error("duplicate alias in production: {alias}")]
    DuplicateAlias {
        /// The alias that was declared twice.
        alias: String,
    },

    /// Negation was requested where the network cannot express it.
    #[error("negation unsupported here: {reason}")]
    NegationOnUnsupportedNode {
        /// Why the negation could not be compiled.
        reason: String,
    },

    /// No production with the given id exists.
    #[error("production not found: {id}")]
    ProductionNotFound {
        /// The production id that was requested.
        id: String,
    },

    /// Parse error in the rule surface.
    #[error("parse error at {line}:{column}: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Line number (1-indexed).
        line: u32,
        /// Column number (1-indexed).
        column: u32,
    },

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}
