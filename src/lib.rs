//! Trellis - incremental production-rule matching over a changing set of
//! facts.
//!
//! This crate re-exports all layers of the Trellis system for convenient
//! access. For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: trellis_language   — define-prdt surface: lexer, parser,
//!                               lowering to Production values
//! Layer 1: trellis_engine     — discrimination network: alpha/beta
//!                               layers, node sharing, match extraction
//! Layer 0: trellis_foundation — core types (Value, Fact, TypeInfo, Error)
//! ```

pub use trellis_engine as engine;
pub use trellis_foundation as foundation;
pub use trellis_language as language;
