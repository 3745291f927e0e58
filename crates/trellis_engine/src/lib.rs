//! The Trellis discrimination network.
//!
//! This crate provides:
//! - [`Rete`] - The incremental match engine owning both network layers
//! - [`Production`] - The rule IR: typed, guarded aliases plus join tests
//! - [`ProductionHandle`] - Access to a compiled production's matches
//!
//! Facts flow through a shared alpha tree of type and constant tests into
//! alpha memories; join and negative nodes combine surviving facts into
//! token chains; production nodes collect complete matches. Adding or
//! removing a fact costs time proportional to the change it causes, not
//! to the size of the rule or fact base.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod alpha;
mod beta;
mod network;
mod node;
pub mod production;

#[cfg(test)]
pub(crate) mod testutil;

pub use network::{ProductionHandle, Rete};
pub use production::{AliasDeclaration, Guard, JoinTest, Production, Selector};
