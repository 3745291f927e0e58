//! The `define-prdt` rule surface for Trellis.
//!
//! This crate provides:
//! - [`Lexer`] - Scanner producing spanned tokens
//! - [`parser`] - S-expression reader
//! - [`lower`] - Lowering to [`Production`](trellis_engine::Production)
//!   values
//!
//! Only the emitted `Production` shape is contractual; the surface exists
//! so rules can live in text:
//!
//! ```
//! let source = r#"
//!     (define-prdt find-bar
//!       (when (for-string foo (eq $$ "BAR")))
//!       #:desc "strings equal to BAR")
//! "#;
//! let productions = trellis_language::parse_productions(source).unwrap();
//! assert_eq!(productions[0].id, "find-bar");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod lexer;
pub mod lower;
pub mod parser;
pub mod token;

pub use lexer::Lexer;
pub use lower::lower;
pub use parser::{parse, SExpr};
pub use token::{Span, Token, TokenKind};

use trellis_engine::Production;
use trellis_foundation::Result;

/// Parses source text into productions ready for
/// [`Rete::add_production`](trellis_engine::Rete::add_production).
///
/// # Errors
/// Fails on scan, parse, or lowering errors, each carrying the source
/// line and column.
pub fn parse_productions(source: &str) -> Result<Vec<Production>> {
    lower(&parse(source)?)
}
