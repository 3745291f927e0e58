//! Typed handles into the engine's node arenas.
//!
//! Every graph the engine owns (alpha nodes, alpha memories, working
//! memory elements, beta nodes, tokens, negative join results) lives in a
//! slab arena on the engine; nodes refer to each other through these
//! copyable ids. Parents keep back-pointers for upward teardown only.

use std::fmt;

macro_rules! arena_id {
    ($(#[$doc:meta])* $name:ident, $tag:literal) => {
        $(#[$doc])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) usize);

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($tag, "({})"), self.0)
            }
        }
    };
}

arena_id!(
    /// Handle to a test node in the alpha network.
    AlphaNodeId,
    "AlphaNode"
);
arena_id!(
    /// Handle to an alpha memory.
    AlphaMemId,
    "AlphaMem"
);
arena_id!(
    /// Handle to a working-memory element.
    WmeId,
    "Wme"
);
arena_id!(
    /// Handle to a node in the beta network.
    BetaNodeId,
    "BetaNode"
);
arena_id!(
    /// Handle to a token.
    TokenId,
    "Token"
);
arena_id!(
    /// Handle to a negative join result.
    JoinResultId,
    "JoinResult"
);
