//! The beta network: tokens, beta memories, join nodes, negative nodes,
//! and production nodes.
//!
//! Tokens are immutable chains of WMEs; a token exists iff its whole
//! chain still passes every test from the dummy top memory down to the
//! node that stores it. Destruction is depth-first: descendants go before
//! the token itself.

use std::collections::HashSet;

use tracing::{trace, warn};
use trellis_foundation::{ErrorKind, Identity, TestOp};

use crate::node::{AlphaMemId, BetaNodeId, JoinResultId, TokenId, WmeId};
use crate::Rete;

/// Where a compiled join argument reads its value from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ArgSource {
    /// The WME bound at this alias offset in the token chain
    /// (offset 0 = first alias).
    Chain(u32),
    /// The candidate WME under test (alpha-memory side of the node).
    Candidate,
}

/// One argument of a compiled join test.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct JoinArg {
    pub(crate) source: ArgSource,
    pub(crate) attr: String,
}

/// A join test compiled against a production's alias order.
///
/// Selected values are compared pairwise, left to right. A failed field
/// read or an incomparable pair fails the test; it never aborts the
/// activation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct CompiledTest {
    pub(crate) args: Vec<JoinArg>,
    pub(crate) op: TestOp,
}

/// A record that `wme` supports the positive form of a negative node's
/// test against `owner`'s chain. Owners propagate iff they hold none.
#[derive(Debug)]
pub(crate) struct NegativeJoinResult {
    pub(crate) owner: TokenId,
    pub(crate) wme: WmeId,
}

/// A node in the beta network.
#[derive(Debug)]
pub(crate) struct BetaNode {
    pub(crate) kind: BetaNodeKind,
    pub(crate) parent: Option<BetaNodeId>,
    /// Ordered children; activation walks them newest-first.
    pub(crate) children: Vec<BetaNodeId>,
}

/// The four beta node kinds.
#[derive(Debug)]
pub(crate) enum BetaNodeKind {
    /// Set of tokens; the top node is a memory holding the dummy token.
    Memory { items: HashSet<TokenId> },
    /// Combines parent-memory tokens with alpha-memory WMEs. With no
    /// alpha memory the node is a pure filter over the token chain.
    Join {
        alpha_mem: Option<AlphaMemId>,
        tests: Vec<CompiledTest>,
        /// Cached beta-memory child for fast sharing lookup.
        out_mem: Option<BetaNodeId>,
    },
    /// Propagates a token iff no WME in the alpha memory passes the
    /// tests against it.
    Negative {
        alpha_mem: AlphaMemId,
        tests: Vec<CompiledTest>,
        items: HashSet<TokenId>,
    },
    /// Terminal accumulator for one production.
    Production {
        items: HashSet<TokenId>,
        aliases: Vec<Identity>,
        id: String,
    },
}

/// An immutable chain node over WMEs.
#[derive(Debug)]
pub(crate) struct Token {
    pub(crate) parent: Option<TokenId>,
    /// `None` on the dummy token and on pass-through extensions.
    pub(crate) wme: Option<WmeId>,
    /// 0 at the dummy token, `parent.level + 1` otherwise.
    pub(crate) level: u32,
    /// The beta node that stores this token.
    pub(crate) node: BetaNodeId,
    pub(crate) children: HashSet<TokenId>,
    /// Negative join results owned by this token.
    pub(crate) join_results: HashSet<JoinResultId>,
}

impl Rete {
    /// Creates a token, wiring the parent and WME back-references.
    pub(crate) fn new_token(
        &mut self,
        node: BetaNodeId,
        parent: Option<TokenId>,
        wme: Option<WmeId>,
    ) -> TokenId {
        let level = parent.map_or(0, |p| self.tokens[p.0].level + 1);
        let token = TokenId(self.tokens.insert(Token {
            parent,
            wme,
            level,
            node,
            children: HashSet::new(),
            join_results: HashSet::new(),
        }));
        if let Some(p) = parent {
            self.tokens[p.0].children.insert(token);
        }
        if let Some(w) = wme {
            self.wmes[w.0].tokens.insert(token);
        }
        token
    }

    /// Walks a token's chain up to the WME bound at the given level.
    ///
    /// Alias `k` of a production is bound at level `k + 1`; levels past
    /// the alias prefix may be pass-through and carry no WME.
    pub(crate) fn wme_at_level(&self, token: TokenId, level: u32) -> Option<WmeId> {
        let mut current = token;
        while self.tokens[current.0].level > level {
            current = self.tokens[current.0].parent?;
        }
        if self.tokens[current.0].level == level {
            self.tokens[current.0].wme
        } else {
            None
        }
    }

    /// Evaluates compiled join tests for a token chain and an optional
    /// candidate WME.
    pub(crate) fn eval_tests(
        &self,
        tests: &[CompiledTest],
        token: TokenId,
        candidate: Option<WmeId>,
    ) -> bool {
        for test in tests {
            let mut values = Vec::with_capacity(test.args.len());
            for arg in &test.args {
                let wme = match arg.source {
                    ArgSource::Chain(offset) => {
                        let Some(w) = self.wme_at_level(token, offset + 1) else {
                            return false;
                        };
                        w
                    }
                    ArgSource::Candidate => {
                        let Some(w) = candidate else {
                            return false;
                        };
                        w
                    }
                };
                match self.wmes[wme.0].get_field(&arg.attr) {
                    Ok(value) => values.push(value),
                    Err(err) if matches!(err.kind, ErrorKind::FieldNotFound { .. }) => {
                        return false;
                    }
                    Err(err) => {
                        warn!(%err, "join test field read failed");
                        return false;
                    }
                }
            }
            for pair in values.windows(2) {
                match test.op.apply(&pair[0], &pair[1]) {
                    Ok(true) => {}
                    Ok(false) => return false,
                    Err(err) => {
                        warn!(%err, "join test on incomparable operands");
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Notifies a beta node that a WME arrived in its alpha memory.
    pub(crate) fn right_activate(&mut self, node: BetaNodeId, wme: WmeId) {
        match &self.beta_nodes[node.0].kind {
            BetaNodeKind::Join { tests, .. } => {
                let tests = tests.clone();
                let parent = self.beta_nodes[node.0]
                    .parent
                    .expect("join node has a memory parent");
                let BetaNodeKind::Memory { items } = &self.beta_nodes[parent.0].kind else {
                    unreachable!("join node parent is a beta memory");
                };
                let tokens: Vec<TokenId> = items.iter().copied().collect();
                for token in tokens {
                    if self.eval_tests(&tests, token, Some(wme)) {
                        let children = self.children_newest_first(node);
                        for child in children {
                            self.left_activate(child, token, Some(wme));
                        }
                    }
                }
            }
            BetaNodeKind::Negative { tests, items, .. } => {
                let tests = tests.clone();
                let owners: Vec<TokenId> = items.iter().copied().collect();
                for owner in owners {
                    if !self.tokens.contains(owner.0) {
                        continue;
                    }
                    if self.eval_tests(&tests, owner, Some(wme)) {
                        let first = self.tokens[owner.0].join_results.is_empty();
                        self.add_join_result(owner, wme);
                        if first {
                            trace!(?owner, "negative support arrived; pruning descendants");
                            self.destroy_token_descendants(owner);
                        }
                    }
                }
            }
            BetaNodeKind::Memory { .. } | BetaNodeKind::Production { .. } => {
                unreachable!("only join and negative nodes receive right activations");
            }
        }
    }

    /// Notifies a beta node of a token arriving from above.
    ///
    /// Memories and production nodes extend the chain with `wme` (which
    /// is `None` on pass-through propagation); join and negative nodes
    /// evaluate their tests.
    pub(crate) fn left_activate(
        &mut self,
        node: BetaNodeId,
        parent_token: TokenId,
        wme: Option<WmeId>,
    ) {
        match &self.beta_nodes[node.0].kind {
            BetaNodeKind::Memory { .. } => {
                let token = self.new_token(node, Some(parent_token), wme);
                let BetaNodeKind::Memory { items } = &mut self.beta_nodes[node.0].kind else {
                    unreachable!();
                };
                items.insert(token);
                let children = self.children_newest_first(node);
                for child in children {
                    self.left_activate(child, token, None);
                }
            }
            BetaNodeKind::Join {
                alpha_mem, tests, ..
            } => {
                let tests = tests.clone();
                match *alpha_mem {
                    Some(mem) => {
                        let candidates: Vec<WmeId> =
                            self.alpha_mems[mem.0].wmes.iter().copied().collect();
                        for candidate in candidates {
                            if self.eval_tests(&tests, parent_token, Some(candidate)) {
                                let children = self.children_newest_first(node);
                                for child in children {
                                    self.left_activate(child, parent_token, Some(candidate));
                                }
                            }
                        }
                    }
                    None => {
                        // Pure cross-alias filter: test the chain alone.
                        if self.eval_tests(&tests, parent_token, None) {
                            let children = self.children_newest_first(node);
                            for child in children {
                                self.left_activate(child, parent_token, None);
                            }
                        }
                    }
                }
            }
            BetaNodeKind::Negative {
                alpha_mem, tests, ..
            } => {
                let mem = *alpha_mem;
                let tests = tests.clone();
                let owner = self.new_token(node, Some(parent_token), wme);
                let BetaNodeKind::Negative { items, .. } = &mut self.beta_nodes[node.0].kind
                else {
                    unreachable!();
                };
                items.insert(owner);

                let candidates: Vec<WmeId> =
                    self.alpha_mems[mem.0].wmes.iter().copied().collect();
                for candidate in candidates {
                    if self.eval_tests(&tests, owner, Some(candidate)) {
                        self.add_join_result(owner, candidate);
                    }
                }
                if self.tokens[owner.0].join_results.is_empty() {
                    let children = self.children_newest_first(node);
                    for child in children {
                        self.left_activate(child, owner, None);
                    }
                }
            }
            BetaNodeKind::Production { .. } => {
                let token = self.new_token(node, Some(parent_token), wme);
                let BetaNodeKind::Production { items, id, .. } =
                    &mut self.beta_nodes[node.0].kind
                else {
                    unreachable!();
                };
                items.insert(token);
                trace!(production = %id, "complete match");
            }
        }
    }

    /// Snapshot of a node's children in activation order (newest first).
    pub(crate) fn children_newest_first(&self, node: BetaNodeId) -> Vec<BetaNodeId> {
        self.beta_nodes[node.0]
            .children
            .iter()
            .rev()
            .copied()
            .collect()
    }

    fn add_join_result(&mut self, owner: TokenId, wme: WmeId) {
        let result = JoinResultId(self.join_results.insert(NegativeJoinResult { owner, wme }));
        self.tokens[owner.0].join_results.insert(result);
        self.wmes[wme.0].join_results.insert(result);
    }

    /// Destroys a token: descendants first, then every membership and
    /// back-reference, then its owned negative join results.
    pub(crate) fn destroy_token(&mut self, token: TokenId) {
        if !self.tokens.contains(token.0) {
            return;
        }
        self.destroy_token_descendants(token);

        let node = self.tokens[token.0].node;
        if self.beta_nodes.contains(node.0) {
            match &mut self.beta_nodes[node.0].kind {
                BetaNodeKind::Memory { items }
                | BetaNodeKind::Negative { items, .. }
                | BetaNodeKind::Production { items, .. } => {
                    items.remove(&token);
                }
                BetaNodeKind::Join { .. } => {}
            }
        }

        if let Some(wme) = self.tokens[token.0].wme {
            if self.wmes.contains(wme.0) {
                self.wmes[wme.0].tokens.remove(&token);
            }
        }
        if let Some(parent) = self.tokens[token.0].parent {
            if self.tokens.contains(parent.0) {
                self.tokens[parent.0].children.remove(&token);
            }
        }

        let owned: Vec<JoinResultId> = self.tokens[token.0].join_results.drain().collect();
        for result in owned {
            let wme = self.join_results[result.0].wme;
            if self.wmes.contains(wme.0) {
                self.wmes[wme.0].join_results.remove(&result);
            }
            self.join_results.remove(result.0);
        }

        self.tokens.remove(token.0);
    }

    /// Destroys a token's descendants but keeps the token itself; used
    /// when a negative node gains its first join result.
    pub(crate) fn destroy_token_descendants(&mut self, token: TokenId) {
        let children: Vec<TokenId> = self.tokens[token.0].children.iter().copied().collect();
        for child in children {
            self.destroy_token(child);
        }
    }
}
