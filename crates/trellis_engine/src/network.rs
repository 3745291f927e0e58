//! The engine: owns both network layers and exposes the public API.
//!
//! All node graphs live in arenas on [`Rete`]; compilation
//! (`add_production`) builds or shares nodes top-down, and every newly
//! created stateful node catches up with the matches it would have seen
//! had it always existed.

use std::collections::HashMap;

use slab::Slab;
use tracing::debug;
use trellis_foundation::{Error, Fact, Identity, Result, Value};

use crate::alpha::{AlphaMemory, AlphaNode, AlphaTest, Wme};
use crate::beta::{
    ArgSource, BetaNode, BetaNodeKind, CompiledTest, JoinArg, NegativeJoinResult, Token,
};
use crate::node::{AlphaMemId, AlphaNodeId, BetaNodeId, TokenId, WmeId};
use crate::production::{JoinTest, Production};

/// A handle to a compiled production.
///
/// Handles are cheap to clone and stay valid until the production is
/// removed; match extraction goes through [`Rete::matches`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductionHandle {
    pub(crate) id: String,
    pub(crate) node: BetaNodeId,
}

impl ProductionHandle {
    /// The production id this handle refers to.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// The incremental match engine.
///
/// Owns the alpha discrimination tree, the beta network, working memory,
/// and every token. Single-threaded by design: callers wanting
/// concurrency serialize externally.
pub struct Rete {
    pub(crate) alpha_nodes: Slab<AlphaNode>,
    pub(crate) alpha_mems: Slab<AlphaMemory>,
    /// Alpha memories by composite (type info, guard chain) key.
    pub(crate) alpha_mem_index: HashMap<u64, AlphaMemId>,
    pub(crate) wmes: Slab<Wme>,
    /// Live facts by fact hash.
    pub(crate) working_memory: HashMap<u64, WmeId>,
    pub(crate) beta_nodes: Slab<BetaNode>,
    pub(crate) tokens: Slab<Token>,
    pub(crate) join_results: Slab<NegativeJoinResult>,
    pub(crate) alpha_root: AlphaNodeId,
    /// The dummy top beta memory.
    pub(crate) top: BetaNodeId,
    pub(crate) productions: HashMap<String, BetaNodeId>,
}

impl Default for Rete {
    fn default() -> Self {
        Self::new()
    }
}

impl Rete {
    /// Creates an empty engine.
    #[must_use]
    pub fn new() -> Self {
        let mut alpha_nodes = Slab::new();
        let alpha_root = AlphaNodeId(alpha_nodes.insert(AlphaNode {
            test: AlphaTest::Root,
            key: 0,
            parent: None,
            children: HashMap::new(),
            negative_child: None,
            output: None,
        }));

        let mut beta_nodes = Slab::new();
        let top = BetaNodeId(beta_nodes.insert(BetaNode {
            kind: BetaNodeKind::Memory {
                items: std::collections::HashSet::new(),
            },
            parent: None,
            children: Vec::new(),
        }));

        let mut rete = Self {
            alpha_nodes,
            alpha_mems: Slab::new(),
            alpha_mem_index: HashMap::new(),
            wmes: Slab::new(),
            working_memory: HashMap::new(),
            beta_nodes,
            tokens: Slab::new(),
            join_results: Slab::new(),
            alpha_root,
            top,
            productions: HashMap::new(),
        };

        // The dummy token lets the very first join left-activate uniformly.
        let dummy = rete.new_token(top, None, None);
        let BetaNodeKind::Memory { items } = &mut rete.beta_nodes[top.0].kind else {
            unreachable!();
        };
        items.insert(dummy);
        rete
    }

    /// Number of facts currently in working memory.
    #[must_use]
    pub fn fact_count(&self) -> usize {
        self.working_memory.len()
    }

    /// Number of compiled productions.
    #[must_use]
    pub fn production_count(&self) -> usize {
        self.productions.len()
    }

    /// True when the beta network holds nothing but the dummy top node.
    #[must_use]
    pub fn beta_is_empty(&self) -> bool {
        self.beta_nodes.len() == 1 && self.beta_nodes[self.top.0].children.is_empty()
    }

    /// Number of alpha memories currently built. Two productions with a
    /// common condition share one.
    #[must_use]
    pub fn alpha_memory_count(&self) -> usize {
        self.alpha_mems.len()
    }

    /// Number of beta nodes, the dummy top node included.
    #[must_use]
    pub fn beta_node_count(&self) -> usize {
        self.beta_nodes.len()
    }

    /// Inserts a fact, propagating new matches through the network.
    ///
    /// Idempotent on the fact's content hash; inserting a fact that is
    /// already present re-routes the existing element through the alpha
    /// network, which is a no-op for every memory it already populates.
    pub fn add_fact(&mut self, fact: Fact) {
        let key = fact.hash_value();
        if let Some(&wme) = self.working_memory.get(&key) {
            debug!(id = %self.wmes[wme.0].fact.id, "re-activating duplicate fact");
            self.activate_alpha_node(self.alpha_root, wme);
            return;
        }
        debug!(id = %fact.id, "adding fact");
        let wme = WmeId(self.wmes.insert(Wme::new(fact, key)));
        self.working_memory.insert(key, wme);
        self.activate_alpha_node(self.alpha_root, wme);
    }

    /// Removes a fact, retracting every match its element supported.
    /// A no-op when the fact is absent.
    pub fn remove_fact(&mut self, fact: &Fact) {
        let key = fact.hash_value();
        let Some(wme) = self.working_memory.remove(&key) else {
            return;
        };
        debug!(id = %fact.id, "removing fact");
        self.remove_wme(wme);
    }

    /// Destroys a WME: tokens first, then memberships, then negative
    /// join results (re-propagating owners that lost their last result).
    fn remove_wme(&mut self, wme: WmeId) {
        let touched: Vec<TokenId> = self.wmes[wme.0].tokens.iter().copied().collect();
        for token in touched {
            self.destroy_token(token);
        }

        let memberships: Vec<AlphaMemId> = self.wmes[wme.0].alpha_mems.drain().collect();
        for mem in memberships {
            self.alpha_mems[mem.0].wmes.remove(&wme);
        }

        let results: Vec<_> = self.wmes[wme.0].join_results.drain().collect();
        let mut unblocked = Vec::new();
        for result in results {
            if !self.join_results.contains(result.0) {
                continue;
            }
            let owner = self.join_results.remove(result.0).owner;
            self.tokens[owner.0].join_results.remove(&result);
            if self.tokens[owner.0].join_results.is_empty() {
                unblocked.push(owner);
            }
        }
        for owner in unblocked {
            if !self.tokens.contains(owner.0) {
                continue;
            }
            let node = self.tokens[owner.0].node;
            for child in self.children_newest_first(node) {
                self.left_activate(child, owner, None);
            }
        }

        self.wmes.remove(wme.0);
    }

    /// Compiles a production into the network, sharing nodes wherever the
    /// structure allows. Idempotent on the production id.
    ///
    /// # Errors
    /// Fails with the validation errors documented on
    /// [`Production::validate`]; a failed call leaves the network
    /// untouched.
    pub fn add_production(&mut self, production: Production) -> Result<ProductionHandle> {
        if let Some(&node) = self.productions.get(&production.id) {
            return Ok(ProductionHandle {
                id: production.id,
                node,
            });
        }
        production.validate()?;

        let order: HashMap<&str, u32> = production
            .aliases
            .iter()
            .enumerate()
            .map(|(index, decl)| (decl.alias.as_str(), index as u32))
            .collect();
        let compiled: Vec<(CompiledTest, Option<u32>)> = production
            .join_tests
            .iter()
            .map(|test| compile_join_test(test, &order))
            .collect::<Result<_>>()?;

        debug!(id = %production.id, "compiling production");
        let mut current = self.top;
        let mut alias_mems = Vec::with_capacity(production.aliases.len());
        for decl in &production.aliases {
            current = self.build_or_share_beta_mem(current);
            let mem = self.make_alpha_mem(&decl.type_info, &decl.guards, decl.memory_key());
            current = self.build_or_share_join_node(current, Some(mem), Vec::new());
            alias_mems.push(mem);
        }

        for (test, subject) in compiled {
            current = self.build_or_share_beta_mem(current);
            current = match subject {
                Some(subject_offset) => {
                    let mem = alias_mems[subject_offset as usize];
                    self.build_or_share_negative_node(current, mem, vec![test])
                }
                None => self.build_or_share_join_node(current, None, vec![test]),
            };
        }

        current = self.build_or_share_beta_mem(current);
        let aliases: Vec<Identity> = production
            .aliases
            .iter()
            .map(|decl| decl.alias.clone())
            .collect();
        let pnode = BetaNodeId(self.beta_nodes.insert(BetaNode {
            kind: BetaNodeKind::Production {
                items: std::collections::HashSet::new(),
                aliases,
                id: production.id.clone(),
            },
            parent: Some(current),
            children: Vec::new(),
        }));
        self.beta_nodes[current.0].children.push(pnode);
        self.update_new_node(pnode);

        self.productions.insert(production.id.clone(), pnode);
        Ok(ProductionHandle {
            id: production.id,
            node: pnode,
        })
    }

    /// Looks up a compiled production by id.
    #[must_use]
    pub fn get_production(&self, id: &str) -> Option<ProductionHandle> {
        self.productions.get(id).map(|&node| ProductionHandle {
            id: id.to_string(),
            node,
        })
    }

    /// Removes a production, tearing down every node no other production
    /// shares.
    ///
    /// # Errors
    /// Fails with `ProductionNotFound` when no production has the id; the
    /// engine is unchanged in that case.
    pub fn remove_production(&mut self, id: &str) -> Result<()> {
        let Some(node) = self.productions.remove(id) else {
            return Err(Error::production_not_found(id));
        };
        debug!(id, "removing production");
        self.delete_node_and_unused_ancestors(node);
        Ok(())
    }

    /// True when the production currently has at least one full match.
    #[must_use]
    pub fn any_matches(&self, handle: &ProductionHandle) -> bool {
        let Some(node) = self.live_production(handle) else {
            return false;
        };
        let BetaNodeKind::Production { items, .. } = &self.beta_nodes[node.0].kind else {
            return false;
        };
        !items.is_empty()
    }

    /// Returns every current match as a map from alias to the bound
    /// fact's value. Iteration order is unspecified.
    #[must_use]
    pub fn matches(&self, handle: &ProductionHandle) -> Vec<HashMap<Identity, Value>> {
        let Some(node) = self.live_production(handle) else {
            return Vec::new();
        };
        let BetaNodeKind::Production { items, aliases, .. } = &self.beta_nodes[node.0].kind
        else {
            return Vec::new();
        };

        let mut out = Vec::with_capacity(items.len());
        for &token in items {
            let mut binding = HashMap::with_capacity(aliases.len());
            for (index, alias) in aliases.iter().enumerate() {
                let Some(wme) = self.wme_at_level(token, index as u32 + 1) else {
                    continue;
                };
                binding.insert(alias.clone(), self.wmes[wme.0].fact.value.clone());
            }
            out.push(binding);
        }
        out
    }

    fn live_production(&self, handle: &ProductionHandle) -> Option<BetaNodeId> {
        (self.productions.get(&handle.id) == Some(&handle.node)).then_some(handle.node)
    }

    /// Returns the parent's beta-memory output, building one if needed.
    ///
    /// A parent exposes at most one beta memory child; the top node is
    /// its own memory.
    fn build_or_share_beta_mem(&mut self, parent: BetaNodeId) -> BetaNodeId {
        match &self.beta_nodes[parent.0].kind {
            BetaNodeKind::Memory { .. } => return parent,
            BetaNodeKind::Join {
                out_mem: Some(mem), ..
            } => return *mem,
            _ => {}
        }
        for &child in &self.beta_nodes[parent.0].children {
            if matches!(self.beta_nodes[child.0].kind, BetaNodeKind::Memory { .. }) {
                return child;
            }
        }

        let mem = BetaNodeId(self.beta_nodes.insert(BetaNode {
            kind: BetaNodeKind::Memory {
                items: std::collections::HashSet::new(),
            },
            parent: Some(parent),
            children: Vec::new(),
        }));
        self.beta_nodes[parent.0].children.push(mem);
        if let BetaNodeKind::Join { out_mem, .. } = &mut self.beta_nodes[parent.0].kind {
            *out_mem = Some(mem);
        }
        self.update_new_node(mem);
        mem
    }

    /// Builds or shares a join node under a beta memory, matching on the
    /// (alpha memory, test set) pair.
    fn build_or_share_join_node(
        &mut self,
        parent: BetaNodeId,
        alpha_mem: Option<AlphaMemId>,
        tests: Vec<CompiledTest>,
    ) -> BetaNodeId {
        for &child in &self.beta_nodes[parent.0].children {
            if let BetaNodeKind::Join {
                alpha_mem: mem,
                tests: existing,
                ..
            } = &self.beta_nodes[child.0].kind
            {
                if *mem == alpha_mem && *existing == tests {
                    return child;
                }
            }
        }

        let node = BetaNodeId(self.beta_nodes.insert(BetaNode {
            kind: BetaNodeKind::Join {
                alpha_mem,
                tests,
                out_mem: None,
            },
            parent: Some(parent),
            children: Vec::new(),
        }));
        self.beta_nodes[parent.0].children.push(node);
        if let Some(mem) = alpha_mem {
            self.alpha_mems[mem.0].successors.push(node);
        }
        node
    }

    /// Builds or shares a negative node under a beta memory.
    fn build_or_share_negative_node(
        &mut self,
        parent: BetaNodeId,
        alpha_mem: AlphaMemId,
        tests: Vec<CompiledTest>,
    ) -> BetaNodeId {
        for &child in &self.beta_nodes[parent.0].children {
            if let BetaNodeKind::Negative {
                alpha_mem: mem,
                tests: existing,
                ..
            } = &self.beta_nodes[child.0].kind
            {
                if *mem == alpha_mem && *existing == tests {
                    return child;
                }
            }
        }

        let node = BetaNodeId(self.beta_nodes.insert(BetaNode {
            kind: BetaNodeKind::Negative {
                alpha_mem,
                tests,
                items: std::collections::HashSet::new(),
            },
            parent: Some(parent),
            children: Vec::new(),
        }));
        self.beta_nodes[parent.0].children.push(node);
        self.alpha_mems[alpha_mem.0].successors.push(node);
        self.update_new_node(node);
        node
    }

    /// Catches a freshly attached node up with the matches it would have
    /// seen had it always been there.
    ///
    /// A memory parent replays its tokens. A join parent replays its
    /// alpha memory (or, for a pure filter, its own parent memory's
    /// tokens) through a temporarily cleared child slot, so no sibling is
    /// re-notified. A negative parent replays its unblocked owners.
    fn update_new_node(&mut self, node: BetaNodeId) {
        let parent = self.beta_nodes[node.0]
            .parent
            .expect("fresh beta nodes are attached below the top");

        enum Replay {
            Tokens(Vec<TokenId>),
            ThroughJoin(Option<AlphaMemId>),
        }

        let plan = match &self.beta_nodes[parent.0].kind {
            BetaNodeKind::Memory { items } => Replay::Tokens(items.iter().copied().collect()),
            BetaNodeKind::Join { alpha_mem, .. } => Replay::ThroughJoin(*alpha_mem),
            BetaNodeKind::Negative { items, .. } => Replay::Tokens(
                items
                    .iter()
                    .copied()
                    .filter(|t| self.tokens[t.0].join_results.is_empty())
                    .collect(),
            ),
            BetaNodeKind::Production { .. } => {
                unreachable!("production nodes are leaves")
            }
        };

        match plan {
            Replay::Tokens(tokens) => {
                for token in tokens {
                    self.left_activate(node, token, None);
                }
            }
            Replay::ThroughJoin(alpha_mem) => {
                let saved = std::mem::take(&mut self.beta_nodes[parent.0].children);
                self.beta_nodes[parent.0].children = vec![node];
                match alpha_mem {
                    Some(mem) => {
                        let wmes: Vec<WmeId> =
                            self.alpha_mems[mem.0].wmes.iter().copied().collect();
                        for wme in wmes {
                            self.right_activate(parent, wme);
                        }
                    }
                    None => {
                        // A filter join is stateless; replay the tokens
                        // of the memory above it.
                        let above = self.beta_nodes[parent.0]
                            .parent
                            .expect("join nodes sit below a memory");
                        if let BetaNodeKind::Memory { items } = &self.beta_nodes[above.0].kind {
                            let tokens: Vec<TokenId> = items.iter().copied().collect();
                            for token in tokens {
                                self.left_activate(parent, token, None);
                            }
                        }
                    }
                }
                self.beta_nodes[parent.0].children = saved;
            }
        }
    }

    /// Detaches a beta node and recursively deletes ancestors left with
    /// no children. The top node always survives.
    fn delete_node_and_unused_ancestors(&mut self, node: BetaNodeId) {
        let (tokens, alpha_mem): (Vec<TokenId>, Option<AlphaMemId>) =
            match &self.beta_nodes[node.0].kind {
                BetaNodeKind::Memory { items } | BetaNodeKind::Production { items, .. } => {
                    (items.iter().copied().collect(), None)
                }
                BetaNodeKind::Negative {
                    items, alpha_mem, ..
                } => (items.iter().copied().collect(), Some(*alpha_mem)),
                BetaNodeKind::Join { alpha_mem, .. } => (Vec::new(), *alpha_mem),
            };

        for token in tokens {
            self.destroy_token(token);
        }
        if let Some(mem) = alpha_mem {
            self.alpha_mems[mem.0].successors.retain(|&s| s != node);
            if self.alpha_mems[mem.0].successors.is_empty() {
                self.destroy_alpha_memory(mem);
            }
        }

        let parent = self.beta_nodes[node.0].parent;
        self.beta_nodes.remove(node.0);

        if let Some(p) = parent {
            self.beta_nodes[p.0].children.retain(|&c| c != node);
            if let BetaNodeKind::Join { out_mem, .. } = &mut self.beta_nodes[p.0].kind {
                if *out_mem == Some(node) {
                    *out_mem = None;
                }
            }
            if self.beta_nodes[p.0].children.is_empty() && p != self.top {
                self.delete_node_and_unused_ancestors(p);
            }
        }
    }
}

/// Resolves a join test's selectors against the production's alias order.
///
/// For a negated test the final selector is the subject: its alias's
/// alpha memory feeds the negative node and its attribute is read from
/// each candidate WME instead of the token chain.
fn compile_join_test(
    test: &JoinTest,
    order: &HashMap<&str, u32>,
) -> Result<(CompiledTest, Option<u32>)> {
    let last = test.selectors.len() - 1;
    let mut args = Vec::with_capacity(test.selectors.len());
    let mut subject = None;
    for (index, selector) in test.selectors.iter().enumerate() {
        let offset = *order
            .get(selector.alias.as_str())
            .ok_or_else(|| Error::unguarded_alias(selector.alias.as_str()))?;
        let source = if test.negative && index == last {
            subject = Some(offset);
            ArgSource::Candidate
        } else {
            ArgSource::Chain(offset)
        };
        args.push(JoinArg {
            source,
            attr: selector.attr.clone(),
        });
    }
    Ok((CompiledTest { args, op: test.op }, subject))
}
