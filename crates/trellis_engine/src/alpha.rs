//! The alpha network: a shared discrimination tree of type tests and
//! constant tests routing working-memory elements into alpha memories.
//!
//! Nodes are shared across productions by content key. A negated guard
//! shares the positive guard's constant-test node and hangs a catch-all
//! child off it: the child's subtree fires exactly when the parent's test
//! rejects a WME.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace, warn};
use trellis_foundation::{Fact, Result, TestOp, TypeInfo, Value, FIELD_ID};

use crate::node::{AlphaMemId, AlphaNodeId, BetaNodeId, JoinResultId, TokenId, WmeId};
use crate::production::Guard;
use crate::Rete;

/// Test performed by one alpha node.
#[derive(Debug)]
pub(crate) enum AlphaTest {
    /// The universal root; passes everything.
    Root,
    /// Variant/shape/nominal test of the whole fact.
    Type(TypeInfo),
    /// Constant test of one attribute.
    Constant {
        /// Attribute read from the candidate WME.
        attr: String,
        /// Literal tested against.
        value: Value,
        /// Operator, attribute value on the left.
        op: TestOp,
    },
    /// Catch-all child of a constant node; fires on the parent's rejects.
    Negated,
}

/// One node in the discrimination tree.
#[derive(Debug)]
pub(crate) struct AlphaNode {
    pub(crate) test: AlphaTest,
    /// Content key this node is shared under (0 for the root).
    pub(crate) key: u64,
    pub(crate) parent: Option<AlphaNodeId>,
    /// Children keyed by their content key.
    pub(crate) children: HashMap<u64, AlphaNodeId>,
    /// Attached catch-all child; only ever set on constant nodes.
    pub(crate) negative_child: Option<AlphaNodeId>,
    /// Leaf output, if any.
    pub(crate) output: Option<AlphaMemId>,
}

impl AlphaNode {
    fn new(test: AlphaTest, key: u64, parent: Option<AlphaNodeId>) -> Self {
        Self {
            test,
            key,
            parent,
            children: HashMap::new(),
            negative_child: None,
            output: None,
        }
    }

    /// True when nothing below this node remains.
    fn is_dangling(&self) -> bool {
        self.children.is_empty() && self.negative_child.is_none() && self.output.is_none()
    }
}

/// Set of WMEs that survived one chain of tests, plus the beta-layer
/// successors fed from it.
#[derive(Debug)]
pub(crate) struct AlphaMemory {
    /// Composite key of the (type info, guard chain) this memory realizes.
    pub(crate) key: u64,
    /// The test node whose output this memory is.
    pub(crate) input: AlphaNodeId,
    pub(crate) wmes: HashSet<WmeId>,
    /// Ordered successors; activation walks them newest-first.
    pub(crate) successors: Vec<BetaNodeId>,
}

/// A fact inside the engine, carrying the back-references teardown needs.
#[derive(Debug)]
pub(crate) struct Wme {
    pub(crate) fact: Fact,
    /// The fact hash this WME is keyed under in working memory.
    pub(crate) key: u64,
    pub(crate) alpha_mems: HashSet<AlphaMemId>,
    /// Tokens whose chain passes through this WME.
    pub(crate) tokens: HashSet<TokenId>,
    /// Negative join results keyed by this WME.
    pub(crate) join_results: HashSet<JoinResultId>,
}

impl Wme {
    pub(crate) fn new(fact: Fact, key: u64) -> Self {
        Self {
            fact,
            key,
            alpha_mems: HashSet::new(),
            tokens: HashSet::new(),
            join_results: HashSet::new(),
        }
    }

    /// Reads an attribute, resolving `__ID__` to the fact's identity.
    pub(crate) fn get_field(&self, name: &str) -> Result<Value> {
        if name == FIELD_ID {
            return Ok(Value::Identity(self.fact.id.clone()));
        }
        self.fact.get_value(name)
    }
}

impl Rete {
    /// Builds or shares the alpha memory for one alias declaration and
    /// returns it seeded with the current working memory.
    pub(crate) fn make_alpha_mem(
        &mut self,
        type_info: &TypeInfo,
        guards: &[Guard],
        memory_key: u64,
    ) -> AlphaMemId {
        if let Some(&mem) = self.alpha_mem_index.get(&memory_key) {
            return mem;
        }

        let mut current = self.alpha_root;
        current = self.ensure_type_child(current, type_info);
        for guard in guards {
            current = self.ensure_constant_child(current, guard);
            if guard.negative {
                current = self.ensure_negative_child(current);
            }
        }

        if let Some(existing) = self.alpha_nodes[current.0].output {
            self.alpha_mem_index.insert(memory_key, existing);
            return existing;
        }

        let mem = AlphaMemId(self.alpha_mems.insert(AlphaMemory {
            key: memory_key,
            input: current,
            wmes: HashSet::new(),
            successors: Vec::new(),
        }));
        self.alpha_nodes[current.0].output = Some(mem);
        self.alpha_mem_index.insert(memory_key, mem);

        // Seed with every fact already in working memory.
        let live: Vec<WmeId> = self.working_memory.values().copied().collect();
        for wme in live {
            if self.alpha_chain_passes(current, wme) {
                self.alpha_mems[mem.0].wmes.insert(wme);
                self.wmes[wme.0].alpha_mems.insert(mem);
            }
        }

        debug!(mem = ?mem, "built alpha memory");
        mem
    }

    fn ensure_type_child(&mut self, parent: AlphaNodeId, type_info: &TypeInfo) -> AlphaNodeId {
        let key = type_info.hash_value();
        if let Some(&child) = self.alpha_nodes[parent.0].children.get(&key) {
            return child;
        }
        let child = AlphaNodeId(self.alpha_nodes.insert(AlphaNode::new(
            AlphaTest::Type(type_info.clone()),
            key,
            Some(parent),
        )));
        self.alpha_nodes[parent.0].children.insert(key, child);
        child
    }

    fn ensure_constant_child(&mut self, parent: AlphaNodeId, guard: &Guard) -> AlphaNodeId {
        let key = guard.node_key();
        if let Some(&child) = self.alpha_nodes[parent.0].children.get(&key) {
            return child;
        }
        let child = AlphaNodeId(self.alpha_nodes.insert(AlphaNode::new(
            AlphaTest::Constant {
                attr: guard.attr.clone(),
                value: guard.value.clone(),
                op: guard.op,
            },
            key,
            Some(parent),
        )));
        self.alpha_nodes[parent.0].children.insert(key, child);
        child
    }

    fn ensure_negative_child(&mut self, parent: AlphaNodeId) -> AlphaNodeId {
        if let Some(child) = self.alpha_nodes[parent.0].negative_child {
            return child;
        }
        let key = self.alpha_nodes[parent.0].key | (1 << 63);
        let child = AlphaNodeId(self.alpha_nodes.insert(AlphaNode::new(
            AlphaTest::Negated,
            key,
            Some(parent),
        )));
        self.alpha_nodes[parent.0].negative_child = Some(child);
        child
    }

    /// Evaluates one node's own test against a WME.
    ///
    /// `Root` and `Negated` are vacuously true: a negated node is only
    /// ever reached through its parent's reject branch.
    fn alpha_test_passes(&self, node: AlphaNodeId, wme: WmeId) -> bool {
        match &self.alpha_nodes[node.0].test {
            AlphaTest::Root | AlphaTest::Negated => true,
            AlphaTest::Type(type_info) => type_info.matches(&self.wmes[wme.0].fact),
            AlphaTest::Constant { attr, value, op } => {
                let Ok(field) = self.wmes[wme.0].get_field(attr) else {
                    return false;
                };
                match op.apply(&field, value) {
                    Ok(pass) => pass,
                    Err(err) => {
                        warn!(%err, %attr, "constant test on incomparable operands");
                        false
                    }
                }
            }
        }
    }

    /// Evaluates the whole test chain above (and including) a node.
    ///
    /// Used to seed fresh alpha memories from the current working memory.
    pub(crate) fn alpha_chain_passes(&self, node: AlphaNodeId, wme: WmeId) -> bool {
        let n = &self.alpha_nodes[node.0];
        match n.test {
            AlphaTest::Root => true,
            AlphaTest::Type(_) | AlphaTest::Constant { .. } => {
                let parent = n.parent.expect("non-root alpha node has a parent");
                self.alpha_chain_passes(parent, wme) && self.alpha_test_passes(node, wme)
            }
            AlphaTest::Negated => {
                let rejecting = n.parent.expect("negated alpha node has a parent");
                let above = self.alpha_nodes[rejecting.0]
                    .parent
                    .expect("constant alpha node has a parent");
                self.alpha_chain_passes(above, wme) && !self.alpha_test_passes(rejecting, wme)
            }
        }
    }

    /// Routes a WME down the discrimination tree.
    ///
    /// On a pass the node's output memory (if any) and its normal
    /// children activate; on a reject only the attached catch-all child
    /// does.
    pub(crate) fn activate_alpha_node(&mut self, node: AlphaNodeId, wme: WmeId) {
        if self.alpha_test_passes(node, wme) {
            if let Some(mem) = self.alpha_nodes[node.0].output {
                self.activate_alpha_memory(mem, wme);
            }
            let children: Vec<AlphaNodeId> =
                self.alpha_nodes[node.0].children.values().copied().collect();
            for child in children {
                self.activate_alpha_node(child, wme);
            }
        } else if let Some(negated) = self.alpha_nodes[node.0].negative_child {
            self.activate_alpha_node(negated, wme);
        }
    }

    /// Inserts a WME into a memory and notifies successors newest-first.
    ///
    /// Re-inserting is a no-op, which is what makes `add_fact` idempotent.
    fn activate_alpha_memory(&mut self, mem: AlphaMemId, wme: WmeId) {
        if !self.alpha_mems[mem.0].wmes.insert(wme) {
            return;
        }
        self.wmes[wme.0].alpha_mems.insert(mem);
        trace!(mem = ?mem, wme = ?wme, "alpha memory activated");

        let successors: Vec<BetaNodeId> = self.alpha_mems[mem.0].successors.clone();
        for succ in successors.into_iter().rev() {
            self.right_activate(succ, wme);
        }
    }

    /// Tears an alpha memory down: clears memberships, then walks up the
    /// input chain deleting nodes that became dangling, stopping at the
    /// first shared ancestor.
    pub(crate) fn destroy_alpha_memory(&mut self, mem: AlphaMemId) {
        let memory = self.alpha_mems.remove(mem.0);
        self.alpha_mem_index.remove(&memory.key);
        for wme in &memory.wmes {
            self.wmes[wme.0].alpha_mems.remove(&mem);
        }
        debug!(mem = ?mem, "destroyed alpha memory");

        self.alpha_nodes[memory.input.0].output = None;
        let mut current = Some(memory.input);
        while let Some(node) = current {
            if node == self.alpha_root || !self.alpha_nodes[node.0].is_dangling() {
                break;
            }
            let parent = self.alpha_nodes[node.0].parent;
            if let Some(p) = parent {
                if self.alpha_nodes[p.0].negative_child == Some(node) {
                    self.alpha_nodes[p.0].negative_child = None;
                } else {
                    let key = self.alpha_nodes[node.0].key;
                    self.alpha_nodes[p.0].children.remove(&key);
                }
            }
            self.alpha_nodes.remove(node.0);
            current = parent;
        }
    }

    /// Number of children under the alpha root; used by teardown tests.
    #[must_use]
    pub fn alpha_root_child_count(&self) -> usize {
        self.alpha_nodes[self.alpha_root.0].children.len()
    }
}
