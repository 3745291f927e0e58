//! The rule IR the engine compiles: alias declarations with guards, plus
//! cross-alias join tests.
//!
//! A [`Production`] is validated in full before the network is touched, so
//! a rejected production leaves the engine exactly as it was.

use std::collections::HashSet;

use trellis_foundation::hash::{hash_str, hash_u64, mix64};
use trellis_foundation::{
    Error, Identity, Result, TestOp, TypeInfo, Value, VariantTag, FIELD_ID,
};

/// Guard hash layout, used as sharing keys in the alpha network:
///
/// ```text
/// negative?   reserved     op(8)      attr/value hash(32)
///    63       62 .. 40    39 .. 32        31 .. 0
/// ```
const GUARD_OP_OFFSET: u64 = 32;
const GUARD_OP_MASK: u64 = 0xFF << GUARD_OP_OFFSET;
const GUARD_NEGATIVE_FLAG: u64 = 1 << 63;
const GUARD_VALUE_MASK: u64 = 0xFFFF_FFFF;

/// A constant test on one attribute of a single alias.
#[derive(Clone, Debug, PartialEq)]
pub struct Guard {
    /// Attribute to read from the candidate fact.
    pub attr: String,
    /// Literal to test against. Never an [`Identity`] and never a struct.
    pub value: Value,
    /// Operator to apply, fact attribute on the left.
    pub op: TestOp,
    /// Negated guards admit exactly the facts the positive form rejects.
    pub negative: bool,
}

impl Guard {
    /// Creates an equality guard.
    #[must_use]
    pub fn equal(attr: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            attr: attr.into(),
            value: value.into(),
            op: TestOp::Equal,
            negative: false,
        }
    }

    /// Creates a less-than guard (`attr < value`).
    #[must_use]
    pub fn less(attr: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            attr: attr.into(),
            value: value.into(),
            op: TestOp::Less,
            negative: false,
        }
    }

    /// Negates this guard.
    #[must_use]
    pub fn negated(mut self) -> Self {
        self.negative = true;
        self
    }

    /// Sharing key of the constant-test node this guard maps to.
    ///
    /// Excludes the negative flag: a negated guard shares the positive
    /// form's test node and attaches a catch-all child to it.
    #[must_use]
    pub fn node_key(&self) -> u64 {
        let content = mix64(hash_str(&self.attr), self.value.hash_value());
        (content & GUARD_VALUE_MASK) | (((self.op as u64) << GUARD_OP_OFFSET) & GUARD_OP_MASK)
    }

    /// Key of this guard within an alpha-memory chain, negative flag
    /// included.
    #[must_use]
    pub fn chain_key(&self) -> u64 {
        let key = self.node_key();
        if self.negative {
            key | GUARD_NEGATIVE_FLAG
        } else {
            key
        }
    }
}

/// One position a join test reads: an attribute of a declared alias.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    /// The declared alias to read from.
    pub alias: Identity,
    /// The attribute to read (`__Self__` and `__ID__` are valid here).
    pub attr: String,
}

impl Selector {
    /// Creates a selector.
    #[must_use]
    pub fn new(alias: impl Into<Identity>, attr: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            attr: attr.into(),
        }
    }
}

/// A test relating attributes of two or more aliases.
///
/// Selected attributes are compared pairwise in selector order. A negated
/// join test holds iff no candidate of its final selector's alias
/// satisfies the positive form.
#[derive(Clone, Debug, PartialEq)]
pub struct JoinTest {
    /// Positions to read, in comparison order.
    pub selectors: Vec<Selector>,
    /// Operator applied pairwise over the selected values.
    pub op: TestOp,
    /// Negation flag.
    pub negative: bool,
}

impl JoinTest {
    /// Creates an equality join test.
    #[must_use]
    pub fn equal(selectors: Vec<Selector>) -> Self {
        Self {
            selectors,
            op: TestOp::Equal,
            negative: false,
        }
    }

    /// Creates a less-than join test.
    #[must_use]
    pub fn less(selectors: Vec<Selector>) -> Self {
        Self {
            selectors,
            op: TestOp::Less,
            negative: false,
        }
    }

    /// Negates this join test.
    #[must_use]
    pub fn negated(mut self) -> Self {
        self.negative = true;
        self
    }
}

/// One alias a production binds: a type requirement plus constant guards.
#[derive(Clone, Debug)]
pub struct AliasDeclaration {
    /// The alias name, used in join tests and match bindings.
    pub alias: Identity,
    /// Type requirement on candidate facts.
    pub type_info: TypeInfo,
    /// Constant tests on candidate facts, applied in order.
    pub guards: Vec<Guard>,
}

impl AliasDeclaration {
    /// Creates a declaration with no guards.
    #[must_use]
    pub fn new(alias: impl Into<Identity>, type_info: TypeInfo) -> Self {
        Self {
            alias: alias.into(),
            type_info,
            guards: Vec::new(),
        }
    }

    /// Adds a guard.
    #[must_use]
    pub fn with_guard(mut self, guard: Guard) -> Self {
        self.guards.push(guard);
        self
    }

    /// Composite key of the alpha memory this declaration maps to.
    #[must_use]
    pub fn memory_key(&self) -> u64 {
        let mut h = self.type_info.hash_value();
        for guard in &self.guards {
            h = mix64(h, guard.chain_key());
        }
        // Guard against an empty-guard chain colliding with a guarded one.
        mix64(h, hash_u64(self.guards.len() as u64))
    }
}

/// The unit a client compiles into the network.
#[derive(Clone, Debug, Default)]
pub struct Production {
    /// Unique id; `add_production` is idempotent on it.
    pub id: String,
    /// Ordered alias declarations.
    pub aliases: Vec<AliasDeclaration>,
    /// Cross-alias join tests, unordered.
    pub join_tests: Vec<JoinTest>,
}

impl Production {
    /// Creates an empty production with the given id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            aliases: Vec::new(),
            join_tests: Vec::new(),
        }
    }

    /// Adds an alias declaration.
    #[must_use]
    pub fn with_alias(mut self, decl: AliasDeclaration) -> Self {
        self.aliases.push(decl);
        self
    }

    /// Adds a join test.
    #[must_use]
    pub fn with_join_test(mut self, test: JoinTest) -> Self {
        self.join_tests.push(test);
        self
    }

    /// Checks the production for compile-time errors.
    ///
    /// # Errors
    /// See the rejection rules on [`Production`]: duplicate aliases,
    /// unknown-variant type infos, identity or struct guard literals,
    /// guards on `__ID__`, join tests with fewer than two selectors, and
    /// selectors naming undeclared aliases all fail here.
    pub fn validate(&self) -> Result<()> {
        if self.aliases.is_empty() {
            return Err(Error::invalid_type_info(
                "production declares no aliases",
            ));
        }

        let mut seen = HashSet::new();
        for decl in &self.aliases {
            if !seen.insert(decl.alias.as_str()) {
                return Err(Error::duplicate_alias(decl.alias.as_str()));
            }
            if decl.type_info.rtype.is_some() {
                if decl.type_info.variant != VariantTag::Struct {
                    return Err(Error::invalid_type_info(format!(
                        "nominal declaration of alias {} must use the struct variant",
                        decl.alias
                    )));
                }
            } else if decl.type_info.variant == VariantTag::Unknown {
                return Err(Error::invalid_type_info(format!(
                    "alias {} declares the unknown variant",
                    decl.alias
                )));
            }

            for guard in &decl.guards {
                match guard.value.variant() {
                    VariantTag::Identity => {
                        return Err(Error::invalid_guard(format!(
                            "guard on {}.{} carries an identity; cross-alias references \
                             belong in join tests",
                            decl.alias, guard.attr
                        )));
                    }
                    VariantTag::Struct => {
                        return Err(Error::invalid_guard(format!(
                            "guard on {}.{} carries a struct literal; guards are scalar",
                            decl.alias, guard.attr
                        )));
                    }
                    _ => {}
                }
                if guard.attr == FIELD_ID {
                    if guard.negative {
                        return Err(Error::unsupported_negation(format!(
                            "negated guard on {}.__ID__ has no test node to invert",
                            decl.alias
                        )));
                    }
                    return Err(Error::invalid_guard(format!(
                        "guard on {}.__ID__ would test an identity",
                        decl.alias
                    )));
                }
            }
        }

        for test in &self.join_tests {
            if test.selectors.len() < 2 {
                if test.negative {
                    return Err(Error::unsupported_negation(
                        "negated join test needs a subject selector",
                    ));
                }
                return Err(Error::invalid_join_test(
                    "join test needs at least two selectors",
                ));
            }
            for sel in &test.selectors {
                if !seen.contains(sel.alias.as_str()) {
                    return Err(Error::unguarded_alias(sel.alias.as_str()));
                }
            }
        }

        Ok(())
    }
}
