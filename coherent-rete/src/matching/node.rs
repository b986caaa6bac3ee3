//! Network nodes live in a single arena owned by the `Network`;
//! nodes refer to their children by index, and to their (per-branch)
//! caches by slot in their axiom's matcher.  The arena is immutable
//! once built, so every branch and every worker can share it.
use crate::ground::Domain;
use crate::ground::Fact;
use crate::ground::PredicateId;
use crate::theory::AxiomId;
use crate::unification::Projection;
use crate::unification::ProvenanceMode;
use crate::unification::Substitution;
use crate::unification::Term;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NodeId(u32);

impl NodeId {
    #[must_use]
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Two-input nodes distinguish their inputs: the left input is the
/// conjunction so far (or the candidate, for negation), the right
/// input is the new atom (or the already-true consequent).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Edge {
    pub node: NodeId,
    pub side: Side,
}

impl Edge {
    #[must_use]
    pub fn left(node: NodeId) -> Self {
        Self {
            node,
            side: Side::Left,
        }
    }

    #[must_use]
    pub fn right(node: NodeId) -> Self {
        Self {
            node,
            side: Side::Right,
        }
    }
}

/// Index of a substitution cache in an axiom's matcher.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct CacheSlot(usize);

impl CacheSlot {
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AlphaTest {
    /// Accepts every fact (nullary atoms).
    Pass,
    /// Matches argument `position` against `pattern`.
    Match { position: usize, pattern: Term },
}

impl AlphaTest {
    /// Runs the test on `fact`, extending `substitution` on success.
    #[must_use]
    pub fn accepts(&self, fact: &Fact, substitution: &mut Substitution, domain: &Domain) -> bool {
        match self {
            AlphaTest::Pass => true,
            AlphaTest::Match { position, pattern } => match fact.args().get(*position) {
                Some(value) => pattern.try_match(value, substitution, domain),
                None => false,
            },
        }
    }
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    /// Dispatches facts for one predicate to the alpha chains that
    /// start with an atom of that predicate.
    Selector { predicate: PredicateId },
    /// One test in the chain for one atom.  When `propagate` is
    /// false, the chain's output is parked in its axiom's pending
    /// list instead of being forwarded to the beta level.
    Alpha {
        axiom: AxiomId,
        test: AlphaTest,
        propagate: bool,
    },
    /// Joins the conjunction so far (left) with one more atom (right).
    BetaAnd {
        axiom: AxiomId,
        left: CacheSlot,
        right: CacheSlot,
        mode: ProvenanceMode,
    },
    /// Forwards left substitutions that are not compatible (on
    /// `guard`) with any right substitution, i.e., rule candidates
    /// whose `disjunct` does not already hold.
    BetaNot {
        axiom: AxiomId,
        disjunct: usize,
        left: CacheSlot,
        right: CacheSlot,
        guard: Projection,
    },
    /// Terminal node: every new entry in `cache` is a rule instance.
    Rule { axiom: AxiomId, cache: CacheSlot },
}

#[derive(Clone, Debug)]
pub struct Node {
    kind: NodeKind,
    children: Vec<Edge>,
}

impl Node {
    #[must_use]
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn children(&self) -> &[Edge] {
        &self.children
    }

    pub(crate) fn add_child(&mut self, edge: Edge) {
        self.children.push(edge);
    }

    /// Returns the node's only child, for nodes that have exactly one.
    #[must_use]
    pub fn child(&self) -> Option<Edge> {
        match self.children.as_slice() {
            [edge] => Some(*edge),
            _ => None,
        }
    }

    /// Returns the axiom this node belongs to; selectors are shared
    /// and belong to none.
    #[must_use]
    pub fn axiom(&self) -> Option<AxiomId> {
        match &self.kind {
            NodeKind::Selector { .. } => None,
            NodeKind::Alpha { axiom, .. }
            | NodeKind::BetaAnd { axiom, .. }
            | NodeKind::BetaNot { axiom, .. }
            | NodeKind::Rule { axiom, .. } => Some(*axiom),
        }
    }
}

#[test]
fn test_alpha_test() {
    use crate::ground::Constant;
    use crate::ground::GroundTerm;
    use crate::unification::MetaVar;

    let domain = Domain::new();
    let x = MetaVar::new(0);
    let fact = Fact::new(
        PredicateId::new(1),
        vec![GroundTerm::from(Constant::new(0)), Constant::new(1).into()],
    );

    let mut sub = Substitution::new(1);
    assert!(AlphaTest::Pass.accepts(&fact, &mut sub, &domain));

    let bind = AlphaTest::Match {
        position: 1,
        pattern: Term::from(x),
    };
    assert!(bind.accepts(&fact, &mut sub, &domain));
    assert_eq!(sub.get(x), Some(&Constant::new(1).into()));

    let constant = AlphaTest::Match {
        position: 0,
        pattern: Term::from(Constant::new(1)),
    };
    assert!(!constant.accepts(&fact, &mut sub, &domain));

    let out_of_range = AlphaTest::Match {
        position: 2,
        pattern: Term::from(x),
    };
    assert!(!out_of_range.accepts(&fact, &mut sub, &domain));
}

#[test]
fn test_node_children() {
    let mut node = Node::new(NodeKind::Rule {
        axiom: AxiomId::new(2),
        cache: CacheSlot::new(0),
    });
    assert_eq!(node.axiom(), Some(AxiomId::new(2)));
    assert_eq!(node.child(), None);

    node.add_child(Edge::left(NodeId::new(3)));
    assert_eq!(node.child(), Some(Edge::left(NodeId::new(3))));
    node.add_child(Edge::right(NodeId::new(4)));
    assert_eq!(node.child(), None);
    assert_eq!(
        Node::new(NodeKind::Selector {
            predicate: PredicateId::EQUALITY
        })
        .axiom(),
        None
    );
}
