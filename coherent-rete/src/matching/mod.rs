//! The core of a Coherent Logic (CL) solver is pattern matching on
//! rules of the form $$\forall x, y, z: p(x, y) \wedge q(y, z) \wedge ... =>
//! ...$$ We match incrementally, with a RETE network: every new fact
//! enters the network once, and only the partial matches it extends
//! are recomputed.
//!
//! The right-hand side of the implication is a disjunction of
//! conjunctions; if any of these conjunctions is already true, the
//! implication has no logical relevance (for all corresponding
//! parameters).  CL also lets disjunctions on the right-hand side
//! introduce new variables, with terms like $$\exists a: r(a, x) \wedge
//! s(x, y),$$ where some metavariables were bound by matching in the
//! left-hand side, and others introduced by $$\exists,$$ and
//! substituted with fresh constants when instantiated.  The network
//! matches the (small enough) right-hand conjunctions as well, and
//! suppresses left-hand matches for which one of them already holds.
//!
//! This module only describes the network's static shape: a `Network`
//! is built once per theory, and is then shared read-only by every
//! branch of the search and every worker thread.  All mutable state
//! (caches, queues) lives in `execution`, addressed by the indices
//! stored in the nodes.
mod node;
mod planner;

pub use node::AlphaTest;
pub use node::CacheSlot;
pub use node::Edge;
pub use node::Node;
pub use node::NodeId;
pub use node::NodeKind;
pub use node::Side;

use crate::error::Error;
use crate::error::Result;
use crate::ground::PredicateId;
use crate::theory::AxiomId;
use crate::theory::Theory;
use crate::unification::Projection;
use planner::push_node;
use std::collections::BTreeMap;
use tracing::debug;

/// Knobs that change the network's shape.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NetworkOptions {
    /// Guard rule nodes against instances whose consequent holds.
    pub use_negation_guard: bool,
    /// Only guard disjuncts with at most that many atoms (0 for no
    /// limit).
    pub negation_guard_max_conjuncts: usize,
    /// Defer the output of each axiom's last left conjunct.
    pub lazy_alpha: bool,
}

impl Default for NetworkOptions {
    fn default() -> Self {
        Self {
            use_negation_guard: true,
            negation_guard_max_conjuncts: 0,
            lazy_alpha: false,
        }
    }
}

/// The part of the network that matches one axiom.  Every node in
/// this subnetwork, except for the shared selectors, belongs to the
/// axiom, and the axiom's matcher owns all the caches they refer to.
#[derive(Clone, Debug)]
pub struct AxiomNetwork {
    axiom: AxiomId,
    roots: BTreeMap<PredicateId, Vec<NodeId>>,
    joins: Vec<NodeId>,
    guards: Vec<NodeId>,
    rule: NodeId,
    seed: Option<Edge>,
    projections: Vec<Projection>,
    deferred: bool,
}

impl AxiomNetwork {
    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn axiom(&self) -> AxiomId {
        self.axiom
    }

    /// Returns the first alpha node of every chain that matches an
    /// atom of `predicate`.
    #[must_use]
    pub fn roots(&self, predicate: PredicateId) -> &[NodeId] {
        self.roots.get(&predicate).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the predicates that this axiom matches on.
    pub fn predicates(&self) -> impl Iterator<Item = PredicateId> + '_ {
        self.roots.keys().copied()
    }

    /// Returns the `BetaAnd` nodes, in construction order.
    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn joins(&self) -> &[NodeId] {
        &self.joins
    }

    /// Returns the `BetaNot` nodes, in construction order.
    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn guards(&self) -> &[NodeId] {
        &self.guards
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn rule(&self) -> NodeId {
        self.rule
    }

    /// For axioms with an empty left-hand side, returns where the
    /// empty substitution enters the network.
    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn seed(&self) -> Option<Edge> {
        self.seed
    }

    /// Returns the projection for each cache slot.
    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn projections(&self) -> &[Projection] {
        &self.projections
    }

    /// Whether some of this axiom's matches are only forwarded on
    /// demand.
    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn deferred(&self) -> bool {
        self.deferred
    }
}

#[derive(Clone, Debug)]
pub struct Network {
    nodes: Vec<Node>,
    axioms: Vec<AxiomNetwork>,
    /// For each predicate, the axioms that match on it.
    subscribers: Vec<Vec<AxiomId>>,
    width: usize,
}

impl Network {
    /// Validates `theory`, and builds the network that matches all
    /// its axioms.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` for malformed axioms.
    pub fn build(theory: &Theory, options: &NetworkOptions) -> Result<Network> {
        theory.validate()?;

        let mut nodes = Vec::new();
        let mut selectors = Vec::with_capacity(theory.predicate_count());
        for index in 0..theory.predicate_count() {
            let predicate = PredicateId::new(index as u32);
            selectors.push(
                push_node(&mut nodes, NodeKind::Selector { predicate }).map_err(Error::Theory)?,
            );
        }

        let mut axioms = Vec::with_capacity(theory.axioms().len());
        let mut subscribers = vec![Vec::new(); theory.predicate_count()];
        for (index, axiom) in theory.axioms().iter().enumerate() {
            let id = AxiomId::new(index as u32);
            let sub = planner::plan_axiom(&mut nodes, &selectors, id, axiom, options)
                .map_err(|reason| Error::configuration(index, reason))?;

            for predicate in sub.predicates() {
                subscribers[predicate.index()].push(id);
            }

            axioms.push(sub);
        }

        debug!(
            nodes = nodes.len(),
            axioms = axioms.len(),
            "built matching network"
        );
        Ok(Network {
            nodes,
            axioms,
            subscribers,
            width: theory.variable_count(),
        })
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Returns whether facts of `predicate` must also be merged in
    /// the domain.  They still flow through the `=` selector, like
    /// any other fact.
    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn merges(&self, predicate: PredicateId) -> bool {
        predicate.is_equality()
    }

    #[must_use]
    pub fn axiom(&self, id: AxiomId) -> &AxiomNetwork {
        &self.axioms[id.index()]
    }

    #[must_use]
    pub fn axiom_count(&self) -> usize {
        self.axioms.len()
    }

    /// Returns the axioms with at least one atom of `predicate` in
    /// their subnetwork.
    #[must_use]
    pub fn subscribers(&self, predicate: PredicateId) -> &[AxiomId] {
        self.subscribers
            .get(predicate.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of variable slots in every substitution.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }
}

#[cfg(test)]
fn join_theory() -> Theory {
    use crate::theory::Axiom;
    use crate::theory::AxiomKind;
    use crate::theory::Disjunct;
    use crate::unification::Atom;
    use crate::unification::Term;

    // p(x, y) & q(y, z) => r(x, z)
    let mut theory = Theory::new();
    let p = theory.add_predicate("p", 2).expect("ok");
    let q = theory.add_predicate("q", 2).expect("ok");
    let r = theory.add_predicate("r", 2).expect("ok");
    let x = theory.add_variable("X").expect("ok");
    let y = theory.add_variable("Y").expect("ok");
    let z = theory.add_variable("Z").expect("ok");

    theory
        .add_axiom(Axiom::new(
            AxiomKind::Normal,
            vec![
                Atom::new(p, vec![Term::from(x), Term::from(y)]),
                Atom::new(q, vec![Term::from(y), Term::from(z)]),
            ],
            vec![Disjunct::conjunction(vec![Atom::new(
                r,
                vec![Term::from(x), Term::from(z)],
            )])],
        ))
        .expect("ok");
    theory
}

#[test]
fn test_build_join_shape() {
    let theory = join_theory();
    let network = Network::build(&theory, &NetworkOptions::default()).expect("valid");
    let p = theory.predicate("p").expect("p");
    let r = theory.predicate("r").expect("r");

    assert_eq!(network.axiom_count(), 1);
    assert_eq!(network.width(), 3);
    let sub = network.axiom(AxiomId::new(0));
    assert_eq!(sub.roots(p).len(), 1);
    assert_eq!(sub.joins().len(), 1);
    assert_eq!(sub.guards().len(), 1);
    assert!(sub.seed().is_none());
    // r only shows up in the guard.
    assert_eq!(sub.roots(r).len(), 1);
    assert_eq!(network.subscribers(r), &[AxiomId::new(0)]);

    // The join feeds the guard, which feeds the rule.
    let join = network.node(sub.joins()[0]);
    let guard = join.child().expect("one child");
    assert_eq!(guard, Edge::left(sub.guards()[0]));
    assert_eq!(
        network.node(guard.node).child(),
        Some(Edge::left(sub.rule()))
    );
    assert!(matches!(
        network.node(sub.rule()).kind(),
        NodeKind::Rule { .. }
    ));

    // Two caches per join and per guard, one for the rule.
    assert_eq!(sub.projections().len(), 5);
    assert!(network.merges(PredicateId::EQUALITY));
    assert!(!network.merges(p));
}

#[test]
fn test_build_without_guard() {
    let theory = join_theory();
    let options = NetworkOptions {
        use_negation_guard: false,
        ..NetworkOptions::default()
    };
    let network = Network::build(&theory, &options).expect("valid");
    let sub = network.axiom(AxiomId::new(0));

    assert!(sub.guards().is_empty());
    assert_eq!(sub.projections().len(), 3);
    assert!(network.subscribers(theory.predicate("r").expect("r")).is_empty());
    assert_eq!(
        network.node(sub.joins()[0]).child(),
        Some(Edge::left(sub.rule()))
    );
}

#[test]
fn test_build_guard_size_limit() {
    use crate::theory::Axiom;
    use crate::theory::AxiomKind;
    use crate::theory::Disjunct;
    use crate::unification::Atom;
    use crate::unification::Term;

    // p(x) => q(x) | (r(x) & s(x))
    let mut theory = Theory::new();
    let p = theory.add_predicate("p", 1).expect("ok");
    let q = theory.add_predicate("q", 1).expect("ok");
    let r = theory.add_predicate("r", 1).expect("ok");
    let s = theory.add_predicate("s", 1).expect("ok");
    let x = theory.add_variable("X").expect("ok");
    let atom = |predicate| Atom::new(predicate, vec![Term::from(x)]);
    theory
        .add_axiom(Axiom::new(
            AxiomKind::Normal,
            vec![atom(p)],
            vec![
                Disjunct::conjunction(vec![atom(q)]),
                Disjunct::conjunction(vec![atom(r), atom(s)]),
            ],
        ))
        .expect("ok");

    let network = Network::build(&theory, &NetworkOptions::default()).expect("valid");
    assert_eq!(network.axiom(AxiomId::new(0)).guards().len(), 2);
    assert_eq!(network.subscribers(s), &[AxiomId::new(0)]);

    let options = NetworkOptions {
        negation_guard_max_conjuncts: 1,
        ..NetworkOptions::default()
    };
    let network = Network::build(&theory, &options).expect("valid");
    let sub = network.axiom(AxiomId::new(0));
    assert_eq!(sub.guards().len(), 1);
    assert_eq!(network.subscribers(q), &[AxiomId::new(0)]);
    assert!(network.subscribers(r).is_empty());
    assert!(network.subscribers(s).is_empty());
    // The only guard feeds the rule directly.
    assert_eq!(
        network.node(sub.guards()[0]).child(),
        Some(Edge::left(sub.rule()))
    );
}

#[test]
fn test_build_seeds_facts() {
    use crate::theory::Axiom;
    use crate::unification::Atom;

    let mut theory = Theory::new();
    let p = theory.add_predicate("p", 0).expect("ok");
    theory
        .add_axiom(Axiom::fact(vec![Atom::new(p, vec![])]))
        .expect("ok");

    let network = Network::build(&theory, &NetworkOptions::default()).expect("valid");
    let sub = network.axiom(AxiomId::new(0));
    assert_eq!(sub.seed(), Some(Edge::left(sub.rule())));
    assert!(network.subscribers(p).is_empty());
}

#[test]
fn test_build_rejects_malformed() {
    use crate::theory::Axiom;
    use crate::theory::AxiomKind;
    use crate::theory::Disjunct;
    use crate::unification::Atom;
    use crate::unification::Term;

    let mut theory = Theory::new();
    let p = theory.add_predicate("p", 1).expect("ok");
    let x = theory.add_variable("X").expect("ok");
    theory
        .add_axiom(Axiom::new(
            AxiomKind::Normal,
            vec![],
            vec![Disjunct::conjunction(vec![Atom::new(p, vec![Term::from(x)])])],
        ))
        .expect("ok");

    assert!(matches!(
        Network::build(&theory, &NetworkOptions::default()),
        Err(Error::Configuration { axiom: 0, .. })
    ));
}
