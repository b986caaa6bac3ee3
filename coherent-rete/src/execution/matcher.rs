//! An `AxiomMatcher` holds the mutable state of one axiom's
//! subnetwork for one branch: a cache per stateful node, the facts
//! that some alpha test rejected, and the substitutions that lazy
//! alpha chains have not forwarded yet.  It pushes new facts through
//! the subnetwork, and appends the rule instances that come out the
//! other end to the axiom's queue.
//!
//! Propagation uses an explicit FIFO worklist of `(edge,
//! substitution)` tokens rather than recursion, so a single fact
//! that triggers a long cascade of joins neither blows the stack nor
//! reorders matches depth-first.
//!
//! Equality merges can only make more things match.  A merge thus
//! triggers a recheck: every join re-pairs its cached inputs, every
//! negation guard re-examines its candidates, and rejected facts are
//! retried.  Caches drop everything they have already seen, so the
//! recheck only forwards genuinely new matches.  A parked fact that
//! passes leaves the parked set; the matcher logs that, so `restore`
//! can park it again.
use super::cache::CacheMark;
use super::cache::SubstitutionCache;
use super::queue::RuleInstance;
#[cfg(test)]
use super::queue::PopOrder;
use super::queue::RuleQueue;
use crate::ground::Domain;
use crate::ground::Fact;
use crate::ground::Step;
use crate::matching::Edge;
use crate::matching::Network;
use crate::matching::NodeId;
use crate::matching::NodeKind;
use crate::matching::Side;
use crate::theory::AxiomId;
use crate::unification::Substitution;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::trace;

/// A fact that failed some alpha test; it may pass once more
/// constants are merged.
#[derive(Clone, Debug)]
struct Parked {
    root: NodeId,
    fact: Arc<Fact>,
    step: Step,
    /// False once a recheck let the fact through.
    waiting: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MatcherMark {
    caches: Vec<CacheMark>,
    parked: usize,
    unparked: usize,
    pending: usize,
    pending_head: usize,
}

#[derive(Clone, Debug)]
pub struct AxiomMatcher {
    axiom: AxiomId,
    caches: Vec<SubstitutionCache>,
    parked: Vec<Parked>,
    /// Indices in `parked` that stopped waiting, in order.
    unparked: Vec<usize>,
    pending: Vec<(Edge, Substitution)>,
    pending_head: usize,
    /// Always empty between calls.
    worklist: VecDeque<(Edge, Substitution)>,
}

impl AxiomMatcher {
    /// Returns a matcher with empty caches for `axiom`'s subnetwork.
    #[must_use]
    pub fn new(network: &Network, axiom: AxiomId) -> Self {
        let caches = network
            .axiom(axiom)
            .projections()
            .iter()
            .cloned()
            .map(SubstitutionCache::new)
            .collect();

        Self {
            axiom,
            caches,
            parked: Vec::new(),
            unparked: Vec::new(),
            pending: Vec::new(),
            pending_head: 0,
            worklist: VecDeque::new(),
        }
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn axiom(&self) -> AxiomId {
        self.axiom
    }

    #[must_use]
    pub fn cache(&self, index: usize) -> &SubstitutionCache {
        &self.caches[index]
    }

    /// Number of facts waiting for an equality merge.
    #[must_use]
    pub fn parked(&self) -> usize {
        self.parked.len() - self.unparked.len()
    }

    /// Whether lazy chains hold back substitutions.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending_head < self.pending.len()
    }

    /// Feeds the empty substitution to axioms with an empty
    /// left-hand side.
    pub fn seed(&mut self, network: &Network, domain: &Domain, queue: &mut RuleQueue) {
        if let Some(edge) = network.axiom(self.axiom).seed() {
            self.worklist
                .push_back((edge, Substitution::new(network.width())));
            self.drain(network, domain, queue);
        }
    }

    /// Pushes `fact`, derived at `step`, through every alpha chain
    /// for its predicate.
    pub fn arrive(
        &mut self,
        network: &Network,
        domain: &Domain,
        fact: &Arc<Fact>,
        step: Step,
        queue: &mut RuleQueue,
    ) {
        for root in network.axiom(self.axiom).roots(fact.predicate()) {
            if !self.run_chain(network, domain, *root, fact, step) {
                self.parked.push(Parked {
                    root: *root,
                    fact: fact.clone(),
                    step,
                    waiting: true,
                });
            }
        }

        self.drain(network, domain, queue);
    }

    /// Re-derives everything the last equality merge may have
    /// enabled.
    pub fn recheck(&mut self, network: &Network, domain: &Domain, queue: &mut RuleQueue) {
        let sub = network.axiom(self.axiom);

        for join in sub.joins() {
            let node = network.node(*join);
            if let (NodeKind::BetaAnd { left, right, mode, .. }, Some(child)) =
                (node.kind(), node.child())
            {
                for (_, x) in self.caches[left.index()].alive() {
                    for (_, y) in self.caches[right.index()].alive() {
                        if let Some(joined) = x.union(y, *mode, domain) {
                            self.worklist.push_back((child, joined));
                        }
                    }
                }
            }

            self.drain(network, domain, queue);
        }

        for guard in sub.guards() {
            if let NodeKind::BetaNot { right, .. } = network.node(*guard).kind() {
                let known: Vec<Substitution> = self.caches[right.index()]
                    .alive()
                    .map(|(_, entry)| entry.clone())
                    .collect();
                for entry in &known {
                    self.detract(network, domain, *guard, entry, queue);
                }
            }
        }

        for index in 0..self.parked.len() {
            if !self.parked[index].waiting {
                continue;
            }

            let (root, fact, step) = {
                let parked = &self.parked[index];
                (parked.root, parked.fact.clone(), parked.step)
            };
            if self.run_chain(network, domain, root, &fact, step) {
                self.parked[index].waiting = false;
                self.unparked.push(index);
            }
        }

        self.drain(network, domain, queue);
    }

    /// Forwards every substitution lazy chains held back.  Returns
    /// false if there was none.
    pub fn pull(&mut self, network: &Network, domain: &Domain, queue: &mut RuleQueue) -> bool {
        if !self.has_pending() {
            return false;
        }

        self.worklist
            .extend(self.pending[self.pending_head..].iter().cloned());
        self.pending_head = self.pending.len();
        self.drain(network, domain, queue);
        true
    }

    #[must_use]
    pub fn mark(&self) -> MatcherMark {
        MatcherMark {
            caches: self.caches.iter().map(SubstitutionCache::mark).collect(),
            parked: self.parked.len(),
            unparked: self.unparked.len(),
            pending: self.pending.len(),
            pending_head: self.pending_head,
        }
    }

    pub fn restore(&mut self, mark: &MatcherMark) {
        debug_assert_eq!(mark.caches.len(), self.caches.len());
        debug_assert!(self.worklist.is_empty());

        for (cache, mark) in self.caches.iter_mut().zip(mark.caches.iter()) {
            cache.restore(*mark);
        }

        for index in self.unparked.drain(mark.unparked..) {
            if let Some(parked) = self.parked.get_mut(index) {
                parked.waiting = true;
            }
        }

        self.parked.truncate(mark.parked);
        self.pending.truncate(mark.pending);
        self.pending_head = mark.pending_head;
    }

    /// Runs the alpha chain that starts at `root` on `fact`.  Returns
    /// false when some test rejects the fact.
    fn run_chain(
        &mut self,
        network: &Network,
        domain: &Domain,
        root: NodeId,
        fact: &Fact,
        step: Step,
    ) -> bool {
        let mut sub = Substitution::new(network.width());
        sub.push_timestamp(step);

        let mut current = root;
        loop {
            let node = network.node(current);
            let propagate = match node.kind() {
                NodeKind::Alpha {
                    test, propagate, ..
                } => {
                    if !test.accepts(fact, &mut sub, domain) {
                        trace!(axiom = self.axiom.index(), node = current.index(), "alpha rejected fact");
                        return false;
                    }

                    *propagate
                }
                _ => {
                    debug_assert!(false, "Alpha chain runs into a non-alpha node.");
                    return false;
                }
            };

            let edge = match node.child() {
                Some(edge) => edge,
                None => return true,
            };

            if let NodeKind::Alpha { .. } = network.node(edge.node).kind() {
                current = edge.node;
                continue;
            }

            if propagate {
                self.worklist.push_back((edge, sub));
            } else {
                self.pending.push((edge, sub));
            }

            return true;
        }
    }

    fn drain(&mut self, network: &Network, domain: &Domain, queue: &mut RuleQueue) {
        while let Some((edge, sub)) = self.worklist.pop_front() {
            self.accept(network, domain, edge, sub, queue);
        }
    }

    fn accept(
        &mut self,
        network: &Network,
        domain: &Domain,
        edge: Edge,
        sub: Substitution,
        queue: &mut RuleQueue,
    ) {
        let node = network.node(edge.node);

        match (node.kind(), edge.side) {
            (NodeKind::BetaAnd { left, right, mode, .. }, side) => {
                let (own, other) = match side {
                    Side::Left => (*left, *right),
                    Side::Right => (*right, *left),
                };

                if self.caches[own.index()]
                    .insert_if_new(&sub, domain)
                    .is_none()
                {
                    return;
                }

                let child = match node.child() {
                    Some(child) => child,
                    None => return,
                };

                // Left timestamps always come first.
                for (_, entry) in self.caches[other.index()].alive() {
                    let joined = match side {
                        Side::Left => sub.union(entry, *mode, domain),
                        Side::Right => entry.union(&sub, *mode, domain),
                    };

                    if let Some(joined) = joined {
                        self.worklist.push_back((child, joined));
                    }
                }
            }
            (
                NodeKind::BetaNot {
                    left, right, guard, ..
                },
                Side::Left,
            ) => {
                if self.caches[left.index()]
                    .insert_if_new(&sub, domain)
                    .is_none()
                {
                    return;
                }

                let holds = self.caches[right.index()]
                    .alive()
                    .any(|(_, entry)| guard.compatible(&sub, entry, domain));
                if holds {
                    trace!(axiom = self.axiom.index(), "guard suppressed candidate");
                    return;
                }

                if let Some(child) = node.child() {
                    self.worklist.push_back((child, sub));
                }
            }
            (NodeKind::BetaNot { right, .. }, Side::Right) => {
                if self.caches[right.index()]
                    .insert_if_new(&sub, domain)
                    .is_some()
                {
                    self.detract(network, domain, edge.node, &sub, queue);
                }
            }
            (NodeKind::Rule { cache, .. }, Side::Left) => {
                if let Some(index) = self.caches[cache.index()].insert_if_new(&sub, domain) {
                    let pushed = queue.push(RuleInstance::new(self.axiom, sub));
                    debug_assert_eq!(index, pushed, "Rule cache and queue out of sync.");
                }
            }
            _ => debug_assert!(false, "Substitution routed to a node without that input."),
        }
    }

    /// `holds` is a new match for the disjunct that `guard` checks:
    /// retracts everything downstream of the guard's candidates that
    /// are compatible with it.
    fn detract(
        &mut self,
        network: &Network,
        domain: &Domain,
        guard: NodeId,
        holds: &Substitution,
        queue: &mut RuleQueue,
    ) {
        let node = network.node(guard);
        let (left, projection) = match node.kind() {
            NodeKind::BetaNot { left, guard, .. } => (*left, guard),
            _ => return,
        };
        let child = match node.child() {
            Some(child) => child,
            None => return,
        };

        let blocked: Vec<Substitution> = self.caches[left.index()]
            .alive()
            .filter(|(_, candidate)| projection.compatible(candidate, holds, domain))
            .map(|(_, candidate)| candidate.clone())
            .collect();
        for candidate in &blocked {
            self.retract(network, domain, child, candidate, queue);
        }
    }

    /// Retracts every entry derived from `candidate` at and below
    /// `edge`.
    fn retract(
        &mut self,
        network: &Network,
        domain: &Domain,
        edge: Edge,
        candidate: &Substitution,
        queue: &mut RuleQueue,
    ) {
        let node = network.node(edge.node);
        match node.kind() {
            NodeKind::BetaNot { left, .. } => {
                let child = node.child();
                for index in self.caches[left.index()].matching(candidate, domain) {
                    if !self.caches[left.index()].retract(index) {
                        continue;
                    }

                    if let Some(child) = child {
                        let entry = self.caches[left.index()].get(index).clone();
                        self.retract(network, domain, child, &entry, queue);
                    }
                }
            }
            NodeKind::Rule { cache, .. } => {
                for index in self.caches[cache.index()].matching(candidate, domain) {
                    self.caches[cache.index()].retract(index);
                    if queue.retract(index) {
                        trace!(axiom = self.axiom.index(), index, "retracted rule instance");
                    }
                }
            }
            _ => debug_assert!(false, "Retraction reached a node without cache."),
        }
    }
}

#[cfg(test)]
mod fixtures {
    use crate::ground::Constant;
    use crate::ground::Domain;
    use crate::ground::Fact;
    use crate::ground::GroundTerm;
    use crate::ground::PredicateId;
    use crate::matching::Network;
    use crate::matching::NetworkOptions;
    use crate::theory::Axiom;
    use crate::theory::AxiomKind;
    use crate::theory::Disjunct;
    use crate::theory::Theory;
    use crate::execution::queue::PopOrder;
    use crate::execution::queue::RuleQueue;
    use crate::unification::Atom;
    use crate::unification::MetaVar;
    use crate::unification::Term;
    use std::sync::Arc;

    pub struct Fixture {
        pub theory: Theory,
        pub network: Network,
        pub domain: Domain,
    }

    impl Fixture {
        pub fn new(theory: Theory, options: NetworkOptions) -> Self {
            let network = Network::build(&theory, &options).expect("valid");
            let mut domain = Domain::new();
            for index in 0..theory.constant_count() {
                domain.register(Constant::new(index as u32), None);
            }

            Self {
                theory,
                network,
                domain,
            }
        }

        pub fn fact(&self, predicate: &str, args: &[&str]) -> Arc<Fact> {
            let predicate: PredicateId = self.theory.predicate(predicate).expect("predicate");
            Arc::new(Fact::new(
                predicate,
                args.iter()
                    .map(|name| GroundTerm::from(self.theory.constant(name).expect("constant"))),
            ))
        }

        pub fn constant(&self, name: &str) -> Constant {
            self.theory.constant(name).expect("constant")
        }

        /// Pops the next instance, and returns the representative of
        /// the constant bound to variable `var`.
        pub fn bound(&self, queue: &mut RuleQueue, var: u32) -> Option<Constant> {
            let instance = queue.pop(PopOrder::Fifo)?;
            instance
                .substitution()
                .get(MetaVar::new(var))
                .and_then(|term| term.as_constant())
                .map(|c| self.domain.find(c))
        }
    }

    fn constants(theory: &mut Theory) {
        for name in &["1", "2", "3", "9", "a", "b"] {
            theory.add_constant(name).expect("ok");
        }
    }

    /// p(x, y) & q(y, z) => r(x, z)
    pub fn join(options: NetworkOptions) -> Fixture {
        let mut theory = Theory::new();
        constants(&mut theory);
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
        Fixture::new(theory, options)
    }

    /// p(x) => q(x)
    pub fn implication(options: NetworkOptions) -> Fixture {
        let mut theory = Theory::new();
        constants(&mut theory);
        let p = theory.add_predicate("p", 1).expect("ok");
        let q = theory.add_predicate("q", 1).expect("ok");
        let x = theory.add_variable("X").expect("ok");

        theory
            .add_axiom(Axiom::new(
                AxiomKind::Normal,
                vec![Atom::new(p, vec![Term::from(x)])],
                vec![Disjunct::conjunction(vec![Atom::new(q, vec![Term::from(x)])])],
            ))
            .expect("ok");
        Fixture::new(theory, options)
    }

    /// p(x) => q(x) | r(x)
    pub fn disjunction() -> Fixture {
        let mut theory = Theory::new();
        constants(&mut theory);
        let p = theory.add_predicate("p", 1).expect("ok");
        let q = theory.add_predicate("q", 1).expect("ok");
        let r = theory.add_predicate("r", 1).expect("ok");
        let x = theory.add_variable("X").expect("ok");
        let atom = |predicate| Atom::new(predicate, vec![Term::from(x)]);

        theory
            .add_axiom(Axiom::new(
                AxiomKind::Normal,
                vec![atom(p)],
                vec![
                    Disjunct::conjunction(vec![atom(q)]),
                    Disjunct::conjunction(vec![atom(r)]),
                ],
            ))
            .expect("ok");
        Fixture::new(theory, NetworkOptions::default())
    }

    /// p(x, x) => q(x)
    pub fn diagonal() -> Fixture {
        let mut theory = Theory::new();
        constants(&mut theory);
        let p = theory.add_predicate("p", 2).expect("ok");
        let q = theory.add_predicate("q", 1).expect("ok");
        let x = theory.add_variable("X").expect("ok");

        theory
            .add_axiom(Axiom::new(
                AxiomKind::Normal,
                vec![Atom::new(p, vec![Term::from(x), Term::from(x)])],
                vec![Disjunct::conjunction(vec![Atom::new(q, vec![Term::from(x)])])],
            ))
            .expect("ok");
        Fixture::new(theory, NetworkOptions::default())
    }
}

#[test]
fn test_join() {
    use crate::matching::NetworkOptions;
    use crate::unification::MetaVar;

    let fx = fixtures::join(NetworkOptions::default());
    let axiom = AxiomId::new(0);
    let mut matcher = AxiomMatcher::new(&fx.network, axiom);
    let mut queue = RuleQueue::new();

    matcher.arrive(&fx.network, &fx.domain, &fx.fact("q", &["9", "3"]), 1, &mut queue);
    matcher.arrive(&fx.network, &fx.domain, &fx.fact("p", &["1", "2"]), 2, &mut queue);
    assert!(!queue.has_ready());

    matcher.arrive(&fx.network, &fx.domain, &fx.fact("q", &["2", "3"]), 3, &mut queue);
    assert_eq!(queue.ready(), 1);

    let instance = queue.pop(PopOrder::Fifo).expect("ready");
    let get = |i| instance.substitution().get(MetaVar::new(i)).cloned();
    assert_eq!(get(0), Some(fx.constant("1").into()));
    assert_eq!(get(1), Some(fx.constant("2").into()));
    assert_eq!(get(2), Some(fx.constant("3").into()));
    assert_eq!(instance.premises(), vec![2, 3]);
    assert_eq!(instance.timestamp(), 3);
}

#[test]
fn test_idempotent_insertion() {
    use crate::matching::NetworkOptions;

    let fx = fixtures::join(NetworkOptions::default());
    let mut matcher = AxiomMatcher::new(&fx.network, AxiomId::new(0));
    let mut queue = RuleQueue::new();

    let p = fx.fact("p", &["1", "2"]);
    let q = fx.fact("q", &["2", "3"]);
    matcher.arrive(&fx.network, &fx.domain, &p, 1, &mut queue);
    matcher.arrive(&fx.network, &fx.domain, &q, 2, &mut queue);
    matcher.arrive(&fx.network, &fx.domain, &p, 3, &mut queue);
    matcher.arrive(&fx.network, &fx.domain, &q, 4, &mut queue);

    assert_eq!(queue.len(), 1);
}

#[test]
fn test_guard_suppresses() {
    use crate::matching::NetworkOptions;

    let fx = fixtures::implication(NetworkOptions::default());
    let mut matcher = AxiomMatcher::new(&fx.network, AxiomId::new(0));
    let mut queue = RuleQueue::new();

    matcher.arrive(&fx.network, &fx.domain, &fx.fact("q", &["a"]), 1, &mut queue);
    matcher.arrive(&fx.network, &fx.domain, &fx.fact("p", &["a"]), 2, &mut queue);
    assert!(!queue.has_ready());

    matcher.arrive(&fx.network, &fx.domain, &fx.fact("p", &["b"]), 3, &mut queue);
    assert_eq!(fx.bound(&mut queue, 0), Some(fx.constant("b")));
}

#[test]
fn test_guard_retracts_after_merge() {
    use crate::matching::NetworkOptions;

    let mut fx = fixtures::implication(NetworkOptions::default());
    let mut matcher = AxiomMatcher::new(&fx.network, AxiomId::new(0));
    let mut queue = RuleQueue::new();

    matcher.arrive(&fx.network, &fx.domain, &fx.fact("p", &["a"]), 1, &mut queue);
    matcher.arrive(&fx.network, &fx.domain, &fx.fact("q", &["b"]), 2, &mut queue);
    assert_eq!(queue.ready(), 1);

    let (a, b) = (fx.constant("a"), fx.constant("b"));
    fx.domain.union(a, b, 3);
    matcher.recheck(&fx.network, &fx.domain, &mut queue);
    assert_eq!(queue.ready(), 0);
    assert_eq!(matcher.cache(2).alive().count(), 0);
}

#[test]
fn test_guard_retracts_on_arrival() {
    use crate::matching::NetworkOptions;

    let fx = fixtures::implication(NetworkOptions::default());
    let mut matcher = AxiomMatcher::new(&fx.network, AxiomId::new(0));
    let mut queue = RuleQueue::new();

    matcher.arrive(&fx.network, &fx.domain, &fx.fact("p", &["a"]), 1, &mut queue);
    matcher.arrive(&fx.network, &fx.domain, &fx.fact("p", &["b"]), 2, &mut queue);
    assert_eq!(queue.ready(), 2);

    matcher.arrive(&fx.network, &fx.domain, &fx.fact("q", &["a"]), 3, &mut queue);
    assert_eq!(queue.ready(), 1);
    assert_eq!(fx.bound(&mut queue, 0), Some(fx.constant("b")));
}

#[test]
fn test_guard_chain_retracts() {
    let fx = fixtures::disjunction();
    let axiom = AxiomId::new(0);
    let mut matcher = AxiomMatcher::new(&fx.network, axiom);
    let mut queue = RuleQueue::new();
    let rule = fx.network.axiom(axiom).projections().len() - 1;

    assert_eq!(fx.network.axiom(axiom).guards().len(), 2);
    matcher.arrive(&fx.network, &fx.domain, &fx.fact("p", &["a"]), 1, &mut queue);
    matcher.arrive(&fx.network, &fx.domain, &fx.fact("p", &["b"]), 2, &mut queue);
    matcher.arrive(&fx.network, &fx.domain, &fx.fact("p", &["1"]), 3, &mut queue);
    assert_eq!(queue.ready(), 3);

    // The first guard retracts a; the second guard retracts b.
    matcher.arrive(&fx.network, &fx.domain, &fx.fact("q", &["a"]), 4, &mut queue);
    assert_eq!(queue.ready(), 2);
    matcher.arrive(&fx.network, &fx.domain, &fx.fact("r", &["b"]), 5, &mut queue);
    assert_eq!(queue.ready(), 1);
    assert_eq!(matcher.cache(rule).alive().count(), 1);

    // Retracted instances do not come back.
    matcher.arrive(&fx.network, &fx.domain, &fx.fact("p", &["a"]), 6, &mut queue);
    matcher.arrive(&fx.network, &fx.domain, &fx.fact("r", &["a"]), 7, &mut queue);
    assert_eq!(queue.ready(), 1);
    assert_eq!(fx.bound(&mut queue, 0), Some(fx.constant("1")));
}

#[test]
fn test_recheck_joins() {
    use crate::matching::NetworkOptions;

    let mut fx = fixtures::join(NetworkOptions::default());
    let mut matcher = AxiomMatcher::new(&fx.network, AxiomId::new(0));
    let mut queue = RuleQueue::new();

    matcher.arrive(&fx.network, &fx.domain, &fx.fact("p", &["1", "2"]), 1, &mut queue);
    matcher.arrive(&fx.network, &fx.domain, &fx.fact("q", &["9", "3"]), 2, &mut queue);
    assert!(!queue.has_ready());

    let (two, nine) = (fx.constant("2"), fx.constant("9"));
    fx.domain.union(two, nine, 5);
    matcher.recheck(&fx.network, &fx.domain, &mut queue);

    let instance = queue.pop(PopOrder::Fifo).expect("ready");
    assert_eq!(instance.premises(), vec![1, 2, 5]);
}

#[test]
fn test_parked_facts() {
    let mut fx = fixtures::diagonal();
    let mut matcher = AxiomMatcher::new(&fx.network, AxiomId::new(0));
    let mut queue = RuleQueue::new();

    matcher.arrive(&fx.network, &fx.domain, &fx.fact("p", &["1", "2"]), 1, &mut queue);
    assert_eq!(matcher.parked(), 1);
    assert!(!queue.has_ready());

    let mark = matcher.mark();
    let domain_mark = fx.domain.snapshot();
    let queue_mark = queue.mark();

    let (one, two) = (fx.constant("1"), fx.constant("2"));
    fx.domain.union(one, two, 2);
    matcher.recheck(&fx.network, &fx.domain, &mut queue);
    assert_eq!(matcher.parked(), 0);
    assert_eq!(queue.ready(), 1);
    assert_eq!(queue.pop(PopOrder::Fifo).map(|x| x.premises()), Some(vec![1, 2]));

    // Later merges do not retry (or re-derive) facts that passed.
    let (three, nine) = (fx.constant("3"), fx.constant("9"));
    fx.domain.union(three, nine, 3);
    matcher.recheck(&fx.network, &fx.domain, &mut queue);
    assert_eq!(matcher.parked(), 0);
    assert_eq!(queue.ready(), 0);

    // Rewinding past the first merge parks the fact again.
    fx.domain.restore(domain_mark);
    matcher.restore(&mark);
    queue.restore(queue_mark);
    assert_eq!(matcher.parked(), 1);
    assert_eq!(matcher.mark(), mark);
    assert!(!queue.has_ready());

    fx.domain.union(one, two, 4);
    matcher.recheck(&fx.network, &fx.domain, &mut queue);
    assert_eq!(matcher.parked(), 0);
    assert_eq!(queue.ready(), 1);
}

#[test]
fn test_restore() {
    use crate::matching::NetworkOptions;

    let fx = fixtures::join(NetworkOptions::default());
    let mut matcher = AxiomMatcher::new(&fx.network, AxiomId::new(0));
    let mut queue = RuleQueue::new();

    matcher.arrive(&fx.network, &fx.domain, &fx.fact("p", &["1", "2"]), 1, &mut queue);
    let mark = matcher.mark();
    let queue_mark = queue.mark();
    let before: Vec<usize> = (0..5).map(|i| matcher.cache(i).len()).collect();

    matcher.arrive(&fx.network, &fx.domain, &fx.fact("q", &["2", "3"]), 2, &mut queue);
    matcher.arrive(&fx.network, &fx.domain, &fx.fact("p", &["1", "3"]), 3, &mut queue);
    assert_eq!(queue.ready(), 1);

    matcher.restore(&mark);
    queue.restore(queue_mark);
    let after: Vec<usize> = (0..5).map(|i| matcher.cache(i).len()).collect();
    assert_eq!(before, after);
    assert_eq!(matcher.mark(), mark);
    assert!(!queue.has_ready());

    // The restored state still matches.
    matcher.arrive(&fx.network, &fx.domain, &fx.fact("q", &["2", "3"]), 4, &mut queue);
    assert_eq!(queue.ready(), 1);
}

#[test]
fn test_lazy_pull() {
    use crate::matching::NetworkOptions;

    let options = NetworkOptions {
        lazy_alpha: true,
        ..NetworkOptions::default()
    };
    let fx = fixtures::implication(options);
    let mut matcher = AxiomMatcher::new(&fx.network, AxiomId::new(0));
    let mut queue = RuleQueue::new();

    matcher.arrive(&fx.network, &fx.domain, &fx.fact("p", &["a"]), 1, &mut queue);
    assert!(!queue.has_ready());
    assert!(matcher.has_pending());

    assert!(matcher.pull(&fx.network, &fx.domain, &mut queue));
    assert!(!matcher.has_pending());
    assert_eq!(queue.ready(), 1);
    assert!(!matcher.pull(&fx.network, &fx.domain, &mut queue));
}

#[test]
fn test_seed() {
    use crate::matching::NetworkOptions;
    use crate::theory::Axiom;
    use crate::theory::Theory;
    use crate::unification::Atom;

    let mut theory = Theory::new();
    let p = theory.add_predicate("p", 0).expect("ok");
    theory
        .add_axiom(Axiom::fact(vec![Atom::new(p, vec![])]))
        .expect("ok");
    let fx = fixtures::Fixture::new(theory, NetworkOptions::default());

    let mut matcher = AxiomMatcher::new(&fx.network, AxiomId::new(0));
    let mut queue = RuleQueue::new();
    matcher.seed(&fx.network, &fx.domain, &mut queue);
    matcher.seed(&fx.network, &fx.domain, &mut queue);
    assert_eq!(queue.len(), 1);
}
