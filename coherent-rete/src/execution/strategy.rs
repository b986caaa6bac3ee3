//! The strategy decides which ready rule instance to apply next.
//! Instances fall in three tiers:
//!
//! 1. instances of facts and goals (including any axiom with an
//!    empty consequent): they either cost nothing or close the
//!    branch, so they always go first, closing ones before facts;
//! 2. definite instances, which never split the search;
//! 3. everything else, i.e., disjunctive or existential instances.
//!
//! Within tiers 2 and 3, we pick the axiom with the minimum weight
//! $$-((now - oldest) + (now - last)) \cdot jitter,$$ where `oldest` is
//! the step of the oldest ready instance of the axiom, `last` is the
//! last time we applied that axiom, and the jitter is drawn in
//! $$[1, 1.1)$$ from a seeded generator.  The longer an axiom waits,
//! the lower its weight, so no axiom that stays ready is starved.
//! An axiom whose queue turns out empty (e.g., a guard retracted its
//! last instance) gets an infinite weight, and we retry with the
//! remaining candidates.
use super::queue::PopOrder;
use super::queue::QueueSet;
use super::queue::RuleInstance;
use crate::config::StrategyKind;
use crate::ground::Step;
use crate::theory::AxiomId;
use crate::theory::AxiomKind;
use crate::theory::Theory;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Tier {
    Closing,
    Fact,
    Definite,
    Branching,
}

/// How far down the tiers `select` may go.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Reach {
    /// Only instances that never split the search.
    Definite,
    /// Any instance.
    All,
}

#[derive(Clone, Debug)]
pub struct Strategy {
    kind: StrategyKind,
    tiers: Vec<Tier>,
    last_applied: Vec<Step>,
    rng: StdRng,
}

impl Strategy {
    #[must_use]
    pub fn new(theory: &Theory, kind: StrategyKind, seed: u64) -> Self {
        let tiers = theory
            .axioms()
            .iter()
            .map(|axiom| {
                if axiom.is_closing() {
                    Tier::Closing
                } else if axiom.kind() == AxiomKind::Fact {
                    Tier::Fact
                } else if axiom.is_definite() {
                    Tier::Definite
                } else {
                    Tier::Branching
                }
            })
            .collect::<Vec<_>>();

        Self {
            kind,
            last_applied: vec![0; tiers.len()],
            tiers,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn order(&self) -> PopOrder {
        match self.kind {
            StrategyKind::AgingWeighted => PopOrder::Fifo,
            StrategyKind::StackCompatible => PopOrder::Lifo,
        }
    }

    /// Records that an instance of `axiom` was applied at `step`.
    pub fn applied(&mut self, axiom: AxiomId, step: Step) {
        self.last_applied[axiom.index()] = step;
    }

    #[must_use]
    pub fn last_applied(&self, axiom: AxiomId) -> Step {
        self.last_applied[axiom.index()]
    }

    /// Returns the weight of an axiom whose oldest ready instance
    /// was derived at `oldest`, without jitter.  Lower is better.
    #[must_use]
    pub fn base_weight(&self, axiom: AxiomId, oldest: Step, now: Step) -> f64 {
        let age = now.saturating_sub(oldest) + now.saturating_sub(self.last_applied(axiom));
        -((age + 1) as f64)
    }

    fn axioms_in(&self, tier: Tier) -> impl Iterator<Item = AxiomId> + '_ {
        self.tiers
            .iter()
            .enumerate()
            .filter(move |(_, t)| **t == tier)
            .map(|(index, _)| AxiomId::new(index as u32))
    }

    fn first_ready<Q: QueueSet>(&self, queues: &mut Q, tier: Tier) -> Option<RuleInstance> {
        let order = self.order();
        let axioms: Vec<AxiomId> = self.axioms_in(tier).collect();

        axioms
            .into_iter()
            .find_map(|axiom| queues.with_queue(axiom, |queue| queue.pop(order)))
    }

    fn weighted<Q: QueueSet>(&mut self, queues: &mut Q, tier: Tier, now: Step) -> Option<RuleInstance> {
        let candidates: Vec<AxiomId> = self.axioms_in(tier).collect();
        let mut weights = Vec::with_capacity(candidates.len());
        for axiom in candidates {
            if let Some(oldest) = queues.with_queue(axiom, |queue| queue.oldest_timestamp()) {
                let jitter: f64 = self.rng.gen_range(1.0..1.1);
                weights.push((self.base_weight(axiom, oldest, now) * jitter, axiom));
            }
        }

        let order = self.order();
        loop {
            let (index, _) = weights
                .iter()
                .enumerate()
                .filter(|(_, (weight, _))| weight.is_finite())
                .min_by(|(_, (x, _)), (_, (y, _))| x.total_cmp(y))?;

            let axiom = weights[index].1;
            if let Some(instance) = queues.with_queue(axiom, |queue| queue.pop(order)) {
                return Some(instance);
            }

            weights[index].0 = f64::INFINITY;
        }
    }

    /// Pops the next instance to apply, if any is ready within
    /// `reach`.
    pub fn select<Q: QueueSet>(&mut self, queues: &mut Q, now: Step, reach: Reach) -> Option<RuleInstance> {
        debug_assert_eq!(queues.queue_count(), self.tiers.len());

        if let Some(instance) = self.first_ready(queues, Tier::Closing) {
            return Some(instance);
        }

        if let Some(instance) = self.first_ready(queues, Tier::Fact) {
            return Some(instance);
        }

        if let Some(instance) = self.weighted(queues, Tier::Definite, now) {
            return Some(instance);
        }

        match reach {
            Reach::Definite => None,
            Reach::All => self.weighted(queues, Tier::Branching, now),
        }
    }
}

#[cfg(test)]
fn fixture() -> Theory {
    use crate::ground::PredicateId;
    use crate::theory::Axiom;
    use crate::theory::Disjunct;
    use crate::unification::Atom;
    use crate::unification::MetaVar;
    use crate::unification::Term;

    let mut theory = Theory::new();
    let p = theory.add_predicate("p", 1).expect("ok");
    let q = theory.add_predicate("q", 1).expect("ok");
    let r = theory.add_predicate("r", 1).expect("ok");
    let a = theory.add_constant("a").expect("ok");
    let x = theory.add_variable("X").expect("ok");
    let atom = |pred: PredicateId, var: MetaVar| Atom::new(pred, vec![Term::from(var)]);

    // 0: fact, 1: definite, 2: disjunctive, 3: disjunctive, 4: goal.
    theory
        .add_axiom(Axiom::fact(vec![Atom::new(p, vec![Term::from(a)])]))
        .expect("ok");
    theory
        .add_axiom(Axiom::new(
            AxiomKind::Normal,
            vec![atom(p, x)],
            vec![Disjunct::conjunction(vec![atom(q, x)])],
        ))
        .expect("ok");
    for _ in 0..2 {
        theory
            .add_axiom(Axiom::new(
                AxiomKind::Normal,
                vec![atom(p, x)],
                vec![
                    Disjunct::conjunction(vec![atom(q, x)]),
                    Disjunct::conjunction(vec![atom(r, x)]),
                ],
            ))
            .expect("ok");
    }
    theory
        .add_axiom(Axiom::goal(vec![atom(r, x)]))
        .expect("ok");
    theory
}

#[cfg(test)]
fn ready(queues: &mut Vec<super::queue::RuleQueue>, axiom: u32, step: Step) {
    use crate::unification::Substitution;

    let mut sub = Substitution::new(1);
    sub.push_timestamp(step);
    queues[axiom as usize].push(RuleInstance::new(AxiomId::new(axiom), sub));
}

#[test]
fn test_tiers() {
    use super::queue::RuleQueue;

    let theory = fixture();
    let mut strategy = Strategy::new(&theory, StrategyKind::AgingWeighted, 0);
    let mut queues = vec![RuleQueue::new(); 5];

    ready(&mut queues, 2, 1);
    ready(&mut queues, 1, 1);
    ready(&mut queues, 0, 0);
    ready(&mut queues, 4, 1);

    let next = |strategy: &mut Strategy, queues: &mut Vec<RuleQueue>, reach| {
        strategy
            .select(queues, 2, reach)
            .map(|instance| instance.axiom().index())
    };

    assert_eq!(next(&mut strategy, &mut queues, Reach::All), Some(4));
    assert_eq!(next(&mut strategy, &mut queues, Reach::All), Some(0));
    assert_eq!(next(&mut strategy, &mut queues, Reach::All), Some(1));
    assert_eq!(next(&mut strategy, &mut queues, Reach::Definite), None);
    assert_eq!(next(&mut strategy, &mut queues, Reach::All), Some(2));
    assert_eq!(next(&mut strategy, &mut queues, Reach::All), None);
}

#[test]
fn test_weight_decreases_with_age() {
    let theory = fixture();
    let mut strategy = Strategy::new(&theory, StrategyKind::AgingWeighted, 0);
    let axiom = AxiomId::new(2);

    strategy.applied(axiom, 10);
    let fresh = strategy.base_weight(axiom, 10, 10);
    let older = strategy.base_weight(axiom, 10, 11);
    let oldest = strategy.base_weight(axiom, 5, 11);
    assert!(older < fresh);
    assert!(oldest < older);
}

#[test]
fn test_fairness() {
    use super::queue::RuleQueue;

    let theory = fixture();
    let mut strategy = Strategy::new(&theory, StrategyKind::AgingWeighted, 42);
    let mut queues = vec![RuleQueue::new(); 5];
    let mut counts = [0usize; 2];

    // Axioms 2 and 3 are always ready: every application makes a
    // new instance of each.
    ready(&mut queues, 2, 0);
    ready(&mut queues, 3, 0);
    for now in 1..=200 {
        let instance = strategy
            .select(&mut queues, now, Reach::All)
            .expect("always ready");
        let axiom = instance.axiom();
        strategy.applied(axiom, now);
        counts[axiom.index() - 2] += 1;
        ready(&mut queues, axiom.index() as u32, now);
    }

    assert!(counts[0] >= 50, "{:?}", counts);
    assert!(counts[1] >= 50, "{:?}", counts);
}

#[test]
fn test_stack_order() {
    use super::queue::RuleQueue;

    let theory = fixture();
    let mut strategy = Strategy::new(&theory, StrategyKind::StackCompatible, 0);
    let mut queues = vec![RuleQueue::new(); 5];

    ready(&mut queues, 3, 1);
    ready(&mut queues, 3, 2);
    assert_eq!(
        strategy
            .select(&mut queues, 3, Reach::All)
            .map(|instance| instance.timestamp()),
        Some(2)
    );
}
