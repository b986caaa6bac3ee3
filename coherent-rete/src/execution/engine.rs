//! An `Engine` owns everything that changes while a branch runs: the
//! union-find domain, every axiom's matcher, and the rule queues.
//! The controller only talks to engines, so that the same search
//! code drives a single-threaded engine and a pool of matching
//! workers.
use super::matcher::AxiomMatcher;
use super::matcher::MatcherMark;
use super::queue::QueueMark;
use super::queue::RuleInstance;
use super::queue::RuleQueue;
use super::strategy::Reach;
use super::strategy::Strategy;
use crate::error::Result;
use crate::ground::Constant;
use crate::ground::Domain;
use crate::ground::DomainMark;
use crate::ground::Fact;
use crate::ground::Step;
use crate::matching::Network;
use crate::theory::AxiomId;
use std::sync::Arc;
use tracing::debug;

pub trait Engine: Sized {
    /// Everything `restore` needs to rewind to a `snapshot`.
    type Mark: Clone;

    fn network(&self) -> &Arc<Network>;

    /// Adds `constant` to the domain as its own class.
    ///
    /// # Errors
    ///
    /// Returns `Err` when a matching worker is gone.
    fn register(&mut self, constant: Constant) -> Result<()>;

    /// Feeds the empty substitution to axioms without left-hand side.
    ///
    /// # Errors
    ///
    /// Returns `Err` when a matching worker is gone.
    fn seed(&mut self) -> Result<()>;

    /// Inserts a fact derived at `step`.  Equality facts also merge
    /// their arguments, and recheck every axiom.
    ///
    /// # Errors
    ///
    /// Returns `Err` when a matching worker is gone.
    fn insert(&mut self, fact: Arc<Fact>, step: Step) -> Result<()>;

    fn with_domain<R, F: FnOnce(&Domain) -> R>(&self, f: F) -> R;

    /// Blocks until every fact inserted so far has been propagated.
    ///
    /// # Errors
    ///
    /// Returns `Err` when a matching worker is gone.
    fn settle(&mut self) -> Result<()>;

    /// Forwards substitutions held back by lazy alpha chains.
    /// Returns whether there was any.
    ///
    /// # Errors
    ///
    /// Returns `Err` when a matching worker is gone.
    fn pull(&mut self) -> Result<bool>;

    fn select(&mut self, strategy: &mut Strategy, now: Step, reach: Reach) -> Option<RuleInstance>;

    /// # Errors
    ///
    /// Returns `Err` when a matching worker is gone.
    fn snapshot(&mut self) -> Result<Self::Mark>;

    /// # Errors
    ///
    /// Returns `Err` when a matching worker is gone.
    fn restore(&mut self, mark: Self::Mark) -> Result<()>;

    /// Returns an independent copy of the engine, for engines that
    /// can be copied.
    fn fork(&self) -> Option<Self>;
}

/// Returns the two constants an equality fact merges.
#[must_use]
pub fn equated(fact: &Fact) -> Option<(Constant, Constant)> {
    if !fact.predicate().is_equality() {
        return None;
    }

    match fact.args() {
        [x, y] => Some((x.as_constant()?, y.as_constant()?)),
        _ => None,
    }
}

#[derive(Clone, Debug)]
pub struct LocalMark {
    domain: DomainMark,
    matchers: Vec<MatcherMark>,
    queues: Vec<QueueMark>,
}

/// Runs all the matching on the calling thread.
#[derive(Clone, Debug)]
pub struct LocalEngine {
    network: Arc<Network>,
    domain: Domain,
    matchers: Vec<AxiomMatcher>,
    queues: Vec<RuleQueue>,
}

impl LocalEngine {
    #[must_use]
    pub fn new(network: Arc<Network>, domain: Domain) -> Self {
        let count = network.axiom_count();
        let matchers = (0..count)
            .map(|index| AxiomMatcher::new(&network, AxiomId::new(index as u32)))
            .collect();

        Self {
            network,
            domain,
            matchers,
            queues: vec![RuleQueue::new(); count],
        }
    }

    #[must_use]
    pub fn matcher(&self, axiom: AxiomId) -> &AxiomMatcher {
        &self.matchers[axiom.index()]
    }

    #[must_use]
    pub fn queue(&self, axiom: AxiomId) -> &RuleQueue {
        &self.queues[axiom.index()]
    }
}

impl Engine for LocalEngine {
    type Mark = LocalMark;

    fn network(&self) -> &Arc<Network> {
        &self.network
    }

    fn register(&mut self, constant: Constant) -> Result<()> {
        self.domain.register(constant, None);
        Ok(())
    }

    fn seed(&mut self) -> Result<()> {
        for (matcher, queue) in self.matchers.iter_mut().zip(self.queues.iter_mut()) {
            matcher.seed(&self.network, &self.domain, queue);
        }

        Ok(())
    }

    fn insert(&mut self, fact: Arc<Fact>, step: Step) -> Result<()> {
        let network = &self.network;

        if network.merges(fact.predicate()) {
            if let Some((x, y)) = equated(&fact) {
                if self.domain.union(x, y, step) {
                    debug!(step, x = x.id(), y = y.id(), "merged constants");
                    for (matcher, queue) in self.matchers.iter_mut().zip(self.queues.iter_mut()) {
                        matcher.recheck(network, &self.domain, queue);
                    }
                }
            }
        }

        for axiom in network.subscribers(fact.predicate()) {
            self.matchers[axiom.index()].arrive(
                network,
                &self.domain,
                &fact,
                step,
                &mut self.queues[axiom.index()],
            );
        }

        Ok(())
    }

    fn with_domain<R, F: FnOnce(&Domain) -> R>(&self, f: F) -> R {
        f(&self.domain)
    }

    fn settle(&mut self) -> Result<()> {
        Ok(())
    }

    fn pull(&mut self) -> Result<bool> {
        let mut any = false;
        for (matcher, queue) in self.matchers.iter_mut().zip(self.queues.iter_mut()) {
            any |= matcher.pull(&self.network, &self.domain, queue);
        }

        Ok(any)
    }

    fn select(&mut self, strategy: &mut Strategy, now: Step, reach: Reach) -> Option<RuleInstance> {
        strategy.select(&mut self.queues, now, reach)
    }

    fn snapshot(&mut self) -> Result<LocalMark> {
        Ok(LocalMark {
            domain: self.domain.snapshot(),
            matchers: self.matchers.iter().map(AxiomMatcher::mark).collect(),
            queues: self.queues.iter().map(RuleQueue::mark).collect(),
        })
    }

    fn restore(&mut self, mark: LocalMark) -> Result<()> {
        self.domain.restore(mark.domain);
        for (matcher, mark) in self.matchers.iter_mut().zip(mark.matchers.iter()) {
            matcher.restore(mark);
        }

        for (queue, mark) in self.queues.iter_mut().zip(mark.queues.into_iter()) {
            queue.restore(mark);
        }

        Ok(())
    }

    fn fork(&self) -> Option<Self> {
        Some(self.clone())
    }
}

#[test]
fn test_equated() {
    use crate::ground::GroundTerm;
    use crate::ground::PredicateId;

    let a = Constant::new(0);
    let b = Constant::new(1);
    let eq = Fact::new(PredicateId::EQUALITY, vec![a.into(), b.into()]);
    assert_eq!(equated(&eq), Some((a, b)));

    let other = Fact::new(PredicateId::new(1), vec![a.into(), b.into()]);
    assert_eq!(equated(&other), None);

    let function = Fact::new(
        PredicateId::EQUALITY,
        vec![a.into(), GroundTerm::function(crate::ground::FunctionId::new(0), vec![b.into()])],
    );
    assert_eq!(equated(&function), None);
}
