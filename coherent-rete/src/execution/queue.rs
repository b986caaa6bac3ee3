//! Each axiom owns a queue of ready rule instances: matches of its
//! left-hand side that passed every negation guard.  Instances are
//! popped in FIFO order (or most recent first, for the stack
//! compatible strategy), and may be retracted while they wait when a
//! guard learns that their consequent already holds.
//!
//! Popping and retracting never remove anything: both flip a taken
//! flag and log the index, so that backtracking can put instances
//! back where they were.
use crate::ground::Step;
use crate::theory::AxiomId;
use crate::unification::Substitution;
use parking_lot::Mutex;
use std::sync::Arc;

/// A match for an axiom's left-hand side, waiting to be applied.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RuleInstance {
    axiom: AxiomId,
    substitution: Substitution,
    timestamp: Step,
}

impl RuleInstance {
    #[must_use]
    pub fn new(axiom: AxiomId, substitution: Substitution) -> Self {
        let timestamp = substitution.latest();
        Self {
            axiom,
            substitution,
            timestamp,
        }
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn axiom(&self) -> AxiomId {
        self.axiom
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn substitution(&self) -> &Substitution {
        &self.substitution
    }

    /// The latest step this instance depends on.
    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn timestamp(&self) -> Step {
        self.timestamp
    }

    /// Returns the sorted, deduplicated steps this instance was
    /// matched against.
    #[must_use]
    pub fn premises(&self) -> Vec<Step> {
        let mut ret: Vec<Step> = self
            .substitution
            .timestamps()
            .iter()
            .copied()
            .filter(|step| *step > 0)
            .collect();
        ret.sort_unstable();
        ret.dedup();
        ret
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PopOrder {
    Fifo,
    Lifo,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct QueueMark {
    len: usize,
    log: usize,
    head: usize,
    live: usize,
}

#[derive(Clone, Debug, Default)]
pub struct RuleQueue {
    instances: Vec<RuleInstance>,
    taken: Vec<bool>,
    /// Undo log of popped or retracted indices.
    log: Vec<usize>,
    /// Every instance before `head` is taken.
    head: usize,
    live: usize,
}

impl RuleQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `instance`, and returns its index.
    pub fn push(&mut self, instance: RuleInstance) -> usize {
        self.instances.push(instance);
        self.taken.push(false);
        self.live += 1;
        self.instances.len() - 1
    }

    /// Number of instances ever pushed (and not rewound).
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Returns whether some instance is ready to pop.
    #[must_use]
    pub fn has_ready(&self) -> bool {
        self.live > 0
    }

    #[must_use]
    pub fn ready(&self) -> usize {
        self.live
    }

    fn skip_taken(&mut self) {
        while self.head < self.taken.len() && self.taken[self.head] {
            self.head += 1;
        }
    }

    fn take(&mut self, index: usize) {
        debug_assert!(!self.taken[index]);
        self.taken[index] = true;
        self.log.push(index);
        self.live -= 1;
    }

    /// Removes and returns the next ready instance.
    pub fn pop(&mut self, order: PopOrder) -> Option<RuleInstance> {
        if self.live == 0 {
            return None;
        }

        self.skip_taken();
        let index = match order {
            PopOrder::Fifo => self.head,
            PopOrder::Lifo => (self.head..self.taken.len()).rev().find(|i| !self.taken[*i])?,
        };

        self.take(index);
        Some(self.instances[index].clone())
    }

    /// Retracts instance `index` if it is still waiting.  Returns
    /// whether it was.
    pub fn retract(&mut self, index: usize) -> bool {
        if index >= self.taken.len() || self.taken[index] {
            return false;
        }

        self.take(index);
        true
    }

    /// Returns the timestamp of the oldest ready instance.
    #[must_use]
    pub fn oldest_timestamp(&self) -> Option<Step> {
        (self.head..self.taken.len())
            .find(|i| !self.taken[*i])
            .map(|i| self.instances[i].timestamp)
    }

    #[must_use]
    pub fn mark(&self) -> QueueMark {
        QueueMark {
            len: self.instances.len(),
            log: self.log.len(),
            head: self.head,
            live: self.live,
        }
    }

    /// Rewinds to `mark`: instances pushed since are dropped, and
    /// instances taken since are ready again.
    pub fn restore(&mut self, mark: QueueMark) {
        debug_assert!(mark.len <= self.instances.len());
        debug_assert!(mark.log <= self.log.len());

        for index in self.log.drain(mark.log..) {
            if index < self.taken.len() {
                self.taken[index] = false;
            }
        }

        self.instances.truncate(mark.len);
        self.taken.truncate(mark.len);
        self.head = mark.head;
        self.live = mark.live;
        debug_assert_eq!(self.live, self.taken.iter().filter(|x| !**x).count());
    }
}

/// The strategy only needs to peek at and pop from each axiom's
/// queue; sequential engines own their queues, while worker pools
/// share them with the matching threads.
pub trait QueueSet {
    fn queue_count(&self) -> usize;

    fn with_queue<R, F: FnOnce(&mut RuleQueue) -> R>(&mut self, axiom: AxiomId, f: F) -> R;
}

impl QueueSet for Vec<RuleQueue> {
    fn queue_count(&self) -> usize {
        self.len()
    }

    fn with_queue<R, F: FnOnce(&mut RuleQueue) -> R>(&mut self, axiom: AxiomId, f: F) -> R {
        f(&mut self[axiom.index()])
    }
}

impl QueueSet for Vec<Arc<Mutex<RuleQueue>>> {
    fn queue_count(&self) -> usize {
        self.len()
    }

    fn with_queue<R, F: FnOnce(&mut RuleQueue) -> R>(&mut self, axiom: AxiomId, f: F) -> R {
        let mut queue = self[axiom.index()].lock();
        f(&mut queue)
    }
}

#[cfg(test)]
fn instance(step: Step) -> RuleInstance {
    let mut sub = Substitution::new(0);
    sub.push_timestamp(step);
    RuleInstance::new(AxiomId::new(0), sub)
}

#[test]
fn test_fifo() {
    let mut queue = RuleQueue::new();
    assert_eq!(queue.pop(PopOrder::Fifo), None);

    queue.push(instance(1));
    queue.push(instance(2));
    queue.push(instance(3));
    assert_eq!(queue.ready(), 3);
    assert_eq!(queue.oldest_timestamp(), Some(1));

    assert_eq!(queue.pop(PopOrder::Fifo).map(|x| x.timestamp()), Some(1));
    assert!(queue.retract(1));
    assert!(!queue.retract(1));
    assert_eq!(queue.oldest_timestamp(), Some(3));
    assert_eq!(queue.pop(PopOrder::Fifo).map(|x| x.timestamp()), Some(3));
    assert!(!queue.has_ready());
    assert_eq!(queue.oldest_timestamp(), None);
}

#[test]
fn test_lifo() {
    let mut queue = RuleQueue::new();
    queue.push(instance(1));
    queue.push(instance(2));

    assert_eq!(queue.pop(PopOrder::Lifo).map(|x| x.timestamp()), Some(2));
    assert_eq!(queue.pop(PopOrder::Lifo).map(|x| x.timestamp()), Some(1));
    assert_eq!(queue.pop(PopOrder::Lifo), None);
}

#[test]
fn test_restore() {
    let mut queue = RuleQueue::new();
    queue.push(instance(1));
    queue.push(instance(2));
    let mark = queue.mark();

    queue.pop(PopOrder::Fifo);
    queue.push(instance(3));
    queue.retract(1);
    assert_eq!(queue.ready(), 1);

    queue.restore(mark);
    assert_eq!(queue.len(), 2);
    assert_eq!(queue.ready(), 2);
    assert_eq!(queue.pop(PopOrder::Fifo).map(|x| x.timestamp()), Some(1));
}

#[test]
fn test_premises() {
    let mut sub = Substitution::new(0);
    sub.push_timestamp(4);
    sub.push_timestamp(0);
    sub.push_timestamp(2);
    sub.push_timestamp(4);

    let instance = RuleInstance::new(AxiomId::new(1), sub);
    assert_eq!(instance.timestamp(), 4);
    assert_eq!(instance.premises(), vec![2, 4]);
}

#[test]
fn test_shared_queues() {
    let mut queues = vec![Arc::new(Mutex::new(RuleQueue::new()))];
    queues.with_queue(AxiomId::new(0), |queue| queue.push(instance(5)));

    assert_eq!(queues.queue_count(), 1);
    assert_eq!(
        queues.with_queue(AxiomId::new(0), |queue| queue.oldest_timestamp()),
        Some(5)
    );
}
