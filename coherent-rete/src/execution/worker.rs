//! A `WorkerPool` runs each axiom's matcher on a dedicated thread.
//! The controller pushes arrivals (and other commands) into one
//! bounded channel per axiom; each worker drains its channel in
//! order, and appends rule instances to its axiom's queue, which the
//! controller shares behind a mutex.
//!
//! Every message sent is counted in a shared in-flight counter, and
//! workers decrement it once a message is fully processed.  When the
//! counter is zero, every channel is empty and every worker is idle,
//! so nothing new can show up in the queues until the controller
//! sends more: that is how `settle` detects quiescence without
//! polling.  Snapshots and restores first settle the pool, so the
//! workers are paused while the controller takes or rewinds marks.
//! A worker that panics records its axiom before it unwinds, and
//! `settle` reports it instead of waiting for messages that will
//! never be processed.
use super::engine::equated;
use super::engine::Engine;
use super::matcher::AxiomMatcher;
use super::matcher::MatcherMark;
use super::queue::QueueMark;
use super::queue::RuleInstance;
use super::queue::RuleQueue;
use super::strategy::Reach;
use super::strategy::Strategy;
use crate::error::Error;
use crate::error::Result;
use crate::ground::Constant;
use crate::ground::Domain;
use crate::ground::DomainMark;
use crate::ground::Fact;
use crate::ground::Step;
use crate::matching::Network;
use crate::theory::AxiomId;
use parking_lot::Condvar;
use parking_lot::Mutex;
use parking_lot::RwLock;
use std::sync::mpsc::sync_channel;
use std::sync::mpsc::Receiver;
use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;
use tracing::debug;
use tracing::trace;

enum Message {
    Arrive(Arc<Fact>, Step),
    Recheck,
    Seed,
    Pull(SyncSender<bool>),
    Snapshot(SyncSender<MatcherMark>),
    Restore(MatcherMark),
    Stop,
}

#[derive(Debug, Default)]
struct Counts {
    in_flight: usize,
    /// First axiom whose worker died while handling a message.
    failed: Option<usize>,
}

/// Counts messages that were sent but not yet fully processed.
#[derive(Debug, Default)]
struct Progress {
    counts: Mutex<Counts>,
    idle: Condvar,
}

impl Progress {
    fn begin(&self) {
        self.counts.lock().in_flight += 1;
    }

    fn done(&self) {
        let mut counts = self.counts.lock();
        debug_assert!(counts.in_flight > 0);
        counts.in_flight -= 1;
        if counts.in_flight == 0 {
            self.idle.notify_all();
        }
    }

    /// Marks `axiom`'s worker as dead; its queued messages are lost.
    fn fail(&self, axiom: usize) {
        let mut counts = self.counts.lock();
        counts.in_flight -= 1;
        counts.failed.get_or_insert(axiom);
        self.idle.notify_all();
    }

    /// Blocks until every message is processed, or returns the axiom
    /// of a dead worker.
    fn wait_idle(&self) -> std::result::Result<(), usize> {
        let mut counts = self.counts.lock();
        loop {
            if let Some(axiom) = counts.failed {
                return Err(axiom);
            }

            if counts.in_flight == 0 {
                return Ok(());
            }

            self.idle.wait(&mut counts);
        }
    }
}

/// Accounts for one message once dropped, including when handling
/// it unwinds.
struct Handling<'a> {
    progress: &'a Progress,
    axiom: usize,
}

impl Drop for Handling<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.progress.fail(self.axiom);
        } else {
            self.progress.done();
        }
    }
}

struct Worker {
    matcher: AxiomMatcher,
    network: Arc<Network>,
    domain: Arc<RwLock<Domain>>,
    queue: Arc<Mutex<RuleQueue>>,
    progress: Arc<Progress>,
}

impl Worker {
    fn run(mut self, receiver: Receiver<Message>) {
        let progress = self.progress.clone();
        let axiom = self.matcher.axiom().index();

        for message in receiver.iter() {
            let _handling = Handling {
                progress: &progress,
                axiom,
            };
            let stop = matches!(message, Message::Stop);
            self.handle(message);

            if stop {
                break;
            }
        }

        trace!(axiom = self.matcher.axiom().index(), "matching worker exits");
    }

    fn handle(&mut self, message: Message) {
        let network = &self.network;

        match message {
            Message::Arrive(fact, step) => {
                let domain = self.domain.read();
                let mut queue = self.queue.lock();
                self.matcher
                    .arrive(network, &domain, &fact, step, &mut queue);
            }
            Message::Recheck => {
                let domain = self.domain.read();
                let mut queue = self.queue.lock();
                self.matcher.recheck(network, &domain, &mut queue);
            }
            Message::Seed => {
                let domain = self.domain.read();
                let mut queue = self.queue.lock();
                self.matcher.seed(network, &domain, &mut queue);
            }
            Message::Pull(reply) => {
                let pulled = {
                    let domain = self.domain.read();
                    let mut queue = self.queue.lock();
                    self.matcher.pull(network, &domain, &mut queue)
                };

                // The controller only drops the receiver when it
                // gives up on the pool.
                let _ = reply.send(pulled);
            }
            Message::Snapshot(reply) => {
                let _ = reply.send(self.matcher.mark());
            }
            Message::Restore(mark) => self.matcher.restore(&mark),
            Message::Stop => {}
        }
    }
}

#[derive(Clone, Debug)]
pub struct PoolMark {
    domain: DomainMark,
    matchers: Vec<MatcherMark>,
    queues: Vec<QueueMark>,
}

pub struct WorkerPool {
    network: Arc<Network>,
    domain: Arc<RwLock<Domain>>,
    queues: Vec<Arc<Mutex<RuleQueue>>>,
    senders: Vec<SyncSender<Message>>,
    handles: Vec<JoinHandle<()>>,
    progress: Arc<Progress>,
}

impl WorkerPool {
    /// Spawns one matching thread per axiom in `network`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Spawn` when a thread cannot be created.
    pub fn new(network: Arc<Network>, domain: Domain, capacity: usize) -> Result<Self> {
        let count = network.axiom_count();
        let domain = Arc::new(RwLock::new(domain));
        let progress = Arc::new(Progress::default());
        let mut pool = WorkerPool {
            network: network.clone(),
            domain: domain.clone(),
            queues: Vec::with_capacity(count),
            senders: Vec::with_capacity(count),
            handles: Vec::with_capacity(count),
            progress: progress.clone(),
        };

        for index in 0..count {
            let axiom = AxiomId::new(index as u32);
            let queue = Arc::new(Mutex::new(RuleQueue::new()));
            let (sender, receiver) = sync_channel(capacity.max(1));
            let worker = Worker {
                matcher: AxiomMatcher::new(&network, axiom),
                network: network.clone(),
                domain: domain.clone(),
                queue: queue.clone(),
                progress: progress.clone(),
            };

            // Dropping `pool` on error stops the threads spawned so far.
            let handle = thread::Builder::new()
                .name(format!("axiom-{}", index))
                .spawn(move || worker.run(receiver))
                .map_err(Error::Spawn)?;

            pool.queues.push(queue);
            pool.senders.push(sender);
            pool.handles.push(handle);
        }

        debug!(workers = count, capacity, "spawned matching workers");
        Ok(pool)
    }

    fn send(&self, axiom: usize, message: Message) -> Result<()> {
        self.progress.begin();
        self.senders[axiom].send(message).map_err(|_| {
            self.progress.done();
            Error::WorkerDisconnected { axiom }
        })
    }

    fn broadcast<F: Fn() -> Message>(&self, message: F) -> Result<()> {
        for axiom in 0..self.senders.len() {
            self.send(axiom, message())?;
        }

        Ok(())
    }

    #[must_use]
    pub fn queue(&self, axiom: AxiomId) -> &Arc<Mutex<RuleQueue>> {
        &self.queues[axiom.index()]
    }
}

impl Engine for WorkerPool {
    type Mark = PoolMark;

    fn network(&self) -> &Arc<Network> {
        &self.network
    }

    fn register(&mut self, constant: Constant) -> Result<()> {
        self.domain.write().register(constant, None);
        Ok(())
    }

    fn seed(&mut self) -> Result<()> {
        self.broadcast(|| Message::Seed)
    }

    fn insert(&mut self, fact: Arc<Fact>, step: Step) -> Result<()> {
        if self.network.merges(fact.predicate()) {
            if let Some((x, y)) = equated(&fact) {
                // Workers must not see the domain change mid-join.
                self.settle()?;
                let merged = self.domain.write().union(x, y, step);
                if merged {
                    debug!(step, x = x.id(), y = y.id(), "merged constants");
                    self.broadcast(|| Message::Recheck)?;
                }
            }
        }

        let network = self.network.clone();
        for axiom in network.subscribers(fact.predicate()) {
            self.send(axiom.index(), Message::Arrive(fact.clone(), step))?;
        }

        Ok(())
    }

    fn with_domain<R, F: FnOnce(&Domain) -> R>(&self, f: F) -> R {
        f(&self.domain.read())
    }

    fn settle(&mut self) -> Result<()> {
        self.progress
            .wait_idle()
            .map_err(|axiom| Error::WorkerDisconnected { axiom })
    }

    fn pull(&mut self) -> Result<bool> {
        let mut replies = Vec::new();
        for axiom in 0..self.senders.len() {
            if self.network.axiom(AxiomId::new(axiom as u32)).deferred() {
                let (reply, receiver) = sync_channel(1);
                self.send(axiom, Message::Pull(reply))?;
                replies.push((axiom, receiver));
            }
        }

        let mut any = false;
        for (axiom, receiver) in replies {
            any |= receiver
                .recv()
                .map_err(|_| Error::WorkerDisconnected { axiom })?;
        }

        Ok(any)
    }

    fn select(&mut self, strategy: &mut Strategy, now: Step, reach: Reach) -> Option<RuleInstance> {
        strategy.select(&mut self.queues, now, reach)
    }

    fn snapshot(&mut self) -> Result<PoolMark> {
        self.settle()?;

        let mut matchers = Vec::with_capacity(self.senders.len());
        for axiom in 0..self.senders.len() {
            let (reply, receiver) = sync_channel(1);
            self.send(axiom, Message::Snapshot(reply))?;
            matchers.push(
                receiver
                    .recv()
                    .map_err(|_| Error::WorkerDisconnected { axiom })?,
            );
        }

        Ok(PoolMark {
            domain: self.domain.read().snapshot(),
            matchers,
            queues: self.queues.iter().map(|queue| queue.lock().mark()).collect(),
        })
    }

    fn restore(&mut self, mark: PoolMark) -> Result<()> {
        self.settle()?;

        for (axiom, matcher) in mark.matchers.into_iter().enumerate() {
            self.send(axiom, Message::Restore(matcher))?;
        }

        self.settle()?;
        for (queue, mark) in self.queues.iter().zip(mark.queues.into_iter()) {
            queue.lock().restore(mark);
        }

        self.domain.write().restore(mark.domain);
        Ok(())
    }

    fn fork(&self) -> Option<Self> {
        None
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for axiom in 0..self.senders.len() {
            let _ = self.send(axiom, Message::Stop);
        }

        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

#[test]
fn test_pool_matches_like_local() {
    use super::engine::LocalEngine;
    use crate::matching::NetworkOptions;
    use crate::theory::Axiom;
    use crate::theory::AxiomKind;
    use crate::theory::Disjunct;
    use crate::theory::Theory;
    use crate::unification::Atom;
    use crate::unification::Term;

    let mut theory = Theory::new();
    let p = theory.add_predicate("p", 1).expect("ok");
    let q = theory.add_predicate("q", 1).expect("ok");
    let a = theory.add_constant("a").expect("ok");
    let b = theory.add_constant("b").expect("ok");
    let x = theory.add_variable("X").expect("ok");
    theory
        .add_axiom(Axiom::new(
            AxiomKind::Normal,
            vec![Atom::new(p, vec![Term::from(x)])],
            vec![Disjunct::conjunction(vec![Atom::new(q, vec![Term::from(x)])])],
        ))
        .expect("ok");

    let network = Arc::new(Network::build(&theory, &NetworkOptions::default()).expect("valid"));
    let mut domain = Domain::new();
    domain.register(a, Some("a".into()));
    domain.register(b, Some("b".into()));

    let mut pool = WorkerPool::new(network.clone(), domain.clone(), 2).expect("spawn");
    let mut local = LocalEngine::new(network, domain);
    let axiom = AxiomId::new(0);

    let facts = vec![
        Arc::new(Fact::new(p, vec![a.into()])),
        Arc::new(Fact::new(p, vec![b.into()])),
        Arc::new(Fact::new(q, vec![a.into()])),
    ];

    let mark = pool.snapshot().expect("snapshot");
    for (step, fact) in facts.iter().enumerate() {
        pool.insert(fact.clone(), step as Step + 1).expect("insert");
        local.insert(fact.clone(), step as Step + 1).expect("insert");
    }

    pool.settle().expect("settle");
    assert_eq!(pool.queue(axiom).lock().ready(), local.queue(axiom).ready());
    assert_eq!(pool.queue(axiom).lock().ready(), 1);

    pool.restore(mark).expect("restore");
    assert_eq!(pool.queue(axiom).lock().len(), 0);

    // Merging a and b through an equality fact retracts the last
    // instance.
    pool.insert(facts[1].clone(), 4).expect("insert");
    pool.insert(facts[2].clone(), 5).expect("insert");
    pool.settle().expect("settle");
    assert_eq!(pool.queue(axiom).lock().ready(), 1);

    let merge = Arc::new(Fact::new(
        crate::ground::PredicateId::EQUALITY,
        vec![a.into(), b.into()],
    ));
    pool.insert(merge, 6).expect("insert");
    pool.settle().expect("settle");
    assert_eq!(pool.queue(axiom).lock().ready(), 0);
    assert!(pool.with_domain(|domain| domain.equal(a, b)));
}

#[cfg(debug_assertions)]
#[test]
fn test_dead_worker_fails_settle() {
    use crate::matching::NetworkOptions;
    use crate::theory::Axiom;
    use crate::theory::AxiomKind;
    use crate::theory::Disjunct;
    use crate::theory::Theory;
    use crate::unification::Atom;
    use crate::unification::Term;

    // One axiom each, with a different number of caches:
    // `p(x) => q(x)` and `p(x, y) & q(y, z) => r(x, z)`.
    let build = |join: bool| {
        let mut theory = Theory::new();
        let arity = if join { 2 } else { 1 };
        let p = theory.add_predicate("p", arity).expect("ok");
        let q = theory.add_predicate("q", arity).expect("ok");
        let x = theory.add_variable("X").expect("ok");
        let y = theory.add_variable("Y").expect("ok");
        let z = theory.add_variable("Z").expect("ok");
        let axiom = if join {
            let r = theory.add_predicate("r", 2).expect("ok");
            Axiom::new(
                AxiomKind::Normal,
                vec![
                    Atom::new(p, vec![Term::from(x), Term::from(y)]),
                    Atom::new(q, vec![Term::from(y), Term::from(z)]),
                ],
                vec![Disjunct::conjunction(vec![Atom::new(
                    r,
                    vec![Term::from(x), Term::from(z)],
                )])],
            )
        } else {
            Axiom::new(
                AxiomKind::Normal,
                vec![Atom::new(p, vec![Term::from(x)])],
                vec![Disjunct::conjunction(vec![Atom::new(q, vec![Term::from(x)])])],
            )
        };
        theory.add_axiom(axiom).expect("ok");
        Arc::new(Network::build(&theory, &NetworkOptions::default()).expect("valid"))
    };

    let mut joins = WorkerPool::new(build(true), Domain::new(), 2).expect("spawn");
    let foreign = joins.snapshot().expect("snapshot");

    // The mark does not fit this pool's matcher, and its worker dies
    // restoring it.
    let mut pool = WorkerPool::new(build(false), Domain::new(), 2).expect("spawn");
    assert!(matches!(
        pool.restore(foreign),
        Err(Error::WorkerDisconnected { axiom: 0 })
    ));
    assert!(matches!(
        pool.settle(),
        Err(Error::WorkerDisconnected { axiom: 0 })
    ));
    assert!(matches!(
        pool.snapshot(),
        Err(Error::WorkerDisconnected { .. })
    ));
}
