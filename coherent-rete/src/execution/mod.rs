//! The execution layer pushes facts through the static network.  The
//! network itself never changes after construction; everything that
//! does lives here: node caches (with marks for backtracking),
//! per-axiom matchers, rule queues, and the strategy that picks the
//! next rule instance to apply.
//!
//! `Engine` abstracts over where matching runs.  `LocalEngine` does
//! everything on the caller's thread, and can be cloned for
//! or-parallel branches; `WorkerPool` gives each axiom its own thread
//! fed by a bounded channel.
mod cache;
mod engine;
mod matcher;
mod queue;
mod strategy;
mod worker;

pub use cache::CacheMark;
pub use cache::SubstitutionCache;
pub use engine::equated;
pub use engine::Engine;
pub use engine::LocalEngine;
pub use engine::LocalMark;
pub use matcher::AxiomMatcher;
pub use matcher::MatcherMark;
pub use queue::PopOrder;
pub use queue::QueueMark;
pub use queue::QueueSet;
pub use queue::RuleInstance;
pub use queue::RuleQueue;
pub use strategy::Reach;
pub use strategy::Strategy;
pub use worker::PoolMark;
pub use worker::WorkerPool;
