//! `coherent-rete` is the matching and proof search core of a small
//! forward-chaining prover for coherent logic.  A parser hands us a
//! resolved `Theory`; `run` either refutes it (a `Proof` tree closed
//! by goal axioms), saturates a branch (a `Model`), or gives up after
//! `max_steps` rule applications.
//!
//! Matching is incremental: a RETE network, built once per theory,
//! pushes each new fact through per-axiom caches and joins, and only
//! emits the rule instances that fact newly enables.  Negation guards
//! keep instances whose consequent already holds out of the queues,
//! and equality facts merge domain elements in a union-find that
//! every comparison sees through.
pub mod config;
pub mod deduce;
pub mod error;
pub mod execution;
pub mod ground;
pub mod matching;
pub mod proof;
pub mod theory;
pub mod unification;

pub use config::Parallelism;
pub use config::SearchParameters;
pub use config::StrategyKind;
pub use deduce::run;
pub use error::Error;
pub use error::Result;
pub use proof::Model;
pub use proof::Proof;
pub use proof::SearchResult;
pub use theory::Axiom;
pub use theory::AxiomKind;
pub use theory::Disjunct;
pub use theory::Theory;
