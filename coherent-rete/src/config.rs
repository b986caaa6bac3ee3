//! Search parameters.  Every field has a default, so callers (and
//! JSON configuration files) only need to mention what they change.
use crate::error::Error;
use crate::error::Result;
use crate::matching::NetworkOptions;
use serde::Deserialize;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Weighs axioms by how long their instances have been waiting.
    AgingWeighted,
    /// Same tiers, but each queue pops its most recent instance
    /// first (depth-first).
    StackCompatible,
}

/// What to do with existentially bound variables when a disjunct is
/// applied.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExistentialHandling {
    /// One fresh constant per variable and application.
    Skolem,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Parallelism {
    /// Everything on the calling thread.
    Sequential,
    /// One matching thread per axiom; branches are explored in
    /// sequence, with backtracking.
    AxiomWorkers,
    /// Branches run concurrently on a rayon pool, each with its own
    /// copy of the matching state.
    OrParallel,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchParameters {
    /// Maximum number of applied rule instances; 0 for no limit.
    pub max_steps: u64,
    pub strategy: StrategyKind,
    pub use_negation_guard: bool,
    /// Only guard disjuncts with at most that many atoms; 0 for no
    /// limit.
    pub negation_guard_max_conjuncts: usize,
    pub existential_handling: ExistentialHandling,
    pub parallelism: Parallelism,
    /// Size of the or-parallel pool; 0 lets rayon decide.
    pub thread_count: usize,
    pub lazy_alpha: bool,
    /// Seeds the strategy's jitter.
    pub seed: u64,
    /// Capacity of each matching worker's arrival channel.
    pub worker_channel_capacity: usize,
}

impl Default for SearchParameters {
    fn default() -> Self {
        Self {
            max_steps: 0,
            strategy: StrategyKind::AgingWeighted,
            use_negation_guard: true,
            negation_guard_max_conjuncts: 0,
            existential_handling: ExistentialHandling::Skolem,
            parallelism: Parallelism::Sequential,
            thread_count: 0,
            lazy_alpha: false,
            seed: 0,
            worker_channel_capacity: 1024,
        }
    }
}

impl SearchParameters {
    /// Parses parameters from JSON; missing fields take their
    /// default value.
    ///
    /// # Errors
    ///
    /// Returns `Error::Parameters` on malformed JSON or unknown fields.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Error::Parameters)
    }

    #[must_use]
    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_negation_guard(mut self, enabled: bool) -> Self {
        self.use_negation_guard = enabled;
        self
    }

    #[must_use]
    pub fn with_negation_guard_max_conjuncts(mut self, max: usize) -> Self {
        self.negation_guard_max_conjuncts = max;
        self
    }

    #[must_use]
    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    #[must_use]
    pub fn with_thread_count(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count;
        self
    }

    #[must_use]
    pub fn with_lazy_alpha(mut self, lazy: bool) -> Self {
        self.lazy_alpha = lazy;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_worker_channel_capacity(mut self, capacity: usize) -> Self {
        self.worker_channel_capacity = capacity;
        self
    }

    /// Returns the subset of parameters that shape the network.
    #[must_use]
    pub fn network_options(&self) -> NetworkOptions {
        NetworkOptions {
            use_negation_guard: self.use_negation_guard,
            negation_guard_max_conjuncts: self.negation_guard_max_conjuncts,
            lazy_alpha: self.lazy_alpha,
        }
    }
}

#[test]
fn test_defaults() {
    let params = SearchParameters::default();
    assert_eq!(params.max_steps, 0);
    assert_eq!(params.strategy, StrategyKind::AgingWeighted);
    assert!(params.use_negation_guard);
    assert_eq!(params.parallelism, Parallelism::Sequential);
    assert_eq!(params.worker_channel_capacity, 1024);
    assert_eq!(params.network_options(), NetworkOptions::default());
}

#[test]
fn test_from_json() {
    let params = SearchParameters::from_json(
        r#"{"max_steps": 10, "strategy": "stack_compatible", "parallelism": "or_parallel"}"#,
    )
    .expect("valid");

    assert_eq!(params.max_steps, 10);
    assert_eq!(params.strategy, StrategyKind::StackCompatible);
    assert_eq!(params.parallelism, Parallelism::OrParallel);
    assert_eq!(params.seed, 0);

    assert!(matches!(
        SearchParameters::from_json(r#"{"max_step": 10}"#),
        Err(Error::Parameters(_))
    ));
}

#[test]
fn test_builders() {
    let params = SearchParameters::default()
        .with_max_steps(3)
        .with_negation_guard(false)
        .with_lazy_alpha(true)
        .with_seed(7);

    assert_eq!(params.max_steps, 3);
    assert_eq!(params.seed, 7);
    let options = params.network_options();
    assert!(!options.use_negation_guard);
    assert!(options.lazy_alpha);
}
