//! Deduction is the core of our coherent logic prover: `run` builds
//! the matching network for a theory, and repeatedly applies the rule
//! instance the strategy picks, until every branch is closed by a
//! goal, some branch saturates (a model), or the step budget runs
//! out.
//!
//! Each branch owns an `Engine` (or a view of one): applying a
//! definite instance inserts its consequent in the branch's engine,
//! and the network pushes the new facts to whatever axioms they
//! match.  A disjunctive instance forks one child branch per
//! disjunct.  Children either reuse the parent's engine in sequence,
//! with a snapshot to rewind between siblings, or run concurrently
//! on rayon, each on its own copy of the engine.  The parent is
//! closed iff every child is closed.
//!
//! Steps and witness constants are numbered by counters shared by
//! the whole search, so step numbers totally order the history of
//! every branch, and two branches never introduce the same witness.
use crate::config::ExistentialHandling;
use crate::config::Parallelism;
use crate::config::SearchParameters;
use crate::error::Error;
use crate::error::Result;
use crate::execution::Engine;
use crate::execution::LocalEngine;
use crate::execution::Reach;
use crate::execution::RuleInstance;
use crate::execution::Strategy;
use crate::execution::WorkerPool;
use crate::ground::Constant;
use crate::ground::ConstantCounter;
use crate::ground::Domain;
use crate::ground::Fact;
use crate::ground::GroundTerm;
use crate::ground::Step;
use crate::matching::Network;
use crate::proof::AppliedInstance;
use crate::proof::Closure;
use crate::proof::Model;
use crate::proof::Proof;
use crate::proof::ProofNode;
use crate::proof::SearchResult;
use crate::proof::SearchStats;
use crate::theory::Disjunct;
use crate::theory::Theory;
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::debug;
use tracing::debug_span;
use tracing::info;

/// State shared by every branch of one search.
struct SearchContext<'a> {
    theory: &'a Theory,
    params: &'a SearchParameters,
    steps: AtomicU64,
    constants: ConstantCounter,
    branches: AtomicUsize,
    /// Set once some branch found a model: nothing else can change
    /// the result.
    cancel: AtomicBool,
}

impl<'a> SearchContext<'a> {
    fn new(theory: &'a Theory, params: &'a SearchParameters) -> Self {
        Self {
            theory,
            params,
            steps: AtomicU64::new(0),
            constants: ConstantCounter::starting_at(theory.constant_count() as u32),
            branches: AtomicUsize::new(0),
            cancel: AtomicBool::new(false),
        }
    }

    fn now(&self) -> Step {
        self.steps.load(Ordering::Acquire)
    }

    /// Returns the next step, or `None` once the search has run
    /// `max_steps` steps.  The counter never exceeds `max_steps`.
    fn take_step(&self) -> Option<Step> {
        let max = self.params.max_steps;
        let mut current = self.steps.load(Ordering::Acquire);

        loop {
            if max != 0 && current >= max {
                return None;
            }

            match self.steps.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(current + 1),
                Err(actual) => current = actual,
            }
        }
    }

    fn new_branch(&self) -> usize {
        self.branches.fetch_add(1, Ordering::Relaxed)
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    fn stats(&self) -> SearchStats {
        SearchStats {
            steps: self.now(),
            branches: self.branches.load(Ordering::Relaxed),
            fresh_constants: self.constants.allocated(),
        }
    }
}

/// The facts a branch has derived, deduplicated by identity.
#[derive(Clone, Debug, Default)]
struct FactStore {
    facts: Vec<Arc<Fact>>,
    seen: HashSet<Arc<Fact>>,
}

impl FactStore {
    /// Returns the shared fact if `fact` is new.
    fn insert(&mut self, fact: Fact) -> Option<Arc<Fact>> {
        if self.seen.contains(&fact) {
            return None;
        }

        let fact = Arc::new(fact);
        self.seen.insert(fact.clone());
        self.facts.push(fact.clone());
        Some(fact)
    }

    fn model(&self, domain: &Domain) -> Model {
        let mut facts: Vec<Fact> = self
            .facts
            .iter()
            .map(|fact| fact.canonical(domain))
            .collect();
        facts.sort();
        facts.dedup();
        Model { facts }
    }
}

#[derive(Clone, Debug)]
struct BranchState {
    facts: FactStore,
    strategy: Strategy,
}

/// How a branch ended.  When children disagree, the parent reports
/// the highest ranked outcome: `Open`, then `Aborted`, then
/// `Cancelled`, then `Closed`.
#[derive(Debug)]
enum Outcome {
    Closed {
        node: ProofNode,
        history: Vec<AppliedInstance>,
    },
    Open(Model),
    Aborted,
    Cancelled,
}

impl Outcome {
    fn rank(&self) -> u8 {
        match self {
            Outcome::Closed { .. } => 0,
            Outcome::Cancelled => 1,
            Outcome::Aborted => 2,
            Outcome::Open(_) => 3,
        }
    }
}

/// Searches for a refutation of `theory`.
///
/// # Errors
///
/// Returns `Err` for malformed theories, and when the parallel
/// machinery (worker threads, rayon pool) fails.
pub fn run(theory: &Theory, params: &SearchParameters) -> Result<SearchResult> {
    let network = Arc::new(Network::build(theory, &params.network_options())?);
    let mut domain = Domain::new();
    for (constant, name) in theory.constant_names() {
        domain.register(constant, Some(name.clone()));
    }

    let ctx = SearchContext::new(theory, params);
    let state = BranchState {
        facts: FactStore::default(),
        strategy: Strategy::new(theory, params.strategy, params.seed),
    };

    info!(
        axioms = theory.axioms().len(),
        parallelism = ?params.parallelism,
        "starting proof search"
    );
    let outcome = match params.parallelism {
        Parallelism::Sequential => {
            search(&ctx, LocalEngine::new(network, domain), state)?
        }
        Parallelism::AxiomWorkers => {
            let pool = WorkerPool::new(network, domain, params.worker_channel_capacity)?;
            search(&ctx, pool, state)?
        }
        Parallelism::OrParallel => {
            let threads = rayon::ThreadPoolBuilder::new()
                .num_threads(params.thread_count)
                .build()?;
            let engine = LocalEngine::new(network, domain);
            threads.install(|| search(&ctx, engine, state))?
        }
    };

    let stats = ctx.stats();
    let result = match outcome {
        Outcome::Closed { node, history } => SearchResult::Proof {
            proof: Proof::new(node, history),
            stats,
        },
        Outcome::Open(model) => SearchResult::Model { model, stats },
        Outcome::Aborted | Outcome::Cancelled => SearchResult::Aborted {
            steps_run: stats.steps,
            stats,
        },
    };

    info!(
        steps = stats.steps,
        branches = stats.branches,
        proof = result.proof().is_some(),
        model = result.model().is_some(),
        "proof search done"
    );
    Ok(result)
}

fn search<E: Engine + Send>(ctx: &SearchContext, mut engine: E, mut state: BranchState) -> Result<Outcome> {
    engine.seed()?;
    let root = ProofNode::new(ctx.new_branch(), None);
    explore(ctx, &mut engine, &mut state, root, 0)
}

/// Returns the next instance to apply.  Instances that never split
/// the search are taken as soon as they show up; anything else waits
/// for the engine to settle, and `None` means the branch is
/// saturated.
fn next_instance<E: Engine>(engine: &mut E, strategy: &mut Strategy, now: Step) -> Result<Option<RuleInstance>> {
    if let Some(instance) = engine.select(strategy, now, Reach::Definite) {
        return Ok(Some(instance));
    }

    loop {
        engine.settle()?;
        if let Some(instance) = engine.select(strategy, now, Reach::All) {
            return Ok(Some(instance));
        }

        if !engine.pull()? {
            return Ok(None);
        }
    }
}

/// Binds fresh witnesses for `disjunct`'s existentials, and inserts
/// its facts, timestamped `step`.  Returns the new facts and
/// witnesses.
fn introduce<E: Engine>(
    ctx: &SearchContext,
    engine: &mut E,
    state: &mut BranchState,
    instance: &RuleInstance,
    disjunct: &Disjunct,
    step: Step,
) -> Result<(Vec<Fact>, Vec<Constant>)> {
    let mut substitution = instance.substitution().clone();
    let mut fresh = Vec::with_capacity(disjunct.existentials().len());

    match ctx.params.existential_handling {
        ExistentialHandling::Skolem => {
            for var in disjunct.existentials() {
                let constant = ctx.constants.fresh();
                engine.register(constant)?;
                let bound = engine.with_domain(|domain| {
                    substitution.bind(*var, &GroundTerm::from(constant), domain)
                });
                debug_assert!(bound);
                debug!(step, constant = constant.id(), "fresh witness");
                fresh.push(constant);
            }
        }
    }

    let mut derived = Vec::with_capacity(disjunct.atoms().len());
    for atom in disjunct.atoms() {
        let fact = atom
            .instantiate(&substitution)
            .map_err(|reason| Error::configuration(instance.axiom().index(), reason))?;
        if let Some(fact) = state.facts.insert(fact) {
            derived.push((*fact).clone());
            engine.insert(fact, step)?;
        }
    }

    Ok((derived, fresh))
}

fn explore<E: Engine + Send>(
    ctx: &SearchContext,
    engine: &mut E,
    state: &mut BranchState,
    mut node: ProofNode,
    depth: usize,
) -> Result<Outcome> {
    let span = debug_span!("branch", id = node.id, depth);
    let _entered = span.enter();
    let mut history = Vec::new();

    loop {
        if ctx.cancelled() {
            return Ok(Outcome::Cancelled);
        }

        let instance = match next_instance(engine, &mut state.strategy, ctx.now())? {
            Some(instance) => instance,
            None => {
                debug!(facts = state.facts.facts.len(), "branch saturated");
                ctx.cancel.store(true, Ordering::Release);
                return Ok(Outcome::Open(
                    engine.with_domain(|domain| state.facts.model(domain)),
                ));
            }
        };

        let axiom = ctx.theory.axiom(instance.axiom());
        if axiom.is_closing() {
            debug!(axiom = instance.axiom().index(), "branch closed");
            node.closed_by = Some(Closure::new(&instance));
            return Ok(Outcome::Closed { node, history });
        }

        let step = match ctx.take_step() {
            Some(step) => step,
            None => {
                debug!("out of steps");
                return Ok(Outcome::Aborted);
            }
        };

        state.strategy.applied(instance.axiom(), step);
        node.steps.push(step);

        if let [disjunct] = axiom.right() {
            let mut applied = AppliedInstance::new(step, &instance, Some(0));
            let (derived, fresh) = introduce(ctx, engine, state, &instance, disjunct, step)?;
            debug!(
                step,
                axiom = instance.axiom().index(),
                derived = derived.len(),
                "applied rule instance"
            );
            applied.derived = derived;
            applied.fresh = fresh;
            history.push(applied);
            continue;
        }

        debug!(
            step,
            axiom = instance.axiom().index(),
            disjuncts = axiom.right().len(),
            "forking"
        );
        history.push(AppliedInstance::new(step, &instance, None));
        node.fork = Some(step);
        let outcomes = fork(ctx, engine, state, &instance, step, depth)?;
        return Ok(join(node, history, outcomes));
    }
}

/// Runs the child branch that assumes disjunct `index` of
/// `instance`.
fn child<E: Engine + Send>(
    ctx: &SearchContext,
    engine: &mut E,
    state: &mut BranchState,
    instance: &RuleInstance,
    index: usize,
    step: Step,
    depth: usize,
) -> Result<Outcome> {
    let mut node = ProofNode::new(ctx.new_branch(), Some(index));
    let disjunct = &ctx.theory.axiom(instance.axiom()).right()[index];
    let (introduced, fresh) = introduce(ctx, engine, state, instance, disjunct, step)?;

    node.introduced = introduced;
    node.fresh = fresh;
    explore(ctx, engine, state, node, depth)
}

fn fork<E: Engine + Send>(
    ctx: &SearchContext,
    engine: &mut E,
    state: &BranchState,
    instance: &RuleInstance,
    step: Step,
    depth: usize,
) -> Result<Vec<Outcome>> {
    let count = ctx.theory.axiom(instance.axiom()).right().len();

    if ctx.params.parallelism == Parallelism::OrParallel {
        let children: Option<Vec<_>> = (0..count)
            .map(|index| engine.fork().map(|engine| (index, engine, state.clone())))
            .collect();

        if let Some(children) = children {
            return children
                .into_par_iter()
                .map(|(index, mut engine, mut state)| {
                    child(ctx, &mut engine, &mut state, instance, index, step, depth + 1)
                })
                .collect();
        }
    }

    let mark = engine.snapshot()?;
    let mut outcomes = Vec::with_capacity(count);
    for index in 0..count {
        let mut state = state.clone();
        let outcome = child(ctx, engine, &mut state, instance, index, step, depth + 1)?;
        engine.restore(mark.clone())?;

        let closed = matches!(outcome, Outcome::Closed { .. });
        outcomes.push(outcome);
        // The parent cannot be closed anymore.
        if !closed {
            break;
        }
    }

    Ok(outcomes)
}

/// Combines the outcomes of a fork's children into the parent's.
fn join(mut node: ProofNode, mut history: Vec<AppliedInstance>, outcomes: Vec<Outcome>) -> Outcome {
    let mut worst: Option<Outcome> = None;

    for outcome in outcomes {
        match outcome {
            Outcome::Closed {
                node: child,
                history: steps,
            } => {
                node.children.push(child);
                history.extend(steps);
            }
            other => {
                if worst.as_ref().map_or(true, |worst| other.rank() > worst.rank()) {
                    worst = Some(other);
                }
            }
        }
    }

    worst.unwrap_or(Outcome::Closed { node, history })
}

#[cfg(test)]
mod fixtures {
    use crate::theory::Axiom;
    use crate::theory::AxiomKind;
    use crate::theory::Disjunct;
    use crate::theory::Theory;
    use crate::unification::Atom;
    use crate::unification::Term;
    use std::collections::BTreeSet;

    /// Fact `P(a)`; `P(x) => Q(x)`; goal `Q(x)`.
    pub fn implication() -> Theory {
        let mut theory = Theory::new();
        let p = theory.add_predicate("P", 1).expect("ok");
        let q = theory.add_predicate("Q", 1).expect("ok");
        let a = theory.add_constant("a").expect("ok");
        let x = theory.add_variable("x").expect("ok");

        theory
            .add_axiom(Axiom::fact(vec![Atom::new(p, vec![Term::from(a)])]))
            .expect("ok");
        theory
            .add_axiom(Axiom::new(
                AxiomKind::Normal,
                vec![Atom::new(p, vec![Term::from(x)])],
                vec![Disjunct::conjunction(vec![Atom::new(q, vec![Term::from(x)])])],
            ))
            .expect("ok");
        theory
            .add_axiom(Axiom::goal(vec![Atom::new(q, vec![Term::from(x)])]))
            .expect("ok");
        theory
    }

    /// Fact `P(a)`; `P(x) => Q(x) | R(x)`; goals `Q(x)` and `R(x)`.
    /// Without the second goal, the `R` branch saturates.
    pub fn case_split(close_right: bool) -> Theory {
        let mut theory = Theory::new();
        let p = theory.add_predicate("P", 1).expect("ok");
        let q = theory.add_predicate("Q", 1).expect("ok");
        let r = theory.add_predicate("R", 1).expect("ok");
        let a = theory.add_constant("a").expect("ok");
        let x = theory.add_variable("x").expect("ok");
        let atom = |predicate| Atom::new(predicate, vec![Term::from(x)]);

        theory
            .add_axiom(Axiom::fact(vec![Atom::new(p, vec![Term::from(a)])]))
            .expect("ok");
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
        theory.add_axiom(Axiom::goal(vec![atom(q)])).expect("ok");
        if close_right {
            theory.add_axiom(Axiom::goal(vec![atom(r)])).expect("ok");
        }

        theory
    }

    /// Fact `N(z)`; `N(x) => exists y: S(x, y) & N(y)`: never
    /// saturates.
    pub fn successors() -> Theory {
        let mut theory = Theory::new();
        let n = theory.add_predicate("N", 1).expect("ok");
        let s = theory.add_predicate("S", 2).expect("ok");
        let z = theory.add_constant("z").expect("ok");
        let x = theory.add_variable("x").expect("ok");
        let y = theory.add_variable("y").expect("ok");

        theory
            .add_axiom(Axiom::fact(vec![Atom::new(n, vec![Term::from(z)])]))
            .expect("ok");
        theory
            .add_axiom(Axiom::new(
                AxiomKind::Normal,
                vec![Atom::new(n, vec![Term::from(x)])],
                vec![Disjunct::new(
                    vec![y].into_iter().collect::<BTreeSet<_>>(),
                    vec![
                        Atom::new(s, vec![Term::from(x), Term::from(y)]),
                        Atom::new(n, vec![Term::from(y)]),
                    ],
                )],
            ))
            .expect("ok");
        theory
    }

    /// Facts `P(a)`, `P(b)`, `a = b`; `P(x) => exists y: Q(x, y)`.
    /// Once `a` and `b` are merged, one witness suffices.
    pub fn merged() -> Theory {
        let mut theory = Theory::new();
        let p = theory.add_predicate("P", 1).expect("ok");
        let q = theory.add_predicate("Q", 2).expect("ok");
        let eq = theory.predicate("=").expect("builtin");
        let a = theory.add_constant("a").expect("ok");
        let b = theory.add_constant("b").expect("ok");
        let x = theory.add_variable("x").expect("ok");
        let y = theory.add_variable("y").expect("ok");

        theory
            .add_axiom(Axiom::fact(vec![
                Atom::new(eq, vec![Term::from(a), Term::from(b)]),
                Atom::new(p, vec![Term::from(a)]),
                Atom::new(p, vec![Term::from(b)]),
            ]))
            .expect("ok");
        theory
            .add_axiom(Axiom::new(
                AxiomKind::Normal,
                vec![Atom::new(p, vec![Term::from(x)])],
                vec![Disjunct::new(
                    vec![y].into_iter().collect::<BTreeSet<_>>(),
                    vec![Atom::new(q, vec![Term::from(x), Term::from(y)])],
                )],
            ))
            .expect("ok");
        theory
    }
}

#[cfg(test)]
fn all_modes() -> Vec<SearchParameters> {
    vec![
        SearchParameters::default(),
        SearchParameters::default().with_parallelism(Parallelism::AxiomWorkers),
        SearchParameters::default()
            .with_parallelism(Parallelism::OrParallel)
            .with_thread_count(2),
        SearchParameters::default().with_lazy_alpha(true),
    ]
}

#[test]
fn test_empty_theory() {
    for params in all_modes() {
        let result = run(&Theory::new(), &params).expect("ok");
        assert_eq!(result.model(), Some(&Model::default()));
        assert_eq!(result.stats().steps, 0);
    }
}

#[test]
fn test_implication() {
    let theory = fixtures::implication();
    let q = theory.predicate("Q").expect("Q");
    let a = theory.constant("a").expect("a");

    for params in all_modes() {
        let result = run(&theory, &params).expect("ok");
        let proof = result.proof().expect("refuted");

        assert_eq!(proof.steps(), 2);
        assert_eq!(result.stats().steps, 2);
        assert_eq!(proof.tree.steps, vec![1, 2]);
        assert!(proof.history.iter().all(|applied| applied.used_in_proof));

        let derived: Vec<Fact> = proof
            .history
            .iter()
            .filter(|applied| applied.axiom.index() == 1)
            .flat_map(|applied| applied.derived.iter().cloned())
            .collect();
        assert_eq!(derived, vec![Fact::new(q, vec![a.into()])]);

        let closure = proof.tree.closed_by.as_ref().expect("closed");
        assert_eq!(closure.axiom.index(), 2);
        assert_eq!(closure.premises, vec![2]);
    }
}

#[test]
fn test_case_split() {
    let theory = fixtures::case_split(true);

    for params in all_modes() {
        let result = run(&theory, &params).expect("ok");
        let proof = result.proof().expect("refuted");

        assert_eq!(proof.tree.fork, Some(2));
        assert_eq!(proof.tree.children.len(), 2);
        assert_eq!(proof.tree.leaves(), 2);
        for (index, child) in proof.tree.children.iter().enumerate() {
            assert_eq!(child.disjunct, Some(index));
            assert_eq!(child.introduced.len(), 1);
            assert_eq!(
                child.closed_by.as_ref().map(|closure| closure.premises.clone()),
                Some(vec![2])
            );
        }

        assert_eq!(result.stats().branches, 3);
        assert!(proof.history.iter().all(|applied| applied.used_in_proof));
    }
}

#[test]
fn test_open_branch() {
    let theory = fixtures::case_split(false);
    let p = theory.predicate("P").expect("P");
    let r = theory.predicate("R").expect("R");
    let a = theory.constant("a").expect("a");

    for params in all_modes() {
        let result = run(&theory, &params).expect("ok");
        let model = result.model().expect("saturated");

        let mut expected = vec![Fact::new(p, vec![a.into()]), Fact::new(r, vec![a.into()])];
        expected.sort();
        assert_eq!(model.facts, expected);
    }
}

#[test]
fn test_step_limit() {
    let theory = fixtures::successors();

    for params in all_modes() {
        let result = run(&theory, &params.with_max_steps(5)).expect("ok");
        match result {
            SearchResult::Aborted { steps_run, stats } => {
                assert_eq!(steps_run, 5);
                assert_eq!(stats.steps, 5);
                assert_eq!(stats.fresh_constants, 4);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}

#[test]
fn test_equality_merges_witnesses() {
    let theory = fixtures::merged();

    for params in all_modes() {
        let result = run(&theory, &params).expect("ok");
        let model = result.model().expect("saturated");

        // P(a), a = b, and a single Q(a, _): once a and b are merged,
        // the guard sees that P(b) already has its witness.
        assert_eq!(model.facts.len(), 3, "{:?}", model);
        assert_eq!(result.stats().fresh_constants, 1);
    }
}

#[test]
fn test_branch_isolation() {
    use crate::theory::AxiomId;

    let theory = fixtures::case_split(true);
    let network = Arc::new(Network::build(&theory, &Default::default()).expect("valid"));
    let mut domain = Domain::new();
    for (constant, name) in theory.constant_names() {
        domain.register(constant, Some(name.clone()));
    }

    let mut engine = LocalEngine::new(network, domain);
    engine.seed().expect("ok");
    let a = theory.constant("a").expect("a");
    let p = theory.predicate("P").expect("P");
    let q = theory.predicate("Q").expect("Q");
    engine
        .insert(Arc::new(Fact::new(p, vec![a.into()])), 1)
        .expect("ok");

    let dump = |engine: &LocalEngine| {
        (0..theory.axioms().len())
            .map(|index| {
                let axiom = AxiomId::new(index as u32);
                format!("{:?} {:?}", engine.matcher(axiom), engine.queue(axiom))
            })
            .collect::<Vec<_>>()
    };

    let before = dump(&engine);
    let mark = engine.snapshot().expect("ok");
    engine
        .insert(Arc::new(Fact::new(q, vec![a.into()])), 2)
        .expect("ok");
    assert_ne!(dump(&engine), before);

    engine.restore(mark).expect("ok");
    assert_eq!(dump(&engine), before);
}

#[test]
fn test_stack_strategy() {
    use crate::config::StrategyKind;

    let params = SearchParameters::default().with_strategy(StrategyKind::StackCompatible);
    let result = run(&fixtures::case_split(true), &params).expect("ok");
    assert!(result.proof().is_some());
}

#[test]
fn test_rejects_malformed() {
    use crate::theory::Axiom;
    use crate::unification::Atom;
    use crate::unification::Term;

    let mut theory = Theory::new();
    let p = theory.add_predicate("P", 1).expect("ok");
    let x = theory.add_variable("x").expect("ok");
    // `x` is unbound in a fact.
    theory
        .add_axiom(Axiom::fact(vec![Atom::new(p, vec![Term::from(x)])]))
        .expect("ok");

    assert!(matches!(
        run(&theory, &SearchParameters::default()),
        Err(Error::Configuration { axiom: 0, .. })
    ));
}

#[test]
fn test_rejects_equality_over_function_terms() {
    use crate::theory::Axiom;
    use crate::theory::AxiomKind;
    use crate::unification::Atom;
    use crate::unification::Term;

    // `P(f(a))`; `P(x) => x = c`; goal `P(c)`: `x` binds `f(a)`.
    let mut theory = Theory::new();
    let p = theory.add_predicate("P", 1).expect("ok");
    let eq = theory.predicate("=").expect("builtin");
    let f = theory.add_function("f", 1).expect("ok");
    let a = theory.add_constant("a").expect("ok");
    let c = theory.add_constant("c").expect("ok");
    let x = theory.add_variable("x").expect("ok");

    theory
        .add_axiom(Axiom::fact(vec![Atom::new(
            p,
            vec![Term::function(f, vec![Term::from(a)])],
        )]))
        .expect("ok");
    theory
        .add_axiom(Axiom::new(
            AxiomKind::Normal,
            vec![Atom::new(p, vec![Term::from(x)])],
            vec![Disjunct::conjunction(vec![Atom::new(
                eq,
                vec![Term::from(x), Term::from(c)],
            )])],
        ))
        .expect("ok");
    theory
        .add_axiom(Axiom::goal(vec![Atom::new(p, vec![Term::from(c)])]))
        .expect("ok");

    for params in all_modes() {
        assert!(matches!(
            run(&theory, &params),
            Err(Error::Configuration { axiom: 1, .. })
        ));
    }
}

#[test]
fn test_equality_on_left() {
    use crate::theory::Axiom;
    use crate::theory::AxiomKind;
    use crate::unification::Atom;
    use crate::unification::Term;

    // `E(a, b)`, `P(a)`; `E(x, y) => x = y`; `x = y & P(x) => Q(y)`;
    // goal `Q(b)`.
    let mut theory = Theory::new();
    let e = theory.add_predicate("E", 2).expect("ok");
    let p = theory.add_predicate("P", 1).expect("ok");
    let q = theory.add_predicate("Q", 1).expect("ok");
    let eq = theory.predicate("=").expect("builtin");
    let a = theory.add_constant("a").expect("ok");
    let b = theory.add_constant("b").expect("ok");
    let x = theory.add_variable("x").expect("ok");
    let y = theory.add_variable("y").expect("ok");
    let pair = |predicate| Atom::new(predicate, vec![Term::from(x), Term::from(y)]);

    theory
        .add_axiom(Axiom::fact(vec![
            Atom::new(e, vec![Term::from(a), Term::from(b)]),
            Atom::new(p, vec![Term::from(a)]),
        ]))
        .expect("ok");
    theory
        .add_axiom(Axiom::new(
            AxiomKind::Normal,
            vec![pair(e)],
            vec![Disjunct::conjunction(vec![pair(eq)])],
        ))
        .expect("ok");
    theory
        .add_axiom(Axiom::new(
            AxiomKind::Normal,
            vec![pair(eq), Atom::new(p, vec![Term::from(x)])],
            vec![Disjunct::conjunction(vec![Atom::new(q, vec![Term::from(y)])])],
        ))
        .expect("ok");
    theory
        .add_axiom(Axiom::goal(vec![Atom::new(q, vec![Term::from(b)])]))
        .expect("ok");

    for params in all_modes() {
        let result = run(&theory, &params).expect("ok");
        let proof = result.proof().expect("refuted");
        let closure = proof.tree.closed_by.as_ref().expect("closed");
        assert_eq!(closure.axiom.index(), 3);
        assert!(proof
            .history
            .iter()
            .any(|applied| applied.axiom.index() == 2 && applied.used_in_proof));
    }
}
