//! What a search returns.  A refutation is a tree of branches: each
//! fork of a disjunctive rule instance has one child per disjunct,
//! and every leaf is closed by a goal (or other axiom with an empty
//! consequent).  The tree comes with the flat history of every rule
//! instance applied anywhere in it, ordered by step; each entry lists
//! the earlier steps it was matched against, which is all a proof
//! writer needs to justify it.
//!
//! All these types serialise with `serde` as is (with numeric ids);
//! `SearchResult::to_json` renders them with the theory's names
//! instead.
use crate::error::Error;
use crate::error::Result;
use crate::execution::RuleInstance;
use crate::ground::Constant;
use crate::ground::Fact;
use crate::ground::GroundTerm;
use crate::ground::Step;
use crate::theory::AxiomId;
use crate::theory::Theory;
use crate::unification::MetaVar;
use serde::Serialize;
use serde_json::json;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct SearchStats {
    /// Rule instances applied, across all branches.
    pub steps: u64,
    /// Branches created, including the root.
    pub branches: usize,
    pub fresh_constants: u32,
}

fn bindings(instance: &RuleInstance) -> Vec<(MetaVar, GroundTerm)> {
    instance
        .substitution()
        .bound()
        .map(|(var, term)| (var, term.clone()))
        .collect()
}

/// One applied rule instance.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct AppliedInstance {
    pub step: Step,
    pub axiom: AxiomId,
    pub bindings: Vec<(MetaVar, GroundTerm)>,
    /// Sorted steps this instance was matched against.
    pub premises: Vec<Step>,
    /// Index of the disjunct applied in place, or `None` for forks.
    pub disjunct: Option<usize>,
    /// New facts, in the order they were inserted.
    pub derived: Vec<Fact>,
    pub fresh: Vec<Constant>,
    /// Whether some closed leaf depends on this step.
    pub used_in_proof: bool,
}

impl AppliedInstance {
    #[must_use]
    pub fn new(step: Step, instance: &RuleInstance, disjunct: Option<usize>) -> Self {
        Self {
            step,
            axiom: instance.axiom(),
            bindings: bindings(instance),
            premises: instance.premises(),
            disjunct,
            derived: Vec::new(),
            fresh: Vec::new(),
            used_in_proof: false,
        }
    }
}

/// The instance of an axiom with an empty consequent that closed a
/// branch.  It derives nothing, so it does not take a step.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Closure {
    pub axiom: AxiomId,
    pub bindings: Vec<(MetaVar, GroundTerm)>,
    pub premises: Vec<Step>,
}

impl Closure {
    #[must_use]
    pub fn new(instance: &RuleInstance) -> Self {
        Self {
            axiom: instance.axiom(),
            bindings: bindings(instance),
            premises: instance.premises(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ProofNode {
    pub id: usize,
    /// Disjunct of the parent's fork this branch assumes; `None` at
    /// the root.
    pub disjunct: Option<usize>,
    /// Facts of that disjunct, timestamped with the parent's fork
    /// step.
    pub introduced: Vec<Fact>,
    pub fresh: Vec<Constant>,
    /// Steps applied in this branch, in order.
    pub steps: Vec<Step>,
    pub fork: Option<Step>,
    pub closed_by: Option<Closure>,
    pub children: Vec<ProofNode>,
}

impl ProofNode {
    #[must_use]
    pub fn new(id: usize, disjunct: Option<usize>) -> Self {
        Self {
            id,
            disjunct,
            introduced: Vec::new(),
            fresh: Vec::new(),
            steps: Vec::new(),
            fork: None,
            closed_by: None,
            children: Vec::new(),
        }
    }

    /// Number of closed branches under (and including) `self`.
    #[must_use]
    pub fn leaves(&self) -> usize {
        if self.children.is_empty() {
            1
        } else {
            self.children.iter().map(ProofNode::leaves).sum()
        }
    }

    fn visit<'a, F: FnMut(&'a ProofNode)>(&'a self, sink: &mut F) {
        sink(self);
        for child in &self.children {
            child.visit(sink);
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Proof {
    pub tree: ProofNode,
    /// Every applied instance in the tree, sorted by step.
    pub history: Vec<AppliedInstance>,
}

impl Proof {
    /// Sorts `history`, and flags the steps that some closed leaf
    /// transitively depends on.
    #[must_use]
    pub fn new(tree: ProofNode, mut history: Vec<AppliedInstance>) -> Self {
        history.sort_by_key(|applied| applied.step);

        let index: HashMap<Step, usize> = history
            .iter()
            .enumerate()
            .map(|(i, applied)| (applied.step, i))
            .collect();
        let mut worklist = Vec::new();
        tree.visit(&mut |node| {
            if let Some(closure) = &node.closed_by {
                worklist.extend(closure.premises.iter().copied());
            }

            worklist.extend(node.fork);
        });

        while let Some(step) = worklist.pop() {
            if let Some(&i) = index.get(&step) {
                if !history[i].used_in_proof {
                    history[i].used_in_proof = true;
                    worklist.extend(history[i].premises.iter().copied());
                }
            }
        }

        Self { tree, history }
    }

    #[must_use]
    pub fn steps(&self) -> usize {
        self.history.len()
    }

    #[must_use]
    pub fn applied(&self, step: Step) -> Option<&AppliedInstance> {
        self.history
            .binary_search_by_key(&step, |applied| applied.step)
            .ok()
            .map(|i| &self.history[i])
    }
}

/// A saturated branch: no rule instance is left, and no goal matched.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Model {
    /// Facts with every constant replaced by its class
    /// representative, sorted and deduplicated.
    pub facts: Vec<Fact>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum SearchResult {
    Proof { proof: Proof, stats: SearchStats },
    Model { model: Model, stats: SearchStats },
    /// The step limit was reached first.
    Aborted { steps_run: u64, stats: SearchStats },
}

impl SearchResult {
    #[must_use]
    pub fn stats(&self) -> &SearchStats {
        match self {
            SearchResult::Proof { stats, .. }
            | SearchResult::Model { stats, .. }
            | SearchResult::Aborted { stats, .. } => stats,
        }
    }

    #[must_use]
    pub fn proof(&self) -> Option<&Proof> {
        match self {
            SearchResult::Proof { proof, .. } => Some(proof),
            _ => None,
        }
    }

    #[must_use]
    pub fn model(&self) -> Option<&Model> {
        match self {
            SearchResult::Model { model, .. } => Some(model),
            _ => None,
        }
    }

    /// Renders `self` as JSON, with symbols named after `theory`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if serde fails.
    pub fn to_json(&self, theory: &Theory) -> Result<String> {
        let names = Names { theory };
        let value = match self {
            SearchResult::Proof { proof, stats } => json!({
                "result": "proof",
                "tree": names.node(&proof.tree),
                "history": proof
                    .history
                    .iter()
                    .map(|applied| names.applied(applied))
                    .collect::<Vec<_>>(),
                "stats": stats,
            }),
            SearchResult::Model { model, stats } => json!({
                "result": "model",
                "facts": model.facts.iter().map(|fact| names.fact(fact)).collect::<Vec<_>>(),
                "stats": stats,
            }),
            SearchResult::Aborted { steps_run, stats } => json!({
                "result": "aborted",
                "steps_run": steps_run,
                "stats": stats,
            }),
        };

        serde_json::to_string_pretty(&value).map_err(Error::Serialization)
    }
}

/// Resolves ids to names for `to_json`.  Witness constants have no
/// name, and print as `_c{id}`.
struct Names<'a> {
    theory: &'a Theory,
}

impl Names<'_> {
    fn constant(&self, constant: Constant) -> String {
        self.theory
            .constant_name(constant)
            .map_or_else(|| format!("_c{}", constant.id()), str::to_owned)
    }

    fn term(&self, term: &GroundTerm) -> String {
        match term {
            GroundTerm::Constant(c) => self.constant(*c),
            GroundTerm::Function(symbol, args) => format!(
                "{}({})",
                self.theory.function_name(*symbol),
                args.iter()
                    .map(|arg| self.term(arg))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }

    fn fact(&self, fact: &Fact) -> String {
        let args = fact
            .args()
            .iter()
            .map(|arg| self.term(arg))
            .collect::<Vec<_>>();

        if fact.predicate().is_equality() && args.len() == 2 {
            format!("{} = {}", args[0], args[1])
        } else {
            format!(
                "{}({})",
                self.theory.predicate_name(fact.predicate()),
                args.join(", ")
            )
        }
    }

    fn axiom(&self, axiom: AxiomId) -> Value {
        match self.theory.axiom(axiom).name() {
            Some(name) => json!(name),
            None => json!(axiom.index()),
        }
    }

    fn bindings(&self, bindings: &[(MetaVar, GroundTerm)]) -> Value {
        Value::Object(
            bindings
                .iter()
                .map(|(var, term)| {
                    (
                        self.theory.variable_name(*var).to_owned(),
                        Value::String(self.term(term)),
                    )
                })
                .collect(),
        )
    }

    fn applied(&self, applied: &AppliedInstance) -> Value {
        json!({
            "step": applied.step,
            "axiom": self.axiom(applied.axiom),
            "bindings": self.bindings(&applied.bindings),
            "premises": applied.premises,
            "disjunct": applied.disjunct,
            "derived": applied.derived.iter().map(|fact| self.fact(fact)).collect::<Vec<_>>(),
            "fresh": applied.fresh.iter().map(|c| self.constant(*c)).collect::<Vec<_>>(),
            "used_in_proof": applied.used_in_proof,
        })
    }

    fn node(&self, node: &ProofNode) -> Value {
        json!({
            "id": node.id,
            "disjunct": node.disjunct,
            "introduced": node.introduced.iter().map(|fact| self.fact(fact)).collect::<Vec<_>>(),
            "steps": node.steps,
            "fork": node.fork,
            "closed_by": node.closed_by.as_ref().map(|closure| json!({
                "axiom": self.axiom(closure.axiom),
                "bindings": self.bindings(&closure.bindings),
                "premises": closure.premises,
            })),
            "children": node.children.iter().map(|child| self.node(child)).collect::<Vec<_>>(),
        })
    }
}

#[cfg(test)]
fn applied(step: Step, premises: Vec<Step>) -> AppliedInstance {
    AppliedInstance {
        step,
        axiom: AxiomId::new(0),
        bindings: Vec::new(),
        premises,
        disjunct: Some(0),
        derived: Vec::new(),
        fresh: Vec::new(),
        used_in_proof: false,
    }
}

#[test]
fn test_used_in_proof() {
    // 1 -> 3 -> closed; 2 is a dead end.
    let mut tree = ProofNode::new(0, None);
    tree.steps = vec![1, 2, 3];
    tree.closed_by = Some(Closure {
        axiom: AxiomId::new(1),
        bindings: Vec::new(),
        premises: vec![3],
    });

    let proof = Proof::new(tree, vec![applied(3, vec![1]), applied(1, vec![]), applied(2, vec![1])]);
    assert_eq!(proof.steps(), 3);
    assert!(proof.applied(1).expect("step 1").used_in_proof);
    assert!(!proof.applied(2).expect("step 2").used_in_proof);
    assert!(proof.applied(3).expect("step 3").used_in_proof);
    assert_eq!(proof.tree.leaves(), 1);
}

#[test]
fn test_fork_is_used() {
    let mut tree = ProofNode::new(0, None);
    tree.steps = vec![1, 2];
    tree.fork = Some(2);
    tree.children = vec![ProofNode::new(1, Some(0)), ProofNode::new(2, Some(1))];

    let proof = Proof::new(tree, vec![applied(1, vec![]), applied(2, vec![1])]);
    assert!(proof.history.iter().all(|applied| applied.used_in_proof));
    assert_eq!(proof.tree.leaves(), 2);
}

#[test]
fn test_to_json() {
    use crate::theory::Axiom;
    use crate::unification::Atom;
    use crate::unification::Term;

    let mut theory = Theory::new();
    let p = theory.add_predicate("P", 1).expect("ok");
    let a = theory.add_constant("a").expect("ok");
    theory
        .add_axiom(Axiom::fact(vec![Atom::new(p, vec![Term::from(a)])]).named("base"))
        .expect("ok");

    let model = SearchResult::Model {
        model: Model {
            facts: vec![
                Fact::new(p, vec![a.into()]),
                Fact::new(p, vec![Constant::new(7).into()]),
            ],
        },
        stats: SearchStats::default(),
    };
    let json: Value = serde_json::from_str(&model.to_json(&theory).expect("ok")).expect("valid");
    assert_eq!(json["result"], "model");
    assert_eq!(json["facts"], json!(["P(a)", "P(_c7)"]));

    let mut tree = ProofNode::new(0, None);
    tree.steps = vec![1];
    let mut step = applied(1, vec![]);
    step.derived = vec![Fact::new(p, vec![a.into()])];
    let proof = SearchResult::Proof {
        proof: Proof::new(tree, vec![step]),
        stats: SearchStats {
            steps: 1,
            branches: 1,
            fresh_constants: 0,
        },
    };
    let json: Value = serde_json::from_str(&proof.to_json(&theory).expect("ok")).expect("valid");
    assert_eq!(json["history"][0]["axiom"], "base");
    assert_eq!(json["history"][0]["derived"], json!(["P(a)"]));
    assert_eq!(json["stats"]["steps"], 1);
}
