//! Given an axiom, how should we figure out the corresponding matches?
//!
//! There is no universally optimal answer to this question,
//! especially once we go past binary joins.  We use the simplest
//! plan that gives join provenance a meaning: the left-hand side's
//! conjuncts are joined in the order they were written, so the beta
//! tree is a left spine where each join adds one conjunct.  Each
//! conjunct is matched by a chain of alpha tests, one per argument
//! position.
//!
//! The key trick for coherent logic is that we can avoid
//! instantiating a sequent when one of its consequents already
//! holds.  After the left spine, every (small enough) disjunct gets
//! a negation guard: a `BetaNot` whose right input matches the
//! disjunct's atoms, with existentials treated as ordinary variables.
//! A consequent of the form $$\exists y: p(x, y)$$ is already
//! satisfied whenever there already exists such a $$y,$$ so the guard
//! compares candidates and existing matches on the disjunct's
//! universal variables only.  The last guard feeds the rule node.
use super::node::AlphaTest;
use super::node::CacheSlot;
use super::node::Edge;
use super::node::Node;
use super::node::NodeId;
use super::node::NodeKind;
use super::AxiomNetwork;
use super::NetworkOptions;
use crate::ground::PredicateId;
use crate::theory::Axiom;
use crate::theory::AxiomId;
use crate::theory::AxiomKind;
use crate::unification::Atom;
use crate::unification::MetaVar;
use crate::unification::Projection;
use crate::unification::ProvenanceMode;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::convert::TryFrom;

/// Appends `kind` to the arena, and returns its id.
pub(crate) fn push_node(nodes: &mut Vec<Node>, kind: NodeKind) -> Result<NodeId, &'static str> {
    let index = u32::try_from(nodes.len()).map_err(|_| "Network too large.")?;
    nodes.push(Node::new(kind));
    Ok(NodeId::new(index))
}

struct AxiomPlanner<'a> {
    nodes: &'a mut Vec<Node>,
    selectors: &'a [NodeId],
    axiom: AxiomId,
    projections: Vec<Projection>,
    roots: BTreeMap<PredicateId, Vec<NodeId>>,
    joins: Vec<NodeId>,
    guards: Vec<NodeId>,
}

impl<'a> AxiomPlanner<'a> {
    fn connect(&mut self, from: NodeId, to: Edge) {
        self.nodes[from.index()].add_child(to);
    }

    fn cache(&mut self, vars: &BTreeSet<MetaVar>) -> CacheSlot {
        self.projections.push(Projection::new(vars));
        CacheSlot::new(self.projections.len() - 1)
    }

    /// Builds the alpha chain for `atom`, and returns the last node
    /// in the chain.
    fn alpha_chain(&mut self, atom: &Atom, propagate: bool) -> Result<NodeId, &'static str> {
        let tests: Vec<AlphaTest> = if atom.args.is_empty() {
            vec![AlphaTest::Pass]
        } else {
            atom.args
                .iter()
                .enumerate()
                .map(|(position, pattern)| AlphaTest::Match {
                    position,
                    pattern: pattern.clone(),
                })
                .collect()
        };

        let mut last: Option<NodeId> = None;
        for test in tests {
            let node = push_node(
                self.nodes,
                NodeKind::Alpha {
                    axiom: self.axiom,
                    test,
                    propagate,
                },
            )?;

            match last {
                Some(prev) => self.connect(prev, Edge::left(node)),
                None => {
                    let selector = *self
                        .selectors
                        .get(atom.predicate.index())
                        .ok_or("Unknown predicate.")?;
                    self.connect(selector, Edge::left(node));
                    self.roots.entry(atom.predicate).or_default().push(node);
                }
            }

            last = Some(node);
        }

        last.ok_or("Empty alpha chain.")
    }

    /// Builds the left spine of joins for `atoms`, and returns the
    /// node that outputs the conjunction's matches, or `None` for an
    /// empty conjunction.  When `defer_last` is set, the last atom's
    /// alpha chain does not propagate eagerly.
    fn conjunction(
        &mut self,
        atoms: &[Atom],
        mode: ProvenanceMode,
        defer_last: bool,
    ) -> Result<Option<NodeId>, &'static str> {
        let mut source: Option<NodeId> = None;
        let mut vars = BTreeSet::new();

        for (index, atom) in atoms.iter().enumerate() {
            let propagate = !(defer_last && index + 1 == atoms.len());
            let chain = self.alpha_chain(atom, propagate)?;
            let atom_vars = atom.free_variables();

            source = Some(match source {
                None => chain,
                Some(left) => {
                    let left_slot = self.cache(&vars);
                    let right_slot = self.cache(&atom_vars);
                    let join = push_node(
                        self.nodes,
                        NodeKind::BetaAnd {
                            axiom: self.axiom,
                            left: left_slot,
                            right: right_slot,
                            mode,
                        },
                    )?;

                    self.connect(left, Edge::left(join));
                    self.connect(chain, Edge::right(join));
                    self.joins.push(join);
                    join
                }
            });

            vars.extend(atom_vars);
        }

        Ok(source)
    }
}

fn wants_guard(axiom: &Axiom, atoms: usize, options: &NetworkOptions) -> bool {
    options.use_negation_guard
        && axiom.kind() == AxiomKind::Normal
        && atoms > 0
        && (options.negation_guard_max_conjuncts == 0
            || atoms <= options.negation_guard_max_conjuncts)
}

/// Adds the nodes that match `axiom` to `nodes`, and returns the
/// axiom's view of the network.
///
/// # Errors
///
/// Returns `Err` when an atom refers to a predicate without selector.
pub(crate) fn plan_axiom(
    nodes: &mut Vec<Node>,
    selectors: &[NodeId],
    id: AxiomId,
    axiom: &Axiom,
    options: &NetworkOptions,
) -> Result<AxiomNetwork, &'static str> {
    let deferred = options.lazy_alpha && !axiom.left().is_empty();
    let mut planner = AxiomPlanner {
        nodes,
        selectors,
        axiom: id,
        projections: Vec::new(),
        roots: BTreeMap::new(),
        joins: Vec::new(),
        guards: Vec::new(),
    };

    let source = planner.conjunction(axiom.left(), ProvenanceMode::MergeBoth, deferred)?;

    // Consumers of the left-hand side's matches, in order: the
    // guards, then the rule node.
    let mut consumers = Vec::new();
    for (index, disjunct) in axiom.right().iter().enumerate() {
        if !wants_guard(axiom, disjunct.atoms().len(), options) {
            continue;
        }

        let universals = disjunct.universals();
        let left = planner.cache(axiom.left_vars());
        let right = planner.cache(&universals);
        let guard = push_node(
            planner.nodes,
            NodeKind::BetaNot {
                axiom: id,
                disjunct: index,
                left,
                right,
                guard: Projection::new(&universals),
            },
        )?;

        // Existence tests do not contribute provenance.
        if let Some(matches) =
            planner.conjunction(disjunct.atoms(), ProvenanceMode::KeepLeft, false)?
        {
            planner.connect(matches, Edge::right(guard));
        }

        planner.guards.push(guard);
        consumers.push(guard);
    }

    let cache = planner.cache(axiom.right_free());
    let rule = push_node(planner.nodes, NodeKind::Rule { axiom: id, cache })?;
    consumers.push(rule);

    for pair in consumers.windows(2) {
        planner.connect(pair[0], Edge::left(pair[1]));
    }

    let first = Edge::left(consumers[0]);
    let seed = match source {
        Some(source) => {
            planner.connect(source, first);
            None
        }
        None => Some(first),
    };

    Ok(AxiomNetwork {
        axiom: id,
        roots: planner.roots,
        joins: planner.joins,
        guards: planner.guards,
        rule,
        seed,
        projections: planner.projections,
        deferred,
    })
}
