//! Axioms are coherent sequents of the form
//!
//! ```text
//! left_1 & left_2 & ... => (exists ys_1: right_11 & ...) | (exists ys_2: ...) | ...
//! ```
//!
//! where every variable on the right-hand side is either matched on
//! the left, or existentially bound in its own disjunct.  The
//! consequent of an implication can be empty (false); such an axiom
//! closes any branch where its left-hand side matches.
//!
//! We expect the parser to hand us resolved axioms: predicates,
//! function symbols, constants and variables are all indices into the
//! theory's tables.  This module only computes the derived variable
//! sets the network needs; `Theory::validate` checks the shape.
use crate::unification::Atom;
use crate::unification::MetaVar;
use serde::Serialize;
use std::collections::BTreeSet;

/// Index of an axiom in its theory, which is also the index of its
/// rule queue.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct AxiomId(u32);

impl AxiomId {
    #[must_use]
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub enum AxiomKind {
    /// `true => conjunction`: injects initial facts.
    Fact,
    /// `conjunction => false`: reaching it closes the branch.
    Goal,
    Normal,
}

/// One disjunct of a consequent: $$\exists ys: a_1 \wedge a_2 ...$$
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Disjunct {
    existentials: BTreeSet<MetaVar>,
    atoms: Vec<Atom>,
}

impl Disjunct {
    #[must_use]
    pub fn new<I: IntoIterator<Item = Atom>>(existentials: BTreeSet<MetaVar>, atoms: I) -> Self {
        Self {
            existentials,
            atoms: atoms.into_iter().collect(),
        }
    }

    /// Returns a disjunct without existential variable.
    #[must_use]
    pub fn conjunction<I: IntoIterator<Item = Atom>>(atoms: I) -> Self {
        Self::new(BTreeSet::new(), atoms)
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn existentials(&self) -> &BTreeSet<MetaVar> {
        &self.existentials
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// Returns all the variables in the disjunct's atoms.
    #[must_use]
    pub fn metavars(&self) -> BTreeSet<MetaVar> {
        let mut ret = BTreeSet::new();
        for atom in &self.atoms {
            ret = atom.insert_metavars(ret);
        }

        ret
    }

    /// Returns the variables the disjunct shares with the left-hand
    /// side, i.e., those that are not existentially bound.
    #[must_use]
    pub fn universals(&self) -> BTreeSet<MetaVar> {
        self.metavars()
            .difference(&self.existentials)
            .cloned()
            .collect()
    }
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Axiom {
    kind: AxiomKind,
    name: Option<String>,
    left: Vec<Atom>,
    right: Vec<Disjunct>,
    /// Set of all variables matched by `left`.
    left_vars: BTreeSet<MetaVar>,
    /// Variables that are both matched on the left and used on the
    /// right: a rule instance must bind them all.
    right_free: BTreeSet<MetaVar>,
}

impl Axiom {
    /// Constructs the axiom `left_1 & ... => right_1 | ...`.  Conjunct
    /// order on the left is preserved: the network joins them in that
    /// order.
    #[must_use]
    pub fn new<I, J>(kind: AxiomKind, left: I, right: J) -> Self
    where
        I: IntoIterator<Item = Atom>,
        J: IntoIterator<Item = Disjunct>,
    {
        let left: Vec<Atom> = left.into_iter().collect();
        let right: Vec<Disjunct> = right.into_iter().collect();

        let mut left_vars = BTreeSet::new();
        for atom in &left {
            left_vars = atom.insert_metavars(left_vars);
        }

        let mut right_free = BTreeSet::new();
        for disjunct in &right {
            right_free.extend(disjunct.universals());
        }

        Self {
            kind,
            name: None,
            left,
            right,
            left_vars,
            right_free,
        }
    }

    /// `true => conjunction`.
    #[must_use]
    pub fn fact<I: IntoIterator<Item = Atom>>(atoms: I) -> Self {
        Self::new(AxiomKind::Fact, vec![], vec![Disjunct::conjunction(atoms)])
    }

    /// `conjunction => false`.
    #[must_use]
    pub fn goal<I: IntoIterator<Item = Atom>>(atoms: I) -> Self {
        Self::new(AxiomKind::Goal, atoms, vec![])
    }

    #[must_use]
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.into());
        self
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn kind(&self) -> AxiomKind {
        self.kind
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn left(&self) -> &[Atom] {
        &self.left
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn right(&self) -> &[Disjunct] {
        &self.right
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn left_vars(&self) -> &BTreeSet<MetaVar> {
        &self.left_vars
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn right_free(&self) -> &BTreeSet<MetaVar> {
        &self.right_free
    }

    /// An axiom with an empty consequent closes the branch.
    #[must_use]
    pub fn is_closing(&self) -> bool {
        self.right.is_empty()
    }

    /// A definite axiom derives exactly one conjunction, without
    /// introducing any new element: applying it never splits the
    /// search.
    #[must_use]
    pub fn is_definite(&self) -> bool {
        self.right.len() == 1 && self.right[0].existentials.is_empty()
    }

    /// Fact and goal instances are free (or terminate the branch),
    /// and are always applied first.
    #[must_use]
    pub fn is_immediate(&self) -> bool {
        self.kind != AxiomKind::Normal || self.is_closing()
    }
}

#[test]
fn test_axiom_sets() {
    use crate::ground::PredicateId;
    use crate::unification::Term;

    let (x, y, z) = (MetaVar::new(0), MetaVar::new(1), MetaVar::new(2));
    let p = PredicateId::new(1);
    let q = PredicateId::new(2);

    // p(x, y) => exists z: q(x, z)
    let axiom = Axiom::new(
        AxiomKind::Normal,
        vec![Atom::new(p, vec![Term::from(x), Term::from(y)])],
        vec![Disjunct::new(
            [z].iter().cloned().collect(),
            vec![Atom::new(q, vec![Term::from(x), Term::from(z)])],
        )],
    );

    assert_eq!(
        *axiom.left_vars(),
        [x, y].iter().cloned().collect::<BTreeSet<_>>()
    );
    assert_eq!(
        *axiom.right_free(),
        [x].iter().cloned().collect::<BTreeSet<_>>()
    );
    assert!(!axiom.is_definite());
    assert!(!axiom.is_closing());
    assert!(!axiom.is_immediate());
}

#[test]
fn test_axiom_kinds() {
    use crate::ground::Constant;
    use crate::ground::PredicateId;
    use crate::unification::Term;

    let p = PredicateId::new(1);
    let fact = Axiom::fact(vec![Atom::new(p, vec![Term::from(Constant::new(0))])]).named("init");
    assert_eq!(fact.kind(), AxiomKind::Fact);
    assert_eq!(fact.name(), Some("init"));
    assert!(fact.is_definite());
    assert!(fact.is_immediate());
    assert!(fact.left().is_empty());

    let goal = Axiom::goal(vec![Atom::new(p, vec![Term::from(MetaVar::new(0))])]);
    assert!(goal.is_closing());
    assert!(goal.is_immediate());
    assert!(goal.right_free().is_empty());
}
