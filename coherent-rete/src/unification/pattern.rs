//! Terms and atoms describe expectations to match against (extending
//! a `Substitution`), or, symmetrically, templates to populate from
//! a `Substitution`.
use super::MetaVar;
use super::Substitution;
use crate::ground::Constant;
use crate::ground::Domain;
use crate::ground::Fact;
use crate::ground::FunctionId;
use crate::ground::GroundTerm;
use crate::ground::PredicateId;
use std::collections::BTreeSet;

/// A term is ground iff no `Variable` is reachable from it.  When a
/// variable appears multiple times in a pattern, it must match
/// (be populated with) the same ground term.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Term {
    Constant(Constant),
    Variable(MetaVar),
    Function(FunctionId, Vec<Term>),
}

impl Term {
    #[must_use]
    pub fn function<I: IntoIterator<Item = Term>>(symbol: FunctionId, args: I) -> Self {
        Term::Function(symbol, args.into_iter().collect())
    }

    #[must_use]
    pub fn is_ground(&self) -> bool {
        match self {
            Term::Constant(_) => true,
            Term::Variable(_) => false,
            Term::Function(_, args) => args.iter().all(Term::is_ground),
        }
    }

    /// Inserts all `MetaVar`s in the term into `dst`.
    #[must_use]
    pub fn insert_metavars(&self, mut dst: BTreeSet<MetaVar>) -> BTreeSet<MetaVar> {
        match self {
            Term::Constant(_) => {}
            Term::Variable(mv) => {
                dst.insert(*mv);
            }
            Term::Function(_, args) => {
                for arg in args {
                    dst = arg.insert_metavars(dst);
                }
            }
        }

        dst
    }

    #[must_use]
    pub fn free_variables(&self) -> BTreeSet<MetaVar> {
        self.insert_metavars(BTreeSet::new())
    }

    /// Populates the term with `substitution`.
    ///
    /// # Errors
    ///
    /// Returns `Err` when a reachable variable is unbound.
    pub fn instantiate(&self, substitution: &Substitution) -> Result<GroundTerm, &'static str> {
        match self {
            Term::Constant(c) => Ok(GroundTerm::Constant(*c)),
            Term::Variable(mv) => substitution
                .get(*mv)
                .cloned()
                .ok_or("Instantiated term refers to an unbound variable."),
            Term::Function(f, args) => {
                let mut ground = Vec::with_capacity(args.len());
                for arg in args {
                    ground.push(arg.instantiate(substitution)?);
                }

                Ok(GroundTerm::function(*f, ground))
            }
        }
    }

    /// Attempts to match `value` against `self`, extending
    /// `substitution` with the variables `self` binds.  Constants are
    /// compared modulo `domain`.
    ///
    /// On failure, `substitution` may have been partially extended.
    #[must_use]
    pub fn try_match(
        &self,
        value: &GroundTerm,
        substitution: &mut Substitution,
        domain: &Domain,
    ) -> bool {
        match (self, value) {
            (Term::Variable(mv), _) => substitution.bind(*mv, value, domain),
            (Term::Constant(expected), GroundTerm::Constant(actual)) => {
                match domain.merge_step(*expected, *actual) {
                    Some(0) => true,
                    Some(step) => {
                        substitution.push_timestamp(step);
                        true
                    }
                    None => false,
                }
            }
            (Term::Function(f, args), GroundTerm::Function(g, values)) => {
                f == g
                    && args.len() == values.len()
                    && args
                        .iter()
                        .zip(values.iter())
                        .all(|(arg, value)| arg.try_match(value, substitution, domain))
            }
            _ => false,
        }
    }
}

impl From<MetaVar> for Term {
    fn from(mv: MetaVar) -> Self {
        Term::Variable(mv)
    }
}

impl From<Constant> for Term {
    fn from(constant: Constant) -> Self {
        Term::Constant(constant)
    }
}

/// An atom represents an expression of the form
/// `predicate(pattern*)`.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Atom {
    pub predicate: PredicateId,
    pub args: Vec<Term>,
}

impl Atom {
    #[must_use]
    pub fn new<I: IntoIterator<Item = Term>>(predicate: PredicateId, args: I) -> Self {
        Self {
            predicate,
            args: args.into_iter().collect(),
        }
    }

    #[inline]
    #[must_use]
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    #[inline]
    #[must_use]
    pub fn is_equality(&self) -> bool {
        self.predicate.is_equality()
    }

    /// Inserts all `MetaVar`s in the atom into `dst`.
    #[must_use]
    pub fn insert_metavars(&self, mut dst: BTreeSet<MetaVar>) -> BTreeSet<MetaVar> {
        for arg in &self.args {
            dst = arg.insert_metavars(dst);
        }

        dst
    }

    #[must_use]
    pub fn free_variables(&self) -> BTreeSet<MetaVar> {
        self.insert_metavars(BTreeSet::new())
    }

    /// Populates the atom with `substitution`.
    ///
    /// # Errors
    ///
    /// Returns `Err` when a variable in the atom is unbound.
    pub fn instantiate(&self, substitution: &Substitution) -> Result<Fact, &'static str> {
        let mut args = Vec::with_capacity(self.args.len());
        for arg in &self.args {
            args.push(arg.instantiate(substitution)?);
        }

        Ok(Fact::new(self.predicate, args))
    }
}

#[cfg(test)]
fn setup() -> (Domain, Vec<Constant>) {
    let mut domain = Domain::new();
    let constants: Vec<Constant> = (0..3).map(Constant::new).collect();
    for c in &constants {
        domain.register(*c, None);
    }

    (domain, constants)
}

#[test]
fn test_free_variables() {
    let x = MetaVar::new(0);
    let y = MetaVar::new(1);
    let f = FunctionId::new(0);

    let atom = Atom::new(
        PredicateId::new(1),
        vec![
            Term::from(x),
            Term::function(f, vec![Term::from(y), Term::from(x)]),
            Term::from(Constant::new(0)),
        ],
    );

    assert_eq!(
        atom.free_variables(),
        [x, y].iter().cloned().collect::<BTreeSet<_>>()
    );
    assert!(!atom.args[1].is_ground());
    assert!(atom.args[2].is_ground());
}

#[test]
fn test_instantiate() {
    let (domain, c) = setup();
    let x = MetaVar::new(0);
    let y = MetaVar::new(1);
    let f = FunctionId::new(0);

    let atom = Atom::new(
        PredicateId::new(1),
        vec![Term::from(x), Term::function(f, vec![Term::from(y)])],
    );

    let mut sub = Substitution::new(2);
    sub.bind(x, &c[0].into(), &domain);
    assert!(atom.instantiate(&sub).is_err());

    sub.bind(y, &c[1].into(), &domain);
    let fact = atom.instantiate(&sub).expect("ok");
    assert_eq!(
        fact,
        Fact::new(
            PredicateId::new(1),
            vec![c[0].into(), GroundTerm::function(f, vec![c[1].into()])]
        )
    );
}

#[test]
fn test_match_happy_path() {
    let (domain, c) = setup();
    let x = MetaVar::new(0);
    let y = MetaVar::new(1);
    let f = FunctionId::new(0);

    let pattern = Term::function(f, vec![Term::from(x), Term::from(y), Term::from(x)]);
    let value = GroundTerm::function(f, vec![c[2].into(), c[1].into(), c[2].into()]);

    let mut sub = Substitution::new(2);
    assert!(pattern.try_match(&value, &mut sub, &domain));
    assert_eq!(sub.get(x), Some(&c[2].into()));
    assert_eq!(sub.get(y), Some(&c[1].into()));
}

#[test]
fn test_match_mismatch() {
    let (mut domain, c) = setup();
    let x = MetaVar::new(0);
    let f = FunctionId::new(0);

    let pattern = Term::function(f, vec![Term::from(x), Term::from(x)]);
    let value = GroundTerm::function(f, vec![c[0].into(), c[1].into()]);
    assert!(!pattern.try_match(&value, &mut Substitution::new(1), &domain));

    let constant = Term::from(c[0]);
    assert!(!constant.try_match(&c[1].into(), &mut Substitution::new(1), &domain));

    // Once c0 = c1, both patterns match, and the merge step shows up
    // in the provenance.
    domain.union(c[0], c[1], 6);
    let mut sub = Substitution::new(1);
    assert!(pattern.try_match(&value, &mut sub, &domain));
    assert_eq!(sub.timestamps(), &[6]);
    assert!(constant.try_match(&c[1].into(), &mut Substitution::new(1), &domain));
}
