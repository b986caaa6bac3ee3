//! A fact is a predicate that is known to be true for a given list of
//! ground terms.  Facts flow from the controller into the matching
//! network, and from the network's rule instances back into the
//! controller, so they must be cheap to share: the network wraps them
//! in `Arc`s and never copies the argument list.
use super::Domain;
use super::EqualityMode;
use super::GroundTerm;
use super::PredicateId;
use serde::Serialize;

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Fact {
    predicate: PredicateId,
    args: Box<[GroundTerm]>,
}

impl Fact {
    #[must_use]
    pub fn new<I: IntoIterator<Item = GroundTerm>>(predicate: PredicateId, args: I) -> Self {
        Self {
            predicate,
            args: args.into_iter().collect(),
        }
    }

    #[inline]
    #[must_use]
    pub fn predicate(&self) -> PredicateId {
        self.predicate
    }

    #[inline]
    #[must_use]
    pub fn args(&self) -> &[GroundTerm] {
        &self.args
    }

    #[inline]
    #[must_use]
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// Ground atoms are equal when their predicates are the same, and
    /// their arguments are pairwise equal under `mode`.
    #[must_use]
    pub fn equal(&self, other: &Fact, mode: EqualityMode, domain: &Domain) -> bool {
        self.predicate == other.predicate
            && self.args.len() == other.args.len()
            && self
                .args
                .iter()
                .zip(other.args.iter())
                .all(|(x, y)| x.equal(y, mode, domain))
    }

    /// Returns a copy of `self` with every constant replaced by its
    /// class representative.
    #[must_use]
    pub fn canonical(&self, domain: &Domain) -> Fact {
        Fact::new(
            self.predicate,
            self.args.iter().map(|arg| arg.canonical(domain)),
        )
    }
}

#[test]
fn test_construct() {
    use super::Constant;

    let p = PredicateId::new(0);
    let fact = Fact::new(p, vec![Constant::new(1).into(), Constant::new(2).into()]);

    assert_eq!(fact.predicate(), p);
    assert_eq!(fact.arity(), 2);
    assert_eq!(fact.args()[1], GroundTerm::Constant(Constant::new(2)));
}

#[test]
fn test_equal() {
    use super::Constant;

    let mut domain = Domain::new();
    let (a, b) = (Constant::new(0), Constant::new(1));
    let p = PredicateId::new(0);
    let q = PredicateId::new(1);

    let pa = Fact::new(p, vec![a.into()]);
    let pb = Fact::new(p, vec![b.into()]);
    let qa = Fact::new(q, vec![a.into()]);

    assert!(!pa.equal(&pb, EqualityMode::Semantic, &domain));
    assert!(!pa.equal(&qa, EqualityMode::Semantic, &domain));

    domain.union(a, b, 1);
    assert!(pa.equal(&pb, EqualityMode::Semantic, &domain));
    assert!(!pa.equal(&pb, EqualityMode::Literal, &domain));
    assert_eq!(pb.canonical(&domain), pa);
}
