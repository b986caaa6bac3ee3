//! Ground terms are what variables get bound to: either a domain
//! element, or a function symbol applied to ground terms.  Function
//! terms are never interned; they are compared structurally, with
//! their leaves compared according to an `EqualityMode`.
use super::Constant;
use super::Domain;
use super::FunctionId;
use super::Step;
use serde::Serialize;

/// Matching must see through asserted equalities, so it compares
/// domain elements modulo the union-find (`Semantic`).  Proof
/// presentation must not silently merge elements that were
/// introduced separately, and instead compares ids (`Literal`).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum EqualityMode {
    Semantic,
    Literal,
}

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum GroundTerm {
    Constant(Constant),
    Function(FunctionId, Box<[GroundTerm]>),
}

impl GroundTerm {
    #[must_use]
    pub fn function<I: IntoIterator<Item = GroundTerm>>(symbol: FunctionId, args: I) -> Self {
        GroundTerm::Function(symbol, args.into_iter().collect())
    }

    #[inline]
    #[must_use]
    pub fn as_constant(&self) -> Option<Constant> {
        match self {
            GroundTerm::Constant(c) => Some(*c),
            GroundTerm::Function(..) => None,
        }
    }

    /// Compares `self` and `other` under `mode`.
    #[must_use]
    pub fn equal(&self, other: &GroundTerm, mode: EqualityMode, domain: &Domain) -> bool {
        use GroundTerm::{Constant, Function};

        match (self, other) {
            (Constant(a), Constant(b)) => match mode {
                EqualityMode::Literal => a == b,
                EqualityMode::Semantic => domain.equal(*a, *b),
            },
            (Function(f, xs), Function(g, ys)) => {
                f == g
                    && xs.len() == ys.len()
                    && xs
                        .iter()
                        .zip(ys.iter())
                        .all(|(x, y)| x.equal(y, mode, domain))
            }
            _ => false,
        }
    }

    /// Returns the step at which `self` and `other` became
    /// semantically equal (0 if they are literally equal), or `None`
    /// if they still differ.
    #[must_use]
    pub fn merge_step(&self, other: &GroundTerm, domain: &Domain) -> Option<Step> {
        use GroundTerm::{Constant, Function};

        match (self, other) {
            (Constant(a), Constant(b)) => domain.merge_step(*a, *b),
            (Function(f, xs), Function(g, ys)) if f == g && xs.len() == ys.len() => {
                let mut ret = 0;
                for (x, y) in xs.iter().zip(ys.iter()) {
                    ret = ret.max(x.merge_step(y, domain)?);
                }

                Some(ret)
            }
            _ => None,
        }
    }

    /// Returns a copy of `self` where every constant is replaced with
    /// its class representative.
    #[must_use]
    pub fn canonical(&self, domain: &Domain) -> GroundTerm {
        match self {
            GroundTerm::Constant(c) => GroundTerm::Constant(domain.find(*c)),
            GroundTerm::Function(f, args) => {
                GroundTerm::function(*f, args.iter().map(|arg| arg.canonical(domain)))
            }
        }
    }
}

impl From<Constant> for GroundTerm {
    #[inline]
    fn from(constant: Constant) -> Self {
        GroundTerm::Constant(constant)
    }
}

#[test]
fn test_equal_modes() {
    let mut domain = Domain::new();
    let a = Constant::new(0);
    let b = Constant::new(1);
    let f = FunctionId::new(0);

    let fa = GroundTerm::function(f, vec![a.into()]);
    let fb = GroundTerm::function(f, vec![b.into()]);

    assert!(!fa.equal(&fb, EqualityMode::Semantic, &domain));
    domain.union(a, b, 4);

    assert!(fa.equal(&fb, EqualityMode::Semantic, &domain));
    assert!(!fa.equal(&fb, EqualityMode::Literal, &domain));
    assert!(fa.equal(&fa, EqualityMode::Literal, &domain));
    assert_eq!(fa.merge_step(&fb, &domain), Some(4));
    assert_eq!(fa.merge_step(&fa, &domain), Some(0));
    assert_eq!(fa.canonical(&domain), fb.canonical(&domain));
}

#[test]
fn test_shape_mismatch() {
    let domain = Domain::new();
    let a = GroundTerm::Constant(Constant::new(0));
    let fa = GroundTerm::function(FunctionId::new(0), vec![a.clone()]);
    let ga = GroundTerm::function(FunctionId::new(1), vec![a.clone()]);

    assert!(!a.equal(&fa, EqualityMode::Semantic, &domain));
    assert!(!fa.equal(&ga, EqualityMode::Semantic, &domain));
    assert_eq!(fa.merge_step(&ga, &domain), None);
    assert_eq!(fa.as_constant(), None);
    assert_eq!(a.as_constant(), Some(Constant::new(0)));
}
