//! Caches and joins only care about a subset of the variables in the
//! substitutions that flow through them.  A `Projection` names that
//! subset once, when the network is built, and then compares
//! individual substitutions on it.
use super::MetaVar;
use super::Substitution;
use crate::ground::Domain;
use crate::ground::EqualityMode;
use std::collections::BTreeSet;

#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Projection {
    vars: Box<[MetaVar]>,
}

impl Projection {
    /// Returns a projection onto `vars`.
    #[must_use]
    pub fn new<'a, I>(vars: I) -> Self
    where
        I: IntoIterator<Item = &'a MetaVar>,
    {
        let set: BTreeSet<MetaVar> = vars.into_iter().copied().collect();
        Self {
            vars: set.into_iter().collect(),
        }
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn vars(&self) -> &[MetaVar] {
        &self.vars
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Returns whether `sub` binds every projected variable.
    #[must_use]
    pub fn is_total(&self, sub: &Substitution) -> bool {
        sub.is_total_on(self.vars.iter())
    }

    /// Returns whether `x` and `y` have equal values (under `mode`)
    /// for every projected variable.  An unbound variable only equals
    /// another unbound variable.
    #[must_use]
    pub fn same(&self, x: &Substitution, y: &Substitution, mode: EqualityMode, domain: &Domain) -> bool {
        self.vars.iter().all(|var| match (x.get(*var), y.get(*var)) {
            (Some(a), Some(b)) => a.equal(b, mode, domain),
            (None, None) => true,
            _ => false,
        })
    }

    /// Returns whether `x` and `y` agree on every projected variable
    /// that both bind.
    #[must_use]
    pub fn compatible(&self, x: &Substitution, y: &Substitution, domain: &Domain) -> bool {
        self.vars.iter().all(|var| match (x.get(*var), y.get(*var)) {
            (Some(a), Some(b)) => a.equal(b, EqualityMode::Semantic, domain),
            _ => true,
        })
    }
}

#[test]
fn test_project_happy_path() {
    use crate::ground::Constant;
    use crate::ground::GroundTerm;

    let domain = Domain::new();
    let (x, y, z) = (MetaVar::new(0), MetaVar::new(1), MetaVar::new(2));
    let c = |i| GroundTerm::Constant(Constant::new(i));

    let mut a = Substitution::new(3);
    a.bind(x, &c(1), &domain);
    a.bind(y, &c(2), &domain);
    a.push_timestamp(4);

    let mut b = Substitution::new(3);
    b.bind(x, &c(1), &domain);
    b.bind(y, &c(3), &domain);
    b.bind(z, &c(3), &domain);

    let on_x = Projection::new(&[x]);
    let on_xy = Projection::new(&[y, x, y]);

    assert_eq!(on_xy.vars(), &[x, y]);
    assert!(on_x.same(&a, &b, EqualityMode::Literal, &domain));
    assert!(!on_xy.same(&a, &b, EqualityMode::Literal, &domain));
    assert!(on_xy.is_total(&a));
    assert!(!Projection::new(&[z]).is_total(&a));
}

#[test]
fn test_project_compatible() {
    use crate::ground::Constant;
    use crate::ground::GroundTerm;

    let mut domain = Domain::new();
    let (x, y) = (MetaVar::new(0), MetaVar::new(1));
    let c = |i| GroundTerm::Constant(Constant::new(i));

    let mut a = Substitution::new(2);
    a.bind(x, &c(1), &domain);
    let mut b = Substitution::new(2);
    b.bind(x, &c(2), &domain);
    b.bind(y, &c(2), &domain);

    let both = Projection::new(&[x, y]);
    assert!(!both.compatible(&a, &b, &domain));
    assert!(Projection::new(&[y]).compatible(&a, &b, &domain));

    domain.union(Constant::new(1), Constant::new(2), 3);
    assert!(both.compatible(&a, &b, &domain));
    assert!(!both.same(&a, &b, EqualityMode::Semantic, &domain));
}
