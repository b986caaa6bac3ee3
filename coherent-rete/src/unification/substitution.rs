//! A substitution maps every variable of the theory to an optional
//! ground term.  The map has a fixed size, so substitutions for
//! different axioms share a shape and joins never have to reconcile
//! variable layouts.
//!
//! Each substitution also carries the ordered steps of the facts
//! (and equality merges) it was matched against.  The controller
//! uses them to age pending instances, and the proof writer uses
//! them to explain which earlier steps justified a rule application.
use super::MetaVar;
use crate::ground::Domain;
use crate::ground::EqualityMode;
use crate::ground::GroundTerm;
use crate::ground::Step;

/// How a join combines the timestamps of its two inputs.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ProvenanceMode {
    /// The right substitution matched a conjunct that was derived
    /// after (or independently of) the left ones: keep both.
    MergeBoth,
    /// The right substitution only tests for existence (e.g., an
    /// already-true consequent): keep the left timestamps alone.
    KeepLeft,
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Substitution {
    bindings: Box<[Option<GroundTerm>]>,
    timestamps: Vec<Step>,
}

impl Substitution {
    /// Returns an empty substitution over `width` variables.
    #[must_use]
    pub fn new(width: usize) -> Self {
        Self {
            bindings: vec![None; width].into_boxed_slice(),
            timestamps: Vec::new(),
        }
    }

    /// Number of variables in the substitution's domain (bound or not).
    #[inline]
    #[must_use]
    pub fn width(&self) -> usize {
        self.bindings.len()
    }

    #[inline]
    #[must_use]
    pub fn get(&self, var: MetaVar) -> Option<&GroundTerm> {
        self.bindings.get(var.index()).and_then(Option::as_ref)
    }

    #[inline]
    #[must_use]
    pub fn is_bound(&self, var: MetaVar) -> bool {
        self.get(var).is_some()
    }

    /// Binds `var` to `term` if `var` is unbound.  Otherwise, returns
    /// whether the current value is semantically equal to `term`;
    /// the current value is never overwritten.
    ///
    /// When the values only agree modulo equality, the step of the
    /// merge that made them equal is appended to the timestamps.
    pub fn bind(&mut self, var: MetaVar, term: &GroundTerm, domain: &Domain) -> bool {
        let index = var.index();
        debug_assert!(index < self.bindings.len(), "Variable outside substitution domain.");

        match &self.bindings[index] {
            None => {
                self.bindings[index] = Some(term.clone());
                true
            }
            Some(current) if current == term => true,
            Some(current) => match current.merge_step(term, domain) {
                Some(step) => {
                    self.timestamps.push(step);
                    true
                }
                None => false,
            },
        }
    }

    /// Returns whether every variable in `vars` is bound.
    #[must_use]
    pub fn is_total_on<'a, I>(&self, vars: I) -> bool
    where
        I: IntoIterator<Item = &'a MetaVar>,
    {
        vars.into_iter().all(|var| self.is_bound(*var))
    }

    /// Returns whether `self` and `other` agree (semantically) on
    /// every variable they both bind.
    #[must_use]
    pub fn compatible(&self, other: &Substitution, domain: &Domain) -> bool {
        debug_assert_eq!(self.width(), other.width());

        self.bindings
            .iter()
            .zip(other.bindings.iter())
            .all(|pair| match pair {
                (Some(x), Some(y)) => x.equal(y, EqualityMode::Semantic, domain),
                _ => true,
            })
    }

    /// Merges `self` and `other` if they agree on every variable they
    /// both bind.  The result's timestamps are `self`'s, followed by
    /// `other`'s when `mode` is `MergeBoth`, and by the steps of any
    /// equality merge the agreement relied on.
    #[must_use]
    pub fn union(
        &self,
        other: &Substitution,
        mode: ProvenanceMode,
        domain: &Domain,
    ) -> Option<Substitution> {
        debug_assert_eq!(self.width(), other.width());

        let mut ret = self.clone();
        if mode == ProvenanceMode::MergeBoth {
            ret.timestamps.extend_from_slice(&other.timestamps);
        }

        for (index, binding) in other.bindings.iter().enumerate() {
            if let Some(term) = binding {
                if !ret.bind(MetaVar::new(index as u32), term, domain) {
                    return None;
                }
            }
        }

        Some(ret)
    }

    /// Iterates over `(variable, value)` for all bound variables, in
    /// variable order.
    pub fn bound(&self) -> impl Iterator<Item = (MetaVar, &GroundTerm)> {
        self.bindings
            .iter()
            .enumerate()
            .filter_map(|(index, binding)| binding.as_ref().map(|x| (MetaVar::new(index as u32), x)))
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn timestamps(&self) -> &[Step] {
        &self.timestamps
    }

    pub fn push_timestamp(&mut self, step: Step) {
        self.timestamps.push(step);
    }

    /// Returns the most recent step this substitution depends on.
    #[must_use]
    pub fn latest(&self) -> Step {
        self.timestamps.iter().copied().max().unwrap_or(0)
    }
}

#[cfg(test)]
fn constants(n: u32) -> (Domain, Vec<GroundTerm>) {
    use crate::ground::Constant;

    let mut domain = Domain::new();
    let mut terms = Vec::new();
    for i in 0..n {
        domain.register(Constant::new(i), None);
        terms.push(GroundTerm::Constant(Constant::new(i)));
    }

    (domain, terms)
}

#[test]
fn test_bind() {
    let (domain, c) = constants(2);
    let x = MetaVar::new(0);
    let mut sub = Substitution::new(3);

    assert!(!sub.is_bound(x));
    assert!(sub.bind(x, &c[0], &domain));
    assert!(sub.bind(x, &c[0], &domain));
    assert!(!sub.bind(x, &c[1], &domain));
    assert_eq!(sub.get(x), Some(&c[0]));
}

#[test]
fn test_bind_modulo_equality() {
    use crate::ground::Constant;

    let (mut domain, c) = constants(2);
    let x = MetaVar::new(1);
    let mut sub = Substitution::new(2);
    sub.push_timestamp(1);

    sub.bind(x, &c[0], &domain);
    domain.union(Constant::new(0), Constant::new(1), 9);

    assert!(sub.bind(x, &c[1], &domain));
    // The original value stays, and the merge step joins the
    // provenance.
    assert_eq!(sub.get(x), Some(&c[0]));
    assert_eq!(sub.timestamps(), &[1, 9]);
}

#[test]
fn test_union_modes() {
    let (domain, c) = constants(4);
    let (x, y, z) = (MetaVar::new(0), MetaVar::new(1), MetaVar::new(2));

    let mut left = Substitution::new(3);
    left.bind(x, &c[1], &domain);
    left.bind(y, &c[2], &domain);
    left.push_timestamp(1);

    let mut right = Substitution::new(3);
    right.bind(y, &c[2], &domain);
    right.bind(z, &c[3], &domain);
    right.push_timestamp(2);

    let both = left
        .union(&right, ProvenanceMode::MergeBoth, &domain)
        .expect("compatible");
    assert_eq!(both.get(z), Some(&c[3]));
    assert_eq!(both.timestamps(), &[1, 2]);
    assert!(both.is_total_on(&[x, y, z]));

    let only_left = left
        .union(&right, ProvenanceMode::KeepLeft, &domain)
        .expect("compatible");
    assert_eq!(only_left.timestamps(), &[1]);

    let mut clash = Substitution::new(3);
    clash.bind(y, &c[0], &domain);
    assert!(left.union(&clash, ProvenanceMode::MergeBoth, &domain).is_none());
    assert!(!left.compatible(&clash, &domain));
    assert!(left.compatible(&right, &domain));
}

#[test]
fn test_bound_and_ages() {
    let (domain, c) = constants(2);
    let mut sub = Substitution::new(4);
    sub.bind(MetaVar::new(3), &c[1], &domain);
    sub.bind(MetaVar::new(1), &c[0], &domain);
    sub.push_timestamp(7);
    sub.push_timestamp(3);

    let bound: Vec<_> = sub.bound().map(|(var, _)| var).collect();
    assert_eq!(bound, vec![MetaVar::new(1), MetaVar::new(3)]);
    assert_eq!(sub.latest(), 7);
    assert!(!sub.is_total_on(&[MetaVar::new(0)]));
}

#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;

    fn substitution(domain: &Domain, values: &[Option<u32>]) -> Substitution {
        use crate::ground::Constant;

        let mut ret = Substitution::new(values.len());
        for (index, value) in values.iter().enumerate() {
            if let Some(id) = value {
                ret.bind(
                    MetaVar::new(index as u32),
                    &GroundTerm::Constant(Constant::new(*id)),
                    domain,
                );
            }
        }

        ret
    }

    proptest! {
        #[test]
        fn union_is_symmetric(left in proptest::collection::vec(proptest::option::of(0u32..3), 4),
                              right in proptest::collection::vec(proptest::option::of(0u32..3), 4)) {
            let domain = Domain::new();
            let a = substitution(&domain, &left);
            let b = substitution(&domain, &right);

            let ab = a.union(&b, ProvenanceMode::KeepLeft, &domain);
            let ba = b.union(&a, ProvenanceMode::KeepLeft, &domain);
            prop_assert_eq!(ab.is_some(), ba.is_some());
            prop_assert_eq!(ab.is_some(), a.compatible(&b, &domain));

            if let (Some(ab), Some(ba)) = (ab, ba) {
                for index in 0..4 {
                    let var = MetaVar::new(index);
                    prop_assert_eq!(ab.get(var), ba.get(var));
                }
            }
        }
    }
}
