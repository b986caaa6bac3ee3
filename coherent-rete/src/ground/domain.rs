//! Equality facts identify domain elements.  We track the resulting
//! equivalence classes with a union-find forest over constant ids,
//! where each link also remembers the step that created it: when a
//! match only succeeds modulo equality, the proof must be able to
//! point at the equality steps that justify it.
//!
//! Backtracking undoes unions in the reverse order they were
//! performed, so we link by rank but never compress paths: a link is
//! only ever written once between its creation and its undo.  Rank
//! linking alone keeps trees logarithmically shallow, which is plenty
//! for the domain sizes a coherent logic search can handle.
use super::Constant;
use super::Step;
use std::sync::Arc;

#[derive(Clone, Debug)]
struct Entry {
    parent: u32,
    rank: u8,
    /// Step at which this entry was linked under its parent
    /// (meaningless for roots).
    linked_at: Step,
    name: Option<Arc<str>>,
}

impl Entry {
    fn singleton(id: u32) -> Self {
        Self {
            parent: id,
            rank: 0,
            linked_at: 0,
            name: None,
        }
    }
}

/// An undo record for one union: `child` was a root before the union,
/// and `bumped` tells us whether the new root's rank was incremented.
#[derive(Clone, Copy, Debug)]
struct Link {
    child: u32,
    root: u32,
    bumped: bool,
}

/// A `DomainMark` remembers how many unions a `Domain` had performed
/// when the mark was taken.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DomainMark {
    links: usize,
}

/// Union-find over all the constants a branch knows about.
#[derive(Clone, Debug, Default)]
pub struct Domain {
    entries: Vec<Entry>,
    links: Vec<Link>,
}

impl Domain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of constant slots, i.e., one more than the largest
    /// registered constant id.  Slots that were never registered
    /// behave as anonymous singletons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registers `constant` as its own singleton class.  Registering a
    /// constant twice only updates its name.
    pub fn register(&mut self, constant: Constant, name: Option<Arc<str>>) {
        let index = constant.index();
        if index >= self.entries.len() {
            let start = self.entries.len() as u32;
            self.entries
                .extend((start..=constant.id()).map(Entry::singleton));
        }

        if name.is_some() {
            self.entries[index].name = name;
        }
    }

    /// Returns the name `constant` was registered with, if any.
    #[must_use]
    pub fn name(&self, constant: Constant) -> Option<&str> {
        self.entries
            .get(constant.index())
            .and_then(|entry| entry.name.as_deref())
    }

    /// Returns the representative of `constant`'s class.
    #[must_use]
    pub fn find(&self, constant: Constant) -> Constant {
        let mut current = constant.id();

        while let Some(entry) = self.entries.get(current as usize) {
            if entry.parent == current {
                break;
            }

            current = entry.parent;
        }

        Constant::new(current)
    }

    /// Returns whether `a` and `b` belong to the same class.
    #[inline]
    #[must_use]
    pub fn equal(&self, a: Constant, b: Constant) -> bool {
        a == b || self.find(a) == self.find(b)
    }

    /// Merges the classes of `a` and `b`, and records that the merge
    /// happened at `step`.
    ///
    /// Returns false if `a` and `b` were already equal.
    pub fn union(&mut self, a: Constant, b: Constant, step: Step) -> bool {
        self.register(a, None);
        self.register(b, None);

        let root_a = self.find(a).id();
        let root_b = self.find(b).id();
        if root_a == root_b {
            return false;
        }

        let rank_a = self.entries[root_a as usize].rank;
        let rank_b = self.entries[root_b as usize].rank;

        // Link the shallower tree under the deeper one; on ties, keep
        // the older (smaller) id as the representative.
        let (root, child) = if rank_a > rank_b || (rank_a == rank_b && root_a < root_b) {
            (root_a, root_b)
        } else {
            (root_b, root_a)
        };

        let bumped = rank_a == rank_b;
        {
            let entry = &mut self.entries[child as usize];
            entry.parent = root;
            entry.linked_at = step;
        }

        if bumped {
            self.entries[root as usize].rank += 1;
        }

        self.links.push(Link {
            child,
            root,
            bumped,
        });
        true
    }

    /// Returns the step at which `a` and `b` became equal: 0 if they
    /// are the same constant, `None` if they are not equal.
    #[must_use]
    pub fn merge_step(&self, a: Constant, b: Constant) -> Option<Step> {
        if a == b {
            return Some(0);
        }

        // Link steps never decrease on the way up, so the step at
        // which the two paths joined is the largest link step below
        // their lowest common ancestor.
        let path_a = self.path(a);
        let path_b = self.path(b);
        if path_a.last().map(|x| x.0) != path_b.last().map(|x| x.0) {
            return None;
        }

        let (ancestor_a, ancestor_b) = {
            let mut i = path_a.len();
            let mut j = path_b.len();
            while i > 0 && j > 0 && path_a[i - 1].0 == path_b[j - 1].0 {
                i -= 1;
                j -= 1;
            }

            (i, j)
        };

        let below = |path: &[(u32, Step)], end: usize| {
            path[..end].iter().map(|x| x.1).max().unwrap_or(0)
        };

        Some(below(&path_a, ancestor_a).max(below(&path_b, ancestor_b)))
    }

    /// Returns the list of `(id, linked_at)` from `constant` up to
    /// (and including) its root.
    fn path(&self, constant: Constant) -> Vec<(u32, Step)> {
        let mut ret = Vec::new();
        let mut current = constant.id();

        loop {
            match self.entries.get(current as usize) {
                Some(entry) if entry.parent != current => {
                    ret.push((current, entry.linked_at));
                    current = entry.parent;
                }
                _ => {
                    ret.push((current, 0));
                    return ret;
                }
            }
        }
    }

    /// Returns a mark that `restore` can later rewind to.
    #[must_use]
    pub fn snapshot(&self) -> DomainMark {
        DomainMark {
            links: self.links.len(),
        }
    }

    /// Undoes every union performed since `mark` was taken.
    pub fn restore(&mut self, mark: DomainMark) {
        debug_assert!(mark.links <= self.links.len());

        let keep = mark.links.min(self.links.len());
        for link in self.links.drain(keep..).rev() {
            {
                let entry = &mut self.entries[link.child as usize];
                entry.parent = link.child;
                entry.linked_at = 0;
            }

            if link.bumped {
                self.entries[link.root as usize].rank -= 1;
            }
        }
    }

    /// Number of unions performed (and not undone) so far.
    #[must_use]
    pub fn union_count(&self) -> usize {
        self.links.len()
    }
}

#[test]
fn test_singletons() {
    let mut domain = Domain::new();
    let a = Constant::new(0);
    let b = Constant::new(1);

    domain.register(a, Some("a".into()));
    domain.register(b, Some("b".into()));

    assert_eq!(domain.find(a), a);
    assert!(domain.equal(a, a));
    assert!(!domain.equal(a, b));
    assert_eq!(domain.name(b), Some("b"));
    assert_eq!(domain.merge_step(a, b), None);
    assert_eq!(domain.merge_step(a, a), Some(0));
}

#[test]
fn test_union_chain() {
    let mut domain = Domain::new();
    let c: Vec<Constant> = (0..4).map(Constant::new).collect();
    for x in &c {
        domain.register(*x, None);
    }

    assert!(domain.union(c[0], c[1], 3));
    assert!(domain.union(c[2], c[3], 5));
    assert!(!domain.union(c[1], c[0], 6));
    assert!(!domain.equal(c[0], c[3]));

    assert!(domain.union(c[1], c[3], 8));
    assert!(domain.equal(c[0], c[2]));
    assert!(domain.equal(c[3], c[1]));

    assert_eq!(domain.merge_step(c[0], c[1]), Some(3));
    assert_eq!(domain.merge_step(c[2], c[3]), Some(5));
    assert_eq!(domain.merge_step(c[0], c[3]), Some(8));
}

#[test]
fn test_restore() {
    let mut domain = Domain::new();
    let c: Vec<Constant> = (0..3).map(Constant::new).collect();

    domain.union(c[0], c[1], 1);
    let mark = domain.snapshot();
    domain.union(c[1], c[2], 2);
    assert!(domain.equal(c[0], c[2]));

    domain.restore(mark);
    assert!(domain.equal(c[0], c[1]));
    assert!(!domain.equal(c[0], c[2]));
    assert_eq!(domain.union_count(), 1);

    // The restored forest must accept the same union again.
    assert!(domain.union(c[2], c[0], 4));
    assert_eq!(domain.merge_step(c[2], c[1]), Some(4));
}

#[test]
fn test_unregistered_constants() {
    let mut domain = Domain::new();
    domain.register(Constant::new(5), None);

    assert_eq!(domain.len(), 6);
    assert_eq!(domain.find(Constant::new(2)), Constant::new(2));
    assert_eq!(domain.find(Constant::new(40)), Constant::new(40));
}

#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn equal_is_an_equivalence(unions in proptest::collection::vec((0u32..12, 0u32..12), 0..30)) {
            let mut domain = Domain::new();
            for (step, (a, b)) in unions.iter().enumerate() {
                domain.union(Constant::new(*a), Constant::new(*b), step as Step + 1);
            }

            for (a, b) in &unions {
                prop_assert!(domain.equal(Constant::new(*a), Constant::new(*b)));
            }

            for a in 0..12 {
                let a = Constant::new(a);
                prop_assert!(domain.equal(a, a));
                for b in 0..12 {
                    let b = Constant::new(b);
                    prop_assert_eq!(domain.equal(a, b), domain.equal(b, a));
                    prop_assert_eq!(domain.equal(a, b), domain.merge_step(a, b).is_some());
                    for c in 0..12 {
                        let c = Constant::new(c);
                        if domain.equal(a, b) && domain.equal(b, c) {
                            prop_assert!(domain.equal(a, c));
                        }
                    }
                }
            }
        }

        #[test]
        fn union_order_does_not_matter(unions in proptest::collection::vec((0u32..10, 0u32..10), 0..20)) {
            let mut forward = Domain::new();
            let mut backward = Domain::new();

            for (a, b) in unions.iter() {
                forward.union(Constant::new(*a), Constant::new(*b), 1);
            }

            for (a, b) in unions.iter().rev() {
                backward.union(Constant::new(*b), Constant::new(*a), 1);
            }

            for a in 0..10 {
                for b in 0..10 {
                    let (a, b) = (Constant::new(a), Constant::new(b));
                    prop_assert_eq!(forward.equal(a, b), backward.equal(a, b));
                }
            }
        }

        #[test]
        fn restore_undoes_unions(first in proptest::collection::vec((0u32..8, 0u32..8), 0..10),
                                 second in proptest::collection::vec((0u32..8, 0u32..8), 0..10)) {
            let mut domain = Domain::new();
            for (a, b) in &first {
                domain.union(Constant::new(*a), Constant::new(*b), 1);
            }

            let before: Vec<Constant> = (0..8).map(|x| domain.find(Constant::new(x))).collect();
            let mark = domain.snapshot();
            for (a, b) in &second {
                domain.union(Constant::new(*a), Constant::new(*b), 2);
            }

            domain.restore(mark);
            let after: Vec<Constant> = (0..8).map(|x| domain.find(Constant::new(x))).collect();
            prop_assert_eq!(before, after);
        }
    }
}
