//! Coherent Logic is a special case of first-order logic, and its
//! models are made of opaque domain elements adorned only with an
//! identity.  The theory names a few of them; the search introduces
//! the others as witnesses for existentials.
//!
//! Witnesses may be created concurrently by parallel branches, so
//! fresh identities come from a `ConstantCounter` shared by the whole
//! search, rather than from some per-branch state: two branches never
//! hand out the same constant, which keeps proofs from different
//! branches trivially comparable.
use serde::Serialize;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;

/// A domain element is simply a machine integer.  New constants only
/// appear for named theory constants and existential witnesses, so
/// 32 bits are more than enough.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Constant(u32);

impl Constant {
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    #[must_use]
    pub fn id(self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Hands out constants in sequence, starting right after the
/// theory's named constants.
#[derive(Debug)]
pub struct ConstantCounter {
    first: u32,
    next: AtomicU32,
}

impl ConstantCounter {
    /// Returns a counter whose first fresh constant is `first`.
    #[must_use]
    pub fn starting_at(first: u32) -> Self {
        Self {
            first,
            next: AtomicU32::new(first),
        }
    }

    /// Returns a constant that was never returned before by `self`.
    #[must_use]
    pub fn fresh(&self) -> Constant {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        assert!(id != u32::MAX, "Exhausted the constant id space.");
        Constant::new(id)
    }

    /// Number of constants allocated so far.
    #[must_use]
    pub fn allocated(&self) -> u32 {
        self.next.load(Ordering::Relaxed) - self.first
    }

    /// Upper bound (exclusive) on the ids handed out so far.
    #[must_use]
    pub fn bound(&self) -> u32 {
        self.next.load(Ordering::Relaxed)
    }
}

#[test]
fn test_fresh() {
    let counter = ConstantCounter::starting_at(4);
    let a = counter.fresh();
    let b = counter.fresh();

    assert_ne!(a, b);
    assert_eq!(a, Constant::new(4));
    assert_eq!(b.id(), 5);
    assert_eq!(counter.allocated(), 2);
    assert_eq!(counter.bound(), 6);
}

#[test]
fn test_fresh_concurrent() {
    use std::collections::HashSet;
    use std::sync::Arc;

    let counter = Arc::new(ConstantCounter::starting_at(0));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let counter = counter.clone();
            std::thread::spawn(move || (0..100).map(|_| counter.fresh()).collect::<Vec<_>>())
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for constant in handle.join().expect("ok") {
            assert!(seen.insert(constant));
        }
    }

    assert_eq!(seen.len(), 400);
    assert_eq!(counter.allocated(), 400);
}
