//! Predicates and function symbols are interned by the theory; the
//! ground layer only sees their dense indices.
use serde::Serialize;

/// Index of a predicate in its theory's predicate table.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct PredicateId(u32);

/// Index of a function symbol in its theory's function table.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct FunctionId(u32);

impl PredicateId {
    /// Every theory registers the equality predicate `=` first.
    pub const EQUALITY: PredicateId = PredicateId(0);

    #[must_use]
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    #[must_use]
    pub fn is_equality(self) -> bool {
        self == Self::EQUALITY
    }

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl FunctionId {
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

#[test]
fn test_index_roundtrip() {
    assert_eq!(PredicateId::new(3).index(), 3);
    assert_eq!(FunctionId::new(7).index(), 7);
    assert!(PredicateId::new(1) < PredicateId::new(2));
    assert!(PredicateId::new(0).is_equality());
    assert!(!PredicateId::new(1).is_equality());
}
