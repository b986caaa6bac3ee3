use serde::Serialize;

/// A metavariable is a name for, e.g., a bound variable in $$\forall x$$.
///
/// Metavariables are uniquely identified by their index in the
/// theory's variable table; the name itself lives in that table and
/// is only useful for pretty-printing.  Two variables with the same
/// name in different axioms are thus distinct as long as the parser
/// gave them distinct slots.
///
/// The implicit order on metavariables sorts by index (ascending).
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct MetaVar(u32);

impl MetaVar {
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
fn test_smoke() {
    let mv0 = MetaVar::new(0);
    let mv1 = MetaVar::new(1);

    assert!(mv0 < mv1);
    assert_ne!(mv0, mv1);
    assert_eq!(mv1.index(), 1);
}

#[test]
fn test_eq_hash() {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::Hash;
    use std::hash::Hasher;

    let mv0 = MetaVar::new(3);
    let mv0_copy = MetaVar::new(3);
    let mv1 = MetaVar::new(4);

    assert_eq!(mv0, mv0_copy);
    assert_ne!(mv0, mv1);

    let mut h0 = DefaultHasher::new();
    let mut h0_copy = DefaultHasher::new();

    mv0.hash(&mut h0);
    mv0_copy.hash(&mut h0_copy);
    assert_eq!(h0.finish(), h0_copy.finish());
}
