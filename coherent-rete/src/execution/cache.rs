//! Every stateful node remembers the substitutions it accepted, so
//! that a later arrival on the other side of a join can be matched
//! against them.  The cache is also the only deduplication mechanism
//! in the network: a substitution that is (semantically) equal to an
//! earlier one on the node's projection is dropped on the floor.
//! Without that, cyclic theories would re-derive the same matches
//! forever.
//!
//! Caches are append-only between backtracking points.  Negation
//! guards may retract entries; a retraction only flips an alive flag
//! and is logged, so restoring a mark can undo it.  Retracted entries
//! still participate in deduplication: a guard never lifts its
//! suppression, so a retracted match must never come back.
use crate::ground::Domain;
use crate::ground::EqualityMode;
use crate::unification::Projection;
use crate::unification::Substitution;

/// Everything a cache needs to rewind to an earlier state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CacheMark {
    len: usize,
    retracted: usize,
}

#[derive(Clone, Debug)]
pub struct SubstitutionCache {
    projection: Projection,
    entries: Vec<Substitution>,
    alive: Vec<bool>,
    /// Undo log of retracted indices.
    retracted: Vec<usize>,
}

impl SubstitutionCache {
    #[must_use]
    pub fn new(projection: Projection) -> Self {
        Self {
            projection,
            entries: Vec::new(),
            alive: Vec::new(),
            retracted: Vec::new(),
        }
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends `sub` unless an existing entry (alive or not) is
    /// semantically equal on the projection.  Returns the new entry's
    /// index.
    pub fn insert_if_new(&mut self, sub: &Substitution, domain: &Domain) -> Option<usize> {
        debug_assert!(
            self.projection.is_total(sub),
            "Substitution does not bind the cache's projection."
        );

        let projection = &self.projection;
        if self
            .entries
            .iter()
            .any(|entry| projection.same(entry, sub, EqualityMode::Semantic, domain))
        {
            return None;
        }

        self.entries.push(sub.clone());
        self.alive.push(true);
        Some(self.entries.len() - 1)
    }

    #[must_use]
    pub fn get(&self, index: usize) -> &Substitution {
        &self.entries[index]
    }

    #[must_use]
    pub fn is_alive(&self, index: usize) -> bool {
        self.alive[index]
    }

    /// Iterates over the entries that were not retracted, with their
    /// index.
    pub fn alive(&self) -> impl Iterator<Item = (usize, &Substitution)> {
        self.entries
            .iter()
            .enumerate()
            .filter(move |(index, _)| self.alive[*index])
    }

    /// Returns the indices of the alive entries that are semantically
    /// equal to `sub` on the projection.
    #[must_use]
    pub fn matching(&self, sub: &Substitution, domain: &Domain) -> Vec<usize> {
        self.alive()
            .filter(|(_, entry)| {
                self.projection
                    .same(entry, sub, EqualityMode::Semantic, domain)
            })
            .map(|(index, _)| index)
            .collect()
    }

    /// Marks entry `index` dead.  Returns false if it already was.
    pub fn retract(&mut self, index: usize) -> bool {
        if !self.alive[index] {
            return false;
        }

        self.alive[index] = false;
        self.retracted.push(index);
        true
    }

    #[must_use]
    pub fn mark(&self) -> CacheMark {
        CacheMark {
            len: self.entries.len(),
            retracted: self.retracted.len(),
        }
    }

    /// Undoes every insertion and retraction since `mark`.  Entries
    /// past the mark are dropped, not merely hidden.
    pub fn restore(&mut self, mark: CacheMark) {
        debug_assert!(mark.len <= self.entries.len());
        debug_assert!(mark.retracted <= self.retracted.len());

        for index in self.retracted.drain(mark.retracted..) {
            if index < self.alive.len() {
                self.alive[index] = true;
            }
        }

        self.entries.truncate(mark.len);
        self.alive.truncate(mark.len);
    }
}

#[cfg(test)]
fn setup() -> (Domain, Vec<Substitution>) {
    use crate::ground::Constant;
    use crate::ground::GroundTerm;
    use crate::unification::MetaVar;

    let domain = Domain::new();
    let (x, y) = (MetaVar::new(0), MetaVar::new(1));
    let sub = |a: u32, b: u32| {
        let mut ret = Substitution::new(2);
        ret.bind(x, &GroundTerm::from(Constant::new(a)), &domain);
        ret.bind(y, &GroundTerm::from(Constant::new(b)), &domain);
        ret
    };

    let subs = vec![sub(0, 1), sub(0, 2), sub(1, 1)];
    (domain, subs)
}

#[test]
fn test_insert_if_new() {
    use crate::unification::MetaVar;

    let (domain, subs) = setup();
    let mut on_x = SubstitutionCache::new(Projection::new(&[MetaVar::new(0)]));

    assert_eq!(on_x.insert_if_new(&subs[0], &domain), Some(0));
    assert_eq!(on_x.insert_if_new(&subs[0], &domain), None);
    // Same x, different y: a duplicate for this projection.
    assert_eq!(on_x.insert_if_new(&subs[1], &domain), None);
    assert_eq!(on_x.insert_if_new(&subs[2], &domain), Some(1));
    assert_eq!(on_x.len(), 2);
}

#[test]
fn test_insert_modulo_equality() {
    use crate::ground::Constant;
    use crate::unification::MetaVar;

    let (mut domain, subs) = setup();
    let mut on_y = SubstitutionCache::new(Projection::new(&[MetaVar::new(1)]));

    assert_eq!(on_y.insert_if_new(&subs[0], &domain), Some(0));
    domain.union(Constant::new(1), Constant::new(2), 4);
    assert_eq!(on_y.insert_if_new(&subs[1], &domain), None);
}

#[test]
fn test_restore() {
    use crate::unification::MetaVar;

    let (domain, subs) = setup();
    let mut cache = SubstitutionCache::new(Projection::new(&[MetaVar::new(0), MetaVar::new(1)]));

    cache.insert_if_new(&subs[0], &domain);
    let mark = cache.mark();

    cache.insert_if_new(&subs[1], &domain);
    assert!(cache.retract(0));
    assert!(!cache.retract(0));
    assert_eq!(cache.alive().count(), 1);
    // Retracted entries still deduplicate.
    assert_eq!(cache.insert_if_new(&subs[0], &domain), None);

    cache.restore(mark);
    assert_eq!(cache.len(), 1);
    assert!(cache.is_alive(0));
    assert_eq!(cache.get(0), &subs[0]);
    assert_eq!(cache.matching(&subs[0], &domain), vec![0]);
    assert!(cache.matching(&subs[2], &domain).is_empty());
}
