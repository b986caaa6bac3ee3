//! The prover starts with a database of known facts, and
//! incrementally adds new facts as they are derived.  These facts are
//! "ground" formulas: predicates applied to domain elements
//! (constants) and function terms over domain elements, without any
//! variable.  The matching network manipulates ground terms all the
//! time, so they must stay as light as possible, while offering fast
//! hashing and comparison.
//!
//! Domain elements are not only compared by identity: equality facts
//! merge elements into equivalence classes, and the `Domain` tracks
//! these classes with a union-find structure.  Every comparison in
//! the prover thus picks an `EqualityMode`: matching works modulo the
//! union-find, while proof presentation wants literal identities.

mod constant;
mod domain;
mod fact;
mod symbol;
mod term;

pub use constant::Constant;
pub use constant::ConstantCounter;
pub use domain::Domain;
pub use domain::DomainMark;
pub use fact::Fact;
pub use symbol::FunctionId;
pub use symbol::PredicateId;
pub use term::EqualityMode;
pub use term::GroundTerm;

/// Steps order every rule application in a proof search, across all
/// branches.  Step 0 is reserved for things that hold before the
/// search starts (e.g., the theory's named constants).
pub type Step = u64;
