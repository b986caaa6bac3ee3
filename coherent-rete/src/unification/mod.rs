//! An implementation of Coherent Logic never needs full unification:
//! either we're matching a pattern against a fully ground fact, or
//! fully instantiating a template with a substitution.  In order to
//! drive joins (i.e., to implement patterns that span multiple
//! atoms), we must also merge substitutions, and compare them on the
//! variables a join or cache cares about.
//!
//! Matching accepts a fact and a substitution, and extends the
//! substitution on success.  Merging accepts two substitutions and
//! returns their union when they agree.  Instantiation accepts a
//! total substitution, and returns ground terms and facts.
//!
//! The usual split between static shape and dynamic data pervades
//! this module: which variables matter where is a function of the
//! axioms and of the network built from them, not of the data; the
//! network computes `Projection`s once, and caches apply them to
//! every substitution they see.
mod metavariable;
mod pattern;
mod project;
mod substitution;

pub use metavariable::MetaVar;
pub use pattern::Atom;
pub use pattern::Term;
pub use project::Projection;
pub use substitution::ProvenanceMode;
pub use substitution::Substitution;
