//! Errors that escape the prover.
//!
//! Shape checks deep in the crate report plain `&'static str`
//! reasons; the surface wraps them with enough context (e.g., the
//! offending axiom) to be actionable.  Running out of steps is not an
//! error: it is the `Aborted` search result.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// An axiom has a shape the network cannot handle.  Fatal to the
    /// whole theory.
    #[error("malformed axiom {axiom}: {reason}")]
    Configuration { axiom: usize, reason: &'static str },

    /// Symbol table problem, e.g., a predicate redeclared with a
    /// different arity.
    #[error("invalid theory: {0}")]
    Theory(&'static str),

    #[error("invalid search parameters: {0}")]
    Parameters(#[source] serde_json::Error),

    #[error("failed to serialise search result: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("failed to build the branch thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to spawn a matching worker: {0}")]
    Spawn(#[source] std::io::Error),

    /// A matching worker thread went away while the search still
    /// needed it (it most likely panicked).
    #[error("matching worker for axiom {axiom} disconnected")]
    WorkerDisconnected { axiom: usize },
}

impl Error {
    #[must_use]
    pub fn configuration(axiom: usize, reason: &'static str) -> Self {
        Error::Configuration { axiom, reason }
    }
}

#[test]
fn test_display() {
    let err = Error::configuration(3, "Equality atom over function terms.");
    assert_eq!(
        err.to_string(),
        "malformed axiom 3: Equality atom over function terms."
    );
    assert_eq!(
        Error::WorkerDisconnected { axiom: 1 }.to_string(),
        "matching worker for axiom 1 disconnected"
    );
}
