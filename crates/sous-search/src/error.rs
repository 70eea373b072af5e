//! Error types for the `sous-search` crate.
//!
//! An exhausted frontier is not an error: searches return an empty path.
//! The variants here are contract violations by the caller.

use sous_world::WorldError;

/// Errors that can occur when invoking a search.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The breadth-first search cannot plan a handoff.
    #[error("handoff agent is not supported by breadth-first search")]
    UnsupportedHandoff,

    /// The breadth-first search cannot pin an initial action.
    #[error("initial action is not supported by breadth-first search")]
    UnsupportedInitialAction,

    /// A world query failed.
    #[error("world error: {0}")]
    World(#[from] WorldError),
}
