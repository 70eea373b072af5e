//! Error types for the engine.
//!
//! [`EngineError`] wraps every failure the host session and the batch
//! driver can hit, so `main` can propagate it with `?`.

use std::path::PathBuf;

use sous_planner::PlannerError;
use sous_types::AgentId;
use sous_world::WorldError;

/// Top-level error for the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A level could not be loaded.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: WorldError,
    },

    /// A planner failed to choose an action.
    #[error("planner error: {source}")]
    Planner {
        /// The underlying planner error.
        #[from]
        source: PlannerError,
    },

    /// An agent id the session does not know.
    #[error("unknown agent {0}")]
    UnknownAgent(AgentId),

    /// A scenario lists no planners.
    #[error("scenario {level} has no planners")]
    EmptyScenario {
        /// Level name of the scenario.
        level: String,
    },

    /// Result rows could not be written.
    #[error("failed to write results to {path}: {source}")]
    Output {
        /// Output file path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
