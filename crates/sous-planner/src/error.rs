//! Error types for the `sous-planner` crate.
//!
//! Every variant is a fatal contract violation.
//! A hypothesis without a path is never an error: it is dropped for the turn.

use sous_search::SearchError;
use sous_types::{AgentCombination, AgentId};
use sous_world::WorldError;

/// Errors that can occur while planning.
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    /// No reachability table exists for this agent and coalition.
    #[error("unknown agent combination {agents} for agent {agent}")]
    UnknownAgentCombination {
        /// The agent whose reachability was queried.
        agent: AgentId,
        /// The coalition that may move out of the way.
        agents: AgentCombination,
    },

    /// An agent id outside the level's agent range.
    #[error("unknown agent {0}")]
    UnknownAgent(AgentId),

    /// A search was invoked with options it does not support.
    #[error("search error: {0}")]
    Search(#[from] SearchError),

    /// A world query failed.
    #[error("world error: {0}")]
    World(#[from] WorldError),
}
