//! Joint-action search for the Sous planner.
//!
//! Given a state, a recipe, and a set of agents, the searches here find the
//! shortest sequence of joint actions after which the recipe result exists.
//! The A* search is guided by a collaborative heuristic built on
//! precomputed all-pairs distances; a breadth-first search is kept as a
//! baseline.
//!
//! # Modules
//!
//! - [`astar`] -- Arena-based A* with handoff tracking.
//! - [`bfs`] -- Uninformed breadth-first baseline.
//! - [`error`] -- Error types for invalid search requests.
//! - [`heuristic`] -- Collaborative distance estimate with helper agents.
//! - [`oracle`] -- All-pairs distances with a wall-crossing allowance.
//! - [`trimmer`] -- Removal of agents that a plan does not need.

pub mod astar;
pub mod bfs;
pub mod error;
pub mod heuristic;
pub mod oracle;
pub mod trimmer;

use serde::{Deserialize, Serialize};
use sous_types::{Action, AgentCombination, AgentId, JointAction, Recipe};
use sous_world::{Environment, State};

// Re-export primary types at crate root.
pub use astar::AStar;
pub use bfs::Bfs;
pub use error::SearchError;
pub use heuristic::Heuristic;
pub use oracle::{DistanceEntry, DistanceOracle};
pub use trimmer::trim_forward;

/// Everything a single search invocation needs.
#[derive(Debug, Clone, Copy)]
pub struct SearchRequest<'a> {
    /// State to search from.
    pub state: &'a State,
    /// Recipe whose result ends the search.
    pub recipe: Recipe,
    /// Agents allowed to act; all others stay.
    pub agents: &'a AgentCombination,
    /// Agent that must hand its contribution over and then stay.
    pub handoff_agent: Option<AgentId>,
    /// Fixed prefix of joint actions for agents not in `free_agents`.
    pub input_actions: &'a [JointAction],
    /// Agents exempt from `input_actions`.
    pub free_agents: &'a AgentCombination,
    /// Action the path must start with.
    pub initial_action: Option<Action>,
}

/// Which search algorithm the planner uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    /// Heuristic-guided search with handoff support.
    #[default]
    AStar,
    /// Breadth-first baseline.
    Bfs,
}

/// A configured searcher.
#[derive(Debug, Clone)]
pub enum Search {
    /// A* over the joint action space.
    AStar(AStar),
    /// Breadth-first search over the joint action space.
    Bfs(Bfs),
}

impl Search {
    /// Build the searcher of the given kind for `environment`.
    pub fn new(kind: SearchKind, environment: Environment, depth_limit: usize) -> Self {
        match kind {
            SearchKind::AStar => Self::AStar(AStar::new(environment, depth_limit)),
            SearchKind::Bfs => Self::Bfs(Bfs::new(environment)),
        }
    }

    /// Which algorithm this searcher runs.
    pub const fn kind(&self) -> SearchKind {
        match self {
            Self::AStar(_) => SearchKind::AStar,
            Self::Bfs(_) => SearchKind::Bfs,
        }
    }

    /// The level this searcher plans in.
    pub const fn environment(&self) -> &Environment {
        match self {
            Self::AStar(search) => search.environment(),
            Self::Bfs(search) => search.environment(),
        }
    }

    /// Shortest joint-action sequence producing the request's recipe
    /// result. An empty path means no plan was found.
    ///
    /// # Errors
    ///
    /// Returns a [`SearchError`] when the algorithm does not support an
    /// option the request uses.
    pub fn search_joint(&self, request: &SearchRequest<'_>) -> Result<Vec<JointAction>, SearchError> {
        match self {
            Self::AStar(search) => Ok(search.search_joint(request)),
            Self::Bfs(search) => search.search_joint(request),
        }
    }
}
