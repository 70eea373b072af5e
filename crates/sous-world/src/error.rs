//! Error types for the `sous-world` crate.
//!
//! Every variant here is fatal for the caller: a level that fails to load
//! must not be played, and an unknown agent means the planner and the world
//! have desynchronized.

use std::path::PathBuf;

use sous_types::AgentId;

/// Errors that can occur while loading a level or querying the world.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The level file could not be read.
    #[error("unknown level file {}: {source}", path.display())]
    UnknownLevel {
        /// Path that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The goal section named a dish that does not exist.
    #[error("unknown goal: {0}")]
    UnknownGoal(String),

    /// The map section contained an unrecognized character.
    #[error("unknown glyph {glyph:?} at ({x},{y})")]
    UnknownGlyph {
        /// The offending character.
        glyph: char,
        /// Column of the character.
        x: usize,
        /// Row of the character.
        y: usize,
    },

    /// A map row was wider than the first row.
    #[error("map row {row} has width {found}, expected at most {expected}")]
    RaggedRow {
        /// Zero-based row index.
        row: usize,
        /// Width of the first row.
        expected: usize,
        /// Width of the offending row.
        found: usize,
    },

    /// An agent start line was not of the form `x,y`.
    #[error("malformed agent line: {0:?}")]
    MalformedAgentLine(String),

    /// The level declares fewer agent start positions than requested.
    #[error("level declares {available} agents, {requested} requested")]
    MissingAgents {
        /// Number of agents requested by the caller.
        requested: usize,
        /// Number of start positions in the level.
        available: usize,
    },

    /// A coordinate lies outside the grid.
    #[error("coordinate ({x},{y}) is out of bounds")]
    OutOfBounds {
        /// Column.
        x: usize,
        /// Row.
        y: usize,
    },

    /// An agent start cell is not floor.
    #[error("agent {agent} starts on a counter at ({x},{y})")]
    BlockedStart {
        /// The agent whose start cell is blocked.
        agent: AgentId,
        /// Column.
        x: usize,
        /// Row.
        y: usize,
    },

    /// Two agents start on the same cell.
    #[error("agents {first} and {second} both start at ({x},{y})")]
    SharedStart {
        /// The agent listed first.
        first: AgentId,
        /// The agent listed second.
        second: AgentId,
        /// Column.
        x: usize,
        /// Row.
        y: usize,
    },

    /// An agent id does not exist in the state.
    #[error("unknown agent: {0}")]
    UnknownAgent(AgentId),
}
