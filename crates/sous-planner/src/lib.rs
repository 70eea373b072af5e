//! Goal recognition and collaboration planning for the Sous kitchen.
//!
//! A planner controls one agent. Every turn it searches plans for all the
//! ways the agents could split the remaining recipes, estimates from the
//! recent trend of those plans what the other agents are doing, and picks
//! the move that best fits the most plausible joint effort.
//!
//! # Modules
//!
//! - [`collaboration`] -- Hypothesis generation, scoring, collision repair,
//!   and action selection.
//! - [`config`] -- Tuning constants loaded from YAML.
//! - [`error`] -- Error types for planning.
//! - [`goal`] -- Goals and composite collaboration hypotheses.
//! - [`paths`] -- Searched plans keyed by goal.
//! - [`planner`] -- Planner strategies selectable per agent.
//! - [`reachability`] -- Per-agent reachable cells for pruning hypotheses.
//! - [`recognizer`] -- Sliding-window goal recognition.

pub mod collaboration;
pub mod config;
pub mod error;
pub mod goal;
pub mod paths;
pub mod planner;
pub mod reachability;
pub mod recognizer;

// Re-export primary types at crate root.
pub use collaboration::{CollaborationInfo, CollaborationPlanner};
pub use config::{CollaborationConfig, ConfigError, PlannerConfig, RecognizerConfig, SearchConfig};
pub use error::PlannerError;
pub use goal::{Goal, Goals};
pub use paths::{ActionPath, Paths};
pub use planner::{Planner, PlannerKind};
pub use reachability::Reachability;
pub use recognizer::Recognizer;
