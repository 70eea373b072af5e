//! Kitchen world model for the Sous planner.
//!
//! This crate owns the rules of the cooking world: the static grid, the
//! mutable state of items and agents, how joint actions transform a state,
//! and how levels are loaded from text.
//!
//! # Modules
//!
//! - [`environment`] -- Static layout, movement, the transition function,
//!   collision detection, and goal-related recipe reasoning.
//! - [`error`] -- Error types for level loading and world queries.
//! - [`ingredients`] -- Ingredient multisets for resource accounting.
//! - [`level`] -- Level text parsing into an environment and initial state.
//! - [`state`] -- Items, delivered dishes, and agents.

pub mod environment;
pub mod error;
pub mod ingredients;
pub mod level;
pub mod state;

// Re-export primary types at crate root.
pub use environment::{Environment, Layout};
pub use error::WorldError;
pub use ingredients::Ingredients;
pub use level::Level;
pub use state::{Agent, Location, State};
