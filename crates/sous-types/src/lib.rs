//! Shared type definitions for the Sous kitchen planner.
//!
//! This crate is the single source of truth for the value types that flow
//! between the world model, the search stack, and the planners. Everything
//! here is plain data: cheap to copy, ordered, and hashable.
//!
//! # Modules
//!
//! - [`grid`] -- Coordinates, movement directions, and static cell types
//! - [`ingredient`] -- Ingredients, recipes, and the fixed recipe table
//! - [`agents`] -- Agent identifiers, agent combinations, and per-turn actions

pub mod agents;
pub mod grid;
pub mod ingredient;

// Re-export all public types at crate root for convenience.
pub use agents::{Action, AgentCombination, AgentId, JointAction, combinations};
pub use grid::{CellType, Coordinate, Direction};
pub use ingredient::{Ingredient, RECIPES, Recipe, combine};

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    //! Serialization shape checks for types written to result files.

    use super::*;

    #[test]
    fn directions_serialize_as_snake_case() {
        let json = serde_json::to_string(&Direction::Stay).unwrap();
        assert_eq!(json, "\"stay\"");
    }

    #[test]
    fn recipes_serialize_with_named_fields() {
        let recipe = Recipe::new(Ingredient::Cutting, Ingredient::Tomato, Ingredient::ChoppedTomato);
        let value = serde_json::to_value(recipe).unwrap();
        assert_eq!(value["result"], "chopped_tomato");
        let back: Recipe = serde_json::from_value(value).unwrap();
        assert_eq!(back, recipe);
    }
}
