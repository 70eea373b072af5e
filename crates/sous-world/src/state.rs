//! Mutable world state: loose items, delivered dishes, and agents.
//!
//! A [`State`] is a plain value. Search clones it freely and only the
//! environment's `act` methods change it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sous_types::{AgentId, Coordinate, Ingredient};

use crate::error::WorldError;
use crate::ingredients::Ingredients;

/// One agent: where it stands and what it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Agent {
    /// Current cell.
    pub coordinate: Coordinate,
    /// The single item held, if any.
    pub item: Option<Ingredient>,
}

impl Agent {
    /// An empty-handed agent at `coordinate`.
    pub const fn new(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            item: None,
        }
    }

    /// Whether the agent holds `ingredient`.
    pub fn is_holding(&self, ingredient: Ingredient) -> bool {
        self.item == Some(ingredient)
    }
}

/// A place from which an ingredient can be reached.
///
/// Items on counters are reached from an adjacent floor cell; `original`
/// keeps the counter cell and `from_wall` records the indirection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location {
    /// Cell an agent stands on (or the item itself when `from_wall` is false).
    pub coordinate: Coordinate,
    /// Cell the item actually occupies.
    pub original: Coordinate,
    /// Whether `coordinate` was derived from a neighbouring counter.
    pub from_wall: bool,
}

impl Location {
    /// A location that is its own origin.
    pub const fn direct(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            original: coordinate,
            from_wall: false,
        }
    }
}

/// The dynamic part of a kitchen.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct State {
    /// Loose items keyed by the cell they lie on.
    pub items: BTreeMap<Coordinate, Ingredient>,
    /// Delivered dishes with the station they were delivered to.
    pub goal_items: Vec<(Coordinate, Ingredient)>,
    /// Agents indexed by [`AgentId`].
    pub agents: Vec<Agent>,
}

impl State {
    /// The agent with id `agent`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::UnknownAgent`] if no such agent exists.
    pub fn agent(&self, agent: AgentId) -> Result<&Agent, WorldError> {
        self.agents
            .get(agent.index())
            .ok_or(WorldError::UnknownAgent(agent))
    }

    /// Mutable access to the agent with id `agent`.
    pub fn agent_mut(&mut self, agent: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(agent.index())
    }

    /// The agent standing on `coordinate`, if any.
    pub fn agent_at(&self, coordinate: Coordinate) -> Option<AgentId> {
        self.agents
            .iter()
            .position(|agent| agent.coordinate == coordinate)
            .map(AgentId)
    }

    /// Cell of agent `agent`, if it exists.
    pub fn location(&self, agent: AgentId) -> Option<Coordinate> {
        self.agents.get(agent.index()).map(|entry| entry.coordinate)
    }

    /// Item held by agent `agent`.
    pub fn held_item(&self, agent: AgentId) -> Option<Ingredient> {
        self.agents.get(agent.index()).and_then(|entry| entry.item)
    }

    /// Loose item on `coordinate`.
    pub fn ingredient_at(&self, coordinate: Coordinate) -> Option<Ingredient> {
        self.items.get(&coordinate).copied()
    }

    /// Whether a counter cell already carries an item.
    pub fn is_wall_occupied(&self, coordinate: Coordinate) -> bool {
        self.items.contains_key(&coordinate)
    }

    /// Units of `ingredient` lying loose or held by agents.
    pub fn count(&self, ingredient: Ingredient) -> usize {
        let loose = self.items.values().filter(|item| **item == ingredient).count();
        let held = self
            .agents
            .iter()
            .filter(|agent| agent.is_holding(ingredient))
            .count();
        loose.saturating_add(held)
    }

    /// Every ingredient in the state, including delivered dishes.
    pub fn ingredients_count(&self) -> Ingredients {
        self.items
            .values()
            .copied()
            .chain(self.goal_items.iter().map(|(_, item)| *item))
            .chain(self.agents.iter().filter_map(|agent| agent.item))
            .collect()
    }

    /// Whether `ingredient` exists anywhere, delivered dishes included.
    pub fn contains_item(&self, ingredient: Ingredient) -> bool {
        self.items.values().any(|item| *item == ingredient)
            || self.goal_items.iter().any(|(_, item)| *item == ingredient)
            || self.agents.iter().any(|agent| agent.is_holding(ingredient))
    }

    /// Cells holding `ingredient`; agent cells are included on request.
    pub fn coordinates(&self, ingredient: Ingredient, include_agent_holding: bool) -> Vec<Coordinate> {
        let mut result: Vec<Coordinate> = self
            .items
            .iter()
            .filter(|(_, item)| **item == ingredient)
            .map(|(coordinate, _)| *coordinate)
            .collect();
        if include_agent_holding {
            result.extend(
                self.agents
                    .iter()
                    .filter(|agent| agent.is_holding(ingredient))
                    .map(|agent| agent.coordinate),
            );
        }
        result
    }

    /// Direct locations of `ingredient`, loose and held.
    pub fn locations(&self, ingredient: Ingredient) -> Vec<Location> {
        self.coordinates(ingredient, true)
            .into_iter()
            .map(Location::direct)
            .collect()
    }

    /// Put `ingredient` on `coordinate`.
    pub fn add(&mut self, coordinate: Coordinate, ingredient: Ingredient) {
        self.items.insert(coordinate, ingredient);
    }

    /// Record a delivered dish.
    pub fn add_goal_item(&mut self, coordinate: Coordinate, ingredient: Ingredient) {
        self.goal_items.push((coordinate, ingredient));
    }

    /// Take the loose item off `coordinate`.
    pub fn remove(&mut self, coordinate: Coordinate) -> Option<Ingredient> {
        self.items.remove(&coordinate)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> State {
        let mut state = State::default();
        state.add(Coordinate::new(0, 0), Ingredient::Tomato);
        state.add(Coordinate::new(3, 0), Ingredient::Plate);
        state.agents.push(Agent::new(Coordinate::new(1, 1)));
        state.agents.push(Agent {
            coordinate: Coordinate::new(2, 1),
            item: Some(Ingredient::Tomato),
        });
        state
    }

    #[test]
    fn counts_include_held_items() {
        let state = sample();
        assert_eq!(state.count(Ingredient::Tomato), 2);
        assert_eq!(state.coordinates(Ingredient::Tomato, false).len(), 1);
        assert_eq!(state.coordinates(Ingredient::Tomato, true).len(), 2);
        assert_eq!(state.ingredients_count().count(Ingredient::Plate), 1);
    }

    #[test]
    fn delivered_items_are_contained_and_compared() {
        let mut state = sample();
        let before = state.clone();
        assert!(!state.contains_item(Ingredient::DeliveredTomato));
        state.add_goal_item(Coordinate::new(4, 0), Ingredient::DeliveredTomato);
        assert!(state.contains_item(Ingredient::DeliveredTomato));
        assert_ne!(state, before);
    }

    #[test]
    fn agent_lookup() {
        let state = sample();
        assert_eq!(state.agent_at(Coordinate::new(2, 1)), Some(AgentId(1)));
        assert_eq!(state.held_item(AgentId(1)), Some(Ingredient::Tomato));
        assert!(state.agent(AgentId(5)).is_err());
        assert_eq!(state.location(AgentId(0)), Some(Coordinate::new(1, 1)));
    }
}
