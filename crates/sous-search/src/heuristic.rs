//! Collaborative distance estimate guiding the joint-action search.
//!
//! For a recipe `ingredient1 + ingredient2` the heuristic estimates how many
//! turns the searching agents need to bring the two ingredients together.
//! Paths that cross counters need a helper agent on each side; the estimate
//! adds the time each helper needs to reach its handoff point when that is
//! longer than the time the item needs to arrive there.

use sous_types::{AgentCombination, AgentId, Coordinate, Ingredient};
use sous_world::{Environment, Location, State};

use crate::oracle::DistanceOracle;

/// Furthest ring searched for a free counter to drop an unrelated item on.
const MAX_WALL_SEARCH: usize = 3;

/// A helper agent assigned to one leg of a path.
#[derive(Debug, Clone, Copy)]
struct Helper {
    /// Path length from the helper's handoff point to the destination.
    help_to_dest: usize,
    /// Turns the helper needs to reach the handoff point.
    agent_to_help: usize,
    /// The chosen agent.
    agent: AgentId,
}

/// Heuristic bound to one recipe's two inputs.
#[derive(Debug, Clone, Copy)]
pub struct Heuristic<'a> {
    environment: &'a Environment,
    oracle: &'a DistanceOracle,
    ingredient1: Ingredient,
    ingredient2: Ingredient,
}

impl<'a> Heuristic<'a> {
    /// Bind the heuristic to the two inputs of a recipe.
    pub const fn new(
        environment: &'a Environment,
        oracle: &'a DistanceOracle,
        ingredient1: Ingredient,
        ingredient2: Ingredient,
    ) -> Self {
        Self {
            environment,
            oracle,
            ingredient1,
            ingredient2,
        }
    }

    /// Estimated turns for `agents` to combine the two inputs in `state`.
    ///
    /// Returns `None` when no pair of locations can be brought together.
    pub fn estimate(&self, state: &State, agents: &AgentCombination, handoff_agent: Option<AgentId>) -> Option<usize> {
        let locations1 = if self.ingredient1.is_stationary() {
            self.environment.locations(state, self.ingredient1)
        } else {
            self.environment.non_wall_locations(state, self.ingredient1)
        };
        let locations2 = self.environment.non_wall_locations(state, self.ingredient2);

        locations1
            .iter()
            .flat_map(|location1| {
                locations2
                    .iter()
                    .map(move |location2| (location1, location2))
            })
            .filter_map(|(location1, location2)| {
                self.heuristic_distance(location1, location2, state, handoff_agent, agents)
            })
            .min()
    }

    fn heuristic_distance(
        &self,
        location1: &Location,
        location2: &Location,
        state: &State,
        handoff_agent: Option<AgentId>,
        agents: &AgentCombination,
    ) -> Option<usize> {
        if !are_items_available(location1, location2, state, agents) {
            return None;
        }

        let mut wall_penalty = usize::from(location1.from_wall) + usize::from(location2.from_wall);
        if !self.ingredient1.is_stationary() && !self.ingredient2.is_stationary() {
            wall_penalty = wall_penalty.saturating_add(
                self.nearest_wall(location1.original, None, state)
                    .min(self.nearest_wall(location2.original, None, state)),
            );
        }

        let mut best: Option<usize> = None;
        for walls in 0..agents.len() {
            if !self.ingredient1.is_stationary() {
                let forward = self.helper_agents_distance(
                    location1.coordinate,
                    location2.coordinate,
                    state,
                    handoff_agent,
                    agents,
                    walls,
                );
                best = min_option(best, forward);
            }
            let reverse = self.helper_agents_distance(
                location2.coordinate,
                location1.coordinate,
                state,
                handoff_agent,
                agents,
                walls,
            );
            best = min_option(best, reverse);
        }
        best.map(|distance| distance.saturating_add(wall_penalty))
    }

    /// Length of the path from `source` to `destination` under the wall
    /// budget, extended by however long the slowest helper lags behind.
    ///
    /// Walks the path backward from the destination; every counter on the
    /// way claims a helper. Returns `None` when some leg has no helper.
    fn helper_agents_distance(
        &self,
        source: Coordinate,
        destination: Coordinate,
        state: &State,
        handoff_agent: Option<AgentId>,
        agents: &AgentCombination,
        walls: usize,
    ) -> Option<usize> {
        if source == destination {
            return Some(0);
        }

        let mut local_agents = agents.clone();
        let mut helpers: Vec<Helper> = Vec::new();
        let mut previous = destination;
        let mut path_length = 1_usize;
        let mut first = true;
        loop {
            let entry = self.oracle.entry(source, previous, walls)?;
            let parent = entry.parent?;
            if parent == source {
                let mut helper =
                    self.find_helper(handoff_agent, &local_agents, first, state, source, None, path_length)?;
                if first
                    && state
                        .agent_at(source)
                        .is_some_and(|standing| standing != helper.agent)
                {
                    helper.agent_to_help = helper.agent_to_help.saturating_add(1);
                }
                helpers.push(helper);
                break;
            }

            path_length = path_length.saturating_add(1);
            if self.environment.is_wall(parent) {
                let helper = self.find_helper(
                    handoff_agent,
                    &local_agents,
                    first,
                    state,
                    previous,
                    Some(parent),
                    path_length,
                )?;
                local_agents.remove(helper.agent);
                helpers.push(helper);
                first = false;
            }
            previous = parent;
        }

        let forward_length = helpers.iter().fold(path_length, |length, helper| {
            let item_arrival = path_length.saturating_sub(helper.help_to_dest);
            length.saturating_add(helper.agent_to_help.saturating_sub(item_arrival))
        });
        Some(forward_length)
    }

    /// The agent closest to `target`, counting a detour to drop an
    /// unrelated held item. The first helper found is the last to act on
    /// the item, so it may not be the handoff agent.
    #[allow(clippy::too_many_arguments)]
    fn find_helper(
        &self,
        handoff_agent: Option<AgentId>,
        agents: &AgentCombination,
        first: bool,
        state: &State,
        target: Coordinate,
        blocked: Option<Coordinate>,
        path_length: usize,
    ) -> Option<Helper> {
        let mut best: Option<(usize, AgentId)> = None;
        for agent in agents.iter() {
            if first && handoff_agent == Some(agent) {
                continue;
            }
            let Some(entry) = state.agents.get(agent.index()) else {
                continue;
            };
            let Some(distance) = self.oracle.distance(entry.coordinate, target, 0) else {
                continue;
            };
            let holding_penalty = match entry.item {
                Some(item) if item != self.ingredient1 && item != self.ingredient2 => {
                    self.nearest_wall(entry.coordinate, blocked, state)
                }
                _ => 0,
            };
            let total = distance.saturating_add(holding_penalty);
            if best.is_none_or(|(current, _)| total < current) {
                best = Some((total, agent));
            }
        }
        best.map(|(agent_to_help, agent)| Helper {
            help_to_dest: path_length,
            agent_to_help,
            agent,
        })
    }

    /// Manhattan ring distance (up to three) to a free counter other than
    /// `blocked`; four when none is close.
    fn nearest_wall(&self, coordinate: Coordinate, blocked: Option<Coordinate>, state: &State) -> usize {
        if Some(coordinate) != blocked && self.environment.is_wall(coordinate) {
            return 0;
        }
        for ring in 1..=MAX_WALL_SEARCH {
            for a in 0..=ring {
                let b = ring.saturating_sub(a);
                let xs = [coordinate.x.checked_add(a), coordinate.x.checked_sub(a)];
                let ys = [coordinate.y.checked_add(b), coordinate.y.checked_sub(b)];
                for x in xs.into_iter().flatten() {
                    for y in ys.into_iter().flatten() {
                        let candidate = Coordinate::new(x, y);
                        if self.environment.is_inbounds(candidate)
                            && self.environment.is_wall(candidate)
                            && !state.is_wall_occupied(candidate)
                            && Some(candidate) != blocked
                        {
                            return ring;
                        }
                    }
                }
            }
        }
        MAX_WALL_SEARCH.saturating_add(1)
    }
}

/// Items held by agents outside the searching combination are out of reach.
fn are_items_available(
    location1: &Location,
    location2: &Location,
    state: &State,
    agents: &AgentCombination,
) -> bool {
    [location1, location2].into_iter().all(|location| {
        location.from_wall
            || state
                .agent_at(location.coordinate)
                .is_none_or(|agent| agents.contains(agent))
    })
}

fn min_option(current: Option<usize>, candidate: Option<usize>) -> Option<usize> {
    match (current, candidate) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sous_types::Recipe;
    use sous_world::Level;

    use super::*;

    fn bound(level: &Level, oracle: &DistanceOracle, recipe: Recipe) -> usize {
        let heuristic = Heuristic::new(&level.environment, oracle, recipe.ingredient1, recipe.ingredient2);
        heuristic
            .estimate(&level.state, &AgentCombination::all(level.state.agents.len()), None)
            .unwrap()
    }

    #[test]
    fn item_on_the_floor_path() {
        let text = "\
------
-    -
-/ t--
------

SimpleTomato

1,1
";
        let level = Level::parse(text, 1).unwrap();
        let oracle = DistanceOracle::new(&level.environment);
        let chop = Recipe::new(Ingredient::Cutting, Ingredient::Tomato, Ingredient::ChoppedTomato);
        // Walk to (2,2), pick the tomato off (3,2), chop at (1,2).
        assert_eq!(bound(&level, &oracle, chop), 4);
    }

    #[test]
    fn held_ingredients_of_outsiders_are_unavailable() {
        let text = "\
-----
-   -
--/--

SimpleTomato

1,1
3,1
";
        let mut level = Level::parse(text, 2).unwrap();
        level.state.agents.get_mut(1).unwrap().item = Some(Ingredient::Tomato);
        let oracle = DistanceOracle::new(&level.environment);
        let heuristic = Heuristic::new(&level.environment, &oracle, Ingredient::Cutting, Ingredient::Tomato);
        let only_first = AgentCombination::single(AgentId(0));
        assert_eq!(heuristic.estimate(&level.state, &only_first, None), None);
        let both = AgentCombination::all(2);
        assert!(heuristic.estimate(&level.state, &both, None).is_some());
    }

    #[test]
    fn crossing_a_counter_requires_two_agents() {
        let text = "\
-----/-
-  -  -
-t -  -
-------

SimpleTomato

4,1
2,1
";
        let level = Level::parse(text, 2).unwrap();
        let oracle = DistanceOracle::new(&level.environment);
        let heuristic = Heuristic::new(&level.environment, &oracle, Ingredient::Cutting, Ingredient::Tomato);
        let alone = heuristic.estimate(&level.state, &AgentCombination::single(AgentId(0)), None);
        let together = heuristic.estimate(&level.state, &AgentCombination::all(2), None);
        assert_eq!(alone, None);
        assert_eq!(together, Some(7));
    }
}
