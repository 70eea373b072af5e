//! Which cells each agent can reach this turn.
//!
//! For every agent and every coalition of other agents that may step out of
//! the way, a breadth-first flood from the agent's cell marks the reachable
//! cells. Counters adjacent to reachable floor are marked too, since items
//! on them can be picked up. Agents outside the coalition block their cell.

use std::collections::{BTreeMap, VecDeque};

use sous_types::{AgentCombination, AgentId, Coordinate, Ingredient, Recipe};
use sous_world::{Environment, State};

use crate::error::PlannerError;

/// Reachable-cell tables keyed by agent and cooperating coalition.
#[derive(Debug, Clone, Default)]
pub struct Reachability {
    tables: BTreeMap<(AgentId, AgentCombination), Vec<bool>>,
    width: usize,
}

impl Reachability {
    /// Flood every agent's reachable cells for every coalition of the other
    /// agents, the empty coalition included.
    pub fn new(environment: &Environment, state: &State) -> Self {
        let agent_count = state.agents.len();
        let everyone = AgentCombination::all(agent_count);
        let mut tables = BTreeMap::new();

        for index in 0..agent_count {
            let agent = AgentId(index);
            let Some(start) = state.location(agent) else {
                continue;
            };
            let mut coalitions = everyone.without(agent).subsets();
            coalitions.push(AgentCombination::default());
            for coalition in coalitions {
                let table = flood(environment, state, agent, start, &coalition);
                tables.insert((agent, coalition), table);
            }
        }

        Self {
            tables,
            width: environment.width(),
        }
    }

    fn is_reachable(table: &[bool], width: usize, coordinate: Coordinate) -> bool {
        let index = coordinate.y.saturating_mul(width).saturating_add(coordinate.x);
        table.get(index).copied().unwrap_or(false)
    }

    /// Whether `agent` can reach `ingredient` when `agents` may move out of
    /// its way. Holding the ingredient counts as reaching it.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::UnknownAgentCombination`] when no table
    /// exists for this agent and coalition.
    pub fn ingredient_reachable(
        &self,
        environment: &Environment,
        ingredient: Ingredient,
        agent: AgentId,
        agents: &AgentCombination,
        state: &State,
    ) -> Result<bool, PlannerError> {
        let table = self
            .tables
            .get(&(agent, agents.clone()))
            .ok_or_else(|| PlannerError::UnknownAgentCombination {
                agent,
                agents: agents.clone(),
            })?;

        if state.held_item(agent) == Some(ingredient) {
            return Ok(true);
        }
        Ok(environment
            .coordinates(state, ingredient, false)
            .into_iter()
            .any(|coordinate| Self::is_reachable(table, self.width, coordinate)))
    }

    /// Whether `agent` alone can reach both ingredients of `recipe`.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::UnknownAgentCombination`] for an unknown
    /// agent and coalition.
    pub fn ingredients_reachable(
        &self,
        environment: &Environment,
        recipe: Recipe,
        agent: AgentId,
        agents: &AgentCombination,
        state: &State,
    ) -> Result<bool, PlannerError> {
        Ok(self.ingredient_reachable(environment, recipe.ingredient1, agent, agents, state)?
            && self.ingredient_reachable(environment, recipe.ingredient2, agent, agents, state)?)
    }

    /// Whether each ingredient of `recipe` is reachable by some agent of
    /// `agents`, skipping `excluded`.
    ///
    /// Returns the pair of flags for the first and second ingredient.
    fn split_reachable(
        &self,
        environment: &Environment,
        recipe: Recipe,
        agents: &AgentCombination,
        excluded: Option<AgentId>,
        state: &State,
    ) -> Result<(bool, bool), PlannerError> {
        let mut reachable1 = false;
        let mut reachable2 = false;
        for agent in agents.iter().filter(|agent| Some(*agent) != excluded) {
            let others = agents.without(agent);
            if !reachable1 && self.ingredient_reachable(environment, recipe.ingredient1, agent, &others, state)? {
                reachable1 = true;
            }
            if !reachable2 && self.ingredient_reachable(environment, recipe.ingredient2, agent, &others, state)? {
                reachable2 = true;
            }
            if reachable1 && reachable2 {
                break;
            }
        }
        Ok((reachable1, reachable2))
    }

    /// Whether the agents of `agents` can jointly reach both ingredients of
    /// `recipe`, possibly different agents for each.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::UnknownAgentCombination`] for an unknown
    /// agent and coalition.
    pub fn recipe_reachable(
        &self,
        environment: &Environment,
        recipe: Recipe,
        agents: &AgentCombination,
        state: &State,
    ) -> Result<bool, PlannerError> {
        let (reachable1, reachable2) = self.split_reachable(environment, recipe, agents, None, state)?;
        Ok(reachable1 && reachable2)
    }

    /// Whether a plan in which `handoff_agent` relays an ingredient can
    /// work at all.
    ///
    /// The other agents must reach both ingredients between them, or reach
    /// one while the handoff agent reaches the other. A stationary first
    /// ingredient can never be brought by the handoff agent.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::UnknownAgentCombination`] for an unknown
    /// agent and coalition.
    pub fn handoff_feasible(
        &self,
        environment: &Environment,
        agents: &AgentCombination,
        handoff_agent: AgentId,
        recipe: Recipe,
        state: &State,
    ) -> Result<bool, PlannerError> {
        let (reachable1, reachable2) = self.split_reachable(environment, recipe, agents, Some(handoff_agent), state)?;
        if reachable1 && reachable2 {
            return Ok(true);
        }

        let others = agents.without(handoff_agent);
        if reachable2
            && !recipe.ingredient1.is_stationary()
            && self.ingredient_reachable(environment, recipe.ingredient1, handoff_agent, &others, state)?
        {
            return Ok(true);
        }
        if reachable1 && self.ingredient_reachable(environment, recipe.ingredient2, handoff_agent, &others, state)? {
            return Ok(true);
        }
        Ok(false)
    }
}

fn flood(
    environment: &Environment,
    state: &State,
    agent: AgentId,
    start: Coordinate,
    coalition: &AgentCombination,
) -> Vec<bool> {
    let width = environment.width();
    let size = width.saturating_mul(environment.height());
    let mut table = vec![false; size];
    let index_of = |coordinate: Coordinate| coordinate.y.saturating_mul(width).saturating_add(coordinate.x);

    if let Some(cell) = table.get_mut(index_of(start)) {
        *cell = true;
    }
    let mut frontier = VecDeque::from([start]);

    while let Some(current) = frontier.pop_front() {
        for neighbour in environment.neighbours(current) {
            let Some(cell) = table.get_mut(index_of(neighbour)) else {
                continue;
            };
            if *cell {
                continue;
            }
            *cell = true;

            let passable = state
                .agent_at(neighbour)
                .is_none_or(|blocker| blocker == agent || coalition.contains(blocker));
            if !environment.is_wall(neighbour) && passable {
                frontier.push_back(neighbour);
            }
        }
    }
    table
}
