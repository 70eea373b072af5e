//! Uninformed breadth-first joint-action search.
//!
//! Kept as a baseline for the A* search: it explores every joint action of
//! the searching agents in turn order and ignores handoffs.

use std::collections::{HashSet, VecDeque};

use sous_types::JointAction;
use sous_world::{Environment, State};
use tracing::debug;

use crate::SearchRequest;
use crate::error::SearchError;

struct Node {
    state: State,
    parent: Option<usize>,
    action: Option<JointAction>,
}

/// Breadth-first searcher.
#[derive(Debug, Clone)]
pub struct Bfs {
    environment: Environment,
}

impl Bfs {
    /// Create a searcher for `environment`.
    pub const fn new(environment: Environment) -> Self {
        Self { environment }
    }

    /// The level this searcher plans in.
    pub const fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Shortest joint-action sequence producing the recipe result, or an
    /// empty path when the reachable state space holds none.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::UnsupportedHandoff`] or
    /// [`SearchError::UnsupportedInitialAction`] when the request uses
    /// either.
    pub fn search_joint(&self, request: &SearchRequest<'_>) -> Result<Vec<JointAction>, SearchError> {
        if request.handoff_agent.is_some() {
            return Err(SearchError::UnsupportedHandoff);
        }
        if request.initial_action.is_some() {
            return Err(SearchError::UnsupportedInitialAction);
        }

        let actions = self.environment.joint_actions(request.agents);
        let mut nodes = vec![Node {
            state: request.state.clone(),
            parent: None,
            action: None,
        }];
        let mut visited = HashSet::from([request.state.clone()]);
        let mut frontier = VecDeque::from([0_usize]);

        while let Some(current) = frontier.pop_front() {
            for action in &actions {
                let Some(mut state) = nodes.get(current).map(|node| node.state.clone()) else {
                    continue;
                };
                self.environment.act(&mut state, action);
                if visited.contains(&state) {
                    continue;
                }
                let produced = state.contains_item(request.recipe.result);
                visited.insert(state.clone());
                nodes.push(Node {
                    state,
                    parent: Some(current),
                    action: Some(action.clone()),
                });
                let id = nodes.len().saturating_sub(1);
                if produced {
                    let path = extract_actions(&nodes, id);
                    debug!(recipe = %request.recipe, length = path.len(), nodes = nodes.len(), "Search found path");
                    return Ok(path);
                }
                frontier.push_back(id);
            }
        }
        debug!(recipe = %request.recipe, nodes = nodes.len(), "Search exhausted");
        Ok(Vec::new())
    }
}

fn extract_actions(nodes: &[Node], goal: usize) -> Vec<JointAction> {
    let mut actions = Vec::new();
    let mut cursor = Some(goal);
    while let Some(node) = cursor.and_then(|id| nodes.get(id)) {
        if let Some(action) = &node.action {
            actions.push(action.clone());
        }
        cursor = node.parent;
    }
    actions.reverse();
    actions
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sous_types::{Action, AgentCombination, AgentId, Direction, Ingredient, Recipe};
    use sous_world::Level;

    use super::*;

    const LINE: &str = "\
------
-t   /
------

SimpleTomato

3,1
";

    #[test]
    fn finds_the_same_length_as_a_star() {
        let level = Level::parse(LINE, 1).unwrap();
        let agents = AgentCombination::all(1);
        let free = AgentCombination::default();
        let request = SearchRequest {
            state: &level.state,
            recipe: Recipe::new(Ingredient::Cutting, Ingredient::Tomato, Ingredient::ChoppedTomato),
            agents: &agents,
            handoff_agent: None,
            input_actions: &[],
            free_agents: &free,
            initial_action: None,
        };
        let path = Bfs::new(level.environment.clone()).search_joint(&request).unwrap();
        assert_eq!(path.len(), 5);
    }

    #[test]
    fn rejects_handoffs_and_pinned_actions() {
        let level = Level::parse(LINE, 1).unwrap();
        let agents = AgentCombination::all(1);
        let free = AgentCombination::default();
        let bfs = Bfs::new(level.environment.clone());
        let mut request = SearchRequest {
            state: &level.state,
            recipe: Recipe::new(Ingredient::Cutting, Ingredient::Tomato, Ingredient::ChoppedTomato),
            agents: &agents,
            handoff_agent: Some(AgentId(0)),
            input_actions: &[],
            free_agents: &free,
            initial_action: None,
        };
        assert!(matches!(bfs.search_joint(&request), Err(SearchError::UnsupportedHandoff)));
        request.handoff_agent = None;
        request.initial_action = Some(Action::new(Direction::Left, AgentId(0)));
        assert!(matches!(
            bfs.search_joint(&request),
            Err(SearchError::UnsupportedInitialAction)
        ));
    }
}
