//! Searched plans keyed by goal.
//!
//! An [`ActionPath`] wraps the joint actions found for one [`Goal`] and
//! records when the goal's handoff agent does something useful with a
//! recipe ingredient at a counter. The last such turn is the path's
//! handoff time.

use std::collections::BTreeMap;

use sous_types::{Action, AgentCombination, AgentId, Direction, Ingredient, JointAction, Recipe};
use sous_world::{Environment, State};

use crate::goal::Goal;

/// The plan for one goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionPath {
    /// Joint actions, one per turn.
    pub joint_actions: Vec<JointAction>,
    /// Recipe the plan produces.
    pub recipe: Recipe,
    /// Agents the plan was searched for.
    pub agents: AgentCombination,
    /// Agent that hands its contribution over.
    pub handoff_agent: Option<AgentId>,
    /// First turn at which the handoff agent touches a counter while a
    /// recipe ingredient is involved.
    pub first_action: Option<usize>,
    /// Last such turn.
    pub last_action: Option<usize>,
}

impl ActionPath {
    /// Wrap `joint_actions` found for `goal` from `state`.
    pub fn new(joint_actions: Vec<JointAction>, goal: &Goal, state: &State, environment: &Environment) -> Self {
        let mut path = Self {
            joint_actions,
            recipe: goal.recipe,
            agents: goal.agents.clone(),
            handoff_agent: goal.handoff_agent,
            first_action: None,
            last_action: None,
        };
        if let Some(agent) = path.handoff_agent {
            path.first_action = path.find_first_useful(agent, state, environment);
            path.last_action = path.find_last_useful(agent, state, environment);
        }
        path
    }

    /// Scan from the initial state; counters and held items are judged
    /// against that state throughout.
    fn find_first_useful(&self, agent: AgentId, state: &State, environment: &Environment) -> Option<usize> {
        let mut coordinate = state.location(agent)?;
        let held = state.held_item(agent);
        for (index, joint_action) in self.joint_actions.iter().enumerate() {
            let direction = joint_action.direction(agent);
            if let Some(target) = environment.move_noclip(coordinate, direction)
                && environment.is_wall(target)
                && (self.is_ingredient(state.ingredient_at(target)) || self.is_ingredient(held))
            {
                return Some(index);
            }
            coordinate = environment.move_clipped(coordinate, direction);
        }
        None
    }

    /// Scan while replaying the plan; each turn is judged on the state
    /// after that turn.
    fn find_last_useful(&self, agent: AgentId, state: &State, environment: &Environment) -> Option<usize> {
        let mut coordinate = state.location(agent)?;
        let mut current = state.clone();
        let mut last = None;
        for (index, joint_action) in self.joint_actions.iter().enumerate() {
            environment.act(&mut current, joint_action);
            let direction = joint_action.direction(agent);
            if let Some(target) = environment.move_noclip(coordinate, direction)
                && environment.is_wall(target)
                && (self.is_ingredient(current.ingredient_at(target))
                    || self.is_ingredient(current.held_item(agent)))
            {
                last = Some(index);
            }
            coordinate = environment.move_clipped(coordinate, direction);
        }
        last
    }

    fn is_ingredient(&self, item: Option<Ingredient>) -> bool {
        item.is_some_and(|item| item == self.recipe.ingredient1 || item == self.recipe.ingredient2)
    }

    /// Number of turns.
    pub const fn len(&self) -> usize {
        self.joint_actions.len()
    }

    /// Whether the plan is empty.
    pub const fn is_empty(&self) -> bool {
        self.joint_actions.is_empty()
    }

    /// Whether the handoff agent does anything useful at all.
    pub const fn contains_useful_action(&self) -> bool {
        self.last_action.is_some()
    }

    /// Whether `agent` ever bumps into a counter in this plan.
    pub fn has_useful_action(&self, agent: AgentId, state: &State, environment: &Environment) -> bool {
        let Some(mut coordinate) = state.location(agent) else {
            return false;
        };
        for joint_action in &self.joint_actions {
            let Some(next) = environment.move_noclip(coordinate, joint_action.direction(agent)) else {
                continue;
            };
            coordinate = next;
            if environment.is_wall(coordinate) {
                return true;
            }
        }
        false
    }

    /// First turn at which `agent` does not stay.
    pub fn first_non_trivial_index(&self, agent: AgentId) -> Option<usize> {
        self.joint_actions.iter().position(|action| action.is_active(agent))
    }

    /// The first action of `agent`, or stay for an empty plan.
    pub fn next_action(&self, agent: AgentId) -> Action {
        self.joint_actions
            .first()
            .map_or(Action::new(Direction::Stay, agent), |action| action.action(agent))
    }
}

/// Plans found this turn, one per goal.
#[derive(Debug, Clone, Default)]
pub struct Paths {
    paths: BTreeMap<Goal, ActionPath>,
}

impl Paths {
    /// No plans.
    pub const fn new() -> Self {
        Self {
            paths: BTreeMap::new(),
        }
    }

    /// Record the plan for `goal`, replacing any earlier one.
    pub fn insert(&mut self, goal: Goal, path: ActionPath) {
        self.paths.insert(goal, path);
    }

    /// Record `joint_actions` as the plan for `goal`.
    pub fn update(&mut self, joint_actions: Vec<JointAction>, goal: &Goal, state: &State, environment: &Environment) {
        let path = ActionPath::new(joint_actions, goal, state, environment);
        self.paths.insert(goal.clone(), path);
    }

    /// The plan for `goal`.
    pub fn get(&self, goal: &Goal) -> Option<&ActionPath> {
        self.paths.get(goal)
    }

    /// All plans in goal order.
    pub fn iter(&self) -> impl Iterator<Item = (&Goal, &ActionPath)> + '_ {
        self.paths.iter()
    }

    /// Number of plans.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether no plan was found.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sous_world::Level;

    use super::*;

    /// Agent 0 on the left of a counter, agent 1 next to the cutting board.
    const DIVIDED: &str = "\
-------
t  -  /
-------

SimpleTomato

1,1
4,1
";

    fn chop() -> Recipe {
        Recipe::new(Ingredient::Cutting, Ingredient::Tomato, Ingredient::ChoppedTomato)
    }

    /// Agent 0 fetches the tomato and drops it on the counter; agent 1
    /// picks it up and chops it.
    fn relay() -> Vec<JointAction> {
        use Direction::{Left, Right, Stay};
        [
            (Left, Stay),
            (Right, Stay),
            (Right, Stay),
            (Stay, Left),
            (Stay, Right),
            (Stay, Right),
        ]
        .into_iter()
        .map(|(first, second)| JointAction::from_directions(vec![first, second]))
        .collect()
    }

    #[test]
    fn handoff_window_covers_pickup_and_drop() {
        let level = Level::parse(DIVIDED, 2).unwrap();
        let goal = Goal::new(AgentCombination::all(2), chop(), Some(AgentId(0)));
        let path = ActionPath::new(relay(), &goal, &level.state, &level.environment);

        assert_eq!(path.len(), 6);
        assert_eq!(path.first_action, Some(0));
        assert_eq!(path.last_action, Some(2));
        assert!(path.contains_useful_action());
        assert!(path.has_useful_action(AgentId(0), &level.state, &level.environment));
        assert_eq!(path.first_non_trivial_index(AgentId(1)), Some(3));
        assert_eq!(path.next_action(AgentId(0)).direction, Direction::Left);
    }

    #[test]
    fn paths_without_handoff_have_no_window() {
        let level = Level::parse(DIVIDED, 2).unwrap();
        let goal = Goal::new(AgentCombination::all(2), chop(), None);
        let mut paths = Paths::new();
        paths.update(relay(), &goal, &level.state, &level.environment);

        let path = paths.get(&goal).unwrap();
        assert_eq!(path.first_action, None);
        assert_eq!(path.last_action, None);
        assert_eq!(paths.len(), 1);
        assert!(!paths.is_empty());
    }

    #[test]
    fn empty_plan_stays() {
        let level = Level::parse(DIVIDED, 2).unwrap();
        let goal = Goal::new(AgentCombination::single(AgentId(1)), chop(), None);
        let path = ActionPath::new(Vec::new(), &goal, &level.state, &level.environment);
        assert!(path.is_empty());
        assert_eq!(path.next_action(AgentId(1)), Action::stay(AgentId(1)));
        assert!(!path.has_useful_action(AgentId(1), &level.state, &level.environment));
    }
}
