//! Goals and composite collaboration hypotheses.
//!
//! A [`Goal`] names one recipe, the agents allowed to work on it, and an
//! optional handoff agent. [`Goals`] groups several goals that are pursued
//! at the same time.

use std::cmp::Ordering;

use sous_types::{AgentCombination, AgentId, Recipe};

/// One recipe pursued by a set of agents.
///
/// The derived ordering compares agents first, then the handoff agent,
/// then the recipe.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Goal {
    /// Agents allowed to act towards the recipe.
    pub agents: AgentCombination,
    /// Agent that must pass its contribution on and then stay.
    pub handoff_agent: Option<AgentId>,
    /// Recipe whose result completes the goal.
    pub recipe: Recipe,
}

impl Goal {
    /// Create a goal.
    pub const fn new(agents: AgentCombination, recipe: Recipe, handoff_agent: Option<AgentId>) -> Self {
        Self {
            agents,
            handoff_agent,
            recipe,
        }
    }

    /// The "doing nothing useful" hypothesis for `agent`.
    pub fn idle(agent: AgentId) -> Self {
        Self::new(AgentCombination::single(agent), Recipe::IDLE, None)
    }

    /// Whether this is an idle hypothesis.
    pub fn is_idle(&self) -> bool {
        self.recipe.is_idle()
    }
}

impl core::fmt::Display for Goal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}{}/", self.recipe, self.agents)?;
        match self.handoff_agent {
            Some(agent) => write!(f, "{agent}"),
            None => write!(f, "-"),
        }
    }
}

/// Several goals considered together as one hypothesis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Goals {
    goals: Vec<Goal>,
}

static NO_AGENTS: AgentCombination = AgentCombination::new(Vec::new());

impl Goals {
    /// An empty hypothesis.
    pub const fn new() -> Self {
        Self { goals: Vec::new() }
    }

    /// Add `goal`, keeping the goals sorted.
    pub fn add(&mut self, goal: Goal) {
        self.goals.push(goal);
        self.goals.sort();
    }

    /// Copy of `self` with every goal assigned to `agents`.
    #[must_use]
    pub fn with_agents(&self, agents: &AgentCombination) -> Self {
        let mut goals: Vec<Goal> = self
            .goals
            .iter()
            .map(|goal| Goal::new(agents.clone(), goal.recipe, goal.handoff_agent))
            .collect();
        goals.sort();
        Self { goals }
    }

    /// Assign handoff agents to the goals, in goal order.
    pub fn update_handoffs(&mut self, handoff_agents: &[Option<AgentId>]) {
        for (goal, handoff_agent) in self.goals.iter_mut().zip(handoff_agents) {
            goal.handoff_agent = *handoff_agent;
        }
    }

    /// Remove every handoff agent.
    pub fn clear_handoffs(&mut self) {
        for goal in &mut self.goals {
            goal.handoff_agent = None;
        }
    }

    /// Agents shared by the goals; empty for an empty hypothesis.
    pub fn agents(&self) -> &AgentCombination {
        self.goals.first().map_or(&NO_AGENTS, |goal| &goal.agents)
    }

    /// Whether every goal uses the same agents.
    pub fn has_same_agents(&self) -> bool {
        let agents = self.agents();
        self.goals.iter().all(|goal| &goal.agents == agents)
    }

    /// Recipes of the goals, in goal order.
    pub fn recipes(&self) -> Vec<Recipe> {
        self.goals.iter().map(|goal| goal.recipe).collect()
    }

    /// Iterate over the goals.
    pub fn iter(&self) -> impl Iterator<Item = &Goal> + '_ {
        self.goals.iter()
    }

    /// Number of goals.
    pub const fn len(&self) -> usize {
        self.goals.len()
    }

    /// Whether there are no goals.
    pub const fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }

    /// Handoff agents in goal order, `-` for none.
    pub fn handoff_string(&self) -> String {
        self.goals
            .iter()
            .map(|goal| goal.handoff_agent.map_or_else(|| "-".to_owned(), |agent| agent.to_string()))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl From<Goal> for Goals {
    fn from(goal: Goal) -> Self {
        Self { goals: vec![goal] }
    }
}

impl PartialOrd for Goals {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Goals {
    fn cmp(&self, other: &Self) -> Ordering {
        self.goals
            .len()
            .cmp(&other.goals.len())
            .then_with(|| self.goals.cmp(&other.goals))
    }
}

impl core::fmt::Display for Goals {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for goal in &self.goals {
            write!(f, "{}", goal.recipe)?;
        }
        write!(f, ":{}:{}", self.agents(), self.handoff_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sous_types::Ingredient;

    use super::*;

    fn chop_tomato() -> Recipe {
        Recipe::new(Ingredient::Cutting, Ingredient::Tomato, Ingredient::ChoppedTomato)
    }

    fn chop_lettuce() -> Recipe {
        Recipe::new(Ingredient::Cutting, Ingredient::Lettuce, Ingredient::ChoppedLettuce)
    }

    #[test]
    fn goals_stay_sorted_and_track_agents() {
        let both = AgentCombination::all(2);
        let mut goals = Goals::new();
        goals.add(Goal::new(both.clone(), chop_lettuce(), None));
        goals.add(Goal::new(both.clone(), chop_tomato(), None));
        assert!(goals.has_same_agents());
        assert_eq!(goals.recipes(), vec![chop_tomato(), chop_lettuce()]);
        assert_eq!(goals.agents(), &both);

        goals.add(Goal::new(AgentCombination::single(AgentId(0)), chop_tomato(), None));
        assert!(!goals.has_same_agents());
    }

    #[test]
    fn handoffs_follow_goal_order() {
        let both = AgentCombination::all(2);
        let mut goals = Goals::new();
        goals.add(Goal::new(both.clone(), chop_tomato(), None));
        goals.add(Goal::new(both, chop_lettuce(), None));
        goals.update_handoffs(&[Some(AgentId(1)), Some(AgentId(0))]);
        assert_eq!(goals.handoff_string(), "1,0");

        goals.clear_handoffs();
        assert_eq!(goals.handoff_string(), "-,-");
    }

    #[test]
    fn reassigned_agents_compare_equal_to_fresh_goals() {
        let mut pair = Goals::new();
        pair.add(Goal::new(AgentCombination::all(2), chop_tomato(), None));
        let single = AgentCombination::single(AgentId(1));
        let reduced = pair.with_agents(&single);
        assert_eq!(reduced, Goals::from(Goal::new(single, chop_tomato(), None)));
    }

    #[test]
    fn larger_hypotheses_order_last() {
        let one = Goals::from(Goal::new(AgentCombination::all(2), chop_lettuce(), None));
        let mut two = Goals::new();
        two.add(Goal::new(AgentCombination::single(AgentId(0)), chop_tomato(), None));
        two.add(Goal::new(AgentCombination::single(AgentId(0)), chop_lettuce(), None));
        assert!(one < two);
    }

    #[test]
    fn idle_goal_display() {
        let idle = Goal::idle(AgentId(1));
        assert!(idle.is_idle());
        assert_eq!(idle.to_string(), "y(1)/-");
    }
}
