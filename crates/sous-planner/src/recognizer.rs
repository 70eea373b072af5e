//! Sliding-window goal recognition.
//!
//! Every turn the planner reports the best known path length for each goal
//! it searched. The recognizer keeps that history per goal and turns the
//! recent trend into a probability: goals that are short and shrinking are
//! likely, goals that stall are not. Each agent also has an idle hypothesis
//! that grows when no goal involving the agent makes progress.
//!
//! After each [`Recognizer::update`] all probabilities are divided by the
//! turn's maximum, so the most likely hypothesis scores exactly 1.0.

use std::collections::BTreeMap;

use sous_types::{AgentCombination, AgentId};
use sous_world::State;
use tracing::{debug, trace};

use crate::config::RecognizerConfig;
use crate::error::PlannerError;
use crate::goal::Goal;

/// Length history and last probability of one goal.
#[derive(Debug, Clone, Default, PartialEq)]
struct GoalEntry {
    probability: f64,
    /// One sample per turn; `None` before the goal was first observed.
    lengths: Vec<Option<usize>>,
    length_prob: f64,
    progress_prob: f64,
}

impl GoalEntry {
    fn observed(length: usize, time_step: usize) -> Self {
        let mut entry = Self::default();
        entry.add(length, time_step);
        entry
    }

    /// Pad the history with the last sample until it covers `time_step`
    /// turns.
    fn repeat(&mut self, time_step: usize) {
        if self.lengths.is_empty() {
            if time_step == 0 {
                return;
            }
            self.lengths.push(None);
        }
        let last = self.lengths.last().copied().flatten();
        while self.lengths.len() < time_step {
            self.lengths.push(last);
        }
    }

    fn add(&mut self, length: usize, time_step: usize) {
        self.repeat(time_step.saturating_sub(1));
        self.lengths.push(Some(length));
    }

    /// First observed sample at or after `index`.
    fn non_empty_index(&self, index: usize) -> Option<usize> {
        self.lengths
            .iter()
            .enumerate()
            .skip(index)
            .find(|(_, length)| length.is_some())
            .map(|(position, _)| position)
    }

    fn length_at(&self, index: usize) -> Option<usize> {
        self.lengths.get(index).copied().flatten()
    }

    /// Whether the entry has a sample for the current turn. Idle entries
    /// have no history and are always current.
    const fn is_current(&self, time_step: usize) -> bool {
        self.lengths.len() == time_step || self.lengths.is_empty()
    }
}

/// Sliding-window recognizer over all goals of a level.
#[derive(Debug, Clone)]
pub struct Recognizer {
    config: RecognizerConfig,
    agent_count: usize,
    goals: BTreeMap<Goal, GoalEntry>,
    time_step: usize,
}

impl Recognizer {
    /// Create a recognizer with one idle hypothesis per agent.
    pub fn new(agent_count: usize, config: RecognizerConfig) -> Self {
        let goals = (0..agent_count)
            .map(|agent| (Goal::idle(AgentId(agent)), GoalEntry::default()))
            .collect();
        Self {
            config,
            agent_count,
            goals,
            time_step: 0,
        }
    }

    /// Number of updates so far.
    pub const fn time_step(&self) -> usize {
        self.time_step
    }

    /// Record this turn's path lengths and recompute all probabilities.
    ///
    /// Goals missing from `lengths` score 0 if their result already exists
    /// in `state` and repeat their previous length otherwise.
    pub fn update(&mut self, lengths: &BTreeMap<Goal, usize>, state: &State) {
        self.time_step = self.time_step.saturating_add(1);
        self.insert(lengths, state);

        let base_window_index = self.time_step.saturating_sub(self.config.window);
        let goal_max = self.update_goal_probabilities(base_window_index);
        let idle_max = self.update_idle_probabilities(base_window_index);
        self.normalise(goal_max.max(idle_max));

        for (goal, entry) in &self.goals {
            if entry.is_current(self.time_step) {
                trace!(
                    %goal,
                    length_prob = entry.length_prob,
                    progress_prob = entry.progress_prob,
                    probability = entry.probability,
                    "Goal probability"
                );
            }
        }
    }

    fn insert(&mut self, lengths: &BTreeMap<Goal, usize>, state: &State) {
        let time_step = self.time_step;
        for (goal, length) in lengths {
            self.goals
                .entry(goal.clone())
                .and_modify(|entry| entry.add(*length, time_step))
                .or_insert_with(|| GoalEntry::observed(*length, time_step));
        }

        for (goal, entry) in &mut self.goals {
            if entry.is_current(time_step) {
                continue;
            }
            if state.contains_item(goal.recipe.result) {
                entry.add(0, time_step);
            } else {
                entry.repeat(time_step);
            }
        }
    }

    /// Length and progress scores for every current goal. Returns the
    /// largest probability.
    #[allow(clippy::cast_precision_loss)]
    fn update_goal_probabilities(&mut self, base_window_index: usize) -> f64 {
        let config = &self.config;
        let time_step = self.time_step;
        let mut max_probability = 0.0_f64;

        for (goal, entry) in &mut self.goals {
            if !entry.is_current(time_step) {
                continue;
            }
            let window_index = entry.non_empty_index(base_window_index);
            let samples = window_index.and_then(|index| {
                let old = entry.length_at(index)?;
                let latest = entry.length_at(time_step.saturating_sub(1))?;
                Some((index, old, latest))
            });
            let Some((index, old, latest)) = samples else {
                entry.probability = 0.0;
                continue;
            };

            let window_length = time_step.saturating_sub(index).saturating_sub(1);
            let length_prob = config.alpha / (old as f64 + config.alpha);
            let exponent = (goal.agents.len().saturating_sub(1) as f64).mul_add(0.5, 1.0);
            let progress_prob = (old as f64 / latest.saturating_add(window_length) as f64)
                .powf(exponent)
                .clamp(0.0, 1.0);

            entry.length_prob = length_prob;
            if window_length == 0 {
                entry.probability = length_prob * config.new_goal_penalty;
            } else {
                entry.probability = length_prob * progress_prob;
                entry.progress_prob = progress_prob;
            }
            max_probability = max_probability.max(entry.probability);
        }
        max_probability
    }

    /// Idle scores: an agent looks idle when no goal it is useful for has
    /// shrunk recently. Returns the largest idle probability.
    #[allow(clippy::cast_precision_loss)]
    fn update_idle_probabilities(&mut self, base_window_index: usize) -> f64 {
        let time_step = self.time_step;
        let mut max_progress = vec![0.0_f64; self.agent_count];
        let coalitions = AgentCombination::all(self.agent_count).subsets();

        for (goal, entry) in &self.goals {
            if !entry.is_current(time_step) || time_step == 1 {
                continue;
            }
            let Some(window_index) = entry.non_empty_index(base_window_index) else {
                continue;
            };
            let mut window_length = time_step.saturating_sub(window_index).saturating_sub(1);
            // A goal first seen last turn still gets one turn of credit.
            if window_index == time_step.saturating_sub(1) {
                window_length = window_length.saturating_add(1);
            }
            let (Some(old), Some(latest)) = (
                entry.length_at(window_index),
                entry.length_at(time_step.saturating_sub(1)),
            ) else {
                continue;
            };
            let progress = ((old as f64 - latest as f64) / window_length as f64).clamp(0.0, 1.0);

            for agent in goal.agents.iter() {
                if !self.is_useful(agent, goal, entry.probability, &coalitions) {
                    continue;
                }
                if let Some(best) = max_progress.get_mut(agent.index()) {
                    *best = best.max(progress);
                }
            }
        }

        let mut max_probability = 0.0_f64;
        for (agent, progress) in max_progress.iter().enumerate() {
            let mut probability = 1.0 - progress / self.config.none_divisor;
            if time_step == 1 {
                probability = 0.0;
            }
            probability *= self.config.beta;
            max_probability = max_probability.max(probability);

            if let Some(entry) = self.goals.get_mut(&Goal::idle(AgentId(agent))) {
                entry.probability = probability;
                entry.progress_prob = probability;
            }
        }
        max_probability
    }

    /// Whether no coalition without `agent` pursues the same recipe with a
    /// clearly higher probability.
    fn is_useful(&self, agent: AgentId, goal: &Goal, probability: f64, coalitions: &[AgentCombination]) -> bool {
        let bar = probability * self.config.delta;
        !coalitions
            .iter()
            .filter(|coalition| !coalition.contains(agent))
            .any(|coalition| {
                coalition
                    .iter()
                    .map(Some)
                    .chain(core::iter::once(None))
                    .any(|handoff_agent| {
                        let other = Goal::new(coalition.clone(), goal.recipe, handoff_agent);
                        self.goals.get(&other).is_some_and(|entry| {
                            entry.is_current(self.time_step) && entry.probability >= bar
                        })
                    })
            })
    }

    fn normalise(&mut self, max_probability: f64) {
        if max_probability <= 0.0 {
            return;
        }
        for entry in self.goals.values_mut() {
            entry.probability /= max_probability;
        }
    }

    /// Current probability of `goal`; 0 for goals never observed.
    pub fn probability(&self, goal: &Goal) -> f64 {
        self.goals.get(goal).map_or(0.0, |entry| entry.probability)
    }

    /// Whether `goal` clears the probability threshold on its own.
    pub fn is_probable(&self, goal: &Goal) -> bool {
        self.goals
            .get(goal)
            .is_some_and(|entry| entry.probability >= self.config.threshold)
    }

    /// Idle probability of `agent`.
    pub fn idle_probability(&self, agent: AgentId) -> Result<f64, PlannerError> {
        self.goals
            .get(&Goal::idle(agent))
            .map(|entry| entry.probability)
            .ok_or(PlannerError::UnknownAgent(agent))
    }

    /// Whether `goal` is probable for `acting_agent` relative to the best
    /// alternative among `available` (and the agent's idle hypothesis when
    /// `use_idle` is set).
    ///
    /// Goals involving another agent that is certainly idle are never
    /// probable.
    pub fn is_probable_normalised(
        &self,
        goal: &Goal,
        available: &[Goal],
        acting_agent: AgentId,
        planning_agent: AgentId,
        use_idle: bool,
    ) -> Result<bool, PlannerError> {
        let Some(entry) = self.goals.get(goal) else {
            return Ok(false);
        };

        for agent in goal.agents.iter() {
            if agent != planning_agent && self.idle_probability(agent)? >= 1.0 {
                return Ok(false);
            }
        }

        let mut highest = available
            .iter()
            .filter(|other| other.agents.contains(acting_agent))
            .filter_map(|other| self.goals.get(other))
            .map(|other| other.probability)
            .fold(0.0_f64, f64::max);
        if use_idle {
            highest = highest.max(self.idle_probability(acting_agent)?);
        }
        if highest <= 0.0 {
            return Ok(false);
        }

        let normalised = entry.probability / highest;
        debug!(%goal, agent = %acting_agent, normalised, "Normalised probability");
        Ok(normalised >= self.config.threshold)
    }

    /// The most probable current goal for each agent.
    pub fn most_likely_goals(&self) -> BTreeMap<AgentId, Goal> {
        let mut best: BTreeMap<AgentId, (Goal, f64)> = BTreeMap::new();
        for (goal, entry) in &self.goals {
            for agent in goal.agents.iter() {
                let replace = best
                    .get(&agent)
                    .is_none_or(|(_, probability)| *probability < entry.probability);
                if replace {
                    best.insert(agent, (goal.clone(), entry.probability));
                }
            }
        }
        best.into_iter().map(|(agent, (goal, _))| (agent, goal)).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sous_types::{Coordinate, Ingredient, Recipe};
    use sous_world::Agent;

    use super::*;

    fn chop_tomato() -> Recipe {
        Recipe::new(Ingredient::Cutting, Ingredient::Tomato, Ingredient::ChoppedTomato)
    }

    fn chop_lettuce() -> Recipe {
        Recipe::new(Ingredient::Cutting, Ingredient::Lettuce, Ingredient::ChoppedLettuce)
    }

    fn state(agents: usize) -> State {
        let mut state = State::default();
        for x in 0..agents {
            state.agents.push(Agent::new(Coordinate::new(x, 0)));
        }
        state
    }

    fn solo(agent: usize, recipe: Recipe) -> Goal {
        Goal::new(AgentCombination::single(AgentId(agent)), recipe, None)
    }

    fn max_probability(recognizer: &Recognizer) -> f64 {
        recognizer
            .goals
            .values()
            .map(|entry| entry.probability)
            .fold(0.0, f64::max)
    }

    #[test]
    fn first_turn_normalises_to_one() {
        let mut recognizer = Recognizer::new(2, RecognizerConfig::default());
        let lengths = BTreeMap::from([
            (solo(0, chop_tomato()), 4),
            (solo(1, chop_lettuce()), 60),
            (Goal::new(AgentCombination::all(2), chop_tomato(), None), 3),
        ]);
        recognizer.update(&lengths, &state(2));

        assert!((max_probability(&recognizer) - 1.0).abs() < 1e-9);
        assert!(recognizer.idle_probability(AgentId(0)).unwrap() <= 0.0);
        assert!(recognizer.is_probable(&Goal::new(AgentCombination::all(2), chop_tomato(), None)));
        assert!(!recognizer.is_probable(&solo(1, chop_lettuce())));
    }

    #[test]
    fn stalled_agent_looks_idle() {
        let mut recognizer = Recognizer::new(2, RecognizerConfig::default());
        let goal = solo(0, chop_tomato());
        recognizer.update(&BTreeMap::from([(goal.clone(), 5)]), &state(2));
        recognizer.update(&BTreeMap::from([(goal.clone(), 5)]), &state(2));

        assert!(recognizer.idle_probability(AgentId(0)).unwrap() >= 1.0);
        assert!(recognizer.probability(&goal) < 1.0);
        let available = [goal.clone()];
        assert!(
            !recognizer
                .is_probable_normalised(&goal, &available, AgentId(0), AgentId(1), true)
                .unwrap()
        );
    }

    #[test]
    fn progressing_agent_keeps_its_goal() {
        let mut recognizer = Recognizer::new(1, RecognizerConfig::default());
        let goal = solo(0, chop_tomato());
        recognizer.update(&BTreeMap::from([(goal.clone(), 5)]), &state(1));
        recognizer.update(&BTreeMap::from([(goal.clone(), 4)]), &state(1));

        assert!((recognizer.probability(&goal) - 1.0).abs() < 1e-9);
        assert!(recognizer.idle_probability(AgentId(0)).unwrap() < 0.8);
        assert!(
            recognizer
                .is_probable_normalised(&goal, &[goal.clone()], AgentId(0), AgentId(0), true)
                .unwrap()
        );
        assert_eq!(recognizer.most_likely_goals().get(&AgentId(0)), Some(&goal));
    }

    #[test]
    fn completed_goal_scores_zero_length() {
        let mut recognizer = Recognizer::new(1, RecognizerConfig::default());
        let goal = solo(0, chop_tomato());
        recognizer.update(&BTreeMap::from([(goal.clone(), 2)]), &state(1));

        let mut done = state(1);
        done.add(Coordinate::new(0, 1), Ingredient::ChoppedTomato);
        recognizer.update(&BTreeMap::new(), &done);

        let entry = recognizer.goals.get(&goal).unwrap();
        assert_eq!(entry.lengths, vec![Some(2), Some(0)]);
        assert_eq!(recognizer.time_step(), 2);
    }

    #[test]
    fn late_goals_pad_their_history() {
        let mut entry = GoalEntry::observed(7, 3);
        assert_eq!(entry.lengths, vec![None, None, Some(7)]);
        assert_eq!(entry.non_empty_index(0), Some(2));
        entry.repeat(5);
        assert_eq!(entry.lengths.len(), 5);
        assert!(entry.is_current(5));
    }

    #[test]
    fn unknown_agent_has_no_idle_probability() {
        let recognizer = Recognizer::new(1, RecognizerConfig::default());
        assert!(matches!(
            recognizer.idle_probability(AgentId(3)),
            Err(PlannerError::UnknownAgent(AgentId(3)))
        ));
    }
}
