//! The collaboration planner.
//!
//! Each turn the planner searches a plan for every coalition, recipe and
//! handoff assignment that could work, feeds the plan lengths to the
//! [`Recognizer`], and combines the plans into collaboration hypotheses.
//! Hypotheses are scored, filtered down to those the other agents appear to
//! be pursuing, and the best one that involves the planning agent decides
//! its next move.
//!
//! When the first turns of a hypothesis make agents collide, one sub-goal
//! is searched again with the other agents' moves pinned, and the best
//! collision-free alternative replaces the original.

use std::collections::BTreeMap;
use std::time::Instant;

use rand::{Rng, SeedableRng, rngs::StdRng};
use sous_search::{Search, SearchKind, SearchRequest, trim_forward};
use sous_types::{Action, AgentCombination, AgentId, Direction, JointAction, Recipe, combinations};
use sous_world::{Environment, Ingredients, State};
use tracing::debug;

use crate::config::{CollaborationConfig, PlannerConfig};
use crate::error::PlannerError;
use crate::goal::{Goal, Goals};
use crate::paths::{ActionPath, Paths};
use crate::reachability::Reachability;
use crate::recognizer::Recognizer;

/// Handoff assignments per hypothesis size.
type HandoffPermutations = BTreeMap<usize, Vec<Vec<Option<AgentId>>>>;

// ---------------------------------------------------------------------------
// Hypotheses
// ---------------------------------------------------------------------------

/// One scored collaboration hypothesis.
#[derive(Debug, Clone, PartialEq)]
pub struct CollaborationInfo {
    /// Estimated turns until every goal is complete.
    pub length: usize,
    /// Goals pursued together, with handoff agents assigned.
    pub goals: Goals,
    /// The planning agent's first move under this hypothesis.
    pub next_action: Action,
    /// Score; lower is better.
    pub value: f64,
    /// Goal the planning agent works on.
    pub chosen_goal: Option<Goal>,
    /// Length of the chosen goal's plan.
    pub path_length: Option<usize>,
}

impl CollaborationInfo {
    /// Agents of the hypothesis.
    pub fn agents(&self) -> &AgentCombination {
        self.goals.agents()
    }
}

impl core::fmt::Display for CollaborationInfo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}:{:.3}", self.goals, self.length, self.value)
    }
}

/// Which agents picked which goal when a hypothesis is played out.
#[derive(Debug, Clone, Default)]
struct GoalAgents {
    agents: BTreeMap<Goal, AgentCombination>,
    chosen_goal: Option<Goal>,
}

impl GoalAgents {
    fn add(&mut self, goal: &Goal, agent: AgentId) {
        self.agents.entry(goal.clone()).or_default().push(agent);
    }

    fn get(&self, goal: &Goal) -> Option<&AgentCombination> {
        self.agents.get(goal)
    }
}

/// A hypothesis played out over the first turns of its plans.
struct Permutation<'a> {
    goals: &'a Goals,
    paths: &'a Paths,
    joint_actions: Vec<JointAction>,
    goal_agents: GoalAgents,
}

/// A collision-free alternative found by re-searching one sub-goal.
#[derive(Debug, Clone)]
struct Candidate {
    length: usize,
    path_length: Option<usize>,
    handoff: Option<usize>,
    next_action: Action,
    chosen_goal: Option<Goal>,
}

impl Candidate {
    /// Lower is better; a missing metric sorts last.
    const fn key(&self) -> (usize, usize, usize) {
        let path_length = match self.path_length {
            Some(length) => length,
            None => usize::MAX,
        };
        let handoff = match self.handoff {
            Some(time) => time,
            None => usize::MAX,
        };
        (self.length, path_length, handoff)
    }
}

/// Everything computed for one turn before an action is picked.
struct Turn {
    paths: Paths,
    infos: Vec<CollaborationInfo>,
    goal_values: BTreeMap<Goals, f64>,
}

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

/// Plans the moves of one agent in cooperation with all others.
#[derive(Debug)]
pub struct CollaborationPlanner {
    planning_agent: AgentId,
    search: Search,
    recognizer: Recognizer,
    config: CollaborationConfig,
    /// Largest number of recipes in one hypothesis; `None` means up to the
    /// coalition size.
    max_goals: Option<usize>,
    permutations: HandoffPermutations,
    reachability: Reachability,
    rng: StdRng,
    time_step: usize,
}

impl CollaborationPlanner {
    /// Create a planner for `planning_agent`.
    pub fn new(
        environment: Environment,
        planning_agent: AgentId,
        config: &PlannerConfig,
        max_goals: Option<usize>,
        seed: u64,
    ) -> Self {
        let agent_count = environment.agent_count();
        Self {
            planning_agent,
            search: Search::new(config.search.kind, environment, config.search.depth_limit),
            recognizer: Recognizer::new(agent_count, config.recognizer.clone()),
            config: config.collaboration.clone(),
            max_goals,
            permutations: handoff_permutations(agent_count),
            reachability: Reachability::default(),
            rng: StdRng::seed_from_u64(seed),
            time_step: 0,
        }
    }

    /// The agent this planner moves.
    pub const fn planning_agent(&self) -> AgentId {
        self.planning_agent
    }

    /// The goal recognizer fed by this planner.
    pub const fn recognizer(&self) -> &Recognizer {
        &self.recognizer
    }

    const fn environment(&self) -> &Environment {
        self.search.environment()
    }

    const fn stay(&self) -> Action {
        Action::stay(self.planning_agent)
    }

    /// Score every hypothesis for `state`, best first.
    ///
    /// Advances the recognizer by one turn.
    pub fn evaluate(&mut self, state: &State) -> Result<Vec<CollaborationInfo>, PlannerError> {
        Ok(self.prepare(state)?.map(|turn| turn.infos).unwrap_or_default())
    }

    /// Pick the planning agent's action for `state`.
    pub fn next_action(&mut self, state: &State) -> Result<Action, PlannerError> {
        debug!(agent = %self.planning_agent, time_step = self.time_step, "Planning turn");
        let Some(turn) = self.prepare(state)? else {
            return Ok(self.stay());
        };
        if turn.infos.is_empty() {
            return Ok(self.stay());
        }

        let probable = self.probable_infos(&turn.infos, &turn.goal_values, state)?;
        let best = self.best_collaboration(&turn.infos, &probable, state);
        self.time_step = self.time_step.saturating_add(1);

        let Some(info) = best else {
            debug!(agent = %self.planning_agent, "Did not find relevant action");
            return Ok(self.stay());
        };

        let mut action = self.stay();
        if let Some(chosen_goal) = &info.chosen_goal
            && !info.next_action.direction.is_stay()
        {
            action = self.random_good_action(info, chosen_goal, &turn.paths, state)?;
        }
        debug!(agent = %self.planning_agent, chose = %info, %action, "Chose collaboration");
        Ok(action)
    }

    fn prepare(&mut self, state: &State) -> Result<Option<Turn>, PlannerError> {
        self.reachability = Reachability::new(self.environment(), state);
        let recipes = self.environment().possible_recipes(state);
        if recipes.is_empty() {
            return Ok(None);
        }

        let paths = self.all_paths(&recipes, state)?;
        let lengths = paths.iter().map(|(goal, path)| (goal.clone(), path.len())).collect();
        self.recognizer.update(&lengths, state);

        let mut infos = self.calculate_infos(&paths, &recipes, state)?;
        let goal_values = self.goal_values(&mut infos);
        Ok(Some(Turn {
            paths,
            infos,
            goal_values,
        }))
    }

    // -----------------------------------------------------------------------
    // Searching
    // -----------------------------------------------------------------------

    /// Search a plan for every coalition, recipe and handoff agent whose
    /// ingredients are within reach.
    fn all_paths(&self, recipes: &[Recipe], state: &State) -> Result<Paths, PlannerError> {
        let environment = self.environment();
        let reachability = &self.reachability;
        let supports_handoff = self.search.kind() == SearchKind::AStar;
        let no_agents = AgentCombination::default();
        let mut paths = Paths::new();

        for agents in AgentCombination::all(environment.agent_count()).subsets() {
            for recipe in recipes {
                if !reachability.recipe_reachable(environment, *recipe, &agents, state)? {
                    continue;
                }

                let handoff_agents: Vec<Option<AgentId>> = if agents.len() > 1 && supports_handoff {
                    agents.iter().map(Some).collect()
                } else {
                    vec![None]
                };

                for handoff_agent in handoff_agents {
                    let feasible = match handoff_agent {
                        Some(handoff_agent) => {
                            reachability.handoff_feasible(environment, &agents, handoff_agent, *recipe, state)?
                        }
                        None => self.single_agent_feasible(*recipe, &agents, state)?,
                    };
                    if !feasible {
                        continue;
                    }

                    let started = Instant::now();
                    let request = SearchRequest {
                        state,
                        recipe: *recipe,
                        agents: &agents,
                        handoff_agent,
                        input_actions: &[],
                        free_agents: &no_agents,
                        initial_action: None,
                    };
                    let mut actions = self.search.search_joint(&request)?;
                    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                    if actions.is_empty() {
                        debug!(%agents, ?handoff_agent, %recipe, elapsed_ms, "No path");
                        continue;
                    }

                    trim_forward(&mut actions, state, environment, *recipe);
                    let goal = Goal::new(agents.clone(), *recipe, handoff_agent);
                    let path = ActionPath::new(actions, &goal, state, environment);
                    debug!(
                        %agents,
                        ?handoff_agent,
                        %recipe,
                        length = path.len(),
                        first_action = ?path.first_action,
                        last_action = ?path.last_action,
                        elapsed_ms,
                        "Searched goal"
                    );
                    paths.insert(goal, path);
                }
            }
        }
        Ok(paths)
    }

    /// Whether some agent of `agents` reaches both ingredients on its own.
    fn single_agent_feasible(
        &self,
        recipe: Recipe,
        agents: &AgentCombination,
        state: &State,
    ) -> Result<bool, PlannerError> {
        for agent in agents.iter() {
            if self.reachability.ingredients_reachable(
                self.environment(),
                recipe,
                agent,
                &agents.without(agent),
                state,
            )? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Search `goal` again with `prefix` pinned for every agent outside
    /// `free_agents`, and return a copy of `paths` holding the new plan.
    fn perform_new_search(
        &self,
        state: &State,
        goal: &Goal,
        paths: &Paths,
        prefix: &[JointAction],
        free_agents: &AgentCombination,
        initial_action: Option<Action>,
    ) -> Result<Option<Paths>, PlannerError> {
        let request = SearchRequest {
            state,
            recipe: goal.recipe,
            agents: &goal.agents,
            handoff_agent: goal.handoff_agent,
            input_actions: prefix,
            free_agents,
            initial_action,
        };
        let mut actions = self.search.search_joint(&request)?;
        if actions.is_empty() {
            return Ok(None);
        }
        trim_forward(&mut actions, state, self.environment(), goal.recipe);
        let mut new_paths = paths.clone();
        new_paths.update(actions, goal, state, self.environment());
        Ok(Some(new_paths))
    }

    // -----------------------------------------------------------------------
    // Hypotheses
    // -----------------------------------------------------------------------

    fn calculate_infos(
        &self,
        paths: &Paths,
        recipes: &[Recipe],
        state: &State,
    ) -> Result<Vec<CollaborationInfo>, PlannerError> {
        let mut infos = Vec::new();
        for agents in AgentCombination::all(self.environment().agent_count()).subsets() {
            let max_size = self
                .max_goals
                .unwrap_or(usize::MAX)
                .min(recipes.len())
                .min(agents.len());

            for size in 1..=max_size {
                for combination in combinations(recipes, size) {
                    if agents.len() == 1 {
                        let Some(recipe) = combination.first() else {
                            continue;
                        };
                        let goal = Goal::new(agents.clone(), *recipe, None);
                        if let Some(path) = paths.get(&goal) {
                            infos.push(CollaborationInfo {
                                length: path.len(),
                                goals: Goals::from(goal.clone()),
                                next_action: path.next_action(self.planning_agent),
                                value: 0.0,
                                chosen_goal: Some(goal),
                                path_length: Some(path.len()),
                            });
                        }
                        continue;
                    }

                    let mut goals = Goals::new();
                    for recipe in &combination {
                        goals.add(Goal::new(agents.clone(), *recipe, None));
                    }
                    let Some(permutations) = self.permutations.get(&size) else {
                        continue;
                    };
                    infos.extend(self.collaboration_permutations(&goals, paths, permutations, state)?);
                }
            }
        }
        Ok(infos)
    }

    /// One hypothesis per handoff assignment of `goals` whose plans all
    /// exist. Colliding hypotheses are repaired or dropped.
    pub(crate) fn collaboration_permutations(
        &self,
        goals: &Goals,
        paths: &Paths,
        permutations: &[Vec<Option<AgentId>>],
        state: &State,
    ) -> Result<Vec<CollaborationInfo>, PlannerError> {
        let mut infos = Vec::new();
        for permutation in permutations {
            let valid = permutation
                .iter()
                .all(|handoff_agent| handoff_agent.is_none_or(|agent| goals.agents().contains(agent)));
            if !valid {
                continue;
            }

            let mut assigned = goals.clone();
            assigned.update_handoffs(permutation);
            let Some(length) = self.permutation_length(&assigned, paths) else {
                continue;
            };

            let (joint_actions, goal_agents) = self.actions_from_permutation(&assigned, paths, state);
            if self.is_conflict(state, &joint_actions) {
                let played = Permutation {
                    goals: &assigned,
                    paths,
                    joint_actions,
                    goal_agents,
                };
                if let Some(candidate) = self.avoid_collision(&played, state, None, None)? {
                    infos.push(CollaborationInfo {
                        length: candidate.length,
                        goals: assigned,
                        next_action: candidate.next_action,
                        value: 0.0,
                        chosen_goal: candidate.chosen_goal,
                        path_length: candidate.path_length,
                    });
                }
                continue;
            }

            let next_action = joint_actions
                .first()
                .map_or(self.stay(), |joint_action| joint_action.action(self.planning_agent));
            let path_length = goal_agents
                .chosen_goal
                .as_ref()
                .and_then(|goal| paths.get(goal))
                .map(ActionPath::len);
            infos.push(CollaborationInfo {
                length,
                goals: assigned,
                next_action,
                value: 0.0,
                chosen_goal: goal_agents.chosen_goal,
                path_length,
            });
        }
        Ok(infos)
    }

    /// Combined completion time of `goals`.
    ///
    /// Goals are handled in order of handoff time. An agent that hands over
    /// several times accumulates its handoff times, and every goal's
    /// remaining work goes to the least busy other agent.
    fn permutation_length(&self, goals: &Goals, paths: &Paths) -> Option<usize> {
        struct Entry {
            length: usize,
            handoff_time: Option<usize>,
            agent: Option<AgentId>,
            id: usize,
        }
        struct Task {
            agent: Option<AgentId>,
            total: usize,
            extra: usize,
            handed_off: bool,
            id: usize,
        }

        let mut entries = Vec::with_capacity(goals.len());
        for (id, goal) in goals.iter().enumerate() {
            let path = paths.get(goal)?;
            entries.push(Entry {
                length: path.len(),
                handoff_time: path.last_action,
                agent: goal.handoff_agent,
                id,
            });
        }
        entries.sort_by_key(|entry| (entry.handoff_time.is_none(), entry.handoff_time, entry.id));

        let mut handoffs = vec![0_usize; self.environment().agent_count()];
        let mut tasks = Vec::with_capacity(entries.len());
        for entry in &entries {
            let mut total = entry.length;
            let mut extra = entry.length;
            let mut handed_off = false;
            if let (Some(time), Some(agent)) = (entry.handoff_time, entry.agent)
                && let Some(busy) = handoffs.get_mut(agent.index())
            {
                total = total.saturating_add(*busy);
                extra = extra.saturating_add(*busy);
                let until = time.saturating_add(1);
                *busy = busy.saturating_add(until);
                extra = extra.saturating_sub(until);
                handed_off = true;
            }
            tasks.push(Task {
                agent: entry.agent,
                total,
                extra,
                handed_off,
                id: tasks.len(),
            });
        }
        tasks.sort_by_key(|task| (task.total, task.id));

        for task in &tasks {
            let lowest = handoffs
                .iter()
                .enumerate()
                .filter(|(index, _)| task.agent.is_none_or(|agent| agent.index() != *index))
                .min_by_key(|(_, busy)| **busy)
                .map(|(index, _)| index);
            let Some(busy) = lowest.and_then(|index| handoffs.get_mut(index)) else {
                continue;
            };
            *busy = busy
                .saturating_add(task.extra)
                .saturating_add(usize::from(task.handed_off))
                .max(task.total);
        }

        let longest = handoffs.iter().copied().max().unwrap_or(0);
        (longest > 0).then_some(longest)
    }

    /// Play out the first turns of `goals`: each agent follows the plan of
    /// the goal it would pick.
    fn actions_from_permutation(&self, goals: &Goals, paths: &Paths, state: &State) -> (Vec<JointAction>, GoalAgents) {
        let trace_length = self.config.action_trace_length;
        let mut joint_actions = vec![JointAction::stay(self.environment().agent_count()); trace_length];
        let mut goal_agents = GoalAgents::default();

        for agent in goals.agents().iter() {
            let Some((goal, path)) = self.choose_goal(goals, agent, paths, state) else {
                continue;
            };
            for (joint_action, step) in joint_actions.iter_mut().zip(&path.joint_actions) {
                joint_action.set(agent, step.direction(agent));
            }
            goal_agents.add(goal, agent);
            if agent == self.planning_agent {
                goal_agents.chosen_goal = Some(goal.clone());
            }
        }
        (joint_actions, goal_agents)
    }

    /// The goal `agent` works on: its earliest useful handoff, else the
    /// most probable goal it is useful for, else the goal it starts moving
    /// in first.
    fn choose_goal<'a>(
        &self,
        goals: &'a Goals,
        agent: AgentId,
        paths: &'a Paths,
        state: &State,
    ) -> Option<(&'a Goal, &'a ActionPath)> {
        let environment = self.environment();

        let mut best: Option<(&Goal, &ActionPath, usize)> = None;
        for goal in goals.iter().filter(|goal| goal.handoff_agent == Some(agent)) {
            let Some(path) = paths.get(goal) else {
                continue;
            };
            let Some(handoff) = path.last_action else {
                continue;
            };
            if best.is_none_or(|(_, _, best_handoff)| handoff < best_handoff)
                && path.has_useful_action(agent, state, environment)
            {
                best = Some((goal, path, handoff));
            }
        }
        if let Some((goal, path, _)) = best {
            return Some((goal, path));
        }

        let mut probable: Option<(&Goal, &ActionPath)> = None;
        let mut highest = 0.0_f64;
        let mut backup: Option<(&Goal, &ActionPath, usize)> = None;
        for goal in goals.iter() {
            let Some(path) = paths.get(goal) else {
                continue;
            };
            let probability = self.recognizer.probability(goal);
            if probability > highest && path.has_useful_action(agent, state, environment) {
                probable = Some((goal, path));
                highest = probability;
            }
            if let Some(index) = path.first_non_trivial_index(agent)
                && backup.is_none_or(|(_, _, first)| index < first)
            {
                backup = Some((goal, path, index));
            }
        }
        probable.or_else(|| backup.map(|(goal, path, _)| (goal, path)))
    }

    /// Whether any non-idle turn of `joint_actions` fails from `state`.
    fn is_conflict(&self, state: &State, joint_actions: &[JointAction]) -> bool {
        let mut current = state.clone();
        for joint_action in joint_actions {
            if joint_action.is_all_stay() {
                continue;
            }
            if !self.environment().act(&mut current, joint_action) {
                return true;
            }
        }
        false
    }

    /// Re-search each goal some agent picked, with the other agents' moves
    /// pinned, and keep the best collision-free result.
    ///
    /// Path metrics are read from `focus` when given, else from the goal
    /// the planning agent picks in the new hypothesis.
    fn avoid_collision(
        &self,
        permutation: &Permutation<'_>,
        state: &State,
        initial_action: Option<Action>,
        focus: Option<&Goal>,
    ) -> Result<Option<Candidate>, PlannerError> {
        let mut best: Option<Candidate> = None;
        for goal in permutation.goals.iter() {
            let Some(free_agents) = permutation.goal_agents.get(goal) else {
                continue;
            };

            let mut prefix = permutation.joint_actions.clone();
            trim_trailing_non_actions(&mut prefix, goal.handoff_agent);
            let Some(new_paths) =
                self.perform_new_search(state, goal, permutation.paths, &prefix, free_agents, initial_action)?
            else {
                continue;
            };
            let Some(length) = self.permutation_length(permutation.goals, &new_paths) else {
                continue;
            };

            let (joint_actions, goal_agents) = self.actions_from_permutation(permutation.goals, &new_paths, state);
            if self.is_conflict(state, &joint_actions) {
                continue;
            }

            let tracked = focus.or(goal_agents.chosen_goal.as_ref());
            let tracked_path = tracked.and_then(|goal| new_paths.get(goal));
            let next_action = initial_action.unwrap_or_else(|| {
                joint_actions
                    .first()
                    .map_or(self.stay(), |joint_action| joint_action.action(self.planning_agent))
            });
            let candidate = Candidate {
                length,
                path_length: tracked_path.map(ActionPath::len),
                handoff: tracked_path.and_then(|path| path.last_action),
                next_action,
                chosen_goal: goal_agents.chosen_goal,
            };
            if best.as_ref().is_none_or(|current| candidate.key() < current.key()) {
                best = Some(candidate);
            }
        }
        Ok(best)
    }

    // -----------------------------------------------------------------------
    // Scoring and selection
    // -----------------------------------------------------------------------

    /// Score every hypothesis and sort best first. Returns the best score
    /// per goal set, ignoring handoff assignments.
    #[allow(clippy::cast_precision_loss)]
    fn goal_values(&self, infos: &mut [CollaborationInfo]) -> BTreeMap<Goals, f64> {
        let mut values: BTreeMap<Goals, f64> = BTreeMap::new();
        for info in infos.iter_mut() {
            let agent_count = i32::try_from(info.agents().len()).unwrap_or(i32::MAX);
            let goal_count = i32::try_from(info.goals.len()).unwrap_or(i32::MAX);
            let penalty = self.config.gamma_agents.powi(agent_count) / self.config.gamma_goals.powi(goal_count);
            info.value = penalty * info.length as f64 / info.goals.len().max(1) as f64;

            let mut key = info.goals.clone();
            key.clear_handoffs();
            values
                .entry(key)
                .and_modify(|value| *value = value.min(info.value))
                .or_insert(info.value);
        }
        infos.sort_by(|left, right| left.value.total_cmp(&right.value));
        values
    }

    /// Hypotheses that are resourced, not beaten by a smaller coalition,
    /// and consistent with what the other agents appear to be doing.
    fn probable_infos<'a>(
        &self,
        infos: &'a [CollaborationInfo],
        goal_values: &BTreeMap<Goals, f64>,
        state: &State,
    ) -> Result<Vec<&'a CollaborationInfo>, PlannerError> {
        let available = state.ingredients_count();
        let mut flags = Vec::with_capacity(infos.len());
        let mut normalisation_goals = Vec::new();

        for info in infos {
            let mut probable = true;
            if info.agents().len() > 1 {
                if is_agent_subset_faster(info, goal_values) {
                    probable = false;
                }
                let mut needed = Ingredients::new();
                needed.add_recipes(info.goals.recipes().iter());
                if !needed.fits_within(&available) {
                    probable = false;
                }
            }
            if probable {
                normalisation_goals.extend(info.goals.iter().cloned());
            }
            flags.push(probable);
        }

        for (info, probable) in infos.iter().zip(flags.iter_mut()) {
            if !*probable || info.agents().is_only(self.planning_agent) {
                continue;
            }
            *probable = self.is_recognized(info, &normalisation_goals)?;
        }

        Ok(infos
            .iter()
            .zip(flags)
            .filter_map(|(info, probable)| probable.then_some(info))
            .collect())
    }

    /// Whether some agent of `info` appears to pursue one of its goals.
    fn is_recognized(&self, info: &CollaborationInfo, available: &[Goal]) -> Result<bool, PlannerError> {
        for goal in info.goals.iter() {
            for agent in goal.agents.iter() {
                let use_idle = agent != self.planning_agent || info.goals.len() > 1;
                if self
                    .recognizer
                    .is_probable_normalised(goal, available, agent, self.planning_agent, use_idle)?
                {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Walk the probable hypotheses greedily, reserving agents and
    /// ingredients, until one involves the planning agent. Falls back to
    /// any resourced hypothesis that moves, then to any resourced one.
    fn best_collaboration<'a>(
        &self,
        infos: &'a [CollaborationInfo],
        probable: &[&'a CollaborationInfo],
        state: &State,
    ) -> Option<&'a CollaborationInfo> {
        let mut used_agents = AgentCombination::default();
        let mut ingredients = state.ingredients_count();

        for info in probable {
            let new_agents = used_agents.new_agents(info.agents());
            if new_agents.is_empty() {
                continue;
            }
            let recipes = info.goals.recipes();
            if !ingredients.has_all_ingredients(recipes.iter()) {
                continue;
            }
            ingredients.perform_recipes(recipes.iter());
            used_agents.extend(&new_agents);
            if info.agents().contains(self.planning_agent) {
                return Some(*info);
            }
        }

        let resourced = |info: &&CollaborationInfo| ingredients.has_all_ingredients(info.goals.recipes().iter());
        infos
            .iter()
            .filter(resourced)
            .find(|info| !info.next_action.direction.is_stay())
            .or_else(|| infos.iter().find(resourced))
    }

    /// Try every move of the planning agent as the first step of its chosen
    /// goal and pick at random among the moves that are best for the whole
    /// hypothesis.
    fn random_good_action(
        &mut self,
        info: &CollaborationInfo,
        chosen_goal: &Goal,
        paths: &Paths,
        state: &State,
    ) -> Result<Action, PlannerError> {
        if self.search.kind() != SearchKind::AStar {
            return Ok(info.next_action);
        }

        let no_agents = AgentCombination::default();
        let mut best_key: Option<(usize, usize, usize)> = None;
        let mut candidates: Vec<Action> = Vec::new();

        for direction in Direction::MOVES {
            let action = Action::new(direction, self.planning_agent);
            let Some(new_paths) = self.perform_new_search(state, chosen_goal, paths, &[], &no_agents, Some(action))?
            else {
                continue;
            };
            let Some(length) = self.permutation_length(&info.goals, &new_paths) else {
                continue;
            };

            let (joint_actions, goal_agents) = self.actions_from_permutation(&info.goals, &new_paths, state);
            let key = if self.is_conflict(state, &joint_actions) {
                let played = Permutation {
                    goals: &info.goals,
                    paths: &new_paths,
                    joint_actions,
                    goal_agents,
                };
                let Some(candidate) = self.avoid_collision(&played, state, Some(action), Some(chosen_goal))? else {
                    continue;
                };
                candidate.key()
            } else {
                let path = new_paths.get(chosen_goal);
                (
                    length,
                    path.map_or(usize::MAX, ActionPath::len),
                    path.and_then(|path| path.last_action).unwrap_or(usize::MAX),
                )
            };

            if best_key.is_none_or(|best| key < best) {
                best_key = Some(key);
                candidates.clear();
            }
            if best_key == Some(key) {
                candidates.push(action);
            }
        }

        let action = if candidates.is_empty() {
            info.next_action
        } else {
            let index = self.rng.random_range(0..candidates.len());
            candidates.get(index).copied().unwrap_or(info.next_action)
        };
        if action != info.next_action {
            debug!(from = %info.next_action, to = %action, goal = %chosen_goal, "Changed action");
        }
        Ok(action)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Handoff assignments for every hypothesis size up to `agent_count`.
///
/// Size `k` holds every `k`-tuple of agents, repetition allowed. Size 1
/// also holds the no-handoff assignment.
fn handoff_permutations(agent_count: usize) -> HandoffPermutations {
    let mut result = BTreeMap::new();
    for size in 1..=agent_count {
        let mut bucket: Vec<Vec<Option<AgentId>>> = Vec::new();
        if size == 1 {
            bucket.push(vec![None]);
        }
        let mut counters = vec![0_usize; size];
        'odometer: loop {
            bucket.push(counters.iter().map(|index| Some(AgentId(*index))).collect());
            let mut position = 0;
            loop {
                let Some(counter) = counters.get_mut(position) else {
                    break 'odometer;
                };
                *counter = counter.saturating_add(1);
                if *counter < agent_count {
                    break;
                }
                *counter = 0;
                position = position.saturating_add(1);
            }
        }
        result.insert(size, bucket);
    }
    result
}

/// Whether the same goals with one agent fewer already score at least as
/// well.
fn is_agent_subset_faster(info: &CollaborationInfo, goal_values: &BTreeMap<Goals, f64>) -> bool {
    let agents = info.agents();
    agents
        .subsets_of_size(agents.len().saturating_sub(1))
        .iter()
        .any(|subset| {
            let mut reduced = info.goals.with_agents(subset);
            reduced.clear_handoffs();
            goal_values.get(&reduced).is_some_and(|value| *value <= info.value)
        })
}

/// Drop trailing turns in which no agent other than `handoff_agent` moves.
fn trim_trailing_non_actions(joint_actions: &mut Vec<JointAction>, handoff_agent: Option<AgentId>) {
    while let Some(last) = joint_actions.last() {
        let active = last
            .actions()
            .any(|action| Some(action.agent) != handoff_agent && !action.direction.is_stay());
        if active {
            break;
        }
        joint_actions.pop();
    }
}
