//! Host-facing session: one level, its live state and the registered
//! planners.
//!
//! A host process drives the session with four calls: [`Session::init`]
//! loads a level, [`Session::add_agent`] attaches a planner to an agent,
//! [`Session::update`] applies the joint move the host observed, and
//! [`Session::get_next_action`] asks a planner for its agent's move. Moves
//! cross the boundary as `(dx, dy)` pairs.

use std::collections::BTreeMap;
use std::path::Path;

use sous_planner::{Planner, PlannerConfig, PlannerKind};
use sous_types::{Action, AgentId, Direction, JointAction};
use sous_world::{Environment, Level, State};
use tracing::{debug, info};

use crate::error::EngineError;

/// A loaded level with planners attached to some of its agents.
#[derive(Debug)]
pub struct Session {
    environment: Environment,
    state: State,
    planners: BTreeMap<AgentId, Planner>,
    config: PlannerConfig,
    seed: u64,
    time_step: usize,
}

impl Session {
    /// Load the level at `level_path` for `agent_count` agents.
    pub fn init(level_path: &Path, agent_count: usize, seed: u64, config: PlannerConfig) -> Result<Self, EngineError> {
        let level = Level::from_file(level_path, agent_count)?;
        Ok(Self::from_level(level, seed, config))
    }

    /// Start a session on an already parsed level.
    pub fn from_level(level: Level, seed: u64, config: PlannerConfig) -> Self {
        Self {
            environment: level.environment,
            state: level.state,
            planners: BTreeMap::new(),
            config,
            seed,
            time_step: 0,
        }
    }

    /// Attach a full collaboration planner to agent `agent_id`.
    pub fn add_agent(&mut self, agent_id: usize) -> Result<(), EngineError> {
        self.add_planner(AgentId(agent_id), PlannerKind::Full)
    }

    /// Attach a planner of `kind` to `agent`, replacing any earlier one.
    pub fn add_planner(&mut self, agent: AgentId, kind: PlannerKind) -> Result<(), EngineError> {
        if agent.index() >= self.environment.agent_count() {
            return Err(EngineError::UnknownAgent(agent));
        }
        let planner = Planner::new(kind, self.environment.clone(), agent, &self.config, self.seed);
        self.planners.insert(agent, planner);
        info!(%agent, planner = %kind, "Agent registered");
        Ok(())
    }

    /// Apply the moves the host observed, one `(dx, dy)` per agent in id
    /// order. Missing entries stay; extra entries are ignored.
    ///
    /// Does nothing until a planner is registered.
    pub fn update(&mut self, moves: &[(i32, i32)]) {
        if self.planners.is_empty() {
            return;
        }
        let agent_count = self.environment.agent_count();
        let mut joint = JointAction::stay(agent_count);
        for (index, (dx, dy)) in moves.iter().take(agent_count).enumerate() {
            joint.set(AgentId(index), Direction::from_delta(*dx, *dy));
        }
        self.apply(&joint);
    }

    /// The registered planner's next move for agent `agent_id`, as
    /// `(dx, dy)`.
    pub fn get_next_action(&mut self, agent_id: usize) -> Result<(i32, i32), EngineError> {
        let action = self.next_action(AgentId(agent_id))?;
        Ok(host_delta(action.direction))
    }

    /// The registered planner's next action for `agent`.
    pub fn next_action(&mut self, agent: AgentId) -> Result<Action, EngineError> {
        let planner = self.planners.get_mut(&agent).ok_or(EngineError::UnknownAgent(agent))?;
        Ok(planner.next_action(&self.state)?)
    }

    /// Ask every registered planner for its move and apply them together.
    /// Agents without a planner stay.
    pub fn step(&mut self) -> Result<JointAction, EngineError> {
        let mut joint = JointAction::stay(self.environment.agent_count());
        for planner in self.planners.values_mut() {
            let action = planner.next_action(&self.state)?;
            joint.set(action.agent, action.direction);
        }
        self.apply(&joint);
        Ok(joint)
    }

    fn apply(&mut self, joint: &JointAction) {
        self.time_step = self.time_step.saturating_add(1);
        let changed = self.environment.act(&mut self.state, joint);
        debug!(time_step = self.time_step, actions = %joint, changed, "World advanced");
    }

    /// Whether every goal dish has been delivered.
    pub fn is_done(&self) -> bool {
        self.environment.is_done(&self.state)
    }

    /// Number of joint actions applied so far.
    pub const fn time_step(&self) -> usize {
        self.time_step
    }

    /// The live world state.
    pub const fn state(&self) -> &State {
        &self.state
    }

    /// The level being played.
    pub const fn environment(&self) -> &Environment {
        &self.environment
    }
}

/// The host's `(dx, dy)` encoding of a direction.
const fn host_delta(direction: Direction) -> (i32, i32) {
    match direction {
        Direction::Up => (0, -1),
        Direction::Right => (1, 0),
        Direction::Down => (0, 1),
        Direction::Left => (-1, 0),
        Direction::Stay => (0, 0),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sous_types::Coordinate;

    use super::*;

    const ROOM: &str = "\
-----
t   /
-   -
-p*--

SimpleTomato

2,1
1,2
";

    fn session() -> Session {
        Session::from_level(Level::parse(ROOM, 2).unwrap(), 0, PlannerConfig::default())
    }

    #[test]
    fn host_deltas_match_directions() {
        for direction in Direction::ALL {
            let (dx, dy) = host_delta(direction);
            assert_eq!(Direction::from_delta(dx, dy), direction);
        }
    }

    #[test]
    fn update_is_ignored_without_planners() {
        let mut session = session();
        session.update(&[(-1, 0), (0, 0)]);
        assert_eq!(session.time_step(), 0);
        assert_eq!(session.state().location(AgentId(0)), Some(Coordinate::new(2, 1)));
    }

    #[test]
    fn update_moves_agents_in_id_order() {
        let mut session = session();
        session.add_agent(0).unwrap();
        session.update(&[(-1, 0), (1, 0)]);
        assert_eq!(session.time_step(), 1);
        assert_eq!(session.state().location(AgentId(0)), Some(Coordinate::new(1, 1)));
        assert_eq!(session.state().location(AgentId(1)), Some(Coordinate::new(2, 2)));
    }

    #[test]
    fn unknown_agents_are_errors() {
        let mut session = session();
        assert!(matches!(session.add_agent(2), Err(EngineError::UnknownAgent(AgentId(2)))));
        assert!(matches!(session.get_next_action(1), Err(EngineError::UnknownAgent(AgentId(1)))));
    }

    #[test]
    fn still_agent_reports_no_move() {
        let mut session = session();
        session.add_planner(AgentId(1), PlannerKind::Still).unwrap();
        assert_eq!(session.get_next_action(1).unwrap(), (0, 0));
    }

    #[test]
    fn step_applies_every_planner() {
        let mut session = session();
        session.add_planner(AgentId(0), PlannerKind::Full).unwrap();
        session.add_planner(AgentId(1), PlannerKind::Still).unwrap();
        let joint = session.step().unwrap();
        assert!(!joint.is_active(AgentId(1)));
        assert_eq!(session.time_step(), 1);
        assert!(!session.is_done());
    }
}
