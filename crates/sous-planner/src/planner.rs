//! Planner strategies selectable per agent.

use serde::{Deserialize, Serialize};
use sous_types::{Action, AgentId};
use sous_world::{Environment, State};

use crate::collaboration::CollaborationPlanner;
use crate::config::PlannerConfig;
use crate::error::PlannerError;

/// Which planner drives an agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannerKind {
    /// Collaboration planner over hypotheses of any size.
    #[default]
    Full,
    /// Collaboration planner restricted to one recipe per hypothesis.
    #[serde(rename = "single")]
    SingleGoal,
    /// Never moves.
    Still,
}

impl PlannerKind {
    /// One-letter tag used in result rows.
    pub const fn glyph(self) -> char {
        match self {
            Self::Full => 'm',
            Self::SingleGoal => 'n',
            Self::Still => 's',
        }
    }

    /// Parse a one-letter tag.
    pub const fn from_glyph(glyph: char) -> Option<Self> {
        match glyph {
            'm' => Some(Self::Full),
            'n' => Some(Self::SingleGoal),
            's' => Some(Self::Still),
            _ => None,
        }
    }
}

impl core::fmt::Display for PlannerKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.glyph())
    }
}

/// A planner bound to one agent.
#[derive(Debug)]
pub enum Planner {
    /// Full collaboration planning.
    Collaborative(Box<CollaborationPlanner>),
    /// Collaboration planning with single-recipe hypotheses.
    SingleGoal(Box<CollaborationPlanner>),
    /// Always stays.
    Still(AgentId),
}

impl Planner {
    /// Create a planner of `kind` for `agent`.
    ///
    /// `seed` drives the random choice between equally good moves.
    pub fn new(kind: PlannerKind, environment: Environment, agent: AgentId, config: &PlannerConfig, seed: u64) -> Self {
        match kind {
            PlannerKind::Full => Self::Collaborative(Box::new(CollaborationPlanner::new(
                environment,
                agent,
                config,
                None,
                seed,
            ))),
            PlannerKind::SingleGoal => Self::SingleGoal(Box::new(CollaborationPlanner::new(
                environment,
                agent,
                config,
                Some(1),
                seed,
            ))),
            PlannerKind::Still => Self::Still(agent),
        }
    }

    /// The strategy of this planner.
    pub const fn kind(&self) -> PlannerKind {
        match self {
            Self::Collaborative(_) => PlannerKind::Full,
            Self::SingleGoal(_) => PlannerKind::SingleGoal,
            Self::Still(_) => PlannerKind::Still,
        }
    }

    /// The agent this planner moves.
    pub fn agent(&self) -> AgentId {
        match self {
            Self::Collaborative(planner) | Self::SingleGoal(planner) => planner.planning_agent(),
            Self::Still(agent) => *agent,
        }
    }

    /// The agent's action for `state`.
    pub fn next_action(&mut self, state: &State) -> Result<Action, PlannerError> {
        match self {
            Self::Collaborative(planner) | Self::SingleGoal(planner) => planner.next_action(state),
            Self::Still(agent) => Ok(Action::stay(*agent)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sous_types::Direction;
    use sous_world::Level;

    use super::*;

    const ROOM: &str = "\
-----
t   /
-   -
-p*--

SimpleTomato

2,1
";

    #[test]
    fn glyphs_round_trip() {
        for kind in [PlannerKind::Full, PlannerKind::SingleGoal, PlannerKind::Still] {
            assert_eq!(PlannerKind::from_glyph(kind.glyph()), Some(kind));
        }
        assert_eq!(PlannerKind::from_glyph('x'), None);
    }

    #[test]
    fn kinds_parse_from_config_names() {
        let kinds: Vec<PlannerKind> = serde_yml::from_str("[full, single, still]").unwrap();
        assert_eq!(kinds, vec![PlannerKind::Full, PlannerKind::SingleGoal, PlannerKind::Still]);
    }

    #[test]
    fn still_planner_never_moves() {
        let level = Level::parse(ROOM, 1).unwrap();
        let mut planner = Planner::new(
            PlannerKind::Still,
            level.environment,
            AgentId(0),
            &PlannerConfig::default(),
            0,
        );
        let action = planner.next_action(&level.state).unwrap();
        assert_eq!(action.direction, Direction::Stay);
        assert_eq!(planner.kind(), PlannerKind::Still);
        assert_eq!(planner.agent(), AgentId(0));
    }

    #[test]
    fn single_goal_planner_heads_for_the_tomato() {
        let level = Level::parse(ROOM, 1).unwrap();
        let mut planner = Planner::new(
            PlannerKind::SingleGoal,
            level.environment,
            AgentId(0),
            &PlannerConfig::default(),
            0,
        );
        let action = planner.next_action(&level.state).unwrap();
        assert_eq!(action, Action::new(Direction::Left, AgentId(0)));
    }
}
