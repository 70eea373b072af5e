//! Level file loading.
//!
//! A level file has three sections separated by blank lines:
//!
//! 1. the map, one text row per grid row (`-` counter, `/` cutting station,
//!    `*` delivery station, item glyphs for items lying on counters, space
//!    for floor);
//! 2. goal dish names, one per line (`Salad`, `SimpleTomato`,
//!    `SimpleLettuce`);
//! 3. agent start cells as `x,y`, one per line.

use std::path::Path;

use sous_types::{AgentId, CellType, Coordinate, Ingredient};
use tracing::{debug, info};

use crate::environment::{Environment, Layout};
use crate::error::WorldError;
use crate::state::{Agent, State};

/// A loaded level: its static environment and the initial state.
#[derive(Debug, Clone)]
pub struct Level {
    /// Static layout and rules.
    pub environment: Environment,
    /// State at turn zero.
    pub state: State,
}

impl Level {
    /// Load a level file for `agent_count` agents.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::UnknownLevel`] if the file cannot be read, or
    /// any parse error from [`Level::parse`].
    pub fn from_file(path: &Path, agent_count: usize) -> Result<Self, WorldError> {
        let text = std::fs::read_to_string(path).map_err(|source| WorldError::UnknownLevel {
            path: path.to_path_buf(),
            source,
        })?;
        let level = Self::parse(&text, agent_count)?;
        info!(
            path = %path.display(),
            width = level.environment.width(),
            height = level.environment.height(),
            agents = agent_count,
            goals = ?level.environment.goal_names(),
            "Level loaded"
        );
        Ok(level)
    }

    /// Parse level text for `agent_count` agents.
    ///
    /// # Errors
    ///
    /// Returns a [`WorldError`] for unknown glyphs or goal names, malformed
    /// or out-of-bounds agent lines, too few agent lines, and agents that
    /// start on a counter or share a start cell.
    pub fn parse(text: &str, agent_count: usize) -> Result<Self, WorldError> {
        let mut sections: Vec<Vec<&str>> = vec![Vec::new()];
        for line in text.lines() {
            if line.is_empty() {
                sections.push(Vec::new());
            } else if let Some(section) = sections.last_mut() {
                section.push(line);
            }
        }
        let mut sections = sections.into_iter();
        let map = sections.next().unwrap_or_default();
        let goal_lines = sections.next().unwrap_or_default();
        let agent_lines = sections.next().unwrap_or_default();

        let mut state = State::default();
        let layout = parse_map(&map, &mut state)?;

        let goals = goal_lines
            .iter()
            .map(|name| {
                let name = name.trim();
                Ingredient::from_goal_name(name)
                    .map(|item| (name.to_owned(), item))
                    .ok_or_else(|| WorldError::UnknownGoal(name.to_owned()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if agent_lines.len() < agent_count {
            return Err(WorldError::MissingAgents {
                requested: agent_count,
                available: agent_lines.len(),
            });
        }

        let environment = Environment::new(layout, &goals, agent_count);
        for (index, line) in agent_lines.iter().take(agent_count).enumerate() {
            let coordinate = parse_agent_line(line)?;
            let Coordinate { x, y } = coordinate;
            if !environment.is_inbounds(coordinate) {
                return Err(WorldError::OutOfBounds { x, y });
            }
            let agent = AgentId(index);
            if environment.is_wall(coordinate) {
                return Err(WorldError::BlockedStart { agent, x, y });
            }
            if let Some(first) = state.agent_at(coordinate) {
                return Err(WorldError::SharedStart {
                    first,
                    second: agent,
                    x,
                    y,
                });
            }
            state.agents.push(Agent::new(coordinate));
        }

        debug!(recipes = environment.goal_related_recipes().len(), "Goal recipes derived");
        Ok(Self { environment, state })
    }
}

fn parse_map(rows: &[&str], state: &mut State) -> Result<Layout, WorldError> {
    let width = rows.first().map_or(0, |row| row.chars().count());
    let height = rows.len();
    let mut layout = Layout {
        width,
        height,
        walls: vec![false; width.saturating_mul(height)],
        cutting_stations: Vec::new(),
        delivery_stations: Vec::new(),
    };

    for (y, row) in rows.iter().enumerate() {
        let found = row.chars().count();
        if found > width {
            return Err(WorldError::RaggedRow {
                row: y,
                expected: width,
                found,
            });
        }
        for (x, glyph) in row.chars().enumerate() {
            if glyph == ' ' {
                continue;
            }
            let coordinate = Coordinate::new(x, y);
            if glyph == CellType::CuttingStation.glyph() {
                layout.cutting_stations.push(coordinate);
            } else if glyph == CellType::DeliveryStation.glyph() {
                layout.delivery_stations.push(coordinate);
            } else if let Some(item) = Ingredient::from_glyph(glyph) {
                state.add(coordinate, item);
            } else if glyph != CellType::Wall.glyph() {
                return Err(WorldError::UnknownGlyph { glyph, x, y });
            }
            if let Some(cell) = layout.walls.get_mut(y.saturating_mul(width).saturating_add(x)) {
                *cell = true;
            }
        }
    }
    Ok(layout)
}

fn parse_agent_line(line: &str) -> Result<Coordinate, WorldError> {
    let malformed = || WorldError::MalformedAgentLine(line.to_owned());
    let (x, y) = line.split_once(',').ok_or_else(malformed)?;
    let x = x.trim().parse::<usize>().ok().ok_or_else(malformed)?;
    let y = y.trim().parse::<usize>().ok().ok_or_else(malformed)?;
    Ok(Coordinate::new(x, y))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sous_types::AgentId;

    use super::*;

    const LEVEL: &str = "\
-----
-/ t-
-  p-
--*--

Salad
SimpleTomato

2,1
2,2
1,2
";

    #[test]
    fn parses_all_three_sections() {
        let level = Level::parse(LEVEL, 2).unwrap();
        let env = &level.environment;
        assert_eq!(env.width(), 5);
        assert_eq!(env.height(), 4);
        assert_eq!(env.agent_count(), 2);
        assert_eq!(env.goal_names(), ["Salad", "SimpleTomato"]);
        assert_eq!(env.goal_ingredients().count(Ingredient::DeliveredSalad), 1);
        assert!(env.is_cutting_station(Coordinate::new(1, 1)));
        assert!(env.is_delivery_station(Coordinate::new(2, 3)));
        assert!(env.is_wall(Coordinate::new(3, 1)));
        assert!(!env.is_wall(Coordinate::new(2, 1)));
        assert_eq!(level.state.ingredient_at(Coordinate::new(3, 1)), Some(Ingredient::Tomato));
        assert_eq!(level.state.agents.len(), 2);
        assert_eq!(level.state.location(AgentId(1)), Some(Coordinate::new(2, 2)));
    }

    #[test]
    fn short_rows_are_padded_with_floor() {
        let level = Level::parse("---\n-\n---\n\nSalad\n\n1,1\n", 1).unwrap();
        assert!(!level.environment.is_wall(Coordinate::new(2, 1)));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            Level::parse("-?-\n\nSalad\n\n0,0\n", 1),
            Err(WorldError::UnknownGlyph { glyph: '?', x: 1, y: 0 })
        ));
        assert!(matches!(
            Level::parse("- -\n\nSoup\n\n1,0\n", 1),
            Err(WorldError::UnknownGoal(name)) if name == "Soup"
        ));
        assert!(matches!(
            Level::parse("- -\n\nSalad\n\n1;0\n", 1),
            Err(WorldError::MalformedAgentLine(_))
        ));
        assert!(matches!(
            Level::parse(LEVEL, 4),
            Err(WorldError::MissingAgents { requested: 4, available: 3 })
        ));
        assert!(matches!(
            Level::parse("- -\n----\n\nSalad\n\n1,0\n", 1),
            Err(WorldError::RaggedRow { row: 1, .. })
        ));
    }

    #[test]
    fn agents_must_start_on_free_floor() {
        assert!(matches!(
            Level::parse("-----\n-/ t-\n-----\n\nSalad\n\n2,1\n3,1\n", 2),
            Err(WorldError::BlockedStart { agent: AgentId(1), x: 3, y: 1 })
        ));
        assert!(matches!(
            Level::parse("-----\n-/ t-\n-----\n\nSalad\n\n0,0\n", 1),
            Err(WorldError::BlockedStart { agent: AgentId(0), .. })
        ));
        assert!(matches!(
            Level::parse("-----\n-   -\n-----\n\nSalad\n\n2,1\n2,1\n", 2),
            Err(WorldError::SharedStart {
                first: AgentId(0),
                second: AgentId(1),
                x: 2,
                y: 1
            })
        ));
        // Lines past the requested agent count are not validated.
        assert!(Level::parse("-----\n-   -\n-----\n\nSalad\n\n2,1\n2,1\n", 1).is_ok());
    }

    #[test]
    fn missing_file_is_unknown_level() {
        let result = Level::from_file(Path::new("/definitely/not/here.txt"), 1);
        assert!(matches!(result, Err(WorldError::UnknownLevel { .. })));
    }
}
