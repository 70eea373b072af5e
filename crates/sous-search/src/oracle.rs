//! All-pairs shortest paths with a wall-crossing allowance.
//!
//! Items can be passed across a counter by placing them on it from one side
//! and picking them up from the other, so a path may step onto a counter
//! cell and off it again. The oracle precomputes, for every wall budget
//! `0..agent_count`, the shortest distance between every pair of cells when
//! at most that many counters may be crossed. Two counters in a row can
//! never be crossed.
//!
//! Tables are built once per level and are read-only afterwards.

use std::collections::VecDeque;

use sous_types::{Coordinate, Direction};
use sous_world::Environment;
use tracing::debug;

/// Shortest-path record for one `(source, destination, budget)` triple.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DistanceEntry {
    /// Path length, `None` when unreachable.
    pub g: Option<usize>,
    /// Predecessor of the destination on the path, `None` at the source.
    pub parent: Option<Coordinate>,
    /// Path length at which the last counter was entered.
    pub wall_g: usize,
}

/// One table per wall budget, each `cells * cells` entries.
#[derive(Debug, Clone)]
pub struct DistanceOracle {
    width: usize,
    height: usize,
    tables: Vec<Vec<DistanceEntry>>,
}

#[derive(Debug, Clone, Copy)]
struct Frontier {
    coordinate: Coordinate,
    dist: usize,
    walls: usize,
    wall_g: usize,
}

impl DistanceOracle {
    /// Precompute every table for `environment`.
    pub fn new(environment: &Environment) -> Self {
        let width = environment.width();
        let height = environment.height();
        let cells = width.saturating_mul(height);
        let budgets = environment.agent_count().max(1);
        let mut oracle = Self {
            width,
            height,
            tables: Vec::with_capacity(budgets),
        };

        for max_walls in 0..budgets {
            let mut table = vec![DistanceEntry::default(); cells.saturating_mul(cells)];
            for source in environment.cells() {
                let layers = oracle.expand(environment, source, max_walls, budgets);
                let source_index = oracle.index(source);
                for layer in &layers {
                    for (destination, candidate) in layer.iter().enumerate() {
                        let Some(slot) = table.get_mut(
                            source_index.saturating_mul(cells).saturating_add(destination),
                        ) else {
                            continue;
                        };
                        let better = match (slot.g, candidate.g) {
                            (None, _) => true,
                            (Some(current), Some(found)) => found <= current,
                            (Some(_), None) => false,
                        };
                        if better {
                            *slot = *candidate;
                        }
                    }
                }
            }
            oracle.tables.push(table);
        }
        debug!(width, height, budgets, "Distance tables computed");
        oracle
    }

    /// Breadth-first expansion from `source`, recording entries per number
    /// of counters crossed before the last step.
    fn expand(
        &self,
        environment: &Environment,
        source: Coordinate,
        max_walls: usize,
        budgets: usize,
    ) -> Vec<Vec<DistanceEntry>> {
        let cells = self.width.saturating_mul(self.height);
        let mut layers = vec![vec![DistanceEntry::default(); cells]; budgets];
        if let Some(origin) = layers
            .first_mut()
            .and_then(|layer| layer.get_mut(self.index(source)))
        {
            origin.g = Some(0);
        }

        let mut frontier = VecDeque::from([Frontier {
            coordinate: source,
            dist: 0,
            walls: 0,
            wall_g: 0,
        }]);
        while let Some(current) = frontier.pop_front() {
            let current_is_wall = environment.is_wall(current.coordinate);
            for destination in environment.neighbours(current.coordinate) {
                let next_is_wall = environment.is_wall(destination);
                if current_is_wall && next_is_wall {
                    continue;
                }
                let destination_index = self.index(destination);
                let Some(recorded) = layers
                    .get_mut(current.walls)
                    .and_then(|layer| layer.get_mut(destination_index))
                else {
                    continue;
                };
                let dist = current.dist.saturating_add(1);
                let improves = match recorded.g {
                    None => true,
                    Some(g) => dist < g || (dist == g && recorded.wall_g > current.wall_g),
                };
                if !improves {
                    continue;
                }
                let wall_g = if next_is_wall { dist } else { current.wall_g };
                *recorded = DistanceEntry {
                    g: Some(dist),
                    parent: Some(current.coordinate),
                    wall_g,
                };
                let walls = current.walls.saturating_add(usize::from(next_is_wall));
                if walls <= max_walls {
                    frontier.push_back(Frontier {
                        coordinate: destination,
                        dist,
                        walls,
                        wall_g,
                    });
                }
            }
        }
        layers
    }

    const fn index(&self, coordinate: Coordinate) -> usize {
        coordinate
            .x
            .saturating_mul(self.height)
            .saturating_add(coordinate.y)
    }

    /// Number of wall budgets available.
    pub const fn budgets(&self) -> usize {
        self.tables.len()
    }

    /// The entry for the path from `source` to `destination` under `walls`.
    pub fn entry(&self, source: Coordinate, destination: Coordinate, walls: usize) -> Option<&DistanceEntry> {
        let cells = self.width.saturating_mul(self.height);
        if source.x >= self.width || source.y >= self.height {
            return None;
        }
        if destination.x >= self.width || destination.y >= self.height {
            return None;
        }
        self.tables.get(walls)?.get(
            self.index(source)
                .saturating_mul(cells)
                .saturating_add(self.index(destination)),
        )
    }

    /// Shortest distance from `source` to `destination` crossing at most
    /// `walls` counters.
    pub fn distance(&self, source: Coordinate, destination: Coordinate, walls: usize) -> Option<usize> {
        self.entry(source, destination, walls).and_then(|entry| entry.g)
    }

    /// Distance from `source` to `destination` and the first step to take
    /// from `source`.
    pub fn dist_direction(
        &self,
        source: Coordinate,
        destination: Coordinate,
        walls: usize,
    ) -> Option<(usize, Direction)> {
        let entry = self.entry(destination, source, walls)?;
        let g = entry.g?;
        let direction = entry
            .parent
            .map_or(Direction::Stay, |parent| source.direction_to(parent));
        Some((g, direction))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sous_world::Level;

    use super::*;

    const SPLIT: &str = "\
-------
-  -  -
-  -  -
-------

SimpleTomato

1,1
4,1
";

    fn split() -> (Environment, DistanceOracle) {
        let level = Level::parse(SPLIT, 2).unwrap();
        let oracle = DistanceOracle::new(&level.environment);
        (level.environment, oracle)
    }

    #[test]
    fn open_floor_is_manhattan() {
        let (_, oracle) = split();
        assert_eq!(oracle.distance(Coordinate::new(1, 1), Coordinate::new(2, 2), 0), Some(2));
        assert_eq!(oracle.distance(Coordinate::new(1, 1), Coordinate::new(1, 1), 0), Some(0));
    }

    #[test]
    fn crossing_a_counter_needs_a_budget() {
        let (_, oracle) = split();
        let left = Coordinate::new(2, 1);
        let right = Coordinate::new(4, 1);
        assert_eq!(oracle.distance(left, right, 0), None);
        assert_eq!(oracle.distance(left, right, 1), Some(2));
    }

    #[test]
    fn outer_counters_are_reachable_but_not_chained() {
        let (_, oracle) = split();
        // A counter next to the floor is one step away.
        assert_eq!(oracle.distance(Coordinate::new(1, 1), Coordinate::new(1, 0), 0), Some(1));
        // Two counters in a row are never crossed.
        assert_eq!(oracle.distance(Coordinate::new(1, 1), Coordinate::new(0, 0), 1), None);
    }

    #[test]
    fn distances_shrink_as_the_budget_grows() {
        let (env, oracle) = split();
        for source in env.cells() {
            for destination in env.cells() {
                if let Some(tight) = oracle.distance(source, destination, 0) {
                    let loose = oracle.distance(source, destination, 1).unwrap();
                    assert!(loose <= tight, "{source} -> {destination}");
                }
            }
        }
    }

    #[test]
    fn first_step_points_along_the_path() {
        let (_, oracle) = split();
        let (g, direction) = oracle
            .dist_direction(Coordinate::new(1, 1), Coordinate::new(5, 1), 1)
            .unwrap();
        assert_eq!(g, 4);
        assert_eq!(direction, Direction::Right);
        assert_eq!(oracle.budgets(), 2);
    }
}
