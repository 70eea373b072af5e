//! Batch driver: plays every configured scenario and records one result
//! row per run.
//!
//! A row reads `level;planner1;planner2;...;seed;turns;time_ms`, with one
//! planner glyph per agent. A run that hits the turn limit records zero
//! turns.

use std::path::Path;

use chrono::{DateTime, Utc};
use sous_planner::{PlannerConfig, PlannerKind};
use sous_types::AgentId;
use tracing::{info, warn};

use crate::config::BatchConfig;
use crate::error::EngineError;
use crate::session::Session;

/// Outcome of one scenario run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    /// Level file stem.
    pub level: String,
    /// Planner per agent.
    pub planners: Vec<PlannerKind>,
    /// Seed the planners were created with.
    pub seed: u64,
    /// Turns until the goal held; zero when the turn limit was hit.
    pub turns: usize,
    /// Wall-clock duration of the run in milliseconds.
    pub time_ms: i64,
    /// When the run started.
    pub started_at: DateTime<Utc>,
}

impl RunResult {
    /// Whether the goal was reached within the turn limit.
    pub const fn is_solved(&self) -> bool {
        self.turns > 0
    }
}

impl core::fmt::Display for RunResult {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.level)?;
        for planner in &self.planners {
            write!(f, ";{planner}")?;
        }
        write!(f, ";{};{};{}", self.seed, self.turns, self.time_ms)
    }
}

/// Play `level` at `level_path` with one planner per entry of `planners`
/// until the goal holds or `turn_limit` turns have passed.
pub fn run_scenario(
    level: &str,
    level_path: &Path,
    planners: &[PlannerKind],
    seed: u64,
    turn_limit: usize,
    config: &PlannerConfig,
) -> Result<RunResult, EngineError> {
    if planners.is_empty() {
        return Err(EngineError::EmptyScenario {
            level: level.to_owned(),
        });
    }

    let started_at = Utc::now();
    let mut session = Session::init(level_path, planners.len(), seed, config.clone())?;
    for (index, kind) in planners.iter().enumerate() {
        session.add_planner(AgentId(index), *kind)?;
    }

    while !session.is_done() && session.time_step() < turn_limit {
        session.step()?;
    }

    let turns = if session.is_done() { session.time_step() } else { 0 };
    let time_ms = Utc::now().signed_duration_since(started_at).num_milliseconds();
    let result = RunResult {
        level: level.to_owned(),
        planners: planners.to_vec(),
        seed,
        turns,
        time_ms,
        started_at,
    };

    if result.is_solved() {
        info!(%level, seed, turns, time_ms, "Scenario solved");
    } else {
        warn!(%level, seed, turn_limit, time_ms, "Scenario hit the turn limit");
    }
    Ok(result)
}

/// Run every scenario of `batch` for each of its seeds, in order.
pub fn run_batch(batch: &BatchConfig, config: &PlannerConfig) -> Result<Vec<RunResult>, EngineError> {
    let mut results = Vec::new();
    for scenario in &batch.scenarios {
        let path = batch.level_path(&scenario.level);
        for seed in &scenario.seeds {
            info!(
                level = %scenario.level,
                path = %path.display(),
                seed,
                agents = scenario.planners.len(),
                "Running scenario"
            );
            let result = run_scenario(&scenario.level, &path, &scenario.planners, *seed, batch.turn_limit, config)?;
            results.push(result);
        }
    }
    Ok(results)
}

/// Result rows, one per line.
pub fn render_rows(results: &[RunResult]) -> String {
    results.iter().map(|result| format!("{result}\n")).collect()
}

/// Write the rows of `results` to `path`, creating parent directories.
pub fn write_results(path: &Path, results: &[RunResult]) -> Result<(), EngineError> {
    let output_error = |source| EngineError::Output {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(output_error)?;
    }
    std::fs::write(path, render_rows(results)).map_err(output_error)?;
    info!(path = %path.display(), rows = results.len(), "Results written");
    Ok(())
}

/// Averages over a set of runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    /// Number of runs.
    pub runs: usize,
    /// Mean turns over all runs, capped runs counting zero.
    pub average_turns: f64,
    /// Number of runs that reached the goal.
    pub solved: usize,
    /// Mean turns over solved runs.
    pub average_solved_turns: f64,
}

impl Summary {
    /// Summarise `results`; averages are zero for empty sets.
    #[allow(clippy::cast_precision_loss)]
    pub fn new(results: &[RunResult]) -> Self {
        let mean = |sum: usize, count: usize| if count == 0 { 0.0 } else { sum as f64 / count as f64 };

        let total: usize = results.iter().map(|result| result.turns).sum();
        let solved: Vec<&RunResult> = results.iter().filter(|result| result.is_solved()).collect();
        let solved_total: usize = solved.iter().map(|result| result.turns).sum();

        Self {
            runs: results.len(),
            average_turns: mean(total, results.len()),
            solved: solved.len(),
            average_solved_turns: mean(solved_total, solved.len()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn result(turns: usize) -> RunResult {
        RunResult {
            level: "divider_salad".to_owned(),
            planners: vec![PlannerKind::Full, PlannerKind::SingleGoal],
            seed: 3,
            turns,
            time_ms: 12,
            started_at: Utc::now(),
        }
    }

    #[test]
    fn rows_list_planner_glyphs_per_agent() {
        assert_eq!(result(17).to_string(), "divider_salad;m;n;3;17;12");
        assert_eq!(render_rows(&[result(1), result(0)]), "divider_salad;m;n;3;1;12\ndivider_salad;m;n;3;0;12\n");
    }

    #[test]
    fn summary_separates_solved_runs() {
        let summary = Summary::new(&[result(10), result(0), result(20)]);
        assert_eq!(summary.runs, 3);
        assert_eq!(summary.solved, 2);
        assert!((summary.average_turns - 10.0).abs() < 1e-9);
        assert!((summary.average_solved_turns - 15.0).abs() < 1e-9);

        let empty = Summary::new(&[]);
        assert_eq!(empty.runs, 0);
        assert!(empty.average_turns.abs() < 1e-9);
    }

    #[test]
    fn scenario_without_planners_is_rejected() {
        let outcome = run_scenario("x", Path::new("missing.txt"), &[], 0, 10, &PlannerConfig::default());
        assert!(matches!(outcome, Err(EngineError::EmptyScenario { .. })));
    }

    #[test]
    fn missing_level_file_is_a_world_error() {
        let outcome = run_scenario(
            "x",
            Path::new("no/such/level.txt"),
            &[PlannerKind::Still],
            0,
            10,
            &PlannerConfig::default(),
        );
        assert!(matches!(outcome, Err(EngineError::World { .. })));
    }
}
