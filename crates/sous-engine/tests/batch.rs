//! Runs the shipped configuration and levels through the batch driver.

#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use sous_engine::{EngineConfig, RunResult, run_scenario, write_results};
use sous_planner::{PlannerConfig, PlannerKind};
use sous_world::Level;

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

#[test]
fn shipped_config_names_loadable_levels() {
    let root = workspace_root();
    let config = EngineConfig::from_file(&root.join("sous-config.yaml")).unwrap();
    assert!(!config.batch.scenarios.is_empty());
    assert_eq!(config.planner, PlannerConfig::default());

    for scenario in &config.batch.scenarios {
        let path = root.join(config.batch.level_path(&scenario.level));
        let level = Level::from_file(&path, scenario.planners.len()).unwrap();
        assert!(!level.environment.is_done(&level.state), "{} starts finished", scenario.level);
    }
}

#[test]
fn lone_cook_solves_the_open_kitchen() {
    let path = workspace_root().join("levels/open_tomato.txt");
    let result = run_scenario("open_tomato", &path, &[PlannerKind::Full], 0, 100, &PlannerConfig::default()).unwrap();
    assert!(result.is_solved());
    assert!(result.turns <= 100);
    assert!(result.to_string().starts_with("open_tomato;m;0;"));
}

#[test]
fn idle_line_up_hits_the_turn_limit() {
    let path = workspace_root().join("levels/divider_tomato.txt");
    let result = run_scenario(
        "divider_tomato",
        &path,
        &[PlannerKind::Still, PlannerKind::Still],
        5,
        10,
        &PlannerConfig::default(),
    )
    .unwrap();
    assert_eq!(result.turns, 0);
    assert!(!result.is_solved());
}

#[test]
fn results_land_in_nested_output_directories() {
    let dir = std::env::temp_dir().join(format!("sous-engine-results-{}", std::process::id()));
    let output = dir.join("nested/result.txt");
    let path = workspace_root().join("levels/divider_tomato.txt");
    let result: RunResult = run_scenario(
        "divider_tomato",
        &path,
        &[PlannerKind::Still, PlannerKind::Still],
        1,
        1,
        &PlannerConfig::default(),
    )
    .unwrap();

    write_results(&output, &[result]).unwrap();
    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.starts_with("divider_tomato;s;s;1;0;"));
    std::fs::remove_dir_all(&dir).unwrap();
}
