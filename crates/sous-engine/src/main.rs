//! Batch runner for the Sous kitchen planners.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `$SOUS_CONFIG` or `sous-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Play every scenario for each of its seeds
//! 4. Write the result rows and log a summary

use anyhow::Context;
use sous_engine::{EngineConfig, LogFormat, Summary, run_batch, write_results};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, a level cannot
/// be played, or the results cannot be written.
fn main() -> anyhow::Result<()> {
    let config = EngineConfig::load().context("loading engine configuration")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    match config.logging.format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.init(),
    }

    info!(
        scenarios = config.batch.scenarios.len(),
        levels_dir = %config.batch.levels_dir.display(),
        turn_limit = config.batch.turn_limit,
        "sous-engine starting"
    );

    let results = run_batch(&config.batch, &config.planner).context("running batch scenarios")?;
    write_results(&config.batch.output, &results)
        .with_context(|| format!("writing results to {}", config.batch.output.display()))?;

    let summary = Summary::new(&results);
    info!(
        runs = summary.runs,
        average_turns = summary.average_turns,
        solved = summary.solved,
        average_solved_turns = summary.average_solved_turns,
        "sous-engine finished"
    );
    Ok(())
}
