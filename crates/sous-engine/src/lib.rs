//! Host session and batch driver for the Sous kitchen planners.
//!
//! The engine owns the live world state and the planners attached to its
//! agents. A host process drives it turn by turn through [`Session`]; the
//! `sous-engine` binary instead plays configured scenarios to completion and
//! writes one result row per run.
//!
//! # Modules
//!
//! - [`batch`] -- Scenario runs, result rows and summaries.
//! - [`config`] -- `sous-config.yaml` loading.
//! - [`error`] -- Error type shared by the session and the batch driver.
//! - [`session`] -- Host-facing init, register, update and query calls.

pub mod batch;
pub mod config;
pub mod error;
pub mod session;

// Re-export primary types at crate root.
pub use batch::{RunResult, Summary, run_batch, run_scenario, write_results};
pub use config::{BatchConfig, EngineConfig, LogFormat, LoggingConfig, ScenarioConfig};
pub use error::EngineError;
pub use session::Session;
