//! Configuration loading and typed config structures for the planner.
//!
//! The planner's tuning constants live under the `planner:` key of
//! `sous-config.yaml`. Every field has a default, so an empty document is a
//! valid configuration.

use std::path::Path;

use serde::Deserialize;
use sous_search::SearchKind;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level planner configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlannerConfig {
    /// Joint-action search settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Hypothesis scoring and collision handling.
    #[serde(default)]
    pub collaboration: CollaborationConfig,

    /// Sliding-window goal recognition.
    #[serde(default)]
    pub recognizer: RecognizerConfig,
}

impl PlannerConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }
}

/// Joint-action search settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchConfig {
    /// Which algorithm answers goal searches.
    #[serde(default)]
    pub kind: SearchKind,

    /// Nodes with `g + h` at or above this bound are never expanded.
    #[serde(default = "default_depth_limit")]
    pub depth_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            kind: SearchKind::default(),
            depth_limit: default_depth_limit(),
        }
    }
}

/// Hypothesis scoring and collision handling.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CollaborationConfig {
    /// Per-agent penalty base; larger coalitions score worse.
    #[serde(default = "default_gamma_agents")]
    pub gamma_agents: f64,

    /// Per-goal reward base; batching goals scores better.
    #[serde(default = "default_gamma_goals")]
    pub gamma_goals: f64,

    /// Turns of each plan checked for collisions between sub-goals.
    #[serde(default = "default_action_trace_length")]
    pub action_trace_length: usize,
}

impl Default for CollaborationConfig {
    fn default() -> Self {
        Self {
            gamma_agents: default_gamma_agents(),
            gamma_goals: default_gamma_goals(),
            action_trace_length: default_action_trace_length(),
        }
    }
}

/// Sliding-window goal recognition constants.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecognizerConfig {
    /// Look-back window in turns.
    #[serde(default = "default_window")]
    pub window: usize,

    /// Inverse weight of solution length in a goal's probability.
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Scale of the "doing nothing" probability.
    #[serde(default = "default_beta")]
    pub beta: f64,

    /// Normalised probability at which a goal counts as probable.
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Margin a smaller coalition needs to make an agent look idle.
    #[serde(default = "default_delta")]
    pub delta: f64,

    /// Divisor applied to an agent's best progress when scoring idleness.
    #[serde(default = "default_none_divisor")]
    pub none_divisor: f64,

    /// Multiplier for goals observed for the first time.
    #[serde(default = "default_new_goal_penalty")]
    pub new_goal_penalty: f64,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
            alpha: default_alpha(),
            beta: default_beta(),
            threshold: default_threshold(),
            delta: default_delta(),
            none_divisor: default_none_divisor(),
            new_goal_penalty: default_new_goal_penalty(),
        }
    }
}

const fn default_depth_limit() -> usize {
    30
}

const fn default_gamma_agents() -> f64 {
    1.01
}

const fn default_gamma_goals() -> f64 {
    1.02
}

const fn default_action_trace_length() -> usize {
    3
}

const fn default_window() -> usize {
    4
}

const fn default_alpha() -> f64 {
    100.0
}

const fn default_beta() -> f64 {
    0.9
}

const fn default_threshold() -> f64 {
    0.8
}

const fn default_delta() -> f64 {
    1.05
}

const fn default_none_divisor() -> f64 {
    3.0
}

const fn default_new_goal_penalty() -> f64 {
    0.8
}
