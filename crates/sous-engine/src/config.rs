//! Configuration for the engine binary.
//!
//! The canonical configuration lives in `sous-config.yaml` at the project
//! root; the `SOUS_CONFIG` environment variable points elsewhere. The
//! `planner:` section is handed to every planner unchanged.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use sous_planner::{ConfigError, PlannerConfig, PlannerKind};
use tracing::info;

/// Environment variable overriding the config file path.
pub const CONFIG_ENV: &str = "SOUS_CONFIG";

/// Config file read when [`CONFIG_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "sous-config.yaml";

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EngineConfig {
    /// Log filter and output format.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Batch runs and where their results go.
    #[serde(default)]
    pub batch: BatchConfig,

    /// Tuning shared by every planner.
    #[serde(default)]
    pub planner: PlannerConfig,
}

impl EngineConfig {
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

    /// Load from `$SOUS_CONFIG`, else `sous-config.yaml`, else defaults.
    ///
    /// A path named by the environment variable must exist; the default
    /// path may be missing.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }
        let path = Path::new(DEFAULT_CONFIG_PATH);
        if path.exists() {
            Self::from_file(path)
        } else {
            info!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Batch driver settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BatchConfig {
    /// Directory holding `<level>.txt` files.
    #[serde(default = "default_levels_dir")]
    pub levels_dir: PathBuf,

    /// File the result rows are written to.
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Turns after which a run is abandoned.
    #[serde(default = "default_turn_limit")]
    pub turn_limit: usize,

    /// Runs to perform, in order.
    #[serde(default)]
    pub scenarios: Vec<ScenarioConfig>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            levels_dir: default_levels_dir(),
            output: default_output(),
            turn_limit: default_turn_limit(),
            scenarios: Vec::new(),
        }
    }
}

impl BatchConfig {
    /// Path of the level file named `level`.
    pub fn level_path(&self, level: &str) -> PathBuf {
        self.levels_dir.join(format!("{level}.txt"))
    }
}

/// One level played by one line-up of planners.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScenarioConfig {
    /// Level file stem.
    pub level: String,

    /// Planner per agent; the length sets the agent count.
    pub planners: Vec<PlannerKind>,

    /// Seeds to run the scenario with.
    #[serde(default = "default_seeds")]
    pub seeds: Vec<u64>,
}

// ---------------------------------------------------------------------------
// Default value functions for serde
// ---------------------------------------------------------------------------

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_levels_dir() -> PathBuf {
    PathBuf::from("levels")
}

fn default_output() -> PathBuf {
    PathBuf::from("results/result.txt")
}

const fn default_turn_limit() -> usize {
    100
}

fn default_seeds() -> Vec<u64> {
    vec![0]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = EngineConfig::parse("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.batch.turn_limit, 100);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn scenarios_parse_with_default_seed() {
        let yaml = "
logging:
  format: json
batch:
  levels_dir: kitchens
  scenarios:
    - level: divider_salad
      planners: [full, single]
    - level: open_tomato
      planners: [full, still]
      seeds: [1, 2]
planner:
  search:
    depth_limit: 20
";
        let config = EngineConfig::parse(yaml).unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.batch.scenarios.len(), 2);

        let first = config.batch.scenarios.first().unwrap();
        assert_eq!(first.planners, vec![PlannerKind::Full, PlannerKind::SingleGoal]);
        assert_eq!(first.seeds, vec![0]);
        assert_eq!(config.batch.scenarios.get(1).unwrap().seeds, vec![1, 2]);
        assert_eq!(config.planner.search.depth_limit, 20);
        assert_eq!(
            config.batch.level_path("open_tomato"),
            PathBuf::from("kitchens").join("open_tomato.txt")
        );
    }

    #[test]
    fn unknown_planner_is_rejected() {
        let yaml = "batch:\n  scenarios:\n    - level: x\n      planners: [greedy]\n";
        assert!(matches!(EngineConfig::parse(yaml), Err(ConfigError::Yaml { .. })));
    }
}
