use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;
use twentyq_core::settings::GameSettings;

const DEFAULT_SIMULATED_GAMES: usize = 100;
const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root CLI configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CliConfig {
    pub run_id: String,
    pub dataset: String,
    pub outputs: OutputsConfig,
    /// Falls back to the `TWENTYQ_*` environment when the block is absent.
    #[serde(default = "GameSettings::from_env")]
    pub game: GameSettings,
    #[serde(default)]
    pub simulate: SimulateConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CliConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: CliConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        if self.dataset.trim().is_empty() {
            return Err(ValidationError::InvalidField {
                field: "dataset".to_string(),
                message: "dataset path must not be empty".to_string(),
            });
        }
        self.outputs.validate(&self.run_id)?;
        validate_game(&self.game)?;
        self.simulate.validate()?;
        self.logging.normalize();
        Ok(())
    }

    /// Resolve output templates (e.g., `{run_id}` placeholders) into concrete paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        ResolvedOutputs {
            records: resolve_template(&self.run_id, &self.outputs.records),
            outcomes: resolve_template(&self.run_id, &self.outputs.outcomes),
            simulation: resolve_template(&self.run_id, &self.outputs.simulation),
        }
    }
}

/// Output artifact configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub records: String,
    pub outcomes: String,
    pub simulation: String,
}

impl OutputsConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        for (label, value) in [
            ("outputs.records", &self.records),
            ("outputs.outcomes", &self.outcomes),
            ("outputs.simulation", &self.simulation),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "path must not be empty".to_string(),
                });
            }

            let resolved = resolve_template(run_id, value);
            if resolved.components().count() == 0 {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "resolved path is invalid".to_string(),
                });
            }
        }

        if self.records == self.outcomes {
            return Err(ValidationError::InvalidField {
                field: "outputs.outcomes".to_string(),
                message: "outcome log must not share the game record file".to_string(),
            });
        }
        Ok(())
    }
}

/// Self-play configuration block.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SimulateConfig {
    #[serde(default = "default_simulated_games")]
    pub games: usize,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SimulateConfig {
    fn default() -> Self {
        Self {
            games: DEFAULT_SIMULATED_GAMES,
            seed: None,
        }
    }
}

impl SimulateConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.games == 0 {
            return Err(ValidationError::InvalidField {
                field: "simulate.games".to_string(),
                message: "number of games must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

fn default_simulated_games() -> usize {
    DEFAULT_SIMULATED_GAMES
}

/// Logging configuration defaults to plain stderr output.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "warn".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id must not be empty".to_string(),
        });
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id may only contain alphanumeric characters, '.', '_' or '-'".to_string(),
        });
    }

    Ok(())
}

fn validate_game(game: &GameSettings) -> Result<(), ValidationError> {
    if game.threshold == 0 {
        return Err(ValidationError::InvalidField {
            field: "game.threshold".to_string(),
            message: "question limit must be at least 1".to_string(),
        });
    }

    if !(game.guess_confidence > 0.0 && game.guess_confidence <= 1.0) {
        return Err(ValidationError::InvalidField {
            field: "game.guess_confidence".to_string(),
            message: "confidence must be in (0, 1]".to_string(),
        });
    }

    if !(game.factor_floor > 0.0 && game.factor_floor < 1.0) {
        return Err(ValidationError::InvalidField {
            field: "game.factor_floor".to_string(),
            message: "factor floor must be in (0, 1) so answers stay reversible".to_string(),
        });
    }

    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    let replaced = template.replace("{run_id}", run_id);
    PathBuf::from(replaced)
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub records: PathBuf,
    pub outcomes: PathBuf,
    pub simulation: PathBuf,
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use twentyq_core::settings::Prior;

    const BASIC_YAML: &str = r#"
run_id: "animals_local"
dataset: "data/animals.yaml"
outputs:
  records: "out/{run_id}/games.jsonl"
  outcomes: "out/{run_id}/outcomes.jsonl"
  simulation: "out/{run_id}/simulation.jsonl"
game:
  threshold: 15
  prior: "popularity"
simulate:
  seed: 7
logging:
  enable_structured: true
  tracing_level: "debug"
"#;

    #[test]
    fn loads_and_validates_basic_config() {
        let mut cfg: CliConfig = serde_yaml::from_str(BASIC_YAML).expect("parse yaml");
        cfg.validate().expect("validate");

        assert_eq!(cfg.game.threshold, 15);
        assert_eq!(cfg.game.prior, Prior::Popularity);
        assert_eq!(cfg.game.guess_confidence, 0.95);
        assert_eq!(cfg.simulate.games, DEFAULT_SIMULATED_GAMES);
        assert_eq!(cfg.simulate.seed, Some(7));
        assert_eq!(cfg.logging.level(), Some(Level::DEBUG));

        let outputs = cfg.resolved_outputs();
        assert_eq!(
            outputs.records,
            PathBuf::from("out/animals_local/games.jsonl")
        );
    }

    #[test]
    fn defaults_apply_when_blocks_are_missing() {
        let yaml = BASIC_YAML
            .split("game:")
            .next()
            .expect("prefix")
            .to_string();
        let mut cfg: CliConfig = serde_yaml::from_str(&yaml).expect("parse");
        cfg.validate().expect("valid");
        assert_eq!(cfg.game, GameSettings::default());
        assert!(!cfg.logging.enable_structured);
        assert_eq!(cfg.logging.level(), Some(Level::WARN));
    }

    #[test]
    fn rejects_invalid_run_id() {
        let yaml = BASIC_YAML.replace("animals_local", "animals local");
        let mut cfg: CliConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("invalid run id");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "run_id"
        ));
    }

    #[test]
    fn rejects_zero_factor_floor() {
        let yaml = BASIC_YAML.replace("threshold: 15", "threshold: 15\n  factor_floor: 0.0");
        let mut cfg: CliConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("floor must be positive");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "game.factor_floor"
        ));
    }

    #[test]
    fn rejects_shared_output_files() {
        let yaml = BASIC_YAML.replace("outcomes.jsonl", "games.jsonl");
        let mut cfg: CliConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("shared outputs");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "outputs.outcomes"
        ));
    }
}
