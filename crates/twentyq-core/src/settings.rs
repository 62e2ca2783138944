//! Tunables for a single game session.

use serde::{Deserialize, Serialize};
use std::env;

pub const DEFAULT_THRESHOLD: usize = 20;
pub const DEFAULT_GUESS_CONFIDENCE: f64 = 0.95;
pub const DEFAULT_FACTOR_FLOOR: f64 = 1e-6;

/// Starting belief before any question is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prior {
    /// Every candidate starts equally likely.
    #[default]
    Uniform,
    /// Candidates start proportional to their popularity weight; candidates
    /// without one count as weight 1.
    Popularity,
}

impl Prior {
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "uniform" => Some(Prior::Uniform),
            "popularity" => Some(Prior::Popularity),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    /// The game is over once more than this many questions were answered.
    pub threshold: usize,
    /// Probability the top candidate needs before a front end should guess.
    pub guess_confidence: f64,
    /// Lower bound applied to every likelihood factor so a single answer never
    /// zeroes a candidate and undo can always divide it back out.
    pub factor_floor: f64,
    pub prior: Prior,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            guess_confidence: DEFAULT_GUESS_CONFIDENCE,
            factor_floor: DEFAULT_FACTOR_FLOOR,
            prior: Prior::Uniform,
        }
    }
}

impl GameSettings {
    pub fn from_env() -> Self {
        let base = Self::default();
        let threshold = env::var("TWENTYQ_THRESHOLD")
            .ok()
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(base.threshold);
        let confidence = parse_env_f64("TWENTYQ_GUESS_CONFIDENCE", base.guess_confidence);
        let floor = parse_env_f64("TWENTYQ_FACTOR_FLOOR", base.factor_floor);
        let prior = env::var("TWENTYQ_PRIOR")
            .ok()
            .and_then(|value| Prior::from_str(&value))
            .unwrap_or(base.prior);

        Self {
            threshold: threshold.max(1),
            guess_confidence: confidence.clamp(0.5, 1.0),
            factor_floor: floor.clamp(1e-12, 0.1),
            prior,
        }
    }
}

fn parse_env_f64(key: &str, fallback: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classic_game() {
        let settings = GameSettings::default();
        assert_eq!(settings.threshold, 20);
        assert_eq!(settings.prior, Prior::Uniform);
        assert!(settings.factor_floor > 0.0);
    }

    #[test]
    fn prior_parses_case_insensitively() {
        assert_eq!(Prior::from_str("Popularity"), Some(Prior::Popularity));
        assert_eq!(Prior::from_str(" uniform "), Some(Prior::Uniform));
        assert_eq!(Prior::from_str("zipf"), None);
    }

    #[test]
    fn settings_deserialize_with_partial_fields() {
        let settings: GameSettings = serde_json::from_str(r#"{"threshold": 10}"#).unwrap();
        assert_eq!(settings.threshold, 10);
        assert_eq!(settings.guess_confidence, DEFAULT_GUESS_CONFIDENCE);
    }
}
