use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::quiz::tables::MAX_FACTOR;

const TIME_PER_ANSWER_MSECS: u64 = 25_000;
const MAX_HEALTH: u32 = 100;

const CORRECT_HEALTH_LOSS: u32 = 10;
const CORRECT_COMBO_HEALTH_LOSS: u32 = 25;
const COMBO_LENGTH: u32 = 3;

const INCORRECT_HEALTH_LOSS: u32 = 5;
const TIMEOUT_HEALTH_LOSS: u32 = 10;

/// Tunables of a battle. `Default` gives the standard game.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    pub time_per_answer: Duration,
    pub max_health: u32,
    /// Opponent damage for a correct answer outside of a finished combo.
    pub correct_loss: u32,
    /// Opponent damage for the answer that completes a combo.
    pub combo_loss: u32,
    pub combo_length: u32,
    /// Player damage for a wrong answer and for each lateness nudge.
    pub incorrect_loss: u32,
    pub timeout_loss: u32,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            time_per_answer: Duration::from_millis(TIME_PER_ANSWER_MSECS),
            max_health: MAX_HEALTH,
            correct_loss: CORRECT_HEALTH_LOSS,
            combo_loss: CORRECT_COMBO_HEALTH_LOSS,
            combo_length: COMBO_LENGTH,
            incorrect_loss: INCORRECT_HEALTH_LOSS,
            timeout_loss: TIMEOUT_HEALTH_LOSS,
        }
    }
}

impl BattleConfig {
    /// Reads `MATH_BATTLE_*` overrides from the process environment.
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(ms) = parse_var::<u64>(&lookup, "MATH_BATTLE_TIME_PER_ANSWER_MS")? {
            config.time_per_answer = Duration::from_millis(ms);
        }
        if let Some(v) = parse_var(&lookup, "MATH_BATTLE_MAX_HEALTH")? {
            config.max_health = v;
        }
        if let Some(v) = parse_var(&lookup, "MATH_BATTLE_CORRECT_LOSS")? {
            config.correct_loss = v;
        }
        if let Some(v) = parse_var(&lookup, "MATH_BATTLE_COMBO_LOSS")? {
            config.combo_loss = v;
        }
        if let Some(v) = parse_var(&lookup, "MATH_BATTLE_COMBO_LENGTH")? {
            config.combo_length = v;
        }
        if let Some(v) = parse_var(&lookup, "MATH_BATTLE_INCORRECT_LOSS")? {
            config.incorrect_loss = v;
        }
        if let Some(v) = parse_var(&lookup, "MATH_BATTLE_TIMEOUT_LOSS")? {
            config.timeout_loss = v;
        }

        if config.time_per_answer.is_zero() {
            return Err(ConfigError::Invalid {
                key: "MATH_BATTLE_TIME_PER_ANSWER_MS",
                value: "0".to_string(),
            });
        }
        if config.combo_length == 0 {
            return Err(ConfigError::Invalid {
                key: "MATH_BATTLE_COMBO_LENGTH",
                value: "0".to_string(),
            });
        }

        Ok(config)
    }
}

/// What the terminal game asks: which tables, and how to shuffle them.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GameSetup {
    pub tables: Vec<u32>,
    /// Fixed shuffle seed; `None` shuffles from entropy.
    pub seed: Option<u64>,
}

impl Default for GameSetup {
    fn default() -> Self {
        Self {
            tables: (2..=10).collect(),
            seed: None,
        }
    }
}

impl GameSetup {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `MATH_BATTLE_TABLES` is a comma separated list of factors, e.g. `2,3,7`.
    /// Factors above [`MAX_FACTOR`] are rejected.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        const TABLES: &str = "MATH_BATTLE_TABLES";
        let mut setup = Self::default();

        if let Some(raw) = lookup(TABLES) {
            let tables = raw
                .split(',')
                .map(str::trim)
                .filter(|factor| !factor.is_empty())
                .map(|factor| factor.parse::<u32>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| ConfigError::Invalid {
                    key: TABLES,
                    value: raw.clone(),
                })?;
            if tables.is_empty() || tables.iter().any(|&factor| factor > MAX_FACTOR) {
                return Err(ConfigError::Invalid { key: TABLES, value: raw });
            }
            setup.tables = tables;
        }
        setup.seed = parse_var(&lookup, "MATH_BATTLE_SEED")?;

        Ok(setup)
    }
}

pub(crate) fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
