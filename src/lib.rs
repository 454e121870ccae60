//! Timed arithmetic quiz battles.
//!
//! A [`MathBattleGame`] runs [`Battle`]s: each question has an answer window
//! driven by a [`Timing`], fast correct answers hurt the opponent (every third
//! one in a row for bonus damage), wrong or late ones hurt the player.

pub mod battle;
pub mod config;
pub mod error;
pub mod game;
pub mod interaction;
pub mod quiz;
pub mod timing;

#[cfg(test)]
pub(crate) mod testing;

pub use battle::{Battle, BattleOutcome, BattleSnapshot, Resolution, TurnReport};
pub use config::BattleConfig;
pub use error::{BattleError, ConfigError, TimingError};
pub use game::{GameState, MathBattleGame};
pub use interaction::{AnswerSink, Interaction};
pub use quiz::{QuestionItem, QuestionSequence};
pub use timing::{Phase, ScheduleToken, Timing};
