//! One match between the player and an opponent.
//!
//! Every question gets its own [`Timing`] window with lateness tiers at 1/3,
//! 2/3 and the end of the window. An answer, a lateness tier and the timeout
//! all report into the same per-question channel; the first one that resolves
//! the question settles it and ends the window, which keeps the others from
//! ever touching health or combo for that question.

use std::sync::Arc;
use std::time::Duration;

use crate::config::BattleConfig;
use crate::error::BattleError;
use crate::interaction::{AnswerSink, Interaction, Turn, TurnEvent};
use crate::quiz::{QuestionItem, QuestionSequence};
use crate::timing::{Phase, Timing};

const LATENESS_TIERS: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleOutcome {
    Victory,
    GameOver,
}

/// How a single question was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Resolution {
    /// Correct but slower than the first lateness tier; the streak is lost.
    Correct,
    /// Correct and fast. `bonus` is set on the answer that completed a combo.
    Streak { streak: u32, bonus: bool },
    Incorrect,
    Timeout,
    /// A lateness nudge took the last of the player's health.
    KnockedOut { tier: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TurnReport {
    pub question: QuestionItem,
    pub resolution: Resolution,
    /// Lateness nudges taken before the question was settled.
    pub nudges: u8,
    pub outcome: Option<BattleOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BattleSnapshot {
    pub id: u64,
    pub player_health: u32,
    pub opponent_health: u32,
    pub max_health: u32,
    pub combo: u32,
}

pub struct Battle {
    id: u64,
    player_health: u32,
    opponent_health: u32,
    combo: u32,
    config: BattleConfig,
    interaction: Arc<dyn Interaction>,
}

impl Battle {
    pub fn new(id: u64, config: BattleConfig, interaction: Arc<dyn Interaction>) -> Self {
        Self {
            id,
            player_health: config.max_health,
            opponent_health: config.max_health,
            combo: 0,
            config,
            interaction,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn player_health(&self) -> u32 {
        self.player_health
    }

    pub fn opponent_health(&self) -> u32 {
        self.opponent_health
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn snapshot(&self) -> BattleSnapshot {
        BattleSnapshot {
            id: self.id,
            player_health: self.player_health,
            opponent_health: self.opponent_health,
            max_health: self.config.max_health,
            combo: self.combo,
        }
    }

    /// `Some` once either side is out of health. Player defeat is checked first.
    pub fn outcome(&self) -> Option<BattleOutcome> {
        if self.player_health == 0 {
            Some(BattleOutcome::GameOver)
        } else if self.opponent_health == 0 {
            Some(BattleOutcome::Victory)
        } else {
            None
        }
    }

    /// Plays questions until one side has no health left.
    pub async fn play(&mut self, questions: &mut QuestionSequence) -> Result<BattleOutcome, BattleError> {
        log::info!("battle {} started", self.id);
        loop {
            if let Some(outcome) = self.outcome() {
                log::info!(
                    "battle {} done: {:?} (player {}, opponent {})",
                    self.id,
                    outcome,
                    self.player_health,
                    self.opponent_health
                );
                return Ok(outcome);
            }
            self.play_turn(questions).await?;
        }
    }

    /// Asks the next question and waits until it is settled.
    pub async fn play_turn(&mut self, questions: &mut QuestionSequence) -> Result<TurnReport, BattleError> {
        let question = questions.next().cloned().ok_or(BattleError::NoQuestions)?;
        let budget = self.config.time_per_answer;
        let timing = Timing::new(budget);
        let (mut turn, signal) = Turn::open();

        log::debug!("battle {}: asking {:?}", self.id, question.prompt);
        let answers = AnswerSink::new(signal.clone());
        self.interaction.ask(&question.prompt, &timing, answers);

        for tier in 1..=LATENESS_TIERS {
            let signal = signal.clone();
            let event = if tier < LATENESS_TIERS {
                TurnEvent::Lateness(tier)
            } else {
                TurnEvent::Timeout
            };
            timing.register_portion(f64::from(tier) / f64::from(LATENESS_TIERS), move || {
                signal.send(event);
            })?;
        }
        // Only the sink and the timer callbacks may keep the turn alive.
        drop(signal);
        timing.start()?;

        let mut nudges = 0;
        let resolution = loop {
            let Some(event) = turn.next_event().await else {
                return Err(BattleError::TurnAbandoned);
            };
            match event {
                TurnEvent::Answered { answer, time_taken } => {
                    close(&turn, &timing)?;
                    break self.resolve_answer(&question, &answer, time_taken);
                }
                TurnEvent::Lateness(tier) => {
                    nudges += 1;
                    self.nudge(tier);
                    if self.player_health == 0 {
                        close(&turn, &timing)?;
                        break Resolution::KnockedOut { tier };
                    }
                }
                TurnEvent::Timeout => {
                    close(&turn, &timing)?;
                    break self.resolve_timeout(&question);
                }
            }
        };

        log::debug!(
            "battle {}: {:?} resolved as {:?} (player {}, opponent {}, combo {})",
            self.id,
            question.prompt,
            resolution,
            self.player_health,
            self.opponent_health,
            self.combo
        );
        self.interaction.turn_resolved(&self.snapshot());

        Ok(TurnReport {
            question,
            resolution,
            nudges,
            outcome: self.outcome(),
        })
    }

    fn resolve_answer(&mut self, question: &QuestionItem, answer: &str, time_taken: Duration) -> Resolution {
        if answer != question.expected_answer {
            self.hit_player(self.config.incorrect_loss);
            self.combo = 0;
            self.interaction.get_hit(None);
            return Resolution::Incorrect;
        }

        if time_taken > self.config.time_per_answer / u32::from(LATENESS_TIERS) {
            self.hit_opponent(self.config.correct_loss);
            self.combo = 0;
            self.interaction.correct(None);
            return Resolution::Correct;
        }

        self.combo += 1;
        let streak = self.combo;
        self.interaction.correct(Some(streak));
        let bonus = streak >= self.config.combo_length;
        if bonus {
            self.hit_opponent(self.config.combo_loss);
            self.combo = 0;
        } else {
            self.hit_opponent(self.config.correct_loss);
        }
        Resolution::Streak { streak, bonus }
    }

    fn resolve_timeout(&mut self, question: &QuestionItem) -> Resolution {
        self.hit_player(self.config.timeout_loss);
        self.combo = 0;
        let expected = question.expected_answer.as_str();
        self.interaction.incorrect(Some(LATENESS_TIERS), Some(expected));
        Resolution::Timeout
    }

    // Same effect as a wrong answer, but the question stays open.
    fn nudge(&mut self, tier: u8) {
        self.hit_player(self.config.incorrect_loss);
        self.combo = 0;
        self.interaction.get_hit(Some(tier));
    }

    fn hit_player(&mut self, amount: u32) {
        self.player_health = self.player_health.saturating_sub(amount);
    }

    fn hit_opponent(&mut self, amount: u32) {
        self.opponent_health = self.opponent_health.saturating_sub(amount);
    }
}

/// Settles the turn and ends its window so nothing else fires for it.
/// The timeout arrives after the window closed itself, hence the phase check.
fn close(turn: &Turn, timing: &Timing) -> Result<(), BattleError> {
    turn.settle();
    if timing.phase() == Phase::Running {
        timing.end()?;
    }
    Ok(())
}
