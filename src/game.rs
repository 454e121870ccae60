use std::sync::Arc;

use crate::battle::{Battle, BattleOutcome};
use crate::config::BattleConfig;
use crate::error::BattleError;
use crate::interaction::Interaction;
use crate::quiz::QuestionSequence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    Playing,
    Victory,
    GameOver,
}

impl From<BattleOutcome> for GameState {
    fn from(outcome: BattleOutcome) -> Self {
        match outcome {
            BattleOutcome::Victory => GameState::Victory,
            BattleOutcome::GameOver => GameState::GameOver,
        }
    }
}

/// Runs battles one after another over a shared question sequence.
///
/// The sequence cursor carries over between battles, so a new battle picks up
/// where the last one stopped.
pub struct MathBattleGame {
    questions: QuestionSequence,
    interaction: Arc<dyn Interaction>,
    config: BattleConfig,
    current_battle: Option<Battle>,
    state: Option<GameState>,
    // Next battle id; never reused.
    battle_counter: u64,
}

impl MathBattleGame {
    pub fn new(questions: QuestionSequence, interaction: Arc<dyn Interaction>, config: BattleConfig) -> Self {
        Self {
            questions,
            interaction,
            config,
            current_battle: None,
            state: None,
            battle_counter: 0,
        }
    }

    pub async fn play_battle(&mut self) -> Result<BattleOutcome, BattleError> {
        self.state = Some(GameState::Playing);
        let id = self.battle_counter;
        self.battle_counter += 1;

        let mut battle = Battle::new(id, self.config.clone(), Arc::clone(&self.interaction));
        let result = battle.play(&mut self.questions).await;
        self.current_battle = Some(battle);

        match result {
            Ok(outcome) => {
                self.state = Some(outcome.into());
                Ok(outcome)
            }
            Err(e) => {
                log::warn!("battle {} aborted: {}", id, e);
                self.state = None;
                Err(e)
            }
        }
    }

    /// Forgets the finished battle and goes back to idle.
    pub fn reset(&mut self) {
        self.current_battle = None;
        self.state = None;
    }

    pub fn state(&self) -> Option<GameState> {
        self.state
    }

    pub fn current_battle(&self) -> Option<&Battle> {
        self.current_battle.as_ref()
    }

    pub fn battles_played(&self) -> u64 {
        self.battle_counter
    }

    pub fn questions_mut(&mut self) -> &mut QuestionSequence {
        &mut self.questions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{numbered, Reply, Scripted};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn battles_get_fresh_ids_and_results() {
        let script = Scripted::new(vec![], Reply::Correct(Duration::from_secs(1)));
        let mut game = MathBattleGame::new(numbered(5), script.clone(), BattleConfig::default());
        assert_eq!(game.state(), None);

        assert_eq!(game.play_battle().await.unwrap(), BattleOutcome::Victory);
        assert_eq!(game.state(), Some(GameState::Victory));
        assert_eq!(game.current_battle().map(Battle::id), Some(0));

        game.reset();
        assert!(game.current_battle().is_none());
        assert_eq!(game.state(), None);

        game.play_battle().await.unwrap();
        assert_eq!(game.current_battle().map(Battle::id), Some(1));
        assert_eq!(game.battles_played(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn question_cursor_carries_over_between_battles() {
        let script = Scripted::new(vec![], Reply::Correct(Duration::ZERO));
        let mut game = MathBattleGame::new(numbered(5), script.clone(), BattleConfig::default());

        game.play_battle().await.unwrap();
        game.reset();
        game.play_battle().await.unwrap();

        // Seven questions per battle over a cycle of five.
        let asked = script.asked();
        assert_eq!(asked.len(), 14);
        assert_eq!(asked[7], "q2");
    }

    #[tokio::test(start_paused = true)]
    async fn rewound_questions_start_the_next_battle_from_the_top() {
        let script = Scripted::new(vec![], Reply::Correct(Duration::ZERO));
        let mut game = MathBattleGame::new(numbered(5), script.clone(), BattleConfig::default());

        game.play_battle().await.unwrap();
        game.reset();
        game.questions_mut().reset();
        game.play_battle().await.unwrap();

        let asked = script.asked();
        assert_eq!(asked.len(), 14);
        assert_eq!(asked[..7], asked[7..]);
        assert_eq!(asked[7], "q0");
    }

    #[tokio::test(start_paused = true)]
    async fn losing_player_ends_in_game_over() {
        let script = Scripted::new(vec![], Reply::Wrong(Duration::ZERO));
        let mut game = MathBattleGame::new(numbered(3), script.clone(), BattleConfig::default());

        assert_eq!(game.play_battle().await.unwrap(), BattleOutcome::GameOver);
        assert_eq!(game.state(), Some(GameState::GameOver));
        let battle = game.current_battle().unwrap();
        assert_eq!(battle.player_health(), 0);
        assert_eq!(battle.opponent_health(), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_question_set_fails_the_battle() {
        let script = Scripted::new(vec![], Reply::Silent);
        let mut game = MathBattleGame::new(QuestionSequence::default(), script, BattleConfig::default());
        assert!(matches!(game.play_battle().await, Err(BattleError::NoQuestions)));
        assert_eq!(game.state(), None);
        assert_eq!(game.battles_played(), 1);
    }
}
