use std::sync::{Arc, Mutex};

use dotenv::dotenv;
use math_battle::config::GameSetup;
use math_battle::quiz::tables;
use math_battle::{
    AnswerSink, BattleConfig, BattleOutcome, BattleSnapshot, Interaction, MathBattleGame, Timing,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

const GREETING_TEXT: &str = "Math battle! Answer fast to hurt your opponent, three fast answers in a row hit extra hard. Slow or wrong answers hurt you.";
const VICTORY_TEXT: &str = "Victory! Your opponent is down.";
const GAME_OVER_TEXT: &str = "Game over. Your opponent got the better of you.";
const PLAY_AGAIN_TEXT: &str = "Play again? [y/N]";

const BAR_WIDTH: u32 = 20;

/// Prints questions and feedback to stdout; answers come in via [`Terminal::answer`].
#[derive(Default)]
struct Terminal {
    current: Mutex<Option<(AnswerSink, Timing)>>,
}

impl Terminal {
    /// Routes a line to the open question. `false` if no question is waiting.
    fn answer(&self, line: &str) -> bool {
        let current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        match current.as_ref() {
            Some((sink, timing)) if sink.is_open() => sink.submit(line.trim(), timing.elapsed()),
            _ => false,
        }
    }
}

impl Interaction for Terminal {
    fn ask(&self, prompt: &str, timing: &Timing, answers: AnswerSink) {
        println!("\n{} = ?", prompt);
        let reminder = timing.clone();
        if let Err(e) = timing.register_portion(0.5, move || {
            println!("... {}s left", reminder.remaining().as_secs());
        }) {
            log::warn!("could not schedule reminder: {}", e);
        }
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some((answers, timing.clone()));
    }

    fn correct(&self, combo: Option<u32>) {
        match combo {
            Some(streak) if streak >= 3 => println!("Correct! COMBO x{}!", streak),
            Some(streak) => println!("Correct! Streak {}.", streak),
            None => println!("Correct, but too slow to keep a streak."),
        }
    }

    fn get_hit(&self, tier: Option<u8>) {
        match tier {
            Some(tier) => println!("Too slow ({}/3)! You take a hit.", tier),
            None => println!("Wrong! You take a hit."),
        }
    }

    fn incorrect(&self, _tier: Option<u8>, expected_answer: Option<&str>) {
        match expected_answer {
            Some(expected) => println!("Time's up! The answer was {}.", expected),
            None => println!("Time's up!"),
        }
    }

    fn turn_resolved(&self, snapshot: &BattleSnapshot) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = None;
        println!(
            "You {}   Opponent {}",
            health_bar(snapshot.player_health, snapshot.max_health),
            health_bar(snapshot.opponent_health, snapshot.max_health)
        );
    }
}

fn health_bar(health: u32, max: u32) -> String {
    let width = u64::from(BAR_WIDTH);
    // Configured health may be close to u32::MAX.
    let filled = (u64::from(health) * width / u64::from(max.max(1))).min(width) as usize;
    format!(
        "[{}{}] {:>3}",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH as usize - filled),
        health
    )
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> HandlerResult {
    dotenv().ok();
    pretty_env_logger::init();
    log::info!("Starting math battle...");

    let config = BattleConfig::from_env()?;
    let setup = GameSetup::from_env()?;
    log::debug!("config: {:?}, setup: {:?}", config, setup);

    let mut rng = match setup.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let questions = tables::mixed(&setup.tables).shuffled(&mut rng);
    log::info!("Loaded {} questions", questions.len());

    let terminal = Arc::new(Terminal::default());

    // Lines that are not answers end up here, for the menu.
    let (menu_tx, mut menu_rx) = mpsc::unbounded_channel::<String>();
    let reader = Arc::clone(&terminal);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if !reader.answer(&line) && menu_tx.send(line).is_err() {
                break;
            }
        }
    });

    println!("{}", GREETING_TEXT);
    let mut game = MathBattleGame::new(questions, terminal, config);
    loop {
        match game.play_battle().await? {
            BattleOutcome::Victory => println!("\n{}", VICTORY_TEXT),
            BattleOutcome::GameOver => println!("\n{}", GAME_OVER_TEXT),
        }
        game.reset();

        // Drop whatever was typed between questions.
        while menu_rx.try_recv().is_ok() {}
        println!("{}", PLAY_AGAIN_TEXT);
        match menu_rx.recv().await.as_deref().map(str::trim) {
            Some("y") | Some("Y") => continue,
            _ => break,
        }
    }

    log::info!("Played {} battles", game.battles_played());
    Ok(())
}
