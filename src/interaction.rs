//! The boundary between the game core and whatever presents it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::battle::BattleSnapshot;
use crate::timing::Timing;

/// Presentation layer of a battle.
///
/// The notification methods are feedback only. Health and combo live in the
/// [`Battle`](crate::battle::Battle) and are never read back from here.
pub trait Interaction: Send + Sync {
    /// Shows `prompt` to the player. `timing` is the question's answer window,
    /// not yet started; the presenter may register its own callbacks on it.
    /// Answers go through `answers`.
    fn ask(&self, prompt: &str, timing: &Timing, answers: AnswerSink);

    /// A correct answer. `combo` is the fast-answer streak, `None` for a slow one.
    fn correct(&self, combo: Option<u32>);

    /// The player took a hit: `tier` is the lateness tier, `None` for a wrong answer.
    fn get_hit(&self, tier: Option<u8>);

    /// The question was lost outright.
    fn incorrect(&self, tier: Option<u8>, expected_answer: Option<&str>);

    fn turn_resolved(&self, _snapshot: &BattleSnapshot) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TurnEvent {
    Answered { answer: String, time_taken: Duration },
    Lateness(u8),
    Timeout,
}

/// Sending half of a question's event channel. Every source that may resolve
/// the question holds one.
#[derive(Debug, Clone)]
pub(crate) struct TurnSignal {
    events: mpsc::UnboundedSender<TurnEvent>,
    resolved: Arc<AtomicBool>,
}

impl TurnSignal {
    pub(crate) fn send(&self, event: TurnEvent) -> bool {
        if self.resolved.load(Ordering::Acquire) {
            return false;
        }
        self.events.send(event).is_ok()
    }
}

/// Receiving half, owned by the battle for the lifetime of one question.
#[derive(Debug)]
pub(crate) struct Turn {
    events: mpsc::UnboundedReceiver<TurnEvent>,
    resolved: Arc<AtomicBool>,
}

impl Turn {
    pub(crate) fn open() -> (Self, TurnSignal) {
        let (tx, rx) = mpsc::unbounded_channel();
        let resolved = Arc::new(AtomicBool::new(false));
        let signal = TurnSignal {
            events: tx,
            resolved: Arc::clone(&resolved),
        };
        (
            Self {
                events: rx,
                resolved,
            },
            signal,
        )
    }

    /// `None` once every signal is gone without anything resolving the turn.
    pub(crate) async fn next_event(&mut self) -> Option<TurnEvent> {
        self.events.recv().await
    }

    /// Marks the question resolved. Only the first call returns `true`.
    pub(crate) fn settle(&self) -> bool {
        !self.resolved.swap(true, Ordering::AcqRel)
    }
}

/// Where the presenter submits the player's answer to the current question.
#[derive(Debug, Clone)]
pub struct AnswerSink {
    signal: TurnSignal,
}

impl AnswerSink {
    pub(crate) fn new(signal: TurnSignal) -> Self {
        Self { signal }
    }

    /// Hands an answer to the battle. Returns `false` when the question has
    /// already been resolved and the answer was dropped.
    pub fn submit(&self, answer: impl Into<String>, time_taken: Duration) -> bool {
        self.signal.send(TurnEvent::Answered {
            answer: answer.into(),
            time_taken,
        })
    }

    pub fn is_open(&self) -> bool {
        !self.signal.resolved.load(Ordering::Acquire) && !self.signal.events.is_closed()
    }
}
