//! Scripted presenter for exercising battles under a paused clock.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time;

use crate::battle::BattleSnapshot;
use crate::interaction::{AnswerSink, Interaction};
use crate::quiz::{QuestionItem, QuestionSequence};
use crate::timing::Timing;

/// `q0 -> 0`, `q1 -> 1`, ...
pub(crate) fn numbered(n: usize) -> QuestionSequence {
    (0..n)
        .map(|i| QuestionItem::new(format!("q{}", i), i.to_string()))
        .collect()
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Reply {
    Correct(Duration),
    Wrong(Duration),
    Silent,
    /// Drops the sink and ends the question's timing after the delay.
    Abandon(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Note {
    Correct(Option<u32>),
    GetHit(Option<u8>),
    Incorrect(Option<u8>, Option<String>),
}

pub(crate) struct Scripted {
    replies: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    asked: Mutex<Vec<String>>,
    feedback: Mutex<Vec<Note>>,
    submissions: Arc<Mutex<Vec<bool>>>,
    snapshots: Mutex<Vec<BattleSnapshot>>,
}

impl Scripted {
    /// Answers with `replies` in order, then with `fallback` forever.
    pub(crate) fn new(replies: Vec<Reply>, fallback: Reply) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            fallback,
            asked: Mutex::new(Vec::new()),
            feedback: Mutex::new(Vec::new()),
            submissions: Arc::new(Mutex::new(Vec::new())),
            snapshots: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }

    pub(crate) fn feedback(&self) -> Vec<Note> {
        self.feedback.lock().unwrap().clone()
    }

    /// Whether each submitted answer was accepted, in submission order.
    pub(crate) fn submissions(&self) -> Vec<bool> {
        self.submissions.lock().unwrap().clone()
    }

    pub(crate) fn snapshots(&self) -> Vec<BattleSnapshot> {
        self.snapshots.lock().unwrap().clone()
    }
}

impl Interaction for Scripted {
    fn ask(&self, prompt: &str, timing: &Timing, answers: AnswerSink) {
        self.asked.lock().unwrap().push(prompt.to_string());
        let reply = self.replies.lock().unwrap().pop_front().unwrap_or(self.fallback);
        let expected = prompt.trim_start_matches('q').to_string();
        let (answer, after) = match reply {
            Reply::Correct(after) => (expected, after),
            Reply::Wrong(after) => (format!("not {}", expected), after),
            Reply::Silent => return,
            Reply::Abandon(after) => {
                let window = timing.clone();
                timing.register_at(after, move || {
                    window.end().unwrap();
                });
                return;
            }
        };
        let submissions = self.submissions.clone();
        tokio::spawn(async move {
            time::sleep(after).await;
            let accepted = answers.submit(answer, after);
            submissions.lock().unwrap().push(accepted);
        });
    }

    fn correct(&self, combo: Option<u32>) {
        self.feedback.lock().unwrap().push(Note::Correct(combo));
    }

    fn get_hit(&self, tier: Option<u8>) {
        self.feedback.lock().unwrap().push(Note::GetHit(tier));
    }

    fn incorrect(&self, tier: Option<u8>, expected_answer: Option<&str>) {
        self.feedback
            .lock()
            .unwrap()
            .push(Note::Incorrect(tier, expected_answer.map(str::to_string)));
    }

    fn turn_resolved(&self, snapshot: &BattleSnapshot) {
        self.snapshots.lock().unwrap().push(snapshot.clone());
    }
}
