pub mod tables;

use rand::seq::SliceRandom;
use rand::Rng;

#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct QuestionItem {
    pub prompt: String,
    pub expected_answer: String,
}

impl QuestionItem {
    pub fn new(prompt: impl Into<String>, expected_answer: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            expected_answer: expected_answer.into(),
        }
    }
}

/// An endless, cyclic supply of questions.
///
/// `next` walks the items in order and wraps around to the first one once the
/// last has been handed out, so a sequence never runs dry unless it is empty.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct QuestionSequence {
    items: Vec<QuestionItem>,
    cursor: usize,
}

impl QuestionSequence {
    pub fn new(items: Vec<QuestionItem>) -> Self {
        Self { items, cursor: 0 }
    }

    /// Flattens the item lists of `sequences` in argument order.
    /// The cursors of the inputs are ignored; the result starts at its first item.
    pub fn concat<'a>(sequences: impl IntoIterator<Item = &'a QuestionSequence>) -> Self {
        Self::new(
            sequences
                .into_iter()
                .flat_map(|s| s.items.iter().cloned())
                .collect(),
        )
    }

    /// Returns the next question, or `None` only when the sequence has no items.
    pub fn next(&mut self) -> Option<&QuestionItem> {
        if self.items.is_empty() {
            return None;
        }
        let idx = self.cursor % self.items.len();
        // Kept reduced so the cursor can never overflow on long sessions.
        self.cursor = (idx + 1) % self.items.len();
        self.items.get(idx)
    }

    /// A new sequence with the same items in a random order. `self` is untouched.
    pub fn shuffled<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        let mut items = self.items.clone();
        items.shuffle(rng);
        Self::new(items)
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    pub fn items(&self) -> &[QuestionItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<QuestionItem> for QuestionSequence {
    fn from_iter<T: IntoIterator<Item = QuestionItem>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
