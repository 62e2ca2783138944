use super::answer::Answer;
use serde::{Deserialize, Serialize};

/// One answered question. Serialized as a `[text, label]` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry(pub String, pub Answer);

impl HistoryEntry {
    pub fn new(question: impl Into<String>, answer: Answer) -> Self {
        Self(question.into(), answer)
    }

    pub fn question(&self) -> &str {
        &self.0
    }

    pub fn answer(&self) -> Answer {
        self.1
    }
}
