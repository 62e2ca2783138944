use serde::{Deserialize, Serialize};

pub type QuestionId = u32;

/// A question the asker can pose. Identity is the id alone; `entropy` holds
/// the last score computed by the selector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    #[serde(skip)]
    pub entropy: f64,
}

impl Question {
    pub fn new(id: QuestionId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            entropy: 0.0,
        }
    }
}

impl PartialEq for Question {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Question {}

#[cfg(test)]
mod tests {
    use super::Question;

    #[test]
    fn equality_ignores_entropy_score() {
        let mut scored = Question::new(3, "Does it bark?");
        scored.entropy = 0.7;
        assert_eq!(scored, Question::new(3, "Does it bark?"));
        assert_ne!(scored, Question::new(4, "Does it bark?"));
    }
}
