//! Picks the next question to ask.

pub mod entropy;

pub use entropy::{BUCKET_EPSILON, EntropyScore};

use crate::belief::{Distribution, EmptyCandidateSet};
use crate::error::GameError;
use crate::model::answer::Answer;
use crate::model::history::HistoryEntry;
use crate::model::question::Question;
use crate::store::DataStore;

/// Result of asking for the next question.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Best unanswered question with the replies the asker may give.
    Ask {
        question: Question,
        options: Vec<Answer>,
    },
    /// Every question has been asked. Not an error: the asker has simply run
    /// out of ways to narrow the field.
    Exhausted,
}

impl Selection {
    pub fn question(&self) -> Option<&Question> {
        match self {
            Selection::Ask { question, .. } => Some(question),
            Selection::Exhausted => None,
        }
    }

    pub fn options(&self) -> &[Answer] {
        match self {
            Selection::Ask { options, .. } => options,
            Selection::Exhausted => &[],
        }
    }

    pub fn entropy(&self) -> f64 {
        self.question().map_or(0.0, |question| question.entropy)
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Selection::Exhausted)
    }
}

/// Scores every question not yet in `history` and returns the first one (in
/// ascending id order) whose entropy strictly beats all earlier ones.
pub fn choose<S: DataStore + ?Sized>(
    store: &S,
    history: &[HistoryEntry],
    distribution: &Distribution,
) -> Result<Selection, GameError> {
    if distribution.is_empty() {
        return Err(EmptyCandidateSet.into());
    }

    let mut questions = store.list_questions()?;
    questions.sort_by_key(|question| question.id);

    let names = distribution.names();
    let mut best: Option<Question> = None;
    let mut skipped = 0;
    for mut question in questions {
        if history
            .iter()
            .any(|entry| entry.question() == question.text)
        {
            continue;
        }

        let table = store.response_distribution(&question.text, &names)?;
        let scored = entropy::score(&table, distribution)?;
        skipped += scored.skipped;
        question.entropy = scored.entropy;

        tracing::trace!(
            target: "twentyq_core::select",
            question_id = question.id,
            entropy = scored.entropy,
            skipped = scored.skipped
        );

        if best
            .as_ref()
            .is_none_or(|current| question.entropy > current.entropy)
        {
            best = Some(question);
        }
    }

    if skipped > 0 {
        tracing::warn!(
            target: "twentyq_core::select",
            skipped,
            message = "candidates without response data skipped while scoring"
        );
    }

    let Some(question) = best else {
        tracing::debug!(
            target: "twentyq_core::select",
            asked = history.len(),
            message = "no unanswered questions remain"
        );
        return Ok(Selection::Exhausted);
    };

    tracing::debug!(
        target: "twentyq_core::select",
        question_id = question.id,
        question = %question.text,
        entropy = question.entropy,
        message = "selected question"
    );

    Ok(Selection::Ask {
        question,
        options: Answer::ALL.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::response::ResponseRow;
    use crate::store::MemoryStore;

    fn row(yes: f64, no: f64, unsure: f64) -> ResponseRow {
        ResponseRow::new([yes, no, unsure]).unwrap()
    }

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        for name in ["dog", "cat"] {
            store.add_candidate(name, None);
        }
        store.add_question("Is it an animal?");
        store.add_question("Does it bark?");
        store.add_question("Is it a pet?");
        for name in ["dog", "cat"] {
            store.set_response("Is it an animal?", name, row(10.0, 0.0, 0.0));
            store.set_response("Is it a pet?", name, row(8.0, 1.0, 1.0));
        }
        store.set_response("Does it bark?", "dog", row(9.0, 1.0, 0.0));
        store.set_response("Does it bark?", "cat", row(0.0, 9.0, 1.0));
        store
    }

    fn belief(store: &MemoryStore) -> Distribution {
        Distribution::uniform(&store.list_candidates().unwrap()).unwrap()
    }

    #[test]
    fn picks_the_question_that_splits_the_field() {
        let store = store();
        let selection = choose(&store, &[], &belief(&store)).unwrap();
        let question = selection.question().unwrap();
        assert_eq!(question.text, "Does it bark?");
        assert!(selection.entropy() > 0.9);
        assert_eq!(selection.options(), &Answer::ALL);
    }

    #[test]
    fn ties_keep_the_lowest_id() {
        let store = store();
        let history = vec![HistoryEntry::new("Does it bark?", Answer::Yes)];
        let selection = choose(&store, &history, &belief(&store)).unwrap();
        // "Is it an animal?" and "Is it a pet?" score the same.
        assert_eq!(selection.question().unwrap().text, "Is it an animal?");
    }

    #[test]
    fn exhausted_when_everything_was_asked() {
        let store = store();
        let history: Vec<HistoryEntry> = store
            .list_questions()
            .unwrap()
            .into_iter()
            .map(|q| HistoryEntry::new(q.text, Answer::Unsure))
            .collect();
        let selection = choose(&store, &history, &belief(&store)).unwrap();
        assert!(selection.is_exhausted());
        assert_eq!(selection.entropy(), 0.0);
        assert!(selection.options().is_empty());
    }

    #[test]
    fn empty_candidate_set_is_fatal() {
        let store = store();
        let err = choose(&store, &[], &Distribution::default()).unwrap_err();
        assert!(matches!(err, GameError::EmptyCandidateSet(_)));
    }
}
