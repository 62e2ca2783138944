//! In-memory store that learns response statistics from finished games.

use super::{DataStore, FinishedGame, StoreError};
use crate::model::candidate::{Candidate, CandidateId, CandidateRecord};
use crate::model::history::HistoryEntry;
use crate::model::question::{Question, QuestionId};
use crate::model::response::{ResponseRow, ResponseTable};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Weight added to a candidate's row for each answer given in a game that
/// ended on that candidate.
const LEARNING_INCREMENT: f64 = 1.0;

/// Final belief captured when a game ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeEntry {
    pub solution: String,
    /// `(name, probability)` in descending probability order.
    pub guesses: Vec<(String, f64)>,
}

impl OutcomeEntry {
    /// 1-based position of the solution in the final ordering.
    pub fn solution_rank(&self) -> Option<usize> {
        self.guesses
            .iter()
            .position(|(name, _)| *name == self.solution)
            .map(|index| index + 1)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    questions: Vec<Question>,
    candidates: Vec<CandidateRecord>,
    responses: HashMap<String, HashMap<String, ResponseRow>>,
    games: Vec<FinishedGame>,
    outcomes: Vec<OutcomeEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a question, returning the existing id when the text is known.
    pub fn add_question(&mut self, text: impl Into<String>) -> QuestionId {
        let text = text.into();
        if let Some(existing) = self.questions.iter().find(|q| q.text == text) {
            return existing.id;
        }
        let id = self.questions.iter().map(|q| q.id + 1).max().unwrap_or(1);
        self.questions.push(Question::new(id, text));
        id
    }

    /// Registers a candidate, returning the existing id when the name is known.
    pub fn add_candidate(
        &mut self,
        name: impl Into<String>,
        popularity: Option<f64>,
    ) -> CandidateId {
        let name = name.into();
        if let Some(existing) = self.candidates.iter().find(|c| c.name == name) {
            return existing.id;
        }
        let id = self.candidates.iter().map(|c| c.id + 1).max().unwrap_or(1);
        self.candidates.push(CandidateRecord {
            id,
            name,
            popularity,
        });
        id
    }

    pub fn insert_question(&mut self, question: Question) {
        self.questions.retain(|q| q.id != question.id);
        self.questions.push(question);
    }

    pub fn insert_candidate(&mut self, record: CandidateRecord) {
        self.candidates.retain(|c| c.id != record.id);
        self.candidates.push(record);
    }

    pub fn set_response(
        &mut self,
        question: impl Into<String>,
        candidate: impl Into<String>,
        row: ResponseRow,
    ) {
        self.responses
            .entry(question.into())
            .or_default()
            .insert(candidate.into(), row);
    }

    pub fn response(&self, question: &str, candidate: &str) -> Option<&ResponseRow> {
        self.responses.get(question)?.get(candidate)
    }

    pub fn finished_games(&self) -> &[FinishedGame] {
        &self.games
    }

    pub fn outcomes(&self) -> &[OutcomeEntry] {
        &self.outcomes
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    fn learn(&mut self, solution: &str, history: &[HistoryEntry]) {
        self.add_candidate(solution, None);
        for entry in history {
            self.add_question(entry.question());
            let row = self
                .responses
                .entry(entry.question().to_string())
                .or_default()
                .entry(solution.to_string())
                .or_default();
            row.add(entry.answer(), LEARNING_INCREMENT);
        }
    }
}

impl DataStore for MemoryStore {
    fn list_questions(&self) -> Result<Vec<Question>, StoreError> {
        Ok(self.questions.clone())
    }

    fn list_candidates(&self) -> Result<Vec<CandidateRecord>, StoreError> {
        Ok(self.candidates.clone())
    }

    fn response_distribution(
        &self,
        question: &str,
        candidates: &[&str],
    ) -> Result<ResponseTable, StoreError> {
        let Some(rows) = self.responses.get(question) else {
            return Ok(ResponseTable::new());
        };
        Ok(candidates
            .iter()
            .filter_map(|name| rows.get(*name).map(|row| (name.to_string(), *row)))
            .collect())
    }

    fn record_finished_game(
        &mut self,
        solution: &str,
        history: &[HistoryEntry],
    ) -> Result<(), StoreError> {
        self.learn(solution, history);
        self.games.push(FinishedGame::new(solution, history));
        Ok(())
    }

    fn log_outcome(
        &mut self,
        solution: &str,
        distribution: &[Candidate],
    ) -> Result<(), StoreError> {
        self.outcomes.push(OutcomeEntry {
            solution: solution.to_string(),
            guesses: distribution
                .iter()
                .map(|candidate| (candidate.name.clone(), candidate.probability))
                .collect(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::answer::Answer;

    #[test]
    fn ids_are_assigned_sequentially_and_deduplicated() {
        let mut store = MemoryStore::new();
        assert_eq!(store.add_question("Does it bark?"), 1);
        assert_eq!(store.add_question("Can it fly?"), 2);
        assert_eq!(store.add_question("Does it bark?"), 1);
        assert_eq!(store.add_candidate("dog", Some(3.0)), 1);
        assert_eq!(store.add_candidate("dog", None), 1);
        assert_eq!(store.candidate_count(), 1);
    }

    #[test]
    fn response_distribution_omits_candidates_without_rows() {
        let mut store = MemoryStore::new();
        store.add_question("Does it bark?");
        store.set_response(
            "Does it bark?",
            "dog",
            ResponseRow::new([5.0, 0.0, 1.0]).unwrap(),
        );
        let table = store
            .response_distribution("Does it bark?", &["dog", "cat"])
            .unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.row("cat").is_none());

        let unknown = store.response_distribution("Is it blue?", &["dog"]).unwrap();
        assert!(unknown.is_empty());
    }

    #[test]
    fn finished_games_teach_the_store() {
        let mut store = MemoryStore::new();
        store.add_question("Does it bark?");
        store.add_candidate("dog", None);
        let history = vec![
            HistoryEntry::new("Does it bark?", Answer::Yes),
            HistoryEntry::new("Does it hop?", Answer::No),
        ];

        store.record_finished_game("wolf", &history).unwrap();

        assert_eq!(store.candidate_count(), 2);
        assert_eq!(store.question_count(), 2);
        let row = store.response("Does it bark?", "wolf").unwrap();
        assert_eq!(row.weight(Answer::Yes), 1.0);
        assert_eq!(row.weight(Answer::No), 0.0);
        assert_eq!(store.finished_games().len(), 1);
        assert_eq!(store.finished_games()[0].solution, "wolf");
    }

    #[test]
    fn outcome_rank_is_one_based() {
        let entry = OutcomeEntry {
            solution: "cat".to_string(),
            guesses: vec![("dog".to_string(), 0.7), ("cat".to_string(), 0.3)],
        };
        assert_eq!(entry.solution_rank(), Some(2));
    }
}
