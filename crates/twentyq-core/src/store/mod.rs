//! Collaborator contract for the persistent question/candidate store.
//!
//! The core never touches storage directly: it lists questions and
//! candidates, asks for one question's response table at a time, and hands
//! finished games back. Calls block and return fully materialized values.

mod memory;

pub use memory::{MemoryStore, OutcomeEntry};

use crate::model::candidate::{Candidate, CandidateRecord};
use crate::model::history::HistoryEntry;
use crate::model::question::Question;
use crate::model::response::ResponseTable;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub trait DataStore {
    /// Every question the asker may pose. The core orders them by id.
    fn list_questions(&self) -> Result<Vec<Question>, StoreError>;

    /// Every candidate the game can end on. The core orders them by id.
    fn list_candidates(&self) -> Result<Vec<CandidateRecord>, StoreError>;

    /// Response rows for `question`, restricted to `candidates`. Candidates
    /// absent from the result have no data; that is not an error.
    fn response_distribution(
        &self,
        question: &str,
        candidates: &[&str],
    ) -> Result<ResponseTable, StoreError>;

    /// Commits a finished game. Failure is fatal to `finish`.
    fn record_finished_game(
        &mut self,
        solution: &str,
        history: &[HistoryEntry],
    ) -> Result<(), StoreError>;

    /// Logs the final belief for later review. Best-effort.
    fn log_outcome(
        &mut self,
        solution: &str,
        distribution: &[Candidate],
    ) -> Result<(), StoreError>;
}

/// A game as committed to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishedGame {
    pub solution: String,
    pub questions: Vec<HistoryEntry>,
}

impl FinishedGame {
    pub fn new(solution: impl Into<String>, questions: &[HistoryEntry]) -> Self {
        Self {
            solution: solution.into(),
            questions: questions.to_vec(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("failed to persist {what}: {source}")]
    Persistence {
        what: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("invalid store data: {0}")]
    Invalid(String),
}

impl StoreError {
    pub fn persistence(
        what: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        StoreError::Persistence {
            what,
            source: source.into(),
        }
    }
}
