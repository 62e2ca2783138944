//! File-backed store: a YAML dataset of questions and response statistics,
//! plus append-only JSONL files for finished games and outcome logs.
//!
//! Previously recorded games are replayed into the in-memory statistics on
//! open, so the store keeps learning across runs without rewriting the
//! dataset file.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use twentyq_core::model::candidate::{Candidate, CandidateId, CandidateRecord};
use twentyq_core::model::history::HistoryEntry;
use twentyq_core::model::question::{Question, QuestionId};
use twentyq_core::model::response::{ResponseRow, ResponseTable};
use twentyq_core::store::{DataStore, FinishedGame, MemoryStore, StoreError};

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Dataset {
    pub candidates: Vec<CandidateEntry>,
    pub questions: Vec<QuestionEntry>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CandidateEntry {
    #[serde(default)]
    pub id: Option<CandidateId>,
    pub name: String,
    #[serde(default)]
    pub popularity: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct QuestionEntry {
    #[serde(default)]
    pub id: Option<QuestionId>,
    pub text: String,
    /// Candidate name to per-label weights.
    #[serde(default)]
    pub responses: BTreeMap<String, ResponseRow>,
}

impl Dataset {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DatasetError::Read {
            source,
            path: path.to_path_buf(),
        })?;
        serde_yaml::from_reader(BufReader::new(file)).map_err(|source| DatasetError::Parse {
            source,
            path: path.to_path_buf(),
        })
    }

    /// Builds an in-memory store. Entries without an explicit id are numbered
    /// after the largest explicit one, in file order. Candidate names,
    /// question texts and explicit ids must be unique: statistics are keyed by
    /// name and text, so a duplicate would split every update in two.
    pub fn into_store(self) -> Result<MemoryStore, DatasetError> {
        if self.candidates.is_empty() {
            return Err(DatasetError::Invalid(
                "dataset must list at least one candidate".to_string(),
            ));
        }

        let mut store = MemoryStore::new();
        let mut next_candidate = next_free(self.candidates.iter().map(|c| c.id));
        let mut names = HashSet::new();
        let mut ids = HashSet::new();
        for entry in self.candidates {
            if !names.insert(entry.name.clone()) {
                return Err(duplicate("candidate name", &entry.name));
            }
            let id = match entry.id {
                Some(id) => id,
                None => take(&mut next_candidate, "candidate")?,
            };
            if !ids.insert(id) {
                return Err(duplicate("candidate id", &id.to_string()));
            }
            store.insert_candidate(CandidateRecord {
                id,
                name: entry.name,
                popularity: entry.popularity,
            });
        }

        let mut next_question = next_free(self.questions.iter().map(|q| q.id));
        let mut texts = HashSet::new();
        let mut ids = HashSet::new();
        for entry in self.questions {
            if !texts.insert(entry.text.clone()) {
                return Err(duplicate("question text", &entry.text));
            }
            let id = match entry.id {
                Some(id) => id,
                None => take(&mut next_question, "question")?,
            };
            if !ids.insert(id) {
                return Err(duplicate("question id", &id.to_string()));
            }
            for (candidate, row) in entry.responses {
                store.set_response(entry.text.clone(), candidate, row);
            }
            store.insert_question(Question::new(id, entry.text));
        }

        Ok(store)
    }
}

/// First id after the largest explicit one; `None` once the id space is used up.
fn next_free<I: Iterator<Item = Option<u32>>>(ids: I) -> Option<u32> {
    ids.flatten().max().map_or(Some(1), |max| max.checked_add(1))
}

fn take(counter: &mut Option<u32>, what: &str) -> Result<u32, DatasetError> {
    let id = counter.ok_or_else(|| {
        DatasetError::Invalid(format!("no {what} id left to assign after {}", u32::MAX))
    })?;
    *counter = id.checked_add(1);
    Ok(id)
}

fn duplicate(what: &str, value: &str) -> DatasetError {
    DatasetError::Invalid(format!("duplicate {what} '{value}'"))
}

/// One line of the outcome log.
#[derive(Debug, Serialize)]
struct OutcomeLine<'a> {
    solution: &'a str,
    guesses: Vec<(&'a str, f64)>,
}

pub struct FileStore {
    memory: MemoryStore,
    records: PathBuf,
    outcomes: PathBuf,
}

impl FileStore {
    /// Loads the dataset and replays every game already in `records`.
    pub fn open(
        dataset: impl AsRef<Path>,
        records: impl Into<PathBuf>,
        outcomes: impl Into<PathBuf>,
    ) -> Result<Self, DatasetError> {
        let mut memory = Dataset::from_path(dataset)?.into_store()?;
        let records = records.into();
        let replayed = replay_records(&records, &mut memory)?;
        tracing::info!(
            target: "twentyq::dataset",
            questions = memory.question_count(),
            candidates = memory.candidate_count(),
            replayed,
            message = "store opened"
        );
        Ok(Self {
            memory,
            records,
            outcomes: outcomes.into(),
        })
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }
}

fn replay_records(path: &Path, memory: &mut MemoryStore) -> Result<usize, DatasetError> {
    if !path.exists() {
        return Ok(0);
    }
    let file = File::open(path).map_err(|source| DatasetError::Read {
        source,
        path: path.to_path_buf(),
    })?;

    let mut replayed = 0;
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|source| DatasetError::Read {
            source,
            path: path.to_path_buf(),
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let game: FinishedGame =
            serde_json::from_str(&line).map_err(|source| DatasetError::Record {
                source,
                path: path.to_path_buf(),
                line: index + 1,
            })?;
        memory
            .record_finished_game(&game.solution, &game.questions)
            .map_err(|err| DatasetError::Invalid(err.to_string()))?;
        replayed += 1;
    }
    Ok(replayed)
}

fn append_json_line<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let line = serde_json::to_string(value).map_err(std::io::Error::other)?;
    writeln!(file, "{line}")?;
    file.flush()
}

impl DataStore for FileStore {
    fn list_questions(&self) -> Result<Vec<Question>, StoreError> {
        self.memory.list_questions()
    }

    fn list_candidates(&self) -> Result<Vec<CandidateRecord>, StoreError> {
        self.memory.list_candidates()
    }

    fn response_distribution(
        &self,
        question: &str,
        candidates: &[&str],
    ) -> Result<ResponseTable, StoreError> {
        self.memory.response_distribution(question, candidates)
    }

    fn record_finished_game(
        &mut self,
        solution: &str,
        history: &[HistoryEntry],
    ) -> Result<(), StoreError> {
        let game = FinishedGame::new(solution, history);
        append_json_line(&self.records, &game)
            .map_err(|err| StoreError::persistence("game record", err))?;
        self.memory.record_finished_game(solution, history)
    }

    fn log_outcome(
        &mut self,
        solution: &str,
        distribution: &[Candidate],
    ) -> Result<(), StoreError> {
        let line = OutcomeLine {
            solution,
            guesses: distribution
                .iter()
                .map(|candidate| (candidate.name.as_str(), candidate.probability))
                .collect(),
        };
        append_json_line(&self.outcomes, &line)
            .map_err(|err| StoreError::persistence("outcome log", err))?;
        self.memory.log_outcome(solution, distribution)
    }
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse dataset {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("malformed game record at {path:?} line {line}: {source}")]
    Record {
        #[source]
        source: serde_json::Error,
        path: PathBuf,
        line: usize,
    },
    #[error("invalid dataset: {0}")]
    Invalid(String),
}
