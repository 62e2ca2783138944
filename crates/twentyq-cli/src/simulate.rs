//! Seeded self-play: a hidden secret is drawn per game and an oracle answers
//! each question with the secret's most common response.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};
use twentyq_core::error::GameError;
use twentyq_core::game::GameState;
use twentyq_core::model::answer::Answer;
use twentyq_core::model::candidate::CandidateRecord;
use twentyq_core::model::response::ResponseRow;
use twentyq_core::select::Selection;
use twentyq_core::settings::GameSettings;
use twentyq_core::store::{DataStore, StoreError};

/// Runs self-play games against a read-only store. Games are not recorded,
/// so repeated runs see the same statistics.
pub struct SimulationRunner<'a, S: DataStore + ?Sized> {
    store: &'a S,
    settings: GameSettings,
    run_id: String,
}

/// One JSONL row per simulated game.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GameRow {
    pub run_id: String,
    pub game_index: usize,
    pub secret: String,
    pub guess: Option<String>,
    pub confidence: f64,
    pub correct: bool,
    pub questions: usize,
    pub exhausted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub games: usize,
    pub correct: usize,
    pub total_questions: usize,
    pub jsonl_path: PathBuf,
}

impl RunSummary {
    pub fn success_rate(&self) -> f64 {
        if self.games == 0 {
            return 0.0;
        }
        self.correct as f64 / self.games as f64
    }

    pub fn average_questions(&self) -> f64 {
        if self.games == 0 {
            return 0.0;
        }
        self.total_questions as f64 / self.games as f64
    }
}

impl<'a, S: DataStore + ?Sized> SimulationRunner<'a, S> {
    pub fn new(store: &'a S, settings: GameSettings, run_id: impl Into<String>) -> Self {
        Self {
            store,
            settings,
            run_id: run_id.into(),
        }
    }

    /// Plays `games` games and streams one row per game to `jsonl`.
    pub fn run(
        &self,
        games: usize,
        seed: Option<u64>,
        jsonl: &Path,
    ) -> Result<RunSummary, SimulationError> {
        let mut candidates = self.store.list_candidates()?;
        if candidates.is_empty() {
            return Err(SimulationError::NoCandidates);
        }
        candidates.sort_by_key(|record| record.id);

        if let Some(dir) = jsonl.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let mut writer = BufWriter::new(File::create(jsonl)?);
        let mut rng = StdRng::seed_from_u64(seed.unwrap_or(0));

        let mut summary = RunSummary {
            games,
            correct: 0,
            total_questions: 0,
            jsonl_path: jsonl.to_path_buf(),
        };
        for game_index in 0..games {
            let secret = &candidates[rng.gen_range(0..candidates.len())];
            let row = self.play_one(game_index, secret)?;
            if row.correct {
                summary.correct += 1;
            }
            summary.total_questions += row.questions;

            serde_json::to_writer(&mut writer, &row)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;

        event!(
            target: "twentyq::simulate",
            Level::INFO,
            games,
            correct = summary.correct,
            avg_questions = summary.average_questions(),
            "simulation complete"
        );
        Ok(summary)
    }

    fn play_one(
        &self,
        game_index: usize,
        secret: &CandidateRecord,
    ) -> Result<GameRow, SimulationError> {
        let mut state = GameState::with_settings(self.settings);
        let mut exhausted = false;

        while !state.game_finished() && !state.confident(self.store)? {
            match state.ask(self.store)? {
                Selection::Ask { question, .. } => {
                    let answer = self.oracle(&question.text, &secret.name)?;
                    state.answer(self.store, &question.text, answer)?;
                }
                Selection::Exhausted => {
                    exhausted = true;
                    break;
                }
            }
        }

        let top = state
            .top_guess(self.store)?
            .map(|candidate| (candidate.name.clone(), candidate.probability));
        let correct = top.as_ref().is_some_and(|(name, _)| *name == secret.name);
        event!(
            target: "twentyq::simulate",
            Level::DEBUG,
            game_index,
            secret = secret.name.as_str(),
            correct,
            questions = state.history().len(),
            "game played"
        );

        Ok(GameRow {
            run_id: self.run_id.clone(),
            game_index,
            secret: secret.name.clone(),
            confidence: top.as_ref().map_or(0.0, |(_, p)| *p),
            guess: top.map(|(name, _)| name),
            correct,
            questions: state.history().len(),
            exhausted,
        })
    }

    /// The secret's most common response, or `Unsure` without statistics.
    fn oracle(&self, question: &str, secret: &str) -> Result<Answer, StoreError> {
        let table = self.store.response_distribution(question, &[secret])?;
        Ok(table
            .row(secret)
            .filter(|row| row.total() > 0.0)
            .map(ResponseRow::first)
            .unwrap_or(Answer::Unsure))
    }
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("the store has no candidates to draw secrets from")]
    NoCandidates,
    #[error(transparent)]
    Game(#[from] GameError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use twentyq_core::store::MemoryStore;

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        for name in ["dog", "cat", "eagle"] {
            store.add_candidate(name, None);
        }
        let facts = [
            ("Does it bark?", [[9.0, 1.0, 0.0], [0.0, 10.0, 0.0], [0.0, 10.0, 0.0]]),
            ("Can it fly?", [[0.0, 10.0, 0.0], [0.0, 10.0, 0.0], [10.0, 0.0, 0.0]]),
        ];
        for (question, rows) in facts {
            store.add_question(question);
            for (name, weights) in ["dog", "cat", "eagle"].iter().zip(rows) {
                store.set_response(question, *name, ResponseRow::new(weights).expect("row"));
            }
        }
        store
    }

    #[test]
    fn simulation_is_deterministic_for_a_seed() {
        let store = store();
        let dir = tempdir().expect("temp dir");
        let runner = SimulationRunner::new(&store, GameSettings::default(), "unit");

        let first_path = dir.path().join("a/sim.jsonl");
        let second_path = dir.path().join("b/sim.jsonl");
        let first = runner.run(12, Some(42), &first_path).expect("first run");
        let second = runner.run(12, Some(42), &second_path).expect("second run");

        assert_eq!(first.correct, second.correct);
        assert_eq!(
            fs::read_to_string(&first_path).expect("rows"),
            fs::read_to_string(&second_path).expect("rows")
        );
        assert_eq!(fs::read_to_string(&first_path).expect("rows").lines().count(), 12);
    }

    #[test]
    fn separable_animals_are_always_found() {
        let store = store();
        let dir = tempdir().expect("temp dir");
        let summary = SimulationRunner::new(&store, GameSettings::default(), "unit")
            .run(20, Some(7), &dir.path().join("sim.jsonl"))
            .expect("run");
        assert_eq!(summary.success_rate(), 1.0);
        assert!(summary.average_questions() <= 2.0);
    }

    #[test]
    fn empty_store_is_rejected() {
        let dir = tempdir().expect("temp dir");
        let store = MemoryStore::new();
        let err = SimulationRunner::new(&store, GameSettings::default(), "unit")
            .run(1, None, &dir.path().join("sim.jsonl"))
            .expect_err("no candidates");
        assert!(matches!(err, SimulationError::NoCandidates));
    }
}
