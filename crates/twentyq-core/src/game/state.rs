use super::serialization::{SessionSnapshot, SnapshotError};
use crate::belief::{APPLY, AdjustReport, Distribution, EmptyCandidateSet, REVERT};
use crate::error::GameError;
use crate::model::answer::Answer;
use crate::model::candidate::Candidate;
use crate::model::history::HistoryEntry;
use crate::select::{self, Selection};
use crate::settings::GameSettings;
use crate::store::{DataStore, FinishedGame};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Fresh,
    InProgress,
    ReadyToFinish,
}

/// One session's decision state: what has been asked, and the belief that
/// follows from it. A successful `finish` consumes the state, so a committed
/// game cannot be played further.
#[derive(Debug, Clone)]
pub struct GameState {
    history: Vec<HistoryEntry>,
    guesses: Option<Distribution>,
    settings: GameSettings,
    cache_corrupted: bool,
}

/// What `finish` committed.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishReport {
    pub game: FinishedGame,
    /// Final belief, when it could be computed.
    pub guesses: Option<Vec<Candidate>>,
    /// Whether the best-effort outcome log accepted the entry.
    pub outcome_logged: bool,
}

impl FinishReport {
    /// 1-based rank of the solution in the final belief.
    pub fn solution_rank(&self) -> Option<usize> {
        self.guesses
            .as_ref()?
            .iter()
            .position(|candidate| candidate.name == self.game.solution)
            .map(|index| index + 1)
    }
}

/// The game record could not be committed. The state comes back unchanged so
/// the session can be saved or finished again.
#[derive(Debug, Error)]
#[error("game not recorded: {source}")]
pub struct FinishError {
    pub state: Box<GameState>,
    #[source]
    pub source: GameError,
}

impl FinishError {
    pub fn into_state(self) -> GameState {
        *self.state
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    pub fn new() -> Self {
        Self::with_settings(GameSettings::default())
    }

    pub fn with_settings(settings: GameSettings) -> Self {
        Self::from_parts(Vec::new(), None, settings, false)
    }

    pub(crate) fn from_parts(
        history: Vec<HistoryEntry>,
        guesses: Option<Distribution>,
        settings: GameSettings,
        cache_corrupted: bool,
    ) -> Self {
        Self {
            history,
            guesses,
            settings,
            cache_corrupted,
        }
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    /// Belief computed so far, without touching the store.
    pub fn cached_guesses(&self) -> Option<&Distribution> {
        self.guesses.as_ref()
    }

    /// True when this state was restored from a payload whose cached belief
    /// had to be thrown away.
    pub fn cache_corrupted(&self) -> bool {
        self.cache_corrupted
    }

    pub fn question_number(&self) -> usize {
        self.history.len() + 1
    }

    pub fn game_finished(&self) -> bool {
        self.history.len() > self.settings.threshold
    }

    pub fn phase(&self) -> GamePhase {
        if self.history.is_empty() {
            GamePhase::Fresh
        } else if self.game_finished() {
            GamePhase::ReadyToFinish
        } else {
            GamePhase::InProgress
        }
    }

    /// Picks the most informative unanswered question. History is unchanged;
    /// the belief is cached if it had to be computed.
    pub fn ask<S: DataStore + ?Sized>(&mut self, store: &S) -> Result<Selection, GameError> {
        self.get_guesses(store)?;
        let distribution = self.guesses.as_ref().ok_or(EmptyCandidateSet)?;
        select::choose(store, &self.history, distribution)
    }

    /// Records `answer` to `question` and updates the belief. Accepted even
    /// after the question limit has been passed.
    pub fn answer<S: DataStore + ?Sized>(
        &mut self,
        store: &S,
        question: &str,
        answer: Answer,
    ) -> Result<AdjustReport, GameError> {
        if self.game_finished() {
            tracing::debug!(
                target: "twentyq_core::game",
                asked = self.history.len(),
                threshold = self.settings.threshold,
                message = "answer recorded past the question limit"
            );
        }

        self.get_guesses(store)?;
        let floor = self.settings.factor_floor;
        let Some(distribution) = self.guesses.as_mut() else {
            return Err(EmptyCandidateSet.into());
        };
        let table = store.response_distribution(question, &distribution.names())?;
        let report = distribution.adjust(question, &table, answer, APPLY, floor)?;
        self.history.push(HistoryEntry::new(question, answer));

        tracing::debug!(
            target: "twentyq_core::game",
            question,
            answer = %answer,
            number = self.history.len(),
            top = distribution.top().map(|c| c.name.as_str()).unwrap_or(""),
            message = "answer applied"
        );
        Ok(report)
    }

    /// Removes the last answer and divides its effect back out of the belief.
    /// Returns `None` without error when there is nothing to undo.
    pub fn undo<S: DataStore + ?Sized>(
        &mut self,
        store: &S,
    ) -> Result<Option<HistoryEntry>, GameError> {
        let Some(last) = self.history.last() else {
            return Ok(None);
        };

        if let Some(distribution) = self.guesses.as_mut() {
            let table = store.response_distribution(last.question(), &distribution.names())?;
            distribution.adjust(
                last.question(),
                &table,
                last.answer(),
                REVERT,
                self.settings.factor_floor,
            )?;
        }

        let popped = self.history.pop();
        if let Some(entry) = popped.as_ref() {
            tracing::debug!(
                target: "twentyq_core::game",
                question = entry.question(),
                answer = %entry.answer(),
                message = "answer undone"
            );
        }
        Ok(popped)
    }

    /// Current belief. Without a cache it is rebuilt from the prior by
    /// replaying the whole history in order.
    pub fn get_guesses<S: DataStore + ?Sized>(
        &mut self,
        store: &S,
    ) -> Result<&Distribution, GameError> {
        if self.guesses.is_none() {
            let rebuilt = self.replay(store)?;
            self.guesses = Some(rebuilt);
        }
        self.guesses
            .as_ref()
            .ok_or_else(|| EmptyCandidateSet.into())
    }

    pub fn top_guess<S: DataStore + ?Sized>(
        &mut self,
        store: &S,
    ) -> Result<Option<&Candidate>, GameError> {
        Ok(self.get_guesses(store)?.top())
    }

    /// Whether the leading candidate is likely enough to announce.
    pub fn confident<S: DataStore + ?Sized>(&mut self, store: &S) -> Result<bool, GameError> {
        let threshold = self.settings.guess_confidence;
        Ok(self
            .top_guess(store)?
            .is_some_and(|candidate| candidate.probability >= threshold))
    }

    /// Ends the game on `solution`. The game record must be committed; the
    /// outcome log afterwards is best-effort and never rolls the record back.
    /// A failed commit hands the state back inside [`FinishError`].
    pub fn finish<S: DataStore + ?Sized>(
        mut self,
        store: &mut S,
        solution: &str,
    ) -> Result<FinishReport, FinishError> {
        // Read the final belief before the store learns from this game.
        let final_guesses = self
            .get_guesses(&*store)
            .map(|distribution| distribution.candidates().to_vec());

        if let Err(err) = store.record_finished_game(solution, &self.history) {
            tracing::warn!(
                target: "twentyq_core::game",
                solution,
                error = %err,
                message = "game record failed; state returned to caller"
            );
            return Err(FinishError {
                state: Box::new(self),
                source: err.into(),
            });
        }
        tracing::info!(
            target: "twentyq_core::game",
            solution,
            questions = self.history.len(),
            message = "game recorded"
        );

        let (guesses, outcome_logged) = match final_guesses {
            Ok(candidates) => match store.log_outcome(solution, &candidates) {
                Ok(()) => (Some(candidates), true),
                Err(err) => {
                    tracing::warn!(
                        target: "twentyq_core::game",
                        solution,
                        error = %err,
                        message = "outcome log failed; game record kept"
                    );
                    (Some(candidates), false)
                }
            },
            Err(err) => {
                tracing::warn!(
                    target: "twentyq_core::game",
                    solution,
                    error = %err,
                    message = "final belief unavailable; outcome not logged"
                );
                (None, false)
            }
        };

        Ok(FinishReport {
            game: FinishedGame::new(solution, &self.history),
            guesses,
            outcome_logged,
        })
    }

    pub fn serialize(&self) -> Result<String, SnapshotError> {
        SessionSnapshot::to_json(self)
    }

    pub fn deserialize(payload: &str, settings: GameSettings) -> Result<Self, SnapshotError> {
        Ok(SessionSnapshot::from_json(payload)?.restore(settings))
    }

    fn replay<S: DataStore + ?Sized>(&self, store: &S) -> Result<Distribution, GameError> {
        let records = store.list_candidates()?;
        let mut distribution = Distribution::from_prior(&records, self.settings.prior)?;
        for entry in &self.history {
            let table = store.response_distribution(entry.question(), &distribution.names())?;
            distribution.adjust(
                entry.question(),
                &table,
                entry.answer(),
                APPLY,
                self.settings.factor_floor,
            )?;
        }
        tracing::debug!(
            target: "twentyq_core::game",
            candidates = distribution.len(),
            replayed = self.history.len(),
            message = "belief rebuilt from history"
        );
        Ok(distribution)
    }
}
