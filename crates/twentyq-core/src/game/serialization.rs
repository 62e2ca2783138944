use super::state::GameState;
use crate::belief::Distribution;
use crate::model::candidate::{Candidate, CandidateId};
use crate::model::history::HistoryEntry;
use crate::settings::GameSettings;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

/// Tolerance on the cached distribution's total before it is rejected.
const SUM_TOLERANCE: f64 = 1e-6;

/// One cached belief entry, serialized as `[name, id, probability]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuessEntry(pub String, pub CandidateId, pub f64);

impl GuessEntry {
    fn from_candidate(candidate: &Candidate) -> Self {
        Self(candidate.name.clone(), candidate.id, candidate.probability)
    }

    fn into_candidate(self) -> Candidate {
        Candidate::new(self.1, self.0, self.2)
    }
}

impl TryFrom<&Value> for GuessEntry {
    type Error = CorruptedState;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        let malformed = |reason: &str| CorruptedState::Entry {
            reason: reason.to_string(),
        };
        let Some([name, id, probability]) = value.as_array().map(Vec::as_slice) else {
            return Err(malformed("expected [name, id, probability]"));
        };
        let name = name.as_str().ok_or_else(|| malformed("name is not a string"))?;
        let id = id
            .as_u64()
            .and_then(|id| CandidateId::try_from(id).ok())
            .ok_or_else(|| malformed("id is not an unsigned integer"))?;
        let probability = probability
            .as_f64()
            .filter(|p| p.is_finite() && (0.0..=1.0).contains(p))
            .ok_or_else(|| malformed("probability is not a number in [0, 1]"))?;
        Ok(GuessEntry(name.to_string(), id, probability))
    }
}

/// Cached belief as found in a payload.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedGuesses {
    /// Not computed yet; rebuilt from history on demand.
    Absent,
    Present(Vec<GuessEntry>),
    /// Present but unusable; treated like `Absent` once restored.
    Corrupted(CorruptedState),
}

impl CachedGuesses {
    fn decode(raw: Option<Value>) -> Self {
        let Some(raw) = raw else {
            return CachedGuesses::Absent;
        };
        match validate_guesses(&raw) {
            Ok(entries) => CachedGuesses::Present(entries),
            Err(corruption) => CachedGuesses::Corrupted(corruption),
        }
    }
}

fn validate_guesses(raw: &Value) -> Result<Vec<GuessEntry>, CorruptedState> {
    let items = raw.as_array().ok_or(CorruptedState::NotAList)?;
    if items.is_empty() {
        return Err(CorruptedState::Empty);
    }
    let entries = items
        .iter()
        .map(GuessEntry::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    let total: f64 = entries.iter().map(|entry| entry.2).sum();
    if (total - 1.0).abs() > SUM_TOLERANCE {
        return Err(CorruptedState::Total(total));
    }
    Ok(entries)
}

/// Persisted form of a game in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub questions: Vec<HistoryEntry>,
    pub guesses: CachedGuesses,
}

#[derive(Deserialize)]
struct RawSnapshot {
    questions: Vec<HistoryEntry>,
    #[serde(default)]
    guesses: Option<Value>,
}

impl Serialize for SessionSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.guesses {
            CachedGuesses::Present(entries) => {
                let mut state = serializer.serialize_struct("SessionSnapshot", 2)?;
                state.serialize_field("questions", &self.questions)?;
                state.serialize_field("guesses", entries)?;
                state.end()
            }
            CachedGuesses::Absent | CachedGuesses::Corrupted(_) => {
                let mut state = serializer.serialize_struct("SessionSnapshot", 1)?;
                state.serialize_field("questions", &self.questions)?;
                state.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for SessionSnapshot {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawSnapshot::deserialize(deserializer)?;
        Ok(SessionSnapshot {
            questions: raw.questions,
            guesses: CachedGuesses::decode(raw.guesses),
        })
    }
}

impl SessionSnapshot {
    pub fn capture(state: &GameState) -> Self {
        let guesses = match state.cached_guesses() {
            Some(distribution) => CachedGuesses::Present(
                distribution
                    .candidates()
                    .iter()
                    .map(GuessEntry::from_candidate)
                    .collect(),
            ),
            None => CachedGuesses::Absent,
        };
        SessionSnapshot {
            questions: state.history().to_vec(),
            guesses,
        }
    }

    pub fn corruption(&self) -> Option<&CorruptedState> {
        match &self.guesses {
            CachedGuesses::Corrupted(corruption) => Some(corruption),
            _ => None,
        }
    }

    /// Rebuilds a game. A corrupted cache is dropped and flagged on the
    /// returned state; the history is kept.
    pub fn restore(self, settings: GameSettings) -> GameState {
        match self.guesses {
            CachedGuesses::Present(entries) => {
                let candidates = entries.into_iter().map(GuessEntry::into_candidate).collect();
                GameState::from_parts(
                    self.questions,
                    Some(Distribution::new(candidates)),
                    settings,
                    false,
                )
            }
            CachedGuesses::Absent => GameState::from_parts(self.questions, None, settings, false),
            CachedGuesses::Corrupted(corruption) => {
                tracing::warn!(
                    target: "twentyq_core::game",
                    reason = %corruption,
                    message = "discarding corrupted guess cache"
                );
                GameState::from_parts(self.questions, None, settings, true)
            }
        }
    }

    pub fn to_json(state: &GameState) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(&Self::capture(state))?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// The cached distribution in a payload could not be used.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CorruptedState {
    #[error("guesses is not a list")]
    NotAList,
    #[error("guesses is empty")]
    Empty,
    #[error("malformed guess entry: {reason}")]
    Entry { reason: String },
    #[error("guess probabilities sum to {0}, expected 1")]
    Total(f64),
}

/// The payload itself is unreadable; the game cannot be restored.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("invalid session payload: {0}")]
    Json(#[from] serde_json::Error),
}
