pub mod serialization;
pub mod state;

pub use serialization::{CachedGuesses, CorruptedState, GuessEntry, SessionSnapshot, SnapshotError};
pub use state::{FinishError, FinishReport, GamePhase, GameState};
