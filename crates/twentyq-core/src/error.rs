use crate::belief::EmptyCandidateSet;
use crate::store::StoreError;
use thiserror::Error;

/// Failures that abort a game operation. Data-quality problems (missing
/// response rows, a corrupted cache) are recovered locally and never surface
/// here.
#[derive(Debug, Error)]
pub enum GameError {
    #[error(transparent)]
    EmptyCandidateSet(#[from] EmptyCandidateSet),
    #[error("data store failure: {0}")]
    Store(#[from] StoreError),
}
