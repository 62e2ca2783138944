use serde::{Deserialize, Serialize};

/// Stable identifier assigned by the data store.
pub type CandidateId = u32;

/// Candidate as listed by the data store, before any belief is attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: CandidateId,
    pub name: String,
    #[serde(default)]
    pub popularity: Option<f64>,
}

impl CandidateRecord {
    pub fn new(id: CandidateId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            popularity: None,
        }
    }

    pub fn with_popularity(mut self, popularity: f64) -> Self {
        self.popularity = Some(popularity);
        self
    }
}

/// A possible solution together with its current belief.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub probability: f64,
    pub popularity: Option<f64>,
}

impl Candidate {
    pub fn new(id: CandidateId, name: impl Into<String>, probability: f64) -> Self {
        Self {
            id,
            name: name.into(),
            probability,
            popularity: None,
        }
    }

    pub fn from_record(record: &CandidateRecord, probability: f64) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            probability,
            popularity: record.popularity,
        }
    }
}
