//! Probability model over the candidate set.
//!
//! The distribution starts from a prior, is normalized so the live candidates
//! sum to one, and is updated multiplicatively from each answered question:
//! every candidate is scaled by the share of its response mass that agrees
//! with the answer. Raising that factor to `-1` divides the same amount back
//! out, which is how undo reverses an answer.

use crate::model::answer::Answer;
use crate::model::candidate::{Candidate, CandidateRecord};
use crate::model::response::{ResponseRow, ResponseTable};
use crate::settings::Prior;
use thiserror::Error;

/// Applying an answer in the forward direction.
pub const APPLY: i32 = 1;
/// Reversing a previously applied answer.
pub const REVERT: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no candidates available; a guess needs at least one")]
pub struct EmptyCandidateSet;

/// Current belief over candidates, kept ordered by descending probability
/// after every normalization.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Distribution {
    candidates: Vec<Candidate>,
}

/// Data-quality notes gathered while applying an answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjustReport {
    /// Candidates scaled with the no-data row because the store had no usable
    /// statistics for them.
    pub missing: Vec<String>,
}

impl AdjustReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty()
    }
}

impl Distribution {
    /// Wraps candidates as given; call [`Distribution::normalize`] to restore
    /// the sum-to-one invariant.
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    /// Builds the starting belief from store records, ordered by id before
    /// weighting so ties resolve the same way on every run.
    pub fn from_prior(
        records: &[CandidateRecord],
        prior: Prior,
    ) -> Result<Self, EmptyCandidateSet> {
        if records.is_empty() {
            return Err(EmptyCandidateSet);
        }
        let mut sorted: Vec<&CandidateRecord> = records.iter().collect();
        sorted.sort_by_key(|record| record.id);

        let candidates = sorted
            .into_iter()
            .map(|record| {
                let weight = match prior {
                    Prior::Uniform => 1.0,
                    Prior::Popularity => record
                        .popularity
                        .filter(|value| value.is_finite() && *value >= 0.0)
                        .unwrap_or(1.0),
                };
                Candidate::from_record(record, weight)
            })
            .collect();

        let mut distribution = Self::new(candidates);
        distribution.normalize();
        Ok(distribution)
    }

    pub fn uniform(records: &[CandidateRecord]) -> Result<Self, EmptyCandidateSet> {
        Self::from_prior(records, Prior::Uniform)
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn into_candidates(self) -> Vec<Candidate> {
        self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.candidates
            .iter()
            .map(|candidate| candidate.name.as_str())
            .collect()
    }

    pub fn total(&self) -> f64 {
        self.candidates.iter().map(|c| c.probability).sum()
    }

    /// Most probable candidate.
    pub fn top(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    pub fn probability_of(&self, name: &str) -> Option<f64> {
        self.candidates
            .iter()
            .find(|candidate| candidate.name == name)
            .map(|candidate| candidate.probability)
    }

    /// Divides every weight by the total and orders candidates by descending
    /// probability (stable on ties). A zero total leaves weights untouched.
    pub fn normalize(&mut self) {
        let total = self.total();
        if total > 0.0 && total.is_finite() {
            for candidate in &mut self.candidates {
                candidate.probability /= total;
            }
        }
        self.candidates
            .sort_by(|a, b| b.probability.total_cmp(&a.probability));
    }

    /// Scales each candidate by `factor^weighting`, where `factor` is the
    /// share of the candidate's response mass on `answer`, then renormalizes.
    ///
    /// Factors are floored at `floor` (must be positive) so that
    /// `adjust(.., APPLY, ..)` followed by `adjust(.., REVERT, ..)` with the
    /// same table restores the previous distribution.
    pub fn adjust(
        &mut self,
        question: &str,
        table: &ResponseTable,
        answer: Answer,
        weighting: i32,
        floor: f64,
    ) -> Result<AdjustReport, EmptyCandidateSet> {
        if self.candidates.is_empty() {
            return Err(EmptyCandidateSet);
        }

        let mut report = AdjustReport::default();
        for candidate in &mut self.candidates {
            let share = match table.row(&candidate.name).and_then(|row| row.share(answer)) {
                Some(share) => share,
                None => {
                    report.missing.push(candidate.name.clone());
                    ResponseRow::NO_DATA.share(answer).unwrap_or(1.0)
                }
            };
            let factor = share.max(floor);
            candidate.probability *= factor.powi(weighting);
        }

        if !report.is_clean() {
            tracing::warn!(
                target: "twentyq_core::belief",
                question,
                answer = %answer,
                missing = report.missing.len(),
                candidates = ?report.missing,
                message = "response data missing; using no-data row"
            );
        }

        self.normalize();
        Ok(report)
    }
}
