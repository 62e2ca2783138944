//! Per-question response statistics: how candidates tend to answer.

use super::answer::Answer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Non-negative weights over every answer label for one candidate, stored in
/// `Answer::ALL` order. Weights need not sum to one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<Answer, f64>", into = "BTreeMap<Answer, f64>")]
pub struct ResponseRow {
    weights: [f64; Answer::COUNT],
}

impl ResponseRow {
    /// Stand-in row for a candidate the store has no statistics for. Equal
    /// weights scale every such candidate by the same factor.
    pub const NO_DATA: ResponseRow = ResponseRow {
        weights: [1.0; Answer::COUNT],
    };

    pub fn new(weights: [f64; Answer::COUNT]) -> Result<Self, ResponseError> {
        for (answer, weight) in Answer::ALL.iter().zip(weights) {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ResponseError::InvalidWeight {
                    answer: *answer,
                    weight,
                });
            }
        }
        Ok(Self { weights })
    }

    pub fn weight(&self, answer: Answer) -> f64 {
        self.weights[answer.index()]
    }

    pub fn total(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Share of this row's mass carried by `answer`, or `None` when the row
    /// holds no mass at all.
    pub fn share(&self, answer: Answer) -> Option<f64> {
        let total = self.total();
        if total <= 0.0 {
            return None;
        }
        Some(self.weight(answer) / total)
    }

    /// Highest-weight label; the earliest label wins ties.
    pub fn first(&self) -> Answer {
        let mut best = Answer::ALL[0];
        for answer in Answer::ALL.iter().skip(1) {
            if self.weight(*answer) > self.weight(best) {
                best = *answer;
            }
        }
        best
    }

    /// Lowest-weight label; the earliest label wins ties.
    pub fn last(&self) -> Answer {
        let mut worst = Answer::ALL[0];
        for answer in Answer::ALL.iter().skip(1) {
            if self.weight(*answer) < self.weight(worst) {
                worst = *answer;
            }
        }
        worst
    }

    pub(crate) fn add(&mut self, answer: Answer, amount: f64) {
        self.weights[answer.index()] += amount;
    }
}

impl Default for ResponseRow {
    fn default() -> Self {
        Self {
            weights: [0.0; Answer::COUNT],
        }
    }
}

impl TryFrom<BTreeMap<Answer, f64>> for ResponseRow {
    type Error = ResponseError;

    fn try_from(map: BTreeMap<Answer, f64>) -> Result<Self, Self::Error> {
        let mut weights = [0.0; Answer::COUNT];
        for (answer, weight) in map {
            weights[answer.index()] = weight;
        }
        ResponseRow::new(weights)
    }
}

impl From<ResponseRow> for BTreeMap<Answer, f64> {
    fn from(row: ResponseRow) -> Self {
        Answer::ALL
            .iter()
            .map(|answer| (*answer, row.weight(*answer)))
            .collect()
    }
}

/// Response rows for a single question keyed by candidate name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseTable {
    rows: HashMap<String, ResponseRow>,
}

impl ResponseTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, candidate: impl Into<String>, row: ResponseRow) {
        self.rows.insert(candidate.into(), row);
    }

    pub fn with_row(mut self, candidate: impl Into<String>, row: ResponseRow) -> Self {
        self.insert(candidate, row);
        self
    }

    pub fn row(&self, candidate: &str) -> Option<&ResponseRow> {
        self.rows.get(candidate)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FromIterator<(String, ResponseRow)> for ResponseTable {
    fn from_iter<I: IntoIterator<Item = (String, ResponseRow)>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResponseError {
    #[error("weight for '{answer}' must be finite and non-negative, got {weight}")]
    InvalidWeight { answer: Answer, weight: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_and_non_finite_weights() {
        assert!(ResponseRow::new([1.0, -0.1, 0.0]).is_err());
        assert!(ResponseRow::new([f64::NAN, 0.0, 0.0]).is_err());
        assert!(ResponseRow::new([0.0, 0.0, f64::INFINITY]).is_err());
        assert!(ResponseRow::new([0.0, 0.0, 0.0]).is_ok());
    }

    #[test]
    fn first_and_last_break_ties_by_label_order() {
        let row = ResponseRow::new([2.0, 2.0, 0.5]).unwrap();
        assert_eq!(row.first(), Answer::Yes);
        assert_eq!(row.last(), Answer::Unsure);

        let flat = ResponseRow::new([1.0, 1.0, 1.0]).unwrap();
        assert_eq!(flat.first(), Answer::Yes);
        assert_eq!(flat.last(), Answer::Yes);

        let skewed = ResponseRow::new([0.0, 4.0, 0.0]).unwrap();
        assert_eq!(skewed.first(), Answer::No);
        assert_eq!(skewed.last(), Answer::Yes);
    }

    #[test]
    fn share_is_none_for_empty_row() {
        assert_eq!(ResponseRow::default().share(Answer::Yes), None);
        let row = ResponseRow::new([3.0, 1.0, 0.0]).unwrap();
        assert_eq!(row.share(Answer::Yes), Some(0.75));
        assert_eq!(ResponseRow::NO_DATA.share(Answer::No), Some(1.0 / 3.0));
    }

    #[test]
    fn row_deserializes_from_label_map_with_missing_labels() {
        let row: ResponseRow = serde_json::from_str(r#"{"Yes": 4.0, "No": 1.0}"#).unwrap();
        assert_eq!(row.weight(Answer::Yes), 4.0);
        assert_eq!(row.weight(Answer::Unsure), 0.0);

        let err = serde_json::from_str::<ResponseRow>(r#"{"Yes": -1.0}"#);
        assert!(err.is_err());
    }
}
