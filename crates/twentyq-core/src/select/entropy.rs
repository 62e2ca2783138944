//! Two-bucket entropy proxy for the information a question would yield.
//!
//! Each candidate contributes its probability to the bucket of its most
//! likely response and the complement to the bucket of its least likely
//! response. A question whose buckets split the belief mass evenly scores
//! high; one that every candidate answers the same way scores near zero.

use crate::belief::{Distribution, EmptyCandidateSet};
use crate::model::answer::Answer;
use crate::model::response::ResponseTable;

/// Seed for every bucket so that `log2` never sees zero.
pub const BUCKET_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntropyScore {
    /// Shannon entropy of the bucket totals, in bits.
    pub entropy: f64,
    /// Candidates skipped for lack of response data.
    pub skipped: usize,
}

pub fn score(
    table: &ResponseTable,
    distribution: &Distribution,
) -> Result<EntropyScore, EmptyCandidateSet> {
    if distribution.is_empty() {
        return Err(EmptyCandidateSet);
    }

    let mut buckets = [BUCKET_EPSILON; Answer::COUNT];
    let mut skipped = 0;
    for candidate in distribution.candidates() {
        let Some(row) = table.row(&candidate.name).filter(|row| row.total() > 0.0) else {
            skipped += 1;
            continue;
        };
        buckets[row.first().index()] += candidate.probability;
        buckets[row.last().index()] += 1.0 - candidate.probability;
    }

    // With no rows at all the epsilon-seeded buckets are perfectly even and
    // would score log2(3), the maximum. Such a question tells us nothing, so
    // it scores 0 instead of the raw bucket entropy.
    if skipped == distribution.len() {
        return Ok(EntropyScore {
            entropy: 0.0,
            skipped,
        });
    }

    Ok(EntropyScore {
        entropy: shannon_bits(&buckets),
        skipped,
    })
}

fn shannon_bits(buckets: &[f64]) -> f64 {
    let total: f64 = buckets.iter().sum();
    buckets
        .iter()
        .map(|mass| mass / total)
        .filter(|p| *p > 0.0)
        .map(|p| -p * p.log2())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::candidate::Candidate;
    use crate::model::response::ResponseRow;

    fn row(yes: f64, no: f64, unsure: f64) -> ResponseRow {
        ResponseRow::new([yes, no, unsure]).unwrap()
    }

    fn distribution(entries: &[(&str, f64)]) -> Distribution {
        let candidates = entries
            .iter()
            .enumerate()
            .map(|(i, (name, p))| Candidate::new(i as u32 + 1, *name, *p))
            .collect();
        let mut distribution = Distribution::new(candidates);
        distribution.normalize();
        distribution
    }

    #[test]
    fn even_split_scores_one_bit() {
        let belief = distribution(&[("dog", 0.5), ("cat", 0.5)]);
        let table = ResponseTable::new()
            .with_row("dog", row(9.0, 1.0, 5.0))
            .with_row("cat", row(9.0, 1.0, 5.0));
        // Yes bucket: 0.5 + 0.5, No bucket: 0.5 + 0.5.
        let result = score(&table, &belief).unwrap();
        assert!((result.entropy - 1.0).abs() < 1e-4, "{}", result.entropy);
        assert_eq!(result.skipped, 0);
    }

    #[test]
    fn concentrated_mass_scores_near_zero() {
        let belief = distribution(&[("dog", 1.0)]);
        let table = ResponseTable::new().with_row("dog", row(1.0, 0.0, 0.5));
        let result = score(&table, &belief).unwrap();
        assert!(result.entropy < 1e-4, "{}", result.entropy);
    }

    #[test]
    fn flat_row_puts_everything_in_first_bucket() {
        let belief = distribution(&[("dog", 0.3), ("cat", 0.7)]);
        let table = ResponseTable::new()
            .with_row("dog", row(1.0, 1.0, 1.0))
            .with_row("cat", row(1.0, 1.0, 1.0));
        let result = score(&table, &belief).unwrap();
        assert!(result.entropy < 1e-4);
    }

    #[test]
    fn skewed_split_scores_between_zero_and_one() {
        let belief = distribution(&[("dog", 0.8), ("cat", 0.2)]);
        let table = ResponseTable::new()
            .with_row("dog", row(5.0, 0.0, 1.0))
            .with_row("cat", row(0.0, 5.0, 1.0));
        // Yes: 0.8 (dog first) + 0.8 (cat last), No: 0.2 (dog last) + 0.2 (cat first).
        let expected = -(0.8f64 * 0.8f64.log2() + 0.2 * 0.2f64.log2());
        let result = score(&table, &belief).unwrap();
        assert!((result.entropy - expected).abs() < 1e-4);
    }

    #[test]
    fn missing_rows_are_skipped() {
        let belief = distribution(&[("dog", 0.5), ("cat", 0.5)]);
        let table = ResponseTable::new().with_row("dog", row(2.0, 0.0, 1.0));
        let result = score(&table, &belief).unwrap();
        assert_eq!(result.skipped, 1);
        // dog alone: Yes 0.5, No 0.5.
        assert!((result.entropy - 1.0).abs() < 1e-4);

    }

    #[test]
    fn question_without_any_rows_scores_zero() {
        let belief = distribution(&[("dog", 0.5), ("cat", 0.5)]);
        let empty = score(&ResponseTable::new(), &belief).unwrap();
        assert_eq!(empty.entropy, 0.0);
        assert_eq!(empty.skipped, 2);

        // Zero-total rows count as no data too.
        let table = ResponseTable::new()
            .with_row("dog", row(0.0, 0.0, 0.0))
            .with_row("cat", row(0.0, 0.0, 0.0));
        assert_eq!(score(&table, &belief).unwrap().entropy, 0.0);
        assert!(shannon_bits(&[BUCKET_EPSILON; Answer::COUNT]) > 1.5);
    }

    #[test]
    fn empty_candidate_set_is_fatal() {
        let table = ResponseTable::new();
        assert_eq!(
            score(&table, &Distribution::default()),
            Err(EmptyCandidateSet)
        );
    }
}
