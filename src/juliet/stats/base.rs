//! Base-level significance testing of per-column nucleotide counts.

use super::fisher::{bonferroni, fisher_exact_greater};
use std::collections::HashMap;

/// Significance threshold shared by all tests.
pub const ALPHA: f64 = 0.01;

/// Correction defaults: positions in the target region times alternative
/// bases per position.
pub const NUM_POSITIONS: u64 = 3200;
pub const NUM_ALT_BASES: u64 = 4;

/// Prior probability mass of the presumed true call and the residuals.
const PRIOR_MATCH: f64 = 0.9872;
const PRIOR_BASE: f64 = 0.0005;
const PRIOR_GAP: f64 = 0.0029;

/// Expected spurious-insertion rate, spread over the four bases.
const INSERTION_RATE: f64 = 0.0084;

/// Outcome of testing one count vector over {A, C, G, T, gap}.
#[derive(Debug, Clone, PartialEq)]
pub struct FisherResult {
    pub p_values: [f64; 5],
    pub mask: [bool; 5],
    pub hit: bool,
    pub arg_max: usize,
}

/// Fisher's-exact scoring of observed symbol counts against the
/// expected-error prior, Bonferroni-corrected.
#[derive(Debug, Clone, Copy)]
pub struct SignificanceEngine {
    pub alpha: f64,
    pub correction: f64,
}

impl Default for SignificanceEngine {
    fn default() -> Self {
        SignificanceEngine {
            alpha: ALPHA,
            correction: (NUM_POSITIONS * NUM_ALT_BASES) as f64,
        }
    }
}

impl SignificanceEngine {
    /// Tests each symbol's smoothed count against the prior centered on the
    /// most likely call. A symbol is a hit when its corrected p-value is
    /// below alpha, it was observed more than once, and it is not the
    /// presumed true call.
    pub fn test_counts(&self, observed: &[u64; 5]) -> FisherResult {
        let (smoothed, arg_max, total) = laplace_smooth(observed);
        let priors = priors_for(arg_max);

        let mut p_values = [1.0; 5];
        let mut mask = [false; 5];
        let mut hit = false;
        for i in 0..5 {
            let expected = (priors[i] * total as f64).round() as u64;
            let raw = fisher_exact_greater(smoothed[i], total, expected, total);
            p_values[i] = bonferroni(raw, self.correction);
            if p_values[i] < self.alpha && observed[i] > 1 {
                if i != arg_max {
                    hit = true;
                }
                mask[i] = true;
            }
        }

        FisherResult {
            p_values,
            mask,
            hit,
            arg_max,
        }
    }

    /// Tests observed insertion sequences against the expected spurious
    /// insertion rate; returns the significant ones with raw p-values.
    pub fn test_insertions(
        &self,
        observed: &[u64; 5],
        insertions: &HashMap<String, u64>,
    ) -> Vec<(String, f64)> {
        let (_, _, total) = laplace_smooth(observed);
        let expected = (INSERTION_RATE / NUM_ALT_BASES as f64 * total as f64).round() as u64;

        let mut significant: Vec<(String, f64)> = insertions
            .iter()
            .filter_map(|(sequence, &count)| {
                let p = fisher_exact_greater(count + 1, total, expected, total);
                (p < self.alpha).then(|| (sequence.clone(), p))
            })
            .collect();
        significant.sort_by(|a, b| a.0.cmp(&b.0));
        significant
    }
}

/// Adds one pseudo-count per symbol; returns the smoothed counts, the index
/// of the presumed true call, and the smoothed total.
fn laplace_smooth(observed: &[u64; 5]) -> ([u64; 5], usize, u64) {
    let mut smoothed = [0u64; 5];
    let mut arg_max = 0;
    for i in 0..5 {
        smoothed[i] = observed[i] + 1;
        if smoothed[i] > smoothed[arg_max] {
            arg_max = i;
        }
    }
    let total = smoothed.iter().sum();
    (smoothed, arg_max, total)
}

fn priors_for(arg_max: usize) -> [f64; 5] {
    let mut priors = [PRIOR_BASE, PRIOR_BASE, PRIOR_BASE, PRIOR_BASE, PRIOR_GAP];
    priors[arg_max] = PRIOR_MATCH;
    let sum: f64 = priors.iter().sum();
    for p in priors.iter_mut() {
        *p /= sum;
    }
    priors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strong_consensus_produces_no_hits() {
        let engine = SignificanceEngine::default();
        let result = engine.test_counts(&[97, 1, 1, 1, 0]);
        assert_eq!(result.arg_max, 0);
        assert!(!result.hit);
        // The argmax symbol is excluded; the rest fail the count gate
        for i in 1..5 {
            assert!(!result.mask[i]);
        }
    }

    #[test]
    fn substantial_minority_is_a_hit() {
        let engine = SignificanceEngine::default();
        let result = engine.test_counts(&[700, 300, 0, 0, 0]);
        assert_eq!(result.arg_max, 0);
        assert!(result.hit);
        assert!(result.mask[1]);
        assert!(result.p_values[1] < ALPHA);
    }

    #[test]
    fn count_gate_requires_more_than_one_observation() {
        let engine = SignificanceEngine::default();
        // One stray C below the count gate can never be flagged
        let result = engine.test_counts(&[99, 1, 0, 0, 0]);
        assert!(!result.mask[1]);
        assert!(!result.hit);
    }

    #[test]
    fn identical_inputs_give_identical_results() {
        let engine = SignificanceEngine::default();
        let observed = [88, 7, 3, 1, 1];
        assert_eq!(engine.test_counts(&observed), engine.test_counts(&observed));
    }

    #[test]
    fn corrected_p_values_are_clamped() {
        let engine = SignificanceEngine::default();
        let result = engine.test_counts(&[25, 25, 25, 25, 0]);
        for p in result.p_values {
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn frequent_insertions_are_significant() {
        let engine = SignificanceEngine::default();
        let mut insertions = HashMap::new();
        insertions.insert("AAG".to_string(), 50u64);
        insertions.insert("T".to_string(), 1u64);
        let significant = engine.test_insertions(&[500, 2, 1, 0, 3], &insertions);
        assert_eq!(significant.len(), 1);
        assert_eq!(significant[0].0, "AAG");
        assert!(significant[0].1 < ALPHA);
    }
}
