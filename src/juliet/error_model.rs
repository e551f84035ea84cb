//! Empirical per-base error model used for expected codon counts and for
//! the haplotype transition likelihood.

use crate::utils::Result;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorEstimates {
    pub match_rate: f64,
    pub substitution: f64,
    pub deletion: f64,
    pub insertion: f64,
}

impl ErrorEstimates {
    /// Builds a model from explicit substitution and deletion rates.
    pub fn from_rates(substitution: f64, deletion: f64) -> Result<ErrorEstimates> {
        if !(0.0..1.0).contains(&substitution) || !(0.0..1.0).contains(&deletion) {
            return Err("Error rates must be in [0, 1)".to_string());
        }
        let match_rate = 1.0 - substitution - deletion;
        if match_rate <= 0.0 {
            return Err("Substitution and deletion rates must sum to less than 1".to_string());
        }
        Ok(ErrorEstimates {
            match_rate,
            substitution,
            deletion,
            insertion: 0.0,
        })
    }

    /// Looks up learned rate estimates for a sequencing chemistry.
    pub fn from_chemistry(chemistry: &str) -> Result<ErrorEstimates> {
        let (substitution, deletion, insertion) = match chemistry {
            "S/P1-C1/beta" => (0.00062, 0.00331, 0.00084),
            "S/P1-C1.1" | "S/P1-C1.2" | "S/P2-C2/prospective-compatible" => {
                (0.00051, 0.00306, 0.00066)
            }
            _ => return Err(format!("Unsupported sequencing chemistry: {}", chemistry)),
        };
        Ok(ErrorEstimates {
            match_rate: 1.0 - substitution - deletion - insertion,
            substitution,
            deletion,
            insertion,
        })
    }

    /// Probability of observing sequence `b` given true sequence `a`, as the
    /// product of per-position match/substitution/deletion rates. Uncovered
    /// and ambiguous characters are treated like deletions. Sequences of
    /// different lengths have probability zero.
    pub fn sequence_probability(&self, a: &[u8], b: &[u8]) -> f64 {
        if a.len() != b.len() {
            return 0.0;
        }
        let mut p = 1.0;
        for (&x, &y) in a.iter().zip(b.iter()) {
            let is_gap = |c: u8| c == b'-' || c == b' ' || c == b'N';
            p *= if is_gap(x) || is_gap(y) {
                self.deletion
            } else if x != y {
                self.substitution
            } else {
                self.match_rate
            };
        }
        p
    }
}
