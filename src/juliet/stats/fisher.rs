//! One-sided Fisher's exact test on observed-versus-expected counts.

use statrs::distribution::{Discrete, Hypergeometric};

/// Upper-tail Fisher's exact test for the 2x2 table
/// [[observed, total_obs - observed], [expected, total_exp - expected]]:
/// the probability of seeing `observed` or more successes in the first
/// group given the fixed margins.
pub fn fisher_exact_greater(observed: u64, total_obs: u64, expected: u64, total_exp: u64) -> f64 {
    let observed = observed.min(total_obs);
    let expected = expected.min(total_exp);
    if observed == 0 {
        return 1.0;
    }

    let population = total_obs + total_exp;
    let successes = observed + expected;
    let draws = total_obs;

    let dist = match Hypergeometric::new(population, successes, draws) {
        Ok(dist) => dist,
        Err(_) => return 1.0,
    };

    let max_successes = successes.min(draws);
    let mut p_value = 0.0;
    for k in observed..=max_successes {
        p_value += dist.pmf(k);
    }
    p_value.min(1.0)
}

/// Multiple-testing correction: scale by the number of tests, clamp to 1.
pub fn bonferroni(p_value: f64, num_tests: f64) -> f64 {
    (p_value * num_tests).min(1.0)
}
