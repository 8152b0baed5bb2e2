//! Multinomial sampling via the conditional-binomial decomposition.

use rand::Rng;
use rand_distr::{Binomial, Distribution};
use sccs_core::{Error, Result};

/// Tolerance on `|sum(probs) - 1|`.
const PROB_SUM_TOL: f64 = 1e-9;

/// Draw cell counts `(n_1, ..., n_k)` summing to `n` with cell probabilities
/// `probs`.
///
/// Cells are filled left to right, each from a binomial on the remaining
/// trials with the renormalized cell probability; the last cell takes the
/// remainder. Probabilities must be non-negative and sum to 1 within `1e-9`.
pub fn sample_multinomial<R: Rng + ?Sized>(
    rng: &mut R,
    n: u64,
    probs: &[f64],
) -> Result<Vec<u64>> {
    if probs.is_empty() {
        return Err(Error::Domain("multinomial requires at least one cell".to_string()));
    }
    if probs.iter().any(|&p| !p.is_finite() || p < 0.0) {
        return Err(Error::Domain(format!(
            "multinomial probabilities must be finite and non-negative, got {probs:?}"
        )));
    }
    let total: f64 = probs.iter().sum();
    if (total - 1.0).abs() > PROB_SUM_TOL {
        return Err(Error::Domain(format!(
            "multinomial probabilities must sum to 1 (tolerance {PROB_SUM_TOL}), got {total}"
        )));
    }

    let k = probs.len();
    let mut counts = vec![0u64; k];
    let mut remaining_n = n;
    let mut remaining_p = 1.0;

    for (j, &p) in probs.iter().enumerate().take(k - 1) {
        if remaining_n == 0 {
            break;
        }
        // Renormalize against the mass not yet consumed; clamp for the float
        // dust left by the running subtraction.
        let cond = (p / remaining_p).clamp(0.0, 1.0);
        let draw = if cond >= 1.0 {
            remaining_n
        } else {
            Binomial::new(remaining_n, cond)
                .expect("binomial probability clamped to [0, 1]")
                .sample(rng)
        };
        counts[j] = draw;
        remaining_n -= draw;
        remaining_p -= p;
    }
    counts[k - 1] = remaining_n;

    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    #[test]
    fn test_counts_sum_to_n() {
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        for _ in 0..500 {
            let counts = sample_multinomial(&mut rng, 37, &[0.2, 0.5, 0.3]).unwrap();
            assert_eq!(counts.iter().sum::<u64>(), 37);
        }
    }

    #[test]
    fn test_two_cell_proportions() {
        let mut rng = ChaCha12Rng::seed_from_u64(5);
        let p1 = 0.15;
        let n = 200u64;
        let reps = 5_000;
        let mut total_cell1 = 0u64;
        for _ in 0..reps {
            let counts = sample_multinomial(&mut rng, n, &[1.0 - p1, p1]).unwrap();
            total_cell1 += counts[1];
        }
        let frac = total_cell1 as f64 / (n * reps) as f64;
        assert!((frac - p1).abs() < 0.005, "cell-1 fraction = {frac}");
    }

    #[test]
    fn test_degenerate_cells() {
        let mut rng = ChaCha12Rng::seed_from_u64(9);
        let counts = sample_multinomial(&mut rng, 50, &[0.0, 1.0]).unwrap();
        assert_eq!(counts, vec![0, 50]);
        let counts = sample_multinomial(&mut rng, 50, &[1.0, 0.0]).unwrap();
        assert_eq!(counts, vec![50, 0]);
        let counts = sample_multinomial(&mut rng, 0, &[0.4, 0.6]).unwrap();
        assert_eq!(counts, vec![0, 0]);
    }

    #[test]
    fn test_rejects_bad_probabilities() {
        let mut rng = ChaCha12Rng::seed_from_u64(2);
        assert!(sample_multinomial(&mut rng, 10, &[]).is_err());
        assert!(sample_multinomial(&mut rng, 10, &[0.5, 0.4]).is_err());
        assert!(sample_multinomial(&mut rng, 10, &[1.2, -0.2]).is_err());
        assert!(sample_multinomial(&mut rng, 10, &[f64::NAN, 1.0]).is_err());
    }

    #[test]
    fn test_probability_sum_tolerance_boundary() {
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        // Inside tolerance: accepted.
        assert!(sample_multinomial(&mut rng, 10, &[0.5, 0.5 + 5e-10]).is_ok());
        // Outside tolerance: rejected.
        assert!(sample_multinomial(&mut rng, 10, &[0.5, 0.5 + 5e-9]).is_err());
    }
}
