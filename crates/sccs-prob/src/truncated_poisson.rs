//! Zero-truncated Poisson sampling.
//!
//! A Poisson distribution restricted to strictly positive outcomes. Used to
//! guarantee every simulated case contributes at least one event: the rare
//! outcome rates of interest here give expected totals far below one, where
//! naive rejection of zeros would loop for hundreds of draws per subject.

use rand::Rng;
use rand_distr::{Distribution, Poisson};
use sccs_core::{Error, Result};

/// Above this mean the truncation mass is negligible (`P(0) < 1e-13`) and a
/// plain Poisson resampling loop terminates in one draw almost surely.
const INVERSION_CUTOFF: f64 = 30.0;

/// Zero-truncated Poisson distribution with mean parameter `mu` of the
/// underlying (untruncated) Poisson law. Support is `{1, 2, ...}`.
#[derive(Debug, Clone, Copy)]
pub struct ZeroTruncatedPoisson {
    mu: f64,
}

impl ZeroTruncatedPoisson {
    /// Create the distribution. `mu` must be finite and strictly positive.
    pub fn new(mu: f64) -> Result<Self> {
        if !mu.is_finite() || mu <= 0.0 {
            return Err(Error::Domain(format!(
                "zero-truncated Poisson requires mu > 0, got {mu}"
            )));
        }
        Ok(Self { mu })
    }

    /// The underlying Poisson mean `mu`.
    pub fn mu(&self) -> f64 {
        self.mu
    }

    /// Mean of the truncated law: `mu / (1 - exp(-mu))`.
    pub fn mean(&self) -> f64 {
        self.mu / -(-self.mu).exp_m1()
    }

    /// Draw one value `k >= 1`.
    ///
    /// For `mu <= 30` this inverts the CDF of the truncated law directly:
    /// `u` is drawn uniformly over the truncated mass `1 - exp(-mu)`
    /// (computed via `expm1` so tiny `mu` keeps full precision) and the
    /// Poisson terms are accumulated by recurrence until they cover `u`.
    /// For larger `mu` a plain Poisson draw is retried until positive.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        if self.mu > INVERSION_CUTOFF {
            let pois = Poisson::new(self.mu).expect("Poisson mean validated at construction");
            loop {
                let draw = pois.sample(rng) as u64;
                if draw >= 1 {
                    return draw;
                }
            }
        }

        let truncated_mass = -(-self.mu).exp_m1(); // 1 - exp(-mu), stable
        let u: f64 = rng.gen::<f64>() * truncated_mass;

        let mut k: u64 = 1;
        let mut term = self.mu * (-self.mu).exp(); // P(X = 1)
        let mut cum = term;
        // Float-tail guard: the accumulated terms can fall epsilon short of
        // the truncated mass, so cap the walk well past the bulk.
        let cap = (self.mu + 10.0 * self.mu.sqrt() + 50.0) as u64;
        while cum < u && k < cap {
            k += 1;
            term *= self.mu / k as f64;
            cum += term;
        }
        k
    }
}

impl Distribution<u64> for ZeroTruncatedPoisson {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        ZeroTruncatedPoisson::sample(self, rng)
    }
}
