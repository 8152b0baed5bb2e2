//! Exposure-window sampling.
//!
//! Observation days run `1..=obs_time`. An exposure window of `risk_length`
//! days starts uniformly on `{1, ..., obs_time - risk_length}`, so a window
//! always fits inside the observation period with at least one control day
//! after it.

use rand::Rng;
use sccs_core::{Error, Result};

/// Draws per-subject exposure windows within a fixed observation period.
#[derive(Debug, Clone, Copy)]
pub struct ExposureWindowSampler {
    obs_time: u32,
    risk_length: u32,
}

impl ExposureWindowSampler {
    /// Create a sampler. Fails when `risk_length` is zero or leaves no room
    /// in the observation period (`risk_length >= obs_time`), which would make
    /// the start-day sampling range empty.
    pub fn new(obs_time: u32, risk_length: u32) -> Result<Self> {
        if risk_length == 0 {
            return Err(Error::Configuration("risk_length must be > 0".to_string()));
        }
        if risk_length >= obs_time {
            return Err(Error::Configuration(format!(
                "risk_length ({risk_length}) must be < obs_time ({obs_time})"
            )));
        }
        Ok(Self { obs_time, risk_length })
    }

    /// Exposure window `(start, end)` for a certainly-exposed subject.
    pub fn sample_certain<R: Rng + ?Sized>(&self, rng: &mut R) -> (u32, u32) {
        let start = rng.gen_range(1..=self.obs_time - self.risk_length);
        (start, start + self.risk_length - 1)
    }

    /// Exposure window for a subject exposed with probability `p_exposed`;
    /// unexposed subjects carry no window.
    pub fn sample_bernoulli<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        p_exposed: f64,
    ) -> Option<(u32, u32)> {
        if rng.gen_bool(p_exposed) { Some(self.sample_certain(rng)) } else { None }
    }

    /// Length of the observation period in days.
    pub fn obs_time(&self) -> u32 {
        self.obs_time
    }

    /// Length of the risk period in days.
    pub fn risk_length(&self) -> u32 {
        self.risk_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    #[test]
    fn test_empty_sampling_range_rejected() {
        assert!(matches!(
            ExposureWindowSampler::new(100, 100),
            Err(Error::Configuration(_))
        ));
        assert!(ExposureWindowSampler::new(100, 150).is_err());
        assert!(ExposureWindowSampler::new(100, 0).is_err());
        assert!(ExposureWindowSampler::new(2, 1).is_ok());
    }

    #[test]
    fn test_window_within_observation_period() {
        let sampler = ExposureWindowSampler::new(500, 28).unwrap();
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        for _ in 0..5_000 {
            let (start, end) = sampler.sample_certain(&mut rng);
            assert!(start >= 1);
            assert!(end <= 500);
            assert_eq!(end - start + 1, 28);
            // Start range excludes the tail that would push the window out.
            assert!(start <= 500 - 28);
        }
    }

    #[test]
    fn test_start_day_covers_full_range() {
        let sampler = ExposureWindowSampler::new(12, 4).unwrap();
        let mut rng = ChaCha12Rng::seed_from_u64(2);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..2_000 {
            let (start, _) = sampler.sample_certain(&mut rng);
            seen.insert(start);
        }
        // All of {1..=8} should appear over 2000 draws.
        assert_eq!(seen.len(), 8, "seen starts: {seen:?}");
    }

    #[test]
    fn test_bernoulli_exposure_rate() {
        let sampler = ExposureWindowSampler::new(100, 10).unwrap();
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        let n = 20_000;
        let exposed = (0..n)
            .filter(|_| sampler.sample_bernoulli(&mut rng, 0.8).is_some())
            .count();
        let frac = exposed as f64 / n as f64;
        assert!((frac - 0.8).abs() < 0.01, "exposed fraction = {frac}");
    }
}
