//! The two stochastic data-generating mechanisms.
//!
//! Both produce [`SubjectHistory`] records under a known true effect, so the
//! downstream dataset schema is identical regardless of generator:
//!
//! - **Event allocation** (Model A): every subject is exposed; a
//!   zero-truncated Poisson total is split between control and risk periods
//!   by a multinomial draw, so every subject contributes at least one event.
//! - **Daily Bernoulli** (Model B): exposure with probability 0.8; each
//!   subject-day is an independent Bernoulli trial on the logistic scale.
//!   Subjects may end up with zero events and then contribute no rows.
//!
//! Model B deliberately ignores within-subject event dependence; each day is
//! drawn independently even immediately after an event.

use crate::exposure::ExposureWindowSampler;
use rand::Rng;
use sccs_core::{Error, Result};
use sccs_prob::math::{logit, sigmoid};
use sccs_prob::{sample_multinomial, ZeroTruncatedPoisson};

/// One subject's generated history: exposure window (if any) and event days,
/// ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectHistory {
    /// Subject identifier, unique within a cohort.
    pub id: u32,
    /// Exposure window `(start, end)`, inclusive.
    pub exposure: Option<(u32, u32)>,
    /// Event days within the observation period, sorted ascending.
    pub event_days: Vec<u32>,
}

// ---------------------------------------------------------------------------
// Model A: zero-truncated total + multinomial period allocation
// ---------------------------------------------------------------------------

/// Allocates a subject's events between control and risk periods (Model A).
///
/// With baseline daily rate `lambda0` and log effect `beta`, the risk-period
/// rate is `lambda1 = lambda0 * exp(beta)` and the total rate over the
/// observation period is `mu = lambda0*e0 + lambda1*e1`, where
/// `e0 = obs_time - risk_length` and `e1 = risk_length`. The total event
/// count is zero-truncated Poisson with mean `mu`; the period split is
/// multinomial with probabilities `(lambda0*e0/mu, lambda1*e1/mu)`.
#[derive(Debug, Clone)]
pub struct EventAllocator {
    obs_time: u32,
    risk_length: u32,
    total_law: ZeroTruncatedPoisson,
    p_control: f64,
    p_risk: f64,
}

impl EventAllocator {
    /// Build the allocator. Fails with a domain error when the baseline rate
    /// is not strictly positive (the total rate `mu` must be `> 0`).
    pub fn new(lambda0: f64, beta: f64, obs_time: u32, risk_length: u32) -> Result<Self> {
        if risk_length == 0 || risk_length >= obs_time {
            return Err(Error::Configuration(format!(
                "risk_length ({risk_length}) must be in (0, obs_time = {obs_time})"
            )));
        }
        if !lambda0.is_finite() || lambda0 <= 0.0 {
            return Err(Error::Domain(format!(
                "baseline rate must be > 0, got {lambda0}"
            )));
        }
        let e0 = (obs_time - risk_length) as f64;
        let e1 = risk_length as f64;
        let lambda1 = lambda0 * beta.exp();
        let mu = lambda0 * e0 + lambda1 * e1;
        if !mu.is_finite() || mu <= 0.0 {
            return Err(Error::Domain(format!("total rate mu must be > 0, got {mu}")));
        }
        Ok(Self {
            obs_time,
            risk_length,
            total_law: ZeroTruncatedPoisson::new(mu)?,
            p_control: lambda0 * e0 / mu,
            p_risk: lambda1 * e1 / mu,
        })
    }

    /// Period allocation probabilities `(p_control, p_risk)`; they sum to 1
    /// up to floating tolerance.
    pub fn probabilities(&self) -> (f64, f64) {
        (self.p_control, self.p_risk)
    }

    /// Draw one subject's event days given their exposure window. Always at
    /// least one event; days sorted ascending, drawn uniformly with
    /// replacement within each period.
    pub fn sample_event_days<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        exposure: (u32, u32),
    ) -> Result<Vec<u32>> {
        let total = self.total_law.sample(rng);
        let counts = sample_multinomial(rng, total, &[self.p_control, self.p_risk])?;
        let (n_control, n_risk) = (counts[0], counts[1]);

        let (expo_start, _expo_end) = exposure;
        let control_len = self.obs_time - self.risk_length;

        let mut days = Vec::with_capacity(total as usize);
        for _ in 0..n_control {
            // Control days are the two segments around the window; index the
            // union [0, control_len) and shift past the window where needed.
            let idx = rng.gen_range(0..control_len);
            let day = if idx < expo_start - 1 { idx + 1 } else { idx + 1 + self.risk_length };
            days.push(day);
        }
        for _ in 0..n_risk {
            days.push(expo_start + rng.gen_range(0..self.risk_length));
        }
        days.sort_unstable();
        Ok(days)
    }
}

/// Generate a Model A cohort: every subject exposed, every subject with at
/// least one event.
pub fn simulate_event_allocation_cohort<R: Rng + ?Sized>(
    rng: &mut R,
    n_subjects: u32,
    sampler: &ExposureWindowSampler,
    allocator: &EventAllocator,
) -> Result<Vec<SubjectHistory>> {
    let mut cohort = Vec::with_capacity(n_subjects as usize);
    for id in 0..n_subjects {
        let exposure = sampler.sample_certain(rng);
        let event_days = allocator.sample_event_days(rng, exposure)?;
        cohort.push(SubjectHistory { id, exposure: Some(exposure), event_days });
    }
    Ok(cohort)
}

// ---------------------------------------------------------------------------
// Model B: independent daily Bernoulli outcomes
// ---------------------------------------------------------------------------

/// Draws independent daily outcomes on the logistic scale (Model B).
///
/// `logit(p_day) = logit(baseline_rate) + ln(IRR) * exposed(day)`; a
/// subject's events are exactly its days with a positive outcome.
#[derive(Debug, Clone, Copy)]
pub struct DailyOutcomeSampler {
    obs_time: u32,
    /// Event probability on an unexposed day.
    p_baseline: f64,
    /// Event probability on an exposed day.
    p_exposed_day: f64,
}

impl DailyOutcomeSampler {
    /// Build the sampler. `baseline_rate` must lie strictly in `(0, 1)`.
    pub fn new(baseline_rate: f64, log_irr: f64, obs_time: u32) -> Result<Self> {
        let intercept = logit(baseline_rate)?;
        if !log_irr.is_finite() {
            return Err(Error::Domain(format!("log IRR must be finite, got {log_irr}")));
        }
        Ok(Self {
            obs_time,
            p_baseline: baseline_rate,
            p_exposed_day: sigmoid(intercept + log_irr),
        })
    }

    /// Event days for one subject: an independent Bernoulli draw per day of
    /// the observation period, with the exposed-day probability inside the
    /// exposure window (unexposed subjects use the baseline probability
    /// throughout). May be empty.
    pub fn sample_event_days<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        exposure: Option<(u32, u32)>,
    ) -> Vec<u32> {
        let mut days = Vec::new();
        for day in 1..=self.obs_time {
            let exposed = matches!(exposure, Some((start, end)) if day >= start && day <= end);
            let p = if exposed { self.p_exposed_day } else { self.p_baseline };
            if rng.gen_bool(p) {
                days.push(day);
            }
        }
        days
    }

    /// Expected number of events for one subject with the given exposure
    /// probability and risk length.
    fn expected_events_per_subject(&self, p_exposed: f64, risk_length: u32) -> f64 {
        let control_days = (self.obs_time - risk_length) as f64;
        let all_days = self.obs_time as f64;
        p_exposed * (control_days * self.p_baseline + risk_length as f64 * self.p_exposed_day)
            + (1.0 - p_exposed) * all_days * self.p_baseline
    }
}

/// Generate a Model B cohort. Subjects are exposed with probability
/// `p_exposed`; zero-event subjects are kept here (with empty `event_days`)
/// and dropped by the dataset builder.
///
/// Warns when the expected total event count falls below one: such a
/// configuration will regularly produce empty datasets, which the estimator
/// rejects rather than aggregating silently.
pub fn simulate_daily_outcome_cohort<R: Rng + ?Sized>(
    rng: &mut R,
    n_subjects: u32,
    p_exposed: f64,
    sampler: &ExposureWindowSampler,
    outcomes: &DailyOutcomeSampler,
) -> Result<Vec<SubjectHistory>> {
    let expected = n_subjects as f64
        * outcomes.expected_events_per_subject(p_exposed, sampler.risk_length());
    if expected < 1.0 {
        log::warn!(
            "expected total event count {expected:.4} < 1 for n_subjects={n_subjects}; \
             generated datasets will often be empty"
        );
    }

    let mut cohort = Vec::with_capacity(n_subjects as usize);
    for id in 0..n_subjects {
        let exposure = sampler.sample_bernoulli(rng, p_exposed);
        let event_days = outcomes.sample_event_days(rng, exposure);
        cohort.push(SubjectHistory { id, exposure, event_days });
    }
    Ok(cohort)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    #[test]
    fn test_allocator_probabilities_sum_to_one() {
        let alloc = EventAllocator::new(1e-5, 2.0_f64.ln(), 500, 28).unwrap();
        let (p0, p1) = alloc.probabilities();
        assert!((p0 + p1 - 1.0).abs() < 1e-9);
        assert!(p0 > 0.0 && p1 > 0.0);
    }

    #[test]
    fn test_allocator_rejects_nonpositive_rate() {
        assert!(matches!(
            EventAllocator::new(0.0, 0.5, 500, 28),
            Err(Error::Domain(_))
        ));
        assert!(EventAllocator::new(-1e-5, 0.5, 500, 28).is_err());
    }

    #[test]
    fn test_allocator_rejects_degenerate_periods() {
        assert!(matches!(
            EventAllocator::new(1e-5, 0.5, 100, 100),
            Err(Error::Configuration(_))
        ));
        assert!(EventAllocator::new(1e-5, 0.5, 100, 0).is_err());
    }

    #[test]
    fn test_every_subject_has_at_least_one_event() {
        let mut rng = ChaCha12Rng::seed_from_u64(17);
        let sampler = ExposureWindowSampler::new(500, 28).unwrap();
        let alloc = EventAllocator::new(1e-5, 2.0_f64.ln(), 500, 28).unwrap();
        let cohort = simulate_event_allocation_cohort(&mut rng, 300, &sampler, &alloc).unwrap();
        assert_eq!(cohort.len(), 300);
        for subject in &cohort {
            assert!(!subject.event_days.is_empty(), "subject {} has no events", subject.id);
            assert!(subject.exposure.is_some());
        }
    }

    #[test]
    fn test_event_days_within_period_and_sorted() {
        let mut rng = ChaCha12Rng::seed_from_u64(23);
        let obs_time = 200;
        let sampler = ExposureWindowSampler::new(obs_time, 30).unwrap();
        // High rate so subjects carry many events.
        let alloc = EventAllocator::new(0.05, 1.0, obs_time, 30).unwrap();
        let cohort = simulate_event_allocation_cohort(&mut rng, 50, &sampler, &alloc).unwrap();
        for subject in &cohort {
            assert!(subject.event_days.windows(2).all(|w| w[0] <= w[1]));
            for &day in &subject.event_days {
                assert!((1..=obs_time).contains(&day));
            }
        }
    }

    #[test]
    fn test_risk_fraction_tracks_allocation_probability() {
        let mut rng = ChaCha12Rng::seed_from_u64(31);
        let obs_time = 200;
        let risk_length = 40;
        let sampler = ExposureWindowSampler::new(obs_time, risk_length).unwrap();
        let alloc = EventAllocator::new(0.05, 2.0_f64.ln(), obs_time, risk_length).unwrap();
        let (_, p_risk) = alloc.probabilities();

        let cohort = simulate_event_allocation_cohort(&mut rng, 400, &sampler, &alloc).unwrap();
        let mut total = 0usize;
        let mut in_risk = 0usize;
        for subject in &cohort {
            let (start, end) = subject.exposure.unwrap();
            total += subject.event_days.len();
            in_risk += subject.event_days.iter().filter(|&&d| d >= start && d <= end).count();
        }
        let frac = in_risk as f64 / total as f64;
        assert!((frac - p_risk).abs() < 0.02, "risk fraction {frac}, expected {p_risk}");
    }

    #[test]
    fn test_daily_sampler_rejects_bad_baseline() {
        assert!(DailyOutcomeSampler::new(0.0, 0.5, 100).is_err());
        assert!(DailyOutcomeSampler::new(1.0, 0.5, 100).is_err());
        assert!(DailyOutcomeSampler::new(0.01, f64::INFINITY, 100).is_err());
    }

    #[test]
    fn test_daily_outcomes_respect_exposure_probability() {
        let mut rng = ChaCha12Rng::seed_from_u64(41);
        let sampler = ExposureWindowSampler::new(60, 10).unwrap();
        let outcomes = DailyOutcomeSampler::new(0.01, 3.0_f64.ln(), 60).unwrap();
        let cohort =
            simulate_daily_outcome_cohort(&mut rng, 10_000, 0.8, &sampler, &outcomes).unwrap();

        let exposed = cohort.iter().filter(|s| s.exposure.is_some()).count();
        let frac = exposed as f64 / cohort.len() as f64;
        assert!((frac - 0.8).abs() < 0.01, "exposed fraction = {frac}");

        // Zero-event subjects are legitimate under model B.
        assert!(cohort.iter().any(|s| s.event_days.is_empty()));
    }

    #[test]
    fn test_daily_event_rate_elevated_in_risk_window() {
        let mut rng = ChaCha12Rng::seed_from_u64(43);
        let obs_time = 100;
        let risk_length = 20;
        let irr = 4.0_f64;
        let sampler = ExposureWindowSampler::new(obs_time, risk_length).unwrap();
        let outcomes = DailyOutcomeSampler::new(0.01, irr.ln(), obs_time).unwrap();
        let cohort =
            simulate_daily_outcome_cohort(&mut rng, 20_000, 1.0, &sampler, &outcomes).unwrap();

        let mut risk_days = 0u64;
        let mut risk_events = 0u64;
        let mut control_days = 0u64;
        let mut control_events = 0u64;
        for subject in &cohort {
            let (start, end) = subject.exposure.unwrap();
            risk_days += u64::from(risk_length);
            control_days += u64::from(obs_time - risk_length);
            for &day in &subject.event_days {
                if day >= start && day <= end {
                    risk_events += 1;
                } else {
                    control_events += 1;
                }
            }
        }
        let observed_ratio = (risk_events as f64 / risk_days as f64)
            / (control_events as f64 / control_days as f64);
        // Odds-scale IRR of 4 at a baseline of 0.01 gives a rate ratio just
        // below 4; accept a band around it.
        assert!(
            (3.3..=4.6).contains(&observed_ratio),
            "observed rate ratio = {observed_ratio}"
        );
    }
}
