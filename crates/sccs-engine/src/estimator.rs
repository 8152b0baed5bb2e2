//! Conditional Poisson regression for SCCS datasets.
//!
//! Each subject is its own stratum; conditioning on the subject's total event
//! count eliminates the subject-specific baseline rate. With a single
//! exposure covariate splitting the observation period into risk time `e1`
//! and control time `e0`, the stratum likelihood reduces to
//! `n_risk ~ Binomial(n_total, pi(beta))` with
//! `pi = sigmoid(beta + ln(e1/e0))`, so the fit is a one-dimensional
//! Newton-Raphson on the conditional log-likelihood. The standard error comes
//! from the observed information at the optimum and the confidence interval
//! is Wald on the log scale.

use sccs_core::{Error, FitResult, Result, SccsDataset, SccsFitter};
use sccs_prob::math::sigmoid;
use statrs::distribution::{ContinuousCDF, Normal};
use std::collections::BTreeMap;

#[inline]
fn standard_normal() -> Normal {
    Normal::new(0.0, 1.0).expect("standard normal should be constructible")
}

/// One informative stratum: a subject whose observation period has both risk
/// and control time.
#[derive(Debug, Clone, Copy)]
struct Stratum {
    n_total: f64,
    n_risk: f64,
    /// `ln(e1 / e0)`, the fixed per-stratum offset.
    offset: f64,
}

/// Default conditional Poisson solver.
#[derive(Debug, Clone)]
pub struct ConditionalPoissonFitter {
    /// Maximum Newton iterations.
    pub max_iter: usize,
    /// Convergence tolerance on the Newton step size.
    pub tol: f64,
    /// Confidence level for the Wald interval (e.g. 0.95).
    pub confidence_level: f64,
}

impl Default for ConditionalPoissonFitter {
    fn default() -> Self {
        Self { max_iter: 50, tol: 1e-10, confidence_level: 0.95 }
    }
}

impl ConditionalPoissonFitter {
    /// Fitter with a non-default confidence level.
    pub fn with_confidence_level(confidence_level: f64) -> Result<Self> {
        if !(confidence_level.is_finite() && confidence_level > 0.0 && confidence_level < 1.0) {
            return Err(Error::Configuration(format!(
                "confidence_level must be in (0, 1), got {confidence_level}"
            )));
        }
        Ok(Self { confidence_level, ..Self::default() })
    }

    /// Collapse dataset rows into per-subject strata, keeping only strata
    /// with an exposure contrast (both `e1 > 0` and `e0 > 0`).
    fn build_strata(dataset: &SccsDataset) -> Result<Vec<Stratum>> {
        // (n_total, n_risk, e1, e0) per subject, keyed for deterministic order.
        let mut acc: BTreeMap<u32, (f64, f64, f64, f64)> = BTreeMap::new();

        for row in dataset.rows() {
            let obs_len = i64::from(row.obs_end) - i64::from(row.obs_start) + 1;
            if obs_len <= 0 {
                return Err(Error::Fit(format!(
                    "subject {} has zero total observation time",
                    row.subject_id
                )));
            }
            let (e1, in_risk) = match row.exposure {
                Some((start, end)) => {
                    let len = f64::from(end - start + 1);
                    let hit = row.event_day >= start && row.event_day <= end;
                    (len, hit)
                }
                None => (0.0, false),
            };
            let e0 = obs_len as f64 - e1;

            let entry = acc.entry(row.subject_id).or_insert((0.0, 0.0, e1, e0));
            entry.0 += 1.0;
            if in_risk {
                entry.1 += 1.0;
            }
        }

        let mut strata = Vec::with_capacity(acc.len());
        for (subject_id, (n_total, n_risk, e1, e0)) in acc {
            if e1 <= 0.0 || e0 <= 0.0 {
                // No exposure contrast: the conditional likelihood is flat in
                // beta for this subject.
                log::debug!("subject {subject_id}: no exposure contrast, stratum skipped");
                continue;
            }
            strata.push(Stratum { n_total, n_risk, offset: (e1 / e0).ln() });
        }
        Ok(strata)
    }

    /// Score (gradient) and observed information of the conditional
    /// log-likelihood at `beta`.
    fn score_and_information(strata: &[Stratum], beta: f64) -> (f64, f64) {
        let mut score = 0.0;
        let mut info = 0.0;
        for s in strata {
            let pi = sigmoid(beta + s.offset);
            score += s.n_risk - s.n_total * pi;
            info += s.n_total * pi * (1.0 - pi);
        }
        (score, info)
    }
}

impl SccsFitter for ConditionalPoissonFitter {
    fn fit(&self, dataset: &SccsDataset) -> Result<FitResult> {
        if dataset.is_empty() {
            return Err(Error::Fit("dataset has no rows (no events)".to_string()));
        }

        let strata = Self::build_strata(dataset)?;
        if strata.is_empty() {
            return Err(Error::Fit(
                "no informative strata: no subject has an exposure contrast".to_string(),
            ));
        }

        let total_risk: f64 = strata.iter().map(|s| s.n_risk).sum();
        let total_events: f64 = strata.iter().map(|s| s.n_total).sum();
        if total_risk == 0.0 {
            return Err(Error::Fit(
                "complete separation: no events in any risk period".to_string(),
            ));
        }
        if total_risk == total_events {
            return Err(Error::Fit(
                "complete separation: no events in any control period".to_string(),
            ));
        }

        // Newton-Raphson. The conditional log-likelihood is strictly concave
        // once separation is excluded, so plain Newton with a step cap is
        // enough.
        let mut beta = 0.0;
        let mut converged = false;
        let mut n_iter = 0;
        for iter in 1..=self.max_iter {
            n_iter = iter;
            let (score, info) = Self::score_and_information(&strata, beta);
            if info <= 0.0 || !info.is_finite() {
                return Err(Error::Fit(format!(
                    "observed information is degenerate ({info}) at beta = {beta}"
                )));
            }
            let step = (score / info).clamp(-5.0, 5.0);
            beta += step;
            if step.abs() < self.tol {
                converged = true;
                break;
            }
        }
        if !converged {
            return Err(Error::Fit(format!(
                "Newton-Raphson did not converge in {} iterations",
                self.max_iter
            )));
        }

        let (_, info) = Self::score_and_information(&strata, beta);
        let standard_error = 1.0 / info.sqrt();
        let z = standard_normal().inverse_cdf(0.5 + self.confidence_level / 2.0);

        Ok(FitResult {
            log_estimate: beta,
            standard_error,
            irr: beta.exp(),
            ci_lower: (beta - z * standard_error).exp(),
            ci_upper: (beta + z * standard_error).exp(),
            event_count: dataset.len() as u64,
            converged,
            n_iter,
        })
    }

    fn name(&self) -> &str {
        "ConditionalPoisson"
    }
}
