//! Replication engine: runs N independent generate-and-fit replicates and
//! aggregates estimator performance.
//!
//! Replicate `i` always draws from stream `i` of the master seed, in both
//! execution modes, so the set of generated datasets is invariant to the mode
//! and to worker completion order. Each replicate's stream state is captured
//! immediately before its first draw and kept on the result record, so any
//! replicate's dataset can be regenerated exactly later.

use crate::dataset::build_dataset;
use crate::exposure::ExposureWindowSampler;
use crate::generate::{
    simulate_daily_outcome_cohort, simulate_event_allocation_cohort, DailyOutcomeSampler,
    EventAllocator,
};
use crate::rng::{ReplicateRng, RngState};
use rayon::prelude::*;
use sccs_core::{Error, FitResult, Result, SccsDataset, SccsFitter};
use serde::{Deserialize, Serialize};

/// Which stochastic data-generating mechanism to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerativeModel {
    /// Model A: all subjects exposed; zero-truncated Poisson total split
    /// between periods by a multinomial draw.
    #[serde(rename = "A", alias = "event_allocation")]
    EventAllocation,
    /// Model B: exposure with probability 0.8; independent daily Bernoulli
    /// outcomes on the logistic scale.
    #[serde(rename = "B", alias = "daily_bernoulli")]
    DailyBernoulli,
}

/// Sequential or worker-pool execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Replicates processed in index order on the calling thread.
    Sequential,
    /// Replicates farmed out to a fixed-size Rayon pool.
    Parallel,
}

fn default_exposure_prob() -> f64 {
    0.8
}

fn default_confidence_level() -> f64 {
    0.95
}

/// Full configuration of a simulation study.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of subjects per replicate.
    pub n_subjects: u32,
    /// Observation period length in days; days run `1..=obs_time`.
    pub obs_time: u32,
    /// Baseline daily event rate, strictly in `(0, 1)`.
    pub baseline_rate: f64,
    /// True incidence-rate ratio (the target estimand), `> 0`.
    pub true_irr: f64,
    /// Risk-period length in days, strictly in `(0, obs_time)`.
    pub risk_length: u32,
    /// Number of replicates, `>= 1`.
    pub n_replicates: usize,
    /// Data-generating mechanism.
    pub generative_model: GenerativeModel,
    /// Sequential or parallel execution.
    pub execution_mode: ExecutionMode,
    /// Master seed; replicate `i` uses stream `i`.
    pub seed: u64,
    /// Per-subject exposure probability (Model B only).
    #[serde(default = "default_exposure_prob")]
    pub exposure_prob: f64,
    /// Confidence level for the per-replicate Wald intervals.
    #[serde(default = "default_confidence_level")]
    pub confidence_level: f64,
    /// Worker-pool size for parallel mode; `0` means available parallelism
    /// minus one (one unit reserved for the coordinator).
    #[serde(default)]
    pub n_workers: usize,
}

impl SimulationConfig {
    /// Validate the parameter combination. Called before any simulation work;
    /// all violations are configuration errors.
    pub fn validate(&self) -> Result<()> {
        if self.n_subjects == 0 {
            return Err(Error::Configuration("n_subjects must be > 0".to_string()));
        }
        if self.risk_length == 0 || self.risk_length >= self.obs_time {
            return Err(Error::Configuration(format!(
                "risk_length ({}) must be in (0, obs_time = {})",
                self.risk_length, self.obs_time
            )));
        }
        if !(self.baseline_rate.is_finite()
            && self.baseline_rate > 0.0
            && self.baseline_rate < 1.0)
        {
            return Err(Error::Configuration(format!(
                "baseline_rate must be in (0, 1), got {}",
                self.baseline_rate
            )));
        }
        if !(self.true_irr.is_finite() && self.true_irr > 0.0) {
            return Err(Error::Configuration(format!(
                "true_irr must be > 0, got {}",
                self.true_irr
            )));
        }
        if self.n_replicates == 0 {
            return Err(Error::Configuration("n_replicates must be >= 1".to_string()));
        }
        if !(self.exposure_prob.is_finite()
            && (0.0..=1.0).contains(&self.exposure_prob))
        {
            return Err(Error::Configuration(format!(
                "exposure_prob must be in [0, 1], got {}",
                self.exposure_prob
            )));
        }
        if !(self.confidence_level.is_finite()
            && self.confidence_level > 0.0
            && self.confidence_level < 1.0)
        {
            return Err(Error::Configuration(format!(
                "confidence_level must be in (0, 1), got {}",
                self.confidence_level
            )));
        }
        Ok(())
    }

    /// Parse and validate a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// True effect on the log scale, `ln(true_irr)`.
    pub fn log_true_effect(&self) -> f64 {
        self.true_irr.ln()
    }
}

/// Per-replicate result row: index, pre-draw stream state, and fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicateRecord {
    /// Replicate index, `0..n_replicates`.
    pub index: usize,
    /// Stream state captured immediately before this replicate's first draw.
    pub rng_state: RngState,
    /// Fitted result for this replicate's dataset.
    pub fit: FitResult,
}

/// Estimator performance aggregated over all replicates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateResult {
    /// Number of replicates aggregated.
    pub n_replicates: usize,
    /// Mean of the per-replicate IRR estimates.
    pub mean_irr: f64,
    /// Percentage bias of the mean IRR relative to the true IRR.
    pub pct_bias: f64,
    /// Empirical standard error: sample SD of the log estimates.
    /// `NaN` with fewer than two replicates.
    pub empirical_se: f64,
    /// Fraction of replicates whose CI contains the true IRR.
    pub ci_coverage: f64,
}

/// Everything a study run produces: the per-replicate table, the aggregate,
/// and wall time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    /// One record per replicate, in index order.
    pub replicates: Vec<ReplicateRecord>,
    /// Aggregated estimator performance.
    pub aggregate: AggregateResult,
    /// Total wall time in seconds.
    pub wall_s: f64,
}

/// Orchestrates N independent replicates against a fitter.
#[derive(Debug, Clone)]
pub struct ReplicationEngine {
    config: SimulationConfig,
}

impl ReplicationEngine {
    /// Create an engine from a validated configuration.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The engine's configuration.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Run all replicates and aggregate.
    ///
    /// Fail-fast: the first failing replicate aborts the batch and is
    /// surfaced as [`Error::Replicate`] with its index. Failed replicates are
    /// never dropped from the aggregate, and there are no retries since a
    /// replicate's failure is deterministic given its stream.
    pub fn run<F: SccsFitter>(&self, fitter: &F) -> Result<SimulationReport> {
        let start = std::time::Instant::now();
        let n = self.config.n_replicates;

        let mut replicates = match self.config.execution_mode {
            ExecutionMode::Sequential => {
                let mut records = Vec::with_capacity(n);
                for index in 0..n {
                    records.push(run_replicate(&self.config, fitter, index)?);
                }
                records
            }
            ExecutionMode::Parallel => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(self.worker_count())
                    .build()
                    .map_err(|e| {
                        Error::Configuration(format!("failed to create thread pool: {e}"))
                    })?;
                // collect() on a Result short-circuits: the first failure
                // cancels the remaining queue.
                pool.install(|| {
                    (0..n)
                        .into_par_iter()
                        .map(|index| run_replicate(&self.config, fitter, index))
                        .collect::<Result<Vec<_>>>()
                })?
            }
        };

        // Workers may finish in any order; key the aggregate on replicate
        // index so the index <-> state mapping stays deterministic.
        replicates.sort_by_key(|r| r.index);

        let aggregate = aggregate(&replicates, self.config.true_irr);
        Ok(SimulationReport { replicates, aggregate, wall_s: start.elapsed().as_secs_f64() })
    }

    /// Pool size: configured value, or available parallelism minus one.
    fn worker_count(&self) -> usize {
        if self.config.n_workers > 0 {
            self.config.n_workers
        } else {
            std::thread::available_parallelism()
                .map(|p| p.get().saturating_sub(1))
                .unwrap_or(1)
                .max(1)
        }
    }
}

/// Run one replicate: capture stream state, generate, build, fit.
fn run_replicate<F: SccsFitter>(
    config: &SimulationConfig,
    fitter: &F,
    index: usize,
) -> Result<ReplicateRecord> {
    let mut rng = ReplicateRng::for_replicate(config.seed, index as u64);
    // Captured before any stochastic draw, so replay reproduces exactly this
    // replicate's dataset.
    let rng_state = rng.capture_state();

    let dataset =
        generate_dataset(config, &mut rng).map_err(|e| e.in_replicate(index))?;
    let fit = fitter.fit(&dataset).map_err(|e| e.in_replicate(index))?;

    Ok(ReplicateRecord { index, rng_state, fit })
}

/// Generate one replicate's dataset from an explicit stream.
pub fn generate_dataset(config: &SimulationConfig, rng: &mut ReplicateRng) -> Result<SccsDataset> {
    let sampler = ExposureWindowSampler::new(config.obs_time, config.risk_length)?;
    let histories = match config.generative_model {
        GenerativeModel::EventAllocation => {
            let allocator = EventAllocator::new(
                config.baseline_rate,
                config.log_true_effect(),
                config.obs_time,
                config.risk_length,
            )?;
            simulate_event_allocation_cohort(rng, config.n_subjects, &sampler, &allocator)?
        }
        GenerativeModel::DailyBernoulli => {
            let outcomes = DailyOutcomeSampler::new(
                config.baseline_rate,
                config.log_true_effect(),
                config.obs_time,
            )?;
            simulate_daily_outcome_cohort(
                rng,
                config.n_subjects,
                config.exposure_prob,
                &sampler,
                &outcomes,
            )?
        }
    };
    build_dataset(&histories, 1, config.obs_time)
}

/// Regenerate a replicate's dataset from its captured stream state, for
/// diagnostic inspection of a recorded replicate.
pub fn regenerate(config: &SimulationConfig, state: &RngState) -> Result<SccsDataset> {
    config.validate()?;
    let mut rng = state.restore();
    generate_dataset(config, &mut rng)
}

/// Aggregate per-replicate fits into performance statistics.
fn aggregate(replicates: &[ReplicateRecord], true_irr: f64) -> AggregateResult {
    let n = replicates.len();
    let mean_irr = replicates.iter().map(|r| r.fit.irr).sum::<f64>() / n as f64;
    let pct_bias = 100.0 * (mean_irr - true_irr) / true_irr;

    let mean_log =
        replicates.iter().map(|r| r.fit.log_estimate).sum::<f64>() / n as f64;
    let empirical_se = if n >= 2 {
        let ss: f64 = replicates
            .iter()
            .map(|r| {
                let d = r.fit.log_estimate - mean_log;
                d * d
            })
            .sum();
        (ss / (n - 1) as f64).sqrt()
    } else {
        f64::NAN
    };

    let covered = replicates.iter().filter(|r| r.fit.ci_contains(true_irr)).count();
    let ci_coverage = covered as f64 / n as f64;

    AggregateResult { n_replicates: n, mean_irr, pct_bias, empirical_se, ci_coverage }
}
