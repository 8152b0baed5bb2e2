//! Common data types for SCCS simulation studies.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A single row of the canonical SCCS long-format dataset, viewed by value.
///
/// One row per (subject, event-day) pair; the owning subject's observation and
/// exposure windows are denormalized onto every row for the estimator's input
/// contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRow {
    /// Subject identifier, unique within a dataset.
    pub subject_id: u32,
    /// First day of the observation window (inclusive).
    pub obs_start: u32,
    /// Last day of the observation window (inclusive).
    pub obs_end: u32,
    /// Exposure window `(start, end)`, inclusive; `None` for unexposed subjects.
    pub exposure: Option<(u32, u32)>,
    /// Day of the event, within the observation window.
    pub event_day: u32,
}

/// Canonical SCCS dataset in columnar long format.
///
/// Event-only: a subject with zero events contributes no row. Rows for a given
/// subject are stored contiguously with event days ascending.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SccsDataset {
    subject_id: Vec<u32>,
    obs_start: Vec<u32>,
    obs_end: Vec<u32>,
    exposure: Vec<Option<(u32, u32)>>,
    event_day: Vec<u32>,
}

impl SccsDataset {
    /// Create an empty dataset with row capacity reserved up front.
    pub fn with_capacity(n_rows: usize) -> Self {
        Self {
            subject_id: Vec::with_capacity(n_rows),
            obs_start: Vec::with_capacity(n_rows),
            obs_end: Vec::with_capacity(n_rows),
            exposure: Vec::with_capacity(n_rows),
            event_day: Vec::with_capacity(n_rows),
        }
    }

    /// Append one event row after checking the row-level invariants:
    /// `obs_start <= event_day <= obs_end`, and when an exposure window is
    /// present, `obs_start <= exposure_start <= exposure_end <= obs_end`.
    pub fn push_row(&mut self, row: EventRow) -> Result<()> {
        if row.obs_start > row.obs_end {
            return Err(Error::Domain(format!(
                "subject {}: observation window [{}, {}] is empty",
                row.subject_id, row.obs_start, row.obs_end
            )));
        }
        if row.event_day < row.obs_start || row.event_day > row.obs_end {
            return Err(Error::Domain(format!(
                "subject {}: event day {} outside observation window [{}, {}]",
                row.subject_id, row.event_day, row.obs_start, row.obs_end
            )));
        }
        if let Some((start, end)) = row.exposure {
            if start > end || start < row.obs_start || end > row.obs_end {
                return Err(Error::Domain(format!(
                    "subject {}: exposure window [{}, {}] invalid for observation [{}, {}]",
                    row.subject_id, start, end, row.obs_start, row.obs_end
                )));
            }
        }
        self.subject_id.push(row.subject_id);
        self.obs_start.push(row.obs_start);
        self.obs_end.push(row.obs_end);
        self.exposure.push(row.exposure);
        self.event_day.push(row.event_day);
        Ok(())
    }

    /// Number of rows (= total events).
    pub fn len(&self) -> usize {
        self.event_day.len()
    }

    /// True when the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.event_day.is_empty()
    }

    /// Row `i` by value.
    ///
    /// # Panics
    /// Panics if `i >= len()`.
    pub fn row(&self, i: usize) -> EventRow {
        EventRow {
            subject_id: self.subject_id[i],
            obs_start: self.obs_start[i],
            obs_end: self.obs_end[i],
            exposure: self.exposure[i],
            event_day: self.event_day[i],
        }
    }

    /// Iterate over all rows.
    pub fn rows(&self) -> impl Iterator<Item = EventRow> + '_ {
        (0..self.len()).map(|i| self.row(i))
    }

    /// Subject-id column.
    pub fn subject_ids(&self) -> &[u32] {
        &self.subject_id
    }

    /// Event-day column.
    pub fn event_days(&self) -> &[u32] {
        &self.event_day
    }
}

/// Result of fitting the conditional Poisson regression to one dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitResult {
    /// Point estimate of the log incidence-rate ratio.
    pub log_estimate: f64,
    /// Standard error of the log estimate (observed-information scale).
    pub standard_error: f64,
    /// Incidence-rate ratio, `exp(log_estimate)`.
    pub irr: f64,
    /// Lower confidence bound for the IRR.
    pub ci_lower: f64,
    /// Upper confidence bound for the IRR.
    pub ci_upper: f64,
    /// Total number of events in the fitted dataset.
    pub event_count: u64,
    /// Whether the solver met its convergence tolerance.
    pub converged: bool,
    /// Number of solver iterations used.
    pub n_iter: usize,
}

impl FitResult {
    /// Whether the confidence interval contains the given IRR.
    pub fn ci_contains(&self, irr: f64) -> bool {
        self.ci_lower <= irr && irr <= self.ci_upper
    }
}
