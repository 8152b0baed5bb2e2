//! Canonical dataset assembly.
//!
//! Turns either generator's [`SubjectHistory`] output into the long-format
//! SCCS schema: one row per (subject, event-day), with the subject's
//! observation and exposure windows denormalized onto every row. Rows are
//! pre-counted and the columns sized once, rather than grown row by row.

use crate::generate::SubjectHistory;
use sccs_core::{EventRow, Result, SccsDataset};

/// Build the canonical dataset from generated histories.
///
/// Subjects without events contribute no rows (SCCS datasets are event-only).
/// Row-level invariants (event and exposure windows inside the observation
/// window) are enforced during assembly.
pub fn build_dataset(
    histories: &[SubjectHistory],
    obs_start: u32,
    obs_end: u32,
) -> Result<SccsDataset> {
    let n_rows: usize = histories.iter().map(|h| h.event_days.len()).sum();
    let mut dataset = SccsDataset::with_capacity(n_rows);
    for subject in histories {
        for &day in &subject.event_days {
            dataset.push_row(EventRow {
                subject_id: subject.id,
                obs_start,
                obs_end,
                exposure: subject.exposure,
                event_day: day,
            })?;
        }
    }
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(id: u32, exposure: Option<(u32, u32)>, event_days: Vec<u32>) -> SubjectHistory {
        SubjectHistory { id, exposure, event_days }
    }

    #[test]
    fn test_one_row_per_event_zero_event_subjects_dropped() {
        let histories = vec![
            history(0, Some((10, 19)), vec![5, 12, 40]),
            history(1, None, vec![]),
            history(2, None, vec![33]),
        ];
        let data = build_dataset(&histories, 1, 100).unwrap();
        assert_eq!(data.len(), 4);
        assert_eq!(data.subject_ids(), &[0, 0, 0, 2]);
        assert_eq!(data.event_days(), &[5, 12, 40, 33]);
        assert_eq!(data.row(0).exposure, Some((10, 19)));
        assert_eq!(data.row(3).exposure, None);
    }

    #[test]
    fn test_window_denormalized_onto_rows() {
        let histories = vec![history(7, Some((3, 4)), vec![1, 9])];
        let data = build_dataset(&histories, 1, 10).unwrap();
        for row in data.rows() {
            assert_eq!(row.obs_start, 1);
            assert_eq!(row.obs_end, 10);
            assert_eq!(row.exposure, Some((3, 4)));
        }
    }

    #[test]
    fn test_out_of_window_event_rejected() {
        let histories = vec![history(0, None, vec![101])];
        assert!(build_dataset(&histories, 1, 100).is_err());
    }

    #[test]
    fn test_empty_cohort_builds_empty_dataset() {
        let data = build_dataset(&[], 1, 100).unwrap();
        assert!(data.is_empty());
    }
}
