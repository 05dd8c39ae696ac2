//! Cleaning of a per-location observation series before windowing.

use crate::types::observation::{Observation, PreparedObservation};
use crate::types::required_fields::RequiredField;
use chrono::{DateTime, Utc};
use log::debug;
use std::collections::BTreeMap;

/// Counts of what preprocessing did to a series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreprocessReport {
    pub input: usize,
    pub duplicates: usize,
    pub incomplete: usize,
    pub kept: usize,
}

/// Sorts, deduplicates and filters a series of one location.
///
/// Observations are taken in ingestion order: for a repeated timestamp the one that
/// appears last wins. Rows missing any field in `required` are dropped; missing
/// precipitation is zero-filled and never causes a drop unless
/// [`RequiredField::PRECIPITATION`] is requested.
pub fn prepare_series(
    observations: &[Observation],
    required: RequiredField,
) -> (Vec<PreparedObservation>, PreprocessReport) {
    let mut by_time: BTreeMap<DateTime<Utc>, &Observation> = BTreeMap::new();
    for observation in observations {
        by_time.insert(observation.timestamp, observation);
    }

    let mut report = PreprocessReport {
        input: observations.len(),
        duplicates: observations.len() - by_time.len(),
        ..Default::default()
    };

    let prepared: Vec<PreparedObservation> = by_time
        .into_values()
        .filter(|observation| {
            let complete = observation.has_required_fields(required);
            if !complete {
                report.incomplete += 1;
            }
            complete
        })
        .map(PreparedObservation::from_observation)
        .collect();
    report.kept = prepared.len();

    debug!(
        "Preprocessed {} observations: {} duplicates, {} incomplete, {} kept",
        report.input, report.duplicates, report.incomplete, report.kept
    );
    (prepared, report)
}
