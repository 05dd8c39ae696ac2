use crate::features::encoder::{FeatureEncoder, Sanitizer};
use crate::features::error::FeatureError;
use crate::types::condition::ConditionLabel;
use crate::types::observation::PreparedObservation;
use chrono::{DateTime, Utc};
use std::borrow::Cow;

/// One supervised example: the encoded history and what happened next.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub features: Vec<f64>,
    pub temperature: f64,
    pub condition: ConditionLabel,
    pub timestamp: DateTime<Utc>,
}

/// Slides a lag window over a prepared series.
///
/// For every index `i` with `i >= lag` and `i + 1 < len`, the window is the `lag`
/// records ending at and including `i`, and the target is record `i + 1`. The time
/// features are those of the target timestamp, which is also what the forecaster
/// encodes for the hour it predicts. A series of `len` records yields
/// `len - lag - 1` samples, or none when `len < lag + 2`.
///
/// The series is sorted by timestamp (dropping repeated timestamps, last one wins)
/// when it is not already strictly ascending. An encoding failure is returned rather
/// than dropping the sample.
pub fn build_samples(series: &[PreparedObservation], lag: usize) -> Result<Vec<Sample>, FeatureError> {
    let series = ensure_ordered(series);
    if series.len() < lag + 2 {
        return Ok(Vec::new());
    }

    let encoder = FeatureEncoder::with_lag(lag);
    let mut sanitizer = Sanitizer::new(encoder.schema().len());

    (lag..series.len() - 1)
        .map(|i| {
            let target = &series[i + 1];
            let window = &series[i + 1 - lag..=i];
            let mut features = encoder.encode(window, target.timestamp)?;
            sanitizer.sanitize(&mut features);
            Ok(Sample {
                features,
                temperature: target.values.temperature,
                condition: target.condition,
                timestamp: target.timestamp,
            })
        })
        .collect()
}

fn ensure_ordered(series: &[PreparedObservation]) -> Cow<'_, [PreparedObservation]> {
    if series.windows(2).all(|w| w[0].timestamp < w[1].timestamp) {
        return Cow::Borrowed(series);
    }
    let mut sorted = series.to_vec();
    sorted.sort_by_key(|record| record.timestamp);
    // After a stable sort the last ingested duplicate sits at the end of its run.
    let mut deduped: Vec<PreparedObservation> = Vec::with_capacity(sorted.len());
    for record in sorted {
        match deduped.last_mut() {
            Some(last) if last.timestamp == record.timestamp => *last = record,
            _ => deduped.push(record),
        }
    }
    Cow::Owned(deduped)
}
