//! Metric samples and chronologically ordered series

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single metric datapoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl MetricSample {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// A series of samples in strictly ascending timestamp order
///
/// Sources may hand back datapoints newest-first, in page order, or with the
/// same timestamp repeated across pages. `MetricSeries` is the only way the
/// CLI hands samples to the simulator, so the ordering precondition of
/// [`crate::simulate`] holds by construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetricSeries {
    samples: Vec<MetricSample>,
}

impl MetricSeries {
    /// Sort ascending by timestamp and drop repeated timestamps
    ///
    /// The sort is stable, so when a timestamp appears more than once the
    /// occurrence that came first in `samples` is kept.
    pub fn from_unordered(mut samples: Vec<MetricSample>) -> Self {
        samples.sort_by_key(|sample| sample.timestamp);

        let before = samples.len();
        samples.dedup_by_key(|sample| sample.timestamp);
        let dropped = before - samples.len();
        if dropped > 0 {
            tracing::warn!("Dropped {} datapoints with duplicate timestamps", dropped);
        }

        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Oldest sample
    pub fn first(&self) -> Option<&MetricSample> {
        self.samples.first()
    }

    /// Newest sample
    pub fn last(&self) -> Option<&MetricSample> {
        self.samples.last()
    }

    pub fn as_slice(&self) -> &[MetricSample] {
        &self.samples
    }

    /// Sample values in chronological order
    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|sample| sample.value).collect()
    }

    /// Keep only samples inside `[start, end)`
    pub fn retain_window(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> usize {
        let before = self.samples.len();
        self.samples.retain(|sample| sample.timestamp >= start && sample.timestamp < end);
        before - self.samples.len()
    }

    pub fn into_inner(self) -> Vec<MetricSample> {
        self.samples
    }
}

impl From<Vec<MetricSample>> for MetricSeries {
    fn from(samples: Vec<MetricSample>) -> Self {
        Self::from_unordered(samples)
    }
}
