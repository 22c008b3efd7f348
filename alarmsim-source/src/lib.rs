//! alarmsim datapoint sources
//!
//! A source turns a [`MetricQuery`] into a chronological [`MetricSeries`].
//! Two sources are provided:
//!
//! - **CloudWatch**: `GetMetricData` against the AWS API, all pages assembled
//! - **File**: replay of a series exported earlier, as CSV or JSON
//!
//! The [`DatapointSource`] trait is blocking. The CloudWatch source drives the
//! async SDK on its own current-thread runtime, so callers never need one.
//!
//! ```rust,no_run
//! use alarmsim_source::{DatapointSource, Dimension, FileSource, MetricQuery};
//! use chrono::{TimeZone, Utc};
//!
//! let query = MetricQuery::new(
//!     "AWS/RDS",
//!     "CPUUtilization",
//!     Dimension::new("DBInstanceIdentifier", "my-rds-instance-1"),
//!     Utc.with_ymd_and_hms(2021, 2, 20, 0, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2021, 2, 25, 0, 0, 0).unwrap(),
//! );
//!
//! let source = FileSource::new("cpu.csv");
//! let series = source.fetch(&query).unwrap();
//! println!("{} datapoints", series.len());
//! ```

use std::time::Duration;

use alarmsim_core::MetricSeries;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod cloudwatch;
pub mod file;

pub use cloudwatch::{CloudWatchOptions, CloudWatchSource};
pub use file::FileSource;

/// Result type for source operations
pub type Result<T> = std::result::Result<T, Error>;

/// Datapoint source error types
#[derive(Debug, Error)]
pub enum Error {
    /// I/O errors reading local files or starting the runtime
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Query or source configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The remote service rejected or failed the request
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Malformed datapoint data
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Default aggregation period, matching the finest standard CloudWatch resolution
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(60);

/// Default statistic
pub const DEFAULT_STATISTIC: &str = "Average";

const STANDARD_STATISTICS: [&str; 5] = ["Average", "Sum", "Minimum", "Maximum", "SampleCount"];

/// A metric dimension filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

/// One metric, one dimension, over `[start, end)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricQuery {
    pub namespace: String,
    pub metric_name: String,
    pub dimension: Dimension,
    pub start: DateTime<Utc>,
    /// Exclusive upper bound
    pub end: DateTime<Utc>,
    #[serde(with = "period_secs")]
    pub period: Duration,
    pub statistic: String,
}

impl MetricQuery {
    pub fn new(
        namespace: impl Into<String>,
        metric_name: impl Into<String>,
        dimension: Dimension,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            metric_name: metric_name.into(),
            dimension,
            start,
            end,
            period: DEFAULT_PERIOD,
            statistic: DEFAULT_STATISTIC.to_string(),
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn with_statistic(mut self, statistic: impl Into<String>) -> Self {
        self.statistic = statistic.into();
        self
    }

    /// Whole seconds in the aggregation period
    pub fn period_secs(&self) -> i32 {
        i32::try_from(self.period.as_secs()).unwrap_or(i32::MAX)
    }

    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(Error::Config("Namespace cannot be empty".to_string()));
        }
        if self.metric_name.is_empty() {
            return Err(Error::Config("Metric name cannot be empty".to_string()));
        }
        if self.dimension.name.is_empty() {
            return Err(Error::Config("Dimension name cannot be empty".to_string()));
        }
        if self.end <= self.start {
            return Err(Error::Config(format!(
                "End time {} must be after start time {}",
                self.end, self.start
            )));
        }
        if self.period.as_secs() == 0 || self.period.subsec_nanos() != 0 {
            return Err(Error::Config(format!(
                "Period must be a positive whole number of seconds, got {:?}",
                self.period
            )));
        }
        if !is_valid_statistic(&self.statistic) {
            return Err(Error::Config(format!(
                "Invalid statistic '{}'. Valid options: {}, or a percentile such as p99",
                self.statistic,
                STANDARD_STATISTICS.join(", ")
            )));
        }
        Ok(())
    }
}

/// Standard statistics plus `pNN` / `pNN.N` extended percentiles
pub fn is_valid_statistic(statistic: &str) -> bool {
    if STANDARD_STATISTICS.contains(&statistic) {
        return true;
    }
    let Some(rest) = statistic.strip_prefix('p') else {
        return false;
    };
    if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return false;
    }
    matches!(rest.parse::<f64>(), Ok(p) if (0.0..=100.0).contains(&p))
}

/// A provider of metric datapoints
///
/// Implementations return every datapoint of the query window, sorted
/// ascending and deduplicated by timestamp.
pub trait DatapointSource {
    /// Short name used in log output
    fn name(&self) -> &'static str;

    /// Fetch the full series for `query`
    fn fetch(&self, query: &MetricQuery) -> Result<MetricSeries>;
}

impl<S: DatapointSource + ?Sized> DatapointSource for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn fetch(&self, query: &MetricQuery) -> Result<MetricSeries> {
        (**self).fetch(query)
    }
}

mod period_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(period: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(period.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn query() -> MetricQuery {
        MetricQuery::new(
            "AWS/RDS",
            "CPUUtilization",
            Dimension::new("DBInstanceIdentifier", "db-1"),
            Utc.with_ymd_and_hms(2021, 2, 20, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2021, 2, 21, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_query_defaults() {
        let q = query();
        assert_eq!(q.period, Duration::from_secs(60));
        assert_eq!(q.period_secs(), 60);
        assert_eq!(q.statistic, "Average");
        assert!(q.validate().is_ok());
    }

    #[test]
    fn test_query_rejects_inverted_window() {
        let mut q = query();
        q.end = q.start;
        let err = q.validate().unwrap_err();
        assert!(err.to_string().contains("must be after start time"));
    }

    #[test]
    fn test_query_rejects_fractional_period() {
        let q = query().with_period(Duration::from_millis(1500));
        assert!(q.validate().is_err());
        let q = query().with_period(Duration::ZERO);
        assert!(q.validate().is_err());
    }

    #[test]
    fn test_query_rejects_empty_names() {
        let mut q = query();
        q.namespace.clear();
        assert!(q.validate().is_err());

        let mut q = query();
        q.metric_name.clear();
        assert!(q.validate().is_err());
    }

    #[test]
    fn test_statistic_validation() {
        for stat in ["Average", "Sum", "Minimum", "Maximum", "SampleCount", "p99", "p99.9", "p0"] {
            assert!(is_valid_statistic(stat), "{stat} should be valid");
        }
        for stat in ["average", "Mean", "p", "p101", "pxx", "p-1", ""] {
            assert!(!is_valid_statistic(stat), "{stat} should be invalid");
        }
        assert!(query().with_statistic("Median").validate().is_err());
    }
}
