//! Replay of exported series from local files
//!
//! Two layouts are accepted, picked by file extension:
//!
//! - `.csv` with a `timestamp,value` header and RFC 3339 timestamps
//! - `.json` holding either an array of `{"timestamp": .., "value": ..}`
//!   objects or the document printed by `aws cloudwatch get-metric-data`

use std::path::{Path, PathBuf};

use alarmsim_core::{MetricSample, MetricSeries};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{DatapointSource, Error, MetricQuery, Result};

/// Reads a previously exported series from disk
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonSeries {
    Samples(Vec<MetricSample>),
    GetMetricData(GetMetricDataExport),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetMetricDataExport {
    metric_data_results: Vec<ExportedResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ExportedResult {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    timestamps: Vec<DateTime<Utc>>,
    #[serde(default)]
    values: Vec<f64>,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every sample in the file, in file order
    pub fn read_samples(&self) -> Result<Vec<MetricSample>> {
        let extension = self
            .path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("csv") => self.read_csv(),
            Some("json") => self.read_json(),
            _ => Err(Error::Config(format!(
                "Unsupported series file '{}': expected a .csv or .json extension",
                self.path.display()
            ))),
        }
    }

    fn read_csv(&self) -> Result<Vec<MetricSample>> {
        let mut reader = csv::Reader::from_path(&self.path).map_err(|e| {
            Error::Parse(format!("Failed to open CSV file {}: {}", self.path.display(), e))
        })?;

        let mut samples = Vec::new();
        for (line_num, row) in reader.deserialize().enumerate() {
            let sample: MetricSample = row.map_err(|e| {
                Error::Parse(format!(
                    "Failed to parse CSV line {} in file {}: {}",
                    line_num + 2,
                    self.path.display(),
                    e
                ))
            })?;
            samples.push(sample);
        }
        Ok(samples)
    }

    fn read_json(&self) -> Result<Vec<MetricSample>> {
        let content = std::fs::read_to_string(&self.path)?;
        let parsed: JsonSeries = serde_json::from_str(&content).map_err(|e| {
            Error::Parse(format!("Failed to parse JSON file {}: {}", self.path.display(), e))
        })?;

        match parsed {
            JsonSeries::Samples(samples) => Ok(samples),
            JsonSeries::GetMetricData(export) => {
                let mut samples = Vec::new();
                for result in export.metric_data_results {
                    if result.timestamps.len() != result.values.len() {
                        return Err(Error::Parse(format!(
                            "Result '{}' has {} timestamps but {} values",
                            result.id.unwrap_or_default(),
                            result.timestamps.len(),
                            result.values.len()
                        )));
                    }
                    samples.extend(
                        result
                            .timestamps
                            .into_iter()
                            .zip(result.values)
                            .map(|(timestamp, value)| MetricSample::new(timestamp, value)),
                    );
                }
                Ok(samples)
            }
        }
    }
}

impl DatapointSource for FileSource {
    fn name(&self) -> &'static str {
        "file"
    }

    fn fetch(&self, query: &MetricQuery) -> Result<MetricSeries> {
        if query.end <= query.start {
            return Err(Error::Config(format!(
                "End time {} must be after start time {}",
                query.end, query.start
            )));
        }

        let samples = self.read_samples()?;
        tracing::debug!("Read {} datapoints from {}", samples.len(), self.path.display());

        let mut series = MetricSeries::from_unordered(samples);
        let dropped = series.retain_window(query.start, query.end);
        if dropped > 0 {
            tracing::warn!("Dropped {} datapoints outside the query window", dropped);
        }
        Ok(series)
    }
}
