//! Profile file support for alarmsim
//!
//! A profile is a TOML file describing one analysis: which metric to fetch,
//! over which window, which alarm rule to replay and how to print the result.
//! Any value can be overridden from the command line with `--set key=value`.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use alarmsim_core::TriggerRule;
use alarmsim_source::{CloudWatchOptions, Dimension, MetricQuery};

use crate::output::OutputFormat;

/// Top-level profile configuration
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ProfileConfig {
    pub metric: MetricConfig,
    pub window: WindowConfig,
    pub trigger: TriggerConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Metric to fetch
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct MetricConfig {
    /// Namespace, e.g. "AWS/RDS"
    pub namespace: String,
    /// Metric name, e.g. "CPUUtilization"
    pub name: String,
    pub dimension: DimensionConfig,
    /// Aggregation period: whole seconds (`300`) or a duration string (`"5m"`)
    #[serde(
        serialize_with = "humantime_serde::serialize",
        deserialize_with = "period::deserialize",
        default = "default_period"
    )]
    #[schemars(with = "String")]
    pub period: Duration,
    /// Average, Sum, Minimum, Maximum, SampleCount or a percentile like p99
    #[serde(default = "default_statistic")]
    pub statistic: String,
}

fn default_period() -> Duration {
    alarmsim_source::DEFAULT_PERIOD
}

mod period {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PeriodRepr {
        Seconds(u64),
        Text(#[serde(with = "humantime_serde")] Duration),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(match PeriodRepr::deserialize(deserializer)? {
            PeriodRepr::Seconds(secs) => Duration::from_secs(secs),
            PeriodRepr::Text(duration) => duration,
        })
    }
}

fn default_statistic() -> String {
    alarmsim_source::DEFAULT_STATISTIC.to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct DimensionConfig {
    pub name: String,
    pub value: String,
}

/// Time window, RFC 3339 timestamps; `end` is exclusive
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct WindowConfig {
    #[schemars(with = "String")]
    pub start: DateTime<FixedOffset>,
    #[schemars(with = "String")]
    pub end: DateTime<FixedOffset>,
}

/// Alarm rule to replay
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct TriggerConfig {
    /// Datapoints greater than or equal to this value are breaches
    pub threshold: f64,
    /// Consecutive breaching datapoints needed to fire
    pub consecutive_hits: usize,
}

/// Where datapoints come from
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceConfig {
    Cloudwatch {
        /// Region override (defaults to the shared AWS config)
        #[serde(default)]
        region: Option<String>,
        /// Named profile from the shared AWS config
        #[serde(default)]
        profile: Option<String>,
    },
    /// Replay a CSV or JSON export instead of calling CloudWatch
    File { path: PathBuf },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Cloudwatch { region: None, profile: None }
    }
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    /// Write the JSON report here instead of stdout
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Colour the table (also disabled by NO_COLOR)
    #[serde(default = "default_color")]
    pub color: bool,
    /// Render timestamps in UTC instead of local time
    #[serde(default)]
    pub utc: bool,
}

fn default_color() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { format: OutputFormat::default(), file: None, color: default_color(), utc: false }
    }
}

impl ProfileConfig {
    /// Load profile from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile: {}", path.display()))?;

        let config: ProfileConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse profile: {}", path.display()))?;

        Ok(config)
    }

    /// Load profile from TOML file, apply `--set` overrides, then validate
    pub fn from_file_with_overrides<P: AsRef<Path>>(path: P, overrides: &[String]) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile: {}", path.display()))?;

        let mut value: toml::Value = toml::from_str(&content)
            .with_context(|| format!("Failed to parse profile: {}", path.display()))?;

        for override_str in overrides {
            let (key, val) = split_override(override_str)?;
            set_dotted(&mut value, key, val)
                .with_context(|| format!("Failed to apply override: {}", override_str))?;
        }

        let config: ProfileConfig =
            value.try_into().context("Failed to deserialize profile after overrides")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.metric.dimension.value.is_empty() {
            bail!("Dimension value cannot be empty");
        }

        // Namespace, names, window, period and statistic
        self.to_query().validate().context("Invalid metric query")?;

        self.to_rule().context("Invalid trigger")?;

        if let SourceConfig::File { path } = &self.source {
            if path.as_os_str().is_empty() {
                bail!("File source path cannot be empty");
            }
        }

        if self.output.file.is_some() && self.output.format != OutputFormat::Json {
            bail!("output.file is only supported with format = \"json\"");
        }

        Ok(())
    }

    pub fn to_query(&self) -> MetricQuery {
        MetricQuery::new(
            &self.metric.namespace,
            &self.metric.name,
            Dimension::new(&self.metric.dimension.name, &self.metric.dimension.value),
            self.window.start.with_timezone(&Utc),
            self.window.end.with_timezone(&Utc),
        )
        .with_period(self.metric.period)
        .with_statistic(&self.metric.statistic)
    }

    pub fn to_rule(&self) -> alarmsim_core::Result<TriggerRule> {
        TriggerRule::new(self.trigger.threshold, self.trigger.consecutive_hits)
    }
}

impl SourceConfig {
    pub fn cloudwatch_options(&self) -> Option<CloudWatchOptions> {
        match self {
            SourceConfig::Cloudwatch { region, profile } => {
                Some(CloudWatchOptions { region: region.clone(), profile: profile.clone() })
            }
            SourceConfig::File { .. } => None,
        }
    }
}

/// Split "key=value" at the first '='
fn split_override(override_str: &str) -> Result<(&str, &str)> {
    match override_str.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => bail!("Invalid override format '{}'. Expected 'key=value'", override_str),
    }
}

/// Set `value_str` at a dot-separated path of table keys, creating tables as needed
fn set_dotted(root: &mut toml::Value, path: &str, value_str: &str) -> Result<()> {
    let keys: Vec<&str> = path.split('.').filter(|key| !key.is_empty()).collect();
    let Some((last, parents)) = keys.split_last() else {
        bail!("Empty path");
    };

    let mut current = root;
    for key in parents {
        let toml::Value::Table(table) = current else {
            bail!("Cannot navigate through non-table value at key '{}'", key);
        };
        current =
            table.entry(key.to_string()).or_insert(toml::Value::Table(Default::default()));
    }

    let toml::Value::Table(table) = current else {
        bail!("Cannot set key '{}' on non-table value", last);
    };
    table.insert(last.to_string(), infer_value(value_str));
    Ok(())
}

/// Infer a TOML value from override text: bool, integer, float, else string
fn infer_value(value_str: &str) -> toml::Value {
    let trimmed = value_str.trim();

    match trimmed {
        "true" => return toml::Value::Boolean(true),
        "false" => return toml::Value::Boolean(false),
        _ => {}
    }

    if let Ok(int_val) = trimmed.parse::<i64>() {
        return toml::Value::Integer(int_val);
    }
    if let Ok(float_val) = trimmed.parse::<f64>() {
        return toml::Value::Float(float_val);
    }

    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| trimmed.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
        .unwrap_or(trimmed);
    toml::Value::String(unquoted.to_string())
}
