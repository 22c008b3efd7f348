//! CloudWatch `GetMetricData` source

use alarmsim_core::{MetricSample, MetricSeries};
use aws_sdk_cloudwatch::config::Region;
use aws_sdk_cloudwatch::error::DisplayErrorContext;
use aws_sdk_cloudwatch::primitives::DateTime as AwsDateTime;
use aws_sdk_cloudwatch::types::{Dimension, Metric, MetricDataQuery, MetricStat};
use aws_sdk_cloudwatch::Client;
use chrono::{DateTime, Utc};
use tokio::runtime::Runtime;

use crate::{DatapointSource, Error, MetricQuery, Result};

/// Overrides applied on top of the shared AWS configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloudWatchOptions {
    pub region: Option<String>,
    /// Named profile from the shared config/credentials files
    pub profile: Option<String>,
}

/// Fetches a single series with `GetMetricData`
pub struct CloudWatchSource {
    runtime: Runtime,
    client: Client,
}

impl CloudWatchSource {
    /// Load the shared AWS configuration and build a client
    pub fn new(options: CloudWatchOptions) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;

        let client = runtime.block_on(async move {
            let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
            if let Some(region) = options.region {
                loader = loader.region(Region::new(region));
            }
            if let Some(profile) = options.profile {
                loader = loader.profile_name(profile);
            }
            Client::new(&loader.load().await)
        });

        Ok(Self { runtime, client })
    }

    async fn fetch_pages(&self, query: &MetricQuery) -> Result<Vec<MetricSample>> {
        let request = build_query(query);

        let mut pages = self
            .client
            .get_metric_data()
            .metric_data_queries(request)
            .start_time(to_aws(query.start))
            .end_time(to_aws(query.end))
            .into_paginator()
            .send();

        let mut samples = Vec::new();
        let mut page_count = 0usize;
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| Error::Fetch(DisplayErrorContext(&e).to_string()))?;
            page_count += 1;

            for result in page.metric_data_results() {
                let timestamps = result.timestamps();
                let values = result.values();
                if timestamps.len() != values.len() {
                    return Err(Error::Parse(format!(
                        "Result '{}' has {} timestamps but {} values",
                        result.id().unwrap_or_default(),
                        timestamps.len(),
                        values.len()
                    )));
                }
                for (timestamp, value) in timestamps.iter().zip(values) {
                    samples.push(MetricSample::new(from_aws(timestamp)?, *value));
                }
            }
            tracing::debug!("Fetched page {} ({} datapoints so far)", page_count, samples.len());
        }

        Ok(samples)
    }
}

impl DatapointSource for CloudWatchSource {
    fn name(&self) -> &'static str {
        "cloudwatch"
    }

    fn fetch(&self, query: &MetricQuery) -> Result<MetricSeries> {
        query.validate()?;
        tracing::info!(
            "Querying {}/{} {}={} from {} to {}",
            query.namespace,
            query.metric_name,
            query.dimension.name,
            query.dimension.value,
            query.start,
            query.end
        );

        let samples = self.runtime.block_on(self.fetch_pages(query))?;
        let mut series = MetricSeries::from_unordered(samples);

        let dropped = series.retain_window(query.start, query.end);
        if dropped > 0 {
            tracing::warn!("Dropped {} datapoints outside the query window", dropped);
        }
        Ok(series)
    }
}

/// Build the single `MetricDataQuery` for `query`
fn build_query(query: &MetricQuery) -> MetricDataQuery {
    let dimension =
        Dimension::builder().name(&query.dimension.name).value(&query.dimension.value).build();

    let metric = Metric::builder()
        .namespace(&query.namespace)
        .metric_name(&query.metric_name)
        .dimensions(dimension)
        .build();

    let stat = MetricStat::builder()
        .metric(metric)
        .period(query.period_secs())
        .stat(&query.statistic)
        .build();

    MetricDataQuery::builder()
        .id(query_id(&query.metric_name))
        .metric_stat(stat)
        .return_data(true)
        .build()
}

/// Query ids must start with a lowercase letter and hold only `[a-zA-Z0-9_]`
fn query_id(metric_name: &str) -> String {
    let sanitized: String = metric_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    format!("query{}", sanitized)
}

fn to_aws(timestamp: DateTime<Utc>) -> AwsDateTime {
    AwsDateTime::from_secs_and_nanos(timestamp.timestamp(), timestamp.timestamp_subsec_nanos())
}

fn from_aws(timestamp: &AwsDateTime) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp.secs(), timestamp.subsec_nanos())
        .ok_or_else(|| Error::Parse(format!("Timestamp out of range: {:?}", timestamp)))
}
