use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use schemars::schema_for;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use alarmsim_cli::completions;
use alarmsim_cli::config::{OutputConfig, ProfileConfig, SourceConfig};
use alarmsim_cli::output::style::Palette;
use alarmsim_cli::output::{AnalysisReport, OutputFormat};
use alarmsim_core::{MetricSeries, TriggerRule};
use alarmsim_source::{
    CloudWatchOptions, CloudWatchSource, DatapointSource, Dimension, FileSource, MetricQuery,
};

/// alarmsim: replay metric history against an alarm rule
///
/// Fetches one CloudWatch metric over a time window and simulates an alarm
/// that fires once N consecutive datapoints meet or exceed a threshold.
///
/// Example usage:
///   alarmsim query AWS/RDS CPUUtilization DBInstanceIdentifier my-rds-instance-1 \
///       2021-02-20T00:00:00+01:00 2021-02-25T00:00:00+01:00 85.00 3
///   alarmsim run -P profiles/rds-cpu.toml --set trigger.threshold=90
///   alarmsim replay --input cpu.csv --threshold 85 --hits 3
#[derive(Parser)]
#[command(name = "alarmsim")]
#[command(version, about = "Simulate alarm triggers over CloudWatch metric history", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a metric from CloudWatch and simulate the alarm
    Query {
        /// Metric namespace, e.g. AWS/RDS
        namespace: String,
        /// Metric name, e.g. CPUUtilization
        metric_name: String,
        /// Dimension name, e.g. DBInstanceIdentifier
        dimension_name: String,
        /// Dimension value, e.g. my-rds-instance-1
        dimension_value: String,
        /// Window start, RFC 3339
        start: String,
        /// Window end (exclusive), RFC 3339
        end: String,
        /// Datapoints >= threshold count as breaches
        #[arg(allow_hyphen_values = true)]
        threshold: String,
        /// Consecutive breaches needed to fire
        #[arg(allow_hyphen_values = true)]
        consecutive_hits: String,

        #[command(flatten)]
        fetch: FetchArgs,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Run an analysis described by a TOML profile
    Run {
        /// Path to TOML profile (REQUIRED)
        #[arg(short = 'P', long, required = true)]
        profile: PathBuf,

        /// Override any profile value using dot notation (can be specified multiple times)
        ///
        /// Examples:
        ///   --set trigger.threshold=90
        ///   --set trigger.consecutive_hits=5
        ///   --set metric.period=300
        ///   --set window.start=2021-02-21T00:00:00Z
        ///   --set source.region=eu-west-1
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Simulate the alarm over a CSV or JSON export instead of calling CloudWatch
    Replay {
        /// Series file (.csv with timestamp,value or .json)
        #[arg(short, long)]
        input: PathBuf,

        /// Datapoints >= threshold count as breaches
        #[arg(short, long, allow_negative_numbers = true)]
        threshold: f64,

        /// Consecutive breaches needed to fire
        #[arg(long)]
        hits: usize,

        /// Ignore datapoints before this time (RFC 3339)
        #[arg(long)]
        start: Option<String>,

        /// Ignore datapoints at or after this time (RFC 3339)
        #[arg(long)]
        end: Option<String>,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Generate JSON Schema for profile files
    Schema,

    /// List all valid config paths for --set flag (used by shell completions)
    #[command(hide = true)]
    CompletePaths,
}

#[derive(Args)]
struct FetchArgs {
    /// Aggregation period in seconds
    #[arg(long, default_value_t = 60)]
    period: u64,

    /// Statistic: Average, Sum, Minimum, Maximum, SampleCount or pNN
    #[arg(long, default_value = alarmsim_source::DEFAULT_STATISTIC)]
    statistic: String,

    /// AWS region (defaults to the shared AWS config)
    #[arg(long)]
    region: Option<String>,

    /// Named profile from the shared AWS config
    #[arg(long = "profile")]
    aws_profile: Option<String>,
}

#[derive(Args)]
struct RenderArgs {
    /// Report format
    #[arg(short = 'f', long, value_enum)]
    format: Option<OutputFormat>,

    /// Write the JSON report to this file (implies --format json)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Render timestamps in UTC instead of local time
    #[arg(long)]
    utc: bool,

    /// Disable colours
    #[arg(long)]
    no_color: bool,
}

impl RenderArgs {
    /// Layer command-line flags over profile output settings
    fn apply(self, mut output: OutputConfig) -> OutputConfig {
        if let Some(format) = self.format {
            output.format = format;
        }
        if let Some(file) = self.output {
            output.format = OutputFormat::Json;
            output.file = Some(file);
        }
        if self.utc {
            output.utc = true;
        }
        if self.no_color {
            output.color = false;
        }
        output
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; stdout carries the report
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match cli.command {
        Commands::Query {
            namespace,
            metric_name,
            dimension_name,
            dimension_value,
            start,
            end,
            threshold,
            consecutive_hits,
            fetch,
            render,
        } => {
            let rule = parse_rule(&threshold, &consecutive_hits)?;
            let query = MetricQuery::new(
                namespace,
                metric_name,
                Dimension::new(dimension_name, dimension_value),
                parse_time("start time", &start)?,
                parse_time("end time", &end)?,
            )
            .with_period(Duration::from_secs(fetch.period))
            .with_statistic(fetch.statistic);

            let source = CloudWatchSource::new(CloudWatchOptions {
                region: fetch.region,
                profile: fetch.aws_profile,
            })?;
            let output = render.apply(OutputConfig::default());
            fetch_and_report(&source, &query, rule, &output)
        }
        Commands::Run { profile, set, render } => run_profile(profile, set, render),
        Commands::Replay { input, threshold, hits, start, end, render } => {
            let rule = TriggerRule::new(threshold, hits)?;
            let start = start.map(|s| parse_time("start time", &s)).transpose()?;
            let end = end.map(|s| parse_time("end time", &s)).transpose()?;
            let output = render.apply(OutputConfig::default());
            replay(input, rule, start, end, &output)
        }
        Commands::Completions { shell } => {
            let bin_name = "alarmsim";
            if shell == Shell::Bash {
                println!("{}", completions::generate_bash_completion(bin_name));
            } else {
                let mut cmd = Cli::command();
                generate(shell, &mut cmd, bin_name, &mut io::stdout());
            }
            Ok(())
        }
        Commands::Schema => {
            let schema = schema_for!(ProfileConfig);
            let schema_json = serde_json::to_string_pretty(&schema)?;
            println!("{}", schema_json);
            Ok(())
        }
        Commands::CompletePaths => {
            for path in completions::get_config_paths() {
                println!("{}", path);
            }
            Ok(())
        }
    }
}

fn run_profile(profile: PathBuf, set: Vec<String>, render: RenderArgs) -> anyhow::Result<()> {
    tracing::info!("Loading profile: {}", profile.display());

    let config = if set.is_empty() {
        let config = ProfileConfig::from_file(&profile)?;
        config.validate()?;
        config
    } else {
        ProfileConfig::from_file_with_overrides(&profile, &set)?
    };

    let query = config.to_query();
    let rule = config.to_rule()?;
    let output = render.apply(config.output.clone());

    let source: Box<dyn DatapointSource> = match &config.source {
        SourceConfig::File { path } => Box::new(FileSource::new(path)),
        cloudwatch => Box::new(CloudWatchSource::new(
            cloudwatch.cloudwatch_options().unwrap_or_default(),
        )?),
    };
    fetch_and_report(source.as_ref(), &query, rule, &output)
}

fn fetch_and_report(
    source: &dyn DatapointSource,
    query: &MetricQuery,
    rule: TriggerRule,
    output: &OutputConfig,
) -> anyhow::Result<()> {
    let series = source
        .fetch(query)
        .with_context(|| format!("Failed to fetch datapoints from {}", source.name()))?;
    tracing::info!("{} datapoints received from {}", series.len(), source.name());

    let report =
        AnalysisReport::analyze(source.name(), &series, rule).with_window(query.start, query.end);
    emit(&report, output)
}

fn replay(
    input: PathBuf,
    rule: TriggerRule,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    output: &OutputConfig,
) -> anyhow::Result<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if end <= start {
            bail!("End time {} must be after start time {}", end, start);
        }
    }

    let source = FileSource::new(input);
    let samples = source
        .read_samples()
        .with_context(|| format!("Failed to read {}", source.path().display()))?;
    let mut series = MetricSeries::from_unordered(samples);

    if start.is_some() || end.is_some() {
        let dropped = series.retain_window(
            start.unwrap_or(DateTime::<Utc>::MIN_UTC),
            end.unwrap_or(DateTime::<Utc>::MAX_UTC),
        );
        tracing::info!("Dropped {} datapoints outside the window", dropped);
    }

    let mut report = AnalysisReport::analyze(source.name(), &series, rule);
    report.window_start = start;
    report.window_end = end;
    emit(&report, output)
}

fn emit(report: &AnalysisReport, output: &OutputConfig) -> anyhow::Result<()> {
    match output.format {
        OutputFormat::Table => report.print_human(&Palette::detect(output.color), output.utc),
        OutputFormat::Json => report.write_json(output.file.as_deref()),
    }
}

fn parse_time(label: &str, value: &str) -> anyhow::Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("Cannot parse {}: {}", label, value))?;
    Ok(parsed.with_timezone(&Utc))
}

/// Parse positional threshold and hit count the way they are typed on the command line
fn parse_rule(threshold: &str, consecutive_hits: &str) -> anyhow::Result<TriggerRule> {
    let threshold: f64 =
        threshold.parse().with_context(|| format!("Cannot parse threshold: {}", threshold))?;
    let hits: i64 = consecutive_hits
        .parse()
        .with_context(|| format!("Cannot parse consecutive hits: {}", consecutive_hits))?;
    let hits = usize::try_from(hits).map_err(|_| {
        alarmsim_core::Error::InvalidArgument(format!(
            "consecutive hits must be >= 1, got {}",
            hits
        ))
    })?;
    Ok(TriggerRule::new(threshold, hits)?)
}
