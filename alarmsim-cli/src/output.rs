//! Results output formatting

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use alarmsim_core::{simulate, summarize, MetricSeries, Simulation, TriggerRule, ValueSummary};

pub mod style;
pub mod table;

use style::Palette;

/// Values, diffs and statistics are printed with two decimals
const PRECISION: usize = 2;

/// Report format
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Aligned, coloured table
    #[default]
    Table,
    /// Machine-readable report
    Json,
}

/// Everything one analysis produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Source the datapoints came from ("cloudwatch", "file")
    pub source: String,
    pub window_start: Option<DateTime<Utc>>,
    /// Exclusive
    pub window_end: Option<DateTime<Utc>>,
    pub rule: TriggerRule,
    pub datapoints: usize,
    pub first: Option<DateTime<Utc>>,
    pub last: Option<DateTime<Utc>>,
    /// Absent when no datapoints were received
    pub statistics: Option<ValueSummary>,
    pub simulation: Simulation,
}

impl AnalysisReport {
    /// Run the simulation and statistics over `series`
    pub fn analyze(source: &str, series: &MetricSeries, rule: TriggerRule) -> Self {
        let simulation = simulate(series.as_slice(), &rule);
        // summarize only fails on empty input, which is reported as no statistics
        let statistics = summarize(&series.values()).ok();

        Self {
            source: source.to_string(),
            window_start: None,
            window_end: None,
            rule,
            datapoints: series.len(),
            first: series.first().map(|sample| sample.timestamp),
            last: series.last().map(|sample| sample.timestamp),
            statistics,
            simulation,
        }
    }

    pub fn with_window(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.window_start = Some(start);
        self.window_end = Some(end);
        self
    }

    /// Human-readable report, as printed to the terminal
    pub fn render_human(&self, palette: &Palette, utc: bool) -> String {
        let mut lines = vec![
            format!("threshold: {:.*}", PRECISION, self.rule.threshold()),
            format!("necessary consecutive hits: {}", self.rule.required_consecutive_hits()),
        ];
        if let Some(start) = self.window_start {
            lines.push(format!("start:  {}", format_timestamp(start, utc)));
        }
        if let Some(end) = self.window_end {
            lines.push(format!("end:    {}", format_timestamp(end, utc)));
        }
        lines.push(String::new());

        lines.push(format!("{} datapoints received", self.datapoints));
        if let (Some(first), Some(last)) = (self.first, self.last) {
            lines.push(format!("first:  {}", format_timestamp(first, utc)));
            lines.push(format!("last:   {}", format_timestamp(last, utc)));
        }

        if let Some(stats) = &self.statistics {
            let num = |value: f64| palette.emphasis(&format!("{:.*}", PRECISION, value));
            lines.push(format!(
                "min: {}, max: {}, mean: {}, median: {}",
                num(stats.min),
                num(stats.max),
                num(stats.mean),
                num(stats.median)
            ));
            lines.push(format!(
                "p99: {}, p99.9: {}, p99.99: {}",
                num(stats.p99),
                num(stats.p999),
                num(stats.p9999)
            ));
            lines.push(String::new());

            lines.extend(table::render(&self.simulation.lines, palette, utc));
            lines.push("CH: consecutive hits, TC: trigger count, LS: longest streak".to_string());
        }
        lines.push(String::new());

        let summary = &self.simulation.summary;
        lines.push(format!(
            "triggers: {}, streak: {}, events: {}",
            palette.emphasis(&summary.triggers.to_string()),
            palette.emphasis(&summary.longest_streak.to_string()),
            palette.emphasis(&summary.events.to_string())
        ));

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }

    /// Write the human-readable report to `writer`
    pub fn write_human<W: Write>(
        &self,
        writer: &mut W,
        palette: &Palette,
        utc: bool,
    ) -> Result<()> {
        writer.write_all(self.render_human(palette, utc).as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Print results to stdout in human-readable format
    pub fn print_human(&self, palette: &Palette, utc: bool) -> Result<()> {
        self.write_human(&mut io::stdout().lock(), palette, utc)
    }

    /// Write results as pretty JSON to `path`, or stdout when `None`
    pub fn write_json(&self, path: Option<&Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        match path {
            Some(path) => {
                let mut file = File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                writeln!(file, "{}", json)?;
                tracing::info!("Results written to: {}", path.display());
            }
            None => {
                let mut stdout = io::stdout().lock();
                writeln!(stdout, "{}", json)?;
                stdout.flush()?;
            }
        }
        Ok(())
    }
}

/// `2021-02-20 00:00:00 +0100`, in local time unless `utc`
pub fn format_timestamp(timestamp: DateTime<Utc>, utc: bool) -> String {
    const FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";
    if utc {
        timestamp.format(FORMAT).to_string()
    } else {
        timestamp.with_timezone(&Local).format(FORMAT).to_string()
    }
}
