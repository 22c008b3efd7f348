//! Trigger simulation
//!
//! Replays a chronological series against an alarm rule of the form "fire once
//! `N` consecutive datapoints meet or exceed the threshold". The walk keeps
//! four running counters (see [`SimulationState`]) and emits one
//! [`AnnotatedSample`] per qualifying datapoint, with a [`ReportLine::Separator`]
//! ahead of the first sample of every streak.
//!
//! A streak fires at most once, at the sample where it first reaches the
//! required length. Datapoints past that point extend the streak without
//! firing again; the next trigger needs the streak to break and restart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sample::MetricSample;

pub mod state;

pub use state::{SimulationState, StepOutcome};

/// Alarm rule replayed by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerRule {
    threshold: f64,
    required_consecutive_hits: usize,
}

impl TriggerRule {
    pub fn new(threshold: f64, required_consecutive_hits: usize) -> Result<Self> {
        if required_consecutive_hits < 1 {
            return Err(Error::InvalidArgument(format!(
                "consecutive hits must be >= 1, got {}",
                required_consecutive_hits
            )));
        }
        if !threshold.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "threshold must be a finite number, got {}",
                threshold
            )));
        }
        Ok(Self { threshold, required_consecutive_hits })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn required_consecutive_hits(&self) -> usize {
        self.required_consecutive_hits
    }

    /// A sample qualifies when it meets or exceeds the threshold
    pub fn qualifies(&self, value: f64) -> bool {
        value >= self.threshold
    }
}

/// Whether a streak has reached the required length yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreakLevel {
    Building,
    Breaching,
}

/// Streak length capped at the required hit count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakIndicator {
    /// `min(consecutive_hits, required)`
    pub filled: usize,
    /// The streak is longer than required
    pub overflow: bool,
    pub level: StreakLevel,
}

impl StreakIndicator {
    pub fn new(consecutive_hits: usize, required: usize) -> Self {
        let level = if consecutive_hits >= required {
            StreakLevel::Breaching
        } else {
            StreakLevel::Building
        };
        Self {
            filled: consecutive_hits.min(required),
            overflow: consecutive_hits > required,
            level,
        }
    }
}

/// A qualifying sample plus the counters right after it was processed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedSample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    /// `value - threshold`
    pub diff: f64,
    pub hits: usize,
    pub consecutive_hits: usize,
    pub triggers: usize,
    pub longest_streak: usize,
    /// A trigger fired on this sample
    pub fired: bool,
    pub streak: StreakIndicator,
}

/// One line of simulator output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ReportLine {
    /// A new streak begins with the next sample
    Separator,
    Sample(AnnotatedSample),
}

/// Final counters of a walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub events: usize,
    pub triggers: usize,
    pub longest_streak: usize,
}

impl From<&SimulationState> for SimulationSummary {
    fn from(state: &SimulationState) -> Self {
        Self {
            events: state.events,
            triggers: state.triggers,
            longest_streak: state.longest_streak,
        }
    }
}

/// Output of [`simulate`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    pub lines: Vec<ReportLine>,
    pub summary: SimulationSummary,
}

impl Simulation {
    /// Annotated samples without the separators
    pub fn samples(&self) -> impl Iterator<Item = &AnnotatedSample> {
        self.lines.iter().filter_map(|line| match line {
            ReportLine::Sample(sample) => Some(sample),
            ReportLine::Separator => None,
        })
    }

    /// Number of streaks seen during the walk
    pub fn streak_count(&self) -> usize {
        self.lines.iter().filter(|line| matches!(line, ReportLine::Separator)).count()
    }
}

/// Walk `samples` in order and simulate trigger firing under `rule`
///
/// `samples` must be ascending by timestamp; [`crate::MetricSeries`] guarantees
/// this. An empty input yields an empty output and a zero summary.
pub fn simulate(samples: &[MetricSample], rule: &TriggerRule) -> Simulation {
    let mut state = SimulationState::new();
    let mut lines = Vec::new();

    for sample in samples {
        if let Some(outcome) = state.step(sample, rule) {
            if outcome.new_streak {
                lines.push(ReportLine::Separator);
            }
            lines.push(ReportLine::Sample(outcome.annotated));
        }
    }

    Simulation { lines, summary: SimulationSummary::from(&state) }
}

/// Validate the rule parameters, then [`simulate`]
pub fn simulate_with(
    samples: &[MetricSample],
    threshold: f64,
    required_consecutive_hits: usize,
) -> Result<Simulation> {
    let rule = TriggerRule::new(threshold, required_consecutive_hits)?;
    Ok(simulate(samples, &rule))
}
