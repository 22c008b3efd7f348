//! Running counters for one simulation walk

use super::{AnnotatedSample, StreakIndicator, TriggerRule};
use crate::sample::MetricSample;

/// Counters threaded through the walk, one sample at a time
///
/// `hits` is the per-trigger counter and is cleared when a trigger fires;
/// `consecutive_hits` is the physical streak and only clears on a sample
/// below the threshold. Hence `consecutive_hits >= hits` after every step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulationState {
    pub events: usize,
    pub hits: usize,
    pub consecutive_hits: usize,
    pub triggers: usize,
    pub longest_streak: usize,
}

/// Result of stepping over a qualifying sample
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    /// This sample opened a new streak
    pub new_streak: bool,
    pub annotated: AnnotatedSample,
}

impl SimulationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the state by one sample
    ///
    /// Returns `None` when the sample is below the threshold.
    pub fn step(&mut self, sample: &MetricSample, rule: &TriggerRule) -> Option<StepOutcome> {
        if !rule.qualifies(sample.value) {
            self.hits = 0;
            self.consecutive_hits = 0;
            return None;
        }

        self.events += 1;
        self.hits += 1;
        self.consecutive_hits += 1;

        if self.consecutive_hits > self.longest_streak {
            self.longest_streak = self.consecutive_hits;
        }

        // hits only tracks consecutive_hits until the first fire of a streak,
        // so a streak fires at most once however long it runs.
        let fired = self.hits == self.consecutive_hits
            && self.hits >= rule.required_consecutive_hits();
        if fired {
            self.triggers += 1;
            self.hits = 0;
            tracing::debug!(
                "Trigger {} fired at {} (value {:.2})",
                self.triggers,
                sample.timestamp,
                sample.value
            );
        }

        let annotated = AnnotatedSample {
            timestamp: sample.timestamp,
            value: sample.value,
            diff: sample.value - rule.threshold(),
            hits: self.hits,
            consecutive_hits: self.consecutive_hits,
            triggers: self.triggers,
            longest_streak: self.longest_streak,
            fired,
            streak: StreakIndicator::new(self.consecutive_hits, rule.required_consecutive_hits()),
        };

        Some(StepOutcome { new_streak: self.consecutive_hits == 1, annotated })
    }
}
