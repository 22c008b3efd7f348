//! alarmsim core library
//!
//! This crate holds the analysis half of alarmsim: the metric sample model,
//! the trigger simulator that replays a series against an alarm rule, and the
//! value-distribution summary printed next to the report. Nothing in here
//! performs I/O; samples arrive fully materialized from a datapoint source.

pub mod error;
pub mod sample;
pub mod simulation;
pub mod stats;

pub use error::{Error, Result};
pub use sample::{MetricSample, MetricSeries};
pub use simulation::{
    simulate, simulate_with, AnnotatedSample, ReportLine, Simulation, SimulationState,
    SimulationSummary, StreakIndicator, StreakLevel, TriggerRule,
};
pub use stats::{summarize, ValueSummary};
