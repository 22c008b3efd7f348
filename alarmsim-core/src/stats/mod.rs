//! Value distribution statistics

use serde::{Deserialize, Serialize};

pub mod analysis;

// Re-export main entry points
pub use analysis::{median, percentile, summarize};

/// Summary of a series' value distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub p99: f64,
    pub p999: f64,
    pub p9999: f64,
}
