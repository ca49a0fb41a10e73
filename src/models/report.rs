use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a single deviation or extreme event.
///
/// Ordering is derived so that `Info < Warning < Critical`, which lets
/// callers take `max()` over a set of findings to get the worst one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Low,
    High,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Low => "low",
            Direction::High => "high",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Overall farm health classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FarmStatus {
    Optimal,
    Good,
    Warning,
    Critical,
}

impl FarmStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FarmStatus::Optimal => "optimal",
            FarmStatus::Good => "good",
            FarmStatus::Warning => "warning",
            FarmStatus::Critical => "critical",
        }
    }
}

impl std::fmt::Display for FarmStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One metric outside its crop-optimal range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricDeviation {
    pub metric: String,
    pub value: f64,
    pub optimal_min: f64,
    pub optimal_max: f64,
    pub unit: String,
    pub severity: Severity,
    pub direction: Direction,
    /// Distance from the breached bound, as a percentage of the range span.
    /// Always >= 0.
    pub pct_deviation: f64,
    pub description: String,
}

/// Result of evaluating one farm's merged readings against its crop profile.
///
/// Constructed fresh per evaluation and never mutated afterwards.
/// `deviations` is sorted worst-first: severity rank, then descending
/// `pct_deviation`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmConditionReport {
    pub crop: String,
    pub status: FarmStatus,
    /// 0-100; 100 means every checked metric is optimal.
    pub overall_score: f64,
    pub optimal_metrics: Vec<String>,
    pub deviations: Vec<MetricDeviation>,
    pub timestamp: DateTime<Utc>,
}

impl FarmConditionReport {
    pub fn worst_severity(&self) -> Option<Severity> {
        self.deviations.iter().map(|d| d.severity).max()
    }
}
