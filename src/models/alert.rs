use super::event::ExtremeEvent;
use super::report::{FarmConditionReport, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertTier {
    GoodNews,
    SingleDeviation,
    MultiDeviation,
    ExtremeEvent,
}

impl AlertTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertTier::GoodNews => "good_news",
            AlertTier::SingleDeviation => "single_deviation",
            AlertTier::MultiDeviation => "multi_deviation",
            AlertTier::ExtremeEvent => "extreme_event",
        }
    }
}

impl std::fmt::Display for AlertTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A finished alert in both renderings.
///
/// `compact_text` targets a single SMS segment and is never empty;
/// `detailed_text` is unbounded. Both are derived from the same report and
/// events so the two renderings cannot disagree on facts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEnvelope {
    pub tier: AlertTier,
    pub severity: Severity,
    pub compact_text: String,
    pub detailed_text: String,
    pub report: Option<FarmConditionReport>,
    pub events: Vec<ExtremeEvent>,
}

/// Counters accumulated over one orchestrator pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSummary {
    pub farmers_scanned: usize,
    pub extreme_alerts_sent: usize,
    pub condition_alerts_sent: usize,
    pub errors: usize,
    pub timestamp: DateTime<Utc>,
}

impl SweepSummary {
    pub fn new() -> Self {
        Self {
            farmers_scanned: 0,
            extreme_alerts_sent: 0,
            condition_alerts_sent: 0,
            errors: 0,
            timestamp: Utc::now(),
        }
    }
}

impl Default for SweepSummary {
    fn default() -> Self {
        Self::new()
    }
}
