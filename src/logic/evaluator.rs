use crate::models::{
    metric, Direction, FarmConditionReport, FarmStatus, MetricDeviation, Reading, Severity,
};
use crate::registry::MetricRegistry;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Deviations beyond this percentage of the range span are critical.
pub const CRITICAL_DEVIATION_PCT: f64 = 50.0;
/// Deviations beyond this percentage are warnings; below it they are info.
pub const WARNING_DEVIATION_PCT: f64 = 20.0;

/// Score penalty per deviation, by severity. Empirically tuned values;
/// overridable here, nowhere else.
pub const PENALTY_CRITICAL: f64 = 15.0;
pub const PENALTY_WARNING: f64 = 8.0;
pub const PENALTY_INFO: f64 = 3.0;

/// Score and status used when no configured metric had data at all.
pub const DEGRADED_DATA_SCORE: f64 = 50.0;

/// Metrics both the sensor fleet and the satellite feed can supply. Only
/// these are filled from satellite data when absent from sensor data;
/// everything else must come from the sensors or is skipped.
const SATELLITE_SHARED_METRICS: &[&str] = &[
    metric::TEMPERATURE_C,
    metric::RAINFALL_MM,
    metric::NDVI,
    metric::NDWI,
];

pub struct ConditionEvaluator {
    registry: Arc<MetricRegistry>,
}

impl ConditionEvaluator {
    pub fn new(registry: Arc<MetricRegistry>) -> Self {
        Self { registry }
    }

    /// Evaluate a farm's merged readings against its crop profile.
    ///
    /// Missing metrics are skipped, never imputed; with no usable data at
    /// all the report degrades to a score of 50 and `Warning` status rather
    /// than failing.
    pub fn evaluate(
        &self,
        crop: &str,
        sensor: Option<&Reading>,
        satellite: Option<&Reading>,
    ) -> FarmConditionReport {
        let profile = self.registry.ranges_for(crop);
        let merged = merge_readings(sensor, satellite);

        let mut optimal_metrics = Vec::new();
        let mut deviations = Vec::new();

        for (name, range) in profile {
            let Some(value) = merged.get(name.as_str()).copied() else {
                continue;
            };

            if range.contains(value) {
                optimal_metrics.push(name.clone());
                continue;
            }

            let direction = if value < range.min {
                Direction::Low
            } else {
                Direction::High
            };
            let distance = match direction {
                Direction::Low => range.min - value,
                Direction::High => value - range.max,
            };
            let range_span = if range.max > range.min {
                range.max - range.min
            } else {
                1.0
            };
            let pct_deviation = distance / range_span * 100.0;

            let severity = if pct_deviation > CRITICAL_DEVIATION_PCT {
                Severity::Critical
            } else if pct_deviation > WARNING_DEVIATION_PCT {
                Severity::Warning
            } else {
                Severity::Info
            };

            let description = describe_deviation(name, value, range.min, range.max, &range.unit,
                direction, pct_deviation);

            deviations.push(MetricDeviation {
                metric: name.clone(),
                value,
                optimal_min: range.min,
                optimal_max: range.max,
                unit: range.unit.clone(),
                severity,
                direction,
                pct_deviation,
                description,
            });
        }

        let total_checked = optimal_metrics.len() + deviations.len();

        let (overall_score, status) = if total_checked == 0 {
            // No data at all: degrade instead of failing.
            (DEGRADED_DATA_SCORE, FarmStatus::Warning)
        } else {
            let base = optimal_metrics.len() as f64 / total_checked as f64 * 100.0;
            let penalty: f64 = deviations
                .iter()
                .map(|d| match d.severity {
                    Severity::Critical => PENALTY_CRITICAL,
                    Severity::Warning => PENALTY_WARNING,
                    Severity::Info => PENALTY_INFO,
                })
                .sum();
            let score = (base - penalty).clamp(0.0, 100.0);

            let status = match deviations.iter().map(|d| d.severity).max() {
                None => FarmStatus::Optimal,
                Some(Severity::Critical) => FarmStatus::Critical,
                Some(Severity::Warning) => FarmStatus::Warning,
                Some(Severity::Info) => FarmStatus::Good,
            };
            (score, status)
        };

        // Worst first: severity rank, then descending pct. sort_by is stable
        // so ties keep profile order.
        deviations.sort_by(|a, b| {
            b.severity.cmp(&a.severity).then(
                b.pct_deviation
                    .partial_cmp(&a.pct_deviation)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
        });

        FarmConditionReport {
            crop: crop.to_lowercase(),
            status,
            overall_score,
            optimal_metrics,
            deviations,
            timestamp: Utc::now(),
        }
    }
}

/// Merge sensor and satellite readings into one metric map.
///
/// Sensor values always win. Satellite values only fill gaps for metrics
/// both sources can supply; satellite-only extras (e.g. bloom probability)
/// are not condition metrics and stay out of the merge.
fn merge_readings(
    sensor: Option<&Reading>,
    satellite: Option<&Reading>,
) -> BTreeMap<String, f64> {
    let mut merged = BTreeMap::new();

    if let Some(sat) = satellite {
        for name in SATELLITE_SHARED_METRICS {
            if let Some(value) = sat.metric(name) {
                merged.insert(name.to_string(), value);
            }
        }
    }

    if let Some(sensor) = sensor {
        for (name, value) in &sensor.metrics {
            merged.insert(name.clone(), *value);
        }
    }

    merged
}

fn describe_deviation(
    name: &str,
    value: f64,
    min: f64,
    max: f64,
    unit: &str,
    direction: Direction,
    pct: f64,
) -> String {
    let relation = match direction {
        Direction::Low => "below",
        Direction::High => "above",
    };
    format!(
        "{} at {:.1}{} is {} the optimal {:.1}-{:.1}{} ({:.0}% off)",
        name, value, unit, relation, min, max, unit, pct
    )
}
