use crate::models::{
    metric, EventSource, ExtremeEvent, Reading, Severity, WeatherForecast,
};
use crate::registry::{RuleTables, SensorRule, SensorRuleKind, WeatherField, WeatherRule};
use chrono::Utc;
use std::sync::Arc;

/// Evaluates weather, sensor and satellite inputs against the extreme-event
/// rule tables. All checks are side-effect-free and skip missing inputs
/// rather than failing.
pub struct ExtremeEventDetector {
    rules: Arc<RuleTables>,
}

impl ExtremeEventDetector {
    pub fn new(rules: Arc<RuleTables>) -> Self {
        Self { rules }
    }

    /// Run all three sub-checks and return fired events, worst-first.
    /// `history` must be ordered newest-first.
    pub fn detect(
        &self,
        forecast: Option<&WeatherForecast>,
        history: &[Reading],
        satellite: Option<&Reading>,
    ) -> Vec<ExtremeEvent> {
        let mut events = Vec::new();

        if let Some(forecast) = forecast {
            events.extend(self.check_weather(forecast));
        }
        events.extend(self.check_sensors(history));
        if let Some(satellite) = satellite {
            events.extend(self.check_satellite(satellite));
        }

        // Stable: rules keep their table order within a severity band
        events.sort_by(|a, b| b.severity.cmp(&a.severity));
        events
    }

    fn check_weather(&self, forecast: &WeatherForecast) -> Vec<ExtremeEvent> {
        self.rules
            .weather
            .iter()
            .filter_map(|rule| {
                let value = weather_field_value(rule, forecast)?;
                rule.direction
                    .breached(value, rule.threshold)
                    .then(|| ExtremeEvent {
                        event_type: rule.event_type.clone(),
                        severity: rule.severity,
                        metric: rule.field.as_str().to_string(),
                        value,
                        threshold: rule.threshold,
                        message_en: fill_template(&rule.message_en, value),
                        message_sw: fill_template(&rule.message_sw, value),
                        source: EventSource::WeatherForecast,
                    })
            })
            .collect()
    }

    fn check_sensors(&self, history: &[Reading]) -> Vec<ExtremeEvent> {
        let Some(newest) = history.first() else {
            return Vec::new();
        };

        self.rules
            .sensor
            .iter()
            .filter_map(|rule| {
                let fired_value = match rule.kind {
                    SensorRuleKind::AbsHigh { threshold } => {
                        let value = newest.metric(&rule.metric)?;
                        (value > threshold).then_some(value)
                    }
                    SensorRuleKind::AbsLow { threshold } => {
                        let value = newest.metric(&rule.metric)?;
                        (value < threshold).then_some(value)
                    }
                    SensorRuleKind::RateDrop {
                        delta_pct,
                        window_hours,
                    } => check_rate_drop(rule, newest, &history[1..], delta_pct, window_hours),
                };

                fired_value.map(|value| ExtremeEvent {
                    event_type: rule.event_type.clone(),
                    severity: rule.severity,
                    metric: rule.metric.clone(),
                    value,
                    threshold: rule_threshold(rule),
                    message_en: fill_template(&rule.message_en, value),
                    message_sw: fill_template(&rule.message_sw, value),
                    source: EventSource::IotSensor,
                })
            })
            .collect()
    }

    fn check_satellite(&self, snapshot: &Reading) -> Vec<ExtremeEvent> {
        let limits = &self.rules.satellite;
        let mut events = Vec::new();

        if let Some(ndvi) = snapshot.metric(metric::NDVI) {
            if ndvi < limits.ndvi_stress_floor {
                events.push(ExtremeEvent {
                    event_type: "severe_crop_stress".to_string(),
                    severity: Severity::Critical,
                    metric: metric::NDVI.to_string(),
                    value: ndvi,
                    threshold: limits.ndvi_stress_floor,
                    message_en: format!(
                        "Satellite shows severe crop stress in your area (NDVI {:.2}). Inspect your fields.",
                        ndvi
                    ),
                    message_sw: format!(
                        "Setilaiti inaonyesha msongo mkubwa wa mazao eneo lako (NDVI {:.2}). Kagua mashamba yako.",
                        ndvi
                    ),
                    source: EventSource::Satellite,
                });
            }
        }

        if let Some(bloom) = snapshot.metric(metric::BLOOM_PROBABILITY) {
            if bloom > limits.bloom_probability_ceiling {
                events.push(ExtremeEvent {
                    event_type: "algal_bloom_risk".to_string(),
                    severity: Severity::Warning,
                    metric: metric::BLOOM_PROBABILITY.to_string(),
                    value: bloom,
                    threshold: limits.bloom_probability_ceiling,
                    message_en: format!(
                        "High algal bloom risk ({:.0}%) in nearby water sources. Check before irrigating.",
                        bloom * 100.0
                    ),
                    message_sw: format!(
                        "Hatari kubwa ya mwani ({:.0}%) kwenye vyanzo vya maji vya karibu. Kagua kabla ya kumwagilia.",
                        bloom * 100.0
                    ),
                    source: EventSource::Satellite,
                });
            }
        }

        events
    }
}

/// Resolve the comparison value for a weather rule. Aggregate fields read
/// the summary directly; per-day fields take the max of daily maxima for
/// `Above` rules and the min of daily minima for `Below` rules.
fn weather_field_value(rule: &WeatherRule, forecast: &WeatherForecast) -> Option<f64> {
    match rule.field {
        WeatherField::TotalRain10dMm => Some(forecast.aggregate.total_rain_10d_mm),
        WeatherField::DailyMaxTempC => forecast.max_over_days(|d| d.max_temp_c),
        WeatherField::DailyMinTempC => forecast.min_over_days(|d| d.min_temp_c),
        WeatherField::DailyWindKmh => forecast.max_over_days(|d| d.wind_kmh),
        WeatherField::DailyPrecipMm => forecast.max_over_days(|d| d.precip_mm),
    }
}

/// Rate-of-change check over a newest-first history.
///
/// Scans backward and keeps overwriting the comparison sample with each
/// reading whose age is still inside the window. The sample that survives is
/// the last in-window reading the scan encountered, which may not be the
/// true oldest if timestamps are uneven; this selection is deliberate and
/// matched by tests. A solitary reading never fires.
fn check_rate_drop(
    rule: &SensorRule,
    newest: &Reading,
    older: &[Reading],
    delta_pct: f64,
    window_hours: f64,
) -> Option<f64> {
    let new_value = newest.metric(&rule.metric)?;
    let now = Utc::now();

    let mut old_value: Option<f64> = None;
    for reading in older {
        if reading.age_hours(now) > window_hours {
            continue;
        }
        if let Some(value) = reading.metric(&rule.metric) {
            old_value = Some(value);
        }
    }

    let old_value = old_value?;
    if old_value <= 0.0 {
        return None;
    }

    let drop_pct = (old_value - new_value) / old_value * 100.0;
    (drop_pct >= delta_pct).then_some(drop_pct)
}

fn rule_threshold(rule: &SensorRule) -> f64 {
    match rule.kind {
        SensorRuleKind::AbsHigh { threshold } | SensorRuleKind::AbsLow { threshold } => threshold,
        SensorRuleKind::RateDrop { delta_pct, .. } => delta_pct,
    }
}

/// Substitute the fired value into a bilingual message template.
fn fill_template(template: &str, value: f64) -> String {
    let rendered = if value.fract().abs() < 1e-9 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    };
    template.replace("{value}", &rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DailyForecast, ForecastAggregate, ReadingSource};
    use chrono::Duration;

    fn detector() -> ExtremeEventDetector {
        ExtremeEventDetector::new(Arc::new(RuleTables::builtin()))
    }

    fn forecast_with(daily: Vec<DailyForecast>) -> WeatherForecast {
        let aggregate = ForecastAggregate::from_daily(&daily);
        WeatherForecast {
            fetched_at: Utc::now(),
            latitude: -0.42,
            longitude: 36.95,
            daily,
            aggregate,
        }
    }

    fn day(min: f64, max: f64, rain: f64, wind: f64) -> DailyForecast {
        DailyForecast {
            date: "2025-03-01".parse().unwrap(),
            min_temp_c: min,
            max_temp_c: max,
            precip_mm: rain,
            precip_probability: 0.3,
            wind_kmh: wind,
        }
    }

    #[test]
    fn drought_rule_fires_on_low_aggregate_rain() {
        // Scenario: total 3mm over the window vs a below-5 threshold
        let forecast = forecast_with(vec![day(12.0, 28.0, 1.0, 10.0), day(12.0, 28.0, 2.0, 10.0)]);

        let events = detector().detect(Some(&forecast), &[], None);
        let drought = events
            .iter()
            .find(|e| e.event_type == "drought_risk")
            .expect("drought rule should fire");

        assert_eq!(drought.severity, Severity::Warning);
        assert!((drought.value - 3.0).abs() < 1e-9);
        assert_eq!(drought.source, EventSource::WeatherForecast);
        assert!(drought.message_en.contains("3mm"));
        assert!(drought.message_sw.contains("3mm"));
    }

    #[test]
    fn heatwave_uses_max_of_daily_maxima() {
        let forecast = forecast_with(vec![
            day(15.0, 33.0, 10.0, 10.0),
            day(15.0, 37.5, 10.0, 10.0),
            day(15.0, 30.0, 10.0, 10.0),
        ]);

        let events = detector().detect(Some(&forecast), &[], None);
        let heat = events
            .iter()
            .find(|e| e.event_type == "heatwave")
            .expect("heatwave should fire on the hottest day");
        assert!((heat.value - 37.5).abs() < 1e-9);
        assert_eq!(heat.severity, Severity::Critical);
    }

    #[test]
    fn frost_uses_min_of_daily_minima() {
        let forecast = forecast_with(vec![
            day(8.0, 20.0, 10.0, 10.0),
            day(1.0, 18.0, 10.0, 10.0),
        ]);

        let events = detector().detect(Some(&forecast), &[], None);
        assert!(events.iter().any(|e| e.event_type == "frost_risk"));
    }

    #[test]
    fn rule_does_not_fire_at_exact_threshold() {
        // drought threshold is strictly below 5
        let forecast = forecast_with(vec![day(12.0, 28.0, 5.0, 10.0)]);
        let events = detector().detect(Some(&forecast), &[], None);
        assert!(!events.iter().any(|e| e.event_type == "drought_risk"));
    }

    #[test]
    fn abs_rules_use_only_the_newest_reading() {
        let now = Utc::now();
        let newest = Reading::at(ReadingSource::Sensor, now)
            .with_metric(metric::SOIL_MOISTURE_PCT, 12.0);
        // Older reading is fine; it must not mask the newest
        let older = Reading::at(ReadingSource::Sensor, now - Duration::hours(2))
            .with_metric(metric::SOIL_MOISTURE_PCT, 50.0);

        let events = detector().detect(None, &[newest, older], None);
        assert!(events.iter().any(|e| e.event_type == "soil_critically_dry"));
    }

    #[test]
    fn rate_drop_fires_within_window() {
        let now = Utc::now();
        let history = vec![
            Reading::at(ReadingSource::Sensor, now).with_metric(metric::SOIL_MOISTURE_PCT, 35.0),
            Reading::at(ReadingSource::Sensor, now - Duration::hours(10))
                .with_metric(metric::SOIL_MOISTURE_PCT, 60.0),
        ];

        let events = detector().detect(None, &history, None);
        let drop = events
            .iter()
            .find(|e| e.event_type == "rapid_moisture_loss")
            .expect("41% drop in 10h should fire the 30%/24h rule");
        assert!((drop.value - (25.0 / 60.0 * 100.0)).abs() < 0.01);
    }

    #[test]
    fn rate_drop_ignores_readings_outside_window() {
        let now = Utc::now();
        let history = vec![
            Reading::at(ReadingSource::Sensor, now).with_metric(metric::SOIL_MOISTURE_PCT, 35.0),
            // 60 -> 35 would fire, but it is outside the 24h window
            Reading::at(ReadingSource::Sensor, now - Duration::hours(30))
                .with_metric(metric::SOIL_MOISTURE_PCT, 60.0),
        ];

        let events = detector().detect(None, &history, None);
        assert!(!events.iter().any(|e| e.event_type == "rapid_moisture_loss"));
    }

    #[test]
    fn rate_drop_picks_last_in_window_sample_during_scan() {
        // The backward scan keeps the LAST in-window sample it sees, not the
        // largest or the one closest to the window edge in wall-clock terms.
        let now = Utc::now();
        let history = vec![
            Reading::at(ReadingSource::Sensor, now).with_metric(metric::SOIL_MOISTURE_PCT, 40.0),
            // In-window, 50: a 20% drop, would not fire
            Reading::at(ReadingSource::Sensor, now - Duration::hours(5))
                .with_metric(metric::SOIL_MOISTURE_PCT, 50.0),
            // In-window, 70: a 42.9% drop, fires -- and this later-scanned
            // sample is the one the policy selects
            Reading::at(ReadingSource::Sensor, now - Duration::hours(20))
                .with_metric(metric::SOIL_MOISTURE_PCT, 70.0),
            // Out of window, ignored
            Reading::at(ReadingSource::Sensor, now - Duration::hours(40))
                .with_metric(metric::SOIL_MOISTURE_PCT, 90.0),
        ];

        let events = detector().detect(None, &history, None);
        let drop = events
            .iter()
            .find(|e| e.event_type == "rapid_moisture_loss")
            .expect("should compare against the 70 sample");
        assert!((drop.value - (30.0 / 70.0 * 100.0)).abs() < 0.01);
    }

    #[test]
    fn solitary_reading_never_fires_rate_rule() {
        let history = vec![
            Reading::new(ReadingSource::Sensor).with_metric(metric::SOIL_MOISTURE_PCT, 30.0)
        ];
        let events = detector().detect(None, &history, None);
        assert!(!events.iter().any(|e| e.event_type == "rapid_moisture_loss"));
    }

    #[test]
    fn missing_metrics_are_skipped_not_errors() {
        let history = vec![Reading::new(ReadingSource::Sensor).with_metric(metric::CO2_PPM, 420.0)];
        let events = detector().detect(None, &history, None);
        assert!(events.is_empty());
    }

    #[test]
    fn satellite_extremes() {
        let snapshot = Reading::new(ReadingSource::Satellite)
            .with_metric(metric::NDVI, 0.15)
            .with_metric(metric::BLOOM_PROBABILITY, 0.85);

        let events = detector().detect(None, &[], Some(&snapshot));

        let stress = events
            .iter()
            .find(|e| e.event_type == "severe_crop_stress")
            .unwrap();
        assert_eq!(stress.severity, Severity::Critical);

        let bloom = events
            .iter()
            .find(|e| e.event_type == "algal_bloom_risk")
            .unwrap();
        assert_eq!(bloom.severity, Severity::Warning);
    }

    #[test]
    fn events_sorted_critical_first() {
        let snapshot = Reading::new(ReadingSource::Satellite)
            .with_metric(metric::NDVI, 0.1)
            .with_metric(metric::BLOOM_PROBABILITY, 0.9);
        let history = vec![
            Reading::new(ReadingSource::Sensor).with_metric(metric::BATTERY_PCT, 10.0)
        ];

        let events = detector().detect(None, &history, Some(&snapshot));
        let severities: Vec<Severity> = events.iter().map(|e| e.severity).collect();
        let mut sorted = severities.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(severities, sorted);
        assert_eq!(events.first().unwrap().severity, Severity::Critical);
    }
}
