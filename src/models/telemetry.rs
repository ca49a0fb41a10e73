use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fixed telemetry metric vocabulary shared by sensor, satellite and weather feeds.
pub mod metric {
    pub const SOIL_PH: &str = "soil_ph";
    pub const SOIL_MOISTURE_PCT: &str = "soil_moisture_pct";
    pub const TEMPERATURE_C: &str = "temperature_c";
    pub const HUMIDITY_PCT: &str = "humidity_pct";
    pub const NDVI: &str = "ndvi";
    pub const NDWI: &str = "ndwi";
    pub const RAINFALL_MM: &str = "rainfall_mm";
    pub const SOIL_NITROGEN: &str = "soil_nitrogen";
    pub const SOIL_PHOSPHORUS: &str = "soil_phosphorus";
    pub const SOIL_POTASSIUM: &str = "soil_potassium";
    pub const WIND_SPEED_MS: &str = "wind_speed_ms";
    pub const PRESSURE_HPA: &str = "pressure_hpa";
    pub const CO2_PPM: &str = "co2_ppm";
    pub const BATTERY_PCT: &str = "battery_pct";
    pub const LIGHT_LUX: &str = "light_lux";
    pub const BLOOM_PROBABILITY: &str = "bloom_probability";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingSource {
    Sensor,
    Satellite,
    Weather,
}

impl ReadingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingSource::Sensor => "sensor",
            ReadingSource::Satellite => "satellite",
            ReadingSource::Weather => "weather",
        }
    }
}

impl std::fmt::Display for ReadingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One timestamped bundle of metric values from a single source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub source: ReadingSource,
    pub metrics: HashMap<String, f64>,
}

impl Reading {
    pub fn new(source: ReadingSource) -> Self {
        Self::at(source, Utc::now())
    }

    pub fn at(source: ReadingSource, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            source,
            metrics: HashMap::new(),
        }
    }

    pub fn with_metric(mut self, name: &str, value: f64) -> Self {
        self.metrics.insert(name.to_string(), value);
        self
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        (now - self.timestamp).num_seconds() as f64 / 3600.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn reading_metric_lookup() {
        let reading = Reading::new(ReadingSource::Sensor)
            .with_metric(metric::SOIL_PH, 6.2)
            .with_metric(metric::TEMPERATURE_C, 24.0);

        assert_eq!(reading.metric(metric::SOIL_PH), Some(6.2));
        assert!(reading.metric(metric::NDVI).is_none());
    }

    #[test]
    fn reading_age_hours() {
        let now = Utc::now();
        let reading = Reading::at(ReadingSource::Sensor, now - Duration::hours(6));
        assert!((reading.age_hours(now) - 6.0).abs() < 0.01);
    }

    #[test]
    fn reading_source_display() {
        assert_eq!(ReadingSource::Sensor.as_str(), "sensor");
        assert_eq!(ReadingSource::Satellite.as_str(), "satellite");
        assert_eq!(ReadingSource::Weather.as_str(), "weather");
    }
}
