use super::report::Severity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    WeatherForecast,
    IotSensor,
    Satellite,
}

impl EventSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSource::WeatherForecast => "weather_forecast",
            EventSource::IotSensor => "iot_sensor",
            EventSource::Satellite => "satellite",
        }
    }
}

impl std::fmt::Display for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A fired extreme-condition rule, carrying bilingual farmer-facing text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtremeEvent {
    pub event_type: String,
    pub severity: Severity,
    pub metric: String,
    pub value: f64,
    pub threshold: f64,
    pub message_en: String,
    pub message_sw: String,
    pub source: EventSource,
}
