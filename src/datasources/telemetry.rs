use crate::config::TelemetryApiConfig;
use crate::datasources::TelemetrySource;
use crate::error::{FarmWatchError, Result};
use crate::models::{Reading, ReadingSource};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

/// Client for the IoT sensor platform's readings API.
pub struct IotPlatformClient {
    client: reqwest::Client,
    config: TelemetryApiConfig,
}

#[derive(Debug, Deserialize)]
struct ApiReading {
    recorded_at: DateTime<Utc>,
    metrics: HashMap<String, f64>,
}

impl IotPlatformClient {
    pub fn new(config: TelemetryApiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl TelemetrySource for IotPlatformClient {
    async fn fetch_sensor_readings(
        &self,
        farm_id: &str,
        hours_window: u32,
    ) -> Result<Vec<Reading>> {
        let url = format!(
            "{}/farms/{}/readings?hours={}",
            self.config.base_url.trim_end_matches('/'),
            farm_id,
            hours_window
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.api_token)
            .send()
            .await
            .map_err(|e| FarmWatchError::DataSourceUnavailable(format!("IoT platform: {}", e)))?;

        if !response.status().is_success() {
            return Err(FarmWatchError::DataSourceUnavailable(format!(
                "IoT platform returned {} for farm {}",
                response.status(),
                farm_id
            )));
        }

        let api_readings: Vec<ApiReading> = response.json().await.map_err(|e| {
            FarmWatchError::DataSourceUnavailable(format!(
                "failed to parse IoT platform response: {}",
                e
            ))
        })?;

        let mut readings: Vec<Reading> = api_readings
            .into_iter()
            .map(|r| Reading {
                timestamp: r.recorded_at,
                source: ReadingSource::Sensor,
                metrics: r.metrics,
            })
            .collect();

        // Detector contracts expect newest-first regardless of API order
        readings.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(readings)
    }

    async fn test_connection(&self) -> Result<bool> {
        let url = format!("{}/health", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.api_token)
            .send()
            .await
            .map_err(|e| FarmWatchError::DataSourceUnavailable(format!("IoT platform: {}", e)))?;
        Ok(response.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_readings_parse_and_sort_newest_first() {
        let json = r#"[
            {"recorded_at": "2025-03-01T06:00:00Z", "metrics": {"soil_ph": 6.1}},
            {"recorded_at": "2025-03-01T12:00:00Z", "metrics": {"soil_ph": 6.0}}
        ]"#;
        let api_readings: Vec<ApiReading> = serde_json::from_str(json).unwrap();

        let mut readings: Vec<Reading> = api_readings
            .into_iter()
            .map(|r| Reading {
                timestamp: r.recorded_at,
                source: ReadingSource::Sensor,
                metrics: r.metrics,
            })
            .collect();
        readings.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        assert_eq!(readings[0].metric("soil_ph"), Some(6.0));
        assert_eq!(readings[1].metric("soil_ph"), Some(6.1));
    }
}
