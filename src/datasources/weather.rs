use crate::config::WeatherApiConfig;
use crate::datasources::WeatherSource;
use crate::error::{FarmWatchError, Result};
use crate::models::{DailyForecast, ForecastAggregate, WeatherForecast};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

/// Client for an Open-Meteo-compatible daily forecast API.
pub struct WeatherApiClient {
    client: reqwest::Client,
    config: WeatherApiConfig,
}

// Forecast API response structures
#[derive(Debug, Deserialize)]
struct ApiForecastResponse {
    daily: ApiDaily,
}

#[derive(Debug, Deserialize)]
struct ApiDaily {
    time: Vec<NaiveDate>,
    temperature_2m_min: Vec<f64>,
    temperature_2m_max: Vec<f64>,
    precipitation_sum: Vec<f64>,
    #[serde(default)]
    precipitation_probability_max: Vec<f64>,
    wind_speed_10m_max: Vec<f64>,
}

impl WeatherApiClient {
    pub fn new(config: WeatherApiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn forecast_url(&self, latitude: f64, longitude: f64) -> String {
        format!(
            "{}/forecast?latitude={}&longitude={}&forecast_days={}&daily=temperature_2m_min,temperature_2m_max,precipitation_sum,precipitation_probability_max,wind_speed_10m_max&timezone=UTC",
            self.config.base_url.trim_end_matches('/'),
            latitude,
            longitude,
            self.config.forecast_days,
        )
    }

    fn convert_response(
        &self,
        response: ApiForecastResponse,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherForecast> {
        let d = response.daily;
        let days = d.time.len();
        if d.temperature_2m_min.len() != days
            || d.temperature_2m_max.len() != days
            || d.precipitation_sum.len() != days
            || d.wind_speed_10m_max.len() != days
        {
            return Err(FarmWatchError::InvalidData(
                "forecast API returned ragged daily arrays".to_string(),
            ));
        }

        let daily: Vec<DailyForecast> = (0..days)
            .map(|i| DailyForecast {
                date: d.time[i],
                min_temp_c: d.temperature_2m_min[i],
                max_temp_c: d.temperature_2m_max[i],
                precip_mm: d.precipitation_sum[i],
                precip_probability: d
                    .precipitation_probability_max
                    .get(i)
                    .map(|p| p / 100.0)
                    .unwrap_or(0.0),
                wind_kmh: d.wind_speed_10m_max[i],
            })
            .collect();

        let aggregate = ForecastAggregate::from_daily(&daily);

        Ok(WeatherForecast {
            fetched_at: Utc::now(),
            latitude,
            longitude,
            daily,
            aggregate,
        })
    }
}

#[async_trait]
impl WeatherSource for WeatherApiClient {
    async fn fetch_forecast(&self, latitude: f64, longitude: f64) -> Result<WeatherForecast> {
        let url = self.forecast_url(latitude, longitude);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FarmWatchError::DataSourceUnavailable(format!("weather API: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FarmWatchError::DataSourceUnavailable(format!(
                "weather API returned {}: {}",
                status, body
            )));
        }

        let api_response: ApiForecastResponse = response.json().await.map_err(|e| {
            FarmWatchError::DataSourceUnavailable(format!(
                "failed to parse weather API response: {}",
                e
            ))
        })?;

        self.convert_response(api_response, latitude, longitude)
    }

    async fn test_connection(&self) -> Result<bool> {
        let url = self.forecast_url(0.0, 36.0);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FarmWatchError::DataSourceUnavailable(format!("weather API: {}", e)))?;
        Ok(response.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> WeatherApiConfig {
        WeatherApiConfig {
            base_url: "https://api.open-meteo.com/v1".to_string(),
            forecast_days: 10,
        }
    }

    #[test]
    fn forecast_url_includes_location_and_horizon() {
        let client = WeatherApiClient::new(sample_config());
        let url = client.forecast_url(-0.42, 36.95);
        assert!(url.contains("latitude=-0.42"));
        assert!(url.contains("longitude=36.95"));
        assert!(url.contains("forecast_days=10"));
    }

    #[test]
    fn convert_response_builds_daily_and_aggregate() {
        let client = WeatherApiClient::new(sample_config());
        let response = ApiForecastResponse {
            daily: ApiDaily {
                time: vec!["2025-03-01".parse().unwrap(), "2025-03-02".parse().unwrap()],
                temperature_2m_min: vec![12.0, 10.0],
                temperature_2m_max: vec![28.0, 31.0],
                precipitation_sum: vec![0.0, 4.0],
                precipitation_probability_max: vec![10.0, 60.0],
                wind_speed_10m_max: vec![12.0, 18.0],
            },
        };

        let forecast = client.convert_response(response, -0.42, 36.95).unwrap();
        assert_eq!(forecast.daily.len(), 2);
        assert!((forecast.daily[1].precip_probability - 0.6).abs() < 1e-9);
        assert!((forecast.aggregate.total_rain_10d_mm - 4.0).abs() < 1e-9);
        assert!((forecast.aggregate.max_temperature_c - 31.0).abs() < 1e-9);
    }

    #[test]
    fn ragged_arrays_are_rejected() {
        let client = WeatherApiClient::new(sample_config());
        let response = ApiForecastResponse {
            daily: ApiDaily {
                time: vec!["2025-03-01".parse().unwrap()],
                temperature_2m_min: vec![],
                temperature_2m_max: vec![28.0],
                precipitation_sum: vec![0.0],
                precipitation_probability_max: vec![],
                wind_speed_10m_max: vec![12.0],
            },
        };
        assert!(client.convert_response(response, 0.0, 0.0).is_err());
    }
}
