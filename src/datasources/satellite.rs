use crate::config::SatelliteApiConfig;
use crate::datasources::SatelliteSource;
use crate::error::{FarmWatchError, Result};
use crate::models::{Reading, ReadingSource};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

/// Client for the county-level satellite index service.
pub struct CountySatelliteClient {
    client: reqwest::Client,
    config: SatelliteApiConfig,
}

#[derive(Debug, Deserialize)]
struct ApiSnapshot {
    captured_at: DateTime<Utc>,
    indices: HashMap<String, f64>,
}

impl CountySatelliteClient {
    pub fn new(config: SatelliteApiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl SatelliteSource for CountySatelliteClient {
    async fn fetch_county_snapshot(&self, county: &str) -> Result<Reading> {
        let url = format!(
            "{}/counties/{}/latest",
            self.config.base_url.trim_end_matches('/'),
            county.to_lowercase()
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.api_token)
            .send()
            .await
            .map_err(|e| FarmWatchError::DataSourceUnavailable(format!("satellite API: {}", e)))?;

        if !response.status().is_success() {
            return Err(FarmWatchError::DataSourceUnavailable(format!(
                "satellite API returned {} for county {}",
                response.status(),
                county
            )));
        }

        let snapshot: ApiSnapshot = response.json().await.map_err(|e| {
            FarmWatchError::DataSourceUnavailable(format!(
                "failed to parse satellite response: {}",
                e
            ))
        })?;

        Ok(Reading {
            timestamp: snapshot.captured_at,
            source: ReadingSource::Satellite,
            metrics: snapshot.indices,
        })
    }

    async fn test_connection(&self) -> Result<bool> {
        let url = format!("{}/health", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.api_token)
            .send()
            .await
            .map_err(|e| FarmWatchError::DataSourceUnavailable(format!("satellite API: {}", e)))?;
        Ok(response.status().is_success())
    }
}
