use crate::config::SmsGatewayConfig;
use crate::datasources::AlertTransport;
use crate::error::{FarmWatchError, Result};
use crate::models::AlertEnvelope;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

/// Client for the SMS gateway and its alert log endpoint.
pub struct SmsGatewayClient {
    client: reqwest::Client,
    config: SmsGatewayConfig,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    accepted: bool,
}

impl SmsGatewayClient {
    pub fn new(config: SmsGatewayConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl AlertTransport for SmsGatewayClient {
    async fn send(&self, phone: &str, text: &str) -> Result<bool> {
        let url = format!("{}/messages", self.config.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_token)
            .json(&json!({ "to": phone, "message": text }))
            .send()
            .await
            .map_err(|e| FarmWatchError::Transport(format!("SMS gateway: {}", e)))?;

        if !response.status().is_success() {
            return Err(FarmWatchError::Transport(format!(
                "SMS gateway returned {}",
                response.status()
            )));
        }

        let body: SendResponse = response
            .json()
            .await
            .map_err(|e| FarmWatchError::Transport(format!("SMS gateway response: {}", e)))?;
        Ok(body.accepted)
    }

    async fn log_alert(&self, farmer_id: &str, envelope: &AlertEnvelope) -> Result<()> {
        let url = format!("{}/alerts", self.config.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_token)
            .json(&json!({ "farmer_id": farmer_id, "alert": envelope }))
            .send()
            .await
            .map_err(|e| FarmWatchError::Transport(format!("alert log: {}", e)))?;

        if !response.status().is_success() {
            return Err(FarmWatchError::Transport(format!(
                "alert log returned {}",
                response.status()
            )));
        }

        tracing::debug!(farmer_id, tier = %envelope.tier, "alert logged");
        Ok(())
    }
}
