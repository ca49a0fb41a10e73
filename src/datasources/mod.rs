pub mod generative;
pub mod satellite;
pub mod telemetry;
pub mod transport;
pub mod weather;

pub use generative::HttpGenerativeBackend;
pub use satellite::CountySatelliteClient;
pub use telemetry::IotPlatformClient;
pub use transport::SmsGatewayClient;
pub use weather::WeatherApiClient;

use crate::error::Result;
use crate::models::{
    AlertEnvelope, Farm, FarmConditionReport, ProductRecommendation, Reading, WeatherForecast,
};
use async_trait::async_trait;

/// IoT sensor platform. Readings come back newest-first.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn fetch_sensor_readings(&self, farm_id: &str, hours_window: u32)
        -> Result<Vec<Reading>>;

    async fn test_connection(&self) -> Result<bool> {
        Ok(true)
    }
}

/// County-level satellite index snapshots (NDVI, NDWI, bloom probability, ...).
#[async_trait]
pub trait SatelliteSource: Send + Sync {
    async fn fetch_county_snapshot(&self, county: &str) -> Result<Reading>;

    async fn test_connection(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Multi-day weather forecast for a farm location.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn fetch_forecast(&self, latitude: f64, longitude: f64) -> Result<WeatherForecast>;

    async fn test_connection(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Outbound alert delivery and logging collaborator.
#[async_trait]
pub trait AlertTransport: Send + Sync {
    /// Returns whether the message was accepted by the gateway.
    async fn send(&self, phone: &str, text: &str) -> Result<bool>;

    async fn log_alert(&self, farmer_id: &str, envelope: &AlertEnvelope) -> Result<()>;
}

/// Agrovet product catalog collaborator. Only the recommendation result is
/// consumed here; pricing and stock live elsewhere.
#[async_trait]
pub trait RecommendationSource: Send + Sync {
    async fn recommend(
        &self,
        farm: &Farm,
        report: &FarmConditionReport,
    ) -> Result<Option<ProductRecommendation>>;
}

/// One generative text backend. Implementations surface transport and API
/// errors; retry, failover and deadlines belong to the resilient client that
/// wraps them.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str, opts: &GenerationOptions) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub max_tokens: u32,
    pub temperature: f64,
    pub thinking_enabled: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_tokens: 256,
            temperature: 0.6,
            thinking_enabled: false,
        }
    }
}
