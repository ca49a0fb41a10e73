use crate::error::{FarmWatchError, Result};
use crate::models::Farm;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub sweep: SweepConfig,
    pub telemetry: TelemetryApiConfig,
    pub satellite: SatelliteApiConfig,
    pub weather: WeatherApiConfig,
    pub sms: SmsGatewayConfig,
    pub generator: Option<GeneratorConfig>,
    pub farms: Vec<Farm>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SweepConfig {
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: u32,
}

fn default_lookback_hours() -> u32 {
    crate::logic::sweep::DEFAULT_LOOKBACK_HOURS
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            lookback_hours: default_lookback_hours(),
        }
    }
}

#[derive(Clone, Deserialize, Serialize)]
pub struct TelemetryApiConfig {
    pub base_url: String,
    pub api_token: String,
}

impl std::fmt::Debug for TelemetryApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryApiConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone, Deserialize, Serialize)]
pub struct SatelliteApiConfig {
    pub base_url: String,
    pub api_token: String,
}

impl std::fmt::Debug for SatelliteApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SatelliteApiConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WeatherApiConfig {
    pub base_url: String,
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u32,
}

fn default_forecast_days() -> u32 {
    10
}

#[derive(Clone, Deserialize, Serialize)]
pub struct SmsGatewayConfig {
    pub base_url: String,
    pub api_token: String,
}

impl std::fmt::Debug for SmsGatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsGatewayConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneratorConfig {
    pub primary: GeneratorBackendConfig,
    pub secondary: Option<GeneratorBackendConfig>,
    #[serde(default = "default_generator_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_generator_timeout_secs() -> u64 {
    30
}

#[derive(Clone, Deserialize, Serialize)]
pub struct GeneratorBackendConfig {
    pub url: String,
    pub api_key: String,
    pub model: String,
}

impl std::fmt::Debug for GeneratorBackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorBackendConfig")
            .field("url", &self.url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

impl Config {
    pub fn load(config_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_override {
            Some(p) => p,
            None => Self::find_config_path()?,
        };

        if !config_path.exists() {
            return Err(FarmWatchError::Config(format!(
                "Config file not found at {:?}. Copy config/config.yaml.example to get started.",
                config_path
            )));
        }

        let config_str = std::fs::read_to_string(&config_path)
            .map_err(|e| FarmWatchError::Config(format!("Failed to read config: {}", e)))?;

        // Substitute environment variables
        let config_str = Self::substitute_env_vars(&config_str);

        let config: Config = serde_yaml::from_str(&config_str)
            .map_err(|e| FarmWatchError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Search for config.yaml in standard locations.
    /// Returns the path of the first found config, or the XDG default path if none found.
    fn find_config_path() -> Result<PathBuf> {
        // Try current directory first
        let local_config = PathBuf::from("config/config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        // Try XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("farmwatch").join("config.yaml");
            if xdg_config.exists() {
                return Ok(xdg_config);
            }
        }

        // Return XDG path as the default (will trigger "not found" in load)
        let default_path = dirs::config_dir()
            .ok_or_else(|| FarmWatchError::Config("Cannot determine config directory".into()))?
            .join("farmwatch")
            .join("config.yaml");
        Ok(default_path)
    }

    fn substitute_env_vars(content: &str) -> String {
        let mut result = content.to_string();

        // Find all ${VAR_NAME} patterns and substitute
        let re = regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let placeholder = &cap[0];
            if let Ok(value) = std::env::var(var_name) {
                result = result.replace(placeholder, &value);
            }
        }

        result
    }

    fn validate(&self) -> Result<()> {
        if self.farms.is_empty() {
            return Err(FarmWatchError::Config(
                "farm roster is empty; nothing to sweep".into(),
            ));
        }
        for farm in &self.farms {
            if farm.id.is_empty() || farm.phone.is_empty() {
                return Err(FarmWatchError::Config(format!(
                    "farm entry '{}' is missing an id or phone number",
                    farm.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
telemetry:
  base_url: https://iot.example.com/api
  api_token: ${FARMWATCH_TEST_IOT_TOKEN}
satellite:
  base_url: https://sat.example.com/api
  api_token: sat-token
weather:
  base_url: https://api.open-meteo.com/v1
sms:
  base_url: https://sms.example.com/api
  api_token: sms-token
generator:
  primary:
    url: https://gen.example.com/v1/generate
    api_key: key-1
    model: model-a
  secondary: null
farms:
  - id: farm-001
    name: Wanjiku Kamau
    phone: "+254700000001"
    county: Nyeri
    crop: maize
    latitude: -0.42
    longitude: 36.95
"#;

    #[test]
    fn parses_sample_config() {
        let config: Config = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(config.farms.len(), 1);
        assert_eq!(config.farms[0].crop, "maize");
        assert_eq!(config.sweep.lookback_hours, 48);
        assert_eq!(config.weather.forecast_days, 10);
        let generator = config.generator.unwrap();
        assert_eq!(generator.timeout_secs, 30);
        assert!(generator.secondary.is_none());
    }

    #[test]
    fn env_vars_are_substituted() {
        std::env::set_var("FARMWATCH_TEST_IOT_TOKEN", "secret-token");
        let substituted = Config::substitute_env_vars(SAMPLE);
        assert!(substituted.contains("secret-token"));
        assert!(!substituted.contains("${FARMWATCH_TEST_IOT_TOKEN}"));
    }

    #[test]
    fn unset_env_vars_are_left_in_place() {
        let content = "token: ${FARMWATCH_TEST_UNSET_VAR}";
        let substituted = Config::substitute_env_vars(content);
        assert_eq!(substituted, content);
    }

    #[test]
    fn empty_roster_is_rejected() {
        let mut config: Config = serde_yaml::from_str(SAMPLE).unwrap();
        config.farms.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn secrets_are_redacted_in_debug_output() {
        let config: Config = serde_yaml::from_str(SAMPLE).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sat-token"));
        assert!(!debug.contains("key-1"));
        assert!(debug.contains("[REDACTED]"));
    }
}
