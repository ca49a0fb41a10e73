use crate::error::{FarmWatchError, Result};
use crate::models::{metric, Severity};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Optimal range for one metric of one crop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricRange {
    pub min: f64,
    pub max: f64,
    pub unit: String,
}

impl MetricRange {
    fn new(min: f64, max: f64, unit: &str) -> Self {
        Self {
            min,
            max,
            unit: unit.to_string(),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// BTreeMap keeps per-crop metric iteration order deterministic, which keeps
/// report and alert text deterministic for identical inputs.
pub type CropProfile = BTreeMap<String, MetricRange>;

/// Immutable crop -> {metric: range} lookup, built once at startup.
#[derive(Debug, Clone)]
pub struct MetricRegistry {
    profiles: HashMap<String, CropProfile>,
    default_profile: CropProfile,
}

impl MetricRegistry {
    pub fn new(profiles: HashMap<String, CropProfile>, default_profile: CropProfile) -> Self {
        Self {
            profiles,
            default_profile,
        }
    }

    /// Built-in agronomic profiles for the crops the platform serves.
    pub fn builtin() -> Self {
        let mut profiles = HashMap::new();

        profiles.insert("maize".to_string(), profile(&[
            (metric::SOIL_PH, 5.5, 7.0, "pH"),
            (metric::SOIL_MOISTURE_PCT, 40.0, 70.0, "%"),
            (metric::TEMPERATURE_C, 18.0, 32.0, "°C"),
            (metric::HUMIDITY_PCT, 40.0, 80.0, "%"),
            (metric::NDVI, 0.4, 0.9, "index"),
        ]));

        profiles.insert("beans".to_string(), profile(&[
            (metric::SOIL_PH, 6.0, 7.5, "pH"),
            (metric::SOIL_MOISTURE_PCT, 45.0, 70.0, "%"),
            (metric::TEMPERATURE_C, 16.0, 28.0, "°C"),
            (metric::HUMIDITY_PCT, 40.0, 75.0, "%"),
            (metric::NDVI, 0.4, 0.9, "index"),
        ]));

        profiles.insert("coffee".to_string(), profile(&[
            (metric::SOIL_PH, 5.0, 6.5, "pH"),
            (metric::SOIL_MOISTURE_PCT, 50.0, 75.0, "%"),
            (metric::TEMPERATURE_C, 15.0, 25.0, "°C"),
            (metric::HUMIDITY_PCT, 50.0, 85.0, "%"),
            (metric::NDVI, 0.5, 0.95, "index"),
        ]));

        profiles.insert("tea".to_string(), profile(&[
            (metric::SOIL_PH, 4.5, 5.8, "pH"),
            (metric::SOIL_MOISTURE_PCT, 55.0, 80.0, "%"),
            (metric::TEMPERATURE_C, 13.0, 28.0, "°C"),
            (metric::HUMIDITY_PCT, 60.0, 90.0, "%"),
            (metric::NDVI, 0.5, 0.95, "index"),
        ]));

        profiles.insert("potatoes".to_string(), profile(&[
            (metric::SOIL_PH, 5.0, 6.5, "pH"),
            (metric::SOIL_MOISTURE_PCT, 50.0, 75.0, "%"),
            (metric::TEMPERATURE_C, 10.0, 25.0, "°C"),
            (metric::HUMIDITY_PCT, 40.0, 80.0, "%"),
            (metric::NDVI, 0.4, 0.9, "index"),
        ]));

        profiles.insert("tomatoes".to_string(), profile(&[
            (metric::SOIL_PH, 6.0, 7.0, "pH"),
            (metric::SOIL_MOISTURE_PCT, 45.0, 70.0, "%"),
            (metric::TEMPERATURE_C, 18.0, 29.0, "°C"),
            (metric::HUMIDITY_PCT, 50.0, 80.0, "%"),
            (metric::NDVI, 0.4, 0.9, "index"),
        ]));

        // Conservative general-crop profile used whenever a crop has no
        // dedicated entry. Lookups never come back empty.
        let default_profile = profile(&[
            (metric::SOIL_PH, 5.5, 7.5, "pH"),
            (metric::SOIL_MOISTURE_PCT, 40.0, 75.0, "%"),
            (metric::TEMPERATURE_C, 15.0, 30.0, "°C"),
            (metric::HUMIDITY_PCT, 40.0, 85.0, "%"),
            (metric::NDVI, 0.35, 0.9, "index"),
        ]);

        Self {
            profiles,
            default_profile,
        }
    }

    /// Ranges for a crop, falling back to the default profile when the crop
    /// is unknown. Lookup is case-insensitive.
    pub fn ranges_for(&self, crop: &str) -> &CropProfile {
        self.profiles
            .get(&crop.to_lowercase())
            .unwrap_or(&self.default_profile)
    }

    pub fn known_crops(&self) -> Vec<&str> {
        let mut crops: Vec<&str> = self.profiles.keys().map(|s| s.as_str()).collect();
        crops.sort();
        crops
    }

    /// A malformed range table is a fatal misconfiguration.
    pub fn validate(&self) -> Result<()> {
        let all = self
            .profiles
            .iter()
            .flat_map(|(crop, p)| p.iter().map(move |(m, r)| (crop.as_str(), m, r)))
            .chain(
                self.default_profile
                    .iter()
                    .map(|(m, r)| ("default", m, r)),
            );

        for (crop, name, range) in all {
            if range.min > range.max || !range.min.is_finite() || !range.max.is_finite() {
                return Err(FarmWatchError::InvalidData(format!(
                    "invalid range for {}.{}: [{}, {}]",
                    crop, name, range.min, range.max
                )));
            }
        }
        Ok(())
    }
}

fn profile(entries: &[(&str, f64, f64, &str)]) -> CropProfile {
    entries
        .iter()
        .map(|(m, min, max, unit)| (m.to_string(), MetricRange::new(*min, *max, unit)))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdDirection {
    Above,
    Below,
}

impl ThresholdDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThresholdDirection::Above => "above",
            ThresholdDirection::Below => "below",
        }
    }

    pub fn breached(&self, value: f64, threshold: f64) -> bool {
        match self {
            ThresholdDirection::Above => value > threshold,
            ThresholdDirection::Below => value < threshold,
        }
    }
}

/// Which forecast value a weather rule is evaluated against.
///
/// Aggregate fields compare against a summary value directly; per-day fields
/// compare against the max of daily maxima (for `Above` rules) or the min of
/// daily minima (for `Below` rules).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherField {
    /// Aggregate: rain total over the first ten forecast days.
    TotalRain10dMm,
    /// Derived: hottest daily maximum temperature.
    DailyMaxTempC,
    /// Derived: coldest daily minimum temperature.
    DailyMinTempC,
    /// Derived: strongest daily wind.
    DailyWindKmh,
    /// Derived: wettest single forecast day.
    DailyPrecipMm,
}

impl WeatherField {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherField::TotalRain10dMm => "total_rain_10d_mm",
            WeatherField::DailyMaxTempC => "daily_max_temp_c",
            WeatherField::DailyMinTempC => "daily_min_temp_c",
            WeatherField::DailyWindKmh => "daily_wind_kmh",
            WeatherField::DailyPrecipMm => "daily_precip_mm",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherRule {
    pub event_type: String,
    pub field: WeatherField,
    pub threshold: f64,
    pub direction: ThresholdDirection,
    pub severity: Severity,
    pub message_en: String,
    pub message_sw: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SensorRuleKind {
    /// Newest reading's value above a fixed threshold.
    AbsHigh { threshold: f64 },
    /// Newest reading's value below a fixed threshold.
    AbsLow { threshold: f64 },
    /// Value dropped by at least `delta_pct` percent within the lookback
    /// window, comparing the newest reading against an older one still
    /// inside the window.
    RateDrop { delta_pct: f64, window_hours: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorRule {
    pub event_type: String,
    pub metric: String,
    #[serde(flatten)]
    pub kind: SensorRuleKind,
    pub severity: Severity,
    pub message_en: String,
    pub message_sw: String,
}

/// Hard limits for the fixed satellite extreme checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatelliteLimits {
    /// NDVI below this floor means severe crop stress.
    pub ndvi_stress_floor: f64,
    /// Algal-bloom probability above this ceiling is flagged.
    pub bloom_probability_ceiling: f64,
}

impl Default for SatelliteLimits {
    fn default() -> Self {
        Self {
            ndvi_stress_floor: 0.2,
            bloom_probability_ceiling: 0.7,
        }
    }
}

/// All extreme-event rule tables, built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct RuleTables {
    pub weather: Vec<WeatherRule>,
    pub sensor: Vec<SensorRule>,
    pub satellite: SatelliteLimits,
}

impl RuleTables {
    pub fn builtin() -> Self {
        let weather = vec![
            weather_rule(
                "drought_risk",
                WeatherField::TotalRain10dMm,
                5.0,
                ThresholdDirection::Below,
                Severity::Warning,
                "Very little rain expected over the next 10 days ({value}mm). Plan irrigation now.",
                "Mvua kidogo sana inatarajiwa siku 10 zijazo ({value}mm). Panga umwagiliaji sasa.",
            ),
            weather_rule(
                "flood_risk",
                WeatherField::TotalRain10dMm,
                150.0,
                ThresholdDirection::Above,
                Severity::Critical,
                "Heavy rains expected: {value}mm over 10 days. Clear drainage and protect seedlings.",
                "Mvua kubwa inatarajiwa: {value}mm kwa siku 10. Safisha mifereji na linda miche.",
            ),
            weather_rule(
                "heatwave",
                WeatherField::DailyMaxTempC,
                35.0,
                ThresholdDirection::Above,
                Severity::Critical,
                "Extreme heat ahead: up to {value}°C. Water crops early morning or evening.",
                "Joto kali linakuja: hadi {value}°C. Mwagilia mazao asubuhi mapema au jioni.",
            ),
            weather_rule(
                "frost_risk",
                WeatherField::DailyMinTempC,
                2.0,
                ThresholdDirection::Below,
                Severity::Critical,
                "Frost risk: temperatures down to {value}°C expected. Cover sensitive crops.",
                "Hatari ya baridi kali: nyuzi {value}°C zinatarajiwa. Funika mazao nyeti.",
            ),
            weather_rule(
                "strong_wind",
                WeatherField::DailyWindKmh,
                40.0,
                ThresholdDirection::Above,
                Severity::Warning,
                "Strong winds up to {value}km/h expected. Stake tall plants and delay spraying.",
                "Upepo mkali hadi {value}km/h unatarajiwa. Imarisha mimea mirefu na usinyunyizie dawa.",
            ),
        ];

        let sensor = vec![
            sensor_rule(
                "soil_critically_dry",
                metric::SOIL_MOISTURE_PCT,
                SensorRuleKind::AbsLow { threshold: 15.0 },
                Severity::Critical,
                "Soil moisture critically low at {value}%. Irrigate immediately.",
                "Unyevu wa udongo uko chini sana: {value}%. Mwagilia mara moja.",
            ),
            sensor_rule(
                "rapid_moisture_loss",
                metric::SOIL_MOISTURE_PCT,
                SensorRuleKind::RateDrop {
                    delta_pct: 30.0,
                    window_hours: 24.0,
                },
                Severity::Warning,
                "Soil moisture dropped {value}% in the last day. Check irrigation lines.",
                "Unyevu wa udongo umeshuka {value}% kwa siku moja. Kagua mifumo ya umwagiliaji.",
            ),
            sensor_rule(
                "field_overheating",
                metric::TEMPERATURE_C,
                SensorRuleKind::AbsHigh { threshold: 40.0 },
                Severity::Critical,
                "Field temperature at {value}°C. Crops are under heat stress.",
                "Joto shambani limefika {value}°C. Mazao yako kwenye msongo wa joto.",
            ),
            sensor_rule(
                "soil_too_acidic",
                metric::SOIL_PH,
                SensorRuleKind::AbsLow { threshold: 4.5 },
                Severity::Warning,
                "Soil pH has fallen to {value}. Consider applying agricultural lime.",
                "pH ya udongo imeshuka hadi {value}. Fikiria kuweka chokaa cha kilimo.",
            ),
            sensor_rule(
                "sensor_battery_low",
                metric::BATTERY_PCT,
                SensorRuleKind::AbsLow { threshold: 20.0 },
                Severity::Info,
                "Field sensor battery at {value}%. Readings may stop soon.",
                "Betri ya kifaa cha shambani iko {value}%. Vipimo vinaweza kukatika hivi karibuni.",
            ),
        ];

        Self {
            weather,
            sensor,
            satellite: SatelliteLimits::default(),
        }
    }

    /// A malformed rule table is a fatal misconfiguration.
    pub fn validate(&self) -> Result<()> {
        for rule in &self.weather {
            if !rule.threshold.is_finite() {
                return Err(FarmWatchError::InvalidData(format!(
                    "weather rule {} has a non-finite threshold",
                    rule.event_type
                )));
            }
        }

        for rule in &self.sensor {
            let ok = match rule.kind {
                SensorRuleKind::AbsHigh { threshold } | SensorRuleKind::AbsLow { threshold } => {
                    threshold.is_finite()
                }
                SensorRuleKind::RateDrop {
                    delta_pct,
                    window_hours,
                } => delta_pct > 0.0 && window_hours > 0.0,
            };
            if !ok {
                return Err(FarmWatchError::InvalidData(format!(
                    "sensor rule {} on {} is malformed",
                    rule.event_type, rule.metric
                )));
            }
        }

        if self.satellite.ndvi_stress_floor < 0.0 || self.satellite.bloom_probability_ceiling > 1.0
        {
            return Err(FarmWatchError::InvalidData(
                "satellite limits out of range".to_string(),
            ));
        }

        Ok(())
    }
}

fn weather_rule(
    event_type: &str,
    field: WeatherField,
    threshold: f64,
    direction: ThresholdDirection,
    severity: Severity,
    message_en: &str,
    message_sw: &str,
) -> WeatherRule {
    WeatherRule {
        event_type: event_type.to_string(),
        field,
        threshold,
        direction,
        severity,
        message_en: message_en.to_string(),
        message_sw: message_sw.to_string(),
    }
}

fn sensor_rule(
    event_type: &str,
    metric: &str,
    kind: SensorRuleKind,
    severity: Severity,
    message_en: &str,
    message_sw: &str,
) -> SensorRule {
    SensorRule {
        event_type: event_type.to_string(),
        metric: metric.to_string(),
        kind,
        severity,
        message_en: message_en.to_string(),
        message_sw: message_sw.to_string(),
    }
}
