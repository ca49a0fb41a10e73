use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Multi-day weather forecast for one farm location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherForecast {
    pub fetched_at: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub daily: Vec<DailyForecast>,
    pub aggregate: ForecastAggregate,
}

/// One forecast day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub min_temp_c: f64,
    pub max_temp_c: f64,
    pub precip_mm: f64,
    /// 0.0-1.0
    pub precip_probability: f64,
    pub wind_kmh: f64,
}

/// Summary values over the forecast horizon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForecastAggregate {
    pub total_rain_10d_mm: f64,
    pub rainy_days: u32,
    pub max_temperature_c: f64,
    pub min_temperature_c: f64,
}

/// A day counts as rainy above this much expected precipitation.
pub const RAINY_DAY_THRESHOLD_MM: f64 = 1.0;

impl WeatherForecast {
    /// Maximum of a per-day value across the forecast horizon.
    pub fn max_over_days(&self, pick: fn(&DailyForecast) -> f64) -> Option<f64> {
        self.daily
            .iter()
            .map(pick)
            .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }

    /// Minimum of a per-day value across the forecast horizon.
    pub fn min_over_days(&self, pick: fn(&DailyForecast) -> f64) -> Option<f64> {
        self.daily
            .iter()
            .map(pick)
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }
}

impl ForecastAggregate {
    /// Derive summary values from daily forecasts. The rain total covers at
    /// most the first ten days.
    pub fn from_daily(daily: &[DailyForecast]) -> Self {
        let first_10 = &daily[..daily.len().min(10)];
        let total_rain_10d_mm = first_10.iter().map(|d| d.precip_mm).sum();
        let rainy_days = first_10
            .iter()
            .filter(|d| d.precip_mm > RAINY_DAY_THRESHOLD_MM)
            .count() as u32;

        let max_temperature_c = daily
            .iter()
            .map(|d| d.max_temp_c)
            .fold(f64::NEG_INFINITY, f64::max);
        let min_temperature_c = daily
            .iter()
            .map(|d| d.min_temp_c)
            .fold(f64::INFINITY, f64::min);

        Self {
            total_rain_10d_mm,
            rainy_days,
            max_temperature_c: if daily.is_empty() {
                0.0
            } else {
                max_temperature_c
            },
            min_temperature_c: if daily.is_empty() {
                0.0
            } else {
                min_temperature_c
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(date: &str, min: f64, max: f64, rain: f64) -> DailyForecast {
        DailyForecast {
            date: date.parse().unwrap(),
            min_temp_c: min,
            max_temp_c: max,
            precip_mm: rain,
            precip_probability: 0.2,
            wind_kmh: 10.0,
        }
    }

    #[test]
    fn aggregate_from_daily() {
        let daily = vec![
            day("2025-03-01", 12.0, 28.0, 0.0),
            day("2025-03-02", 10.0, 31.0, 4.0),
            day("2025-03-03", 14.0, 26.0, 0.5),
        ];

        let agg = ForecastAggregate::from_daily(&daily);
        assert!((agg.total_rain_10d_mm - 4.5).abs() < 1e-9);
        // 0.5mm is below the rainy-day threshold
        assert_eq!(agg.rainy_days, 1);
        assert!((agg.max_temperature_c - 31.0).abs() < 1e-9);
        assert!((agg.min_temperature_c - 10.0).abs() < 1e-9);
    }

    #[test]
    fn aggregate_rain_total_caps_at_ten_days() {
        let daily: Vec<DailyForecast> = (1..=14)
            .map(|i| day(&format!("2025-03-{:02}", i), 10.0, 25.0, 2.0))
            .collect();

        let agg = ForecastAggregate::from_daily(&daily);
        assert!((agg.total_rain_10d_mm - 20.0).abs() < 1e-9);
        assert_eq!(agg.rainy_days, 10);
    }

    #[test]
    fn aggregate_empty_daily() {
        let agg = ForecastAggregate::from_daily(&[]);
        assert_eq!(agg.rainy_days, 0);
        assert_eq!(agg.total_rain_10d_mm, 0.0);
    }
}
