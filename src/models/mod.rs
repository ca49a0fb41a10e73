pub mod alert;
pub mod event;
pub mod farm;
pub mod forecast;
pub mod report;
pub mod telemetry;

pub use alert::{AlertEnvelope, AlertTier, SweepSummary};
pub use event::{EventSource, ExtremeEvent};
pub use farm::{Farm, ProductRecommendation};
pub use forecast::{DailyForecast, ForecastAggregate, WeatherForecast};
pub use report::{Direction, FarmConditionReport, FarmStatus, MetricDeviation, Severity};
pub use telemetry::{metric, Reading, ReadingSource};
