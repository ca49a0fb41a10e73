use super::detector::ExtremeEventDetector;
use super::evaluator::ConditionEvaluator;
use super::synthesizer::AlertSynthesizer;
use crate::datasources::{AlertTransport, SatelliteSource, TelemetrySource, WeatherSource};
use crate::error::Result;
use crate::models::{Farm, Severity, SweepSummary};

/// How far back sensor history is pulled for anomaly detection.
pub const DEFAULT_LOOKBACK_HOURS: u32 = 48;

/// One pass over the farm roster: fetch, detect, evaluate, synthesize,
/// dispatch. Farms are processed independently; one farm's failure is
/// logged and counted, never propagated.
pub struct SweepOrchestrator {
    evaluator: ConditionEvaluator,
    detector: ExtremeEventDetector,
    synthesizer: AlertSynthesizer,
    telemetry: Box<dyn TelemetrySource>,
    satellite: Box<dyn SatelliteSource>,
    weather: Box<dyn WeatherSource>,
    transport: Box<dyn AlertTransport>,
    lookback_hours: u32,
}

enum FarmOutcome {
    ExtremeAlert,
    ConditionAlert,
}

impl SweepOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        evaluator: ConditionEvaluator,
        detector: ExtremeEventDetector,
        synthesizer: AlertSynthesizer,
        telemetry: Box<dyn TelemetrySource>,
        satellite: Box<dyn SatelliteSource>,
        weather: Box<dyn WeatherSource>,
        transport: Box<dyn AlertTransport>,
        lookback_hours: u32,
    ) -> Self {
        Self {
            evaluator,
            detector,
            synthesizer,
            telemetry,
            satellite,
            weather,
            transport,
            lookback_hours,
        }
    }

    pub async fn run_sweep(&self, farms: &[Farm]) -> SweepSummary {
        let mut summary = SweepSummary::new();

        for farm in farms {
            summary.farmers_scanned += 1;

            match self.process_farm(farm).await {
                Ok(FarmOutcome::ExtremeAlert) => summary.extreme_alerts_sent += 1,
                Ok(FarmOutcome::ConditionAlert) => summary.condition_alerts_sent += 1,
                Err(e) => {
                    summary.errors += 1;
                    tracing::warn!(farm = %farm.id, "farm pipeline failed: {}", e);
                }
            }
        }

        tracing::info!(
            farmers = summary.farmers_scanned,
            extreme = summary.extreme_alerts_sent,
            condition = summary.condition_alerts_sent,
            errors = summary.errors,
            "sweep complete"
        );
        summary
    }

    async fn process_farm(&self, farm: &Farm) -> Result<FarmOutcome> {
        let history = self
            .telemetry
            .fetch_sensor_readings(&farm.id, self.lookback_hours)
            .await?;

        // Satellite and weather are useful but not required; a farm with
        // only sensor data still gets evaluated.
        let satellite = match self.satellite.fetch_county_snapshot(&farm.county).await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(farm = %farm.id, "satellite unavailable: {}", e);
                None
            }
        };
        let forecast = match self
            .weather
            .fetch_forecast(farm.latitude, farm.longitude)
            .await
        {
            Ok(forecast) => Some(forecast),
            Err(e) => {
                tracing::warn!(farm = %farm.id, "weather forecast unavailable: {}", e);
                None
            }
        };

        let events = self
            .detector
            .detect(forecast.as_ref(), &history, satellite.as_ref());

        // Anti-fatigue rule: a critical event preempts the general condition
        // alert for this cycle.
        if events.iter().any(|e| e.severity == Severity::Critical) {
            let envelope = self.synthesizer.synthesize_extreme(farm, &events);
            self.dispatch(farm, &envelope).await?;
            return Ok(FarmOutcome::ExtremeAlert);
        }

        let report = self
            .evaluator
            .evaluate(&farm.crop, history.first(), satellite.as_ref());
        let envelope = self.synthesizer.synthesize(farm, &report, &events).await;
        self.dispatch(farm, &envelope).await?;
        Ok(FarmOutcome::ConditionAlert)
    }

    async fn dispatch(
        &self,
        farm: &Farm,
        envelope: &crate::models::AlertEnvelope,
    ) -> Result<()> {
        let send_result = self.transport.send(&farm.phone, &envelope.compact_text).await;
        match &send_result {
            Ok(true) => {}
            Ok(false) => tracing::warn!(farm = %farm.id, "gateway rejected alert message"),
            Err(e) => tracing::warn!(farm = %farm.id, "alert delivery failed: {}", e),
        }
        // The alert is logged even when delivery failed or was refused;
        // only then does a delivery error count against the farm.
        self.transport.log_alert(&farm.id, envelope).await?;
        send_result.map(|_| ())
    }
}
