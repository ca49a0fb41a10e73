use super::generator::ResilientTextGenerator;
use crate::datasources::{GenerationOptions, RecommendationSource};
use crate::models::{
    AlertEnvelope, AlertTier, ExtremeEvent, Farm, FarmConditionReport, FarmStatus, Severity,
};

/// Budget for `compact_text` once event notes and enrichment are appended.
/// Compact alerts target a single 160-char SMS segment but may run to three;
/// past 480 the transport must truncate, so anything that would push the text
/// beyond this budget is dropped whole rather than cut mid-sentence.
pub const EVENT_NOTE_BUDGET: usize = 450;

const MAX_OPTIMAL_LISTED: usize = 4;
const MAX_DEVIATIONS_LISTED: usize = 3;
const MAX_REASSURANCE_METRICS: usize = 3;
const MAX_APPENDED_EVENTS: usize = 2;

const ENRICHMENT_MAX_TOKENS: u32 = 120;
const ENRICHMENT_TEMPERATURE: f64 = 0.6;

/// Builds tiered farmer alerts from a condition report and detected events.
///
/// Compact and detailed renderings are derived from the same structured
/// inputs, and a deterministic template message is always produced even when
/// every enrichment call fails.
pub struct AlertSynthesizer {
    generator: Option<ResilientTextGenerator>,
    recommendations: Option<Box<dyn RecommendationSource>>,
}

impl AlertSynthesizer {
    pub fn new(
        generator: Option<ResilientTextGenerator>,
        recommendations: Option<Box<dyn RecommendationSource>>,
    ) -> Self {
        Self {
            generator,
            recommendations,
        }
    }

    /// Build the condition alert for one farm.
    pub async fn synthesize(
        &self,
        farm: &Farm,
        report: &FarmConditionReport,
        events: &[ExtremeEvent],
    ) -> AlertEnvelope {
        let first_name = first_name(&farm.name);

        let (tier, severity, mut compact) = match report.deviations.len() {
            0 => (
                AlertTier::GoodNews,
                Severity::Info,
                self.good_news_text(&first_name, report),
            ),
            1 => {
                let dev = &report.deviations[0];
                let mut text = format!(
                    "{}, your {} farm needs attention: {}.",
                    first_name, report.crop, dev.description
                );
                if let Some(snippet) = self.enrich(report).await {
                    let candidate = format!("{} {}", text, snippet);
                    // Enrichment is a bonus; skip it rather than blow the budget
                    if candidate.chars().count() <= EVENT_NOTE_BUDGET {
                        text = candidate;
                    }
                }
                (AlertTier::SingleDeviation, dev.severity, text)
            }
            n => {
                let worst = report.worst_severity().unwrap_or(Severity::Info);
                let listed: Vec<String> = report
                    .deviations
                    .iter()
                    .take(MAX_DEVIATIONS_LISTED)
                    .map(|d| d.description.clone())
                    .collect();
                let mut text = format!(
                    "{}, {} issues on your {} farm: {}.",
                    first_name,
                    n,
                    report.crop,
                    listed.join("; ")
                );
                if !report.optimal_metrics.is_empty() {
                    let good: Vec<&str> = report
                        .optimal_metrics
                        .iter()
                        .take(MAX_REASSURANCE_METRICS)
                        .map(|m| m.as_str())
                        .collect();
                    text.push_str(&format!(" Still good: {}.", good.join(", ")));
                }
                (AlertTier::MultiDeviation, worst, text)
            }
        };

        append_event_note(&mut compact, events);

        let recommendation = self.fetch_recommendation(farm, report).await;
        let detailed = render_detailed(farm, Some(report), events, recommendation.as_deref());

        debug_assert!(!compact.is_empty(), "alerts must never be empty");

        AlertEnvelope {
            tier,
            severity,
            compact_text: compact,
            detailed_text: detailed,
            report: Some(report.clone()),
            events: events.to_vec(),
        }
    }

    /// Build the standalone extreme-event alert used when a critical event
    /// suppresses the regular condition alert.
    pub fn synthesize_extreme(&self, farm: &Farm, events: &[ExtremeEvent]) -> AlertEnvelope {
        let severity = events
            .iter()
            .map(|e| e.severity)
            .max()
            .unwrap_or(Severity::Critical);

        let mut compact = format!("URGENT {}:", first_name(&farm.name));
        for event in events.iter().take(MAX_APPENDED_EVENTS) {
            let candidate = format!("{} {}", compact, event.message_en);
            if candidate.chars().count() > EVENT_NOTE_BUDGET {
                break;
            }
            compact = candidate;
        }
        if compact.ends_with(':') {
            // All messages were over budget; fall back to a minimal line
            compact = format!(
                "URGENT {}: extreme conditions detected on your farm. Check your fields now.",
                first_name(&farm.name)
            );
        }

        let detailed = render_detailed(farm, None, events, None);

        AlertEnvelope {
            tier: AlertTier::ExtremeEvent,
            severity,
            compact_text: compact,
            detailed_text: detailed,
            report: None,
            events: events.to_vec(),
        }
    }

    fn good_news_text(&self, first_name: &str, report: &FarmConditionReport) -> String {
        let listed: Vec<&str> = report
            .optimal_metrics
            .iter()
            .take(MAX_OPTIMAL_LISTED)
            .map(|m| m.as_str())
            .collect();
        if listed.is_empty() {
            format!(
                "Habari njema {}! Your {} farm is in good shape. Keep up the good work!",
                first_name, report.crop
            )
        } else {
            format!(
                "Habari njema {}! Your {} farm is doing well. Optimal: {}. Keep it up!",
                first_name,
                report.crop,
                listed.join(", ")
            )
        }
    }

    /// Best-effort enrichment snippet. Failures come back as None and leave
    /// no trace in the alert.
    async fn enrich(&self, report: &FarmConditionReport) -> Option<String> {
        let generator = self.generator.as_ref()?;
        let dev = report.deviations.first()?;
        let prompt = format!(
            "You advise smallholder farmers in Kenya by SMS. The {} on a {} farm \
             is {} ({}). In at most two short sentences, give one practical step \
             the farmer should take today. Plain text only.",
            dev.metric, report.crop, dev.value, dev.description
        );
        let opts = GenerationOptions {
            max_tokens: ENRICHMENT_MAX_TOKENS,
            temperature: ENRICHMENT_TEMPERATURE,
            thinking_enabled: false,
        };

        let text = generator.generate(&prompt, &opts).await;
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        (!text.is_empty()).then_some(text)
    }

    async fn fetch_recommendation(
        &self,
        farm: &Farm,
        report: &FarmConditionReport,
    ) -> Option<String> {
        let source = self.recommendations.as_ref()?;
        match source.recommend(farm, report).await {
            Ok(Some(rec)) if !rec.products.is_empty() => Some(format!(
                "{} Suggested products: {}",
                rec.summary,
                rec.products.join(", ")
            )),
            Ok(Some(rec)) => Some(rec.summary),
            Ok(None) => None,
            Err(e) => {
                tracing::debug!("product recommendation unavailable: {}", e);
                None
            }
        }
    }
}

/// Append up to two of the worst events to the compact text, or nothing at
/// all if that would breach the budget.
fn append_event_note(compact: &mut String, events: &[ExtremeEvent]) {
    if events.is_empty() {
        return;
    }

    let note: Vec<&str> = events
        .iter()
        .take(MAX_APPENDED_EVENTS)
        .map(|e| e.message_en.as_str())
        .collect();
    let candidate = format!("{} Also: {}", compact, note.join(" "));

    if candidate.chars().count() <= EVENT_NOTE_BUDGET {
        *compact = candidate;
    }
}

fn render_detailed(
    farm: &Farm,
    report: Option<&FarmConditionReport>,
    events: &[ExtremeEvent],
    recommendation: Option<&str>,
) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Farm: {} ({}, {})", farm.name, farm.crop, farm.county));

    if let Some(report) = report {
        lines.push(format!(
            "Status: {} | Score: {:.0}/100",
            report.status, report.overall_score
        ));
        if !report.deviations.is_empty() {
            lines.push("Deviations:".to_string());
            for dev in &report.deviations {
                lines.push(format!(
                    "  [{}] {} = {:.1}{} (optimal {:.1}-{:.1}{}, {:.0}% {})",
                    dev.severity,
                    dev.metric,
                    dev.value,
                    dev.unit,
                    dev.optimal_min,
                    dev.optimal_max,
                    dev.unit,
                    dev.pct_deviation,
                    dev.direction,
                ));
            }
        }
        if !report.optimal_metrics.is_empty() {
            lines.push(format!("Optimal: {}", report.optimal_metrics.join(", ")));
        }
        if report.status == FarmStatus::Optimal {
            lines.push("All monitored conditions are within optimal range.".to_string());
        }
    }

    if !events.is_empty() {
        lines.push("Active alerts:".to_string());
        for event in events {
            lines.push(format!(
                "  [{}] {}: {} / {}",
                event.severity, event.event_type, event.message_en, event.message_sw
            ));
        }
    }

    if let Some(rec) = recommendation {
        lines.push(format!("Agrovet: {}", rec));
    }

    lines.join("\n")
}

fn first_name(full_name: &str) -> String {
    full_name
        .split_whitespace()
        .next()
        .unwrap_or("Mkulima")
        .to_string()
}
