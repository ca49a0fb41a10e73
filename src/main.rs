mod cli;
mod config;
mod datasources;
mod error;
mod logic;
mod models;
mod registry;

use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use datasources::{
    CountySatelliteClient, HttpGenerativeBackend, IotPlatformClient, SmsGatewayClient,
    WeatherApiClient,
};
use logic::{
    AlertSynthesizer, ConditionEvaluator, ExtremeEventDetector, ResilientTextGenerator,
    SweepOrchestrator,
};
use registry::{MetricRegistry, RuleTables};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize logging
    let default_filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    // Rule tables are fixed at startup; a malformed table is fatal
    let registry = Arc::new(MetricRegistry::builtin());
    registry.validate()?;
    let rules = Arc::new(RuleTables::builtin());
    rules.validate()?;

    match cli.command.unwrap_or(Commands::Sweep) {
        Commands::Rules => {
            print_rules(&registry, &rules);
            Ok(())
        }
        Commands::Check => {
            let config = Config::load(cli.config)?;
            run_check(&config).await;
            Ok(())
        }
        Commands::Sweep => {
            let config = Config::load(cli.config)?;
            run_sweep(&config, registry, rules).await
        }
    }
}

async fn run_sweep(
    config: &Config,
    registry: Arc<MetricRegistry>,
    rules: Arc<RuleTables>,
) -> anyhow::Result<()> {
    let generator = build_generator(config);
    if generator.is_none() {
        tracing::info!("no generator configured - alerts will use template text only");
    }

    let orchestrator = SweepOrchestrator::new(
        ConditionEvaluator::new(registry),
        ExtremeEventDetector::new(rules),
        AlertSynthesizer::new(generator, None),
        Box::new(IotPlatformClient::new(config.telemetry.clone())),
        Box::new(CountySatelliteClient::new(config.satellite.clone())),
        Box::new(WeatherApiClient::new(config.weather.clone())),
        Box::new(SmsGatewayClient::new(config.sms.clone())),
        config.sweep.lookback_hours,
    );

    let summary = orchestrator.run_sweep(&config.farms).await;

    println!(
        "Sweep finished: {} farms scanned, {} extreme alerts, {} condition alerts, {} errors",
        summary.farmers_scanned,
        summary.extreme_alerts_sent,
        summary.condition_alerts_sent,
        summary.errors
    );
    Ok(())
}

fn build_generator(config: &Config) -> Option<ResilientTextGenerator> {
    let generator_config = config.generator.as_ref()?;

    let primary: Box<dyn datasources::GenerativeBackend> = Box::new(HttpGenerativeBackend::new(
        "primary",
        generator_config.primary.clone(),
    ));
    let secondary = generator_config
        .secondary
        .as_ref()
        .map(|secondary_config| {
            Box::new(HttpGenerativeBackend::new("secondary", secondary_config.clone()))
                as Box<dyn datasources::GenerativeBackend>
        });

    Some(ResilientTextGenerator::with_deadline(
        primary,
        secondary,
        Duration::from_secs(generator_config.timeout_secs),
    ))
}

async fn run_check(config: &Config) {
    println!("Farms in roster: {}", config.farms.len());

    let telemetry = IotPlatformClient::new(config.telemetry.clone());
    let satellite = CountySatelliteClient::new(config.satellite.clone());
    let weather = WeatherApiClient::new(config.weather.clone());

    use datasources::{SatelliteSource, TelemetrySource, WeatherSource};
    let mut status_parts = Vec::new();
    status_parts.push(if telemetry.test_connection().await.unwrap_or(false) {
        "IoT platform: OK"
    } else {
        "IoT platform: OFFLINE"
    });
    status_parts.push(if satellite.test_connection().await.unwrap_or(false) {
        "Satellite: OK"
    } else {
        "Satellite: OFFLINE"
    });
    status_parts.push(if weather.test_connection().await.unwrap_or(false) {
        "Weather: OK"
    } else {
        "Weather: OFFLINE"
    });

    println!("{}", status_parts.join(" | "));
}

fn print_rules(registry: &MetricRegistry, rules: &RuleTables) {
    println!("Crop profiles:");
    for crop in registry.known_crops() {
        let profile = registry.ranges_for(crop);
        println!("  {}:", crop);
        for (metric, range) in profile {
            println!(
                "    {} [{} - {}] {}",
                metric, range.min, range.max, range.unit
            );
        }
    }

    println!("Weather rules:");
    for rule in &rules.weather {
        println!(
            "  {} ({}): {} {} {}",
            rule.event_type,
            rule.severity,
            rule.field.as_str(),
            rule.direction.as_str(),
            rule.threshold
        );
    }

    println!("Sensor rules:");
    for rule in &rules.sensor {
        println!("  {} ({}): {} {:?}", rule.event_type, rule.severity, rule.metric, rule.kind);
    }

    println!(
        "Satellite limits: ndvi stress floor {}, bloom probability ceiling {}",
        rules.satellite.ndvi_stress_floor, rules.satellite.bloom_probability_ceiling
    );
}
