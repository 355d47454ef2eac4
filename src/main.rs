use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use weather_relay::events::{EventPublisher, RabbitMqClient};
use weather_relay::{InMemoryWeatherStore, WeatherRelayConfig, WeatherService, telemetry, web};

/// Current-weather HTTP service that mirrors every write to RabbitMQ
#[derive(Debug, Parser)]
#[command(name = "weather-relay", version, about)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured HTTP port
    #[arg(short, long)]
    port: Option<u16>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = WeatherRelayConfig::load_from_path(cli.config)?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    config.validate()?;

    let _telemetry = telemetry::init(&config.logging)?;

    let broker = Arc::new(RabbitMqClient::new(config.broker.clone()));
    if let Err(err) = broker.connect().await {
        tracing::warn!(error = %err, "Broker unavailable at startup, will retry on first publish");
    }

    let (publisher, publisher_handle) = EventPublisher::spawn(broker.clone());
    let service = Arc::new(WeatherService::new(
        Arc::new(InMemoryWeatherStore::new()),
        publisher,
        config.broker.destination(),
    ));

    web::run(&config.server, service).await?;

    let drain = Duration::from_secs(config.server.shutdown_drain_seconds);
    if publisher_handle.drain(drain).await {
        tracing::info!("Pending weather events flushed");
    }
    broker.close().await;

    Ok(())
}
