//! Plex InfluxDB Collector
//!
//! Polls one or more Plex Media Servers and writes to InfluxDB:
//! - Now-playing sessions with transcode and position details
//! - Per-host and combined active stream counts
//! - Library inventory and recently-added items on a slower interval

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use validator::Validate;

use collector_core::{MediaServer, PointSink};
use influx_sink::{InfluxClient, InfluxConfig};
use plex_client::{http_client, PlexClient, PlexConfig};
use telemetry::{health, init_tracing, LoggingConfig};
use worker::{PollConfig, PollLoop};

#[derive(Parser)]
#[command(name = "plex-collector")]
#[command(version)]
#[command(about = "Collects Plex playback and library stats into InfluxDB")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path, extension optional
    #[arg(short, long, default_value = "config/default")]
    config: String,

    /// Run one polling cycle and exit
    #[arg(long)]
    single_run: bool,
}

/// Application configuration.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default)]
    general: PollConfig,

    #[serde(default)]
    influx: InfluxConfig,

    #[serde(default)]
    plex: PlexConfig,

    #[serde(default)]
    logging: LoggingConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load .env file if present
    dotenvy::dotenv().ok();

    let mut config = load_config(&cli.config)?;
    if cli.single_run {
        config.general.single_run = true;
    }

    init_tracing(&config.logging);

    info!("Starting Plex InfluxDB Collector v{}", env!("CARGO_PKG_VERSION"));

    config
        .general
        .validate()
        .context("Invalid [general] configuration")?;
    config
        .plex
        .validate()
        .context("Invalid [plex] configuration")?;

    info!(
        servers = ?config.plex.servers,
        influx = %config.influx.base_url(),
        database = %config.influx.database,
        "Loaded configuration"
    );

    // InfluxDB must be reachable before polling starts
    let influx = Arc::new(
        InfluxClient::new(config.influx.clone()).context("Failed to create InfluxDB client")?,
    );
    if let Err(e) = influx_sink::health::check_connection(&influx).await {
        health().influxdb.set_unhealthy(e.to_string());
        error!("InfluxDB connection: unhealthy");
        return Err(e).context("Failed to connect to InfluxDB");
    }
    health().influxdb.set_healthy();
    info!("InfluxDB connection: healthy");

    let token = plex_token(&config.plex).await?;
    let servers = connect_servers(&config.plex, &token).await?;

    let sink: Arc<dyn PointSink> = influx;
    let poll = PollLoop::new(config.general.clone(), servers, sink);
    poll.run(shutdown_signal()).await;

    info!(health = ?health().report(), "Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config(path: &str) -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name(path)
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables, e.g. PLEXCOLLECTOR__INFLUX__ADDRESS
        .add_source(
            config::Environment::with_prefix("PLEXCOLLECTOR")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

/// Configured token, or one obtained from plex.tv.
async fn plex_token(config: &PlexConfig) -> Result<String> {
    if let Some(token) = config.token.as_deref().filter(|t| !t.is_empty()) {
        return Ok(token.to_string());
    }

    let http = http_client(config, None).context("Failed to create sign-in client")?;
    plex_client::auth::sign_in(&http, &config.sign_in_url, &config.username, &config.password)
        .await
        .context("Failed to get Plex auth token")
}

/// Clients for every reachable server. Unreachable servers are dropped.
async fn connect_servers(config: &PlexConfig, token: &str) -> Result<Vec<Arc<dyn MediaServer>>> {
    let probe = http_client(config, None).context("Failed to create Plex client")?;
    let mut servers: Vec<Arc<dyn MediaServer>> = Vec::new();

    for (host, url) in config.server_urls() {
        match plex_client::health::check_reachable(&probe, &url).await {
            Ok(()) => {
                let client = PlexClient::new(config, host, token)
                    .context("Failed to create Plex client")?;
                servers.push(Arc::new(client));
            }
            Err(e) => {
                warn!(host = %host, error = %e, "Plex server unreachable, removing from server list");
            }
        }
    }

    if servers.is_empty() {
        health().plex.set_unhealthy("no reachable servers");
        bail!("No reachable Plex servers");
    }

    health().plex.set_healthy();
    info!(servers = servers.len(), "Plex servers connected");
    Ok(servers)
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
