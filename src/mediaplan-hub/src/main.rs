//! MediaPlan Hub — media-planning marketplace backend.
//!
//! Main entry point: loads configuration, starts the HTTP API, the metrics
//! exporter, and the side-effect outbox worker.

use clap::Parser;
use mediaplan_api::ApiServer;
use mediaplan_core::AppConfig;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "mediaplan-hub")]
#[command(about = "Media-planning marketplace backend")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "MEDIAPLAN__NODE_ID")]
    node_id: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "MEDIAPLAN__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Metrics port (overrides config)
    #[arg(long, env = "MEDIAPLAN__API__METRICS_PORT")]
    metrics_port: Option<u16>,

    /// Disable outbound email regardless of config
    #[arg(long, default_value_t = false)]
    no_email: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mediaplan=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("MediaPlan Hub starting up");

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(port) = cli.metrics_port {
        config.api.metrics_port = port;
    }
    if cli.no_email {
        config.notifications.email_enabled = false;
    }

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        metrics_port = config.api.metrics_port,
        email_enabled = config.notifications.email_enabled,
        "Configuration loaded"
    );

    let server = ApiServer::new(config);
    server.start_metrics()?;
    let _worker = server.spawn_outbox_worker();
    server.start_http().await?;

    Ok(())
}
