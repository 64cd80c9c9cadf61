//! HTTP listener for the minisynapse mediation engine.
//!
//! Every request, whatever its method or path, is run through one configured
//! sequence and answered with the reply the sequence left on the context.

mod server;

use anyhow::Context;
use clap::Parser;
use minisynapse::config::{EngineConfig, LoggingConfig, SendConfig};
use minisynapse::observability::init_logging;
use minisynapse::registry::SequenceRegistry;
use server::{build_router, spawn_reload_timer, AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug, Clone)]
#[command(name = "minisynapse-server")]
#[command(about = "Runs every inbound HTTP request through a mediation sequence")]
#[command(version)]
struct Cli {
    /// Listen port
    #[arg(long, env = "PORT", default_value = "8080")]
    port: u16,

    /// Listen address
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0")]
    bind: String,

    /// Sequence applied to every request
    #[arg(long, env = "SEQUENCE", default_value = "main")]
    sequence: String,

    /// Directory holding sequence definitions
    #[arg(long, env = "CONFIG_DIR", default_value = "config")]
    config_dir: PathBuf,

    /// Log filter directive (RUST_LOG wins when set)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit JSON log lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    log_json: bool,

    /// Timeout for outbound send requests, in seconds
    #[arg(long, env = "SEND_TIMEOUT_SECS", default_value = "30")]
    send_timeout_secs: f64,

    /// Re-read definitions before every request
    #[arg(long, env = "RELOAD_ON_REQUEST", default_value = "true", action = clap::ArgAction::Set)]
    reload_on_request: bool,

    /// Also re-read definitions on a timer
    #[arg(long, env = "RELOAD_INTERVAL_SECS")]
    reload_interval_secs: Option<u64>,
}

impl Cli {
    fn engine_config(&self) -> EngineConfig {
        EngineConfig::new(&self.config_dir)
            .with_default_sequence(&self.sequence)
            .with_send(SendConfig::new().with_timeout(self.send_timeout_secs))
    }

    fn logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            json: self.log_json,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.logging_config()).map_err(|e| anyhow::anyhow!(e))?;

    let config = cli.engine_config();
    std::fs::create_dir_all(&config.config_dir).with_context(|| {
        format!("cannot create config directory {}", config.config_dir.display())
    })?;

    let registry = Arc::new(
        SequenceRegistry::from_config(&config).context("cannot build outbound HTTP client")?,
    );
    registry
        .refresh()
        .context("initial load of sequence definitions failed")?;
    info!(
        config_dir = %config.config_dir.display(),
        sequences = ?registry.names(),
        "sequence definitions loaded"
    );

    if let Some(secs) = cli.reload_interval_secs.filter(|s| *s > 0) {
        spawn_reload_timer(registry.clone(), Duration::from_secs(secs));
    }

    let state = AppState::new(registry, config.default_sequence.clone(), cli.reload_on_request);
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", cli.bind, cli.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", cli.bind, cli.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    info!(
        %addr,
        sequence = %config.default_sequence,
        reload_on_request = cli.reload_on_request,
        "listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["minisynapse-server"]).unwrap();
        let config = cli.engine_config();

        assert_eq!(cli.port, 8080);
        assert!(cli.reload_on_request);
        assert_eq!(cli.reload_interval_secs, None);
        assert_eq!(config.default_sequence, "main");
        assert_eq!(config.config_dir, PathBuf::from("config"));
        assert_eq!(config.send.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::try_parse_from([
            "minisynapse-server",
            "--port",
            "9000",
            "--sequence",
            "proxy",
            "--reload-on-request",
            "false",
            "--reload-interval-secs",
            "15",
            "--send-timeout-secs",
            "2.5",
        ])
        .unwrap();
        let config = cli.engine_config();

        assert_eq!(cli.port, 9000);
        assert!(!cli.reload_on_request);
        assert_eq!(cli.reload_interval_secs, Some(15));
        assert_eq!(config.default_sequence, "proxy");
        assert_eq!(config.send.timeout(), Duration::from_millis(2500));
    }
}
