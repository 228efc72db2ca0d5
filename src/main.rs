//! Main entry point for the player-watch service
//!
//! Loads the configuration, verifies the game servers, starts one poller
//! per server and runs until SIGINT or SIGTERM.

use anyhow::Result;
use clap::Parser;
use player_watch::config::{validate_config, AppConfig, DEFAULT_CONFIG_PATH};
use player_watch::service::AppState;
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

/// Player Watch - announces players joining RCON game servers
#[derive(Parser)]
#[command(
    name = "player-watch",
    version,
    about = "Polls game servers over RCON and announces newly joined players",
    long_about = "player-watch periodically asks each configured game server for its online \
                  players over the Source RCON protocol, remembers who it has already seen, \
                  and posts the names of newcomers to a Telegram chat."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = DEFAULT_CONFIG_PATH,
        help = "Path to configuration file (TOML format)"
    )]
    config: PathBuf,

    /// Query a running instance's health endpoint and exit
    #[arg(long, help = "Query the local /health endpoint and exit with its status")]
    health_check: bool,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// HTTP port override
    #[arg(long, value_name = "PORT", help = "Override health/metrics server port")]
    health_port: Option<u16>,

    /// Disable the health server
    #[arg(long, help = "Do not serve health and metrics endpoints")]
    no_health_server: bool,

    /// Skip startup verification
    #[arg(long, help = "Start polling without first dialing every server")]
    skip_verify: bool,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(
        long,
        help = "Validate configuration and exit without starting service"
    )]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Ask a running instance for its health and exit accordingly
async fn perform_health_check(config: &AppConfig) -> Result<()> {
    let url = format!("http://127.0.0.1:{}/health", config.service.health_port);
    info!("Performing health check against {}", url);

    let response = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?
        .get(&url)
        .send()
        .await;

    match response {
        Ok(resp) => {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            println!("Health Check: HTTP {}", status);
            println!("  {}", body);
            std::process::exit(if status.is_success() { 0 } else { 1 });
        }
        Err(e) => {
            error!("Health check failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("🚀 player-watch");
    info!("   Log level: {}", config.service.log_level);
    if config.service.enable_health_server {
        info!("   Health port: {}", config.service.health_port);
    }
    for server in config.server_profiles() {
        info!(
            "   Server '{}' at {} every {}s ({} ignored)",
            server.name,
            server.address,
            server.poll_interval_seconds,
            server.ignore.len()
        );
    }
    info!("   Notify chat: {}", config.notify.chat);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

/// Load configuration, apply CLI overrides, then validate once
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = AppConfig::load(&args.config)?;

    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(health_port) = args.health_port {
        config.service.health_port = health_port;
    }

    if args.no_health_server {
        config.service.enable_health_server = false;
    }

    if args.skip_verify {
        config.service.verify_servers_on_startup = false;
    }

    validate_config(&config)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {:#}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if args.health_check {
        return perform_health_check(&config).await;
    }

    if args.dry_run {
        info!("Configuration validation successful");
        display_startup_banner(&config);
        info!("Dry run completed - exiting without starting service");
        return Ok(());
    }

    display_startup_banner(&config);

    let mut app_state = match AppState::new(config).await {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = app_state.start().await {
        error!("Failed to start service: {}", e);
        std::process::exit(1);
    }

    info!("✅ player-watch is running");
    info!("Press Ctrl+C to shutdown gracefully...");

    wait_for_shutdown_signal().await;

    info!("🛑 Shutdown signal received, beginning graceful shutdown...");

    if let Err(e) = app_state.shutdown().await {
        warn!("⚠️  {}", e);
    }

    info!("🛑 player-watch stopped");
    Ok(())
}
