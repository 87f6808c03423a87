//! Main entry point for the squadmatch matchmaking service
//!
//! Loads configuration, builds the matchmaking engine and serves the HTTP API
//! until a shutdown signal arrives.

use anyhow::Result;
use clap::Parser;
use squadmatch::api::{ApiServer, ApiServerConfig};
use squadmatch::config::{validate_config, AppConfig};
use squadmatch::service::{AppState, HealthCheck};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::time::Duration;
use tracing::{error, info, warn};

/// Squadmatch - reinforcement-learned teammate matchmaking
#[derive(Parser)]
#[command(
    name = "squadmatch",
    version,
    about = "A teammate matchmaking service driven by a Double-DQN compatibility model",
    long_about = "Squadmatch ranks compatible teammates for amateur sports players with a \
                 Double-DQN value network, falls back to balanced synthetic teams when too \
                 few learned candidates exist, and keeps learning from reported match outcomes."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// HTTP port override
    #[arg(long, value_name = "PORT", help = "Override HTTP server port")]
    http_port: Option<u16>,

    /// Weights directory override
    #[arg(long, value_name = "DIR", help = "Directory for model weight snapshots")]
    weights_dir: Option<PathBuf>,

    /// Seed override
    #[arg(long, value_name = "SEED", help = "Seed weight init, sampling and demo data")]
    seed: Option<u64>,

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

/// Run periodic health checks
async fn health_check_task(app_state: Arc<AppState>) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));

    while app_state.is_running().await {
        interval.tick().await;

        match HealthCheck::check(app_state.clone()).await {
            Ok(health) => {
                info!(
                    "Health check: {} - {} profiles, {} buffered experiences, {} training steps",
                    health.status,
                    health.stats.engine.profiles,
                    health.stats.engine.buffer_size,
                    health.stats.engine.train_steps
                );
            }
            Err(e) => {
                warn!("Health check failed: {}", e);
            }
        }
    }
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("🚀 Squadmatch Matchmaking Service");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!(
        "   HTTP: {}:{}",
        config.service.http_host, config.service.http_port
    );
    info!("   Weights: {}", config.model.weights_dir.display());
    info!(
        "   Network: {} hidden units, batch {}, replay capacity {}",
        config.model.hidden_units, config.model.batch_size, config.model.replay_capacity
    );
    info!(
        "   Synthetic fallback: {}",
        config.matching.enable_synthetic_fallback
    );
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

/// Load and merge configuration from environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path.display());
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(http_port) = args.http_port {
        config.service.http_port = http_port;
    }

    if let Some(weights_dir) = &args.weights_dir {
        config.model.weights_dir = weights_dir.clone();
    }

    if let Some(seed) = args.seed {
        config.model.seed = Some(seed);
    }

    validate_config(&config)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if args.dry_run {
        info!("Configuration validation successful");
        display_startup_banner(&config);
        info!("Dry run completed - exiting without starting service");
        return Ok(());
    }

    display_startup_banner(&config);

    info!("Initializing service components...");
    let app_state = match AppState::new(config.clone()).await {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = app_state.start().await {
        error!("Failed to start service: {}", e);
        std::process::exit(1);
    }

    let server = Arc::new(ApiServer::new(
        ApiServerConfig {
            host: config.service.http_host.clone(),
            port: config.service.http_port,
        },
        app_state.clone(),
    ));

    let mut server_task = {
        let server = server.clone();
        tokio::spawn(async move {
            if let Err(e) = server.start().await {
                error!("API server error: {:#}", e);
            }
        })
    };

    let health_task = {
        let app_state = app_state.clone();
        tokio::spawn(async move {
            health_check_task(app_state).await;
        })
    };

    info!("✅ Squadmatch Matchmaking Service is running");
    info!("Press Ctrl+C to shutdown gracefully...");

    let server_exited = tokio::select! {
        _ = wait_for_shutdown_signal() => false,
        _ = &mut server_task => {
            error!("API server exited unexpectedly");
            true
        }
    };

    info!("🛑 Shutdown signal received, beginning graceful shutdown...");
    health_task.abort();

    let shutdown = async {
        if !server_exited {
            if let Err(e) = server.stop().await {
                warn!("Failed to stop API server: {}", e);
            }
            if let Err(e) = server_task.await {
                warn!("API server task ended abnormally: {}", e);
            }
        }
        if let Err(e) = app_state.shutdown().await {
            warn!("Service shutdown reported an error: {}", e);
        }
    };

    match tokio::time::timeout(config.shutdown_timeout(), shutdown).await {
        Ok(()) => {
            info!("✅ Graceful shutdown completed successfully");
        }
        Err(_) => {
            warn!("⚠️  Shutdown timeout exceeded, forcing exit");
        }
    }

    info!("🛑 Squadmatch Matchmaking Service stopped");
    Ok(())
}
