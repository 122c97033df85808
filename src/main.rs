//! yieldcast - Reaction Yield Prediction Service
//!
//! Serves yield predictions and process-parameter optimization from a
//! random forest trained on synthetic data.
//!
//! # Usage
//!
//! ```bash
//! # Serve on the configured address (default 0.0.0.0:5001)
//! cargo run --release
//!
//! # Serve, retraining the default model first
//! ./yieldcast --retrain --addr 127.0.0.1:8080
//!
//! # Offline commands
//! ./yieldcast train --seed 7 --samples 500
//! ./yieldcast predict 100 5 1.0 12
//! ./yieldcast optimize --grid-points 12
//! ```
//!
//! # Environment Variables
//!
//! - `YIELDCAST_CONFIG`: Path to a TOML config file
//! - `YIELDCAST_SERVER_ADDR`: Override the bind address
//! - `YIELDCAST_CORS_ORIGINS`: Comma-separated allowed origins
//! - `RUST_LOG`: Logging level (default: info)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use yieldcast::api::{create_app, ApiState};
use yieldcast::{OptimizeOptions, Parameter, ServiceConfig, TrainOptions, YieldService};

/// Env var overriding `server.cors_origins`.
const CORS_ENV_VAR: &str = "YIELDCAST_CORS_ORIGINS";

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "yieldcast")]
#[command(about = "Reaction yield prediction and process-parameter optimization")]
#[command(version)]
struct CliArgs {
    /// Override the server address (default: "0.0.0.0:5001")
    #[arg(short, long, env = "YIELDCAST_SERVER_ADDR", value_name = "HOST:PORT")]
    addr: Option<String>,

    /// Config file (default: $YIELDCAST_CONFIG, then ./yieldcast.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Retrain the default model at startup even if one is stored
    #[arg(long)]
    retrain: bool,

    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Train the default model offline and print the report
    Train {
        /// Seed for the synthetic training data
        #[arg(long)]
        seed: Option<u64>,
        /// Number of synthetic samples
        #[arg(long)]
        samples: Option<usize>,
    },

    /// Predict the yield for one set of process parameters
    Predict {
        #[arg(allow_negative_numbers = true)]
        temperature: f64,
        #[arg(allow_negative_numbers = true)]
        pressure: f64,
        #[arg(allow_negative_numbers = true)]
        catalyst_amount: f64,
        #[arg(allow_negative_numbers = true)]
        reaction_time: f64,
    },

    /// Grid-search the training domain for the highest predicted yield
    Optimize {
        /// Grid points per parameter
        #[arg(long)]
        grid_points: Option<usize>,
    },
}

// ============================================================================
// Startup
// ============================================================================

fn load_config(args: &CliArgs) -> Result<ServiceConfig> {
    let mut config = match &args.config {
        Some(path) => ServiceConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ServiceConfig::load(),
    };

    if let Some(addr) = &args.addr {
        config.server.addr.clone_from(addr);
    }
    if let Ok(origins) = std::env::var(CORS_ENV_VAR) {
        config.server.cors_origins = origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();
    }
    Ok(config)
}

async fn run_server(service: Arc<YieldService>, retrain: bool) -> Result<()> {
    let addr = service.config().server.addr.clone();
    let app = create_app(ApiState::new(Arc::clone(&service)));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    info!("HTTP server listening on {}", addr);

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    // Bootstrap after the listener is up so /health answers while training
    let bootstrap_service = Arc::clone(&service);
    tokio::spawn(async move {
        if let Err(e) = bootstrap_service.bootstrap(retrain).await {
            error!(error = %e, "Initialization failed; model endpoints will report NOT_READY");
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel_token.cancelled().await;
        })
        .await
        .context("HTTP server error")?;

    info!("Graceful shutdown complete");
    Ok(())
}

async fn run_command(service: Arc<YieldService>, command: SubCommand) -> Result<()> {
    match command {
        SubCommand::Train { seed, samples } => {
            let report = service
                .train(TrainOptions {
                    seed,
                    sample_count: samples,
                    timeout_ms: None,
                })
                .await
                .context("Training failed")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        SubCommand::Predict {
            temperature,
            pressure,
            catalyst_amount,
            reaction_time,
        } => {
            service.bootstrap(false).await.context("Initialization failed")?;
            let prediction = service
                .predict(vec![temperature, pressure, catalyst_amount, reaction_time])
                .await
                .context("Prediction failed")?;
            println!("{}", serde_json::to_string_pretty(&prediction)?);
        }
        SubCommand::Optimize { grid_points } => {
            service.bootstrap(false).await.context("Initialization failed")?;
            let ranges = Parameter::ALL
                .iter()
                .map(|p| {
                    let (low, high) = p.domain();
                    (p.key().to_string(), vec![low, high])
                })
                .collect();
            let result = service
                .optimize(
                    ranges,
                    OptimizeOptions {
                        grid_points,
                        timeout_ms: None,
                    },
                )
                .await
                .context("Optimization failed")?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let mut args = CliArgs::parse();
    let config = Arc::new(load_config(&args)?);

    info!(
        models_dir = %config.storage.models_dir.display(),
        model = %config.storage.default_model,
        trees = config.forest.tree_count,
        "yieldcast starting"
    );

    let service = Arc::new(YieldService::open(Arc::clone(&config)).context("Failed to open storage")?);

    match args.command.take() {
        Some(command) => run_command(service, command).await,
        None => run_server(service, args.retrain).await,
    }
}
