//! invoice-router command line entry point

use clap::{Parser, Subcommand};
use invoice_router::api::ApiServer;
use invoice_router::batch;
use invoice_router::classifier::build_classifier;
use invoice_router::config::RouterConfig;
use invoice_router::extraction::build_extractor;
use invoice_router::health::{ClassifierHealthCheck, HealthCheckManager, StoreHealthCheck};
use invoice_router::observability::init_default_logging;
use invoice_router::processing::RoutingPipeline;
use invoice_router::store::build_store;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

/// Supplier country classification and logistics routing for invoices
#[derive(Parser)]
#[command(name = "invoice-router")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "INVOICE_ROUTER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve,
    /// Route already-extracted `.txt` invoices and append the decisions
    Route {
        #[arg(long, value_name = "DIR", default_value = "data/ocr_text_normalized")]
        input_dir: PathBuf,
    },
    /// Write normalized copies of OCR `.txt` files
    Normalize {
        #[arg(long, value_name = "DIR", default_value = "data/ocr_text")]
        input_dir: PathBuf,
        #[arg(long, value_name = "DIR", default_value = "data/ocr_text_normalized")]
        output_dir: PathBuf,
    },
    /// Score the classifier on a labelled JSONL file
    Validate {
        #[arg(long, value_name = "FILE", default_value = "data/training/val.jsonl")]
        val_file: PathBuf,
    },
    /// Validate configuration
    Config {
        /// Show the effective configuration
        #[arg(long)]
        show: bool,
    },
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_default_logging();

    let config = match load_configuration(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Serve => serve(config).await,
        Commands::Route { input_dir } => route(config, &input_dir).await,
        Commands::Normalize {
            input_dir,
            output_dir,
        } => normalize(&input_dir, &output_dir).await,
        Commands::Validate { val_file } => validate(config, &val_file).await,
        Commands::Config { show } => handle_config_command(&config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

/// Explicit path, else the first default location that exists, else defaults
fn load_configuration(config_path: Option<&Path>) -> Result<RouterConfig, Box<dyn std::error::Error>> {
    let mut config = match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            RouterConfig::load_from_file(path)?
        }
        None => {
            let default_paths = ["invoice-router.toml", "config/invoice-router.toml"];
            match default_paths.iter().map(Path::new).find(|p| p.exists()) {
                Some(path) => {
                    info!("Loading configuration from: {}", path.display());
                    RouterConfig::load_from_file(path)?
                }
                None => {
                    info!("No configuration file found, using defaults");
                    RouterConfig::default()
                }
            }
        }
    };

    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

fn build_pipeline(config: &RouterConfig) -> Result<RoutingPipeline, Box<dyn std::error::Error>> {
    let _span = invoice_router::lifecycle_span!(phase = "startup").entered();
    let classifier = Arc::new(build_classifier(&config.classifier)?);
    let extractor = build_extractor(&config.extraction);
    let store = build_store(&config.store);

    info!(
        extractor = extractor.name(),
        store = store.source(),
        "Pipeline assembled"
    );
    Ok(RoutingPipeline::new(extractor, classifier, store))
}

async fn serve(config: RouterConfig) -> CliResult {
    info!(
        "Starting invoice-router v{} as {}",
        env!("CARGO_PKG_VERSION"),
        config.service.id
    );

    let pipeline = build_pipeline(&config)?;

    let mut health = HealthCheckManager::new();
    health.add_health_check(Box::new(ClassifierHealthCheck::new(Arc::clone(
        pipeline.classifier(),
    ))));
    health.add_health_check(Box::new(StoreHealthCheck::new(Arc::clone(pipeline.store()))));

    let ip: IpAddr = config.service.bind_address.parse()?;
    let addr = SocketAddr::new(ip, config.service.port);

    let server = Arc::new(ApiServer::new(
        config.service.id.clone(),
        pipeline,
        health,
        config.service.max_upload_bytes,
    ));

    server.run(addr, shutdown_signal()).await?;
    info!("Application shutdown complete");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
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
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down gracefully..."),
        _ = terminate => info!("Received SIGTERM, shutting down gracefully..."),
    }
}

async fn route(config: RouterConfig, input_dir: &Path) -> CliResult {
    let pipeline = build_pipeline(&config)?;
    let report = batch::route_directory(&pipeline, input_dir).await?;

    println!(
        "Routed {} invoice(s) to {}",
        report.routed.len(),
        config.store.path.display()
    );
    for (path, e) in &report.failed {
        println!("  failed: {}: {}", path.display(), e);
    }

    if report.failed.is_empty() {
        Ok(())
    } else {
        Err(format!("{} invoice(s) could not be routed", report.failed.len()).into())
    }
}

async fn normalize(input_dir: &Path, output_dir: &Path) -> CliResult {
    let count = batch::normalize_directory(input_dir, output_dir).await?;
    println!("Normalized {} file(s) into {}", count, output_dir.display());
    Ok(())
}

async fn validate(config: RouterConfig, val_file: &Path) -> CliResult {
    let classifier = Arc::new(build_classifier(&config.classifier)?);
    let report = batch::validate_file(classifier, val_file).await?;

    println!("Sample predictions (validation):");
    for prediction in &report.sample {
        println!("{}", serde_json::to_string(prediction)?);
    }
    println!(
        "\nAverage confidence on validation set: {:.4}",
        report.average_confidence
    );
    println!(
        "Accuracy: {:.4} ({}/{})",
        report.accuracy, report.correct, report.total
    );
    Ok(())
}

fn handle_config_command(config: &RouterConfig, show: bool) -> CliResult {
    if show {
        println!("{}", toml::to_string_pretty(config)?);
    }
    info!("Configuration validation complete");
    Ok(())
}
