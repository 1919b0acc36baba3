use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use glimpse::builder::{BuildOptions, IndexBuilder};
use glimpse::client::build_client;
use glimpse::collection::IndexedCollection;
use glimpse::config::{Config, LoggingConfig};
use glimpse::encoder::{Encoder, HttpEncoder};
use glimpse::error::{GlimpseError, Result};
use glimpse::search::SearchService;
use glimpse::server::routes::build_router;
use glimpse::server::AppState;

#[derive(Parser)]
#[command(name = "glimpse", version, about = "Semantic image search")]
struct Cli {
    /// Path to a TOML config file (defaults to $GLIMPSE_CONFIG).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Load the index and serve the search API (default).
    Serve,
    /// Encode a directory of images and write the index and metadata files.
    Build {
        /// Image directory (overrides artifacts.images_dir).
        #[arg(long)]
        source: Option<PathBuf>,
        /// Maximum number of images to index.
        #[arg(long)]
        limit: Option<usize>,
        /// Output index file (overrides artifacts.index_file).
        #[arg(long)]
        index: Option<PathBuf>,
        /// Output metadata file (overrides artifacts.metadata_file).
        #[arg(long)]
        metadata: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Load config first (needed for logging setup)
    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("glimpse: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.logging);
    glimpse::metrics::init();

    let result = match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Build {
            source,
            limit,
            index,
            metadata,
        } => build(config, source, limit, index, metadata).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, kind = e.kind(), fatal = e.is_fatal(), "glimpse failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match logging.format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init();
        }
        _ => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}

async fn serve(config: Config) -> Result<()> {
    tracing::info!("glimpse starting");

    let collection = Arc::new(IndexedCollection::load(
        &config.artifacts.index_file,
        &config.artifacts.metadata_file,
    )?);

    let http_client = build_client()?;
    let encoder: Arc<dyn Encoder> = Arc::new(HttpEncoder::new(&config.encoder, http_client.clone()));
    let search = SearchService::from_config(&config, collection, encoder, http_client)?;

    let state = AppState {
        search: Arc::new(search),
        config: Arc::new(config.clone()),
    };
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(addr = %addr, "listening");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("glimpse stopped");
    Ok(())
}

async fn build(
    config: Config,
    source: Option<PathBuf>,
    limit: Option<usize>,
    index: Option<PathBuf>,
    metadata: Option<PathBuf>,
) -> Result<()> {
    let mut options = BuildOptions::from_config(&config);
    if let Some(source) = source {
        options.source_dir = source;
    }
    if limit.is_some() {
        options.limit = limit;
    }
    if let Some(index) = index {
        options.index_path = index;
    }
    if let Some(metadata) = metadata {
        options.metadata_path = metadata;
    }
    if options.index_path == options.metadata_path {
        return Err(GlimpseError::Config(
            "index and metadata outputs must be different files".into(),
        ));
    }

    let encoder = Arc::new(HttpEncoder::new(&config.encoder, build_client()?));
    tracing::info!(model = encoder.model(), "building index");

    let (_, report) = IndexBuilder::new(encoder, options).build().await?;
    for item in &report.skipped {
        tracing::warn!(file = %item.filename, reason = %item.reason, "not indexed");
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
