//! Zhihu comments CLI
//!
//! Local execution entry point. For AWS Lambda, use `zhihu-comments-lambda`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use zhihu_comments::{
    api, config,
    error::Result,
    models::{FeedConfig, ServerConfig, iso_millis},
    pipeline::{self, CommentService, RefreshMode, RefreshOutcome},
    services::FeedFetcher,
    storage::{LocalStorage, PayloadStore},
};

/// Zhihu question answers as paginated comments
#[derive(Parser, Debug)]
#[command(
    name = "zhihu-comments",
    version,
    about = "Scrape, cache and serve the answers of a Zhihu question"
)]
struct Cli {
    /// Directory containing config files and the disk cache
    /// (default: $ZHIHU_DATA_DIR or ./data)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API and refresh periodically
    Serve {
        /// Address to bind (default: $ZHIHU_BIND_ADDR or 127.0.0.1:3000)
        #[arg(long)]
        bind: Option<SocketAddr>,
    },

    /// Fetch once and write the disk cache
    Refresh,

    /// Show the cached payload
    Info,

    /// Validate configuration files
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut server = ServerConfig::from_env()?;
    if let Some(dir) = cli.data_dir {
        server.data_dir = dir;
    }

    let config = config::load_all(&server.data_dir, FeedConfig::server_defaults());
    let config = Arc::new(config);
    let storage = Arc::new(LocalStorage::new(&server.data_dir));

    match cli.command {
        Command::Serve { bind } => {
            config.validate()?;
            if let Some(addr) = bind {
                server.bind_addr = addr;
            }
            serve(server, config, storage).await?;
        }

        Command::Refresh => {
            config.validate()?;
            let fetcher = Arc::new(FeedFetcher::new(Arc::clone(&config))?);
            let service = CommentService::new(config, fetcher, storage.clone());

            if let RefreshOutcome::Refreshed(summary) =
                service.refresh(RefreshMode::Forced).await?
            {
                log::info!(
                    "Fetched {} comments at {}",
                    summary.total,
                    iso_millis::format(&summary.fetched_at)
                );
                if !summary.persisted {
                    log::warn!("Disk cache at {} was not updated", storage.location());
                }
            }
        }

        Command::Info => {
            log::info!("Data directory: {}", server.data_dir.display());
            log::info!("Question: {} ({} endpoint)", config.question_id, config.endpoint);

            match storage.load().await? {
                Some(payload) => {
                    log::info!("Cached question: {}", payload.question.title);
                    log::info!("Cached comments: {}", payload.total);
                    log::info!("Fetched at: {}", iso_millis::format(&payload.fetched_at));
                }
                None => log::info!("No cached comments yet."),
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
        }
    }

    Ok(())
}

async fn serve(
    server: ServerConfig,
    config: Arc<FeedConfig>,
    storage: Arc<LocalStorage>,
) -> Result<()> {
    let fetcher = Arc::new(FeedFetcher::new(Arc::clone(&config))?);
    let service = CommentService::new(config, fetcher, storage);
    service.init().await;

    let shutdown = CancellationToken::new();
    let refresh_loop = pipeline::spawn_refresh_loop(service.clone(), shutdown.clone());

    let app = api::create_router(service.clone(), &server.resource);
    let listener = tokio::net::TcpListener::bind(server.bind_addr).await?;
    log::info!(
        "Listening on http://{}/api/{}/comments",
        server.bind_addr,
        server.resource
    );

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            log::info!("Shutting down...");
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Err(e) = refresh_loop.await {
        log::error!("Refresh loop ended abnormally: {}", e);
    }
    service.shutdown().await;

    log::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
