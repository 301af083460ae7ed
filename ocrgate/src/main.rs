use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ocrgate::api::{create_router, AppState};
use ocrgate::config::Config;
use ocrgate::ocr::{build_transport, OcrClient};
use ocrgate::services::OcrService;

#[derive(Parser)]
#[command(name = "ocrgate")]
#[command(about = "HTTP front-end for cloud OCR of uploaded images")]
struct Args {
    /// Bind address, overrides OCRGATE_HOST
    #[arg(long)]
    host: Option<String>,

    /// Listen port, overrides OCRGATE_PORT
    #[arg(long)]
    port: Option<u16>,

    /// Load environment variables from this file instead of `.env`
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let env_loaded = match &args.env_file {
        Some(path) => dotenvy::from_path(path).map(|_| Some(path.clone())),
        None => Ok(dotenvy::dotenv().ok()),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ocrgate=info,tower_http=debug".into()),
        )
        .with(args.log_json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!args.log_json).then(|| tracing_subscriber::fmt::layer()))
        .init();

    match env_loaded {
        Ok(Some(path)) => tracing::info!("Loaded environment from {}", path.display()),
        Ok(None) => tracing::debug!("No .env file found, using process environment"),
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to load env file: {e}"));
        }
    }

    let mut config = Config::from_env();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Initializing remote OCR client...");
    let http = build_transport(&config.remote)?;
    let client = OcrClient::new(http, Arc::new(config.remote.clone()));
    let ocr = OcrService::new(client);

    let cancel_token = CancellationToken::new();
    let state = AppState::new(config.clone(), ocr, cancel_token.clone());
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("ocrgate starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/api/ocr/health", addr);
    tracing::info!("  API docs:     http://{}/api/ocr/docs", addr);
    tracing::info!("  OpenAPI spec: http://{}/api/ocr/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token))
        .await?;

    Ok(())
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, cancelling in-flight OCR requests...");
    cancel_token.cancel();
}
