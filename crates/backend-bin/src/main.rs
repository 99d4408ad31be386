use std::path::PathBuf;

use anyhow::Context;
use backend_lib::{config::Settings, router, AppState};
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Auth service: username/password and Google sign-in over HTTP
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Configuration file; `USERAUTH_*` environment variables override it
    #[arg(short, long, default_value = backend_lib::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Refuse to start on missing or unsafe settings
    let settings = Settings::load_from(&args.config)
        .with_context(|| format!("loading configuration from {}", args.config.display()))?;

    // Initialize tracing; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let addr = settings.server.bind_addr()?;
    let state = AppState::new(settings)?;
    let app = router::create_router(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}
