//! Save As host entry point.
//!
//! Reads bridge requests from stdin and writes replies to stdout, so all
//! logging goes to stderr.

mod bridge;
mod config;
mod dialog;

use std::sync::Arc;

use saveas_flow::SaveService;
use tracing_subscriber::EnvFilter;

use crate::dialog::{DialogPlatform, LogSurface};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting saveas host");

    let config = config::Config::load()?;
    tracing::info!(strategy = ?config.strategy, "configuration loaded");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let platform = Arc::new(DialogPlatform::new(config.strategy, config.default_dir()));
        let service = SaveService::new(platform, config.save_config())
            .with_surface(Arc::new(LogSurface));

        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        let interrupt = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "ctrl-c handler unavailable");
                std::future::pending::<()>().await;
            }
            tracing::info!("SIGINT received, shutting down");
        };
        bridge::serve(service, stdin, stdout, interrupt).await
    })?;

    tracing::info!("host shut down cleanly");
    Ok(())
}
