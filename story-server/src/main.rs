//! Story generator API server.
//!
//! Serves `/generate-story` over HTTP. Prompt templates are read from
//! `PROMPTS_FILE` at startup and re-read on SIGHUP.

use anyhow::Context;
use story_server::{app, AppState, Settings};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("story_server=info".parse()?)
                .add_directive("story_core=info".parse()?),
        )
        .init();

    let settings = Settings::from_env().context("Failed to read configuration")?;
    let bind_address = settings.bind_address();
    let prompts_file = settings.prompts_file.clone();

    let state = AppState::from_settings(settings).with_context(|| {
        format!("Failed to load prompt templates from {}", prompts_file.display())
    })?;

    info!(
        genres = state.store().available_genres().len(),
        creativity_levels = state.store().available_creativity_levels().len(),
        model = state.service().model(),
        "Application state initialized"
    );

    #[cfg(unix)]
    spawn_reload_on_hangup(state.clone())?;

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;
    info!(address = %bind_address, "Listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Server shut down cleanly");
    Ok(())
}

/// Re-read the template file each time the process receives SIGHUP.
#[cfg(unix)]
fn spawn_reload_on_hangup(state: AppState) -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup()).context("Failed to register SIGHUP handler")?;
    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            if let Err(e) = state.reload_templates().await {
                warn!(error = %e, "Template reload failed, keeping previous templates");
            }
        }
    });
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
