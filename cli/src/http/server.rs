use std::fs;
use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use axum::middleware;
use tokio::signal;
use tracing::{info, warn};
use trustd_core::api as core_api;

use crate::http::{
    middleware::{create_middleware_stack, request_logger},
    routes::create_router,
    AppState,
};

/// Serves until Ctrl+C, SIGTERM or `POST /api/v1/shutdown`.
const OUTER_TIMEOUT_GRACE: Duration = Duration::from_secs(1);

pub async fn start_server(cfg: &core_api::HttpServerConfig, state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", cfg.host, cfg.port))?;
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let local = listener.local_addr()?;

    let state_file = match servers_dir(cfg) {
        Some(dir) => match create_state_file(&dir, &state.session_id, local.port()) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error.kind = "http.state_file", error = %e, "state file not written");
                None
            }
        },
        None => None,
    };

    let app = create_router(state.clone())
        .layer(middleware::from_fn(request_logger))
        .layer(create_middleware_stack(outer_timeout(cfg)));

    info!(
        session_id = %state.session_id,
        capacity = state.ctx.validation().admission().capacity(),
        "HTTP server listening on http://{}",
        local
    );

    let mut shutdown_rx = state.shutdown_tx.subscribe();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = signal::ctrl_c() => info!("Received Ctrl+C signal"),
                _ = shutdown_rx.recv() => info!("Received shutdown signal from API"),
                _ = wait_for_sigterm() => info!("Received SIGTERM signal"),
            }
            info!("Starting graceful shutdown...");
        })
        .await?;

    info!("Server shutdown complete");
    if let Some(path) = state_file {
        if let Err(e) = fs::remove_file(&path) {
            warn!(error.kind = "http.state_file", error = %e, "failed to remove state file");
        }
    }
    Ok(())
}

/// Last-resort layer deadline. Sits past the validate handler's own budget
/// so a slow validation answers with its JSON body first.
fn outer_timeout(cfg: &core_api::HttpServerConfig) -> Duration {
    Duration::from_millis(cfg.request_timeout_ms) + OUTER_TIMEOUT_GRACE
}

fn servers_dir(cfg: &core_api::HttpServerConfig) -> Option<PathBuf> {
    match cfg.state_dir.as_deref().map(str::trim) {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::home_dir().map(|home| home.join(".trustd").join("servers")),
    }
}

fn create_state_file(dir: &Path, session_id: &str, port: u16) -> std::io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("http-{port}.pid"));
    let mut file = fs::File::create(&path)?;
    writeln!(file, "session_id={session_id}")?;
    writeln!(file, "port={port}")?;
    writeln!(file, "pid={}", std::process::id())?;
    writeln!(file, "start_time={}", chrono::Local::now().to_rfc3339())?;
    info!(path = %path.display(), "state file written");
    Ok(path)
}

#[cfg(unix)]
async fn wait_for_sigterm() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!(error.kind = "http.sigterm", error = %e, "SIGTERM handler unavailable");
            std::future::pending::<()>().await
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_sigterm() {
    std::future::pending::<()>().await
}
