use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;
use trustd_core::api as core_api;

/// Request counters for `/health`.
#[derive(Debug)]
pub struct ServerStats {
    started_at: Instant,
    requests_total: AtomicU64,
    errors_total: AtomicU64,
}

impl ServerStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            requests_total: AtomicU64::new(0),
            errors_total: AtomicU64::new(0),
        }
    }

    pub fn increment_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_error(&self) {
        self.errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn errors_total(&self) -> u64 {
        self.errors_total.load(Ordering::Relaxed)
    }

    pub fn uptime_seconds(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}

impl Default for ServerStats {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub session_id: String,
    pub ctx: core_api::AppContext,
    pub stats: Arc<ServerStats>,
    pub shutdown_tx: broadcast::Sender<()>,
}

impl AppState {
    pub fn new(session_id: String, ctx: core_api::AppContext) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            session_id,
            ctx,
            stats: Arc::new(ServerStats::new()),
            shutdown_tx,
        }
    }
}
