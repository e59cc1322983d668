//! Read-only REST API over a finished evaluation report.
//!
//! Provides three GET endpoints:
//! - `/report` — the complete report
//! - `/summaries` — monthly distribution summaries, filterable by metric,
//!   scope and scenario
//! - `/daily` — per-day metric values, additionally filterable by date range

mod handlers;
mod types;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tracing::info;

use crate::eval::report::MetricsReport;

pub use types::{DailyQuery, ErrorResponse, SummaryQuery};

/// Immutable application state shared across all request handlers.
///
/// Built once after evaluation completes and wrapped in `Arc`; no locks
/// are needed since the report is read-only.
pub struct AppState {
    pub report: MetricsReport,
}

/// Builds the axum router with all API routes.
///
/// # Arguments
///
/// * `state` - Shared application state
///
/// # Returns
///
/// Configured `Router` ready to serve.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/report", get(handlers::get_report))
        .route("/summaries", get(handlers::get_summaries))
        .route("/daily", get(handlers::get_daily))
        .with_state(state)
}

/// Binds to the given address and serves the API until shutdown.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app).await
}
