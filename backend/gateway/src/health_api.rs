//! Gateway Health API

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::server::GatewayState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: String,
    pub service: String,
    pub version: String,
    pub shapes: usize,
    pub clients: usize,
    pub run_active: bool,
    pub uptime_seconds: i64,
    pub timestamp: DateTime<Utc>,
}

/// Handler for `GET /api/health`
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthReport> {
    let session = &state.session;
    let shapes = session.store().read().await.len();
    let clients = session.clients().len().await;
    let now = Utc::now();

    Json(HealthReport {
        status: "ok".into(),
        service: "whiteboard".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        shapes,
        clients,
        run_active: session.driver().slot().is_active(),
        uptime_seconds: (now - session.started_at()).num_seconds(),
        timestamp: now,
    })
}
