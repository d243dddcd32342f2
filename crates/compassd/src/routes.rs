//! API routes for compassd.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use compass_common::{GuidanceQuery, GuidanceResponse};

use crate::server::AppState;
use crate::stats::VerificationStatsSnapshot;

type AppStateArc = Arc<AppState>;

// ============================================================================
// Guidance Routes
// ============================================================================

pub fn guidance_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/guidance", post(generate_guidance))
}

/// Run one guidance request through the full pipeline. Degraded outcomes
/// (denied consent, exhausted providers, escalated drafts) are part of
/// the envelope, not HTTP errors.
async fn generate_guidance(
    State(state): State<AppStateArc>,
    Json(query): Json<GuidanceQuery>,
) -> Json<GuidanceResponse> {
    Json(state.orchestrator.generate(query).await)
}

// ============================================================================
// Health Routes
// ============================================================================

/// Compliance blockers are listed so operators can confirm none were
/// silently disabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub blockers: Vec<String>,
    pub verification: VerificationStatsSnapshot,
}

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/health", get(health_check))
}

async fn health_check(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    let verification = state.stats.read().await.snapshot();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        blockers: vec![
            "consent_gate".to_string(),
            "sanitiser".to_string(),
            "verification".to_string(),
        ],
        verification,
    })
}
