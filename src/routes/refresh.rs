//! Ingestion trigger and refresh status HTTP endpoints.
//!
//! GET /api/v1/weather/refresh — run one ingestion cycle on demand (the same
//! cycle the background scheduler runs). GET /api/v1/refresh/status — dump
//! the shared refresh state as JSON.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use sqlx::PgPool;
use utoipa::ToSchema;

use crate::errors::{AppError, ErrorResponse};
use crate::services::ingest::{self, RefreshState, SharedRefreshState};
use crate::services::owm::OwmClient;

/// Shared application state for the refresh trigger.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub owm_client: OwmClient,
    pub refresh_state: SharedRefreshState,
}

/// Response for a successful refresh trigger.
#[derive(Debug, Serialize, ToSchema)]
pub struct RefreshResponse {
    /// Update summary (cities updated / total)
    pub message: String,
    /// Retention sweep summary; absent when the sweep failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<String>,
}

/// Trigger one weather refresh cycle.
///
/// Fetches current weather for every registered city, upserts the readings,
/// and sweeps out expired ones. Per-city failures are skipped; the cycle
/// fails only when the city list is empty (404) or unreadable (500).
#[utoipa::path(
    get,
    path = "/api/v1/weather/refresh",
    tag = "Weather",
    responses(
        (status = 200, description = "Refresh cycle completed", body = RefreshResponse),
        (status = 404, description = "No cities registered", body = ErrorResponse),
        (status = 500, description = "City list could not be read", body = ErrorResponse),
    )
)]
pub async fn trigger_refresh(
    State(state): State<AppState>,
) -> Result<Json<RefreshResponse>, AppError> {
    let outcome =
        ingest::run_refresh_cycle(&state.pool, &state.owm_client, &state.refresh_state).await?;

    let message = format!(
        "Weather updated for {} of {} cities",
        outcome.cities_updated, outcome.cities_total,
    );
    let maintenance = outcome
        .expired_removed
        .map(|count| format!("Removed {} expired readings", count));

    Ok(Json(RefreshResponse {
        message,
        maintenance,
    }))
}

/// Get the current refresh scheduler status.
///
/// Returns per-city info from the last cycle (recorded_at, last_result) and
/// global info (next_wakeup_at, last_cycle_completed_at, total_cycles).
#[utoipa::path(
    get,
    path = "/api/v1/refresh/status",
    tag = "Weather",
    responses(
        (status = 200, description = "Current refresh status", body = RefreshState),
    )
)]
pub async fn get_refresh_status(
    State(state): State<SharedRefreshState>,
) -> Json<RefreshState> {
    let s = state.read().await;
    Json(s.clone())
}
