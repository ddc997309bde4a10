use axum::{extract::State, http::HeaderMap, Json};
use chrono::{NaiveDate, Utc};
use futures::FutureExt;
use std::{panic::AssertUnwindSafe, sync::Arc};
use tracing::{error, info};

use super::auth::verify_cron_request;
use super::models::*;
use crate::{
    error::{AppError, AppResult},
    orchestrator::DailyJobOrchestrator,
};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<DailyJobOrchestrator>,
    pub cron_secret: Option<String>,
    /// Source of "today" for a triggered run
    pub today: fn() -> NaiveDate,
}

/// Server clock date
pub fn utc_today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Liveness probe
/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        timestamp: Utc::now(),
    })
}

/// Run today's settlement and report jobs
/// GET|POST /api/cron/daily
///
/// Per-family failures are part of the 200 body; only a run that aborts
/// outright turns into a 500.
pub async fn run_daily_jobs(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<DailyJobsResponse>> {
    verify_cron_request(&headers, state.cron_secret.as_deref())?;

    let today = (state.today)();
    info!("⏰ Daily billing trigger received for {}", today);

    let results = AssertUnwindSafe(state.orchestrator.run(today))
        .catch_unwind()
        .await
        .map_err(|_| {
            error!("❌ Daily billing run for {} aborted", today);
            AppError::Internal("daily billing run aborted".to_string())
        })?;

    Ok(Json(DailyJobsResponse {
        success: true,
        results,
    }))
}
