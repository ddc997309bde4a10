use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::orchestrator::DailyRunResults;

// ========== RESPONSE MODELS ==========

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: DateTime<Utc>,
}

/// Body of a successful daily trigger
#[derive(Debug, Serialize)]
pub struct DailyJobsResponse {
    pub success: bool,
    pub results: DailyRunResults,
}
