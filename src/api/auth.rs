use axum::http::{header::AUTHORIZATION, HeaderMap};

use crate::error::{AppError, AppResult};

/// Check the `Authorization: Bearer <secret>` header of a cron trigger.
///
/// The error converts straight into the response returned to the caller.
pub fn verify_cron_request(headers: &HeaderMap, secret: Option<&str>) -> AppResult<()> {
    let Some(secret) = secret else {
        return Err(AppError::Config("Cron secret not configured".to_string()));
    };

    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match token {
        Some(token) if constant_time_eq(token.as_bytes(), secret.as_bytes()) => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
