use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::handler::{health_check, run_daily_jobs, AppState};

pub async fn create_app(state: AppState) -> Router {
    info!("⚙️ Setting up HTTP routes...");

    let app = Router::new()
        // Public health check endpoint
        .route("/health", get(health_check))
        // Cron trigger; POST is an alias of GET
        .route("/api/cron/daily", get(run_daily_jobs).post(run_daily_jobs))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("✓ HTTP routes configured");
    app
}

pub async fn run_server(
    app: Router,
    bind_address: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("🌐 Server listening on: {}", bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}
