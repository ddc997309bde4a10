use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

use crate::{
    api::handler::{utc_today, AppState},
    billing::{repository::PgBillingRepository, BillingContext},
    config::Config,
    error::AppResult,
    notifications::email::ResendEmailClient,
    orchestrator::DailyJobOrchestrator,
    reports::generator::PgReportDataSource,
    scheduler::DailyScheduler,
};

pub async fn initialize_app_state(config: &Config) -> AppResult<AppState> {
    info!("Initializing application components ...");

    // Database pool
    let pool = initialize_database(&config.database_url, config.db_max_connections).await?;

    let repository = Arc::new(PgBillingRepository::new(pool.clone()));
    let report_data = Arc::new(PgReportDataSource::new(pool));

    let email = Arc::new(ResendEmailClient::new(
        config.resend_api_key().map(str::to_string),
        config.email_from.clone(),
        config.resend_base_url.clone(),
    ));
    if config.resend_api_key().is_none() {
        warn!("⚠️  RESEND_API_KEY not set - settlement notices and reports disabled");
    }

    let ctx = BillingContext {
        families: repository.clone(),
        preferences: repository.clone(),
        history: repository.clone(),
        settlements: repository,
        report_data,
        email,
    };

    let orchestrator = Arc::new(DailyJobOrchestrator::new(
        ctx,
        config.app_base_url.clone(),
    ));

    if config.scheduler_enabled {
        info!("⏰ Starting in-process scheduler ({:02}:00 UTC)...", config.scheduler_hour);
        let scheduler = DailyScheduler::new(config.scheduler_hour, orchestrator.clone());
        let _handle = scheduler.start();
        info!("✅ Daily scheduler started");
    }

    if config.cron_secret().is_none() {
        warn!("⚠️  CRON_SECRET not set - cron trigger will reject every request");
    }

    info!("✅ Application state initialized");

    Ok(AppState {
        orchestrator,
        cron_secret: config.cron_secret().map(str::to_string),
        today: utc_today,
    })
}

async fn initialize_database(database_url: &str, max_connections: u32) -> AppResult<PgPool> {
    info!("📊 Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await?;

    info!("✓ Database pool configured: {} max connections", max_connections);

    sqlx::migrate!("./migrations").run(&pool).await?;

    info!("✓ Database initialized");
    Ok(pool)
}
