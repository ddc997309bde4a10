use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::models::*;
use crate::error::{AppError, AppResult};
use crate::settlement::triggers::is_last_day_of_month;

/// Family lookups
#[async_trait]
pub trait FamilyRepository: Send + Sync {
    /// Families whose billing day is `today`, in one query
    async fn fetch_families_due_today(&self, today: NaiveDate) -> AppResult<Vec<Family>>;

    async fn fetch_all_active_families(&self) -> AppResult<Vec<Family>>;

    async fn fetch_parent_email(&self, family_id: Uuid) -> AppResult<Option<String>>;
}

#[async_trait]
pub trait PreferencesRepository: Send + Sync {
    async fn fetch_preferences(&self, family_id: Uuid) -> AppResult<Option<ReportPreferences>>;
}

/// Dedup markers for periodic reports
#[async_trait]
pub trait ReportHistoryRepository: Send + Sync {
    async fn report_history_exists(
        &self,
        family_id: Uuid,
        kind: ReportKind,
        period: ReportPeriod,
    ) -> AppResult<bool>;

    async fn insert_report_history(
        &self,
        family_id: Uuid,
        kind: ReportKind,
        period: ReportPeriod,
    ) -> AppResult<()>;
}

#[async_trait]
pub trait SettlementRepository: Send + Sync {
    /// Invoke the settlement procedure.
    ///
    /// `Ok(Rejected)` is an error the procedure reported; `Err` means the call
    /// itself failed. `None` lets the procedure pick its own date.
    async fn run_settlement_procedure(
        &self,
        family_id: Uuid,
        settlement_date: Option<NaiveDate>,
    ) -> AppResult<ProcedureOutcome>;

    /// Per-child records of the family's latest settlement
    async fn fetch_settlement_records(&self, family_id: Uuid) -> AppResult<Vec<SettlementRecord>>;
}

/// PostgreSQL-backed repository - one method per query shape
pub struct PgBillingRepository {
    pub pool: PgPool,
}

impl PgBillingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FamilyRepository for PgBillingRepository {
    async fn fetch_families_due_today(&self, today: NaiveDate) -> AppResult<Vec<Family>> {
        let families = sqlx::query_as::<_, Family>(
            r#"
            SELECT id, name, settlement_day
            FROM families
            WHERE is_active
              AND (settlement_day = $1 OR (settlement_day = 0 AND $2))
            ORDER BY name, id
            "#,
        )
        .bind(today.day() as i32)
        .bind(is_last_day_of_month(today))
        .fetch_all(&self.pool)
        .await?;

        Ok(families)
    }

    async fn fetch_all_active_families(&self) -> AppResult<Vec<Family>> {
        let families = sqlx::query_as::<_, Family>(
            r#"
            SELECT id, name, settlement_day
            FROM families
            WHERE is_active
            ORDER BY name, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(families)
    }

    async fn fetch_parent_email(&self, family_id: Uuid) -> AppResult<Option<String>> {
        let email = sqlx::query_scalar::<_, String>(
            r#"
            SELECT email
            FROM parents
            WHERE family_id = $1 AND email IS NOT NULL AND email <> ''
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(family_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(email)
    }
}

#[async_trait]
impl PreferencesRepository for PgBillingRepository {
    async fn fetch_preferences(&self, family_id: Uuid) -> AppResult<Option<ReportPreferences>> {
        let row = sqlx::query_as::<_, ReportPreferencesRow>(
            r#"
            SELECT weekly_report_enabled, monthly_report_enabled, settlement_email_enabled,
                   report_email, report_locale
            FROM report_preferences
            WHERE family_id = $1
            "#,
        )
        .bind(family_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ReportPreferences::from))
    }
}

#[async_trait]
impl ReportHistoryRepository for PgBillingRepository {
    async fn report_history_exists(
        &self,
        family_id: Uuid,
        kind: ReportKind,
        period: ReportPeriod,
    ) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM report_history
                WHERE family_id = $1 AND report_type = $2
                  AND period_start = $3 AND period_end = $4
            )
            "#,
        )
        .bind(family_id)
        .bind(kind.as_str())
        .bind(period.start)
        .bind(period.end)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn insert_report_history(
        &self,
        family_id: Uuid,
        kind: ReportKind,
        period: ReportPeriod,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO report_history (id, family_id, report_type, period_start, period_end, sent_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (family_id, report_type, period_start, period_end) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(family_id)
        .bind(kind.as_str())
        .bind(period.start)
        .bind(period.end)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            debug!("Report history for family {} ({}) already present", family_id, kind);
        }
        Ok(())
    }
}

#[async_trait]
impl SettlementRepository for PgBillingRepository {
    async fn run_settlement_procedure(
        &self,
        family_id: Uuid,
        settlement_date: Option<NaiveDate>,
    ) -> AppResult<ProcedureOutcome> {
        let result = sqlx::query("SELECT process_family_settlement($1, $2)")
            .bind(family_id)
            .bind(settlement_date)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(ProcedureOutcome::Completed),
            // Raised inside the procedure (RAISE EXCEPTION, constraint violations)
            Err(sqlx::Error::Database(db_error)) => Ok(ProcedureOutcome::Rejected {
                message: db_error.message().to_string(),
            }),
            Err(e) => Err(AppError::Database(e)),
        }
    }

    async fn fetch_settlement_records(&self, family_id: Uuid) -> AppResult<Vec<SettlementRecord>> {
        let records = sqlx::query_as::<_, SettlementRecord>(
            r#"
            SELECT sr.child_id, c.name AS child_name,
                   sr.debt_amount, sr.interest_calculated, sr.interest_tiers,
                   sr.credit_limit_before, sr.credit_limit_after, sr.credit_limit_adjustment
            FROM settlement_records sr
            JOIN children c ON c.id = sr.child_id
            WHERE sr.family_id = $1
              AND sr.settlement_date = (
                  SELECT MAX(settlement_date) FROM settlement_records WHERE family_id = $1
              )
            ORDER BY c.name, sr.child_id
            "#,
        )
        .bind(family_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
