use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::billing::models::{ChildReport, ReportData, ReportPeriod};
use crate::error::AppResult;

/// Produces report content. `None` means there is nothing to report.
#[async_trait]
pub trait ReportDataSource: Send + Sync {
    async fn generate_weekly_report_data(
        &self,
        family_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        locale: &str,
    ) -> AppResult<Option<ReportData>>;

    async fn generate_monthly_report_data(
        &self,
        family_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        locale: &str,
    ) -> AppResult<Option<ReportData>>;
}

#[derive(Debug, FromRow)]
struct ChildActivityRow {
    child_id: Uuid,
    name: String,
    balance: Decimal,
    earned: Decimal,
    spent: Decimal,
    transaction_count: i64,
}

pub struct PgReportDataSource {
    pool: PgPool,
}

impl PgReportDataSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load(
        &self,
        family_id: Uuid,
        period: ReportPeriod,
        locale: &str,
        with_interest: bool,
    ) -> AppResult<Option<ReportData>> {
        let family_name = sqlx::query_scalar::<_, String>("SELECT name FROM families WHERE id = $1")
            .bind(family_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(family_name) = family_name else {
            return Ok(None);
        };

        let rows = sqlx::query_as::<_, ChildActivityRow>(
            r#"
            SELECT c.id AS child_id, c.name, c.balance,
                   COALESCE(SUM(t.amount) FILTER (WHERE t.kind = 'earn'), 0) AS earned,
                   COALESCE(SUM(t.amount) FILTER (WHERE t.kind = 'spend'), 0) AS spent,
                   COUNT(t.id) AS transaction_count
            FROM children c
            LEFT JOIN transactions t
              ON t.child_id = c.id AND t.created_at::date BETWEEN $2 AND $3
            WHERE c.family_id = $1
            GROUP BY c.id, c.name, c.balance
            ORDER BY c.name, c.id
            "#,
        )
        .bind(family_id)
        .bind(period.start)
        .bind(period.end)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(None);
        }

        let interest: HashMap<Uuid, Decimal> = if with_interest {
            sqlx::query_as::<_, (Uuid, Decimal)>(
                r#"
                SELECT child_id, COALESCE(SUM(interest_calculated), 0)
                FROM settlement_records
                WHERE family_id = $1 AND settlement_date BETWEEN $2 AND $3
                GROUP BY child_id
                "#,
            )
            .bind(family_id)
            .bind(period.start)
            .bind(period.end)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .collect()
        } else {
            HashMap::new()
        };

        let children = rows
            .into_iter()
            .map(|row| ChildReport {
                interest_charged: with_interest
                    .then(|| interest.get(&row.child_id).copied().unwrap_or_default()),
                child_id: row.child_id,
                name: row.name,
                balance: row.balance,
                earned: row.earned,
                spent: row.spent,
                transaction_count: row.transaction_count,
            })
            .collect();

        Ok(Some(ReportData {
            family_name,
            period,
            locale: locale.to_string(),
            children,
        }))
    }
}

#[async_trait]
impl ReportDataSource for PgReportDataSource {
    async fn generate_weekly_report_data(
        &self,
        family_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        locale: &str,
    ) -> AppResult<Option<ReportData>> {
        self.load(family_id, ReportPeriod { start, end }, locale, false).await
    }

    async fn generate_monthly_report_data(
        &self,
        family_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        locale: &str,
    ) -> AppResult<Option<ReportData>> {
        self.load(family_id, ReportPeriod { start, end }, locale, true).await
    }
}
