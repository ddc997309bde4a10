use chrono::{Days, Months, NaiveDate};
use uuid::Uuid;

use crate::billing::models::{Family, ReportData, ReportKind, ReportPeriod};
use crate::billing::BillingContext;
use crate::error::AppResult;
use crate::notifications::templates;

/// Which families a report goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FamilySelection {
    AllActive,
    /// Same billing-day rule as settlement
    DueToday,
}

/// Everything that differs between the weekly and the monthly report
#[derive(Clone, Copy)]
pub struct ReportStrategy {
    pub kind: ReportKind,
    pub selection: FamilySelection,
    pub bounds: fn(NaiveDate) -> ReportPeriod,
    pub subject: fn(&ReportData, &str) -> String,
    pub html: fn(&ReportData, &str) -> String,
}

pub const WEEKLY: ReportStrategy = ReportStrategy {
    kind: ReportKind::Weekly,
    selection: FamilySelection::AllActive,
    bounds: week_bounds,
    subject: templates::weekly_report_subject,
    html: templates::weekly_report_html,
};

pub const MONTHLY: ReportStrategy = ReportStrategy {
    kind: ReportKind::Monthly,
    selection: FamilySelection::DueToday,
    bounds: month_bounds,
    subject: templates::monthly_report_subject,
    html: templates::monthly_report_html,
};

impl ReportStrategy {
    pub fn for_kind(kind: ReportKind) -> &'static ReportStrategy {
        match kind {
            ReportKind::Weekly => &WEEKLY,
            ReportKind::Monthly => &MONTHLY,
        }
    }

    pub async fn select_families(
        &self,
        ctx: &BillingContext,
        today: NaiveDate,
    ) -> AppResult<Vec<Family>> {
        match self.selection {
            FamilySelection::AllActive => ctx.families.fetch_all_active_families().await,
            FamilySelection::DueToday => ctx.families.fetch_families_due_today(today).await,
        }
    }

    pub async fn generate(
        &self,
        ctx: &BillingContext,
        family_id: Uuid,
        period: ReportPeriod,
        locale: &str,
    ) -> AppResult<Option<ReportData>> {
        match self.kind {
            ReportKind::Weekly => {
                ctx.report_data
                    .generate_weekly_report_data(family_id, period.start, period.end, locale)
                    .await
            }
            ReportKind::Monthly => {
                ctx.report_data
                    .generate_monthly_report_data(family_id, period.start, period.end, locale)
                    .await
            }
        }
    }
}

/// The seven days ending today
pub fn week_bounds(today: NaiveDate) -> ReportPeriod {
    ReportPeriod {
        start: today.checked_sub_days(Days::new(6)).unwrap_or(today),
        end: today,
    }
}

/// One calendar month ending today
pub fn month_bounds(today: NaiveDate) -> ReportPeriod {
    let start = today
        .checked_sub_months(Months::new(1))
        .and_then(|d| d.succ_opt())
        .unwrap_or(today);
    ReportPeriod { start, end: today }
}
