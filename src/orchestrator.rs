// Daily job orchestrator
//
// One run per calendar day:
// 1. Settlement for every family whose billing day is today (always)
// 2. Weekly reports (Sundays only)
// 3. Monthly reports (always called; only billing-day families qualify)

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, instrument};

use crate::billing::models::{ReportKind, ReportTally, SettlementTally};
use crate::billing::BillingContext;
use crate::reports::runner::PeriodicReportRunner;
use crate::settlement::notifier::SettlementNotifier;
use crate::settlement::runner::SettlementRunner;
use crate::settlement::triggers::is_sunday;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyRunResults {
    pub settlement: SettlementTally,
    /// `None` on every day but Sunday
    pub weekly: Option<ReportTally>,
    pub monthly: ReportTally,
}

pub struct DailyJobOrchestrator {
    settlement: SettlementRunner,
    reports: PeriodicReportRunner,
}

impl DailyJobOrchestrator {
    pub fn new(ctx: BillingContext, app_base_url: String) -> Self {
        let notifier = SettlementNotifier::new(ctx.clone(), app_base_url.clone());
        Self {
            settlement: SettlementRunner::new(ctx.clone(), notifier),
            reports: PeriodicReportRunner::new(ctx, app_base_url),
        }
    }

    #[instrument(skip(self))]
    pub async fn run(&self, today: NaiveDate) -> DailyRunResults {
        info!("🚀 Starting daily billing run for {}", today);

        let settlement = self.settlement.run(today).await;

        let weekly = if is_sunday(today) {
            Some(self.reports.run(ReportKind::Weekly, today).await)
        } else {
            None
        };

        let monthly = self.reports.run(ReportKind::Monthly, today).await;

        info!("✓ Daily billing run for {} completed", today);

        DailyRunResults {
            settlement,
            weekly,
            monthly,
        }
    }
}
