// Periodic Report Runner - one pipeline for weekly and monthly reports.
//
// Per family: preferences -> history dedup -> recipient -> generate -> send ->
// record history. A report is recorded only after a successful send, so a
// repeated run for the same period skips families that already got it.

use chrono::NaiveDate;
use tracing::{debug, error, info, warn};

use crate::billing::models::{resolve_locale, Family, ReportKind, ReportPeriod, ReportTally};
use crate::billing::BillingContext;
use crate::error::{isolate, AppResult};
use crate::notifications::email::OutboundEmail;
use crate::reports::strategy::ReportStrategy;

#[derive(Debug, Clone, PartialEq, Eq)]
enum FamilyOutcome {
    Sent,
    Skipped(&'static str),
    Failed(String),
}

pub struct PeriodicReportRunner {
    ctx: BillingContext,
    app_base_url: String,
}

impl PeriodicReportRunner {
    pub fn new(ctx: BillingContext, app_base_url: String) -> Self {
        Self { ctx, app_base_url }
    }

    pub async fn run(&self, kind: ReportKind, today: NaiveDate) -> ReportTally {
        self.run_strategy(ReportStrategy::for_kind(kind), today).await
    }

    pub async fn run_strategy(&self, strategy: &ReportStrategy, today: NaiveDate) -> ReportTally {
        let mut tally = ReportTally::default();
        let label = strategy.kind.label();

        if !self.ctx.email.is_available() {
            warn!("⏭️ {} reports skipped: email service unavailable", label);
            return tally;
        }

        let families = match strategy.select_families(&self.ctx, today).await {
            Ok(families) => families,
            Err(e) => {
                error!("❌ Failed to fetch families for {} reports: {}", strategy.kind, e);
                return tally;
            }
        };

        let period = (strategy.bounds)(today);
        info!(
            "🔄 {} reports for {} families ({} to {})",
            label,
            families.len(),
            period.start,
            period.end
        );

        for family in &families {
            match isolate(self.process_family(strategy, family, period)).await {
                Ok(FamilyOutcome::Sent) => tally.sent += 1,
                Ok(FamilyOutcome::Skipped(reason)) => {
                    debug!("{} report skipped for {}: {}", label, family.name, reason);
                    tally.skipped += 1;
                }
                Ok(FamilyOutcome::Failed(reason)) => {
                    warn!("{} report failed for {}: {}", label, family.name, reason);
                    tally.failed += 1;
                }
                Err(message) => {
                    error!("{} report error for {}: {}", label, family.name, message);
                    tally.failed += 1;
                }
            }
        }

        info!(
            "✓ {} reports finished: {} sent, {} failed, {} skipped",
            label, tally.sent, tally.failed, tally.skipped
        );
        tally
    }

    async fn process_family(
        &self,
        strategy: &ReportStrategy,
        family: &Family,
        period: ReportPeriod,
    ) -> AppResult<FamilyOutcome> {
        let kind = strategy.kind;

        let preferences = match self.ctx.preferences.fetch_preferences(family.id).await {
            Ok(preferences) => preferences,
            Err(e) => {
                debug!("Preferences lookup failed for {}: {}", family.name, e);
                None
            }
        };

        if let Some(prefs) = &preferences {
            if !prefs.flag(kind).is_enabled() {
                return Ok(FamilyOutcome::Skipped("disabled in preferences"));
            }
        }

        if self
            .ctx
            .history
            .report_history_exists(family.id, kind, period)
            .await?
        {
            return Ok(FamilyOutcome::Skipped("already sent for this period"));
        }

        let Some(to) = self
            .ctx
            .resolve_recipient(family.id, preferences.as_ref())
            .await?
        else {
            return Ok(FamilyOutcome::Skipped("no recipient email"));
        };

        let locale = resolve_locale(preferences.as_ref());

        let Some(data) = strategy.generate(&self.ctx, family.id, period, &locale).await? else {
            return Ok(FamilyOutcome::Failed("no report data".to_string()));
        };

        let email = OutboundEmail {
            to,
            subject: (strategy.subject)(&data, &locale),
            html: (strategy.html)(&data, &self.app_base_url),
        };

        let sent = self.ctx.email.send_email(&email).await;
        if !sent.success {
            return Ok(FamilyOutcome::Failed(
                sent.error.unwrap_or_else(|| "send failed".to_string()),
            ));
        }

        // The email is out; a failed marker write must not turn this into a failure
        if let Err(e) = self
            .ctx
            .history
            .insert_report_history(family.id, kind, period)
            .await
        {
            warn!(
                "Report history write failed for {} ({}): {}",
                family.name, kind, e
            );
        }

        info!(
            "📧 {} report sent for {} ({})",
            strategy.kind.label(),
            family.name,
            sent.id.as_deref().unwrap_or("no id")
        );
        Ok(FamilyOutcome::Sent)
    }
}
