// Settlement Runner - closes the billing cycle of every family due today.
//
// Families are processed one at a time in fetch order. A failing family is
// recorded in the tally and the run moves on; nothing is retried.

use chrono::NaiveDate;
use tracing::{error, info, warn};

use crate::billing::models::{Family, ProcedureOutcome, SettlementTally};
use crate::billing::BillingContext;
use crate::error::isolate;
use crate::settlement::notifier::SettlementNotifier;

pub struct SettlementRunner {
    ctx: BillingContext,
    notifier: SettlementNotifier,
}

impl SettlementRunner {
    pub fn new(ctx: BillingContext, notifier: SettlementNotifier) -> Self {
        Self { ctx, notifier }
    }

    pub async fn run(&self, today: NaiveDate) -> SettlementTally {
        let mut tally = SettlementTally::default();

        let families = match self.ctx.families.fetch_families_due_today(today).await {
            Ok(families) => families,
            Err(e) => {
                error!("❌ Failed to fetch families due for settlement: {}", e);
                return tally;
            }
        };

        if families.is_empty() {
            info!("✓ No families due for settlement on {}", today);
            return tally;
        }

        info!("🔄 Settling {} families for {}", families.len(), today);

        for family in &families {
            if self.settle(family, &mut tally).await {
                // Best-effort: the notice cannot touch the tally
                self.notifier.notify(family).await;
            }
        }

        info!(
            "✓ Settlement run finished: {} processed, {} errors",
            tally.processed,
            tally.errors.len()
        );
        tally
    }

    /// Returns true when the family settled successfully
    async fn settle(&self, family: &Family, tally: &mut SettlementTally) -> bool {
        let outcome = isolate(self.ctx.settlements.run_settlement_procedure(family.id, None)).await;

        match outcome {
            Ok(ProcedureOutcome::Completed) => {
                tally.processed += 1;
                info!("✓ Settled family {}", family.name);
                true
            }
            Ok(ProcedureOutcome::Rejected { message }) => {
                let entry = format!("Settlement failed for {}: {}", family.name, message);
                warn!("{}", entry);
                tally.errors.push(entry);
                false
            }
            Err(message) => {
                let entry = format!("Settlement error for {}: {}", family.name, message);
                warn!("{}", entry);
                tally.errors.push(entry);
                false
            }
        }
    }
}
