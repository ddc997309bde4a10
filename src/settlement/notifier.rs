// Settlement Notifier - sends the interest/credit notice after a family settles.
//
// Best-effort: every guard short-circuits silently and nothing is returned to
// the settlement run, so a notice can never change the settlement tally.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::billing::models::{
    resolve_locale, ChildSettlementNotice, Family, InterestTier, SettlementNotice, SettlementRecord,
};
use crate::billing::BillingContext;
use crate::error::{isolate, AppResult};
use crate::notifications::email::OutboundEmail;
use crate::notifications::templates::{settlement_notice_html, settlement_notice_subject};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeOutcome {
    Sent,
    Skipped(&'static str),
    SendFailed(String),
}

pub struct SettlementNotifier {
    ctx: BillingContext,
    app_base_url: String,
}

impl SettlementNotifier {
    pub fn new(ctx: BillingContext, app_base_url: String) -> Self {
        Self { ctx, app_base_url }
    }

    /// Never fails; outcomes are only logged
    pub async fn notify(&self, family: &Family) -> NoticeOutcome {
        let outcome = match isolate(self.try_notify(family)).await {
            Ok(outcome) => outcome,
            Err(message) => NoticeOutcome::SendFailed(message),
        };

        match &outcome {
            NoticeOutcome::Sent => info!("📧 Settlement notice sent for {}", family.name),
            NoticeOutcome::Skipped(reason) => {
                debug!("Settlement notice skipped for {}: {}", family.name, reason)
            }
            NoticeOutcome::SendFailed(error) => {
                warn!("Settlement notice failed for {}: {}", family.name, error)
            }
        }
        outcome
    }

    async fn try_notify(&self, family: &Family) -> AppResult<NoticeOutcome> {
        if !self.ctx.email.is_available() {
            return Ok(NoticeOutcome::Skipped("email service unavailable"));
        }

        let preferences = self.ctx.preferences.fetch_preferences(family.id).await.unwrap_or_else(|e| {
            debug!("Preferences lookup failed for {}: {}", family.name, e);
            None
        });

        if let Some(prefs) = &preferences {
            if !prefs.settlement_email_enabled.is_enabled() {
                return Ok(NoticeOutcome::Skipped("settlement emails disabled"));
            }
        }

        let recipient = self
            .ctx
            .resolve_recipient(family.id, preferences.as_ref())
            .await
            .ok()
            .flatten();
        let Some(to) = recipient else {
            return Ok(NoticeOutcome::Skipped("no recipient email"));
        };

        let records = match self.ctx.settlements.fetch_settlement_records(family.id).await {
            Ok(records) if !records.is_empty() => records,
            _ => return Ok(NoticeOutcome::Skipped("no settlement records")),
        };

        let locale = resolve_locale(preferences.as_ref());
        let notice = SettlementNotice {
            locale: locale.clone(),
            family_name: family.name.clone(),
            children: records.iter().map(child_notice).collect(),
        };

        let email = OutboundEmail {
            to,
            subject: settlement_notice_subject(&notice, &locale),
            html: settlement_notice_html(&notice, &self.app_base_url),
        };

        let sent = self.ctx.email.send_email(&email).await;
        if sent.success {
            Ok(NoticeOutcome::Sent)
        } else {
            Ok(NoticeOutcome::SendFailed(
                sent.error.unwrap_or_else(|| "send failed".to_string()),
            ))
        }
    }
}

fn child_notice(record: &SettlementRecord) -> ChildSettlementNotice {
    ChildSettlementNotice {
        child_id: record.child_id,
        child_name: record.child_name.clone(),
        debt_amount: record.debt_amount.unwrap_or_default(),
        interest_calculated: record.interest_calculated.unwrap_or_default(),
        interest_tiers: normalize_tiers(record.interest_tiers.as_ref()),
        credit_limit_before: record.credit_limit_before.unwrap_or_default(),
        credit_limit_after: record.credit_limit_after.unwrap_or_default(),
        credit_limit_adjustment: record.credit_limit_adjustment.unwrap_or_default(),
    }
}

/// Anything that is not a JSON array yields no tiers
pub fn normalize_tiers(value: Option<&Value>) -> Vec<InterestTier> {
    let Some(Value::Array(tiers)) = value else {
        return Vec::new();
    };

    tiers
        .iter()
        .map(|tier| InterestTier {
            tier_order: tier
                .get("tier_order")
                .and_then(decimal_field)
                .and_then(|d| d.trunc().to_i32())
                .unwrap_or(0),
            min_debt: coalesce(tier.get("min_debt")),
            // Zero and missing both mean the unbounded top tier
            max_debt: tier
                .get("max_debt")
                .and_then(decimal_field)
                .filter(|d| !d.is_zero()),
            debt_in_tier: coalesce(tier.get("debt_in_tier")),
            rate: coalesce(tier.get("rate")),
            interest_amount: coalesce(tier.get("interest_amount")),
        })
        .collect()
}

fn coalesce(value: Option<&Value>) -> Decimal {
    value.and_then(decimal_field).unwrap_or(Decimal::ZERO)
}

fn decimal_field(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}
