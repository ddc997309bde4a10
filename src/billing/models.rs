use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Locale used whenever a family has not chosen one
pub const DEFAULT_LOCALE: &str = "en";

/// A family account. Read-only to the billing jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Family {
    pub id: Uuid,
    pub name: String,
    /// Day of month (1-31) the billing cycle closes; 0 means the last day of the month
    pub settlement_day: i32,
}

/// Stored opt-in flag. `Unspecified` covers both a missing preferences row
/// and a NULL column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PreferenceFlag {
    Enabled,
    Disabled,
    #[default]
    Unspecified,
}

impl From<Option<bool>> for PreferenceFlag {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => PreferenceFlag::Enabled,
            Some(false) => PreferenceFlag::Disabled,
            None => PreferenceFlag::Unspecified,
        }
    }
}

impl PreferenceFlag {
    /// The one place the opt-out default is decided: only an explicit
    /// `Disabled` turns a notification off, `Unspecified` resolves to enabled.
    pub fn is_enabled(self) -> bool {
        match self {
            PreferenceFlag::Enabled | PreferenceFlag::Unspecified => true,
            PreferenceFlag::Disabled => false,
        }
    }
}

/// Per-family notification preferences
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportPreferences {
    pub weekly_report_enabled: PreferenceFlag,
    pub monthly_report_enabled: PreferenceFlag,
    pub settlement_email_enabled: PreferenceFlag,
    pub report_email: Option<String>,
    pub report_locale: Option<String>,
}

/// Raw `report_preferences` row
#[derive(Debug, FromRow)]
pub struct ReportPreferencesRow {
    pub weekly_report_enabled: Option<bool>,
    pub monthly_report_enabled: Option<bool>,
    pub settlement_email_enabled: Option<bool>,
    pub report_email: Option<String>,
    pub report_locale: Option<String>,
}

impl From<ReportPreferencesRow> for ReportPreferences {
    fn from(row: ReportPreferencesRow) -> Self {
        Self {
            weekly_report_enabled: row.weekly_report_enabled.into(),
            monthly_report_enabled: row.monthly_report_enabled.into(),
            settlement_email_enabled: row.settlement_email_enabled.into(),
            report_email: row.report_email,
            report_locale: row.report_locale,
        }
    }
}

impl ReportPreferences {
    /// Override address, ignoring blank values
    pub fn report_email(&self) -> Option<&str> {
        self.report_email.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn flag(&self, kind: ReportKind) -> PreferenceFlag {
        match kind {
            ReportKind::Weekly => self.weekly_report_enabled,
            ReportKind::Monthly => self.monthly_report_enabled,
        }
    }
}

/// Resolve the locale for a family, falling back to [`DEFAULT_LOCALE`]
pub fn resolve_locale(preferences: Option<&ReportPreferences>) -> String {
    preferences
        .and_then(|p| p.report_locale.as_deref())
        .filter(|l| !l.is_empty())
        .unwrap_or(DEFAULT_LOCALE)
        .to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Weekly,
    Monthly,
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ReportKind {
    /// Value stored in `report_history.report_type`
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Weekly => "weekly",
            ReportKind::Monthly => "monthly",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReportKind::Weekly => "Weekly",
            ReportKind::Monthly => "Monthly",
        }
    }
}

/// Inclusive reporting period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// One child's result of a settlement run, as written by the settlement procedure
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct SettlementRecord {
    pub child_id: Uuid,
    pub child_name: String,
    pub debt_amount: Option<Decimal>,
    pub interest_calculated: Option<Decimal>,
    /// JSONB as stored; not guaranteed to be an array
    pub interest_tiers: Option<serde_json::Value>,
    pub credit_limit_before: Option<Decimal>,
    pub credit_limit_after: Option<Decimal>,
    pub credit_limit_adjustment: Option<Decimal>,
}

/// One bracket of the tiered interest schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterestTier {
    pub tier_order: i32,
    pub min_debt: Decimal,
    /// `None` marks the unbounded top tier
    pub max_debt: Option<Decimal>,
    pub debt_in_tier: Decimal,
    pub rate: Decimal,
    pub interest_amount: Decimal,
}

/// What the settlement procedure reported back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcedureOutcome {
    Completed,
    /// The procedure ran and returned an error object
    Rejected { message: String },
}

/// One child's line in a settlement notice
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChildSettlementNotice {
    pub child_id: Uuid,
    pub child_name: String,
    pub debt_amount: Decimal,
    pub interest_calculated: Decimal,
    pub interest_tiers: Vec<InterestTier>,
    pub credit_limit_before: Decimal,
    pub credit_limit_after: Decimal,
    pub credit_limit_adjustment: Decimal,
}

/// Payload rendered into the interest/credit notice email
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementNotice {
    pub locale: String,
    pub family_name: String,
    pub children: Vec<ChildSettlementNotice>,
}

/// Per-child activity row of a periodic report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChildReport {
    pub child_id: Uuid,
    pub name: String,
    pub balance: Decimal,
    pub earned: Decimal,
    pub spent: Decimal,
    pub transaction_count: i64,
    /// Monthly reports only
    pub interest_charged: Option<Decimal>,
}

/// Content of a weekly or monthly report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportData {
    pub family_name: String,
    pub period: ReportPeriod,
    pub locale: String,
    pub children: Vec<ChildReport>,
}

impl ReportData {
    pub fn total_earned(&self) -> Decimal {
        self.children.iter().map(|c| c.earned).sum()
    }

    pub fn total_spent(&self) -> Decimal {
        self.children.iter().map(|c| c.spent).sum()
    }
}

/// Settlement job tally
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SettlementTally {
    pub processed: u32,
    pub errors: Vec<String>,
}

/// Periodic report job tally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportTally {
    pub sent: u32,
    pub failed: u32,
    pub skipped: u32,
}
