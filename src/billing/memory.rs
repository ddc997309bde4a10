// In-memory collaborators for tests, with scriptable failures

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::*;
use super::repository::{
    FamilyRepository, PreferencesRepository, ReportHistoryRepository, SettlementRepository,
};
use super::BillingContext;
use crate::error::{AppError, AppResult};
use crate::notifications::email::{EmailService, OutboundEmail, SendOutcome};
use crate::reports::generator::ReportDataSource;
use crate::settlement::triggers::due_for_settlement;

/// Scripted behavior of the settlement procedure for one family
#[derive(Debug, Clone)]
pub enum ScriptedSettlement {
    Complete,
    /// Procedure returns an error object
    Reject(String),
    /// Call fails with an error
    Throw(String),
    /// Call fails without an error value
    Panic,
}

/// Collaborator calls that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    FamiliesDueToday,
    ActiveFamilies,
    Preferences,
    ParentEmail,
    HistoryCheck,
    SettlementRecords,
}

type GeneratorCall = (ReportKind, Uuid, ReportPeriod, String);

pub struct MemoryStore {
    families: RwLock<Vec<(Family, bool)>>,
    parent_emails: RwLock<HashMap<Uuid, String>>,
    preferences: RwLock<HashMap<Uuid, ReportPreferences>>,
    history: RwLock<HashSet<(Uuid, ReportKind, ReportPeriod)>>,
    settlement_records: RwLock<HashMap<Uuid, Vec<SettlementRecord>>>,
    scripted: RwLock<HashMap<Uuid, ScriptedSettlement>>,
    procedure_calls: RwLock<Vec<(Uuid, Option<NaiveDate>)>>,
    no_report_data: RwLock<HashSet<Uuid>>,
    generator_calls: RwLock<Vec<GeneratorCall>>,
    failures: RwLock<HashSet<FailPoint>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            families: RwLock::new(Vec::new()),
            parent_emails: RwLock::new(HashMap::new()),
            preferences: RwLock::new(HashMap::new()),
            history: RwLock::new(HashSet::new()),
            settlement_records: RwLock::new(HashMap::new()),
            scripted: RwLock::new(HashMap::new()),
            procedure_calls: RwLock::new(Vec::new()),
            no_report_data: RwLock::new(HashSet::new()),
            generator_calls: RwLock::new(Vec::new()),
            failures: RwLock::new(HashSet::new()),
        }
    }

    /// Wire one store and one mailer into every collaborator slot
    pub fn context(store: Arc<MemoryStore>, mailer: Arc<RecordingMailer>) -> BillingContext {
        Self::context_with_email(store, mailer)
    }

    pub fn context_with_email(store: Arc<MemoryStore>, email: Arc<dyn EmailService>) -> BillingContext {
        BillingContext {
            families: store.clone(),
            preferences: store.clone(),
            history: store.clone(),
            settlements: store.clone(),
            report_data: store,
            email,
        }
    }

    pub fn sample_record(child_name: &str) -> SettlementRecord {
        SettlementRecord {
            child_id: Uuid::new_v4(),
            child_name: child_name.to_string(),
            debt_amount: Some(Decimal::new(5000, 2)),
            interest_calculated: Some(Decimal::new(250, 2)),
            interest_tiers: Some(serde_json::json!([
                {"tier_order": 1, "min_debt": 0, "max_debt": null, "debt_in_tier": 50, "rate": 5, "interest_amount": 2.5}
            ])),
            credit_limit_before: Some(Decimal::new(10000, 2)),
            credit_limit_after: Some(Decimal::new(9500, 2)),
            credit_limit_adjustment: Some(Decimal::new(-500, 2)),
        }
    }

    pub async fn add_family(&self, name: &str, settlement_day: i32) -> Family {
        let family = Family {
            id: Uuid::new_v4(),
            name: name.to_string(),
            settlement_day,
        };
        self.families.write().await.push((family.clone(), true));
        family
    }

    pub async fn deactivate(&self, family_id: Uuid) {
        for (family, active) in self.families.write().await.iter_mut() {
            if family.id == family_id {
                *active = false;
            }
        }
    }

    pub async fn set_parent_email(&self, family_id: Uuid, email: &str) {
        self.parent_emails
            .write()
            .await
            .insert(family_id, email.to_string());
    }

    pub async fn set_preferences(&self, family_id: Uuid, preferences: ReportPreferences) {
        self.preferences.write().await.insert(family_id, preferences);
    }

    pub async fn set_settlement_records(&self, family_id: Uuid, records: Vec<SettlementRecord>) {
        self.settlement_records
            .write()
            .await
            .insert(family_id, records);
    }

    pub async fn script_settlement(&self, family_id: Uuid, behavior: ScriptedSettlement) {
        self.scripted.write().await.insert(family_id, behavior);
    }

    pub async fn without_report_data(&self, family_id: Uuid) {
        self.no_report_data.write().await.insert(family_id);
    }

    pub async fn fail(&self, point: FailPoint) {
        self.failures.write().await.insert(point);
    }

    pub async fn procedure_calls(&self) -> Vec<(Uuid, Option<NaiveDate>)> {
        self.procedure_calls.read().await.clone()
    }

    pub async fn generator_calls(&self) -> Vec<GeneratorCall> {
        self.generator_calls.read().await.clone()
    }

    pub async fn has_history(&self, family_id: Uuid, kind: ReportKind, period: ReportPeriod) -> bool {
        self.history.read().await.contains(&(family_id, kind, period))
    }

    pub async fn history_len(&self) -> usize {
        self.history.read().await.len()
    }

    async fn check(&self, point: FailPoint) -> AppResult<()> {
        if self.failures.read().await.contains(&point) {
            return Err(AppError::Internal(format!("injected failure: {:?}", point)));
        }
        Ok(())
    }

    async fn generate(
        &self,
        kind: ReportKind,
        family_id: Uuid,
        period: ReportPeriod,
        locale: &str,
    ) -> AppResult<Option<ReportData>> {
        self.generator_calls
            .write()
            .await
            .push((kind, family_id, period, locale.to_string()));

        if self.no_report_data.read().await.contains(&family_id) {
            return Ok(None);
        }

        let families = self.families.read().await;
        let Some((family, _)) = families.iter().find(|(f, _)| f.id == family_id) else {
            return Ok(None);
        };

        Ok(Some(ReportData {
            family_name: family.name.clone(),
            period,
            locale: locale.to_string(),
            children: vec![ChildReport {
                child_id: Uuid::new_v4(),
                name: "Kid".into(),
                balance: Decimal::new(1000, 2),
                earned: Decimal::new(500, 2),
                spent: Decimal::new(200, 2),
                transaction_count: 3,
                interest_charged: (kind == ReportKind::Monthly).then_some(Decimal::ZERO),
            }],
        }))
    }
}

#[async_trait]
impl FamilyRepository for MemoryStore {
    async fn fetch_families_due_today(&self, today: NaiveDate) -> AppResult<Vec<Family>> {
        self.check(FailPoint::FamiliesDueToday).await?;
        Ok(self
            .families
            .read()
            .await
            .iter()
            .filter(|(f, active)| *active && due_for_settlement(f, today))
            .map(|(f, _)| f.clone())
            .collect())
    }

    async fn fetch_all_active_families(&self) -> AppResult<Vec<Family>> {
        self.check(FailPoint::ActiveFamilies).await?;
        Ok(self
            .families
            .read()
            .await
            .iter()
            .filter(|(_, active)| *active)
            .map(|(f, _)| f.clone())
            .collect())
    }

    async fn fetch_parent_email(&self, family_id: Uuid) -> AppResult<Option<String>> {
        self.check(FailPoint::ParentEmail).await?;
        Ok(self.parent_emails.read().await.get(&family_id).cloned())
    }
}

#[async_trait]
impl PreferencesRepository for MemoryStore {
    async fn fetch_preferences(&self, family_id: Uuid) -> AppResult<Option<ReportPreferences>> {
        self.check(FailPoint::Preferences).await?;
        Ok(self.preferences.read().await.get(&family_id).cloned())
    }
}

#[async_trait]
impl ReportHistoryRepository for MemoryStore {
    async fn report_history_exists(
        &self,
        family_id: Uuid,
        kind: ReportKind,
        period: ReportPeriod,
    ) -> AppResult<bool> {
        self.check(FailPoint::HistoryCheck).await?;
        Ok(self.has_history(family_id, kind, period).await)
    }

    async fn insert_report_history(
        &self,
        family_id: Uuid,
        kind: ReportKind,
        period: ReportPeriod,
    ) -> AppResult<()> {
        self.history.write().await.insert((family_id, kind, period));
        Ok(())
    }
}

#[async_trait]
impl SettlementRepository for MemoryStore {
    async fn run_settlement_procedure(
        &self,
        family_id: Uuid,
        settlement_date: Option<NaiveDate>,
    ) -> AppResult<ProcedureOutcome> {
        self.procedure_calls
            .write()
            .await
            .push((family_id, settlement_date));

        let behavior = self
            .scripted
            .read()
            .await
            .get(&family_id)
            .cloned()
            .unwrap_or(ScriptedSettlement::Complete);

        match behavior {
            ScriptedSettlement::Complete => Ok(ProcedureOutcome::Completed),
            ScriptedSettlement::Reject(message) => Ok(ProcedureOutcome::Rejected { message }),
            ScriptedSettlement::Throw(message) => Err(AppError::Rpc(message)),
            ScriptedSettlement::Panic => panic!("settlement procedure crashed"),
        }
    }

    async fn fetch_settlement_records(&self, family_id: Uuid) -> AppResult<Vec<SettlementRecord>> {
        self.check(FailPoint::SettlementRecords).await?;
        Ok(self
            .settlement_records
            .read()
            .await
            .get(&family_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ReportDataSource for MemoryStore {
    async fn generate_weekly_report_data(
        &self,
        family_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        locale: &str,
    ) -> AppResult<Option<ReportData>> {
        self.generate(ReportKind::Weekly, family_id, ReportPeriod { start, end }, locale)
            .await
    }

    async fn generate_monthly_report_data(
        &self,
        family_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        locale: &str,
    ) -> AppResult<Option<ReportData>> {
        self.generate(ReportKind::Monthly, family_id, ReportPeriod { start, end }, locale)
            .await
    }
}

/// Email transport that records every attempt
pub struct RecordingMailer {
    available: bool,
    attempts: RwLock<Vec<OutboundEmail>>,
    rejected: RwLock<HashSet<String>>,
}

impl RecordingMailer {
    pub fn new(available: bool) -> Self {
        Self {
            available,
            attempts: RwLock::new(Vec::new()),
            rejected: RwLock::new(HashSet::new()),
        }
    }

    /// Sends to this address report `success: false`
    pub async fn reject(&self, to: &str) {
        self.rejected.write().await.insert(to.to_string());
    }

    /// Emails that were accepted
    pub async fn sent(&self) -> Vec<OutboundEmail> {
        let rejected = self.rejected.read().await;
        self.attempts
            .read()
            .await
            .iter()
            .filter(|e| !rejected.contains(&e.to))
            .cloned()
            .collect()
    }

    pub async fn attempted_to(&self) -> Vec<String> {
        self.attempts.read().await.iter().map(|e| e.to.clone()).collect()
    }
}

#[async_trait]
impl EmailService for RecordingMailer {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn send_email(&self, email: &OutboundEmail) -> SendOutcome {
        self.attempts.write().await.push(email.clone());
        if self.rejected.read().await.contains(&email.to) {
            SendOutcome::failed("rejected by test mailer")
        } else {
            SendOutcome::sent(format!("test-{}", Uuid::new_v4()))
        }
    }
}

/// Email transport that blows up on first use
pub struct BrokenMailer;

#[async_trait]
impl EmailService for BrokenMailer {
    fn is_available(&self) -> bool {
        panic!("email transport crashed")
    }

    async fn send_email(&self, _email: &OutboundEmail) -> SendOutcome {
        panic!("email transport crashed")
    }
}
