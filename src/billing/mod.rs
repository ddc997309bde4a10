pub mod models;
pub mod repository;

#[cfg(test)]
pub mod memory;

use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppResult;
use crate::notifications::email::EmailService;
use crate::reports::generator::ReportDataSource;
use models::ReportPreferences;
use repository::{
    FamilyRepository, PreferencesRepository, ReportHistoryRepository, SettlementRepository,
};

/// Collaborators shared by every daily job
#[derive(Clone)]
pub struct BillingContext {
    pub families: Arc<dyn FamilyRepository>,
    pub preferences: Arc<dyn PreferencesRepository>,
    pub history: Arc<dyn ReportHistoryRepository>,
    pub settlements: Arc<dyn SettlementRepository>,
    pub report_data: Arc<dyn ReportDataSource>,
    pub email: Arc<dyn EmailService>,
}

impl BillingContext {
    /// Preferences override address first, then the family's parent email.
    /// The parent lookup only runs when there is no override.
    pub async fn resolve_recipient(
        &self,
        family_id: Uuid,
        preferences: Option<&ReportPreferences>,
    ) -> AppResult<Option<String>> {
        if let Some(email) = preferences.and_then(|p| p.report_email()) {
            return Ok(Some(email.to_string()));
        }

        self.families.fetch_parent_email(family_id).await
    }
}
