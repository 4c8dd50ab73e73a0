//! Lead tracking, referrals and follow-up reminders

pub mod insights;
pub mod lead;
pub mod reminder;

pub use insights::*;
pub use lead::*;
pub use reminder::*;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::config::CrmSettings;
use crate::reconciliation::ReconciliationEngine;
use crate::revenue::{PaymentMode, RevenueDraft, RevenueEntry, RevenueStatus};
use crate::traits::{CrmStorage, RecordStorage};
use crate::types::*;

/// CRM operations over leads and reminders
///
/// Booking a lead raises a revenue entry, so the storage must also hold
/// records.
pub struct CrmDesk<S: CrmStorage + RecordStorage> {
    storage: S,
    settings: CrmSettings,
    engine: ReconciliationEngine,
}

impl<S: CrmStorage + RecordStorage + Clone> CrmDesk<S> {
    pub fn new(storage: S, settings: CrmSettings) -> Self {
        Self {
            storage,
            settings,
            engine: ReconciliationEngine::new(),
        }
    }

    pub fn settings(&self) -> &CrmSettings {
        &self.settings
    }

    /// Create a lead and credit whoever referred it
    pub async fn create_lead(&mut self, draft: LeadDraft) -> BooksResult<Lead> {
        if draft.client_name.trim().is_empty() || draft.primary_phone.trim().is_empty() {
            warn!("rejected lead without name or phone");
            return Err(BooksError::Validation(
                "Client name and primary phone are required".to_string(),
            ));
        }

        let mut lead = Lead::from_draft(draft);
        while self.storage.get_lead(&lead.lead_id).await?.is_some() {
            lead.lead_id = generate_lead_id(lead.created_at.date());
        }
        self.storage.save_lead(&lead).await?;
        info!(lead_id = %lead.lead_id, client = %lead.client_name, "created lead");

        if let Some(reference) = lead.reference_from.clone() {
            self.credit_referrer(&reference, &lead.lead_id).await?;
        }

        if lead.status.is_booked() {
            lead = self.convert(lead).await?;
        }
        Ok(lead)
    }

    async fn credit_referrer(&mut self, reference: &str, new_lead_id: &str) -> BooksResult<()> {
        let Some(mut referrer) = self.storage.find_referrer(reference).await? else {
            debug!(reference, "referral does not match any lead");
            return Ok(());
        };
        if referrer.lead_id == new_lead_id {
            return Ok(());
        }

        referrer.credit_referral(
            new_lead_id,
            self.settings.referral_points,
            self.settings.royal_client_threshold,
        );
        self.storage.update_lead(&referrer).await?;
        info!(
            referrer = %referrer.lead_id,
            referred = new_lead_id,
            points = referrer.loyalty_points,
            "credited referral"
        );
        Ok(())
    }

    /// Raise the pending revenue entry for a booked lead, once
    async fn convert(&mut self, mut lead: Lead) -> BooksResult<Lead> {
        if lead.revenue_id.is_some() {
            return Ok(lead);
        }

        let mut draft = RevenueDraft::new(
            lead.updated_at.date(),
            lead.client_name.clone(),
            lead.lead_type.revenue_source(),
            BigDecimal::from(0),
        )
        .payment_mode(PaymentMode::Pending);
        draft.notes = format!("Auto-created from CRM lead {}", lead.lead_id);
        draft.lead_id = Some(lead.lead_id.clone());

        let mut revenue = RevenueEntry::from_draft(draft, &self.engine)?;
        // nothing has been quoted yet, so the entry waits for a price
        revenue.status = RevenueStatus::Pending;
        self.storage.save_revenue(&revenue).await?;

        lead.revenue_id = Some(revenue.id.clone());
        self.storage.update_lead(&lead).await?;
        info!(lead_id = %lead.lead_id, revenue_id = %revenue.id, "converted lead");
        Ok(lead)
    }

    pub async fn get_lead(&self, lead_id: &str) -> BooksResult<Lead> {
        self.storage
            .get_lead(lead_id)
            .await?
            .ok_or_else(|| BooksError::not_found(RecordKind::Lead, lead_id))
    }

    pub async fn list_leads(&self, filter: &LeadFilter) -> BooksResult<LeadPage> {
        let leads = self.storage.list_leads().await?;
        Ok(LeadPage::paginate(leads, filter))
    }

    /// Update a lead; moving it into Booked or Converted raises its revenue entry
    pub async fn update_lead(&mut self, lead_id: &str, update: LeadUpdate) -> BooksResult<Lead> {
        let mut lead = self.get_lead(lead_id).await?;
        let became_booked = lead.apply_update(update);
        self.storage.update_lead(&lead).await?;
        info!(lead_id, status = ?lead.status, "updated lead");

        if became_booked {
            lead = self.convert(lead).await?;
        }
        Ok(lead)
    }

    /// Delete a lead; a revenue entry raised from it stays in the books
    pub async fn delete_lead(&mut self, lead_id: &str) -> BooksResult<()> {
        self.get_lead(lead_id).await?;
        self.storage.delete_lead(lead_id).await?;
        info!(lead_id, "deleted lead");
        Ok(())
    }

    pub async fn create_reminder(&mut self, draft: ReminderDraft) -> BooksResult<Reminder> {
        if draft.title.trim().is_empty() {
            return Err(BooksError::Validation(
                "Reminder title cannot be empty".to_string(),
            ));
        }
        if let Some(lead_id) = &draft.lead_id {
            self.get_lead(lead_id).await?;
        }

        let reminder = Reminder::from_draft(draft);
        self.storage.save_reminder(&reminder).await?;
        info!(reminder_id = %reminder.id, date = %reminder.date, "created reminder");
        Ok(reminder)
    }

    pub async fn get_reminder(&self, reminder_id: &str) -> BooksResult<Reminder> {
        self.storage
            .get_reminder(reminder_id)
            .await?
            .ok_or_else(|| BooksError::not_found(RecordKind::Reminder, reminder_id))
    }

    pub async fn list_reminders(&self, filter: &ReminderFilter) -> BooksResult<Vec<Reminder>> {
        Ok(filter.apply(self.storage.list_reminders().await?))
    }

    pub async fn update_reminder(
        &mut self,
        reminder_id: &str,
        update: ReminderUpdate,
    ) -> BooksResult<Reminder> {
        if update.is_empty() {
            return Err(BooksError::Validation("No fields to update".to_string()));
        }

        let mut reminder = self.get_reminder(reminder_id).await?;
        reminder.apply_update(update);
        self.storage.update_reminder(&reminder).await?;
        info!(reminder_id, status = ?reminder.status, "updated reminder");
        Ok(reminder)
    }

    pub async fn delete_reminder(&mut self, reminder_id: &str) -> BooksResult<()> {
        self.get_reminder(reminder_id).await?;
        self.storage.delete_reminder(reminder_id).await?;
        info!(reminder_id, "deleted reminder");
        Ok(())
    }

    /// Pending reminders due on `today`
    pub async fn today_reminders(&self, today: NaiveDate) -> BooksResult<Vec<Reminder>> {
        let mut due: Vec<Reminder> = self
            .storage
            .list_reminders()
            .await?
            .into_iter()
            .filter(|r| r.is_due_on(today))
            .collect();
        due.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(due)
    }

    pub async fn dashboard(&self, today: NaiveDate) -> BooksResult<CrmDashboard> {
        let leads = self.storage.list_leads().await?;
        let reminders = self.storage.list_reminders().await?;
        Ok(CrmDashboard::compute(
            &leads,
            &reminders,
            today,
            self.settings.upcoming_travel_days,
        ))
    }

    pub async fn upcoming_travels(&self, today: NaiveDate) -> BooksResult<Vec<Lead>> {
        let leads = self.storage.list_leads().await?;
        Ok(upcoming_travels(
            &leads,
            today,
            self.settings.upcoming_travel_days,
        ))
    }

    pub async fn monthly_leads(&self, year: i32) -> BooksResult<Vec<MonthlyLeadCount>> {
        Ok(monthly_leads(&self.storage.list_leads().await?, year))
    }

    pub async fn type_breakdown(&self) -> BooksResult<Vec<TypeCount>> {
        Ok(type_breakdown(&self.storage.list_leads().await?))
    }

    pub async fn source_breakdown(&self) -> BooksResult<Vec<SourceCount>> {
        Ok(source_breakdown(&self.storage.list_leads().await?))
    }

    pub async fn referral_leaderboard(&self, limit: usize) -> BooksResult<Vec<ReferralStanding>> {
        Ok(referral_leaderboard(
            &self.storage.list_leads().await?,
            limit,
        ))
    }
}
