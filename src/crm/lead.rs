//! Enquiries from prospective travellers and the referral programme

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::revenue::RevenueSource;
use crate::types::*;

/// Label given to clients with enough referrals
pub const ROYAL_CLIENT_LABEL: &str = "Royal Client";

const REFERRAL_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Service the client is enquiring about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LeadType {
    Visa,
    Ticket,
    Package,
}

impl LeadType {
    /// Revenue source a converted lead is booked under
    pub fn revenue_source(&self) -> RevenueSource {
        match self {
            LeadType::Visa => RevenueSource::Visa,
            LeadType::Ticket => RevenueSource::Ticket,
            LeadType::Package => RevenueSource::Package,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LeadSource {
    Instagram,
    Referral,
    #[serde(rename = "Walk-in")]
    WalkIn,
    Website,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LeadStatus {
    #[default]
    New,
    #[serde(rename = "In Process")]
    InProcess,
    Booked,
    Cancelled,
    Converted,
}

impl LeadStatus {
    /// Still being worked on
    pub fn is_active(&self) -> bool {
        matches!(self, LeadStatus::New | LeadStatus::InProcess)
    }

    /// The client has committed to the trip
    pub fn is_booked(&self) -> bool {
        matches!(self, LeadStatus::Booked | LeadStatus::Converted)
    }
}

/// A prospective or converted client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    /// `LD-YYYYMMDD-NNNN`
    pub lead_id: String,
    pub client_name: String,
    pub primary_phone: String,
    pub alternate_phone: Option<String>,
    pub email: Option<String>,
    pub lead_type: LeadType,
    pub source: LeadSource,
    /// Referral code or lead id of whoever referred this client
    pub reference_from: Option<String>,
    pub travel_date: Option<NaiveDate>,
    pub status: LeadStatus,
    pub labels: Vec<String>,
    pub notes: Option<String>,
    pub loyalty_points: u32,
    pub referral_code: String,
    pub referred_clients: Vec<String>,
    /// Revenue entry raised when the lead was booked
    pub revenue_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Lead {
    pub fn from_draft(draft: LeadDraft) -> Self {
        let created_at = now();
        Self {
            lead_id: generate_lead_id(created_at.date()),
            client_name: draft.client_name,
            primary_phone: draft.primary_phone,
            alternate_phone: draft.alternate_phone,
            email: draft.email,
            lead_type: draft.lead_type,
            source: draft.source,
            reference_from: draft.reference_from.filter(|r| !r.trim().is_empty()),
            travel_date: draft.travel_date,
            status: draft.status,
            labels: draft.labels,
            notes: draft.notes,
            loyalty_points: 0,
            referral_code: generate_referral_code(),
            referred_clients: Vec::new(),
            revenue_id: None,
            created_at,
            updated_at: created_at,
        }
    }

    /// Whether `reference` names this lead
    pub fn answers_to(&self, reference: &str) -> bool {
        self.referral_code == reference || self.lead_id == reference
    }

    /// Credit a referral and promote to royal client at `royal_threshold` referrals
    pub fn credit_referral(&mut self, referred_lead_id: &str, points: u32, royal_threshold: usize) {
        self.referred_clients.push(referred_lead_id.to_string());
        self.loyalty_points += points;
        if self.referred_clients.len() >= royal_threshold
            && !self.labels.iter().any(|l| l == ROYAL_CLIENT_LABEL)
        {
            self.labels.push(ROYAL_CLIENT_LABEL.to_string());
        }
        self.updated_at = now();
    }

    /// Merge an update; returns true when the lead just became booked
    pub fn apply_update(&mut self, update: LeadUpdate) -> bool {
        let was_booked = self.status.is_booked();

        if let Some(client_name) = update.client_name {
            self.client_name = client_name;
        }
        if let Some(primary_phone) = update.primary_phone {
            self.primary_phone = primary_phone;
        }
        if update.alternate_phone.is_some() {
            self.alternate_phone = update.alternate_phone;
        }
        if update.email.is_some() {
            self.email = update.email;
        }
        if let Some(lead_type) = update.lead_type {
            self.lead_type = lead_type;
        }
        if let Some(source) = update.source {
            self.source = source;
        }
        if update.reference_from.is_some() {
            self.reference_from = update.reference_from;
        }
        if update.travel_date.is_some() {
            self.travel_date = update.travel_date;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(labels) = update.labels {
            self.labels = labels;
        }
        if update.notes.is_some() {
            self.notes = update.notes;
        }
        if let Some(points) = update.loyalty_points {
            self.loyalty_points = points;
        }
        self.updated_at = now();

        !was_booked && self.status.is_booked()
    }

    fn matches_search(&self, needle: &str) -> bool {
        let haystacks = [
            Some(self.client_name.as_str()),
            Some(self.primary_phone.as_str()),
            self.email.as_deref(),
            Some(self.lead_id.as_str()),
            Some(self.referral_code.as_str()),
        ];
        haystacks
            .into_iter()
            .flatten()
            .any(|h| h.to_lowercase().contains(needle))
    }
}

/// Body of a lead create request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadDraft {
    pub client_name: String,
    pub primary_phone: String,
    #[serde(default)]
    pub alternate_phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub lead_type: LeadType,
    pub source: LeadSource,
    #[serde(default)]
    pub reference_from: Option<String>,
    #[serde(default)]
    pub travel_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: LeadStatus,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl LeadDraft {
    pub fn new(
        client_name: impl Into<String>,
        primary_phone: impl Into<String>,
        lead_type: LeadType,
        source: LeadSource,
    ) -> Self {
        Self {
            client_name: client_name.into(),
            primary_phone: primary_phone.into(),
            alternate_phone: None,
            email: None,
            lead_type,
            source,
            reference_from: None,
            travel_date: None,
            status: LeadStatus::New,
            labels: Vec::new(),
            notes: None,
        }
    }

    pub fn referred_by(mut self, reference: impl Into<String>) -> Self {
        self.reference_from = Some(reference.into());
        self
    }

    pub fn travelling_on(mut self, date: NaiveDate) -> Self {
        self.travel_date = Some(date);
        self
    }
}

/// Body of a lead update request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadUpdate {
    pub client_name: Option<String>,
    pub primary_phone: Option<String>,
    pub alternate_phone: Option<String>,
    pub email: Option<String>,
    pub lead_type: Option<LeadType>,
    pub source: Option<LeadSource>,
    pub reference_from: Option<String>,
    pub travel_date: Option<NaiveDate>,
    pub status: Option<LeadStatus>,
    pub labels: Option<Vec<String>>,
    pub notes: Option<String>,
    pub loyalty_points: Option<u32>,
}

/// Lead list query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadFilter {
    pub lead_type: Option<LeadType>,
    pub status: Option<LeadStatus>,
    pub source: Option<LeadSource>,
    /// Case-insensitive match on name, phone, email, lead id or referral code
    pub search: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub skip: usize,
    pub limit: usize,
}

impl Default for LeadFilter {
    fn default() -> Self {
        Self {
            lead_type: None,
            status: None,
            source: None,
            search: None,
            date_from: None,
            date_to: None,
            skip: 0,
            limit: 20,
        }
    }
}

impl LeadFilter {
    pub fn matches(&self, lead: &Lead) -> bool {
        if self.lead_type.is_some_and(|t| t != lead.lead_type) {
            return false;
        }
        if self.status.is_some_and(|s| s != lead.status) {
            return false;
        }
        if self.source.is_some_and(|s| s != lead.source) {
            return false;
        }
        if let Some(needle) = self.search.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            if !lead.matches_search(&needle.to_lowercase()) {
                return false;
            }
        }

        let created = lead.created_at.date();
        if self.date_from.is_some_and(|from| created < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| created > to) {
            return false;
        }
        true
    }
}

/// One page of leads, newest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadPage {
    pub leads: Vec<Lead>,
    pub total: usize,
    pub page: usize,
    pub pages: usize,
}

impl LeadPage {
    /// Filter, sort newest first and cut out the requested page
    pub fn paginate(mut leads: Vec<Lead>, filter: &LeadFilter) -> Self {
        leads.retain(|lead| filter.matches(lead));
        leads.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let limit = filter.limit.max(1);
        let total = leads.len();
        let leads = leads.into_iter().skip(filter.skip).take(limit).collect();

        Self {
            leads,
            total,
            page: filter.skip / limit + 1,
            pages: total.div_ceil(limit),
        }
    }
}

/// Lead id for a lead created on `date`: `LD-YYYYMMDD-NNNN`
pub fn generate_lead_id(date: NaiveDate) -> String {
    let suffix = uuid::Uuid::new_v4().as_u128() % 10_000;
    format!("LD-{}-{:04}", date.format("%Y%m%d"), suffix)
}

/// Six character upper-case alphanumeric referral code
pub fn generate_referral_code() -> String {
    uuid::Uuid::new_v4()
        .as_bytes()
        .iter()
        .take(6)
        .map(|b| REFERRAL_ALPHABET[*b as usize % REFERRAL_ALPHABET.len()] as char)
        .collect()
}
