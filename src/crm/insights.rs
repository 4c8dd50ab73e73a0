//! Lead statistics for the CRM dashboard

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::lead::{Lead, LeadSource, LeadStatus, LeadType};
use super::reminder::Reminder;

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrmDashboard {
    pub total_leads: usize,
    /// New or in process
    pub active_leads: usize,
    /// Booked or converted
    pub booked_leads: usize,
    pub upcoming_travels: usize,
    /// Pending reminders due today
    pub today_reminders: usize,
    /// Leads that came in through a referral
    pub total_referrals: usize,
}

impl CrmDashboard {
    pub fn compute(
        leads: &[Lead],
        reminders: &[Reminder],
        today: NaiveDate,
        travel_window_days: i64,
    ) -> Self {
        Self {
            total_leads: leads.len(),
            active_leads: leads.iter().filter(|l| l.status.is_active()).count(),
            booked_leads: leads.iter().filter(|l| l.status.is_booked()).count(),
            upcoming_travels: upcoming_travels(leads, today, travel_window_days).len(),
            today_reminders: reminders.iter().filter(|r| r.is_due_on(today)).count(),
            total_referrals: leads.iter().map(|l| l.referred_clients.len()).sum(),
        }
    }
}

/// Leads travelling between `today` and `today + window_days`, soonest first
pub fn upcoming_travels(leads: &[Lead], today: NaiveDate, window_days: i64) -> Vec<Lead> {
    let until = today + Duration::days(window_days);
    let mut upcoming: Vec<Lead> = leads
        .iter()
        .filter(|l| l.status != LeadStatus::Cancelled)
        .filter(|l| l.travel_date.is_some_and(|d| d >= today && d <= until))
        .cloned()
        .collect();
    upcoming.sort_by_key(|l| l.travel_date);
    upcoming
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyLeadCount {
    pub month: String,
    pub count: usize,
}

/// Leads created in each month of `year`, all twelve months present
pub fn monthly_leads(leads: &[Lead], year: i32) -> Vec<MonthlyLeadCount> {
    let mut counts = [0usize; 12];
    for lead in leads.iter().filter(|l| l.created_at.year() == year) {
        counts[lead.created_at.month0() as usize] += 1;
    }

    MONTH_NAMES
        .iter()
        .zip(counts)
        .map(|(month, count)| MonthlyLeadCount {
            month: month.to_string(),
            count,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCount {
    pub lead_type: LeadType,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCount {
    pub source: LeadSource,
    pub count: usize,
}

fn tally<K: std::hash::Hash + Eq + Copy>(keys: impl Iterator<Item = K>) -> Vec<(K, usize)> {
    let mut counts: HashMap<K, usize> = HashMap::new();
    let mut order = Vec::new();
    for key in keys {
        let count = counts.entry(key).or_insert(0);
        if *count == 0 {
            order.push(key);
        }
        *count += 1;
    }
    let mut tallied: Vec<(K, usize)> = order.into_iter().map(|k| (k, counts[&k])).collect();
    // stable sort keeps first-seen order among ties
    tallied.sort_by(|a, b| b.1.cmp(&a.1));
    tallied
}

/// Leads per type, most common first
pub fn type_breakdown(leads: &[Lead]) -> Vec<TypeCount> {
    tally(leads.iter().map(|l| l.lead_type))
        .into_iter()
        .map(|(lead_type, count)| TypeCount { lead_type, count })
        .collect()
}

/// Leads per source, most common first
pub fn source_breakdown(leads: &[Lead]) -> Vec<SourceCount> {
    tally(leads.iter().map(|l| l.source))
        .into_iter()
        .map(|(source, count)| SourceCount { source, count })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralStanding {
    pub lead_id: String,
    pub client_name: String,
    pub referral_code: String,
    pub referral_count: usize,
    pub loyalty_points: u32,
}

/// Top referrers by number of referred clients, then loyalty points
pub fn referral_leaderboard(leads: &[Lead], limit: usize) -> Vec<ReferralStanding> {
    let mut standings: Vec<ReferralStanding> = leads
        .iter()
        .filter(|l| !l.referred_clients.is_empty())
        .map(|l| ReferralStanding {
            lead_id: l.lead_id.clone(),
            client_name: l.client_name.clone(),
            referral_code: l.referral_code.clone(),
            referral_count: l.referred_clients.len(),
            loyalty_points: l.loyalty_points,
        })
        .collect();
    standings.sort_by(|a, b| {
        b.referral_count
            .cmp(&a.referral_count)
            .then(b.loyalty_points.cmp(&a.loyalty_points))
    });
    standings.truncate(limit);
    standings
}
