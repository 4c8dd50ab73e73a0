//! Follow-up reminders, optionally tied to a lead

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::types::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReminderPriority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReminderStatus {
    #[default]
    Pending,
    Done,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    pub title: String,
    pub lead_id: Option<String>,
    pub description: Option<String>,
    pub date: NaiveDateTime,
    pub priority: ReminderPriority,
    pub status: ReminderStatus,
    pub created_at: NaiveDateTime,
}

impl Reminder {
    /// New reminders always start out pending
    pub fn from_draft(draft: ReminderDraft) -> Self {
        Self {
            id: new_id(),
            title: draft.title,
            lead_id: draft.lead_id,
            description: draft.description,
            date: draft.date,
            priority: draft.priority,
            status: ReminderStatus::Pending,
            created_at: now(),
        }
    }

    pub fn apply_update(&mut self, update: ReminderUpdate) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if update.description.is_some() {
            self.description = update.description;
        }
        if let Some(date) = update.date {
            self.date = date;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
    }

    /// Pending and due on `day`
    pub fn is_due_on(&self, day: NaiveDate) -> bool {
        self.status == ReminderStatus::Pending && self.date.date() == day
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderDraft {
    pub title: String,
    #[serde(default)]
    pub lead_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub date: NaiveDateTime,
    #[serde(default)]
    pub priority: ReminderPriority,
}

impl ReminderDraft {
    pub fn new(title: impl Into<String>, date: NaiveDateTime) -> Self {
        Self {
            title: title.into(),
            lead_id: None,
            description: None,
            date,
            priority: ReminderPriority::Medium,
        }
    }

    pub fn for_lead(mut self, lead_id: impl Into<String>) -> Self {
        self.lead_id = Some(lead_id.into());
        self
    }

    pub fn priority(mut self, priority: ReminderPriority) -> Self {
        self.priority = priority;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReminderUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDateTime>,
    pub priority: Option<ReminderPriority>,
    pub status: Option<ReminderStatus>,
}

impl ReminderUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Reminder list query; date bounds are inclusive
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReminderFilter {
    pub lead_id: Option<String>,
    pub status: Option<ReminderStatus>,
    pub date_from: Option<NaiveDateTime>,
    pub date_to: Option<NaiveDateTime>,
}

impl ReminderFilter {
    pub fn matches(&self, reminder: &Reminder) -> bool {
        if let Some(lead_id) = &self.lead_id {
            if reminder.lead_id.as_ref() != Some(lead_id) {
                return false;
            }
        }
        if self.status.is_some_and(|s| s != reminder.status) {
            return false;
        }
        if self.date_from.is_some_and(|from| reminder.date < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| reminder.date > to) {
            return false;
        }
        true
    }

    /// Matching reminders, earliest first
    pub fn apply(&self, mut reminders: Vec<Reminder>) -> Vec<Reminder> {
        reminders.retain(|r| self.matches(r));
        reminders.sort_by(|a, b| a.date.cmp(&b.date));
        reminders
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 4, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_filter_sorts_by_date() {
        let reminders = vec![
            Reminder::from_draft(ReminderDraft::new("Call back", at(12, 10)).for_lead("LD-1")),
            Reminder::from_draft(ReminderDraft::new("Collect passport", at(10, 9)).for_lead("LD-1")),
            Reminder::from_draft(ReminderDraft::new("Send quote", at(11, 15)).for_lead("LD-2")),
        ];

        let filter = ReminderFilter {
            lead_id: Some("LD-1".to_string()),
            ..Default::default()
        };
        let found = filter.apply(reminders);
        let titles: Vec<&str> = found.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Collect passport", "Call back"]);
    }

    #[test]
    fn test_done_reminder_is_not_due() {
        let mut reminder = Reminder::from_draft(
            ReminderDraft::new("Visa appointment", at(5, 11)).priority(ReminderPriority::High),
        );
        let day = NaiveDate::from_ymd_opt(2025, 4, 5).unwrap();
        assert!(reminder.is_due_on(day));

        reminder.apply_update(ReminderUpdate {
            status: Some(ReminderStatus::Done),
            ..Default::default()
        });
        assert!(!reminder.is_due_on(day));
        assert!(ReminderUpdate::default().is_empty());
    }
}
