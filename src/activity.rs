//! Audit trail of who changed what in the back office

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::*;

/// Rows returned by an activity query when no limit is given
pub const DEFAULT_LOG_LIMIT: usize = 100;

/// Kind of change an activity entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityAction {
    Create,
    Update,
    Delete,
    Rebuild,
    Backup,
    Restore,
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActivityAction::Create => "CREATE",
            ActivityAction::Update => "UPDATE",
            ActivityAction::Delete => "DELETE",
            ActivityAction::Rebuild => "REBUILD",
            ActivityAction::Backup => "BACKUP",
            ActivityAction::Restore => "RESTORE",
        };
        f.write_str(label)
    }
}

/// One line of the activity log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    #[serde(default = "new_id")]
    pub id: String,
    /// Area of the back office, e.g. "Revenue" or "Expenses"
    pub module: String,
    pub action: ActivityAction,
    pub user: String,
    pub description: String,
    #[serde(default)]
    pub details: serde_json::Value,
    pub timestamp: NaiveDateTime,
}

impl ActivityEntry {
    pub fn new(
        module: impl Into<String>,
        action: ActivityAction,
        user: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            module: module.into(),
            action,
            user: user.into(),
            description: description.into(),
            details: serde_json::Value::Object(Default::default()),
            timestamp: now(),
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

/// Query over the activity log: newest first, optionally one module only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityQuery {
    pub limit: usize,
    pub module: Option<String>,
}

impl Default for ActivityQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LOG_LIMIT,
            module: None,
        }
    }
}

impl ActivityQuery {
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn matches(&self, entry: &ActivityEntry) -> bool {
        self.module.as_deref().is_none_or(|m| entry.module == m)
    }

    /// Apply the query to entries in any order
    pub fn select(&self, mut entries: Vec<ActivityEntry>) -> Vec<ActivityEntry> {
        entries.retain(|entry| self.matches(entry));
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(self.limit);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(module: &str, minutes: i64) -> ActivityEntry {
        let mut entry = ActivityEntry::new(module, ActivityAction::Create, "admin", "created");
        entry.timestamp += Duration::minutes(minutes);
        entry
    }

    #[test]
    fn test_query_filters_sorts_and_limits() {
        let entries = vec![
            entry("Revenue", 1),
            entry("Expenses", 2),
            entry("Revenue", 3),
            entry("Revenue", 2),
        ];

        let revenue = ActivityQuery::default().module("Revenue").limit(2).select(entries);
        assert_eq!(revenue.len(), 2);
        assert!(revenue.iter().all(|e| e.module == "Revenue"));
        assert!(revenue[0].timestamp > revenue[1].timestamp);
    }

    #[test]
    fn test_action_wire_format() {
        let json = serde_json::to_value(ActivityAction::Delete).unwrap();
        assert_eq!(json, serde_json::json!("DELETE"));
        assert_eq!(ActivityAction::Rebuild.to_string(), "REBUILD");
    }
}
