// src/notifications/mod.rs

//! Live notification feed for one portal session.
//!
//! [`store::NotificationStore`] holds the state; [`api::NotificationApi`] is the
//! REST side it calls into, and [`push`] carries server-pushed events into it.

pub mod api;
pub mod push;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
    Appointment,
    Prescription,
    System,
    Security,
    Reminder,
}

impl NotificationCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationCategory::Appointment => "appointment",
            NotificationCategory::Prescription => "prescription",
            NotificationCategory::System => "system",
            NotificationCategory::Security => "security",
            NotificationCategory::Reminder => "reminder",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl NotificationPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationPriority::Low => "low",
            NotificationPriority::Medium => "medium",
            NotificationPriority::High => "high",
            NotificationPriority::Urgent => "urgent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    pub message: String,
    pub category: NotificationCategory,
    pub priority: NotificationPriority,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub action_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_text: Option<String>,
}

impl Notification {
    /// Action link fields only make sense on notifications that require action.
    pub fn normalized(mut self) -> Self {
        if !self.action_required {
            self.action_url = None;
            self.action_text = None;
        }
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    #[default]
    Disconnected,
}

/// Filters for one page of notifications.
///
/// Mirrors the backend's `GET /notifications` query string.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadOptions {
    pub limit: Option<u32>,
    pub category: Option<NotificationCategory>,
    pub priority: Option<NotificationPriority>,
    pub unread_only: Option<bool>,
    pub search: Option<String>,
}

impl LoadOptions {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(category) = self.category {
            pairs.push(("category", category.as_str().to_string()));
        }
        if let Some(priority) = self.priority {
            pairs.push(("priority", priority.as_str().to_string()));
        }
        if let Some(unread_only) = self.unread_only {
            pairs.push(("unreadOnly", unread_only.to_string()));
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            pairs.push(("search", search.to_string()));
        }
        pairs
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decodes_backend_notification() {
        let n: Notification = serde_json::from_value(json!({
            "_id": "65f0c2",
            "title": "Prescription ready",
            "message": "Your prescription can be picked up",
            "category": "prescription",
            "priority": "high",
            "isRead": false,
            "createdAt": "2026-03-02T09:30:00Z",
            "actionRequired": true,
            "actionUrl": "/prescriptions/42",
            "actionText": "View"
        }))
        .unwrap();

        assert_eq!(n.id, "65f0c2");
        assert_eq!(n.category, NotificationCategory::Prescription);
        assert_eq!(n.priority, NotificationPriority::High);
        assert_eq!(n.action_url.as_deref(), Some("/prescriptions/42"));
    }

    #[test]
    fn test_normalized_drops_action_without_requirement() {
        let mut n = fixtures::notification("a", false);
        n.action_url = Some("/x".into());
        n.action_text = Some("Open".into());

        let n = n.normalized();
        assert_eq!(n.action_url, None);
        assert_eq!(n.action_text, None);
    }

    #[test]
    fn test_query_pairs_only_include_set_filters() {
        let opts = LoadOptions {
            limit: Some(20),
            unread_only: Some(true),
            search: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(
            opts.query_pairs(),
            vec![("limit", "20".to_string()), ("unreadOnly", "true".to_string())]
        );

        let opts = LoadOptions {
            category: Some(NotificationCategory::Security),
            priority: Some(NotificationPriority::Urgent),
            search: Some(" refill ".into()),
            ..Default::default()
        };
        assert_eq!(
            opts.query_pairs(),
            vec![
                ("category", "security".to_string()),
                ("priority", "urgent".to_string()),
                ("search", "refill".to_string()),
            ]
        );
    }
}
