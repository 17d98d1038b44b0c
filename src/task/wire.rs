//! Wire representation exchanged with the task store.
//!
//! Field names are camelCase on the wire. Status and priority travel as
//! numeric codes; the symbolic spelling (`"InProgress"`, `"High"`) is
//! accepted on input so older payloads still decode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An enum value as it appears on the wire: a numeric code or a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireEnum {
    Code(i64),
    Symbol(String),
}

impl Default for WireEnum {
    fn default() -> Self {
        Self::Code(0)
    }
}

impl fmt::Display for WireEnum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "{code}"),
            Self::Symbol(symbol) => write!(f, "{symbol:?}"),
        }
    }
}

/// A stored task as returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTask {
    pub id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: WireEnum,
    pub priority: WireEnum,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Local wall-clock due date, `YYYY-MM-DDTHH:MM:SS`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_notification: Option<bool>,
    /// Comma-joined tag list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
}

/// Request body for `POST /tasks` (no id) and `PUT /tasks/{id}` (with id).
///
/// Timestamps are never accepted from clients; unknown fields such as
/// `createdAt` are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: WireEnum,
    #[serde(default)]
    pub priority: WireEnum,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_notification: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn wire_enum_accepts_codes_and_symbols() {
        let code: WireEnum = serde_json::from_str("2").unwrap();
        assert_eq!(code, WireEnum::Code(2));
        let symbol: WireEnum = serde_json::from_str("\"InProgress\"").unwrap();
        assert_eq!(symbol, WireEnum::Symbol("InProgress".to_owned()));
    }

    #[test]
    fn payload_uses_camel_case_and_skips_absent_fields() {
        let payload = TaskPayload {
            title: "Plan".to_owned(),
            status: WireEnum::Code(1),
            priority: WireEnum::Code(3),
            has_notification: Some(true),
            ..TaskPayload::default()
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["hasNotification"], true);
        assert_eq!(json["status"], 1);
        assert!(json.get("id").is_none());
        assert!(json.get("tags").is_none());
        assert!(json.get("dueDate").is_none());
    }

    #[test]
    fn payload_ignores_client_timestamps() {
        let json = r#"{"title":"t","status":0,"priority":1,"createdAt":"2020-01-01T00:00:00Z"}"#;
        let payload: TaskPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.title, "t");
        assert_eq!(payload.priority, WireEnum::Code(1));
    }

    #[test]
    fn api_task_parses_server_record() {
        let json = r#"{
            "id": 4,
            "title": "Review",
            "status": 1,
            "priority": "High",
            "createdAt": "2024-05-01T08:00:00Z",
            "updatedAt": "2024-05-01T09:00:00.250Z",
            "dueDate": "2024-05-02T10:30:00",
            "tags": "work, urgent"
        }"#;
        let task: ApiTask = serde_json::from_str(json).unwrap();
        assert_eq!(task.id, 4);
        assert_eq!(task.priority, WireEnum::Symbol("High".to_owned()));
        assert!(task.description.is_none());
        assert!(task.has_notification.is_none());
        assert_eq!(task.due_date.as_deref(), Some("2024-05-02T10:30:00"));
    }
}
