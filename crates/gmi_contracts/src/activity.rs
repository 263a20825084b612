#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::RecordId;

/// Action tag on an activity-log entry. The set is open: the UI invents
/// new tags without a schema change, so this is a thin newtype over the
/// wire string with constants for the tags the dashboard filters on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActivityAction(pub String);

impl ActivityAction {
    pub const LOGIN: &'static str = "login";
    pub const LOGOUT: &'static str = "logout";
    pub const CREATE_COMPARISON: &'static str = "create_comparison";
    pub const EDIT_COMPARISON: &'static str = "edit_comparison";
    pub const DELETE_COMPARISON: &'static str = "delete_comparison";

    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogRecord {
    pub id: RecordId,
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<RecordId>,
    #[serde(rename = "userEmail", default)]
    pub user_email: String,
    #[serde(rename = "userName", default)]
    pub user_name: String,
    pub action: ActivityAction,
    #[serde(default)]
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_activity_01_unknown_action_tags_deserialize() {
        let raw = serde_json::json!({
            "id": "1716202222222",
            "userEmail": "user@nsib.ae",
            "userName": "user",
            "action": "export_comparison_pdf",
            "details": "GMI-2024-117",
            "created_at": "2024-05-20T10:50:22Z"
        });
        let record: ActivityLogRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(record.action.as_str(), "export_comparison_pdf");
        assert_ne!(record.action, ActivityAction::new(ActivityAction::LOGIN));
    }
}
