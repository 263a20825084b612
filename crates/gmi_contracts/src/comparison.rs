#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::{ContractViolation, RecordId, Validate};

/// One saved plan comparison. The known fields are what the dashboard and
/// the admin views read; anything else the UI attaches (ad-hoc custom
/// columns, render metadata) rides along in the extension map so a
/// round-trip through the store never drops it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    pub id: RecordId,
    #[serde(rename = "companyName", default)]
    pub company_name: String,
    #[serde(rename = "referenceNumber", default)]
    pub reference_number: String,
    /// Ordered plan entries; order is what the comparison table renders.
    #[serde(default)]
    pub plans: Vec<Value>,
    #[serde(rename = "advisorComment", default)]
    pub advisor_comment: String,
    #[serde(rename = "highlightedPlanId", default, skip_serializing_if = "Option::is_none")]
    pub highlighted_plan_id: Option<RecordId>,
    #[serde(rename = "highlightedItems", default)]
    pub highlighted_items: Vec<String>,
    #[serde(rename = "customFields", default)]
    pub custom_fields: Vec<Value>,
    /// Rendered HTML snapshot of the comparison at save time.
    #[serde(rename = "htmlContent", default)]
    pub html_content: String,
    #[serde(rename = "createdBy", default)]
    pub created_by: String,
    #[serde(rename = "createdByEmail", default)]
    pub created_by_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Validate for ComparisonRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        if let RecordId::Text(id) = &self.id {
            if id.trim().is_empty() {
                return Err(ContractViolation::InvalidValue {
                    field: "id",
                    reason: "must not be empty",
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_comparison_01_unknown_fields_survive_a_round_trip() {
        let raw = serde_json::json!({
            "id": "1716200000000",
            "companyName": "Acme Trading LLC",
            "referenceNumber": "GMI-2024-117",
            "plans": [{"providerName": "Orient"}],
            "advisorComment": "Category A only",
            "highlightedItems": ["aggregateLimit"],
            "customFields": [],
            "htmlContent": "<table></table>",
            "createdBy": "Badr",
            "createdByEmail": "bp1@nsib.ae",
            "created_at": "2024-05-20T10:13:20Z",
            "dashboardColor": "#ffaa00"
        });

        let record: ComparisonRecord = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(record.company_name, "Acme Trading LLC");
        assert_eq!(
            record.extra.get("dashboardColor"),
            Some(&Value::String("#ffaa00".to_string()))
        );

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back.get("dashboardColor"), raw.get("dashboardColor"));
        assert_eq!(back.get("companyName"), raw.get("companyName"));
    }

    #[test]
    fn at_comparison_02_empty_string_id_fails_validation() {
        let record = ComparisonRecord {
            id: RecordId::from("  "),
            company_name: String::new(),
            reference_number: String::new(),
            plans: Vec::new(),
            advisor_comment: String::new(),
            highlighted_plan_id: None,
            highlighted_items: Vec::new(),
            custom_fields: Vec::new(),
            html_content: String::new(),
            created_by: String::new(),
            created_by_email: String::new(),
            created_at: None,
            updated_at: None,
            extra: BTreeMap::new(),
        };
        assert!(record.validate().is_err());
    }
}
