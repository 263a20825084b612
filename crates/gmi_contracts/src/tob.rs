#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::{ContractViolation, RecordId, Validate};

/// Premium breakdown by member category. The extraction prompt asks the
/// provider for numbers, but uploaders also type free text into these
/// boxes, so every slot is an arbitrary JSON value on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TobPremium {
    #[serde(rename = "catAMembers", default)]
    pub cat_a_members: Value,
    #[serde(rename = "catAPremium", default)]
    pub cat_a_premium: Value,
    #[serde(rename = "catBMembers", default)]
    pub cat_b_members: Value,
    #[serde(rename = "catBPremium", default)]
    pub cat_b_premium: Value,
}

/// The Table of Benefits schema: the 28 named benefit fields the
/// extraction prompt targets. All free text; "-" marks a benefit the
/// source document did not state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TobBenefits {
    #[serde(default)]
    pub provider_name: String,
    #[serde(default)]
    pub tpa: String,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub area_of_cover: String,
    #[serde(default)]
    pub aggregate_limit: String,
    #[serde(default)]
    pub medical_underwriting: String,
    #[serde(default)]
    pub room_type: String,
    #[serde(default)]
    pub diagnostic_tests: String,
    #[serde(default)]
    pub drugs_medicines: String,
    #[serde(default)]
    pub consultant_fees: String,
    #[serde(default)]
    pub organ_transplant: String,
    #[serde(default)]
    pub kidney_dialysis: String,
    #[serde(default)]
    pub inpatient_copay: String,
    #[serde(default)]
    pub referral_type: String,
    #[serde(default)]
    pub outpatient_consultation: String,
    #[serde(default)]
    pub diagnostic_labs: String,
    #[serde(default)]
    pub pharmacy_limit: String,
    #[serde(default)]
    pub pharmacy_copay: String,
    #[serde(default)]
    pub medicine_type: String,
    #[serde(default)]
    pub prescribed_physiotherapy: String,
    #[serde(default)]
    pub in_patient_maternity: String,
    #[serde(default)]
    pub out_patient_maternity: String,
    #[serde(default)]
    pub routine_dental: String,
    #[serde(default)]
    pub routine_optical: String,
    #[serde(default)]
    pub preventive_services: String,
    #[serde(default)]
    pub alternative_medicines: String,
    #[serde(default)]
    pub repatriation: String,
    #[serde(default)]
    pub mental_health: String,
}

/// A stored TOB plan: benefits + premium + upload/edit provenance. Extra
/// fields the uploader form grows later flow through the extension map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TobPlanRecord {
    pub id: RecordId,
    #[serde(flatten)]
    pub benefits: TobBenefits,
    #[serde(default)]
    pub premium: TobPremium,
    #[serde(rename = "uploadedBy", default)]
    pub uploaded_by: String,
    #[serde(rename = "uploadedByName", default)]
    pub uploaded_by_name: String,
    #[serde(rename = "uploadedAt", default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<String>,
    #[serde(rename = "lastEditedBy", default)]
    pub last_edited_by: String,
    #[serde(rename = "lastEditedByName", default)]
    pub last_edited_by_name: String,
    #[serde(rename = "lastEditedAt", default, skip_serializing_if = "Option::is_none")]
    pub last_edited_at: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Validate for TobPlanRecord {
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
