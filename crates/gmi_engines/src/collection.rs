#![forbid(unsafe_code)]

use gmi_contracts::collection::CollectionKind;
use gmi_contracts::ReasonCodeId;
use gmi_storage::{delete_by_id, list, prepend_capped, replace, ACTIVITY_LOG_CAP};
use gmi_storage::{CollectionStore, StorageError};
use serde_json::Value;

pub mod reason_codes {
    use gmi_contracts::ReasonCodeId;

    pub const COLLECTION_OK_LIST: ReasonCodeId = ReasonCodeId(0x434C_0001);
    pub const COLLECTION_OK_REPLACE: ReasonCodeId = ReasonCodeId(0x434C_0002);
    pub const COLLECTION_OK_APPEND: ReasonCodeId = ReasonCodeId(0x434C_0003);
    pub const COLLECTION_OK_DELETE: ReasonCodeId = ReasonCodeId(0x434C_0004);

    pub const COLLECTION_BODY_NOT_ARRAY: ReasonCodeId = ReasonCodeId(0x434C_00F1);
    pub const COLLECTION_BODY_SHAPE_INVALID: ReasonCodeId = ReasonCodeId(0x434C_00F2);
    pub const COLLECTION_DELETE_NOT_SUPPORTED: ReasonCodeId = ReasonCodeId(0x434C_00F3);
    pub const COLLECTION_DELETE_MISSING_ID: ReasonCodeId = ReasonCodeId(0x434C_00F4);
}

/// Per-entity wiring of the one shared endpoint contract. The five public
/// collection endpoints differ only in these three switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionEndpointConfig {
    pub kind: CollectionKind,
    /// Activity logs accept a single object and prepend it under the
    /// retention cap; everywhere else a single object is a shape error.
    pub single_object_prepends: bool,
    /// Only the template endpoint exposes DELETE.
    pub delete_enabled: bool,
}

impl CollectionEndpointConfig {
    pub fn comparisons() -> Self {
        Self {
            kind: CollectionKind::Comparisons,
            single_object_prepends: false,
            delete_enabled: false,
        }
    }

    pub fn activity_logs() -> Self {
        Self {
            kind: CollectionKind::ActivityLogs,
            single_object_prepends: true,
            delete_enabled: false,
        }
    }

    pub fn custom_companies() -> Self {
        Self {
            kind: CollectionKind::CustomCompanies,
            single_object_prepends: false,
            delete_enabled: false,
        }
    }

    pub fn tob_plans() -> Self {
        Self {
            kind: CollectionKind::TobPlans,
            single_object_prepends: false,
            delete_enabled: false,
        }
    }

    pub fn tob_templates() -> Self {
        Self {
            kind: CollectionKind::TobTemplates,
            single_object_prepends: false,
            delete_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionRefuse {
    pub reason_code: ReasonCodeId,
    pub message: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CollectionOutcome {
    ListOk { records: Vec<Value> },
    ReplaceOk { count: usize },
    AppendOk { count: usize },
    DeleteOk { removed: usize },
    Refuse(CollectionRefuse),
}

#[derive(Debug, Clone)]
pub struct CollectionRuntime {
    config: CollectionEndpointConfig,
}

impl CollectionRuntime {
    pub fn new(config: CollectionEndpointConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CollectionEndpointConfig {
        &self.config
    }

    pub fn run_get(&self, store: &dyn CollectionStore) -> Result<CollectionOutcome, StorageError> {
        let records = list(store, self.config.kind)?;
        Ok(CollectionOutcome::ListOk { records })
    }

    pub fn run_post(
        &self,
        store: &mut dyn CollectionStore,
        body: Value,
    ) -> Result<CollectionOutcome, StorageError> {
        match body {
            Value::Array(records) => {
                let count = replace(store, self.config.kind, records)?;
                Ok(CollectionOutcome::ReplaceOk { count })
            }
            Value::Object(_) if self.config.single_object_prepends => {
                let count = prepend_capped(store, self.config.kind, body, ACTIVITY_LOG_CAP)?;
                Ok(CollectionOutcome::AppendOk { count })
            }
            Value::Object(_) => Ok(CollectionOutcome::Refuse(CollectionRefuse {
                reason_code: reason_codes::COLLECTION_BODY_NOT_ARRAY,
                message: "Invalid data format. Expected an array.",
            })),
            _ => Ok(CollectionOutcome::Refuse(CollectionRefuse {
                reason_code: reason_codes::COLLECTION_BODY_SHAPE_INVALID,
                message: "Invalid data format",
            })),
        }
    }

    pub fn run_delete(
        &self,
        store: &mut dyn CollectionStore,
        body: Value,
    ) -> Result<CollectionOutcome, StorageError> {
        if !self.config.delete_enabled {
            return Ok(CollectionOutcome::Refuse(CollectionRefuse {
                reason_code: reason_codes::COLLECTION_DELETE_NOT_SUPPORTED,
                message: "Method not allowed",
            }));
        }
        let Some(id) = body.get("id").cloned() else {
            return Ok(CollectionOutcome::Refuse(CollectionRefuse {
                reason_code: reason_codes::COLLECTION_DELETE_MISSING_ID,
                message: "Missing id",
            }));
        };
        let removed = delete_by_id(store, self.config.kind, &id)?;
        Ok(CollectionOutcome::DeleteOk { removed })
    }
}
