#![forbid(unsafe_code)]

use std::env;
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

use gmi_contracts::UnixMillis;
use gmi_engines::auth::{AuthOutcome, AuthRequest, AuthRuntime};
use gmi_engines::collection::{
    reason_codes as collection_reason_codes, CollectionEndpointConfig, CollectionOutcome,
    CollectionRuntime,
};
use gmi_engines::extract::{
    ExtractOutcome, ExtractProviderConfig, ExtractRefuseKind, ExtractRequest, ExtractRuntime,
};
use gmi_storage::{CollectionStore, FileCollectionStore, MemoryCollectionStore, StorageError};
use serde_json::{json, Value};

/// A fully-decided HTTP reply: status + JSON body. The binary wraps this
/// with the uniform CORS headers; nothing below the adapter knows about
/// HTTP framing.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiReply {
    pub status: u16,
    pub body: Value,
}

impl ApiReply {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }
}

pub struct AdapterRuntime {
    store: Box<dyn CollectionStore>,
    auth: AuthRuntime,
    extract: ExtractRuntime,
}

impl AdapterRuntime {
    /// Backend selection: `GMI_DATA_DIR` set → file store rooted there
    /// (created on demand); unset → in-memory store that lives as long as
    /// the process.
    pub fn default_from_env() -> Result<Self, String> {
        let store: Box<dyn CollectionStore> = match env::var("GMI_DATA_DIR") {
            Ok(dir) if !dir.trim().is_empty() => {
                let dir = dir.trim().to_string();
                fs::create_dir_all(&dir)
                    .map_err(|err| format!("cannot create data dir {dir}: {err}"))?;
                Box::new(FileCollectionStore::new(dir))
            }
            _ => Box::new(MemoryCollectionStore::new()),
        };
        Ok(Self::new(store, ExtractProviderConfig::from_env()))
    }

    pub fn new(store: Box<dyn CollectionStore>, extract_config: ExtractProviderConfig) -> Self {
        Self {
            store,
            auth: AuthRuntime::new(),
            extract: ExtractRuntime::new(extract_config),
        }
    }

    pub fn new_in_memory(extract_config: ExtractProviderConfig) -> Self {
        Self::new(Box::new(MemoryCollectionStore::new()), extract_config)
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    pub fn collection_get(&self, config: CollectionEndpointConfig) -> ApiReply {
        let runtime = CollectionRuntime::new(config);
        match runtime.run_get(self.store.as_ref()) {
            Ok(outcome) => collection_reply(outcome),
            Err(err) => storage_failure(&err),
        }
    }

    pub fn collection_post(&mut self, config: CollectionEndpointConfig, body: Value) -> ApiReply {
        let runtime = CollectionRuntime::new(config);
        match runtime.run_post(self.store.as_mut(), body) {
            Ok(outcome) => collection_reply(outcome),
            Err(err) => storage_failure(&err),
        }
    }

    pub fn collection_delete(&mut self, config: CollectionEndpointConfig, body: Value) -> ApiReply {
        let runtime = CollectionRuntime::new(config);
        match runtime.run_delete(self.store.as_mut(), body) {
            Ok(outcome) => collection_reply(outcome),
            Err(err) => storage_failure(&err),
        }
    }

    pub fn auth_post(&mut self, body: Value) -> ApiReply {
        let request: AuthRequest = match serde_json::from_value(body) {
            Ok(request) => request,
            Err(_) => {
                return ApiReply {
                    status: 400,
                    body: json!({"error": "Invalid action"}),
                }
            }
        };
        match self.auth.run(self.store.as_mut(), &request, now_millis()) {
            Ok(outcome) => auth_reply(outcome),
            Err(err) => storage_failure(&err),
        }
    }

    pub fn extract_post(&self, body: Value) -> ApiReply {
        run_extract(&self.extract, body)
    }

    /// Clone of the extraction runtime, so the provider call can run
    /// without holding the adapter lock.
    pub fn extract_snapshot(&self) -> ExtractRuntime {
        self.extract.clone()
    }

    pub fn health_report(&self) -> ApiReply {
        ApiReply::ok(json!({
            "status": "ok",
            "backend": self.backend_name(),
        }))
    }
}

pub fn run_extract(extract: &ExtractRuntime, body: Value) -> ApiReply {
    let request: ExtractRequest = match serde_json::from_value(body) {
        Ok(request) => request,
        Err(_) => {
            return ApiReply {
                status: 400,
                body: json!({"error": "No file provided"}),
            }
        }
    };
    extract_reply(extract.run(&request))
}

fn now_millis() -> UnixMillis {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    UnixMillis(elapsed.as_millis() as u64)
}

fn collection_reply(outcome: CollectionOutcome) -> ApiReply {
    match outcome {
        CollectionOutcome::ListOk { records } => ApiReply::ok(Value::Array(records)),
        CollectionOutcome::ReplaceOk { count } | CollectionOutcome::AppendOk { count } => {
            ApiReply::ok(json!({"success": true, "count": count}))
        }
        CollectionOutcome::DeleteOk { .. } => ApiReply::ok(json!({"success": true})),
        CollectionOutcome::Refuse(refuse) => {
            let status =
                if refuse.reason_code == collection_reason_codes::COLLECTION_DELETE_NOT_SUPPORTED {
                    405
                } else {
                    400
                };
            ApiReply {
                status,
                body: json!({"error": refuse.message}),
            }
        }
    }
}

fn auth_reply(outcome: AuthOutcome) -> ApiReply {
    match outcome {
        AuthOutcome::LoginOk(user) | AuthOutcome::RegisterOk(user) => {
            ApiReply::ok(json!({"success": true, "user": user}))
        }
        AuthOutcome::LoginRejected => ApiReply {
            status: 401,
            body: json!({"success": false, "error": "Invalid username or password"}),
        },
        AuthOutcome::RegisterDuplicate => ApiReply {
            status: 400,
            body: json!({"success": false, "error": "Username already exists"}),
        },
        AuthOutcome::RegisterInvalid { reason } => ApiReply {
            status: 400,
            body: json!({"success": false, "error": reason}),
        },
        AuthOutcome::ListOk(users) => ApiReply::ok(json!({"success": true, "users": users})),
        AuthOutcome::InvalidAction => ApiReply {
            status: 400,
            body: json!({"error": "Invalid action"}),
        },
    }
}

fn extract_reply(outcome: ExtractOutcome) -> ApiReply {
    match outcome {
        ExtractOutcome::Ok {
            extracted,
            file_name,
        } => ApiReply::ok(json!({
            "success": true,
            "extractedData": extracted,
            "fileName": file_name,
        })),
        ExtractOutcome::Refuse(refuse) => {
            let status = match refuse.kind {
                ExtractRefuseKind::InvalidInput => 400,
                ExtractRefuseKind::MissingConfig
                | ExtractRefuseKind::Upstream
                | ExtractRefuseKind::UnparseableReply => 500,
            };
            let mut body = json!({"error": refuse.message});
            if let Some(raw) = refuse.raw {
                body["raw"] = Value::String(raw);
            }
            ApiReply { status, body }
        }
    }
}

fn storage_failure(err: &StorageError) -> ApiReply {
    ApiReply {
        status: 500,
        body: json!({"error": "Internal server error", "details": err.to_string()}),
    }
}
