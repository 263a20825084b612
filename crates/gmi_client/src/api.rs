#![forbid(unsafe_code)]

use std::env;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use gmi_contracts::activity::{ActivityAction, ActivityLogRecord};
use gmi_contracts::auth::PublicUser;
use gmi_contracts::comparison::ComparisonRecord;
use gmi_contracts::{RecordId, UnixMillis};
use serde_json::{json, Value};

use crate::time::format_utc_iso8601;

#[derive(Debug)]
pub enum ClientError {
    Transport(String),
    Status { status: u16, body: Value },
    Json(serde_json::Error),
    Io(std::io::Error),
    UnexpectedReply { context: &'static str },
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(reason) => write!(f, "transport failure: {reason}"),
            Self::Status { status, body } => write!(f, "server replied {status}: {body}"),
            Self::Json(err) => write!(f, "reply is not valid JSON: {err}"),
            Self::Io(err) => write!(f, "io failure: {err}"),
            Self::UnexpectedReply { context } => write!(f, "unexpected reply shape: {context}"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    pub base_url: String,
    pub timeout_ms: u32,
    pub user_agent: String,
}

impl ApiClientConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: env_or("GMI_API_BASE", "http://127.0.0.1:8080"),
            timeout_ms: env::var("GMI_CLIENT_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.trim().parse::<u32>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(30_000),
            user_agent: env_or("GMI_CLIENT_USER_AGENT", "gmi-client/0.1"),
        }
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// What an activity-log call records about the acting user; id and
/// created_at are stamped at send time.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub user_id: Option<RecordId>,
    pub user_email: String,
    pub user_name: String,
    pub action: ActivityAction,
    pub details: String,
}

/// Blocking data layer over the HTTP adapter. Mutations are
/// fetch-modify-write over whole collections, so two clients editing
/// concurrently race and the later write wins.
pub struct GmiClient {
    config: ApiClientConfig,
    agent: ureq::Agent,
}

impl GmiClient {
    pub fn new(config: ApiClientConfig) -> Self {
        let timeout = Duration::from_millis(u64::from(config.timeout_ms).max(100));
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .timeout_write(timeout)
            .user_agent(&config.user_agent)
            .build();
        Self { config, agent }
    }

    pub fn from_env() -> Self {
        Self::new(ApiClientConfig::from_env())
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.config.base_url, path)
    }

    fn get_rows(&self, path: &str) -> Result<Vec<Value>, ClientError> {
        let reply = read_reply(self.agent.get(&self.url(path)).call())?;
        match reply {
            Value::Array(rows) => Ok(rows),
            _ => Err(ClientError::UnexpectedReply {
                context: "collection GET did not return an array",
            }),
        }
    }

    fn post_json(&self, path: &str, payload: Value) -> Result<Value, ClientError> {
        read_reply(self.agent.post(&self.url(path)).send_json(payload))
    }

    fn delete_json(&self, path: &str, payload: Value) -> Result<Value, ClientError> {
        read_reply(self.agent.request("DELETE", &self.url(path)).send_json(payload))
    }

    // comparisons

    pub fn get_comparisons(&self) -> Result<Vec<Value>, ClientError> {
        self.get_rows("/api/comparisons")
    }

    pub fn get_comparisons_by_user(&self, username: &str) -> Result<Vec<Value>, ClientError> {
        let rows = self.get_comparisons()?;
        Ok(rows
            .into_iter()
            .filter(|row| row.get("createdBy").and_then(Value::as_str) == Some(username))
            .collect())
    }

    /// Stamp the draft with a millis id and timestamps, prepend it to the
    /// collection and write the whole collection back.
    pub fn save_comparison(
        &self,
        draft: ComparisonRecord,
        now: UnixMillis,
    ) -> Result<ComparisonRecord, ClientError> {
        let record = stamp_new_comparison(draft, now);
        let mut rows = self.get_comparisons()?;
        rows.insert(0, serde_json::to_value(&record)?);
        self.post_json("/api/comparisons", Value::Array(rows))?;
        Ok(record)
    }

    /// Merge the update object into the matching record. Returns the
    /// updated record, or `None` when no record carries the id.
    pub fn update_comparison(
        &self,
        id: &RecordId,
        updates: &Value,
        now: UnixMillis,
    ) -> Result<Option<Value>, ClientError> {
        let mut rows = self.get_comparisons()?;
        let updated = apply_comparison_update(&mut rows, id, updates, now)?;
        if updated.is_some() {
            self.post_json("/api/comparisons", Value::Array(rows))?;
        }
        Ok(updated)
    }

    pub fn delete_comparison(&self, id: &RecordId) -> Result<usize, ClientError> {
        let mut rows = self.get_comparisons()?;
        let removed = remove_record(&mut rows, id)?;
        if removed > 0 {
            self.post_json("/api/comparisons", Value::Array(rows))?;
        }
        Ok(removed)
    }

    // activity logs

    pub fn get_activity_logs(&self) -> Result<Vec<Value>, ClientError> {
        self.get_rows("/api/activity-logs")
    }

    pub fn log_activity(
        &self,
        entry: NewActivity,
        now: UnixMillis,
    ) -> Result<ActivityLogRecord, ClientError> {
        let record = new_activity_record(entry, now);
        self.post_json("/api/activity-logs", serde_json::to_value(&record)?)?;
        Ok(record)
    }

    // custom companies

    pub fn get_custom_companies(&self) -> Result<Vec<Value>, ClientError> {
        self.get_rows("/api/custom-companies")
    }

    pub fn save_custom_companies(&self, companies: Vec<Value>) -> Result<(), ClientError> {
        self.post_json("/api/custom-companies", Value::Array(companies))?;
        Ok(())
    }

    // TOB plans and templates

    pub fn get_tob_plans(&self) -> Result<Vec<Value>, ClientError> {
        self.get_rows("/api/tob-plans")
    }

    pub fn save_tob_plans(&self, plans: Vec<Value>) -> Result<(), ClientError> {
        self.post_json("/api/tob-plans", Value::Array(plans))?;
        Ok(())
    }

    pub fn get_tob_templates(&self) -> Result<Vec<Value>, ClientError> {
        self.get_rows("/api/tob-templates")
    }

    pub fn save_tob_templates(&self, templates: Vec<Value>) -> Result<(), ClientError> {
        self.post_json("/api/tob-templates", Value::Array(templates))?;
        Ok(())
    }

    pub fn delete_tob_template(&self, id: &RecordId) -> Result<(), ClientError> {
        let id_value = serde_json::to_value(id)?;
        self.delete_json("/api/tob-templates", json!({"id": id_value}))?;
        Ok(())
    }

    // auth

    pub fn login(&self, username: &str, password: &str) -> Result<PublicUser, ClientError> {
        let reply = self.post_json(
            "/api/auth",
            json!({"action": "login", "username": username, "password": password}),
        )?;
        user_from_reply(reply)
    }

    pub fn register(
        &self,
        username: &str,
        password: &str,
        role: Option<&str>,
    ) -> Result<PublicUser, ClientError> {
        let mut payload =
            json!({"action": "register", "username": username, "password": password});
        if let Some(role) = role {
            payload["role"] = Value::String(role.to_string());
        }
        user_from_reply(self.post_json("/api/auth", payload)?)
    }

    pub fn list_users(&self) -> Result<Vec<PublicUser>, ClientError> {
        let mut reply = self.post_json("/api/auth", json!({"action": "list"}))?;
        let users = reply
            .get_mut("users")
            .map(Value::take)
            .ok_or(ClientError::UnexpectedReply {
                context: "auth list reply carries no users field",
            })?;
        Ok(serde_json::from_value(users)?)
    }

    // extraction

    /// Base64-encode the document and hand it to the extraction endpoint.
    /// Returns the extracted benefits object.
    pub fn extract_tob(
        &self,
        bytes: &[u8],
        media_type: &str,
        file_name: &str,
    ) -> Result<Value, ClientError> {
        let mut reply = self.post_json(
            "/api/extract-tob",
            json!({
                "file": BASE64.encode(bytes),
                "mediaType": media_type,
                "fileName": file_name,
            }),
        )?;
        reply
            .get_mut("extractedData")
            .map(Value::take)
            .ok_or(ClientError::UnexpectedReply {
                context: "extract reply carries no extractedData field",
            })
    }

    pub fn health(&self) -> Result<Value, ClientError> {
        read_reply(self.agent.get(&self.url("/healthz")).call())
    }
}

fn user_from_reply(mut reply: Value) -> Result<PublicUser, ClientError> {
    let user = reply
        .get_mut("user")
        .map(Value::take)
        .ok_or(ClientError::UnexpectedReply {
            context: "auth reply carries no user field",
        })?;
    Ok(serde_json::from_value(user)?)
}

fn read_reply(result: Result<ureq::Response, ureq::Error>) -> Result<Value, ClientError> {
    match result {
        Ok(response) => Ok(serde_json::from_reader(response.into_reader())?),
        Err(ureq::Error::Status(status, response)) => {
            let body = serde_json::from_reader(response.into_reader()).unwrap_or(Value::Null);
            Err(ClientError::Status { status, body })
        }
        Err(ureq::Error::Transport(transport)) => Err(ClientError::Transport(transport.to_string())),
    }
}

pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

pub fn stamp_new_comparison(mut draft: ComparisonRecord, now: UnixMillis) -> ComparisonRecord {
    let stamp = format_utc_iso8601(now);
    draft.id = RecordId::from_millis(now);
    draft.created_at = Some(stamp.clone());
    draft.updated_at = Some(stamp);
    draft
}

pub fn new_activity_record(entry: NewActivity, now: UnixMillis) -> ActivityLogRecord {
    ActivityLogRecord {
        id: RecordId::from_millis(now),
        user_id: entry.user_id,
        user_email: entry.user_email,
        user_name: entry.user_name,
        action: entry.action,
        details: entry.details,
        created_at: Some(format_utc_iso8601(now)),
        extra: Default::default(),
    }
}

/// Merge the fields of `updates` into the record carrying `id` and bump
/// its `updated_at`. The merge is shallow: whole fields are replaced.
pub fn apply_comparison_update(
    rows: &mut [Value],
    id: &RecordId,
    updates: &Value,
    now: UnixMillis,
) -> Result<Option<Value>, ClientError> {
    let id_value = serde_json::to_value(id)?;
    for row in rows.iter_mut() {
        if row.get("id") != Some(&id_value) {
            continue;
        }
        if let (Some(target), Some(source)) = (row.as_object_mut(), updates.as_object()) {
            for (key, value) in source {
                target.insert(key.clone(), value.clone());
            }
            target.insert(
                "updated_at".to_string(),
                Value::String(format_utc_iso8601(now)),
            );
        }
        return Ok(Some(row.clone()));
    }
    Ok(None)
}

pub fn remove_record(rows: &mut Vec<Value>, id: &RecordId) -> Result<usize, ClientError> {
    let id_value = serde_json::to_value(id)?;
    let before = rows.len();
    rows.retain(|row| row.get("id") != Some(&id_value));
    Ok(before - rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn at_client_01_url_join_tolerates_slashes() {
        assert_eq!(
            join_url("http://127.0.0.1:8080", "/api/comparisons"),
            "http://127.0.0.1:8080/api/comparisons"
        );
        assert_eq!(
            join_url("http://127.0.0.1:8080/", "api/auth"),
            "http://127.0.0.1:8080/api/auth"
        );
    }

    #[test]
    fn at_client_02_new_comparison_gets_millis_id_and_matching_stamps() {
        let draft: ComparisonRecord =
            serde_json::from_value(json!({"id": "draft", "companyName": "Acme"})).unwrap();
        let record = stamp_new_comparison(draft, UnixMillis(1_716_200_000_456));

        assert_eq!(record.id, RecordId::Text("1716200000456".to_string()));
        assert_eq!(
            record.created_at.as_deref(),
            Some("2024-05-20T10:13:20.456Z")
        );
        assert_eq!(record.created_at, record.updated_at);
        assert_eq!(record.company_name, "Acme");
    }

    #[test]
    fn at_client_03_activity_record_is_stamped_from_the_entry() {
        let record = new_activity_record(
            NewActivity {
                user_id: Some(RecordId::Number(1)),
                user_email: "admin@nsib.ae".to_string(),
                user_name: "admin".to_string(),
                action: ActivityAction::new(ActivityAction::LOGIN),
                details: String::new(),
            },
            UnixMillis(1_716_200_000_000),
        );
        assert_eq!(record.id, RecordId::Text("1716200000000".to_string()));
        assert_eq!(record.action.as_str(), "login");
        assert_eq!(
            record.created_at.as_deref(),
            Some("2024-05-20T10:13:20.000Z")
        );
    }

    #[test]
    fn at_client_04_update_merges_shallowly_and_bumps_updated_at() {
        let mut rows = vec![
            json!({"id": "1", "companyName": "Acme", "advisorComment": "old"}),
            json!({"id": "2", "companyName": "Other"}),
        ];
        let updated = apply_comparison_update(
            &mut rows,
            &RecordId::from("1"),
            &json!({"advisorComment": "new"}),
            UnixMillis(0),
        )
        .unwrap()
        .unwrap();

        assert_eq!(updated["advisorComment"], "new");
        assert_eq!(updated["companyName"], "Acme");
        assert_eq!(updated["updated_at"], "1970-01-01T00:00:00.000Z");
        assert_eq!(rows[1], json!({"id": "2", "companyName": "Other"}));
    }

    #[test]
    fn at_client_05_update_of_unknown_id_touches_nothing() {
        let mut rows = vec![json!({"id": "1"})];
        let updated = apply_comparison_update(
            &mut rows,
            &RecordId::from("missing"),
            &json!({"x": 1}),
            UnixMillis(0),
        )
        .unwrap();
        assert!(updated.is_none());
        assert_eq!(rows, vec![json!({"id": "1"})]);
    }

    #[test]
    fn at_client_06_remove_matches_ids_strictly() {
        let mut rows = vec![json!({"id": "10"}), json!({"id": 10}), json!({"id": "11"})];
        let removed = remove_record(&mut rows, &RecordId::from("10")).unwrap();
        assert_eq!(removed, 1);
        // The numeric 10 survives a string-id delete.
        assert_eq!(rows, vec![json!({"id": 10}), json!({"id": "11"})]);
    }
}
