#![forbid(unsafe_code)]

use gmi_contracts::auth::{PublicUser, UserRecord, UserRole};
use gmi_contracts::collection::CollectionKind;
use gmi_contracts::{ReasonCodeId, RecordId, UnixMillis, Validate};
use gmi_storage::{list, replace, CollectionStore, StorageError};
use serde::Deserialize;
use serde_json::Value;

pub mod reason_codes {
    use gmi_contracts::ReasonCodeId;

    pub const AUTH_OK_LOGIN: ReasonCodeId = ReasonCodeId(0x4155_0001);
    pub const AUTH_OK_REGISTER: ReasonCodeId = ReasonCodeId(0x4155_0002);
    pub const AUTH_OK_LIST: ReasonCodeId = ReasonCodeId(0x4155_0003);

    pub const AUTH_BAD_CREDENTIALS: ReasonCodeId = ReasonCodeId(0x4155_00F1);
    pub const AUTH_DUPLICATE_USERNAME: ReasonCodeId = ReasonCodeId(0x4155_00F2);
    pub const AUTH_INVALID_ACTION: ReasonCodeId = ReasonCodeId(0x4155_00F3);
    pub const AUTH_INVALID_INPUT: ReasonCodeId = ReasonCodeId(0x4155_00F4);
}

/// Wire shape of `POST /api/auth`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthRequest {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    LoginOk(PublicUser),
    LoginRejected,
    RegisterOk(PublicUser),
    RegisterDuplicate,
    RegisterInvalid { reason: String },
    ListOk(Vec<PublicUser>),
    InvalidAction,
}

impl AuthOutcome {
    pub fn reason_code(&self) -> ReasonCodeId {
        match self {
            Self::LoginOk(_) => reason_codes::AUTH_OK_LOGIN,
            Self::RegisterOk(_) => reason_codes::AUTH_OK_REGISTER,
            Self::ListOk(_) => reason_codes::AUTH_OK_LIST,
            Self::LoginRejected => reason_codes::AUTH_BAD_CREDENTIALS,
            Self::RegisterDuplicate => reason_codes::AUTH_DUPLICATE_USERNAME,
            Self::RegisterInvalid { .. } => reason_codes::AUTH_INVALID_INPUT,
            Self::InvalidAction => reason_codes::AUTH_INVALID_ACTION,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuthRuntime;

impl AuthRuntime {
    pub fn new() -> Self {
        Self
    }

    /// Seed the users collection with the two default accounts when it is
    /// empty or absent. Two first-requests racing here can both seed; the
    /// later write wins, which leaves the same two defaults either way.
    pub fn ensure_seeded(
        &self,
        store: &mut dyn CollectionStore,
    ) -> Result<Vec<UserRecord>, StorageError> {
        let rows = list(store, CollectionKind::Users)?;
        if rows.is_empty() {
            let defaults = default_users();
            let wire: Vec<Value> = defaults
                .iter()
                .map(|u| serde_json::to_value(u))
                .collect::<Result<_, _>>()?;
            replace(store, CollectionKind::Users, wire)?;
            return Ok(defaults);
        }
        // Rows that no longer parse as user records are ignored rather
        // than failing the whole endpoint; the store is schema-less.
        Ok(rows
            .into_iter()
            .filter_map(|row| serde_json::from_value(row).ok())
            .collect())
    }

    pub fn run(
        &self,
        store: &mut dyn CollectionStore,
        request: &AuthRequest,
        now: UnixMillis,
    ) -> Result<AuthOutcome, StorageError> {
        let mut users = self.ensure_seeded(store)?;

        match request.action.as_str() {
            "login" => {
                let found = users.iter().find(|u| {
                    u.username == request.username && u.password == request.password
                });
                Ok(match found {
                    Some(user) => AuthOutcome::LoginOk(user.public()),
                    None => AuthOutcome::LoginRejected,
                })
            }
            "register" => {
                if users.iter().any(|u| u.username == request.username) {
                    return Ok(AuthOutcome::RegisterDuplicate);
                }
                let new_user = UserRecord {
                    id: RecordId::Number(now.0 as i64),
                    username: request.username.clone(),
                    password: request.password.clone(),
                    role: parse_role(request.role.as_deref()),
                };
                if let Err(violation) = new_user.validate() {
                    return Ok(AuthOutcome::RegisterInvalid {
                        reason: violation.to_string(),
                    });
                }
                users.push(new_user.clone());
                let wire: Vec<Value> = users
                    .iter()
                    .map(serde_json::to_value)
                    .collect::<Result<_, _>>()?;
                replace(store, CollectionKind::Users, wire)?;
                Ok(AuthOutcome::RegisterOk(new_user.public()))
            }
            "list" => Ok(AuthOutcome::ListOk(
                users.iter().map(UserRecord::public).collect(),
            )),
            _ => Ok(AuthOutcome::InvalidAction),
        }
    }
}

fn parse_role(raw: Option<&str>) -> UserRole {
    match raw {
        Some("Administrator") => UserRole::Administrator,
        _ => UserRole::User,
    }
}

fn default_users() -> Vec<UserRecord> {
    vec![
        UserRecord {
            id: RecordId::Number(1),
            username: "admin".to_string(),
            password: "admin123".to_string(),
            role: UserRole::Administrator,
        },
        UserRecord {
            id: RecordId::Number(2),
            username: "user".to_string(),
            password: "user123".to_string(),
            role: UserRole::User,
        },
    ]
}
