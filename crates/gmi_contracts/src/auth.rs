#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::common::{ContractViolation, RecordId, Validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    Administrator,
    User,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Administrator => "Administrator",
            Self::User => "User",
        }
    }
}

/// A stored credential row. Passwords are held in clear text, matching the
/// deployed system; see DESIGN.md for the open question this preserves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: RecordId,
    pub username: String,
    pub password: String,
    pub role: UserRole,
}

impl UserRecord {
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            username: self.username.clone(),
            role: self.role,
        }
    }
}

impl Validate for UserRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.username.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "username",
                reason: "must not be empty",
            });
        }
        if self.password.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "password",
                reason: "must not be empty",
            });
        }
        Ok(())
    }
}

/// The fields of a user that are allowed to leave the auth endpoint.
/// There is deliberately no way to serialize the password from this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: RecordId,
    pub username: String,
    pub role: UserRole,
}
