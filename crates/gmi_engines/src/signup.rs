#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

/// Email addresses promoted to the admin role at signup time. Matching is
/// case-insensitive on the whole address.
pub const ADMIN_EMAILS: [&str; 2] = ["it2@nsib.ae", "bp1@nsib.ae"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignupRole {
    Admin,
    User,
}

impl SignupRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

pub fn role_for_email(email: &str) -> SignupRole {
    let lowered = email.trim().to_lowercase();
    if ADMIN_EMAILS.iter().any(|admin| *admin == lowered) {
        SignupRole::Admin
    } else {
        SignupRole::User
    }
}

/// Shape handed back to the identity provider's signup hook: the role list
/// it stamps into the new account's app metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignupDecision {
    pub app_metadata: SignupAppMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignupAppMetadata {
    pub roles: Vec<String>,
}

pub fn signup_decision(email: &str) -> SignupDecision {
    SignupDecision {
        app_metadata: SignupAppMetadata {
            roles: vec![role_for_email(email).as_str().to_string()],
        },
    }
}
