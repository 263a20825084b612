#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

/// Reason-code identifier carried on every refusal outcome. Namespaced per
/// endpoint runtime (collection 0x434C_xxxx, auth 0x4155_xxxx, extract
/// 0x4558_xxxx).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReasonCodeId(pub u32);

/// Wall-clock unix time in milliseconds. Record ids and timestamps in the
/// wire format are derived from this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnixMillis(pub u64);

/// Record identity as it appears on the wire: callers generate either a
/// unix-millis string or a raw integer. Equality is the only operation the
/// system performs on ids; no uniqueness is enforced anywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Text(String),
    Number(i64),
}

impl RecordId {
    pub fn from_millis(now: UnixMillis) -> Self {
        RecordId::Text(now.0.to_string())
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        RecordId::Text(value.to_string())
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        RecordId::Number(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContractViolation {
    InvalidValue {
        field: &'static str,
        reason: &'static str,
    },
    NotAnArray {
        context: &'static str,
    },
}

impl std::fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { field, reason } => {
                write!(f, "invalid value for {field}: {reason}")
            }
            Self::NotAnArray { context } => write!(f, "expected a JSON array for {context}"),
        }
    }
}

impl std::error::Error for ContractViolation {}

pub trait Validate {
    fn validate(&self) -> Result<(), ContractViolation>;
}
