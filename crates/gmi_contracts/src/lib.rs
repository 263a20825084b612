#![forbid(unsafe_code)]

pub mod activity;
pub mod auth;
pub mod collection;
pub mod common;
pub mod comparison;
pub mod tob;

pub use common::{ContractViolation, ReasonCodeId, RecordId, UnixMillis, Validate};
