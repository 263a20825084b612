#![forbid(unsafe_code)]

pub mod api;
pub mod time;

pub use api::{
    apply_comparison_update, new_activity_record, remove_record, stamp_new_comparison,
    ApiClientConfig, ClientError, GmiClient, NewActivity,
};
pub use time::format_utc_iso8601;
