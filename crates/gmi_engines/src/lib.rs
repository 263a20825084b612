#![forbid(unsafe_code)]

pub mod auth;
pub mod collection;
pub mod extract;
pub mod signup;
