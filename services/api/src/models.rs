//! API models for request and response payloads

pub mod catalog;
pub mod reviews;
pub mod users;
