//! Cross-instance alert deduplication

pub mod config;
pub mod engine;

pub use config::DedupConfig;
pub use engine::{dedup_alerts, fingerprint, group_key};
